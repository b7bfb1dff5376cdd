//! mdconvert: upload Markdown, preview it, download print-ready HTML or plain text.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
