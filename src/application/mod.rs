//! Application services: storage, rendering, upload and download flows.

pub mod downloads;
pub mod error;
pub mod render;
pub mod store;
pub mod sweeper;
pub mod uploads;
