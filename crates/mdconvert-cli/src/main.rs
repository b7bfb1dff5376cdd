//! mdconvert-cli: upload Markdown to an mdconvert server and fetch the results.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod controller;
mod print;
mod session;


use std::path::{Path, PathBuf};

use clap::Parser;
use mdconvert_api_types::DownloadFormat;

use args::{Cli, Commands, FormatChoice};
use client::{CliError, Ctx};
use print::{print_json, print_notice};
use session::Session;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = Ctx::new(&cli.server)?;

    match cli.command {
        Commands::Convert {
            file,
            format,
            out,
            preview,
            cleanup,
        } => {
            convert(&ctx, &file, format, &out, preview, cleanup).await?;
        }
        Commands::Upload { file } => {
            let mut session = Session::new(&ctx);
            let response = session.upload(&file).await?;
            print_json(&response)?;
        }
        Commands::Download { format, key, out } => {
            let saved = download(&ctx, format.into(), &key, &out).await?;
            println!("{}", saved.display());
        }
        Commands::Delete { key } => {
            ctx.delete(&key).await?;
            println!("deleted");
        }
    }

    Ok(())
}

pub(crate) async fn convert(
    ctx: &Ctx,
    file: &Path,
    choice: FormatChoice,
    out: &Path,
    preview: bool,
    cleanup: bool,
) -> Result<Vec<PathBuf>, CliError> {
    let mut session = Session::new(ctx);
    let response = session.upload(file).await;
    if let Some(notice) = session.take_notice() {
        print_notice(&notice);
    }
    let response = response?;

    if preview {
        if let Some(html) = response.preview_html.as_deref() {
            println!("{html}");
        }
    }

    let mut saved = Vec::new();
    for format in choice.formats() {
        let result = session.download(*format, out).await;
        if let Some(notice) = session.take_notice() {
            print_notice(&notice);
        }
        saved.push(result?);
    }

    if cleanup {
        session.discard().await?;
    }

    Ok(saved)
}

pub(crate) async fn download(
    ctx: &Ctx,
    format: DownloadFormat,
    key: &str,
    out: &Path,
) -> Result<PathBuf, CliError> {
    let downloaded = ctx.download(format, key).await?;
    let target = out.join(&downloaded.filename);
    tokio::fs::write(&target, &downloaded.body)
        .await
        .map_err(|source| CliError::OutputFile {
            path: target.display().to_string(),
            source,
        })?;
    Ok(target)
}
