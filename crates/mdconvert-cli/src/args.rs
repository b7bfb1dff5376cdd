//! Command-line surface for `mdconvert-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mdconvert_api_types::DownloadFormat;

#[derive(Parser, Debug)]
#[command(name = "mdconvert-cli", version, about = "mdconvert command-line client", long_about = None)]
pub struct Cli {
    /// Server base URL, e.g. <http://127.0.0.1:3000>
    #[arg(long, env = "MDCONVERT_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file and download the converted results
    Convert {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatChoice::Both)]
        format: FormatChoice,
        /// Directory for downloaded files
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Print the preview HTML returned by the server
        #[arg(long)]
        preview: bool,
        /// Delete the server copy once downloads finish
        #[arg(long)]
        cleanup: bool,
    },
    /// Upload a file and print the server response
    Upload { file: PathBuf },
    /// Download a previously uploaded file
    Download {
        #[arg(value_enum)]
        format: FormatArg,
        key: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Delete a previously uploaded file
    Delete { key: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Pdf,
    Docx,
}

impl From<FormatArg> for DownloadFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Pdf => DownloadFormat::Pdf,
            FormatArg::Docx => DownloadFormat::Docx,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatChoice {
    Pdf,
    Docx,
    Both,
}

impl FormatChoice {
    pub fn formats(self) -> &'static [DownloadFormat] {
        match self {
            FormatChoice::Pdf => &[DownloadFormat::Pdf],
            FormatChoice::Docx => &[DownloadFormat::Docx],
            FormatChoice::Both => &DownloadFormat::ALL,
        }
    }
}
