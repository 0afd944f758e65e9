//! CLI argument parsing and configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// bpmtag - Batch BPM tagging for DJ libraries
///
/// Estimates the tempo of every track in a directory and writes it to the
/// BPM tag, or copies BPM/key/artist metadata out of a Mixxx library.
#[derive(Parser, Debug)]
#[command(name = "bpmtag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect the BPM of every track under a directory and tag the files
    Tag(TagArgs),
    /// Copy BPM, key and track metadata from a Mixxx library into file tags
    Import(ImportArgs),
}

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Directory to scan (or a single audio file)
    #[arg(value_name = "DIR")]
    pub input: PathBuf,

    /// File extension to process (can be repeated)
    #[arg(long = "ext", value_name = "EXT", default_values_t = vec!["mp3".to_string()])]
    pub extensions: Vec<String>,

    /// Skip files whose name contains this text (can be repeated; replaces the defaults)
    #[arg(long = "skip", value_name = "TEXT")]
    pub skip: Vec<String>,

    /// Decode with an external ffmpeg binary instead of the built-in decoder
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Directory for temporary decoded audio (defaults to the system temp dir)
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Write a JSON report of the run to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Dry run - list the files that would be processed without touching them
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Mixxx database file, or the directory containing mixxxdb.sqlite
    /// (defaults to the Mixxx settings directory)
    #[arg(value_name = "DB")]
    pub database: Option<PathBuf>,

    /// Library rows read per page
    #[arg(long, value_name = "N", default_value_t = crate::config::settings::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Write a JSON report of the run to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Get the log filter based on verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
