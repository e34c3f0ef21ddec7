// CLI configuration
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::output::OutputFormat;

/// deckfeed - now-playing metadata from DJ software broadcasts
#[derive(Parser, Debug)]
#[command(name = "deckfeed")]
#[command(about = "Receive an Icecast source stream from DJ software and report the tracks it plays", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (only warnings and errors are logged)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (log every page and skipped packet)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Accept a source connection and print connection and track events
    Listen {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// Socket read size in bytes
        #[arg(long, default_value_t = 16 * 1024)]
        read_buffer: usize,

        /// Seconds a new connection has to complete its SOURCE request
        #[arg(long, default_value_t = 10)]
        handshake_timeout: u64,
    },

    /// Print the tracks announced in recorded Ogg/Vorbis streams
    Inspect {
        /// Ogg file path(s)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Act as a source: connect, handshake and announce one track
    Send {
        /// Server address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// Mount point named in the SOURCE request
        #[arg(short, long, default_value = "/live")]
        mount: String,

        /// Track title
        #[arg(long)]
        title: Option<String>,

        /// Track artist
        #[arg(long)]
        artist: Option<String>,

        /// Track album
        #[arg(long)]
        album: Option<String>,
    },
}

impl Config {
    /// Log filter used when RUST_LOG is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "info,deckfeed=debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}
