// Output formatting for CLI

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use deckfeed::{ServerEvent, Track};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
struct TimedEvent<'a> {
    at: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a ServerEvent,
}

#[derive(Serialize)]
struct FileTrack<'a> {
    file: &'a str,
    #[serde(flatten)]
    track: &'a Track,
}

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Output a server event
    pub fn output_event(&self, event: &ServerEvent, writer: &mut impl Write) -> Result<()> {
        let at = Utc::now();
        match self.format {
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(&TimedEvent { at, event })?)?;
            }
            OutputFormat::Pretty => {
                let stamp = at.format("%H:%M:%S");
                match event {
                    ServerEvent::ConnectionUpdate(true) => writeln!(writer, "[{}] ● source connected", stamp)?,
                    ServerEvent::ConnectionUpdate(false) => writeln!(writer, "[{}] ○ source disconnected", stamp)?,
                    ServerEvent::SongUpdate(track) => writeln!(writer, "[{}] ♪ {}", stamp, track)?,
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Output a track found in a file
    pub fn output_track(&self, file: &str, track: &Track, writer: &mut impl Write) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                writeln!(writer, "{}", serde_json::to_string(&FileTrack { file, track })?)?;
            }
            OutputFormat::Pretty => {
                match &track.album {
                    Some(album) => writeln!(writer, "  {} ({})", track, album)?,
                    None => writeln!(writer, "  {}", track)?,
                }
            }
        }
        Ok(())
    }

    pub fn is_pretty(&self) -> bool {
        self.format == OutputFormat::Pretty
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            eprintln!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            eprintln!("  {}", message);
        }
    }
}
