// Ogg Vorbis files on disk
//
// Runs a recorded stream (for instance a capture of what the DJ software
// sends) through the same pipeline as a live source connection.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::pipeline::MetadataPipeline;
use crate::track::Track;

const READ_CHUNK: usize = 16 * 1024;

/// Ogg Vorbis file reader
pub struct OggVorbisFile {
    pub path: PathBuf,
}

impl OggVorbisFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OggVorbisFile { path: path.into() }
    }

    /// Every track announced by the file's comment headers, in order
    pub fn read_tracks(&self) -> Result<Vec<Track>> {
        let file = File::open(&self.path)?;
        read_tracks(BufReader::new(file), &self.path)
    }
}

/// Decode tracks from any reader carrying an Ogg stream
pub fn read_tracks<R: Read>(mut reader: R, origin: &Path) -> Result<Vec<Track>> {
    let mut pipeline = MetadataPipeline::new();
    let mut tracks = Vec::new();
    let mut buffer = vec![0u8; READ_CHUNK];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        tracks.extend(pipeline.push(&buffer[..n])?);
    }

    if pipeline.buffered() > 0 {
        warn!(
            path = %origin.display(),
            bytes = pipeline.buffered(),
            "stream ends with a truncated page"
        );
    }
    Ok(tracks)
}

/// Detect if file is Ogg format
pub fn is_ogg_file(path: &Path) -> bool {
    let mut signature = [0u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut signature))
        .map(|_| &signature == crate::ogg::OGG_SIGNATURE)
        .unwrap_or(false)
}
