//! Per-connection decode pipeline.
//!
//! Bytes go through three synchronous stages, each run to completion for a
//! chunk before the next chunk is read:
//!
//! 1. [`OggDemuxer`]: bytes to complete packets (carrying partial packets)
//! 2. [`VorbisHeader::parse`]: packets to classified headers
//! 3. [`Track::from_vorbis_comment`]: comment headers to track records
//!
//! Framing errors from stage 1 are returned to the caller, which must drop
//! the connection. Packets rejected by stage 2 are skipped: some encoders
//! (demo builds of DJ software among them) emit truncated or noncompliant
//! headers mid-stream.

use tracing::{debug, info};

use crate::error::Result;
use crate::ogg::OggDemuxer;
use crate::track::Track;
use crate::vorbis::VorbisHeader;

/// Decode state for one source connection
#[derive(Debug, Default)]
pub struct MetadataPipeline {
    demuxer: OggDemuxer,
    packets: u64,
    skipped: u64,
}

impl MetadataPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning the tracks it announces in order
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();

        for packet in self.demuxer.push(chunk)? {
            self.packets += 1;

            let header = match VorbisHeader::parse(&packet.data) {
                Ok(header) => header,
                Err(e) => {
                    self.skipped += 1;
                    debug!(serial = packet.serial, len = packet.data.len(), "skipping packet: {}", e);
                    continue;
                }
            };

            match header {
                VorbisHeader::Comment(comment) => {
                    debug!(
                        serial = packet.serial,
                        vendor = %comment.vendor_string,
                        tags = comment.comments.len(),
                        "vorbis comment header"
                    );
                    if let Some(track) = Track::from_vorbis_comment(&comment) {
                        tracks.push(track);
                    }
                }
                VorbisHeader::Identification(id) => {
                    info!(
                        serial = packet.serial,
                        channels = id.channels,
                        sample_rate = id.sample_rate,
                        bitrate = id.bitrate_nominal,
                        "new vorbis stream"
                    );
                }
                VorbisHeader::Audio | VorbisHeader::Setup => {}
            }
        }

        Ok(tracks)
    }

    /// Complete packets seen so far
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Bytes of a page still waiting for the rest of its data
    pub fn buffered(&self) -> usize {
        self.demuxer.buffered()
    }

    /// Packets that were not valid Vorbis headers
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ogg::PageWriter;
    use crate::vorbis::{IdentificationHeader, VorbisComment};

    fn comment(entries: &[(&str, &str)]) -> Vec<u8> {
        VorbisComment {
            vendor_string: "test".to_string(),
            comments: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
        .to_packet()
    }

    #[test]
    fn emits_track_from_header_set() {
        let packets = vec![
            IdentificationHeader::default().to_packet(),
            comment(&[("TITLE", "A"), ("ARTIST", "B")]),
            vec![0x05, b'v', b'o', b'r', b'b', b'i', b's', 0, 0],
        ];
        let stream = PageWriter::new(1).write_packets(&packets, 255);

        let mut pipeline = MetadataPipeline::new();
        let tracks = pipeline.push(&stream).unwrap();
        assert_eq!(
            tracks,
            vec![Track {
                title: Some("A".to_string()),
                artist: Some("B".to_string()),
                album: None,
            }]
        );
        assert_eq!(pipeline.packets(), 3);
        assert_eq!(pipeline.skipped(), 0);
    }

    #[test]
    fn skips_malformed_packets_and_keeps_going() {
        let mut broken = comment(&[("TITLE", "Lost")]);
        *broken.last_mut().unwrap() = 0;
        let packets = vec![
            broken,
            vec![0x42; 12],
            comment(&[("TITLE", "Kept")]),
        ];
        let stream = PageWriter::new(1).write_packets(&packets, 255);

        let mut pipeline = MetadataPipeline::new();
        let tracks = pipeline.push(&stream).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title.as_deref(), Some("Kept"));
        assert_eq!(pipeline.skipped(), 2);
    }

    #[test]
    fn comment_without_framing_byte_still_yields_track() {
        let mut unterminated = comment(&[("TITLE", "A"), ("ARTIST", "B")]);
        unterminated.pop();
        let stream = PageWriter::new(1).write_packets(&[unterminated], 255);

        let mut pipeline = MetadataPipeline::new();
        let tracks = pipeline.push(&stream).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title.as_deref(), Some("A"));
        assert_eq!(tracks[0].artist.as_deref(), Some("B"));
        assert_eq!(pipeline.skipped(), 0);
    }

    #[test]
    fn comment_without_title_or_artist_is_ignored() {
        let stream = PageWriter::new(1).write_packets(&[comment(&[("ALBUM", "Foo")])], 255);
        assert!(MetadataPipeline::new().push(&stream).unwrap().is_empty());
    }

    #[test]
    fn comment_spanning_chunks_is_reassembled() {
        let long_title = "x".repeat(700);
        let packets = vec![comment(&[("TITLE", long_title.as_str()), ("ARTIST", "B")])];
        let stream = PageWriter::new(1).write_packets(&packets, 1);

        let mut pipeline = MetadataPipeline::new();
        let (head, tail) = stream.split_at(stream.len() / 2);
        assert!(pipeline.push(head).unwrap().is_empty());
        let tracks = pipeline.push(tail).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title.as_deref(), Some(long_title.as_str()));
    }

    #[test]
    fn framing_errors_are_returned() {
        let mut pipeline = MetadataPipeline::new();
        let err = pipeline.push(b"NOPE, this is not a page at all........").unwrap_err();
        assert!(matches!(err, Error::BadMagic(_)));
        assert!(err.is_protocol_violation());
    }
}
