// Vorbis header packets
//
// Every Vorbis header packet starts with a type byte followed by the
// six-byte "vorbis" identifier:
// - 0x01 Identification header: stream parameters
// - 0x03 Comment header: vendor string and TAG=value comments
// - 0x05 Setup header: codebooks (not decoded here)
//
// Only the comment header is needed for now-playing metadata; the other
// types are classified so they can be skipped without noise.

pub mod comment;
pub mod identification;

pub use comment::{VorbisComment, VorbisFields};
pub use identification::IdentificationHeader;

use crate::error::{Error, Result};

pub const VORBIS_SIGNATURE: &[u8; 6] = b"vorbis";

pub const VORBIS_PACKET_AUDIO: u8 = 0x00;
pub const VORBIS_PACKET_IDENTIFICATION: u8 = 0x01;
pub const VORBIS_PACKET_COMMENT: u8 = 0x03;
pub const VORBIS_PACKET_SETUP: u8 = 0x05;

/// Offset of the first byte after the type byte and the identifier
pub(crate) const VORBIS_HEADER_PREFIX: usize = 7;

/// A classified Vorbis packet
#[derive(Debug, Clone, PartialEq)]
pub enum VorbisHeader {
    Audio,
    Identification(IdentificationHeader),
    Comment(VorbisComment),
    Setup,
}

impl VorbisHeader {
    /// Classify a complete packet and decode the headers we care about
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < VORBIS_HEADER_PREFIX || &packet[1..VORBIS_HEADER_PREFIX] != VORBIS_SIGNATURE {
            return Err(Error::invalid_header("missing vorbis identifier"));
        }

        match packet[0] {
            VORBIS_PACKET_AUDIO => Ok(VorbisHeader::Audio),
            VORBIS_PACKET_IDENTIFICATION => {
                IdentificationHeader::parse(packet).map(VorbisHeader::Identification)
            }
            VORBIS_PACKET_COMMENT => VorbisComment::parse(packet).map(VorbisHeader::Comment),
            VORBIS_PACKET_SETUP => Ok(VorbisHeader::Setup),
            other => Err(Error::invalid_header(format!("unknown packet type {:#04x}", other))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VorbisHeader::Audio => "audio",
            VorbisHeader::Identification(_) => "identification",
            VorbisHeader::Comment(_) => "comment",
            VorbisHeader::Setup => "setup",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: u8, body: &[u8]) -> Vec<u8> {
        let mut packet = vec![kind];
        packet.extend_from_slice(VORBIS_SIGNATURE);
        packet.extend_from_slice(body);
        packet
    }

    #[test]
    fn classifies_marker_types() {
        assert_eq!(VorbisHeader::parse(&header(0x00, b"")).unwrap(), VorbisHeader::Audio);
        assert_eq!(VorbisHeader::parse(&header(0x05, b"books")).unwrap(), VorbisHeader::Setup);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = VorbisHeader::parse(&header(0x02, b"")).unwrap_err();
        assert!(err.is_malformed_header());
    }

    #[test]
    fn rejects_missing_identifier() {
        assert!(VorbisHeader::parse(b"\x03vorbiz\x00\x00\x00\x00").is_err());
        assert!(VorbisHeader::parse(b"\x03vor").is_err());
        assert!(VorbisHeader::parse(b"").is_err());
    }

    #[test]
    fn decodes_comment_packet() {
        let comment = VorbisComment {
            vendor_string: "test".to_string(),
            comments: vec![("title".to_string(), "Song".to_string())],
        };
        match VorbisHeader::parse(&comment.to_packet()).unwrap() {
            VorbisHeader::Comment(parsed) => assert_eq!(parsed, comment),
            other => panic!("expected comment header, got {}", other.kind()),
        }
    }
}
