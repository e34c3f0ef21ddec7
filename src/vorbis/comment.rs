// Vorbis comment header

use std::io::Cursor;

use crate::error::{Error, Result};
use crate::utils::encoding::decode_tag_text;
use crate::utils::io::{read_le_u32, read_le_u32_prefixed, read_u8};
use crate::vorbis::{VORBIS_HEADER_PREFIX, VORBIS_PACKET_COMMENT, VORBIS_SIGNATURE};

/// Vorbis comment structure
///
/// Keys are stored lowercased, in the order they appear in the packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VorbisComment {
    pub vendor_string: String,
    pub comments: Vec<(String, String)>,
}

impl VorbisComment {
    /// Parse a whole comment header packet, type byte and identifier included
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < VORBIS_HEADER_PREFIX {
            return Err(Error::invalid_header("comment header too short"));
        }

        let mut cursor = Cursor::new(&packet[VORBIS_HEADER_PREFIX..]);
        let comment = Self::read(&mut cursor)
            .map_err(|e| Error::invalid_header(format!("truncated comment header: {}", e)))?;

        // A real framing bit only uses bit 0, but any non-zero byte is accepted.
        // Some encoders end the packet right after the last tag.
        if let Ok(0) = read_u8(&mut cursor) {
            return Err(Error::invalid_header("comment header framing bit not set"));
        }

        Ok(comment)
    }

    /// Read vendor string and comment list from reader
    pub fn read(reader: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        let limit = remaining(reader);
        let vendor_bytes = read_le_u32_prefixed(reader, limit)?;
        let vendor_string = decode_tag_text(&vendor_bytes);

        // Read comment count (little-endian 32-bit)
        let comment_count = read_le_u32(reader)? as usize;

        // Each comment needs at least its 4-byte length.
        let mut comments = Vec::with_capacity(comment_count.min(remaining(reader) / 4));
        for _ in 0..comment_count {
            let limit = remaining(reader);
            let comment_bytes = read_le_u32_prefixed(reader, limit)?;
            let comment_string = decode_tag_text(&comment_bytes);

            // Parse comment (format: FIELD=value); the value may contain '='
            let (field, value) = comment_string
                .split_once('=')
                .unwrap_or((comment_string.as_str(), ""));
            comments.push((field.to_lowercase(), value.to_string()));
        }

        Ok(VorbisComment {
            vendor_string,
            comments,
        })
    }

    /// Get the first value for a field name, ignoring case
    pub fn get(&self, field: &str) -> Option<&String> {
        self.comments
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v)
    }

    /// Serialize vendor string and comment list
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.vendor_string.len() as u32).to_le_bytes());
        out.extend_from_slice(self.vendor_string.as_bytes());
        out.extend_from_slice(&(self.comments.len() as u32).to_le_bytes());
        for (field, value) in &self.comments {
            let entry = format!("{}={}", field.to_uppercase(), value);
            out.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            out.extend_from_slice(entry.as_bytes());
        }
        out
    }

    /// Serialize as a complete comment header packet with framing bit
    pub fn to_packet(&self) -> Vec<u8> {
        let mut packet = vec![VORBIS_PACKET_COMMENT];
        packet.extend_from_slice(VORBIS_SIGNATURE);
        packet.extend(self.to_bytes());
        packet.push(1);
        packet
    }
}

fn remaining(reader: &Cursor<&[u8]>) -> usize {
    let len = reader.get_ref().len() as u64;
    len.saturating_sub(reader.position()) as usize
}

/// Common Vorbis comment field names
pub struct VorbisFields;
impl VorbisFields {
    pub const TITLE: &'static str = "title";
    pub const ARTIST: &'static str = "artist";
    pub const ALBUM: &'static str = "album";
}
