use std::io::Cursor;

use crate::error::{Error, Result};
use crate::utils::io::{read_le_i32, read_le_u32, read_u8};
use crate::vorbis::{VORBIS_HEADER_PREFIX, VORBIS_PACKET_IDENTIFICATION, VORBIS_SIGNATURE};

const IDENTIFICATION_LEN: usize = 30;

/// Vorbis identification header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentificationHeader {
    pub version: u32,
    pub channels: u8,
    pub sample_rate: u32,
    pub bitrate_maximum: i32,
    pub bitrate_nominal: i32,
    pub bitrate_minimum: i32,
    pub blocksize_0: u16,
    pub blocksize_1: u16,
}

impl IdentificationHeader {
    /// Parse a whole identification packet, type byte and identifier included
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < IDENTIFICATION_LEN {
            return Err(Error::invalid_header(format!(
                "identification header is {} bytes, expected {}",
                packet.len(),
                IDENTIFICATION_LEN
            )));
        }

        let mut cursor = Cursor::new(&packet[VORBIS_HEADER_PREFIX..]);
        let read = |e: std::io::Error| Error::invalid_header(e.to_string());

        let version = read_le_u32(&mut cursor).map_err(read)?;
        let channels = read_u8(&mut cursor).map_err(read)?;
        let sample_rate = read_le_u32(&mut cursor).map_err(read)?;
        let bitrate_maximum = read_le_i32(&mut cursor).map_err(read)?;
        let bitrate_nominal = read_le_i32(&mut cursor).map_err(read)?;
        let bitrate_minimum = read_le_i32(&mut cursor).map_err(read)?;
        let blocksizes = read_u8(&mut cursor).map_err(read)?;
        let framing = read_u8(&mut cursor).map_err(read)?;

        let blocksize_0 = 1u16 << (blocksizes & 0x0f).min(15);
        let blocksize_1 = 1u16 << (blocksizes >> 4).min(15);

        if framing & 0x01 == 0 {
            return Err(Error::invalid_header("identification header framing bit not set"));
        }
        if blocksize_0 > blocksize_1 {
            return Err(Error::invalid_header(format!(
                "blocksize_0 {} exceeds blocksize_1 {}",
                blocksize_0, blocksize_1
            )));
        }

        Ok(IdentificationHeader {
            version,
            channels,
            sample_rate,
            bitrate_maximum,
            bitrate_nominal,
            bitrate_minimum,
            blocksize_0,
            blocksize_1,
        })
    }

    /// Serialize as a complete identification packet
    pub fn to_packet(&self) -> Vec<u8> {
        let mut packet = vec![VORBIS_PACKET_IDENTIFICATION];
        packet.extend_from_slice(VORBIS_SIGNATURE);
        packet.extend_from_slice(&self.version.to_le_bytes());
        packet.push(self.channels);
        packet.extend_from_slice(&self.sample_rate.to_le_bytes());
        packet.extend_from_slice(&self.bitrate_maximum.to_le_bytes());
        packet.extend_from_slice(&self.bitrate_nominal.to_le_bytes());
        packet.extend_from_slice(&self.bitrate_minimum.to_le_bytes());
        let exponent = |size: u16| size.max(1).trailing_zeros() as u8;
        packet.push(exponent(self.blocksize_0) | (exponent(self.blocksize_1) << 4));
        packet.push(1);
        packet
    }
}

impl Default for IdentificationHeader {
    /// 44.1 kHz stereo at a nominal 320 kbit/s
    fn default() -> Self {
        IdentificationHeader {
            version: 0,
            channels: 2,
            sample_rate: 44_100,
            bitrate_maximum: 0,
            bitrate_nominal: 320_000,
            bitrate_minimum: 0,
            blocksize_0: 256,
            blocksize_1: 2048,
        }
    }
}
