// Ogg page writer
//
// Used by the `send` test source and by the tests to produce well-formed
// streams, including packets that span pages.

use crate::ogg::{
    OGG_HEADER_SIZE, OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_CONTINUATION, OGG_HEADER_TYPE_EOS,
    OGG_SEGMENT_CONTINUED, OGG_SIGNATURE,
};

const CRC_TABLE: [u32; 256] = crc_table();

const fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ 0x04c1_1db7
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Ogg page checksum (CRC-32, polynomial 0x04c11db7, no reflection)
pub fn crc32(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |crc, &byte| {
        (crc << 8) ^ CRC_TABLE[((crc >> 24) as u8 ^ byte) as usize]
    })
}

/// Segment table entries for a packet of `len` bytes.
///
/// A packet whose length is a multiple of 255 ends with a 0-length segment.
pub fn lacing(len: usize) -> Vec<u8> {
    let mut table = vec![OGG_SEGMENT_CONTINUED; len / 255];
    table.push((len % 255) as u8);
    table
}

/// Serialize one page, filling in the checksum
pub fn build_page(
    header_type: u8,
    granule_position: u64,
    serial: u32,
    sequence: u32,
    segment_table: &[u8],
    payload: &[u8],
) -> Vec<u8> {
    let mut page = Vec::with_capacity(OGG_HEADER_SIZE + segment_table.len() + payload.len());
    page.extend_from_slice(OGG_SIGNATURE);
    page.push(0);
    page.push(header_type);
    page.extend_from_slice(&granule_position.to_le_bytes());
    page.extend_from_slice(&serial.to_le_bytes());
    page.extend_from_slice(&sequence.to_le_bytes());
    page.extend_from_slice(&[0u8; 4]);
    page.push(segment_table.len() as u8);
    page.extend_from_slice(segment_table);
    page.extend_from_slice(payload);

    let crc = crc32(&page);
    page[22..26].copy_from_slice(&crc.to_le_bytes());
    page
}

/// Writes consecutive pages of one logical stream
#[derive(Debug)]
pub struct PageWriter {
    serial: u32,
    sequence: u32,
    granule_position: u64,
}

impl PageWriter {
    pub fn new(serial: u32) -> Self {
        PageWriter {
            serial,
            sequence: 0,
            granule_position: 0,
        }
    }

    /// Write a single page with an explicit segment table.
    ///
    /// The first page written gets the beginning-of-stream flag.
    pub fn write_page(&mut self, segment_table: &[u8], payload: &[u8], continuation: bool) -> Vec<u8> {
        let mut header_type = 0;
        if continuation {
            header_type |= OGG_HEADER_TYPE_CONTINUATION;
        }
        if self.sequence == 0 {
            header_type |= OGG_HEADER_TYPE_BOS;
        }

        let page = build_page(
            header_type,
            self.granule_position,
            self.serial,
            self.sequence,
            segment_table,
            payload,
        );
        self.sequence += 1;
        page
    }

    /// Lace `packets` and spread them over pages of at most `max_segments`
    /// segments each, splitting packets across pages where needed.
    pub fn write_packets(&mut self, packets: &[Vec<u8>], max_segments: usize) -> Vec<u8> {
        let max_segments = max_segments.clamp(1, 255);

        let mut segments: Vec<&[u8]> = Vec::new();
        for packet in packets {
            let mut offset = 0;
            for length in lacing(packet.len()) {
                let end = offset + length as usize;
                segments.push(&packet[offset..end]);
                offset = end;
            }
        }

        let mut out = Vec::new();
        let mut continuation = false;
        for page_segments in segments.chunks(max_segments) {
            let table: Vec<u8> = page_segments.iter().map(|s| s.len() as u8).collect();
            let payload = page_segments.concat();
            out.extend(self.write_page(&table, &payload, continuation));
            continuation = table.last() == Some(&OGG_SEGMENT_CONTINUED);
        }
        out
    }

    /// Write an empty end-of-stream page
    pub fn write_eos(&mut self) -> Vec<u8> {
        let page = build_page(
            OGG_HEADER_TYPE_EOS,
            self.granule_position,
            self.serial,
            self.sequence,
            &[],
            &[],
        );
        self.sequence += 1;
        page
    }
}
