use crate::error::{Error, Result};
use crate::ogg::{
    OGG_HEADER_SIZE, OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_CONTINUATION, OGG_HEADER_TYPE_EOS,
    OGG_HEADER_TYPE_MASK, OGG_SEGMENT_CONTINUED, OGG_SIGNATURE,
};
use crate::utils::io::{le_u32_at, le_u64_at};

/// Ogg Page Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OggPageHeader {
    pub version: u8,
    pub header_type: u8,
    pub granule_position: u64,
    pub bitstream_serial: u32,
    pub page_sequence: u32,
    pub crc: u32,
    pub segment_count: u8,
    pub segment_table: Vec<u8>,
}

/// A slice of page payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub data: Vec<u8>,
    /// Segment is exactly 255 bytes and the packet goes on in the next one
    pub continued: bool,
}

/// A logical codec packet, possibly assembled from several pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub serial: u32,
    pub data: Vec<u8>,
    pub complete: bool,
}

/// Ogg Page
#[derive(Debug, Clone)]
pub struct OggPage {
    pub header: OggPageHeader,
    pub segments: Vec<Segment>,
    /// Packets ended (or left dangling) by this page, in order. Only the last
    /// one can be incomplete.
    pub packets: Vec<Packet>,
}

impl OggPageHeader {
    /// Parse a page header from the start of `data`.
    ///
    /// Succeeds only when `data` holds the whole page (header, segment table
    /// and payload), so the page size is known to be available.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let magic_len = data.len().min(OGG_SIGNATURE.len());
        if data[..magic_len] != OGG_SIGNATURE[..magic_len] {
            let mut magic = [0u8; 4];
            magic[..magic_len].copy_from_slice(&data[..magic_len]);
            return Err(Error::BadMagic(magic));
        }

        if data.len() < OGG_HEADER_SIZE {
            return Err(Error::TruncatedPage {
                needed: OGG_HEADER_SIZE,
                available: data.len(),
            });
        }

        let version = data[4];
        if version != 0 {
            return Err(Error::UnsupportedVersion(version));
        }

        let header_type = data[5];
        if header_type & !OGG_HEADER_TYPE_MASK != 0 {
            return Err(Error::UnknownFlags(header_type));
        }

        let segment_count = data[26];
        let table_end = OGG_HEADER_SIZE + segment_count as usize;
        if data.len() < table_end {
            return Err(Error::TruncatedPage {
                needed: table_end,
                available: data.len(),
            });
        }

        let header = OggPageHeader {
            version,
            header_type,
            granule_position: le_u64_at(data, 6),
            bitstream_serial: le_u32_at(data, 14),
            page_sequence: le_u32_at(data, 18),
            crc: le_u32_at(data, 22),
            segment_count,
            segment_table: data[OGG_HEADER_SIZE..table_end].to_vec(),
        };

        let page_size = header.page_size();
        if data.len() < page_size {
            return Err(Error::TruncatedPage {
                needed: page_size,
                available: data.len(),
            });
        }

        Ok(header)
    }

    /// Calculate total page data size from segment table
    pub fn data_size(&self) -> usize {
        self.segment_table.iter().map(|&x| x as usize).sum()
    }

    /// Header plus segment table
    pub fn header_size(&self) -> usize {
        OGG_HEADER_SIZE + self.segment_table.len()
    }

    /// Total bytes occupied by the page
    pub fn page_size(&self) -> usize {
        self.header_size() + self.data_size()
    }

    /// First packet of this page continues one from the previous page
    pub fn is_continuation(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_CONTINUATION != 0
    }

    /// Check if this is the beginning of a stream
    pub fn is_bos(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_BOS != 0
    }

    /// Check if this is the end of a stream
    pub fn is_eos(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_EOS != 0
    }
}

impl Packet {
    pub fn new(serial: u32) -> Self {
        Packet {
            serial,
            data: Vec::new(),
            complete: false,
        }
    }
}

impl OggPage {
    /// Parse one page from the start of `data`, folding its segments onto
    /// `carried`, the incomplete packet left by the previous page.
    pub fn parse(data: &[u8], carried: Option<Packet>) -> Result<Self> {
        let header = OggPageHeader::parse(data)?;
        Self::from_header(header, data, carried)
    }

    /// Build a page from an already validated header.
    ///
    /// `data` must start at the page's capture pattern.
    pub fn from_header(header: OggPageHeader, data: &[u8], carried: Option<Packet>) -> Result<Self> {
        if data.len() < header.page_size() {
            return Err(Error::TruncatedPage {
                needed: header.page_size(),
                available: data.len(),
            });
        }
        if header.is_continuation() != carried.is_some() {
            return Err(Error::ContinuationMismatch {
                continuation: header.is_continuation(),
                carried: carried.is_some(),
            });
        }
        if let Some(packet) = &carried {
            if packet.serial != header.bitstream_serial {
                return Err(Error::SerialMismatch {
                    expected: packet.serial,
                    found: header.bitstream_serial,
                });
            }
        }

        let mut offset = header.header_size();
        let segments: Vec<Segment> = header
            .segment_table
            .iter()
            .map(|&length| {
                let end = offset + length as usize;
                let segment = Segment {
                    data: data[offset..end].to_vec(),
                    continued: length == OGG_SEGMENT_CONTINUED,
                };
                offset = end;
                segment
            })
            .collect();

        let serial = header.bitstream_serial;
        let mut packets = Vec::new();
        let mut packet = carried.unwrap_or_else(|| Packet::new(serial));

        if segments.is_empty() {
            // Nothing to fold; a carried packet simply passes through.
            if header.is_continuation() {
                packets.push(packet);
            }
        } else {
            let last = segments.len() - 1;
            for (i, segment) in segments.iter().enumerate() {
                packet.data.extend_from_slice(&segment.data);
                packet.complete = !segment.continued;

                if packet.complete || i == last {
                    packets.push(std::mem::replace(&mut packet, Packet::new(serial)));
                }
            }
        }

        Ok(OggPage {
            header,
            segments,
            packets,
        })
    }

    /// Parse a chunk holding a whole number of pages.
    ///
    /// Returns the pages in order plus the incomplete packet to hand to the
    /// next call. The chunk must start on a page boundary and end exactly on
    /// one; anything else fails the whole chunk.
    pub fn parse_pages(chunk: &[u8], carried: Option<Packet>) -> Result<(Vec<OggPage>, Option<Packet>)> {
        let mut offset = 0;
        let mut carry = carried;
        let mut pages = Vec::new();

        while offset < chunk.len() {
            let page = match Self::parse(&chunk[offset..], carry) {
                Ok(page) => page,
                Err(Error::TruncatedPage { .. }) => {
                    return Err(Error::TrailingBytes(chunk.len() - offset));
                }
                Err(e) => return Err(e),
            };

            carry = page.incomplete_packet().cloned();
            offset += page.header.page_size();
            pages.push(page);
        }

        Ok((pages, carry))
    }

    /// The packet left dangling at the end of this page, if any
    pub fn incomplete_packet(&self) -> Option<&Packet> {
        self.packets.last().filter(|packet| !packet.complete)
    }

    /// Packets completed on this page
    pub fn complete_packets(&self) -> impl Iterator<Item = &Packet> {
        self.packets.iter().filter(|packet| packet.complete)
    }

    /// Consume the page, yielding its packets
    pub fn into_packets(self) -> Vec<Packet> {
        self.packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::writer::{build_page, PageWriter};

    fn packet_bytes(len: usize, fill: u8) -> Vec<u8> {
        (0..len).map(|i| fill.wrapping_add(i as u8)).collect()
    }

    #[test]
    fn parses_header_fields() {
        let page = build_page(OGG_HEADER_TYPE_BOS, 1234, 0xdead_beef, 7, &[3], b"abc");
        let header = OggPageHeader::parse(&page).unwrap();

        assert_eq!(header.version, 0);
        assert!(header.is_bos());
        assert!(!header.is_eos());
        assert!(!header.is_continuation());
        assert_eq!(header.granule_position, 1234);
        assert_eq!(header.bitstream_serial, 0xdead_beef);
        assert_eq!(header.page_sequence, 7);
        assert_eq!(header.segment_count, 1);
        assert_eq!(header.page_size(), 27 + 1 + 3);
        assert_eq!(header.page_size(), page.len());
    }

    #[test]
    fn from_header_rejects_short_data() {
        let page = build_page(0, 0, 1, 0, &[3], b"abc");
        let header = OggPageHeader::parse(&page).unwrap();

        let err = OggPage::from_header(header, &page[..page.len() - 1], None).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedPage {
                needed: 31,
                available: 30
            }
        ));
    }

    #[test]
    fn rejects_bad_magic_before_reading_segments() {
        let mut page = build_page(0, 0, 1, 0, &[3], b"abc");
        page[0..4].copy_from_slice(b"RIFF");
        // Cut the payload off so any segment interpretation would also fail.
        page.truncate(10);

        match OggPage::parse(&page, None) {
            Err(Error::BadMagic(magic)) => assert_eq!(&magic, b"RIFF"),
            other => panic!("expected bad magic, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unsupported_version_and_flags() {
        let mut page = build_page(0, 0, 1, 0, &[0], b"");
        page[4] = 1;
        assert!(matches!(OggPageHeader::parse(&page), Err(Error::UnsupportedVersion(1))));

        let mut page = build_page(0, 0, 1, 0, &[0], b"");
        page[5] = 0x08;
        assert!(matches!(OggPageHeader::parse(&page), Err(Error::UnknownFlags(0x08))));
    }

    #[test]
    fn reports_truncated_page() {
        let page = build_page(0, 0, 1, 0, &[10], &[0u8; 10]);
        assert!(matches!(
            OggPageHeader::parse(&page[..20]),
            Err(Error::TruncatedPage { needed: 27, available: 20 })
        ));
        assert!(matches!(
            OggPageHeader::parse(&page[..30]),
            Err(Error::TruncatedPage { needed: 38, available: 30 })
        ));
    }

    #[test]
    fn recovers_packet_boundaries() {
        let packets = vec![
            packet_bytes(30, 1),
            packet_bytes(255, 2),
            Vec::new(),
            packet_bytes(600, 3),
            packet_bytes(1, 4),
        ];
        let mut writer = PageWriter::new(42);
        let stream = writer.write_packets(&packets, 3);

        let (pages, carry) = OggPage::parse_pages(&stream, None).unwrap();
        assert!(carry.is_none());

        let recovered: Vec<Vec<u8>> = pages
            .iter()
            .flat_map(|page| page.complete_packets().map(|p| p.data.clone()))
            .collect();
        assert_eq!(recovered, packets);
    }

    #[test]
    fn reassembles_packet_spanning_two_pages() {
        let first = packet_bytes(255, 10);
        let second = packet_bytes(40, 99);
        let mut writer = PageWriter::new(5);
        let mut stream = writer.write_page(&[255], &first, false);
        stream.extend(writer.write_page(&[40], &second, true));

        let (pages, carry) = OggPage::parse_pages(&stream, None).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(carry.is_none());
        assert!(pages[0].incomplete_packet().is_some());
        assert!(pages[0].segments[0].continued);
        assert!(pages[1].header.is_continuation());

        let complete: Vec<&Packet> = pages[1].complete_packets().collect();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].data, [first, second].concat());
    }

    #[test]
    fn carries_incomplete_packet_across_chunks() {
        let mut writer = PageWriter::new(5);
        let first = writer.write_page(&[255, 255], &packet_bytes(510, 0), false);
        let second = writer.write_page(&[12], &packet_bytes(12, 7), true);

        let (_, carry) = OggPage::parse_pages(&first, None).unwrap();
        let carry = carry.expect("packet should be carried");
        assert_eq!(carry.data.len(), 510);
        assert!(!carry.complete);

        let (pages, carry) = OggPage::parse_pages(&second, Some(carry)).unwrap();
        assert!(carry.is_none());
        let packet = pages[0].complete_packets().next().unwrap();
        assert_eq!(packet.data.len(), 522);
    }

    #[test]
    fn zero_length_segment_terminates_packet() {
        let mut writer = PageWriter::new(1);
        let page = writer.write_page(&[255, 0], &packet_bytes(255, 0), false);

        let (pages, carry) = OggPage::parse_pages(&page, None).unwrap();
        assert!(carry.is_none());
        assert_eq!(pages[0].packets.len(), 1);
        assert!(pages[0].packets[0].complete);
        assert!(!pages[0].segments[1].continued);
    }

    #[test]
    fn continuation_without_carry_fails() {
        let mut writer = PageWriter::new(1);
        let page = writer.write_page(&[3], b"abc", true);

        assert!(matches!(
            OggPage::parse_pages(&page, None),
            Err(Error::ContinuationMismatch { continuation: true, carried: false })
        ));
    }

    #[test]
    fn carry_without_continuation_fails() {
        let mut writer = PageWriter::new(1);
        let page = writer.write_page(&[3], b"abc", false);
        let carried = Packet {
            serial: 1,
            data: vec![0; 255],
            complete: false,
        };

        assert!(matches!(
            OggPage::parse_pages(&page, Some(carried)),
            Err(Error::ContinuationMismatch { continuation: false, carried: true })
        ));
    }

    #[test]
    fn continuation_from_other_stream_fails() {
        let mut writer = PageWriter::new(2);
        let page = writer.write_page(&[3], b"abc", true);
        let carried = Packet {
            serial: 1,
            data: vec![0; 255],
            complete: false,
        };

        assert!(matches!(
            OggPage::parse_pages(&page, Some(carried)),
            Err(Error::SerialMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn chunk_ending_mid_page_is_malformed() {
        let mut writer = PageWriter::new(1);
        let mut stream = writer.write_page(&[3], b"abc", false);
        let second = writer.write_page(&[3], b"def", false);
        stream.extend_from_slice(&second[..15]);

        assert!(matches!(
            OggPage::parse_pages(&stream, None),
            Err(Error::TrailingBytes(15))
        ));
    }

    #[test]
    fn empty_chunk_yields_no_pages() {
        let (pages, carry) = OggPage::parse_pages(&[], None).unwrap();
        assert!(pages.is_empty());
        assert!(carry.is_none());
    }
}
