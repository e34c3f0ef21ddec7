use tracing::trace;

use crate::error::{Error, Result};
use crate::ogg::page::{OggPage, OggPageHeader, Packet};

/// Streaming Ogg demultiplexer for one connection.
///
/// Unlike [`OggPage::parse_pages`], chunks do not have to be page aligned:
/// bytes of a page that has not fully arrived yet are kept until the next
/// [`push`](Self::push). Only complete packets are returned; an incomplete
/// trailing packet is carried until a continuation page finishes it.
#[derive(Debug, Default)]
pub struct OggDemuxer {
    pending: Vec<u8>,
    carry: Option<Packet>,
    pages: u64,
}

impl OggDemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the stream, returning every packet it completes.
    ///
    /// An error is a framing violation; the demuxer should be dropped with
    /// the connection that produced it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Packet>> {
        self.pending.extend_from_slice(chunk);

        let mut offset = 0;
        let mut packets = Vec::new();
        while offset < self.pending.len() {
            let data = &self.pending[offset..];
            let header = match OggPageHeader::parse(data) {
                Ok(header) => header,
                Err(Error::TruncatedPage { .. }) => break,
                Err(e) => return Err(e),
            };

            let page_size = header.page_size();
            let page = OggPage::from_header(header, data, self.carry.take())?;
            trace!(
                serial = page.header.bitstream_serial,
                sequence = page.header.page_sequence,
                packets = page.packets.len(),
                "ogg page"
            );

            for packet in page.into_packets() {
                if packet.complete {
                    packets.push(packet);
                } else {
                    self.carry = Some(packet);
                }
            }

            offset += page_size;
            self.pages += 1;
        }

        self.pending.drain(..offset);
        Ok(packets)
    }

    /// Drop any partial page and carried packet
    pub fn reset(&mut self) {
        self.pending.clear();
        self.carry = None;
    }

    /// A packet is waiting for its continuation page
    pub fn has_carry(&self) -> bool {
        self.carry.is_some()
    }

    /// Bytes of a partially received page
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Pages decoded so far
    pub fn pages(&self) -> u64 {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::writer::PageWriter;

    fn stream_of(packets: &[Vec<u8>], max_segments: usize) -> Vec<u8> {
        PageWriter::new(77).write_packets(packets, max_segments)
    }

    #[test]
    fn aligned_chunks_yield_packets_in_order() {
        let packets = vec![vec![1u8; 10], vec![2u8; 300], vec![3u8; 0]];
        let stream = stream_of(&packets, 255);

        let mut demuxer = OggDemuxer::new();
        let out = demuxer.push(&stream).unwrap();
        let data: Vec<Vec<u8>> = out.into_iter().map(|p| p.data).collect();
        assert_eq!(data, packets);
        assert_eq!(demuxer.buffered(), 0);
        assert!(!demuxer.has_carry());
    }

    #[test]
    fn byte_at_a_time_delivery_matches_whole_stream() {
        let packets = vec![vec![9u8; 1000], vec![8u8; 3], vec![7u8; 510]];
        let stream = stream_of(&packets, 2);

        let mut demuxer = OggDemuxer::new();
        let mut out = Vec::new();
        for byte in &stream {
            out.extend(demuxer.push(std::slice::from_ref(byte)).unwrap());
        }

        let data: Vec<Vec<u8>> = out.into_iter().map(|p| p.data).collect();
        assert_eq!(data, packets);
        assert_eq!(demuxer.buffered(), 0);
    }

    #[test]
    fn holds_packet_until_continuation_arrives() {
        let mut writer = PageWriter::new(3);
        let first = writer.write_page(&[255], &[1u8; 255], false);
        let second = writer.write_page(&[5], &[2u8; 5], true);

        let mut demuxer = OggDemuxer::new();
        assert!(demuxer.push(&first).unwrap().is_empty());
        assert!(demuxer.has_carry());

        let out = demuxer.push(&second).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data.len(), 260);
        assert_eq!(out[0].serial, 3);
        assert!(!demuxer.has_carry());
        assert_eq!(demuxer.pages(), 2);
    }

    #[test]
    fn bad_magic_fails_push() {
        let mut demuxer = OggDemuxer::new();
        assert!(matches!(
            demuxer.push(b"ID3\x04 not an ogg stream at all, definitely"),
            Err(Error::BadMagic(_))
        ));
    }

    #[test]
    fn reset_discards_carry() {
        let mut writer = PageWriter::new(3);
        let first = writer.write_page(&[255], &[1u8; 255], false);

        let mut demuxer = OggDemuxer::new();
        demuxer.push(&first).unwrap();
        demuxer.push(b"Og").unwrap();
        demuxer.reset();
        assert!(!demuxer.has_carry());
        assert_eq!(demuxer.buffered(), 0);

        // A fresh stream starting with a non-continuation page is accepted again.
        let mut writer = PageWriter::new(4);
        let page = writer.write_page(&[2], b"ok", false);
        assert_eq!(demuxer.push(&page).unwrap().len(), 1);
    }
}
