// Ogg container demultiplexing
//
// Ogg Page Structure:
// - Page Header (27 bytes)
//   - Capture Pattern: "OggS" (4 bytes)
//   - Version: 0 (1 byte)
//   - Header Type: 1=continuation, 2=bos, 4=eos (1 byte)
//   - Granule Position (8 bytes)
//   - Bitstream Serial Number (4 bytes)
//   - Page Sequence Number (4 bytes)
//   - CRC Checksum (4 bytes)
//   - Number of Page Segments (1 byte)
//   - Segment Table (variable)
// - Segment data, one slice per segment table entry
//
// A segment of 255 bytes continues into the next segment; any shorter
// segment (including 0) ends the packet. The last segment of a page may be
// continued on the next page, which then carries the continuation flag.

pub mod demux;
pub mod page;
pub mod writer;

pub use demux::OggDemuxer;
pub use page::{OggPage, OggPageHeader, Packet, Segment};
pub use writer::PageWriter;

// Ogg signature
pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";

// Fixed part of the page header, before the segment table
pub const OGG_HEADER_SIZE: usize = 27;

// Segment length that signals continuation
pub const OGG_SEGMENT_CONTINUED: u8 = 255;

// Page header types
pub const OGG_HEADER_TYPE_CONTINUATION: u8 = 0x01;
pub const OGG_HEADER_TYPE_BOS: u8 = 0x02; // Beginning of Stream
pub const OGG_HEADER_TYPE_EOS: u8 = 0x04; // End of Stream

pub(crate) const OGG_HEADER_TYPE_MASK: u8 =
    OGG_HEADER_TYPE_CONTINUATION | OGG_HEADER_TYPE_BOS | OGG_HEADER_TYPE_EOS;
