// Tag text decoding

use encoding_rs::{UTF_8, WINDOWS_1252};

/// Decode Vorbis comment text.
///
/// Comments are specified as UTF-8. Some encoders write Latin-1 instead, so
/// byte strings that are not valid UTF-8 are decoded as Windows-1252.
pub fn decode_tag_text(data: &[u8]) -> String {
    match UTF_8.decode_without_bom_handling_and_without_replacement(data) {
        Some(text) => text.into_owned(),
        None => WINDOWS_1252.decode(data).0.into_owned(),
    }
}
