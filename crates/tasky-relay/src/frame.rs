/// Prefix written in front of every relayed line.
pub const FRAME_PREFIX: &str = "PING: ";

/// Builds the on-wire frame: `PING: <line>`, ASCII, no length prefix, no terminator.
///
/// Characters outside 7-bit ASCII are replaced with `?`.
pub fn encode_frame(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_PREFIX.len() + line.len());
    out.extend_from_slice(FRAME_PREFIX.as_bytes());
    out.extend(encode_ascii(line));
    out
}

/// Encodes `text` as ASCII, replacing anything outside 7-bit ASCII with `?`.
pub fn encode_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

/// Decodes a response chunk as ASCII, replacing non-ASCII bytes with `?`.
pub fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}
