//! Incremental UTF-8 decoding for byte-chunked sources.
//!
//! Network reads can cut a multi-byte code point anywhere; the partial
//! trailing sequence is held until the next chunk instead of being mangled.

/// Streaming-safe UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next byte chunk, returning all complete text available.
    ///
    /// Invalid sequences are replaced with U+FFFD; an incomplete trailing
    /// sequence is buffered for the next call.
    pub fn decode(&mut self, input: &[u8]) -> String {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(input);

        let mut out = String::with_capacity(data.len());
        let mut rest: &[u8] = &data;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            // Incomplete trailing sequence: hold for the next chunk.
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// End-of-stream flush. A still-incomplete trailing sequence decodes as
    /// a single replacement character.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_ascii_through() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"hello"), "hello");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn holds_split_multibyte_sequence() {
        // "你" is e4 bd a0
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[0xe4, 0xbd]), "");
        assert_eq!(decoder.decode(&[0xa0, b'!']), "你!");
    }

    #[test]
    fn replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[test]
    fn finish_flushes_dangling_partial() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[0xe4]), "");
        assert_eq!(decoder.finish(), "\u{fffd}");
        assert_eq!(decoder.finish(), "");
    }
}
