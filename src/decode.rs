//! Incremental charset decoding of byte chunks into text
//!
//! Multi-byte sequences may be split across chunks; the decoder carries the
//! partial sequence over to the next call.

use crate::error::{CsvError, Result};
use crate::options::DecodeOptions;
use crate::stage::Incremental;
use encoding_rs::{CoderResult, DecoderResult, Encoding};
use std::fmt;
use tracing::debug;

/// Streaming byte-to-text decoder
pub struct Decoder {
    inner: encoding_rs::Decoder,
    encoding: &'static Encoding,
    fatal: bool,
    finished: bool,
    offset: u64,
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("encoding", &self.encoding.name())
            .field("fatal", &self.fatal)
            .field("finished", &self.finished)
            .field("offset", &self.offset)
            .finish()
    }
}

impl Decoder {
    /// Create a decoder for `options.charset` (a WHATWG encoding label)
    ///
    /// # Examples
    ///
    /// ```
    /// use csvstream::{DecodeOptions, decode::Decoder};
    ///
    /// let mut decoder = Decoder::new(&DecodeOptions::new())?;
    /// let mut text = decoder.decode(&[b'a', 0xC3], false)?;
    /// text.push_str(&decoder.decode(&[0xA9], true)?);
    /// assert_eq!(text, "aé");
    /// # Ok::<(), csvstream::CsvError>(())
    /// ```
    pub fn new(options: &DecodeOptions) -> Result<Self> {
        let encoding = Encoding::for_label(options.charset.trim().as_bytes()).ok_or_else(|| {
            CsvError::Configuration(format!("unsupported charset: {}", options.charset))
        })?;
        let inner = if options.ignore_bom {
            encoding.new_decoder_without_bom_handling()
        } else {
            encoding.new_decoder_with_bom_removal()
        };
        debug!(charset = encoding.name(), fatal = options.fatal, "decoder created");

        Ok(Decoder {
            inner,
            encoding,
            fatal: options.fatal,
            finished: false,
            offset: 0,
        })
    }

    /// Encoding selected from the charset label
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Decode one chunk; pass `last = true` with the final chunk
    ///
    /// After the last chunk has been decoded further calls return an empty
    /// string.
    pub fn decode(&mut self, bytes: &[u8], last: bool) -> Result<String> {
        if self.finished {
            return Ok(String::new());
        }
        self.finished = last;

        let mut out = String::new();
        let mut src = bytes;
        loop {
            let (done, read) = if self.fatal {
                let needed = self
                    .inner
                    .max_utf8_buffer_length_without_replacement(src.len())
                    .unwrap_or(src.len().saturating_mul(3));
                out.reserve(needed);
                let (result, read) = self
                    .inner
                    .decode_to_string_without_replacement(src, &mut out, last);
                match result {
                    DecoderResult::InputEmpty => (true, read),
                    DecoderResult::OutputFull => (false, read),
                    DecoderResult::Malformed(_, _) => {
                        self.finished = true;
                        return Err(CsvError::Decoding(format!(
                            "invalid {} byte sequence near byte {}",
                            self.encoding.name(),
                            self.offset + read as u64
                        )));
                    }
                }
            } else {
                let needed = self
                    .inner
                    .max_utf8_buffer_length(src.len())
                    .unwrap_or(src.len().saturating_mul(3));
                out.reserve(needed);
                let (result, read, _) = self.inner.decode_to_string(src, &mut out, last);
                (result == CoderResult::InputEmpty, read)
            };
            self.offset += read as u64;
            src = &src[read..];
            if done {
                return Ok(out);
            }
        }
    }

    /// Decode a complete buffer in one call
    pub fn decode_all(options: &DecodeOptions, bytes: &[u8]) -> Result<String> {
        Decoder::new(options)?.decode(bytes, true)
    }
}

impl Incremental for Decoder {
    type Input = Vec<u8>;
    type Output = String;

    fn feed(&mut self, input: Vec<u8>, out: &mut Vec<String>) -> Result<()> {
        let text = self.decode(&input, false)?;
        if !text.is_empty() {
            out.push(text);
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<String>) -> Result<()> {
        let text = self.decode(&[], true)?;
        if !text.is_empty() {
            out.push(text);
        }
        Ok(())
    }
}
