//! Parsing entry points
//!
//! Synchronous functions run the lexer and assembler directly over
//! in-memory input. Streaming functions chain [`Stage`]s and return a lazy,
//! cancellable stream of records.

use crate::csv::{Lexer, RecordAssembler};
use crate::decode::Decoder;
use crate::error::{CsvError, Result};
use crate::options::{DecodeOptions, ParseOptions};
use crate::source::Response;
use crate::stage::{Stage, StageExt};
use crate::types::{Record, Token};
use futures::Stream;
use std::collections::VecDeque;

/// Text is fed to the lexer in slices of about this many bytes
const SLICE_BYTES: usize = 64 * 1024;

/// Records streamed from text chunks
pub type RecordStream<S> = Stage<Stage<S, Lexer>, RecordAssembler>;

/// Records streamed from byte chunks
pub type ByteRecordStream<S> = Stage<Stage<Stage<S, Decoder>, Lexer>, RecordAssembler>;

/// Synchronous lexer + assembler pair
///
/// Used by the one-shot entry points and by [`CsvReader`](crate::CsvReader).
#[derive(Debug, Clone)]
pub struct TextPipeline {
    lexer: Lexer,
    assembler: RecordAssembler,
    tokens: Vec<Token>,
}

impl TextPipeline {
    /// Build both components from `options`
    pub fn new(options: &ParseOptions) -> Result<Self> {
        Ok(TextPipeline {
            lexer: Lexer::new(options)?,
            assembler: RecordAssembler::new(options)?,
            tokens: Vec::new(),
        })
    }

    /// Feed a text chunk, appending completed records to `out`
    ///
    /// Records completed before an error are appended before it is returned.
    pub fn push(&mut self, chunk: &str, out: &mut Vec<Record>) -> Result<()> {
        self.tokens.clear();
        let lexed = self.lexer.push_into(chunk, &mut self.tokens);
        for token in self.tokens.drain(..) {
            self.assembler.push_token(token, out)?;
        }
        lexed
    }

    /// End of input: close the last record
    pub fn finish(&mut self, out: &mut Vec<Record>) -> Result<()> {
        self.tokens.clear();
        self.lexer.flush_into(&mut self.tokens)?;
        for token in self.tokens.drain(..) {
            self.assembler.push_token(token, out)?;
        }
        self.assembler.flush_into(out)
    }

    /// Header in use, once known
    pub fn header(&self) -> Option<&[String]> {
        self.assembler.header()
    }
}

/// Lazy iterator over the records of an in-memory string
///
/// Ends after the first error.
#[derive(Debug)]
pub struct Records<'a> {
    pipeline: TextPipeline,
    rest: &'a str,
    pending: VecDeque<Record>,
    error: Option<CsvError>,
    finished: bool,
}

impl Records<'_> {
    /// Header in use, once the first record has been read
    pub fn header(&self) -> Option<&[String]> {
        self.pipeline.header()
    }
}

/// Split `text` at about [`SLICE_BYTES`], on a char boundary
fn split_slice(text: &str) -> (&str, &str) {
    let mut end = text.len().min(SLICE_BYTES);
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text.split_at(end)
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if let Some(e) = self.error.take() {
                return Some(Err(e));
            }
            if self.finished {
                return None;
            }

            let mut out = Vec::new();
            let result = if self.rest.is_empty() {
                self.finished = true;
                self.pipeline.finish(&mut out)
            } else {
                let rest: &'a str = self.rest;
                let (slice, tail) = split_slice(rest);
                self.rest = tail;
                self.pipeline.push(slice, &mut out)
            };
            self.pending.extend(out);
            if let Err(e) = result {
                self.finished = true;
                self.error = Some(e);
            }
        }
    }
}

/// Parse a complete string into records
///
/// # Examples
///
/// ```
/// use csvstream::{parse_string, ParseOptions};
///
/// let records = parse_string("name,age\nAlice,30\nBob,25\n", &ParseOptions::default())?;
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1].get("name"), Some("Bob"));
/// # Ok::<(), csvstream::CsvError>(())
/// ```
pub fn parse_string(csv: &str, options: &ParseOptions) -> Result<Vec<Record>> {
    parse_string_iter(csv, options)?.collect()
}

/// Lazily parse a complete string
///
/// Configuration errors are returned immediately; data errors are yielded
/// by the iterator at the row where they occur.
pub fn parse_string_iter<'a>(csv: &'a str, options: &ParseOptions) -> Result<Records<'a>> {
    Ok(Records {
        pipeline: TextPipeline::new(options)?,
        rest: csv,
        pending: VecDeque::new(),
        error: None,
        finished: false,
    })
}

/// Parse a stream of text chunks
///
/// Chunk boundaries may fall anywhere, including inside quoted fields and
/// between CR and LF.
pub fn parse_string_stream<S>(chunks: S, options: &ParseOptions) -> Result<RecordStream<S>>
where
    S: Stream<Item = Result<String>> + Unpin,
{
    Ok(chunks
        .through(Lexer::new(options)?)
        .through(RecordAssembler::new(options)?))
}

/// Decode and parse a complete byte buffer
pub fn parse_binary(
    bytes: &[u8],
    options: &ParseOptions,
    decode: &DecodeOptions,
) -> Result<Vec<Record>> {
    // Validate parse options before decoding a potentially large buffer
    options.validate()?;
    let text = Decoder::decode_all(decode, bytes)?;
    parse_string(&text, options)
}

/// Decode and parse a stream of byte chunks
pub fn parse_byte_stream<S>(
    chunks: S,
    options: &ParseOptions,
    decode: &DecodeOptions,
) -> Result<ByteRecordStream<S>>
where
    S: Stream<Item = Result<Vec<u8>>> + Unpin,
{
    Ok(chunks
        .through(Decoder::new(decode)?)
        .through(Lexer::new(options)?)
        .through(RecordAssembler::new(options)?))
}

/// Validate a response and parse its body
///
/// Validation failures are returned before any chunk of the body is read.
pub fn parse_response<S>(
    response: Response<S>,
    options: &ParseOptions,
    decode: DecodeOptions,
) -> Result<ByteRecordStream<S>>
where
    S: Stream<Item = Result<Vec<u8>>> + Unpin,
{
    let (body, decode) = response.into_validated(decode)?;
    parse_byte_stream(body, options, &decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{from_byte_chunks, from_str_chunks};
    use futures::StreamExt;

    fn pairs(records: &[Record]) -> Vec<Vec<(String, String)>> {
        records
            .iter()
            .map(|r| r.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .collect()
    }

    #[test]
    fn test_parse_string_basic() {
        let records = parse_string("name,age\nAlice,30\nBob,25\n", &ParseOptions::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), Some("Alice"));
        assert_eq!(records[0].get("age"), Some("30"));
        assert_eq!(records[1].get("name"), Some("Bob"));
        assert_eq!(records[1].get("age"), Some("25"));
    }

    #[test]
    fn test_parse_string_custom_delimiter() {
        let options = ParseOptions::new().delimiter(';');
        let records = parse_string("a;b\n\"x;y\";z\n", &options).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("a"), Some("x;y"));
        assert_eq!(records[0].get("b"), Some("z"));
    }

    #[test]
    fn test_trailing_blank_line_ignored() {
        let options = ParseOptions::default();
        let plain = parse_string("a,b\n1,2\n", &options).unwrap();
        let blank = parse_string("a,b\n1,2\n\n", &options).unwrap();
        let unterminated = parse_string("a,b\n1,2", &options).unwrap();
        assert_eq!(pairs(&plain), pairs(&blank));
        assert_eq!(pairs(&plain), pairs(&unterminated));
    }

    #[test]
    fn test_header_only() {
        let options = ParseOptions::default();
        assert!(parse_string("a,b\n", &options).unwrap().is_empty());
        assert!(parse_string("a,b\n\n", &options).unwrap().is_empty());
        assert!(parse_string("", &options).unwrap().is_empty());
    }

    #[test]
    fn test_row_shape_error() {
        let err = parse_string("name,age\nAlice\n", &ParseOptions::default()).unwrap_err();
        match err {
            CsvError::RowShape {
                row,
                expected,
                actual,
            } => {
                assert_eq!(row, 1);
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_iter_yields_records_before_error() {
        let mut iter = parse_string_iter("a,b\n1,2\n3,4\n5\n6,7\n", &ParseOptions::default()).unwrap();
        assert_eq!(iter.next().unwrap().unwrap().get("a"), Some("1"));
        assert_eq!(iter.next().unwrap().unwrap().get("a"), Some("3"));
        let err = iter.next().unwrap().unwrap_err();
        assert!(err.is_row_shape());
        assert!(iter.next().is_none());
        assert_eq!(iter.header(), Some(&["a".to_string(), "b".to_string()][..]));
    }

    #[test]
    fn test_iter_spans_slices() {
        let mut csv = String::from("id,text\n");
        for i in 0..5000 {
            csv.push_str(&format!("{i},\"line {i}, with ü and \"\"quotes\"\"\"\n"));
        }
        assert!(csv.len() > SLICE_BYTES);
        let records = parse_string(&csv, &ParseOptions::default()).unwrap();
        assert_eq!(records.len(), 5000);
        assert_eq!(records[4999].get("id"), Some("4999"));
        assert_eq!(
            records[4999].get("text"),
            Some("line 4999, with ü and \"quotes\"")
        );
    }

    #[test]
    fn test_configuration_errors() {
        let same = ParseOptions::new().delimiter('"');
        assert!(matches!(
            parse_string("a", &same),
            Err(CsvError::Configuration(_))
        ));
        let empty = ParseOptions::new().header(Vec::<String>::new());
        assert!(matches!(
            parse_string_iter("a", &empty),
            Err(CsvError::Configuration(_))
        ));
    }

    #[test]
    fn test_explicit_header_treats_first_row_as_data() {
        let options = ParseOptions::new().header(["x", "y"]);
        let records = parse_string("1,2\n3,4\n", &options).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("x"), Some("1"));
    }

    #[test]
    fn test_parse_binary() {
        let options = ParseOptions::default();
        let decode = DecodeOptions::new().charset("windows-1252");
        let records = parse_binary(b"name\ncaf\xE9\n", &options, &decode).unwrap();
        assert_eq!(records[0].get("name"), Some("café"));
    }

    #[test]
    fn test_parse_binary_fatal_decode() {
        let decode = DecodeOptions::new().fatal(true);
        let err = parse_binary(b"a\n\xFF\n", &ParseOptions::default(), &decode).unwrap_err();
        assert!(matches!(err, CsvError::Decoding(_)));
    }

    #[tokio::test]
    async fn test_string_stream_split_chunks() {
        let chunks = from_str_chunks(["na", "me,age\r", "\nAl", "ice,\"3", "0\"\r\nBob,25"]);
        let records: Vec<Record> = parse_string_stream(chunks, &ParseOptions::default())
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("age"), Some("30"));
        assert_eq!(records[1].get("name"), Some("Bob"));
    }

    #[tokio::test]
    async fn test_byte_stream_split_multibyte() {
        let bytes = "k,v\nあ,い\n".as_bytes();
        let chunks = from_byte_chunks(bytes.iter().map(|b| vec![*b]));
        let records: Vec<Record> =
            parse_byte_stream(chunks, &ParseOptions::default(), &DecodeOptions::new())
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
                .await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("k"), Some("あ"));
        assert_eq!(records[0].get("v"), Some("い"));
    }

    #[tokio::test]
    async fn test_response_charset_from_content_type() {
        let body = from_byte_chunks([vec![0x82, 0xA0, b'\n', b'x', b'\n']]);
        let response = Response::new(Some(body)).content_type("text/csv; charset=Shift_JIS");
        let records: Vec<Record> = parse_response(response, &ParseOptions::default(), DecodeOptions::new())
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("あ"), Some("x"));
    }

    #[test]
    fn test_response_rejected_before_body_read() {
        let body = from_byte_chunks([b"a\n1\n".to_vec()]);
        let response = Response::new(Some(body)).content_type("text/plain");
        let err = parse_response(response, &ParseOptions::default(), DecodeOptions::new())
            .err()
            .unwrap();
        assert!(matches!(err, CsvError::SourceValidation(_)));
    }
}
