//! Record assembly from a token stream

use crate::error::{CsvError, Result};
use crate::options::ParseOptions;
use crate::types::{Record, Token};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds header-keyed [`Record`]s from lexer tokens
///
/// The first record of the token stream becomes the header unless one was
/// supplied in [`ParseOptions::header`]. Every following record must have
/// exactly as many fields as the header.
///
/// # Examples
///
/// ```
/// use csvstream::{Lexer, ParseOptions, RecordAssembler};
///
/// let options = ParseOptions::default();
/// let tokens = Lexer::new(&options)?.lex("name,age\nAlice,30\n")?;
/// let records = RecordAssembler::new(&options)?
///     .assemble(tokens)
///     .collect::<Result<Vec<_>, _>>()?;
///
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].get("name"), Some("Alice"));
/// # Ok::<(), csvstream::CsvError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    header: Option<Arc<[String]>>,
    fields: Vec<String>,
    data_rows: u64,
}

impl RecordAssembler {
    /// Create an assembler; an explicit empty header is a configuration error
    pub fn new(options: &ParseOptions) -> Result<Self> {
        let header = match &options.header {
            Some(h) if h.is_empty() => {
                return Err(CsvError::Configuration(
                    "explicit header must not be empty".to_string(),
                ))
            }
            Some(h) => Some(Arc::from(h.clone())),
            None => None,
        };
        Ok(RecordAssembler {
            header,
            fields: Vec::new(),
            data_rows: 0,
        })
    }

    /// Header in use, once known
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Number of data rows seen so far, including a failing one
    pub fn data_rows(&self) -> u64 {
        self.data_rows
    }

    /// Feed tokens, returning the records they complete
    pub fn push<I>(&mut self, tokens: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = Token>,
    {
        let mut out = Vec::new();
        for token in tokens {
            self.push_token(token, &mut out)?;
        }
        Ok(out)
    }

    /// Close a record left open by a token stream without a final delimiter
    pub fn flush(&mut self) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        self.flush_into(&mut out)?;
        Ok(out)
    }

    /// Lazily assemble a whole token sequence
    pub fn assemble<I>(self, tokens: I) -> Assemble<I::IntoIter>
    where
        I: IntoIterator<Item = Token>,
    {
        Assemble {
            assembler: self,
            tokens: tokens.into_iter(),
            pending: VecDeque::new(),
            error: None,
            done: false,
        }
    }

    /// Feed one token, appending any completed record to `out`
    pub fn push_token(&mut self, token: Token, out: &mut Vec<Record>) -> Result<()> {
        match token {
            Token::Field(text) => self.fields.push(text),
            Token::FieldDelimiter => {}
            Token::RecordDelimiter => self.finish_row(out)?,
        }
        Ok(())
    }

    /// Like [`flush`](Self::flush) but appends to `out`
    pub fn flush_into(&mut self, out: &mut Vec<Record>) -> Result<()> {
        self.finish_row(out)
    }

    fn finish_row(&mut self, out: &mut Vec<Record>) -> Result<()> {
        // A delimiter with nothing accumulated only terminates the previous record
        if self.fields.is_empty() {
            return Ok(());
        }
        let fields = std::mem::take(&mut self.fields);

        let header = match self.header.clone() {
            Some(header) => header,
            None => {
                debug!(columns = fields.len(), "header established");
                self.header = Some(fields.into());
                return Ok(());
            }
        };

        self.data_rows += 1;
        if fields.len() != header.len() {
            warn!(
                row = self.data_rows,
                expected = header.len(),
                actual = fields.len(),
                "row does not match header"
            );
            return Err(CsvError::RowShape {
                row: self.data_rows,
                expected: header.len(),
                actual: fields.len(),
            });
        }
        out.push(Record::new(header, fields));
        Ok(())
    }
}

/// Lazy iterator returned by [`RecordAssembler::assemble`]
///
/// Ends after the first error.
pub struct Assemble<I> {
    assembler: RecordAssembler,
    tokens: I,
    pending: VecDeque<Record>,
    error: Option<CsvError>,
    done: bool,
}

impl<I> Assemble<I> {
    /// Header in use, once the first record has been read
    pub fn header(&self) -> Option<&[String]> {
        self.assembler.header()
    }
}

impl<I> Iterator for Assemble<I>
where
    I: Iterator<Item = Token>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if let Some(e) = self.error.take() {
                return Some(Err(e));
            }
            if self.done {
                return None;
            }

            let mut out = Vec::new();
            let result = match self.tokens.next() {
                Some(token) => self.assembler.push_token(token, &mut out),
                None => {
                    self.done = true;
                    self.assembler.flush_into(&mut out)
                }
            };
            self.pending.extend(out);
            if let Err(e) = result {
                self.done = true;
                self.error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::Lexer;

    fn parse(csv: &str, options: &ParseOptions) -> Result<Vec<Record>> {
        let tokens = Lexer::new(options)?.lex(csv)?;
        RecordAssembler::new(options)?.assemble(tokens).collect()
    }

    #[test]
    fn test_basic_records() {
        let records = parse("name,age\nAlice,30\nBob,25\n", &ParseOptions::default()).unwrap();
        assert_eq!(
            records,
            vec![
                Record::from_pairs([("name", "Alice"), ("age", "30")]),
                Record::from_pairs([("name", "Bob"), ("age", "25")]),
            ]
        );
    }

    #[test]
    fn test_header_only() {
        assert!(parse("a,b", &ParseOptions::default()).unwrap().is_empty());
        assert!(parse("a,b\n", &ParseOptions::default()).unwrap().is_empty());
        assert!(parse("a,b\r\n\r\n", &ParseOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("", &ParseOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_explicit_header_treats_first_row_as_data() {
        let options = ParseOptions::new().header(["x", "y"]);
        let records = parse("1,2\n3,4", &options).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("x"), Some("1"));
        assert_eq!(records[1].get("y"), Some("4"));
    }

    #[test]
    fn test_row_shape_error() {
        let err = parse("name,age\nAlice\n", &ParseOptions::default()).unwrap_err();
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
    fn test_row_shape_error_index_counts_data_rows() {
        let err = parse("a,b\n1,2\n3,4\n5,6,7\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CsvError::RowShape {
                row: 3,
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_records_before_error_are_yielded() {
        let options = ParseOptions::default();
        let tokens = Lexer::new(&options).unwrap().lex("a\n1\n2,3\n4\n").unwrap();
        let mut iter = RecordAssembler::new(&options).unwrap().assemble(tokens);
        assert_eq!(iter.next().unwrap().unwrap().get("a"), Some("1"));
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_empty_explicit_header() {
        let options = ParseOptions::new().header(Vec::<String>::new());
        assert!(matches!(
            RecordAssembler::new(&options),
            Err(CsvError::Configuration(_))
        ));
    }

    #[test]
    fn test_duplicate_header_names() {
        let records = parse("a,a\n1,2\n", &ParseOptions::default()).unwrap();
        assert_eq!(records[0].values(), &["1".to_string(), "2".to_string()]);
        assert_eq!(records[0].get("a"), Some("1"));
    }

    #[test]
    fn test_push_and_flush() {
        let mut assembler = RecordAssembler::new(&ParseOptions::default()).unwrap();
        let records = assembler
            .push([
                Token::field("k"),
                Token::RecordDelimiter,
                Token::field("v"),
            ])
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(assembler.header(), Some(&["k".to_string()][..]));

        let records = assembler.flush().unwrap();
        assert_eq!(records, vec![Record::from_pairs([("k", "v")])]);
        assert!(assembler.flush().unwrap().is_empty());
    }

    #[test]
    fn test_bare_record_delimiters_are_ignored() {
        let mut assembler = RecordAssembler::new(&ParseOptions::default()).unwrap();
        let records = assembler
            .push([
                Token::RecordDelimiter,
                Token::field("h"),
                Token::RecordDelimiter,
                Token::RecordDelimiter,
            ])
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(assembler.data_rows(), 0);
    }

    #[test]
    fn test_quoted_fields_in_records() {
        let options = ParseOptions::new().delimiter(';');
        let records = parse("a;b\n\"x;y\";z\n", &options).unwrap();
        assert_eq!(records, vec![Record::from_pairs([("a", "x;y"), ("b", "z")])]);
    }
}
