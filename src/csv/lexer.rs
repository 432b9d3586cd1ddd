//! Incremental CSV tokenizer
//!
//! The lexer is a resumable state machine: text may be pushed in chunks split
//! at any character (inside a quoted field, between the two quotes of an
//! escaped quote, between CR and LF) and the token output is the same as if
//! the whole input had been pushed at once.

use crate::error::{CsvError, Result};
use crate::options::ParseOptions;
use crate::types::{Position, Token};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Start of input, or just after a record delimiter
    RecordStart,
    /// Just after a field delimiter
    FieldStart,
    /// Inside a field that did not start with a quote
    Unquoted,
    /// Inside an open quoted field
    Quoted,
    /// A quote was seen inside a quoted field: either an escape or the closing quote
    QuoteSeen,
}

/// Incremental CSV tokenizer
///
/// # Examples
///
/// ```
/// use csvstream::{Lexer, ParseOptions, Token};
///
/// let mut lexer = Lexer::new(&ParseOptions::default())?;
/// let mut tokens = lexer.push("a,\"b")?;
/// tokens.extend(lexer.push("\"\"c\"\r")?);
/// tokens.extend(lexer.push("\n")?);
/// tokens.extend(lexer.flush()?);
///
/// assert_eq!(
///     tokens,
///     vec![
///         Token::field("a"),
///         Token::FieldDelimiter,
///         Token::field("b\"c"),
///         Token::RecordDelimiter,
///     ]
/// );
/// # Ok::<(), csvstream::CsvError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Lexer {
    // Configuration
    delimiter: char,
    quotation: char,
    strict: bool,
    max_field_bytes: usize,

    // Resumable state
    state: State,
    buffer: String,
    skip_lf: bool,
    blank_lines: usize,
    seen_record: bool,

    // Diagnostics
    position: Position,
    after_cr: bool,
}

impl Lexer {
    /// Create a lexer, rejecting invalid delimiter/quotation combinations
    pub fn new(options: &ParseOptions) -> Result<Self> {
        options.validate()?;
        Ok(Lexer {
            delimiter: options.delimiter,
            quotation: options.quotation,
            strict: options.strict_quotes,
            max_field_bytes: options.max_field_bytes,
            state: State::RecordStart,
            buffer: String::new(),
            skip_lf: false,
            blank_lines: 0,
            // With an explicit header the first line is already data
            seen_record: options.header.is_some(),
            position: Position::start(),
            after_cr: false,
        })
    }

    /// Tokenize the next chunk
    ///
    /// Text of a field that is still open at the end of the chunk is kept
    /// until a later `push` or `flush` completes it.
    pub fn push(&mut self, chunk: &str) -> Result<Vec<Token>> {
        let mut out = Vec::new();
        self.push_into(chunk, &mut out)?;
        Ok(out)
    }

    /// Finish the input, closing any open field and record
    ///
    /// Calling `flush` twice in a row yields no tokens the second time.
    pub fn flush(&mut self) -> Result<Vec<Token>> {
        let mut out = Vec::new();
        self.flush_into(&mut out)?;
        Ok(out)
    }

    /// Tokenize a complete input
    pub fn lex(&mut self, csv: &str) -> Result<Vec<Token>> {
        let mut out = Vec::new();
        self.push_into(csv, &mut out)?;
        self.flush_into(&mut out)?;
        Ok(out)
    }

    /// Position of the next character to be consumed
    pub fn position(&self) -> Position {
        self.position
    }

    /// True while an opened quoted field has not been closed
    pub fn is_in_quoted_field(&self) -> bool {
        matches!(self.state, State::Quoted | State::QuoteSeen)
    }

    /// Like [`push`](Self::push) but appends to `out`
    ///
    /// Tokens produced before an error stay in `out`.
    pub fn push_into(&mut self, chunk: &str, out: &mut Vec<Token>) -> Result<()> {
        let before = out.len();
        for ch in chunk.chars() {
            self.step(ch, out)?;
            self.advance(ch);
        }
        trace!(
            bytes = chunk.len(),
            tokens = out.len() - before,
            "lexed chunk"
        );
        Ok(())
    }

    /// Like [`flush`](Self::flush) but appends to `out`
    pub fn flush_into(&mut self, out: &mut Vec<Token>) -> Result<()> {
        match self.state {
            // Blank lines that were never followed by content are dropped
            State::RecordStart => {}
            State::FieldStart => {
                out.push(Token::Field(String::new()));
                out.push(Token::RecordDelimiter);
            }
            State::Unquoted | State::QuoteSeen => self.emit_record_end(out),
            State::Quoted => {
                if self.strict {
                    return Err(CsvError::MalformedQuote {
                        position: self.position,
                        message: "unexpected end of input inside quoted field".to_string(),
                    });
                }
                self.emit_record_end(out);
            }
        }
        self.state = State::RecordStart;
        self.buffer.clear();
        self.blank_lines = 0;
        self.skip_lf = false;
        Ok(())
    }

    fn step(&mut self, ch: char, out: &mut Vec<Token>) -> Result<()> {
        if self.skip_lf {
            self.skip_lf = false;
            if ch == '\n' {
                return Ok(());
            }
        }

        match self.state {
            State::RecordStart => {
                if is_line_break(ch) {
                    // Blank lines before an inferred header are skipped
                    if self.seen_record {
                        self.blank_lines += 1;
                    }
                    self.skip_lf = ch == '\r';
                    return Ok(());
                }
                self.seen_record = true;
                for _ in 0..std::mem::take(&mut self.blank_lines) {
                    out.push(Token::Field(String::new()));
                    out.push(Token::RecordDelimiter);
                }
                self.state = State::FieldStart;
                self.step_field_start(ch, out)
            }
            State::FieldStart => self.step_field_start(ch, out),
            State::Unquoted => {
                if ch == self.delimiter {
                    self.emit_field_end(out);
                } else if is_line_break(ch) {
                    self.emit_record_end(out);
                    self.skip_lf = ch == '\r';
                } else {
                    self.append(ch)?;
                }
                Ok(())
            }
            State::Quoted => {
                if ch == self.quotation {
                    self.state = State::QuoteSeen;
                    Ok(())
                } else {
                    self.append(ch)
                }
            }
            State::QuoteSeen => {
                if ch == self.quotation {
                    self.state = State::Quoted;
                    self.append(ch)
                } else if ch == self.delimiter {
                    self.emit_field_end(out);
                    Ok(())
                } else if is_line_break(ch) {
                    self.emit_record_end(out);
                    self.skip_lf = ch == '\r';
                    Ok(())
                } else if self.strict {
                    Err(CsvError::MalformedQuote {
                        position: self.position,
                        message: format!("unexpected {:?} after closing quote", ch),
                    })
                } else {
                    self.state = State::Unquoted;
                    self.append(ch)
                }
            }
        }
    }

    fn step_field_start(&mut self, ch: char, out: &mut Vec<Token>) -> Result<()> {
        if ch == self.quotation {
            self.state = State::Quoted;
        } else if ch == self.delimiter {
            out.push(Token::Field(String::new()));
            out.push(Token::FieldDelimiter);
        } else if is_line_break(ch) {
            out.push(Token::Field(String::new()));
            out.push(Token::RecordDelimiter);
            self.state = State::RecordStart;
            self.skip_lf = ch == '\r';
        } else {
            self.state = State::Unquoted;
            self.append(ch)?;
        }
        Ok(())
    }

    fn append(&mut self, ch: char) -> Result<()> {
        self.buffer.push(ch);
        if self.buffer.len() > self.max_field_bytes {
            return Err(CsvError::FieldTooLarge {
                position: self.position,
                limit: self.max_field_bytes,
            });
        }
        Ok(())
    }

    fn emit_field_end(&mut self, out: &mut Vec<Token>) {
        out.push(Token::Field(std::mem::take(&mut self.buffer)));
        out.push(Token::FieldDelimiter);
        self.state = State::FieldStart;
    }

    fn emit_record_end(&mut self, out: &mut Vec<Token>) {
        out.push(Token::Field(std::mem::take(&mut self.buffer)));
        out.push(Token::RecordDelimiter);
        self.state = State::RecordStart;
    }

    fn advance(&mut self, ch: char) {
        self.position.offset += 1;
        match ch {
            '\r' => {
                self.position.line += 1;
                self.position.column = 1;
            }
            // Second half of CRLF stays on the line the CR opened
            '\n' if self.after_cr => {}
            '\n' => {
                self.position.line += 1;
                self.position.column = 1;
            }
            _ => self.position.column += 1,
        }
        self.after_cr = ch == '\r';
    }
}

fn is_line_break(ch: char) -> bool {
    ch == '\n' || ch == '\r'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(csv: &str) -> Vec<Token> {
        Lexer::new(&ParseOptions::default())
            .unwrap()
            .lex(csv)
            .unwrap()
    }

    fn lex_chunks(chunks: &[&str]) -> Vec<Token> {
        let mut lexer = Lexer::new(&ParseOptions::default()).unwrap();
        let mut tokens = Vec::new();
        for chunk in chunks {
            tokens.extend(lexer.push(chunk).unwrap());
        }
        tokens.extend(lexer.flush().unwrap());
        tokens
    }

    fn f(text: &str) -> Token {
        Token::field(text)
    }

    use crate::types::Token::{FieldDelimiter as FD, RecordDelimiter as RD};

    #[test]
    fn test_simple() {
        assert_eq!(lex("a,b\n1,2\n"), vec![f("a"), FD, f("b"), RD, f("1"), FD, f("2"), RD]);
    }

    #[test]
    fn test_final_record_without_newline() {
        assert_eq!(lex("a,b\n1,2"), lex("a,b\n1,2\n"));
    }

    #[test]
    fn test_empty_input() {
        assert!(lex("").is_empty());
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(lex(",,\n"), vec![f(""), FD, f(""), FD, f(""), RD]);
        assert_eq!(lex("a,"), vec![f("a"), FD, f(""), RD]);
    }

    #[test]
    fn test_line_endings_collapse() {
        let expected = vec![f("a"), RD, f("b"), RD];
        assert_eq!(lex("a\nb\n"), expected);
        assert_eq!(lex("a\rb\r"), expected);
        assert_eq!(lex("a\r\nb\r\n"), expected);
    }

    #[test]
    fn test_quoted_content_preserved() {
        assert_eq!(
            lex("\"x,y\r\nz\"\"w\",q\n"),
            vec![f("x,y\r\nz\"w"), FD, f("q"), RD]
        );
    }

    #[test]
    fn test_quoted_empty() {
        assert_eq!(lex(r#""","""#), vec![f(""), FD, f(""), RD]);
    }

    #[test]
    fn test_only_escaped_quote() {
        assert_eq!(lex(r#""""""#), vec![f("\""), RD]);
    }

    #[test]
    fn test_trailing_blank_lines_dropped() {
        assert_eq!(lex("a\n\n\n"), vec![f("a"), RD]);
        assert_eq!(lex("a\r\n\r\n"), vec![f("a"), RD]);
    }

    #[test]
    fn test_leading_blank_lines_skipped() {
        assert_eq!(lex("\n\r\na\n"), vec![f("a"), RD]);
        assert_eq!(lex_chunks(&["\r", "\n\n", "a"]), vec![f("a"), RD]);
    }

    #[test]
    fn test_leading_blank_line_kept_with_explicit_header() {
        let options = ParseOptions::new().header(["c"]);
        let tokens = Lexer::new(&options).unwrap().lex("\ny\n").unwrap();
        assert_eq!(tokens, vec![f(""), RD, f("y"), RD]);

        // Trailing blank lines are still dropped
        let tokens = Lexer::new(&options).unwrap().lex("\r\n").unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_inner_blank_line_is_empty_record() {
        assert_eq!(lex("a\n\nb"), vec![f("a"), RD, f(""), RD, f("b"), RD]);
    }

    #[test]
    fn test_lenient_text_after_closing_quote() {
        assert_eq!(lex("\"ab\"cd,e"), vec![f("abcd"), FD, f("e"), RD]);
    }

    #[test]
    fn test_strict_text_after_closing_quote() {
        let mut lexer = Lexer::new(&ParseOptions::new().strict_quotes(true)).unwrap();
        let err = lexer.lex("x\n\"ab\"cd").unwrap_err();
        match err {
            CsvError::MalformedQuote { position, .. } => {
                assert_eq!(position.line, 2);
                assert_eq!(position.column, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(lex("\"abc"), vec![f("abc"), RD]);

        let mut lexer = Lexer::new(&ParseOptions::new().strict_quotes(true)).unwrap();
        lexer.push("\"abc").unwrap();
        assert!(matches!(
            lexer.flush(),
            Err(CsvError::MalformedQuote { .. })
        ));
    }

    #[test]
    fn test_custom_delimiter_and_quotation() {
        let options = ParseOptions::new().delimiter(';').quotation('$');
        let tokens = Lexer::new(&options).unwrap().lex("$a;b$;c$$\n").unwrap();
        // `c$$` is unquoted text, so the quotation characters stay literal
        assert_eq!(tokens, vec![f("a;b"), FD, f("c$$"), RD]);
    }

    #[test]
    fn test_same_delimiter_and_quotation_rejected() {
        let options = ParseOptions::new().delimiter('"');
        assert!(matches!(
            Lexer::new(&options),
            Err(CsvError::Configuration(_))
        ));
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut lexer = Lexer::new(&ParseOptions::default()).unwrap();
        lexer.push("a,b").unwrap();
        assert_eq!(lexer.flush().unwrap(), vec![f("a"), FD, f("b"), RD]);
        assert!(lexer.flush().unwrap().is_empty());
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        assert_eq!(lex_chunks(&["a\r", "\nb"]), lex("a\r\nb"));
        assert_eq!(lex_chunks(&["a\r", "", "\n", "b"]), lex("a\r\nb"));
    }

    #[test]
    fn test_escaped_quote_split_across_chunks() {
        assert_eq!(lex_chunks(&["\"a\"", "\"b\""]), vec![f("a\"b"), RD]);
    }

    #[test]
    fn test_every_two_way_split() {
        let inputs = [
            "name,age\r\n\"Al\"\"ice\",30\r\n\"x\ny\",\r\n",
            "\"a,b\"\r\r\n\n,\"\"\"\"\n",
            "a\"b,\"c\"d\re",
        ];
        for input in inputs {
            let expected = lex(input);
            let boundaries: Vec<usize> = input
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(input.len()))
                .collect();
            for &i in &boundaries {
                assert_eq!(
                    lex_chunks(&[&input[..i], &input[i..]]),
                    expected,
                    "split at {} of {:?}",
                    i,
                    input
                );
            }
        }
    }

    #[test]
    fn test_char_by_char() {
        let input = "h1,h2\r\n\"multi\r\nline\",\"q\"\"q\"\r\nlast,row";
        let chunks: Vec<String> = input.chars().map(String::from).collect();
        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        assert_eq!(lex_chunks(&refs), lex(input));
    }

    #[test]
    fn test_position_tracking() {
        let mut lexer = Lexer::new(&ParseOptions::default()).unwrap();
        lexer.push("ab\r\ncd\ne").unwrap();
        let pos = lexer.position();
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 2);
        assert_eq!(pos.offset, 8);
    }

    #[test]
    fn test_in_quoted_field_flag() {
        let mut lexer = Lexer::new(&ParseOptions::default()).unwrap();
        lexer.push("\"abc").unwrap();
        assert!(lexer.is_in_quoted_field());
        lexer.push("\",").unwrap();
        assert!(!lexer.is_in_quoted_field());
    }

    #[test]
    fn test_field_too_large() {
        let mut lexer = Lexer::new(&ParseOptions::new().max_field_bytes(4)).unwrap();
        assert!(lexer.push("abcd,").is_ok());
        assert!(matches!(
            lexer.push("abcde"),
            Err(CsvError::FieldTooLarge { limit: 4, .. })
        ));
    }

    #[test]
    fn test_tokens_before_error_are_kept() {
        let mut lexer = Lexer::new(&ParseOptions::new().strict_quotes(true)).unwrap();
        let mut out = Vec::new();
        let result = lexer.push_into("a,b\n\"c\"d", &mut out);
        assert!(result.is_err());
        assert_eq!(out, vec![f("a"), FD, f("b"), RD]);
    }
}
