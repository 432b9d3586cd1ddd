//! Parser and decoder configuration

use crate::error::{CsvError, Result};

/// Default upper bound for the text buffered for a single field (10 MiB)
pub const DEFAULT_MAX_FIELD_BYTES: usize = 10 * 1024 * 1024;

/// Options shared by the lexer and the record assembler
///
/// # Examples
///
/// ```
/// use csvstream::ParseOptions;
///
/// let options = ParseOptions::new()
///     .delimiter(';')
///     .header(["id", "name"]);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    /// Field separator
    pub delimiter: char,
    /// Quotation character
    pub quotation: char,
    /// Explicit header; when `None` the first record is used
    pub header: Option<Vec<String>>,
    /// Reject text after a closing quote and unterminated quoted fields
    pub strict_quotes: bool,
    /// Largest field (in UTF-8 bytes) the lexer will buffer
    pub max_field_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            delimiter: ',',
            quotation: '"',
            header: None,
            strict_quotes: false,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
        }
    }
}

impl ParseOptions {
    /// Comma-delimited, double-quoted, header inferred
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field delimiter (builder pattern)
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quotation character (builder pattern)
    pub fn quotation(mut self, quotation: char) -> Self {
        self.quotation = quotation;
        self
    }

    /// Supply the header instead of reading it from the first record
    pub fn header<I, S>(mut self, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = Some(header.into_iter().map(Into::into).collect());
        self
    }

    /// Toggle strict quote handling (builder pattern)
    pub fn strict_quotes(mut self, strict: bool) -> Self {
        self.strict_quotes = strict;
        self
    }

    /// Set the per-field buffer limit (builder pattern)
    pub fn max_field_bytes(mut self, limit: usize) -> Self {
        self.max_field_bytes = limit;
        self
    }

    /// Check the option combination
    pub fn validate(&self) -> Result<()> {
        if self.delimiter == self.quotation {
            return Err(CsvError::Configuration(format!(
                "delimiter and quotation must differ, both are {:?}",
                self.delimiter
            )));
        }
        for (name, ch) in [("delimiter", self.delimiter), ("quotation", self.quotation)] {
            if ch == '\r' || ch == '\n' {
                return Err(CsvError::Configuration(format!(
                    "{} must not be a line break character",
                    name
                )));
            }
        }
        if matches!(&self.header, Some(h) if h.is_empty()) {
            return Err(CsvError::Configuration(
                "explicit header must not be empty".to_string(),
            ));
        }
        if self.max_field_bytes == 0 {
            return Err(CsvError::Configuration(
                "max_field_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for turning raw bytes into text
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecodeOptions {
    /// WHATWG encoding label (`utf-8`, `shift_jis`, `windows-1252`, ...)
    pub charset: String,
    /// Keep a leading byte order mark as U+FEFF instead of stripping it
    pub ignore_bom: bool,
    /// Fail on malformed byte sequences instead of substituting U+FFFD
    pub fatal: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            charset: "utf-8".to_string(),
            ignore_bom: false,
            fatal: false,
        }
    }
}

impl DecodeOptions {
    /// UTF-8, BOM stripped, lossy
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the charset label (builder pattern)
    pub fn charset(mut self, label: impl Into<String>) -> Self {
        self.charset = label.into();
        self
    }

    /// Keep a leading BOM (builder pattern)
    pub fn ignore_bom(mut self, ignore: bool) -> Self {
        self.ignore_bom = ignore;
        self
    }

    /// Fail on malformed input (builder pattern)
    pub fn fatal(mut self, fatal: bool) -> Self {
        self.fatal = fatal;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.delimiter, ',');
        assert_eq!(options.quotation, '"');
        assert!(options.header.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_same_delimiter_and_quotation() {
        let options = ParseOptions::new().delimiter('"');
        assert!(matches!(
            options.validate(),
            Err(CsvError::Configuration(_))
        ));
    }

    #[test]
    fn test_line_break_delimiter_rejected() {
        let options = ParseOptions::new().delimiter('\n');
        assert!(options.validate().is_err());
        let options = ParseOptions::new().quotation('\r');
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_empty_explicit_header() {
        let options = ParseOptions::new().header(Vec::<String>::new());
        assert!(matches!(
            options.validate(),
            Err(CsvError::Configuration(_))
        ));
    }

    #[test]
    fn test_decode_builder() {
        let options = DecodeOptions::new().charset("shift_jis").fatal(true);
        assert_eq!(options.charset, "shift_jis");
        assert!(options.fatal);
        assert!(!options.ignore_bom);
    }
}
