//! Field escaping and row encoding

use crate::options::ParseOptions;

/// Quoting rules for [`escape_field`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeOptions {
    /// Quotation character
    pub quotation: char,
    /// Field delimiter; values containing it get quoted
    pub delimiter: char,
    /// Quote every field, even when not required
    pub always_quote: bool,
}

impl Default for EscapeOptions {
    fn default() -> Self {
        EscapeOptions {
            quotation: '"',
            delimiter: ',',
            always_quote: false,
        }
    }
}

impl EscapeOptions {
    /// Quoting rules matching the characters of `options`
    pub fn from_parse_options(options: &ParseOptions) -> Self {
        EscapeOptions {
            quotation: options.quotation,
            delimiter: options.delimiter,
            always_quote: false,
        }
    }

    /// Set the quotation character (builder pattern)
    pub fn quotation(mut self, quotation: char) -> Self {
        self.quotation = quotation;
        self
    }

    /// Set the delimiter (builder pattern)
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Quote every field (builder pattern)
    pub fn always_quote(mut self, always: bool) -> Self {
        self.always_quote = always;
        self
    }
}

/// Escape a single field so that parsing it back yields `value`
///
/// # Examples
///
/// ```
/// use csvstream::{escape_field, EscapeOptions};
///
/// assert_eq!(escape_field("plain", &EscapeOptions::default()), "plain");
/// assert_eq!(escape_field("a,b", &EscapeOptions::default()), "\"a,b\"");
/// assert_eq!(escape_field("\"", &EscapeOptions::default()), "\"\"\"\"");
/// ```
pub fn escape_field(value: &str, options: &EscapeOptions) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    write_field(value, options, &mut out);
    out
}

fn write_field(value: &str, options: &EscapeOptions, out: &mut String) {
    if !options.always_quote && !needs_quoting(value, options) {
        out.push_str(value);
        return;
    }

    out.push(options.quotation);
    for ch in value.chars() {
        if ch == options.quotation {
            // Escape quotes by doubling: " -> ""
            out.push(ch);
        }
        out.push(ch);
    }
    out.push(options.quotation);
}

fn needs_quoting(value: &str, options: &EscapeOptions) -> bool {
    value
        .chars()
        .any(|c| c == options.delimiter || c == options.quotation || c == '\n' || c == '\r')
}

/// Encoder for whole rows
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder {
    options: EscapeOptions,
}

impl CsvEncoder {
    /// Create an encoder with the given quoting rules
    pub fn new(options: EscapeOptions) -> Self {
        Self { options }
    }

    /// Quoting rules in use
    pub fn options(&self) -> &EscapeOptions {
        &self.options
    }

    /// Encode a row (without line ending) into `buffer`
    ///
    /// A row holding a single empty field is written as an empty quoted
    /// field, since a bare blank line would not read back as a row.
    pub fn encode_row<I, S>(&self, fields: I, buffer: &mut String)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start = buffer.len();
        let mut count = 0;
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                buffer.push(self.options.delimiter);
            }
            write_field(field.as_ref(), &self.options, buffer);
            count += 1;
        }
        if count == 1 && buffer.len() == start {
            buffer.push(self.options.quotation);
            buffer.push(self.options.quotation);
        }
    }
}
