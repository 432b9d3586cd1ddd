//! Type definitions for CSV tokens and records

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Lexical unit produced by the [`Lexer`](crate::csv::Lexer)
///
/// Every record in a token stream ends with exactly one `RecordDelimiter`,
/// whether the source used LF, CR or CRLF.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Token {
    /// Unescaped field text
    Field(String),
    /// Separator between two fields of the same record
    FieldDelimiter,
    /// End of a record
    RecordDelimiter,
}

impl Token {
    /// Shorthand for `Token::Field(text.into())`
    pub fn field(text: impl Into<String>) -> Self {
        Token::Field(text.into())
    }

    /// Field text, if this token is a field
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Token::Field(text) => Some(text),
            _ => None,
        }
    }
}

/// Location in the character input, used for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    /// 1-based line number (line breaks inside quoted fields count)
    pub line: u64,
    /// 1-based column, in characters
    pub column: u64,
    /// 0-based character offset from the start of input
    pub offset: u64,
}

impl Position {
    /// Position of the first character
    pub fn start() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// One data row keyed by the header
///
/// Values are stored by position, so a header with repeated names still
/// keeps one value per column. The header is shared between all records of
/// one parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    header: Arc<[String]>,
    values: Vec<String>,
}

impl Record {
    /// Build a record from a shared header and values of the same length
    pub(crate) fn new(header: Arc<[String]>, values: Vec<String>) -> Self {
        debug_assert_eq!(header.len(), values.len());
        Record { header, values }
    }

    /// Build a record from `(column, value)` pairs
    ///
    /// # Examples
    ///
    /// ```
    /// use csvstream::Record;
    ///
    /// let record = Record::from_pairs([("name", "Alice"), ("age", "30")]);
    /// assert_eq!(record.get("age"), Some("30"));
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (header, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Record {
            header: header.into(),
            values,
        }
    }

    /// Value of the first column called `column`
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .iter()
            .position(|h| h == column)
            .map(|i| self.values[i].as_str())
    }

    /// Value by column index
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Column names, in order
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Field values, in header order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the header has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(column, value)` pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// Take the values, dropping the header
    pub fn into_values(self) -> Vec<String> {
        self.values
    }

    /// Ordered map from column to value
    ///
    /// Repeated column names collapse to one entry holding the last value.
    pub fn to_map(&self) -> IndexMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Record delimiter written by [`CsvWriter`](crate::CsvWriter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r`
    Cr,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// Bytes written after each row
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::CrLf => "\r\n",
        }
    }
}
