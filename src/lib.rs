//! # csvstream
//!
//! Incremental CSV parsing for text that arrives in chunks.
//!
//! The core is two small state machines:
//!
//! - [`Lexer`] turns text chunks into [`Token`]s. Chunk boundaries may fall
//!   anywhere, including inside quoted fields and between CR and LF.
//! - [`RecordAssembler`] turns tokens into header-keyed [`Record`]s and
//!   reports rows whose field count does not match the header.
//!
//! Both implement [`Incremental`], so they can be wrapped in a [`Stage`] and
//! chained into a backpressure-aware [`Stream`](futures::Stream) of records.
//!
//! ## Quick Start
//!
//! ```
//! use csvstream::{parse_string, ParseOptions};
//!
//! let records = parse_string("a;b\n\"x;y\";z\n", &ParseOptions::new().delimiter(';'))?;
//! assert_eq!(records[0].get("a"), Some("x;y"));
//! assert_eq!(records[0].get("b"), Some("z"));
//! # Ok::<(), csvstream::CsvError>(())
//! ```
//!
//! ## Streaming
//!
//! ```
//! use csvstream::{parse_string_stream, source, ParseOptions};
//! use futures::{executor::block_on, StreamExt};
//!
//! let chunks = source::from_str_chunks(["name,a", "ge\nAlice,3", "0\n"]);
//! let mut records = parse_string_stream(chunks, &ParseOptions::default())?;
//!
//! let first = block_on(records.next()).unwrap()?;
//! assert_eq!(first.get("age"), Some("30"));
//! # Ok::<(), csvstream::CsvError>(())
//! ```
//!
//! ## Files
//!
//! [`CsvReader`] and [`CsvWriter`] read and write plain or compressed
//! (`.csv.zst`, `.csv.gz`, `.csv.zip`) files.

pub mod csv;
pub mod csv_reader;
pub mod csv_writer;
pub mod decode;
pub mod error;
pub mod options;
pub mod parse;
pub mod source;
pub mod stage;
pub mod types;

pub use csv::{
    escape_field, Assemble, CompressionMethod, CsvEncoder, EscapeOptions, Lexer, RecordAssembler,
};
pub use csv_reader::CsvReader;
pub use csv_writer::CsvWriter;
pub use decode::Decoder;
pub use error::{CsvError, Result};
pub use options::{DecodeOptions, ParseOptions};
pub use parse::{
    parse_binary, parse_byte_stream, parse_response, parse_string, parse_string_iter,
    parse_string_stream, ByteRecordStream, RecordStream, Records, TextPipeline,
};
pub use stage::{Incremental, Stage, StageExt};
pub use types::{LineEnding, Position, Record, Token};
