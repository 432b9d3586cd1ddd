//! CSV writing with streaming support and compression
//!
//! Output goes to a plain file, a compressed file, or an in-memory buffer
//! suitable for an HTTP response body. Every field passes through
//! [`escape_field`](crate::escape_field) rules, so the output parses back
//! to the same values with matching [`ParseOptions`](crate::ParseOptions).

use crate::csv::{CompressionMethod, CsvEncoder, EscapeOptions};
use crate::error::{CsvError, Result};
use crate::types::{LineEnding, Record};
use s_zip::StreamingZipWriter;
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;
use tracing::debug;

enum Sink {
    File(BufWriter<File>),
    Zip(StreamingZipWriter<File>),
    Memory(Vec<u8>),
    MemoryZip(StreamingZipWriter<Cursor<Vec<u8>>>),
}

/// CSV writer with streaming capabilities and compression support
///
/// # Examples
///
/// ```
/// use csvstream::CsvWriter;
///
/// let mut writer = CsvWriter::in_memory().delimiter(';');
/// writer.write_header(["name", "note"])?;
/// writer.write_row(["Alice", "a;b"])?;
///
/// let bytes = writer.into_bytes()?;
/// assert_eq!(bytes, b"name;note\nAlice;\"a;b\"\n");
/// # Ok::<(), csvstream::CsvError>(())
/// ```
///
/// # Compression
///
/// [`create`](CsvWriter::create) picks compression from the file extension:
/// - `.csv` → Uncompressed
/// - `.csv.zst` or `.csv.zip` → Zstd compression (level 3)
/// - `.csv.gz` → Deflate/Gzip compression (level 6)
pub struct CsvWriter {
    sink: Sink,

    // State
    row_count: u64,
    buffer: String,

    // Configuration
    escape: EscapeOptions,
    line_ending: LineEnding,
}

impl CsvWriter {
    /// Create a file writer - auto-detects compression from file extension
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_str().unwrap_or("");

        if path_str.ends_with(".csv.zst") || path_str.ends_with(".csv.zip") {
            Self::with_compression(path_ref, CompressionMethod::Zstd, 3)
        } else if path_str.ends_with(".csv.gz") {
            Self::with_compression(path_ref, CompressionMethod::Deflate, 6)
        } else {
            let file = File::create(path_ref)
                .map_err(|e| CsvError::WriteError(format!("Failed to create CSV file: {}", e)))?;
            debug!(path = path_str, "created csv");
            Ok(Self::with_sink(Sink::File(BufWriter::new(file))))
        }
    }

    /// Create a file writer with explicit compression method and level
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `method` - Compression method (Zstd or Deflate)
    /// * `level` - Zstd: 1-21, Deflate: 0-9
    pub fn with_compression<P: AsRef<Path>>(
        path: P,
        method: CompressionMethod,
        level: u32,
    ) -> Result<Self> {
        let path_ref = path.as_ref();

        let mut zip = StreamingZipWriter::with_method(path_ref, method, level)
            .map_err(|e| CsvError::WriteError(format!("Failed to create ZIP writer: {}", e)))?;

        let entry_name = entry_name(path_ref);
        zip.start_entry(&entry_name)
            .map_err(|e| CsvError::WriteError(format!("Failed to start ZIP entry: {}", e)))?;
        debug!(entry = %entry_name, level, "created compressed csv");

        Ok(Self::with_sink(Sink::Zip(zip)))
    }

    /// Writer collecting plain CSV bytes in memory
    pub fn in_memory() -> Self {
        Self::with_sink(Sink::Memory(Vec::with_capacity(4096)))
    }

    /// Writer collecting a Deflate-compressed archive in memory
    ///
    /// The archive holds a single `data.csv` entry.
    pub fn in_memory_compressed(level: u32) -> Result<Self> {
        let mut zip =
            StreamingZipWriter::from_writer_with_compression(Cursor::new(Vec::new()), level.min(9))
                .map_err(|e| CsvError::WriteError(format!("Failed to create ZIP writer: {}", e)))?;
        zip.start_entry("data.csv")
            .map_err(|e| CsvError::WriteError(format!("Failed to start ZIP entry: {}", e)))?;
        Ok(Self::with_sink(Sink::MemoryZip(zip)))
    }

    fn with_sink(sink: Sink) -> Self {
        CsvWriter {
            sink,
            row_count: 0,
            buffer: String::with_capacity(4096),
            escape: EscapeOptions::default(),
            line_ending: LineEnding::default(),
        }
    }

    /// Set custom delimiter (builder pattern)
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.escape = self.escape.delimiter(delimiter);
        self
    }

    /// Set custom quotation character (builder pattern)
    pub fn quotation(mut self, quotation: char) -> Self {
        self.escape = self.escape.quotation(quotation);
        self
    }

    /// Set the record delimiter written after each row (builder pattern)
    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Quote every field (builder pattern)
    pub fn always_quote(mut self, always: bool) -> Self {
        self.escape = self.escape.always_quote(always);
        self
    }

    /// Write a row of strings
    pub fn write_row<I, S>(&mut self, data: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.escape.delimiter == self.escape.quotation {
            return Err(CsvError::Configuration(format!(
                "delimiter and quotation must differ, both are {:?}",
                self.escape.delimiter
            )));
        }

        self.buffer.clear();
        CsvEncoder::new(self.escape).encode_row(data, &mut self.buffer);
        self.buffer.push_str(self.line_ending.as_str());

        let bytes = self.buffer.as_bytes();
        match &mut self.sink {
            Sink::File(writer) => writer
                .write_all(bytes)
                .map_err(|e| CsvError::WriteError(format!("Failed to write to file: {}", e)))?,
            Sink::Memory(buffer) => buffer.extend_from_slice(bytes),
            Sink::Zip(zip) => zip
                .write_data(bytes)
                .map_err(|e| CsvError::WriteError(format!("Failed to write to ZIP: {}", e)))?,
            Sink::MemoryZip(zip) => zip
                .write_data(bytes)
                .map_err(|e| CsvError::WriteError(format!("Failed to write to ZIP: {}", e)))?,
        }

        self.row_count += 1;
        Ok(())
    }

    /// Write the header row
    pub fn write_header<I, S>(&mut self, header: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write_row(header)
    }

    /// Write the values of a record, in header order
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write_row(record.values())
    }

    /// Write multiple rows at once
    pub fn write_rows<I, R, S>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Get the number of rows written, header included
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Finalize the output
    ///
    /// File writers must be saved to properly close the file.
    pub fn save(self) -> Result<()> {
        self.finish().map(|_| ())
    }

    /// Finalize an in-memory writer and return its bytes
    ///
    /// Fails for file writers.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        self.finish()?
            .ok_or_else(|| CsvError::WriteError("Writer does not write to memory".to_string()))
    }

    fn finish(self) -> Result<Option<Vec<u8>>> {
        match self.sink {
            Sink::File(mut writer) => {
                writer
                    .flush()
                    .map_err(|e| CsvError::WriteError(format!("Failed to flush file: {}", e)))?;
                Ok(None)
            }
            Sink::Zip(zip) => {
                zip.finish()
                    .map_err(|e| CsvError::WriteError(format!("Failed to finish ZIP: {}", e)))?;
                Ok(None)
            }
            Sink::Memory(buffer) => Ok(Some(buffer)),
            Sink::MemoryZip(zip) => {
                let cursor = zip
                    .finish()
                    .map_err(|e| CsvError::WriteError(format!("Failed to finish ZIP: {}", e)))?;
                Ok(Some(cursor.into_inner()))
            }
        }
    }
}

/// Archive entry name derived from the output path: `report.csv.zst` → `report.csv`
fn entry_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| {
            let clean = s
                .trim_end_matches(".csv")
                .trim_end_matches(".zst")
                .trim_end_matches(".gz");
            format!("{}.csv", clean)
        })
        .unwrap_or_else(|| "data.csv".to_string())
}
