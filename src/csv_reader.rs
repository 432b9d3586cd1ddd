//! CSV file reading with streaming support and decompression

use crate::decode::Decoder;
use crate::error::{CsvError, Result};
use crate::options::{DecodeOptions, ParseOptions};
use crate::parse::TextPipeline;
use crate::types::Record;
use s_zip::StreamingZipReader;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Cursor, ErrorKind, Read};
use std::path::Path;
use tracing::debug;

/// Default number of bytes read per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// CSV file reader producing header-keyed records
///
/// Input is read in fixed-size byte chunks and decoded incrementally, so
/// quoted fields may span lines and multi-byte characters may span chunks.
/// Compressed files (.csv.zst, .csv.gz, .csv.zip) are detected by extension.
///
/// # Examples
///
/// ```no_run
/// use csvstream::CsvReader;
///
/// let mut reader = CsvReader::open("data.csv")?.delimiter(';');
///
/// for record in reader.records() {
///     let record = record?;
///     println!("{:?}", record.get("name"));
/// }
/// # Ok::<(), csvstream::CsvError>(())
/// ```
pub struct CsvReader {
    source: Box<dyn Read>,
    buf: Vec<u8>,

    options: ParseOptions,
    decode: DecodeOptions,
    state: Option<ReadState>,

    pending: VecDeque<Record>,
    error: Option<CsvError>,
    finished: bool,
    row_count: u64,
}

struct ReadState {
    decoder: Decoder,
    pipeline: TextPipeline,
}

impl CsvReader {
    /// Open CSV file - auto-detects compression from file extension
    ///
    /// # File Extensions
    /// - `.csv` → Uncompressed, direct read
    /// - `.csv.zst`, `.csv.zip` → Zstd decompression
    /// - `.csv.gz` → Deflate/Gzip decompression
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_str().unwrap_or("");

        if path_str.ends_with(".csv.zst")
            || path_str.ends_with(".csv.zip")
            || path_str.ends_with(".csv.gz")
        {
            let mut zip = StreamingZipReader::open(path_ref)
                .map_err(|e| CsvError::ReadError(format!("Failed to open ZIP: {}", e)))?;

            // First .csv entry, or the first entry of any name
            let entry_name = zip
                .entries()
                .iter()
                .find(|e| e.name.ends_with(".csv"))
                .or_else(|| zip.entries().first())
                .ok_or_else(|| CsvError::ReadError("No CSV entry found in archive".to_string()))?
                .name
                .clone();

            let data = zip
                .read_entry_by_name(&entry_name)
                .map_err(|e| CsvError::ReadError(format!("Failed to read ZIP entry: {}", e)))?;
            debug!(path = path_str, entry = %entry_name, bytes = data.len(), "opened compressed csv");

            Ok(Self::from_reader(Cursor::new(data)))
        } else {
            let file = File::open(path_ref)
                .map_err(|e| CsvError::ReadError(format!("Failed to open CSV file: {}", e)))?;
            debug!(path = path_str, "opened csv");

            Ok(Self::from_reader(BufReader::new(file)))
        }
    }

    /// Read CSV from any byte source
    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        CsvReader {
            source: Box::new(reader),
            buf: vec![0; DEFAULT_CHUNK_SIZE],
            options: ParseOptions::default(),
            decode: DecodeOptions::default(),
            state: None,
            pending: VecDeque::new(),
            error: None,
            finished: false,
            row_count: 0,
        }
    }

    /// Set custom delimiter (builder pattern)
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.options = self.options.delimiter(delimiter);
        self
    }

    /// Set custom quotation character (builder pattern)
    pub fn quotation(mut self, quotation: char) -> Self {
        self.options = self.options.quotation(quotation);
        self
    }

    /// Use an explicit header; the first row of the file is then data (builder pattern)
    pub fn header<I, S>(mut self, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.header(header);
        self
    }

    /// Reject stray characters after closing quotes (builder pattern)
    pub fn strict_quotes(mut self, strict: bool) -> Self {
        self.options = self.options.strict_quotes(strict);
        self
    }

    /// Replace all parse options (builder pattern)
    pub fn parse_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the charset handling (builder pattern)
    pub fn decode_options(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    /// Set the number of bytes read per chunk (builder pattern)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.buf = vec![0; size.max(1)];
        self
    }

    /// Header row, once the first record has been read
    pub fn headers(&self) -> Option<&[String]> {
        self.state.as_ref().and_then(|s| s.pipeline.header())
    }

    /// Read a single record
    ///
    /// Returns `Ok(None)` at end of input and after an error has been
    /// returned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use csvstream::CsvReader;
    ///
    /// let mut reader = CsvReader::open("data.csv")?;
    ///
    /// while let Some(record) = reader.read_record()? {
    ///     println!("{:?}", record.values());
    /// }
    /// # Ok::<(), csvstream::CsvError>(())
    /// ```
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                self.row_count += 1;
                return Ok(Some(record));
            }
            if let Some(e) = self.error.take() {
                return Err(e);
            }
            if self.finished {
                return Ok(None);
            }
            if let Err(e) = self.fill() {
                self.finished = true;
                self.error = Some(e);
            }
        }
    }

    /// Get iterator over records
    pub fn records(&mut self) -> CsvRecordIterator<'_> {
        CsvRecordIterator { reader: self }
    }

    /// Number of data records returned so far
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Read one chunk and run it through the decoder and parser
    fn fill(&mut self) -> Result<()> {
        if self.state.is_none() {
            self.state = Some(ReadState {
                decoder: Decoder::new(&self.decode)?,
                pipeline: TextPipeline::new(&self.options)?,
            });
        }
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };

        let n = loop {
            match self.source.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(CsvError::ReadError(format!("Failed to read CSV data: {}", e)))
                }
            }
        };

        let mut out = Vec::new();
        let last = n == 0;
        let text = state.decoder.decode(&self.buf[..n], last)?;
        let result = state.pipeline.push(&text, &mut out).and_then(|()| {
            if last {
                state.pipeline.finish(&mut out)
            } else {
                Ok(())
            }
        });
        self.pending.extend(out);
        if last {
            self.finished = true;
        }
        result
    }
}

/// Iterator over CSV records
pub struct CsvRecordIterator<'a> {
    reader: &'a mut CsvReader,
}

impl Iterator for CsvRecordIterator<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}
