//! Input source adapters
//!
//! Adapters normalize a source into the chunk streams consumed by the
//! pipeline. They validate the source before the first chunk is produced.

use crate::error::{CsvError, Result};
use crate::options::DecodeOptions;
use futures::stream::{self, Stream};
use tracing::debug;

/// Stream yielding a single text chunk
pub fn single(text: impl Into<String>) -> impl Stream<Item = Result<String>> + Unpin {
    stream::iter(vec![Ok(text.into())])
}

/// Stream over in-memory text chunks
pub fn from_str_chunks<I, S>(chunks: I) -> impl Stream<Item = Result<String>> + Unpin
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let chunks: Vec<Result<String>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
    stream::iter(chunks)
}

/// Stream over in-memory byte chunks
pub fn from_byte_chunks<I, B>(chunks: I) -> impl Stream<Item = Result<Vec<u8>>> + Unpin
where
    I: IntoIterator<Item = B>,
    B: Into<Vec<u8>>,
{
    let chunks: Vec<Result<Vec<u8>>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
    stream::iter(chunks)
}

/// Stream of byte chunks read from an async reader
///
/// Read failures are yielded as [`CsvError::Io`] and end the stream.
#[cfg(feature = "tokio")]
pub fn from_async_read<R>(
    reader: R,
    chunk_size: usize,
) -> impl Stream<Item = Result<Vec<u8>>> + Unpin
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;

    let chunk_size = chunk_size.max(1);
    Box::pin(stream::unfold(Some(reader), move |state| async move {
        let mut reader = state?;
        let mut buf = vec![0u8; chunk_size];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(reader)))
            }
            Err(e) => Some((Err(CsvError::Io(e)), None)),
        }
    }))
}

/// Parsed `Content-Type` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mime {
    /// Lower-cased `type/subtype`
    pub essence: String,
    /// `charset` parameter, if present
    pub charset: Option<String>,
}

impl Mime {
    /// Parse a header value such as `text/csv; charset=Shift_JIS`
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(';');
        let essence = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        let charset = parts.find_map(|param| {
            let (key, value) = param.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches('"').to_string())
            } else {
                None
            }
        });
        Mime { essence, charset }
    }
}

/// HTTP-like response: an optional content type and an optional byte body
///
/// # Examples
///
/// ```
/// use csvstream::source::Response;
/// use csvstream::DecodeOptions;
/// use futures::stream::Empty;
///
/// let response = Response::new(None::<Empty<csvstream::Result<Vec<u8>>>>)
///     .content_type("text/csv");
/// let err = response.into_validated(DecodeOptions::new()).err().unwrap();
/// assert_eq!(err.to_string(), "source validation error: Response body is null");
/// ```
#[derive(Debug)]
pub struct Response<S> {
    content_type: Option<String>,
    body: Option<S>,
}

impl<S> Response<S>
where
    S: Stream<Item = Result<Vec<u8>>>,
{
    /// Response with the given body and no content type
    pub fn new(body: Option<S>) -> Self {
        Response {
            content_type: None,
            body,
        }
    }

    /// Set the `Content-Type` header value (builder pattern)
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    /// Check the content type and body, returning the body and effective decode options
    ///
    /// A missing content type is accepted as `text/csv`. A `charset`
    /// parameter overrides the charset in `decode`.
    pub fn into_validated(self, mut decode: DecodeOptions) -> Result<(S, DecodeOptions)> {
        let mime = Mime::parse(self.content_type.as_deref().unwrap_or("text/csv"));
        if mime.essence != "text/csv" {
            return Err(CsvError::SourceValidation(format!(
                "Invalid mime type: {}",
                self.content_type.unwrap_or_default()
            )));
        }
        let body = self
            .body
            .ok_or_else(|| CsvError::SourceValidation("Response body is null".to_string()))?;
        if let Some(charset) = mime.charset {
            debug!(charset = %charset, "charset taken from content type");
            decode.charset = charset;
        }
        Ok((body, decode))
    }
}
