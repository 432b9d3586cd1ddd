//! Backpressure-aware streaming stages
//!
//! A [`Stage`] wraps an incremental component (the [`Lexer`], the
//! [`RecordAssembler`] or the byte [`Decoder`](crate::decode::Decoder)) and
//! turns an upstream stream of inputs into a stream of outputs. Stages chain:
//!
//! ```text
//! text chunks -> Stage<Lexer> -> tokens -> Stage<RecordAssembler> -> records
//! ```
//!
//! Polling a stage is the pull request. A stage only polls its upstream once
//! every buffered output has been handed downstream, so a slow consumer
//! suspends the whole pipeline instead of letting buffers grow. The buffer
//! holds at most the output of one upstream item: a large chunk fed to a
//! [`Lexer`] is buffered as all of its tokens, so chunk size is the knob that
//! bounds memory. Dropping (or
//! [`cancel`](Stage::cancel)ling) a stage drops its upstream and discards
//! whatever partial output was buffered.

use crate::csv::{Lexer, RecordAssembler};
use crate::error::{CsvError, Result};
use crate::types::{Record, Token};
use futures::stream::{FusedStream, Stream};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Push/flush contract shared by all pipeline components
pub trait Incremental {
    /// Item accepted from upstream
    type Input;
    /// Item produced for downstream
    type Output;

    /// Consume one input, appending produced items to `out`
    ///
    /// Items appended before an error are still delivered, ahead of the error.
    fn feed(&mut self, input: Self::Input, out: &mut Vec<Self::Output>) -> Result<()>;

    /// Signal end of input, appending any remaining items to `out`
    fn finish(&mut self, out: &mut Vec<Self::Output>) -> Result<()>;
}

impl Incremental for Lexer {
    type Input = String;
    type Output = Token;

    fn feed(&mut self, input: String, out: &mut Vec<Token>) -> Result<()> {
        self.push_into(&input, out)
    }

    fn finish(&mut self, out: &mut Vec<Token>) -> Result<()> {
        self.flush_into(out)
    }
}

impl Incremental for RecordAssembler {
    type Input = Token;
    type Output = Record;

    fn feed(&mut self, input: Token, out: &mut Vec<Record>) -> Result<()> {
        self.push_token(input, out)
    }

    fn finish(&mut self, out: &mut Vec<Record>) -> Result<()> {
        self.flush_into(out)
    }
}

/// Stream adapter driving an [`Incremental`] component from an upstream stream
pub struct Stage<S, C: Incremental> {
    upstream: Option<S>,
    component: C,
    buffer: VecDeque<C::Output>,
    scratch: Vec<C::Output>,
    error: Option<CsvError>,
}

impl<S, C: Incremental + fmt::Debug> fmt::Debug for Stage<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("component", &self.component)
            .field("buffered", &self.buffer.len())
            .field("upstream_done", &self.upstream.is_none())
            .field("error", &self.error)
            .finish()
    }
}

impl<S, C: Incremental> Stage<S, C> {
    /// Wrap `component`, reading inputs from `upstream`
    pub fn new(upstream: S, component: C) -> Self {
        Stage {
            upstream: Some(upstream),
            component,
            buffer: VecDeque::new(),
            scratch: Vec::new(),
            error: None,
        }
    }

    /// Outputs produced but not yet taken by downstream
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// The wrapped component
    pub fn component(&self) -> &C {
        &self.component
    }

    /// Stop the stage: drop upstream and discard buffered output
    ///
    /// The component is not flushed, so no output is built from a
    /// truncated record.
    pub fn cancel(&mut self) {
        if self.upstream.is_some() || !self.buffer.is_empty() {
            debug!(discarded = self.buffer.len(), "stage cancelled");
        }
        self.upstream = None;
        self.buffer.clear();
        self.error = None;
    }

    fn absorb(&mut self, result: Result<()>) {
        self.buffer.extend(self.scratch.drain(..));
        if let Err(e) = result {
            self.upstream = None;
            self.error = Some(e);
        }
    }
}

impl<S, C> Stream for Stage<S, C>
where
    S: Stream<Item = Result<C::Input>> + Unpin,
    C: Incremental + Unpin,
    C::Output: Unpin,
{
    type Item = Result<C::Output>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(item) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }
            if let Some(e) = this.error.take() {
                return Poll::Ready(Some(Err(e)));
            }
            let Some(upstream) = this.upstream.as_mut() else {
                return Poll::Ready(None);
            };

            match Pin::new(upstream).poll_next(cx) {
                Poll::Ready(Some(Ok(input))) => {
                    let result = this.component.feed(input, &mut this.scratch);
                    this.absorb(result);
                }
                // Upstream failures pass through unchanged and end the stage
                Poll::Ready(Some(Err(e))) => this.absorb(Err(e)),
                Poll::Ready(None) => {
                    this.upstream = None;
                    let result = this.component.finish(&mut this.scratch);
                    debug!(items = this.scratch.len(), "upstream complete, stage flushed");
                    this.absorb(result);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.upstream {
            Some(_) => (self.buffer.len(), None),
            None => {
                let n = self.buffer.len() + usize::from(self.error.is_some());
                (n, Some(n))
            }
        }
    }
}

impl<S, C> FusedStream for Stage<S, C>
where
    S: Stream<Item = Result<C::Input>> + Unpin,
    C: Incremental + Unpin,
    C::Output: Unpin,
{
    fn is_terminated(&self) -> bool {
        self.upstream.is_none() && self.buffer.is_empty() && self.error.is_none()
    }
}

/// Chaining helper for building pipelines
///
/// ```
/// use csvstream::stage::StageExt;
/// use csvstream::{Lexer, ParseOptions, RecordAssembler};
/// use futures::{stream, TryStreamExt};
///
/// # futures::executor::block_on(async {
/// let options = ParseOptions::default();
/// let chunks = stream::iter(["id,na", "me\n1,x\n"].map(|s| Ok::<_, csvstream::CsvError>(s.to_string())));
/// let records: Vec<_> = chunks
///     .through(Lexer::new(&options)?)
///     .through(RecordAssembler::new(&options)?)
///     .try_collect()
///     .await?;
/// assert_eq!(records[0].get("name"), Some("x"));
/// # Ok::<(), csvstream::CsvError>(())
/// # }).unwrap();
/// ```
pub trait StageExt: Stream + Sized {
    /// Feed this stream into `component`
    fn through<C>(self, component: C) -> Stage<Self, C>
    where
        C: Incremental,
        Self: Stream<Item = Result<C::Input>>,
    {
        Stage::new(self, component)
    }
}

impl<S: Stream> StageExt for S {}
