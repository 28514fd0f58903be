//! Moves generated record tables to their writers.
//!
//! A [`Pipeline`] drains one [`Source`], threads every record through its
//! [`Transform`]s and hands the result to one [`Sink`]. Transform failures do
//! not stop the run; they reach the sink as `Err` items and are counted there.

use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};

/// A record plus the instant it left its source.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub emitted_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn now(payload: T) -> Self {
        Self {
            payload,
            emitted_at: SystemTime::now(),
        }
    }
}

/// Failure attributed to the pipeline stage that raised it.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

/// Yields a finite stream of records; called once per run.
#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;
}

/// Checks or rewrites one record. An `Err` rejects that record only.
#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

/// What a sink did with the records it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    pub written: usize,
    /// Records that arrived as errors (e.g. failed validation) and were dropped.
    pub skipped: usize,
}

/// Consumes the whole stream, including rejected items.
#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<SinkSummary, PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

/// One source, a chain of same-type transforms applied in order, one sink.
pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>,
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    /// Run to completion; the sink's summary tells how many records landed.
    pub async fn run(self) -> Result<SinkSummary, PipelineError> {
        let mut stream = self.source.stream().await;

        for t in self.transforms {
            stream = Box::pin(stream.then(move |item| {
                let t_inner = t.clone();
                async move {
                    match item {
                        Ok(env) => t_inner.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}
