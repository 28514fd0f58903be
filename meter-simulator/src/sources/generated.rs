use std::{pin::Pin, sync::Mutex};

use futures::Stream;

use crate::pipeline::{Envelope, PipelineError, Source};

/// Source over an already materialized record table.
///
/// The records are handed out once: the first call to `stream` drains the
/// table and later calls yield an empty stream.
pub struct GeneratedRecordsSource<T> {
    records: Mutex<Vec<T>>,
}

impl<T> GeneratedRecordsSource<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait::async_trait]
impl<T> Source<T> for GeneratedRecordsSource<T>
where
    T: Send + 'static,
{
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>> {
        let records = match self.records.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => {
                return Box::pin(futures::stream::once(async {
                    Err(PipelineError::Source("generated records lock poisoned".to_string()))
                }));
            }
        };

        let s = async_stream::stream! {
            for record in records {
                yield Ok(Envelope::now(record));
            }
        };

        Box::pin(s)
    }
}
