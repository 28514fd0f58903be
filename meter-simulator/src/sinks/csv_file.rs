use std::{fs::File, marker::PhantomData, path::PathBuf};

use futures::StreamExt;
use meter_domain::domain::{Measurement, MeterEvent};
use serde::Serialize;

use crate::pipeline::{Envelope, PipelineError, Sink, SinkSummary};

/// Column layout of a record table.
pub trait CsvRecord: Serialize {
    const HEADER: &'static [&'static str];
}

impl CsvRecord for Measurement {
    const HEADER: &'static [&'static str] = &[
        "meter_id",
        "timestamp",
        "active_energy_import_kwh",
        "reactive_energy_import_kvarh",
        "active_energy_export_kwh",
        "reactive_energy_export_kvarh",
        "voltage_phase1_v",
        "voltage_phase2_v",
        "voltage_phase3_v",
        "current_phase1_a",
        "current_phase2_a",
        "current_phase3_a",
        "maximum_demand_kw",
        "power_factor",
    ];
}

impl CsvRecord for MeterEvent {
    const HEADER: &'static [&'static str] =
        &["meter_id", "timestamp", "event_type", "event_description"];
}

/// Render `records` as CSV text, header included.
pub fn to_csv_string<'a, T, I>(records: I) -> Result<String, PipelineError>
where
    T: CsvRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer
        .write_record(T::HEADER)
        .map_err(|e| PipelineError::Sink(format!("failed to write CSV header: {e}")))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| PipelineError::Sink(format!("failed to write CSV record: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Sink(format!("failed to flush CSV buffer: {e}")))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::Sink(format!("CSV output is not UTF-8: {e}")))
}

/// Writes a record table to a delimited file.
///
/// The file is truncated when the sink starts and always begins with the
/// header row, so an empty table yields a header-only file. Upstream errors
/// are logged, counted as skipped and never written.
pub struct CsvFileSink<T> {
    path: PathBuf,
    batch_size: usize,
    dataset: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CsvFileSink<T> {
    pub fn new<P: Into<PathBuf>>(path: P, batch_size: usize, dataset: &'static str) -> Self {
        Self {
            path: path.into(),
            batch_size: batch_size.max(1),
            dataset,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl<T: CsvRecord> CsvFileSink<T> {
    fn open(&self) -> Result<csv::Writer<File>, PipelineError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .map_err(|e| {
                PipelineError::Sink(format!("failed to create {}: {e}", self.path.display()))
            })?;
        writer
            .write_record(T::HEADER)
            .map_err(|e| PipelineError::Sink(format!("failed to write CSV header: {e}")))?;
        Ok(writer)
    }

    fn flush_batch(
        &self,
        writer: &mut csv::Writer<File>,
        batch: &[Envelope<T>],
    ) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }

        let res = batch
            .iter()
            .try_for_each(|env| writer.serialize(&env.payload))
            .map_err(|e| e.to_string())
            .and_then(|()| writer.flush().map_err(|e| e.to_string()));

        match res {
            Ok(()) => {
                metrics::counter!("csv_rows_written_total", "dataset" => self.dataset)
                    .increment(batch.len() as u64);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    dataset = self.dataset,
                    path = %self.path.display(),
                    "csv sink flush failed"
                );
                metrics::counter!("csv_sink_errors_total", "dataset" => self.dataset).increment(1);
                Err(PipelineError::Sink(e))
            }
        }
    }
}

#[async_trait::async_trait]
impl<T> Sink<T> for CsvFileSink<T>
where
    T: CsvRecord + Send + Sync + 'static,
{
    async fn run<S>(&self, mut input: S) -> Result<SinkSummary, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut writer = self.open()?;
        let mut buffer: Vec<Envelope<T>> = Vec::with_capacity(self.batch_size);
        let mut summary = SinkSummary::default();

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, dataset = self.dataset, "error in upstream pipeline for CsvFileSink");
                    summary.skipped += 1;
                    continue;
                }
            };

            buffer.push(env);
            if buffer.len() >= self.batch_size {
                self.flush_batch(&mut writer, &buffer)?;
                summary.written += buffer.len();
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            self.flush_batch(&mut writer, &buffer)?;
            summary.written += buffer.len();
        }

        writer.flush().map_err(|e| PipelineError::Sink(e.to_string()))?;
        if summary.skipped > 0 {
            metrics::counter!("csv_rows_skipped_total", "dataset" => self.dataset)
                .increment(summary.skipped as u64);
        }
        tracing::info!(
            dataset = self.dataset,
            rows = summary.written,
            skipped = summary.skipped,
            path = %self.path.display(),
            "csv file written"
        );

        Ok(summary)
    }
}
