use std::{fmt, path::PathBuf};

use meter_domain::query::{self, EventTypeCount};

use crate::{
    config::OutputConfig,
    generator::GeneratedSeries,
    pipeline::{PipelineError, SinkSummary},
    sinks::to_csv_string,
};

/// End-of-run summary shown to the operator.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub meters: usize,
    pub measurements: usize,
    pub events: usize,
    pub event_counts: Vec<EventTypeCount>,
    pub measurements_path: PathBuf,
    pub events_path: PathBuf,
    /// Rows dropped by validation before reaching the files.
    pub skipped_measurements: usize,
    pub skipped_events: usize,
    measurements_sample: String,
    events_sample: String,
}

impl RunReport {
    /// Must be built before the series is handed to the writers.
    pub fn build(series: &GeneratedSeries, output: &OutputConfig) -> Result<Self, PipelineError> {
        let n = output.sample_rows;
        Ok(Self {
            meters: query::meter_ids(&series.measurements).len(),
            measurements: series.measurements.len(),
            events: series.events.len(),
            event_counts: query::event_counts_by_type(&series.events),
            measurements_path: output.measurements_path.clone(),
            events_path: output.events_path.clone(),
            skipped_measurements: 0,
            skipped_events: 0,
            measurements_sample: to_csv_string(series.measurements.iter().take(n))?,
            events_sample: to_csv_string(series.events.iter().take(n))?,
        })
    }

    /// Replace the generated totals with what the writers actually stored.
    pub fn with_written(mut self, measurements: SinkSummary, events: SinkSummary) -> Self {
        self.measurements = measurements.written;
        self.events = events.written;
        self.skipped_measurements = measurements.skipped;
        self.skipped_events = events.skipped;
        self
    }

    pub fn skipped(&self) -> usize {
        self.skipped_measurements + self.skipped_events
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Generated {} measurements and {} events for {} meters",
            self.measurements, self.events, self.meters
        )?;
        if self.skipped() > 0 {
            writeln!(
                f,
                "Skipped {} measurements and {} events that failed validation",
                self.skipped_measurements, self.skipped_events
            )?;
        }
        for c in &self.event_counts {
            writeln!(f, "  {:<20} {}", c.event_type.as_str(), c.count)?;
        }
        writeln!(f, "Files saved:")?;
        writeln!(f, "- {}", self.measurements_path.display())?;
        writeln!(f, "- {}", self.events_path.display())?;
        writeln!(f)?;
        writeln!(f, "Sample measurements:")?;
        write!(f, "{}", self.measurements_sample)?;
        writeln!(f)?;
        writeln!(f, "Sample events:")?;
        write!(f, "{}", self.events_sample)
    }
}
