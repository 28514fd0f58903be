use anyhow::Result;
use meter_domain::domain::{Measurement, MeterEvent};
use meter_simulator::{
    config::AppConfig,
    generator::{self, GeneratedSeries},
    observability,
    pipeline::Pipeline,
    prompt,
    report::RunReport,
    sinks::CsvFileSink,
    sources::GeneratedRecordsSource,
    transform,
};
use rand::{rngs::StdRng, SeedableRng};
use std::{io, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let output = &cfg.output;

    let (request, seed) = match &cfg.simulation {
        Some(sim) => (sim.to_request()?, sim.seed),
        None => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut stdout = io::stdout();
            (prompt::prompt_request(&mut input, &mut stdout)?, None)
        }
    };

    let mut rng = match seed {
        Some(seed) => {
            tracing::info!(seed, "using seeded random source");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let series = generator::generate(&request, &mut rng);
    let report = RunReport::build(&series, output)?;
    let GeneratedSeries { measurements, events } = series;

    let measurement_pipeline: Pipeline<_, Measurement, _> = Pipeline {
        source: GeneratedRecordsSource::new(measurements),
        transforms: vec![Arc::new(transform::MeasurementValidation::default())],
        sink: CsvFileSink::<Measurement>::new(&output.measurements_path, output.batch_size, "measurements"),
    };
    let event_pipeline: Pipeline<_, MeterEvent, _> = Pipeline {
        source: GeneratedRecordsSource::new(events),
        transforms: vec![Arc::new(transform::MeterEventValidation::default())],
        sink: CsvFileSink::<MeterEvent>::new(&output.events_path, output.batch_size, "events"),
    };

    let (written_measurements, written_events) =
        tokio::try_join!(measurement_pipeline.run(), event_pipeline.run())?;
    let report = report.with_written(written_measurements, written_events);
    if report.skipped() > 0 {
        tracing::warn!(
            measurements = report.skipped_measurements,
            events = report.skipped_events,
            "records failed validation and were not written"
        );
    }

    println!("\n{report}");

    Ok(())
}
