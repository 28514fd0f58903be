pub mod config;
pub mod generator;
pub mod observability;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use generator::{generate, GeneratedSeries, GeneratorError, SimulationRequest};
pub use pipeline::{Envelope, Pipeline};
