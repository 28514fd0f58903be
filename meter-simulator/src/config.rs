use anyhow::Context;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::generator::{GeneratorError, SimulationRequest};

pub const CONFIG_ENV: &str = "METER_SIM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "meter-simulator.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub num_meters: usize,
    /// `dd:mm:yyyy HH:MM`
    pub start: String,
    /// `dd:mm:yyyy HH:MM`
    pub end: String,
    pub interval_minutes: i64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn to_request(&self) -> Result<SimulationRequest, GeneratorError> {
        SimulationRequest::parse(self.num_meters, &self.start, &self.end, self.interval_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub measurements_path: PathBuf,
    pub events_path: PathBuf,
    pub batch_size: usize,
    pub sample_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            measurements_path: PathBuf::from("./smart_meter_measurements.csv"),
            events_path: PathBuf::from("./smart_meter_events.csv"),
            batch_size: 1024,
            sample_rows: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// When absent the binary asks for the inputs interactively.
    pub simulation: Option<SimulationConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load from `$METER_SIM_CONFIG`, else from `meter-simulator.toml` if it
    /// exists, else fall back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_path(path),
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_path(DEFAULT_CONFIG_PATH),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
