use crate::{
    generator::{BASE_VOLTAGE_V, POWER_FACTOR_BAND, VOLTAGE_BAND},
    pipeline::{Envelope, PipelineError, Transform},
};
use meter_domain::domain::{Measurement, MeterEvent};

const BAND_TOLERANCE: f64 = 1e-9;

fn within(value: f64, lo: f64, hi: f64) -> bool {
    value >= lo - BAND_TOLERANCE && value <= hi + BAND_TOLERANCE
}

/// Pure validation of a `Measurement` record.
///
/// Rules:
/// - meter_id must be non-empty.
/// - every numeric field must be finite.
/// - energy counters, currents and maximum demand must be non-negative.
/// - phase voltages must lie within the nominal voltage band.
/// - power factor must lie within the generated band.
pub fn validate_measurement(
    env: Envelope<Measurement>,
) -> Result<Envelope<Measurement>, PipelineError> {
    let m = &env.payload;

    if m.meter_id.trim().is_empty() {
        return Err(PipelineError::Transform("meter_id must not be empty".to_string()));
    }

    let non_negative = [
        ("active_energy_import_kwh", m.active_energy_import_kwh),
        ("reactive_energy_import_kvarh", m.reactive_energy_import_kvarh),
        ("active_energy_export_kwh", m.active_energy_export_kwh),
        ("reactive_energy_export_kvarh", m.reactive_energy_export_kvarh),
        ("current_phase1_a", m.current_phase1_a),
        ("current_phase2_a", m.current_phase2_a),
        ("current_phase3_a", m.current_phase3_a),
        ("maximum_demand_kw", m.maximum_demand_kw),
    ];
    for (name, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            return Err(PipelineError::Transform(format!(
                "{name} must be finite and non-negative, got {value}"
            )));
        }
    }

    let (v_lo, v_hi) = (BASE_VOLTAGE_V * VOLTAGE_BAND.0, BASE_VOLTAGE_V * VOLTAGE_BAND.1);
    for (phase, v) in m.voltages().into_iter().enumerate() {
        if !within(v, v_lo, v_hi) {
            return Err(PipelineError::Transform(format!(
                "voltage_phase{}_v {v} outside [{v_lo:.1}, {v_hi:.1}]",
                phase + 1
            )));
        }
    }

    if !within(m.power_factor, POWER_FACTOR_BAND.0, POWER_FACTOR_BAND.1) {
        return Err(PipelineError::Transform(format!(
            "power_factor {} outside [{}, {}]",
            m.power_factor, POWER_FACTOR_BAND.0, POWER_FACTOR_BAND.1
        )));
    }

    Ok(env)
}

/// Pure validation of a `MeterEvent` record.
///
/// Rules:
/// - meter_id must be non-empty.
/// - event_description must be non-empty.
pub fn validate_meter_event(env: Envelope<MeterEvent>) -> Result<Envelope<MeterEvent>, PipelineError> {
    let e = &env.payload;

    if e.meter_id.trim().is_empty() {
        return Err(PipelineError::Transform("meter_id must not be empty".to_string()));
    }
    if e.event_description.trim().is_empty() {
        return Err(PipelineError::Transform(format!(
            "{} event has an empty description",
            e.event_type
        )));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct MeasurementValidation;

#[async_trait::async_trait]
impl Transform<Measurement, Measurement> for MeasurementValidation {
    async fn apply(
        &self,
        input: Envelope<Measurement>,
    ) -> Result<Envelope<Measurement>, PipelineError> {
        match validate_measurement(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_measurement_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct MeterEventValidation;

#[async_trait::async_trait]
impl Transform<MeterEvent, MeterEvent> for MeterEventValidation {
    async fn apply(
        &self,
        input: Envelope<MeterEvent>,
    ) -> Result<Envelope<MeterEvent>, PipelineError> {
        match validate_meter_event(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_meter_event_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
