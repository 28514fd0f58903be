//! Event emission for simulated meters.
//!
//! Two independent sources per interval:
//! - anomaly events, only for meters carrying a non-unity abnormality factor;
//! - background events, drawn uniformly from the full event type set.

use meter_domain::domain::{EventType, Measurement, MeterEvent};
use rand::{seq::SliceRandom, Rng};

/// A draw above this value raises an anomaly event (5% per interval).
pub const ANOMALY_EVENT_THRESHOLD: f64 = 0.95;
/// A draw above this value raises a background event (0.5% per interval).
pub const BACKGROUND_EVENT_THRESHOLD: f64 = 0.995;

/// Inputs an anomaly rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyContext {
    pub abnormality_factor: f64,
    /// Fair coin used to split the mid-range factors between rules.
    pub coin: bool,
}

/// One row of the anomaly decision table.
pub struct AnomalyRule {
    pub event_type: EventType,
    applies: fn(&AnomalyContext) -> bool,
    describe: fn(&Measurement) -> String,
}

impl AnomalyRule {
    pub fn applies(&self, ctx: &AnomalyContext) -> bool {
        (self.applies)(ctx)
    }

    pub fn describe(&self, reading: &Measurement) -> String {
        (self.describe)(reading)
    }
}

fn is_swell(ctx: &AnomalyContext) -> bool {
    ctx.abnormality_factor > 1.2
}

fn is_sag(ctx: &AnomalyContext) -> bool {
    ctx.abnormality_factor < 0.8
}

fn coin_heads(ctx: &AnomalyContext) -> bool {
    ctx.coin
}

fn always(_: &AnomalyContext) -> bool {
    true
}

fn describe_swell(m: &Measurement) -> String {
    format!("Voltage swell detected ({:.1}V)", m.voltage_phase1_v)
}

fn describe_sag(m: &Measurement) -> String {
    format!("Voltage sag detected ({:.1}V)", m.voltage_phase1_v)
}

fn describe_imbalance(m: &Measurement) -> String {
    format!(
        "Current imbalance ({:.1}A, {:.1}A, {:.1}A)",
        m.current_phase1_a, m.current_phase2_a, m.current_phase3_a
    )
}

fn describe_phase_failure(_: &Measurement) -> String {
    "Phase failure detected".to_string()
}

/// Evaluated top to bottom; the first matching rule wins. The last rule
/// always matches.
pub static ANOMALY_RULES: [AnomalyRule; 4] = [
    AnomalyRule { event_type: EventType::VoltageSwell, applies: is_swell, describe: describe_swell },
    AnomalyRule { event_type: EventType::VoltageSag, applies: is_sag, describe: describe_sag },
    AnomalyRule {
        event_type: EventType::CurrentImbalance,
        applies: coin_heads,
        describe: describe_imbalance,
    },
    AnomalyRule {
        event_type: EventType::PhaseFailure,
        applies: always,
        describe: describe_phase_failure,
    },
];

pub fn select_anomaly_rule(ctx: &AnomalyContext) -> &'static AnomalyRule {
    ANOMALY_RULES
        .iter()
        .find(|rule| rule.applies(ctx))
        .unwrap_or(&ANOMALY_RULES[ANOMALY_RULES.len() - 1])
}

/// Possibly raise an anomaly event for the interval captured in `reading`.
///
/// Meters with a unity abnormality factor never raise anomaly events and
/// consume no randomness here.
pub fn anomaly_event<R: Rng>(
    abnormality_factor: f64,
    reading: &Measurement,
    rng: &mut R,
) -> Option<MeterEvent> {
    if abnormality_factor == 1.0 || rng.gen::<f64>() <= ANOMALY_EVENT_THRESHOLD {
        return None;
    }

    let ctx = AnomalyContext {
        abnormality_factor,
        coin: rng.gen::<f64>() > 0.5,
    };
    let rule = select_anomaly_rule(&ctx);

    Some(MeterEvent {
        meter_id: reading.meter_id.clone(),
        timestamp: reading.timestamp,
        event_type: rule.event_type,
        event_description: rule.describe(reading),
    })
}

/// Description text for a background event of type `event_type`.
pub fn describe_background<R: Rng>(event_type: EventType, rng: &mut R) -> String {
    match event_type {
        EventType::PowerOutage => "Power outage detected".to_string(),
        EventType::TamperDetected => "Meter tampering detected".to_string(),
        EventType::MeterCoverOpened => "Meter cover opened".to_string(),
        EventType::HighTemperature => format!("High temperature ({}°C)", rng.gen_range(45..=70)),
        EventType::MeterReset => "Meter reset performed".to_string(),
        other => other.title(),
    }
}

/// Possibly raise a background event of a uniformly chosen type.
pub fn background_event<R: Rng>(reading: &Measurement, rng: &mut R) -> Option<MeterEvent> {
    if rng.gen::<f64>() <= BACKGROUND_EVENT_THRESHOLD {
        return None;
    }

    let event_type = *EventType::ALL.choose(rng)?;
    Some(MeterEvent {
        meter_id: reading.meter_id.clone(),
        timestamp: reading.timestamp,
        event_type,
        event_description: describe_background(event_type, rng),
    })
}
