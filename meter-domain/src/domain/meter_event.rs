use std::{fmt, str::FromStr};

use time::PrimitiveDateTime;

/// Closed set of event tags a meter can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum EventType {
    PowerOutage,
    VoltageSag,
    VoltageSwell,
    TamperDetected,
    MeterCoverOpened,
    CurrentImbalance,
    PhaseFailure,
    HighTemperature,
    MeterReset,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::PowerOutage,
        EventType::VoltageSag,
        EventType::VoltageSwell,
        EventType::TamperDetected,
        EventType::MeterCoverOpened,
        EventType::CurrentImbalance,
        EventType::PhaseFailure,
        EventType::HighTemperature,
        EventType::MeterReset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PowerOutage => "POWER_OUTAGE",
            EventType::VoltageSag => "VOLTAGE_SAG",
            EventType::VoltageSwell => "VOLTAGE_SWELL",
            EventType::TamperDetected => "TAMPER_DETECTED",
            EventType::MeterCoverOpened => "METER_COVER_OPENED",
            EventType::CurrentImbalance => "CURRENT_IMBALANCE",
            EventType::PhaseFailure => "PHASE_FAILURE",
            EventType::HighTemperature => "HIGH_TEMPERATURE",
            EventType::MeterReset => "METER_RESET",
        }
    }

    /// Tag rendered as words, e.g. `VOLTAGE_SAG` -> `Voltage Sag`.
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(|c| c.to_lowercase()))
                        .collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown event type '{0}'")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterEvent {
    pub meter_id: String,
    #[cfg_attr(feature = "serde", serde(with = "super::csv_timestamp"))]
    pub timestamp: PrimitiveDateTime,
    pub event_type: EventType,
    pub event_description: String,
}
