mod measurement;
mod meter_event;

pub use measurement::Measurement;
pub use meter_event::{EventType, MeterEvent, UnknownEventType};

// Timestamps in the tabular outputs render as e.g. `2024-01-01 00:30:00`.
#[cfg(feature = "serde")]
time::serde::format_description!(
    csv_timestamp,
    PrimitiveDateTime,
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);
