use time::PrimitiveDateTime;

use crate::domain::{EventType, Measurement, MeterEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTypeCount {
    pub event_type: EventType,
    pub count: usize,
}

/// Time-ordered load profile for a single meter over `[start, end)`.
pub fn load_profile<'a>(
    measurements: &'a [Measurement],
    meter_id: &str,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Vec<&'a Measurement> {
    let mut rows: Vec<&Measurement> = measurements
        .iter()
        .filter(|m| m.meter_id == meter_id && m.timestamp >= start && m.timestamp < end)
        .collect();
    rows.sort_by_key(|m| m.timestamp);
    rows
}

/// Distinct meter ids in order of first appearance.
pub fn meter_ids(measurements: &[Measurement]) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::new();
    for m in measurements {
        if !ids.contains(&m.meter_id.as_str()) {
            ids.push(&m.meter_id);
        }
    }
    ids
}

/// Events raised by one meter at one timestamp, i.e. the events sharing the
/// `(meter_id, timestamp)` key of a measurement.
pub fn events_at<'a>(
    events: &'a [MeterEvent],
    meter_id: &str,
    timestamp: PrimitiveDateTime,
) -> Vec<&'a MeterEvent> {
    events
        .iter()
        .filter(|e| e.meter_id == meter_id && e.timestamp == timestamp)
        .collect()
}

/// Event counts per type, in the canonical type order, skipping absent types.
pub fn event_counts_by_type(events: &[MeterEvent]) -> Vec<EventTypeCount> {
    EventType::ALL
        .iter()
        .map(|&event_type| EventTypeCount {
            event_type,
            count: events.iter().filter(|e| e.event_type == event_type).count(),
        })
        .filter(|c| c.count > 0)
        .collect()
}
