mod series_queries;

pub use series_queries::{event_counts_by_type, events_at, load_profile, meter_ids, EventTypeCount};
