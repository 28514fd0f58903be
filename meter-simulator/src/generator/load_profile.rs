use rand::Rng;

/// Lower and upper bound applied to the jittered base load factor.
pub const LOAD_FACTOR_FLOOR: f64 = 0.2;
pub const LOAD_FACTOR_CEIL: f64 = 1.0;

/// Time-of-day band as `[start_hour, end_hour)` with its base load factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadBand {
    pub start_hour: u8,
    pub end_hour: u8,
    pub load_factor: f64,
}

pub const LOAD_BANDS: [LoadBand; 5] = [
    // night
    LoadBand { start_hour: 0, end_hour: 6, load_factor: 0.3 },
    // morning peak
    LoadBand { start_hour: 6, end_hour: 9, load_factor: 0.8 },
    // daytime
    LoadBand { start_hour: 9, end_hour: 17, load_factor: 0.6 },
    // evening peak
    LoadBand { start_hour: 17, end_hour: 20, load_factor: 0.9 },
    // late evening
    LoadBand { start_hour: 20, end_hour: 24, load_factor: 0.4 },
];

/// Base load factor for an hour of the day (0..=23).
pub fn base_load_factor(hour: u8) -> f64 {
    LOAD_BANDS
        .iter()
        .find(|band| hour >= band.start_hour && hour < band.end_hour)
        .map(|band| band.load_factor)
        // hours past 23 do not occur for valid timestamps; treat as late evening
        .unwrap_or(LOAD_BANDS[LOAD_BANDS.len() - 1].load_factor)
}

/// Base factor for `hour` with ±5% jitter, clamped to the nominal range.
pub fn jittered_load_factor<R: Rng>(hour: u8, rng: &mut R) -> f64 {
    let jitter = rng.gen_range(0.95..=1.05);
    (base_load_factor(hour) * jitter).clamp(LOAD_FACTOR_FLOOR, LOAD_FACTOR_CEIL)
}
