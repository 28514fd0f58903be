use time::PrimitiveDateTime;

/// One interval reading of a simulated three-phase meter.
///
/// Field order matches the column order of the measurements table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    pub meter_id: String,
    #[cfg_attr(feature = "serde", serde(with = "super::csv_timestamp"))]
    pub timestamp: PrimitiveDateTime,
    pub active_energy_import_kwh: f64,
    pub reactive_energy_import_kvarh: f64,
    pub active_energy_export_kwh: f64,
    pub reactive_energy_export_kvarh: f64,
    pub voltage_phase1_v: f64,
    pub voltage_phase2_v: f64,
    pub voltage_phase3_v: f64,
    pub current_phase1_a: f64,
    pub current_phase2_a: f64,
    pub current_phase3_a: f64,
    pub maximum_demand_kw: f64,
    pub power_factor: f64,
}

impl Measurement {
    pub fn voltages(&self) -> [f64; 3] {
        [self.voltage_phase1_v, self.voltage_phase2_v, self.voltage_phase3_v]
    }

    pub fn currents(&self) -> [f64; 3] {
        [self.current_phase1_a, self.current_phase2_a, self.current_phase3_a]
    }
}
