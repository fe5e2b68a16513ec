//! Defensive meter-value arithmetic.
//!
//! SteVe stores meter readings as strings in whatever unit the charge point
//! reports (Wh in practice). A missing or garbled reading must never abort
//! classification, so every parse degrades to 0.0.

/// Parse an optional meter-value string, treating anything unparseable as 0.0.
pub fn parse_meter_value(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok()).unwrap_or(0.0)
}

/// Energy delivered over a session in kWh.
///
/// Meter values are milli-units (Wh); the stop summary is reported in kWh.
/// Absent stop value yields 0.0 rather than a fault.
pub fn delivered_kwh(start_value: Option<&str>, stop_value: Option<&str>) -> f64 {
    match stop_value {
        Some(stop) => {
            let stop = parse_meter_value(Some(stop));
            let start = parse_meter_value(start_value);
            (stop - start) / 1000.0
        }
        None => 0.0,
    }
}
