//! Bus speed and filter selection for the adapter.

use crate::AdapterError;

/// CAN bit-rate commands, rates in kbit/s
const BIT_RATES: [(f64, &str); 10] = [
    (10.0, "S0"),
    (20.0, "S1"),
    (50.0, "S2"),
    (100.0, "S3"),
    (125.0, "S4"),
    (250.0, "S5"),
    (500.0, "S6"),
    (615.384, "s2"), // Trionic 5 P-bus
    (800.0, "S7"),
    (1000.0, "S8"),
];

/// Hardware filters, keyed by the identifier they let through
const FILTERS: [(u32, &str); 3] = [(0x005, "t5"), (0x220, "f7"), (0x7E0, "f8")];

/// Find the bit-rate command for a bus speed in kbit/s.
///
/// The speed has to match one of the supported rates exactly.
#[allow(clippy::float_cmp)]
pub fn resolve_bit_rate(rate: f64) -> Result<&'static str, AdapterError> {
    BIT_RATES
        .iter()
        .find(|(known, _)| *known == rate)
        .map(|(_, cmd)| *cmd)
        .ok_or(AdapterError::UnsupportedRate(rate))
}

/// Pick the filter command for the first identifier that has one.
///
/// An empty command leaves the adapter unfiltered.
pub fn resolve_filter(ids: &[u32]) -> &'static str {
    ids.iter()
        .find_map(|id| FILTERS.iter().find(|(known, _)| known == id))
        .map_or("", |(_, cmd)| *cmd)
}
