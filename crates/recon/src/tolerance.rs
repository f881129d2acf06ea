use crate::model::ToleranceVerdict;

/// Missing share as a percentage. An empty source is 0%, never an error.
pub fn missing_percentage(total_source_records: u64, total_missing_records: u64) -> f64 {
    if total_source_records == 0 {
        return 0.0;
    }
    (total_missing_records as f64 * 100.0) / total_source_records as f64
}

/// Pass strictly below tolerance; a percentage equal to the tolerance fails.
/// A run with nothing missing always passes, including at tolerance 0.0.
pub fn evaluate(
    total_source_records: u64,
    total_missing_records: u64,
    tolerance_percentage: f64,
) -> ToleranceVerdict {
    let missing_percentage = missing_percentage(total_source_records, total_missing_records);
    ToleranceVerdict {
        missing_percentage,
        tolerance_percentage,
        passed: total_missing_records == 0 || missing_percentage < tolerance_percentage,
    }
}
