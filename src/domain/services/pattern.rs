use crate::domain::entities::scan_result::FluctuationMatch;

/// Evaluate the most recent entries of a change series against the
/// fluctuation band.
///
/// The last `consecutive_periods` changes must each have magnitude
/// inside `[min_pct, max_pct]`; both boundaries are inclusive and
/// comparison is by absolute value, so an up-move and an equal-magnitude
/// down-move count the same. A series shorter than `consecutive_periods`
/// is a non-match with empty evidence — an expected negative outcome,
/// never an error.
pub fn match_fluctuation_pattern(
    changes: &[f64],
    min_pct: f64,
    max_pct: f64,
    consecutive_periods: usize,
) -> FluctuationMatch {
    if consecutive_periods == 0 || changes.len() < consecutive_periods {
        return FluctuationMatch::no_match();
    }

    let evidence = changes[changes.len() - consecutive_periods..].to_vec();
    let matched = evidence.iter().all(|change| {
        let magnitude = change.abs();
        magnitude >= min_pct && magnitude <= max_pct
    });

    FluctuationMatch { matched, evidence }
}
