//! Statistics calculation helpers.
//!
//! Small numeric building blocks shared by the dataset builders and the
//! standings engine:
//! - Zero-safe ratios and means
//! - Post-hoc clutch metrics
//! - Rolling prior-window averages

/// Divide, yielding 0.0 when the denominator is zero or the result is not finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    safe_ratio(values.iter().sum(), values.len() as f64)
}

/// Clutch attempts per match.
pub fn avg_clutches(total_clutches: u32, matches: u32) -> f64 {
    safe_ratio(total_clutches as f64, matches as f64)
}

/// Clutch success percentage (0-100).
pub fn clutch_success(total_clutches_won: u32, total_clutches: u32) -> f64 {
    safe_ratio(total_clutches_won as f64, total_clutches as f64) * 100.0
}

/// Win percentage (0-100).
pub fn win_rate(wins: u32, matches: u32) -> f64 {
    safe_ratio(wins as f64, matches as f64) * 100.0
}

/// Mean of up to `window` values immediately before `index`.
/// `None` when nothing precedes `index`.
pub fn prior_window_mean(values: &[Option<f64>], index: usize, window: usize) -> Option<f64> {
    let start = index.saturating_sub(window);
    let prior: Vec<f64> = values[start..index.min(values.len())]
        .iter()
        .flatten()
        .copied()
        .collect();
    if prior.is_empty() {
        None
    } else {
        Some(mean(&prior))
    }
}
