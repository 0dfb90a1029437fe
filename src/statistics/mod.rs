//! Per-dimension aggregation over dataset selections.
//!
//! - **[`range`]**: per-dimension min / rescale factors, cached in the dataset's property store
//! - **[`aggregate`]**: sums and value lists of a row selection (bulk mode)
//! - **[`cluster`]**: cluster-weighted means over an average-expression matrix (single-cell mode)

pub mod aggregate;
pub mod cluster;
pub mod range;

/// Round half-up to `decimals` decimal places: `floor(x * 10^d + 0.5) / 10^d`.
///
/// This is not banker's rounding; `2.5` rounds to `3.0` and `-2.5` to `-2.0` at zero decimals.
pub fn fround(x: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (x * scale + 0.5).floor() / scale
}

/// Median by selection: the element at index `len / 2` after partitioning.
///
/// For even-sized inputs this is the upper of the two middle values, not their average.
/// Values are ordered by [`f64::total_cmp`], so NaNs sort above every number and the result does
/// not depend on input order. The slice is reordered in place.
pub fn selection_median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let middle = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable_by(middle, f64::total_cmp);
    Some(*median)
}
