//! Decimal rounding shared by the bookkeeping stages.

/// Round `value` to `dp` decimal places, half away from zero.
///
/// The pipeline's published figures are rounded at fixed precisions
/// (signal strength 6 dp, prices and P&L 4 dp, reported equity 2 dp), so
/// identical inputs always produce bit-identical events.
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}
