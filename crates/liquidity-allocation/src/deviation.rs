//! Health classification of the pool price against an external oracle.

use serde::Serialize;

/// Relative deviation beyond which two independent answers for the same
/// quantity are considered to disagree.
///
/// One policy bound intentionally serves both checks that use it: the
/// pool-vs-oracle health classification and the reconciler's SDK-vs-robust
/// cross-check. Both ask the same question, so a second constant would only
/// invite silent divergence.
pub const MAX_RELATIVE_DEVIATION: f64 = 0.5;

/// Outcome of comparing the pool-derived price with the oracle's.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DeviationReport {
    pub pool_price: f64,
    /// `None` when no oracle opinion was available.
    pub oracle_price: Option<f64>,
    /// `|pool - oracle| / oracle`; undefined without an oracle price.
    pub deviation_ratio: Option<f64>,
    pub is_healthy: bool,
}

/// Compares the two price sources.
///
/// Without an oracle opinion there is no basis for distrust and the pair
/// is reported healthy. This performs no I/O; both prices are supplied by
/// the caller.
pub fn classify(pool_price: f64, oracle_price: Option<f64>) -> DeviationReport {
    let deviation_ratio = oracle_price.map(|oracle| (pool_price - oracle).abs() / oracle);
    DeviationReport {
        pool_price,
        oracle_price,
        deviation_ratio,
        is_healthy: deviation_ratio.is_none_or(|ratio| ratio <= MAX_RELATIVE_DEVIATION),
    }
}
