//! Decision policy picking which source's paired amount to trust.

use {
    crate::{
        ActiveBinSnapshot, AllocationError, PositionRange, StrategyKind,
        deviation::{self, DeviationReport, MAX_RELATIVE_DEVIATION},
        robust,
        sources::{FillRequest, StrategyFilling},
    },
    bin_price::DecimalScale,
    serde::Serialize,
};

/// One allocation question: how much Y pairs with `amount_x` over `range`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AllocationRequest {
    pub amount_x: f64,
    pub range: PositionRange,
    pub strategy: StrategyKind,
    pub active_bin: ActiveBinSnapshot,
    pub decimals: DecimalScale,
    /// Independent oracle price ratio; `None` means no oracle opinion.
    pub oracle_price: Option<f64>,
}

/// Resolved paired amount plus how it was derived.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Resolution {
    pub amount_y: f64,
    /// The answer is anchored on the oracle price instead of pool state.
    pub used_oracle: bool,
    /// The answer comes from the robust bin-by-bin calculation.
    pub used_robust: bool,
    pub health: DeviationReport,
}

/// Which source ultimately produced the paired amount.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Source {
    Robust,
    OracleAnchor,
    StrategyFill,
    PoolAnchor,
}

/// Re-exposes the price health classification for UI display without
/// running the allocation decision.
pub fn check_price_health(pool_price: f64, oracle_price: Option<f64>) -> DeviationReport {
    deviation::classify(pool_price, oracle_price)
}

/// Resolves the paired amount for `request`.
///
/// The policy, in order: classify pool health and compute the robust
/// answer; with a diverged pool never consult the strategy fill (it reads
/// the same compromised state) and prefer the robust answer, then the
/// oracle anchor; with a healthy pool prefer the robust answer for Spot,
/// and for Curve/BidAsk take the strategy fill unless it disagrees with
/// the robust answer beyond [`MAX_RELATIVE_DEVIATION`] or fails outright.
/// A pool-price anchor is the final net; if even that is unusable the
/// decision fails, naming every attempted source.
///
/// Every branch is one-shot and synchronous over already-fetched inputs;
/// nothing retries.
pub fn resolve_allocation(
    request: &AllocationRequest,
    fill: &dyn StrategyFilling,
) -> Result<Resolution, AllocationError> {
    let active_bin = &request.active_bin;
    let pool_price =
        bin_price::price_of_bin(active_bin.bin_id, active_bin.bin_step, request.decimals)?;
    let health = deviation::classify(pool_price, request.oracle_price);

    // Zero means "this range cannot absorb X", not a priced answer.
    let robust_y = match robust::required_paired_amount(
        request.amount_x,
        request.range,
        active_bin,
        request.decimals,
    )? {
        amount if amount > 0.0 => Some(amount),
        _ => None,
    };

    let mut attempted = Vec::new();
    let (amount_y, source) = if health.is_healthy {
        resolve_healthy(request, pool_price, robust_y, fill, &mut attempted)
    } else {
        resolve_diverged(request, pool_price, &health, robust_y, &mut attempted)
    };

    if !amount_y.is_finite() {
        return Err(AllocationError::AllSourcesExhausted { attempted });
    }
    tracing::debug!(
        amount_x = request.amount_x,
        amount_y,
        ?source,
        healthy = health.is_healthy,
        "resolved paired amount"
    );
    Ok(Resolution {
        amount_y,
        used_oracle: source == Source::OracleAnchor,
        used_robust: source == Source::Robust,
        health,
    })
}

/// The pool disagrees with the oracle: its state is presumed manipulated
/// or desynchronized, so the strategy fill (which reads that same state)
/// is bypassed entirely.
fn resolve_diverged(
    request: &AllocationRequest,
    pool_price: f64,
    health: &DeviationReport,
    robust_y: Option<f64>,
    attempted: &mut Vec<&'static str>,
) -> (f64, Source) {
    tracing::warn!(
        pool_price,
        oracle_price = ?request.oracle_price,
        deviation_ratio = ?health.deviation_ratio,
        "pool price diverges from oracle; bypassing strategy fill"
    );
    attempted.push("robust");
    if let Some(amount) = robust_y {
        return (amount, Source::Robust);
    }
    attempted.push("oracle-anchor");
    if let Some(oracle_price) = request.oracle_price {
        return (request.amount_x * oracle_price, Source::OracleAnchor);
    }
    // A diverged report implies an oracle opinion; the pool anchor keeps
    // the policy total anyway.
    attempted.push("pool-anchor");
    (request.amount_x * pool_price, Source::PoolAnchor)
}

fn resolve_healthy(
    request: &AllocationRequest,
    pool_price: f64,
    robust_y: Option<f64>,
    fill: &dyn StrategyFilling,
    attempted: &mut Vec<&'static str>,
) -> (f64, Source) {
    match request.strategy {
        StrategyKind::Spot => robust_or_pool_anchor(request, pool_price, robust_y, attempted),
        StrategyKind::Curve | StrategyKind::BidAsk => {
            attempted.push("strategy-fill");
            let fill_request = FillRequest {
                active_bin: request.active_bin,
                amount_x: request.amount_x,
                range: request.range,
                strategy: request.strategy,
            };
            match fill.paired_amount(&fill_request) {
                Ok(sdk_y) if !sdk_y.is_finite() || sdk_y < 0.0 => {
                    tracing::warn!(sdk_y, "strategy fill returned a malformed amount");
                    robust_or_pool_anchor(request, pool_price, robust_y, attempted)
                }
                Ok(sdk_y) => match robust_y {
                    Some(robust)
                        if (sdk_y - robust).abs() / robust > MAX_RELATIVE_DEVIATION =>
                    {
                        tracing::warn!(
                            sdk_y,
                            robust,
                            "strategy fill disagrees with robust calculation; discarding it"
                        );
                        attempted.push("robust");
                        (robust, Source::Robust)
                    }
                    _ => (sdk_y, Source::StrategyFill),
                },
                Err(err) => {
                    tracing::warn!(?err, "strategy fill failed");
                    robust_or_pool_anchor(request, pool_price, robust_y, attempted)
                }
            }
        }
    }
}

fn robust_or_pool_anchor(
    request: &AllocationRequest,
    pool_price: f64,
    robust_y: Option<f64>,
    attempted: &mut Vec<&'static str>,
) -> (f64, Source) {
    attempted.push("robust");
    if let Some(amount) = robust_y {
        return (amount, Source::Robust);
    }
    attempted.push("pool-anchor");
    (request.amount_x * pool_price, Source::PoolAnchor)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::sources::{FillError, MockStrategyFilling},
        anyhow::anyhow,
    };

    const EQUAL: DecimalScale = DecimalScale { x: 6, y: 6 };

    fn snapshot() -> ActiveBinSnapshot {
        ActiveBinSnapshot {
            bin_id: 0,
            bin_step: 20,
            raw_amount_x: None,
            raw_amount_y: None,
        }
    }

    fn request(strategy: StrategyKind, oracle_price: Option<f64>) -> AllocationRequest {
        AllocationRequest {
            amount_x: 1000.0,
            range: PositionRange {
                min_bin_id: -10,
                max_bin_id: 10,
            },
            strategy,
            active_bin: snapshot(),
            decimals: EQUAL,
            oracle_price,
        }
    }

    fn robust_y(request: &AllocationRequest) -> f64 {
        robust::required_paired_amount(
            request.amount_x,
            request.range,
            &request.active_bin,
            request.decimals,
        )
        .unwrap()
    }

    #[test]
    fn diverged_pool_bypasses_strategy_fill() {
        let mut fill = MockStrategyFilling::new();
        fill.expect_paired_amount().never();

        // Pool price 1.0 against an oracle at 0.4 is a 150% deviation.
        let request = request(StrategyKind::Curve, Some(0.4));
        let resolution = resolve_allocation(&request, &fill).unwrap();

        assert!(!resolution.health.is_healthy);
        assert!(resolution.used_robust);
        assert!(!resolution.used_oracle);
        assert_eq!(resolution.amount_y, robust_y(&request));
    }

    #[test]
    fn diverged_pool_without_robust_anchors_on_oracle() {
        let fill = MockStrategyFilling::new();
        let mut request = request(StrategyKind::Spot, Some(0.2));
        // Entirely below the active bin: the robust answer degenerates.
        request.range = PositionRange {
            min_bin_id: -20,
            max_bin_id: -5,
        };

        let resolution = resolve_allocation(&request, &fill).unwrap();
        assert!(resolution.used_oracle);
        assert!(!resolution.used_robust);
        assert_eq!(resolution.amount_y, 1000.0 * 0.2);
    }

    #[test]
    fn healthy_spot_prefers_robust() {
        let mut fill = MockStrategyFilling::new();
        fill.expect_paired_amount().never();

        let request = request(StrategyKind::Spot, None);
        let resolution = resolve_allocation(&request, &fill).unwrap();

        assert!(resolution.health.is_healthy);
        assert!(resolution.used_robust);
        assert_eq!(resolution.amount_y, robust_y(&request));
    }

    #[test]
    fn healthy_spot_without_robust_anchors_on_pool_price() {
        let fill = MockStrategyFilling::new();
        let mut request = request(StrategyKind::Spot, None);
        request.range = PositionRange {
            min_bin_id: -20,
            max_bin_id: -5,
        };

        let resolution = resolve_allocation(&request, &fill).unwrap();
        assert!(!resolution.used_robust);
        assert!(!resolution.used_oracle);
        // price(0) == 1 for an equal-decimals pair.
        assert_eq!(resolution.amount_y, 1000.0);
    }

    #[test]
    fn healthy_curve_takes_agreeing_fill() {
        let request = request(StrategyKind::Curve, Some(1.0));
        let sdk_y = robust_y(&request) * 1.4;

        let mut fill = MockStrategyFilling::new();
        fill.expect_paired_amount()
            .times(1)
            .returning(move |_| Ok(sdk_y));

        let resolution = resolve_allocation(&request, &fill).unwrap();
        assert!(!resolution.used_robust);
        assert!(!resolution.used_oracle);
        assert_eq!(resolution.amount_y, sdk_y);
    }

    #[test]
    fn disagreeing_fill_is_discarded() {
        let request = request(StrategyKind::BidAsk, Some(1.0));
        let expected = robust_y(&request);
        let sdk_y = expected * 1.6;

        let mut fill = MockStrategyFilling::new();
        fill.expect_paired_amount()
            .times(1)
            .returning(move |_| Ok(sdk_y));

        let resolution = resolve_allocation(&request, &fill).unwrap();
        assert!(resolution.used_robust);
        assert_eq!(resolution.amount_y, expected);
    }

    #[test]
    fn failing_fill_falls_back_to_robust() {
        let request = request(StrategyKind::Curve, Some(1.0));
        let mut fill = MockStrategyFilling::new();
        fill.expect_paired_amount()
            .times(1)
            .returning(|_| Err(FillError::Sdk(anyhow!("sdk exploded"))));

        let resolution = resolve_allocation(&request, &fill).unwrap();
        assert!(resolution.used_robust);
        assert_eq!(resolution.amount_y, robust_y(&request));
    }

    #[test]
    fn malformed_fill_falls_back_to_robust() {
        let request = request(StrategyKind::Curve, Some(1.0));
        let mut fill = MockStrategyFilling::new();
        fill.expect_paired_amount()
            .times(1)
            .returning(|_| Ok(f64::NAN));

        let resolution = resolve_allocation(&request, &fill).unwrap();
        assert!(resolution.used_robust);
        assert_eq!(resolution.amount_y, robust_y(&request));
    }

    #[test]
    fn overflowing_inputs_exhaust_all_sources() {
        let fill = MockStrategyFilling::new();
        let request = AllocationRequest {
            amount_x: f64::MAX,
            range: PositionRange {
                min_bin_id: -20,
                max_bin_id: -5,
            },
            strategy: StrategyKind::Spot,
            active_bin: snapshot(),
            // Pool price 10^6: the pool anchor overflows f64.
            decimals: DecimalScale { x: 6, y: 0 },
            oracle_price: None,
        };

        match resolve_allocation(&request, &fill) {
            Err(AllocationError::AllSourcesExhausted { attempted }) => {
                assert_eq!(attempted, vec!["robust", "pool-anchor"]);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn check_price_health_reports_deviation() {
        let report = check_price_health(2.0, Some(1.0));
        assert_eq!(report.deviation_ratio, Some(1.0));
        assert!(!report.is_healthy);
    }
}
