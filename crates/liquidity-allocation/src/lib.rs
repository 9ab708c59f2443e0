//! Robust liquidity allocation for bin-based (DLMM) pools.
//!
//! Opening a two-sided position requires knowing how much of the paired
//! asset Y a given amount of asset X implies over a bin range. The pool's
//! own state and the third-party SDK that normally answers this both read
//! the same on-chain data, which can be manipulated or stale. This crate
//! derives an independent answer and reconciles the disagreeing sources:
//!
//! * [`deviation`] — classifies the pool price against an external oracle.
//! * [`robust`] — SDK-independent bin-by-bin paired-amount calculation.
//! * [`reconciler`] — the fixed decision policy picking the answer to use.
//! * [`sources`] — trait boundary to the pool-state, oracle, and SDK
//!   collaborators.
//! * [`planner`] — async front door: fetch the inputs, then resolve.
//!
//! Every component is a pure function over already-materialized inputs;
//! nothing here caches, retries, or mutates shared state.

pub mod deviation;
pub mod planner;
pub mod reconciler;
pub mod robust;
pub mod sources;

pub use {
    bin_price::{DecimalScale, PriceError, PriceRange},
    deviation::{DeviationReport, MAX_RELATIVE_DEVIATION, classify},
    planner::{AllocationPlanner, Arguments, PlanError, PlanRequest},
    reconciler::{AllocationRequest, Resolution, check_price_health, resolve_allocation},
    robust::required_paired_amount,
    sources::{
        FillError, FillRequest, OracleEstimatorKind, OraclePriceEstimating, PoolStateReading,
        SourceError, StrategyFilling,
    },
};

use {
    std::{
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
    thiserror::Error,
};

/// Inclusive bin range of a position. May lie entirely above, entirely
/// below, or straddle the pool's active bin; all three are meaningful.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PositionRange {
    pub min_bin_id: i32,
    pub max_bin_id: i32,
}

impl PositionRange {
    /// True when `bin_id` falls inside the range.
    pub fn contains(&self, bin_id: i32) -> bool {
        (self.min_bin_id..=self.max_bin_id).contains(&bin_id)
    }

    /// All bins of the range, in ascending order.
    pub fn bins(&self) -> std::ops::RangeInclusive<i32> {
        self.min_bin_id..=self.max_bin_id
    }
}

/// Composition of the pool's currently active bin, read fresh per request
/// and never cached here.
///
/// Raw amounts are integer token units as stored on chain; callers that
/// only have a shallow account read omit them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActiveBinSnapshot {
    pub bin_id: i32,
    pub bin_step: u16,
    pub raw_amount_x: Option<u64>,
    pub raw_amount_y: Option<u64>,
}

/// Liquidity distribution shape requested by the user.
///
/// Only the reconciler's fallback order depends on it; the robust
/// calculation always prices the uniform baseline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StrategyKind {
    Spot,
    Curve,
    BidAsk,
}

impl Display for StrategyKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            Self::Spot => "spot",
            Self::Curve => "curve",
            Self::BidAsk => "bid-ask",
        };
        write!(f, "{name}")
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spot" => Ok(Self::Spot),
            "curve" => Ok(Self::Curve),
            "bid-ask" => Ok(Self::BidAsk),
            _ => Err(anyhow::anyhow!("unsupported strategy: {s}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error(transparent)]
    Price(#[from] PriceError),

    /// Every source in the decision policy produced an unusable value.
    #[error("all allocation sources exhausted: {attempted:?}")]
    AllSourcesExhausted { attempted: Vec<&'static str> },
}
