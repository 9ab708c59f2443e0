//! Trait boundary to the engine's external collaborators.
//!
//! The engine performs no I/O of its own. The bot wires these traits to
//! its RPC, oracle, and SDK clients; tests wire them to the doubles in
//! [`mocks`] or to the generated mockall types.

use {
    crate::{ActiveBinSnapshot, PositionRange, StrategyKind},
    async_trait::async_trait,
    solana_sdk::pubkey::Pubkey,
    std::{
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
    thiserror::Error,
};

/// Failure of an upstream state or price fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("collaborator request failed")]
    Upstream(#[source] anyhow::Error),

    #[error("collaborator returned malformed data: {0}")]
    Malformed(String),
}

/// Failure of the third-party strategy fill call.
#[derive(Debug, Error)]
pub enum FillError {
    #[error("strategy fill produced a malformed amount: {0}")]
    Malformed(f64),

    #[error(transparent)]
    Sdk(#[from] anyhow::Error),
}

/// Inputs the third-party SDK needs for its own fill calculation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillRequest {
    pub active_bin: ActiveBinSnapshot,
    pub amount_x: f64,
    pub range: PositionRange,
    pub strategy: StrategyKind,
}

/// Reads the pool's active-bin state from chain.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait]
pub trait PoolStateReading: Send + Sync + 'static {
    async fn active_bin_snapshot(&self, pool: Pubkey) -> Result<ActiveBinSnapshot, SourceError>;
}

/// Supplies an independent exchange rate between two mints.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait]
pub trait OraclePriceEstimating: Send + Sync + 'static {
    /// Units of Y per unit of X. `Ok(None)` means the oracle has no
    /// opinion on this pair, which is not an error.
    async fn oracle_price_ratio(
        &self,
        mint_x: Pubkey,
        mint_y: Pubkey,
    ) -> Result<Option<f64>, SourceError>;
}

/// The third-party SDK's strategy-specific fill calculation.
///
/// Synchronous: the SDK computes this locally from the same pool state the
/// engine already holds.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait StrategyFilling: Send + Sync + 'static {
    fn paired_amount(&self, request: &FillRequest) -> Result<f64, FillError>;
}

/// Which external feed supplies the oracle price ratio.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OracleEstimatorKind {
    Jupiter,
    Pyth,
    Birdeye,
}

impl Display for OracleEstimatorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            Self::Jupiter => "jupiter",
            Self::Pyth => "pyth",
            Self::Birdeye => "birdeye",
        };
        write!(f, "{name}")
    }
}

impl FromStr for OracleEstimatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jupiter" => Ok(Self::Jupiter),
            "pyth" => Ok(Self::Pyth),
            "birdeye" => Ok(Self::Birdeye),
            _ => Err(anyhow::anyhow!("unsupported oracle price estimator: {s}")),
        }
    }
}

pub mod mocks {
    use super::*;

    /// Pool source returning a fixed snapshot.
    pub struct FakePool(pub ActiveBinSnapshot);

    #[async_trait]
    impl PoolStateReading for FakePool {
        async fn active_bin_snapshot(
            &self,
            _pool: Pubkey,
        ) -> Result<ActiveBinSnapshot, SourceError> {
            Ok(self.0)
        }
    }

    /// Oracle returning a fixed opinion (or none).
    pub struct FakeOracle(pub Option<f64>);

    #[async_trait]
    impl OraclePriceEstimating for FakeOracle {
        async fn oracle_price_ratio(
            &self,
            _mint_x: Pubkey,
            _mint_y: Pubkey,
        ) -> Result<Option<f64>, SourceError> {
            Ok(self.0)
        }
    }

    /// Fill returning a fixed amount.
    pub struct FakeFill(pub f64);

    impl StrategyFilling for FakeFill {
        fn paired_amount(&self, _request: &FillRequest) -> Result<f64, FillError> {
            Ok(self.0)
        }
    }

    /// Fill that always fails.
    pub struct FailingFill;

    impl StrategyFilling for FailingFill {
        fn paired_amount(&self, _request: &FillRequest) -> Result<f64, FillError> {
            Err(FillError::Sdk(anyhow::anyhow!("always fail")))
        }
    }
}
