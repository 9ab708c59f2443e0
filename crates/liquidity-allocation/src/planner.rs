//! Async front door: fetch the collaborator inputs, then run the engine.

use {
    crate::{
        AllocationError, PositionRange, StrategyKind,
        reconciler::{self, AllocationRequest, Resolution},
        sources::{
            OracleEstimatorKind, OraclePriceEstimating, PoolStateReading, SourceError,
            StrategyFilling,
        },
    },
    bin_price::DecimalScale,
    solana_sdk::pubkey::Pubkey,
    std::{
        fmt::{self, Display, Formatter},
        sync::Arc,
        time::Duration,
    },
    thiserror::Error,
};

/// Planner configuration.
#[derive(clap::Parser)]
#[group(skip)]
pub struct Arguments {
    /// Which feed supplies the independent oracle price ratio.
    #[clap(long, env, default_value = "jupiter")]
    pub oracle_price_estimator: OracleEstimatorKind,

    /// Hard deadline for the pool snapshot and oracle price fetches issued
    /// per allocation request.
    #[clap(
        long,
        env,
        default_value = "5s",
        value_parser = humantime::parse_duration,
    )]
    pub allocation_fetch_timeout: Duration,
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Self {
            oracle_price_estimator,
            allocation_fetch_timeout,
        } = self;

        writeln!(f, "oracle_price_estimator: {oracle_price_estimator}")?;
        writeln!(f, "allocation_fetch_timeout: {allocation_fetch_timeout:?}")?;

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("pool state unavailable")]
    PoolState(#[source] SourceError),

    #[error("timed out fetching pool state and oracle price")]
    Timeout,

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// One position-opening question from the bot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanRequest {
    pub pool: Pubkey,
    pub mint_x: Pubkey,
    pub mint_y: Pubkey,
    pub amount_x: f64,
    pub range: PositionRange,
    pub strategy: StrategyKind,
    pub decimals: DecimalScale,
}

/// Fetches the two independent collaborator inputs concurrently and runs
/// the allocation decision over them.
///
/// The pure engine imposes no ordering between the fetches beyond "both
/// resolved (or explicitly absent) before it runs"; the deadline lives
/// here because timeouts belong to the fetch layer, not the computation.
pub struct AllocationPlanner {
    pool: Arc<dyn PoolStateReading>,
    oracle: Arc<dyn OraclePriceEstimating>,
    fill: Arc<dyn StrategyFilling>,
    fetch_timeout: Duration,
}

impl AllocationPlanner {
    pub fn new(
        pool: Arc<dyn PoolStateReading>,
        oracle: Arc<dyn OraclePriceEstimating>,
        fill: Arc<dyn StrategyFilling>,
        args: &Arguments,
    ) -> Self {
        Self {
            pool,
            oracle,
            fill,
            fetch_timeout: args.allocation_fetch_timeout,
        }
    }

    pub async fn plan(&self, request: &PlanRequest) -> Result<Resolution, PlanError> {
        let fetches = futures::future::join(
            self.pool.active_bin_snapshot(request.pool),
            self.oracle.oracle_price_ratio(request.mint_x, request.mint_y),
        );
        let (snapshot, oracle) = tokio::time::timeout(self.fetch_timeout, fetches)
            .await
            .map_err(|_| PlanError::Timeout)?;

        // Pool state is indispensable; a missing oracle opinion is not.
        let active_bin = snapshot.map_err(PlanError::PoolState)?;
        let oracle_price = match oracle {
            Ok(price) => price,
            Err(err) => {
                tracing::warn!(
                    ?err,
                    "oracle price fetch failed; continuing without an oracle opinion"
                );
                None
            }
        };

        let resolution = reconciler::resolve_allocation(
            &AllocationRequest {
                amount_x: request.amount_x,
                range: request.range,
                strategy: request.strategy,
                active_bin,
                decimals: request.decimals,
                oracle_price,
            },
            self.fill.as_ref(),
        )?;
        Ok(resolution)
    }
}
