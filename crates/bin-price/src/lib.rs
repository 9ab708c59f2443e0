//! Price arithmetic for bin-based (DLMM) liquidity pools.
//!
//! A bin-based pool quotes prices on a discrete grid: bin `i` trades at
//! `(1 + bin_step / 10_000)^i`, decimal-adjusted for the two token mints of
//! the pair. This crate maps bin indices to prices and back. It performs no
//! I/O and holds no state; pool snapshots are supplied by the caller.

use {serde::Serialize, thiserror::Error};

/// Basis point denominator used by bin step sizes (100 bps = 1%).
pub const BASIS_POINT_MAX: u16 = 10_000;

/// Mint decimals of the two tokens of a pair, X first.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct DecimalScale {
    pub x: u8,
    pub y: u8,
}

/// Price summary of an inclusive bin range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PriceRange {
    pub min_price: f64,
    pub max_price: f64,
    /// Price at the middle bin, `floor((min + max) / 2)`.
    pub center_price: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum PriceError {
    /// Bin steps are fixed per pool and always positive; a zero step would
    /// collapse the whole grid onto one price.
    #[error("bin step must be positive")]
    ZeroBinStep,

    #[error("inverted bin range [{min_bin_id}, {max_bin_id}]")]
    InvertedRange { min_bin_id: i32, max_bin_id: i32 },

    /// `|bin_id|` is too large for the price to fit an `f64`.
    #[error("price of bin {bin_id} is not representable")]
    Unrepresentable { bin_id: i32 },

    #[error("expected a positive finite price, got {0}")]
    NonPositivePrice(f64),
}

/// Price of asset Y per unit of asset X at the given bin.
///
/// `(1 + bin_step / 10_000)^bin_id * 10^(decimals.x - decimals.y)`.
/// Strictly increasing in `bin_id`; bin 0 of an equal-decimals pair trades
/// at exactly 1. Bins whose price over- or underflows `f64` are rejected,
/// never silently wrapped.
pub fn price_of_bin(bin_id: i32, bin_step: u16, decimals: DecimalScale) -> Result<f64, PriceError> {
    if bin_step == 0 {
        return Err(PriceError::ZeroBinStep);
    }
    let raw = step_ratio(bin_step).powi(bin_id);
    let price = raw * 10f64.powi(i32::from(decimals.x) - i32::from(decimals.y));
    if !price.is_finite() || price <= 0.0 {
        return Err(PriceError::Unrepresentable { bin_id });
    }
    Ok(price)
}

/// Min, max and center prices of an inclusive bin range.
pub fn price_range(
    min_bin_id: i32,
    max_bin_id: i32,
    bin_step: u16,
    decimals: DecimalScale,
) -> Result<PriceRange, PriceError> {
    if min_bin_id > max_bin_id {
        return Err(PriceError::InvertedRange {
            min_bin_id,
            max_bin_id,
        });
    }
    // Sum in i64 so extreme bins don't overflow; div_euclid floors for
    // negative sums as well. The average of two i32 always fits an i32.
    let center_bin = (i64::from(min_bin_id) + i64::from(max_bin_id)).div_euclid(2) as i32;
    Ok(PriceRange {
        min_price: price_of_bin(min_bin_id, bin_step, decimals)?,
        max_price: price_of_bin(max_bin_id, bin_step, decimals)?,
        center_price: price_of_bin(center_bin, bin_step, decimals)?,
    })
}

/// Bin whose price is closest to `price` on the pool's grid.
///
/// Inverse of [`price_of_bin`] up to rounding to the nearest bin.
pub fn bin_for_price(price: f64, bin_step: u16, decimals: DecimalScale) -> Result<i32, PriceError> {
    if bin_step == 0 {
        return Err(PriceError::ZeroBinStep);
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(PriceError::NonPositivePrice(price));
    }
    let raw = price / 10f64.powi(i32::from(decimals.x) - i32::from(decimals.y));
    Ok((raw.ln() / step_ratio(bin_step).ln()).round() as i32)
}

fn step_ratio(bin_step: u16) -> f64 {
    1.0 + f64::from(bin_step) / f64::from(BASIS_POINT_MAX)
}
