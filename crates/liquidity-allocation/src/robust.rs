//! SDK-independent calculation of the paired amount a position needs.

use {
    crate::{ActiveBinSnapshot, PositionRange},
    bin_price::{DecimalScale, PriceError},
};

/// Amount of asset Y needed to pair `amount_x` over `range`, integrating
/// the uniform ("spot") distribution baseline bin by bin.
///
/// Bins above the active bin hold only X, bins below only Y. The active
/// bin uses its actual value-weighted composition when both raw amounts
/// are known and positive, and an even 50/50 split otherwise — an
/// approximation of the real on-chain distribution that callers accept by
/// omitting the raw amounts.
///
/// Returns `0.0` when no bin in the range can absorb X, i.e. the range
/// lies entirely below the active bin and the position is Y-only. Callers
/// must treat that as "no answer", not as a priced amount.
pub fn required_paired_amount(
    amount_x: f64,
    range: PositionRange,
    active_bin: &ActiveBinSnapshot,
    decimals: DecimalScale,
) -> Result<f64, PriceError> {
    let mut capacity_x = 0.0;
    let mut capacity_y = 0.0;
    for bin_id in range.bins() {
        let price = bin_price::price_of_bin(bin_id, active_bin.bin_step, decimals)?;
        let (share_x, share_y) = composition(bin_id, active_bin, price);
        // Capacity of one unit of value placed in this bin, per asset.
        capacity_x += share_x / price;
        capacity_y += share_y;
    }
    if capacity_x == 0.0 {
        return Ok(0.0);
    }
    // Solve the value scale at which the X side absorbs exactly amount_x.
    let value_scale = amount_x / capacity_x;
    Ok(value_scale * capacity_y)
}

/// Fractions of a bin's value held in X and Y respectively.
fn composition(bin_id: i32, active_bin: &ActiveBinSnapshot, price: f64) -> (f64, f64) {
    if bin_id > active_bin.bin_id {
        return (1.0, 0.0);
    }
    if bin_id < active_bin.bin_id {
        return (0.0, 1.0);
    }
    match (active_bin.raw_amount_x, active_bin.raw_amount_y) {
        (Some(raw_x), Some(raw_y)) if raw_x > 0 && raw_y > 0 => {
            let value_x = raw_x as f64 * price;
            let total = value_x + raw_y as f64;
            (value_x / total, raw_y as f64 / total)
        }
        _ => (0.5, 0.5),
    }
}
