//! Spreading pool-wide counts over zones

use hcloud_apis::IntOrPercent;

/// Share of `total` for zone `index` of `count`. The first `total % count`
/// zones get one more, so the shares always add up to `total`.
pub fn distribute_over_zones(total: i32, index: usize, count: usize) -> i32 {
    if count == 0 {
        return 0;
    }
    // Zone counts are tiny; a pool never has more zones than fit an i32.
    let count = i32::try_from(count).unwrap_or(i32::MAX);
    let index = i32::try_from(index).unwrap_or(i32::MAX);
    total / count + i32::from(index < total % count)
}

/// Like [`distribute_over_zones`], but a positive total gives every zone at
/// least 1. The shares then add up to more than `total` when there are
/// fewer units than zones.
pub fn distribute_positive_over_zones(total: i32, index: usize, count: usize) -> i32 {
    let share = distribute_over_zones(total, index, count);
    if total > 0 { share.max(1) } else { share }
}

/// Integers are spread with [`distribute_positive_over_zones`] so a rolling
/// update can progress in every zone; percentages apply per zone unchanged.
pub fn distribute_int_or_percent(value: &IntOrPercent, index: usize, count: usize) -> IntOrPercent {
    match value {
        IntOrPercent::Int(n) => IntOrPercent::Int(distribute_positive_over_zones(*n, index, count)),
        IntOrPercent::Percent(p) => IntOrPercent::Percent(p.clone()),
    }
}
