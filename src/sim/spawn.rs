//! Next-tier selection
//!
//! Early on only the smallest tier is offered. As larger merged fruit pile
//! up, slightly larger starting tiers join the pool, still weighted toward
//! the small end.

use rand::Rng;

use super::world::BodySnapshot;

/// Highest tier a fresh drop may be, given the largest tier on the field
pub fn spawn_ceiling(max_tier_on_field: u8) -> u8 {
    match max_tier_on_field {
        0..=1 => 0,
        2..=3 => 1,
        4..=5 => 2,
        _ => 3,
    }
}

/// Largest tier among dynamic fruit (0 if none)
pub fn max_tier_on_field<'a>(bodies: impl IntoIterator<Item = &'a BodySnapshot>) -> u8 {
    bodies
        .into_iter()
        .filter(|b| !b.is_static)
        .filter_map(|b| b.tag.tier())
        .max()
        .unwrap_or(0)
}

/// Draw the next tier to offer.
///
/// Every tier in `0..=ceiling` appears `weight` times in the pool, so the
/// draw is uniform across the spawnable tiers.
pub fn pick_next_tier<'a, R: Rng + ?Sized>(
    bodies: impl IntoIterator<Item = &'a BodySnapshot>,
    weight: usize,
    rng: &mut R,
) -> u8 {
    let ceiling = spawn_ceiling(max_tier_on_field(bodies));
    let weight = weight.max(1);
    let pool: Vec<u8> = (0..=ceiling)
        .flat_map(|tier| std::iter::repeat_n(tier, weight))
        .collect();
    pool[rng.random_range(0..pool.len())]
}
