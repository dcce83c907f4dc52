//! Weight engine: turns listening-history signals into an inclusion weight.
//!
//! A weight lives in `[0, 10]`; `weight / 10` is the probability a track is
//! kept. All arithmetic is over fixed tier tables, randomness only enters at
//! the final [`should_include`] draw.

use crate::model::PlayHistorySignal;
use rand::Rng;

/// Full inclusion weight. A track with no history signal keeps it.
pub const MAX_WEIGHT: f64 = 10.0;

/// Base penalty for the number of times a track sits in the "too much" list.
///
/// Breakpoints are fixed: one occurrence, two, three or more.
#[must_use]
pub const fn overplay_penalty(overplay_count: u32) -> f64 {
    match overplay_count {
        0 => 0.0,
        1 => 5.0,
        2 => 7.0,
        _ => 9.0,
    }
}

/// Base penalty for a track's position in the user's top tracks.
///
/// Ranks at 200 and deeper are not penalised.
#[must_use]
pub const fn rank_penalty(top_rank: Option<usize>) -> f64 {
    match top_rank {
        Some(rank) if rank < 50 => 5.0,
        Some(rank) if rank < 100 => 4.0,
        Some(rank) if rank < 200 => 3.0,
        _ => 0.0,
    }
}

/// Extra base penalty for an artist that keeps showing up in the "too much"
/// list, counted by occurrence.
#[must_use]
pub const fn artist_penalty(artist_overplay: u32) -> f64 {
    match artist_overplay {
        n if n >= 6 => 3.0,
        n if n >= 3 => 2.0,
        _ => 0.0,
    }
}

/// Clamp a raw weight into `[0, 10]`.
#[inline]
#[must_use]
pub fn clamp_weight(raw: f64) -> f64 {
    raw.clamp(0.0, MAX_WEIGHT)
}

/// Track-level weight.
///
/// Starts from [`MAX_WEIGHT`] and subtracts two penalties:
///
/// | `overplay_count` | penalty | | `top_rank`  | penalty |
/// |------------------|---------|-|-------------|---------|
/// | 0                | 0       | | `< 50`      | 5       |
/// | 1                | 5       | | `< 100`     | 4       |
/// | 2                | 7       | | `< 200`     | 3       |
/// | 3 or more        | 9       | | other/none  | 0       |
///
/// `top_rank` is 0-based, so the user's favourite track has rank `0`.
///
/// # Modifier
///
/// Each penalty term is scaled by `modifier` on its own before it is
/// subtracted, so a modifier of `0` leaves every track at full weight and large
/// modifiers bottom out at `0` instead of going negative. Negative modifiers
/// are not rejected; they raise the weight, which then clamps at `10`.
///
/// # Examples
///
/// ```
/// use playlistrx::weight::compute_weight;
///
/// assert_eq!(compute_weight(0, None, 1.0), 10.0);
/// assert_eq!(compute_weight(1, None, 1.0), 5.0);
/// // 10 - 9 - 5 clamps to zero
/// assert_eq!(compute_weight(3, Some(10), 1.0), 0.0);
/// // halved penalties: 10 - 3.5 - 1.5
/// assert_eq!(compute_weight(2, Some(150), 0.5), 5.0);
/// ```
#[must_use]
pub fn compute_weight(overplay_count: u32, top_rank: Option<usize>, modifier: f64) -> f64 {
    clamp_weight(raw_weight(overplay_count, top_rank, modifier))
}

/// Track-level weight plus the optional artist escalation, clamped once at the end.
///
/// `artist_overplay` is `None` when artist-level features are off.
#[must_use]
pub fn compute_weight_with_artist(
    signal: PlayHistorySignal,
    artist_overplay: Option<u32>,
    modifier: f64,
) -> f64 {
    let escalation = artist_overplay.map_or(0.0, |count| artist_penalty(count) * modifier);
    clamp_weight(raw_weight(signal.overplay_count, signal.top_rank, modifier) - escalation)
}

#[inline]
fn raw_weight(overplay_count: u32, top_rank: Option<usize>, modifier: f64) -> f64 {
    MAX_WEIGHT
        - overplay_penalty(overplay_count) * modifier
        - rank_penalty(top_rank) * modifier
}

/// Draw once from `rng` and keep the track when the draw falls under `weight / 10`.
pub fn should_include<R: Rng + ?Sized>(weight: f64, rng: &mut R) -> bool {
    let draw: f64 = rng.gen();
    draw < clamp_weight(weight) / MAX_WEIGHT
}

/// Outcome of weighing a single track, kept for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightDecision {
    pub weight: f64,
    pub included: bool,
}

impl WeightDecision {
    /// Weigh and draw in one step.
    pub fn decide<R: Rng + ?Sized>(weight: f64, rng: &mut R) -> Self {
        Self {
            weight,
            included: should_include(weight, rng),
        }
    }

    /// Whether anything pulled the track below full weight.
    #[must_use]
    pub fn penalised(&self) -> bool {
        self.weight < MAX_WEIGHT
    }
}
