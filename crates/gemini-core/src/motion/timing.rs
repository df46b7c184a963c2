//! Move duration estimates
//!
//! Each move is a trapezoidal velocity profile: accelerate at `A` towards
//! `V`, cruise, decelerate at `AD` to a stop. Short moves never reach `V`
//! and become triangular.

use super::{Cycle, Move};

/// Time in seconds to complete `m`
///
/// Distances are divided by `eres` to get pitches; pass 1 when the move is
/// already in physical units.
pub fn move_time(m: &Move, eres: f64) -> f64 {
    let a = m.a.abs();
    let ad = m.deceleration().abs();
    let v = m.v.abs();
    let d = m.d.abs() / eres;

    let ramp_times = [v / a, v / ad];
    let ramp_distances = [
        0.5 * a * ramp_times[0].powi(2),
        0.5 * ad * ramp_times[1].powi(2),
    ];
    let ramp_distance: f64 = ramp_distances.iter().sum();

    if ramp_distance <= d {
        ramp_times.iter().sum::<f64>() + (d - ramp_distance) / v
    } else {
        // d = a t1² (1 + a/ad) / 2, total t = t1 (1 + a/ad)
        (2.0 * d * (1.0 + a / ad) / a).sqrt()
    }
}

/// Total time of a sequence, waits included
pub fn sequence_time(cycles: &[Cycle], eres: f64) -> f64 {
    cycles
        .iter()
        .map(|cycle| {
            let waits: f64 = cycle.wait_times.iter().sum();
            let moves: f64 = cycle.moves.iter().map(|m| move_time(m, eres)).sum();
            f64::from(cycle.iterations) * (waits + moves)
        })
        .sum()
}
