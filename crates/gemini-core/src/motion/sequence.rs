//! Move-sequence compiler
//!
//! A sequence is a list of [`Cycle`]s. Each cycle runs its moves in order,
//! pausing for the paired wait time after each one, and is looped when its
//! iteration count is above one.
//!
//! Only the motion parameters that change from one move to the next are
//! emitted. A loop body runs more than once, so every parameter is emitted
//! again at the top of a loop.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::SequenceError;
use crate::config::ConfigError;
use crate::drive::ProgramKind;
use crate::unit_conversion::UnitConverter;

const START_MOVE: &str = "GO1";
const WAIT_FOR_STOP: &str = "WAIT(AS.1=b0)";
const WAIT_FOR_VELOCITY_ZERO: &str = "VF0";
const START_BUFFERED_MOVE: &str = "GOBUF1";
const REVERSE_DISTANCE: &str = "D~";

/// A point-to-point move that comes to a stop at the end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Move {
    /// Acceleration
    #[serde(rename = "A")]
    pub a: f64,
    /// Deceleration, 0 meaning the same as the acceleration
    #[serde(rename = "AD", default)]
    pub ad: f64,
    /// Velocity
    #[serde(rename = "V")]
    pub v: f64,
    /// Signed distance
    #[serde(rename = "D")]
    pub d: f64,
}

impl Move {
    /// Move from acceleration, deceleration, velocity and distance
    pub fn new(a: f64, ad: f64, v: f64, d: f64) -> Self {
        Self { a, ad, v, d }
    }

    /// Deceleration with the zero sentinel resolved
    pub fn deceleration(&self) -> f64 {
        if self.ad == 0.0 {
            self.a
        } else {
            self.ad
        }
    }
}

/// Moves done `iterations` times, each followed by its wait time (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    /// Times the moves are run, at least 1
    pub iterations: u32,
    /// Moves in order
    pub moves: Vec<Move>,
    /// Pause after each move, one per move
    pub wait_times: Vec<f64>,
}

impl Cycle {
    /// Cycle of `moves` run `iterations` times
    pub fn new(iterations: u32, moves: Vec<Move>, wait_times: Vec<f64>) -> Self {
        Self {
            iterations,
            moves,
            wait_times,
        }
    }

    /// Moves paired with their wait times
    pub fn steps(&self) -> impl Iterator<Item = (&Move, f64)> + '_ {
        self.moves.iter().zip(self.wait_times.iter().copied())
    }

    fn is_looped(&self) -> bool {
        self.iterations > 1
    }
}

/// Check iteration counts, move/wait pairing and values
pub fn validate_sequence(cycles: &[Cycle]) -> Result<(), SequenceError> {
    for (index, cycle) in cycles.iter().enumerate() {
        if cycle.iterations == 0 {
            return Err(SequenceError::ZeroIterations { cycle: index });
        }
        if cycle.moves.len() != cycle.wait_times.len() {
            return Err(SequenceError::WaitTimeMismatch {
                cycle: index,
                moves: cycle.moves.len(),
                wait_times: cycle.wait_times.len(),
            });
        }
        for (m, wait) in cycle.steps() {
            let fields = [
                ("A", m.a),
                ("AD", m.ad),
                ("V", m.v),
                ("D", m.d),
                ("wait time", wait),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, value)| !value.is_finite()) {
                return Err(SequenceError::NonFiniteValue {
                    cycle: index,
                    field: *field,
                });
            }
        }
    }
    Ok(())
}

/// Load a sequence from a JSON file
pub fn load_sequence<P: AsRef<Path>>(path: P) -> Result<Vec<Cycle>, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Copy of `cycles` in motor units
///
/// Distances become whole encoder counts (truncated).
pub fn convert_sequence_to_motor_units(
    cycles: &[Cycle],
    converter: &UnitConverter,
) -> Vec<Cycle> {
    cycles
        .iter()
        .map(|cycle| Cycle {
            iterations: cycle.iterations,
            moves: cycle
                .moves
                .iter()
                .map(|m| Move {
                    a: converter.to_motor_velocity_acceleration(m.a),
                    ad: converter.to_motor_velocity_acceleration(m.ad),
                    v: converter.to_motor_velocity_acceleration(m.v),
                    d: converter.to_motor_distance(m.d).trunc(),
                })
                .collect(),
            wait_times: cycle.wait_times.clone(),
        })
        .collect()
}

/// Motion parameters last set on the drive, `None` when unknown
#[derive(Debug, Default)]
struct PreviousMotion {
    a: Option<f64>,
    ad: Option<f64>,
    v: Option<f64>,
    d: Option<f64>,
}

impl From<&Move> for PreviousMotion {
    fn from(m: &Move) -> Self {
        Self {
            a: Some(m.a),
            ad: Some(m.ad),
            v: Some(m.v),
            d: Some(m.d),
        }
    }
}

/// Round to `places` decimals, printing whole values without a fraction
fn format_rounded(value: f64, places: i32) -> String {
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    if rounded.fract() == 0.0 && rounded.abs() < i64::MAX as f64 {
        (rounded as i64).to_string()
    } else {
        rounded.to_string()
    }
}

/// Compile a move sequence into program or profile instructions
///
/// With a converter the cycles are in its length unit and are converted to
/// motor units first; otherwise they are already in motor units.
pub fn compile_sequence(
    cycles: &[Cycle],
    kind: ProgramKind,
    converter: Option<&UnitConverter>,
) -> Result<Vec<String>, SequenceError> {
    validate_sequence(cycles)?;

    let converted;
    let cycles = match converter {
        Some(converter) => {
            converted = convert_sequence_to_motor_units(cycles, converter);
            converted.as_slice()
        }
        None => cycles,
    };

    let mut commands = Vec::new();
    let mut previous = PreviousMotion::default();

    for cycle in cycles {
        if cycle.is_looped() {
            previous = PreviousMotion::default();
            commands.push(kind.loop_start(cycle.iterations));
        }

        for (m, wait) in cycle.steps() {
            let mut m = *m;
            // profiles have no "same as A" sentinel
            if kind == ProgramKind::Profile && m.ad == 0.0 {
                m.ad = m.a;
            }

            for (field, value, last) in [
                ("A", m.a, previous.a),
                ("AD", m.ad, previous.ad),
                ("V", m.v, previous.v),
            ] {
                if last != Some(value) {
                    commands.push(format!("{}{}", field, format_rounded(value, 4)));
                }
            }

            match previous.d {
                Some(last) if last == m.d => {}
                Some(last) if last == -m.d => commands.push(REVERSE_DISTANCE.to_string()),
                _ => commands.push(format!("D{}", m.d.trunc() as i64)),
            }

            match kind {
                ProgramKind::Program => {
                    commands.push(START_MOVE.to_string());
                    commands.push(WAIT_FOR_STOP.to_string());
                    if wait != 0.0 {
                        commands.push(format!("T{}", format_rounded(wait, 3)));
                    }
                }
                ProgramKind::Profile => {
                    commands.push(WAIT_FOR_VELOCITY_ZERO.to_string());
                    commands.push(START_BUFFERED_MOVE.to_string());
                    if wait != 0.0 {
                        commands.push(format!("GOWHEN(T={})", (1000.0 * wait).trunc() as i64));
                    }
                }
            }

            previous = PreviousMotion::from(&m);
        }

        if cycle.is_looped() {
            commands.push(kind.loop_end().to_string());
        }
    }

    tracing::debug!(
        "compile_sequence: {} cycles -> {} {:?} commands",
        cycles.len(),
        commands.len(),
        kind
    );
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_rounded() {
        assert_eq!(format_rounded(100.0, 4), "100");
        assert_eq!(format_rounded(0.123456, 4), "0.1235");
        assert_eq!(format_rounded(-2.5, 4), "-2.5");
        assert_eq!(format_rounded(1.0004, 3), "1");
        assert_eq!(format_rounded(-0.0, 4), "0");
    }

    #[test]
    fn test_fractional_values() {
        let cycles = vec![Cycle::new(
            1,
            vec![Move::new(12.34567, 0.0, 0.5, 1234.9)],
            vec![0.25],
        )];
        let commands = compile_sequence(&cycles, ProgramKind::Program, None).unwrap();
        assert_eq!(
            commands,
            strings(&["A12.3457", "AD0", "V0.5", "D1234", "GO1", "WAIT(AS.1=b0)", "T0.25"])
        );
    }

    #[test]
    fn test_profile_wait_is_truncated_to_milliseconds() {
        let cycles = vec![Cycle::new(1, vec![Move::new(1.0, 2.0, 1.0, 10.0)], vec![0.0125])];
        let commands = compile_sequence(&cycles, ProgramKind::Profile, None).unwrap();
        assert_eq!(commands.last().map(String::as_str), Some("GOWHEN(T=12)"));
    }

    #[test]
    fn test_validation() {
        let bad = vec![Cycle::new(0, vec![], vec![])];
        assert_eq!(
            validate_sequence(&bad),
            Err(SequenceError::ZeroIterations { cycle: 0 })
        );

        let bad = vec![Cycle::new(1, vec![Move::new(1.0, 0.0, 1.0, 1.0)], vec![])];
        assert_eq!(
            compile_sequence(&bad, ProgramKind::Program, None),
            Err(SequenceError::WaitTimeMismatch {
                cycle: 0,
                moves: 1,
                wait_times: 0
            })
        );

        let bad = vec![Cycle::new(1, vec![Move::new(1.0, 0.0, f64::NAN, 1.0)], vec![0.0])];
        assert_eq!(
            validate_sequence(&bad),
            Err(SequenceError::NonFiniteValue { cycle: 0, field: "V" })
        );
    }

    #[test]
    fn test_move_json_names() {
        let m: Move = serde_json::from_str(r#"{"A": 100, "V": 50, "D": -1000}"#).unwrap();
        assert_eq!(m, Move::new(100.0, 0.0, 50.0, -1000.0));
        assert_eq!(m.deceleration(), 100.0);
    }
}
