//! Move Sequences
//!
//! Declarative motion (cycles of point-to-point moves with waits) compiled
//! into Gemini program or profile instructions, plus duration estimates for
//! trapezoidal velocity profiles.

mod error;
pub mod sequence;
pub mod timing;

pub use error::SequenceError;
pub use sequence::{
    compile_sequence, convert_sequence_to_motor_units, load_sequence, validate_sequence, Cycle,
    Move,
};
pub use timing::{move_time, sequence_time};
