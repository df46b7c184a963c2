use thiserror::Error;

/// Errors in a move sequence
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    /// A cycle must run at least once
    #[error("Cycle {cycle} has zero iterations")]
    ZeroIterations {
        /// Index of the cycle
        cycle: usize,
    },

    /// Every move needs exactly one wait time
    #[error("Cycle {cycle} has {moves} moves but {wait_times} wait times")]
    WaitTimeMismatch {
        /// Index of the cycle
        cycle: usize,
        /// Number of moves
        moves: usize,
        /// Number of wait times
        wait_times: usize,
    },

    /// NaN or infinite motion value or wait time
    #[error("Cycle {cycle} has a non-finite {field}")]
    NonFiniteValue {
        /// Index of the cycle
        cycle: usize,
        /// Field name (`A`, `AD`, `V`, `D` or `wait time`)
        field: &'static str,
    },
}
