//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the drive
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The serial port couldn't be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Command text the drive can't receive
    #[error("Character {character:?} at position {position} is outside the 7-bit ASCII set")]
    EncodingError {
        /// Offending character
        character: char,
        /// Character index in the command
        position: usize,
    },

    /// A CR or LF inside a command would submit it early
    #[error("Command contains an embedded line terminator: {0:?}")]
    InvalidCommand(String),

    /// A per-command terminator plan doesn't cover the batch
    #[error("Got {actual} terminator sets for {expected} commands")]
    TerminatorCountMismatch {
        /// Commands in the batch
        expected: usize,
        /// Terminator sets given
        actual: usize,
    },

    /// Transport read or write failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
