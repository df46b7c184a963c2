//! Drive session errors

use thiserror::Error;

use crate::protocol::ProtocolError;

/// Errors reported by a drive session
#[derive(Error, Debug)]
pub enum GeminiError {
    /// Link or framing failure below the session
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The drive didn't answer a parameter query with a value
    #[error("Couldn't retrieve parameter {name}")]
    ParameterRetrieval {
        /// Parameter mnemonic, e.g. `ERES`
        name: String,
    },

    /// Parameter type name other than `bool`, `int` or `float`
    #[error("Only bool, int and float parameters are supported, not '{0}'")]
    UnsupportedType(String),

    /// The drive answered with text that doesn't parse as the expected type
    #[error("Invalid value '{value}' for parameter {name}")]
    InvalidValue {
        /// Parameter mnemonic
        name: String,
        /// Value text as reported
        value: String,
    },

    /// `TREV` didn't identify a GV6 or GT6
    #[error("Not a valid Gemini GV6 or GT6 drive (TREV reply {response:?})")]
    DeviceIdentity {
        /// Raw `TREV` response
        response: String,
    },
}
