//! Gemini Drive Session
//!
//! Stateful access to a Gemini GV6/GT6 drive: parameters, motion control,
//! stored programs and profiles.

mod error;
pub mod parameter;
pub mod program;
mod session;
pub mod versions;

pub use error::GeminiError;
pub use parameter::{DriveParameter, ParameterType, ParameterValue};
pub use program::ProgramKind;
pub use session::{
    ControlCommand, DriveIdentity, GeminiDrive, COMMAND_TIMEOUT, PROGRAM_RUN_TIMEOUT,
};
pub use versions::{DriveModel, GeminiVersions};
