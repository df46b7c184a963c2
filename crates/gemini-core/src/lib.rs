//! # Gemini Core Library
//!
//! Protocol engine for Parker Motion Gemini GV6/GT6 servo and stepper drives.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The echo-corrected ASCII RS-232 command protocol
//! - A drive session with parameter access, motion control and stored
//!   programs/profiles
//! - A move-sequence compiler with duration estimates
//! - Linear motor unit conversion
//!
//! ## Example
//!
//! ```rust,ignore
//! use gemini_core::prelude::*;
//!
//! let config = ConnectionConfig::for_port("/dev/ttyS0");
//! let mut drive = GeminiDrive::open(&config)?;
//!
//! let cycles = load_sequence("sequence.json")?;
//! let commands = compile_sequence(&cycles, ProgramKind::Program, None)?;
//! drive.set_program_or_profile(1, &commands, ProgramKind::Program)?;
//! drive.set_energized(true)?;
//! drive.run_program_or_profile(1, ProgramKind::Program, Some(PROGRAM_RUN_TIMEOUT))?;
//! drive.close()?;
//! ```

pub mod config;
pub mod drive;
pub mod motion;
pub mod protocol;
pub mod unit_conversion;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConnectionConfig, ProtocolTiming};
    pub use crate::drive::{
        ControlCommand, GeminiDrive, GeminiError, ParameterType, ParameterValue, ProgramKind,
        PROGRAM_RUN_TIMEOUT,
    };
    pub use crate::motion::{compile_sequence, load_sequence, sequence_time, Cycle, Move};
    pub use crate::protocol::{AsciiRs232, Driver, ParsedResponse, Terminators, Transport};
    pub use crate::unit_conversion::{LengthUnit, UnitConverter};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
