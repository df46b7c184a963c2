//! Gemini ASCII Protocol
//!
//! Implements the character-echoed ASCII command protocol spoken by Parker
//! Motion Gemini drives over RS-232.
//!
//! A command goes out one character at a time while the drive's echo is read
//! back and corrected with backspaces, then the response is collected until
//! one of a set of terminators shows up and is split into the echoed command,
//! an optional drive error and the output lines.

pub mod codec;
mod driver;
mod error;
pub mod reader;
pub mod response;
pub mod serial;
pub mod stream;
pub mod writer;

pub use codec::{strip_commands, Command};
pub use driver::{AsciiRs232, Driver, TerminatorPlan};
pub use error::ProtocolError;
pub use reader::{Deadline, Terminators};
pub use response::{DriveErrorCode, ParsedResponse};
pub use serial::open_port;
pub use stream::{SerialChannel, Transport};

/// Default baud rate of a Gemini drive's RS-232 port
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default timeout for writing a command and reading its response, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Backspace, used to erase a mistyped character on the drive's input line
pub const BACKSPACE: u8 = 0x08;

/// Carriage return, submits the current input line
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Prefix that makes a command execute immediately instead of being queued
pub const IMMEDIATE_PREFIX: char = '!';

/// Prompt the drive prints after every line while a program or profile is being defined
pub const CONTINUATION_MARKER: &str = "- ";
