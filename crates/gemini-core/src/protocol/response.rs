//! Response parsing
//!
//! A drive response looks like
//!
//! ```text
//! <echoed command>\r[*<ERROR>\r]<*output line>\r...<*output line>\n
//! ```
//!
//! Lines are separated by carriage returns and the whole response ends with
//! a line feed (followed by `"- "` while a program or profile is being defined).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::CONTINUATION_MARKER;

/// Errors the drive reports on the line after the echo (sent with a leading `*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriveErrorCode {
    /// Bad drive address
    InvalidAddress,
    /// Malformed value
    InvalidData,
    /// Value above the allowed range
    InvalidDataHigh,
    /// Value below the allowed range
    InvalidDataLow,
    /// Unknown command or program name
    UndefinedLabel,
}

impl DriveErrorCode {
    /// Every code, in matching order
    pub const ALL: [DriveErrorCode; 5] = [
        DriveErrorCode::InvalidAddress,
        DriveErrorCode::InvalidData,
        DriveErrorCode::InvalidDataHigh,
        DriveErrorCode::InvalidDataLow,
        DriveErrorCode::UndefinedLabel,
    ];

    /// Literal as printed by the drive, without the `*`
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveErrorCode::InvalidAddress => "INVALID_ADDRESS",
            DriveErrorCode::InvalidData => "INVALID_DATA",
            DriveErrorCode::InvalidDataHigh => "INVALID_DATA_HIGH",
            DriveErrorCode::InvalidDataLow => "INVALID_DATA_LOW",
            DriveErrorCode::UndefinedLabel => "UNDEFINED_LABEL",
        }
    }

    /// Recognize a full response line (including the leading `*`)
    pub fn from_line(line: &str) -> Option<Self> {
        line.strip_prefix('*')?.parse().ok()
    }
}

impl fmt::Display for DriveErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or(())
    }
}

/// One command's exchange with the drive, broken into its parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    /// Command as it was framed and sent (including any `!`)
    pub command: String,
    /// Full response text, line endings preserved
    pub raw: String,
    /// First line of the response
    pub echoed_command: Option<String>,
    /// Error reported by the drive
    pub error: Option<DriveErrorCode>,
    /// Remaining lines, in order, still carrying their leading `*`
    pub output_lines: Vec<String>,
}

impl ParsedResponse {
    /// Split raw response text into echo, error and output lines
    ///
    /// A trailing continuation prompt is dropped along with the final line ending.
    pub fn parse(command: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let body = raw
            .strip_suffix(CONTINUATION_MARKER)
            .filter(|rest| rest.ends_with('\n'))
            .unwrap_or(raw.as_str());
        let mut lines = body
            .trim_end_matches(['\r', '\n'])
            .split('\r')
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into_iter();

        let echoed_command = lines.next();
        let mut output_lines: Vec<String> = lines.collect();

        let error = output_lines
            .first()
            .and_then(|line| DriveErrorCode::from_line(line));
        if error.is_some() {
            output_lines.remove(0);
        }

        Self {
            command: command.into(),
            raw,
            echoed_command,
            error,
            output_lines,
        }
    }

    /// Whether the exchange failed
    ///
    /// Either the drive reported an error or the echo doesn't match what was
    /// sent. Inside a program/profile definition the echo may carry the
    /// `"- "` prompt in front.
    pub fn has_error(&self) -> bool {
        let echo_matches = match &self.echoed_command {
            Some(echo) => {
                echo == &self.command
                    || echo
                        .strip_prefix(CONTINUATION_MARKER)
                        .is_some_and(|rest| rest == self.command)
            }
            None => false,
        };
        !echo_matches || self.error.is_some()
    }

    /// Output lines with their leading `*` removed
    pub fn stripped_output(&self) -> Vec<String> {
        self.output_lines
            .iter()
            .map(|line| line.strip_prefix('*').unwrap_or(line).to_string())
            .collect()
    }
}
