//! Command codec
//!
//! Sanitizes raw command text and frames it for transmission.
//!
//! The drive only understands 7-bit ASCII. Anything after a `;` is a comment
//! and is never sent, and surrounding whitespace is dropped. Immediate
//! commands carry a leading `!`.

use serde::{Deserialize, Serialize};

use super::{ProtocolError, IMMEDIATE_PREFIX};

/// A sanitized drive command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command text without comment or surrounding whitespace
    text: String,
    /// Execute right away instead of queueing
    immediate: bool,
}

impl Command {
    /// Sanitize raw command text into a queued command
    ///
    /// Everything from the first `;` on is dropped along with surrounding
    /// whitespace. Carriage returns or line feeds left inside the command
    /// would submit a partial line to the drive, so they are rejected.
    pub fn sanitize(raw: &str) -> Result<Self, ProtocolError> {
        let text = raw.split(';').next().unwrap_or_default().trim();

        if text.contains(['\r', '\n']) {
            return Err(ProtocolError::InvalidCommand(text.to_string()));
        }

        Ok(Self {
            text: text.to_string(),
            immediate: false,
        })
    }

    /// Sanitize raw command text into an immediate command
    pub fn immediate(raw: &str) -> Result<Self, ProtocolError> {
        Ok(Self::sanitize(raw)?.with_immediate(true))
    }

    /// Set whether the command is immediate
    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Sanitized text, without any immediate prefix that framing would add
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the command is framed with `!`
    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    /// Nothing left after sanitizing
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text exactly as it goes out on the wire (minus the trailing CR)
    ///
    /// The `!` is only added when it is not already there.
    pub fn framed_text(&self) -> String {
        if self.immediate && !self.text.starts_with(IMMEDIATE_PREFIX) {
            format!("{}{}", IMMEDIATE_PREFIX, self.text)
        } else {
            self.text.clone()
        }
    }

    /// Encode the framed command into bytes
    pub fn frame(&self) -> Result<Vec<u8>, ProtocolError> {
        encode(&self.framed_text())
    }
}

/// Encode text using the drive's 7-bit character set
pub fn encode(text: &str) -> Result<Vec<u8>, ProtocolError> {
    text.chars()
        .enumerate()
        .map(|(position, character)| {
            if character.is_ascii() {
                Ok(character as u8)
            } else {
                Err(ProtocolError::EncodingError {
                    character,
                    position,
                })
            }
        })
        .collect()
}

/// Decode bytes received from the drive
///
/// Bytes outside the 7-bit set become U+FFFD instead of failing, since a
/// garbled response is still worth parsing for its error line.
pub fn decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                b as char
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect()
}

/// Strip a batch of commands, dropping the ones left blank
pub fn strip_commands<S: AsRef<str>>(commands: &[S]) -> Result<Vec<String>, ProtocolError> {
    let mut stripped = Vec::with_capacity(commands.len());
    for raw in commands {
        let command = Command::sanitize(raw.as_ref())?;
        if !command.is_empty() {
            stripped.push(command.text);
        }
    }
    Ok(stripped)
}
