//! Echo-correcting writer
//!
//! The drive echoes every character it receives. Writing one character at a
//! time and reading the echo back shows exactly what the drive has on its
//! input line, so a corrupted character can be erased with a backspace and
//! sent again before the line is submitted.

use std::time::Duration;

use super::{Deadline, ProtocolError, Transport, BACKSPACE, CARRIAGE_RETURN};

/// Outcome of writing one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Echo matched the command before the line was submitted
    Confirmed,
    /// Deadline passed before the echo matched; the drive may have seen a
    /// different command
    Unconfirmed {
        /// What the drive had echoed when the deadline passed
        echo: String,
    },
    /// Written without reading the echo back
    Unchecked,
}

/// Apply backspaces found in the echo
///
/// A backspace at the very start erases only itself; anywhere else it also
/// erases the character before it.
pub fn apply_backspaces(echo: &mut Vec<u8>) {
    while let Some(index) = echo.iter().position(|&b| b == BACKSPACE) {
        if index == 0 {
            echo.remove(0);
        } else {
            echo.drain(index - 1..=index);
        }
    }
}

/// Write `target` using the echo to detect and correct transmission errors
///
/// The line is always submitted with a carriage return afterwards, even if
/// the deadline expired first. A mismatch then shows up later as a
/// difference between the sent and echoed command.
pub fn write_checked<T: Transport + ?Sized>(
    transport: &mut T,
    target: &[u8],
    timeout: Option<Duration>,
    inter_char_delay: Duration,
) -> Result<WriteOutcome, ProtocolError> {
    let deadline = Deadline::after(timeout);
    let mut echo: Vec<u8> = Vec::with_capacity(target.len());

    while echo != target && !deadline.is_expired() {
        if target.starts_with(&echo) {
            transport.write_all(&target[echo.len()..=echo.len()])?;
        } else {
            tracing::trace!(
                "write_checked: echo {:?} diverged from {:?}, backspacing",
                String::from_utf8_lossy(&echo),
                String::from_utf8_lossy(target)
            );
            transport.write_all(&[BACKSPACE])?;
        }

        std::thread::sleep(inter_char_delay);
        echo.extend(transport.read_available()?);
        apply_backspaces(&mut echo);
    }

    let outcome = if echo == target {
        WriteOutcome::Confirmed
    } else {
        tracing::warn!(
            "write_checked: deadline reached, drive echoed {:?} instead of {:?}",
            String::from_utf8_lossy(&echo),
            String::from_utf8_lossy(target)
        );
        WriteOutcome::Unconfirmed {
            echo: String::from_utf8_lossy(&echo).into_owned(),
        }
    };

    transport.write_all(&[CARRIAGE_RETURN])?;
    transport.flush()?;
    Ok(outcome)
}

/// Write `target` one character at a time without looking at the echo
pub fn write_unchecked<T: Transport + ?Sized>(
    transport: &mut T,
    target: &[u8],
    inter_char_delay: Duration,
) -> Result<WriteOutcome, ProtocolError> {
    for byte in target {
        transport.write_all(std::slice::from_ref(byte))?;
        std::thread::sleep(inter_char_delay);
    }
    transport.write_all(&[CARRIAGE_RETURN])?;
    transport.flush()?;
    Ok(WriteOutcome::Unchecked)
}
