//! ASCII RS-232 driver
//!
//! Owns the transport to the drive and turns commands into echo-checked
//! writes plus terminated reads, with retries.
//!
//! While connected the drive is switched to a terse communication mode:
//! echo on, error level 4, no prompts, carriage returns between response
//! lines and a line feed after the last one. The factory settings are put
//! back when the driver is closed or dropped.

use std::time::Duration;

use super::writer::{self, WriteOutcome};
use super::{
    codec, open_port, reader, Command, ParsedResponse, ProtocolError, SerialChannel,
    Terminators, Transport,
};
use crate::config::{ConnectionConfig, ProtocolTiming};

/// Communication settings used while the driver is connected. The first
/// one turns echo on, so it can't be echo checked.
const SESSION_SETTINGS: [&str; 7] = [
    "ECHO1",
    "ERRLVL4",
    "BOT0,0,0",
    "EOT10,0,0",
    "EOL13,0,0",
    "ERRBAD0,0,0,0",
    "ERROK0,0,0,0",
];

/// Factory communication settings (from the drive manual)
const FACTORY_SETTINGS: [&str; 7] = [
    "ECHO1",
    "ERRLVL4",
    "BOT0,0,0",
    "EOT13,0,0",
    "EOL13,10,0",
    "ERRBAD13,10,63,32",
    "ERROK13,10,62,32",
];

/// Terminators for each command of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminatorPlan {
    /// Same terminators for every command
    Shared(Terminators),
    /// One set per command, in order
    PerCommand(Vec<Terminators>),
}

impl TerminatorPlan {
    fn for_commands(&self, count: usize) -> Result<Vec<&Terminators>, ProtocolError> {
        match self {
            TerminatorPlan::Shared(terminators) => Ok(vec![terminators; count]),
            TerminatorPlan::PerCommand(list) => {
                if list.len() != count {
                    return Err(ProtocolError::TerminatorCountMismatch {
                        expected: count,
                        actual: list.len(),
                    });
                }
                Ok(list.iter().collect())
            }
        }
    }
}

impl Default for TerminatorPlan {
    fn default() -> Self {
        TerminatorPlan::Shared(Terminators::default())
    }
}

impl From<Terminators> for TerminatorPlan {
    fn from(terminators: Terminators) -> Self {
        TerminatorPlan::Shared(terminators)
    }
}

impl From<Vec<Terminators>> for TerminatorPlan {
    fn from(list: Vec<Terminators>) -> Self {
        TerminatorPlan::PerCommand(list)
    }
}

/// Command-level access to a drive
///
/// The drive session only talks through this trait, so another link (e.g. a
/// different line discipline) can be dropped in without touching it.
pub trait Driver {
    /// Send one command, retrying up to `max_retries` times while the
    /// response shows an error. The last response is returned either way.
    fn send_command(
        &mut self,
        command: &str,
        immediate: bool,
        timeout: Option<Duration>,
        max_retries: u32,
        terminators: &Terminators,
    ) -> Result<ParsedResponse, ProtocolError>;

    /// Send commands in order, stopping at the first one that still fails
    /// after its retries. Blank commands are skipped.
    fn send_commands(
        &mut self,
        commands: &[String],
        timeout: Option<Duration>,
        max_retries: u32,
        terminators: &TerminatorPlan,
    ) -> Result<Vec<ParsedResponse>, ProtocolError>;

    /// Put the drive's communication settings back to factory defaults.
    /// Only the first call does anything.
    fn restore_defaults(&mut self) -> Result<(), ProtocolError>;

    /// Whether a response shows a transmission or drive error
    fn command_error(&self, response: &ParsedResponse) -> bool {
        response.has_error()
    }

    /// Sanitize commands and drop the blank ones
    fn strip_commands(&self, commands: &[String]) -> Result<Vec<String>, ProtocolError> {
        codec::strip_commands(commands)
    }
}

/// Driver for a Gemini drive in ASCII mode
pub struct AsciiRs232<T: Transport> {
    transport: T,
    check_echo: bool,
    write_timeout: Option<Duration>,
    timing: ProtocolTiming,
    restored: bool,
}

impl AsciiRs232<SerialChannel> {
    /// Open the configured serial port and take over the drive
    pub fn open(config: &ConnectionConfig) -> Result<Self, ProtocolError> {
        tracing::info!(
            "Opening Gemini drive on {} at {} baud",
            config.port_name,
            config.baud_rate
        );
        let port = open_port(
            &config.port_name,
            Some(config.baud_rate),
            config.write_timeout(),
        )?;
        Self::new(SerialChannel::new(port), config)
    }
}

impl<T: Transport> AsciiRs232<T> {
    /// Wrap a transport and switch the drive to session communication settings
    pub fn new(mut transport: T, config: &ConnectionConfig) -> Result<Self, ProtocolError> {
        transport.clear_input_buffer()?;
        let mut driver = Self {
            transport,
            check_echo: config.check_echo,
            write_timeout: Some(config.write_timeout()),
            timing: config.timing.clone(),
            restored: false,
        };
        driver.apply_settings(&SESSION_SETTINGS, true)?;
        Ok(driver)
    }

    /// Whether writes are echo checked
    pub fn check_echo(&self) -> bool {
        self.check_echo
    }

    /// Protocol pacing in use
    pub fn timing(&self) -> &ProtocolTiming {
        &self.timing
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Restore factory communication settings and release the drive
    pub fn close(mut self) -> Result<(), ProtocolError> {
        self.restore_defaults()
    }

    /// Send a block of settings, then give the drive time to digest them and
    /// throw the replies away
    fn apply_settings(
        &mut self,
        settings: &[&str],
        first_unchecked: bool,
    ) -> Result<(), ProtocolError> {
        for (i, setting) in settings.iter().enumerate() {
            let command = Command::immediate(setting)?;
            let check_echo = self.check_echo && !(first_unchecked && i == 0);
            self.write_command(&command, check_echo, self.write_timeout)?;
        }
        std::thread::sleep(self.timing.settle_delay());
        let discarded = self.transport.discard_input()?;
        tracing::debug!(
            "apply_settings: {} settings sent, {} reply bytes discarded",
            settings.len(),
            discarded
        );
        Ok(())
    }

    /// Write one command (without reading its response)
    fn write_command(
        &mut self,
        command: &Command,
        check_echo: bool,
        echo_timeout: Option<Duration>,
    ) -> Result<WriteOutcome, ProtocolError> {
        let bytes = command.frame()?;

        // junk from a previous exchange would otherwise be taken for echo
        self.transport.discard_input()?;

        if check_echo {
            writer::write_checked(
                &mut self.transport,
                &bytes,
                echo_timeout,
                self.timing.inter_char_delay(),
            )
        } else {
            writer::write_unchecked(&mut self.transport, &bytes, self.timing.inter_char_delay())
        }
    }

    /// One attempt: write, read and parse
    fn exchange(
        &mut self,
        command: &Command,
        timeout: Option<Duration>,
        terminators: &Terminators,
    ) -> Result<ParsedResponse, ProtocolError> {
        let sent = command.framed_text();
        // an unbounded exchange also waits on the echo without limit
        let echo_timeout = timeout.and(self.write_timeout);
        let outcome = self.write_command(command, self.check_echo, echo_timeout)?;
        let mut output = reader::read_response(
            &mut self.transport,
            timeout,
            terminators,
            self.timing.poll_interval(),
        )?;

        // the writer already consumed the echo; an unconfirmed one is put
        // back as seen so the mismatch shows in the response
        match &outcome {
            WriteOutcome::Confirmed => output.insert_str(0, &sent),
            WriteOutcome::Unconfirmed { echo } => output.insert_str(0, echo),
            WriteOutcome::Unchecked => {}
        }

        let response = ParsedResponse::parse(sent, output);
        tracing::debug!(
            "exchange: {:?} -> echo {:?}, error {:?}, {} output lines",
            response.command,
            response.echoed_command,
            response.error,
            response.output_lines.len()
        );
        Ok(response)
    }
}

impl<T: Transport> Driver for AsciiRs232<T> {
    fn send_command(
        &mut self,
        command: &str,
        immediate: bool,
        timeout: Option<Duration>,
        max_retries: u32,
        terminators: &Terminators,
    ) -> Result<ParsedResponse, ProtocolError> {
        let command = Command::sanitize(command)?.with_immediate(immediate);

        let mut attempt = 0;
        loop {
            let response = self.exchange(&command, timeout, terminators)?;
            if !response.has_error() || attempt >= max_retries {
                return Ok(response);
            }
            attempt += 1;
            tracing::warn!(
                "send_command: {:?} failed (echo {:?}, error {:?}), retry {}/{}",
                response.command,
                response.echoed_command,
                response.error,
                attempt,
                max_retries
            );
            std::thread::sleep(self.timing.retry_pause());
        }
    }

    fn send_commands(
        &mut self,
        commands: &[String],
        timeout: Option<Duration>,
        max_retries: u32,
        terminators: &TerminatorPlan,
    ) -> Result<Vec<ParsedResponse>, ProtocolError> {
        let per_command = terminators.for_commands(commands.len())?;

        let mut responses = Vec::with_capacity(commands.len());
        for (raw, terminators) in commands.iter().zip(per_command) {
            let command = Command::sanitize(raw)?;
            if command.is_empty() {
                continue;
            }

            let response =
                self.send_command(command.text(), false, timeout, max_retries, terminators)?;
            let failed = response.has_error();
            responses.push(response);
            if failed {
                tracing::warn!(
                    "send_commands: stopping at {:?}, {} of {} commands not sent",
                    command.text(),
                    commands.len() - responses.len(),
                    commands.len()
                );
                break;
            }
            std::thread::sleep(self.timing.command_pause());
        }
        Ok(responses)
    }

    fn restore_defaults(&mut self) -> Result<(), ProtocolError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        tracing::info!("Restoring factory communication settings");
        self.apply_settings(&FACTORY_SETTINGS, false)
    }
}

impl<T: Transport> Drop for AsciiRs232<T> {
    fn drop(&mut self) {
        if let Err(e) = self.restore_defaults() {
            tracing::warn!("Failed to restore communication settings: {}", e);
        }
    }
}
