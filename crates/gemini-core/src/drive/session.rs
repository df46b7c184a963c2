//! Gemini drive session
//!
//! Wraps a [`Driver`] after checking that a GV6 or GT6 is on the other end.
//! The driver restores the drive's factory communication settings when the
//! session is closed or dropped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

use super::{
    DriveModel, DriveParameter, GeminiError, GeminiVersions, ParameterType, ParameterValue,
    ProgramKind,
};
use crate::config::ConnectionConfig;
use crate::protocol::{
    AsciiRs232, Driver, ParsedResponse, ProtocolError, SerialChannel, TerminatorPlan, Terminators,
};
use crate::unit_conversion::{LengthUnit, UnitConverter};

/// Default timeout for a single command
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Default timeout for running a program
pub const PROGRAM_RUN_TIMEOUT: Duration = Duration::from_secs(10);

const PARAMETER_RETRIES: u32 = 2;
const PROGRAM_LISTING_TIMEOUT: Duration = Duration::from_secs(2);
const PROGRAM_LISTING_RETRIES: u32 = 2;
const DEFINITION_RETRIES: u32 = 0;
// a profile run only echoes the trigger
const PROFILE_RUN_TIMEOUT: Duration = Duration::from_secs(1);

static TREV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!TREV\r\*TREV-(G[VT]6)").expect("Invalid TREV regex"));
static FIRMWARE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_D(\d+)\.(\d{2})").expect("Invalid firmware regex"));

/// Motion control commands, all sent immediate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    /// Pause the running program (`PS`)
    Pause,
    /// Continue a paused program (`C`)
    Unpause,
    /// Stop motion and discard the command buffer (`S1`)
    Stop,
    /// Kill motion and the program (`K`)
    Kill,
    /// Reboot the drive (`RESET`)
    Reset,
}

impl ControlCommand {
    /// Command text
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ControlCommand::Pause => "PS",
            ControlCommand::Unpause => "C",
            ControlCommand::Stop => "S1",
            ControlCommand::Kill => "K",
            ControlCommand::Reset => "RESET",
        }
    }

    /// How long to wait for the response
    pub fn timeout(&self) -> Duration {
        match self {
            ControlCommand::Reset => Duration::from_secs(10), // drive power cycles
            _ => COMMAND_TIMEOUT,
        }
    }
}

/// Model and revision reported by `TREV`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveIdentity {
    /// Drive family
    pub model: DriveModel,
    /// Revision line without the leading `*`, e.g. `TREV-GV6-L3E_D1.50_F1.00`
    pub revision: String,
}

impl DriveIdentity {
    /// Recognize a GV6/GT6 from the raw `TREV` response
    pub fn from_response(raw: &str) -> Option<Self> {
        let captures = TREV_PATTERN.captures(raw)?;
        let model = captures.get(1)?.as_str().parse().ok()?;
        let revision = raw
            .split('\r')
            .nth(1)?
            .trim_end_matches(['\r', '\n'])
            .trim_start_matches('*')
            .to_string();
        Some(Self { model, revision })
    }

    /// Drive firmware revision times 100 (`_D1.50` gives 150)
    pub fn firmware_version(&self) -> Option<u32> {
        let captures = FIRMWARE_PATTERN.captures(&self.revision)?;
        let major: u32 = captures.get(1)?.as_str().parse().ok()?;
        let minor: u32 = captures.get(2)?.as_str().parse().ok()?;
        Some(major * 100 + minor)
    }
}

/// Session with a Gemini GV6 or GT6 drive
pub struct GeminiDrive<D: Driver> {
    driver: D,
    identity: DriveIdentity,
}

impl GeminiDrive<AsciiRs232<SerialChannel>> {
    /// Open the configured serial port and check the drive's identity
    pub fn open(config: &ConnectionConfig) -> Result<Self, GeminiError> {
        Self::new(AsciiRs232::open(config)?)
    }
}

impl<D: Driver> GeminiDrive<D> {
    /// Start a session over `driver`
    ///
    /// If the drive doesn't identify as a GV6 or GT6 its default
    /// communication settings are restored before the error is returned.
    pub fn new(mut driver: D) -> Result<Self, GeminiError> {
        let response =
            driver.send_command("TREV", true, Some(COMMAND_TIMEOUT), 0, &Terminators::default())?;

        match DriveIdentity::from_response(&response.raw) {
            Some(identity) => {
                tracing::info!("Connected to Gemini {} ({})", identity.model, identity.revision);
                Ok(Self { driver, identity })
            }
            None => {
                tracing::warn!("Unrecognized TREV reply {:?}", response.raw);
                if let Err(e) = driver.restore_defaults() {
                    tracing::warn!("Failed to restore communication settings: {}", e);
                }
                Err(GeminiError::DeviceIdentity {
                    response: response.raw,
                })
            }
        }
    }

    /// What the drive reported when the session opened
    pub fn identity(&self) -> &DriveIdentity {
        &self.identity
    }

    /// Whether the connected drive's firmware has a feature
    pub fn supports(&self, feature: &GeminiVersions) -> bool {
        self.identity
            .firmware_version()
            .is_some_and(|version| feature.supports(self.identity.model, version))
    }

    /// Underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Underlying driver, for raw commands
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Restore the drive's communication settings and end the session
    pub fn close(mut self) -> Result<(), GeminiError> {
        tracing::info!("Closing Gemini {} session", self.identity.model);
        self.driver.restore_defaults()?;
        Ok(())
    }

    /// Send one command; see [`Driver::send_command`]
    pub fn send_command(
        &mut self,
        command: &str,
        immediate: bool,
        timeout: Option<Duration>,
        max_retries: u32,
        terminators: &Terminators,
    ) -> Result<ParsedResponse, GeminiError> {
        Ok(self
            .driver
            .send_command(command, immediate, timeout, max_retries, terminators)?)
    }

    /// Send a batch of commands; see [`Driver::send_commands`]
    pub fn send_commands(
        &mut self,
        commands: &[String],
        timeout: Option<Duration>,
        max_retries: u32,
        terminators: &TerminatorPlan,
    ) -> Result<Vec<ParsedResponse>, GeminiError> {
        Ok(self
            .driver
            .send_commands(commands, timeout, max_retries, terminators)?)
    }

    fn immediate(
        &mut self,
        command: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<ParsedResponse, ProtocolError> {
        self.driver
            .send_command(command, true, Some(timeout), max_retries, &Terminators::default())
    }

    // ----------------------------------------------------------------------
    // Parameters
    // ----------------------------------------------------------------------

    /// Query a parameter
    ///
    /// The response must be error free and its first output line must be
    /// `*` followed by the parameter name and the value.
    pub fn get_parameter(
        &mut self,
        name: &str,
        kind: ParameterType,
    ) -> Result<ParameterValue, GeminiError> {
        let response = self.immediate(name, COMMAND_TIMEOUT, PARAMETER_RETRIES)?;

        let prefix = format!("*{}", name);
        let value = match response.output_lines.first() {
            Some(line) if !self.driver.command_error(&response) && line.starts_with(&prefix) => {
                &line[prefix.len()..]
            }
            _ => {
                return Err(GeminiError::ParameterRetrieval {
                    name: name.to_string(),
                })
            }
        };

        kind.parse(value).ok_or_else(|| GeminiError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Set a parameter, returning whether the drive accepted it
    pub fn set_parameter(
        &mut self,
        name: &str,
        value: ParameterValue,
        kind: ParameterType,
    ) -> Result<bool, GeminiError> {
        let command = format!("{}{}", name, value.cast(kind));
        let response = self.immediate(&command, COMMAND_TIMEOUT, PARAMETER_RETRIES)?;
        Ok(!self.driver.command_error(&response))
    }

    /// Read a known parameter
    pub fn get(&mut self, parameter: DriveParameter) -> Result<ParameterValue, GeminiError> {
        self.get_parameter(parameter.name, parameter.kind)
    }

    /// Write a known parameter; `false` if the drive rejected it
    pub fn set(
        &mut self,
        parameter: DriveParameter,
        value: impl Into<ParameterValue>,
    ) -> Result<bool, GeminiError> {
        self.set_parameter(parameter.name, value.into(), parameter.kind)
    }

    fn get_bool(&mut self, parameter: DriveParameter) -> Result<bool, GeminiError> {
        let value = self.get(parameter)?;
        Ok(value.as_bool().unwrap_or_default())
    }

    fn get_float(&mut self, parameter: DriveParameter) -> Result<f64, GeminiError> {
        let value = self.get(parameter)?;
        Ok(value.cast(ParameterType::Float).as_float().unwrap_or_default())
    }

    /// Whether the motor is energized
    pub fn energized(&mut self) -> Result<bool, GeminiError> {
        self.get_bool(DriveParameter::ENERGIZED)
    }

    /// Energize or de-energize the motor
    pub fn set_energized(&mut self, energized: bool) -> Result<bool, GeminiError> {
        self.set(DriveParameter::ENERGIZED, energized)
    }

    /// Whether a kill de-energizes the motor
    pub fn deenergize_on_kill(&mut self) -> Result<bool, GeminiError> {
        self.get_bool(DriveParameter::DEENERGIZE_ON_KILL)
    }

    /// Choose whether a kill de-energizes the motor
    pub fn set_deenergize_on_kill(&mut self, deenergize: bool) -> Result<bool, GeminiError> {
        self.set(DriveParameter::DEENERGIZE_ON_KILL, deenergize)
    }

    /// Encoder counts per pitch
    pub fn encoder_resolution(&mut self) -> Result<i64, GeminiError> {
        let value = self.get(DriveParameter::ENCODER_RESOLUTION)?;
        Ok(value.cast(ParameterType::Int).as_int().unwrap_or_default())
    }

    /// Set the encoder resolution; the drive is reset to apply it
    pub fn set_encoder_resolution(&mut self, eres: i64) -> Result<bool, GeminiError> {
        let accepted = self.set(DriveParameter::ENCODER_RESOLUTION, eres)?;
        let reset = self.reset()?;
        Ok(accepted && reset)
    }

    /// Electrical pitch in mm
    pub fn electrical_pitch(&mut self) -> Result<f64, GeminiError> {
        self.get_float(DriveParameter::ELECTRICAL_PITCH)
    }

    /// Set the electrical pitch (mm); the drive is reset to apply it
    pub fn set_electrical_pitch(&mut self, dmepit: f64) -> Result<bool, GeminiError> {
        let accepted = self.set(DriveParameter::ELECTRICAL_PITCH, dmepit)?;
        let reset = self.reset()?;
        Ok(accepted && reset)
    }

    /// Velocity limit in pitches/s
    pub fn max_velocity(&mut self) -> Result<f64, GeminiError> {
        self.get_float(DriveParameter::MAX_VELOCITY)
    }

    /// Set the velocity limit in pitches/s
    pub fn set_max_velocity(&mut self, dmvlim: f64) -> Result<bool, GeminiError> {
        self.set(DriveParameter::MAX_VELOCITY, dmvlim)
    }

    /// Whether the drive is currently commanding motion (`TAS` bit 1)
    ///
    /// A failed or malformed reply reads as `false`.
    pub fn motion_commanded(&mut self) -> Result<bool, GeminiError> {
        let response = self.immediate("TAS", COMMAND_TIMEOUT, 0)?;
        if self.driver.command_error(&response) {
            return Ok(false);
        }
        Ok(match response.output_lines.as_slice() {
            [line] => line
                .strip_prefix("*TAS")
                .is_some_and(|bits| bits.starts_with('1')),
            _ => false,
        })
    }

    // ----------------------------------------------------------------------
    // Linear motor units
    // ----------------------------------------------------------------------

    /// Converter built from the drive's electrical pitch and encoder resolution
    pub fn unit_converter(&mut self, unit: LengthUnit) -> Result<UnitConverter, GeminiError> {
        let dmepit = self.electrical_pitch()?;
        let eres = self.encoder_resolution()?;
        Ok(UnitConverter::new(dmepit, eres as f64, unit))
    }

    /// Velocity limit in `unit` per second
    pub fn max_velocity_in_units(&mut self, unit: LengthUnit) -> Result<f64, GeminiError> {
        let converter = self.unit_converter(unit)?;
        let dmvlim = self.max_velocity()?;
        Ok(converter.to_unit_velocity_acceleration(dmvlim))
    }

    /// Set the velocity limit in `unit` per second
    pub fn set_max_velocity_in_units(
        &mut self,
        velocity: f64,
        unit: LengthUnit,
    ) -> Result<bool, GeminiError> {
        let converter = self.unit_converter(unit)?;
        self.set_max_velocity(converter.to_motor_velocity_acceleration(velocity))
    }

    // ----------------------------------------------------------------------
    // Motion control
    // ----------------------------------------------------------------------

    /// Send a control command, returning whether it went through
    pub fn control(
        &mut self,
        command: ControlCommand,
        max_retries: u32,
    ) -> Result<bool, GeminiError> {
        tracing::debug!("control: {:?}", command);
        let response = self.immediate(command.mnemonic(), command.timeout(), max_retries)?;
        Ok(!self.driver.command_error(&response))
    }

    /// Pause the running program (`PS`)
    pub fn pause(&mut self) -> Result<bool, GeminiError> {
        self.control(ControlCommand::Pause, 0)
    }

    /// Continue a paused program (`C`)
    pub fn unpause(&mut self) -> Result<bool, GeminiError> {
        self.control(ControlCommand::Unpause, 0)
    }

    /// Stop the current move (`S1`)
    pub fn stop(&mut self) -> Result<bool, GeminiError> {
        self.control(ControlCommand::Stop, 0)
    }

    /// Kill all motion (`K`)
    pub fn kill(&mut self) -> Result<bool, GeminiError> {
        self.control(ControlCommand::Kill, 0)
    }

    /// Reboot the drive, waiting up to 10 s
    pub fn reset(&mut self) -> Result<bool, GeminiError> {
        self.control(ControlCommand::Reset, 0)
    }

    // ----------------------------------------------------------------------
    // Programs and profiles
    // ----------------------------------------------------------------------

    /// Commands of stored program `n`, empty if it can't be read
    pub fn get_program(&mut self, n: u32) -> Result<Vec<String>, GeminiError> {
        self.read_program(n, PROGRAM_LISTING_TIMEOUT, PROGRAM_LISTING_RETRIES)
    }

    fn read_program(
        &mut self,
        n: u32,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Vec<String>, GeminiError> {
        let response = self.immediate(&ProgramKind::listing_command(n), timeout, max_retries)?;
        if self.driver.command_error(&response) || response.output_lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut lines = response.output_lines;
        if let Some(end) = lines.iter().position(|line| line == "*END") {
            lines.remove(end);
        }
        Ok(lines
            .into_iter()
            .map(|line| line.strip_prefix('*').map(str::to_string).unwrap_or(line))
            .collect())
    }

    /// Store `commands` as program or profile `n`
    ///
    /// A program identical to the one already stored isn't written again.
    /// If the definition fails part way it is ended and deleted.
    pub fn set_program_or_profile(
        &mut self,
        n: u32,
        commands: &[String],
        kind: ProgramKind,
    ) -> Result<bool, GeminiError> {
        let stripped = self.driver.strip_commands(commands)?;

        // profiles can't be listed
        if kind == ProgramKind::Program {
            let current = self.read_program(n, COMMAND_TIMEOUT, DEFINITION_RETRIES + 2)?;
            if current == stripped {
                tracing::debug!("set_program_or_profile: {} unchanged", kind.name(n));
                return Ok(true);
            }
        }

        let mut definition = Vec::with_capacity(stripped.len() + 3);
        definition.push(kind.delete_command(n));
        definition.push(kind.define_command(n));
        definition.extend(stripped.iter().cloned());
        definition.push("END".to_string());
        let plan = TerminatorPlan::PerCommand(ProgramKind::definition_terminators(stripped.len()));

        let responses = self.driver.send_commands(
            &definition,
            Some(COMMAND_TIMEOUT),
            DEFINITION_RETRIES,
            &plan,
        )?;
        let defined = responses.len() == definition.len()
            && responses
                .last()
                .is_some_and(|response| !self.driver.command_error(response));
        if defined {
            tracing::info!("Stored {} ({} commands)", kind.name(n), stripped.len());
            return Ok(true);
        }

        tracing::warn!("Defining {} failed, cleaning up", kind.name(n));
        let cleanup = ["END".to_string(), kind.delete_command(n)];
        self.driver.send_commands(
            &cleanup,
            Some(COMMAND_TIMEOUT),
            DEFINITION_RETRIES + 2,
            &TerminatorPlan::default(),
        )?;
        Ok(false)
    }

    /// Run program or profile `n`
    ///
    /// A program streams every line it executes and finishes with `*END`,
    /// read for up to `timeout`. A profile run only echoes its trigger, so
    /// `timeout` is ignored for it.
    pub fn run_program_or_profile(
        &mut self,
        n: u32,
        kind: ProgramKind,
        timeout: Option<Duration>,
    ) -> Result<ParsedResponse, GeminiError> {
        let command = kind.run_command(n);
        let response = match kind {
            ProgramKind::Program => {
                self.driver
                    .send_command(&command, true, timeout, 0, &Terminators::program_end())?
            }
            ProgramKind::Profile => self.immediate(&command, PROFILE_RUN_TIMEOUT, 0)?,
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_response() {
        let identity =
            DriveIdentity::from_response("!TREV\r*TREV-GV6-L3E_D1.50_F1.00\n").unwrap();
        assert_eq!(identity.model, DriveModel::Gv6);
        assert_eq!(identity.revision, "TREV-GV6-L3E_D1.50_F1.00");
        assert_eq!(identity.firmware_version(), Some(150));

        let identity = DriveIdentity::from_response("!TREV\r*TREV-GT6-L8_D2.10_F1.00\n").unwrap();
        assert_eq!(identity.model, DriveModel::Gt6);
        assert_eq!(identity.firmware_version(), Some(210));
    }

    #[test]
    fn test_identity_rejects_other_replies() {
        assert!(DriveIdentity::from_response("!TREV\r*TREV-GV-L3E\n").is_none());
        assert!(DriveIdentity::from_response("TREV\r*TREV-GV6-L3E\n").is_none());
        assert!(DriveIdentity::from_response("!TREV\r*UNDEFINED_LABEL\n").is_none());
        assert!(DriveIdentity::from_response("").is_none());
    }

    #[test]
    fn test_firmware_version_needs_drive_field() {
        assert_eq!(FIRMWARE_PATTERN.captures_len(), 3);
        let identity = DriveIdentity {
            model: DriveModel::Gv6,
            revision: "TREV-GV6-L3E_F1.00".to_string(),
        };
        assert_eq!(identity.firmware_version(), None);
        let identity = DriveIdentity {
            model: DriveModel::Gv6,
            revision: "TREV-GV6-L3E_D12.05_F1.00".to_string(),
        };
        assert_eq!(identity.firmware_version(), Some(1205));
        assert!(TREV_PATTERN.is_match("!TREV\r*TREV-GT6"));
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(ControlCommand::Stop.mnemonic(), "S1");
        assert_eq!(ControlCommand::Unpause.mnemonic(), "C");
        assert_eq!(ControlCommand::Reset.timeout(), Duration::from_secs(10));
        assert_eq!(ControlCommand::Kill.timeout(), COMMAND_TIMEOUT);
    }
}
