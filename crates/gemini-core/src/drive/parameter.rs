//! Drive parameters
//!
//! A parameter is read by sending its bare name as an immediate command (the
//! drive answers `*NAME<value>`) and written by sending the name followed by
//! the new value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::GeminiError;

/// Value type of a drive parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    /// `0` or `1` on the wire
    Bool,
    /// Whole number
    Int,
    /// Decimal number
    Float,
}

impl ParameterType {
    /// Parse the value part of a query reply
    pub fn parse(&self, text: &str) -> Option<ParameterValue> {
        let text = text.trim();
        match self {
            ParameterType::Bool => Some(ParameterValue::Bool(text == "1")),
            ParameterType::Int => text.parse().ok().map(ParameterValue::Int),
            ParameterType::Float => text.parse().ok().map(ParameterValue::Float),
        }
    }
}

impl FromStr for ParameterType {
    type Err = GeminiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(ParameterType::Bool),
            "int" => Ok(ParameterType::Int),
            "float" => Ok(ParameterType::Float),
            other => Err(GeminiError::UnsupportedType(other.to_string())),
        }
    }
}

/// A typed parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    /// Flag
    Bool(bool),
    /// Whole number
    Int(i64),
    /// Decimal number
    Float(f64),
}

impl ParameterValue {
    /// Type this value carries
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            ParameterValue::Bool(_) => ParameterType::Bool,
            ParameterValue::Int(_) => ParameterType::Int,
            ParameterValue::Float(_) => ParameterType::Float,
        }
    }

    /// Convert to another type the way the drive would read it
    pub fn cast(self, to: ParameterType) -> ParameterValue {
        match (self, to) {
            (ParameterValue::Bool(v), ParameterType::Int) => ParameterValue::Int(v as i64),
            (ParameterValue::Bool(v), ParameterType::Float) => {
                ParameterValue::Float(if v { 1.0 } else { 0.0 })
            }
            (ParameterValue::Int(v), ParameterType::Bool) => ParameterValue::Bool(v != 0),
            (ParameterValue::Int(v), ParameterType::Float) => ParameterValue::Float(v as f64),
            (ParameterValue::Float(v), ParameterType::Bool) => ParameterValue::Bool(v != 0.0),
            (ParameterValue::Float(v), ParameterType::Int) => ParameterValue::Int(v.trunc() as i64),
            (value, _) => value,
        }
    }

    /// The flag, if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The number, if this is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The number, if this is a `Float`
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    /// Value as the drive expects it after the parameter name
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", *v as u8),
            ParameterValue::Int(v) => write!(f, "{}", v),
            // whole floats keep their decimal point
            ParameterValue::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{:.1}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

/// A named drive setting and its value type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveParameter {
    /// Mnemonic as typed on the drive
    pub name: &'static str,
    /// Value type
    pub kind: ParameterType,
}

impl DriveParameter {
    /// Whether the motor is energized
    pub const ENERGIZED: DriveParameter = DriveParameter::new("DRIVE", ParameterType::Bool);
    /// Whether a kill also de-energizes the motor
    pub const DEENERGIZE_ON_KILL: DriveParameter =
        DriveParameter::new("KDRIVE", ParameterType::Bool);
    /// Encoder counts per revolution (rotary) or per pitch (linear)
    pub const ENCODER_RESOLUTION: DriveParameter = DriveParameter::new("ERES", ParameterType::Int);
    /// Electrical pitch of a linear motor, in mm
    pub const ELECTRICAL_PITCH: DriveParameter =
        DriveParameter::new("DMEPIT", ParameterType::Float);
    /// Velocity limit in motor units
    pub const MAX_VELOCITY: DriveParameter = DriveParameter::new("DMVLIM", ParameterType::Float);

    /// Parameter `name` holding values of `kind`
    pub const fn new(name: &'static str, kind: ParameterType) -> Self {
        Self { name, kind }
    }
}
