//! Unit Conversion
//!
//! Converts linear-motor distances, velocities and accelerations between a
//! physical length unit and the drive's native units:
//! - distance: encoder counts
//! - velocity: electrical pitches/s
//! - acceleration: electrical pitches/s²
//!
//! The electrical pitch (`DMEPIT`) is given in millimeters and the encoder
//! resolution (`ERES`) in counts per pitch.

use serde::{Deserialize, Serialize};

/// Physical length unit used on the caller's side of a [`UnitConverter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Meters
    #[default]
    Meters,
    /// Millimeters
    Millimeters,
    /// Micrometers
    Micrometers,
}

impl LengthUnit {
    /// Millimeters per unit
    pub fn millimeters(&self) -> f64 {
        match self {
            LengthUnit::Meters => 1e3,
            LengthUnit::Millimeters => 1.0,
            LengthUnit::Micrometers => 1e-3,
        }
    }
}

/// Converts between a length unit and motor units
///
/// The multipliers are fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    distance_multiplier: f64,
    velocity_acceleration_multiplier: f64,
    unit: LengthUnit,
}

impl UnitConverter {
    /// Converter for a motor with electrical pitch `dmepit` (mm) and encoder
    /// resolution `eres` (counts per pitch)
    pub fn new(dmepit: f64, eres: f64, unit: LengthUnit) -> Self {
        let scale = unit.millimeters();
        Self {
            distance_multiplier: scale * eres / dmepit,
            velocity_acceleration_multiplier: scale / dmepit,
            unit,
        }
    }

    /// Length unit on the caller's side
    pub fn unit(&self) -> LengthUnit {
        self.unit
    }

    /// Encoder counts per unit of length
    pub fn distance_multiplier(&self) -> f64 {
        self.distance_multiplier
    }

    /// Pitches per unit of length
    pub fn velocity_acceleration_multiplier(&self) -> f64 {
        self.velocity_acceleration_multiplier
    }

    /// Length to encoder counts
    pub fn to_motor_distance(&self, distance: f64) -> f64 {
        distance * self.distance_multiplier
    }

    /// Encoder counts to length
    pub fn to_unit_distance(&self, counts: f64) -> f64 {
        counts / self.distance_multiplier
    }

    /// Length per second (or per second squared) to pitches
    pub fn to_motor_velocity_acceleration(&self, value: f64) -> f64 {
        value * self.velocity_acceleration_multiplier
    }

    /// Pitches per second (or per second squared) to length
    pub fn to_unit_velocity_acceleration(&self, value: f64) -> f64 {
        value / self.velocity_acceleration_multiplier
    }

    /// [`to_motor_distance`](Self::to_motor_distance) over a slice
    pub fn to_motor_distances(&self, distances: &[f64]) -> Vec<f64> {
        distances.iter().map(|&d| self.to_motor_distance(d)).collect()
    }

    /// [`to_unit_distance`](Self::to_unit_distance) over a slice
    pub fn to_unit_distances(&self, counts: &[f64]) -> Vec<f64> {
        counts.iter().map(|&c| self.to_unit_distance(c)).collect()
    }

    /// [`to_motor_velocity_acceleration`](Self::to_motor_velocity_acceleration) over a slice
    pub fn to_motor_velocities_accelerations(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&v| self.to_motor_velocity_acceleration(v))
            .collect()
    }

    /// [`to_unit_velocity_acceleration`](Self::to_unit_velocity_acceleration) over a slice
    pub fn to_unit_velocities_accelerations(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&v| self.to_unit_velocity_acceleration(v))
            .collect()
    }
}
