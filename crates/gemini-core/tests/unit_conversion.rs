use gemini_core::unit_conversion::{LengthUnit, UnitConverter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn relative_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
}

#[test]
fn test_distance_round_trip() {
    let mut rng = StdRng::seed_from_u64(42);
    for unit in [LengthUnit::Meters, LengthUnit::Millimeters, LengthUnit::Micrometers] {
        let converter = UnitConverter::new(42.0, 8000.0, unit);
        for _ in 0..1000 {
            let x: f64 = rng.gen_range(-1e3..1e3);
            if x == 0.0 {
                continue;
            }
            assert!(relative_eq(converter.to_unit_distance(converter.to_motor_distance(x)), x));
            assert!(relative_eq(
                converter.to_unit_velocity_acceleration(converter.to_motor_velocity_acceleration(x)),
                x
            ));
        }
    }
}

#[test]
fn test_linear_motor_example() {
    // 0.5 m/s on a 42 mm pitch motor
    let converter = UnitConverter::new(42.0, 8000.0, LengthUnit::default());
    let pitches = converter.to_motor_velocity_acceleration(0.5);
    assert!(relative_eq(pitches, 500.0 / 42.0));
    assert!(relative_eq(converter.to_motor_distance(1.0), 8000.0 * 1000.0 / 42.0));
}

#[test]
fn test_multipliers_fixed() {
    let converter = UnitConverter::new(10.0, 1000.0, LengthUnit::Millimeters);
    assert_eq!(converter.distance_multiplier(), 100.0);
    assert_eq!(converter.velocity_acceleration_multiplier(), 0.1);
    assert_eq!(converter.unit(), LengthUnit::Millimeters);
}
