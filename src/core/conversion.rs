use crate::domain::model::{Scale, Thermometric, Unit};
use crate::utils::error::{ConverterError, Result};

pub const DEFAULT_PRECISION: u32 = 6;

/// Converts between thermometric scales through Celsius.
pub fn convert_temperature(value: f64, from: Thermometric, to: Thermometric) -> f64 {
    if from == to {
        return value;
    }

    let celsius = match from {
        Thermometric::Celsius => value,
        Thermometric::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        Thermometric::Kelvin => value - 273.15,
    };

    match to {
        Thermometric::Celsius => celsius,
        Thermometric::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        Thermometric::Kelvin => celsius + 273.15,
    }
}

/// Multiplies into the base unit, then divides out of it.
pub fn convert_linear(value: f64, from_factor: f64, to_factor: f64) -> f64 {
    value * from_factor / to_factor
}

/// Unrounded conversion between two units of the same category.
pub fn convert_units(value: f64, from: &Unit, to: &Unit) -> Result<f64> {
    let converted = if from.code == to.code {
        value
    } else {
        match (from.scale, to.scale) {
            (Scale::Factor(f), Scale::Factor(t)) => convert_linear(value, f, t),
            (Scale::Thermal(f), Scale::Thermal(t)) => convert_temperature(value, f, t),
            _ => {
                return Err(ConverterError::calculation(format!(
                    "Cannot convert {} to {}",
                    from.name, to.name
                )))
            }
        }
    };

    if !converted.is_finite() {
        return Err(ConverterError::calculation(
            "Calculation resulted in an invalid value",
        ));
    }

    Ok(converted)
}

/// Rounds half away from zero to `digits` fractional digits.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{find_unit, units_for};
    use crate::domain::model::Category;

    fn unit(category: Category, code: &str) -> &'static Unit {
        find_unit(category, code).unwrap()
    }

    #[test]
    fn test_temperature_reference_points() {
        use Thermometric::*;
        assert_eq!(convert_temperature(0.0, Celsius, Fahrenheit), 32.0);
        assert_eq!(convert_temperature(32.0, Fahrenheit, Celsius), 0.0);
        assert_eq!(convert_temperature(0.0, Celsius, Kelvin), 273.15);
        assert_eq!(convert_temperature(100.0, Celsius, Fahrenheit), 212.0);
        assert!((convert_temperature(-40.0, Fahrenheit, Celsius) + 40.0).abs() < 1e-12);
        assert!((convert_temperature(273.15, Kelvin, Fahrenheit) - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_identity_is_exact() {
        use Thermometric::*;
        for scale in [Celsius, Fahrenheit, Kelvin] {
            assert_eq!(convert_temperature(98.6, scale, scale), 98.6);
        }
    }

    #[test]
    fn test_linear_reference_values() {
        let km = unit(Category::Length, "km");
        let m = unit(Category::Length, "m");
        assert_eq!(convert_units(1.0, km, m).unwrap(), 1000.0);

        let lb = unit(Category::Weight, "lb");
        let g = unit(Category::Weight, "g");
        assert!((convert_units(1.0, lb, g).unwrap() - 453.592).abs() < 1e-9);

        let gal = unit(Category::Volume, "gal");
        let l = unit(Category::Volume, "l");
        assert!((convert_units(1.0, gal, l).unwrap() - 3.78541).abs() < 1e-9);
    }

    #[test]
    fn test_identity_for_every_unit() {
        for category in Category::ALL {
            for u in units_for(category) {
                for v in [0.0, -5.5, 42.0, 1e15] {
                    assert_eq!(convert_units(v, u, u).unwrap(), v, "{} {}", v, u.code);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        for category in Category::ALL {
            let units = units_for(category);
            for a in units {
                for b in units {
                    for v in [1.0, -17.25, 1234.5678] {
                        let there = convert_units(v, a, b).unwrap();
                        let back = convert_units(there, b, a).unwrap();
                        assert!(
                            (back - v).abs() <= 1e-6,
                            "{} {} -> {} -> {} gave {}",
                            v,
                            a.code,
                            b.code,
                            a.code,
                            back
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_non_finite_is_calculation_error() {
        let mi = unit(Category::Length, "mi");
        let mm = unit(Category::Length, "mm");
        let err = convert_units(f64::MAX, mi, mm).unwrap_err();
        assert!(matches!(err, ConverterError::CalculationError { .. }));

        let err = convert_units(f64::NAN, mi, mm).unwrap_err();
        assert!(matches!(err, ConverterError::CalculationError { .. }));
    }

    #[test]
    fn test_mixed_scales_rejected() {
        let c = unit(Category::Temperature, "C");
        let m = unit(Category::Length, "m");
        assert!(convert_units(1.0, c, m).is_err());
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_to(0.25, 1), 0.3);
        assert_eq!(round_to(-0.25, 1), -0.3);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(0.1234564, 6), 0.123456);
        assert_eq!(round_to(0.1234566, 6), 0.123457);
        // scaling overflows, value passes through
        assert_eq!(round_to(1e305, 6), 1e305);
    }
}
