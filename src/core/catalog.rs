use crate::domain::model::{Category, Scale, Thermometric, Unit};

const fn linear(name: &'static str, code: &'static str, factor: f64) -> Unit {
    Unit {
        name,
        code,
        scale: Scale::Factor(factor),
    }
}

const fn thermal(name: &'static str, code: &'static str, scale: Thermometric) -> Unit {
    Unit {
        name,
        code,
        scale: Scale::Thermal(scale),
    }
}

// Length (base: meters)
static LENGTH_UNITS: [Unit; 8] = [
    linear("Meters", "m", 1.0),
    linear("Kilometers", "km", 1000.0),
    linear("Centimeters", "cm", 0.01),
    linear("Millimeters", "mm", 0.001),
    linear("Inches", "in", 0.0254),
    linear("Feet", "ft", 0.3048),
    linear("Yards", "yd", 0.9144),
    linear("Miles", "mi", 1609.344),
];

// Weight (base: grams)
static WEIGHT_UNITS: [Unit; 6] = [
    linear("Grams", "g", 1.0),
    linear("Kilograms", "kg", 1000.0),
    linear("Milligrams", "mg", 0.001),
    linear("Pounds", "lb", 453.592),
    linear("Ounces", "oz", 28.3495),
    linear("Tons", "ton", 907185.0),
];

static TEMPERATURE_UNITS: [Unit; 3] = [
    thermal("Celsius", "C", Thermometric::Celsius),
    thermal("Fahrenheit", "F", Thermometric::Fahrenheit),
    thermal("Kelvin", "K", Thermometric::Kelvin),
];

// Volume (base: liters)
static VOLUME_UNITS: [Unit; 7] = [
    linear("Liters", "l", 1.0),
    linear("Milliliters", "ml", 0.001),
    linear("Cubic Meters", "m3", 1000.0),
    linear("Gallons (US)", "gal", 3.78541),
    linear("Quarts", "qt", 0.946353),
    linear("Pints", "pt", 0.473176),
    linear("Fluid Ounces", "floz", 0.0295735),
];

/// Units of a category, in display order.
pub fn units_for(category: Category) -> &'static [Unit] {
    match category {
        Category::Length => &LENGTH_UNITS,
        Category::Weight => &WEIGHT_UNITS,
        Category::Temperature => &TEMPERATURE_UNITS,
        Category::Volume => &VOLUME_UNITS,
    }
}

/// Codes are case-sensitive: `m` is meters, `M` is nothing.
pub fn find_unit(category: Category, code: &str) -> Option<&'static Unit> {
    units_for(category).iter().find(|u| u.code == code)
}

pub fn unit_name(category: Category, code: &str) -> &'static str {
    find_unit(category, code).map(|u| u.name).unwrap_or("")
}
