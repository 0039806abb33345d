//! Unit-conversion helpers for weather values.
//!
//! The provider reports temperatures in Kelvin and visibility in metres;
//! API responses additionally expose Celsius, Fahrenheit and kilometres.
//! All derived values are computed on read, never stored.

/// Convert a temperature from Kelvin to Celsius, rounded to 2 decimal places.
pub(crate) fn kelvin_to_celsius(k: f64) -> f64 {
    round2(k - 273.15)
}

/// Convert a temperature from Kelvin to Fahrenheit, rounded to 2 decimal places.
pub(crate) fn kelvin_to_fahrenheit(k: f64) -> f64 {
    round2((k - 273.15) * 9.0 / 5.0 + 32.0)
}

/// Convert visibility in metres to kilometres, rounded to 2 decimal places.
pub(crate) fn metres_to_km(m: i32) -> f64 {
    round2(m as f64 / 1000.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Derive a URL-friendly slug from a display name: lowercase alphanumerics
/// with single hyphens between words.
pub(crate) fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_sep = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('-');
            last_was_sep = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelvin_to_celsius() {
        assert_eq!(kelvin_to_celsius(300.0), 26.85);
    }

    #[test]
    fn test_kelvin_to_celsius_freezing_point() {
        assert_eq!(kelvin_to_celsius(273.15), 0.0);
    }

    #[test]
    fn test_kelvin_to_fahrenheit() {
        assert_eq!(kelvin_to_fahrenheit(300.0), 80.33);
    }

    #[test]
    fn test_kelvin_to_fahrenheit_freezing_point() {
        assert_eq!(kelvin_to_fahrenheit(273.15), 32.0);
    }

    #[test]
    fn test_metres_to_km() {
        assert_eq!(metres_to_km(10000), 10.0);
        assert_eq!(metres_to_km(1234), 1.23);
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("The Dark Knight"), "the-dark-knight");
    }

    #[test]
    fn test_slugify_punctuation_collapses() {
        assert_eq!(slugify("Crime & Punishment!"), "crime-punishment");
    }

    #[test]
    fn test_slugify_trailing_separator_stripped() {
        assert_eq!(slugify("Inception "), "inception");
    }
}
