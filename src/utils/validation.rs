//! Field-level validation for raw override values.
//!
//! Every override arrives as a raw string from the command line. These
//! functions turn a raw string into a typed, range-checked value or a
//! [`ComposeError`] naming the offending field.

use crate::config::DelayProfile;
use crate::identity::{MAX_PORT, MIN_PORT};
use crate::overrides::{ComposeError, OverrideField};

/// Parse a finite floating point number
///
/// # Examples
/// ```
/// use fleetsim::overrides::OverrideField;
/// use fleetsim::utils::validation::parse_number;
///
/// assert_eq!(parse_number(OverrideField::Latitude, "51.5"), Ok(51.5));
/// assert!(parse_number(OverrideField::Latitude, "north").is_err());
/// assert!(parse_number(OverrideField::Latitude, "NaN").is_err());
/// ```
pub fn parse_number(field: OverrideField, raw: &str) -> Result<f64, ComposeError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ComposeError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Parse a number and require it to lie within `[min, max]`
pub fn parse_bounded(
    field: OverrideField,
    raw: &str,
    min: f64,
    max: f64,
) -> Result<f64, ComposeError> {
    let value = parse_number(field, raw)?;
    if value < min || value > max {
        return Err(ComposeError::OutOfRange {
            field,
            value: raw.to_string(),
            bounds: format_bounds(min, max),
        });
    }
    Ok(value)
}

/// Parse a server port: an integer within [1024, 65535]
///
/// # Examples
/// ```
/// use fleetsim::utils::validation::parse_port;
///
/// assert_eq!(parse_port("5001"), Ok(5001));
/// assert!(parse_port("80").is_err());
/// assert!(parse_port("70000").is_err());
/// assert!(parse_port("50.5").is_err());
/// ```
pub fn parse_port(raw: &str) -> Result<u16, ComposeError> {
    let invalid = || ComposeError::InvalidPort(raw.to_string());
    let port = raw.trim().parse::<u32>().map_err(|_| invalid())?;
    if !(MIN_PORT..=MAX_PORT).contains(&port) {
        return Err(invalid());
    }
    u16::try_from(port).map_err(|_| invalid())
}

/// Parse a battery charge percentage within [0, 100]
pub fn parse_battery_charge(raw: &str) -> Result<f64, ComposeError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && (0.0..=100.0).contains(&value) => Ok(value),
        _ => Err(ComposeError::InvalidBatteryCharge(raw.to_string())),
    }
}

/// Parse delay profiles from a JSON array of `{probability, min, max}` objects.
///
/// Only the shape is checked here; probabilities summing to 100 is left to
/// the config checker.
pub fn parse_delay_profiles(raw: &str) -> Result<Vec<DelayProfile>, ComposeError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ComposeError::InvalidProfileJson(e.to_string()))?;
    if !value.is_array() {
        return Err(ComposeError::InvalidProfileJson(
            "expected a JSON array".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| ComposeError::InvalidProfileJson(e.to_string()))
}

/// Require a non-empty string value
pub fn parse_non_empty(field: OverrideField, raw: &str) -> Result<String, ComposeError> {
    if raw.trim().is_empty() {
        return Err(match field {
            OverrideField::Uuid => ComposeError::EmptyUuid,
            _ => ComposeError::EmptyHost,
        });
    }
    Ok(raw.to_string())
}

fn format_bounds(min: f64, max: f64) -> String {
    if max.is_infinite() {
        format!(">= {}", min)
    } else {
        format!("[{}, {}]", min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(OverrideField::Longitude, "-74.0"), Ok(-74.0));
        assert_eq!(parse_number(OverrideField::Longitude, " 3 "), Ok(3.0));
        assert!(matches!(
            parse_number(OverrideField::Drop, "five"),
            Err(ComposeError::InvalidNumber { field: OverrideField::Drop, .. })
        ));
        assert!(parse_number(OverrideField::Drop, "inf").is_err());
        assert!(parse_number(OverrideField::Drop, "").is_err());
    }

    #[test]
    fn test_parse_port_bounds() {
        assert_eq!(parse_port("1024"), Ok(1024));
        assert_eq!(parse_port("65535"), Ok(65535));
        assert_eq!(parse_port("1023"), Err(ComposeError::InvalidPort("1023".to_string())));
        assert!(parse_port("65536").is_err());
        assert!(parse_port("-1").is_err());
        assert!(parse_port("port").is_err());
    }

    #[test]
    fn test_parse_battery_charge() {
        assert_eq!(parse_battery_charge("0"), Ok(0.0));
        assert_eq!(parse_battery_charge("100"), Ok(100.0));
        assert_eq!(parse_battery_charge("55.5"), Ok(55.5));
        assert_eq!(
            parse_battery_charge("-5"),
            Err(ComposeError::InvalidBatteryCharge("-5".to_string()))
        );
        assert!(parse_battery_charge("150").is_err());
        assert!(parse_battery_charge("full").is_err());
    }

    #[test]
    fn test_parse_delay_profiles() {
        let raw = r#"[
            {"probability": 80, "min": 0.1, "max": 0.2},
            {"probability": 20, "min": 1, "max": 2}
        ]"#;
        let profiles = parse_delay_profiles(raw).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[1].probability, 20.0);

        assert_eq!(parse_delay_profiles("[]"), Ok(Vec::new()));
        assert!(matches!(parse_delay_profiles("[{"), Err(ComposeError::InvalidProfileJson(_))));
        assert!(matches!(
            parse_delay_profiles(r#"{"probability": 100, "min": 0, "max": 1}"#),
            Err(ComposeError::InvalidProfileJson(_))
        ));
        assert!(parse_delay_profiles(r#"[{"probability": "high"}]"#).is_err());
    }

    #[test]
    fn test_parse_bounded() {
        assert_eq!(parse_bounded(OverrideField::Drop, "100", 0.0, 100.0), Ok(100.0));
        assert!(matches!(
            parse_bounded(OverrideField::Drop, "101", 0.0, 100.0),
            Err(ComposeError::OutOfRange { field: OverrideField::Drop, .. })
        ));
        assert!(parse_bounded(OverrideField::BatteryIdle, "-0.1", 0.0, f64::INFINITY).is_err());
    }
}
