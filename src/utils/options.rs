//! Override flags shared by every generator subcommand.

use clap::Args;

use crate::overrides::{ConfigOverrides, OverrideField};

/// Per-field override flags. Values stay raw strings here and are validated
/// during composition.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideArgs {
    /// Server host the simulator binds to
    #[arg(long, allow_hyphen_values = true)]
    pub host: Option<String>,

    /// Server port (1024-65535)
    #[arg(long, allow_hyphen_values = true)]
    pub port: Option<String>,

    /// Device latitude
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<String>,

    /// Device longitude
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<String>,

    /// Device UUID (generated when omitted)
    #[arg(long, allow_hyphen_values = true)]
    pub uuid: Option<String>,

    /// Lower bound of the simulated temperature
    #[arg(long, allow_hyphen_values = true)]
    pub temp_min: Option<String>,

    /// Upper bound of the simulated temperature
    #[arg(long, allow_hyphen_values = true)]
    pub temp_max: Option<String>,

    /// Percentage of requests to drop (0-100)
    #[arg(long, allow_hyphen_values = true)]
    pub drop: Option<String>,

    /// Battery discharge per idle tick
    #[arg(long, allow_hyphen_values = true)]
    pub battery_idle: Option<String>,

    /// Battery discharge per transmitted response
    #[arg(long, allow_hyphen_values = true)]
    pub battery_tx: Option<String>,

    /// Initial battery charge (0-100)
    #[arg(long, allow_hyphen_values = true)]
    pub battery_charge: Option<String>,

    /// Delay profiles as a JSON array of {"probability","min","max"} objects
    #[arg(long, allow_hyphen_values = true)]
    pub delay_profiles: Option<String>,
}

impl OverrideArgs {
    /// Collect the flags that were given into a sparse override set
    pub fn to_overrides(&self) -> ConfigOverrides {
        [
            (OverrideField::Host, &self.host),
            (OverrideField::Port, &self.port),
            (OverrideField::Latitude, &self.latitude),
            (OverrideField::Longitude, &self.longitude),
            (OverrideField::Uuid, &self.uuid),
            (OverrideField::TempMin, &self.temp_min),
            (OverrideField::TempMax, &self.temp_max),
            (OverrideField::Drop, &self.drop),
            (OverrideField::BatteryIdle, &self.battery_idle),
            (OverrideField::BatteryTx, &self.battery_tx),
            (OverrideField::BatteryCharge, &self.battery_charge),
            (OverrideField::DelayProfiles, &self.delay_profiles),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.clone().map(|raw| (field, raw)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        overrides: OverrideArgs,
    }

    #[test]
    fn test_no_flags_is_empty() {
        let harness = Harness::parse_from(["harness"]);
        assert!(harness.overrides.to_overrides().is_empty());
    }

    #[test]
    fn test_flags_map_to_fields() {
        let harness = Harness::parse_from([
            "harness",
            "--host",
            "0.0.0.0",
            "--longitude",
            "-74.0",
            "--battery-charge",
            "-5",
            "--delay-profiles",
            r#"[{"probability":100,"min":0.1,"max":0.5}]"#,
        ]);
        let overrides = harness.overrides.to_overrides();
        assert_eq!(overrides.len(), 4);
        assert_eq!(overrides.get(OverrideField::Host), Some("0.0.0.0"));
        assert_eq!(overrides.get(OverrideField::Longitude), Some("-74.0"));
        assert_eq!(overrides.get(OverrideField::BatteryCharge), Some("-5"));
        assert!(overrides.contains(OverrideField::DelayProfiles));
        assert!(!overrides.contains(OverrideField::Port));
    }
}
