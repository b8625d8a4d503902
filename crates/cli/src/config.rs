//! Allocation settings read from the environment.

use core::ops::RangeInclusive;

use anyhow::{Context, bail};

use slotwise_inventory::AllocationConfig;

pub const MAIN_THRESHOLD_ENV: &str = "SLOTWISE_MAIN_THRESHOLD";
pub const FORCED_AREAS_ENV: &str = "SLOTWISE_FORCED_AREAS";
pub const FORCED_GENERAL_AREA_ENV: &str = "SLOTWISE_FORCED_GENERAL_AREA";
pub const FORCED_GENERAL_RANGE_ENV: &str = "SLOTWISE_FORCED_GENERAL_RANGE";
pub const ALLOW_SPLIT_ENV: &str = "SLOTWISE_ALLOW_SPLIT";

/// Build the config from process environment variables.
pub fn allocation_config_from_env() -> anyhow::Result<AllocationConfig> {
    allocation_config_from(|key| std::env::var(key).ok())
}

/// Build the config from any key lookup; unset keys keep their defaults.
pub fn allocation_config_from<F>(lookup: F) -> anyhow::Result<AllocationConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut config = AllocationConfig::default();

    if let Some(raw) = get(MAIN_THRESHOLD_ENV) {
        let threshold = raw
            .trim()
            .parse()
            .with_context(|| format!("{MAIN_THRESHOLD_ENV} must be a non-negative integer, got {raw:?}"))?;
        config = config.with_main_primary_threshold(threshold);
    }

    if let Some(raw) = get(FORCED_AREAS_ENV) {
        let areas: Vec<&str> = raw.split(',').map(str::trim).filter(|a| !a.is_empty()).collect();
        config = config.with_forced_areas(areas);
    }

    let general_area = get(FORCED_GENERAL_AREA_ENV);
    let general_range = get(FORCED_GENERAL_RANGE_ENV)
        .map(|raw| parse_range(&raw))
        .transpose()?;
    if general_area.is_some() || general_range.is_some() {
        let area = general_area.unwrap_or_else(|| config.forced_general_area.clone());
        let range = general_range.unwrap_or_else(|| config.forced_general_range.clone());
        config = config.with_forced_general(area, range);
    }

    if let Some(raw) = get(ALLOW_SPLIT_ENV) {
        config = config.with_split(parse_flag(&raw)?);
    }

    Ok(config)
}

fn parse_range(raw: &str) -> anyhow::Result<RangeInclusive<u32>> {
    let Some((lo, hi)) = raw.split_once('-') else {
        bail!("{FORCED_GENERAL_RANGE_ENV} must look like `lo-hi`, got {raw:?}");
    };
    let lo: u32 = lo
        .trim()
        .parse()
        .with_context(|| format!("invalid lower bound in {FORCED_GENERAL_RANGE_ENV}: {raw:?}"))?;
    let hi: u32 = hi
        .trim()
        .parse()
        .with_context(|| format!("invalid upper bound in {FORCED_GENERAL_RANGE_ENV}: {raw:?}"))?;
    if lo > hi {
        bail!("{FORCED_GENERAL_RANGE_ENV} is empty: {raw:?}");
    }
    Ok(lo..=hi)
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{ALLOW_SPLIT_ENV} must be a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<AllocationConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        allocation_config_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        assert_eq!(from_pairs(&[]).unwrap(), AllocationConfig::default());
    }

    #[test]
    fn every_setting_can_be_overridden() {
        let cfg = from_pairs(&[
            (MAIN_THRESHOLD_ENV, "35"),
            (FORCED_AREAS_ENV, "v, h ,,x"),
            (FORCED_GENERAL_RANGE_ENV, "3-9"),
            (ALLOW_SPLIT_ENV, "yes"),
        ])
        .unwrap();
        assert_eq!(cfg.main_primary_threshold, 35);
        assert_eq!(cfg.forced_areas, vec!["V", "H", "X"]);
        assert_eq!(cfg.forced_general_area, "G");
        assert_eq!(cfg.forced_general_range, 3..=9);
        assert!(cfg.allow_split);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(from_pairs(&[(MAIN_THRESHOLD_ENV, "lots")]).is_err());
        assert!(from_pairs(&[(FORCED_GENERAL_RANGE_ENV, "9-3")]).is_err());
        assert!(from_pairs(&[(FORCED_GENERAL_RANGE_ENV, "12")]).is_err());
        assert!(from_pairs(&[(ALLOW_SPLIT_ENV, "maybe")]).is_err());
    }
}
