//! Allocation settings that mirror the physical warehouse layout.

use core::ops::RangeInclusive;

use slotwise_core::LocationCode;

/// Slot assignment configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationConfig {
    /// Batch pallets for one main-zone destination above which only
    /// `amazon-main-A` locations are considered.
    pub main_primary_threshold: u32,
    /// Area prefixes that private/platform lines are confined to in automatic mode.
    pub forced_areas: Vec<String>,
    /// General area whose numbered sub-range also belongs to the forced pool.
    pub forced_general_area: String,
    pub forced_general_range: RangeInclusive<u32>,
    /// Split a line across locations when no single one can take it.
    pub allow_split: bool,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            main_primary_threshold: 20,
            forced_areas: ["V", "H", "F", "R"].map(String::from).to_vec(),
            forced_general_area: "G".to_string(),
            forced_general_range: 1..=20,
            allow_split: false,
        }
    }
}

impl AllocationConfig {
    pub fn with_main_primary_threshold(mut self, threshold: u32) -> Self {
        self.main_primary_threshold = threshold;
        self
    }

    pub fn with_forced_areas<I, S>(mut self, areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forced_areas = areas
            .into_iter()
            .map(|a| a.into().trim().to_ascii_uppercase())
            .collect();
        self
    }

    pub fn with_forced_general(mut self, area: impl Into<String>, range: RangeInclusive<u32>) -> Self {
        self.forced_general_area = area.into().trim().to_ascii_uppercase();
        self.forced_general_range = range;
        self
    }

    pub fn with_split(mut self, allow: bool) -> Self {
        self.allow_split = allow;
        self
    }

    /// Whether `code` lies in the forced pool (listed area, or the general
    /// area's numbered sub-range).
    pub fn in_forced_pool(&self, code: &LocationCode) -> bool {
        let area = code.area();
        if self.forced_areas.iter().any(|forced| *forced == area) {
            return true;
        }
        area == self.forced_general_area
            && code
                .number()
                .is_some_and(|n| self.forced_general_range.contains(&n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> LocationCode {
        LocationCode::new(raw).unwrap()
    }

    #[test]
    fn default_forced_pool_matches_layout() {
        let cfg = AllocationConfig::default();
        for inside in ["V01", "h12", "F3", "R40", "G1", "G20"] {
            assert!(cfg.in_forced_pool(&code(inside)), "{inside} should be forced");
        }
        for outside in ["G21", "G", "P01", "A05", "VA01"] {
            assert!(!cfg.in_forced_pool(&code(outside)), "{outside} should not be forced");
        }
    }

    #[test]
    fn builders_normalize_area_names() {
        let cfg = AllocationConfig::default()
            .with_forced_areas(["x ", "y"])
            .with_forced_general("k", 5..=6);
        assert!(cfg.in_forced_pool(&code("X9")));
        assert!(cfg.in_forced_pool(&code("K6")));
        assert!(!cfg.in_forced_pool(&code("V01")));
        assert!(!cfg.in_forced_pool(&code("K7")));
    }
}
