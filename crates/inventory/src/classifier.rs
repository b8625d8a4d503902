//! Destination classification.
//!
//! Maps a free-text destination (an FBA warehouse code, a carrier name, a
//! customer address note, ...) to the zone category that may store it.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Category a destination belongs to; decides which zone types may hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneCategory {
    AmazonMain,
    AmazonBuffer,
    Express,
    Walmart,
    Private,
    Platform,
    HighValue,
    Suspense,
}

impl ZoneCategory {
    /// Categories whose lines are confined to the forced area pool in automatic mode.
    pub fn is_forced(self) -> bool {
        matches!(self, ZoneCategory::Private | ZoneCategory::Platform)
    }
}

impl core::fmt::Display for ZoneCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ZoneCategory::AmazonMain => "amazon-main",
            ZoneCategory::AmazonBuffer => "amazon-buffer",
            ZoneCategory::Express => "express",
            ZoneCategory::Walmart => "walmart",
            ZoneCategory::Private => "private",
            ZoneCategory::Platform => "platform",
            ZoneCategory::HighValue => "high-value",
            ZoneCategory::Suspense => "suspense",
        };
        f.write_str(name)
    }
}

/// FBA codes stored in the main Amazon zones. Matched exactly or as a prefix.
const MAIN_DESTINATIONS: &[&str] = &[
    "ABE8", "AVP1", "BFI4", "CLT2", "DEN2", "FTW1", "GYR3", "IND9", "LAX9", "LGB8", "MDW2",
    "MEM1", "ONT8", "PHX7", "RIC2", "SBD1", "SCK4", "SMF3", "TCY1", "XLX7", "LAS1", "RFD2",
];

/// FBA codes parked in the buffer zone (low-volume or appointment-heavy sites).
const BUFFER_DESTINATIONS: &[&str] = &[
    "GYR2", "GEU3", "POC1", "POC2", "POC3", "MIT2", "HGR6", "IUSJ", "IUSP", "IUTE",
];

const EXPRESS_KEYWORDS: &[&str] = &["UPS", "FEDEX", "DHL", "USPS", "ONTRAC", "EXPRESS", "快递"];

const WALMART_KEYWORDS: &[&str] = &["WALMART", "WMT", "沃尔玛"];

const PRIVATE_KEYWORDS: &[&str] = &[
    "商业地址", "私人地址", "私人", "住宅", "RESIDENTIAL", "PRIVATE", "COMMERCIALADDRESS",
];

const PLATFORM_KEYWORDS: &[&str] = &[
    "WAYFAIR", "TARGET", "TEMU", "SHEIN", "TIKTOK", "EBAY", "OVERSTOCK", "COSTCO",
];

const CURRENCY_MARKERS: &[char] = &['$', '¥', '￥', '€', '£'];

const SUSPENSE_KEYWORDS: &[&str] = &["中转", "暂存", "待定", "TRANSIT", "STAGING", "HOLD", "PENDING"];

/// Cosmetic prefixes that do not change the logical destination.
const COSMETIC_PREFIXES: &[&str] = &["AMAZON", "AMZ", "FBA", "亚马逊"];

const SEPARATORS: &[char] = &['-', '_', ':', '：', '/'];

static MAIN_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| MAIN_DESTINATIONS.iter().copied().collect());

static BUFFER_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| BUFFER_DESTINATIONS.iter().copied().collect());

/// Canonical form used to compare destinations.
///
/// `" fba-xlx7 "`, `"Amazon XLX7"` and `"XLX7"` all normalize to `"XLX7"`.
pub fn normalize_destination(raw: &str) -> String {
    let mut compact: String = raw
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !SEPARATORS.contains(c))
        .collect();

    loop {
        let stripped = COSMETIC_PREFIXES
            .iter()
            .find(|prefix| compact.len() > prefix.len() && compact.starts_with(*prefix));
        match stripped {
            Some(prefix) => compact = compact[prefix.len()..].to_string(),
            None => break compact,
        }
    }
}

/// Two destination strings name the same logical destination.
pub fn same_destination(a: &str, b: &str) -> bool {
    normalize_destination(a) == normalize_destination(b)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn is_main_code(normalized: &str) -> bool {
    MAIN_SET.contains(normalized)
        || MAIN_DESTINATIONS
            .iter()
            .any(|code| normalized.starts_with(code))
}

/// Three ASCII letters followed by one digit (`"XYZ1"`).
fn looks_like_fba_code(normalized: &str) -> bool {
    let bytes = normalized.as_bytes();
    bytes.len() == 4 && bytes[..3].iter().all(u8::is_ascii_alphabetic) && bytes[3].is_ascii_digit()
}

/// Classify a destination. Total: unmatched input falls back to `Private`.
pub fn classify(destination: &str) -> ZoneCategory {
    let raw = destination.trim();
    let normalized = normalize_destination(raw);

    if is_main_code(&normalized) {
        return ZoneCategory::AmazonMain;
    }
    if BUFFER_SET.contains(normalized.as_str()) {
        return ZoneCategory::AmazonBuffer;
    }
    if contains_any(&normalized, EXPRESS_KEYWORDS) {
        return ZoneCategory::Express;
    }
    if contains_any(&normalized, WALMART_KEYWORDS) {
        return ZoneCategory::Walmart;
    }
    if contains_any(&normalized, PRIVATE_KEYWORDS) {
        return ZoneCategory::Private;
    }
    if contains_any(&normalized, PLATFORM_KEYWORDS) {
        return ZoneCategory::Platform;
    }
    if looks_like_fba_code(&normalized) {
        return ZoneCategory::AmazonMain;
    }
    // Separators are dropped by normalization but currency glyphs survive it.
    if raw.contains(CURRENCY_MARKERS) {
        return ZoneCategory::HighValue;
    }
    if contains_any(&normalized, SUSPENSE_KEYWORDS) {
        return ZoneCategory::Suspense;
    }
    ZoneCategory::Private
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_cosmetic_prefixes() {
        assert_eq!(normalize_destination(" fba-xlx7 "), "XLX7");
        assert_eq!(normalize_destination("Amazon XLX7"), "XLX7");
        assert_eq!(normalize_destination("亚马逊 XLX7"), "XLX7");
        assert_eq!(normalize_destination("AMZ FBA XLX7"), "XLX7");
        assert!(same_destination("FBA_ONT8", "ont8"));
    }

    #[test]
    fn a_bare_prefix_is_not_stripped_to_nothing() {
        assert_eq!(normalize_destination("Amazon"), "AMAZON");
    }

    #[test]
    fn main_list_matches_exactly_and_by_prefix() {
        assert_eq!(classify("XLX7"), ZoneCategory::AmazonMain);
        assert_eq!(classify("  ont8 "), ZoneCategory::AmazonMain);
        assert_eq!(classify("LGB8-bulk"), ZoneCategory::AmazonMain);
    }

    #[test]
    fn buffer_list_is_checked_after_main() {
        assert_eq!(classify("POC2"), ZoneCategory::AmazonBuffer);
        assert_eq!(classify("fba-gyr2"), ZoneCategory::AmazonBuffer);
    }

    #[test]
    fn keyword_categories_follow_priority() {
        assert_eq!(classify("UPS ground"), ZoneCategory::Express);
        assert_eq!(classify("Walmart DC 6094"), ZoneCategory::Walmart);
        assert_eq!(classify("商业地址"), ZoneCategory::Private);
        assert_eq!(classify("Wayfair CastleGate"), ZoneCategory::Platform);
        // Express outranks private even when both keywords appear.
        assert_eq!(classify("FedEx residential"), ZoneCategory::Express);
    }

    #[test]
    fn unknown_fba_style_code_is_main() {
        assert_eq!(classify("QXY9"), ZoneCategory::AmazonMain);
        assert_eq!(classify("QXY99"), ZoneCategory::Private);
    }

    #[test]
    fn currency_marker_means_high_value() {
        assert_eq!(classify("$2000 electronics"), ZoneCategory::HighValue);
        assert_eq!(classify("￥ jewellery"), ZoneCategory::HighValue);
    }

    #[test]
    fn transit_keywords_mean_suspense() {
        assert_eq!(classify("中转仓"), ZoneCategory::Suspense);
        assert_eq!(classify("staging lane"), ZoneCategory::Suspense);
    }

    #[test]
    fn anything_else_defaults_to_private() {
        assert_eq!(classify("John Smith, 12 Elm St"), ZoneCategory::Private);
        assert_eq!(classify(""), ZoneCategory::Private);
    }
}
