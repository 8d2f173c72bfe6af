//! Brand allow-list and product name cleanup.

use lazy_regex::regex_replace_all;

/// Source brand/manufacturer fragments (lower-case) and the display brand
/// they map to. Checked in order; the first fragment contained in the raw
/// value wins.
pub const BRANDS: &[(&str, &str)] = &[
    ("räder", "Räder"),
    ("rader", "Räder"),
    ("rader gmbh", "Räder"),
    ("my flame lifestyle", "My Flame"),
    ("my flame", "My Flame"),
    ("remember", "Remember"),
    ("relaxound", "Relaxound"),
    ("ideas 4 seasons", "Ideas4Seasons"),
    ("ideas4seasons", "Ideas4Seasons"),
    ("elvang", "Elvang"),
];

/// Maps a raw brand to its display name. Anything not on the allow-list is
/// `None`: the inventory also carries wholesale-only lines the storefront
/// does not sell.
pub fn normalize_brand(raw: &str) -> Option<&'static str> {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    BRANDS
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, display)| *display)
}

/// Strips `**LAST CHANCE**`-style annotations and trailing dashes, collapses
/// whitespace.
pub fn clean_product_name(name: &str) -> String {
    let cleaned = regex_replace_all!(r"\*\*[^*]+\*\*", name, " ");
    let cleaned = regex_replace_all!(r"\s*-\s*$", &*cleaned, " ");
    let cleaned = regex_replace_all!(r"\s+", &*cleaned, " ");
    cleaned.trim().to_string()
}
