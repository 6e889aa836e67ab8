//! Comparison keys for free-text catalog fields.
//!
//! Catalog data is typed in by hand on each platform, so the same configuration
//! shows up as `"16 GB"`, `"16GB"` or `"16gb"`, and the same chip as
//! `"Core i5"`, `"Intel Core i5"` or `"i5"`. Everything that compares catalog
//! fields goes through these functions. They are pure and never fail.

/// How a field is reduced to its comparison key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Trim and lowercase.
    Text,
    /// Trim, lowercase and drop internal whitespace (RAM, storage).
    Compact,
    /// Compact form mapped through the processor alias table.
    Processor,
}

/// Vendor words that may prefix a processor name without changing it.
const PROCESSOR_VENDOR_PREFIXES: &[&str] = &["intel", "amd", "apple"];

/// Compact processor spellings and the token they collapse to.
const PROCESSOR_ALIASES: &[(&str, &str)] = &[
    ("corei3", "i3"),
    ("corei5", "i5"),
    ("corei7", "i7"),
    ("corei9", "i9"),
    ("coreultra5", "ultra5"),
    ("coreultra7", "ultra7"),
    ("coreultra9", "ultra9"),
];

pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn normalize_compact(raw: &str) -> String {
    raw.split_whitespace().collect::<String>().to_lowercase()
}

/// `"Core i5"`, `"corei5"`, `"Intel Core i5"` and `"i5"` all become `"i5"`.
/// Tokens outside the alias table come back in compact form.
pub fn normalize_processor(raw: &str) -> String {
    let compact = normalize_compact(raw);

    let without_vendor = PROCESSOR_VENDOR_PREFIXES
        .iter()
        .find_map(|prefix| compact.strip_prefix(prefix).filter(|rest| !rest.is_empty()))
        .unwrap_or(compact.as_str());

    PROCESSOR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == without_vendor)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| without_vendor.to_string())
}

pub fn normalize_field(kind: FieldKind, raw: &str) -> String {
    match kind {
        FieldKind::Text => normalize_text(raw),
        FieldKind::Compact => normalize_compact(raw),
        FieldKind::Processor => normalize_processor(raw),
    }
}

/// Equality on comparison keys. An empty key never matches anything, including
/// another empty key: a listing with a blank field is unknown, not equal.
pub fn fields_match(kind: FieldKind, requested: &str, candidate: &str) -> bool {
    let requested = normalize_field(kind, requested);
    !requested.is_empty() && requested == normalize_field(kind, candidate)
}
