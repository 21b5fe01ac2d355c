//! Name transforms between the external and native conventions.
//!
//! Form fields arrive in camelCase (`createdAt`); columns and document
//! fields are snake_case (`created_at`). The transforms are exact and
//! deterministic — no locale handling, no acronym special cases.

/// Converts an external camelCase name to its native snake_case form.
///
/// Names that are already snake_case pass through unchanged.
#[must_use]
pub fn to_snake_case(external: &str) -> String {
    let mut out = String::with_capacity(external.len() + 4);
    for (i, ch) in external.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a native snake_case name to its external camelCase form.
#[must_use]
pub fn to_camel_case(native: &str) -> String {
    let mut out = String::with_capacity(native.len());
    let mut upper_next = false;
    for ch in native.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
