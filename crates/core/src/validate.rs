//! Field validators shared by every record type.
//!
//! Each helper records failures into a `FieldErrors` so callers can report
//! every problem with an input at once.

use crate::error::FieldErrors;

/// Trim `value`; record `"required"` under `field` when nothing is left.
pub fn required(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, "required");
    }
    trimmed.to_string()
}

/// Enforce a maximum length in characters.
pub fn max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(field, format!("must be at most {max} characters"));
    }
}

/// `#RRGGBB`.
pub fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn hex_color(errors: &mut FieldErrors, field: &str, value: &str) {
    if !is_hex_color(value) {
        errors.push(field, "must be a color in #RRGGBB form");
    }
}

/// Lowercase ascii letters, digits, `-` and `_`.
pub fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Shape check only: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !domain.starts_with('.')
}

pub fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}

/// Validate an optional link; blank input normalizes to `None`.
pub fn optional_link(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    if !is_http_url(value) {
        errors.push(field, "must be an http(s) URL");
    }
    Some(value.to_string())
}
