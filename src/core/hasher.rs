//! Canonical hasher: 32-bit FNV-style digest plus a canonical serializer
//!
//! Wire-compatibility constraints:
//! - The digest consumes UTF-16 code units of the canonical string, not UTF-8
//!   bytes. Non-ASCII glyphs hash differently under the two encodings.
//! - Object keys are always sorted lexicographically, whatever order the
//!   value was built in.
//! - Numbers render in their shortest round-trip decimal form, switching to
//!   exponent form below 1e-6 and from 1e21 up. Non-finite numbers render "0".

use serde_json::Value;
use crate::SENTINEL_HASH;

/// FNV offset basis
const FNV_OFFSET: u32 = 0x811c_9dc5;

/// Raw 32-bit digest over the UTF-16 code units of `input`
pub fn digest(input: &str) -> u32 {
    let mut h = FNV_OFFSET;
    for unit in input.encode_utf16() {
        h ^= u32::from(unit);
        h = h
            .wrapping_add(h << 1)
            .wrapping_add(h << 4)
            .wrapping_add(h << 7)
            .wrapping_add(h << 8)
            .wrapping_add(h << 24);
    }
    h
}

/// Render a digest as `h:` + 8 lowercase hex digits
pub fn render(digest: u32) -> String {
    format!("h:{:08x}", digest)
}

/// Hash a string
pub fn hash_str(input: &str) -> String {
    render(digest(input))
}

/// Hash the canonical serialization of a structured value
pub fn hash_value(value: &Value) -> String {
    hash_str(&canonicalize(value))
}

/// Low 32 bits of a rendered hash. Malformed hashes yield 0.
pub fn low32(hash: &str) -> u32 {
    hash.strip_prefix("h:")
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .unwrap_or(0)
}

/// Is this the no-subject sentinel?
pub fn is_sentinel(hash: &str) -> bool {
    hash == SENTINEL_HASH
}

/// Build a number value; non-finite inputs become 0
pub fn num(value: f64) -> Value {
    if value.is_finite() {
        Value::from(value)
    } else {
        Value::from(0)
    }
}

/// Canonical string form of a structured value
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else if let Some(u) = n.as_u64() {
                out.push_str(&u.to_string());
            } else {
                out.push_str(&format_number(n.as_f64().unwrap_or(0.0)));
            }
        }
        // Display for Value is compact JSON, so this is the quoted literal
        Value::String(_) => out.push_str(&value.to_string()),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_value(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// Shortest round-trip decimal form of a float
pub fn format_number(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{}", value);
    }

    // Exponent form: mantissa "e" sign exponent
    let raw = format!("{:e}", value);
    match raw.split_once('e') {
        Some((mantissa, exp)) if exp.starts_with('-') => format!("{}e{}", mantissa, exp),
        Some((mantissa, exp)) => format!("{}e+{}", mantissa, exp),
        None => raw,
    }
}

/// Round to a fixed number of fractional digits; non-finite results become 0
pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scale = 10f64.powi(digits);
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() {
        // normalise -0.0
        rounded + 0.0
    } else {
        0.0
    }
}

// =============================================================================
// TESTS
// =============================================================================
