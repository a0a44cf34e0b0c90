//! Token-stream specs for drivers: `glyph:weight, glyph:weight, ...`

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{EngineError, Token};

lazy_static! {
    // glyph: anything but ':' and ','; weight: plain or exponent decimal
    static ref RE_TOKEN: Regex = Regex::new(
        r"^\s*(?P<glyph>[^:,\s][^:,]*?)\s*:\s*(?P<weight>[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*$"
    ).unwrap();
}

/// Parse a token spec. An empty or blank spec is an empty stream.
pub fn parse_tokens(spec: &str) -> Result<Vec<Token>, EngineError> {
    if spec.trim().is_empty() {
        return Ok(Vec::new());
    }

    spec.split(',')
        .enumerate()
        .map(|(index, entry)| parse_entry(index, entry))
        .collect()
}

fn parse_entry(index: usize, entry: &str) -> Result<Token, EngineError> {
    let caps = RE_TOKEN.captures(entry).ok_or_else(|| {
        EngineError::Input(format!("token {}: expected glyph:weight, got {:?}", index, entry.trim()))
    })?;

    let weight: f64 = caps["weight"]
        .parse()
        .map_err(|_| EngineError::Input(format!("token {}: bad weight {:?}", index, &caps["weight"])))?;
    if !weight.is_finite() {
        return Err(EngineError::Input(format!("token {}: weight is not finite", index)));
    }

    Ok(Token::new(&caps["glyph"], weight))
}

// =============================================================================
// TESTS
// =============================================================================
