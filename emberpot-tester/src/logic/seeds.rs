use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Seed used when the command line names none.
pub const DEFAULT_SEED: u64 = 1337;

/// Resolve CLI seed tokens into a deduplicated, ordered seed list.
///
/// Accepts decimal integers (negative values fold to their magnitude),
/// `0x`-prefixed hex, and half-open `start..end` ranges.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut pending = Vec::new();
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some((start, end)) = token.split_once("..") {
            let start = parse_seed(start)?;
            let end = parse_seed(end)?;
            if end <= start {
                bail!("Empty seed range: {token}");
            }
            pending.extend(start..end);
            continue;
        }
        pending.push(parse_seed(token)?);
    }

    let mut seen = HashSet::new();
    pending.retain(|seed| seen.insert(*seed));
    if pending.is_empty() {
        pending.push(DEFAULT_SEED);
    }
    Ok(pending)
}

fn parse_seed(token: &str) -> Result<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .with_context(|| format!("Unrecognized seed token: {token}"));
    }
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    bail!("Unrecognized seed token: {token}")
}
