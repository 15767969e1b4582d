//! Turns the engine's free-text output into a per-party tally of elected seats.

use snafu::prelude::*;

use crate::harness::{HarnessResult, MalformedOutputSnafu, PartyTally};

/// The engine prints this line before listing the elected candidates.
pub const ELECTED_MARKER: &str = "=== Elected ===";

/// Extracts the party tally from one engine run's output.
///
/// The elected section is everything after the last `=== Elected ===` line; each
/// non-empty line in it is one elected candidate, carrying its party code between
/// the last pair of parentheses. If the marker is absent the whole output is treated
/// as the elected section; callers should treat a resulting empty tally as suspicious.
///
/// The parenthesis convention is fixed by the engine's output contract. Lines using
/// any other delimiter style fail loudly rather than being guessed at.
pub fn parse(raw: &str) -> HarnessResult<PartyTally> {
    let lines: Vec<&str> = raw.lines().collect();
    let start = lines
        .iter()
        .rposition(|l| l.trim() == ELECTED_MARKER)
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut tally = PartyTally::new();
    for line in lines[start..].iter().map(|l| l.trim()) {
        if line.is_empty() {
            continue;
        }
        let code = party_code(line)?;
        *tally.entry(code.to_string()).or_insert(0) += 1;
    }
    Ok(tally)
}

// "Alice Smith (PartyA)" -> "PartyA". The last open parenthesis wins, so
// "Smith (John) (PartyB)" yields "PartyB".
fn party_code(line: &str) -> HarnessResult<&str> {
    let open = match line.rfind('(') {
        Some(i) => i,
        None => return MalformedOutputSnafu { line }.fail(),
    };
    let rest = &line[open + 1..];
    let close = match rest.find(')') {
        Some(i) => i,
        None => return MalformedOutputSnafu { line }.fail(),
    };
    let code = rest[..close].trim();
    ensure!(!code.is_empty(), MalformedOutputSnafu { line });
    Ok(code)
}
