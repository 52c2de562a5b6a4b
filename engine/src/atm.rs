//! At-the-money 30-day signal for venues that do not publish an index.
//!
//! Selection is deterministic regardless of input order:
//! - expiries are visited in ascending expiry time, strikes in ascending
//!   strike, and a candidate only replaces the current best when it is
//!   strictly closer. Ties therefore go to the earliest expiry and the
//!   lowest strike.

use std::collections::BTreeMap;

use crate::MS_PER_DAY;
use crate::types::OptionType;

/// Target tenor in days.
pub const TARGET_DTE_DAYS: f64 = 30.0;

/// Delta of an at-the-money call, used when spot is unknown.
pub const ATM_CALL_DELTA: f64 = 0.5;

/// One live option considered for the ATM signal.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmCandidate {
    pub expiry_ms: i64,
    pub strike: f64,
    pub option_type: OptionType,
    /// Mark implied volatility, in the venue's native unit.
    pub mark_iv: f64,
    pub delta: f64,
}

/// The point chosen on the chain and the resulting signal.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmSelection {
    pub expiry_ms: i64,
    pub dte_days: f64,
    pub strike: f64,
    pub call_iv: Option<f64>,
    pub put_iv: Option<f64>,
    pub signal: f64,
}

pub fn days_to_expiry(expiry_ms: i64, now_ms: i64) -> f64 {
    (expiry_ms - now_ms) as f64 / MS_PER_DAY
}

/// Drops expired candidates and those without a positive mark IV, then
/// groups the rest by expiry (ascending).
pub fn group_live_by_expiry(
    candidates: impl IntoIterator<Item = AtmCandidate>,
    now_ms: i64,
) -> BTreeMap<i64, Vec<AtmCandidate>> {
    let mut groups: BTreeMap<i64, Vec<AtmCandidate>> = BTreeMap::new();

    for c in candidates {
        if days_to_expiry(c.expiry_ms, now_ms) <= 0.0 {
            continue;
        }
        if c.mark_iv.is_nan() || c.mark_iv <= 0.0 {
            continue;
        }
        groups.entry(c.expiry_ms).or_default().push(c);
    }

    groups
}

/// Expiry whose DTE is closest to 30 days; the earliest expiry wins ties.
pub fn select_expiry<'a>(expiries: impl IntoIterator<Item = &'a i64>, now_ms: i64) -> Option<i64> {
    let mut sorted: Vec<i64> = expiries.into_iter().copied().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut best: Option<(i64, f64)> = None;
    for expiry in sorted {
        let diff = (days_to_expiry(expiry, now_ms) - TARGET_DTE_DAYS).abs();
        if best.is_none_or(|(_, d)| diff < d) {
            best = Some((expiry, diff));
        }
    }

    best.map(|(e, _)| e)
}

/// At-the-money strike within one expiry.
///
/// With a positive spot this is the strike nearest to spot; otherwise the
/// call whose absolute delta is nearest to 0.5. The lowest strike wins ties.
pub fn select_strike(options: &[AtmCandidate], spot: f64) -> Option<f64> {
    let mut sorted: Vec<&AtmCandidate> = options.iter().collect();
    sorted.sort_by(|a, b| a.strike.total_cmp(&b.strike));

    let mut best: Option<(f64, f64)> = None;
    for o in sorted {
        let distance = if spot > 0.0 {
            (o.strike - spot).abs()
        } else if o.option_type == OptionType::Call && o.delta.is_finite() {
            (o.delta.abs() - ATM_CALL_DELTA).abs()
        } else {
            continue;
        };

        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((o.strike, distance));
        }
    }

    best.map(|(s, _)| s)
}

/// Runs expiry selection, strike selection and the call/put blend.
///
/// Returns `None` when no live candidate exists or no strike can be chosen;
/// callers report that as a zero signal.
pub fn atm_signal(
    candidates: impl IntoIterator<Item = AtmCandidate>,
    spot: f64,
    now_ms: i64,
) -> Option<AtmSelection> {
    let groups = group_live_by_expiry(candidates, now_ms);
    let expiry_ms = select_expiry(groups.keys(), now_ms)?;
    let options = groups.get(&expiry_ms)?;
    let strike = select_strike(options, spot)?;

    let iv_at = |kind: OptionType| {
        options
            .iter()
            .find(|o| o.strike == strike && o.option_type == kind)
            .map(|o| o.mark_iv)
    };
    let call_iv = iv_at(OptionType::Call);
    let put_iv = iv_at(OptionType::Put);

    let signal = match (call_iv, put_iv) {
        (Some(c), Some(p)) => (c + p) / 2.0,
        (Some(c), None) => c,
        (None, Some(p)) => p,
        (None, None) => 0.0,
    };

    Some(AtmSelection {
        expiry_ms,
        dte_days: days_to_expiry(expiry_ms, now_ms),
        strike,
        call_iv,
        put_iv,
        signal,
    })
}
