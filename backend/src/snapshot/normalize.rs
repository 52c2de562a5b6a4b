//! Venue records to normalized quotes and ATM candidates.

use engine::{
    AtmCandidate, AtmSelection, OptionQuote, OptionType, QuoteKey, QuoteRejection, Venue,
    atm_signal, parse_instrument,
};
use tracing::debug;

use crate::instruments::InstrumentMap;
use crate::venues::{BookSummary, TickerPage};

#[derive(Debug, Default)]
pub struct NormalizedChain {
    pub quotes: Vec<OptionQuote>,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct NormalizedAtmVenue {
    pub quotes: Vec<OptionQuote>,
    pub candidates: usize,
    pub selection: Option<AtmSelection>,
    pub skipped: usize,
}

struct Contract {
    expiry_ms: i64,
    strike: f64,
    option_type: OptionType,
}

pub fn normalize_deribit_chain(
    chain: &[BookSummary],
    now_ms: i64,
    max_age_ms: i64,
) -> NormalizedChain {
    let mut out = NormalizedChain::default();

    for summary in chain {
        match deribit_quote(summary, now_ms, max_age_ms) {
            Ok(q) => out.quotes.push(q),
            Err(reason) => {
                out.skipped += 1;
                debug!(instrument = %summary.instrument_name, %reason, "deribit record skipped");
            }
        }
    }

    out
}

fn deribit_quote(
    summary: &BookSummary,
    now_ms: i64,
    max_age_ms: i64,
) -> Result<OptionQuote, QuoteRejection> {
    let spec = parse_instrument(&summary.instrument_name)?;

    let key = QuoteKey {
        venue: Venue::Deribit,
        instrument_id: summary.instrument_name.clone(),
        expiry_ms: spec.expiry_ms(),
        strike: spec.strike,
        option_type: spec.option_type,
        observed_at_ms: summary.creation_timestamp.unwrap_or(now_ms),
    };

    let quote = OptionQuote::from_sides(
        key,
        summary.bid_price.filter(|p| *p > 0.0),
        summary.ask_price.filter(|p| *p > 0.0),
    )?;
    quote.check_fresh(now_ms, max_age_ms)?;

    Ok(quote)
}

/// Builds quotes and the ATM 30-day selection from one ticker page.
///
/// Contract terms come from the instrument listing when the symbol is known,
/// otherwise from the symbol itself. A ticker without a usable quote can
/// still feed the ATM selection through its mark IV.
pub fn normalize_bybit(
    page: &TickerPage,
    instruments: &InstrumentMap,
    spot_usd: f64,
    now_ms: i64,
    max_age_ms: i64,
) -> NormalizedAtmVenue {
    let mut out = NormalizedAtmVenue::default();
    let mut candidates = Vec::with_capacity(page.tickers.len());

    for ticker in &page.tickers {
        let contract = match resolve_contract(&ticker.symbol, instruments) {
            Ok(c) => c,
            Err(reason) => {
                out.skipped += 1;
                debug!(symbol = %ticker.symbol, %reason, "bybit record skipped");
                continue;
            }
        };

        if contract.expiry_ms <= now_ms {
            out.skipped += 1;
            continue;
        }

        let key = QuoteKey {
            venue: Venue::Bybit,
            instrument_id: ticker.symbol.clone(),
            expiry_ms: contract.expiry_ms,
            strike: contract.strike,
            option_type: contract.option_type,
            observed_at_ms: page.observed_at_ms,
        };
        match OptionQuote::from_sides(key, ticker.bid(), ticker.ask())
            .and_then(|q| q.check_fresh(now_ms, max_age_ms).map(|_| q))
        {
            Ok(q) => out.quotes.push(q),
            Err(reason) => debug!(symbol = %ticker.symbol, %reason, "bybit quote dropped"),
        }

        if let Some(mark_iv) = ticker.mark_iv() {
            candidates.push(AtmCandidate {
                expiry_ms: contract.expiry_ms,
                strike: contract.strike,
                option_type: contract.option_type,
                mark_iv,
                delta: ticker.delta().unwrap_or(f64::NAN),
            });
        }
    }

    out.candidates = candidates.len();
    out.selection = atm_signal(candidates, spot_usd, now_ms);
    out
}

fn resolve_contract(symbol: &str, instruments: &InstrumentMap) -> Result<Contract, QuoteRejection> {
    if let Some(meta) = instruments.get(symbol) {
        return Ok(Contract {
            expiry_ms: meta.expiry_ms,
            strike: meta.strike,
            option_type: meta.option_type,
        });
    }

    let spec = parse_instrument(symbol)?;
    Ok(Contract {
        expiry_ms: spec.expiry_ms(),
        strike: spec.strike,
        option_type: spec.option_type,
    })
}
