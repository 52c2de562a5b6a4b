use tracing::{Span, field};

use super::TraceId;

/// Root span for one aggregation cycle.
pub fn cycle_span(base_asset: &str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "cycle",
        trace_id = %trace_id,
        base_asset = %base_asset,
        confidence = field::Empty,
        value = field::Empty
    )
}

/// Child span for a single venue pipeline (inherits the cycle's trace id).
pub fn child_span(name: &'static str) -> Span {
    tracing::info_span!("venue", name = %name)
}
