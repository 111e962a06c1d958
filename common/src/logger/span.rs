use tracing::{Span, field};

use super::TraceId;

/// Root span for one upkeep tick or one fulfillment delivery.
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "root",
        name = %name,
        trace_id = %trace_id,
        request_id = field::Empty
    )
}
