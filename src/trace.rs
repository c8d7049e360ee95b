//! Decoder instrumentation behind the `tracing` feature.
//!
//! Stages open a span with `trace_span!` and report their counters with
//! `trace_event!`. Without the feature the span is a unit guard and the
//! field values are only borrowed.

#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($stage:literal $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info_span!($stage $(, $field = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($stage:literal $(, $field:ident = $value:expr)* $(,)?) => {{
        $(let _ = &$value;)*
        $crate::trace::StageGuard
    }};
}

/// Counters are logged at debug level, tagged with the stage name.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($stage:literal $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug!(stage = $stage $(, $field = $value)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($stage:literal $(, $field:ident = $value:expr)* $(,)?) => {{
        $(let _ = &$value;)*
    }};
}

pub(crate) use trace_event;
pub(crate) use trace_span;

#[cfg(not(feature = "tracing"))]
pub(crate) struct StageGuard;

#[cfg(not(feature = "tracing"))]
impl StageGuard {
    #[inline]
    pub(crate) fn entered(self) -> Self {
        self
    }
}
