//! Sequential handler execution.

use tracing::{trace, warn};

use crate::error::CacheError;
use crate::handler::{EventContext, HandlerRegistry, Registration};
use crate::metrics;

/// Runs the handlers of one event for one request.
///
/// Engine-wide handlers and per-request handlers are merged into a single
/// order: tier, then engine-wide before per-request, then registration
/// order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pipeline<'a> {
    global: &'a HandlerRegistry,
    local: Option<&'a HandlerRegistry>,
    suppress_errors: bool,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(
        global: &'a HandlerRegistry,
        local: Option<&'a HandlerRegistry>,
        suppress_errors: bool,
    ) -> Self {
        Pipeline {
            global,
            local,
            suppress_errors,
        }
    }

    fn select(&self, cx: &EventContext<'_>) -> Vec<&'a Registration> {
        let event = cx.event();
        let result_type = cx.result_type();

        let global = self.global.for_event(event).iter().map(|r| (r, 0u8));
        let local = self
            .local
            .map(|registry| registry.for_event(event))
            .unwrap_or_default()
            .iter()
            .map(|r| (r, 1u8));

        let mut selected: Vec<_> = global
            .chain(local)
            .filter(|(r, _)| r.constraint().accepts(result_type))
            .collect();
        selected.sort_by_key(|(r, origin)| (r.priority(), *origin, r.sequence()));
        selected.into_iter().map(|(r, _)| r).collect()
    }

    /// Runs every matching handler in order.
    ///
    /// The first failure aborts the run, unless errors are suppressed, in
    /// which case it is logged and the next handler runs.
    pub(crate) async fn run(&self, cx: &mut EventContext<'_>) -> Result<(), CacheError> {
        let selected = self.select(cx);
        if selected.is_empty() {
            return Ok(());
        }

        let event = cx.event();
        trace!(%event, key = %cx.key(), handlers = selected.len(), "running handlers");
        for registration in selected {
            if let Err(source) = registration.handler().handle(cx).await {
                metrics::handler_failed(event);
                if self.suppress_errors {
                    warn!(%event, key = %cx.key(), error = %source, "cache handler failed");
                    continue;
                }
                return Err(CacheError::Handler { event, source });
            }
        }
        Ok(())
    }
}
