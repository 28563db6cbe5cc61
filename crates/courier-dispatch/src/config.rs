//! Dispatch configuration.

use std::time::Duration;

use courier_transport::{HtmlTemplate, MESSAGE_PLACEHOLDER};

// ---------------------------------------------------------------------------
// DispatchConfig
// ---------------------------------------------------------------------------

/// Limits and layout for one [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Most sends in flight at once. Values below 1 are treated as 1.
    /// Default: 16.
    pub max_concurrency: usize,

    /// Deadline for a single send. A send that misses it counts as a
    /// failure for that recipient. `None` waits indefinitely.
    /// Default: 30 seconds.
    pub send_timeout: Option<Duration>,

    /// HTML wrapper the message body is rendered into.
    pub template: HtmlTemplate,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            send_timeout: Some(Duration::from_secs(30)),
            template: HtmlTemplate::new(
                "<html><body>{{MESSAGE}}</body></html>",
                MESSAGE_PLACEHOLDER,
            ),
        }
    }
}

impl DispatchConfig {
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_template(mut self, template: HtmlTemplate) -> Self {
        self.template = template;
        self
    }

    /// The concurrency cap actually applied.
    pub(crate) fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
