//! Progress messages shown while a lookup is in flight.

use crate::types::LookupOptions;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// How long each message stays on screen.
pub const MESSAGE_ROTATION_INTERVAL: Duration = Duration::from_millis(2500);

/// How often the elapsed counter is refreshed.
pub const ELAPSED_TICK_INTERVAL: Duration = Duration::from_secs(1);

const BASE_MESSAGES: &[&str] = &[
    "Initializing DNS query...",
    "Querying authoritative nameservers...",
    "Resolving DNS records...",
    "Validating responses...",
    "Almost there...",
    "Finalizing analysis...",
];

const ENRICHMENT_MESSAGES: &[&str] = &[
    "Analyzing email security configuration...",
    "Parsing SPF, DMARC, DKIM records...",
    "Enriching data with intelligence...",
    "Gathering security insights...",
    "Validating MX records...",
];

const SSL_MESSAGES: &[&str] = &[
    "Inspecting SSL/TLS certificates...",
    "Checking certificate chain...",
    "Validating certificate expiry...",
];

const PROPAGATION_MESSAGES: &[&str] = &[
    "Checking DNS propagation across global servers...",
    "Querying DNS servers worldwide...",
    "Verifying consistency...",
];

const REVERSE_MESSAGES: &[&str] = &["Performing reverse DNS lookups...", "Resolving PTR records..."];

/// Collect the messages relevant to `options`, shuffled once.
pub fn build_loading_messages<R: Rng + ?Sized>(
    options: &LookupOptions,
    rng: &mut R,
) -> Vec<&'static str> {
    let mut messages: Vec<&'static str> = BASE_MESSAGES.to_vec();

    if options.enrichment {
        messages.extend_from_slice(ENRICHMENT_MESSAGES);
    }
    if options.ssl_inspection {
        messages.extend_from_slice(SSL_MESSAGES);
    }
    if options.check_propagation {
        messages.extend_from_slice(PROPAGATION_MESSAGES);
    }
    if options.reverse_dns {
        messages.extend_from_slice(REVERSE_MESSAGES);
    }

    messages.shuffle(rng);
    messages
}

/// Whole seconds elapsed, e.g. `"12s"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{}s", elapsed.as_secs())
}

/// A cyclic sequence of progress messages for one submission.
#[derive(Debug, Clone)]
pub struct LoadingMessages {
    messages: Vec<&'static str>,
    index: usize,
}

impl LoadingMessages {
    /// Messages for `options`, shuffled with the thread-local generator.
    pub fn for_options(options: &LookupOptions) -> Self {
        Self {
            messages: build_loading_messages(options, &mut rand::rng()),
            index: 0,
        }
    }

    pub fn current(&self) -> &'static str {
        self.messages[self.index]
    }

    /// Move to the next message, wrapping around at the end.
    pub fn advance(&mut self) -> &'static str {
        self.index = (self.index + 1) % self.messages.len();
        self.current()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
