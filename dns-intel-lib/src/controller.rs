//! Submission flow for a single lookup form.
//!
//! The controller owns everything a submission touches: the challenge token
//! provider, the shareable location, the history store and the most recent
//! result. It takes `&mut self` for a submission, so at most one can be in
//! flight.

use crate::client::ApiClient;
use crate::error::DnsIntelError;
use crate::export::export_json;
use crate::history::HistoryStore;
use crate::render::{render_result, ResultView};
use crate::types::{LookupOptions, LookupResult};
use crate::validate::require_domain;
use std::future::Future;
use url::Url;

/// Query parameter carrying the domain in shareable links.
pub const DOMAIN_PARAM: &str = "domain";

/// Where a submission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Invalid,
    Valid,
    Submitting,
    Success,
    Failed,
}

/// Anything that can perform a lookup against the analysis API.
pub trait LookupBackend {
    fn lookup(
        &self,
        domain: &str,
        options: &LookupOptions,
        token: Option<&str>,
    ) -> impl Future<Output = Result<serde_json::Value, DnsIntelError>>;
}

impl LookupBackend for ApiClient {
    fn lookup(
        &self,
        domain: &str,
        options: &LookupOptions,
        token: Option<&str>,
    ) -> impl Future<Output = Result<serde_json::Value, DnsIntelError>> {
        ApiClient::lookup(self, domain, options, token)
    }
}

/// Source of bot-mitigation challenge tokens.
pub trait ChallengeProvider {
    /// Token for the next submission, if one is available.
    fn token(&self) -> Option<String>;

    /// Invalidate the current token. Called after every API call.
    fn reset(&mut self);
}

/// A challenge provider backed by a pre-obtained token.
#[derive(Debug, Clone, Default)]
pub struct StaticChallenge {
    token: Option<String>,
    resets: usize,
}

impl StaticChallenge {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            resets: 0,
        }
    }

    /// How many times the provider has been reset.
    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl ChallengeProvider for StaticChallenge {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn reset(&mut self) {
        self.resets += 1;
        tracing::debug!(resets = self.resets, "challenge reset");
    }
}

/// What the UI should do after a back/forward navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEffect {
    /// Put this domain back into the input
    Restore(String),
    /// Empty the input and hide results
    Clear,
}

/// A shareable page URL with its navigation history.
#[derive(Debug, Clone)]
pub struct Location {
    entries: Vec<Url>,
    index: usize,
}

impl Location {
    pub fn new(url: Url) -> Self {
        Self {
            entries: vec![url],
            index: 0,
        }
    }

    pub fn parse(url: &str) -> Result<Self, DnsIntelError> {
        Ok(Self::new(Url::parse(url)?))
    }

    pub fn current(&self) -> &Url {
        &self.entries[self.index]
    }

    /// Domain to pre-fill the input with when the page is opened.
    pub fn initial_domain(&self) -> Option<String> {
        domain_param(self.current())
    }

    /// Record a new location for `domain`, discarding any forward entries.
    pub fn push_domain(&mut self, domain: &str) {
        let mut url = self.current().clone();
        let others: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != DOMAIN_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(others)
            .append_pair(DOMAIN_PARAM, domain);

        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index += 1;
    }

    pub fn back(&mut self) -> Option<NavigationEffect> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.effect())
    }

    pub fn forward(&mut self) -> Option<NavigationEffect> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(self.effect())
    }

    fn effect(&self) -> NavigationEffect {
        match domain_param(self.current()) {
            Some(domain) => NavigationEffect::Restore(domain),
            None => NavigationEffect::Clear,
        }
    }
}

fn domain_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == DOMAIN_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Monotonic id, unique per controller
    pub id: u64,
    pub domain: String,
    pub options: LookupOptions,
    pub view: ResultView,
    /// The raw result entry, as returned by the API
    pub raw: serde_json::Value,
}

/// Pick the first result out of an API response.
///
/// Returns the raw entry (kept for export) together with its typed form.
pub fn extract_result(
    response: &serde_json::Value,
) -> Result<(serde_json::Value, LookupResult), DnsIntelError> {
    let entry = response
        .get("results")
        .and_then(|results| results.get(0))
        .filter(|entry| entry.get("lookupResult").is_some_and(|r| !r.is_null()))
        .ok_or_else(|| DnsIntelError::unexpected("Unexpected API response"))?;

    let typed = serde_json::from_value::<LookupResult>(entry.clone()).map_err(|e| {
        tracing::debug!(error = %e, "result entry does not match the expected shape");
        DnsIntelError::unexpected("Unexpected API response")
    })?;

    Ok((entry.clone(), typed))
}

/// Drives validation, submission and bookkeeping for lookups.
pub struct LookupController<B, C> {
    backend: B,
    challenge: C,
    history: HistoryStore,
    location: Location,
    state: SubmissionState,
    next_id: u64,
    last: Option<Submission>,
}

impl<B: LookupBackend, C: ChallengeProvider> LookupController<B, C> {
    pub fn new(backend: B, challenge: C, history: HistoryStore, location: Location) -> Self {
        Self {
            backend,
            challenge,
            history,
            location,
            state: SubmissionState::Idle,
            next_id: 1,
            last: None,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn challenge(&self) -> &C {
        &self.challenge
    }

    /// Domain to pre-fill from the location. Never submits on its own.
    pub fn initial_domain(&self) -> Option<String> {
        self.location.initial_domain()
    }

    /// Validate and submit a lookup.
    pub async fn submit(
        &mut self,
        raw_input: &str,
        options: &LookupOptions,
    ) -> Result<Submission, DnsIntelError> {
        self.submit_observed(raw_input, options, |_| {}).await
    }

    /// Like [`submit`](Self::submit), reporting every state change to `observer`.
    ///
    /// The observer always sees the controller return to `Idle`, whatever the
    /// outcome.
    pub async fn submit_observed<F>(
        &mut self,
        raw_input: &str,
        options: &LookupOptions,
        mut observer: F,
    ) -> Result<Submission, DnsIntelError>
    where
        F: FnMut(SubmissionState),
    {
        let id = self.next_id;
        self.next_id += 1;

        self.transition(SubmissionState::Validating, &mut observer);
        let domain = match require_domain(raw_input) {
            Ok(domain) => domain,
            Err(e) => {
                tracing::debug!(submission = id, error = %e, "input rejected");
                self.transition(SubmissionState::Invalid, &mut observer);
                self.transition(SubmissionState::Idle, &mut observer);
                return Err(e);
            }
        };

        let Some(token) = self.challenge.token().filter(|t| !t.is_empty()) else {
            self.transition(SubmissionState::Idle, &mut observer);
            return Err(DnsIntelError::MissingChallengeToken);
        };

        self.transition(SubmissionState::Valid, &mut observer);
        self.transition(SubmissionState::Submitting, &mut observer);
        tracing::info!(submission = id, domain = %domain, "submitting lookup");

        let outcome = self
            .backend
            .lookup(&domain, options, Some(&token))
            .await
            .and_then(|response| extract_result(&response));

        self.challenge.reset();

        let result = match outcome {
            Ok((raw, typed)) => {
                self.location.push_domain(&domain);
                if let Err(e) = self.history.save(&domain, options) {
                    tracing::warn!(domain = %domain, error = %e, "could not save lookup to history");
                }

                let submission = Submission {
                    id,
                    domain,
                    options: options.clone(),
                    view: render_result(&typed),
                    raw,
                };
                self.last = Some(submission.clone());
                self.transition(SubmissionState::Success, &mut observer);
                Ok(submission)
            }
            Err(e) => {
                self.transition(SubmissionState::Failed, &mut observer);
                Err(e)
            }
        };

        self.transition(SubmissionState::Idle, &mut observer);
        result
    }

    /// Submit again with the options stored for `domain` in history.
    pub async fn rerun_from_history(&mut self, domain: &str) -> Result<Submission, DnsIntelError> {
        self.rerun_from_history_observed(domain, |_| {}).await
    }

    pub async fn rerun_from_history_observed<F>(
        &mut self,
        domain: &str,
        observer: F,
    ) -> Result<Submission, DnsIntelError>
    where
        F: FnMut(SubmissionState),
    {
        let entry = self
            .history
            .get(domain)
            .ok_or_else(|| DnsIntelError::invalid_domain(domain, "No history entry for this domain"))?;

        self.submit_observed(&entry.domain, &entry.options, observer).await
    }

    /// The most recent successful submission.
    pub fn last_result(&self) -> Option<&Submission> {
        self.last.as_ref()
    }

    /// Pretty JSON of the most recent result.
    pub fn export_json(&self) -> Result<String, DnsIntelError> {
        self.last
            .as_ref()
            .map(|submission| export_json(&submission.raw))
            .ok_or(DnsIntelError::NoResult)
    }

    /// Navigate back. A `Clear` effect also hides the current result.
    pub fn back(&mut self) -> Option<NavigationEffect> {
        let effect = self.location.back();
        self.apply_navigation(effect.as_ref());
        effect
    }

    pub fn forward(&mut self) -> Option<NavigationEffect> {
        let effect = self.location.forward();
        self.apply_navigation(effect.as_ref());
        effect
    }

    fn apply_navigation(&mut self, effect: Option<&NavigationEffect>) {
        if let Some(NavigationEffect::Clear) = effect {
            self.last = None;
        }
    }

    fn transition<F: FnMut(SubmissionState)>(&mut self, state: SubmissionState, observer: &mut F) {
        self.state = state;
        observer(state);
    }
}
