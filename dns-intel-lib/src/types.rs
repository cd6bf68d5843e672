//! Core data types for DNS lookups.
//!
//! This module defines the lookup options sent to the analysis API, the
//! validation outcome for user input, persisted history entries, and the
//! (read-only) result shape returned by the API.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default per-attempt timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default number of additional attempts after the first failure.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// DNS record types the analysis API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Mx,
    Ns,
    Txt,
    Cname,
    Soa,
    Caa,
    Ptr,
    Srv,
}

impl RecordType {
    /// Every supported record type, in display order.
    pub const ALL: [RecordType; 10] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Mx,
        RecordType::Ns,
        RecordType::Txt,
        RecordType::Cname,
        RecordType::Soa,
        RecordType::Caa,
        RecordType::Ptr,
        RecordType::Srv,
    ];

    /// Upper-case wire name ("A", "AAAA", ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
            RecordType::Cname => "CNAME",
            RecordType::Soa => "SOA",
            RecordType::Caa => "CAA",
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        RecordType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("Unknown record type '{}'", s.trim()))
    }
}

/// Options controlling a single lookup.
///
/// Serialized in camelCase since these are persisted verbatim in the
/// history file. The numeric fields always carry a usable value: absent or
/// unparseable input falls back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupOptions {
    /// Record types to query, in selection order
    #[serde(default)]
    pub record_types: Vec<RecordType>,

    /// Check propagation across public resolvers
    #[serde(default)]
    pub check_propagation: bool,

    /// Perform reverse lookups for resolved addresses
    #[serde(default, rename = "reverseDNS")]
    pub reverse_dns: bool,

    /// Ask the API for email security / provider enrichment
    #[serde(default)]
    pub enrichment: bool,

    /// Inspect the TLS certificate served for the domain
    #[serde(default)]
    pub ssl_inspection: bool,

    /// Per-attempt timeout in milliseconds (> 0)
    #[serde(default = "default_timeout", deserialize_with = "de_timeout")]
    pub timeout: u64,

    /// Additional attempts after the first failure
    #[serde(default = "default_max_retries", deserialize_with = "de_max_retries")]
    pub max_retries: u32,

    /// Pause between attempts in milliseconds
    #[serde(default = "default_retry_delay", deserialize_with = "de_retry_delay")]
    pub retry_delay: u64,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            record_types: Vec::new(),
            check_propagation: false,
            reverse_dns: false,
            enrichment: false,
            ssl_inspection: false,
            timeout: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl LookupOptions {
    /// Set the record types to query, dropping duplicates but keeping order.
    pub fn with_record_types(mut self, types: Vec<RecordType>) -> Self {
        let mut unique = Vec::with_capacity(types.len());
        for t in types {
            if !unique.contains(&t) {
                unique.push(t);
            }
        }
        self.record_types = unique;
        self
    }

    /// Set the timeout from raw text, falling back to the default.
    pub fn with_timeout_text(mut self, raw: Option<&str>) -> Self {
        self.timeout = parse_timeout(raw);
        self
    }

    /// Set the retry count from raw text, falling back to the default.
    pub fn with_max_retries_text(mut self, raw: Option<&str>) -> Self {
        self.max_retries = parse_max_retries(raw);
        self
    }

    /// Set the retry delay from raw text, falling back to the default.
    pub fn with_retry_delay_text(mut self, raw: Option<&str>) -> Self {
        self.retry_delay = parse_retry_delay(raw);
        self
    }

    /// Number of enabled option groups, as shown next to history entries.
    pub fn options_count(&self) -> usize {
        [
            !self.record_types.is_empty(),
            self.check_propagation,
            self.reverse_dns,
            self.enrichment,
            self.ssl_inspection,
        ]
        .iter()
        .filter(|&&enabled| enabled)
        .count()
    }
}

/// Parse the leading integer of a string, the way form fields are read.
///
/// Leading whitespace and an optional sign are accepted; parsing stops at
/// the first non-digit. Returns `None` when no digits are found.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

pub(crate) fn parse_timeout(raw: Option<&str>) -> u64 {
    raw.and_then(parse_int_prefix)
        .filter(|v| *v > 0)
        .map(|v| v as u64)
        .unwrap_or(DEFAULT_TIMEOUT_MS)
}

pub(crate) fn parse_max_retries(raw: Option<&str>) -> u32 {
    raw.and_then(parse_int_prefix)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(DEFAULT_MAX_RETRIES)
}

pub(crate) fn parse_retry_delay(raw: Option<&str>) -> u64 {
    raw.and_then(parse_int_prefix)
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or(DEFAULT_RETRY_DELAY_MS)
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

/// Render a loosely-typed JSON scalar as text so it can go through the
/// same fallback parsing as user input.
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

fn de_timeout<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(parse_timeout(scalar_text(deserializer)?.as_deref()))
}

fn de_max_retries<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(parse_max_retries(scalar_text(deserializer)?.as_deref()))
}

fn de_retry_delay<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(parse_retry_delay(scalar_text(deserializer)?.as_deref()))
}

/// Outcome of validating free-text domain input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the input is acceptable (empty input counts as valid/neutral)
    pub valid: bool,

    /// Human-readable reason when invalid, empty otherwise
    pub message: String,

    /// Lowercased input stripped of scheme, `www.`, path and port
    pub cleaned: String,
}

impl ValidationResult {
    pub(crate) fn neutral() -> Self {
        Self {
            valid: true,
            message: String::new(),
            cleaned: String::new(),
        }
    }

    pub(crate) fn ok(cleaned: String) -> Self {
        Self {
            valid: true,
            message: String::new(),
            cleaned,
        }
    }

    pub(crate) fn rejected(message: &str, cleaned: String) -> Self {
        Self {
            valid: false,
            message: message.to_string(),
            cleaned,
        }
    }

    /// True when nothing was entered.
    pub fn is_empty(&self) -> bool {
        self.valid && self.cleaned.is_empty()
    }
}

/// A persisted history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainQuery {
    /// Normalized domain that was looked up
    pub domain: String,

    /// Options the lookup ran with
    #[serde(default)]
    pub options: LookupOptions,

    /// When the lookup succeeded
    pub timestamp: DateTime<Utc>,
}

/// JSON body POSTed to the analysis API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub domains: Vec<String>,
    pub record_types: Vec<RecordType>,
    pub check_propagation: bool,
    pub perform_reverse_lookup: bool,
    pub enable_enrichment: bool,
    pub enable_ssl_inspection: bool,
    pub timeout: u64,
    pub max_retries: u32,
    pub retry_delay: u64,
    pub include_metadata: bool,
}

impl LookupRequest {
    /// Build the request body for one domain.
    pub fn new(domain: &str, options: &LookupOptions) -> Self {
        Self {
            domains: vec![domain.to_string()],
            record_types: options.record_types.clone(),
            check_propagation: options.check_propagation,
            perform_reverse_lookup: options.reverse_dns,
            enable_enrichment: options.enrichment,
            enable_ssl_inspection: options.ssl_inspection,
            timeout: options.timeout,
            max_retries: options.max_retries,
            retry_delay: options.retry_delay,
            include_metadata: false,
        }
    }
}

// ── API result shape ─────────────────────────────────────────────────────────
//
// Only the fields the renderer reads are modelled; everything else in the
// payload is ignored here and kept in the raw JSON for export. Every field
// tolerates `null` and values of an unexpected type, which read as absent.

/// Read a field, treating `null` or a value of the wrong type as the default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Read a list, dropping entries that do not have the expected shape.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_opt_seq<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_array() {
        return Ok(None);
    }
    lenient_seq(value).map(Some).map_err(serde::de::Error::custom)
}

/// A number, also accepted as numeric text.
fn lenient_number(value: &serde_json::Value) -> Option<f64> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(lenient_number(&serde_json::Value::deserialize(deserializer)?))
}

/// Whole units; fractions are truncated toward zero.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(lenient_number(&serde_json::Value::deserialize(deserializer)?).map(|n| n.trunc() as i64))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(lenient_i64(deserializer)?.and_then(|n| u64::try_from(n).ok()))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient_i64(deserializer)?.and_then(|n| u32::try_from(n).ok()))
}

/// One entry of the API's `results` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    #[serde(default, deserialize_with = "lenient")]
    pub domain: String,

    #[serde(deserialize_with = "lenient")]
    pub lookup_result: LookupData,

    #[serde(default, deserialize_with = "lenient_opt_seq")]
    pub propagation_results: Option<Vec<PropagationResult>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LookupData {
    #[serde(default, deserialize_with = "lenient")]
    pub records: Option<DnsRecords>,

    #[serde(default, deserialize_with = "lenient")]
    pub enrichment: Option<Enrichment>,
}

/// Records grouped by type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DnsRecords {
    #[serde(rename = "A", default, deserialize_with = "lenient_seq")]
    pub a: Vec<AddressRecord>,

    #[serde(rename = "AAAA", default, deserialize_with = "lenient_seq")]
    pub aaaa: Vec<AddressRecord>,

    #[serde(rename = "MX", default, deserialize_with = "lenient_seq")]
    pub mx: Vec<MxRecord>,

    #[serde(rename = "NS", default, deserialize_with = "lenient_seq")]
    pub ns: Vec<NsRecord>,

    #[serde(rename = "TXT", default, deserialize_with = "lenient_seq")]
    pub txt: Vec<TxtRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AddressRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub address: String,

    #[serde(default, deserialize_with = "lenient_u64")]
    pub ttl: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MxRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub exchange: String,

    #[serde(default, deserialize_with = "lenient_u32")]
    pub priority: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NsRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TxtRecord {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(default, deserialize_with = "lenient")]
    pub email_security: Option<EmailSecurity>,

    #[serde(default, deserialize_with = "lenient")]
    pub ssl: Option<SslInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmailSecurity {
    /// 0 to 100; the API may send fractional scores
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,

    #[serde(default, deserialize_with = "lenient")]
    pub spf: Option<SpfInfo>,

    #[serde(default, deserialize_with = "lenient")]
    pub dmarc: Option<DmarcInfo>,

    #[serde(default, deserialize_with = "lenient")]
    pub mx: Option<MailExchangeInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpfInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub is_valid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DmarcInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MailExchangeInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub provider: Option<MailProvider>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MailProvider {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SslInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub certificate: Option<Certificate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    #[serde(default, deserialize_with = "lenient")]
    pub subject: Option<CertificateName>,

    #[serde(default, deserialize_with = "lenient")]
    pub issuer: Option<CertificateName>,

    #[serde(default, deserialize_with = "lenient")]
    pub valid_to: Option<String>,

    #[serde(default, deserialize_with = "lenient_i64")]
    pub days_until_expiry: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateName {
    #[serde(default, deserialize_with = "lenient")]
    pub common_name: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationResult {
    #[serde(default, deserialize_with = "lenient")]
    pub record_type: String,

    #[serde(default, deserialize_with = "lenient")]
    pub is_propagated: bool,

    /// Missing or non-numeric reads as 0
    #[serde(default, deserialize_with = "lenient_f64")]
    pub consistency_percentage: Option<f64>,
}
