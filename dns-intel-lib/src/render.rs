//! Mapping from API results to display-ready view models.
//!
//! Everything here is pure: the CLI decides how to draw a [`ResultView`],
//! this module only decides what is in it.

use crate::types::{
    Certificate, DnsRecords, EmailSecurity, LookupResult, PropagationResult, RecordType,
};

/// Number of TXT records shown before the rest are summarized.
pub const TXT_PREVIEW_LIMIT: usize = 3;

const NOT_AVAILABLE: &str = "N/A";

/// How close a certificate is to expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirySeverity {
    /// More than 30 days left
    Nominal,
    /// 8 to 30 days left
    Warning,
    /// 7 days or fewer, or unknown
    Critical,
}

impl ExpirySeverity {
    pub fn from_days(days: Option<i64>) -> Self {
        match days {
            Some(d) if d > 30 => ExpirySeverity::Nominal,
            Some(d) if d > 7 => ExpirySeverity::Warning,
            _ => ExpirySeverity::Critical,
        }
    }
}

/// A fully rendered lookup result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub domain: String,
    pub email_security: Option<EmailSecurityView>,
    pub records: Vec<RecordSection>,
    pub ssl: Option<SslView>,
    pub propagation: Vec<PropagationRow>,
}

impl ResultView {
    /// True when the result has nothing to show besides the domain.
    pub fn is_empty(&self) -> bool {
        self.email_security.is_none()
            && self.records.is_empty()
            && self.ssl.is_none()
            && self.propagation.is_empty()
    }
}

/// Records of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSection {
    pub record_type: RecordType,
    pub title: &'static str,
    pub rows: Vec<RecordRow>,
    /// Records not shown in `rows`
    pub more: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub value: String,
    /// Secondary detail such as "TTL: 300s" or "Priority: 10"
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailSecurityView {
    pub score: Option<f64>,
    pub spf_valid: bool,
    pub dmarc_policy: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SslView {
    pub common_name: String,
    pub issuer: String,
    pub valid_to: String,
    pub days_until_expiry: Option<i64>,
    pub severity: ExpirySeverity,
    /// Present only when the certificate has an expiry date
    pub reminder: Option<ReminderDescriptor>,
}

/// What a calendar reminder needs to know about a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDescriptor {
    pub domain: String,
    pub expiry: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropagationRow {
    pub record_type: String,
    pub consistency_percentage: f64,
    pub propagated: bool,
}

/// Build the view model for one lookup result.
pub fn render_result(result: &LookupResult) -> ResultView {
    let enrichment = result.lookup_result.enrichment.as_ref();

    ResultView {
        domain: result.domain.clone(),
        email_security: enrichment
            .and_then(|e| e.email_security.as_ref())
            .map(render_email_security),
        records: result
            .lookup_result
            .records
            .as_ref()
            .map(render_records)
            .unwrap_or_default(),
        ssl: enrichment
            .and_then(|e| e.ssl.as_ref())
            .and_then(|ssl| ssl.certificate.as_ref())
            .map(render_certificate),
        propagation: result
            .propagation_results
            .as_deref()
            .map(render_propagation)
            .unwrap_or_default(),
    }
}

fn render_email_security(security: &EmailSecurity) -> EmailSecurityView {
    EmailSecurityView {
        score: security.score,
        spf_valid: security.spf.as_ref().is_some_and(|spf| spf.is_valid),
        dmarc_policy: security
            .dmarc
            .as_ref()
            .and_then(|d| d.policy.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "Not configured".to_string()),
        provider: security
            .mx
            .as_ref()
            .and_then(|mx| mx.provider.as_ref())
            .and_then(|p| p.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
    }
}

fn render_records(records: &DnsRecords) -> Vec<RecordSection> {
    let mut sections = Vec::new();

    let ttl = |ttl: Option<u64>| ttl.filter(|t| *t > 0).map(|t| format!("TTL: {}s", t));

    if !records.a.is_empty() {
        sections.push(RecordSection {
            record_type: RecordType::A,
            title: "A Records (IPv4)",
            rows: records
                .a
                .iter()
                .map(|r| RecordRow {
                    value: r.address.clone(),
                    detail: ttl(r.ttl),
                })
                .collect(),
            more: 0,
        });
    }

    if !records.aaaa.is_empty() {
        sections.push(RecordSection {
            record_type: RecordType::Aaaa,
            title: "AAAA Records (IPv6)",
            rows: records
                .aaaa
                .iter()
                .map(|r| RecordRow {
                    value: r.address.clone(),
                    detail: ttl(r.ttl),
                })
                .collect(),
            more: 0,
        });
    }

    if !records.mx.is_empty() {
        sections.push(RecordSection {
            record_type: RecordType::Mx,
            title: "MX Records (Mail Servers)",
            rows: records
                .mx
                .iter()
                .map(|r| RecordRow {
                    value: r.exchange.clone(),
                    detail: r.priority.map(|p| format!("Priority: {}", p)),
                })
                .collect(),
            more: 0,
        });
    }

    if !records.ns.is_empty() {
        sections.push(RecordSection {
            record_type: RecordType::Ns,
            title: "NS Records (Name Servers)",
            rows: records
                .ns
                .iter()
                .map(|r| RecordRow {
                    value: r.value.clone(),
                    detail: None,
                })
                .collect(),
            more: 0,
        });
    }

    if !records.txt.is_empty() {
        sections.push(RecordSection {
            record_type: RecordType::Txt,
            title: "TXT Records",
            rows: records
                .txt
                .iter()
                .take(TXT_PREVIEW_LIMIT)
                .map(|r| RecordRow {
                    value: r.entries.join(" "),
                    detail: None,
                })
                .collect(),
            more: records.txt.len().saturating_sub(TXT_PREVIEW_LIMIT),
        });
    }

    sections
}

fn render_certificate(certificate: &Certificate) -> SslView {
    let subject_cn = certificate
        .subject
        .as_ref()
        .and_then(|s| s.common_name.clone())
        .filter(|cn| !cn.is_empty());

    let issuer = certificate.issuer.as_ref().and_then(|issuer| {
        issuer
            .organization
            .clone()
            .filter(|o| !o.is_empty())
            .or_else(|| issuer.common_name.clone().filter(|cn| !cn.is_empty()))
    });

    let valid_to = certificate.valid_to.clone().filter(|v| !v.is_empty());

    SslView {
        common_name: subject_cn.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        issuer: issuer.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        valid_to: valid_to.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        days_until_expiry: certificate.days_until_expiry,
        severity: ExpirySeverity::from_days(certificate.days_until_expiry),
        reminder: valid_to.map(|expiry| ReminderDescriptor {
            domain: subject_cn.unwrap_or_else(|| "Unknown domain".to_string()),
            expiry,
        }),
    }
}

fn render_propagation(results: &[PropagationResult]) -> Vec<PropagationRow> {
    results
        .iter()
        .map(|r| PropagationRow {
            record_type: r.record_type.clone(),
            consistency_percentage: r.consistency_percentage.unwrap_or(0.0),
            propagated: r.is_propagated,
        })
        .collect()
}
