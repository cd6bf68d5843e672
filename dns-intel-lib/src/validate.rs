//! Domain input normalization and validation.
//!
//! Input arrives as free text (often pasted URLs), so validation first
//! normalizes it and then applies a fixed sequence of rules. The first rule
//! that fails decides the message.

use crate::error::DnsIntelError;
use crate::types::ValidationResult;
use regex::Regex;
use std::sync::OnceLock;

/// Quiet period used for as-you-type validation.
pub const VALIDATION_DEBOUNCE_MS: u64 = 300;

const MIN_DOMAIN_LENGTH: usize = 4;
const MAX_DOMAIN_LENGTH: usize = 253;

/// Letters accepted in internationalized labels, besides ASCII.
const UNICODE_LETTERS: &str = r"\x{00A0}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFEF}";

fn allowed_chars_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^[a-zA-Z0-9{}.\-]+$", UNICODE_LETTERS))
            .expect("character class pattern is valid")
    })
}

fn domain_grammar_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let label = format!("a-zA-Z0-9{}", UNICODE_LETTERS);
        Regex::new(&format!(
            r"^([{l}\-_]{{1,63}}\.)*[{l}][{l}\-_]{{0,61}}[{l}]\.[a-zA-Z]{{2,63}}$",
            l = label
        ))
        .expect("domain grammar pattern is valid")
    })
}

/// Normalize raw input: lowercase, no scheme, no `www.`, no path or port.
pub fn normalize_domain(input: &str) -> String {
    let mut cleaned = input.trim().to_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = cleaned.strip_prefix(scheme) {
            cleaned = rest.to_string();
            break;
        }
    }
    if let Some(rest) = cleaned.strip_prefix("ftp://") {
        cleaned = rest.to_string();
    }
    if let Some(rest) = cleaned.strip_prefix("www.") {
        cleaned = rest.to_string();
    }

    let cleaned = cleaned.split('/').next().unwrap_or_default();
    cleaned.split(':').next().unwrap_or_default().to_string()
}

/// Validate a free-text domain.
///
/// Empty or whitespace-only input is reported as valid with an empty
/// `cleaned` value, so callers can tell "nothing entered" from "invalid".
///
/// # Example
///
/// ```rust
/// use dns_intel_lib::validate_domain;
///
/// let result = validate_domain("https://WWW.Example.com/about");
/// assert!(result.valid);
/// assert_eq!(result.cleaned, "example.com");
/// ```
pub fn validate_domain(input: &str) -> ValidationResult {
    if input.trim().is_empty() {
        return ValidationResult::neutral();
    }

    let cleaned = normalize_domain(input);
    // Counted in UTF-16 code units, as browsers measure input length
    let length = cleaned.encode_utf16().count();

    if cleaned.contains(' ') {
        return ValidationResult::rejected("Domain cannot contain spaces", cleaned);
    }

    if length < MIN_DOMAIN_LENGTH {
        return ValidationResult::rejected("Domain is too short (minimum 4 characters)", cleaned);
    }

    if length > MAX_DOMAIN_LENGTH {
        return ValidationResult::rejected("Domain is too long (maximum 253 characters)", cleaned);
    }

    if !allowed_chars_regex().is_match(&cleaned) {
        return ValidationResult::rejected("Domain contains invalid characters", cleaned);
    }

    if cleaned.contains("..") {
        return ValidationResult::rejected("Domain cannot have consecutive dots", cleaned);
    }

    if cleaned.starts_with(['.', '-']) || cleaned.ends_with(['.', '-']) {
        return ValidationResult::rejected(
            "Domain cannot start or end with dots or hyphens",
            cleaned,
        );
    }

    if !domain_grammar_regex().is_match(&cleaned) {
        return ValidationResult::rejected("Invalid domain format", cleaned);
    }

    ValidationResult::ok(cleaned)
}

/// Validate input at submit time and return the cleaned domain.
///
/// Unlike [`validate_domain`], empty input is an error here: a submission
/// needs something to look up.
pub fn require_domain(input: &str) -> Result<String, DnsIntelError> {
    let validation = validate_domain(input);

    if !validation.valid {
        return Err(DnsIntelError::invalid_domain(
            validation.cleaned,
            validation.message,
        ));
    }

    if validation.cleaned.is_empty() {
        return Err(DnsIntelError::invalid_domain("", "Please enter a domain name"));
    }

    Ok(validation.cleaned)
}
