//! Terminal display logic for the dns-intel CLI.
//!
//! This module draws lookup results, history listings, the progress spinner
//! and confirmation prompts. Uses only the `console` crate.

use console::{pad_str, style, Alignment, StyledObject, Term};
use dns_intel_lib::{
    format_elapsed, format_relative, DomainQuery, EmailSecurityView, ExpirySeverity,
    LoadingMessages, LookupOptions, PropagationRow, RecordSection, ResultView, SslView,
    MESSAGE_ROTATION_INTERVAL,
};
use chrono::{DateTime, Utc};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
///
/// Shows a rotating progress message and the seconds elapsed since start.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner for a lookup with the given options.
    ///
    /// Returns `None` when stderr is not a terminal.
    pub fn start(options: &LookupOptions) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let mut messages = LoadingMessages::for_options(options);

        let handle = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut last_rotation = started;
            let mut idx = 0usize;

            while running_clone.load(Ordering::Relaxed) {
                if last_rotation.elapsed() >= MESSAGE_ROTATION_INTERVAL {
                    messages.advance();
                    last_rotation = tokio::time::Instant::now();
                }

                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!(
                    "{} {} {}",
                    style(frame).cyan(),
                    messages.current(),
                    style(format_elapsed(started.elapsed())).dim(),
                ));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Ask the spinner to stop at its next frame without waiting for it.
    pub fn halt(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.halt();
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Results ──────────────────────────────────────────────────────────────────

/// Print a full lookup result.
pub fn print_result(view: &ResultView) {
    println!(
        "{} {}",
        style("Analysis Results").bold(),
        style(format!("[{}]", view.domain)).cyan(),
    );
    println!();

    if view.is_empty() {
        println!("  {}", style("No data returned for this domain").dim());
        return;
    }

    if let Some(email) = &view.email_security {
        print_email_security(email);
    }
    for section in &view.records {
        print_record_section(section);
    }
    if let Some(ssl) = &view.ssl {
        print_ssl(ssl);
    }
    if !view.propagation.is_empty() {
        print_propagation(&view.propagation);
    }
}

fn print_section_title(title: &str) {
    println!(
        "  {} {}",
        style(format!("── {} ", title)).yellow().bold(),
        style("─".repeat(50usize.saturating_sub(title.chars().count()))).yellow().dim(),
    );
}

fn print_field(label: &str, value: impl std::fmt::Display) {
    println!(
        "    {}  {}",
        style(pad_str(label, 18, Alignment::Left, None)).dim(),
        value
    );
}

fn print_email_security(email: &EmailSecurityView) {
    print_section_title("Email Security Analysis");
    print_field("Security Score", style(format_score(email.score)).bold());
    let spf = if email.spf_valid {
        style("✓ Valid").green()
    } else {
        style("✗ Invalid").red()
    };
    print_field("SPF Record", spf);
    print_field("DMARC Policy", &email.dmarc_policy);
    print_field("Email Provider", &email.provider);
    println!();
}

fn print_record_section(section: &RecordSection) {
    print_section_title(section.title);
    for row in &section.rows {
        let record_type = pad_str(section.record_type.as_str(), 5, Alignment::Left, None);
        match &row.detail {
            Some(detail) => println!(
                "    {} {}  {}",
                style(record_type).cyan().bold(),
                row.value,
                style(detail).dim()
            ),
            None => println!("    {} {}", style(record_type).cyan().bold(), row.value),
        }
    }
    if let Some(more) = format_more(section) {
        println!("    {}", style(more).dim());
    }
    println!();
}

fn print_ssl(ssl: &SslView) {
    print_section_title("SSL/TLS Certificate");
    print_field("Common Name", &ssl.common_name);
    print_field("Issuer", &ssl.issuer);
    print_field("Valid Until", &ssl.valid_to);
    print_field(
        "Days Until Expiry",
        severity_style(ssl.severity, format_days(ssl.days_until_expiry)),
    );
    if ssl.reminder.is_some() {
        println!(
            "    {}",
            style("Tip: add --reminder to save a renewal reminder (.ics)").dim()
        );
    }
    println!();
}

fn print_propagation(rows: &[PropagationRow]) {
    print_section_title("DNS Propagation Status");
    for row in rows {
        let line = format!("{} {}% consistent", if row.propagated { "✓" } else { "⚠" }, row.consistency_percentage);
        let status = if row.propagated {
            style(line).green()
        } else {
            style(line).yellow()
        };
        print_field(&format!("{} Record", row.record_type), status);
    }
    println!();
}

pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{}/100", score),
        None => "N/A".to_string(),
    }
}

pub fn format_days(days: Option<i64>) -> String {
    match days {
        Some(days) => format!("{} days", days),
        None => "N/A".to_string(),
    }
}

fn format_more(section: &RecordSection) -> Option<String> {
    (section.more > 0).then(|| format!("+{} more {} records", section.more, section.record_type))
}

fn severity_style(severity: ExpirySeverity, text: String) -> StyledObject<String> {
    match severity {
        ExpirySeverity::Nominal => style(text).green(),
        ExpirySeverity::Warning => style(text).yellow(),
        ExpirySeverity::Critical => style(text).red().bold(),
    }
}

// ── History ──────────────────────────────────────────────────────────────────

/// Print the lookup history, most recent first.
pub fn print_history(entries: &[DomainQuery], now: DateTime<Utc>) {
    if entries.is_empty() {
        println!("{}", style("No search history yet").dim());
        return;
    }

    println!(
        "{} {}",
        style("Search History").bold(),
        style(format!("({})", entries.len())).dim()
    );
    for entry in entries {
        println!("  {}", format_history_entry(entry, now));
    }
}

/// One history line: domain, relative time and the number of enabled options.
pub fn format_history_entry(entry: &DomainQuery, now: DateTime<Utc>) -> String {
    let padded = pad_str(&entry.domain, 32, Alignment::Left, Some(".."));
    let when = format_relative(entry.timestamp, now);
    let count = entry.options.options_count();

    if count > 0 {
        format!(
            "{}  {}  {}",
            style(padded).white(),
            style(pad_str(&when, 12, Alignment::Left, None)).dim(),
            style(format!("{} options", count)).cyan()
        )
    } else {
        format!("{}  {}", style(padded).white(), style(when).dim())
    }
}

// ── Prompts and messages ─────────────────────────────────────────────────────

/// Ask a yes/no question on stderr. Anything but "y"/"yes" declines.
///
/// Without a terminal there is nobody to ask, so the answer is no.
pub fn confirm(title: &str, message: &str) -> bool {
    let term = Term::stderr();
    if !term.is_term() {
        return false;
    }

    eprintln!("{}", style(title).yellow().bold());
    eprint!("{} [y/N] ", message);

    let mut input = String::new();
    if std::io::stdin().lock().read_line(&mut input).is_err() {
        return false;
    }
    is_affirmative(&input)
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dns_intel_lib::{RecordRow, RecordType};

    #[test]
    fn test_format_score_and_days() {
        assert_eq!(format_score(Some(85.0)), "85/100");
        assert_eq!(format_score(Some(85.5)), "85.5/100");
        assert_eq!(format_score(None), "N/A");
        assert_eq!(format_days(Some(12)), "12 days");
        assert_eq!(format_days(None), "N/A");
    }

    #[test]
    fn test_format_more() {
        let section = RecordSection {
            record_type: RecordType::Txt,
            title: "TXT Records",
            rows: vec![RecordRow {
                value: "v=spf1 -all".to_string(),
                detail: None,
            }],
            more: 4,
        };
        assert_eq!(format_more(&section).as_deref(), Some("+4 more TXT records"));

        let section = RecordSection { more: 0, ..section };
        assert_eq!(format_more(&section), None);
    }

    #[test]
    fn test_format_history_entry() {
        console::set_colors_enabled(false);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let entry = DomainQuery {
            domain: "example.com".to_string(),
            options: LookupOptions {
                enrichment: true,
                ssl_inspection: true,
                ..Default::default()
            },
            timestamp: now - chrono::Duration::minutes(5),
        };

        let line = format_history_entry(&entry, now);
        assert!(line.starts_with("example.com"));
        assert!(line.contains("5m ago"));
        assert!(line.contains("2 options"));

        let plain = DomainQuery {
            options: LookupOptions::default(),
            ..entry
        };
        assert!(!format_history_entry(&plain, now).contains("options"));
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
    }
}
