//! iCal reminders for certificate renewal.

use crate::error::DnsIntelError;
use crate::export::sanitize_file_component;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// The reminder event is placed this many days before expiry.
pub const REMINDER_LEAD_DAYS: i64 = 30;

/// Parse a certificate expiry date.
///
/// Accepts the OpenSSL style used by the API (`Jul 31 08:04:27 2026 GMT`)
/// as well as RFC 3339 and RFC 2822 timestamps.
pub fn parse_certificate_expiry(expiry: &str) -> Result<DateTime<Utc>, DnsIntelError> {
    let normalized = expiry.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, "%b %d %H:%M:%S %Y GMT") {
        return Ok(naive.and_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(&normalized) {
        return Ok(parsed.with_timezone(&Utc));
    }

    Err(DnsIntelError::ParseError {
        message: format!("Unrecognized certificate expiry date '{}'", expiry),
        content: Some(expiry.to_string()),
    })
}

/// Build an iCal reminder to renew the certificate for `domain`.
///
/// The all-day event lands 30 days before expiry, with an alarm a week
/// before the event.
pub fn certificate_reminder(domain: &str, expiry: &str) -> Result<String, DnsIntelError> {
    let expires_at = parse_certificate_expiry(expiry)?;
    let uid = format!(
        "ssl-cert-{}-{}@dnsintelligence.com",
        domain,
        uuid::Uuid::new_v4().simple()
    );

    Ok(build_reminder(domain, expires_at.date_naive(), Utc::now(), &uid))
}

/// File name for a reminder, e.g. `ssl-cert-reminder-example-com.ics`.
pub fn reminder_file_name(domain: &str) -> String {
    format!("ssl-cert-reminder-{}.ics", sanitize_file_component(domain))
}

fn build_reminder(domain: &str, expiry: NaiveDate, stamp: DateTime<Utc>, uid: &str) -> String {
    let event_date = (expiry - Duration::days(REMINDER_LEAD_DAYS)).format("%Y%m%d");
    let expiry_date = expiry.format("%Y%m%d");
    let domain_text = escape_ical_text(domain);

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//DNS Intelligence//SSL Certificate Reminder//EN\r\n\
         CALSCALE:GREGORIAN\r\n\
         METHOD:PUBLISH\r\n\
         BEGIN:VEVENT\r\n\
         DTSTART;VALUE=DATE:{event}\r\n\
         DTEND;VALUE=DATE:{event}\r\n\
         DTSTAMP:{stamp}\r\n\
         UID:{uid}\r\n\
         SUMMARY:SSL Certificate Renewal: {domain}\r\n\
         DESCRIPTION:Reminder: The SSL certificate for {domain} will expire on {expiry}. \
         Please renew the certificate before it expires.\r\n\
         STATUS:CONFIRMED\r\n\
         SEQUENCE:0\r\n\
         BEGIN:VALARM\r\n\
         TRIGGER:-P7D\r\n\
         ACTION:DISPLAY\r\n\
         DESCRIPTION:SSL certificate for {domain} expires in 7 days\r\n\
         END:VALARM\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n",
        event = event_date,
        stamp = stamp.format("%Y%m%dT%H%M%SZ"),
        uid = uid,
        domain = domain_text,
        expiry = expiry_date,
    )
}

fn escape_ical_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
        .replace('\r', "")
}
