//! Notification composition and delivery.

use std::time::Duration;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use tracing::{debug, info};

use crate::config::MailSettings;
use crate::constants::notify::{LINE_SEPARATOR, NOTHING_DUE_MESSAGE, STATUS_OVERDUE};
use crate::data::ClassifiedRecord;
use crate::dates::format_display;
use crate::errors::WatchError;

/// SMTP reply code for rejected credentials.
const SMTP_AUTH_FAILED: &str = "535";
/// Submission port that negotiates TLS with STARTTLS instead of wrapping it.
const STARTTLS_PORT: u16 = 587;

/// Composed summary, ready for any transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Mail subject with the overdue and upcoming counts.
    pub subject: String,
    /// One line per selected record, or the nothing-due sentence.
    pub body: String,
    /// Number of overdue lines in `body`.
    pub overdue: usize,
    /// Number of milestone lines in `body`.
    pub upcoming: usize,
}

impl Notification {
    /// True when nothing is overdue or upcoming.
    pub fn is_empty(&self) -> bool {
        self.overdue == 0 && self.upcoming == 0
    }
}

/// `overdue` for negative deltas, `due in N day(s)` otherwise.
pub fn status_phrase(days_until_due: i64) -> String {
    match days_until_due {
        days if days < 0 => STATUS_OVERDUE.to_string(),
        1 => "due in 1 day".to_string(),
        days => format!("due in {days} days"),
    }
}

/// One body line: `<company> | <DD/MM/YYYY> | <status>`.
pub fn render_line(record: &ClassifiedRecord) -> String {
    [
        record.record.company.as_str(),
        format_display(record.due_date).as_str(),
        status_phrase(record.days_until_due).as_str(),
    ]
    .join(LINE_SEPARATOR)
}

/// Build the summary for the eligible records.
///
/// Output depends only on the inputs: records are re-sorted by delta then
/// company, so callers may pass them in any order.
pub fn compose(eligible: &[ClassifiedRecord], sender: &str) -> Notification {
    let mut sorted: Vec<&ClassifiedRecord> = eligible.iter().collect();
    sorted.sort_by(|a, b| {
        a.days_until_due
            .cmp(&b.days_until_due)
            .then_with(|| a.record.company.cmp(&b.record.company))
    });

    let overdue = sorted.iter().filter(|record| record.is_overdue()).count();
    let upcoming = sorted.len() - overdue;

    let (subject, body) = if sorted.is_empty() {
        (
            format!("{sender}: license expiration summary - nothing due"),
            NOTHING_DUE_MESSAGE.to_string(),
        )
    } else {
        let lines: Vec<String> = sorted.iter().map(|record| render_line(record)).collect();
        (
            format!("{sender}: license expiration summary - {overdue} overdue, {upcoming} upcoming"),
            lines.join("\n"),
        )
    };

    Notification {
        subject,
        body,
        overdue,
        upcoming,
    }
}

/// Outbound delivery of a composed notification.
pub trait MailTransport {
    /// Deliver one notification.
    fn send(&self, notification: &Notification) -> Result<(), WatchError>;
}

/// SMTP delivery through an authenticated relay.
pub struct SmtpMailer {
    settings: MailSettings,
    timeout: Duration,
}

impl SmtpMailer {
    /// Mailer that gives up on the relay after `timeout`.
    pub fn new(settings: MailSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }

    /// Settings this mailer sends with.
    pub fn settings(&self) -> &MailSettings {
        &self.settings
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, WatchError> {
        let from = Mailbox::new(
            Some(self.settings.from_name.clone()),
            parse_address(&self.settings.smtp_email)?,
        );
        let to = Mailbox::new(None, parse_address(&self.settings.recipient)?);
        Message::builder()
            .from(from)
            .to(to)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|err| WatchError::InvalidInput(format!("cannot build message: {err}")))
    }

    fn transport(&self) -> Result<SmtpTransport, WatchError> {
        let builder = if self.settings.port == STARTTLS_PORT {
            SmtpTransport::starttls_relay(&self.settings.host)
        } else {
            SmtpTransport::relay(&self.settings.host)
        }
        .map_err(|err| WatchError::Transport(format!("smtp relay {}: {err}", self.settings.host)))?;
        Ok(builder
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.smtp_email.clone(),
                self.settings.app_password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, notification: &Notification) -> Result<(), WatchError> {
        let message = self.build_message(notification)?;
        let transport = self.transport()?;
        debug!(
            "[license-watch:mail] sending via {}:{}",
            self.settings.host, self.settings.port
        );
        transport.send(&message).map_err(classify_smtp_error)?;
        info!(
            "[license-watch:mail] notification sent to {}",
            self.settings.recipient
        );
        Ok(())
    }
}

fn parse_address(value: &str) -> Result<Address, WatchError> {
    value
        .parse::<Address>()
        .map_err(|err| WatchError::InvalidInput(format!("'{value}' is not a valid email address: {err}")))
}

fn classify_smtp_error(err: lettre::transport::smtp::Error) -> WatchError {
    let code = err.status().map(|code| code.to_string());
    if code.as_deref() == Some(SMTP_AUTH_FAILED) {
        return WatchError::Auth { status: 535 };
    }
    WatchError::Transport(format!("smtp delivery failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ClientRecord;
    use chrono::NaiveDate;

    fn classified(company: &str, due: (i32, u32, u32), days: i64) -> ClassifiedRecord {
        let due_date = NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap();
        ClassifiedRecord {
            record: ClientRecord::new(company, due_date.format("%Y-%m-%d").to_string()),
            due_date,
            days_until_due: days,
        }
    }

    #[test]
    fn status_phrases() {
        assert_eq!(status_phrase(-3), "overdue");
        assert_eq!(status_phrase(0), "due in 0 days");
        assert_eq!(status_phrase(1), "due in 1 day");
        assert_eq!(status_phrase(15), "due in 15 days");
    }

    #[test]
    fn empty_list_uses_fixed_sentence() {
        let notification = compose(&[], "Acme Ops");
        assert_eq!(notification.body, NOTHING_DUE_MESSAGE);
        assert_eq!(notification.subject, "Acme Ops: license expiration summary - nothing due");
        assert!(notification.is_empty());
    }

    #[test]
    fn lines_are_sorted_and_counted() {
        let eligible = vec![
            classified("Zeta", (2024, 1, 16), 15),
            classified("Acme", (2020, 1, 1), -1461),
            classified("Beta", (2024, 1, 16), 15),
        ];
        let notification = compose(&eligible, "Ops");
        assert_eq!(
            notification.body,
            "Acme | 01/01/2020 | overdue\n\
             Beta | 16/01/2024 | due in 15 days\n\
             Zeta | 16/01/2024 | due in 15 days"
        );
        assert_eq!(notification.subject, "Ops: license expiration summary - 1 overdue, 2 upcoming");
        assert_eq!((notification.overdue, notification.upcoming), (1, 2));
    }

    #[test]
    fn composition_ignores_input_order() {
        let a = classified("A", (2024, 1, 6), 5);
        let b = classified("B", (2023, 12, 1), -31);
        assert_eq!(
            compose(&[a.clone(), b.clone()], "x"),
            compose(&[b, a], "x")
        );
    }

    #[test]
    fn message_carries_sender_name_and_recipient() {
        let mailer = SmtpMailer::new(
            MailSettings {
                smtp_email: "bot@example.com".into(),
                app_password: "secret".into(),
                recipient: "owner@example.com".into(),
                from_name: "License Desk".into(),
                host: "smtp.example.com".into(),
                port: 465,
            },
            Duration::from_secs(5),
        );
        let message = mailer.build_message(&compose(&[], "License Desk")).unwrap();
        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("License Desk"));
        assert!(rendered.contains("<bot@example.com>"));
        assert!(rendered.contains("owner@example.com"));
        assert!(rendered.contains("Subject: License Desk: license expiration summary - nothing due"));
    }
}
