//! Due-date classification.
//!
//! One signed delta (`due - today`, whole days) feeds two independent pure
//! policies:
//! - [`display_band`]: continuous urgency tiers for the table view, with
//!   inclusive upper bounds (15 days is still `DueWithin15`).
//! - [`is_notification_due`]: fires on overdue records and on exact
//!   threshold milestones only, so a daily run alerts once per milestone
//!   instead of every day inside a range.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::config::ThresholdSet;
use crate::constants::classify::{BAND_MONTH_DAYS, BAND_URGENT_DAYS};
use crate::data::{ClassifiedRecord, ClientRecord, DisplayBand, DisplayRow};

/// Which records the notifier reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NotifyPolicy {
    /// Overdue records plus exact threshold milestones.
    #[default]
    Milestones,
    /// Overdue records only.
    OnlyExpired,
}

/// Signed whole days from `today` to `due`; negative means overdue.
pub fn days_until_due(today: NaiveDate, due: NaiveDate) -> i64 {
    due.signed_duration_since(today).num_days()
}

/// Urgency band for an optional delta.
pub fn display_band(days_until_due: Option<i64>) -> DisplayBand {
    match days_until_due {
        None => DisplayBand::Undated,
        Some(days) if days < 0 => DisplayBand::Overdue,
        Some(days) if days <= BAND_URGENT_DAYS => DisplayBand::DueWithin15,
        Some(days) if days <= BAND_MONTH_DAYS => DisplayBand::DueWithin30,
        Some(_) => DisplayBand::FarFuture,
    }
}

/// Notification eligibility for a delta.
pub fn is_notification_due(days_until_due: i64, thresholds: &ThresholdSet, policy: NotifyPolicy) -> bool {
    if days_until_due < 0 {
        return true;
    }
    match policy {
        NotifyPolicy::Milestones => thresholds.contains(days_until_due),
        NotifyPolicy::OnlyExpired => false,
    }
}

/// Records split by whether their due date parses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    /// Dated records, ascending by delta then company.
    pub dated: Vec<ClassifiedRecord>,
    /// Undated or malformed records, by company.
    pub undated: Vec<ClientRecord>,
}

/// Classifier bound to a fixed "today".
#[derive(Clone, Debug)]
pub struct DueClassifier {
    today: NaiveDate,
    thresholds: ThresholdSet,
    policy: NotifyPolicy,
}

impl DueClassifier {
    /// Classifier for `today` with the default policy.
    pub fn new(today: NaiveDate, thresholds: ThresholdSet) -> Self {
        Self {
            today,
            thresholds,
            policy: NotifyPolicy::default(),
        }
    }

    /// Switch the notification policy.
    pub fn with_policy(mut self, policy: NotifyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reference date for every delta.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Active notification policy.
    pub fn policy(&self) -> NotifyPolicy {
        self.policy
    }

    /// Compute deltas and sort; undated records are set aside.
    pub fn classify(&self, records: &[ClientRecord]) -> Classification {
        let mut classification = Classification::default();
        for record in records {
            match record.due_date() {
                Some(due_date) => classification.dated.push(ClassifiedRecord {
                    record: record.clone(),
                    due_date,
                    days_until_due: days_until_due(self.today, due_date),
                }),
                None => classification.undated.push(record.clone()),
            }
        }
        classification.dated.sort_by(compare_classified);
        classification
            .undated
            .sort_by(|a, b| a.company.cmp(&b.company));
        classification
    }

    /// Display band for a classified record.
    pub fn band(&self, record: &ClassifiedRecord) -> DisplayBand {
        display_band(Some(record.days_until_due))
    }

    /// True when the record should appear in the notification.
    pub fn is_eligible(&self, record: &ClassifiedRecord) -> bool {
        is_notification_due(record.days_until_due, &self.thresholds, self.policy)
    }

    /// Notification-eligible records, ascending by delta.
    pub fn notification_candidates(&self, records: &[ClientRecord]) -> Vec<ClassifiedRecord> {
        self.classify(records)
            .dated
            .into_iter()
            .filter(|record| self.is_eligible(record))
            .collect()
    }

    /// Rows for the banded table: dated rows by delta, undated rows last.
    pub fn display_rows(&self, records: &[ClientRecord]) -> Vec<DisplayRow> {
        let classification = self.classify(records);
        let dated = classification.dated.into_iter().map(|classified| DisplayRow {
            band: self.band(&classified),
            days_until_due: Some(classified.days_until_due),
            record: classified.record,
        });
        let undated = classification.undated.into_iter().map(|record| DisplayRow {
            record,
            days_until_due: None,
            band: DisplayBand::Undated,
        });
        dated.chain(undated).collect()
    }
}

fn compare_classified(a: &ClassifiedRecord, b: &ClassifiedRecord) -> Ordering {
    a.days_until_due
        .cmp(&b.days_until_due)
        .then_with(|| a.record.company.cmp(&b.record.company))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn offset(days: i64) -> String {
        (today() + chrono::Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    #[test]
    fn band_boundaries_are_inclusive() {
        assert_eq!(display_band(Some(-1)), DisplayBand::Overdue);
        assert_eq!(display_band(Some(0)), DisplayBand::DueWithin15);
        assert_eq!(display_band(Some(15)), DisplayBand::DueWithin15);
        assert_eq!(display_band(Some(16)), DisplayBand::DueWithin30);
        assert_eq!(display_band(Some(30)), DisplayBand::DueWithin30);
        assert_eq!(display_band(Some(31)), DisplayBand::FarFuture);
        assert_eq!(display_band(None), DisplayBand::Undated);
    }

    #[test]
    fn eligibility_uses_exact_milestones() {
        let thresholds = ThresholdSet::default();
        let policy = NotifyPolicy::Milestones;
        assert!(is_notification_due(-5, &thresholds, policy));
        assert!(is_notification_due(-5, &ThresholdSet::new([1]).unwrap(), policy));
        assert!(!is_notification_due(20, &thresholds, policy));
        assert!(is_notification_due(15, &thresholds, policy));
        assert!(is_notification_due(30, &thresholds, policy));
        assert!(is_notification_due(5, &thresholds, policy));
        assert!(!is_notification_due(0, &thresholds, policy));
        assert!(!is_notification_due(14, &thresholds, policy));
    }

    #[test]
    fn only_expired_policy_ignores_milestones() {
        let thresholds = ThresholdSet::default();
        assert!(is_notification_due(-1, &thresholds, NotifyPolicy::OnlyExpired));
        assert!(!is_notification_due(15, &thresholds, NotifyPolicy::OnlyExpired));
    }

    #[test]
    fn delta_counts_whole_calendar_days() {
        let due = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(days_until_due(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(), due), 2);
        assert_eq!(days_until_due(due, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()), -2);
        assert_eq!(days_until_due(due, due), 0);
    }

    #[test]
    fn classify_sorts_and_sets_aside_undated() {
        let records = vec![
            ClientRecord::new("Zulu", offset(40)),
            ClientRecord::new("Beta", ""),
            ClientRecord::new("Alpha", offset(-3)),
            ClientRecord::new("Aardvark", "garbage"),
            ClientRecord::new("Mike", offset(15)),
            ClientRecord::new("Kilo", offset(15)),
        ];
        let classifier = DueClassifier::new(today(), ThresholdSet::default());
        let classification = classifier.classify(&records);

        let order: Vec<(&str, i64)> = classification
            .dated
            .iter()
            .map(|c| (c.record.company.as_str(), c.days_until_due))
            .collect();
        assert_eq!(order, vec![("Alpha", -3), ("Kilo", 15), ("Mike", 15), ("Zulu", 40)]);
        let undated: Vec<&str> = classification.undated.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(undated, vec!["Aardvark", "Beta"]);

        let candidates = classifier.notification_candidates(&records);
        let names: Vec<&str> = candidates.iter().map(|c| c.record.company.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Kilo", "Mike"]);
    }

    #[test]
    fn display_rows_place_undated_last() {
        let records = vec![
            ClientRecord::new("Undated", ""),
            ClientRecord::new("Far", offset(90)),
            ClientRecord::new("Late", offset(-1)),
            ClientRecord::new("Soon", offset(20)),
        ];
        let rows = DueClassifier::new(today(), ThresholdSet::default()).display_rows(&records);
        let bands: Vec<DisplayBand> = rows.iter().map(|row| row.band).collect();
        assert_eq!(
            bands,
            vec![
                DisplayBand::Overdue,
                DisplayBand::DueWithin30,
                DisplayBand::FarFuture,
                DisplayBand::Undated,
            ]
        );
        assert_eq!(rows[3].days_until_due, None);
    }
}
