use std::sync::Arc;

use chrono::NaiveDate;

use license_watch::classify::DueClassifier;
use license_watch::config::ThresholdSet;
use license_watch::notify::compose;
use license_watch::parser::parse_records;
use license_watch::source::{FileSourceProvider, InMemoryProvider, ProviderKind, SourceResolver};
use license_watch::{ClientRecord, DisplayBand, WatchError};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[test]
fn overdue_record_reaches_the_summary_and_undated_is_kept() {
    let records = parse_records("empresa,vencimento\nAcme,01/01/2020\nZed,\n").unwrap();
    assert_eq!(
        records,
        vec![ClientRecord::new("Acme", "01/01/2020"), ClientRecord::new("Zed", "")]
    );

    let classifier = DueClassifier::new(today(), ThresholdSet::default());
    let classification = classifier.classify(&records);
    assert_eq!(classification.undated, vec![ClientRecord::new("Zed", "")]);

    let eligible = classifier.notification_candidates(&records);
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].record.company, "Acme");
    assert!(eligible[0].days_until_due < 0);

    let notification = compose(&eligible, "License Watch");
    assert!(notification.body.lines().any(|line| line == "Acme | 01/01/2020 | overdue"));
    assert!(!notification.body.contains("Zed"));
}

#[test]
fn milestones_fire_only_on_exact_day_counts() {
    let text = "company;due_date\nThirty;2024-01-31\nTwenty;2024-01-21\nFifteen;16/01/2024\nFive;06/01/2024\nToday;2024-01-01\n";
    let records = parse_records(text).unwrap();
    let classifier = DueClassifier::new(today(), ThresholdSet::default());

    let names: Vec<String> = classifier
        .notification_candidates(&records)
        .into_iter()
        .map(|record| record.record.company)
        .collect();
    assert_eq!(names, vec!["Five", "Fifteen", "Thirty"]);

    let bands: Vec<(String, DisplayBand)> = classifier
        .display_rows(&records)
        .into_iter()
        .map(|row| (row.record.company, row.band))
        .collect();
    assert_eq!(
        bands,
        vec![
            ("Today".to_string(), DisplayBand::DueWithin15),
            ("Five".to_string(), DisplayBand::DueWithin15),
            ("Fifteen".to_string(), DisplayBand::DueWithin15),
            ("Twenty".to_string(), DisplayBand::DueWithin30),
            ("Thirty".to_string(), DisplayBand::DueWithin30),
        ]
    );
}

#[test]
fn resolver_falls_back_to_the_local_file() {
    let temp = tempfile::tempdir().unwrap();
    let local = temp.path().join("clientes.csv");
    std::fs::write(&local, "empresa,vencimento\nAcme,2025-06-30\n").unwrap();

    let resolver = SourceResolver::new()
        .with_provider(InMemoryProvider::failing(ProviderKind::Remote, "github:acme/licenses", "HTTP 401"))
        .with_provider(FileSourceProvider::secret(temp.path().join("missing.csv")))
        .with_provider(FileSourceProvider::local(&local));

    let resolved = resolver.resolve().unwrap();
    assert_eq!(resolved.source.kind, ProviderKind::Local);
    assert_eq!(resolved.records, vec![ClientRecord::new("Acme", "2025-06-30")]);
    let skipped: Vec<ProviderKind> = resolved.skipped.iter().map(|failure| failure.provider).collect();
    assert_eq!(skipped, vec![ProviderKind::Remote, ProviderKind::Secret]);
}

#[test]
fn empty_secret_file_short_circuits_the_chain() {
    let temp = tempfile::tempdir().unwrap();
    let secret = temp.path().join("secret.csv");
    std::fs::write(&secret, "empresa,vencimento\n").unwrap();
    let local = Arc::new(InMemoryProvider::new(
        ProviderKind::Local,
        "local",
        vec![ClientRecord::new("Acme", "2025-01-01")],
    ));

    let resolved = SourceResolver::new()
        .with_provider(InMemoryProvider::failing(ProviderKind::Remote, "github", "timeout"))
        .with_provider(FileSourceProvider::secret(&secret))
        .with_provider(local.clone())
        .resolve()
        .unwrap();
    assert!(resolved.records.is_empty());
    assert_eq!(resolved.source.kind, ProviderKind::Secret);
    assert_eq!(local.loads(), 0);
}

#[test]
fn exhausted_chain_reports_every_provider() {
    let temp = tempfile::tempdir().unwrap();
    let err = SourceResolver::new()
        .with_provider(InMemoryProvider::failing(ProviderKind::Remote, "github", "HTTP 404"))
        .with_provider(FileSourceProvider::secret(temp.path().join("a.csv")))
        .with_provider(FileSourceProvider::local(temp.path().join("b.csv")))
        .resolve()
        .unwrap_err();
    assert!(matches!(err, WatchError::AggregateSourceFailure(ref failures) if failures.len() == 3));
    let message = err.to_string();
    assert!(message.contains("[remote] github"));
    assert!(message.contains("[secret]"));
    assert!(message.contains("[local]"));
}
