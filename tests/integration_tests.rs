//! Integration tests for dividend-recon

use bigdecimal::BigDecimal;
use dividend_recon::utils::{CsvRecordSource, MemoryRecordSource};
use dividend_recon::{
    load_batch, reconcile, BreakCategory, ColumnMapping, Dimension, EventStatus, RawRecord,
    RecordBatch, RecordParser, ReconciliationConfig, ReconciliationEngine, ReconciliationError,
    Severity, SourceSystem,
};
use std::io::Write;
use std::str::FromStr;

/// Booking values shared by both exports
#[derive(Clone)]
struct Booking {
    key: &'static str,
    isin: &'static str,
    shares: &'static str,
    currency: &'static str,
    gross: &'static str,
    net: &'static str,
    tax: &'static str,
    fx: &'static str,
    ex_date: &'static str,
    pay_date: &'static str,
}

fn apple() -> Booking {
    Booking {
        key: "950123456",
        isin: "US0378331005",
        shares: "1500000",
        currency: "USD",
        gross: "375000",
        net: "318750",
        tax: "15",
        fx: "11.2345",
        ex_date: "2025-02-07",
        pay_date: "2025-02-13",
    }
}

fn samsung() -> Booking {
    Booking {
        key: "960789012",
        isin: "KR7005930003",
        shares: "30000000",
        currency: "USD",
        gross: "12300000",
        net: "10450000",
        tax: "15",
        fx: "11.2345",
        ex_date: "2025-03-28",
        pay_date: "2025-04-17",
    }
}

fn nestle() -> Booking {
    Booking {
        key: "970456789",
        isin: "CH0038863350",
        shares: "800000",
        currency: "CHF",
        gross: "2400000",
        net: "1560000",
        tax: "35",
        fx: "12.1000",
        ex_date: "2025-04-22",
        pay_date: "2025-04-24",
    }
}

fn nbim_row(row_id: &str, b: &Booking) -> RawRecord {
    RawRecord::new(row_id)
        .with_field("COAC_EVENT_KEY", b.key)
        .with_field("ISIN", b.isin)
        .with_field("ORGANISATION_NAME", "Issuer")
        .with_field("NOMINAL_BASIS", b.shares)
        .with_field("QUOTATION_CURRENCY", b.currency)
        .with_field("GROSS_AMOUNT_QUOTATION", b.gross)
        .with_field("NET_AMOUNT_QUOTATION", b.net)
        .with_field("WTHTAX_RATE", b.tax)
        .with_field("AVG_FX_RATE_QUOTATION_TO_PORTFOLIO", b.fx)
        .with_field("EXDATE", b.ex_date)
        .with_field("PAYMENT_DATE", b.pay_date)
}

fn custody_row(row_id: &str, b: &Booking) -> RawRecord {
    RawRecord::new(row_id)
        .with_field("COAC_EVENT_KEY", b.key)
        .with_field("ISIN", b.isin)
        .with_field("NOMINAL_BASIS", b.shares)
        .with_field("CURRENCIES", b.currency)
        .with_field("GROSS_AMOUNT", b.gross)
        .with_field("NET_AMOUNT_QC", b.net)
        .with_field("TAX_RATE", b.tax)
        .with_field("FX_RATE", b.fx)
        .with_field("EX_DATE", b.ex_date)
        .with_field("PAY_DATE", b.pay_date)
}

fn parse(internal: &[RawRecord], custodian: &[RawRecord]) -> (RecordBatch, RecordBatch) {
    (
        RecordParser::for_side(SourceSystem::Internal).parse_all(internal),
        RecordParser::for_side(SourceSystem::Custodian).parse_all(custodian),
    )
}

fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

#[test]
fn test_apple_event_perfect_reconciliation() {
    let (internal, custodian) = parse(&[nbim_row("n1", &apple())], &[custody_row("c1", &apple())]);

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.perfectly_matched, vec!["950123456"]);
    assert!(report.breaks.is_empty());
    assert!(report.is_complete());
    assert_eq!(
        report.event("950123456").unwrap().status,
        EventStatus::PerfectlyMatched
    );
}

#[test]
fn test_samsung_net_amount_break_is_critical() {
    let internal_booking = samsung();
    let custodian_booking = Booking {
        net: "10000000",
        ..samsung()
    };
    let (internal, custodian) = parse(
        &[nbim_row("n1", &internal_booking)],
        &[custody_row("c1", &custodian_booking)],
    );

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.breaks.len(), 1);
    let samsung_break = &report.breaks[0];
    assert_eq!(samsung_break.category, BreakCategory::NetAmountMismatch);
    assert_eq!(samsung_break.category.to_string(), "net amount mismatch");
    assert_eq!(samsung_break.severity, Severity::Critical);
    assert_eq!(samsung_break.rule, "high_impact");
    assert_eq!(samsung_break.dimension, Some(Dimension::Amount));
    assert_eq!(samsung_break.impact.amount, dec("450000"));
    assert_eq!(samsung_break.impact.currency, "USD");
    assert_eq!(report.matched_with_breaks, vec!["960789012"]);
}

#[test]
fn test_nestle_within_tolerance_has_no_break() {
    let custodian_booking = Booking {
        net: "1560000.05",
        tax: "35.5",
        fx: "12.1200",
        ..nestle()
    };
    let (internal, custodian) = parse(
        &[nbim_row("n1", &nestle())],
        &[custody_row("c1", &custodian_booking)],
    );

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert!(report.breaks.is_empty());
    assert_eq!(report.perfectly_matched, vec!["970456789"]);
}

#[test]
fn test_mixed_portfolio_ranking_and_statistics() {
    let shifted_samsung = Booking {
        net: "10000000",
        ..samsung()
    };
    let treaty_nestle = Booking {
        tax: "37",
        ..nestle()
    };
    let (internal, custodian) = parse(
        &[
            nbim_row("n1", &apple()),
            nbim_row("n2", &samsung()),
            nbim_row("n3", &nestle()),
        ],
        &[
            custody_row("c1", &apple()),
            custody_row("c2", &shifted_samsung),
            custody_row("c3", &treaty_nestle),
        ],
    );

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.breaks.len(), 2);
    assert_eq!(report.breaks[0].event_key, "960789012");
    assert_eq!(report.breaks[1].event_key, "970456789");
    assert_eq!(report.breaks[1].category, BreakCategory::TreatyOpportunity);
    assert_eq!(report.breaks[1].severity, Severity::High);

    let stats = &report.statistics;
    assert_eq!(stats.matched_events, 3);
    assert_eq!(stats.perfectly_matched, 1);
    assert_eq!(stats.matched_with_breaks, 2);
    assert_eq!(stats.breaks_by_severity[&Severity::Critical], 1);
    assert_eq!(stats.breaks_by_severity[&Severity::High], 1);
    // 2 points on 2,400,000 gross
    assert_eq!(stats.net_impact_by_currency["CHF"], dec("48000"));
    assert_eq!(stats.absolute_impact_by_currency["USD"], dec("450000"));
}

#[test]
fn test_currency_mismatch_reported_not_converted() {
    let custodian_booking = Booking {
        currency: "KRW",
        ..samsung()
    };
    let (internal, custodian) = parse(
        &[nbim_row("n1", &samsung())],
        &[custody_row("c1", &custodian_booking)],
    );

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.breaks.len(), 1);
    let mismatch = &report.breaks[0];
    assert_eq!(mismatch.category, BreakCategory::CurrencyMismatch);
    assert_eq!(mismatch.severity, Severity::Critical);
    assert!(mismatch.discrepancies.iter().all(|d| d.currency_mismatch));
    assert_eq!(mismatch.impact.currency, "USD");
}

#[test]
fn test_disjoint_sets_are_all_orphans() {
    let (internal, custodian) = parse(&[nbim_row("n1", &apple())], &[custody_row("c1", &nestle())]);

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert!(report.perfectly_matched.is_empty());
    assert!(report.matched_with_breaks.is_empty());
    assert!(report.breaks.is_empty());
    assert_eq!(report.unmatched_internal.len(), 1);
    assert_eq!(report.unmatched_custodian.len(), 1);
    assert_eq!(
        report.event("970456789").unwrap().status,
        EventStatus::UnmatchedCustodian
    );
    assert!(!report.is_complete());
}

#[test]
fn test_internal_duplicate_goes_to_error_bucket() {
    let (internal, custodian) = parse(
        &[
            nbim_row("n1", &apple()),
            nbim_row("n2", &apple()),
            nbim_row("n3", &nestle()),
        ],
        &[custody_row("c1", &apple()), custody_row("c2", &nestle())],
    );

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(report.duplicates[0].event_key, "950123456");
    assert_eq!(report.duplicates[0].side, SourceSystem::Internal);
    assert_eq!(report.duplicates[0].row_ids, vec!["n1", "n2"]);
    // the custodian record of a duplicated key is not an orphan either
    assert!(report.unmatched_custodian.is_empty());
    assert_eq!(report.perfectly_matched, vec!["970456789"]);

    let duplicate_breaks = report.breaks_in_category(BreakCategory::DuplicateRecord);
    assert_eq!(duplicate_breaks.len(), 1);
    assert_eq!(duplicate_breaks[0].severity, Severity::High);
    assert_eq!(
        report.event("950123456").unwrap().status,
        EventStatus::Duplicate
    );
}

#[test]
fn test_unparseable_rows_are_reported() {
    let mut broken = nbim_row("n2", &samsung());
    broken
        .fields
        .insert("NET_AMOUNT_QUOTATION".to_string(), "n/a".to_string());
    let missing_key = custody_row("c2", &nestle()).with_field("COAC_EVENT_KEY", "");

    let (internal, custodian) = parse(
        &[nbim_row("n1", &apple()), broken],
        &[custody_row("c1", &apple()), missing_key],
    );

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.perfectly_matched, vec!["950123456"]);
    assert_eq!(report.unparseable.len(), 2);
    assert_eq!(report.unparseable[0].row_id, "n2");
    assert_eq!(report.unparseable[0].field, "NET_AMOUNT_QUOTATION");
    assert_eq!(report.unparseable[1].row_id, "c2");
    assert_eq!(report.statistics.internal_rows, 2);
    assert_eq!(report.statistics.custodian_rows, 2);
}

#[test]
fn test_empty_inputs_produce_empty_report() {
    let (internal, custodian) = parse(&[], &[]);

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert!(report.events.is_empty());
    assert!(report.breaks.is_empty());
    assert!(report.is_complete());
}

#[test]
fn test_invalid_config_is_fatal() {
    let (internal, custodian) = parse(&[nbim_row("n1", &apple())], &[custody_row("c1", &apple())]);
    let config = ReconciliationConfig::default().with_settlement_delay_days(-1);

    let result = reconcile(&internal, &custodian, &config);
    assert!(matches!(result, Err(ReconciliationError::Configuration(_))));
}

#[test]
fn test_repeated_runs_are_identical() {
    let shifted = Booking {
        net: "10000000",
        pay_date: "2025-04-30",
        ..samsung()
    };
    let (internal, custodian) = parse(
        &[nbim_row("n1", &samsung()), nbim_row("n2", &apple())],
        &[custody_row("c1", &shifted), custody_row("c2", &apple())],
    );
    let engine = ReconciliationEngine::new();
    let config = ReconciliationConfig::default();

    let first = engine.run(&internal, &custodian, &config).unwrap();
    let second = engine
        .run(&internal, &custodian, &config.clone().with_max_workers(1))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.breaks.len(), 2);
    assert_eq!(first.breaks[1].category, BreakCategory::SettlementDelay);
    assert_eq!(first.breaks[1].severity, Severity::Medium);
}

#[tokio::test]
async fn test_memory_source_workflow() {
    let source = MemoryRecordSource::with_rows(
        vec![nbim_row("n1", &apple())],
        vec![custody_row("c1", &apple())],
    );
    source
        .push(SourceSystem::Internal, nbim_row("n2", &nestle()))
        .unwrap();

    let internal = RecordParser::for_side(SourceSystem::Internal)
        .load(&source)
        .await
        .unwrap();
    let custodian = load_batch(&source, SourceSystem::Custodian, ColumnMapping::custody())
        .await
        .unwrap();

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.perfectly_matched, vec!["950123456"]);
    assert_eq!(report.unmatched_internal.len(), 1);
    assert_eq!(report.unmatched_internal[0].event_key, "970456789");
}

#[tokio::test]
async fn test_csv_source_workflow() {
    let mut nbim_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        nbim_file,
        "COAC_EVENT_KEY;ISIN;ORGANISATION_NAME;NOMINAL_BASIS;QUOTATION_CURRENCY;GROSS_AMOUNT_QUOTATION;NET_AMOUNT_QUOTATION;WTHTAX_RATE;AVG_FX_RATE_QUOTATION_TO_PORTFOLIO;EXDATE;PAYMENT_DATE"
    )
    .unwrap();
    writeln!(
        nbim_file,
        "950123456;US0378331005;Apple Inc;1500000;USD;375000;318750;15;11.2345;07.02.2025;13.02.2025"
    )
    .unwrap();
    writeln!(
        nbim_file,
        "960789012;KR7005930003;Samsung Electronics;30000000;USD;12300000;10450000;15;11.2345;28.03.2025;17.04.2025"
    )
    .unwrap();

    let mut custody_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        custody_file,
        "COAC_EVENT_KEY;ISIN;NOMINAL_BASIS;CURRENCIES;GROSS_AMOUNT;NET_AMOUNT_QC;TAX_RATE;FX_RATE;EX_DATE;PAY_DATE;LENDING_PERCENTAGE"
    )
    .unwrap();
    writeln!(
        custody_file,
        "950123456;US0378331005;1500000;USD;375000;318750;15;11.2345;07.02.2025;13.02.2025;0"
    )
    .unwrap();
    writeln!(
        custody_file,
        "960789012;KR7005930003;30000000;USD;12300000;10000000;15;11.2345;28.03.2025;17.04.2025;"
    )
    .unwrap();

    let source = CsvRecordSource::new(nbim_file.path(), custody_file.path());
    let internal = RecordParser::for_side(SourceSystem::Internal)
        .load(&source)
        .await
        .unwrap();
    let custodian = RecordParser::for_side(SourceSystem::Custodian)
        .load(&source)
        .await
        .unwrap();

    assert!(internal.rejected.is_empty());
    assert!(custodian.rejected.is_empty());

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.perfectly_matched, vec!["950123456"]);
    assert_eq!(report.breaks.len(), 1);
    assert_eq!(report.breaks[0].severity, Severity::Critical);
    assert_eq!(report.breaks[0].impact.amount, dec("450000"));
}

#[tokio::test]
async fn test_missing_csv_file_is_an_io_error() {
    let source = CsvRecordSource::new("/nonexistent/nbim.csv", "/nonexistent/custody.csv");

    let result = RecordParser::for_side(SourceSystem::Internal)
        .load(&source)
        .await;
    assert!(matches!(result, Err(ReconciliationError::Io(_))));
}

#[test]
fn test_currency_case_is_not_folded() {
    let internal_booking = Booking {
        currency: "usd",
        ..apple()
    };
    let (internal, custodian) = parse(
        &[nbim_row("n1", &internal_booking)],
        &[custody_row("c1", &apple())],
    );

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(internal.records[0].currency, "usd");
    assert_eq!(report.breaks.len(), 1);
    assert_eq!(report.breaks[0].category, BreakCategory::CurrencyMismatch);
    assert_eq!(report.breaks[0].severity, Severity::Critical);
    assert!(report.perfectly_matched.is_empty());
}

/// Severity of the single break raised by a custodian-side edit of one booking
fn single_break(internal: Booking, custodian: Booking) -> (Severity, String) {
    let (internal, custodian) = parse(&[nbim_row("n1", &internal)], &[custody_row("c1", &custodian)]);
    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();
    assert_eq!(report.breaks.len(), 1);
    (report.breaks[0].severity, report.breaks[0].rule.clone())
}

#[test]
fn test_impact_at_threshold_is_critical() {
    // 100,000 on 10,450,000 is under 1% relative
    let at_threshold = Booking {
        net: "10350000",
        ..samsung()
    };
    assert_eq!(
        single_break(samsung(), at_threshold),
        (Severity::Critical, "high_impact".to_string())
    );

    let below_threshold = Booking {
        net: "10350000.01",
        ..samsung()
    };
    assert_eq!(
        single_break(samsung(), below_threshold),
        (Severity::Medium, "amount_delta".to_string())
    );
}

#[test]
fn test_relative_delta_cutoff_is_inclusive_and_exact() {
    // 5% of 318,750 is 15,937.50
    let at_cutoff = Booking {
        net: "302812.5",
        ..apple()
    };
    assert_eq!(
        single_break(apple(), at_cutoff),
        (Severity::High, "large_relative_amount_delta".to_string())
    );

    // 4.9999997% displays as 5.000000 once rounded
    let just_under = Booking {
        net: "302812.501",
        ..apple()
    };
    assert_eq!(
        single_break(apple(), just_under),
        (Severity::Medium, "amount_delta".to_string())
    );
}

#[test]
fn test_tax_delta_at_threshold_is_not_a_break() {
    let at_threshold = Booking {
        tax: "16",
        ..apple()
    };
    let (internal, custodian) = parse(&[nbim_row("n1", &apple())], &[custody_row("c1", &at_threshold)]);
    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();
    assert!(report.breaks.is_empty());
    assert_eq!(report.perfectly_matched, vec!["950123456"]);

    let beyond = Booking {
        tax: "16.01",
        ..apple()
    };
    assert_eq!(
        single_break(apple(), beyond),
        (Severity::High, "tax_rate_delta".to_string())
    );
}

#[tokio::test]
async fn test_undecodable_csv_row_is_unparseable() {
    let mut nbim_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        nbim_file,
        "COAC_EVENT_KEY;ISIN;ORGANISATION_NAME;NOMINAL_BASIS;QUOTATION_CURRENCY;GROSS_AMOUNT_QUOTATION;NET_AMOUNT_QUOTATION;WTHTAX_RATE;AVG_FX_RATE_QUOTATION_TO_PORTFOLIO;EXDATE;PAYMENT_DATE"
    )
    .unwrap();
    writeln!(
        nbim_file,
        "950123456;US0378331005;Apple Inc;1500000;USD;375000;318750;15;11.2345;07.02.2025;13.02.2025"
    )
    .unwrap();
    nbim_file.write_all(b"970456789;CH0038863350;Nestl").unwrap();
    nbim_file.write_all(&[0xe9, 0xff]).unwrap();
    nbim_file
        .write_all(b";800000;CHF;2400000;1560000;35;12.1;22.04.2025;24.04.2025\n")
        .unwrap();
    writeln!(
        nbim_file,
        "960789012;KR7005930003;Samsung Electronics;30000000;USD;12300000;10450000;15;11.2345;28.03.2025;17.04.2025"
    )
    .unwrap();

    let mut custody_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        custody_file,
        "COAC_EVENT_KEY;ISIN;NOMINAL_BASIS;CURRENCIES;GROSS_AMOUNT;NET_AMOUNT_QC;TAX_RATE;FX_RATE;EX_DATE;PAY_DATE"
    )
    .unwrap();
    writeln!(
        custody_file,
        "950123456;US0378331005;1500000;USD;375000;318750;15;11.2345;07.02.2025;13.02.2025"
    )
    .unwrap();
    writeln!(
        custody_file,
        "960789012;KR7005930003;30000000;USD;12300000;10450000;15;11.2345;28.03.2025;17.04.2025"
    )
    .unwrap();

    let source = CsvRecordSource::new(nbim_file.path(), custody_file.path());
    let internal = RecordParser::for_side(SourceSystem::Internal)
        .load(&source)
        .await
        .unwrap();
    let custodian = RecordParser::for_side(SourceSystem::Custodian)
        .load(&source)
        .await
        .unwrap();

    let report = reconcile(&internal, &custodian, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.perfectly_matched, vec!["950123456", "960789012"]);
    assert_eq!(report.unparseable.len(), 1);
    assert!(report.unparseable[0].row_id.ends_with(":3"));
    assert_eq!(report.unparseable[0].field, "ORGANISATION_NAME");
    assert_eq!(report.statistics.internal_rows, 3);
}
