//! Dividend reconciliation example
//!
//! Run with `RUST_LOG=dividend_recon=debug` to see the engine's tracing output.

use dividend_recon::utils::MemoryRecordSource;
use dividend_recon::{reconcile, RawRecord, RecordParser, ReconciliationConfig, SourceSystem};
use tracing_subscriber::EnvFilter;

fn nbim_row(row_id: &str, cells: [&str; 11]) -> RawRecord {
    let columns = [
        "COAC_EVENT_KEY",
        "ISIN",
        "ORGANISATION_NAME",
        "NOMINAL_BASIS",
        "QUOTATION_CURRENCY",
        "GROSS_AMOUNT_QUOTATION",
        "NET_AMOUNT_QUOTATION",
        "WTHTAX_RATE",
        "AVG_FX_RATE_QUOTATION_TO_PORTFOLIO",
        "EXDATE",
        "PAYMENT_DATE",
    ];
    columns
        .iter()
        .zip(cells)
        .fold(RawRecord::new(row_id), |row, (column, value)| {
            row.with_field(*column, value)
        })
}

fn custody_row(row_id: &str, cells: [&str; 11]) -> RawRecord {
    let columns = [
        "COAC_EVENT_KEY",
        "ISIN",
        "NOMINAL_BASIS",
        "CURRENCIES",
        "GROSS_AMOUNT",
        "NET_AMOUNT_QC",
        "TAX_RATE",
        "FX_RATE",
        "EX_DATE",
        "PAY_DATE",
        "LENDING_PERCENTAGE",
    ];
    columns
        .iter()
        .zip(cells)
        .fold(RawRecord::new(row_id), |row, (column, value)| {
            row.with_field(*column, value)
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🧾 Dividend Recon - Reconciliation Example\n");

    // 1. Load both booking exports
    println!("📥 Loading bookings...");
    let source = MemoryRecordSource::with_rows(
        vec![
            nbim_row("nbim:2", ["950123456", "US0378331005", "Apple Inc", "1500000", "USD", "375000", "318750", "15", "11.2345", "07.02.2025", "13.02.2025"]),
            nbim_row("nbim:3", ["960789012", "KR7005930003", "Samsung Electronics", "30000000", "USD", "12300000", "10450000", "15", "11.2345", "28.03.2025", "17.04.2025"]),
            nbim_row("nbim:4", ["970456789", "CH0038863350", "Nestle SA", "800000", "CHF", "2400000", "1560000", "35", "12.1000", "22.04.2025", "24.04.2025"]),
            nbim_row("nbim:5", ["980111222", "NL0010273215", "ASML Holding", "250000", "EUR", "400000", "340000", "15", "11.8000", "25.04.2025", "02.05.2025"]),
        ],
        vec![
            custody_row("custody:2", ["950123456", "US0378331005", "1500000", "USD", "375000", "318750", "15", "11.2345", "07.02.2025", "13.02.2025", "0"]),
            custody_row("custody:3", ["960789012", "KR7005930003", "30000000", "USD", "12300000", "10000000", "15", "11.2345", "28.03.2025", "17.04.2025", ""]),
            custody_row("custody:4", ["970456789", "CH0038863350", "800000", "CHF", "2400000", "1560000.05", "35.5", "12.1200", "22.04.2025", "24.04.2025", ""]),
            custody_row("custody:5", ["980111222", "NL0010273215", "250000", "EUR", "400000", "300000", "25", "11.8000", "25.04.2025", "12.05.2025", "40"]),
            custody_row("custody:6", ["990333444", "JP3633400001", "100000", "JPY", "12000000", "10800000", "10", "0.0712", "28.03.2025", "26.06.2025", ""]),
        ],
    );

    let internal = RecordParser::for_side(SourceSystem::Internal)
        .load(&source)
        .await?;
    let custodian = RecordParser::for_side(SourceSystem::Custodian)
        .load(&source)
        .await?;
    println!(
        "  ✓ {} internal records, {} custodian records\n",
        internal.records.len(),
        custodian.records.len()
    );

    // 2. Run the engine
    println!("⚖️  Reconciling...\n");
    let config = ReconciliationConfig::default();
    let report = reconcile(&internal, &custodian, &config)?;

    // 3. Event summary
    println!("📋 Events:");
    for event in &report.events {
        println!(
            "  {} {:<10} {} {:?} ({} breaks)",
            event.event_key, event.security_id, event.currency, event.status, event.break_count
        );
    }
    println!();

    // 4. Ranked breaks
    println!("🚨 Breaks (ranked):");
    for item in &report.breaks {
        println!(
            "  [{}] {} - {} impact {} {} (rule: {})",
            item.severity,
            item.event_key,
            item.category,
            item.impact.amount,
            item.impact.currency,
            item.rule
        );
        for discrepancy in &item.discrepancies {
            println!(
                "      {}: internal {} vs custodian {}",
                discrepancy.field.as_str(),
                discrepancy.internal_value,
                discrepancy.custodian_value
            );
        }
    }
    println!();

    // 5. Statistics
    let stats = &report.statistics;
    println!("📊 Statistics:");
    println!("  Matched events: {}", stats.matched_events);
    println!("  Perfectly matched: {}", stats.perfectly_matched);
    println!("  With breaks: {}", stats.matched_with_breaks);
    println!("  Unmatched internal: {}", stats.unmatched_internal);
    println!("  Unmatched custodian: {}", stats.unmatched_custodian);
    for (severity, count) in &stats.breaks_by_severity {
        println!("  {} breaks: {}", severity, count);
    }
    for (currency, total) in &stats.absolute_impact_by_currency {
        println!("  Absolute impact {}: {}", currency, total);
    }

    println!("\n✅ Reconciliation completed!");
    Ok(())
}
