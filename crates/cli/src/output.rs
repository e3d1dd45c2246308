use crate::error::CliError;
use connectors::directory::types::render_epoch;
use model::participant::Watermark;
use sync_engine::report::SyncReport;

pub struct PreviewTable {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

async fn generate_report_json(report: &SyncReport) -> Result<String, CliError> {
    serde_json::to_string_pretty(report).map_err(CliError::JsonSerialize)
}

pub async fn write_report(report: &SyncReport, path: String) -> Result<(), CliError> {
    let report_json = generate_report_json(report).await?;
    tokio::fs::write(path, report_json).await?;
    Ok(())
}

pub async fn print_report(report: &SyncReport) -> Result<(), CliError> {
    let report_json = generate_report_json(report).await?;
    println!("{report_json}");
    Ok(())
}

pub fn print_preview(tables: &[PreviewTable]) {
    if tables.is_empty() {
        println!("No whitelisted metrics in the payload.");
        return;
    }
    println!("{:<14} {:>5}  Columns", "Table", "Rows");
    println!("-----------------------------");
    for table in tables {
        println!(
            "{:<14} {:>5}  {}",
            table.table,
            table.rows,
            table.columns.join(", ")
        );
    }
}

pub fn print_watermark_table(participant_id: &str, watermark: &Watermark) {
    println!("Watermark for participant '{participant_id}':");
    println!("-----------------------------");
    println!("{:<12} {}", "Start date", watermark.start_date);
    let sync_date = watermark
        .sync_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "never".to_string());
    println!("{:<12} {}", "Sync date", sync_date);
    let sync_epoch =
        render_epoch(watermark.sync_epoch).unwrap_or_else(|| "unset".to_string());
    println!("{:<12} {}", "Sync epoch", sync_epoch);
}
