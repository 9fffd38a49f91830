use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::Cli;
use crate::error::Result;
use crate::fmt::{summary_rows, yuan};
use crate::notion::NotionClient;
use crate::settings::load_settings;
use crate::sync::{SyncContext, SyncReport};

pub fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?.overlay(cli.to_settings());
    let config = settings.into_config()?;
    let client = NotionClient::with_base_url(config.token.clone(), config.api_base.clone())?;

    let report = SyncContext::new(Box::new(client), config).run()?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &SyncReport) {
    let outcome = &report.outcome;
    let failed = if outcome.failed > 0 {
        outcome.failed.to_string().red().bold()
    } else {
        outcome.failed.to_string().normal()
    };
    println!(
        "Total record count: {}, success: {}, failed: {}",
        outcome.total,
        outcome.succeeded.to_string().green(),
        failed
    );

    if !outcome.failures.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Fund", "Amount", "Reason"]);
        for f in &outcome.failures {
            table.add_row(vec![
                Cell::new(f.record.date()),
                Cell::new(&f.record.fund_name),
                Cell::new(yuan(f.record.amount)),
                Cell::new(&f.reason),
            ]);
        }
        println!("\n{}\n{table}", "Failed".red().bold());
    }

    if !report.extraction.rejected.is_empty() {
        println!("\n{}", "Skipped rows".yellow().bold());
        for r in &report.extraction.rejected {
            println!("  line {}: {}", r.line, r.error);
        }
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Amount"]);
    for (date, amount) in summary_rows(&report.summary) {
        table.add_row(vec![date, amount]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(yuan(report.summary.total)),
    ]);
    println!("\nSummary\n{table}");
}
