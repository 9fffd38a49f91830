use std::collections::HashMap;
use std::path::Path;

use log::warn;

use crate::dates;
use crate::error::{Result, SyncError};
use crate::models::{PurchaseRecord, RawRow};

// ---------------------------------------------------------------------------
// Export columns
// ---------------------------------------------------------------------------

pub const COL_PRODUCT: &str = "商品名称";
pub const COL_AMOUNT: &str = "金额（元）";
pub const COL_CREATED: &str = "交易创建时间";

/// Suffix of the product name on "buy" rows.
pub const PURCHASE_MARKER: &str = "买入";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an export amount such as `1,234.56` or `¥100.50`.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '¥' | '￥' | '$') && !c.is_whitespace())
        .collect();
    let amount: f64 = s
        .parse()
        .map_err(|_| SyncError::MalformedRow(format!("unparseable amount {raw:?}")))?;
    if !amount.is_finite() {
        return Err(SyncError::MalformedRow(format!("non-finite amount {raw:?}")));
    }
    if amount < 0.0 {
        return Err(SyncError::MalformedRow(format!("negative amount {raw:?}")));
    }
    Ok(amount)
}

/// `X-FundAlpha-买入` -> `FundAlpha`.
pub fn parse_fund_name(product: &str) -> Result<String> {
    let name = product
        .split('-')
        .nth(1)
        .map(str::trim)
        .ok_or_else(|| SyncError::MalformedRow(format!("no fund name in {product:?}")))?;
    if name.is_empty() {
        return Err(SyncError::MalformedRow(format!("empty fund name in {product:?}")));
    }
    Ok(name.to_string())
}

pub fn is_purchase(row: &RawRow) -> bool {
    row.get(COL_PRODUCT)
        .is_some_and(|p| p.trim_end().ends_with(PURCHASE_MARKER))
}

fn required<'a>(row: &'a RawRow, column: &str) -> Result<&'a str> {
    row.get(column)
        .ok_or_else(|| SyncError::MalformedRow(format!("missing column {column:?}")))
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read every data row of the export, keyed by header.
pub fn read_rows(file_path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(file_path)?;
    read_rows_from(std::io::BufReader::new(file))
}

pub fn read_rows_from<R: std::io::Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    // Spreadsheet exports often lead with a UTF-8 BOM.
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let fields: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(RawRow { line, fields });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RejectedRow {
    pub line: u64,
    pub error: SyncError,
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<PurchaseRecord>,
    pub rejected: Vec<RejectedRow>,
}

pub fn extract_row(row: &RawRow) -> Result<PurchaseRecord> {
    let fund_name = parse_fund_name(required(row, COL_PRODUCT)?)?;
    let amount = parse_amount(required(row, COL_AMOUNT)?)?;
    let timestamp = dates::normalize(required(row, COL_CREATED)?)?;
    Ok(PurchaseRecord {
        fund_name,
        amount,
        timestamp,
    })
}

/// Keep purchase rows, in order. Malformed purchase rows are set aside rather
/// than failing the whole file.
pub fn extract(rows: &[RawRow]) -> Extraction {
    let mut out = Extraction::default();
    for row in rows.iter().filter(|r| is_purchase(r)) {
        match extract_row(row) {
            Ok(record) => out.records.push(record),
            Err(error) => {
                warn!("Skipping line {}: {error}", row.line);
                out.rejected.push(RejectedRow {
                    line: row.line,
                    error,
                });
            }
        }
    }
    out
}

pub fn extract_file(file_path: &Path) -> Result<Extraction> {
    let rows = read_rows(file_path)?;
    Ok(extract(&rows))
}
