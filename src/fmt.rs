use crate::models::DateSummary;

/// Yuan amount rounded to the fen, grouped by thousands: ￥1,234.56
pub fn yuan(amount: f64) -> String {
    let fen = (amount * 100.0).round() as i64;
    let sign = if fen < 0 { "-" } else { "" };
    let fen = fen.unsigned_abs();
    format!("{sign}￥{}.{:02}", group_thousands(fen / 100), fen % 100)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `(YYYY-MM-DD, amount)` per summarized day, oldest first.
pub fn summary_rows(summary: &DateSummary) -> Vec<(String, String)> {
    summary
        .by_date
        .iter()
        .map(|(date, amount)| (date.format("%Y-%m-%d").to_string(), yuan(*amount)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_yuan() {
        assert_eq!(yuan(150.5), "￥150.50");
        assert_eq!(yuan(1234.56), "￥1,234.56");
        assert_eq!(yuan(1_000_000.99), "￥1,000,000.99");
        assert_eq!(yuan(0.0), "￥0.00");
        assert_eq!(yuan(-500.0), "-￥500.00");
    }

    #[test]
    fn test_yuan_rounds_to_fen() {
        // 0.1 + 0.2 accumulates to 0.30000000000000004
        assert_eq!(yuan(0.1 + 0.2), "￥0.30");
        assert_eq!(yuan(1999.999), "￥2,000.00");
        assert_eq!(yuan(-0.001), "￥0.00");
    }

    #[test]
    fn test_summary_rows_in_date_order() {
        let mut summary = DateSummary::default();
        summary
            .by_date
            .insert(NaiveDate::from_ymd_opt(2023, 1, 16).unwrap(), 20.0);
        summary
            .by_date
            .insert(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(), 150.5);
        summary.total = 170.5;

        assert_eq!(
            summary_rows(&summary),
            vec![
                ("2023-01-15".to_string(), "￥150.50".to_string()),
                ("2023-01-16".to_string(), "￥20.00".to_string()),
            ]
        );
    }
}
