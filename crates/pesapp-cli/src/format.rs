use chrono::{DateTime, Utc};

/// Format a phone number for display
/// Normalizes Philippine mobile numbers to 0XXX XXX XXXX or +63 XXX XXX XXXX
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        11 if digits.starts_with("09") => format!(
            "{} {} {}",
            &digits[0..4],
            &digits[4..7],
            &digits[7..11]
        ),
        12 if digits.starts_with("63") => format!(
            "+63 {} {} {}",
            &digits[2..5],
            &digits[5..8],
            &digits[8..12]
        ),
        _ => phone.to_string(), // Return original if can't format
    }
}

/// Format an amount in pesos with thousands separators, e.g. `-₱4,500.00`
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}₱{}.{:02}", sign, grouped, cents % 100)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("09175550101"), "0917 555 0101");
        assert_eq!(format_phone("0917-555-0101"), "0917 555 0101");
        assert_eq!(format_phone("+63 917 555 0101"), "+63 917 555 0101");
        assert_eq!(format_phone("639175550101"), "+63 917 555 0101");
        assert_eq!(format_phone("8123"), "8123"); // Too short, return as-is
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "₱0.00");
        assert_eq!(format_amount(950.5), "₱950.50");
        assert_eq!(format_amount(12000.0), "₱12,000.00");
        assert_eq!(format_amount(1234567.891), "₱1,234,567.89");
        assert_eq!(format_amount(-4500.0), "-₱4,500.00");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Pagdiriwang", 6), "Pag...");
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        assert_eq!(format_date(&date), "Jun 02, 2025");
    }
}
