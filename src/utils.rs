//! Display helpers for embedding computed figures in prompt context.

/// Formats a monetary value with thousands separators and two decimals,
/// e.g. `$1,234.56`.
pub fn format_currency(value: f64) -> String {
    format!("${}", group_thousands(&format!("{:.2}", value)))
}

/// Formats a growth rate with an explicit sign and one decimal,
/// e.g. `+5.3%` or `-2.0%`.
pub fn format_signed_percent(value: f64) -> String {
    format!("{:+.1}%", value)
}

/// Formats an integer count with thousands separators, e.g. `12,408`.
pub fn format_count(value: i64) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(number: &str) -> String {
    let (sign, rest) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (rest, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
    }

    #[test]
    fn test_format_currency_negative() {
        assert_eq!(format_currency(-1234.56), "$-1,234.56");
    }

    #[test]
    fn test_format_signed_percent() {
        assert_eq!(format_signed_percent(5.25), "+5.2%");
        assert_eq!(format_signed_percent(-2.0), "-2.0%");
        assert_eq!(format_signed_percent(0.0), "+0.0%");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(7), "7");
        assert_eq!(format_count(1_234), "1,234");
        assert_eq!(format_count(12_408_231), "12,408,231");
        assert_eq!(format_count(-4_500), "-4,500");
    }
}
