//! Cent-exact rounding and display formatting for fees and hours

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two decimals, half away from zero
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a fee with thousands separators and exactly two decimals (`44,160.00`)
pub fn format_money(amount: Decimal) -> String {
    let rounded = round_cents(amount);
    let mut text = group_thousands(rounded.abs().trunc());
    let cents = (rounded.abs().fract() * Decimal::ONE_HUNDRED).trunc();
    text.push('.');
    text.push_str(&format!("{:0>2}", cents));
    if rounded.is_sign_negative() && !rounded.is_zero() {
        text.insert(0, '-');
    }
    text
}

/// Format a rate as whole currency when it has no cents (`$230`), else as money (`$95.50`)
pub fn format_rate(rate: Decimal) -> String {
    let rounded = round_cents(rate);
    if rounded.fract().is_zero() {
        format!("${}", group_thousands(rounded.trunc()))
    } else {
        format!("${}", format_money(rounded))
    }
}

/// Format hours with thousands separators, dropping a zero fraction (`1,192` / `7.5`)
pub fn format_hours(hours: Decimal) -> String {
    let rounded = round_cents(hours).normalize();
    let whole = group_thousands(rounded.abs().trunc());
    let fract = rounded.abs().fract();
    let mut text = if fract.is_zero() {
        whole
    } else {
        // "0.5" -> ".5"
        let digits = fract.to_string();
        format!("{}{}", whole, digits.trim_start_matches('0'))
    };
    if rounded.is_sign_negative() && !rounded.is_zero() {
        text.insert(0, '-');
    }
    text
}

fn group_thousands(whole: Decimal) -> String {
    let digits = whole.trunc().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_cents(d("1.005")), d("1.01"));
        assert_eq!(round_cents(d("1.004")), d("1.00"));
        assert_eq!(round_cents(d("-1.005")), d("-1.01"));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(d("44160")), "44,160.00");
        assert_eq!(format_money(d("0")), "0.00");
        assert_eq!(format_money(d("999.999")), "1,000.00");
        assert_eq!(format_money(d("1234567.5")), "1,234,567.50");
        assert_eq!(format_money(d("-12.3")), "-12.30");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(d("230")), "$230");
        assert_eq!(format_rate(d("1200")), "$1,200");
        assert_eq!(format_rate(d("95.5")), "$95.50");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(d("192")), "192");
        assert_eq!(format_hours(d("1192.0")), "1,192");
        assert_eq!(format_hours(d("7.50")), "7.5");
    }

    proptest! {
        #[test]
        fn prop_format_money_parses_back(cents in 0i64..10_000_000_000) {
            let amount = Decimal::new(cents, 2);
            let text = format_money(amount);
            let parsed = Decimal::from_str(&text.replace(',', "")).unwrap();
            prop_assert_eq!(parsed, amount);
        }
    }
}
