//! Human amount to minor-unit conversion.
//!
//! Amounts cross process boundaries as decimal strings; all arithmetic
//! happens on `u128` minor units. Parsing and formatting are symmetric:
//! `parse_to_minor_units(format_minor_units(x, d), d) == x`.

use crate::core::errors::WalletError;

/// Convert a decimal string to minor units at the given precision.
///
/// Rejects negatives, malformed input and fractional parts longer than
/// `decimals`.
pub fn parse_to_minor_units(amount: &str, decimals: u32) -> Result<u128, WalletError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(WalletError::InvalidAmount("empty amount".to_string()));
    }
    if amount.starts_with('-') || amount.starts_with('+') {
        return Err(WalletError::InvalidAmount(format!(
            "signed amount not accepted: {}",
            amount
        )));
    }

    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(WalletError::InvalidAmount(amount.to_string()));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(WalletError::InvalidAmount(format!(
            "not a decimal number: {}",
            amount
        )));
    }
    if frac_part.len() as u32 > decimals {
        return Err(WalletError::InvalidAmount(format!(
            "more than {} decimal places: {}",
            decimals, amount
        )));
    }

    let scale = 10u128.pow(decimals);
    let int_units = if int_part.is_empty() {
        0u128
    } else {
        int_part
            .parse::<u128>()
            .map_err(|_| WalletError::InvalidAmount(amount.to_string()))?
    };
    let frac_units = if frac_part.is_empty() {
        0u128
    } else {
        let parsed = frac_part
            .parse::<u128>()
            .map_err(|_| WalletError::InvalidAmount(amount.to_string()))?;
        parsed * 10u128.pow(decimals - frac_part.len() as u32)
    };

    int_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(|| WalletError::InvalidAmount(format!("amount overflows: {}", amount)))
}

/// Format minor units as a decimal string at the given precision.
///
/// Trailing fractional zeros are trimmed but at least one fractional digit
/// is kept, so whole amounts read "100.0" rather than "100".
pub fn format_minor_units(minor: u128, decimals: u32) -> String {
    if decimals == 0 {
        return minor.to_string();
    }
    let scale = 10u128.pow(decimals);
    let int_part = minor / scale;
    let frac_part = minor % scale;
    let mut frac = format!("{:0width$}", frac_part, width = decimals as usize);
    while frac.len() > 1 && frac.ends_with('0') {
        frac.pop();
    }
    format!("{}.{}", int_part, frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_to_minor_units("1", 8).unwrap(), 100_000_000);
        assert_eq!(parse_to_minor_units("0.5", 8).unwrap(), 50_000_000);
        assert_eq!(parse_to_minor_units("0.00000001", 8).unwrap(), 1);
        assert_eq!(
            parse_to_minor_units("1.5", 18).unwrap(),
            1_500_000_000_000_000_000
        );
        assert_eq!(parse_to_minor_units("100.25", 6).unwrap(), 100_250_000);
    }

    #[test]
    fn test_parse_edge_shapes() {
        assert_eq!(parse_to_minor_units(".5", 6).unwrap(), 500_000);
        assert_eq!(parse_to_minor_units("5.", 6).unwrap(), 5_000_000);
        assert_eq!(parse_to_minor_units(" 7 ", 6).unwrap(), 7_000_000);
    }

    #[test]
    fn test_parse_rejections() {
        for bad in ["", ".", "-1", "+1", "1,5", "1.2.3", "abc", "1e5"] {
            assert!(
                matches!(parse_to_minor_units(bad, 8), Err(WalletError::InvalidAmount(_))),
                "expected rejection for {:?}",
                bad
            );
        }
        // over-precise
        assert!(parse_to_minor_units("0.123456789", 8).is_err());
        assert!(parse_to_minor_units("0.1234567", 6).is_err());
    }

    #[test]
    fn test_format_trims_but_keeps_one_digit() {
        assert_eq!(format_minor_units(100_000_000, 8), "1.0");
        assert_eq!(format_minor_units(150_000_000, 8), "1.5");
        assert_eq!(format_minor_units(1, 8), "0.00000001");
        assert_eq!(format_minor_units(10_000_000_000, 8), "100.0");
        assert_eq!(format_minor_units(0, 6), "0.0");
    }

    #[test]
    fn test_round_trip() {
        for (s, d) in [("1.0", 8), ("0.00000001", 8), ("42.5", 18), ("100.0", 6)] {
            let minor = parse_to_minor_units(s, d).unwrap();
            assert_eq!(format_minor_units(minor, d), s);
        }
    }
}
