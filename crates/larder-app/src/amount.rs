// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

const FRACTION_TOLERANCE: f64 = 0.01;

const FRACTIONS: [(f64, &str); 9] = [
    (1.0 / 8.0, "1/8"),
    (1.0 / 4.0, "1/4"),
    (1.0 / 3.0, "1/3"),
    (3.0 / 8.0, "3/8"),
    (1.0 / 2.0, "1/2"),
    (5.0 / 8.0, "5/8"),
    (2.0 / 3.0, "2/3"),
    (3.0 / 4.0, "3/4"),
    (7.0 / 8.0, "7/8"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    Empty,
    InvalidNumber,
    Negative,
    InvalidRange,
}

impl std::fmt::Display for AmountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("amount is empty"),
            Self::InvalidNumber => f.write_str("invalid amount; use 2, 1.5, 1 1/2 or 2-3"),
            Self::Negative => f.write_str("amount cannot be negative"),
            Self::InvalidRange => f.write_str("amount range must go from low to high"),
        }
    }
}

impl std::error::Error for AmountError {}

pub type AmountResult<T> = std::result::Result<T, AmountError>;

/// Parses `2`, `1.5`, `1/2`, `1 1/2` or a range such as `2-3`.
pub fn parse_amount(input: &str) -> AmountResult<(f64, Option<f64>)> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    if let Some((low, high)) = trimmed.split_once('-') {
        let low = parse_quantity(low)?;
        let high = parse_quantity(high)?;
        if high < low {
            return Err(AmountError::InvalidRange);
        }
        return Ok((low, Some(high)));
    }

    Ok((parse_quantity(trimmed)?, None))
}

pub fn parse_quantity(input: &str) -> AmountResult<f64> {
    let parts = input.split_whitespace().collect::<Vec<_>>();
    let value = match parts.as_slice() {
        [] => return Err(AmountError::Empty),
        [single] if single.contains('/') => parse_fraction(single)?,
        [single] => single
            .parse::<f64>()
            .map_err(|_| AmountError::InvalidNumber)?,
        [whole, fraction] => {
            let whole = whole
                .parse::<u32>()
                .map_err(|_| AmountError::InvalidNumber)?;
            f64::from(whole) + parse_fraction(fraction)?
        }
        _ => return Err(AmountError::InvalidNumber),
    };
    if !value.is_finite() {
        return Err(AmountError::InvalidNumber);
    }
    if value < 0.0 {
        return Err(AmountError::Negative);
    }
    Ok(value)
}

fn parse_fraction(input: &str) -> AmountResult<f64> {
    let (numerator, denominator) = input.split_once('/').ok_or(AmountError::InvalidNumber)?;
    let numerator = numerator
        .trim()
        .parse::<u32>()
        .map_err(|_| AmountError::InvalidNumber)?;
    let denominator = denominator
        .trim()
        .parse::<u32>()
        .map_err(|_| AmountError::InvalidNumber)?;
    if denominator == 0 {
        return Err(AmountError::InvalidNumber);
    }
    Ok(f64::from(numerator) / f64::from(denominator))
}

/// Display text for an ingredient amount; empty when there is none.
pub fn format_amount(amount: Option<f64>, rangeamount: Option<f64>) -> String {
    match (amount, rangeamount) {
        (Some(low), Some(high)) => format!("{}-{}", format_quantity(low), format_quantity(high)),
        (Some(value), None) => format_quantity(value),
        (None, Some(value)) => format_quantity(value),
        (None, None) => String::new(),
    }
}

pub fn format_quantity(value: f64) -> String {
    let whole = value.trunc();
    let fraction = value - whole;

    if fraction < FRACTION_TOLERANCE {
        return format!("{whole:.0}");
    }
    if fraction > 1.0 - FRACTION_TOLERANCE {
        return format!("{:.0}", whole + 1.0);
    }

    for (candidate, label) in FRACTIONS {
        if (fraction - candidate).abs() < FRACTION_TOLERANCE {
            if whole == 0.0 {
                return label.to_owned();
            }
            return format!("{whole:.0} {label}");
        }
    }

    let decimal = format!("{value:.2}");
    decimal.trim_end_matches('0').trim_end_matches('.').to_owned()
}

#[cfg(test)]
mod tests {
    use super::{AmountError, format_amount, format_quantity, parse_amount};

    #[test]
    fn format_quantity_prefers_kitchen_fractions() {
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(1.5), "1 1/2");
        assert_eq!(format_quantity(1.0 / 3.0), "1/3");
        assert_eq!(format_quantity(0.75), "3/4");
        assert_eq!(format_quantity(2.999), "3");
        assert_eq!(format_quantity(1.15), "1.15");
    }

    #[test]
    fn format_amount_handles_ranges_and_missing_values() {
        assert_eq!(format_amount(Some(2.0), Some(3.0)), "2-3");
        assert_eq!(format_amount(Some(0.5), None), "1/2");
        assert_eq!(format_amount(None, None), "");
    }

    #[test]
    fn parse_amount_accepts_fractions_and_ranges() {
        assert_eq!(parse_amount("1 1/2"), Ok((1.5, None)));
        assert_eq!(parse_amount(" 3/4 "), Ok((0.75, None)));
        assert_eq!(parse_amount("2-3"), Ok((2.0, Some(3.0))));
        assert_eq!(parse_amount("1.25"), Ok((1.25, None)));
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        assert_eq!(parse_amount(""), Err(AmountError::Empty));
        assert_eq!(parse_amount("a pinch"), Err(AmountError::InvalidNumber));
        assert_eq!(parse_amount("1/0"), Err(AmountError::InvalidNumber));
        assert_eq!(parse_amount("3-2"), Err(AmountError::InvalidRange));
    }
}
