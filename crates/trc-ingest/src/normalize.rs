//! Field-level normalization for raw tabular values.
//!
//! Every function here takes the trimmed cell text and either returns the
//! strongly-typed value or a [`DataError`] describing why the cell was
//! rejected. Blank cells are always [`DataError::MissingField`].

use chrono::NaiveDate;
use trc_reconcile::{DataError, Money, Side, MICROS_SCALE};

/// Date layouts seen in broker and back-office exports.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d_%m_%Y",
    "%d-%b-%Y",
    "%Y/%m/%d",
    "%Y%m%d",
];

pub fn text(raw: &str, field: &'static str) -> Result<String, DataError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(DataError::MissingField { field });
    }
    Ok(t.to_string())
}

/// Normalize a free-text direction into a [`Side`].
pub fn side(raw: &str, field: &'static str) -> Result<Side, DataError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(DataError::MissingField { field });
    }
    match t.to_ascii_uppercase().as_str() {
        "B" | "BUY" | "BOUGHT" | "PURCHASE" | "1" => Ok(Side::Buy),
        "S" | "SELL" | "SOLD" | "SALE" | "2" => Ok(Side::Sell),
        _ => Err(DataError::InvalidField {
            field,
            raw: t.to_string(),
        }),
    }
}

/// Parse a trade date. A trailing time component (`2025-01-31 00:00:00`) is
/// ignored, as spreadsheet exports often carry one.
pub fn date(raw: &str, field: &'static str) -> Result<NaiveDate, DataError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(DataError::MissingField { field });
    }
    let day_part = t.split(' ').next().unwrap_or(t);
    // ISO `T` separator only; month abbreviations like OCT also contain a T.
    let day_part = match day_part.split_once('T') {
        Some((d, time)) if time.starts_with(|c: char| c.is_ascii_digit()) => d,
        _ => day_part,
    };

    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(day_part, f).ok())
        .ok_or_else(|| DataError::InvalidField {
            field,
            raw: t.to_string(),
        })
}

/// Parse a non-negative integer quantity.
///
/// Accepts thousands separators and a zero fraction (`100.0`), which is how
/// spreadsheets export integer columns. Anything negative or fractional is
/// [`DataError::InvalidQuantity`].
pub fn quantity(raw: &str, field: &'static str) -> Result<u64, DataError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(DataError::MissingField { field });
    }
    let invalid = || DataError::InvalidQuantity { raw: t.to_string() };

    let cleaned: String = t.chars().filter(|c| *c != ',').collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    let int_part = match digits.split_once('.') {
        Some((i, frac)) => {
            if !frac.chars().all(|c| c == '0') {
                return Err(invalid());
            }
            i
        }
        None => digits,
    };

    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    int_part.parse::<u64>().map_err(|_| invalid())
}

/// Convert a decimal amount string to [`Money`] without floating point.
///
/// Rules:
/// - optional leading `+` or `-`, or accounting parentheses `(12.50)`;
///   a sign inside parentheses is rejected
/// - optional `,` thousands separators
/// - at most 6 decimal places
pub fn amount(raw: &str, field: &'static str) -> Result<Money, DataError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(DataError::MissingField { field });
    }
    let invalid = || DataError::InvalidField {
        field,
        raw: t.to_string(),
    };

    let (paren_negative, body) = match t.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, t),
    };

    let cleaned: String = body.chars().filter(|c| *c != ',').collect();
    if paren_negative && cleaned.starts_with(['-', '+']) {
        return Err(invalid());
    }
    let (sign_negative, digits) = if let Some(rest) = cleaned.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = cleaned.strip_prefix('+') {
        (false, rest)
    } else {
        (false, cleaned.as_str())
    };

    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty())
        || !all_digits(int_part)
        || !all_digits(frac_part)
        || frac_part.len() > 6
    {
        return Err(invalid());
    }

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    let frac_val: i64 = format!("{frac_part:0<6}").parse().map_err(|_| invalid())?;

    let micros = int_val
        .checked_mul(MICROS_SCALE)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(invalid)?;

    Ok(Money::new(if paren_negative || sign_negative {
        -micros
    } else {
        micros
    }))
}
