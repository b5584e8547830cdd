/// Value normalization for distributor report cells
///
/// Distributor files arrive with no declared locale: the same column may
/// carry `1.234,56`, `1,234.56`, `$ 1234.56` or a bare number, and dates show
/// up as strings in half a dozen formats or as Excel serials. The policy
/// throughout is lenient: a cell that cannot be parsed becomes a neutral
/// default (0.0, 0, NULL date) instead of failing the import. `ParseOutcome`
/// keeps the coercion visible to callers and tests without changing that
/// external behavior.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// A parsed value plus whether it was silently defaulted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOutcome<T> {
    pub value: T,
    pub was_coerced: bool,
}

impl<T> ParseOutcome<T> {
    pub fn clean(value: T) -> Self {
        Self { value, was_coerced: false }
    }

    pub fn coerced(value: T) -> Self {
        Self { value, was_coerced: true }
    }
}

/// Normalize a monetary or quantity cell to a float.
///
/// Mixed separator conventions are disambiguated by position: when both `,`
/// and `.` appear, the rightmost one is the decimal separator. With a single
/// separator, one occurrence followed by exactly three digits is read as a
/// thousands separator. That heuristic misreads values like `1,234` meant as
/// a truncated decimal fraction; the tradeoff is accepted so one odd cell
/// never blocks an import.
pub fn normalize_amount(raw: &str) -> ParseOutcome<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParseOutcome::coerced(0.0);
    }

    let mut s: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != '€' && *c != '£')
        .collect();

    let has_comma = s.contains(',');
    let has_dot = s.contains('.');

    if has_comma && has_dot {
        // Rightmost separator wins as the decimal mark
        if s.rfind(',') > s.rfind('.') {
            s = s.replace('.', "").replace(',', ".");
        } else {
            s = s.replace(',', "");
        }
    } else if has_comma {
        if is_thousands_separated(&s, ',') {
            s = s.replace(',', "");
        } else {
            s = s.replace(',', ".");
        }
    } else if has_dot && is_thousands_separated(&s, '.') {
        s = s.replace('.', "");
    }

    match s.parse::<f64>() {
        Ok(value) => ParseOutcome::clean(value),
        Err(_) => ParseOutcome::coerced(0.0),
    }
}

/// Exactly one occurrence of `sep` with exactly three trailing characters.
fn is_thousands_separated(s: &str, sep: char) -> bool {
    let mut parts = s.split(sep);
    let _head = parts.next();
    match (parts.next(), parts.next()) {
        (Some(tail), None) => tail.len() == 3,
        _ => false,
    }
}

/// Coerce a client-code cell to an integer. Excel often hands integer codes
/// back as floats (`10345.0`); those truncate cleanly. Anything else
/// defaults to 0.
pub fn parse_client_code(raw: &str) -> ParseOutcome<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParseOutcome::coerced(0);
    }

    if let Ok(code) = trimmed.parse::<i64>() {
        return ParseOutcome::clean(code);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && f.fract() == 0.0 {
            return ParseOutcome::clean(f as i64);
        }
    }

    ParseOutcome::coerced(0)
}

/// Date formats seen in distributor reports, day-first conventions ahead of
/// the US ordering.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a sale-date cell. An empty cell is simply absent (NULL, not a
/// coercion); a non-empty cell that matches no known format is coerced to
/// NULL rather than failing the row.
pub fn parse_sale_date(raw: &str) -> ParseOutcome<Option<NaiveDate>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParseOutcome::clean(None);
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return ParseOutcome::clean(Some(date));
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return ParseOutcome::clean(Some(dt.date()));
        }
    }

    // Excel serial date (days since 1899-12-30)
    if let Ok(serial) = trimmed.parse::<f64>() {
        if (1.0..100_000.0).contains(&serial) {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch");
            return ParseOutcome::clean(Some(epoch + Duration::days(serial as i64)));
        }
    }

    ParseOutcome::coerced(None)
}
