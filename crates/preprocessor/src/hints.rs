//! Year extraction and price/mileage hint parsing, the third
//! and fourth sub-steps of query pre-processing.

use once_cell::sync::Lazy;
use regex::Regex;

/// A matched span to remove from the residual query, paired with the
/// `FilterSet` value it implies.
pub struct Hint<T> {
    pub value: T,
    pub span: (usize, usize),
}

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// Extracts a single four-digit year in `[1990, current_year + 1]`.
/// Years outside the range are left in the residual
/// text untouched — they're treated as ordinary tokens, not a year filter.
pub fn extract_year(query: &str, current_year: i32) -> Option<Hint<i32>> {
    for found in YEAR_RE.find_iter(query) {
        if let Ok(year) = found.as_str().parse::<i32>() {
            if (1990..=current_year + 1).contains(&year) {
                return Some(Hint {
                    value: year,
                    span: (found.start(), found.end()),
                });
            }
        }
    }
    None
}

/// A price ceiling/floor implied by phrasing like "under $25k" or "below
/// 30000". Values are whole dollars; callers convert to `Listing::price`'s
/// minor-unit convention before writing them into a `FilterSet`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceHint {
    pub max: Option<i64>,
    pub min: Option<i64>,
}

static PRICE_UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:under|below|less than)\s*\$?\s*([\d,]+)\s*(k)?\b").unwrap());
static PRICE_OVER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:over|above|more than)\s*\$?\s*([\d,]+)\s*(k)?\b").unwrap());

fn parse_amount(digits: &str, thousands: bool) -> Option<i64> {
    let cleaned: String = digits.chars().filter(|c| *c != ',').collect();
    let amount: i64 = cleaned.parse().ok()?;
    Some(if thousands { amount * 1_000 } else { amount })
}

/// Parses a single "under/below $Nk" or "over/above $N" price hint, in
/// dollars. Only the first match in the query is used.
pub fn extract_price_hint(query: &str) -> Option<Hint<PriceHint>> {
    if let Some(caps) = PRICE_UNDER_RE.captures(query) {
        let whole = caps.get(0).unwrap();
        let amount = parse_amount(&caps[1], caps.get(2).is_some())?;
        return Some(Hint {
            value: PriceHint { max: Some(amount), min: None },
            span: (whole.start(), whole.end()),
        });
    }
    if let Some(caps) = PRICE_OVER_RE.captures(query) {
        let whole = caps.get(0).unwrap();
        let amount = parse_amount(&caps[1], caps.get(2).is_some())?;
        return Some(Hint {
            value: PriceHint { max: None, min: Some(amount) },
            span: (whole.start(), whole.end()),
        });
    }
    None
}

/// A mileage ceiling implied by phrasing like "low mileage" or "under 50k
/// miles".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MileageHint {
    pub max: Option<i32>,
}

/// The "low mileage" hint has no upstream-defined threshold; this
/// value mirrors `findmycar`'s informal convention for the phrase.
const LOW_MILEAGE_CEILING: i32 = 60_000;

static LOW_MILEAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\blow\s+mileage\b").unwrap());
static MILEAGE_UNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:under|below|less than)\s*([\d,]+)\s*(k)?\s*mi(?:les?)?\b").unwrap());

/// Parses a mileage hint. "low mileage" implies a fixed ceiling; an
/// explicit "under N miles"/"under Nk miles" phrase takes precedence when
/// both are present, since it carries an exact number.
pub fn extract_mileage_hint(query: &str) -> Option<Hint<MileageHint>> {
    if let Some(caps) = MILEAGE_UNDER_RE.captures(query) {
        let whole = caps.get(0).unwrap();
        let amount = parse_amount(&caps[1], caps.get(2).is_some())? as i32;
        return Some(Hint {
            value: MileageHint { max: Some(amount) },
            span: (whole.start(), whole.end()),
        });
    }
    if let Some(found) = LOW_MILEAGE_RE.find(query) {
        return Some(Hint {
            value: MileageHint { max: Some(LOW_MILEAGE_CEILING) },
            span: (found.start(), found.end()),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_year_in_range() {
        let hint = extract_year("1995 civic", 2026).unwrap();
        assert_eq!(hint.value, 1995);
    }

    #[test]
    fn ignores_year_outside_range() {
        assert!(extract_year("1980 civic", 2026).is_none());
        assert!(extract_year("2099 civic", 2026).is_none());
    }

    #[test]
    fn extracts_under_price_in_thousands() {
        let hint = extract_price_hint("civic under $25k").unwrap();
        assert_eq!(hint.value, PriceHint { max: Some(25_000), min: None });
    }

    #[test]
    fn extracts_over_price_plain_number() {
        let hint = extract_price_hint("civic over 30000").unwrap();
        assert_eq!(hint.value, PriceHint { max: None, min: Some(30_000) });
    }

    #[test]
    fn extracts_low_mileage_phrase() {
        let hint = extract_mileage_hint("low mileage civic").unwrap();
        assert_eq!(hint.value.max, Some(LOW_MILEAGE_CEILING));
    }

    #[test]
    fn explicit_mileage_number_beats_low_mileage_phrasing() {
        let hint = extract_mileage_hint("under 45k miles").unwrap();
        assert_eq!(hint.value.max, Some(45_000));
    }
}
