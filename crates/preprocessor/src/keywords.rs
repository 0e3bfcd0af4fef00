//! Brand/model keyword recognition, the second sub-step of query pre-processing.
//!
//! A small fixed table of makes and their common models, matched
//! case-insensitively as whole words against the query. This is
//! intentionally narrow: it exists to seed `FilterSet::make`/`model` from a
//! free-text query, not to normalize upstream listing attributes (that is
//! adapter territory, out of scope here).

/// One make and the model names recognized under it.
struct MakeEntry {
    make: &'static str,
    models: &'static [&'static str],
}

const MAKES: &[MakeEntry] = &[
    MakeEntry { make: "Honda", models: &["Civic", "Accord", "S2000", "Integra", "CR-V", "Pilot", "Fit"] },
    MakeEntry { make: "Acura", models: &["RSX", "Integra", "TSX", "TL", "NSX", "MDX"] },
    MakeEntry { make: "Toyota", models: &["Corolla", "Supra", "MR2", "86", "Camry", "Tacoma", "4Runner", "Land Cruiser"] },
    MakeEntry { make: "Nissan", models: &["240SX", "Silvia", "Skyline", "GT-R", "300ZX", "350Z", "370Z", "Altima", "Maxima"] },
    MakeEntry { make: "Mazda", models: &["Miata", "MX-5", "RX-7", "RX-8", "3", "6", "CX-5"] },
    MakeEntry { make: "Subaru", models: &["Impreza", "WRX", "STI", "BRZ", "Outback", "Forester"] },
    MakeEntry { make: "Mitsubishi", models: &["Lancer", "Evolution", "Eclipse", "3000GT"] },
    MakeEntry { make: "BMW", models: &["3 Series", "M3", "5 Series", "M5", "Z3", "Z4"] },
    MakeEntry { make: "Ford", models: &["Mustang", "F-150", "Focus", "Escort"] },
    MakeEntry { make: "Chevrolet", models: &["Camaro", "Corvette", "Silverado"] },
    MakeEntry { make: "Volkswagen", models: &["Golf", "GTI", "Jetta", "Passat"] },
    MakeEntry { make: "Porsche", models: &["911", "Cayman", "Boxster"] },
];

/// A make/model match plus the matched text's byte span in the original
/// (not upper-cased) query, so callers can strip it from the residual text.
pub struct KeywordMatch {
    pub make: String,
    pub model: Option<String>,
    pub spans: Vec<(usize, usize)>,
}

fn find_word(haystack_upper: &str, needle_upper: &str) -> Option<(usize, usize)> {
    let mut start = 0;
    while let Some(offset) = haystack_upper[start..].find(needle_upper) {
        let idx = start + offset;
        let end = idx + needle_upper.len();
        let before_ok = idx == 0 || !haystack_upper.as_bytes()[idx - 1].is_ascii_alphanumeric();
        let after_ok = end == haystack_upper.len() || !haystack_upper.as_bytes()[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return Some((idx, end));
        }
        start = idx + 1;
    }
    None
}

/// Recognizes at most one make and, if present, one of its models in
/// `query`. Models are only matched once a make is found, mirroring how a
/// shopper phrases "Honda Civic" rather than a bare model name that could
/// collide across makes (e.g. "3" for Mazda vs. BMW "3 Series").
pub fn recognize(query: &str) -> Option<KeywordMatch> {
    let upper = query.to_uppercase();
    for entry in MAKES {
        let make_upper = entry.make.to_uppercase();
        if let Some(make_span) = find_word(&upper, &make_upper) {
            let mut spans = vec![make_span];
            let mut model = None;
            for candidate in entry.models {
                let candidate_upper = candidate.to_uppercase();
                if let Some(model_span) = find_word(&upper, &candidate_upper) {
                    model = Some((*candidate).to_string());
                    spans.push(model_span);
                    break;
                }
            }
            return Some(KeywordMatch {
                make: entry.make.to_string(),
                model,
                spans,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_make_and_model() {
        let found = recognize("clean honda civic for sale").unwrap();
        assert_eq!(found.make, "Honda");
        assert_eq!(found.model.as_deref(), Some("Civic"));
    }

    #[test]
    fn recognizes_make_without_model() {
        let found = recognize("any BMW under 20k").unwrap();
        assert_eq!(found.make, "BMW");
        assert!(found.model.is_none());
    }

    #[test]
    fn does_not_match_substring_inside_another_word() {
        assert!(recognize("fiesta economica").is_none());
    }

    #[test]
    fn no_match_returns_none() {
        assert!(recognize("low mileage daily driver").is_none());
    }
}
