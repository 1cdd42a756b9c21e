//! Record Normalization Module
//!
//! Turns raw scraped rows into typed `ListingRecord`s:
//! - Strips currency symbols, units and locale thousands separators
//! - Extracts the registration year and engine power (kW)
//! - Canonicalizes listing URLs so repeated scrapes share one identifier
//!
//! A field that cannot be parsed becomes `None`; the record is always kept.

use crate::types::{ListingRecord, RawListing};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Horsepower per kilowatt
pub const HP_PER_KW: f64 = 1.341022;

/// Query parameters the marketplace appends per result page / sort order
const TRACKING_PARAMS: &[&str] = &[
    "utm_source", "utm_medium", "utm_campaign", "utm_term", "utm_content",
    "gclid", "fbclid", "msclkid",
    "source", "position", "search_id", "searchid", // list position tracking
    "ipc", "ipl",                                   // in-page click tracking
];

const ID_KEYS: &[&str] = &["id", "listing_id"];
const URL_KEYS: &[&str] = &["url", "link"];
const BRAND_KEYS: &[&str] = &["make", "brand"];
const MODEL_KEYS: &[&str] = &["model"];
const PRICE_KEYS: &[&str] = &["price"];
const MILEAGE_KEYS: &[&str] = &["mileage", "km"];
const YEAR_KEYS: &[&str] = &["year", "first_registration", "registration"];
const POWER_KEYS: &[&str] = &["power"];
const BODY_KEYS: &[&str] = &["body_type", "body"];
const FUEL_KEYS: &[&str] = &["fuel_type", "fuel"];
const SEAT_KEYS: &[&str] = &["seats"];
const IMAGE_KEYS: &[&str] = &["img_url", "image_url", "image"];

fn number_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:[.,'\s]\d+)*").expect("valid number pattern"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("valid year pattern"))
}

fn kw_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*kw\b").expect("valid kW pattern"))
}

fn hp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:hp|bhp|ps|cv)\b").expect("valid hp pattern")
    })
}

fn seats_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,2}").expect("valid seats pattern"))
}

/// Normalize every row of one scraped set, preserving order.
pub fn normalize_listings(raws: &[RawListing]) -> Vec<ListingRecord> {
    raws.iter().map(normalize_listing).collect()
}

/// Normalize a single scraped row.
pub fn normalize_listing(raw: &RawListing) -> ListingRecord {
    let url = raw.get(URL_KEYS).unwrap_or_default().to_string();
    let brand = clean_text(raw.get(BRAND_KEYS)).unwrap_or_default();
    let model = clean_text(raw.get(MODEL_KEYS)).unwrap_or_default();

    let price = numeric_field(raw, "price", PRICE_KEYS, parse_whole_number);
    let mileage = numeric_field(raw, "mileage", MILEAGE_KEYS, parse_whole_number);
    let year = numeric_field(raw, "year", YEAR_KEYS, parse_year);
    let power_kw = numeric_field(raw, "power", POWER_KEYS, parse_power_kw);
    let seats = numeric_field(raw, "seats", SEAT_KEYS, parse_seats);

    let id = match raw.get(ID_KEYS) {
        Some(id) => id.to_string(),
        None if !url.is_empty() => canonical_url(&url),
        None => content_signature(&brand, &model, price, mileage, year),
    };

    ListingRecord {
        id,
        brand,
        model,
        price,
        mileage,
        year,
        power_kw,
        body_type: clean_text(raw.get(BODY_KEYS)),
        fuel_type: clean_text(raw.get(FUEL_KEYS)),
        seats,
        image_url: clean_text(raw.get(IMAGE_KEYS)),
        url,
    }
}

fn numeric_field<T>(
    raw: &RawListing,
    field: &'static str,
    keys: &[&str],
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    let value = raw.get(keys)?;
    let parsed = parse(value);
    if parsed.is_none() {
        debug!(field, value, "Unparseable numeric field, treating as unknown");
    }
    parsed
}

/// Parse a whole amount such as a price or mileage.
///
/// Handles `€ 18.990,-`, `12,345 km`, `9 999 €`, `18,990.50`. A single
/// separator followed by exactly three digits groups thousands, and only after
/// a leading group of at most three digits. Any other group ends the number,
/// so a decimal fraction is dropped and `15000 2 owners` stays 15000.
pub fn parse_whole_number(text: &str) -> Option<u32> {
    let run = number_run_re().find(text)?.as_str();
    let mut groups = run.split(|c: char| !c.is_ascii_digit());

    let mut digits = groups.next()?.to_string();
    if digits.len() <= 3 {
        for group in groups {
            if group.len() != 3 {
                break;
            }
            digits.push_str(group);
        }
    }
    digits.parse::<u64>().ok().and_then(|n| u32::try_from(n).ok())
}

/// Registration year from `2021`, `05/2021`, `2021-05` and the like.
pub fn parse_year(text: &str) -> Option<i32> {
    year_re()
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Engine power in kW. Prefers an explicit kW figure, converts hp/PS,
/// and reads a bare number as kW.
pub fn parse_power_kw(text: &str) -> Option<u32> {
    if let Some(caps) = kw_re().captures(text) {
        return parse_decimal(&caps[1]).map(|kw| kw.round() as u32);
    }
    if let Some(caps) = hp_re().captures(text) {
        return parse_decimal(&caps[1]).map(|hp| (hp / HP_PER_KW).round() as u32);
    }
    parse_whole_number(text)
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_seats(text: &str) -> Option<u8> {
    seats_re()
        .find(text)
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|seats| *seats > 0)
}

fn clean_text(value: Option<&str>) -> Option<String> {
    let cleaned = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Fallback identifier for rows without an id or URL.
fn content_signature(
    brand: &str,
    model: &str,
    price: Option<u32>,
    mileage: Option<u32>,
    year: Option<i32>,
) -> String {
    fn part<T: ToString>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }
    format!(
        "{}|{}|{}|{}|{}",
        brand.to_lowercase(),
        model.to_lowercase(),
        part(price),
        part(mileage),
        part(year)
    )
}

/// Canonical form of a listing URL.
///
/// 1. Force HTTPS
/// 2. Lowercase hostname
/// 3. Drop fragment and tracking parameters
/// 4. Remove trailing slash on non-root paths
/// 5. Sort remaining query parameters
pub fn canonical_url(url: &str) -> String {
    let url = url.trim();
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    let scheme = if scheme.eq_ignore_ascii_case("http") {
        "https".to_string()
    } else {
        scheme.to_lowercase()
    };

    let rest = rest.split('#').next().unwrap_or_default();
    let (host_path, query) = match rest.split_once('?') {
        Some((host_path, query)) => (host_path, Some(query)),
        None => (rest, None),
    };
    let (host, path) = match host_path.find('/') {
        Some(pos) => host_path.split_at(pos),
        None => (host_path, "/"),
    };
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    let mut params: Vec<(String, &str)> = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = key.to_lowercase();
            if key.is_empty() || TRACKING_PARAMS.contains(&key.as_str()) {
                None
            } else {
                Some((key, value))
            }
        })
        .collect();
    params.sort();

    let mut canonical = format!("{}://{}{}", scheme, host.to_lowercase(), path);
    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(k, v)| if v.is_empty() { k.clone() } else { format!("{}={}", k, v) })
            .collect::<Vec<_>>()
            .join("&");
        canonical.push('?');
        canonical.push_str(&query);
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawListing {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_parse_whole_number_locale_formats() {
        assert_eq!(parse_whole_number("€ 18.990,-"), Some(18990));
        assert_eq!(parse_whole_number("12,345 km"), Some(12345));
        assert_eq!(parse_whole_number("9 999 €"), Some(9999));
        assert_eq!(parse_whole_number("9\u{a0}999 €"), Some(9999));
        assert_eq!(parse_whole_number("18,990.50"), Some(18990));
        assert_eq!(parse_whole_number("CHF 21'500.-"), Some(21500));
        assert_eq!(parse_whole_number("15000"), Some(15000));
    }

    #[test]
    fn test_parse_whole_number_keeps_separate_numbers_apart() {
        assert_eq!(parse_whole_number("15000 2 owners"), Some(15000));
        assert_eq!(parse_whole_number("45.000 km 2 owners"), Some(45000));
        assert_eq!(parse_whole_number("15000 200 km"), Some(15000));
        assert_eq!(parse_whole_number("1 2345"), Some(1));
        assert_eq!(parse_whole_number("1.234.567"), Some(1234567));
    }

    #[test]
    fn test_parse_whole_number_malformed() {
        assert_eq!(parse_whole_number(""), None);
        assert_eq!(parse_whole_number("Price on request"), None);
        assert_eq!(parse_whole_number("99999999999"), None);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2021"), Some(2021));
        assert_eq!(parse_year("05/2021"), Some(2021));
        assert_eq!(parse_year("2019-11"), Some(2019));
        assert_eq!(parse_year("new"), None);
        assert_eq!(parse_year("12345"), None);
    }

    #[test]
    fn test_parse_power() {
        assert_eq!(parse_power_kw("110 kW (150 hp)"), Some(110));
        assert_eq!(parse_power_kw("110kW"), Some(110));
        assert_eq!(parse_power_kw("150 hp"), Some(112));
        assert_eq!(parse_power_kw("150 PS"), Some(112));
        assert_eq!(parse_power_kw("85"), Some(85));
        assert_eq!(parse_power_kw("- kW"), None);
    }

    #[test]
    fn test_parse_seats() {
        assert_eq!(parse_seats("5"), Some(5));
        assert_eq!(parse_seats("7 seats"), Some(7));
        assert_eq!(parse_seats("0"), None);
        assert_eq!(parse_seats("n/a"), None);
    }

    #[test]
    fn test_canonical_url_https() {
        assert_eq!(
            canonical_url("http://www.autoscout24.com/offers/x"),
            "https://www.autoscout24.com/offers/x"
        );
    }

    #[test]
    fn test_canonical_url_lowercase_host() {
        assert_eq!(
            canonical_url("https://WWW.AutoScout24.com/Offers/Skoda"),
            "https://www.autoscout24.com/Offers/Skoda"
        );
    }

    #[test]
    fn test_canonical_url_drops_position_tracking() {
        let by_price = canonical_url(
            "https://www.autoscout24.com/offers/skoda-octavia-abc?source=list&position=3&search_id=x1",
        );
        let by_age = canonical_url(
            "https://www.autoscout24.com/offers/skoda-octavia-abc?position=17&source=list&ipc=recommendation",
        );
        assert_eq!(by_price, "https://www.autoscout24.com/offers/skoda-octavia-abc");
        assert_eq!(by_price, by_age);
    }

    #[test]
    fn test_canonical_url_trailing_slash_and_fragment() {
        assert_eq!(canonical_url("https://example.com/path/#gallery"), "https://example.com/path");
        assert_eq!(canonical_url("https://example.com/"), "https://example.com/");
        assert_eq!(canonical_url("https://example.com"), "https://example.com/");
    }

    #[test]
    fn test_canonical_url_sorts_params() {
        assert_eq!(
            canonical_url("https://example.com/a?b=2&a=1"),
            canonical_url("https://example.com/a?a=1&b=2")
        );
    }

    #[test]
    fn test_canonical_url_without_scheme_is_unchanged() {
        assert_eq!(canonical_url(" listing-42 "), "listing-42");
    }

    #[test]
    fn test_normalize_listing_typed_fields() {
        let record = normalize_listing(&raw(&[
            ("make", "  Skoda "),
            ("model", "Octavia  Combi"),
            ("price", "€ 17.450,-"),
            ("mileage", "48,200 km"),
            ("year", "03/2021"),
            ("power", "110 kW (150 hp)"),
            ("body_type", "Station wagon"),
            ("fuel_type", "Diesel"),
            ("seats", "5"),
            ("img_url", "https://img.example/1.jpg"),
            ("url", "https://www.autoscout24.com/offers/octavia-1?position=2"),
        ]));
        assert_eq!(record.id, "https://www.autoscout24.com/offers/octavia-1");
        assert_eq!(record.brand, "Skoda");
        assert_eq!(record.model, "Octavia Combi");
        assert_eq!(record.price, Some(17450));
        assert_eq!(record.mileage, Some(48200));
        assert_eq!(record.year, Some(2021));
        assert_eq!(record.power_kw, Some(110));
        assert_eq!(record.seats, Some(5));
        assert_eq!(record.body_type.as_deref(), Some("Station wagon"));
        assert_eq!(record.image_url.as_deref(), Some("https://img.example/1.jpg"));
    }

    #[test]
    fn test_normalize_listing_malformed_fields_become_unknown() {
        let record = normalize_listing(&raw(&[
            ("id", "L7"),
            ("make", "Ford"),
            ("model", "Focus"),
            ("price", "on request"),
            ("mileage", ""),
            ("year", "new"),
        ]));
        assert_eq!(record.id, "L7");
        assert_eq!(record.price, None);
        assert_eq!(record.mileage, None);
        assert_eq!(record.year, None);
        assert_eq!(record.power_kw, None);
        assert_eq!(record.url, "");
    }

    #[test]
    fn test_explicit_id_wins_over_url() {
        let record = normalize_listing(&raw(&[("id", "abc-1"), ("url", "https://x.com/o/1")]));
        assert_eq!(record.id, "abc-1");
        assert_eq!(record.url, "https://x.com/o/1");
    }

    #[test]
    fn test_signature_fallback_without_id_or_url() {
        let a = normalize_listing(&raw(&[("make", "BMW"), ("model", "320"), ("price", "20000")]));
        let b = normalize_listing(&raw(&[("make", "bmw"), ("model", "320"), ("price", "20.000")]));
        assert_eq!(a.id, "bmw|320|20000||");
        assert_eq!(a.id, b.id);
    }
}
