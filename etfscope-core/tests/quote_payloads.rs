//! Twelve Data payload parsing against recorded responses.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use etfscope_core::data::DataError;
use etfscope_core::quote::twelve_data::{parse_quote, parse_time_series, seconds_to_next_minute};
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 20, 15, 45).unwrap()
}

#[test]
fn recorded_quote() {
    let q = parse_quote("QQQ", &fixture("quote_qqq.json"), now()).unwrap();
    assert_eq!(q.close, 454.62);
    assert_eq!(q.change, Some(4.62));
    assert!((q.change_ratio.unwrap() - 0.0102667).abs() < 1e-9);
}

#[test]
fn recorded_series_is_oldest_first_without_bad_points() {
    let points = parse_time_series("QQQ", &fixture("time_series_qqq.json"), now()).unwrap();
    let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 5, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 30).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        ]
    );
    assert_eq!(points.last().unwrap().price, 454.62);
}

#[test]
fn recorded_rate_limit() {
    let body = fixture("rate_limited.json");
    for result in [
        parse_quote("QQQ", &body, now()).map(|_| ()),
        parse_time_series("QQQ", &body, now()).map(|_| ()),
    ] {
        match result {
            Err(DataError::RateLimited { retry_after_secs }) => assert_eq!(retry_after_secs, 15),
            other => panic!("expected rate limit, got {other:?}"),
        }
    }
    assert_eq!(seconds_to_next_minute(now()), 15);
}

#[test]
fn recorded_unknown_symbol() {
    let err = parse_quote("ZZZZZ", &fixture("symbol_not_found.json"), now()).unwrap_err();
    assert!(matches!(err, DataError::SymbolNotFound { ref symbol } if symbol == "ZZZZZ"));
}

#[test]
fn non_json_body_is_a_format_change() {
    let err = parse_quote("QQQ", "<html>maintenance</html>", now()).unwrap_err();
    assert!(matches!(err, DataError::ResponseFormatChanged(_)));
}
