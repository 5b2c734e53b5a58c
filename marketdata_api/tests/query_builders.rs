use chrono::NaiveDate;
use marketdata_api::{ChartQuery, ChartSpan, Interval, Query, Range};
use url::Url;

fn base_url() -> Url {
    Url::parse("https://example.com").unwrap()
}

#[test]
fn chart_query_defaults_to_daily_bars() {
    let url = ChartQuery::range(Range::OneYear).add_to_url(&base_url());
    let query = url.query().unwrap();
    assert!(query.contains("range=1y"));
    assert!(query.contains("interval=1d"));
    assert!(query.contains("includePrePost=false"));
}

#[test]
fn chart_query_between_uses_unix_seconds() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let url = ChartQuery::between(start, end).add_to_url(&base_url());
    let query = url.query().unwrap();
    assert!(query.contains("period1=1704067200"));
    assert!(query.contains("period2=1704153600"));
    assert!(!query.contains("range="));
}

#[test]
fn chart_query_interval_variants() {
    for (interval, expected) in [
        (Interval::OneDay, "interval=1d"),
        (Interval::OneWeek, "interval=1wk"),
        (Interval::OneMonth, "interval=1mo"),
    ] {
        let url = ChartQuery::range(Range::Max)
            .with_interval(interval)
            .add_to_url(&base_url());
        assert!(url.query().unwrap().contains(expected));
    }
}

#[test]
fn chart_query_since_keeps_open_end() {
    let start = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap();
    let query = ChartQuery::since(start);
    assert_eq!(query.span, ChartSpan::Between { start, end: None });
}

#[test]
fn interval_parse_rejects_unknown() {
    assert_eq!("1WK".parse::<Interval>().unwrap(), Interval::OneWeek);
    let err = "5m".parse::<Interval>().unwrap_err();
    assert!(err.contains("Valid intervals"));
}
