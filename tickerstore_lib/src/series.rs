//! Date-ordered closing price series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day's closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Closing prices sorted ascending by date, one entry per date.
///
/// The only way to build a non-empty series is [`PriceSeries::from_points`],
/// which enforces the ordering and uniqueness.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorts by date and collapses duplicate dates, keeping the last value
    /// seen for each. Non-finite closes are dropped.
    pub fn from_points(points: impl IntoIterator<Item = PricePoint>) -> Self {
        let mut raw: Vec<PricePoint> = points
            .into_iter()
            .filter(|p| p.close.is_finite())
            .collect();
        // stable: later duplicates stay after earlier ones
        raw.sort_by_key(|p| p.date);

        let mut out: Vec<PricePoint> = Vec::with_capacity(raw.len());
        for point in raw {
            match out.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => out.push(point),
            }
        }
        Self { points: out }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn sorts_ascending() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 1, 3), 3.0),
            PricePoint::new(d(2024, 1, 1), 1.0),
            PricePoint::new(d(2024, 1, 2), 2.0),
        ]);
        let dates: Vec<NaiveDate> = series.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)]);
        assert_eq!(series.first_date(), Some(d(2024, 1, 1)));
        assert_eq!(series.last_date(), Some(d(2024, 1, 3)));
    }

    #[test]
    fn duplicate_dates_keep_last_value() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 1, 2), 10.0),
            PricePoint::new(d(2024, 1, 1), 1.0),
            PricePoint::new(d(2024, 1, 2), 11.0),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[1], PricePoint::new(d(2024, 1, 2), 11.0));
    }

    #[test]
    fn non_finite_closes_dropped() {
        let series = PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 1, 1), f64::NAN),
            PricePoint::new(d(2024, 1, 2), f64::INFINITY),
            PricePoint::new(d(2024, 1, 3), 5.5),
        ]);
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].close, 5.5);
    }

    #[test]
    fn empty_series() {
        let series = PriceSeries::new();
        assert!(series.is_empty());
        assert_eq!(series.first_date(), None);
        assert_eq!(PriceSeries::from_points(Vec::new()), series);
    }
}
