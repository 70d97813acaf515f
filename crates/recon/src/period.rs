//! Period tags.
//!
//! A tag is whatever text the extract carried in its period column. Tags that
//! read as a calendar month (`202405`, `2024-05`, `2024/05`, `05/2024`,
//! `05-2024`, `05_2024`) order chronologically; anything else orders
//! lexicographically and before every month tag, so an empty seed period is
//! always the oldest.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodTag(String);

impl PeriodTag {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    /// Current month rendered with a chrono format string (`%m/%Y` by default).
    pub fn current(format: &str) -> Self {
        Self::new(chrono::Local::now().format(format).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(year, month)` when the tag reads as a calendar month.
    pub fn month(&self) -> Option<(i32, u32)> {
        parse_month(&self.0).map(|d| (d.year(), d.month()))
    }

    /// True when both tags name the same month (`202405` and `05/2024`),
    /// or are textually equal.
    pub fn same_period(&self, other: &PeriodTag) -> bool {
        match (self.month(), other.month()) {
            (Some(a), Some(b)) => a == b,
            _ => self.0 == other.0,
        }
    }

    /// Column-safe form: every non-alphanumeric character becomes `_`.
    pub fn column_suffix(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }

    /// `MM{sep}YYYY` for month tags, the raw text otherwise.
    pub fn display_with(&self, sep: &str) -> String {
        match self.month() {
            Some((year, month)) => format!("{month:02}{sep}{year:04}"),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for PeriodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeriodTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PeriodTag {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Ord for PeriodTag {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.month(), other.month()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for PeriodTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn parse_month(raw: &str) -> Option<NaiveDate> {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if raw.len() == 6 && all_digits(raw) {
        let year = raw[..4].parse().ok()?;
        let month = raw[4..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    let (left, right) = raw.split_once(['-', '/', '_'])?;
    if !all_digits(left) || !all_digits(right) {
        return None;
    }
    let (year, month) = match (left.len(), right.len()) {
        (4, 1..=2) => (left, right),
        (1..=2, 4) => (right, left),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_shapes() {
        for raw in ["202405", "2024-05", "2024/5", "05/2024", "05-2024", "5_2024"] {
            assert_eq!(PeriodTag::new(raw).month(), Some((2024, 5)), "{raw}");
        }
        for raw in ["", "P1", "13/2024", "2024", "05/24", "05/2024/01"] {
            assert_eq!(PeriodTag::new(raw).month(), None, "{raw}");
        }
    }

    #[test]
    fn chronological_order_across_shapes() {
        let mut tags: Vec<PeriodTag> = ["202406", "", "12/2023", "P1", "2024-01"]
            .into_iter()
            .map(PeriodTag::from)
            .collect();
        tags.sort();
        let sorted: Vec<&str> = tags.iter().map(|t| t.as_str()).collect();
        assert_eq!(sorted, vec!["", "P1", "12/2023", "2024-01", "202406"]);
    }

    #[test]
    fn lexicographic_year_trap() {
        // "01/2025" < "12/2024" as text, but not as months
        assert!(PeriodTag::new("01/2025") > PeriodTag::new("12/2024"));
    }

    #[test]
    fn suffix_and_display() {
        let tag = PeriodTag::new("05/2024");
        assert_eq!(tag.column_suffix(), "05_2024");
        assert_eq!(tag.display_with("-"), "05-2024");
        assert_eq!(PeriodTag::new("202405").display_with("/"), "05/2024");
        assert_eq!(PeriodTag::new("P1").display_with("/"), "P1");
    }

    #[test]
    fn same_period_across_shapes() {
        assert!(PeriodTag::new("202405").same_period(&PeriodTag::new("05/2024")));
        assert!(!PeriodTag::new("202405").same_period(&PeriodTag::new("06/2024")));
        assert!(PeriodTag::new("P1").same_period(&PeriodTag::new("P1")));
    }

    #[test]
    fn current_uses_format() {
        let tag = PeriodTag::current("%Y%m");
        assert!(tag.month().is_some());
    }
}
