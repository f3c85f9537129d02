use crate::model::{LagValue, MissingReason, Table};
use crate::table::ResolvedColumn;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

static CUTOFF_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}[A-Za-z]{3})(\d{2})[*†‡\s]*$").expect("cutoff token regex must compile")
});

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnavailablePolicy {
    #[default]
    Missing,
    Zero,
}

pub fn compute_lags(
    table: &Table,
    column: &ResolvedColumn,
    base_date: NaiveDate,
    policy: UnavailablePolicy,
) -> BTreeMap<String, LagValue> {
    let mut lags = BTreeMap::new();

    for (label, raw) in table.column_values(column.index) {
        let value = lag_value(raw, base_date, policy);
        debug!(category = label, raw, ?value, "lag computed");
        lags.insert(label.to_string(), value);
    }

    lags
}

pub fn lag_value(raw: &str, base_date: NaiveDate, policy: UnavailablePolicy) -> LagValue {
    match raw.trim() {
        "C" => LagValue::Current,
        "U" => match policy {
            UnavailablePolicy::Missing => LagValue::missing(MissingReason::Unavailable),
            UnavailablePolicy::Zero => LagValue::Current,
        },
        other => match parse_cutoff_date(other) {
            Some(cutoff) => LagValue::Days {
                days: (base_date - cutoff).num_days(),
            },
            None => LagValue::missing(MissingReason::Unparseable),
        },
    }
}

/// Parses a `01JAN20` style cut-off date. Footnote markers after the date
/// are ignored.
pub fn parse_cutoff_date(raw: &str) -> Option<NaiveDate> {
    let caps = CUTOFF_TOKEN.captures(raw.trim())?;
    let day_month = caps.get(1)?.as_str();
    let yy = caps.get(2)?.as_str().parse::<i32>().ok()?;
    let year = expand_two_digit_year(yy);
    NaiveDate::parse_from_str(&format!("{day_month}{year}"), "%d%b%Y").ok()
}

// POSIX pivot: 69..=99 are 19xx, 00..=68 are 20xx.
fn expand_two_digit_year(yy: i32) -> i32 {
    if yy <= 68 { 2000 + yy } else { 1900 + yy }
}
