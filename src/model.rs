use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

const MONTH_SLUGS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BulletinMonth {
    pub year: i32,
    pub month: u32,
}

impl BulletinMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(Self { year, month })
    }

    pub fn grid(start_year: i32, end_year: i32) -> Vec<BulletinMonth> {
        (start_year..end_year)
            .flat_map(|year| (1..=12).map(move |month| BulletinMonth { year, month }))
            .collect()
    }

    pub fn base_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn label(&self) -> String {
        self.base_date()
            .map(|d| d.format("%b %Y").to_string())
            .unwrap_or_else(|| format!("{:02} {}", self.month, self.year))
    }

    pub fn month_slug(&self) -> &'static str {
        MONTH_SLUGS[(self.month.clamp(1, 12) - 1) as usize]
    }

    /// Bulletins for October through December are filed under the next
    /// fiscal year.
    pub fn fiscal_year(&self) -> i32 {
        if self.month >= 10 {
            self.year + 1
        } else {
            self.year
        }
    }

    pub fn alternate_fiscal_year(&self) -> i32 {
        if self.month >= 10 {
            self.year
        } else {
            self.year + 1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table, truncating the header to the first row's width.
    /// Returns `None` when there are no data rows.
    pub fn new(mut columns: Vec<String>, rows: Vec<Vec<String>>) -> Option<Self> {
        let width = rows.first()?.len();
        columns.truncate(width);
        Some(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    pub fn row_label(&self, row: usize) -> Option<&str> {
        self.cell(row, 0)
    }

    pub fn column_values(&self, column: usize) -> Vec<(&str, &str)> {
        (0..self.rows.len())
            .filter_map(|row| Some((self.row_label(row)?, self.cell(row, column)?)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    Unavailable,
    Unparseable,
    NoCategory,
    NoColumn,
    NoTable,
    FetchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LagValue {
    Current,
    Days { days: i64 },
    Missing { reason: MissingReason },
}

impl LagValue {
    pub fn missing(reason: MissingReason) -> Self {
        LagValue::Missing { reason }
    }

    pub fn days(&self) -> Option<i64> {
        match self {
            LagValue::Current => Some(0),
            LagValue::Days { days } => Some(*days),
            LagValue::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, LagValue::Missing { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LagSeries {
    pub month_axis: Vec<String>,
    pub series: BTreeMap<String, Vec<LagValue>>,
}

impl LagSeries {
    pub fn is_empty(&self) -> bool {
        self.month_axis.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub months_attempted: usize,
    pub pages_obtained: usize,
    pub tables_located: usize,
    pub columns_resolved: usize,
    pub fallback_columns: usize,
    pub values_computed: usize,
    pub values_missing: usize,
    pub network_fetches: usize,
    pub cache_hits: usize,
}
