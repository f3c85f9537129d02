use crate::model::Table;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

pub const DEFAULT_TABLE_IDENTIFIER: &str = "Employment-based";
pub const DEFAULT_FALLBACK_COLUMN: &str = "All Chargeability Areas Except Those Listed";

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector must parse"));
static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("row selector must parse"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("cell selector must parse"));
static HEADER_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("header cell selector must parse"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no table with header matching '{identifier}'")]
    TableNotFound { identifier: String },
    #[error("table matching '{identifier}' has no data rows")]
    EmptyTable { identifier: String },
    #[error("neither '{target}' nor '{fallback}' matches a column")]
    ColumnNotFound { target: String, fallback: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub name: String,
    pub index: usize,
    pub via_fallback: bool,
}

pub fn locate_table(document: &Html, identifier: &str) -> Result<Table, ExtractError> {
    let needle = identifier.to_lowercase();

    for (position, table) in document.select(&TABLE).enumerate() {
        let header_text = header_text(table);
        if !header_text.to_lowercase().contains(&needle) {
            continue;
        }

        debug!(position, identifier, "table header matched");
        return materialize(table).ok_or_else(|| ExtractError::EmptyTable {
            identifier: identifier.to_string(),
        });
    }

    Err(ExtractError::TableNotFound {
        identifier: identifier.to_string(),
    })
}

pub fn locate_table_in_html(html: &str, identifier: &str) -> Result<Table, ExtractError> {
    let document = Html::parse_document(html);
    locate_table(&document, identifier)
}

pub fn resolve_column(
    table: &Table,
    target: &str,
    fallback: &str,
) -> Result<ResolvedColumn, ExtractError> {
    if let Some(index) = match_column(table.columns(), target) {
        return Ok(ResolvedColumn {
            name: table.columns()[index].clone(),
            index,
            via_fallback: false,
        });
    }

    debug!(target, fallback, "target column absent; trying fallback");
    match_column(table.columns(), fallback)
        .map(|index| ResolvedColumn {
            name: table.columns()[index].clone(),
            index,
            via_fallback: true,
        })
        .ok_or_else(|| ExtractError::ColumnNotFound {
            target: target.to_string(),
            fallback: fallback.to_string(),
        })
}

// Exact name, then a word starting with the label, then any substring; each
// pass scans columns in declared order. The middle pass keeps `IN` on INDIA
// rather than CHINA.
fn match_column(columns: &[String], label: &str) -> Option<usize> {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        return None;
    }

    let lowered = columns.iter().map(|c| c.to_lowercase()).collect::<Vec<_>>();
    lowered
        .iter()
        .position(|c| *c == label)
        .or_else(|| {
            lowered.iter().position(|c| {
                c.split(|ch: char| !ch.is_alphanumeric())
                    .any(|word| word.starts_with(&label))
            })
        })
        .or_else(|| lowered.iter().position(|c| c.contains(&label)))
}

// Rows carrying a <th> count as header rows; tables built only from <td>
// use their first row.
fn header_text(table: ElementRef<'_>) -> String {
    let rows = table.select(&ROW).collect::<Vec<_>>();
    let mut header_rows = rows
        .iter()
        .filter(|row| row.select(&HEADER_CELL).next().is_some())
        .copied()
        .collect::<Vec<_>>();
    if header_rows.is_empty() {
        header_rows.extend(rows.first().copied());
    }

    header_rows
        .into_iter()
        .flat_map(row_cells)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn materialize(table: ElementRef<'_>) -> Option<Table> {
    let mut rows = table.select(&ROW).map(row_cells);
    let columns = rows.next()?;
    let data = rows.filter(|cells| !cells.is_empty()).collect::<Vec<_>>();
    Table::new(columns, data)
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.select(&CELL).map(cell_text).collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
