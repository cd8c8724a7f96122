//! Locates tracked courses in the tables of a rendered page and reads
//! their seat counts.
//!
//! Matching is deliberately simple. The first table row (in document order)
//! whose text contains the course code, and that has a cell equal to the
//! section when one is given, wins. The seat column comes from a header
//! labelled "seat"/"available"; without one the last numeric cell of the
//! row is used.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::models::{compact_upper, CheckResult, Course};

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr").expect("valid row selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("valid cell selector"));
static HEADER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("thead th").expect("valid header selector"));

const SEAT_HEADER_HINTS: [&str; 2] = ["seat", "available"];

/// One non-empty table row, with trimmed cell text.
#[derive(Debug, Clone)]
pub struct TableRow<'a> {
    pub cells: Vec<String>,
    normalized_text: String,
    table: Option<ElementRef<'a>>,
}

impl<'a> TableRow<'a> {
    fn from_element(row: ElementRef<'a>) -> Option<Self> {
        let cells: Vec<String> = row.select(&CELL_SELECTOR).map(|cell| cell_text(&cell)).collect();
        if cells.is_empty() {
            return None;
        }

        Some(Self {
            normalized_text: compact_upper(&cells.join(" ")),
            table: enclosing_table(row),
            cells,
        })
    }

    fn matches(&self, code: &str, section: &str) -> bool {
        if !self.normalized_text.contains(code) {
            return false;
        }
        section.is_empty() || self.cells.iter().any(|cell| compact_upper(cell) == section)
    }

    /// Index of the header cell that names the seat column, if any.
    pub fn seat_column(&self) -> Option<usize> {
        let table = self.table?;
        table
            .select(&HEADER_SELECTOR)
            .map(|th| cell_text(&th).to_lowercase())
            .position(|label| SEAT_HEADER_HINTS.iter().any(|hint| label.contains(hint)))
    }

    pub fn seat_count(&self) -> Option<u32> {
        match self.seat_column() {
            Some(index) if index < self.cells.len() => parse_digits(&self.cells[index]),
            _ => self.cells.iter().filter_map(|cell| parse_digits(cell)).last(),
        }
    }
}

/// The table rows of one parsed document, collected once and reused for
/// every course.
pub struct PageTables<'a> {
    rows: Vec<TableRow<'a>>,
}

impl<'a> PageTables<'a> {
    pub fn from_document(document: &'a Html) -> Self {
        let rows = document
            .select(&ROW_SELECTOR)
            .filter_map(TableRow::from_element)
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[TableRow<'a>] {
        &self.rows
    }

    pub fn find_row(&self, course: &Course) -> Option<&TableRow<'a>> {
        let code = compact_upper(&course.code);
        let section = compact_upper(&course.section);
        self.rows.iter().find(|row| row.matches(&code, &section))
    }

    pub fn check(&self, course: &Course) -> CheckResult {
        match self.find_row(course) {
            Some(row) => CheckResult::from_seats(course, row.seat_count()),
            None => CheckResult::not_found(course),
        }
    }

    /// One result per course, in input order.
    pub fn check_all<'s>(
        &'s self,
        courses: &'s [Course],
    ) -> impl Iterator<Item = CheckResult> + 's {
        courses.iter().map(move |course| self.check(course))
    }
}

pub fn extract(courses: &[Course], document: &Html) -> Vec<CheckResult> {
    PageTables::from_document(document).check_all(courses).collect()
}

pub fn extract_from_html(courses: &[Course], html: &str) -> Vec<CheckResult> {
    let document = Html::parse_document(html);
    extract(courses, &document)
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn enclosing_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

/// Keeps only ASCII digits and parses what is left. Counts past `u32::MAX`
/// saturate.
fn parse_digits(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}
