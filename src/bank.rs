//! Question bank loading: workbook discovery plus the tolerant sheet parser.
//!
//! A bank workbook has two sheets:
//!   - "Pattern Overview": number | name | (unused) | unit
//!   - "Pattern Details":  number | (unused) | section | (unused) | content | answer | scrambled
//!
//! Row one of each sheet is a header. Rows are decoded into named structs at
//! this boundary; a row that fails to decode is recorded in `ParseReport`
//! and dropped, it never aborts the load.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use tracing::{debug, info, instrument, warn};

use crate::domain::{
  Pattern, PatternOverviewEntry, PatternSummary, Section, SpeakingPair, UnscrambleItem, DEFAULT_UNIT,
};
use crate::error::BankError;

pub const OVERVIEW_SHEET: &str = "Pattern Overview";
pub const DETAILS_SHEET: &str = "Pattern Details";

const BOOK_EXTENSION: &str = "xlsx";

// Column positions, only referenced by the row decoders below.
const OV_NUMBER: usize = 0;
const OV_NAME: usize = 1;
const OV_UNIT: usize = 3;
const DT_NUMBER: usize = 0;
const DT_SECTION: usize = 2;
const DT_CONTENT: usize = 4;
const DT_ANSWER: usize = 5;
const DT_SCRAMBLED: usize = 6;

/// A row that was dropped while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedRow {
  pub sheet: &'static str,
  /// 1-based, as shown in a spreadsheet editor.
  pub row: usize,
  pub reason: String,
}

/// Diagnostics collected during a parse. Safe to discard.
#[derive(Clone, Debug, Default)]
pub struct ParseReport {
  pub skipped: Vec<SkippedRow>,
}

/// Parsed question bank keyed by pattern number.
#[derive(Clone, Debug, Default)]
pub struct Bank {
  patterns: BTreeMap<i64, Pattern>,
}

impl Bank {
  #[cfg(test)]
  pub fn get(&self, pattern_num: i64) -> Option<&Pattern> {
    self.patterns.get(&pattern_num)
  }

  pub fn len(&self) -> usize {
    self.patterns.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.patterns.is_empty()
  }

  /// Listing in ascending pattern number.
  pub fn summaries(&self) -> Vec<PatternSummary> {
    self.patterns.values().map(Pattern::summary).collect()
  }

  /// Resolve requested numbers in request order. Unknown numbers are dropped.
  pub fn select(&self, requested: &[i64]) -> Vec<&Pattern> {
    requested.iter().filter_map(|n| self.patterns.get(n)).collect()
  }
}

/// Decoded "Pattern Details" row.
#[derive(Clone, Debug, PartialEq, Eq)]
struct DetailRow {
  pattern_num: i64,
  section: Option<Section>,
  content: String,
  answer: String,
  scrambled: String,
}

fn decode_overview_row(row: &[Data]) -> Option<Result<PatternOverviewEntry, String>> {
  let first = row.get(OV_NUMBER);
  if is_blank(first) {
    return None;
  }
  let entry = cast_int(first).map(|number| {
    let unit_cell = row.get(OV_UNIT);
    PatternOverviewEntry {
      number,
      name: cast_string(row.get(OV_NAME)),
      unit: if is_truthy(unit_cell) { cast_string(unit_cell) } else { DEFAULT_UNIT.to_string() },
    }
  });
  Some(entry.map_err(|e| format!("pattern number: {e}")))
}

fn decode_detail_row(row: &[Data]) -> Result<DetailRow, String> {
  let pattern_num = cast_int(row.get(DT_NUMBER)).map_err(|e| format!("pattern number: {e}"))?;
  if row.len() <= DT_CONTENT {
    return Err("row has no content column".into());
  }
  let section = match row.get(DT_SECTION) {
    Some(Data::String(label)) => Section::from_label(label),
    _ => None,
  };
  let answer_cell = row.get(DT_ANSWER);
  let scrambled_cell = row.get(DT_SCRAMBLED);
  Ok(DetailRow {
    pattern_num,
    section,
    content: cast_string(row.get(DT_CONTENT)),
    answer: if is_truthy(answer_cell) { cast_string(answer_cell) } else { String::new() },
    scrambled: if is_truthy(scrambled_cell) {
      strip_parens(&cast_string(scrambled_cell)).to_string()
    } else {
      String::new()
    },
  })
}

/// Build a bank from both sheets' rows (absolute coordinates, header included).
pub fn parse_sheets(overview: &[Vec<Data>], details: &[Vec<Data>]) -> (Bank, ParseReport) {
  let mut report = ParseReport::default();

  // Pass 1: decode.
  let mut info: BTreeMap<i64, PatternOverviewEntry> = BTreeMap::new();
  for (idx, row) in overview.iter().enumerate().skip(1) {
    match decode_overview_row(row) {
      None => {}
      Some(Ok(entry)) => {
        info.insert(entry.number, entry);
      }
      Some(Err(reason)) => report.skipped.push(SkippedRow { sheet: OVERVIEW_SHEET, row: idx + 1, reason }),
    }
  }

  let mut rows = Vec::with_capacity(details.len());
  for (idx, row) in details.iter().enumerate().skip(1) {
    match decode_detail_row(row) {
      Ok(decoded) => rows.push(decoded),
      Err(reason) => report.skipped.push(SkippedRow { sheet: DETAILS_SHEET, row: idx + 1, reason }),
    }
  }

  // Pass 2: one empty aggregate per referenced pattern number.
  let ids: BTreeSet<i64> = info.keys().copied().chain(rows.iter().map(|r| r.pattern_num)).collect();
  let mut patterns: BTreeMap<i64, Pattern> =
    ids.into_iter().map(|n| (n, Pattern::empty(n, info.get(&n)))).collect();

  // Pass 3: fill pools in sheet order.
  for row in rows {
    let Some(pattern) = patterns.get_mut(&row.pattern_num) else { continue };
    match row.section {
      Some(Section::SpeakingI) => pattern.speaking1.push(row.content),
      Some(Section::SpeakingII) => pattern.speaking2.push(SpeakingPair { prompt: row.content, answer: row.answer }),
      Some(Section::Unscramble) => pattern.unscramble.push(UnscrambleItem {
        prompt: row.content,
        scrambled: row.scrambled,
        answer: row.answer,
      }),
      None => {}
    }
  }

  (Bank { patterns }, report)
}

/// Read both sheets of an `.xlsx` bank.
pub fn read_workbook(path: &Path) -> Result<(Bank, ParseReport), BankError> {
  let mut workbook: Xlsx<_> = open_workbook(path)?;
  let overview = sheet_rows(&mut workbook, OVERVIEW_SHEET)?;
  let details = sheet_rows(&mut workbook, DETAILS_SHEET)?;
  Ok(parse_sheets(&overview, &details))
}

fn sheet_rows<RS>(workbook: &mut Xlsx<RS>, name: &str) -> Result<Vec<Vec<Data>>, BankError>
where
  RS: std::io::Read + std::io::Seek,
{
  if !workbook.sheet_names().iter().any(|s| s == name) {
    return Err(BankError::MissingSheet(name.to_string()));
  }
  let range = workbook.worksheet_range(name)?;
  Ok(to_absolute_rows(&range))
}

/// calamine ranges start at the first used cell; pad back to A1 so that
/// row and column positions match the sheet.
fn to_absolute_rows(range: &Range<Data>) -> Vec<Vec<Data>> {
  let Some((start_row, start_col)) = range.start() else { return Vec::new() };
  let mut out: Vec<Vec<Data>> = (0..start_row).map(|_| Vec::new()).collect();
  for row in range.rows() {
    let mut cells = vec![Data::Empty; start_col as usize];
    cells.extend_from_slice(row);
    out.push(cells);
  }
  out
}

/// Directory of bank workbooks.
#[derive(Clone, Debug)]
pub struct BankStore {
  root: PathBuf,
}

impl BankStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Sorted `.xlsx` file names. A missing directory lists nothing.
  pub fn list_books(&self) -> Vec<String> {
    let mut books = Vec::new();
    if let Ok(entries) = std::fs::read_dir(&self.root) {
      for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != BOOK_EXTENSION).unwrap_or(true) {
          continue;
        }
        if let Some(name) = path.file_name() {
          books.push(name.to_string_lossy().to_string());
        }
      }
    }
    books.sort();
    books
  }

  /// Map a book name to a file inside the store.
  pub fn resolve(&self, book: &str) -> Result<PathBuf, BankError> {
    let plain = !book.is_empty()
      && !book.contains(['/', '\\'])
      && Path::new(book).file_name().map(|n| n == book).unwrap_or(false);
    if !plain {
      return Err(BankError::NotFound(book.to_string()));
    }
    let path = self.root.join(book);
    if !path.is_file() {
      return Err(BankError::NotFound(book.to_string()));
    }
    Ok(path)
  }

  /// Parse a bank fresh from disk.
  #[instrument(level = "info", skip(self), fields(root = %self.root.display()))]
  pub fn load(&self, book: &str) -> Result<Bank, BankError> {
    let path = self.resolve(book)?;
    let (bank, report) = read_workbook(&path).map_err(|e| {
      warn!(target: "bank", %book, error = %e, "Failed to read bank workbook");
      e
    })?;
    for skipped in &report.skipped {
      debug!(target: "bank", %book, sheet = skipped.sheet, row = skipped.row, reason = %skipped.reason, "Skipped row");
    }
    info!(target: "bank", %book, patterns = bank.len(), skipped = report.skipped.len(), "Loaded question bank");
    Ok(bank)
  }
}

// -------- Cell casts --------

fn is_blank(cell: Option<&Data>) -> bool {
  matches!(cell, None | Some(Data::Empty))
}

/// Empty cells, empty text, zero and false count as "not given".
fn is_truthy(cell: Option<&Data>) -> bool {
  match cell {
    None | Some(Data::Empty) => false,
    Some(Data::String(s)) => !s.is_empty(),
    Some(Data::Int(v)) => *v != 0,
    Some(Data::Float(v)) => *v != 0.0,
    Some(Data::Bool(v)) => *v,
    Some(_) => true,
  }
}

fn cast_int(cell: Option<&Data>) -> Result<i64, String> {
  match cell {
    None | Some(Data::Empty) => Err("empty cell".into()),
    Some(Data::Int(v)) => Ok(*v),
    Some(Data::Float(v)) if v.is_finite() => Ok(v.trunc() as i64),
    Some(Data::Float(v)) => Err(format!("not a finite number: {v}")),
    Some(Data::String(s)) => s.trim().parse::<i64>().map_err(|_| format!("not an integer: {s:?}")),
    Some(Data::Bool(v)) => Ok(i64::from(*v)),
    Some(other) => Err(format!("not an integer: {other:?}")),
  }
}

fn cast_string(cell: Option<&Data>) -> String {
  match cell {
    None | Some(Data::Empty) => String::new(),
    Some(Data::String(s)) => s.clone(),
    Some(Data::Int(v)) => v.to_string(),
    Some(Data::Float(v)) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => (*v as i64).to_string(),
    Some(Data::Float(v)) => v.to_string(),
    Some(Data::Bool(true)) => "True".into(),
    Some(Data::Bool(false)) => "False".into(),
    Some(Data::DateTime(v)) => v.as_f64().to_string(),
    Some(Data::DateTimeIso(s)) | Some(Data::DurationIso(s)) => s.clone(),
    Some(Data::Error(e)) => e.to_string(),
  }
}

/// "(go / I / home)" -> "go / I / home"
fn strip_parens(text: &str) -> &str {
  text.trim_matches(|c| c == '(' || c == ')')
}
