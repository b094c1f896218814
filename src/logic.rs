//! Core behaviors shared by the HTTP handlers.
//!
//! This includes:
//!   - listing banks and the patterns inside one
//!   - the worksheet pipeline: load bank, resolve selection, sample, lay out, render
//!
//! Bank parsing and PDF rendering are blocking; the async entry points move
//! them onto the blocking pool.

use chrono::{DateTime, Local, TimeZone};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, instrument, warn};

use crate::domain::PatternSummary;
use crate::error::{Result, WorksheetError};
use crate::sampler::distribute;
use crate::state::AppState;
use crate::worksheet::{file_name, layout, pattern_title, render_pdf, WorksheetRequest};

/// Validated input for one worksheet.
#[derive(Clone, Debug, Default)]
pub struct GenerateRequest {
  pub book: String,
  pub patterns: Vec<i64>,
  pub student_name: String,
  pub student_date: String,
}

/// Rendered worksheet ready to send.
#[derive(Clone, Debug)]
pub struct GeneratedWorksheet {
  pub file_name: String,
  pub bytes: Vec<u8>,
  /// Pattern numbers that were found in the bank, in request order.
  pub patterns: Vec<i64>,
}

/// Directory listing runs on the blocking pool.
pub async fn list_books(state: &AppState) -> Result<Vec<String>> {
  let store = state.store.clone();
  Ok(tokio::task::spawn_blocking(move || store.list_books()).await?)
}

#[instrument(level = "info", skip(state))]
pub async fn list_patterns(state: &AppState, book: &str) -> Result<Vec<PatternSummary>> {
  let store = state.store.clone();
  let book = book.to_string();
  let bank = tokio::task::spawn_blocking(move || store.load(&book)).await??;
  Ok(bank.summaries())
}

#[instrument(level = "info", skip(state, req), fields(book = %req.book, requested = req.patterns.len()))]
pub async fn generate_worksheet(state: &AppState, req: GenerateRequest) -> Result<GeneratedWorksheet> {
  if req.book.is_empty() || req.patterns.is_empty() {
    return Err(WorksheetError::EmptySelection);
  }
  let state = state.clone();
  tokio::task::spawn_blocking(move || {
    let mut rng = StdRng::from_entropy();
    build_worksheet(&state, &req, &mut rng, &Local::now())
  })
  .await?
}

/// Synchronous pipeline with an injected generator and clock.
pub fn build_worksheet<R, Tz>(
  state: &AppState,
  req: &GenerateRequest,
  rng: &mut R,
  now: &DateTime<Tz>,
) -> Result<GeneratedWorksheet>
where
  R: Rng + ?Sized,
  Tz: TimeZone,
  Tz::Offset: std::fmt::Display,
{
  let cfg = &state.config;
  let bank = state.store.load(&req.book)?;
  let selected = bank.select(&req.patterns);
  if selected.is_empty() {
    return Err(WorksheetError::EmptySelection);
  }

  let distribution = distribute(&selected, cfg.target_count, rng);
  if distribution.is_empty() {
    warn!(target: "worksheet", book = %req.book, "Selected patterns have no questions; sheet will be blank");
  }
  let worksheet = WorksheetRequest {
    book: &req.book,
    patterns: &selected,
    distribution: &distribution,
    student_name: &req.student_name,
    student_date: &req.student_date,
  };
  let pages = layout(&worksheet, cfg.display_limit);
  let bytes = render_pdf(&pattern_title(&req.book, &selected), &pages, cfg.unicode_font.as_deref())?;
  let name = file_name(now);

  if cfg.save_copies {
    std::fs::create_dir_all(&cfg.output_dir)?;
    std::fs::write(cfg.output_dir.join(&name), &bytes)?;
  }

  let patterns: Vec<i64> = selected.iter().map(|p| p.pattern_num).collect();
  info!(
    target: "worksheet",
    book = %req.book,
    ?patterns,
    speaking1 = distribution.speaking1.len(),
    speaking2 = distribution.speaking2.len(),
    unscramble = distribution.unscramble.len(),
    bytes = bytes.len(),
    file = %name,
    "Generated worksheet"
  );
  Ok(GeneratedWorksheet { file_name: name, bytes, patterns })
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use chrono::Utc;

  use super::*;
  use crate::config::AppConfig;
  use crate::error::BankError;
  use crate::test_support::write_bank;

  fn state_in(dir: &Path) -> AppState {
    write_bank(
      dir,
      "Book 1.xlsx",
      &[&["1", "I want to ~", "", "Level A"], &["2", "Can I ~?", "", "Level B"]],
      &[
        &["1", "", "Speaking I", "", "What do you want?"],
        &["1", "", "Speaking II", "", "물을 원해", "I want water."],
        &["2", "", "Unscramble", "", "가도 돼?", "Can I go?", "(go / Can / I)"],
      ],
    );
    AppState::with_config(AppConfig {
      databases_dir: dir.to_path_buf(),
      output_dir: dir.join("outputs"),
      unicode_font: None,
      ..AppConfig::default()
    })
  }

  fn request(patterns: Vec<i64>) -> GenerateRequest {
    GenerateRequest { book: "Book 1.xlsx".into(), patterns, ..GenerateRequest::default() }
  }

  fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 2, 12, 30, 0).single().expect("valid time")
  }

  #[test]
  fn builds_pdf_and_keeps_a_copy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = state_in(dir.path());
    let doc = build_worksheet(&state, &request(vec![2, 77, 1]), &mut StdRng::seed_from_u64(1), &noon()).expect("worksheet");
    assert_eq!(doc.file_name, "Worksheet_1102_123000.pdf");
    assert_eq!(doc.patterns, vec![2, 1]);
    assert!(doc.bytes.starts_with(b"%PDF"));
    let saved = std::fs::read(dir.path().join("outputs").join(&doc.file_name)).expect("saved copy");
    assert_eq!(saved, doc.bytes);
  }

  #[test]
  fn unknown_patterns_only_is_an_empty_selection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = state_in(dir.path());
    let result = build_worksheet(&state, &request(vec![40, 41]), &mut StdRng::seed_from_u64(1), &noon());
    assert!(matches!(result, Err(WorksheetError::EmptySelection)));
  }

  #[test]
  fn missing_book_is_bank_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = state_in(dir.path());
    let req = GenerateRequest { book: "Book 9.xlsx".into(), patterns: vec![1], ..GenerateRequest::default() };
    let result = build_worksheet(&state, &req, &mut StdRng::seed_from_u64(1), &noon());
    assert!(matches!(result, Err(WorksheetError::Bank(BankError::NotFound(_)))));
  }

  #[tokio::test]
  async fn blank_input_is_rejected_before_loading() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = state_in(dir.path());
    let result = generate_worksheet(&state, GenerateRequest { book: "Book 1.xlsx".into(), ..Default::default() }).await;
    assert!(matches!(result, Err(WorksheetError::EmptySelection)));
    let result = generate_worksheet(&state, GenerateRequest { patterns: vec![1], ..Default::default() }).await;
    assert!(matches!(result, Err(WorksheetError::EmptySelection)));
  }

  #[tokio::test]
  async fn lists_patterns_in_number_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = state_in(dir.path());
    let patterns = list_patterns(&state, "Book 1.xlsx").await.expect("patterns");
    let nums: Vec<i64> = patterns.iter().map(|p| p.number).collect();
    assert_eq!(nums, vec![1, 2]);
    assert_eq!(patterns[1].unit, "Level B");
    assert_eq!(list_books(&state).await.expect("books"), vec!["Book 1.xlsx"]);
  }
}
