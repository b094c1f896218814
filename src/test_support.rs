//! Workbook fixtures for tests.

use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::bank::{DETAILS_SHEET, OVERVIEW_SHEET};

pub const OVERVIEW_HEADER: [&str; 4] = ["Pattern No.", "Pattern", "Example", "Unit"];
pub const DETAILS_HEADER: [&str; 7] = ["Pattern No.", "Pattern", "Section", "No.", "Content", "Answer", "Words"];

/// Write a two-sheet bank workbook. Cells that parse as numbers are written
/// as numbers, empty strings are left blank.
pub fn write_bank(dir: &Path, name: &str, overview: &[&[&str]], details: &[&[&str]]) {
  let mut workbook = Workbook::new();
  for (sheet, header, rows) in [
    (OVERVIEW_SHEET, &OVERVIEW_HEADER[..], overview),
    (DETAILS_SHEET, &DETAILS_HEADER[..], details),
  ] {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet).expect("sheet name");
    for (col, title) in header.iter().enumerate() {
      worksheet.write_string(0, col as u16, *title).expect("header");
    }
    for (r, row) in rows.iter().enumerate() {
      let r = r as u32 + 1;
      for (col, value) in row.iter().enumerate() {
        let col = col as u16;
        if value.is_empty() {
          continue;
        }
        match value.parse::<f64>() {
          Ok(number) => worksheet.write_number(r, col, number).expect("number"),
          Err(_) => worksheet.write_string(r, col, *value).expect("string"),
        };
      }
    }
  }
  workbook.save(dir.join(name)).expect("save workbook");
}
