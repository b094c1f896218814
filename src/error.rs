//! Error types for bank loading, rendering, and the generation pipeline.
//!
//! Row-level spreadsheet problems are not errors: they are collected as
//! `bank::SkippedRow` diagnostics and the row is dropped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("question bank not found: {0}")]
    NotFound(String),

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("workbook has no sheet named '{0}'")]
    MissingSheet(String),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

#[derive(Error, Debug)]
pub enum WorksheetError {
    #[error("Book or Patterns missing")]
    EmptySelection,

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = WorksheetError> = std::result::Result<T, E>;
