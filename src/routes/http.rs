//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};

use crate::error::{BankError, WorksheetError};
use crate::logic::{generate_worksheet, list_books, list_patterns, GenerateRequest};
use crate::protocol::*;
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_books(State(state): State<Arc<AppState>>) -> Response {
  let books = match list_books(&state).await {
    Ok(books) => books,
    Err(e) => {
      error!(target: "pattern_worksheets", error = %e, "HTTP book listing failed");
      return (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorOut { error: e.to_string() })).into_response();
    }
  };
  info!(target: "pattern_worksheets", count = books.len(), "HTTP books listed");
  Json(BooksOut { books }).into_response()
}

#[instrument(level = "info", skip_all, fields(%filename))]
pub async fn http_get_patterns(
  State(state): State<Arc<AppState>>,
  Path(filename): Path<String>,
) -> impl IntoResponse {
  match list_patterns(&state, &filename).await {
    Ok(patterns) => {
      info!(target: "bank", %filename, count = patterns.len(), "HTTP patterns listed");
      Json(PatternsOut::ok(patterns))
    }
    Err(e) => {
      warn!(target: "bank", %filename, error = %e, "HTTP pattern listing failed");
      Json(PatternsOut::failed(e.to_string()))
    }
  }
}

#[instrument(
  level = "info",
  skip(state, body),
  fields(book = ?body.book, requested = body.patterns.len())
)]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Response {
  let req = GenerateRequest {
    book: body.book.clone().unwrap_or_default(),
    patterns: body.pattern_numbers(),
    student_name: body.name.clone().unwrap_or_default(),
    student_date: body.date.clone().unwrap_or_default(),
  };
  info!(
    target: "worksheet",
    book = %req.book,
    patterns = ?req.patterns,
    name = %trunc_for_log(&req.student_name, 40),
    "HTTP generate requested"
  );

  match generate_worksheet(&state, req).await {
    Ok(doc) => {
      info!(target: "worksheet", file = %doc.file_name, patterns = ?doc.patterns, bytes = doc.bytes.len(), "HTTP worksheet sent");
      let disposition = format!("attachment; filename=\"{}\"", doc.file_name);
      (
        [
          (header::CONTENT_TYPE, "application/pdf".to_string()),
          (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.bytes,
      )
        .into_response()
    }
    Err(e) => {
      let status = status_for(&e);
      if status.is_server_error() {
        error!(target: "worksheet", error = %e, "Worksheet generation failed");
      } else {
        warn!(target: "worksheet", error = %e, %status, "Worksheet request rejected");
      }
      (status, Json(ErrorOut { error: e.to_string() })).into_response()
    }
  }
}

fn status_for(e: &WorksheetError) -> StatusCode {
  match e {
    WorksheetError::EmptySelection => StatusCode::BAD_REQUEST,
    WorksheetError::Bank(BankError::NotFound(_)) => StatusCode::NOT_FOUND,
    _ => StatusCode::INTERNAL_SERVER_ERROR,
  }
}
