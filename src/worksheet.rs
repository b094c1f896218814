//! Worksheet assembly: student sheet + teacher answer key.
//!
//! Rendering is two steps. `layout` turns the sampled questions into pages of
//! positioned text lines (millimetres, origin bottom-left as in PDF), and
//! `render_pdf` draws those lines with printpdf. Keeping the layout plain
//! data lets it be checked without decoding a PDF.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, TimeZone};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use tracing::{debug, instrument, warn};

use crate::domain::{Distribution, Pattern};
use crate::error::RenderError;
use crate::util::{labelled_or_blank, needs_unicode_font, needs_wide_font};

/// Items printed per section.
pub const DEFAULT_DISPLAY_LIMIT: usize = 5;

const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;
const MARGIN_TOP_MM: f32 = 10.0;
const MARGIN_BOTTOM_MM: f32 = 10.0;
const MARGIN_LEFT_MM: f32 = 15.0;
const MARGIN_RIGHT_MM: f32 = 15.0;
const PT_TO_MM: f32 = 0.352_778;
const LEADING: f32 = 1.2;

const TITLE_SIZE: f32 = 12.0;
const HEADING_SIZE: f32 = 11.0;
const ITEM_SIZE: f32 = 10.0;

const NAME_BLANK: &str = "_______________________________";
const DATE_BLANK: &str = "_____ / _____";
const SPEAKING_III_LINES: usize = 5;
const REMARK_OFFSET_MM: f32 = 80.0;
const SECTION_MARKER: char = '◈';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontStyle {
  Regular,
  Bold,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
  pub text: String,
  pub size: f32,
  pub style: FontStyle,
  pub x_mm: f32,
  pub y_mm: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
  pub lines: Vec<TextLine>,
}

/// Everything the assembler needs for one document.
#[derive(Clone, Copy, Debug)]
pub struct WorksheetRequest<'a> {
  /// Bank file name; a trailing `.xlsx` is dropped for display.
  pub book: &'a str,
  pub patterns: &'a [&'a Pattern],
  pub distribution: &'a Distribution,
  pub student_name: &'a str,
  pub student_date: &'a str,
}

/// `"Book 1 - Patterns: 3, 4"`
pub fn pattern_title(book: &str, patterns: &[&Pattern]) -> String {
  let nums = patterns
    .iter()
    .map(|p| p.pattern_num.to_string())
    .collect::<Vec<_>>()
    .join(", ");
  format!("{} - Patterns: {}", book.replace(".xlsx", ""), nums)
}

/// Download name: `Worksheet_MMDD_HHMMSS.pdf`.
pub fn file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
  Tz::Offset: std::fmt::Display,
{
  format!("Worksheet_{}.pdf", now.format("%m%d_%H%M%S"))
}

/// Rough Helvetica advance; wide glyphs count as a full em.
fn text_width_mm(text: &str, size: f32) -> f32 {
  let ems: f32 = text
    .chars()
    .map(|c| if needs_wide_font(c) { 1.0 } else { 0.5 })
    .sum();
  ems * size * PT_TO_MM
}

/// Greedy word wrap against the estimated width.
fn wrap(text: &str, size: f32, max_mm: f32) -> Vec<String> {
  let mut lines = Vec::new();
  let mut current = String::new();
  for word in text.split_whitespace() {
    let candidate = if current.is_empty() { word.to_string() } else { format!("{current} {word}") };
    if !current.is_empty() && text_width_mm(&candidate, size) > max_mm {
      lines.push(std::mem::take(&mut current));
      current = word.to_string();
    } else {
      current = candidate;
    }
  }
  if !current.is_empty() || lines.is_empty() {
    lines.push(current);
  }
  lines
}

/// Cursor that flows lines down the page and starts a new page when full.
struct PageBuilder {
  pages: Vec<Page>,
  current: Page,
  y: f32,
}

impl PageBuilder {
  fn new() -> Self {
    Self { pages: Vec::new(), current: Page::default(), y: A4_HEIGHT_MM - MARGIN_TOP_MM }
  }

  fn content_width() -> f32 {
    A4_WIDTH_MM - MARGIN_LEFT_MM - MARGIN_RIGHT_MM
  }

  fn page_break(&mut self) {
    self.pages.push(std::mem::take(&mut self.current));
    self.y = A4_HEIGHT_MM - MARGIN_TOP_MM;
  }

  fn space(&mut self, mm: f32) {
    self.y -= mm;
  }

  /// Move to the next baseline, breaking the page if it would cross the bottom margin.
  fn advance(&mut self, size: f32) -> f32 {
    let height = size * PT_TO_MM * LEADING;
    if self.y - height < MARGIN_BOTTOM_MM {
      self.page_break();
    }
    self.y -= height;
    self.y
  }

  fn push(&mut self, text: String, size: f32, style: FontStyle, x_mm: f32, y_mm: f32) {
    self.current.lines.push(TextLine { text, size, style, x_mm, y_mm });
  }

  fn paragraph(&mut self, text: &str, size: f32, style: FontStyle) {
    for line in wrap(text, size, Self::content_width()) {
      let y = self.advance(size);
      self.push(line, size, style, MARGIN_LEFT_MM, y);
    }
  }

  fn centered(&mut self, text: &str, size: f32, style: FontStyle) {
    for line in wrap(text, size, Self::content_width()) {
      let y = self.advance(size);
      let x = MARGIN_LEFT_MM + ((Self::content_width() - text_width_mm(&line, size)) / 2.0).max(0.0);
      self.push(line, size, style, x, y);
    }
  }

  /// Left and right aligned text on one baseline.
  fn split_row(&mut self, left: &str, right: &str, size: f32, style: FontStyle) {
    let y = self.advance(size);
    let right_x = (A4_WIDTH_MM - MARGIN_RIGHT_MM - text_width_mm(right, size)).max(MARGIN_LEFT_MM);
    self.push(left.to_string(), size, style, MARGIN_LEFT_MM, y);
    self.push(right.to_string(), size, style, right_x, y);
  }

  fn finish(mut self) -> Vec<Page> {
    if !self.current.lines.is_empty() || self.pages.is_empty() {
      self.pages.push(self.current);
    }
    self.pages
  }
}

/// Lay out the student worksheet and the answer key.
pub fn layout(req: &WorksheetRequest<'_>, display_limit: usize) -> Vec<Page> {
  let dist = req.distribution;
  let title = pattern_title(req.book, req.patterns);
  let mut b = PageBuilder::new();

  // Student worksheet
  b.centered("Weekly Test", TITLE_SIZE, FontStyle::Bold);
  b.space(5.0 * PT_TO_MM);
  b.centered(&title, TITLE_SIZE, FontStyle::Bold);
  b.space(5.0 * PT_TO_MM);
  b.split_row(
    &labelled_or_blank("NAME", req.student_name, NAME_BLANK),
    &labelled_or_blank("DATE", req.student_date, DATE_BLANK),
    TITLE_SIZE,
    FontStyle::Regular,
  );
  b.space(4.0);

  b.paragraph("◈ Speaking I - Answer the questions", HEADING_SIZE, FontStyle::Bold);
  b.space(2.0);
  for (idx, question) in dist.speaking1.iter().take(display_limit).enumerate() {
    b.paragraph(&format!("{}. {}", idx + 1, question), ITEM_SIZE, FontStyle::Regular);
  }
  b.space(4.0);

  b.paragraph("◈ Speaking II - Say in English", HEADING_SIZE, FontStyle::Bold);
  b.space(2.0);
  for (idx, pair) in dist.speaking2.iter().take(display_limit).enumerate() {
    b.paragraph(&format!("{}. {}", idx + 1, pair.prompt), ITEM_SIZE, FontStyle::Regular);
  }
  b.space(4.0);

  b.paragraph("◈ Speaking III - With your teacher", HEADING_SIZE, FontStyle::Bold);
  b.space(2.0);
  for idx in 1..=SPEAKING_III_LINES {
    b.paragraph(&format!("{idx}. Pattern {idx}"), ITEM_SIZE, FontStyle::Regular);
  }
  b.space(4.0);

  b.paragraph("◈ Unscramble", HEADING_SIZE, FontStyle::Bold);
  b.space(2.0);
  for (idx, item) in dist.unscramble.iter().take(display_limit).enumerate() {
    b.paragraph(&format!("{}. {} ({})", idx + 1, item.prompt, item.scrambled), ITEM_SIZE, FontStyle::Regular);
    b.space(7.0);
    b.paragraph(&"_".repeat(85), ITEM_SIZE, FontStyle::Regular);
    b.space(3.0);
  }

  b.space(5.0);
  let y = b.advance(TITLE_SIZE);
  b.push("GRADE:".into(), TITLE_SIZE, FontStyle::Bold, MARGIN_LEFT_MM, y);
  b.push("REMARK:".into(), TITLE_SIZE, FontStyle::Bold, MARGIN_LEFT_MM + REMARK_OFFSET_MM, y);

  // Answer key
  b.page_break();
  b.centered("Teacher's Guide (Answer Key)", TITLE_SIZE, FontStyle::Bold);
  b.space(5.0 * PT_TO_MM);
  b.centered(&title, TITLE_SIZE, FontStyle::Bold);
  b.space(10.0);

  b.paragraph("◈ Speaking II Answers", HEADING_SIZE, FontStyle::Bold);
  b.space(3.0);
  for (idx, pair) in dist.speaking2.iter().take(display_limit).enumerate() {
    b.paragraph(&format!("{}. {}", idx + 1, pair.answer), ITEM_SIZE, FontStyle::Regular);
  }
  b.space(10.0);

  b.paragraph("◈ Unscramble Answers", HEADING_SIZE, FontStyle::Bold);
  b.space(3.0);
  for (idx, item) in dist.unscramble.iter().take(display_limit).enumerate() {
    b.paragraph(&format!("{}. {}", idx + 1, item.answer), ITEM_SIZE, FontStyle::Regular);
  }

  b.finish()
}

struct Fonts {
  regular: IndirectFontRef,
  bold: IndirectFontRef,
  unicode: Option<IndirectFontRef>,
}

/// Which loaded font draws a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Face {
  Regular,
  Bold,
  Unicode,
}

/// Bold lines stay on Helvetica-Bold unless something besides the section
/// marker needs the embedded font.
fn face_for(line: &TextLine, has_unicode: bool) -> Face {
  let builtin = match line.style {
    FontStyle::Regular => Face::Regular,
    FontStyle::Bold => Face::Bold,
  };
  if !has_unicode {
    return builtin;
  }
  let needs_unicode = match line.style {
    FontStyle::Regular => needs_unicode_font(&line.text),
    FontStyle::Bold => line.text.chars().any(|c| c != SECTION_MARKER && needs_wide_font(c)),
  };
  if needs_unicode {
    Face::Unicode
  } else {
    builtin
  }
}

impl Fonts {
  fn pick(&self, line: &TextLine) -> &IndirectFontRef {
    match (face_for(line, self.unicode.is_some()), &self.unicode) {
      (Face::Unicode, Some(unicode)) => unicode,
      (Face::Bold, _) => &self.bold,
      _ => &self.regular,
    }
  }
}

/// Draw laid-out pages onto A4 and return the PDF bytes.
///
/// `unicode_font` is embedded when the file exists and parses; otherwise every
/// line uses Helvetica.
#[instrument(level = "debug", skip(pages), fields(pages = pages.len()))]
pub fn render_pdf(title: &str, pages: &[Page], unicode_font: Option<&Path>) -> Result<Vec<u8>, RenderError> {
  let (doc, first_page, first_layer) = PdfDocument::new(title, Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), "Layer 1");

  let builtin = |font: BuiltinFont| {
    doc.add_builtin_font(font).map_err(|e| RenderError::Pdf(format!("font: {e:?}")))
  };
  let regular = builtin(BuiltinFont::Helvetica)?;
  let bold = builtin(BuiltinFont::HelveticaBold)?;

  let unicode = match unicode_font {
    Some(path) if path.is_file() => {
      let loaded = File::open(path)
        .map_err(|e| e.to_string())
        .and_then(|file| doc.add_external_font(file).map_err(|e| format!("{e:?}")));
      match loaded {
        Ok(font) => Some(font),
        Err(reason) => {
          warn!(target: "worksheet", path = %path.display(), %reason, "Unicode font unreadable; falling back to Helvetica");
          None
        }
      }
    }
    Some(path) => {
      warn!(target: "worksheet", path = %path.display(), "Unicode font not found; falling back to Helvetica");
      None
    }
    None => None,
  };
  let fonts = Fonts { regular, bold, unicode };

  for (idx, page) in pages.iter().enumerate() {
    let layer = if idx == 0 {
      doc.get_page(first_page).get_layer(first_layer)
    } else {
      let (page_idx, layer_idx) = doc.add_page(Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), "Layer 1");
      doc.get_page(page_idx).get_layer(layer_idx)
    };
    for line in &page.lines {
      layer.use_text(line.text.clone(), line.size, Mm(line.x_mm), Mm(line.y_mm), fonts.pick(line));
    }
  }

  let bytes = doc.save_to_bytes().map_err(|e| RenderError::Pdf(format!("save: {e:?}")))?;
  debug!(target: "worksheet", bytes = bytes.len(), "Rendered worksheet PDF");
  Ok(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{SpeakingPair, UnscrambleItem};

  fn texts(page: &Page) -> Vec<&str> {
    page.lines.iter().map(|l| l.text.as_str()).collect()
  }

  fn fixture() -> (Pattern, Pattern, Distribution) {
    let p3 = Pattern::empty(3, None);
    let p4 = Pattern::empty(4, None);
    let dist = Distribution {
      speaking1: (1..=7).map(|i| format!("question {i}")).collect(),
      speaking2: vec![SpeakingPair { prompt: "나는 학생이야".into(), answer: "I am a student.".into() }],
      unscramble: vec![UnscrambleItem {
        prompt: "나는 집에 가".into(),
        scrambled: "home / go / I".into(),
        answer: "I go home.".into(),
      }],
    };
    (p3, p4, dist)
  }

  #[test]
  fn title_drops_extension_and_lists_numbers() {
    let (p3, p4, _) = fixture();
    assert_eq!(pattern_title("Book 1.xlsx", &[&p3, &p4]), "Book 1 - Patterns: 3, 4");
  }

  #[test]
  fn file_name_uses_month_day_and_time() {
    let at = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single().expect("valid time");
    assert_eq!(file_name(&at), "Worksheet_0309_140507.pdf");
  }

  #[test]
  fn layout_has_worksheet_and_answer_key() {
    let (p3, p4, dist) = fixture();
    let patterns = [&p3, &p4];
    let req = WorksheetRequest {
      book: "Book 1.xlsx",
      patterns: &patterns,
      distribution: &dist,
      student_name: "",
      student_date: "",
    };
    let pages = layout(&req, DEFAULT_DISPLAY_LIMIT);
    assert_eq!(pages.len(), 2);

    let sheet = texts(&pages[0]);
    assert_eq!(sheet[0], "Weekly Test");
    assert!(sheet.contains(&"Book 1 - Patterns: 3, 4"));
    assert!(sheet.contains(&"NAME: _______________________________"));
    assert!(sheet.contains(&"DATE: _____ / _____"));
    assert!(sheet.contains(&"5. question 5"));
    assert!(!sheet.iter().any(|t| t.starts_with("6. ")));
    assert!(sheet.contains(&"1. 나는 학생이야"));
    assert!(sheet.contains(&"5. Pattern 5"));
    assert!(sheet.contains(&"1. 나는 집에 가 (home / go / I)"));
    assert!(sheet.contains(&"GRADE:") && sheet.contains(&"REMARK:"));
    assert!(!sheet.contains(&"1. I am a student."));

    let key = texts(&pages[1]);
    assert_eq!(key[0], "Teacher's Guide (Answer Key)");
    assert!(key.contains(&"1. I am a student."));
    assert!(key.contains(&"1. I go home."));
  }

  #[test]
  fn layout_prints_given_name_and_date() {
    let (p3, _, dist) = fixture();
    let patterns = [&p3];
    let req = WorksheetRequest {
      book: "B.xlsx",
      patterns: &patterns,
      distribution: &dist,
      student_name: "Minji",
      student_date: "3월 14일",
    };
    let pages = layout(&req, DEFAULT_DISPLAY_LIMIT);
    let sheet = texts(&pages[0]);
    assert!(sheet.contains(&"NAME: Minji"));
    assert!(sheet.contains(&"DATE: 3월 14일"));
  }

  #[test]
  fn lines_stay_inside_the_page() {
    let (p3, _, mut dist) = fixture();
    dist.speaking1 = vec!["word ".repeat(120); 5];
    let patterns = [&p3];
    let req = WorksheetRequest {
      book: "B.xlsx",
      patterns: &patterns,
      distribution: &dist,
      student_name: "",
      student_date: "",
    };
    for page in layout(&req, DEFAULT_DISPLAY_LIMIT) {
      for line in &page.lines {
        assert!(line.y_mm >= MARGIN_BOTTOM_MM && line.y_mm <= A4_HEIGHT_MM - MARGIN_TOP_MM, "{line:?}");
        assert!(line.x_mm >= MARGIN_LEFT_MM);
      }
    }
  }

  #[test]
  fn wrap_splits_long_text() {
    let lines = wrap(&"word ".repeat(100), ITEM_SIZE, 100.0);
    assert!(lines.len() > 1);
    assert!(lines.iter().all(|l| text_width_mm(l, ITEM_SIZE) <= 100.0));
    assert_eq!(wrap("", ITEM_SIZE, 100.0), vec![String::new()]);
  }

  #[test]
  fn renders_pdf_without_unicode_font() {
    let (p3, _, dist) = fixture();
    let patterns = [&p3];
    let req = WorksheetRequest {
      book: "B.xlsx",
      patterns: &patterns,
      distribution: &dist,
      student_name: "",
      student_date: "",
    };
    let pages = layout(&req, DEFAULT_DISPLAY_LIMIT);
    let bytes = render_pdf("Worksheet", &pages, Some(Path::new("/nonexistent/font.ttf"))).expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[test]
  fn unreadable_font_falls_back_to_helvetica() {
    let dir = tempfile::tempdir().expect("tempdir");
    let font = dir.path().join("NanumGothic.ttf");
    std::fs::write(&font, b"not a font").expect("write font");
    let (p3, _, dist) = fixture();
    let patterns = [&p3];
    let req = WorksheetRequest {
      book: "B.xlsx",
      patterns: &patterns,
      distribution: &dist,
      student_name: "",
      student_date: "",
    };
    let pages = layout(&req, DEFAULT_DISPLAY_LIMIT);
    let bytes = render_pdf("Worksheet", &pages, Some(&font)).expect("pdf");
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[test]
  fn headings_keep_bold_face_with_unicode_font() {
    let line = |text: &str, style| TextLine { text: text.into(), size: HEADING_SIZE, style, x_mm: 0.0, y_mm: 0.0 };
    let heading = line("◈ Speaking I - Answer the questions", FontStyle::Bold);
    assert_eq!(face_for(&heading, true), Face::Bold);
    assert_eq!(face_for(&heading, false), Face::Bold);
    assert_eq!(face_for(&line("책 1 - Patterns: 3", FontStyle::Bold), true), Face::Unicode);
    assert_eq!(face_for(&line("1. 나는 학생이야", FontStyle::Regular), true), Face::Unicode);
    assert_eq!(face_for(&line("1. 나는 학생이야", FontStyle::Regular), false), Face::Regular);
    assert_eq!(face_for(&line("1. question", FontStyle::Regular), true), Face::Regular);
  }
}
