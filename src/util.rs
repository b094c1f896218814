//! Small text helpers used by the worksheet layout.

/// True if the char is outside Latin-1 and so missing from the builtin PDF fonts.
pub fn needs_wide_font(ch: char) -> bool {
  ch > '\u{FF}'
}

/// True if any char of `text` needs the embedded Unicode font (Hangul prompts, symbols).
pub fn needs_unicode_font(text: &str) -> bool {
  text.chars().any(needs_wide_font)
}

/// `"<label>: <value>"`, or `"<label>: <blank>"` when the value is empty.
pub fn labelled_or_blank(label: &str, value: &str, blank: &str) -> String {
  let value = value.trim();
  if value.is_empty() {
    format!("{label}: {blank}")
  } else {
    format!("{label}: {value}")
  }
}

/// Log-safe truncation for user-provided strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{head}… ({} chars total)", s.chars().count())
  }
}
