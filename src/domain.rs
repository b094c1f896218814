//! Domain models: pattern overview entries, question pools per pattern, and the
//! per-request distribution of questions across sections.

use serde::Serialize;

/// Unit shown when the overview sheet has none for a pattern.
pub const DEFAULT_UNIT: &str = "Level A";

/// Worksheet section a detail row belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
  SpeakingI,
  SpeakingII,
  Unscramble,
}

impl Section {
  /// Exact label match against the "section" column. Anything else is not a section.
  pub fn from_label(label: &str) -> Option<Self> {
    match label {
      "Speaking I" => Some(Section::SpeakingI),
      "Speaking II" => Some(Section::SpeakingII),
      "Unscramble" => Some(Section::Unscramble),
      _ => None,
    }
  }
}

/// One row of the overview sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternOverviewEntry {
  pub number: i64,
  pub name: String,
  pub unit: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeakingPair {
  pub prompt: String,
  pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnscrambleItem {
  pub prompt: String,
  /// Scrambled tokens with the surrounding parentheses removed.
  pub scrambled: String,
  pub answer: String,
}

/// Aggregate question record for one pattern ID. Pools keep sheet row order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
  pub pattern_num: i64,
  pub pattern_name: String,
  pub unit: String,
  pub speaking1: Vec<String>,
  pub speaking2: Vec<SpeakingPair>,
  pub unscramble: Vec<UnscrambleItem>,
}

impl Pattern {
  /// Empty aggregate, seeded from the overview entry when there is one.
  pub fn empty(pattern_num: i64, overview: Option<&PatternOverviewEntry>) -> Self {
    Self {
      pattern_num,
      pattern_name: overview.map(|o| o.name.clone()).unwrap_or_default(),
      unit: overview
        .map(|o| o.unit.clone())
        .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
      speaking1: Vec::new(),
      speaking2: Vec::new(),
      unscramble: Vec::new(),
    }
  }

  pub fn summary(&self) -> PatternSummary {
    PatternSummary {
      number: self.pattern_num,
      name: self.pattern_name.clone(),
      unit: self.unit.clone(),
    }
  }
}

/// Questions picked for one worksheet, concatenated in selection order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Distribution {
  pub speaking1: Vec<String>,
  pub speaking2: Vec<SpeakingPair>,
  pub unscramble: Vec<UnscrambleItem>,
}

impl Distribution {
  pub fn is_empty(&self) -> bool {
    self.speaking1.is_empty() && self.speaking2.is_empty() && self.unscramble.is_empty()
  }
}

/// Listing entry for the pattern picker.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PatternSummary {
  pub number: i64,
  pub name: String,
  pub unit: String,
}
