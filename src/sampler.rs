//! Proportional question sampling across the selected patterns.
//!
//! For `n` patterns and a target of `t` items per section, every pattern gets
//! `t / n` items and the first `t % n` patterns (in selection order) get one
//! more. Each pattern's pool is shuffled and cut to its share; a pool that is
//! too small contributes what it has.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{Distribution, Pattern};

/// Items per section when the caller does not ask for a specific count.
pub const DEFAULT_TARGET_COUNT: usize = 5;

/// Per-pattern share of `target_count`, in selection order.
pub fn allocation(pattern_count: usize, target_count: usize) -> Vec<usize> {
  if pattern_count == 0 {
    return Vec::new();
  }
  let base = target_count / pattern_count;
  let remainder = target_count % pattern_count;
  (0..pattern_count).map(|i| base + usize::from(i < remainder)).collect()
}

/// Draw up to `target_count` items per section from `selected`.
pub fn distribute<R: Rng + ?Sized>(selected: &[&Pattern], target_count: usize, rng: &mut R) -> Distribution {
  let shares = allocation(selected.len(), target_count);
  let mut out = Distribution::default();
  // Sections are drawn one after another with the same shares.
  for (pattern, &count) in selected.iter().zip(&shares) {
    out.speaking1.extend(sample(&pattern.speaking1, count, rng));
  }
  for (pattern, &count) in selected.iter().zip(&shares) {
    out.speaking2.extend(sample(&pattern.speaking2, count, rng));
  }
  for (pattern, &count) in selected.iter().zip(&shares) {
    out.unscramble.extend(sample(&pattern.unscramble, count, rng));
  }
  out
}

fn sample<T: Clone, R: Rng + ?Sized>(pool: &[T], count: usize, rng: &mut R) -> Vec<T> {
  let mut items = pool.to_vec();
  items.shuffle(rng);
  items.truncate(count);
  items
}
