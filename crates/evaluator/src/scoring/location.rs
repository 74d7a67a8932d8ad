//! File and line proximity.

use std::{ops::RangeInclusive, sync::LazyLock};

use regex::Regex;
use tracing::warn;

/// Same file with no usable line info on one side.
pub const NEUTRAL_LOCATION: f64 = 0.5;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern compiles"));

/// A set of line numbers stored as sorted, disjoint inclusive spans.
///
/// Adjacent and overlapping spans are merged, so two sets holding the same
/// lines compare equal however they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSet {
  spans: Vec<RangeInclusive<u32>>,
}

impl LineSet {
  pub fn from_spans(spans: impl IntoIterator<Item = RangeInclusive<u32>>) -> Self {
    let mut sorted: Vec<_> = spans.into_iter().filter(|span| !span.is_empty()).collect();
    sorted.sort_by_key(|span| (*span.start(), *span.end()));

    let mut merged: Vec<RangeInclusive<u32>> = Vec::with_capacity(sorted.len());
    for span in sorted {
      match merged.last_mut() {
        Some(last) if *span.start() <= last.end().saturating_add(1) => {
          if span.end() > last.end() {
            *last = *last.start()..=*span.end();
          }
        }
        _ => merged.push(span),
      }
    }
    Self { spans: merged }
  }

  pub fn spans(&self) -> &[RangeInclusive<u32>] {
    &self.spans
  }

  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }

  pub fn contains(&self, line: u32) -> bool {
    self.spans.iter().any(|span| span.contains(&line))
  }
}

impl FromIterator<u32> for LineSet {
  fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
    Self::from_spans(iter.into_iter().map(|n| n..=n))
  }
}

/// Canonical form for path comparison.
///
/// Lower-cased, separators unified to `/`, surrounding slashes and a leading `./` removed.
pub fn normalize_file_path(path: &str) -> String {
  let trimmed = path.trim().trim_matches(|c: char| c == '/' || c == '\\');
  let unified = trimmed.replace('\\', "/");
  let stripped = unified.strip_prefix("./").unwrap_or(&unified);
  stripped.to_lowercase()
}

/// Tolerant line-number parser.
///
/// Accepts a single number, an inclusive `start-end` range, or a comma list.
/// Anything else falls back to every integer found in the text. Unparsable
/// input yields an empty set, never an error.
pub fn extract_line_numbers(line: &str) -> LineSet {
  let line = line.trim();
  if line.is_empty() {
    return LineSet::default();
  }

  if let Ok(n) = line.parse::<u32>() {
    return LineSet::from_iter([n]);
  }

  if let Some((start, end)) = line.split_once('-')
    && let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>())
  {
    if start > end {
      warn!("Reversed line range {}-{}, keeping only its endpoints", start, end);
      return LineSet::from_iter([start, end]);
    }
    return LineSet::from_spans([start..=end]);
  }

  if line.contains(',') {
    let parsed: Result<Vec<u32>, _> = line.split(',').map(|part| part.trim().parse::<u32>()).collect();
    if let Ok(numbers) = parsed {
      return numbers.into_iter().collect();
    }
  }

  DIGITS
    .find_iter(line)
    .filter_map(|m| m.as_str().parse::<u32>().ok())
    .collect()
}

fn span_gap(a: &RangeInclusive<u32>, b: &RangeInclusive<u32>) -> u32 {
  if a.end() < b.start() {
    b.start() - a.end()
  } else if b.end() < a.start() {
    a.start() - b.end()
  } else {
    0
  }
}

/// Minimum absolute distance between any line in `a` and any line in `b`.
pub fn min_line_distance(a: &LineSet, b: &LineSet) -> Option<u32> {
  let (a, b) = (a.spans(), b.spans());
  let (mut i, mut j) = (0, 0);
  let mut best: Option<u32> = None;

  while i < a.len() && j < b.len() {
    let gap = span_gap(&a[i], &b[j]);
    if gap == 0 {
      return Some(0);
    }
    best = Some(best.map_or(gap, |d| d.min(gap)));

    if a[i].end() < b[j].end() {
      i += 1;
    } else {
      j += 1;
    }
  }
  best
}

/// Map a line distance onto the proximity step function.
pub fn proximity_score(distance: u32) -> f64 {
  match distance {
    0 => 1.0,
    1..=3 => 0.9,
    4..=8 => 0.7,
    9..=15 => 0.5,
    _ => 0.3,
  }
}

/// Location similarity between a detection and a ground truth location.
///
/// Different files score zero. Same file with line info missing on either
/// side scores [`NEUTRAL_LOCATION`].
pub fn location_similarity(detected_file: &str, detected_lines: &LineSet, truth_file: &str, truth_lines: &LineSet) -> f64 {
  if normalize_file_path(detected_file) != normalize_file_path(truth_file) {
    return 0.0;
  }

  match min_line_distance(detected_lines, truth_lines) {
    Some(distance) => proximity_score(distance),
    None => NEUTRAL_LOCATION,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lines(values: &[u32]) -> LineSet {
    values.iter().copied().collect()
  }

  #[test]
  fn test_normalize_file_path() {
    assert_eq!(normalize_file_path("./src/App.py"), "src/app.py");
    assert_eq!(normalize_file_path("\\src\\app.py\\"), "src/app.py");
    assert_eq!(normalize_file_path("/src/app.py/"), "src/app.py");
    assert_eq!(normalize_file_path(".\\src\\app.py"), "src/app.py");
    assert_eq!(normalize_file_path(""), "");
  }

  #[test]
  fn test_extract_single_range_and_list() {
    assert_eq!(extract_line_numbers("42"), lines(&[42]));
    assert_eq!(extract_line_numbers("20-25"), lines(&[20, 21, 22, 23, 24, 25]));
    assert_eq!(extract_line_numbers("7,9,11"), lines(&[7, 9, 11]));
    assert_eq!(extract_line_numbers(" 7, 9 ,11 "), lines(&[7, 9, 11]));
    assert_eq!(extract_line_numbers(""), LineSet::default());
  }

  #[test]
  fn test_extract_falls_back_to_digit_scan() {
    assert_eq!(extract_line_numbers("line 10-12"), lines(&[10, 12]));
    assert_eq!(extract_line_numbers("L42 and L50"), lines(&[42, 50]));
    assert_eq!(extract_line_numbers("7, 9, around 11"), lines(&[7, 9, 11]));
    assert_eq!(extract_line_numbers("unknown"), LineSet::default());
  }

  #[test]
  fn test_extract_reversed_range_keeps_endpoints() {
    let reversed = extract_line_numbers("25-20");
    assert_eq!(reversed, lines(&[20, 25]));
    assert!(!reversed.contains(22));
    assert_eq!(min_line_distance(&reversed, &lines(&[22])), Some(2));
  }

  #[test]
  fn test_wide_range_keeps_interior_lines() {
    let wide = extract_line_numbers("1-4000000");
    assert_eq!(wide.spans(), &[1..=4_000_000]);
    assert!(wide.contains(2_500_000));
    assert_eq!(min_line_distance(&lines(&[500]), &extract_line_numbers("1-20000")), Some(0));
    assert_eq!(min_line_distance(&lines(&[20_010]), &extract_line_numbers("1-20000")), Some(10));
  }

  #[test]
  fn test_line_set_merges_spans() {
    let set = LineSet::from_spans([10..=12, 1..=3, 4..=4, 11..=20]);
    assert_eq!(set.spans(), &[1..=4, 10..=20]);
    assert_eq!(lines(&[3, 1, 2, 2]), LineSet::from_spans([1..=3]));
  }

  #[test]
  fn test_min_line_distance() {
    assert_eq!(min_line_distance(&lines(&[11]), &lines(&[10, 11, 12])), Some(0));
    assert_eq!(min_line_distance(&lines(&[1, 100]), &lines(&[50, 97])), Some(3));
    assert_eq!(min_line_distance(&lines(&[]), &lines(&[1])), None);
    assert_eq!(min_line_distance(&lines(&[1, 40]), &LineSet::from_spans([10..=20, 45..=50])), Some(5));
  }

  #[test]
  fn test_proximity_steps() {
    assert_eq!(proximity_score(0), 1.0);
    assert_eq!(proximity_score(3), 0.9);
    assert_eq!(proximity_score(4), 0.7);
    assert_eq!(proximity_score(8), 0.7);
    assert_eq!(proximity_score(15), 0.5);
    assert_eq!(proximity_score(16), 0.3);
  }

  #[test]
  fn test_location_similarity() {
    let truth = lines(&[10, 11, 12]);
    assert_eq!(location_similarity("a.py", &lines(&[11]), "a.py", &truth), 1.0);
    assert_eq!(location_similarity("./A.py", &lines(&[14]), "a.py", &truth), 0.9);
    assert_eq!(location_similarity("b.py", &lines(&[11]), "a.py", &truth), 0.0);
    assert_eq!(location_similarity("a.py", &LineSet::default(), "a.py", &truth), NEUTRAL_LOCATION);
  }
}
