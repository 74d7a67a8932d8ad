//! Regex heuristics for vulnerability types and bug categories.
//!
//! Both tables are fixed at compile time and built once. No pattern is ever
//! compiled from user input.

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;

/// Neither side matched any pattern: absence of signal, not disagreement.
pub const NEUTRAL_PATTERN: f64 = 0.5;

/// Tag → case-insensitive patterns, in a fixed order.
#[derive(Debug)]
pub struct PatternTable {
  entries: Vec<(&'static str, Vec<Regex>)>,
}

impl PatternTable {
  fn compile(defs: &[(&'static str, &[&str])]) -> Self {
    let entries = defs
      .iter()
      .map(|(tag, patterns)| {
        let compiled = patterns
          .iter()
          .map(|p| Regex::new(&format!("(?i){}", p)).expect("static pattern compiles"))
          .collect();
        (*tag, compiled)
      })
      .collect();
    Self { entries }
  }

  /// Tags with at least one pattern matching `text`.
  pub fn tags_in<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'static str> + 'a {
    self
      .entries
      .iter()
      .filter(move |(_, patterns)| patterns.iter().any(|re| re.is_match(text)))
      .map(|(tag, _)| *tag)
  }

  pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.entries.iter().map(|(tag, _)| *tag)
  }
}

const VULNERABILITY_DEFS: &[(&str, &[&str])] = &[
  (
    "sql_injection",
    &[
      r"sql.{0,20}injection",
      r"string.{0,20}formatting.{0,20}quer",
      r"f.?string.{0,20}quer",
      r"concatenat.{0,20}quer",
      r"parameterized.{0,20}quer",
    ],
  ),
  (
    "hardcoded_secret",
    &[
      r"hardcoded.{0,20}(secret|password|key|credential)",
      r"(secret|password|key).{0,20}(hardcoded|plain.?text)",
      r"credential.{0,20}source.?code",
    ],
  ),
  (
    "command_injection",
    &[
      r"command.{0,20}injection",
      r"shell.{0,20}true",
      r"subprocess.{0,20}shell",
      r"os\.system",
    ],
  ),
  (
    "pickle_vulnerability",
    &[
      r"pickle.{0,20}(unsafe|security|deserializ)",
      r"deserializ.{0,20}untrusted",
      r"arbitrary.{0,20}code.{0,20}execution",
    ],
  ),
];

const CATEGORY_DEFS: &[(&str, &[&str])] = &[
  (
    "performance",
    &[
      r"rate.{0,20}limit(?:ing)?",
      r"timeout",
      r"batch.{0,20}(?:operation|query)",
      r"inefficient",
      r"n\+1",
      r"optimization",
      r"slow.{0,20}query",
      r"memory.{0,20}leak",
      r"high.{0,20}cpu",
      r"per.{0,20}request",
      r"loop.{0,20}(?:per|each)",
      r"cache.{0,20}(?:miss|invalidat)",
      r"(?:database|db).{0,20}(?:call|query).*(?:loop|each)",
      r"automatic.{0,20}save",
      r"frequent.{0,20}(?:save|write)",
    ],
  ),
  (
    "validation",
    &[
      r"input.{0,20}validation",
      r"sanitiz",
      r"file.{0,20}size",
      r"type.{0,20}check",
      r"format.{0,20}validation",
      r"bounds.{0,20}check",
      r"length.{0,20}validation",
      r"whitelist",
      r"blacklist",
      r"no.{0,20}validation",
      r"(?:size|type).{0,20}validation",
      r"path.{0,20}validation",
      r"email.{0,20}validation",
      r"backup.{0,20}(?:path|file)",
      r"config.{0,20}validation",
    ],
  ),
  (
    "error_handling",
    &[
      r"exception.{0,20}handling",
      r"try.{0,20}catch",
      r"error.{0,20}suppress",
      r"silent.{0,20}fail",
      r"broad.{0,20}except",
      r"bare.{0,20}except",
      r"error.{0,20}handling",
      r"fault.{0,20}tolerance",
      r"(?:except|catch).*(?:pass|ignore)",
      r"\bpass\b.*exception",
      r"swallow(?:ed|ing)",
      r"missing.{0,20}error",
    ],
  ),
  (
    "resource_management",
    &[
      r"resource.{0,20}leak",
      r"file.{0,20}handle",
      r"connection.{0,20}pool",
      r"memory.{0,20}management",
      r"garbage.{0,20}collection",
      r"cleanup",
      r"(?:connection|socket|file).{0,20}(?:not.{0,20})?clos(?:e|ed|ing)",
      r"(?:resource|handle).{0,20}cleanup",
      r"(?:set|assign).{0,20}none",
    ],
  ),
  (
    "authorization",
    &[
      r"access.{0,20}control",
      r"permission.{0,20}check",
      r"privilege.{0,20}escalation",
      r"authorization",
      r"rbac",
      r"role.{0,20}based",
      r"(?:missing|no).{0,20}(?:authorization|permission)",
      r"requesting.{0,20}user",
      r"verify.{0,20}permission",
    ],
  ),
  (
    "reliability",
    &[
      r"timeout",
      r"hang(?:ing)?",
      r"request.{0,20}timeout",
      r"(?:connection|network).{0,20}(?:timeout|hang)",
      r"prevent.{0,20}hanging",
      r"reliability",
      r"fault.{0,20}tolerance",
    ],
  ),
  (
    "dead_code",
    &[
      r"dead.{0,20}code",
      r"unused",
      r"unreachable",
      r"never.{0,20}(?:used|called|reached)",
      r"obsolete",
      r"(?:import|function|method).{0,20}(?:not|never).{0,20}used",
      r"after.{0,20}return",
      r"unreachable.{0,20}code",
    ],
  ),
];

pub static VULNERABILITY_PATTERNS: LazyLock<PatternTable> = LazyLock::new(|| PatternTable::compile(VULNERABILITY_DEFS));
pub static CATEGORY_PATTERNS: LazyLock<PatternTable> = LazyLock::new(|| PatternTable::compile(CATEGORY_DEFS));

/// Every vulnerability and category tag matched anywhere in `text`.
pub fn matched_tags(text: &str) -> BTreeSet<&'static str> {
  VULNERABILITY_PATTERNS
    .tags_in(text)
    .chain(CATEGORY_PATTERNS.tags_in(text))
    .collect()
}

/// 1.0 when the tag sets intersect, neutral when both are empty, else 0.0.
pub fn pattern_similarity(detected_tags: &BTreeSet<&'static str>, truth_tags: &BTreeSet<&'static str>) -> f64 {
  if detected_tags.is_empty() && truth_tags.is_empty() {
    return NEUTRAL_PATTERN;
  }

  if detected_tags.intersection(truth_tags).next().is_some() {
    1.0
  } else {
    0.0
  }
}
