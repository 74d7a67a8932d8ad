//! Benchmarks for scoring and greedy assignment.
//!
//! Run with: cargo bench -p evaluator --bench assign_bench

use std::{hint::black_box, sync::Arc};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use embedding::HashingProvider;
use evaluator::{DetectedIssue, GroundTruthBug, SimilarityScorer, assign};

const CATEGORIES: [&str; 4] = ["security", "performance", "error_handling", "dead_code"];
const SEVERITIES: [&str; 3] = ["critical", "major", "minor"];

fn truths(n: usize) -> Vec<GroundTruthBug> {
  (0..n)
    .map(|i| GroundTruthBug {
      bug_id: format!("bug-{i}"),
      project: "bench".to_string(),
      file_path: format!("src/module_{}.py", i % 7),
      line_start: (i * 13) as u32,
      line_end: Some((i * 13 + 4) as u32),
      description: format!("Missing timeout on request {i} can hang the worker"),
      category: CATEGORIES[i % CATEGORIES.len()].to_string(),
      severity: SEVERITIES[i % SEVERITIES.len()].to_string(),
      commit_buggy: String::new(),
      commit_fixed: String::new(),
      code_snippet: Some("requests.get(url)".to_string()),
      recommendation: None,
    })
    .collect()
}

fn detections(n: usize) -> Vec<DetectedIssue> {
  (0..n)
    .map(|i| DetectedIssue {
      title: format!("Request without timeout #{i}"),
      description: "HTTP call has no timeout and may hang".to_string(),
      file: format!("./src/module_{}.py", i % 7),
      line: format!("{}", i * 13 + 2),
      severity: SEVERITIES[(i + 1) % SEVERITIES.len()].to_string(),
      category: CATEGORIES[i % CATEGORIES.len()].to_string(),
      recommendation: "Pass timeout=".to_string(),
    })
    .collect()
}

fn bench_score_and_assign(c: &mut Criterion) {
  let scorer = SimilarityScorer::new(Arc::new(HashingProvider::new(256)));
  let mut group = c.benchmark_group("score_and_assign");

  for n in [10usize, 40] {
    let truths = truths(n);
    let detections = detections(n);

    group.bench_with_input(BenchmarkId::new("score_matrix", n), &n, |b, _| {
      b.iter(|| scorer.score_matrix(black_box(&detections), black_box(&truths)))
    });

    let matrix = scorer.score_matrix(&detections, &truths);
    group.bench_with_input(BenchmarkId::new("assign", n), &n, |b, _| {
      b.iter(|| assign(black_box(&matrix), black_box(&truths)))
    });
  }

  group.finish();
}

criterion_group!(benches, bench_score_and_assign);
criterion_main!(benches);
