//! In-batch deduplication and capping.

use topicflow_types::{merge_keywords, normalize_label, SimilarityConfig, TopicSignature, TopicTriple};

/// A triple after deduplication, with the number of raw triples it absorbed.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTriple {
    pub triple: TopicTriple,
    pub mentions: u32,
}

fn signature(triple: &TopicTriple) -> TopicSignature {
    TopicSignature {
        label: triple.joined_labels(),
        keywords: triple.keywords.clone(),
    }
}

/// Normalized label path; equal paths resolve to the same topic id.
fn label_path(triple: &TopicTriple) -> [String; 3] {
    [
        normalize_label(&triple.topic_label),
        normalize_label(&triple.subtopic_label),
        normalize_label(&triple.subsubtopic_label),
    ]
}

/// Greedily group triples whose similarity to the group's first member is
/// at least `merge_threshold`, or whose label path is identical, then merge
/// each group.
///
/// Within a group the highest-confidence labels win (earliest on ties),
/// keywords are unioned starting from the winner's and capped, and
/// confidence is averaged.
pub fn dedup(
    triples: Vec<TopicTriple>,
    similarity: &SimilarityConfig,
    keyword_cap: usize,
) -> Vec<MergedTriple> {
    let signatures: Vec<TopicSignature> = triples.iter().map(signature).collect();
    let paths: Vec<[String; 3]> = triples.iter().map(label_path).collect();
    let mut used = vec![false; triples.len()];
    let mut merged = Vec::new();

    for i in 0..triples.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group = vec![i];

        for j in (i + 1)..triples.len() {
            if used[j] {
                continue;
            }
            if paths[i] == paths[j]
                || similarity.similarity(&signatures[i], &signatures[j]) >= similarity.merge_threshold
            {
                used[j] = true;
                group.push(j);
            }
        }

        merged.push(merge_group(&triples, &group, keyword_cap));
    }

    merged
}

fn merge_group(triples: &[TopicTriple], group: &[usize], keyword_cap: usize) -> MergedTriple {
    let mut winner = group[0];
    for &idx in &group[1..] {
        if triples[idx].confidence > triples[winner].confidence {
            winner = idx;
        }
    }

    let mut triple = triples[winner].clone();
    let mut keywords = Vec::new();
    merge_keywords(&mut keywords, &triples[winner].keywords, keyword_cap);
    for &idx in group {
        merge_keywords(&mut keywords, &triples[idx].keywords, keyword_cap);
    }
    triple.keywords = keywords;

    let total: f64 = group.iter().map(|&idx| triples[idx].confidence).sum();
    triple.confidence = total / group.len() as f64;

    MergedTriple {
        triple,
        mentions: group.len() as u32,
    }
}

/// Keep the `max` most confident triples; ties keep their original order.
pub fn cap(mut merged: Vec<MergedTriple>, max: usize) -> Vec<MergedTriple> {
    merged.sort_by(|a, b| {
        b.triple
            .confidence
            .partial_cmp(&a.triple.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged.truncate(max);
    merged
}
