//! Domain generators for the content and community entity types.

pub mod community;
pub mod content;

use rand::seq::SliceRandom;

use seedbed_core::{Record, RecordId};

use crate::generators::GeneratorContext;

/// Up to `count` distinct (left, right) parent pairs, shuffled.
///
/// Natural keys over two references cannot exceed the pair space, so the
/// result is shorter than `count` when parents are scarce.
pub(crate) fn unique_pairs(
    count: usize,
    left: &[Record],
    right: &[Record],
    ctx: &mut GeneratorContext,
) -> Vec<(RecordId, RecordId)> {
    let mut pairs: Vec<(RecordId, RecordId)> = left
        .iter()
        .flat_map(|l| right.iter().map(move |r| (l.id, r.id)))
        .collect();
    pairs.shuffle(ctx.rng());
    pairs.truncate(count);
    pairs
}

/// Capitalize the first letter of each word.
pub(crate) fn title_case(value: &str) -> String {
    value
        .split(|ch: char| ch == '-' || ch.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
