use std::collections::HashSet;

use fake::Fake;
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use rand::Rng;

use seedbed_core::{NewRecord, Record};

use super::{title_case, unique_pairs};
use crate::generators::GeneratorContext;

const BOARD_VISIBILITY: &[(&str, u32)] = &[("public", 70), ("members", 25), ("private", 5)];

const CATEGORY_TOPICS: &[&str] = &[
    "announcements",
    "guides",
    "help",
    "showcase",
    "off-topic",
    "events",
    "feedback",
    "releases",
];

const ITEM_STATUS: &[(&str, u32)] = &[
    ("published", 60),
    ("draft", 25),
    ("archived", 10),
    ("flagged", 5),
];

const COMMENT_STATUS: &[(&str, u32)] = &[("visible", 85), ("hidden", 10), ("flagged", 5)];

const REACTION_KINDS: &[(&str, u32)] = &[
    ("like", 55),
    ("love", 20),
    ("laugh", 10),
    ("insightful", 10),
    ("sad", 5),
];

pub fn boards(count: usize, ctx: &mut GeneratorContext) -> Vec<NewRecord> {
    let mut seen = HashSet::new();
    (0..count)
        .map(|_| {
            let word: String = Word().fake_with_rng(ctx.rng());
            let slug = ctx.unique_token(&word.to_lowercase(), &mut seen);
            let description: String = Sentence(6..12).fake_with_rng(ctx.rng());
            NewRecord::new()
                .field("name", title_case(&word))
                .field("slug", slug)
                .field("description", description)
                .field("visibility", ctx.weighted(BOARD_VISIBILITY))
                .field("created_at", ctx.past(365).to_rfc3339())
        })
        .collect()
}

pub fn categories(count: usize, boards: &[Record], ctx: &mut GeneratorContext) -> Vec<NewRecord> {
    let mut seen = HashSet::new();
    (0..count)
        .map(|index| {
            let topic = CATEGORY_TOPICS[ctx.rng().random_range(0..CATEGORY_TOPICS.len())];
            let board_id = ctx.next_parent("board", boards);
            NewRecord::new()
                .field("name", title_case(topic))
                .field("slug", ctx.unique_token(topic, &mut seen))
                .field("position", index as u64)
                .field("created_at", ctx.past(180).to_rfc3339())
                .reference("board_id", board_id)
        })
        .collect()
}

pub fn items(count: usize, categories: &[Record], ctx: &mut GeneratorContext) -> Vec<NewRecord> {
    (0..count)
        .map(|_| {
            let title: String = Sentence(3..8).fake_with_rng(ctx.rng());
            let paragraphs: Vec<String> = (0..ctx.rng().random_range(1..=3))
                .map(|_| Paragraph(2..5).fake_with_rng(ctx.rng()))
                .collect();
            let status = ctx.weighted(ITEM_STATUS);
            let created_at = ctx.past(120);
            // Only items that went live accumulate views.
            let view_count: u64 = match status {
                "published" | "archived" => ctx.rng().random_range(0..=5_000),
                _ => 0,
            };
            let category_id = ctx.next_parent("category", categories);

            let mut record = NewRecord::new()
                .field("title", title.trim_end_matches('.').to_string())
                .field("body", paragraphs.join("\n\n"))
                .field("status", status)
                .field("view_count", view_count)
                .field("score", ctx.rng().random_range(-20_i64..=250))
                .field("created_at", created_at.to_rfc3339())
                .reference("category_id", category_id);
            if view_count > 0 {
                let published_at = created_at
                    + chrono::Duration::minutes(ctx.rng().random_range(0..=24 * 60));
                record = record.field("published_at", published_at.min(ctx.now()).to_rfc3339());
            }
            record
        })
        .collect()
}

pub fn comments(
    count: usize,
    items: &[Record],
    identities: &[Record],
    ctx: &mut GeneratorContext,
) -> Vec<NewRecord> {
    (0..count)
        .map(|_| {
            let body: String = Sentence(4..16).fake_with_rng(ctx.rng());
            let item_id = ctx.next_parent("content-item", items);
            let author_id = ctx.any_parent(identities);
            NewRecord::new()
                .field("body", body)
                .field("status", ctx.weighted(COMMENT_STATUS))
                .field("upvotes", ctx.rng().random_range(0_u64..=100))
                .field("created_at", ctx.past(60).to_rfc3339())
                .reference("content_item_id", item_id)
                .reference("identity_id", author_id)
        })
        .collect()
}

pub fn reactions(
    count: usize,
    items: &[Record],
    identities: &[Record],
    ctx: &mut GeneratorContext,
) -> Vec<NewRecord> {
    unique_pairs(count, items, identities, ctx)
        .into_iter()
        .map(|(item_id, identity_id)| {
            NewRecord::new()
                .field("kind", ctx.weighted(REACTION_KINDS))
                .field("created_at", ctx.past(30).to_rfc3339())
                .reference("content_item_id", item_id)
                .reference("identity_id", identity_id)
        })
        .collect()
}
