use std::collections::HashSet;

use fake::Fake;
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Sentence;
use rand::Rng;

use seedbed_core::{NewRecord, Record};

use super::unique_pairs;
use crate::generators::GeneratorContext;

const TAG_VOCABULARY: &[&str] = &[
    "rust", "design", "backend", "frontend", "ops", "security", "question", "howto", "release",
    "bug", "idea", "meta",
];

const GROUP_POLICY: &[(&str, u32)] = &[("open", 60), ("invite", 30), ("closed", 10)];

const MEMBER_ROLE: &[(&str, u32)] = &[("member", 80), ("moderator", 15), ("owner", 5)];

pub fn tags(count: usize, ctx: &mut GeneratorContext) -> Vec<NewRecord> {
    let mut seen = HashSet::new();
    (0..count)
        .map(|_| {
            let base = TAG_VOCABULARY[ctx.rng().random_range(0..TAG_VOCABULARY.len())];
            let color = format!("#{:06x}", ctx.rng().random::<u32>() & 0x00ff_ffff);
            NewRecord::new()
                .field("name", ctx.unique_token(base, &mut seen))
                .field("color", color)
                .field("usage_count", ctx.rng().random_range(0_u64..=500))
        })
        .collect()
}

pub fn groups(count: usize, identities: &[Record], ctx: &mut GeneratorContext) -> Vec<NewRecord> {
    (0..count)
        .map(|_| {
            let name: String = CompanyName().fake_with_rng(ctx.rng());
            let about: String = Sentence(5..10).fake_with_rng(ctx.rng());
            let owner_id = ctx.next_parent("identity", identities);
            NewRecord::new()
                .field("name", name)
                .field("about", about)
                .field("join_policy", ctx.weighted(GROUP_POLICY))
                .field("member_limit", ctx.rng().random_range(10_u64..=500))
                .field("created_at", ctx.past(365).to_rfc3339())
                .reference("identity_id", owner_id)
        })
        .collect()
}

pub fn memberships(
    count: usize,
    groups: &[Record],
    identities: &[Record],
    ctx: &mut GeneratorContext,
) -> Vec<NewRecord> {
    unique_pairs(count, groups, identities, ctx)
        .into_iter()
        .map(|(group_id, identity_id)| {
            NewRecord::new()
                .field("role", ctx.weighted(MEMBER_ROLE))
                .field("joined_at", ctx.past(180).to_rfc3339())
                .reference("group_id", group_id)
                .reference("identity_id", identity_id)
        })
        .collect()
}
