use anyhow::{Context, Result};
use seedbed_core::{EntityKind, EntityType, Filter, NewRecord, delete_filter};
use seedbed_store::{PostgresOptions, PostgresStore, Store, WriteMode};
use std::env;

const FIXTURE_SQL: &str = r#"
drop schema if exists seedbed_it cascade;
create schema seedbed_it;
create extension if not exists pgcrypto;
create table seedbed_it.board (
  id uuid primary key default gen_random_uuid(),
  slug text not null unique,
  name text not null
);
create table seedbed_it.category (
  id uuid primary key default gen_random_uuid(),
  board_id uuid not null references seedbed_it.board(id) on delete cascade,
  slug text not null unique,
  name text not null,
  position integer not null default 0
)
"#;

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

async fn reset_fixtures(store: &PostgresStore) -> Result<()> {
    for statement in FIXTURE_SQL.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }
        sqlx::query(sql)
            .execute(store.pool())
            .await
            .with_context(|| format!("executing fixture statement: {sql}"))?;
    }
    Ok(())
}

fn board() -> EntityType {
    EntityType::new("board", EntityKind::Board).with_natural_key(["slug"])
}

fn category() -> EntityType {
    EntityType::new("category", EntityKind::Category)
        .with_parents(["board"])
        .with_natural_key(["slug"])
        .with_protected_keys(["alpha", "beta"])
}

#[tokio::test]
async fn writes_upserts_and_clears_with_protection() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL for integration tests");
        return Ok(());
    };

    let options = PostgresOptions {
        schema: "seedbed_it".to_string(),
        ..PostgresOptions::default()
    };
    let store = PostgresStore::connect(&url, &options)
        .await
        .context("connecting to Postgres")?;
    reset_fixtures(&store).await?;

    let boards = store
        .write(
            &board(),
            vec![NewRecord::new().field("slug", "main").field("name", "Main")],
            WriteMode::for_entity(&board()),
        )
        .await?;
    let board_id = boards[0].id;

    let slugs = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];
    let candidates = slugs
        .iter()
        .map(|slug| {
            NewRecord::new()
                .field("slug", *slug)
                .field("name", slug.to_uppercase())
                .reference("board_id", board_id)
        })
        .collect();
    let written = store
        .write(&category(), candidates, WriteMode::for_entity(&category()))
        .await?;
    assert_eq!(written.len(), 6);
    assert!(written.iter().all(|record| record.references.get("board_id") == Some(&board_id)));

    let again = store
        .write(
            &category(),
            vec![
                NewRecord::new()
                    .field("slug", "gamma")
                    .field("name", "Renamed")
                    .reference("board_id", board_id),
            ],
            WriteMode::for_entity(&category()),
        )
        .await?;
    let gamma = written
        .iter()
        .find(|record| record.value_of("slug").as_deref() == Some("gamma"))
        .context("gamma written")?;
    assert_eq!(again[0].id, gamma.id, "upsert must keep the existing row");

    let deleted = store.delete(&category(), &delete_filter(&category())).await?;
    assert_eq!(deleted, 4);

    let remaining = store.read(&category(), &Filter::All, None).await?;
    let mut remaining: Vec<String> = remaining
        .iter()
        .filter_map(|record| record.value_of("slug"))
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["alpha", "beta"]);

    Ok(())
}
