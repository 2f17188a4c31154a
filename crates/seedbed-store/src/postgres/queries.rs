use std::collections::BTreeSet;

use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use seedbed_core::{EntityType, Filter};

use crate::store::WriteMode;

const ROW_ALIAS: &str = "t";

pub fn select_rows<'a>(
    schema: &str,
    entity: &EntityType,
    filter: &Filter,
    limit: Option<usize>,
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new("select to_jsonb(t) from ");
    query.push(qualified(schema, entity));
    query.push(" as t");
    push_filter(&mut query, filter);
    query.push(" order by t.\"id\"");
    if let Some(limit) = limit {
        query.push(" limit ");
        query.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    query
}

/// Insert via `jsonb_populate_recordset` so column types come from the table.
pub fn insert_rows<'a>(
    schema: &str,
    entity: &EntityType,
    columns: &BTreeSet<String>,
    payload: Vec<Value>,
    mode: &WriteMode,
) -> QueryBuilder<'a, Postgres> {
    let table = qualified(schema, entity);
    let column_list = columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");

    let mut query = QueryBuilder::new("insert into ");
    query.push(&table);
    query.push(" as t (");
    query.push(&column_list);
    query.push(") select ");
    query.push(&column_list);
    query.push(" from jsonb_populate_recordset(null::");
    query.push(&table);
    query.push(", ");
    query.push_bind(Json(payload));
    query.push(")");

    if let WriteMode::Upsert { natural_key } = mode {
        let conflict = natural_key
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        let mut updates: Vec<String> = columns
            .iter()
            .filter(|column| !natural_key.contains(column))
            .map(|column| format!("{0} = excluded.{0}", quote_ident(column)))
            .collect();
        // `do nothing` would not return the conflicting rows.
        if updates.is_empty() {
            if let Some(first) = natural_key.first() {
                updates.push(format!("{0} = excluded.{0}", quote_ident(first)));
            }
        }
        query.push(" on conflict (");
        query.push(conflict);
        query.push(") do update set ");
        query.push(updates.join(", "));
    }

    query.push(" returning to_jsonb(t)");
    query
}

pub fn delete_rows<'a>(
    schema: &str,
    entity: &EntityType,
    filter: &Filter,
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new("delete from ");
    query.push(qualified(schema, entity));
    query.push(" as t");
    push_filter(&mut query, filter);
    query
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {}
        Filter::FieldNotIn { field, values } => {
            let column = format!("{ROW_ALIAS}.{}", quote_ident(field));
            query.push(format!(" where ({column} is null or {column}::text <> all("));
            query.push_bind(values.iter().cloned().collect::<Vec<String>>());
            query.push("))");
        }
    }
}

fn qualified(schema: &str, entity: &EntityType) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(entity.table()))
}

fn quote_ident(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use seedbed_core::EntityKind;

    use super::*;

    fn category() -> EntityType {
        EntityType::new("category", EntityKind::Category)
            .with_parents(["board"])
            .with_natural_key(["slug"])
            .with_protected_keys(["general"])
    }

    #[test]
    fn delete_encodes_protected_exclusion() {
        let entity = category();
        let filter = seedbed_core::delete_filter(&entity);
        let query = delete_rows("public", &entity, &filter);
        assert_eq!(
            query.sql(),
            "delete from \"public\".\"category\" as t where (t.\"slug\" is null or t.\"slug\"::text <> all($1))"
        );
    }

    #[test]
    fn upsert_updates_non_key_columns() {
        let entity = category();
        let columns = BTreeSet::from([
            "board_id".to_string(),
            "name".to_string(),
            "slug".to_string(),
        ]);
        let query = insert_rows(
            "public",
            &entity,
            &columns,
            Vec::new(),
            &WriteMode::for_entity(&entity),
        );
        let sql = query.sql();
        assert!(sql.starts_with("insert into \"public\".\"category\" as t (\"board_id\", \"name\", \"slug\")"));
        assert!(sql.contains("on conflict (\"slug\") do update set \"board_id\" = excluded.\"board_id\", \"name\" = excluded.\"name\""));
        assert!(sql.ends_with("returning to_jsonb(t)"));
    }

    #[test]
    fn select_applies_limit_and_filter() {
        let entity = category();
        let filter = Filter::FieldNotIn {
            field: "slug".to_string(),
            values: BTreeSet::from(["general".to_string()]),
        };
        let query = select_rows("app", &entity, &filter, Some(10));
        assert_eq!(
            query.sql(),
            "select to_jsonb(t) from \"app\".\"category\" as t where (t.\"slug\" is null or t.\"slug\"::text <> all($1)) order by t.\"id\" limit $2"
        );
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
