use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{now_string, rejected};
use crate::error::Result;
use crate::query::{compare_values, Query};
use crate::store::Store;
use crate::tables::{self, ColumnDefault, IdKind, TableSchema};

const SERVICE: &str = "memory store";

#[derive(Debug, Default)]
struct MemTable {
    last_id: i64,
    rows: Vec<Map<String, Value>>,
}

/// Rows kept in process, queried with the same filter semantics as the
/// hosted database.
pub struct MemoryStore {
    schema: HashMap<String, TableSchema>,
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemoryStore {
    /// Schemaless store: no generated ids, no column defaults.
    pub fn new() -> Self {
        Self::with_schema(Vec::new())
    }

    pub fn with_schema(schema: Vec<TableSchema>) -> Self {
        Self {
            schema: schema.into_iter().map(|s| (s.name.to_string(), s)).collect(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Store with the newsdesk table defaults and the seeded role rows.
    pub fn newsdesk() -> Self {
        let store = Self::with_schema(tables::schema());
        let mut tables_map = HashMap::new();
        for (table, row) in tables::seed_rows() {
            let entry: &mut MemTable = tables_map.entry(table.to_string()).or_default();
            // Seed rows are literal objects with explicit ids.
            if let Ok(prepared) = prepare_row(store.schema.get(table), entry, row) {
                entry.rows.push(prepared);
            }
        }
        Self {
            schema: store.schema,
            tables: RwLock::new(tables_map),
        }
    }

    /// Snapshot of every row in `table`, in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&query.table) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&Map<String, Value>> =
            table.rows.iter().filter(|r| query.matches(r)).collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let left = a.get(&order.column).unwrap_or(&Value::Null);
                let right = b.get(&order.column).unwrap_or(&Value::Null);
                let ord = compare_values(left, right);
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let rows: Vec<&Map<String, Value>> = match query.range {
            Some((first, last)) => rows
                .into_iter()
                .skip(first as usize)
                .take((last - first + 1) as usize)
                .collect(),
            None => rows,
        };

        Ok(rows
            .into_iter()
            .map(|r| Value::Object(project(r, &query.columns)))
            .collect())
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&query.table)
            .map(|t| t.rows.iter().filter(|r| query.matches(r)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry(table.to_string()).or_default();
        let schema = self.schema.get(table);

        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let prepared = prepare_row(schema, entry, row)?;
            entry.rows.push(prepared.clone());
            inserted.push(Value::Object(prepared));
        }
        debug!(table, count = inserted.len(), "memory insert");
        Ok(inserted)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>> {
        let Value::Object(patch) = patch else {
            return Err(rejected(SERVICE, 400, "update patch must be a JSON object"));
        };

        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(&query.table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in table.rows.iter_mut().filter(|r| query.matches(r)) {
            for (k, v) in &patch {
                row.insert(k.clone(), v.clone());
            }
            updated.push(Value::Object(row.clone()));
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Value>> {
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(&query.table) else {
            return Ok(Vec::new());
        };

        let (removed, kept): (Vec<_>, Vec<_>) =
            table.rows.drain(..).partition(|r| query.matches(r));
        table.rows = kept;
        Ok(removed.into_iter().map(Value::Object).collect())
    }
}

/// Apply generated ids and column defaults to a row about to be inserted.
fn prepare_row(
    schema: Option<&TableSchema>,
    table: &mut MemTable,
    row: Value,
) -> Result<Map<String, Value>> {
    let Value::Object(mut row) = row else {
        return Err(rejected(SERVICE, 400, "row must be a JSON object"));
    };

    let Some(schema) = schema else {
        return Ok(row);
    };

    match schema.id {
        Some(IdKind::Serial) => match row.get("id").and_then(Value::as_i64) {
            Some(id) => table.last_id = table.last_id.max(id),
            None => {
                table.last_id += 1;
                row.insert("id".into(), Value::from(table.last_id));
            }
        },
        Some(IdKind::Uuid) => {
            if row.get("id").map_or(true, Value::is_null) {
                row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
            }
        }
        None => {}
    }

    for (column, default) in &schema.defaults {
        if row.get(*column).map_or(true, Value::is_null) {
            let value = match default {
                ColumnDefault::Value(v) => v.clone(),
                ColumnDefault::Now => Value::String(now_string()),
            };
            row.insert((*column).to_string(), value);
        }
    }

    Ok(row)
}

fn project(row: &Map<String, Value>, columns: &str) -> Map<String, Value> {
    if columns.trim() == "*" {
        return row.clone();
    }
    columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| row.get(c).map(|v| (c.to_string(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_serial_ids_and_defaults() {
        let store = MemoryStore::newsdesk();
        let rows = store
            .insert(tables::CHANNELS, vec![json!({ "name": "Tech", "slug": "tech" })])
            .await
            .unwrap();
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["is_active"], true);
        assert!(rows[0]["created_at"].is_string());

        let second = store
            .insert(tables::CHANNELS, vec![json!({ "name": "News", "slug": "news" })])
            .await
            .unwrap();
        assert_eq!(second[0]["id"], 2);
    }

    #[tokio::test]
    async fn test_explicit_null_receives_default() {
        let store = MemoryStore::newsdesk();
        let rows = store
            .insert(
                tables::ARTICLES,
                vec![json!({ "title": "T", "slug": "t", "status": null })],
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["status"], "pending_review");
        assert!(Uuid::parse_str(rows[0]["id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_roles_are_seeded() {
        let store = MemoryStore::newsdesk();
        let admin: Option<Value> = store
            .fetch_one(&Query::table(tables::ROLES).eq("name", "admin"))
            .await
            .unwrap();
        assert_eq!(admin.unwrap()["id"], tables::ADMIN_ROLE_ID);
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_pages() {
        let store = MemoryStore::new();
        let rows = (1..=5).map(|i| json!({ "n": i, "even": i % 2 == 0 })).collect();
        store.insert("nums", rows).await.unwrap();

        let page = store
            .select(&Query::table("nums").order("n", true).page(2, 2))
            .await
            .unwrap();
        let ns: Vec<i64> = page.iter().map(|r| r["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![3, 2]);

        let evens = store
            .count(&Query::table("nums").eq("even", true))
            .await
            .unwrap();
        assert_eq!(evens, 2);
    }

    #[tokio::test]
    async fn test_projection() {
        let store = MemoryStore::new();
        store
            .insert("t", vec![json!({ "a": 1, "b": 2, "c": 3 })])
            .await
            .unwrap();
        let rows = store
            .select(&Query::table("t").select("a, c"))
            .await
            .unwrap();
        assert_eq!(rows[0], json!({ "a": 1, "c": 3 }));
    }

    #[tokio::test]
    async fn test_update_and_delete_return_affected_rows() {
        let store = MemoryStore::new();
        store
            .insert("t", vec![json!({ "k": "x", "v": 1 }), json!({ "k": "y", "v": 2 })])
            .await
            .unwrap();

        let updated = store
            .update(&Query::table("t").eq("k", "x"), json!({ "v": 10 }))
            .await
            .unwrap();
        assert_eq!(updated, vec![json!({ "k": "x", "v": 10 })]);

        let removed = store.delete(&Query::table("t").eq("k", "y")).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.rows("t").await, vec![json!({ "k": "x", "v": 10 })]);
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty() {
        let store = MemoryStore::new();
        assert!(store.select(&Query::table("nope")).await.unwrap().is_empty());
        assert_eq!(store.count(&Query::table("nope")).await.unwrap(), 0);
    }
}
