use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{remove_from, union_into, DocRef, Document, DocumentStore, Result, Snapshot, StoreError};

/// SQLite-backed document store. Each record is one JSON row.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Open a connection for a `sqlite:`-prefixed or bare database URL.
pub(crate) fn open_connection(database_url: &str) -> Result<Connection> {
    // Parse sqlite: prefix if present
    let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

    if path == ":memory:" {
        return Connection::open_in_memory().map_err(db_err);
    }

    // Create parent directories if needed
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
    }

    Connection::open(path).map_err(db_err)
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn parse_body(body: &str) -> Result<Document> {
    serde_json::from_str(body).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn encode(value: &impl serde::Serialize) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Malformed(e.to_string()))
}

fn read(conn: &Connection, doc: &DocRef) -> Result<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![doc.collection, doc.id],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;

    body.as_deref().map(parse_body).transpose()
}

fn write(conn: &Connection, doc: &DocRef, data: &Document) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (collection, id, body, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![doc.collection, doc.id, encode(data)?, Utc::now().to_rfc3339()],
    )
    .map_err(db_err)?;
    Ok(())
}

impl SqliteStore {
    pub fn new(database_url: &str) -> Result<Self> {
        let conn = open_connection(database_url)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
            [],
        )
        .map_err(db_err)?;

        tracing::info!("Document store initialized with database: {}", database_url);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Read, change and write back one record inside a single transaction.
    /// The connection lock is held throughout, so no other writer interleaves.
    fn modify<F>(&self, doc: &DocRef, change: F) -> Result<()>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        let mut data = read(&tx, doc)?.ok_or_else(|| StoreError::NotFound(doc.to_string()))?;
        change(&mut data)?;
        write(&tx, doc, &data)?;

        tx.commit().map_err(db_err)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, doc: &DocRef) -> Result<Option<Document>> {
        let conn = self.lock()?;
        read(&conn, doc)
    }

    async fn query_eq(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Snapshot>> {
        let conn = self.lock()?;

        let path = format!("$.\"{}\"", field);
        let needle = encode(value)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, body FROM documents
                 WHERE collection = ?1 AND json_extract(body, ?2) = json_extract(?3, '$')
                 ORDER BY rowid",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![collection, path, needle], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(db_err)?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (id, body) = row.map_err(db_err)?;
            let data = parse_body(&body)?;
            // SQLite folds JSON booleans into integers; compare the typed values too.
            if data.get(field) == Some(value) {
                snapshots.push(Snapshot {
                    reference: DocRef::new(collection, &id),
                    data,
                });
            }
        }

        Ok(snapshots)
    }

    async fn set(&self, doc: &DocRef, data: Document) -> Result<()> {
        let conn = self.lock()?;
        write(&conn, doc, &data)?;
        tracing::debug!("Set document {}", doc);
        Ok(())
    }

    async fn update(&self, doc: &DocRef, fields: Document) -> Result<()> {
        self.modify(doc, |data| {
            data.extend(fields);
            Ok(())
        })?;
        tracing::debug!("Updated document {}", doc);
        Ok(())
    }

    async fn array_union(&self, doc: &DocRef, field: &str, elements: Vec<Value>) -> Result<()> {
        self.modify(doc, |data| union_into(data, field, elements))
    }

    async fn array_remove(&self, doc: &DocRef, field: &str, elements: Vec<Value>) -> Result<()> {
        self.modify(doc, |data| remove_from(data, field, &elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> SqliteStore {
        SqliteStore::new(":memory:").unwrap()
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_document_is_none() {
        let store = store();
        let found = store.get(&DocRef::new("users", "nobody")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_whole_document() {
        let store = store();
        let user = DocRef::new("users", "u1");

        store.set(&user, doc(json!({ "email": "a@b.c", "firstName": "Ada" }))).await.unwrap();
        store.set(&user, doc(json!({ "email": "a@b.c" }))).await.unwrap();

        let data = store.get(&user).await.unwrap().unwrap();
        assert!(data.get("firstName").is_none());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = store();
        let user = DocRef::new("users", "u1");
        store.set(&user, doc(json!({ "email": "a@b.c", "created_recipes": [] }))).await.unwrap();

        store.update(&user, doc(json!({ "session_id": "tok" }))).await.unwrap();

        let data = store.get(&user).await.unwrap().unwrap();
        assert_eq!(data["email"], "a@b.c");
        assert_eq!(data["session_id"], "tok");
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = store();
        let result = store
            .update(&DocRef::new("users", "ghost"), doc(json!({ "session_id": "tok" })))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_query_eq_matches_field_value() {
        let store = store();
        store.set(&DocRef::new("users", "u1"), doc(json!({ "email": "a@b.c" }))).await.unwrap();
        store.set(&DocRef::new("users", "u2"), doc(json!({ "email": "x@y.z" }))).await.unwrap();
        store.set(&DocRef::new("recipes", "r1"), doc(json!({ "email": "a@b.c" }))).await.unwrap();

        let hits = store.query_eq("users", "email", &json!("a@b.c")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "u1");
        assert_eq!(hits[0].reference.collection, "users");
    }

    #[tokio::test]
    async fn test_query_eq_distinguishes_booleans_from_numbers() {
        let store = store();
        store.set(&DocRef::new("flags", "a"), doc(json!({ "on": true }))).await.unwrap();
        store.set(&DocRef::new("flags", "b"), doc(json!({ "on": 1 }))).await.unwrap();

        let hits = store.query_eq("flags", "on", &json!(true)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "a");
    }

    #[tokio::test]
    async fn test_query_eq_no_match_is_empty() {
        let store = store();
        let hits = store.query_eq("users", "session_id", &json!("nope")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_array_ops_on_missing_document_fail() {
        let store = store();
        let ghost = DocRef::new("users", "ghost");
        assert!(matches!(
            store.array_union(&ghost, "created_recipes", vec![json!("r1")]).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.array_remove(&ghost, "created_recipes", vec![json!("r1")]).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_unions_keep_every_element() {
        let store = Arc::new(store());
        let user = DocRef::new("users", "u1");
        store.set(&user, doc(json!({ "created_recipes": [] }))).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let user = user.clone();
            handles.push(tokio::spawn(async move {
                store
                    .array_union(&user, "created_recipes", vec![json!(format!("r{}", i))])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let data = store.get(&user).await.unwrap().unwrap();
        assert_eq!(data["created_recipes"].as_array().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}/nested/recipes.db", dir.path().display());
        let recipe = DocRef::new("recipes", "r1");

        {
            let store = SqliteStore::new(&url).unwrap();
            store.set(&recipe, doc(json!({ "title": "Soup" }))).await.unwrap();
        }

        let store = SqliteStore::new(&url).unwrap();
        let data = store.get(&recipe).await.unwrap().unwrap();
        assert_eq!(data["title"], "Soup");
    }
}
