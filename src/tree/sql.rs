use serde_json::Value;
use sqlx::{
    any::{AnyKind, AnyPoolOptions},
    Any, AnyPool, Row, Transaction,
};

use super::*;

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS tree_nodes (path VARCHAR(512) PRIMARY KEY, value TEXT NOT NULL)";

/// A tree kept in a single `tree_nodes` table of a SQL database.
///
/// Every row holds a JSON document at some path. A document stored at a path
/// owns everything below it; paths without a document of their own are
/// assembled from the documents stored underneath them.
pub struct SqlTree {
    pool: AnyPool,
}

impl SqlTree {
    pub async fn connect(url: &str) -> TreeResult<Self> {
        Self::connect_with(url, 5).await
    }

    pub async fn connect_with(url: &str, max_connections: u32) -> TreeResult<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// The n-th bind parameter in the dialect of the connected database.
    fn param(&self, n: usize) -> String {
        match self.pool.any_kind() {
            AnyKind::Postgres => format!("${}", n),
            _ => "?".to_owned(),
        }
    }

    async fn fetch_document(
        &self,
        transaction: &mut Transaction<'_, Any>,
        path: &str,
    ) -> TreeResult<Option<Value>> {
        let row = sqlx::query(&format!(
            "SELECT value FROM tree_nodes WHERE path = {}",
            self.param(1)
        ))
        .bind(path.to_owned())
        .fetch_optional(&mut *transaction)
        .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get(0)?;
                parse_document(path, &raw).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn fetch_descendants(
        &self,
        transaction: &mut Transaction<'_, Any>,
        prefix: &str,
    ) -> TreeResult<Vec<(String, Value)>> {
        let rows = sqlx::query(&format!(
            "SELECT path, value FROM tree_nodes WHERE path LIKE {} ESCAPE '\\'",
            self.param(1)
        ))
        .bind(like_prefix(prefix))
        .fetch_all(&mut *transaction)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let path: String = row.try_get(0)?;
            // sqlite matches LIKE case-insensitively
            if !path.starts_with(prefix) {
                continue;
            }
            let raw: String = row.try_get(1)?;
            let value = parse_document(&path, &raw)?;
            documents.push((path, value));
        }
        Ok(documents)
    }

    /// Deletes the document at `path` together with everything stored below it.
    async fn remove_subtree(
        &self,
        transaction: &mut Transaction<'_, Any>,
        path: &str,
    ) -> TreeResult<()> {
        sqlx::query(&format!(
            "DELETE FROM tree_nodes WHERE path = {} OR path LIKE {} ESCAPE '\\'",
            self.param(1),
            self.param(2)
        ))
        .bind(path.to_owned())
        .bind(like_prefix(&format!("{}/", path)))
        .execute(&mut *transaction)
        .await?;
        Ok(())
    }

    async fn write_document(
        &self,
        transaction: &mut Transaction<'_, Any>,
        path: &str,
        value: &Value,
    ) -> TreeResult<()> {
        sqlx::query(&format!(
            "DELETE FROM tree_nodes WHERE path = {}",
            self.param(1)
        ))
        .bind(path.to_owned())
        .execute(&mut *transaction)
        .await?;

        if is_empty(value) {
            return Ok(());
        }

        sqlx::query(&format!(
            "INSERT INTO tree_nodes (path, value) VALUES ({}, {})",
            self.param(1),
            self.param(2)
        ))
        .bind(path.to_owned())
        .bind(value.to_string())
        .execute(&mut *transaction)
        .await?;
        Ok(())
    }
}

/// A LIKE pattern matching every path that starts with `prefix`.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn parse_document(path: &str, raw: &str) -> TreeResult<Value> {
    serde_json::from_str(raw).map_err(|error| TreeError::Malformed {
        path: path.to_owned(),
        reason: error.to_string(),
    })
}

#[rocket::async_trait]
impl Tree for SqlTree {
    async fn get(&self, path: &str) -> TreeResult<Option<Value>> {
        let segments = segments(path)?;
        let mut transaction = self.pool.begin().await?;

        // A document at the path or at one of its ancestors holds the whole subtree
        for depth in 1..=segments.len() {
            let owner = segments[..depth].join("/");
            if let Some(document) = self.fetch_document(&mut transaction, &owner).await? {
                transaction.commit().await?;
                return Ok(descend(document, &segments[depth..]));
            }
        }

        let path = segments.join("/");
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };

        let mut subtree = Value::Null;
        for (child, document) in self.fetch_descendants(&mut transaction, &prefix).await? {
            let relative: Vec<&str> = child[prefix.len()..]
                .split('/')
                .filter(|segment| !segment.is_empty())
                .collect();
            place(&mut subtree, &relative, document);
        }
        transaction.commit().await?;

        Ok(Some(subtree).filter(|subtree| !is_empty(subtree)))
    }

    async fn set(&self, path: &str, value: Value) -> TreeResult<()> {
        let segments = segments(path)?;
        if segments.is_empty() {
            return Err(TreeError::InvalidPath {
                path: path.to_owned(),
            });
        }
        let mut transaction = self.pool.begin().await?;

        // Rewrite the nearest ancestor document if the path lives inside one
        for depth in 1..segments.len() {
            let owner = segments[..depth].join("/");
            if let Some(mut document) = self.fetch_document(&mut transaction, &owner).await? {
                place(&mut document, &segments[depth..], value);
                self.write_document(&mut transaction, &owner, &document)
                    .await?;
                transaction.commit().await?;
                return Ok(());
            }
        }

        let path = segments.join("/");
        self.remove_subtree(&mut transaction, &path).await?;
        self.write_document(&mut transaction, &path, &value).await?;
        transaction.commit().await?;

        Ok(())
    }
}
