// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL index store over SQLite and MySQL.
//!
//! One implementation, one pool, two dialects: the connection URL decides
//! whether the embedded engine (SQLite, external FTS5 table for fulltext) or
//! the networked engine (MySQL, native FULLTEXT key) is behind the pool.
//!
//! Schema (SQLite flavor; MySQL adds `sequence_number` and the FULLTEXT key):
//!
//! ```sql
//! CREATE TABLE objects (
//!   "__identifier__"      VARCHAR(64) PRIMARY KEY, -- row key
//!   "__identifier"        VARCHAR(64),             -- aggregate id
//!   "__path"              TEXT,
//!   "__parentPath"        TEXT,                    -- token-set of prefixes
//!   "__workspace"         TEXT,                    -- token-set
//!   "__dimensionshash"    TEXT,                    -- token-set
//!   "__typeAndSuperTypes" TEXT,                    -- token-set
//!   "h1" .. "h6" TEXT, "text" TEXT                 -- fulltext buckets
//! )
//! ```
//!
//! Extracted property columns are not known up front; they are added with
//! `ALTER TABLE .. ADD COLUMN` the first time a row carries them.
//!
//! ## sqlx Any driver quirks
//!
//! The `Any` driver treats MySQL TEXT columns as BLOB, so reads try String
//! first and fall back to bytes-then-utf8.

use std::collections::HashSet;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::any::AnyPoolOptions;
use sqlx::{any::AnyRow, AnyPool, Column, Row};
use tracing::debug;

use super::traits::{FulltextBuckets, IndexProperties, IndexStore, SqlParam, StoreError};
use crate::query::{MysqlGrammar, QueryGrammar, SqliteGrammar};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

/// Base columns every row carries.
const BASE_COLUMNS: [&str; 7] = [
    "__identifier__",
    "__identifier",
    "__path",
    "__parentPath",
    "__workspace",
    "__dimensionshash",
    "__typeAndSuperTypes",
];

/// Fulltext bucket columns, heading levels plus the residual body bucket.
pub const FULLTEXT_BUCKETS: [&str; 7] = ["h1", "h2", "h3", "h4", "h5", "h6", "text"];

pub struct SqlIndexStore {
    pool: AnyPool,
    is_sqlite: bool,
    /// Columns known to exist on the objects table, so dynamic property
    /// columns are only ALTERed in once.
    known_columns: RwLock<HashSet<String>>,
}

impl SqlIndexStore {
    pub async fn new(connection_string: &str) -> Result<Self, StoreError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = AnyPoolOptions::new()
            .max_connections(if is_sqlite { 1 } else { 20 })
            .acquire_timeout(Duration::from_secs(10))
            .connect(connection_string)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let store = Self {
            pool,
            is_sqlite,
            known_columns: RwLock::new(
                BASE_COLUMNS
                    .iter()
                    .chain(FULLTEXT_BUCKETS.iter())
                    .map(|c| c.to_string())
                    .collect(),
            ),
        };

        if is_sqlite {
            store.enable_wal_mode().await?;
        }

        store.init_schema().await?;
        Ok(store)
    }

    /// The grammar matching this store's dialect, for wiring query builders.
    pub fn grammar(&self) -> &'static dyn QueryGrammar {
        if self.is_sqlite {
            &SqliteGrammar
        } else {
            &MysqlGrammar
        }
    }

    fn table(&self) -> &'static str {
        self.grammar().objects_table()
    }

    fn quote(&self, ident: &str) -> String {
        self.grammar().quote_ident(ident)
    }

    /// WAL keeps readers from blocking the single writer on SQLite.
    async fn enable_wal_mode(&self) -> Result<(), StoreError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to enable WAL mode: {}", e)))?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to set synchronous mode: {}", e)))?;
        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let sql = if self.is_sqlite {
            r#"
            CREATE TABLE IF NOT EXISTS objects (
                "__identifier__" VARCHAR(64) PRIMARY KEY,
                "__identifier" VARCHAR(64),
                "__path" TEXT,
                "__parentPath" TEXT,
                "__workspace" TEXT,
                "__dimensionshash" TEXT,
                "__typeAndSuperTypes" TEXT,
                "h1" TEXT, "h2" TEXT, "h3" TEXT, "h4" TEXT, "h5" TEXT, "h6" TEXT,
                "text" TEXT
            )
            "#
            .to_string()
        } else {
            r#"
            CREATE TABLE IF NOT EXISTS fulltext_objects (
                `__identifier__` VARCHAR(64) NOT NULL PRIMARY KEY,
                `sequence_number` BIGINT NOT NULL AUTO_INCREMENT UNIQUE,
                `__identifier` VARCHAR(64),
                `__path` TEXT,
                `__parentPath` TEXT,
                `__workspace` TEXT,
                `__dimensionshash` TEXT,
                `__typeAndSuperTypes` TEXT,
                `h1` TEXT, `h2` TEXT, `h3` TEXT, `h4` TEXT, `h5` TEXT, `h6` TEXT,
                `text` TEXT,
                FULLTEXT KEY `fulltext_all` (`h1`, `h2`, `h3`, `h4`, `h5`, `h6`, `text`)
            ) ENGINE=InnoDB
            "#
            .to_string()
        };

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if self.is_sqlite {
            sqlx::query(
                r#"CREATE VIRTUAL TABLE IF NOT EXISTS fulltext_index USING fts5(
                    "__identifier__" UNINDEXED,
                    "h1", "h2", "h3", "h4", "h5", "h6", "text"
                )"#,
            )
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        Ok(())
    }

    /// Add property columns the table has not seen yet.
    async fn ensure_columns<'a>(
        &self,
        columns: impl Iterator<Item = &'a String>,
    ) -> Result<(), StoreError> {
        let missing: Vec<String> = {
            let known = self.known_columns.read();
            columns.filter(|c| !known.contains(*c)).cloned().collect()
        };

        for column in missing {
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {} TEXT",
                self.table(),
                self.quote(&column)
            );
            match sqlx::query(&sql).execute(&self.pool).await {
                Ok(_) => {}
                // A concurrent writer or an earlier run may have added it; a
                // duplicate-column rejection means the column is there.
                Err(e) if e.to_string().to_lowercase().contains("duplicate column") => {}
                Err(e) => return Err(StoreError::Backend(e.to_string())),
            }
            debug!(column = %column, "Added property column to index");
            self.known_columns.write().insert(column);
        }

        Ok(())
    }

    /// Upsert a full column map as one row.
    async fn upsert_row(&self, row: &IndexProperties) -> Result<(), StoreError> {
        self.ensure_columns(row.keys()).await?;

        let columns: Vec<&String> = row.keys().collect();
        let column_list = columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");

        // The column set is dynamic, so the upsert goes through REPLACE
        // instead of a per-column conflict clause.
        let verb = if self.is_sqlite {
            "INSERT OR REPLACE INTO"
        } else {
            "REPLACE INTO"
        };
        let sql = format!(
            "{} {} ({}) VALUES ({})",
            verb,
            self.table(),
            column_list,
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = query.bind(row[*column].clone());
        }
        query
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    /// Rebuild the FTS mirror row from the objects table (SQLite only; MySQL
    /// maintains its FULLTEXT key itself).
    async fn refresh_fulltext_row(&self, identifier: &str) -> Result<(), StoreError> {
        if !self.is_sqlite {
            return Ok(());
        }

        sqlx::query("DELETE FROM fulltext_index WHERE \"__identifier__\" = ?")
            .bind(identifier)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO fulltext_index ("__identifier__", "h1", "h2", "h3", "h4", "h5", "h6", "text")
               SELECT "__identifier__",
                      COALESCE("h1", ''), COALESCE("h2", ''), COALESCE("h3", ''),
                      COALESCE("h4", ''), COALESCE("h5", ''), COALESCE("h6", ''),
                      COALESCE("text", '')
               FROM objects WHERE "__identifier__" = ?"#,
        )
        .bind(identifier)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    fn row_to_properties(row: &AnyRow) -> IndexProperties {
        let mut properties = IndexProperties::new();
        for column in row.columns() {
            let name = column.name();
            // Any driver: try text, then bytes (MySQL TEXT), then numerics
            // (COUNT(*) and friends).
            let value: Option<String> = row
                .try_get::<Option<String>, _>(name)
                .ok()
                .flatten()
                .or_else(|| {
                    row.try_get::<Option<Vec<u8>>, _>(name)
                        .ok()
                        .flatten()
                        .and_then(|bytes| String::from_utf8(bytes).ok())
                })
                .or_else(|| {
                    row.try_get::<Option<i64>, _>(name)
                        .ok()
                        .flatten()
                        .map(|v| v.to_string())
                })
                .or_else(|| {
                    row.try_get::<Option<f64>, _>(name)
                        .ok()
                        .flatten()
                        .map(|v| v.to_string())
                });
            if let Some(value) = value {
                properties.insert(name.to_string(), value);
            }
        }
        properties
    }
}

#[async_trait]
impl IndexStore for SqlIndexStore {
    async fn index_data(
        &self,
        identifier: &str,
        properties: &IndexProperties,
        fulltext: &FulltextBuckets,
    ) -> Result<(), StoreError> {
        let mut row = properties.clone();
        row.insert("__identifier__".to_string(), identifier.to_string());
        for (bucket, text) in fulltext {
            row.insert(bucket.clone(), text.clone());
        }

        self.upsert_row(&row).await?;
        self.refresh_fulltext_row(identifier).await
    }

    async fn insert_or_update(
        &self,
        properties: &IndexProperties,
        identifier: &str,
    ) -> Result<(), StoreError> {
        let mut row = properties.clone();
        row.insert("__identifier__".to_string(), identifier.to_string());

        self.upsert_row(&row).await?;
        self.refresh_fulltext_row(identifier).await
    }

    async fn add_to_fulltext(
        &self,
        fulltext: &FulltextBuckets,
        identifier: &str,
    ) -> Result<(), StoreError> {
        let Some(mut row) = self.find_by_identifier(identifier).await? else {
            // The aggregation target has not been indexed yet in this pass;
            // start its row with just the bucket content.
            let mut row = IndexProperties::new();
            row.insert("__identifier__".to_string(), identifier.to_string());
            for (bucket, text) in fulltext {
                row.insert(bucket.clone(), text.clone());
            }
            self.upsert_row(&row).await?;
            return self.refresh_fulltext_row(identifier).await;
        };

        for (bucket, text) in fulltext {
            match row.get_mut(bucket) {
                Some(existing) if !existing.is_empty() => {
                    existing.push(' ');
                    existing.push_str(text);
                }
                _ => {
                    row.insert(bucket.clone(), text.clone());
                }
            }
        }

        self.upsert_row(&row).await?;
        self.refresh_fulltext_row(identifier).await
    }

    async fn remove_data(&self, identifier: &str) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.table(),
            self.quote("__identifier__")
        );
        sqlx::query(&sql)
            .bind(identifier)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if self.is_sqlite {
            sqlx::query("DELETE FROM fulltext_index WHERE \"__identifier__\" = ?")
                .bind(identifier)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        Ok(())
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<IndexProperties>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            self.table(),
            self.quote("__identifier__")
        );
        let row = sqlx::query(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_properties))
    }

    async fn execute_statement(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<IndexProperties>, StoreError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlParam::Text(v) => query.bind(v.clone()),
                SqlParam::Numeric(v) => query.bind(*v),
                SqlParam::Integer(v) => query.bind(*v),
                SqlParam::Boolean(v) => query.bind(*v),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_properties).collect())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {}", self.table());
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if self.is_sqlite {
            sqlx::query("DELETE FROM fulltext_index")
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        Ok(())
    }

    async fn optimize(&self) -> Result<(), StoreError> {
        if self.is_sqlite {
            sqlx::query("VACUUM")
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        } else {
            // OPTIMIZE TABLE returns a result set, so fetch instead of execute.
            sqlx::query("OPTIMIZE TABLE fulltext_objects")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}
