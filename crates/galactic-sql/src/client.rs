//! Pooled SQL client

use crate::config::{redact, SqlConfig, SqlDriver};
use crate::error::{Result, SqlError};
use crate::filter::filter_to_sql;
use crate::row::{SqlRow, SqlValue};
use galactic_identity::{DirectoryRecord, ObjectType, SearchFilter};
use galactic_log::{EventEntry, EventLog, EventSeverity};
use sqlx::any::{AnyArguments, AnyPoolOptions};
use sqlx::AnyPool;
use sqlx::query::Query;
use sqlx::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const EVENT_SOURCE: &str = "galactic-sql";

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

fn bind_values<'q>(mut query: AnyQuery<'q>, params: &'q [SqlValue]) -> AnyQuery<'q> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Binary(b) => query.bind(b.clone()),
            SqlValue::Time(t) => query.bind(t.to_rfc3339()),
        };
    }
    query
}

pub struct SqlClient {
    pool: AnyPool,
    driver: SqlDriver,
    event_log: Option<Arc<dyn EventLog>>,
}

impl SqlClient {
    pub async fn connect(config: &SqlConfig) -> Result<Self> {
        config.validate()?;
        let driver = config.driver()?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        info!(url = %redact(&config.url), ?driver, "Connected to SQL database");
        Ok(Self {
            pool,
            driver,
            event_log: None,
        })
    }

    /// Record table writes in an application event log
    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn driver(&self) -> SqlDriver {
        self.driver
    }

    fn record_event(&self, severity: EventSeverity, message: String) {
        if let Some(log) = &self.event_log {
            log.log(EventEntry::new(severity, EVENT_SOURCE, &message));
        }
    }

    /// `schema.table` with each part quoted
    fn quote_table(&self, table: &str) -> Result<String> {
        if table.trim().is_empty() || table.split('.').any(|part| part.is_empty()) {
            return Err(SqlError::InvalidArgument(format!("Invalid table name: {:?}", table)));
        }
        Ok(table
            .split('.')
            .map(|part| self.driver.quote_identifier(part))
            .collect::<Vec<_>>()
            .join("."))
    }

    /// Run a statement that returns rows. `params` bind to the driver's
    /// markers in order.
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>> {
        debug!(sql, params = params.len(), "SQL query");
        let rows = bind_values(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(SqlRow::from_any_row).collect()
    }

    pub async fn query_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlRow>> {
        debug!(sql, params = params.len(), "SQL query");
        let row = bind_values(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(SqlRow::from_any_row).transpose()
    }

    /// Run a statement and return the number of affected rows
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        debug!(sql, params = params.len(), "SQL execute");
        let result = bind_values(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// `SELECT` from `table`; an empty `columns` selects every column
    pub async fn select(
        &self,
        table: &str,
        filter: Option<&SearchFilter>,
        columns: &[&str],
    ) -> Result<Vec<SqlRow>> {
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| self.driver.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {} FROM {}", projection, self.quote_table(table)?);
        let mut params = Vec::new();
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter_to_sql(filter, self.driver, &mut params));
        }
        self.query(&sql, &params).await
    }

    /// Rows of `table` as directory records keyed by `id_column`. Rows
    /// whose id is NULL are skipped.
    pub async fn find_records(
        &self,
        table: &str,
        id_column: &str,
        object_type: ObjectType,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<DirectoryRecord>> {
        let rows = self.select(table, filter, &[]).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.to_record(id_column, object_type.clone()))
            .collect())
    }

    pub async fn insert(&self, table: &str, row: &SqlRow) -> Result<u64> {
        if row.is_empty() {
            return Err(SqlError::InvalidArgument("Cannot insert an empty row".to_string()));
        }
        let mut columns = Vec::with_capacity(row.len());
        let mut markers = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (name, value) in row.iter() {
            columns.push(self.driver.quote_identifier(name));
            params.push(value.clone());
            markers.push(self.driver.placeholder(params.len()));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote_table(table)?,
            columns.join(", "),
            markers.join(", ")
        );
        let inserted = self.execute(&sql, &params).await?;
        self.record_event(
            EventSeverity::Information,
            format!("Inserted {} row(s) into {}", inserted, table),
        );
        Ok(inserted)
    }

    /// Update the row whose `key_column` equals `key`. Returns false when no
    /// row matched.
    pub async fn update(
        &self,
        table: &str,
        key_column: &str,
        key: impl Into<SqlValue>,
        row: &SqlRow,
    ) -> Result<bool> {
        if row.is_empty() {
            return Err(SqlError::InvalidArgument("Nothing to update".to_string()));
        }
        let mut assignments = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len() + 1);
        for (name, value) in row.iter() {
            params.push(value.clone());
            assignments.push(format!(
                "{} = {}",
                self.driver.quote_identifier(name),
                self.driver.placeholder(params.len())
            ));
        }
        params.push(key.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.quote_table(table)?,
            assignments.join(", "),
            self.driver.quote_identifier(key_column),
            self.driver.placeholder(params.len())
        );
        let updated = self.execute(&sql, &params).await? > 0;
        if updated {
            self.record_event(
                EventSeverity::Information,
                format!("Updated {} in {}", row.column_names().join(", "), table),
            );
        }
        Ok(updated)
    }

    /// Delete the row whose `key_column` equals `key`. Returns false when no
    /// row matched.
    pub async fn delete(&self, table: &str, key_column: &str, key: impl Into<SqlValue>) -> Result<bool> {
        let params = vec![key.into()];
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quote_table(table)?,
            self.driver.quote_identifier(key_column),
            self.driver.placeholder(1)
        );
        let deleted = self.execute(&sql, &params).await? > 0;
        if deleted {
            self.record_event(EventSeverity::Warning, format!("Deleted a row from {}", table));
        }
        Ok(deleted)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
