//! Postgres persistence sink for the feature table
//!
//! The sink owns a connection pool plus the target schema/table names and
//! exposes the storage contract: idempotent DDL, a replace-on-change write,
//! and a read-back of the persisted table. SQL text generation is kept in
//! pure functions so it tests without a database.

use crate::error::{EtlError, Result};
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use labfeat_core::{ColumnType, Table, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, PgPool, Postgres, Row};
use tracing::{error, info};

/// Outcome of a sink write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Persisted content already matched cell for cell; nothing was written
    Unchanged,
    /// The table was replaced wholesale
    Replaced { rows: usize },
}

/// Postgres feature sink
pub struct FeatureSink {
    pool: PgPool,
    schema: String,
    table: String,
}

/// Map a semantic column type to its Postgres column type.
///
/// Text is the fallback for anything without a tighter mapping.
pub fn pg_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer => "INTEGER",
        ColumnType::Float => "NUMERIC",
        ColumnType::Bool => "BOOLEAN",
        ColumnType::Timestamp => "TIMESTAMP",
        ColumnType::Text => "TEXT",
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// CREATE TABLE statement for a table's inferred column types.
pub fn create_table_sql(schema: &str, table: &str, data: &Table, if_not_exists: bool) -> String {
    let columns = data
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            format!(
                "{} {}",
                quote_ident(name),
                pg_type(data.infer_column_type(idx))
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE {}{}.{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_ident(schema),
        quote_ident(table),
        columns
    )
}

/// Single-row INSERT statement with one positional placeholder per column.
pub fn insert_sql(schema: &str, table: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|n| format!("${}", n))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {}.{} ({}) VALUES ({})",
        quote_ident(schema),
        quote_ident(table),
        column_list,
        placeholders
    )
}

/// Bind one cell onto a query, typed by its column's semantic type so null
/// cells carry the right parameter type.
fn bind_cell<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    ty: ColumnType,
    cell: &Value,
) -> Result<sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>> {
    let query = match (ty, cell) {
        (ColumnType::Integer, Value::Int(n)) => query.bind(Some(*n)),
        (ColumnType::Integer, Value::Null) => query.bind(None::<i64>),
        (ColumnType::Float, Value::Float(f)) => query.bind(Some(*f)),
        (ColumnType::Float, Value::Int(n)) => query.bind(Some(*n as f64)),
        (ColumnType::Float, Value::Null) => query.bind(None::<f64>),
        (ColumnType::Bool, Value::Bool(b)) => query.bind(Some(*b)),
        (ColumnType::Bool, Value::Null) => query.bind(None::<bool>),
        (ColumnType::Timestamp, Value::Timestamp(ts)) => query.bind(Some(*ts)),
        (ColumnType::Timestamp, Value::Null) => query.bind(None::<NaiveDateTime>),
        (ColumnType::Text, Value::Null) => query.bind(None::<String>),
        (ColumnType::Text, other) => query.bind(Some(other.key_string())),
        (ty, cell) => {
            return Err(EtlError::Write(format!(
                "cell {:?} does not fit column type {:?}",
                cell, ty
            )))
        }
    };
    Ok(query)
}

impl FeatureSink {
    /// Connect to the store.
    pub async fn connect(database_url: &str, schema: &str, table: &str) -> Result<Self> {
        info!("Connecting to Postgres");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to Postgres: {}", e);
                EtlError::Connection(format!("failed to connect to Postgres: {}", e))
            })?;
        info!("✓ Connected to Postgres");

        Ok(Self {
            pool,
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// Idempotently create the feature namespace.
    pub async fn ensure_schema(&self) -> Result<()> {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema));
        sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            error!("Failed to create schema {}: {}", self.schema, e);
            EtlError::Schema(format!("failed to create schema {}: {}", self.schema, e))
        })?;
        info!("Schema {} ready", self.schema);
        Ok(())
    }

    /// Idempotently create the destination table with one column per feature
    /// column. No-op when the table already exists; existing column types are
    /// left alone.
    pub async fn ensure_table(&self, data: &Table) -> Result<()> {
        let sql = create_table_sql(&self.schema, &self.table, data, true);
        sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
            error!("Failed to create table {}: {}", self.table, e);
            EtlError::Schema(format!("failed to create table {}: {}", self.table, e))
        })?;
        info!("Table {}.{} ready", self.schema, self.table);
        Ok(())
    }

    /// Replace-on-change write.
    ///
    /// Reads back any persisted table; if it matches the new one cell for
    /// cell, nothing is written. Otherwise the table is replaced wholesale
    /// (drop + recreate + insert) inside one transaction, so a failed write
    /// leaves the prior table intact.
    pub async fn write(&self, data: &Table) -> Result<WriteOutcome> {
        if self.table_exists().await? {
            let existing = self.read().await?;
            if existing == *data {
                info!("Data is already up to date. No changes made.");
                return Ok(WriteOutcome::Unchanged);
            }
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            EtlError::Write(format!("failed to begin transaction: {}", e))
        })?;

        let drop_sql = format!(
            "DROP TABLE IF EXISTS {}.{}",
            quote_ident(&self.schema),
            quote_ident(&self.table)
        );
        sqlx::query(&drop_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::Write(format!("failed to drop old table: {}", e)))?;

        let create_sql = create_table_sql(&self.schema, &self.table, data, false);
        sqlx::query(&create_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::Write(format!("failed to recreate table: {}", e)))?;

        let insert = insert_sql(&self.schema, &self.table, data.columns());
        let types: Vec<ColumnType> = (0..data.n_cols())
            .map(|idx| data.infer_column_type(idx))
            .collect();
        for row in data.rows() {
            let mut query = sqlx::query(&insert);
            for (cell, ty) in row.iter().zip(types.iter()) {
                query = bind_cell(query, *ty, cell)?;
            }
            query.execute(&mut *tx).await.map_err(|e| {
                error!("Failed to insert feature row: {}", e);
                EtlError::Write(format!("failed to insert feature row: {}", e))
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::Write(format!("failed to commit write: {}", e)))?;

        info!(
            "Data inserted successfully ({} rows into {}.{})",
            data.n_rows(),
            self.schema,
            self.table
        );
        Ok(WriteOutcome::Replaced {
            rows: data.n_rows(),
        })
    }

    /// Read the persisted table back, storage-order rows and declared column
    /// order.
    pub async fn read(&self) -> Result<Table> {
        let sql = format!(
            "SELECT * FROM {}.{}",
            quote_ident(&self.schema),
            quote_ident(&self.table)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(|e| {
            error!("Failed to read {}.{}: {}", self.schema, self.table, e);
            EtlError::Read(format!(
                "failed to read {}.{}: {}",
                self.schema, self.table, e
            ))
        })?;

        let columns: Vec<String> = match rows.first() {
            Some(row) => row
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            None => return Ok(Table::new(Vec::<String>::new())),
        };

        let mut table = Table::new(columns);
        for row in &rows {
            let mut cells = Vec::with_capacity(row.columns().len());
            for idx in 0..row.columns().len() {
                cells.push(decode_cell(row, idx));
            }
            table
                .push_row(cells)
                .map_err(|e| EtlError::Read(e.to_string()))?;
        }
        Ok(table)
    }

    async fn table_exists(&self) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(&self.schema)
        .bind(&self.table)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EtlError::Write(format!("failed to check table existence: {}", e)))?;
        Ok(row.get::<bool, _>(0))
    }
}

/// Decode one cell from a Postgres row.
///
/// try_get cascade over the column types the sink can produce: BIGINT,
/// INTEGER, FLOAT8, NUMERIC, BOOLEAN, TIMESTAMP, TEXT; anything else lands
/// as Null.
fn decode_cell(row: &sqlx::postgres::PgRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::Int).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| Value::Int(n as i64)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::Float).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<BigDecimal>, _>(idx) {
        return v
            .and_then(|bd| bd.to_string().parse::<f64>().ok())
            .map(Value::Float)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return v.map(Value::Timestamp).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::Text).unwrap_or(Value::Null);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_table() -> Table {
        let mut t = Table::new(vec![
            "user_id",
            "signup_date",
            "experiment_count",
            "avg_experiment_run_time",
            "compound_id",
            "compound_name",
        ]);
        t.push_row(vec![
            Value::Int(1),
            Value::Text("2020-01-01".to_string())
                .coerce_timestamp()
                .unwrap(),
            Value::Int(2),
            Value::Float(15.0),
            Value::Int(7),
            Value::Text("aspirin".to_string()),
        ])
        .unwrap();
        t
    }

    #[test]
    fn test_pg_type_mapping() {
        assert_eq!(pg_type(ColumnType::Integer), "INTEGER");
        assert_eq!(pg_type(ColumnType::Float), "NUMERIC");
        assert_eq!(pg_type(ColumnType::Bool), "BOOLEAN");
        assert_eq!(pg_type(ColumnType::Timestamp), "TIMESTAMP");
        assert_eq!(pg_type(ColumnType::Text), "TEXT");
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("sandbox", "features", &feature_table(), true);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"sandbox\".\"features\" \
             (\"user_id\" INTEGER, \"signup_date\" TIMESTAMP, \
             \"experiment_count\" INTEGER, \"avg_experiment_run_time\" NUMERIC, \
             \"compound_id\" INTEGER, \"compound_name\" TEXT)"
        );
    }

    #[test]
    fn test_create_table_sql_without_if_not_exists() {
        let sql = create_table_sql("sandbox", "features", &feature_table(), false);
        assert!(sql.starts_with("CREATE TABLE \"sandbox\""));
        assert!(!sql.contains("IF NOT EXISTS"));
    }

    #[test]
    fn test_insert_sql() {
        let columns = vec!["user_id".to_string(), "compound_id".to_string()];
        assert_eq!(
            insert_sql("sandbox", "features", &columns),
            "INSERT INTO \"sandbox\".\"features\" (\"user_id\", \"compound_id\") \
             VALUES ($1, $2)"
        );
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_write_outcome_equality() {
        assert_eq!(WriteOutcome::Unchanged, WriteOutcome::Unchanged);
        assert_eq!(
            WriteOutcome::Replaced { rows: 3 },
            WriteOutcome::Replaced { rows: 3 }
        );
        assert_ne!(
            WriteOutcome::Unchanged,
            WriteOutcome::Replaced { rows: 0 }
        );
    }
}
