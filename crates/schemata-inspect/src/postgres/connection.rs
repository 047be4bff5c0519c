use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query as SqlxQuery;
use sqlx::{
    Column as _, Connection as _, Executor as _, Postgres, Row as _, TypeInfo as _, ValueRef as _,
};
use tracing::{debug, trace};

use schemata_core::{DatabaseInfo, DriverInfo, Error, Result, redact_connection_string};

use crate::connection::{Connection, MetaDataRequest, Row, Statement, Value};

use super::metadata;

/// [`Connection`] over a single sqlx PostgreSQL connection.
///
/// Statements are prepared on the server through sqlx's statement cache, so
/// a statement handle stays cheap to re-execute for as long as the engine
/// keeps it open.
pub struct PostgresConnection {
    conn: PgConnection,
    next_statement: u64,
    info: Option<DatabaseInfo>,
}

impl PostgresConnection {
    /// Open a connection to `url`; only the redacted form is logged.
    pub async fn connect(url: &str) -> Result<Self> {
        let redacted = redact_connection_string(url);
        debug!(url = %redacted.redacted, "connecting to postgres");
        let conn = PgConnection::connect(url)
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already open sqlx connection.
    pub fn from_connection(conn: PgConnection) -> Self {
        Self {
            conn,
            next_statement: 0,
            info: None,
        }
    }

    /// Close the underlying connection gracefully.
    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|err| Error::Db(err.to_string()))
    }

    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|err| Error::query(sql, err.to_string()))?;
        rows.iter().map(|row| decode_row(sql, row)).collect()
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn database_info(&mut self) -> Result<DatabaseInfo> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }
        let version: String = sqlx::query_scalar("SHOW server_version")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        let info = parse_server_version(&version);
        self.info = Some(info.clone());
        Ok(info)
    }

    async fn driver_info(&mut self) -> Result<DriverInfo> {
        Ok(DriverInfo {
            name: "sqlx-postgres".to_string(),
            version: Some("0.8".to_string()),
        })
    }

    async fn metadata(&mut self, request: &MetaDataRequest) -> Result<Vec<Row>> {
        let query = metadata::query_for(request);
        let mut rows = self.fetch(&query.sql, &query.params).await?;
        metadata::retain_requested(request, &mut rows);
        Ok(rows)
    }

    async fn prepare(&mut self, sql: &str) -> Result<Statement> {
        self.conn
            .prepare(sql)
            .await
            .map_err(|err| Error::query(sql, err.to_string()))?;
        self.next_statement += 1;
        trace!(statement = self.next_statement, "prepared statement");
        Ok(Statement::new(self.next_statement, sql))
    }

    async fn execute(&mut self, statement: &Statement, params: &[Value]) -> Result<Vec<Row>> {
        self.fetch(statement.sql(), params).await
    }

    async fn close_statement(&mut self, statement: &Statement) -> Result<()> {
        trace!(statement = statement.id(), "released statement");
        Ok(())
    }
}

fn bind_all<'q>(
    mut query: SqlxQuery<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> SqlxQuery<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(value) => query.bind(*value),
            Value::Int(value) => query.bind(*value),
            Value::Float(value) => query.bind(*value),
            Value::Text(value) => query.bind(value.as_str()),
        };
    }
    query
}

fn decode_row(sql: &str, row: &PgRow) -> Result<Row> {
    let mut decoded = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let is_null = row
            .try_get_raw(index)
            .map(|raw| raw.is_null())
            .unwrap_or(true);
        let value = if is_null {
            Value::Null
        } else {
            decode_value(row, index, column.type_info().name())
                .map_err(|err| Error::query(sql, format!("{}: {err}", column.name())))?
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

fn decode_value(
    row: &PgRow,
    index: usize,
    type_name: &str,
) -> std::result::Result<Value, sqlx::Error> {
    Ok(match type_name {
        "BOOL" => Value::Bool(row.try_get::<bool, _>(index)?),
        "INT2" => Value::Int(i64::from(row.try_get::<i16, _>(index)?)),
        "INT4" => Value::Int(i64::from(row.try_get::<i32, _>(index)?)),
        "INT8" => Value::Int(row.try_get::<i64, _>(index)?),
        "FLOAT4" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => Value::Float(row.try_get::<f64, _>(index)?),
        "\"CHAR\"" => {
            let byte = row.try_get::<i8, _>(index)?;
            Value::Text(char::from(byte.to_ne_bytes()[0]).to_string())
        }
        _ => Value::Text(row.try_get::<String, _>(index)?),
    })
}

/// `SHOW server_version` output such as `16.2 (Debian 16.2-1.pgdg120+2)`.
fn parse_server_version(version: &str) -> DatabaseInfo {
    let number = version.split_whitespace().next().unwrap_or_default();
    let mut parts = number
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>().ok());
    let major = parts.next().flatten();
    let minor = parts.next().flatten();

    let mut info = DatabaseInfo::new("PostgreSQL").with_product_version(version.trim());
    info.major_version = major;
    info.minor_version = minor;
    info
}
