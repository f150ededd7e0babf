//! Database access: short-lived MySQL connections, role-separated.
//!
//! Every operation opens its own connection and closes it before
//! returning, on success and on error alike. There is no pool and no
//! retry; a connection failure is terminal for that request. The writer
//! login touches schema creation and inserts only, the reader login
//! SELECT execution (and the startup smoke test) only.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};
use sqlx::{ConnectOptions, Connection, MySql, QueryBuilder};
use thiserror::Error;

use crate::config::{Config, DbCredentials};
use crate::models::FIXED_PATIENT_ROWS;

mod rows;

pub use rows::RowObject;

/// Unclassified database error. Connection refusal, authentication
/// failure, and malformed SQL all surface identically, carrying only
/// the underlying message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DbError(#[from] sqlx::Error);

/// Seam between the HTTP handlers and MySQL. Handlers only ever see
/// this trait; tests substitute a stub.
#[async_trait]
pub trait DbGateway: Send + Sync + 'static {
    /// Insert the fixed patient rows, returning the affected-row count.
    async fn insert_fixed_rows(&self) -> Result<u64, DbError>;

    /// Execute an already-validated SELECT statement verbatim.
    async fn run_select(&self, sql: &str) -> Result<Vec<RowObject>, DbError>;

    /// Startup smoke test (`SELECT 1` over the reader login).
    async fn ping(&self) -> Result<(), DbError>;
}

/// Production gateway: one `MySqlConnection` per operation.
#[derive(Clone)]
pub struct MySqlGateway {
    db_name: String,
    table_name: String,
    writer: DbCredentials,
    reader: DbCredentials,
    ssl_ca: Option<String>,
}

impl MySqlGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            db_name: config.db_name.clone(),
            table_name: config.table_name.clone(),
            writer: config.writer.clone(),
            reader: config.reader.clone(),
            ssl_ca: config.ssl_ca.clone(),
        }
    }

    async fn connect(&self, credentials: &DbCredentials) -> Result<MySqlConnection, DbError> {
        let mut options = MySqlConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.user)
            .password(&credentials.password)
            .database(&credentials.database);

        if let Some(ca) = &self.ssl_ca {
            options = options
                .ssl_mode(MySqlSslMode::VerifyCa)
                .ssl_ca_from_pem(ca.clone().into_bytes());
        }

        Ok(options.connect().await?)
    }

    async fn ensure_schema(&self, conn: &mut MySqlConnection) -> Result<(), DbError> {
        let use_db = format!("USE {}", quote_ident(&self.db_name));
        sqlx::query(&use_db).execute(&mut *conn).await?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
               patientID INT NOT NULL AUTO_INCREMENT, \
               name VARCHAR(100) NOT NULL, \
               age INT NOT NULL, \
               city VARCHAR(100) NOT NULL, \
               PRIMARY KEY (patientID)\
             ) ENGINE=InnoDB",
            quote_ident(&self.table_name)
        );
        sqlx::query(&ddl).execute(&mut *conn).await?;
        Ok(())
    }

    async fn insert_on(&self, conn: &mut MySqlConnection) -> Result<u64, DbError> {
        self.ensure_schema(conn).await?;

        let mut builder = QueryBuilder::<MySql>::new(format!(
            "INSERT INTO {} (name, age, city) ",
            quote_ident(&self.table_name)
        ));
        builder.push_values(FIXED_PATIENT_ROWS.iter(), |mut row, patient| {
            row.push_bind(patient.name)
                .push_bind(patient.age)
                .push_bind(patient.city);
        });

        let result = builder.build().execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    async fn select_on(
        &self,
        conn: &mut MySqlConnection,
        sql: &str,
    ) -> Result<Vec<RowObject>, DbError> {
        let use_db = format!("USE {}", quote_ident(&self.db_name));
        sqlx::query(&use_db).execute(&mut *conn).await?;

        let raw_rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        let mut objects = Vec::with_capacity(raw_rows.len());
        for row in &raw_rows {
            objects.push(rows::row_to_object(row)?);
        }
        Ok(objects)
    }
}

#[async_trait]
impl DbGateway for MySqlGateway {
    async fn insert_fixed_rows(&self) -> Result<u64, DbError> {
        let mut conn = self.connect(&self.writer).await?;
        let result = self.insert_on(&mut conn).await;
        close(conn).await;
        result
    }

    async fn run_select(&self, sql: &str) -> Result<Vec<RowObject>, DbError> {
        let mut conn = self.connect(&self.reader).await?;
        let result = self.select_on(&mut conn, sql).await;
        close(conn).await;
        result
    }

    async fn ping(&self) -> Result<(), DbError> {
        let mut conn = self.connect(&self.reader).await?;
        let result = sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(DbError::from);
        close(conn).await;
        result
    }
}

/// Close on every exit path; the operation's error always wins over a
/// close error.
async fn close(conn: MySqlConnection) {
    if let Err(err) = conn.close().await {
        tracing::debug!(error = %err, "connection close failed");
    }
}

/// Backtick-quote a config-provided identifier. These values come from
/// the operator, never from a request, but embedded backticks still get
/// doubled per MySQL quoting rules.
fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
