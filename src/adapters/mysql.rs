//! MySQL adapter: schema and account administration, backups and ad-hoc SQL.
//!
//! DDL statements cannot take bind parameters, so identifiers are validated
//! and string literals quoted before they are spliced in.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{AssertSqlSafe, Column, Executor, Row, TypeInfo, ValueRef};

use super::{AdapterError, CommandRunner, CommandSpec};
use crate::config::MysqlConfig;
use crate::envelope::Envelope;
use crate::registry::BuildContext;
use crate::tool::{bind, OperationSpec, Toolset};

pub const CREATE_DATABASE: OperationSpec =
    OperationSpec::mutating("create_database", "Create a new MySQL database.");
pub const MANAGE_USER: OperationSpec = OperationSpec::mutating(
    "manage_user",
    "Create or drop a MySQL user. Creating requires a password.",
);
pub const GRANT_PRIVILEGES: OperationSpec = OperationSpec::mutating(
    "grant_privileges",
    "Grant privileges (e.g. 'SELECT, INSERT' or 'ALL PRIVILEGES') on a database to a user.",
);
pub const BACKUP_DATABASE: OperationSpec = OperationSpec::mutating(
    "backup_database",
    "Dump a database with mysqldump into the backup directory.",
);
pub const RUN_SQL_QUERY: OperationSpec = OperationSpec::mutating(
    "run_sql_query",
    "Run a SQL statement against a database. Returns rows, or the affected row count.",
);

const PRIVILEGES: &[&str] = &[
    "ALL",
    "ALL PRIVILEGES",
    "ALTER",
    "ALTER ROUTINE",
    "CREATE",
    "CREATE ROUTINE",
    "CREATE TEMPORARY TABLES",
    "CREATE VIEW",
    "DELETE",
    "DROP",
    "EVENT",
    "EXECUTE",
    "INDEX",
    "INSERT",
    "LOCK TABLES",
    "REFERENCES",
    "SELECT",
    "SHOW VIEW",
    "TRIGGER",
    "UPDATE",
];

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DatabaseParams {
    #[schemars(description = "Database name")]
    pub db_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserAction {
    Create,
    Drop,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ManageUserParams {
    #[schemars(description = "MySQL user name")]
    pub username: String,
    #[schemars(description = "'create' or 'drop'")]
    pub action: UserAction,
    #[schemars(description = "Password for the new user (required for create)")]
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GrantParams {
    #[schemars(description = "MySQL user name")]
    pub username: String,
    #[schemars(description = "Database name")]
    pub db_name: String,
    #[schemars(description = "Comma-separated privileges, e.g. 'SELECT, INSERT'")]
    pub privileges: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SqlParams {
    #[schemars(description = "SQL statement to execute")]
    pub query: String,
    #[schemars(description = "Database to run the statement against")]
    pub db_name: String,
}

pub struct MysqlAdapter {
    pool: MySqlPool,
    runner: Arc<dyn CommandRunner>,
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    backup_dir: PathBuf,
    dump_binary: String,
}

impl MysqlAdapter {
    /// Builds a lazy pool; no connection is made until the first operation.
    pub fn new(config: &MysqlConfig, runner: Arc<dyn CommandRunner>) -> anyhow::Result<Self> {
        let host = config
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .context("mysql.host is not set")?;

        let mut options = MySqlConnectOptions::new().host(host).port(config.port);
        if let Some(user) = &config.username {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            runner,
            host: host.to_string(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            backup_dir: crate::config::expand_tilde(&config.backup_dir),
            dump_binary: config.dump_binary.clone(),
        })
    }

    pub async fn create_database(&self, db: &str) -> Result<Envelope, AdapterError> {
        let db = identifier("db_name", db)?;
        self.pool
            .execute(AssertSqlSafe(format!("CREATE DATABASE `{db}`").as_str()))
            .await?;

        tracing::info!(db, "database created");
        Ok(Envelope::success(format!("Database '{db}' created successfully.")))
    }

    pub async fn manage_user(
        &self,
        username: &str,
        action: UserAction,
        password: Option<&str>,
    ) -> Result<Envelope, AdapterError> {
        let user = identifier("username", username)?;
        let statement = match action {
            UserAction::Create => {
                let password = password
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| AdapterError::invalid("password is required to create a user"))?;
                format!(
                    "CREATE USER '{user}'@'%' IDENTIFIED BY {}",
                    quote_literal(password)
                )
            }
            UserAction::Drop => format!("DROP USER '{user}'@'%'"),
        };

        let mut conn = self.pool.acquire().await?;
        (&mut *conn).execute(AssertSqlSafe(statement.as_str())).await?;
        (&mut *conn).execute("FLUSH PRIVILEGES").await?;

        let verb = match action {
            UserAction::Create => "created",
            UserAction::Drop => "dropped",
        };
        tracing::info!(user, verb, "mysql user changed");
        Ok(Envelope::success(format!("User '{user}' {verb} successfully.")))
    }

    pub async fn grant_privileges(
        &self,
        username: &str,
        db: &str,
        privileges: &str,
    ) -> Result<Envelope, AdapterError> {
        let user = identifier("username", username)?;
        let db = identifier("db_name", db)?;
        let privileges = privilege_list(privileges)?;

        let mut conn = self.pool.acquire().await?;
        (&mut *conn).execute(AssertSqlSafe(format!("GRANT {privileges} ON `{db}`.* TO '{user}'@'%'").as_str()))
            .await?;
        (&mut *conn).execute("FLUSH PRIVILEGES").await?;

        tracing::info!(user, db, %privileges, "privileges granted");
        Ok(Envelope::success(format!(
            "Granted {privileges} on '{db}' to '{user}'."
        )))
    }

    pub async fn backup_database(&self, db: &str) -> Result<Envelope, AdapterError> {
        let db = identifier("db_name", db)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self.backup_dir.join(format!("{db}_{stamp}.sql"));

        let mut command = CommandSpec::new(&self.dump_binary, self.dump_args(db));
        if let Some(password) = &self.password {
            command = command.env("MYSQL_PWD", password);
        }
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let bytes = self.runner.run_to_file(&command, &path).await?;

        let file = path.display().to_string();
        tracing::info!(db, %file, bytes, "database backed up");
        Ok(Envelope::record(json!({
            "message": format!("Backup of '{db}' completed."),
            "file": file,
        })))
    }

    fn dump_args(&self, db: &str) -> Vec<String> {
        let mut args = vec![
            "-h".to_string(),
            self.host.clone(),
            "-P".to_string(),
            self.port.to_string(),
        ];
        if let Some(user) = &self.username {
            args.push("-u".into());
            args.push(user.clone());
        }
        args.push("--single-transaction".into());
        args.push("--hex-blob".into());
        args.push(db.to_string());
        args
    }

    /// Row-returning statements yield their rows; anything else yields the
    /// affected row count.
    pub async fn run_sql_query(&self, query: &str, db: &str) -> Result<Envelope, AdapterError> {
        let db = identifier("db_name", db)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(AdapterError::invalid("query must not be empty"));
        }

        let mut conn = self.pool.acquire().await?;
        (&mut *conn).execute(AssertSqlSafe(format!("USE `{db}`").as_str())).await?;

        if returns_rows(query) {
            let rows = (&mut *conn).fetch_all(AssertSqlSafe(query)).await?;
            tracing::info!(db, rows = rows.len(), "sql query executed");
            Ok(Envelope::records(rows.iter().map(row_to_json).collect()))
        } else {
            let result = (&mut *conn).execute(AssertSqlSafe(query)).await?;
            tracing::info!(db, rows_affected = result.rows_affected(), "sql statement executed");
            Ok(Envelope::records(vec![json!({
                "status": "success",
                "rows_affected": result.rows_affected(),
            })]))
        }
    }
}

/// Database and user names: ASCII letters, digits, `_` and `$`, at most 64 chars.
fn identifier<'a>(field: &str, value: &'a str) -> Result<&'a str, AdapterError> {
    let valid = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if !valid {
        return Err(AdapterError::invalid(format!(
            "{field} '{value}' is not a valid MySQL identifier"
        )));
    }
    Ok(value)
}

/// Normalise a comma-separated privilege list against the known set.
fn privilege_list(raw: &str) -> Result<String, AdapterError> {
    let mut out = Vec::new();
    for part in raw.split(',') {
        let normalized = part.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        if normalized.is_empty() {
            continue;
        }
        if !PRIVILEGES.contains(&normalized.as_str()) {
            return Err(AdapterError::invalid(format!(
                "unsupported privilege '{}'",
                part.trim()
            )));
        }
        out.push(normalized);
    }
    if out.is_empty() {
        return Err(AdapterError::invalid("privileges must not be empty"));
    }
    Ok(out.join(", "))
}

fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn returns_rows(query: &str) -> bool {
    let first = query
        .trim_start_matches('(')
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first.as_str(),
        "SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "WITH" | "TABLE" | "VALUES"
    )
}

/// Unprepared statements return text values; numeric columns are parsed back.
fn row_to_json(row: &MySqlRow) -> Value {
    let mut object = Map::new();
    for column in row.columns() {
        let i = column.ordinal();
        let is_null = row.try_get_raw(i).map(|raw| raw.is_null()).unwrap_or(true);
        let value = if is_null {
            Value::Null
        } else {
            column_value(row, i, column.type_info().name())
        };
        object.insert(column.name().to_string(), value);
    }
    Value::Object(object)
}

fn column_value(row: &MySqlRow, i: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "BOOLEAN" => row.try_get_unchecked::<bool, _>(i).map(Value::from).ok(),
        name if name.ends_with("UNSIGNED") => row.try_get_unchecked::<u64, _>(i).map(Value::from).ok(),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get_unchecked::<i64, _>(i).map(Value::from).ok()
        }
        "FLOAT" | "DOUBLE" => row.try_get_unchecked::<f64, _>(i).map(Value::from).ok(),
        _ => None,
    };
    decoded.unwrap_or_else(|| {
        row.try_get_unchecked::<Vec<u8>, _>(i)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null)
    })
}

pub fn toolset(ctx: &BuildContext) -> anyhow::Result<Toolset> {
    let adapter = Arc::new(MysqlAdapter::new(&ctx.config.mysql, Arc::clone(&ctx.runner))?);
    Ok(vec![
        bind(&adapter, CREATE_DATABASE, |a, p: DatabaseParams| async move {
            a.create_database(&p.db_name).await
        }),
        bind(&adapter, MANAGE_USER, |a, p: ManageUserParams| async move {
            a.manage_user(&p.username, p.action, p.password.as_deref())
                .await
        }),
        bind(&adapter, GRANT_PRIVILEGES, |a, p: GrantParams| async move {
            a.grant_privileges(&p.username, &p.db_name, &p.privileges)
                .await
        }),
        bind(&adapter, BACKUP_DATABASE, |a, p: DatabaseParams| async move {
            a.backup_database(&p.db_name).await
        }),
        bind(&adapter, RUN_SQL_QUERY, |a, p: SqlParams| async move {
            a.run_sql_query(&p.query, &p.db_name).await
        }),
    ])
}
