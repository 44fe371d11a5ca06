// Schema migration planning. Introspects the live database, diffs it
// against the expected schema, and produces the DDL needed to close the
// gap. Type mismatches are reported but never migrated automatically.

use std::collections::HashMap;

use splitbook_core::db::schema::{AppSchema, AppTable, FieldType, SchemaField};
use splitbook_core::error::SplitbookError;
use sqlx::AnyPool;

use crate::adapter::{execute_fetch_all, execute_statement};
use crate::query_builder::quote_identifier;
use crate::schema::{
    compile_migrations, generate_alter_ddl, generate_ddl_for, generate_index_ddl, match_type,
    DatabaseType, IdStrategy,
};

// ─── Introspection types ─────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// A table that exists in the schema but not in the database.
#[derive(Debug, Clone)]
pub struct TableToCreate {
    pub table: String,
    pub fields: HashMap<String, SchemaField>,
    pub unique_together: Vec<Vec<String>>,
    pub order: Option<i32>,
}

/// Columns missing from an existing table.
#[derive(Debug, Clone)]
pub struct ColumnsToAdd {
    pub table: String,
    pub fields: HashMap<String, SchemaField>,
}

/// An existing column whose type does not satisfy the schema.
#[derive(Debug, Clone)]
pub struct TypeMismatch {
    pub table: String,
    pub field: String,
    pub expected: FieldType,
    pub actual: String,
}

// ─── Migration plan ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub to_be_created: Vec<TableToCreate>,
    pub to_be_added: Vec<ColumnsToAdd>,
    pub type_mismatches: Vec<TypeMismatch>,
    /// DDL statements, in execution order: ALTERs, then CREATEs, then indexes.
    pub statements: Vec<String>,
}

impl MigrationPlan {
    /// Whether any DDL needs to run. Type mismatches do not count; they
    /// cannot be fixed by additive migration.
    pub fn has_pending(&self) -> bool {
        !self.to_be_created.is_empty() || !self.to_be_added.is_empty()
    }

    /// Compile the plan into a single SQL script.
    pub fn compile(&self) -> String {
        if self.statements.is_empty() {
            ";".to_string()
        } else {
            compile_migrations(&self.statements)
        }
    }

    /// Execute every statement in the plan against the pool.
    pub async fn run(&self, pool: &AnyPool) -> Result<(), SplitbookError> {
        for statement in &self.statements {
            execute_statement(pool, statement, &[]).await?;
        }
        Ok(())
    }
}

// ─── Backend detection ───────────────────────────────────────────

pub(crate) fn detect_db_type(pool: &AnyPool) -> DatabaseType {
    let options = format!("{:?}", pool.connect_options()).to_lowercase();
    if options.contains("postgres") {
        DatabaseType::Postgres
    } else if options.contains("mysql") {
        DatabaseType::Mysql
    } else {
        DatabaseType::Sqlite
    }
}

// ─── Introspection ───────────────────────────────────────────────

pub(crate) async fn introspect_tables(
    pool: &AnyPool,
    db_type: DatabaseType,
) -> Result<Vec<TableInfo>, SplitbookError> {
    match db_type {
        DatabaseType::Sqlite => introspect_sqlite(pool).await,
        DatabaseType::Postgres => introspect_postgres(pool).await,
        DatabaseType::Mysql => introspect_mysql(pool).await,
    }
}

async fn introspect_sqlite(pool: &AnyPool) -> Result<Vec<TableInfo>, SplitbookError> {
    let rows = execute_fetch_all(
        pool,
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        &[],
    )
    .await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in rows {
        let name = row
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            continue;
        }

        let pragma = format!("PRAGMA table_info({})", quote_identifier(&name));
        let column_rows = execute_fetch_all(pool, &pragma, &[]).await?;
        let columns = column_rows
            .iter()
            .map(|col| ColumnInfo {
                name: col
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                data_type: col
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();

        tables.push(TableInfo { name, columns });
    }
    Ok(tables)
}

async fn introspect_postgres(pool: &AnyPool) -> Result<Vec<TableInfo>, SplitbookError> {
    // Resolve the effective schema from search_path, skipping the $user
    // placeholder.
    let rows = execute_fetch_all(pool, "SHOW search_path", &[]).await?;
    let search_path = rows
        .first()
        .and_then(|row| row.get("search_path"))
        .and_then(|v| v.as_str())
        .unwrap_or("public")
        .to_string();
    let schema_name = search_path
        .split(',')
        .map(|part| part.trim().trim_matches('"'))
        .find(|part| !part.is_empty() && *part != "$user")
        .unwrap_or("public")
        .to_string();

    let table_rows = execute_fetch_all(
        pool,
        "SELECT table_name AS name FROM information_schema.tables \
         WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name",
        &[serde_json::Value::String(schema_name.clone())],
    )
    .await?;

    let mut tables = Vec::with_capacity(table_rows.len());
    for row in table_rows {
        let name = row
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            continue;
        }

        let column_rows = execute_fetch_all(
            pool,
            "SELECT column_name AS name, data_type FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
            &[
                serde_json::Value::String(schema_name.clone()),
                serde_json::Value::String(name.clone()),
            ],
        )
        .await?;
        let columns = column_rows
            .iter()
            .map(|col| ColumnInfo {
                name: col
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                data_type: col
                    .get("data_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();

        tables.push(TableInfo { name, columns });
    }
    Ok(tables)
}

async fn introspect_mysql(pool: &AnyPool) -> Result<Vec<TableInfo>, SplitbookError> {
    let rows = execute_fetch_all(pool, "SELECT DATABASE() AS db_name", &[]).await?;
    let db_name = rows
        .first()
        .and_then(|row| row.get("db_name"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if db_name.is_empty() {
        return Ok(Vec::new());
    }

    let table_rows = execute_fetch_all(
        pool,
        "SELECT table_name AS name FROM information_schema.tables \
         WHERE table_schema = $1 ORDER BY table_name",
        &[serde_json::Value::String(db_name.clone())],
    )
    .await?;

    let mut tables = Vec::with_capacity(table_rows.len());
    for row in table_rows {
        let name = row
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            continue;
        }

        let column_rows = execute_fetch_all(
            pool,
            "SELECT column_name AS name, data_type FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
            &[
                serde_json::Value::String(db_name.clone()),
                serde_json::Value::String(name.clone()),
            ],
        )
        .await?;
        let columns = column_rows
            .iter()
            .map(|col| ColumnInfo {
                name: col
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                data_type: col
                    .get("data_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();

        tables.push(TableInfo { name, columns });
    }
    Ok(tables)
}

// ─── Plan construction ───────────────────────────────────────────

/// Diff the expected schema against the live database and build a plan.
pub async fn get_migrations(
    pool: &AnyPool,
    schema: &AppSchema,
    db_type: DatabaseType,
    id_strategy: IdStrategy,
) -> Result<MigrationPlan, SplitbookError> {
    let existing = introspect_tables(pool, db_type).await?;
    let existing_map: HashMap<&str, &TableInfo> =
        existing.iter().map(|t| (t.name.as_str(), t)).collect();

    let mut expected: Vec<&AppTable> = schema.tables.values().collect();
    expected.sort_by(|a, b| {
        let ka = (a.order.unwrap_or(i32::MAX), a.name.as_str());
        let kb = (b.order.unwrap_or(i32::MAX), b.name.as_str());
        ka.cmp(&kb)
    });

    let mut to_be_created: Vec<TableToCreate> = Vec::new();
    let mut to_be_added: Vec<ColumnsToAdd> = Vec::new();
    let mut type_mismatches: Vec<TypeMismatch> = Vec::new();

    for table in expected {
        match existing_map.get(table.name.as_str()) {
            None => {
                to_be_created.push(TableToCreate {
                    table: table.name.clone(),
                    fields: table.fields.clone(),
                    unique_together: table.unique_together.clone(),
                    order: table.order,
                });
            }
            Some(info) => {
                let existing_columns: HashMap<&str, &ColumnInfo> = info
                    .columns
                    .iter()
                    .map(|col| (col.name.as_str(), col))
                    .collect();

                let mut missing: HashMap<String, SchemaField> = HashMap::new();
                for (field_name, field) in &table.fields {
                    match existing_columns.get(field_name.as_str()) {
                        Some(col) => {
                            if !match_type(&col.data_type, &field.field_type, db_type) {
                                type_mismatches.push(TypeMismatch {
                                    table: table.name.clone(),
                                    field: field_name.clone(),
                                    expected: field.field_type,
                                    actual: col.data_type.clone(),
                                });
                            }
                        }
                        None => {
                            missing.insert(field_name.clone(), field.clone());
                        }
                    }
                }
                if !missing.is_empty() {
                    to_be_added.push(ColumnsToAdd {
                        table: table.name.clone(),
                        fields: missing,
                    });
                }
            }
        }
    }

    let mut statements: Vec<String> = Vec::new();

    for add in &to_be_added {
        let mut field_names: Vec<&String> = add.fields.keys().collect();
        field_names.sort();
        for field_name in field_names {
            statements.push(generate_alter_ddl(
                &add.table,
                field_name,
                &add.fields[field_name],
                db_type,
                id_strategy,
            ));
        }
    }

    if !to_be_created.is_empty() {
        let mut creation_schema = AppSchema::new();
        for create in &to_be_created {
            let mut fields = create.fields.clone();
            fields
                .entry("id".to_string())
                .or_insert_with(SchemaField::required_string);
            creation_schema.tables.insert(
                create.table.clone(),
                AppTable {
                    name: create.table.clone(),
                    fields,
                    unique_together: create.unique_together.clone(),
                    order: create.order,
                },
            );
        }
        statements.extend(generate_ddl_for(&creation_schema, db_type, id_strategy));
        statements.extend(generate_index_ddl(&creation_schema));
    }

    Ok(MigrationPlan {
        to_be_created,
        to_be_added,
        type_mismatches,
        statements,
    })
}

/// [`get_migrations`] with the backend detected from the pool and the
/// default id strategy.
pub async fn get_migrations_auto(
    pool: &AnyPool,
    schema: &AppSchema,
) -> Result<MigrationPlan, SplitbookError> {
    let db_type = detect_db_type(pool);
    get_migrations(pool, schema, db_type, IdStrategy::NanoId).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitbook_core::db::schema::AppSchema;

    async fn memory_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("connect")
    }

    #[tokio::test]
    async fn test_empty_database_needs_all_tables() {
        let pool = memory_pool().await;
        let plan = get_migrations_auto(&pool, &AppSchema::default_schema())
            .await
            .expect("plan");

        assert!(plan.has_pending());
        assert_eq!(plan.to_be_created.len(), 6);
        assert!(plan.to_be_added.is_empty());
        assert!(plan.type_mismatches.is_empty());
        assert!(plan.compile().contains("CREATE TABLE \"user\""));
    }

    #[tokio::test]
    async fn test_existing_tables_are_not_recreated() {
        let pool = memory_pool().await;
        execute_statement(
            &pool,
            "CREATE TABLE \"user\" (\"id\" text PRIMARY KEY NOT NULL, \
             \"username\" text NOT NULL UNIQUE, \"createdAt\" text NOT NULL)",
            &[],
        )
        .await
        .expect("create user");

        let plan = get_migrations_auto(&pool, &AppSchema::default_schema())
            .await
            .expect("plan");

        assert_eq!(plan.to_be_created.len(), 5);
        assert!(!plan.to_be_created.iter().any(|t| t.table == "user"));
        assert!(plan.to_be_added.is_empty());
    }

    #[tokio::test]
    async fn test_missing_column_is_detected() {
        let pool = memory_pool().await;
        execute_statement(
            &pool,
            "CREATE TABLE \"user\" (\"id\" text PRIMARY KEY NOT NULL, \
             \"username\" text NOT NULL UNIQUE)",
            &[],
        )
        .await
        .expect("create user");

        let plan = get_migrations_auto(&pool, &AppSchema::default_schema())
            .await
            .expect("plan");

        let add = plan
            .to_be_added
            .iter()
            .find(|a| a.table == "user")
            .expect("user columns to add");
        assert!(add.fields.contains_key("createdAt"));
        assert!(plan
            .statements
            .iter()
            .any(|s| s.starts_with("ALTER TABLE \"user\" ADD COLUMN \"createdAt\"")));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_reported() {
        let pool = memory_pool().await;
        execute_statement(
            &pool,
            "CREATE TABLE \"user\" (\"id\" text PRIMARY KEY NOT NULL, \
             \"username\" integer NOT NULL, \"createdAt\" text NOT NULL)",
            &[],
        )
        .await
        .expect("create user");

        let plan = get_migrations_auto(&pool, &AppSchema::default_schema())
            .await
            .expect("plan");

        let mismatch = plan
            .type_mismatches
            .iter()
            .find(|m| m.table == "user" && m.field == "username")
            .expect("username mismatch");
        assert_eq!(mismatch.expected, FieldType::String);
        assert_eq!(mismatch.actual, "integer");
    }

    #[tokio::test]
    async fn test_run_migrations_then_recheck_is_clean() {
        let pool = memory_pool().await;
        let schema = AppSchema::default_schema();

        let plan = get_migrations_auto(&pool, &schema).await.expect("plan");
        plan.run(&pool).await.expect("run");

        let recheck = get_migrations_auto(&pool, &schema).await.expect("recheck");
        assert!(!recheck.has_pending());
        assert!(recheck.type_mismatches.is_empty());
        assert_eq!(recheck.compile(), ";");
    }

    #[tokio::test]
    async fn test_schema_evolution_adds_columns() {
        let pool = memory_pool().await;
        let schema = AppSchema::default_schema();
        get_migrations_auto(&pool, &schema)
            .await
            .expect("plan")
            .run(&pool)
            .await
            .expect("run");

        let mut extended = schema.clone();
        if let Some(user) = extended.tables.get_mut("user") {
            user.fields
                .insert("displayName".to_string(), SchemaField::optional_string());
        }

        let plan = get_migrations_auto(&pool, &extended).await.expect("plan");
        assert!(plan.has_pending());
        assert!(plan.to_be_created.is_empty());
        assert_eq!(plan.to_be_added.len(), 1);
        plan.run(&pool).await.expect("run alters");

        let recheck = get_migrations_auto(&pool, &extended)
            .await
            .expect("recheck");
        assert!(!recheck.has_pending());
    }

    #[tokio::test]
    async fn test_detect_db_type_sqlite() {
        let pool = memory_pool().await;
        assert_eq!(detect_db_type(&pool), DatabaseType::Sqlite);
    }
}
