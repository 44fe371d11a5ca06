// DDL generation. Renders the schema DSL into CREATE TABLE, ALTER TABLE,
// and CREATE INDEX statements for the supported backends.
//
// Timestamps and dates are stored as RFC 3339 / ISO-8601 text on every
// backend; the Any driver only decodes text reliably, and the typed store
// layer parses them back into chrono types.

use splitbook_core::db::adapter::{SchemaOptions, SchemaStatus};
use splitbook_core::db::schema::{AppSchema, AppTable, FieldType, SchemaField};
use splitbook_core::error::SplitbookError;
use sqlx::AnyPool;

use crate::migration::get_migrations_auto;
use crate::query_builder::quote_identifier;

/// Database backends the DDL generator can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Sqlite,
    Postgres,
    Mysql,
}

/// How primary keys are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// Application-generated nanoid strings. The default everywhere.
    NanoId,
    /// Database-generated auto-increment integers.
    AutoIncrement,
}

// ─── Type mapping ────────────────────────────────────────────────

/// Column type for a schema field type on the given backend.
pub fn column_type(field_type: FieldType, db_type: DatabaseType) -> &'static str {
    match (field_type, db_type) {
        // MySQL TEXT columns cannot carry UNIQUE constraints without a
        // prefix length, so strings become varchar there.
        (FieldType::String, DatabaseType::Mysql) => "varchar(255)",
        (FieldType::String, _) => "text",
        (FieldType::Number, DatabaseType::Sqlite) => "real",
        (FieldType::Number, DatabaseType::Postgres) => "double precision",
        (FieldType::Number, DatabaseType::Mysql) => "double",
        (FieldType::Boolean, DatabaseType::Mysql) => "tinyint",
        (FieldType::Boolean, _) => "integer",
        (FieldType::Date, _) => "text",
    }
}

/// Whether an introspected column type satisfies the expected field type.
pub fn match_type(column_type: &str, expected: &FieldType, db_type: DatabaseType) -> bool {
    let ct = column_type.to_lowercase();
    match expected {
        FieldType::String | FieldType::Date => ct.contains("text") || ct.contains("char"),
        FieldType::Number => {
            ct.contains("real")
                || ct.contains("double")
                || ct.contains("float")
                || ct.contains("int")
                || ct.contains("numeric")
                || ct.contains("decimal")
        }
        FieldType::Boolean => match db_type {
            DatabaseType::Mysql => ct.contains("tinyint") || ct.contains("bool"),
            _ => ct.contains("int") || ct.contains("bool"),
        },
    }
}

// ─── DDL rendering ───────────────────────────────────────────────

fn id_column_ddl(db_type: DatabaseType, id_strategy: IdStrategy) -> String {
    match (id_strategy, db_type) {
        (IdStrategy::NanoId, DatabaseType::Mysql) => {
            "\"id\" varchar(255) PRIMARY KEY NOT NULL".to_string()
        }
        (IdStrategy::NanoId, _) => "\"id\" text PRIMARY KEY NOT NULL".to_string(),
        (IdStrategy::AutoIncrement, DatabaseType::Sqlite) => {
            "\"id\" integer PRIMARY KEY AUTOINCREMENT".to_string()
        }
        (IdStrategy::AutoIncrement, DatabaseType::Postgres) => {
            "\"id\" bigserial PRIMARY KEY".to_string()
        }
        (IdStrategy::AutoIncrement, DatabaseType::Mysql) => {
            "\"id\" bigint PRIMARY KEY AUTO_INCREMENT".to_string()
        }
    }
}

fn column_ddl(
    name: &str,
    field: &SchemaField,
    db_type: DatabaseType,
    id_strategy: IdStrategy,
) -> String {
    if name == "id" {
        return id_column_ddl(db_type, id_strategy);
    }

    let mut ddl = format!(
        "{} {}",
        quote_identifier(name),
        column_type(field.field_type, db_type)
    );
    if field.required {
        ddl.push_str(" NOT NULL");
    }
    if field.unique {
        ddl.push_str(" UNIQUE");
    }
    if let Some(default) = &field.default_value {
        match default {
            serde_json::Value::Bool(b) => {
                ddl.push_str(&format!(" DEFAULT {}", if *b { 1 } else { 0 }))
            }
            serde_json::Value::Number(n) => ddl.push_str(&format!(" DEFAULT {}", n)),
            serde_json::Value::String(s) => {
                ddl.push_str(&format!(" DEFAULT '{}'", s.replace('\'', "''")))
            }
            _ => {}
        }
    }
    if let Some(reference) = &field.references {
        ddl.push_str(&format!(
            " REFERENCES {} ({})",
            quote_identifier(&reference.table),
            quote_identifier(&reference.field)
        ));
        if let Some(on_delete) = &reference.on_delete {
            ddl.push_str(&format!(" ON DELETE {}", on_delete.to_uppercase()));
        }
    }
    ddl
}

/// Fields in deterministic order: id first, the rest alphabetical.
fn ordered_fields(table: &AppTable) -> Vec<(&String, &SchemaField)> {
    let mut fields: Vec<_> = table.fields.iter().collect();
    fields.sort_by(|(a, _), (b, _)| match (a.as_str() == "id", b.as_str() == "id") {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    fields
}

/// Tables sorted by their declared order so referenced tables are created
/// before the tables that reference them.
fn ordered_tables(schema: &AppSchema) -> Vec<&AppTable> {
    let mut tables: Vec<&AppTable> = schema.tables.values().collect();
    tables.sort_by(|a, b| {
        let ka = (a.order.unwrap_or(i32::MAX), a.name.as_str());
        let kb = (b.order.unwrap_or(i32::MAX), b.name.as_str());
        ka.cmp(&kb)
    });
    tables
}

/// CREATE TABLE statements for every table in the schema. Composite unique
/// constraints from `unique_together` are emitted as table-level UNIQUE
/// clauses.
pub fn generate_ddl_for(
    schema: &AppSchema,
    db_type: DatabaseType,
    id_strategy: IdStrategy,
) -> Vec<String> {
    ordered_tables(schema)
        .into_iter()
        .map(|table| {
            let mut parts: Vec<String> = ordered_fields(table)
                .into_iter()
                .map(|(name, field)| column_ddl(name, field, db_type, id_strategy))
                .collect();
            for columns in &table.unique_together {
                let cols: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
                parts.push(format!("UNIQUE ({})", cols.join(", ")));
            }
            format!(
                "CREATE TABLE {} ({})",
                quote_identifier(&table.name),
                parts.join(", ")
            )
        })
        .collect()
}

/// ALTER TABLE statement adding a single column to an existing table.
pub fn generate_alter_ddl(
    table: &str,
    field_name: &str,
    field: &SchemaField,
    db_type: DatabaseType,
    id_strategy: IdStrategy,
) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_identifier(table),
        column_ddl(field_name, field, db_type, id_strategy)
    )
}

/// CREATE INDEX statements for all foreign key columns. MySQL indexes
/// these automatically, SQLite and Postgres do not.
pub fn generate_index_ddl(schema: &AppSchema) -> Vec<String> {
    let mut statements = Vec::new();
    for table in ordered_tables(schema) {
        for (name, field) in ordered_fields(table) {
            if field.references.is_some() {
                statements.push(format!(
                    "CREATE INDEX {} ON {} ({})",
                    quote_identifier(&format!("idx_{}_{}", table.name, name)),
                    quote_identifier(&table.name),
                    quote_identifier(name)
                ));
            }
        }
    }
    statements
}

/// Join migration statements into a single executable script.
pub fn compile_migrations(statements: &[String]) -> String {
    let mut script = statements.join(";\n\n");
    script.push(';');
    script
}

// ─── Schema application ──────────────────────────────────────────

/// Compare the live database against the expected schema. Applies pending
/// DDL when `auto_migrate` is set, otherwise reports the statements that
/// would be needed.
pub async fn create_schema(
    pool: &AnyPool,
    schema: &AppSchema,
    options: &SchemaOptions,
) -> Result<SchemaStatus, SplitbookError> {
    let plan = get_migrations_auto(pool, schema).await?;
    if !plan.has_pending() {
        return Ok(SchemaStatus::UpToDate);
    }
    if options.auto_migrate {
        plan.run(pool).await?;
        return Ok(SchemaStatus::UpToDate);
    }
    Ok(SchemaStatus::NeedsMigration {
        statements: plan.statements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AppSchema {
        AppSchema::default_schema()
    }

    #[test]
    fn test_column_types_per_backend() {
        assert_eq!(column_type(FieldType::String, DatabaseType::Sqlite), "text");
        assert_eq!(
            column_type(FieldType::String, DatabaseType::Mysql),
            "varchar(255)"
        );
        assert_eq!(
            column_type(FieldType::Number, DatabaseType::Postgres),
            "double precision"
        );
        assert_eq!(column_type(FieldType::Date, DatabaseType::Postgres), "text");
    }

    #[test]
    fn test_match_type_accepts_backend_aliases() {
        assert!(match_type("TEXT", &FieldType::String, DatabaseType::Sqlite));
        assert!(match_type(
            "varchar",
            &FieldType::String,
            DatabaseType::Postgres
        ));
        assert!(match_type("REAL", &FieldType::Number, DatabaseType::Sqlite));
        assert!(match_type(
            "integer",
            &FieldType::Number,
            DatabaseType::Postgres
        ));
        assert!(match_type("text", &FieldType::Date, DatabaseType::Sqlite));
        assert!(!match_type("text", &FieldType::Number, DatabaseType::Sqlite));
    }

    #[test]
    fn test_tables_are_ordered_for_foreign_keys() {
        let ddl = generate_ddl_for(&schema(), DatabaseType::Sqlite, IdStrategy::NanoId);
        assert_eq!(ddl.len(), 6);
        let position = |name: &str| {
            ddl.iter()
                .position(|stmt| stmt.starts_with(&format!("CREATE TABLE \"{}\"", name)))
                .unwrap_or_else(|| panic!("no CREATE for {}", name))
        };
        assert!(position("user") < position("group"));
        assert!(position("group") < position("groupMember"));
        assert!(position("category") < position("entry"));
    }

    #[test]
    fn test_create_ddl_carries_constraints() {
        let ddl = generate_ddl_for(&schema(), DatabaseType::Sqlite, IdStrategy::NanoId);
        let member = ddl
            .iter()
            .find(|stmt| stmt.contains("\"groupMember\""))
            .expect("groupMember DDL");
        assert!(member.contains("\"id\" text PRIMARY KEY NOT NULL"));
        assert!(member.contains("\"groupId\" text NOT NULL REFERENCES \"group\" (\"id\")"));
        assert!(member.contains("UNIQUE (\"groupId\", \"userId\")"));

        let user = ddl
            .iter()
            .find(|stmt| stmt.contains("\"user\""))
            .expect("user DDL");
        assert!(user.contains("\"username\" text NOT NULL UNIQUE"));
    }

    #[test]
    fn test_optional_columns_are_nullable() {
        let ddl = generate_ddl_for(&schema(), DatabaseType::Sqlite, IdStrategy::NanoId);
        let entry = ddl
            .iter()
            .find(|stmt| stmt.contains("\"entry\""))
            .expect("entry DDL");
        assert!(entry.contains("\"description\" text,") || entry.contains("\"description\" text)"));
        assert!(entry.contains("\"amount\" real NOT NULL"));
    }

    #[test]
    fn test_alter_ddl() {
        let field = SchemaField::optional_string();
        let stmt = generate_alter_ddl(
            "user",
            "displayName",
            &field,
            DatabaseType::Sqlite,
            IdStrategy::NanoId,
        );
        assert_eq!(
            stmt,
            "ALTER TABLE \"user\" ADD COLUMN \"displayName\" text"
        );
    }

    #[test]
    fn test_index_ddl_covers_foreign_keys() {
        let statements = generate_index_ddl(&schema());
        assert!(statements
            .iter()
            .any(|s| s == "CREATE INDEX \"idx_groupMember_groupId\" ON \"groupMember\" (\"groupId\")"));
        assert!(statements
            .iter()
            .any(|s| s.contains("\"idx_entry_categoryId\"")));
    }

    #[test]
    fn test_auto_increment_id_strategy() {
        let ddl = generate_ddl_for(&schema(), DatabaseType::Sqlite, IdStrategy::AutoIncrement);
        let user = ddl
            .iter()
            .find(|stmt| stmt.contains("\"user\""))
            .expect("user DDL");
        assert!(user.contains("\"id\" integer PRIMARY KEY AUTOINCREMENT"));
    }

    #[test]
    fn test_compile_migrations() {
        let statements = vec![
            "CREATE TABLE \"a\" (\"id\" text PRIMARY KEY NOT NULL)".to_string(),
            "CREATE TABLE \"b\" (\"id\" text PRIMARY KEY NOT NULL)".to_string(),
        ];
        let script = compile_migrations(&statements);
        assert!(script.contains("\"a\""));
        assert!(script.contains(";\n\n"));
        assert!(script.ends_with(';'));
    }
}
