// Schema definition types — the DSL used to describe the splitbook tables.
//
// Backends consume this to generate DDL (`splitbook-sqlx`) or to enforce
// constraints in memory (`splitbook-memory`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Field types supported by the schema system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
}

/// A single field definition within a table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    /// The field's data type.
    pub field_type: FieldType,
    /// Whether the field is required (non-nullable).
    #[serde(default)]
    pub required: bool,
    /// Whether the field must be unique across records.
    #[serde(default)]
    pub unique: bool,
    /// Default value for the field (as JSON).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    /// If true, the field is auto-set to the current timestamp on create/update.
    #[serde(default)]
    pub auto_set_on_create: bool,
    #[serde(default)]
    pub auto_set_on_update: bool,
    /// Reference to another table (foreign key).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<FieldReference>,
}

impl SchemaField {
    /// Create a required string field.
    pub fn required_string() -> Self {
        Self {
            field_type: FieldType::String,
            required: true,
            unique: false,
            default_value: None,
            auto_set_on_create: false,
            auto_set_on_update: false,
            references: None,
        }
    }

    /// Create an optional string field.
    pub fn optional_string() -> Self {
        Self {
            required: false,
            ..Self::required_string()
        }
    }

    /// Create a required numeric field.
    pub fn required_number() -> Self {
        Self {
            field_type: FieldType::Number,
            ..Self::required_string()
        }
    }

    /// Create a required boolean field with a default value.
    pub fn boolean(default: bool) -> Self {
        Self {
            field_type: FieldType::Boolean,
            required: false,
            default_value: Some(serde_json::Value::Bool(default)),
            ..Self::required_string()
        }
    }

    /// Create a required date field (auto-set on creation).
    pub fn created_at() -> Self {
        Self {
            field_type: FieldType::Date,
            required: true,
            auto_set_on_create: true,
            ..Self::required_string()
        }
    }

    /// Create a required date field (auto-set on creation and update).
    pub fn updated_at() -> Self {
        Self {
            field_type: FieldType::Date,
            required: true,
            auto_set_on_create: true,
            auto_set_on_update: true,
            ..Self::required_string()
        }
    }

    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_reference(mut self, table: &str, field: &str) -> Self {
        self.references = Some(FieldReference {
            table: table.to_string(),
            field: field.to_string(),
            on_delete: None,
        });
        self
    }
}

/// Foreign key reference configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldReference {
    /// Referenced table name.
    pub table: String,
    /// Field name in the referenced table (usually "id").
    pub field: String,
    /// ON DELETE action (cascade, set null, etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

/// A complete table definition within the splitbook schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppTable {
    /// The table name in the database.
    pub name: String,
    /// Map of field name → field definition.
    pub fields: HashMap<String, SchemaField>,
    /// Composite unique constraints spanning multiple columns.
    #[serde(default)]
    pub unique_together: Vec<Vec<String>>,
    /// Creation order relative to other tables (referenced tables first).
    #[serde(default)]
    pub order: Option<i32>,
}

impl AppTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: HashMap::new(),
            unique_together: Vec::new(),
            order: None,
        }
    }

    pub fn field(mut self, name: &str, schema_field: SchemaField) -> Self {
        self.fields.insert(name.to_string(), schema_field);
        self
    }

    /// Add a composite unique constraint over the given columns.
    pub fn unique_together(mut self, columns: &[&str]) -> Self {
        self.unique_together
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

/// The complete splitbook database schema, keyed by model name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSchema {
    pub tables: HashMap<String, AppTable>,
}

impl AppSchema {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    pub fn table(mut self, table: AppTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Build the default splitbook schema
    /// (user, group, groupMember, invitation, category, entry).
    pub fn default_schema() -> Self {
        let user = AppTable::new("user")
            .with_order(1)
            .field("id", SchemaField::required_string())
            .field("username", SchemaField::required_string().with_unique())
            .field("createdAt", SchemaField::created_at());

        let group = AppTable::new("group")
            .with_order(2)
            .field("id", SchemaField::required_string())
            .field("name", SchemaField::required_string())
            .field("description", SchemaField::optional_string())
            .field(
                "createdBy",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field("createdAt", SchemaField::created_at())
            .field("updatedAt", SchemaField::updated_at());

        let group_member = AppTable::new("groupMember")
            .with_order(3)
            .field("id", SchemaField::required_string())
            .field(
                "groupId",
                SchemaField::required_string().with_reference("group", "id"),
            )
            .field(
                "userId",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field("role", SchemaField::required_string())
            .field("status", SchemaField::required_string())
            .field("joinedAt", SchemaField::created_at())
            .unique_together(&["groupId", "userId"]);

        let invitation = AppTable::new("invitation")
            .with_order(4)
            .field("id", SchemaField::required_string())
            .field(
                "groupId",
                SchemaField::required_string().with_reference("group", "id"),
            )
            .field(
                "userId",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field(
                "inviterId",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field("status", SchemaField::required_string())
            .field("createdAt", SchemaField::created_at())
            .field(
                "expiresAt",
                SchemaField {
                    field_type: FieldType::Date,
                    required: false,
                    ..SchemaField::required_string()
                },
            )
            .unique_together(&["groupId", "userId"]);

        let category = AppTable::new("category")
            .with_order(5)
            .field("id", SchemaField::required_string())
            .field(
                "userId",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field("name", SchemaField::required_string())
            .field("kind", SchemaField::required_string())
            .unique_together(&["userId", "name"]);

        let entry = AppTable::new("entry")
            .with_order(6)
            .field("id", SchemaField::required_string())
            .field(
                "userId",
                SchemaField::required_string().with_reference("user", "id"),
            )
            .field(
                "groupId",
                SchemaField::optional_string().with_reference("group", "id"),
            )
            .field(
                "categoryId",
                SchemaField::optional_string().with_reference("category", "id"),
            )
            .field("kind", SchemaField::required_string())
            .field("amount", SchemaField::required_number())
            .field("description", SchemaField::optional_string())
            .field(
                "entryDate",
                SchemaField {
                    field_type: FieldType::Date,
                    required: true,
                    ..SchemaField::required_string()
                },
            )
            .field("createdAt", SchemaField::created_at());

        Self::new()
            .table(user)
            .table(group)
            .table(group_member)
            .table(invitation)
            .table(category)
            .table(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_tables() {
        let schema = AppSchema::default_schema();
        for name in ["user", "group", "groupMember", "invitation", "category", "entry"] {
            assert!(schema.tables.contains_key(name), "missing table {name}");
        }
    }

    #[test]
    fn test_membership_and_invitation_are_unique_per_group_user() {
        let schema = AppSchema::default_schema();
        for name in ["groupMember", "invitation"] {
            let table = &schema.tables[name];
            assert_eq!(
                table.unique_together,
                vec![vec!["groupId".to_string(), "userId".to_string()]],
            );
        }
    }

    #[test]
    fn test_username_is_unique() {
        let schema = AppSchema::default_schema();
        assert!(schema.tables["user"].fields["username"].unique);
    }
}
