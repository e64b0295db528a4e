//! Model (table) definitions registered with the relational query engine.

use serde::{Deserialize, Serialize};

/// Column data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    BigInteger,
    /// Variable-length string with a maximum length.
    String(u16),
    Text,
    Boolean,
    Float,
    Double,
    Date,
    DateTime,
    Json,
    /// UUID stored as `CHAR(36)`.
    Uuid,
}

impl FieldType {
    /// MySQL column type.
    pub fn mysql_type(&self) -> String {
        match self {
            FieldType::Integer => "INT".to_string(),
            FieldType::BigInteger => "BIGINT".to_string(),
            FieldType::String(len) => format!("VARCHAR({len})"),
            FieldType::Text => "TEXT".to_string(),
            FieldType::Boolean => "TINYINT(1)".to_string(),
            FieldType::Float => "FLOAT".to_string(),
            FieldType::Double => "DOUBLE".to_string(),
            FieldType::Date => "DATE".to_string(),
            FieldType::DateTime => "DATETIME".to_string(),
            FieldType::Json => "JSON".to_string(),
            FieldType::Uuid => "CHAR(36)".to_string(),
        }
    }
}

/// One column of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub allow_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    /// Raw SQL default expression, e.g. `'active'` or `0`.
    pub default_value: Option<String>,
}

impl FieldDefinition {
    /// A nullable column with no constraints.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            allow_null: true,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    /// Marks the column as the primary key (implies NOT NULL).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_null = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Engine options for a model.
///
/// Every field is optional so a model only states what it overrides;
/// [`ModelOptions::merged`] layers overrides on top of a base.
/// For the timestamp column names, `Some(None)` disables that column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOptions {
    /// Use the model name verbatim instead of pluralizing it.
    pub freeze_table_name: Option<bool>,
    /// Add created/updated timestamp columns.
    pub timestamps: Option<bool>,
    pub created_at: Option<Option<String>>,
    pub updated_at: Option<Option<String>>,
    /// Explicit table name, bypassing prefixing and pluralization.
    pub table_name: Option<String>,
}

impl ModelOptions {
    /// Conventions applied to every registered model: frozen table names and
    /// snake_case timestamp columns.
    pub fn convention() -> Self {
        Self {
            freeze_table_name: Some(true),
            timestamps: Some(true),
            created_at: Some(Some("created_at".to_string())),
            updated_at: Some(Some("updated_at".to_string())),
            table_name: None,
        }
    }

    /// Returns `self` with every option set in `overrides` replaced.
    pub fn merged(&self, overrides: &ModelOptions) -> ModelOptions {
        ModelOptions {
            freeze_table_name: overrides.freeze_table_name.or(self.freeze_table_name),
            timestamps: overrides.timestamps.or(self.timestamps),
            created_at: overrides.created_at.clone().or_else(|| self.created_at.clone()),
            updated_at: overrides.updated_at.clone().or_else(|| self.updated_at.clone()),
            table_name: overrides.table_name.clone().or_else(|| self.table_name.clone()),
        }
    }

    pub fn freeze_table_name(mut self, freeze: bool) -> Self {
        self.freeze_table_name = Some(freeze);
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = Some(enabled);
        self
    }

    pub fn created_at(mut self, column: Option<&str>) -> Self {
        self.created_at = Some(column.map(str::to_string));
        self
    }

    pub fn updated_at(mut self, column: Option<&str>) -> Self {
        self.updated_at = Some(column.map(str::to_string));
        self
    }

    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }
}

/// A statically defined model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    /// Database names this model applies to. `None` means the model is
    /// never registered by the startup pipeline.
    pub connections: Option<Vec<String>>,
    /// Overrides layered on top of [`ModelOptions::convention`].
    pub options: ModelOptions,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            connections: None,
            options: ModelOptions::default(),
        }
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn connections(mut self, names: &[&str]) -> Self {
        self.connections = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether the model's allow-list contains `database`.
    pub fn applies_to(&self, database: &str) -> bool {
        self.connections
            .as_ref()
            .is_some_and(|names| names.iter().any(|n| n == database))
    }
}
