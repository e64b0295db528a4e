//! Relational query engine: a MySQL pool plus the models defined on it.

use common::errors::{AppError, AppResult};
use common::models::FieldDefinition;
use sqlx::MySqlPool;

/// Quotes a MySQL identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// A model resolved into a concrete table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    /// Registered model name (`prefix + model`).
    pub model: String,
    pub table_name: String,
    pub fields: Vec<FieldDefinition>,
    /// Creation timestamp column, if enabled.
    pub created_at: Option<String>,
    /// Update timestamp column, if enabled.
    pub updated_at: Option<String>,
}

impl TableDefinition {
    fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    fn column(field: &FieldDefinition) -> String {
        let mut column = format!("{} {}", quote_ident(&field.name), field.field_type.mysql_type());
        if !field.allow_null {
            column.push_str(" NOT NULL");
        }
        if field.auto_increment {
            column.push_str(" AUTO_INCREMENT");
        }
        if field.unique && !field.primary_key {
            column.push_str(" UNIQUE");
        }
        if let Some(default) = &field.default_value {
            column.push_str(" DEFAULT ");
            column.push_str(default);
        }
        column
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_statement(&self) -> String {
        let mut columns = Vec::with_capacity(self.fields.len() + 4);
        let mut primary: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| quote_ident(&f.name))
            .collect();

        if primary.is_empty() {
            columns.push(format!("{} INT NOT NULL AUTO_INCREMENT", quote_ident("id")));
            primary.push(quote_ident("id"));
        }
        columns.extend(self.fields.iter().map(Self::column));

        if let Some(created) = self.created_at.as_deref().filter(|c| !self.has_field(c)) {
            columns.push(format!(
                "{} DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP",
                quote_ident(created)
            ));
        }
        if let Some(updated) = self.updated_at.as_deref().filter(|c| !self.has_field(c)) {
            columns.push(format!(
                "{} DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP",
                quote_ident(updated)
            ));
        }
        columns.push(format!("PRIMARY KEY ({})", primary.join(", ")));

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
            quote_ident(&self.table_name),
            columns.join(",\n    ")
        )
    }

    /// `DROP TABLE IF EXISTS` statement for this table.
    pub fn drop_statement(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_ident(&self.table_name))
    }
}

/// Query engine bound to the active relational database.
#[derive(Clone)]
pub struct QueryEngine {
    pool: MySqlPool,
    tables: Vec<TableDefinition>,
}

impl QueryEngine {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            tables: Vec::new(),
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Registers a table. A later definition with the same model name replaces the earlier one.
    pub fn define(&mut self, table: TableDefinition) {
        self.tables.retain(|t| t.model != table.model);
        self.tables.push(table);
    }

    /// Creates every defined table. With `force`, existing tables are
    /// dropped first (in reverse definition order) and recreated.
    pub async fn sync(&self, force: bool) -> AppResult<()> {
        for statement in sync_statements(&self.tables, force) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::SchemaSync(format!("{statement}: {e}")))?;
        }
        tracing::info!(tables = self.tables.len(), force, "Schema synchronized");
        Ok(())
    }
}

/// Statements issued by [`QueryEngine::sync`], in execution order.
pub fn sync_statements(tables: &[TableDefinition], force: bool) -> Vec<String> {
    let mut statements = Vec::new();
    if force {
        statements.extend(tables.iter().rev().map(TableDefinition::drop_statement));
    }
    statements.extend(tables.iter().map(TableDefinition::create_statement));
    statements
}
