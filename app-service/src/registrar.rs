//! Registers the applicable models with the relational query engine.

use common::models::{ModelDefinition, ModelOptions};

use crate::engine::{QueryEngine, TableDefinition};

/// Naive English plural used when a model opts out of frozen table names.
/// Names already ending in `s` are taken to be plural and kept as is.
pub fn pluralize(name: &str) -> String {
    if name.ends_with('s') {
        name.to_string()
    } else if name.ends_with('x') || name.ends_with("ch") || name.ends_with("sh") {
        format!("{name}es")
    } else if let Some(stem) = name
        .strip_suffix('y')
        .filter(|s| !s.ends_with(&['a', 'e', 'i', 'o', 'u'][..]))
    {
        format!("{stem}ies")
    } else {
        format!("{name}s")
    }
}

/// Turns model definitions into table definitions for one database.
pub struct ModelRegistrar;

impl ModelRegistrar {
    /// Resolves one model under the naming conventions and its own overrides.
    pub fn table_definition(model: &ModelDefinition, prefix: &str) -> TableDefinition {
        let options = ModelOptions::convention().merged(&model.options);
        let registered = format!("{prefix}{}", model.name);
        let table_name = options.table_name.clone().unwrap_or_else(|| {
            if options.freeze_table_name.unwrap_or(true) {
                registered.clone()
            } else {
                pluralize(&registered)
            }
        });
        let timestamps = options.timestamps.unwrap_or(true);

        TableDefinition {
            model: registered,
            table_name,
            fields: model.fields.clone(),
            created_at: options.created_at.flatten().filter(|_| timestamps),
            updated_at: options.updated_at.flatten().filter(|_| timestamps),
        }
    }

    /// Tables for every model whose allow-list names `database`, in registry order.
    pub fn plan(models: &[ModelDefinition], database: &str, prefix: &str) -> Vec<TableDefinition> {
        models
            .iter()
            .filter(|m| m.applies_to(database))
            .map(|m| Self::table_definition(m, prefix))
            .collect()
    }

    /// Defines the planned tables on `engine` and returns their registered names.
    pub fn register(
        engine: &mut QueryEngine,
        models: &[ModelDefinition],
        database: &str,
        prefix: &str,
    ) -> Vec<String> {
        let tables = Self::plan(models, database, prefix);
        let names = tables.iter().map(|t| t.model.clone()).collect::<Vec<_>>();
        for table in tables {
            tracing::debug!(model = %table.model, table = %table.table_name, "Model registered");
            engine.define(table);
        }
        names
    }
}
