//! Application model registry.

use common::models::{FieldDefinition, FieldType, ModelDefinition, ModelOptions};

/// Every model the application defines, in registration order.
pub fn registry() -> Vec<ModelDefinition> {
    vec![
        ModelDefinition::new("users")
            .field(FieldDefinition::new("id", FieldType::BigInteger).primary_key().auto_increment())
            .field(FieldDefinition::new("email", FieldType::String(255)).not_null().unique())
            .field(FieldDefinition::new("password_hash", FieldType::String(255)).not_null())
            .field(FieldDefinition::new("display_name", FieldType::String(100)))
            .field(
                FieldDefinition::new("is_active", FieldType::Boolean)
                    .not_null()
                    .default_value("1"),
            )
            .connections(&["primary"]),
        ModelDefinition::new("sessions")
            .field(FieldDefinition::new("sid", FieldType::String(64)).primary_key())
            .field(FieldDefinition::new("user_id", FieldType::BigInteger))
            .field(FieldDefinition::new("data", FieldType::Json))
            .field(FieldDefinition::new("expires_at", FieldType::DateTime).not_null())
            .connections(&["primary"])
            .options(ModelOptions::default().updated_at(None)),
        ModelDefinition::new("audit_log")
            .field(FieldDefinition::new("actor_id", FieldType::BigInteger))
            .field(FieldDefinition::new("action", FieldType::String(64)).not_null())
            .field(FieldDefinition::new("payload", FieldType::Json))
            .connections(&["primary", "analytics"])
            .options(ModelOptions::default().freeze_table_name(false).updated_at(None)),
        // Managed outside the startup pipeline.
        ModelDefinition::new("migrations")
            .field(FieldDefinition::new("name", FieldType::String(255)).primary_key())
            .options(ModelOptions::default().timestamps(false)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrar::ModelRegistrar;

    #[test]
    fn test_primary_registers_allow_listed_models() {
        let tables = ModelRegistrar::plan(&registry(), "primary", "");
        let names: Vec<_> = tables.iter().map(|t| t.table_name.as_str()).collect();
        assert_eq!(names, vec!["users", "sessions", "audit_logs"]);
    }

    #[test]
    fn test_model_names_are_unique() {
        let models = registry();
        let mut names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), models.len());
    }
}
