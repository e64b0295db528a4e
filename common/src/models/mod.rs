//! Shared data models.

pub mod connection;
pub mod schema;

// Re-export commonly used types
pub use connection::{DatabaseConfig, DriverKind};
pub use schema::{FieldDefinition, FieldType, ModelDefinition, ModelOptions};
