//! Custom field lookups.
//!
//! Cards only reference custom fields by id. [`FieldTable`] maps those ids to
//! the field's name and type so the tree builder can project card values onto
//! a page's `body_data`.

use crate::board::CustomField;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FieldError {
    #[error("Custom field `{0}` has no id")]
    MissingId(String),
}

/// Field id → name and field id → type.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    names: HashMap<String, String>,
    types: HashMap<String, String>,
}

impl FieldTable {
    pub fn from_fields(fields: &[CustomField]) -> Result<Self, FieldError> {
        let mut table = Self::default();
        for field in fields {
            if field.id.is_empty() {
                return Err(FieldError::MissingId(field.name.clone()));
            }
            table.names.insert(field.id.clone(), field.name.clone());
            table.types.insert(field.id.clone(), field.field_type.clone());
        }
        Ok(table)
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn field_type(&self, id: &str) -> Option<&str> {
        self.types.get(id).map(String::as_str)
    }
}
