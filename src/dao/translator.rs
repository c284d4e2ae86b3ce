//! Instance <-> row translation and the single-table statements built on it.

use crate::dao::sync::TableColumns;
use crate::db::schema::quote_ident;
use crate::db::{ID_COLUMN, JSON_COLUMN};
use crate::error::DaoError;
use crate::model::{Instance, ModelRegistry, Record};
use serde_json::Value;

/// One SQL statement and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct RowTranslator {
    pretty_json: bool,
}

impl RowTranslator {
    pub fn new(pretty_json: bool) -> Self {
        Self { pretty_json }
    }

    fn blob(&self, instance: &Instance) -> Result<Value, DaoError> {
        let snapshot = Value::Object(instance.to_record());
        let text = if self.pretty_json {
            serde_json::to_string_pretty(&snapshot)?
        } else {
            serde_json::to_string(&snapshot)?
        };
        Ok(Value::String(text))
    }

    /// Value for one column: the serialized snapshot for `json`, the
    /// same-named field for everything else (null when absent).
    fn column_value(&self, name: &str, instance: &Instance) -> Result<Value, DaoError> {
        match name {
            JSON_COLUMN => self.blob(instance),
            ID_COLUMN => Ok(Value::String(instance.id().to_string())),
            other => Ok(instance.field(other).unwrap_or(Value::Null)),
        }
    }

    /// Parameters in cache order.
    pub fn to_row(&self, columns: &TableColumns, instance: &Instance) -> Result<Vec<Value>, DaoError> {
        columns
            .iter()
            .map(|c| self.column_value(&c.name, instance))
            .collect()
    }

    pub fn insert(
        &self,
        kind: &str,
        columns: &TableColumns,
        instance: &Instance,
    ) -> Result<Statement, DaoError> {
        let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        Ok(Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(kind),
                names.join(", "),
                placeholders
            ),
            params: self.to_row(columns, instance)?,
        })
    }

    /// SET every non-id column in cache order; the id is the last parameter.
    pub fn update(
        &self,
        kind: &str,
        columns: &TableColumns,
        instance: &Instance,
    ) -> Result<Statement, DaoError> {
        let mut assignments = Vec::with_capacity(columns.len());
        let mut params = Vec::with_capacity(columns.len());
        for column in columns.settable() {
            assignments.push(format!("{} = ?", quote_ident(&column.name)));
            params.push(self.column_value(&column.name, instance)?);
        }
        params.push(Value::String(instance.id().to_string()));
        Ok(Statement {
            sql: format!(
                "UPDATE {} SET {} WHERE {} = ?",
                quote_ident(kind),
                assignments.join(", "),
                ID_COLUMN
            ),
            params,
        })
    }

    /// Merge a fetched row with its blob and construct the instance.
    ///
    /// Blob fields overwrite same-named native columns; the raw `json`
    /// column itself is not part of the constructed object.
    pub fn from_row(
        &self,
        registry: &dyn ModelRegistry,
        kind: &str,
        mut row: Record,
    ) -> Result<Instance, DaoError> {
        if let Some(Value::String(blob)) = row.remove(JSON_COLUMN) {
            if !blob.trim().is_empty() {
                let stored: Record = serde_json::from_str(&blob)?;
                row.extend(stored);
            }
        }
        registry.construct(kind, row)
    }
}

pub fn delete_by_id(kind: &str, id: &str) -> Statement {
    Statement {
        sql: format!("DELETE FROM {} WHERE {} = ?", quote_ident(kind), ID_COLUMN),
        params: vec![Value::String(id.to_string())],
    }
}

pub fn delete_all(kind: &str) -> Statement {
    Statement {
        sql: format!("DELETE FROM {}", quote_ident(kind)),
        params: Vec::new(),
    }
}

pub fn select_by_id(kind: &str, id: &str) -> Statement {
    Statement {
        sql: format!("SELECT * FROM {} WHERE {} = ?", quote_ident(kind), ID_COLUMN),
        params: vec![Value::String(id.to_string())],
    }
}

pub fn select_all(kind: &str) -> Statement {
    Statement {
        sql: format!("SELECT * FROM {}", quote_ident(kind)),
        params: Vec::new(),
    }
}
