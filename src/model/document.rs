use super::{Instance, Model, ModelKind, Record, record_id};
use crate::db::ID_COLUMN;
use crate::error::DaoError;
use serde_json::Value;
use std::sync::Arc;

/// Schemaless model: an id plus arbitrary fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: String,
    fields: Record,
}

impl Document {
    pub fn from_record(mut data: Record) -> Result<Self, DaoError> {
        let id = record_id(&data)
            .ok_or_else(|| DaoError::InvalidModel("document requires a non-empty string `id`".into()))?
            .to_string();
        data.remove(ID_COLUMN);
        Ok(Self { id, fields: data })
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }
}

impl Model for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_record(&self) -> Record {
        let mut record = self.fields.clone();
        record.insert(ID_COLUMN.to_string(), Value::String(self.id.clone()));
        record
    }

    fn field(&self, name: &str) -> Option<Value> {
        if name == ID_COLUMN {
            return Some(Value::String(self.id.clone()));
        }
        self.fields.get(name).cloned()
    }
}

/// Registers a named kind whose instances are `Document`s.
#[derive(Debug, Clone)]
pub struct DocumentKind {
    name: String,
}

impl DocumentKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ModelKind for DocumentKind {
    fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self, data: Record) -> Result<Instance, DaoError> {
        Ok(Arc::new(Document::from_record(data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn snapshot_contains_id_and_fields() {
        let doc = Document::from_record(record(json!({"id": "x1", "name": "a", "n": 2}))).unwrap();
        assert_eq!(doc.id(), "x1");
        assert_eq!(
            Value::Object(doc.to_record()),
            json!({"id": "x1", "name": "a", "n": 2})
        );
        assert_eq!(doc.field("name"), Some(json!("a")));
        assert_eq!(doc.field("id"), Some(json!("x1")));
        assert_eq!(doc.field("missing"), None);
    }

    #[test]
    fn rejects_missing_or_empty_id() {
        assert!(matches!(
            Document::from_record(record(json!({"name": "a"}))),
            Err(DaoError::InvalidModel(_))
        ));
        assert!(matches!(
            Document::from_record(record(json!({"id": ""}))),
            Err(DaoError::InvalidModel(_))
        ));
        assert!(matches!(
            Document::from_record(record(json!({"id": 7}))),
            Err(DaoError::InvalidModel(_))
        ));
    }

    #[test]
    fn decodes_into_caller_type() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Item {
            id: String,
            name: String,
        }

        let instance = DocumentKind::new("Item")
            .construct(record(json!({"id": "x1", "name": "a"})))
            .unwrap();
        let item: Item = instance.decode().unwrap();
        assert_eq!(
            item,
            Item {
                id: "x1".into(),
                name: "a".into()
            }
        );
    }
}
