use super::{Instance, ModelKind, Record};
use crate::db::ID_COLUMN;
use crate::error::DaoError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Identity and in-memory bookkeeping the adapter performs before persisting.
pub trait ModelRegistry: Send + Sync {
    /// Registered kind names, in registration order.
    fn kinds(&self) -> Vec<String>;

    /// Build an instance of `kind` from a plain-data bag.
    fn construct(&self, kind: &str, data: Record) -> Result<Instance, DaoError>;

    /// Assign an id when `data` has none (absent, null or ""), then construct.
    /// Any other non-string id is rejected.
    fn create(&self, kind: &str, mut data: Record) -> Result<Instance, DaoError> {
        match data.get(ID_COLUMN) {
            None | Some(Value::Null) => {}
            Some(Value::String(id)) if id.is_empty() => {}
            Some(Value::String(_)) => return self.construct(kind, data),
            Some(other) => {
                return Err(DaoError::InvalidModel(format!(
                    "`id` must be a string, got {other}"
                )));
            }
        }
        data.insert(
            ID_COLUMN.to_string(),
            Value::String(Uuid::new_v4().simple().to_string()),
        );
        self.construct(kind, data)
    }

    /// Merge `data` over the snapshot of `current`. The id never changes.
    fn update(&self, kind: &str, current: &Instance, data: Record) -> Result<Instance, DaoError> {
        let mut merged = current.to_record();
        merged.extend(data);
        merged.insert(ID_COLUMN.to_string(), Value::String(current.id().to_string()));
        self.construct(kind, merged)
    }

    /// Register a persisted or hydrated instance.
    fn remember(&self, kind: &str, instance: Instance);

    fn cached(&self, kind: &str, id: &str) -> Option<Instance>;

    /// Removal bookkeeping; returns the cached instance if there was one.
    fn forget(&self, kind: &str, id: &str) -> Option<Instance>;

    /// Drop every cached instance.
    fn clear(&self);
}

type KindCache = HashMap<String, HashMap<String, Instance>>;

/// Default registry: kind constructors plus a read-cache keyed by kind and id.
#[derive(Default)]
pub struct MemoryRegistry {
    kinds: Vec<Arc<dyn ModelKind>>,
    cache: RwLock<KindCache>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind. A later registration with the same name replaces it.
    pub fn register(mut self, kind: impl ModelKind + 'static) -> Self {
        self.kinds.retain(|k| k.name() != kind.name());
        self.kinds.push(Arc::new(kind));
        self
    }

    fn kind(&self, name: &str) -> Result<&Arc<dyn ModelKind>, DaoError> {
        self.kinds
            .iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| DaoError::UnknownKind(name.to_string()))
    }

    pub fn cached_len(&self) -> usize {
        self.read_cache().values().map(HashMap::len).sum()
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, KindCache> {
        self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, KindCache> {
        self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ModelRegistry for MemoryRegistry {
    fn kinds(&self) -> Vec<String> {
        self.kinds.iter().map(|k| k.name().to_string()).collect()
    }

    fn construct(&self, kind: &str, data: Record) -> Result<Instance, DaoError> {
        self.kind(kind)?.construct(data)
    }

    fn remember(&self, kind: &str, instance: Instance) {
        self.write_cache()
            .entry(kind.to_string())
            .or_default()
            .insert(instance.id().to_string(), instance);
    }

    fn cached(&self, kind: &str, id: &str) -> Option<Instance> {
        self.read_cache().get(kind)?.get(id).cloned()
    }

    fn forget(&self, kind: &str, id: &str) -> Option<Instance> {
        self.write_cache().get_mut(kind)?.remove(id)
    }

    fn clear(&self) {
        self.write_cache().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentKind, Model};
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn registry() -> MemoryRegistry {
        MemoryRegistry::new()
            .register(DocumentKind::new("Item"))
            .register(DocumentKind::new("User"))
    }

    #[test]
    fn kinds_keep_registration_order_without_duplicates() {
        let reg = registry().register(DocumentKind::new("Item"));
        assert_eq!(reg.kinds(), vec!["User".to_string(), "Item".to_string()]);
    }

    #[test]
    fn create_assigns_id_only_when_missing() {
        let reg = registry();
        let assigned = reg.create("Item", record(json!({"name": "a"}))).unwrap();
        assert_eq!(assigned.id().len(), 32);

        let empty = reg.create("Item", record(json!({"id": "", "name": "a"}))).unwrap();
        assert!(!empty.id().is_empty());

        let supplied = reg.create("Item", record(json!({"id": "x1"}))).unwrap();
        assert_eq!(supplied.id(), "x1");
    }

    #[test]
    fn non_string_id_is_rejected_not_replaced() {
        let reg = registry();
        for id in [json!(7), json!(true), json!(["x"]), json!({"v": 1})] {
            let err = reg
                .create("Item", record(json!({"id": id, "name": "a"})))
                .unwrap_err();
            assert!(matches!(err, DaoError::InvalidModel(_)), "id {id}: {err}");
        }

        let null = reg.create("Item", record(json!({"id": null}))).unwrap();
        assert_eq!(null.id().len(), 32);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = registry().create("Nope", Record::new()).unwrap_err();
        assert!(matches!(err, DaoError::UnknownKind(k) if k == "Nope"));
    }

    #[test]
    fn update_merges_and_pins_id() {
        let reg = registry();
        let current = reg
            .create("Item", record(json!({"id": "x1", "name": "a", "n": 1})))
            .unwrap();
        let updated = reg
            .update("Item", &current, record(json!({"id": "other", "name": "b"})))
            .unwrap();
        assert_eq!(
            Value::Object(updated.to_record()),
            json!({"id": "x1", "name": "b", "n": 1})
        );
    }

    #[test]
    fn cache_bookkeeping() {
        let reg = registry();
        let item = reg.create("Item", record(json!({"id": "x1"}))).unwrap();
        assert!(reg.cached("Item", "x1").is_none());

        reg.remember("Item", item);
        assert!(reg.cached("Item", "x1").is_some());
        assert!(reg.cached("User", "x1").is_none());
        assert_eq!(reg.cached_len(), 1);

        assert_eq!(reg.forget("Item", "x1").map(|i| i.id().to_string()), Some("x1".into()));
        assert!(reg.forget("Item", "x1").is_none());

        reg.remember("User", reg.create("User", Record::new()).unwrap());
        reg.clear();
        assert_eq!(reg.cached_len(), 0);
    }
}
