//! Seams between the binder and whatever renders the form.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Mutex, MutexGuard},
};

use crate::model::FieldId;

/// Readable and writable form field values, keyed by element id.
pub trait FormFields: Send + Sync + Debug {
    fn value(&self, id: &FieldId) -> Option<String>;

    /// Apply all writes as one unit; no reader observes a partial update.
    fn set_values(&self, values: &[(&FieldId, String)]);
}

/// Blocking, user-visible warning.
pub trait Alert: Send + Sync + Debug {
    fn warn(&self, message: &str);
}

/// Form state held in memory.
#[derive(Debug, Default)]
pub struct InMemoryForm {
    fields: Mutex<HashMap<FieldId, String>>,
}

impl InMemoryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&self, id: &FieldId, value: impl Into<String>) {
        self.fields().insert(id.clone(), value.into());
    }

    /// Copy of every field, for rendering.
    pub fn snapshot(&self) -> HashMap<FieldId, String> {
        self.fields().clone()
    }

    fn fields(&self) -> MutexGuard<'_, HashMap<FieldId, String>> {
        // A panic while holding the lock cannot leave a half-written map.
        self.fields.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FormFields for InMemoryForm {
    fn value(&self, id: &FieldId) -> Option<String> {
        self.fields().get(id).cloned()
    }

    fn set_values(&self, values: &[(&FieldId, String)]) {
        let mut fields = self.fields();
        for (id, value) in values {
            fields.insert((*id).clone(), value.clone());
        }
    }
}
