use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A value held in a dataset's property store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Floats(Vec<f64>),
    Text(String),
    Flag(bool),
}

/// String-keyed properties attached to a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyStore {
    entries: HashMap<String, PropertyValue>,
}

impl PropertyStore {
    pub fn new() -> Self {
        PropertyStore::default()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    pub fn get_floats(&self, key: &str) -> Option<&[f64]> {
        match self.entries.get(key) {
            Some(PropertyValue::Floats(values)) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: PropertyValue) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn set_floats(&mut self, key: &str, values: Vec<f64>) {
        self.set(key, PropertyValue::Floats(values));
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}
