use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::entity::Entity;
use crate::error::DataError;
use crate::query::State;
use crate::value::{FromValue, Value};

/// One hydrated row, keyed by property name.
///
/// Values are application-side: type transformers have already run. Fields
/// declared with `serialize = false` are readable but left out of
/// [`ResultEntity::to_map`] and of serde serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultEntity {
    class: String,
    values: BTreeMap<String, Value>,
    hidden: BTreeSet<String>,
}

impl ResultEntity {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            ..Self::default()
        }
    }

    pub fn from_map(class: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        Self {
            class: class.into(),
            values,
            hidden: BTreeSet::new(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn insert(&mut self, property: impl Into<String>, value: Value) -> &mut Self {
        self.values.insert(property.into(), value);
        self
    }

    pub fn hide(&mut self, property: impl Into<String>) -> &mut Self {
        self.hidden.insert(property.into());
        self
    }

    pub fn is_hidden(&self, property: &str) -> bool {
        self.hidden.contains(property)
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    /// Convert a property to a Rust type. A missing property reads as null,
    /// so `Option<T>` targets accept it.
    pub fn get_as<T: FromValue>(&self, property: &str) -> Result<T, DataError> {
        let value = self.values.get(property).cloned().unwrap_or(Value::Null);
        T::from_value(value).map_err(|err| DataError::Type(err.for_field(property)))
    }

    /// Every value, hidden ones included.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Serializable values only.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.values
            .iter()
            .filter(|(k, _)| !self.hidden.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.to_map()
                .into_iter()
                .map(|(k, v)| (k, v.to_json()))
                .collect(),
        )
    }

    /// The values as a state, ready to be persisted again.
    pub fn to_state(&self) -> State {
        State::from(self.values.clone())
    }

    pub fn into_typed<T: Entity>(&self) -> Result<T, DataError> {
        T::from_result(self)
    }
}

impl Serialize for ResultEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let visible = self.to_map();
        let mut map = serializer.serialize_map(Some(visible.len()))?;
        for (key, value) in &visible {
            map.serialize_entry(key, &value.to_json())?;
        }
        map.end()
    }
}

/// Rows returned by a find, with pagination metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultCollection {
    items: Vec<ResultEntity>,
    /// Rows matching the filter, ignoring limit and offset.
    pub total_count: u64,
    /// Primary key of the first item of this page.
    pub first_id: Option<serde_json::Value>,
    pub last_id: Option<serde_json::Value>,
    pub page_size: usize,
}

impl ResultCollection {
    /// Wrap `items`, reading first and last ids from `primary_property`.
    pub fn new(items: Vec<ResultEntity>, total_count: u64, primary_property: &str) -> Self {
        let id_of = |item: &ResultEntity| item.get(primary_property).map(Value::to_json);
        Self {
            first_id: items.first().and_then(id_of),
            last_id: items.last().and_then(id_of),
            page_size: items.len(),
            total_count,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&ResultEntity> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultEntity> {
        self.items.iter()
    }

    pub fn items(&self) -> &[ResultEntity] {
        &self.items
    }

    pub fn into_typed<T: Entity>(&self) -> Result<Vec<T>, DataError> {
        self.items.iter().map(T::from_result).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl IntoIterator for ResultCollection {
    type Item = ResultEntity;
    type IntoIter = std::vec::IntoIter<ResultEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = &'a ResultEntity;
    type IntoIter = std::slice::Iter<'a, ResultEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
