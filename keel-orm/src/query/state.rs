use std::collections::BTreeMap;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Scalar(Value),
    /// Matches any of the values; only meaningful as a filter.
    List(Vec<Value>),
}

/// Property values keyed by property (or column) name.
///
/// Used as the filter of a query and as the payload of an insert or update.
/// Keys are kept sorted so rendered SQL is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State(BTreeMap<String, StateValue>);

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Filter on any of `values`.
    pub fn with_any<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.0.insert(
            key.into(),
            StateValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), StateValue::Scalar(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.0.get(key)
    }

    /// The scalar under `key`, if any.
    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            Some(StateValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for State {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| (k, StateValue::Scalar(v)))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for State {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut state = State::new();
        for (k, v) in iter {
            state.insert(k, v);
        }
        state
    }
}
