//! Named values handed to leaf handlers.
//!
//! Every node sits in exactly one slot under its parent, and that slot may carry
//! a small ordered set of parameters. The same handler can then be reused under
//! different parents with different arguments (e.g. one `MoveTo` action with a
//! different `speed` per branch).

use core::fmt;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterValue {
    Int(i64),
    Bool(bool),
    Float(f64),
    String(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Bool(v) => write!(f, "{v}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::String(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(value.into())
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_owned())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

/// A named parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

/// Ordered, read-only lookup of parameters visible to one leaf.
///
/// Insertion order is preserved; names are unique (inserting an existing name
/// replaces its value in place).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameters {
    entries: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter (builder pattern).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a parameter, returning the previous value if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|p| p.name == name) {
            Some(existing) => Some(core::mem::replace(&mut existing.value, value)),
            None => {
                self.entries.push(Parameter { name, value });
                None
            }
        }
    }

    /// Returns the value bound to `name`, or `None` when it is not bound.
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Float lookup. Integers are widened, other kinds yield `None`.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<ParameterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = Parameters::new();
        for (name, value) in iter {
            parameters.insert(name, value);
        }
        parameters
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", p.name, p.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_kind() {
        let params = Parameters::new()
            .with("speed", 2.5)
            .with("retries", 3)
            .with("sprint", true)
            .with("target", "player");

        assert_eq!(params.get_float("speed"), Some(2.5));
        assert_eq!(params.get_int("retries"), Some(3));
        assert_eq!(params.get_bool("sprint"), Some(true));
        assert_eq!(params.get_str("target"), Some("player"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.get_bool("speed"), None);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut params: Parameters = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(params.insert("a", 10), Some(ParameterValue::Int(1)));

        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(params.get_int("a"), Some(10));
        assert_eq!(params.to_string(), "a = 10, b = 2");
    }

    #[test]
    fn float_lookup_widens_ints() {
        let params = Parameters::new().with("range", 4);
        assert_eq!(params.get_float("range"), Some(4.0));
    }
}
