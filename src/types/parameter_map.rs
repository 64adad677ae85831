//! Ordered key/value container with the compact `key:value*key:value`
//! serialization used to embed model parameters into a query string.

use std::fmt;

/// A parameter value: numbers or text only, by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Int(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Real(v) => write!(f, "{v}"),
            ParameterValue::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::Int(v as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Real(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::Text(v)
    }
}

/// Ordered model parameters. Serializes as `k1:v1*k2:v2`; an empty map
/// serializes to the literal `null`, the placeholder for "no override" in
/// composite multi-model queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterMap {
    entries: Vec<(String, ParameterValue)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. Only numbers and strings are representable as
    /// values, which the [`ParameterValue`] conversions enforce.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse one `*`-joined reply line back into a map. Tokens without a
    /// `:` map to an empty value.
    pub(crate) fn parse(line: &str) -> ParameterMap {
        let mut map = ParameterMap::new();
        if line.trim().is_empty() || line.trim() == "null" {
            return map;
        }
        for token in line.split('*') {
            match token.split_once(':') {
                Some((key, value)) => map.add(key, value),
                None => map.add(token, ""),
            }
        }
        map
    }
}

impl fmt::Display for ParameterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "null");
        }
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write!(f, "{}:{}", key.trim(), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_pairs_in_insertion_order() {
        let mut map = ParameterMap::new();
        map.add("LowerThreshold", 5.5);
        map.add("Cycle", 2);
        map.add("Label", "base");
        assert_eq!(map.to_string(), "LowerThreshold:5.5*Cycle:2*Label:base");
    }

    #[test]
    fn empty_map_serializes_to_null() {
        assert_eq!(ParameterMap::new().to_string(), "null");
    }

    #[test]
    fn keys_and_values_are_trimmed() {
        let mut map = ParameterMap::new();
        map.add(" a ", " b ");
        assert_eq!(map.to_string(), "a:b");
    }

    #[test]
    fn round_trip_through_wire_form() {
        let mut map = ParameterMap::new();
        map.add("LowerThreshold", "5.5");
        map.add("Cycle", "2");
        let parsed = ParameterMap::parse(&map.to_string());
        assert_eq!(parsed, map);
    }

    #[test]
    fn token_without_colon_maps_to_empty_value() {
        let parsed = ParameterMap::parse("a:1*b");
        assert_eq!(parsed.get("a"), Some(&ParameterValue::Text("1".into())));
        assert_eq!(parsed.get("b"), Some(&ParameterValue::Text(String::new())));
    }
}
