//! Column-oriented table with deferred per-column type inference.
//!
//! A [`DataSet`] is built row by row while a reply block is open. Each token
//! is opportunistically coerced at insertion, but the column type only
//! becomes definitive when [`DataSet::index_field_kinds`] runs, once per
//! finished block. After indexing every cell of a column holds the same
//! [`Value`] variant.

use crate::error::ClimSimError;
use crate::types::enums::Month;
use crate::types::month_map::MonthMap;
use std::cmp::Ordering;

/// The inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Integer,
    Real,
    Text,
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Opportunistic coercion of a wire token. A token with a decimal point
    /// may be a real, a dot-free token may be an integer; anything else
    /// stays text. Dot-free numerics are never promoted to real here, only
    /// at indexing time.
    pub fn coerce(token: &str) -> Value {
        if token.contains('.') {
            match token.parse::<f64>() {
                Ok(v) => Value::Real(v),
                Err(_) => Value::Text(token.to_string()),
            }
        } else {
            match token.parse::<i64>() {
                Ok(v) => Value::Int(v),
                Err(_) => Value::Text(token.to_string()),
            }
        }
    }

    pub fn kind(&self) -> DataKind {
        match self {
            Value::Int(_) => DataKind::Integer,
            Value::Real(_) => DataKind::Real,
            Value::Text(_) => DataKind::Text,
        }
    }

    /// Numeric view, accepting both integer and real cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn as_text(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Real(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Cell equality: integers and text by identity, reals with an absolute
    /// tolerance of 1e-8. Values of different kinds never compare equal.
    pub fn approx_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => (a - b).abs() <= 1e-8,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }

    fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }
}

/// One row of a [`DataSet`]: a fixed-length ordered list of cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub values: Vec<Value>,
}

impl Observation {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Lexicographic comparison over a configurable subset of column
    /// positions. Cells that cannot be compared (mixed kinds, NaN) count as
    /// equal so the scan moves on to the next position.
    pub fn compare_by(&self, other: &Observation, positions: &[usize]) -> Ordering {
        for &p in positions {
            let ordering = match (self.values.get(p), other.values.get(p)) {
                (Some(a), Some(b)) => a.partial_cmp_value(b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    pub fn approx_eq(&self, other: &Observation) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.approx_eq(b))
    }
}

/// A typed table: ordered unique field names, one inferred [`DataKind`] per
/// column and ordered rows. Field kinds stay empty until
/// [`index_field_kinds`](DataSet::index_field_kinds) runs; rows added after
/// indexing leave the kinds stale until the next indexing pass.
#[derive(Debug, Clone)]
pub struct DataSet {
    field_names: Vec<String>,
    field_kinds: Vec<DataKind>,
    observations: Vec<Observation>,
}

impl DataSet {
    /// Create an empty table. Duplicate field names get a numeric suffix so
    /// names stay unique (`DD`, `DD0`, `DD1`, ...).
    pub fn new<S: AsRef<str>>(field_names: impl IntoIterator<Item = S>) -> Self {
        let mut ds = Self {
            field_names: Vec::new(),
            field_kinds: Vec::new(),
            observations: Vec::new(),
        };
        for name in field_names {
            ds.add_field_name(name.as_ref());
        }
        ds
    }

    fn add_field_name(&mut self, original: &str) {
        let mut name = original.to_string();
        let mut index = 0;
        while self.field_names.iter().any(|n| n == &name) {
            name = format!("{original}{index}");
            index += 1;
        }
        self.field_names.push(name);
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Per-column kinds; empty until the table has been indexed.
    pub fn field_kinds(&self) -> &[DataKind] {
        &self.field_kinds
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == name)
    }

    pub fn n_observations(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn value_at(&self, row: usize, column: usize) -> Option<&Value> {
        self.observations.get(row)?.values.get(column)
    }

    /// All values of one column, in row order.
    pub fn field_values(&self, column: usize) -> Vec<&Value> {
        self.observations
            .iter()
            .filter_map(|o| o.values.get(column))
            .collect()
    }

    /// Append a row of already-typed values.
    pub fn add_observation(&mut self, values: Vec<Value>) -> Result<(), ClimSimError> {
        if values.len() != self.field_names.len() {
            return Err(ClimSimError::RowWidth {
                expected: self.field_names.len(),
                got: values.len(),
            });
        }
        self.observations.push(Observation::new(values));
        Ok(())
    }

    /// Append a row of wire tokens, coercing each one.
    pub fn add_tokens<'a>(
        &mut self,
        tokens: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ClimSimError> {
        let values = tokens.into_iter().map(Value::coerce).collect();
        self.add_observation(values)
    }

    /// Finalize the column types. For each column: all-integer cells make an
    /// Integer column; a mix of integers and reals makes a Real column with
    /// the integer cells promoted; anything else makes a Text column with
    /// numeric cells stringified.
    pub fn index_field_kinds(&mut self) {
        self.field_kinds.clear();
        for column in 0..self.field_names.len() {
            let kind = self.infer_column_kind(column);
            self.field_kinds.push(kind);
            match kind {
                DataKind::Integer => {}
                DataKind::Real => {
                    for obs in &mut self.observations {
                        if let Some(Value::Int(v)) = obs.values.get(column) {
                            obs.values[column] = Value::Real(*v as f64);
                        }
                    }
                }
                DataKind::Text => {
                    for obs in &mut self.observations {
                        if let Some(value) = obs.values.get(column) {
                            if value.kind() != DataKind::Text {
                                obs.values[column] = Value::Text(value.as_text());
                            }
                        }
                    }
                }
            }
        }
    }

    fn infer_column_kind(&self, column: usize) -> DataKind {
        let mut all_int = true;
        let mut all_numeric = true;
        for obs in &self.observations {
            match obs.values.get(column).map(Value::kind) {
                Some(DataKind::Integer) => {}
                Some(DataKind::Real) => all_int = false,
                _ => {
                    all_int = false;
                    all_numeric = false;
                    break;
                }
            }
        }
        if all_int {
            DataKind::Integer
        } else if all_numeric {
            DataKind::Real
        } else {
            DataKind::Text
        }
    }

    /// Drop a column, cells included.
    pub(crate) fn remove_field(&mut self, column: usize) {
        if column >= self.field_names.len() {
            return;
        }
        self.field_names.remove(column);
        if column < self.field_kinds.len() {
            self.field_kinds.remove(column);
        }
        for obs in &mut self.observations {
            if column < obs.values.len() {
                obs.values.remove(column);
            }
        }
    }

    /// Collapse a 12-row monthly table into a single aggregated row over the
    /// given months. See [`MonthMap`] for the additive-vs-mean semantics.
    pub fn month_aggregate(&self, months: &[Month]) -> Result<DataSet, ClimSimError> {
        MonthMap::from_dataset(self)?.mean_for_months(months)
    }

    /// Structural equality for validation: same names, same kinds, same rows
    /// with reals compared under an absolute tolerance of 1e-8.
    pub fn approx_eq(&self, other: &DataSet) -> bool {
        self.field_names == other.field_names
            && self.field_kinds == other.field_kinds
            && self.observations.len() == other.observations.len()
            && self
                .observations
                .iter()
                .zip(&other.observations)
                .all(|(a, b)| a.approx_eq(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(fields: &[&str], rows: &[&[&str]]) -> DataSet {
        let mut ds = DataSet::new(fields.iter().copied());
        for row in rows {
            ds.add_tokens(row.iter().copied()).unwrap();
        }
        ds
    }

    #[test]
    fn coercion_at_insertion() {
        assert_eq!(Value::coerce("42"), Value::Int(42));
        assert_eq!(Value::coerce("1.5"), Value::Real(1.5));
        // No dot means no promotion to real at this stage.
        assert_eq!(Value::coerce("NaN"), Value::Text("NaN".to_string()));
        assert_eq!(Value::coerce("abc"), Value::Text("abc".to_string()));
        assert_eq!(Value::coerce("1.x"), Value::Text("1.x".to_string()));
    }

    #[test]
    fn duplicate_field_names_get_suffixed() {
        let ds = DataSet::new(["DD", "DD", "DD"]);
        assert_eq!(ds.field_names(), ["DD", "DD0", "DD1"]);
    }

    #[test]
    fn integer_column_indexes_as_integer() {
        let mut ds = dataset(&["a"], &[&["1"], &["2"], &["3"]]);
        ds.index_field_kinds();
        assert_eq!(ds.field_kinds(), [DataKind::Integer]);
        assert_eq!(ds.value_at(0, 0), Some(&Value::Int(1)));
    }

    #[test]
    fn mixed_numeric_column_indexes_as_real_and_promotes_ints() {
        let mut ds = dataset(&["a"], &[&["1"], &["2.5"], &["3"]]);
        ds.index_field_kinds();
        assert_eq!(ds.field_kinds(), [DataKind::Real]);
        assert_eq!(ds.value_at(0, 0), Some(&Value::Real(1.0)));
        assert_eq!(ds.value_at(2, 0), Some(&Value::Real(3.0)));
    }

    #[test]
    fn text_column_stringifies_numeric_cells() {
        let mut ds = dataset(&["a"], &[&["1"], &["2.5"], &["x"]]);
        ds.index_field_kinds();
        assert_eq!(ds.field_kinds(), [DataKind::Text]);
        assert_eq!(ds.value_at(0, 0), Some(&Value::Text("1".to_string())));
        assert_eq!(ds.value_at(1, 0), Some(&Value::Text("2.5".to_string())));
    }

    #[test]
    fn row_width_is_enforced() {
        let mut ds = DataSet::new(["a", "b"]);
        let err = ds.add_tokens(["1"]).unwrap_err();
        assert!(matches!(
            err,
            ClimSimError::RowWidth {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn approx_eq_tolerates_small_real_differences() {
        let mut a = dataset(&["v"], &[&["1.5"]]);
        let mut b = dataset(&["v"], &[&["1.5"]]);
        a.index_field_kinds();
        b.index_field_kinds();
        assert!(a.approx_eq(&b));
        b.observations[0].values[0] = Value::Real(1.5 + 5e-9);
        assert!(a.approx_eq(&b));
        b.observations[0].values[0] = Value::Real(1.5 + 1e-6);
        assert!(!a.approx_eq(&b));
    }

    #[test]
    fn observations_compare_by_selected_positions() {
        let a = Observation::new(vec![Value::Int(1), Value::Real(2.0)]);
        let b = Observation::new(vec![Value::Int(1), Value::Real(3.0)]);
        assert_eq!(a.compare_by(&b, &[0]), Ordering::Equal);
        assert_eq!(a.compare_by(&b, &[0, 1]), Ordering::Less);
        assert_eq!(b.compare_by(&a, &[1]), Ordering::Greater);
    }

    #[test]
    fn remove_field_drops_cells() {
        let mut ds = dataset(&["a", "b"], &[&["1", "2"], &["3", "4"]]);
        ds.remove_field(0);
        assert_eq!(ds.field_names(), ["b"]);
        assert_eq!(ds.value_at(1, 0), Some(&Value::Int(4)));
    }
}
