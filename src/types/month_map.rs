//! Monthly-to-period aggregation of climate normals.
//!
//! A normals table has one row per calendar month. Collapsing several months
//! into one figure is not a naive mean of monthly means: intensive variables
//! (temperatures) are weighted by the number of days in each month before
//! averaging, while additive variables (precipitation) are plain sums.

use crate::error::ClimSimError;
use crate::types::dataset::{DataSet, Value};
use crate::types::enums::{Month, Variable};

/// Intermediate month -> (variable -> value) table built from a 12-row
/// monthly dataset.
pub(crate) struct MonthMap {
    entries: Vec<(Month, Vec<(Variable, f64)>)>,
}

impl MonthMap {
    /// Build the map from a monthly dataset. The month is read from the
    /// protocol field `Month`; variable columns are matched by their wire
    /// field names.
    pub(crate) fn from_dataset(dataset: &DataSet) -> Result<MonthMap, ClimSimError> {
        let month_column = dataset
            .field_index("Month")
            .ok_or_else(|| ClimSimError::MissingField("Month".to_string()))?;

        let variable_columns: Vec<(Variable, usize)> = Variable::ALL
            .iter()
            .filter_map(|&v| {
                v.field_name()
                    .and_then(|name| dataset.field_index(name))
                    .map(|column| (v, column))
            })
            .collect();

        let mut entries = Vec::new();
        for (row, obs) in dataset.observations().iter().enumerate() {
            let month_value = obs
                .values
                .get(month_column)
                .and_then(Value::as_f64)
                .map(|v| v as i64);
            let month = month_value.and_then(Month::from_number).ok_or_else(|| {
                ClimSimError::UnexpectedReply(format!("row {row} has no valid month number"))
            })?;
            let mut values = Vec::new();
            for &(variable, column) in &variable_columns {
                if let Some(value) = obs.values.get(column).and_then(Value::as_f64) {
                    values.push((variable, value));
                }
            }
            entries.push((month, values));
        }
        Ok(MonthMap { entries })
    }

    fn value_for(&self, month: Month, variable: Variable) -> Option<f64> {
        let (_, values) = self.entries.iter().find(|(m, _)| *m == month)?;
        values.iter().find(|(v, _)| *v == variable).map(|(_, x)| *x)
    }

    fn contains(&self, month: Month) -> bool {
        self.entries.iter().any(|(m, _)| *m == month)
    }

    /// Aggregate the normals variables over an arbitrary subset of months.
    /// Additive variables accumulate raw sums; the others accumulate
    /// `value * days_in_month` and are divided by the total number of days
    /// spanned at the end. The result is a one-row dataset with the variable
    /// names as columns.
    pub(crate) fn mean_for_months(&self, months: &[Month]) -> Result<DataSet, ClimSimError> {
        let mut totals: Vec<(Variable, f64)> = Vec::new();
        let mut nb_days = 0u32;
        for &month in months {
            if !self.contains(month) {
                return Err(ClimSimError::MissingMonth(month));
            }
            for variable in Variable::NORMALS {
                let mut value = self
                    .value_for(month, variable)
                    .ok_or(ClimSimError::MissingVariable(variable.name()))?;
                if !variable.is_additive() {
                    value *= month.days() as f64;
                }
                match totals.iter_mut().find(|(v, _)| *v == variable) {
                    Some((_, total)) => *total += value,
                    None => totals.push((variable, value)),
                }
            }
            nb_days += month.days();
        }
        for (variable, total) in &mut totals {
            if !variable.is_additive() {
                *total /= nb_days as f64;
            }
        }

        let mut output = DataSet::new(totals.iter().map(|(v, _)| v.name()));
        output.add_observation(totals.iter().map(|(_, t)| Value::Real(*t)).collect())?;
        output.index_field_kinds();
        Ok(output)
    }
}
