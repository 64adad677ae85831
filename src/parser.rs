//! Line-classifying state machine that demultiplexes one flat reply into
//! per-model, per-location typed tables.
//!
//! The wire format is a greppable text stream: a model name on its own line
//! opens a named section, a header line (starting with the endpoint's header
//! token, `month` or `rep`) opens a location block whose comma-split tokens
//! are the field names, and every other line is a data row of the open
//! block. A stray data row inside a named section marks that model failed
//! without aborting the parse; the machine resynchronizes on the next model
//! name or header line.

use crate::error::ClimSimError;
use crate::types::dataset::DataSet;
use crate::types::location::Location;
use crate::types::outcome::{LocationMap, ModelMap, ModelOutcome};

const FIELD_SEPARATOR: char = ',';

/// Shape of one parsed reply: location-keyed for single-model calls,
/// model-then-location-keyed for multi-model calls.
#[derive(Debug)]
pub(crate) enum FetchResult {
    SingleModel(LocationMap),
    MultiModel(ModelMap),
}

/// One named model section being accumulated.
struct Section {
    name: String,
    entries: LocationMap,
    // Last in-band failure line seen while no block was open.
    error: Option<String>,
}

impl Section {
    fn into_outcome(self) -> (String, ModelOutcome) {
        match self.error {
            Some(message) => (self.name, ModelOutcome::Failed(message)),
            None => (self.name, ModelOutcome::Data(self.entries)),
        }
    }
}

/// Parse one reply. `header_token` marks a new location block (`month` for
/// normals, `rep` for weather generation); `locations` is the caller's list,
/// used as a positional lookup table; `known_models` is the server's model
/// catalog, used to recognize section lines.
pub(crate) fn read_reply(
    lines: &[String],
    header_token: &str,
    locations: &[Location],
    known_models: &[String],
) -> Result<FetchResult, ClimSimError> {
    let header_token = header_token.to_lowercase();

    let mut sections: Vec<Section> = Vec::new();
    let mut unnamed: LocationMap = Vec::new();
    let mut open_block: Option<(Location, DataSet)> = None;
    let mut location_counter = 0usize;

    // Finalize the open block into the right map.
    let close_block = |block: Option<(Location, DataSet)>,
                       sections: &mut Vec<Section>,
                       unnamed: &mut LocationMap| {
        if let Some((location, mut dataset)) = block {
            dataset.index_field_kinds();
            match sections.last_mut() {
                Some(section) => section.entries.push((location, dataset)),
                None => unnamed.push((location, dataset)),
            }
        }
    };

    for line in lines {
        let lower = line.to_lowercase();
        if lower.starts_with("error") {
            return Err(ClimSimError::Server(line.clone()));
        } else if known_models.iter().any(|m| m == line.trim()) {
            close_block(open_block.take(), &mut sections, &mut unnamed);
            sections.push(Section {
                name: line.trim().to_string(),
                entries: Vec::new(),
                error: None,
            });
            location_counter = 0;
        } else if lower.starts_with(&header_token) {
            close_block(open_block.take(), &mut sections, &mut unnamed);
            let location = *locations.get(location_counter).ok_or_else(|| {
                ClimSimError::UnexpectedReply(format!(
                    "reply contains more than the {} requested location blocks",
                    locations.len()
                ))
            })?;
            location_counter += 1;
            open_block = Some((location, DataSet::new(line.split(FIELD_SEPARATOR))));
        } else {
            match open_block.as_mut() {
                Some((_, dataset)) => dataset.add_tokens(line.split(FIELD_SEPARATOR))?,
                None => match sections.last_mut() {
                    // Per-model failure, not a whole-call failure.
                    Some(section) => section.error = Some(line.clone()),
                    None => {
                        return Err(ClimSimError::UnexpectedReply(lines.join("\n")));
                    }
                },
            }
        }
    }
    close_block(open_block.take(), &mut sections, &mut unnamed);

    if sections.is_empty() {
        Ok(FetchResult::SingleModel(unnamed))
    } else {
        Ok(FetchResult::MultiModel(
            sections.into_iter().map(Section::into_outcome).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::{DataKind, Value};

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn two_locations() -> Vec<Location> {
        vec![
            Location::new(46.87, -71.25, 114.0),
            Location::new(48.45, -68.52, 52.0),
        ]
    }

    #[test]
    fn normals_reply_yields_one_dataset_per_location() {
        let reply = lines(&[
            "Month,TMIN_MN,TMAX_MN,PRCP_TT",
            "1,-17.2,-7.5,88.3",
            "2,-15.6,-5.5,70.2",
            "Month,TMIN_MN,TMAX_MN,PRCP_TT",
            "1,-14.1,-5.2,95.0",
        ]);
        let locations = two_locations();
        let result = read_reply(&reply, "month", &locations, &[]).unwrap();
        let FetchResult::SingleModel(map) = result else {
            panic!("expected a single-model result");
        };
        assert_eq!(map.len(), 2);
        assert!(map[0].0.approx_eq(&locations[0]));
        assert!(map[1].0.approx_eq(&locations[1]));
        assert_eq!(map[0].1.n_observations(), 2);
        assert_eq!(map[1].1.n_observations(), 1);
        // Blocks are indexed when closed.
        assert_eq!(
            map[0].1.field_kinds(),
            [
                DataKind::Integer,
                DataKind::Real,
                DataKind::Real,
                DataKind::Real
            ]
        );
    }

    #[test]
    fn error_line_aborts_the_whole_parse() {
        let reply = lines(&["Error: Model X does not exist"]);
        let err = read_reply(&reply, "month", &two_locations(), &[]).unwrap_err();
        match err {
            ClimSimError::Server(message) => {
                assert_eq!(message, "Error: Model X does not exist")
            }
            other => panic!("expected a server error, got {other:?}"),
        }
    }

    #[test]
    fn multi_model_reply_splits_into_named_sections() {
        let models = vec!["DegreeDay_Annual".to_string(), "Spruce_Budworm".to_string()];
        let reply = lines(&[
            "DegreeDay_Annual",
            "rep,year,DD",
            "1,2000,1250.5",
            "1,2001,1301.2",
            "Spruce_Budworm",
            "rep,year,index",
            "1,2000,0.75",
        ]);
        let locations = vec![Location::new(46.87, -71.25, 114.0)];
        let result = read_reply(&reply, "rep", &locations, &models).unwrap();
        let FetchResult::MultiModel(map) = result else {
            panic!("expected a multi-model result");
        };
        assert_eq!(map.len(), 2);
        assert_eq!(map[0].0, "DegreeDay_Annual");
        let dd = map[0].1.data().unwrap();
        assert_eq!(dd.len(), 1);
        assert_eq!(dd[0].1.field_names(), ["rep", "year", "DD"]);
        assert_eq!(dd[0].1.n_observations(), 2);
        assert_eq!(map[1].0, "Spruce_Budworm");
        assert_eq!(map[1].1.data().unwrap()[0].1.n_observations(), 1);
    }

    #[test]
    fn location_counter_resets_per_model_section() {
        let models = vec!["DegreeDay_Annual".to_string(), "Spruce_Budworm".to_string()];
        let reply = lines(&[
            "DegreeDay_Annual",
            "rep,DD",
            "1,100.5",
            "rep,DD",
            "1,200.5",
            "Spruce_Budworm",
            "rep,index",
            "1,0.5",
            "rep,index",
            "1,0.7",
        ]);
        let locations = two_locations();
        let FetchResult::MultiModel(map) =
            read_reply(&reply, "rep", &locations, &models).unwrap()
        else {
            panic!("expected a multi-model result");
        };
        for (_, outcome) in &map {
            let entries = outcome.data().unwrap();
            assert_eq!(entries.len(), 2);
            assert!(entries[0].0.approx_eq(&locations[0]));
            assert!(entries[1].0.approx_eq(&locations[1]));
        }
    }

    #[test]
    fn stray_row_inside_a_section_marks_that_model_failed() {
        let models = vec!["Broken_Model".to_string(), "DegreeDay_Annual".to_string()];
        let reply = lines(&[
            "Broken_Model",
            "the model crashed on the server",
            "DegreeDay_Annual",
            "rep,DD",
            "1,100.5",
        ]);
        let locations = vec![Location::new(46.87, -71.25, 114.0)];
        let FetchResult::MultiModel(map) =
            read_reply(&reply, "rep", &locations, &models).unwrap()
        else {
            panic!("expected a multi-model result");
        };
        assert_eq!(
            map[0].1.error_message(),
            Some("the model crashed on the server")
        );
        assert!(map[1].1.data().is_some());
    }

    #[test]
    fn stray_row_outside_any_section_is_a_client_error() {
        let reply = lines(&["what is this", "even"]);
        let err = read_reply(&reply, "month", &two_locations(), &[]).unwrap_err();
        match err {
            ClimSimError::UnexpectedReply(raw) => assert!(raw.contains("what is this")),
            other => panic!("expected an unexpected-reply error, got {other:?}"),
        }
    }

    #[test]
    fn more_blocks_than_locations_is_a_client_error() {
        let reply = lines(&["Month,TMIN_MN", "1,0.5", "Month,TMIN_MN", "1,0.5"]);
        let locations = vec![Location::new(46.87, -71.25, 114.0)];
        let err = read_reply(&reply, "month", &locations, &[]).unwrap_err();
        assert!(matches!(err, ClimSimError::UnexpectedReply(_)));
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        let reply = lines(&["MONTH,TMIN_MN", "1,0.5"]);
        let locations = vec![Location::new(46.87, -71.25, 114.0)];
        let FetchResult::SingleModel(map) =
            read_reply(&reply, "month", &locations, &[]).unwrap()
        else {
            panic!("expected a single-model result");
        };
        // Field names keep the server's spelling.
        assert_eq!(map[0].1.field_names(), ["MONTH", "TMIN_MN"]);
        assert_eq!(map[0].1.value_at(0, 1), Some(&Value::Real(0.5)));
    }
}
