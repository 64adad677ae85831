//! Result shapes for fetch operations.

use crate::types::dataset::DataSet;
use crate::types::location::Location;

/// One dataset per queried location, in the caller's location order. The
/// pairing is positional: the reply carries no location identity of its own.
pub type LocationMap = Vec<(Location, DataSet)>;

/// Per-model outcome inside a multi-model reply. A failed model does not
/// abort the call; its slot holds the server's error line instead of data.
#[derive(Debug, Clone)]
pub enum ModelOutcome {
    Data(LocationMap),
    Failed(String),
}

impl ModelOutcome {
    pub fn data(&self) -> Option<&LocationMap> {
        match self {
            ModelOutcome::Data(map) => Some(map),
            ModelOutcome::Failed(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ModelOutcome::Data(_) => None,
            ModelOutcome::Failed(message) => Some(message),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ModelOutcome::Failed(_))
    }
}

/// Ordered model name -> outcome mapping returned by weather generation.
pub type ModelMap = Vec<(String, ModelOutcome)>;
