//! Data types crossing the client's API surface.

pub mod dataset;
pub mod enums;
pub mod location;
pub(crate) mod month_map;
pub mod outcome;
pub mod parameter_map;
