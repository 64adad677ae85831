//! Blocking Rust client for the ClimSim Web API.
//!
//! The ClimSim server generates meteorological time series for arbitrary
//! geographic locations and runs climate-driven models over them. This crate
//! wraps the line-oriented HTTP interface behind typed calls:
//!
//! - [`ClimSim::normals`] and its [`ClimSim::monthly_normals`] /
//!   [`ClimSim::annual_normals`] shorthands fetch climate normals per
//!   location, optionally averaged over a set of months.
//! - [`ClimSim::generate_weather`] generates daily weather for a span of
//!   years and applies one or several server-side models to it.
//! - [`ClimSim::model_list`], [`ClimSim::model_help`] and
//!   [`ClimSim::model_default_parameters`] expose the model catalog.
//!
//! Replies come back as [`DataSet`] tables whose column types are inferred
//! from the text the server sends. Requests covering more locations than the
//! server accepts at once are transparently split and merged.
//!
//! ```no_run
//! use climsim::{ClimSim, Location, Period};
//!
//! # fn run() -> Result<(), climsim::ClimSimError> {
//! let client = ClimSim::new();
//! let normals = client.annual_normals(
//!     Period::Normals1981_2010,
//!     &[Location::new(46.87, -71.25, 114.0)],
//!     None,
//!     None,
//! )?;
//! for (location, dataset) in &normals {
//!     println!("{location}: {:?}", dataset.field_names());
//! }
//! # Ok(())
//! # }
//! ```

mod climsim;
mod error;
mod parser;
mod settings;
mod transport;
pub mod types;

pub use climsim::ClimSim;
pub use error::ClimSimError;
pub use settings::ClientSettings;
pub use transport::{HttpTransport, Transport};
pub use types::dataset::{DataKind, DataSet, Observation, Value};
pub use types::enums::{ClimateModel, Month, Period, Rcp, Variable};
pub use types::location::Location;
pub use types::outcome::{LocationMap, ModelMap, ModelOutcome};
pub use types::parameter_map::{ParameterMap, ParameterValue};
