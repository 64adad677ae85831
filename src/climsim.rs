//! Main entry point for the ClimSim Web API client.
//!
//! [`ClimSim`] issues parameterized GET requests for climate normals and
//! generated weather time series and converts the line-oriented replies into
//! typed [`DataSet`]s. Requests covering more locations than the
//! server-advertised batch capacity are split into sequential sub-requests
//! and merged back in the caller's location order.

use crate::error::ClimSimError;
use crate::parser::{read_reply, FetchResult};
use crate::settings::{Capabilities, ClientSettings};
use crate::transport::{HttpTransport, Transport};
use crate::types::dataset::DataSet;
use crate::types::enums::{ClimateModel, Month, Period, Rcp, Variable};
use crate::types::location::Location;
use crate::types::outcome::{LocationMap, ModelMap, ModelOutcome};
use crate::types::parameter_map::ParameterMap;
use bon::bon;
use log::{info, warn};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

const CLIENT_REVISION: u32 = 1;

/// Hard ceiling on the location count of a single call, independent of the
/// server-advertised batch capacity.
const MAX_LOCATIONS_PER_REQUEST: usize = 1000;

/// Literal percent-encoded space joining multi-valued query tokens.
const SPACE_TOKEN: &str = "%20";

const TEST_MODE_MARKER: &str = "cid=testclient";

const STATUS_ENDPOINT: &str = "ClimSimStatus";
const MODEL_LIST_ENDPOINT: &str = "ClimSimModelList";
const MODEL_HELP_ENDPOINT: &str = "ClimSimModelHelp";
const MODEL_DEFAULT_PARAMETERS_ENDPOINT: &str = "ClimSimModelDefaultParameters";
const NORMALS_ENDPOINT: &str = "ClimSimNormals";
const WEATHER_ENDPOINT: &str = "ClimSimWeather";

const NORMALS_HEADER_TOKEN: &str = "month";
const WEATHER_HEADER_TOKEN: &str = "rep";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The ClimSim Web API client.
///
/// All calls are blocking and sequential. The capability handshake runs once
/// per client, guarded so concurrent callers serialize on it; its snapshot
/// and the model catalog are cached for the client's lifetime.
///
/// ```no_run
/// use climsim::{ClimSim, Location, Month, Period};
///
/// # fn run() -> Result<(), climsim::ClimSimError> {
/// let client = ClimSim::new();
/// let normals = client
///     .normals()
///     .period(Period::Normals1981_2010)
///     .locations(&[Location::new(46.87, -71.25, 114.0)])
///     .average_over(Month::ALL.to_vec())
///     .call()?;
/// # Ok(())
/// # }
/// ```
pub struct ClimSim {
    transport: Box<dyn Transport>,
    settings: ClientSettings,
    capabilities: Mutex<Option<Capabilities>>,
    model_catalog: Mutex<Option<Vec<String>>>,
    request_seconds: Mutex<f64>,
}

impl Default for ClimSim {
    fn default() -> Self {
        Self::new()
    }
}

#[bon]
impl ClimSim {
    /// Client with default settings talking HTTP to the public server.
    pub fn new() -> Self {
        Self::with_settings(ClientSettings::default())
    }

    pub fn with_settings(settings: ClientSettings) -> Self {
        Self::with_transport(Box::new(HttpTransport::new()), settings)
    }

    /// Client over a caller-supplied transport, the seam the tests use.
    pub fn with_transport(transport: Box<dyn Transport>, settings: ClientSettings) -> Self {
        Self {
            transport,
            settings,
            capabilities: Mutex::new(None),
            model_catalog: Mutex::new(None),
            request_seconds: Mutex::new(0.0),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Reset the configuration to its initial values.
    pub fn reset_settings(&mut self) {
        self.settings = ClientSettings::default();
    }

    /// Enable the local connection (test setups).
    pub fn set_local_connection(&mut self, enabled: bool) {
        self.settings.local_connection = enabled;
    }

    pub fn set_test_mode(&mut self, enabled: bool) {
        self.settings.test_mode = enabled;
    }

    /// Force climate generation for past dailies instead of compiling them
    /// from observations.
    pub fn set_force_climate_generation(&mut self, enabled: bool) {
        self.settings.force_climate_generation = enabled;
    }

    /// Set the number of stations used for imputing the time series in
    /// space. Must be between 1 and 35.
    pub fn set_nb_nearest_neighbours(&mut self, n: u8) -> Result<(), ClimSimError> {
        if !(1..=35).contains(&n) {
            return Err(ClimSimError::InvalidArgument(
                "the number of nearest neighbours must be an integer between 1 and 35".to_string(),
            ));
        }
        self.settings.nb_nearest_neighbours = Some(n);
        Ok(())
    }

    /// Configured neighbour count, or the server default of 4.
    pub fn nb_nearest_neighbours(&self) -> u8 {
        self.settings.nb_nearest_neighbours.unwrap_or(4)
    }

    /// Accumulated server-request time for the last weather-generation call,
    /// in seconds.
    pub fn last_request_duration(&self) -> f64 {
        *lock(&self.request_seconds)
    }

    /// Check that the server supports this client, running the capability
    /// handshake on first use. A non-empty server message is logged as a
    /// warning when the client is supported and returned as the error when
    /// it is not.
    pub fn check_client_supported(&self) -> Result<String, ClimSimError> {
        let capabilities = self.ensure_supported()?;
        Ok(capabilities.client_message)
    }

    /// The names of the available models, cloned from the cached catalog.
    pub fn model_list(&self) -> Result<Vec<String>, ClimSimError> {
        self.ensure_supported()?;
        self.reference_model_list()
    }

    /// Help text for one model.
    pub fn model_help(&self, model_name: &str) -> Result<String, ClimSimError> {
        self.ensure_supported()?;
        let lines = self.get_lines(MODEL_HELP_ENDPOINT, &format!("model={model_name}"))?;
        Ok(lines.join("\n"))
    }

    /// Default parameters of one model, parsed back into a [`ParameterMap`].
    pub fn model_default_parameters(
        &self,
        model_name: &str,
    ) -> Result<ParameterMap, ClimSimError> {
        self.ensure_supported()?;
        let lines = self.get_lines(
            MODEL_DEFAULT_PARAMETERS_ENDPOINT,
            &format!("model={model_name}"),
        )?;
        let line = lines.first().map(String::as_str).unwrap_or("");
        Ok(ParameterMap::parse(line))
    }

    /// Retrieve climate normals for a set of locations.
    ///
    /// Without `average_over` the result keeps one row per month; with it,
    /// each location's monthly table collapses into a single row where
    /// additive variables are summed and the others day-weighted-averaged
    /// (see [`DataSet::month_aggregate`]).
    ///
    /// Fails with a client error when the location list exceeds the absolute
    /// per-call ceiling (1000); lists above the server's advertised batch
    /// capacity are split into sequential sub-requests and merged in the
    /// caller's order.
    #[builder]
    pub fn normals(
        &self,
        period: Period,
        locations: &[Location],
        rcp: Option<Rcp>,
        climate_model: Option<ClimateModel>,
        average_over: Option<Vec<Month>>,
    ) -> Result<LocationMap, ClimSimError> {
        let capabilities = self.ensure_supported()?;
        self.check_location_count(locations)?;
        let months = average_over.filter(|months| !months.is_empty());

        let capacity = capabilities.max_coordinates_normals.max(1);
        let mut output = Vec::with_capacity(locations.len());
        for batch in locations.chunks(capacity) {
            output.extend(self.fetch_normals_batch(
                period,
                batch,
                rcp,
                climate_model,
                months.as_deref(),
            )?);
        }
        Ok(output)
    }

    /// Monthly normals: one row per calendar month.
    pub fn monthly_normals(
        &self,
        period: Period,
        locations: &[Location],
        rcp: Option<Rcp>,
        climate_model: Option<ClimateModel>,
    ) -> Result<LocationMap, ClimSimError> {
        self.normals()
            .period(period)
            .locations(locations)
            .maybe_rcp(rcp)
            .maybe_climate_model(climate_model)
            .call()
    }

    /// Annual normals: all twelve months collapsed into one row.
    pub fn annual_normals(
        &self,
        period: Period,
        locations: &[Location],
        rcp: Option<Rcp>,
        climate_model: Option<ClimateModel>,
    ) -> Result<LocationMap, ClimSimError> {
        self.normals()
            .period(period)
            .locations(locations)
            .maybe_rcp(rcp)
            .maybe_climate_model(climate_model)
            .average_over(Month::ALL.to_vec())
            .call()
    }

    /// Generate the meteorological time series for `from_year..=to_year`
    /// and apply one or many models to them.
    ///
    /// `models` must name models from [`model_list`](ClimSim::model_list).
    /// The result maps each model name to its per-location datasets, or to
    /// an error marker when that model failed on the server — a per-model
    /// failure does not abort the call. `parameters` overrides model
    /// parameters positionally; an empty map is the explicit "no override"
    /// placeholder.
    #[builder]
    pub fn generate_weather(
        &self,
        from_year: i32,
        to_year: i32,
        locations: &[Location],
        models: &[String],
        rcp: Option<Rcp>,
        climate_model: Option<ClimateModel>,
        replications: Option<u32>,
        model_replications: Option<u32>,
        parameters: Option<&[ParameterMap]>,
    ) -> Result<ModelMap, ClimSimError> {
        let capabilities = self.ensure_supported()?;
        let replications = replications.unwrap_or(1);
        let model_replications = model_replications.unwrap_or(1);
        if replications < 1 || model_replications < 1 {
            return Err(ClimSimError::InvalidArgument(
                "the replication counts should be equal to or greater than 1".to_string(),
            ));
        }
        if models.is_empty() {
            return Err(ClimSimError::InvalidArgument(
                "at least one model name is required".to_string(),
            ));
        }
        self.check_location_count(locations)?;

        *lock(&self.request_seconds) = 0.0;

        let capacity = capabilities.max_coordinates_weather_generation.max(1);
        let mut merged: ModelMap = Vec::new();
        for batch in locations.chunks(capacity) {
            let intermediate = self.fetch_weather_batch(
                from_year,
                to_year,
                batch,
                models,
                rcp,
                climate_model,
                replications,
                model_replications,
                parameters,
            )?;
            merge_model_maps(&mut merged, intermediate);
        }
        Ok(merged)
    }

    fn check_location_count(&self, locations: &[Location]) -> Result<(), ClimSimError> {
        if locations.is_empty() {
            return Err(ClimSimError::InvalidArgument(
                "at least one location is required".to_string(),
            ));
        }
        if locations.len() > MAX_LOCATIONS_PER_REQUEST {
            return Err(ClimSimError::TooManyLocations {
                max: MAX_LOCATIONS_PER_REQUEST,
                got: locations.len(),
            });
        }
        Ok(())
    }

    fn fetch_normals_batch(
        &self,
        period: Period,
        locations: &[Location],
        rcp: Option<Rcp>,
        climate_model: Option<ClimateModel>,
        average_over: Option<&[Month]>,
    ) -> Result<LocationMap, ClimSimError> {
        let mut query = coordinates_query(locations)?;
        query.push_str(&format!("&period={}", period.token()));
        if let Some(rcp) = rcp {
            query.push_str(&format!("&rcp={}", rcp.token()));
        }
        if let Some(model) = climate_model {
            query.push_str(&format!("&climMod={}", model.token()));
        }

        let reply = self.get_lines(NORMALS_ENDPOINT, &query)?;
        let catalog = self.reference_model_list()?;
        let result = read_reply(&reply, NORMALS_HEADER_TOKEN, locations, &catalog)?;
        let map = match result {
            FetchResult::SingleModel(map) => map,
            FetchResult::MultiModel(_) => {
                return Err(ClimSimError::UnexpectedReply(
                    "a normals reply should not carry model sections".to_string(),
                ))
            }
        };

        match average_over {
            None => Ok(map
                .into_iter()
                .map(|(location, mut dataset)| {
                    trim_to_normals_fields(&mut dataset);
                    (location, dataset)
                })
                .collect()),
            Some(months) => map
                .into_iter()
                .map(|(location, dataset)| {
                    dataset
                        .month_aggregate(months)
                        .map(|aggregated| (location, aggregated))
                })
                .collect(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fetch_weather_batch(
        &self,
        from_year: i32,
        to_year: i32,
        locations: &[Location],
        models: &[String],
        rcp: Option<Rcp>,
        climate_model: Option<ClimateModel>,
        replications: u32,
        model_replications: u32,
        parameters: Option<&[ParameterMap]>,
    ) -> Result<ModelMap, ClimSimError> {
        let mut query = coordinates_query(locations)?;
        query.push_str(&format!("&from={from_year}"));
        query.push_str(&format!("&to={to_year}"));
        if let Some(rcp) = rcp {
            query.push_str(&format!("&rcp={}", rcp.token()));
        }
        if let Some(model) = climate_model {
            query.push_str(&format!("&climMod={}", model.token()));
        }
        if self.settings.force_climate_generation {
            warn!("past climate is generated instead of being compiled from observations");
            query.push_str("&source=FromNormals");
        }
        if let Some(n) = self.settings.nb_nearest_neighbours {
            query.push_str(&format!("&nb_nearest_neighbor={n}"));
        }
        if replications > 1 {
            query.push_str(&format!("&rep={replications}"));
        }
        query.push_str(&format!("&model={}", models.join(SPACE_TOKEN)));
        if model_replications > 1 {
            query.push_str(&format!("&repmodel={model_replications}"));
        }
        if let Some(maps) = parameters {
            let joined = maps
                .iter()
                .map(ParameterMap::to_string)
                .collect::<Vec<_>>()
                .join(SPACE_TOKEN);
            query.push_str(&format!("&Parameters={joined}"));
        }

        let reply = self.get_lines(WEATHER_ENDPOINT, &query)?;
        let catalog = self.reference_model_list()?;
        match read_reply(&reply, WEATHER_HEADER_TOKEN, locations, &catalog)? {
            FetchResult::MultiModel(map) => Ok(map),
            FetchResult::SingleModel(map) if map.is_empty() => Ok(Vec::new()),
            FetchResult::SingleModel(_) => Err(ClimSimError::UnexpectedReply(
                "a weather reply should carry one section per model".to_string(),
            )),
        }
    }

    /// Resolve the capability snapshot, performing the handshake exactly
    /// once. Concurrent callers serialize on the guard and then read the
    /// cached immutable values.
    fn ensure_supported(&self) -> Result<Capabilities, ClimSimError> {
        let mut guard = lock(&self.capabilities);
        let capabilities = match guard.as_ref() {
            Some(capabilities) => capabilities.clone(),
            None => {
                let reply = self
                    .get_lines(STATUS_ENDPOINT, &format!("crev={CLIENT_REVISION}"))?
                    .join("");
                let capabilities = Capabilities::from_status_reply(&reply)?;
                if capabilities.client_supported && !capabilities.client_message.is_empty() {
                    warn!("{}", capabilities.client_message);
                }
                *guard = Some(capabilities.clone());
                capabilities
            }
        };
        drop(guard);
        if !capabilities.client_supported {
            return Err(ClimSimError::UnsupportedClient(capabilities.client_message));
        }
        Ok(capabilities)
    }

    /// The cached model catalog, fetched on first use.
    fn reference_model_list(&self) -> Result<Vec<String>, ClimSimError> {
        let mut guard = lock(&self.model_catalog);
        if let Some(catalog) = guard.as_ref() {
            return Ok(catalog.clone());
        }
        let catalog = self.get_lines(MODEL_LIST_ENDPOINT, "")?;
        info!("model catalog loaded, {} models", catalog.len());
        *guard = Some(catalog.clone());
        Ok(catalog)
    }

    /// Build the URL, execute the GET through the transport and account the
    /// request duration.
    fn get_lines(&self, endpoint: &str, query: &str) -> Result<Vec<String>, ClimSimError> {
        let url = self.build_url(endpoint, query);
        if reqwest::Url::parse(&url).is_err() {
            return Err(ClimSimError::MalformedUrl(url));
        }
        info!("GET {url}");
        let started = Instant::now();
        let result = self.transport.get_lines(&url);
        *lock(&self.request_seconds) += started.elapsed().as_secs_f64();
        result
    }

    fn build_url(&self, endpoint: &str, query: &str) -> String {
        let address = self.settings.address();
        let mut url = format!("http://{}:{}/{}", address.hostname, address.port, endpoint);
        let mut has_query = false;
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
            has_query = true;
        }
        if self.settings.test_mode {
            url.push(if has_query { '&' } else { '?' });
            url.push_str(TEST_MODE_MARKER);
        }
        url
    }
}

/// Serialize the coordinate triples into the `lat`, `long` and `elev` query
/// parameters, values joined with the literal `%20` token. NaN elevations go
/// on the wire as `NaN`; NaN or infinite latitude/longitude is refused.
fn coordinates_query(locations: &[Location]) -> Result<String, ClimSimError> {
    let mut lat = String::new();
    let mut long = String::new();
    let mut elev = String::new();
    for location in locations {
        if !location.latitude_deg.is_finite() || !location.longitude_deg.is_finite() {
            return Err(ClimSimError::InvalidCoordinates {
                latitude: location.latitude_deg,
                longitude: location.longitude_deg,
            });
        }
        if !lat.is_empty() {
            lat.push_str(SPACE_TOKEN);
            long.push_str(SPACE_TOKEN);
            elev.push_str(SPACE_TOKEN);
        }
        lat.push_str(&format!("{}", location.latitude_deg));
        long.push_str(&format!("{}", location.longitude_deg));
        elev.push_str(&location.elevation_token());
    }
    Ok(format!("lat={lat}&long={long}&elev={elev}"))
}

/// Remove the columns a normals table should not expose: everything past
/// column 0 whose name is not a normals field.
fn trim_to_normals_fields(dataset: &mut DataSet) {
    let keep = Variable::normals_field_names();
    let doomed: Vec<usize> = (1..dataset.field_names().len())
        .rev()
        .filter(|&column| !keep.contains(&dataset.field_names()[column].as_str()))
        .collect();
    for column in doomed {
        dataset.remove_field(column);
    }
}

/// Merge one sub-batch into the running multi-model result. Model keys are
/// merged over the union across sub-batches; per-model entries append in
/// submission order. A model that failed in any sub-batch stays failed.
fn merge_model_maps(merged: &mut ModelMap, batch: ModelMap) {
    for (name, outcome) in batch {
        match merged.iter_mut().find(|(existing, _)| *existing == name) {
            None => merged.push((name, outcome)),
            Some(entry) => match (&mut entry.1, outcome) {
                (ModelOutcome::Data(running), ModelOutcome::Data(new)) => running.extend(new),
                (ModelOutcome::Failed(_), _) => {}
                (slot, ModelOutcome::Failed(message)) => *slot = ModelOutcome::Failed(message),
            },
        }
    }
}
