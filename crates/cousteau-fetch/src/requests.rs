//! Measurement lifecycle requests: create, change participants, stop,
//! result retrieval and tagging.

use chrono::{DateTime, Utc};
use cousteau_types::{
    AtlasSource, ChangeSource, CousteauError, FilterValue, MeasurementDefinition, MeasurementId,
    Payload,
};
use serde_json::{Map, Value, json};

use crate::AtlasClient;

/// Measurement collection path.
pub const MEASUREMENTS_PATH: &str = "/api/v2/measurements/";

/// Request creating one or more measurements.
///
/// ```
/// use cousteau_fetch::CreateRequest;
/// use cousteau_types::{AtlasSource, MeasurementDefinition, MeasurementType, SourceType};
///
/// let request = CreateRequest::new()
///     .definition(
///         MeasurementDefinition::new(MeasurementType::Ping)
///             .option("target", "www.ripe.net")
///             .option("af", 4)
///             .option("description", "testing"),
///     )
///     .source(AtlasSource::new(SourceType::Area, "WW", 5))
///     .oneoff(true);
///
/// let body = request.post_data().unwrap();
/// assert_eq!(body["is_oneoff"], true);
/// assert_eq!(body["probes"][0]["value"], "WW");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRequest {
    definitions: Vec<MeasurementDefinition>,
    sources: Vec<AtlasSource>,
    start_time: Option<DateTime<Utc>>,
    stop_time: Option<DateTime<Utc>>,
    is_oneoff: bool,
    bill_to: Option<String>,
}

impl CreateRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a measurement definition.
    #[must_use]
    pub fn definition(mut self, definition: MeasurementDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Adds a probe source.
    #[must_use]
    pub fn source(mut self, source: AtlasSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Sets the start time.
    #[must_use]
    pub const fn start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Sets the stop time.
    #[must_use]
    pub const fn stop_time(mut self, stop_time: DateTime<Utc>) -> Self {
        self.stop_time = Some(stop_time);
        self
    }

    /// Marks the measurements as one-off.
    #[must_use]
    pub const fn oneoff(mut self, is_oneoff: bool) -> Self {
        self.is_oneoff = is_oneoff;
        self
    }

    /// Bills the measurements to another account.
    #[must_use]
    pub fn bill_to(mut self, account: impl Into<String>) -> Self {
        self.bill_to = Some(account.into());
        self
    }

    /// Validates definitions and sources and builds the POST body.
    ///
    /// # Errors
    ///
    /// Returns the first malformed definition or source.
    pub fn post_data(&self) -> Result<Value, CousteauError> {
        let definitions = self
            .definitions
            .iter()
            .map(MeasurementDefinition::build_api_struct)
            .collect::<Result<Vec<_>, _>>()?;
        let probes = self
            .sources
            .iter()
            .map(AtlasSource::build_api_struct)
            .collect::<Result<Vec<_>, _>>()?;

        let mut data = Map::new();
        data.insert("definitions".into(), Value::Array(definitions));
        data.insert("probes".into(), Value::Array(probes));
        data.insert("is_oneoff".into(), Value::Bool(self.is_oneoff));
        if let Some(start_time) = self.start_time {
            data.insert("start_time".into(), json!(start_time.timestamp()));
        }
        if let Some(stop_time) = self.stop_time {
            data.insert("stop_time".into(), json!(stop_time.timestamp()));
        }
        if let Some(bill_to) = &self.bill_to {
            data.insert("bill_to".into(), json!(bill_to));
        }
        Ok(Value::Object(data))
    }

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed or the API rejects it.
    pub async fn send(&self, client: &AtlasClient) -> Result<Payload, CousteauError> {
        let body = self.post_data()?;
        Ok(client.post(MEASUREMENTS_PATH, &body).await?)
    }
}

/// Builds the body of a participation change request.
///
/// # Errors
///
/// Returns the first malformed source.
pub fn change_post_data(sources: &[ChangeSource]) -> Result<Value, CousteauError> {
    sources
        .iter()
        .map(ChangeSource::build_api_struct)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

/// Adds probes to or removes probes from a running measurement.
///
/// # Errors
///
/// Returns an error if a source is malformed or the API rejects the change.
pub async fn change_participants(
    client: &AtlasClient,
    msm_id: MeasurementId,
    sources: &[ChangeSource],
) -> Result<Payload, CousteauError> {
    let body = change_post_data(sources)?;
    let path = format!("{MEASUREMENTS_PATH}{msm_id}/participation-requests/");
    Ok(client.post(&path, &body).await?)
}

/// Stops a measurement.
///
/// # Errors
///
/// Returns an error if the API refuses to stop it.
pub async fn stop_measurement(
    client: &AtlasClient,
    msm_id: MeasurementId,
) -> Result<Payload, CousteauError> {
    Ok(client.delete(&format!("{MEASUREMENTS_PATH}{msm_id}")).await?)
}

/// Fetches the latest result of every probe of a measurement.
///
/// `probe_ids` may be a list or an already comma-joined string.
///
/// # Errors
///
/// Returns an error if the fetch is not ok.
pub async fn latest_results(
    client: &AtlasClient,
    msm_id: MeasurementId,
    probe_ids: Option<FilterValue>,
) -> Result<Payload, CousteauError> {
    let params: Vec<(String, String)> = probe_ids
        .map(|ids| ("probe_ids".to_string(), ids.normalize()))
        .into_iter()
        .collect();
    let path = format!("{MEASUREMENTS_PATH}{msm_id}/latest");
    Ok(client.get(&path, &params).await?)
}

/// Request for the results of a measurement within a time window.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsRequest {
    msm_id: MeasurementId,
    start: Option<DateTime<Utc>>,
    stop: Option<DateTime<Utc>>,
    probe_ids: Option<FilterValue>,
}

impl ResultsRequest {
    /// Requests all results of a measurement.
    #[must_use]
    pub const fn new(msm_id: MeasurementId) -> Self {
        Self {
            msm_id,
            start: None,
            stop: None,
            probe_ids: None,
        }
    }

    /// Only results at or after `start`.
    #[must_use]
    pub const fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Only results at or before `stop`.
    #[must_use]
    pub const fn stop(mut self, stop: DateTime<Utc>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Only results of the given probes.
    #[must_use]
    pub fn probe_ids(mut self, probe_ids: impl Into<FilterValue>) -> Self {
        self.probe_ids = Some(probe_ids.into());
        self
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{MEASUREMENTS_PATH}{}/results", self.msm_id)
    }

    /// Returns the query parameters.
    #[must_use]
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start {
            params.push(("start".to_string(), start.timestamp().to_string()));
        }
        if let Some(stop) = self.stop {
            params.push(("stop".to_string(), stop.timestamp().to_string()));
        }
        if let Some(probe_ids) = &self.probe_ids {
            params.push(("probe_ids".to_string(), probe_ids.normalize()));
        }
        params
    }

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch is not ok.
    pub async fn send(&self, client: &AtlasClient) -> Result<Payload, CousteauError> {
        Ok(client.get(&self.path(), &self.params()).await?)
    }
}

/// Tags a measurement.
///
/// # Errors
///
/// Returns an error if the API rejects the tag.
pub async fn add_tag(
    client: &AtlasClient,
    msm_id: MeasurementId,
    tag: &str,
) -> Result<Payload, CousteauError> {
    let path = format!("{MEASUREMENTS_PATH}{msm_id}/tags/");
    Ok(client.post(&path, &json!({ "tag": tag })).await?)
}

/// Removes a tag from a measurement.
///
/// # Errors
///
/// Returns an error if the API rejects the removal.
pub async fn remove_tag(
    client: &AtlasClient,
    msm_id: MeasurementId,
    tag: &str,
) -> Result<Payload, CousteauError> {
    let path = format!("{MEASUREMENTS_PATH}{msm_id}/tags/{tag}/");
    Ok(client.delete(&path).await?)
}
