//! Single entity metadata fetching.

use cousteau_types::{CousteauError, Entity, Measurement, MeasurementId, Probe, ProbeId};
use serde_json::Value;

use crate::AtlasClient;

/// Request for one entity, by id or from metadata already at hand.
///
/// ```no_run
/// use cousteau_fetch::{AtlasClient, EntityRequest};
/// use cousteau_types::Probe;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AtlasClient::with_defaults()?;
/// let probe: Probe = EntityRequest::by_id(1_u64)
///     .fields(["country_code", "status"])
///     .load(&client)
///     .await?;
/// println!("{probe} is {:?}", probe.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRequest {
    id: Option<u64>,
    meta_data: Option<Value>,
    fields: Vec<String>,
}

impl EntityRequest {
    /// Requests the entity with the given id.
    #[must_use]
    pub fn by_id(id: impl Into<u64>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Builds the entity from already fetched metadata; no request is made.
    #[must_use]
    pub fn from_metadata(meta_data: Value) -> Self {
        Self {
            meta_data: Some(meta_data),
            ..Self::default()
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn id(mut self, id: impl Into<u64>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Limits the fields the API returns.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Query parameters of the metadata request.
    fn params(&self) -> Vec<(String, String)> {
        if self.fields.is_empty() {
            return Vec::new();
        }
        vec![("fields".to_string(), self.fields.join(","))]
    }

    /// Builds the entity, fetching its metadata if none was supplied.
    ///
    /// # Errors
    ///
    /// Returns [`CousteauError::Generic`] if neither an id nor metadata was
    /// given, and [`CousteauError::ApiResponse`] if the fetch is not ok.
    pub async fn load<T: Entity>(self, client: &AtlasClient) -> Result<T, CousteauError> {
        if let Some(meta_data) = self.meta_data {
            return Ok(T::from_metadata(self.id, meta_data));
        }
        let Some(id) = self.id else {
            return Err(CousteauError::Generic(
                "Id or meta_data should be passed in order to create object.".to_string(),
            ));
        };

        let meta_data = client.get(&T::meta_path(id), &self.params()).await?;
        Ok(T::from_metadata(Some(id), meta_data.into_json()))
    }
}

/// Fetches one probe.
///
/// # Errors
///
/// Returns an error if the fetch is not ok.
pub async fn fetch_probe(client: &AtlasClient, id: ProbeId) -> Result<Probe, CousteauError> {
    EntityRequest::by_id(id).load(client).await
}

/// Fetches one measurement.
///
/// # Errors
///
/// Returns an error if the fetch is not ok.
pub async fn fetch_measurement(
    client: &AtlasClient,
    id: MeasurementId,
) -> Result<Measurement, CousteauError> {
    EntityRequest::by_id(id).load(client).await
}
