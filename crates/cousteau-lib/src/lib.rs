//! Rust client for the RIPE Atlas measurement API.
//!
//! This is a facade crate that re-exports functionality from the cousteau
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```no_run
//! use cousteau_lib::prelude::*;
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let client = AtlasClient::new(ClientConfig::default().key("my-api-key"))?;
//!
//!     let filters = Filters::new().with("country_code", "GR").with("status", 1);
//!     let probes: Vec<Probe> = probe_stream(&client, filters).try_collect().await?;
//!     println!("{} connected probes", probes.len());
//!
//!     let created = CreateRequest::new()
//!         .definition(
//!             MeasurementDefinition::new(MeasurementType::Ping)
//!                 .option("af", 4)
//!                 .option("target", "www.ripe.net")
//!                 .option("description", "ping from Greece"),
//!         )
//!         .source(AtlasSource::new(SourceType::Country, "GR", 5))
//!         .oneoff(true)
//!         .send(&client)
//!         .await?;
//!     println!("{created}");
//!
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/RIPE-NCC/ripe-atlas-cousteau/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use cousteau_types::*;

// Re-export the REST client
#[cfg(feature = "fetch")]
pub use cousteau_fetch::{
    ApiError, AtlasClient, ClientConfig, CreateRequest, Endpoint, EntityRequest, Listing,
    ResultsRequest, add_tag, change_participants, fetch_measurement, fetch_probe, latest_results,
    measurement_stream, probe_stream, remove_tag, stop_measurement,
};

// Re-export the streaming client
#[cfg(feature = "stream")]
pub use cousteau_stream::{AtlasStream, ReconnectConfig, StreamConfig, StreamError};

/// Prelude module for convenient imports.
///
/// ```
/// use cousteau_lib::prelude::*;
/// ```
pub mod prelude {
    pub use cousteau_types::{
        AtlasSource, ChangeSource, CousteauError, Entity, FilterValue, Filters, Measurement,
        MeasurementDefinition, MeasurementId, MeasurementType, Payload, Probe, ProbeId, Result,
        SourceAction, SourceTags, SourceType,
    };

    #[cfg(feature = "fetch")]
    pub use cousteau_fetch::{
        AtlasClient, ClientConfig, CreateRequest, EntityRequest, Listing, ResultsRequest,
        measurement_stream, probe_stream,
    };

    #[cfg(feature = "stream")]
    pub use cousteau_stream::{AtlasStream, StreamConfig};
}
