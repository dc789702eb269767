//! HTTP access to the RIPE Atlas REST API.
//!
//! - [`AtlasClient`] - executes requests and classifies responses
//! - [`Listing`] - walks paginated listings, splitting long id filters
//! - [`EntityRequest`] - loads a single probe or measurement
//! - [`CreateRequest`], [`ResultsRequest`] and friends - measurement lifecycle calls

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/RIPE-NCC/ripe-atlas-cousteau/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod listing;
mod meta;
mod requests;
pub mod url;

pub use client::{ApiError, AtlasClient, ClientConfig, DEFAULT_BASE_URL, default_user_agent};
pub use listing::{
    CHUNK_SIZE, Endpoint, Listing, URL_LENGTH_LIMIT, measurement_stream, probe_stream,
};
pub use meta::{EntityRequest, fetch_measurement, fetch_probe};
pub use requests::{
    CreateRequest, MEASUREMENTS_PATH, ResultsRequest, add_tag, change_participants,
    change_post_data, latest_results, remove_tag, stop_measurement,
};
