//! Core types for the cousteau RIPE Atlas client.
//!
//! This crate provides the data structures shared by the other cousteau crates:
//!
//! - [`CousteauError`] - Library-level error
//! - [`Payload`] - Decoded API response body
//! - [`Filters`] / [`FilterValue`] - Listing filters and their query encoding
//! - [`Probe`] / [`Measurement`] - Entity records built from API metadata
//! - [`AtlasSource`] / [`ChangeSource`] - Probe selections for measurement requests
//! - [`MeasurementDefinition`] - Measurement definitions for the create request

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/RIPE-NCC/ripe-atlas-cousteau/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod definition;
mod entity;
mod error;
mod filter;
mod payload;
mod source;

pub use definition::{MeasurementDefinition, MeasurementType};
pub use entity::{Entity, Measurement, MeasurementId, Probe, ProbeId};
pub use error::{CousteauError, Result, Violations};
pub use filter::{FilterValue, Filters};
pub use payload::Payload;
pub use source::{AtlasSource, ChangeSource, SourceAction, SourceTags, SourceType};
