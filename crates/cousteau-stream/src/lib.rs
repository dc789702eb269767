//! Streaming client for the RIPE Atlas result streaming service.
//!
//! - [`AtlasStream`] - connects, subscribes and dispatches events to callbacks
//! - [`StreamConfig`] / [`ReconnectConfig`] - server, headers and reconnection policy
//! - [`codec::Packet`] - the socket.io framing spoken over the websocket

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/RIPE-NCC/ripe-atlas-cousteau/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
pub mod codec;
mod config;
mod dispatch;
mod error;

pub use client::AtlasStream;
pub use config::{DEFAULT_STREAM_PATH, DEFAULT_STREAM_URL, ReconnectConfig, StreamConfig};
pub use dispatch::{
    Callback, DEPRECATED_CHANNELS, EVENT_ERROR, EVENT_METADATA, EVENT_PROBESTATUS,
    EVENT_REPLAY_FINISHED, EVENT_RESULTS, EVENT_SUBSCRIBE, EVENT_SUBSCRIBED, EVENT_UNSUBSCRIBE,
    EVENT_UNSUBSCRIBED, STREAM_TYPE_METADATA, STREAM_TYPE_PROBE, STREAM_TYPE_RESULT,
    resolve_channel,
};
pub use error::StreamError;
