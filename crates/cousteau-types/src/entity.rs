//! Probe and measurement metadata records.

use chrono::{DateTime, Utc};
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Remote identifier of a probe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProbeId(u64);

/// Remote identifier of a measurement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MeasurementId(u64);

/// An API object that can be populated from one metadata mapping.
///
/// Entities are built once and never mutated; their identity is the remote id.
pub trait Entity: Sized {
    /// Collection path the object's metadata lives under, with trailing slash.
    const META_PATH: &'static str;

    /// Builds the entity from raw metadata.
    ///
    /// `id` takes precedence over the `id` field of the metadata when given.
    fn from_metadata(id: Option<u64>, meta: Value) -> Self;

    /// Returns the metadata path for one object.
    #[must_use]
    fn meta_path(id: u64) -> String {
        format!("{}{id}/", Self::META_PATH)
    }
}

fn str_field(meta: &Value, key: &str) -> Option<String> {
    meta.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(meta: &Value, key: &str) -> Option<bool> {
    meta.get(key).and_then(Value::as_bool)
}

fn u64_field(meta: &Value, key: &str) -> Option<u64> {
    meta.get(key).and_then(Value::as_u64)
}

fn value_field(meta: &Value, key: &str) -> Option<Value> {
    meta.get(key).filter(|value| !value.is_null()).cloned()
}

/// Epoch seconds to UTC; zero and missing timestamps stay unset.
fn time_field(meta: &Value, key: &str) -> Option<DateTime<Utc>> {
    meta.get(key)
        .and_then(Value::as_i64)
        .filter(|secs| *secs != 0)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn status_field(meta: &Value, key: &str) -> Option<Value> {
    meta.get("status").and_then(|status| status.get(key)).cloned()
}

/// A probe's metadata as returned by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    id: Option<ProbeId>,
    is_anchor: Option<bool>,
    country_code: Option<String>,
    description: Option<String>,
    is_public: Option<bool>,
    asn_v4: Option<u64>,
    asn_v6: Option<u64>,
    address_v4: Option<String>,
    address_v6: Option<String>,
    prefix_v4: Option<String>,
    prefix_v6: Option<String>,
    geometry: Option<Value>,
    tags: Option<Value>,
    status: Option<String>,
    meta_data: Value,
}

impl Entity for Probe {
    const META_PATH: &'static str = "/api/v2/probes/";

    fn from_metadata(id: Option<u64>, meta: Value) -> Self {
        Self {
            id: id.or_else(|| u64_field(&meta, "id")).map(ProbeId::from),
            is_anchor: bool_field(&meta, "is_anchor"),
            country_code: str_field(&meta, "country_code"),
            description: str_field(&meta, "description"),
            is_public: bool_field(&meta, "is_public"),
            asn_v4: u64_field(&meta, "asn_v4"),
            asn_v6: u64_field(&meta, "asn_v6"),
            address_v4: str_field(&meta, "address_v4"),
            address_v6: str_field(&meta, "address_v6"),
            prefix_v4: str_field(&meta, "prefix_v4"),
            prefix_v6: str_field(&meta, "prefix_v6"),
            geometry: value_field(&meta, "geometry"),
            tags: value_field(&meta, "tags"),
            status: status_field(&meta, "name").and_then(|name| name.as_str().map(str::to_string)),
            meta_data: meta,
        }
    }
}

impl Probe {
    /// Returns the probe id.
    #[must_use]
    pub const fn id(&self) -> Option<ProbeId> {
        self.id
    }

    /// Returns true if the probe is an anchor.
    #[must_use]
    pub const fn is_anchor(&self) -> Option<bool> {
        self.is_anchor
    }

    /// Returns the ISO country code.
    #[must_use]
    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    /// Returns the owner-supplied description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns true if the probe is public.
    #[must_use]
    pub const fn is_public(&self) -> Option<bool> {
        self.is_public
    }

    /// Returns the IPv4 origin AS.
    #[must_use]
    pub const fn asn_v4(&self) -> Option<u64> {
        self.asn_v4
    }

    /// Returns the IPv6 origin AS.
    #[must_use]
    pub const fn asn_v6(&self) -> Option<u64> {
        self.asn_v6
    }

    /// Returns the IPv4 address.
    #[must_use]
    pub fn address_v4(&self) -> Option<&str> {
        self.address_v4.as_deref()
    }

    /// Returns the IPv6 address.
    #[must_use]
    pub fn address_v6(&self) -> Option<&str> {
        self.address_v6.as_deref()
    }

    /// Returns the IPv4 prefix.
    #[must_use]
    pub fn prefix_v4(&self) -> Option<&str> {
        self.prefix_v4.as_deref()
    }

    /// Returns the IPv6 prefix.
    #[must_use]
    pub fn prefix_v6(&self) -> Option<&str> {
        self.prefix_v6.as_deref()
    }

    /// Returns the GeoJSON location.
    #[must_use]
    pub const fn geometry(&self) -> Option<&Value> {
        self.geometry.as_ref()
    }

    /// Returns the probe tags.
    #[must_use]
    pub const fn tags(&self) -> Option<&Value> {
        self.tags.as_ref()
    }

    /// Returns the connection status name (e.g. "Connected").
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Returns the raw metadata the probe was built from.
    #[must_use]
    pub const fn meta_data(&self) -> &Value {
        &self.meta_data
    }
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "Probe #{id}"),
            None => write!(f, "Probe #?"),
        }
    }
}

/// A measurement's metadata as returned by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    id: Option<MeasurementId>,
    start_time: Option<DateTime<Utc>>,
    stop_time: Option<DateTime<Utc>>,
    creation_time: Option<DateTime<Utc>>,
    protocol: Option<u64>,
    target_ip: Option<String>,
    target_asn: Option<u64>,
    target: Option<String>,
    description: Option<String>,
    is_oneoff: Option<bool>,
    is_public: Option<bool>,
    interval: Option<u64>,
    resolve_on_probe: Option<bool>,
    status_id: Option<u64>,
    status: Option<String>,
    kind: Option<String>,
    result_url: Option<String>,
    packets: Option<u64>,
    meta_data: Value,
}

impl Entity for Measurement {
    const META_PATH: &'static str = "/api/v2/measurements/";

    fn from_metadata(id: Option<u64>, meta: Value) -> Self {
        Self {
            id: id.or_else(|| u64_field(&meta, "id")).map(MeasurementId::from),
            start_time: time_field(&meta, "start_time"),
            stop_time: time_field(&meta, "stop_time"),
            creation_time: time_field(&meta, "creation_time"),
            protocol: u64_field(&meta, "af"),
            target_ip: str_field(&meta, "target_ip"),
            target_asn: u64_field(&meta, "target_asn"),
            target: str_field(&meta, "target"),
            description: str_field(&meta, "description"),
            is_oneoff: bool_field(&meta, "is_oneoff"),
            is_public: bool_field(&meta, "is_public"),
            interval: u64_field(&meta, "interval"),
            resolve_on_probe: bool_field(&meta, "resolve_on_probe"),
            status_id: status_field(&meta, "id").and_then(|id| id.as_u64()),
            status: status_field(&meta, "name").and_then(|name| name.as_str().map(str::to_string)),
            kind: measurement_type(&meta),
            result_url: str_field(&meta, "result"),
            packets: u64_field(&meta, "packets"),
            meta_data: meta,
        }
    }
}

/// Older v2 responses carry the type as a plain string, newer ones as
/// `{"id": .., "name": ..}`; both collapse to a single string.
fn measurement_type(meta: &Value) -> Option<String> {
    match meta.get("type")? {
        Value::String(kind) => Some(kind.clone()),
        Value::Object(kind) => Some(
            kind.get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_uppercase(),
        ),
        _ => None,
    }
}

impl Measurement {
    /// Returns the measurement id.
    #[must_use]
    pub const fn id(&self) -> Option<MeasurementId> {
        self.id
    }

    /// Returns the scheduled start time.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Returns the stop time.
    #[must_use]
    pub const fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.stop_time
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn creation_time(&self) -> Option<DateTime<Utc>> {
        self.creation_time
    }

    /// Returns the address family (4 or 6).
    #[must_use]
    pub const fn protocol(&self) -> Option<u64> {
        self.protocol
    }

    /// Returns the resolved target address.
    #[must_use]
    pub fn target_ip(&self) -> Option<&str> {
        self.target_ip.as_deref()
    }

    /// Returns the AS of the target address.
    #[must_use]
    pub const fn target_asn(&self) -> Option<u64> {
        self.target_asn
    }

    /// Returns the target as requested.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns true for one-off measurements.
    #[must_use]
    pub const fn is_oneoff(&self) -> Option<bool> {
        self.is_oneoff
    }

    /// Returns true if the measurement is public.
    #[must_use]
    pub const fn is_public(&self) -> Option<bool> {
        self.is_public
    }

    /// Returns the interval in seconds.
    #[must_use]
    pub const fn interval(&self) -> Option<u64> {
        self.interval
    }

    /// Returns true if probes resolve the target themselves.
    #[must_use]
    pub const fn resolve_on_probe(&self) -> Option<bool> {
        self.resolve_on_probe
    }

    /// Returns the numeric status id.
    #[must_use]
    pub const fn status_id(&self) -> Option<u64> {
        self.status_id
    }

    /// Returns the status name (e.g. "Ongoing").
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Returns the measurement type (e.g. "ping", or "PING" for object-typed responses).
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns the results URL.
    #[must_use]
    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    /// Returns the packet count.
    #[must_use]
    pub const fn packets(&self) -> Option<u64> {
        self.packets
    }

    /// Returns the raw metadata the measurement was built from.
    #[must_use]
    pub const fn meta_data(&self) -> &Value {
        &self.meta_data
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "Measurement #{id}"),
            None => write!(f, "Measurement #?"),
        }
    }
}
