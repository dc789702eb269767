//! Measurement definitions for the create request.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::{CousteauError, Violations};

/// Options every measurement type accepts.
const COMMON_OPTIONS: &[&str] = &[
    "af",
    "description",
    "interval",
    "is_oneoff",
    "is_public",
    "resolve_on_probe",
    "skip_dns_check",
    "spread",
    "start_time",
    "stop_time",
    "tags",
    "target",
];

/// v1 option names still accepted, with their v2 replacement.
const RENAMED_OPTIONS: &[(&str, &str)] = &[
    ("dontfrag", "dont_fragment"),
    ("maxhops", "max_hops"),
    ("firsthop", "first_hop"),
    ("use_NSID", "set_nsid_bit"),
    ("cd", "set_cd_bit"),
    ("do", "set_do_bit"),
    ("qbuf", "include_qbuf"),
    ("recursion_desired", "set_rd_bit"),
    ("noabuf", "include_abuf"),
];

/// The kind of measurement to schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementType {
    /// ICMP echo.
    Ping,
    /// Path discovery.
    Traceroute,
    /// DNS query.
    Dns,
    /// TLS certificate retrieval.
    Sslcert,
    /// NTP query.
    Ntp,
    /// HTTP request (anchors only).
    Http,
}

impl MeasurementType {
    /// Returns the type as the API spells it.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Traceroute => "traceroute",
            Self::Dns => "dns",
            Self::Sslcert => "sslcert",
            Self::Ntp => "ntp",
            Self::Http => "http",
        }
    }

    /// Options that must be set for this type.
    #[must_use]
    pub const fn required_options(&self) -> &'static [&'static str] {
        match self {
            Self::Ping | Self::Sslcert | Self::Ntp | Self::Http => {
                &["description", "af", "target"]
            }
            Self::Traceroute => &["description", "af", "target", "protocol", "packets"],
            Self::Dns => &[
                "description",
                "af",
                "query_class",
                "query_type",
                "query_argument",
            ],
        }
    }

    /// Options only this type accepts, on top of the common ones.
    #[must_use]
    pub const fn specific_options(&self) -> &'static [&'static str] {
        match self {
            Self::Ping => &["packets", "size", "packet_interval", "include_probe_id"],
            Self::Traceroute => &[
                "protocol",
                "packets",
                "paris",
                "size",
                "first_hop",
                "max_hops",
                "dont_fragment",
                "port",
                "timeout",
                "response_timeout",
                "duplicate_timeout",
                "destination_option_size",
                "hop_by_hop_option_size",
            ],
            Self::Dns => &[
                "query_class",
                "query_type",
                "query_argument",
                "protocol",
                "use_probe_resolver",
                "set_nsid_bit",
                "set_cd_bit",
                "set_do_bit",
                "set_rd_bit",
                "include_qbuf",
                "include_abuf",
                "udp_payload_size",
                "retry",
                "prepend_probe_id",
                "use_macros",
                "timeout",
                "tls",
                "port",
            ],
            Self::Sslcert => &["port", "hostname"],
            Self::Ntp => &["packets", "timeout"],
            Self::Http => &[
                "method",
                "path",
                "query_string",
                "port",
                "header_bytes",
                "version",
                "extended_timing",
                "more_extended_timing",
            ],
        }
    }

    fn accepts(self, option: &str) -> bool {
        COMMON_OPTIONS.contains(&option) || self.specific_options().contains(&option)
    }
}

impl std::fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns the v2 name of an option, which is the name itself unless it is a
/// v1 name.
fn current_name(option: &str) -> &str {
    RENAMED_OPTIONS
        .iter()
        .find(|(old, _)| *old == option)
        .map_or(option, |(_, renamed)| *renamed)
}

/// Translates a v1 option to its v2 name and value.
///
/// `noabuf` became `include_abuf`, so its value flips.
fn translate_option(option: &str, value: &Value) -> (String, Value) {
    let renamed = current_name(option);
    if renamed == option {
        return (option.to_string(), value.clone());
    }
    warn!(option, renamed, "measurement option is deprecated");

    let value = match (option, value) {
        ("noabuf", Value::Bool(flag)) => Value::Bool(!flag),
        _ => value.clone(),
    };
    (renamed.to_string(), value)
}

/// One measurement definition of a create request.
///
/// Options are checked against a fixed per-type allow-list; anything else is
/// reported by [`MeasurementDefinition::validate`].
///
/// ```
/// use cousteau_types::{MeasurementDefinition, MeasurementType};
///
/// let ping = MeasurementDefinition::new(MeasurementType::Ping)
///     .option("target", "www.ripe.net")
///     .option("af", 4)
///     .option("description", "testing");
/// let body = ping.build_api_struct().unwrap();
/// assert_eq!(body["type"], "ping");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementDefinition {
    kind: MeasurementType,
    options: BTreeMap<String, Value>,
}

impl MeasurementDefinition {
    /// Creates a definition with no options set.
    #[must_use]
    pub const fn new(kind: MeasurementType) -> Self {
        Self {
            kind,
            options: BTreeMap::new(),
        }
    }

    /// Sets an option, replacing any previous value.
    #[must_use]
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Returns the measurement type.
    #[must_use]
    pub const fn kind(&self) -> MeasurementType {
        self.kind
    }

    /// Returns the value of an option as it was set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Checks the definition without building it.
    ///
    /// # Errors
    ///
    /// Returns every rule the definition breaks.
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();

        for required in self.kind.required_options() {
            let present = self
                .options
                .iter()
                .any(|(name, value)| !value.is_null() && current_name(name) == *required);
            if !present {
                violations.push(format!(
                    "{} measurement field <{required}> is required",
                    self.kind
                ));
            }
        }

        for name in self.options.keys() {
            if !self.kind.accepts(current_name(name)) {
                violations.push(format!(
                    "unknown option <{name}> for {} measurements",
                    self.kind
                ));
            }
        }

        if let Some(af) = self.options.get("af")
            && !af.is_null()
            && af.as_u64() != Some(4)
            && af.as_u64() != Some(6)
        {
            violations.push(format!("field <af> should be 4 or 6, got {af}"));
        }

        violations.into_result()
    }

    /// Validates the definition and returns it in the structure the API accepts.
    ///
    /// # Errors
    ///
    /// Returns [`CousteauError::MalformedMeasurement`] if validation fails.
    pub fn build_api_struct(&self) -> Result<Value, CousteauError> {
        self.validate().map_err(CousteauError::MalformedMeasurement)?;

        let mut data = Map::new();
        data.insert("type".into(), Value::String(self.kind.as_str().to_string()));
        for (name, value) in &self.options {
            let (name, value) = translate_option(name, value);
            data.insert(name, value);
        }
        Ok(Value::Object(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ping_struct() {
        let ping = MeasurementDefinition::new(MeasurementType::Ping)
            .option("target", "testing")
            .option("af", 6)
            .option("description", "testing");

        assert_eq!(
            ping.build_api_struct().unwrap(),
            json!({"type": "ping", "af": 6, "description": "testing", "target": "testing"})
        );
    }

    #[test]
    fn test_missing_required_options() {
        let traceroute = MeasurementDefinition::new(MeasurementType::Traceroute)
            .option("target", "www.ripe.net")
            .option("af", 4)
            .option("description", "testing");

        let violations = traceroute.validate().unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(violations.messages()[0].contains("<protocol>"));
        assert!(violations.messages()[1].contains("<packets>"));
    }

    #[test]
    fn test_null_required_option_is_missing() {
        let ping = MeasurementDefinition::new(MeasurementType::Ping)
            .option("target", Value::Null)
            .option("af", 4)
            .option("description", "testing");
        assert!(ping.validate().is_err());
    }

    #[test]
    fn test_unknown_option_rejected() {
        let ping = MeasurementDefinition::new(MeasurementType::Ping)
            .option("target", "www.ripe.net")
            .option("af", 4)
            .option("description", "testing")
            .option("query_type", "A");

        let violations = ping.validate().unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            ping.build_api_struct(),
            Err(CousteauError::MalformedMeasurement(_))
        ));
    }

    #[test]
    fn test_invalid_address_family() {
        let ping = MeasurementDefinition::new(MeasurementType::Ping)
            .option("target", "www.ripe.net")
            .option("af", 5)
            .option("description", "testing");
        assert!(ping.validate().is_err());
    }

    #[test]
    fn test_v1_options_translated() {
        let dns = MeasurementDefinition::new(MeasurementType::Dns)
            .option("af", 4)
            .option("description", "testing")
            .option("query_class", "IN")
            .option("query_type", "A")
            .option("query_argument", "ripe.net")
            .option("use_NSID", true)
            .option("noabuf", true);

        let body = dns.build_api_struct().unwrap();
        assert_eq!(body["set_nsid_bit"], json!(true));
        assert_eq!(body["include_abuf"], json!(false));
        assert!(body.get("use_NSID").is_none());
        assert!(body.get("noabuf").is_none());
    }

    #[test]
    fn test_renamed_required_option_counts() {
        let traceroute = MeasurementDefinition::new(MeasurementType::Traceroute)
            .option("target", "www.ripe.net")
            .option("af", 4)
            .option("description", "testing")
            .option("protocol", "ICMP")
            .option("packets", 3)
            .option("maxhops", 16);

        let body = traceroute.build_api_struct().unwrap();
        assert_eq!(body["max_hops"], json!(16));
    }

    #[test]
    fn test_v1_option_checked_against_type() {
        let ping = MeasurementDefinition::new(MeasurementType::Ping)
            .option("target", "www.ripe.net")
            .option("af", 4)
            .option("description", "testing")
            .option("maxhops", 16);
        let violations = ping.validate().unwrap_err();
        assert_eq!(
            violations.messages(),
            ["unknown option <maxhops> for ping measurements"]
        );

        let traceroute = MeasurementDefinition::new(MeasurementType::Traceroute)
            .option("target", "www.ripe.net")
            .option("af", 4)
            .option("description", "testing")
            .option("protocol", "ICMP")
            .option("packets", 3)
            .option("use_NSID", true);
        assert!(matches!(
            traceroute.build_api_struct(),
            Err(CousteauError::MalformedMeasurement(_))
        ));
    }

    #[test]
    fn test_current_name() {
        assert_eq!(current_name("maxhops"), "max_hops");
        assert_eq!(current_name("noabuf"), "include_abuf");
        assert_eq!(current_name("max_hops"), "max_hops");
    }
}
