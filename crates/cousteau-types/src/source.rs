//! Probe source payloads for measurement creation and participant changes.

use std::str::FromStr;

use serde_json::{Map, Value, json};

use crate::{CousteauError, Violations};

/// How a source selects probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// A named area such as `WW` or `West`.
    Area,
    /// An ISO country code.
    Country,
    /// An IP prefix.
    Prefix,
    /// An autonomous system number.
    Asn,
    /// An explicit comma-separated probe id list.
    Probes,
    /// The probes of another measurement.
    Msm,
}

impl SourceType {
    /// Returns the type as the API spells it.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::Country => "country",
            Self::Prefix => "prefix",
            Self::Asn => "asn",
            Self::Probes => "probes",
            Self::Msm => "msm",
        }
    }

    /// Returns all source types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Area,
            Self::Country,
            Self::Prefix,
            Self::Asn,
            Self::Probes,
            Self::Msm,
        ]
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = CousteauError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let mut violations = Violations::new();
                violations.push(format!(
                    "source type '{s}' should be one of area, country, prefix, asn, probes, msm"
                ));
                CousteauError::MalformedSource(violations)
            })
    }
}

/// Whether a participation request adds or removes probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceAction {
    /// Add probes to the measurement.
    Add,
    /// Remove probes from the measurement.
    Remove,
}

impl SourceAction {
    /// Returns the action as the API spells it.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl std::fmt::Display for SourceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceAction {
    type Err = CousteauError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => {
                let mut violations = Violations::new();
                violations.push(format!("source action '{s}' should be 'add' or 'remove'"));
                Err(CousteauError::MalformedSource(violations))
            }
        }
    }
}

/// Probe tag constraints of a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTags {
    /// Tags every selected probe must carry.
    pub include: Vec<String>,
    /// Tags no selected probe may carry.
    pub exclude: Vec<String>,
}

/// A set of probes requested for a new measurement.
///
/// ```
/// use cousteau_types::{AtlasSource, SourceType};
///
/// let source = AtlasSource::new(SourceType::Area, "WW", 5);
/// let body = source.build_api_struct().unwrap();
/// assert_eq!(body["requested"], 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasSource {
    kind: SourceType,
    value: String,
    requested: u32,
    tags: Option<SourceTags>,
}

impl AtlasSource {
    /// Creates a source.
    #[must_use]
    pub fn new(kind: SourceType, value: impl Into<String>, requested: u32) -> Self {
        Self {
            kind,
            value: value.into(),
            requested,
            tags: None,
        }
    }

    /// Restricts the selection by probe tags.
    #[must_use]
    pub fn with_tags(mut self, tags: SourceTags) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Returns the source type.
    #[must_use]
    pub const fn kind(&self) -> SourceType {
        self.kind
    }

    /// Returns the source value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the number of requested probes.
    #[must_use]
    pub const fn requested(&self) -> u32 {
        self.requested
    }

    /// Returns the tag constraints.
    #[must_use]
    pub const fn tags(&self) -> Option<&SourceTags> {
        self.tags.as_ref()
    }

    fn collect_violations(&self, violations: &mut Violations) {
        if self.requested == 0 {
            violations.push("field 'requested' should be a positive number of probes");
        }
        if self.value.trim().is_empty() {
            violations.push("field 'value' is required");
        }
    }

    /// Checks the source without building it.
    ///
    /// # Errors
    ///
    /// Returns every rule the source breaks.
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        self.collect_violations(&mut violations);
        violations.into_result()
    }

    /// Validates the source and returns it in the structure the API accepts.
    ///
    /// # Errors
    ///
    /// Returns [`CousteauError::MalformedSource`] if validation fails.
    pub fn build_api_struct(&self) -> Result<Value, CousteauError> {
        self.validate().map_err(CousteauError::MalformedSource)?;
        Ok(self.api_struct())
    }

    fn api_struct(&self) -> Value {
        let mut data = Map::new();
        data.insert("type".into(), json!(self.kind.as_str()));
        data.insert("requested".into(), json!(self.requested));
        data.insert("value".into(), json!(self.value));
        if let Some(tags) = &self.tags {
            data.insert(
                "tags".into(),
                json!({"include": tags.include, "exclude": tags.exclude}),
            );
        }
        Value::Object(data)
    }
}

/// A change to the probes participating in a running measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSource {
    action: SourceAction,
    source: AtlasSource,
}

impl ChangeSource {
    /// Creates a change source.
    #[must_use]
    pub fn new(
        action: SourceAction,
        kind: SourceType,
        value: impl Into<String>,
        requested: u32,
    ) -> Self {
        Self {
            action,
            source: AtlasSource::new(kind, value, requested),
        }
    }

    /// Returns the action.
    #[must_use]
    pub const fn action(&self) -> SourceAction {
        self.action
    }

    /// Returns the underlying probe selection.
    #[must_use]
    pub const fn source(&self) -> &AtlasSource {
        &self.source
    }

    /// Checks the change source without building it.
    ///
    /// Removal is only possible by explicit probe list.
    ///
    /// # Errors
    ///
    /// Returns every rule the source breaks.
    pub fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        if self.action == SourceAction::Remove && self.source.kind != SourceType::Probes {
            violations.push("source type should always be 'probes' when action is 'remove'");
        }
        self.source.collect_violations(&mut violations);
        violations.into_result()
    }

    /// Validates the change source and returns it in the structure the API accepts.
    ///
    /// # Errors
    ///
    /// Returns [`CousteauError::MalformedSource`] if validation fails.
    pub fn build_api_struct(&self) -> Result<Value, CousteauError> {
        self.validate().map_err(CousteauError::MalformedSource)?;
        let mut data = self.source.api_struct();
        if let Value::Object(map) = &mut data {
            map.insert("action".into(), json!(self.action.as_str()));
        }
        Ok(data)
    }
}
