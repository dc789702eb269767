//! Listing filters and their query-string encoding.

use chrono::{DateTime, Utc};

/// A single filter value as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Passed through verbatim.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Boolean value, encoded as `true`/`false`.
    Bool(bool),
    /// Point in time, encoded as UNIX epoch seconds.
    DateTime(DateTime<Utc>),
    /// Sequence, encoded as comma-joined values.
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Reduces the value to the string the API expects in a query string.
    ///
    /// Malformed values are not rejected; whatever the caller passed is
    /// encoded and left for the server to judge.
    ///
    /// # Example
    ///
    /// ```
    /// use cousteau_types::FilterValue;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let ids = FilterValue::from(vec![1, 2, 3]);
    /// assert_eq!(ids.normalize(), "1,2,3");
    ///
    /// let since = FilterValue::from(Utc.with_ymd_and_hms(2015, 10, 16, 0, 0, 0).unwrap());
    /// assert_eq!(since.normalize(), "1444953600");
    /// ```
    #[must_use]
    pub fn normalize(&self) -> String {
        match self {
            Self::Str(value) => value.clone(),
            Self::Int(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::DateTime(value) => value.timestamp().to_string(),
            Self::List(values) => values
                .iter()
                .map(Self::normalize)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Str(value.to_string()), Self::Int)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Insertion-ordered set of `name=value` listing filters.
///
/// Order matters only for the shape of the generated query string; the API
/// itself does not care.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, FilterValue)>,
}

impl Filters {
    /// Creates an empty filter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a filter, replacing an existing one with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FilterValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`Filters::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Removes a filter, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FilterValue> {
        let index = self.entries.iter().position(|(existing, _)| existing == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns the value of a filter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Returns true if the filter is set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over the filters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the filters as normalized `(name, value)` string pairs.
    #[must_use]
    pub fn normalized(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.clone(), value.normalize()))
            .collect()
    }

    /// Returns the number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Self::new();
        for (name, value) in iter {
            filters.insert(name, value);
        }
        filters
    }
}
