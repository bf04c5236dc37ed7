//! Job parameters: the read-only per-run context handed to every step.

use chrono::NaiveDate;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar job parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobParameter {
    /// A boolean flag.
    Bool(bool),
    /// An integer.
    Long(i64),
    /// A floating point number.
    Double(f64),
    /// A calendar date.
    Date(NaiveDate),
    /// Free text.
    String(String),
}

impl JobParameter {
    /// Parses `raw` as the type named by `kind` (`string`, `long`,
    /// `double`, `date` or `bool`, case-insensitive). Dates are ISO
    /// `YYYY-MM-DD`. Returns `None` for an unknown kind or a value that does
    /// not parse.
    #[must_use]
    pub fn parse_as(kind: &str, raw: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String(raw.to_string())),
            "long" => raw.parse().ok().map(Self::Long),
            "double" => raw.parse().ok().map(Self::Double),
            "date" => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Self::Date),
            "bool" | "boolean" => raw.parse().ok().map(Self::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for JobParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// Parameters identifying one run of a job.
///
/// Keys are kept sorted so the instance key is stable regardless of the
/// order parameters were added in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    #[serde(flatten)]
    values: BTreeMap<String, JobParameter>,
}

impl JobParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: JobParameter) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a string parameter.
    #[must_use]
    pub fn with_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(key, JobParameter::String(value.into()))
    }

    /// Adds an integer parameter.
    #[must_use]
    pub fn with_long(self, key: impl Into<String>, value: i64) -> Self {
        self.with(key, JobParameter::Long(value))
    }

    /// Adds a boolean parameter.
    #[must_use]
    pub fn with_bool(self, key: impl Into<String>, value: bool) -> Self {
        self.with(key, JobParameter::Bool(value))
    }

    /// Adds a date parameter.
    #[must_use]
    pub fn with_date(self, key: impl Into<String>, value: NaiveDate) -> Self {
        self.with(key, JobParameter::Date(value))
    }

    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: JobParameter) {
        self.values.insert(key.into(), value);
    }

    /// Parses a `key=value` pair as given on a command line.
    ///
    /// Untyped values stay strings, so `requestDate=20240101` is the string
    /// `"20240101"`. A type may be named in parentheses after the key, as in
    /// `run.id(long)=7` or `day(date)=2024-03-01`.
    ///
    /// Returns `None` when the input has no `=`, an empty key, an unknown
    /// type or a value that does not parse as the named type.
    #[must_use]
    pub fn parse_pair(pair: &str) -> Option<(String, JobParameter)> {
        let (key, value) = pair.split_once('=')?;
        let (key, value) = (key.trim(), value.trim());
        let (key, parameter) = match key.strip_suffix(')').and_then(|k| k.split_once('(')) {
            Some((name, kind)) => (name.trim(), JobParameter::parse_as(kind.trim(), value)?),
            None => (key, JobParameter::String(value.to_string())),
        };
        if key.is_empty() {
            return None;
        }
        Some((key.to_string(), parameter))
    }

    /// Returns a parameter by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JobParameter> {
        self.values.get(key)
    }

    /// Returns a string parameter.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            JobParameter::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns an integer parameter.
    #[must_use]
    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            JobParameter::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a boolean parameter. The strings `"true"` and `"false"`
    /// count as booleans so untyped command-line flags work.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            JobParameter::Bool(v) => Some(*v),
            JobParameter::String(v) => v.parse().ok(),
            _ => None,
        }
    }

    /// Returns a date parameter.
    #[must_use]
    pub fn get_date(&self, key: &str) -> Option<NaiveDate> {
        match self.values.get(key)? {
            JobParameter::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobParameter)> {
        self.values.iter()
    }

    /// Renders the parameters as `key=value;` pairs in key order.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{k}={v};"))
            .collect()
    }

    /// Returns the MD5 hex digest identifying the job instance these
    /// parameters belong to.
    #[must_use]
    pub fn instance_key(&self) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.to_canonical_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl FromIterator<(String, JobParameter)> for JobParameters {
    fn from_iter<T: IntoIterator<Item = (String, JobParameter)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_as_kinds() {
        assert_eq!(JobParameter::parse_as("long", "42"), Some(JobParameter::Long(42)));
        assert_eq!(JobParameter::parse_as("BOOL", "true"), Some(JobParameter::Bool(true)));
        assert_eq!(
            JobParameter::parse_as("date", "2024-03-01"),
            Some(JobParameter::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
        );
        assert_eq!(JobParameter::parse_as("long", "abc"), None);
        assert_eq!(JobParameter::parse_as("uuid", "x"), None);
    }

    #[test]
    fn test_parse_pair_keeps_untyped_values_as_strings() {
        let params: JobParameters = ["requestDate=20240301", "forceFailure=true"]
            .into_iter()
            .filter_map(JobParameters::parse_pair)
            .collect();

        assert_eq!(params.get_string("requestDate"), Some("20240301"));
        assert_eq!(params.get_long("requestDate"), None);
        assert_eq!(params.get_bool("forceFailure"), Some(true));
    }

    #[test]
    fn test_parse_pair_with_type() {
        let (key, value) = JobParameters::parse_pair("run.id(long)=7").unwrap();
        assert_eq!(key, "run.id");
        assert_eq!(value, JobParameter::Long(7));

        assert!(JobParameters::parse_pair("run.id(long)=seven").is_none());
        assert!(JobParameters::parse_pair("no-equals").is_none());
        assert!(JobParameters::parse_pair("=value").is_none());
        assert!(JobParameters::parse_pair("(long)=1").is_none());
    }

    #[test]
    fn test_typed_getters() {
        let params = JobParameters::new()
            .with_string("name", "kim")
            .with_long("id", 5)
            .with_bool("force", true);

        assert_eq!(params.get_string("name"), Some("kim"));
        assert_eq!(params.get_long("id"), Some(5));
        assert_eq!(params.get_bool("force"), Some(true));
        assert_eq!(params.get_long("name"), None);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_instance_key_ignores_insertion_order() {
        let a = JobParameters::new().with_long("a", 1).with_string("b", "x");
        let b = JobParameters::new().with_string("b", "x").with_long("a", 1);

        assert_eq!(a.to_canonical_string(), "a=1;b=x;");
        assert_eq!(a.instance_key(), b.instance_key());
        assert_eq!(a.instance_key().len(), 32);
    }

    #[test]
    fn test_instance_key_differs_by_value() {
        let a = JobParameters::new().with_long("a", 1);
        let b = JobParameters::new().with_long("a", 2);
        assert_ne!(a.instance_key(), b.instance_key());
    }

    #[test]
    fn test_serialize_flat() {
        let params = JobParameters::new().with_string("requestDate", "today");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"requestDate": "today"}));
    }
}
