use crate::errors::{NoCrmError, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw JSON object as returned by the API (pipelines, steps, lead payloads).
pub type Record = Map<String, Value>;

/// A sales opportunity tracked by NoCRM.
///
/// `id`, `created_at` and `updated_at` are assigned by the server: they are
/// filled in when decoding a response and never written to a request body.
/// Keys the API returns that are not listed here are dropped on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Lead title; validation wants at least 3 characters once trimmed.
    pub title: String,
    /// Current status; matches the name of a pipeline step.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expected deal value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Closing probability, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "timestamp::serialize",
        deserialize_with = "timestamp::deserialize"
    )]
    pub expected_closing_date: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Record>,
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    #[serde(default, skip_serializing, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing, deserialize_with = "timestamp::deserialize")]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl Lead {
    /// Every key the codec understands, in declaration order.
    pub const FIELDS: [&'static str; 11] = [
        "title",
        "status",
        "contact_name",
        "description",
        "amount",
        "probability",
        "expected_closing_date",
        "custom_fields",
        "id",
        "created_at",
        "updated_at",
    ];

    /// Keys that only the server may set.
    pub const SERVER_FIELDS: [&'static str; 3] = ["id", "created_at", "updated_at"];

    /// A client-side lead with no identifier yet.
    pub fn new(title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: status.into(),
            contact_name: None,
            description: None,
            amount: None,
            probability: None,
            expected_closing_date: None,
            custom_fields: None,
            id: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_contact_name(mut self, contact_name: impl Into<String>) -> Self {
        self.contact_name = Some(contact_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_probability(mut self, probability: i64) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn with_expected_closing_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.expected_closing_date = Some(date);
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Decodes a lead from a JSON object.
    ///
    /// Unknown keys are ignored; timestamps are parsed, with a trailing `Z`
    /// read as `+00:00`. A malformed timestamp or a missing title/status is
    /// a `NoCrmError::Decode`.
    pub fn from_record(record: Record) -> Result<Self> {
        Self::from_value(Value::Object(record))
    }

    /// Decodes a lead from any JSON value; non-objects are rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(NoCrmError::Decode(format!(
                "Expected a lead object, got: {}",
                value
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| NoCrmError::Decode(format!("Failed to decode lead: {}", e)))
    }

    /// Encodes the lead as a request body.
    ///
    /// Absent fields and server-owned fields are omitted; timestamps are
    /// rendered as RFC 3339 strings. Keys keep declaration order. A NaN or
    /// infinite amount is a `NoCrmError::Decode`.
    pub fn to_record(&self) -> Result<Record> {
        // serde_json would write a non-finite float as null
        if let Some(amount) = self.amount.filter(|amount| !amount.is_finite()) {
            return Err(NoCrmError::Decode(format!(
                "Lead amount {} cannot be encoded as JSON",
                amount
            )));
        }
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(NoCrmError::Decode(format!(
                "Lead did not encode to an object: {}",
                other
            ))),
        }
    }
}

/// ISO-8601 timestamp handling for the lead's date fields.
pub mod timestamp {
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// Parses an ISO-8601 timestamp.
    ///
    /// Accepts an explicit offset or a `Z` suffix. Naive date-times and bare
    /// dates carry no offset and are read as UTC.
    pub fn parse(raw: &str) -> Result<DateTime<FixedOffset>, String> {
        let raw = raw.trim();
        let normalized = match raw.strip_suffix('Z') {
            Some(stripped) => format!("{}+00:00", stripped),
            None => raw.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return Ok(dt);
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
                return Ok(DateTime::<FixedOffset>::from(naive.and_utc()));
            }
        }
        NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| DateTime::<FixedOffset>::from(naive.and_utc()))
            .ok_or_else(|| format!("invalid ISO-8601 timestamp '{}'", raw))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse(&raw).map(Some).map_err(de::Error::custom),
            _ => Ok(None),
        }
    }

    pub fn serialize<S>(value: &Option<DateTime<FixedOffset>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}
