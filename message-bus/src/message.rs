//! CloudEvents envelope (structured JSON mode)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// CloudEvents version produced by this crate
pub const SPEC_VERSION: &str = "1.0";

/// Content type of JSON event data
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// CloudEvent envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    /// Specification version
    pub specversion: String,

    /// Event id, unique per source
    pub id: String,

    /// Event producer
    pub source: String,

    /// Event type
    #[serde(rename = "type")]
    pub event_type: String,

    /// Subject within the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Production time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    /// Content type of `data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,

    /// Event payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Extension attributes
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl CloudEvent {
    /// Create an event with a fresh id, the current time and JSON data
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            specversion: SPEC_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            subject: None,
            time: Some(Utc::now()),
            datacontenttype: Some(JSON_CONTENT_TYPE.to_string()),
            data: Some(data),
            extensions: BTreeMap::new(),
        }
    }

    /// Set subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add a string extension attribute
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions
            .insert(name.into(), serde_json::Value::String(value.into()));
        self
    }

    /// String extension attribute
    pub fn extension(&self, name: &str) -> Option<&str> {
        self.extensions.get(name).and_then(|v| v.as_str())
    }

    /// Deserialize `data` into a typed payload
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .data
            .clone()
            .ok_or_else(|| Error::InvalidEvent(format!("event {} has no data", self.id)))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from bytes, rejecting envelopes without required attributes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let event: CloudEvent = serde_json::from_slice(bytes)?;

        if event.id.is_empty() {
            return Err(Error::InvalidEvent("missing id".to_string()));
        }
        if event.source.is_empty() {
            return Err(Error::InvalidEvent("missing source".to_string()));
        }
        if event.event_type.is_empty() {
            return Err(Error::InvalidEvent("missing type".to_string()));
        }

        Ok(event)
    }
}
