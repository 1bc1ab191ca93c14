//! Push delivery envelope, attribute filter and payload decoding.
//!
//! Every pipeline subscribed to the shared topic receives every upload event.
//! The `file_type` attribute decides which pipeline acts on it; the others
//! acknowledge without doing any work.
//!
//! ```json
//! {
//!   "message": {
//!     "attributes": {"file_type": "csv"},
//!     "data": "eyJidWNrZXQiOiAiYjEiLCAibmFtZSI6ICJzYWxlc18yMDI0LmNzdiJ9",
//!     "messageId": "2070443601311540"
//!   },
//!   "subscription": "projects/p/subscriptions/sales"
//! }
//! ```
use crate::errors::MalformedEventError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use std::collections::HashMap;

pub const FILE_TYPE_ATTRIBUTE: &str = "file_type";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PushRequest {
    pub message: PubSubMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

impl PushRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, MalformedEventError> {
        serde_json::from_slice(body).map_err(MalformedEventError::Envelope)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PubSubMessage {
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    // base64 encoded payload
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub publish_time: Option<String>,
}

/// The object whose upload triggered the event.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new<B, N>(bucket: B, name: N) -> Self
    where
        B: Into<String>,
        N: Into<String>,
    {
        ObjectRef {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// Storage locator in the `<scheme>://<bucket>/<object>` form used by the loader.
    pub fn locator(&self, scheme: &str) -> String {
        format!("{scheme}://{}/{}", self.bucket, self.name)
    }
}

/// Returns true when the message carries the expected `file_type` tag.
pub fn accepts(attributes: &HashMap<String, String>, expected: &str) -> bool {
    attributes
        .get(FILE_TYPE_ATTRIBUTE)
        .is_some_and(|file_type| file_type == expected)
}

/// Decodes the `data` field: base64, then UTF-8, then a JSON object that must
/// name both the bucket and the object.
pub fn decode_payload(message: &PubSubMessage) -> Result<ObjectRef, MalformedEventError> {
    let data = message
        .data
        .as_deref()
        .ok_or(MalformedEventError::MissingData)?;

    let decoded = STANDARD.decode(data.trim())?;
    let text = String::from_utf8(decoded)?;

    serde_json::from_str(&text).map_err(MalformedEventError::Body)
}

#[cfg(test)]
pub(crate) fn test_message(file_type: Option<&str>, body: Option<&str>) -> PubSubMessage {
    PubSubMessage {
        attributes: file_type
            .map(|t| HashMap::from([(FILE_TYPE_ATTRIBUTE.to_string(), t.to_string())]))
            .unwrap_or_default(),
        data: body.map(|b| STANDARD.encode(b)),
        message_id: Some("1".into()),
        publish_time: None,
    }
}
