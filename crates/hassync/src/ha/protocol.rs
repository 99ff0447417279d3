//! Message types for the Home Assistant WebSocket API.
//!
//! Only the handful of message types needed to read the device, entity and
//! area registries and to rename devices are modelled here.
//!
//! Wire shape:
//! - Every message is a JSON object with a `type` discriminant
//! - The auth exchange carries no `id`
//! - Commands carry an integer `id`, echoed back in the matching `result`

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConnectionError;

/// Messages sent before the session is authenticated.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMessage {
    Auth { access_token: String },
}

/// Commands issued once the session is authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "config/device_registry/list")]
    DeviceRegistryList,

    #[serde(rename = "config/entity_registry/list")]
    EntityRegistryList,

    #[serde(rename = "config/area_registry/list")]
    AreaRegistryList,

    /// Set the user-facing name of a device.
    #[serde(rename = "config/device_registry/update")]
    DeviceRegistryUpdate {
        device_id: String,
        name_by_user: String,
    },
}

impl Command {
    /// Encode this command as a request frame carrying `id`.
    pub fn to_frame(&self, id: u64) -> Result<String, ConnectionError> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("id".to_string(), id.into());
        }
        Ok(serde_json::to_string(&value)?)
    }
}

/// Messages received from the remote.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Incoming {
    /// Unsolicited greeting sent as soon as the socket opens.
    AuthRequired {
        #[serde(default)]
        ha_version: Option<String>,
    },

    AuthOk {
        #[serde(default)]
        ha_version: Option<String>,
    },

    AuthInvalid {
        #[serde(default)]
        message: Option<String>,
    },

    Result(ResultEnvelope),

    /// Subscription event; never requested by this client but tolerated.
    Event {
        #[serde(default)]
        id: Option<u64>,
    },

    #[serde(other)]
    Unknown,
}

impl Incoming {
    pub fn parse(frame: &str) -> Result<Self, ConnectionError> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// Reply to a [`Command`], correlated by `id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultEnvelope {
    pub id: u64,

    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub result: Option<serde_json::Value>,

    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ResultEnvelope {
    /// Decode the `result` payload of a successful list query.
    ///
    /// A missing or null payload decodes as an empty list.
    pub fn into_list<T>(self) -> Result<Vec<T>, ConnectionError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.result {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// The remote's error message, if it sent one.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.message.as_deref())
    }
}
