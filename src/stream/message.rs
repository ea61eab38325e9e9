//! Progress message data model
//!
//! One `Message` is decoded per JSON object in the input stream. Every field
//! is optional on the wire; absent, `null`, zero and empty values all mean
//! "unset".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::render::progress::RenderContext;

/// Error code the producer uses to signal missing credentials
pub const AUTHENTICATION_REQUIRED_CODE: i64 = 401;

/// Structured failure attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    /// Producer-defined error code
    #[serde(deserialize_with = "null_as_default")]
    pub code: i64,
    /// Human-readable error text
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
}

/// Progress of one in-flight operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    /// Amount of work done so far
    #[serde(deserialize_with = "null_as_default")]
    pub current: i64,
    /// Total amount of work (`<= 0` when unknown)
    #[serde(deserialize_with = "null_as_default")]
    pub total: i64,
    /// Epoch seconds when the operation started (0 when unset)
    #[serde(deserialize_with = "null_as_default")]
    pub start: i64,
    /// Suppress the `current/total` counters
    #[serde(rename = "hidecounts", deserialize_with = "null_as_default")]
    pub hide_counts: bool,
    /// Unit label; empty means bytes
    #[serde(deserialize_with = "null_as_default")]
    pub units: String,
    /// Width and clock used when formatting; bound by the display loop
    #[serde(skip)]
    pub context: RenderContext,
}

impl Progress {
    /// Create a progress record for `current` out of `total` bytes
    #[must_use]
    pub fn new(current: i64, total: i64) -> Self {
        Self {
            current,
            total,
            ..Self::default()
        }
    }
}

/// A single decoded progress, status or error event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    /// Raw output chunk (e.g. build step output)
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub stream: String,
    /// Short status text ("Downloading", "Pull complete", ...)
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Structured progress
    #[serde(rename = "progressDetail", skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    /// Pre-rendered progress text sent by older producers
    #[serde(
        rename = "progress",
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub progress_message: String,
    /// Operation identifier (e.g. a layer digest prefix)
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Source-of-origin tag
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub from: String,
    /// Timestamp in epoch seconds
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub time: i64,
    /// Timestamp in epoch nanoseconds; preferred over `time`
    #[serde(
        rename = "timeNano",
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_zero"
    )]
    pub time_nano: i64,
    /// Structured failure
    #[serde(rename = "errorDetail", skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Failure text sent by older producers
    #[serde(
        rename = "error",
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub error_message: String,
    /// Out-of-band payload, never displayed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux: Option<Value>,
}

impl Message {
    /// Create a plain status message
    #[must_use]
    pub fn status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            ..Self::default()
        }
    }

    /// Create a progress message for operation `id`
    #[must_use]
    pub fn progress(id: &str, status: &str, progress: Progress) -> Self {
        Self {
            id: id.to_string(),
            status: status.to_string(),
            progress: Some(progress),
            ..Self::default()
        }
    }

    /// The failure this message reports, if any.
    ///
    /// `errorDetail` wins over the bare `error` text. Code 401 always maps to
    /// [`Error::AuthenticationRequired`], whatever text came with it.
    #[must_use]
    pub fn failure(&self) -> Option<Error> {
        if let Some(detail) = &self.error {
            if detail.code == AUTHENTICATION_REQUIRED_CODE {
                return Some(Error::AuthenticationRequired);
            }
            return Some(Error::Operation {
                code: detail.code,
                message: detail.message.clone(),
            });
        }
        if self.error_message.is_empty() {
            None
        } else {
            Some(Error::Operation {
                code: 0,
                message: self.error_message.clone(),
            })
        }
    }

    /// Whether the message carries structured or pre-rendered progress
    #[must_use]
    pub fn has_progress_content(&self) -> bool {
        self.progress.is_some() || !self.progress_message.is_empty()
    }

    /// Whether the message occupies a pinned row in the live grid
    #[must_use]
    pub fn is_grid_participant(&self) -> bool {
        !self.id.is_empty() && self.has_progress_content()
    }

    /// The message timestamp, nanosecond resolution preferred
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if self.time_nano != 0 {
            Some(DateTime::from_timestamp_nanos(self.time_nano))
        } else if self.time != 0 {
            DateTime::from_timestamp(self.time, 0)
        } else {
            None
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Treat an explicit JSON `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
