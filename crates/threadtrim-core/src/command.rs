//! Inbound command parsing and the structured response envelope.
//!
//! Messages arrive as loosely typed JSON from the popup. Parsing is strict and
//! never partially applies: a message either becomes a [`Request`] or is
//! rejected with a [`ValidationError`] before any state is touched. Budgets
//! outside the allowed range are rejected, not clamped.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::preferences::{MAX_TARGET_BUDGET, MIN_TARGET_BUDGET, SurfaceToggles};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message must be a JSON object")]
    NotAnObject,

    #[error("message is missing a string `type` field")]
    MissingType,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` is {value}, expected {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: u32,
        max: u32,
    },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::NotAnObject | ValidationError::MissingType => "malformed",
            ValidationError::UnknownCommand(_) => "unknown-command",
            ValidationError::InvalidField { .. } => "invalid-field",
            ValidationError::OutOfRange { .. } => "out-of-range",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyWindowParams {
    pub target_budget: u32,
    pub enabled: bool,
    /// Omitted toggles keep whatever the store already holds.
    pub surfaces: Option<SurfaceToggles>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ApplyWindow(ApplyWindowParams),
    GetStatus,
    DebugScan,
    Restore,
}

impl Request {
    pub fn parse(message: &Value) -> Result<Self, ValidationError> {
        let object = message.as_object().ok_or(ValidationError::NotAnObject)?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingType)?;

        match kind {
            "apply-window" => Ok(Request::ApplyWindow(parse_apply_window(object)?)),
            "get-status" => Ok(Request::GetStatus),
            "debug-scan" => Ok(Request::DebugScan),
            "restore" => Ok(Request::Restore),
            other => Err(ValidationError::UnknownCommand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::ApplyWindow(_) => "apply-window",
            Request::GetStatus => "get-status",
            Request::DebugScan => "debug-scan",
            Request::Restore => "restore",
        }
    }
}

fn parse_apply_window(object: &Map<String, Value>) -> Result<ApplyWindowParams, ValidationError> {
    let target_budget = parse_budget(object.get("targetBudget"))?;
    let enabled = require_bool(object.get("enabled"), "enabled")?;
    let surfaces = match object.get("surfaces") {
        None | Some(Value::Null) => None,
        Some(Value::Object(surfaces)) => Some(SurfaceToggles {
            conversations: optional_bool(
                surfaces.get("conversations"),
                "surfaces.conversations",
                true,
            )?,
            shared_transcripts: optional_bool(
                surfaces.get("sharedTranscripts"),
                "surfaces.sharedTranscripts",
                true,
            )?,
        }),
        Some(_) => {
            return Err(ValidationError::InvalidField {
                field: "surfaces",
                expected: "an object of booleans",
            });
        }
    };

    Ok(ApplyWindowParams {
        target_budget,
        enabled,
        surfaces,
    })
}

fn parse_budget(value: Option<&Value>) -> Result<u32, ValidationError> {
    const FIELD: &str = "targetBudget";
    let invalid = ValidationError::InvalidField {
        field: FIELD,
        expected: "an integer",
    };

    let value = value.ok_or_else(|| invalid.clone())?;
    // Integral floats such as `5000.0` are accepted, anything fractional is not.
    let number = match value.as_i64() {
        Some(number) => number,
        None => match value.as_f64() {
            // Float to int `as` saturates, so huge values still land out of range.
            Some(float) if float.is_finite() && float.fract() == 0.0 => float as i64,
            _ => return Err(invalid),
        },
    };

    if number < i64::from(MIN_TARGET_BUDGET) || number > i64::from(MAX_TARGET_BUDGET) {
        return Err(out_of_range(FIELD, number));
    }
    u32::try_from(number).map_err(|_| out_of_range(FIELD, number))
}

fn out_of_range(field: &'static str, value: i64) -> ValidationError {
    ValidationError::OutOfRange {
        field,
        value,
        min: MIN_TARGET_BUDGET,
        max: MAX_TARGET_BUDGET,
    }
}

fn require_bool(value: Option<&Value>, field: &'static str) -> Result<bool, ValidationError> {
    value
        .and_then(Value::as_bool)
        .ok_or(ValidationError::InvalidField {
            field,
            expected: "a boolean",
        })
}

fn optional_bool(
    value: Option<&Value>,
    field: &'static str,
    default: bool,
) -> Result<bool, ValidationError> {
    match value {
        None => Ok(default),
        Some(value) => require_bool(Some(value), field),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// Envelope returned for every inbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }

    pub fn from_error(error: &crate::Error) -> Self {
        Self::failure(error.kind(), error.to_string())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
