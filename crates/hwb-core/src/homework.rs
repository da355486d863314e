//! Response validation and status rendering.
//!
//! The review API answers with `{"homeworks": [...], "current_date": <int>}`,
//! newest homework first. Both steps are pure and only log.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// Review verdict of a single homework.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HomeworkStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl HomeworkStatus {
    pub fn verdict(self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            HomeworkStatus::Reviewing => "Работа взята на проверку ревьюером.",
            HomeworkStatus::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HomeworkStatus::Approved => "approved",
            HomeworkStatus::Reviewing => "reviewing",
            HomeworkStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for HomeworkStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approved" => Ok(HomeworkStatus::Approved),
            "reviewing" => Ok(HomeworkStatus::Reviewing),
            "rejected" => Ok(HomeworkStatus::Rejected),
            other => Err(Error::UnrecognizedStatus(other.to_string())),
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields we read from one `homeworks` entry. Everything else is ignored.
#[derive(Debug, Default, Deserialize)]
struct HomeworkRecord {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    homework_name: Option<String>,
}

/// Validate the payload shape and return the `homeworks` list (possibly empty).
pub fn check_response(response: &Value) -> Result<&[Value]> {
    let Some(obj) = response.as_object().filter(|o| !o.is_empty()) else {
        return Err(Error::EmptyOrInvalidPayload(describe(response)));
    };

    match obj.get("homeworks") {
        Some(Value::Array(items)) => Ok(items.as_slice()),
        _ => Err(Error::MissingHomeworkList),
    }
}

/// Render the notification text for one homework record.
pub fn parse_status(homework: &Value) -> Result<String> {
    if !homework.is_object() {
        return Err(Error::InvalidHomeworkRecord(describe(homework)));
    }
    let record = HomeworkRecord::deserialize(homework)
        .map_err(|e| Error::InvalidHomeworkRecord(e.to_string()))?;

    let status: HomeworkStatus = record
        .status
        .filter(|s| !s.trim().is_empty())
        .ok_or(Error::MissingStatusField)?
        .parse()?;
    let name = record
        .homework_name
        .filter(|s| !s.trim().is_empty())
        .ok_or(Error::MissingNameField)?;
    tracing::debug!(homework = %name, %status, "parsed homework status");

    Ok(format!(
        "Изменился статус проверки работы \"{name}\". {}",
        status.verdict()
    ))
}

/// Short type description used in payload errors.
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(_) => "a number".to_string(),
        Value::String(_) => "a string".to_string(),
        Value::Array(a) if a.is_empty() => "an empty array".to_string(),
        Value::Array(_) => "an array".to_string(),
        Value::Object(o) if o.is_empty() => "an empty object".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}
