use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One successful attendance submission, as kept in the local log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    #[serde(rename = "eventCode")]
    pub event_code: String,
    #[serde(rename = "submittedOnDate")]
    pub submitted_on: NaiveDate,
}

impl SubmissionRecord {
    pub fn new(event_code: &str, submitted_on: NaiveDate) -> Self {
        Self {
            event_code: event_code.trim().to_string(),
            submitted_on,
        }
    }

    pub fn matches(&self, event_code: &str, date: NaiveDate) -> bool {
        self.event_code == event_code.trim() && self.submitted_on == date
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EventValidation {
    pub event_code: String,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub resolved_name: Option<String>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            resolved_name: None,
        }
    }
}

/// Form contents captured when the user presses Validate/Submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendeeDetails {
    pub event_code: String,
    pub user_name: String,
    pub phone_number: String,
    pub org_name: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum ApiKey {
    #[serde(rename = "VALIDATE")]
    Validate,
    #[serde(rename = "SUBMIT")]
    Submit,
}

#[derive(Debug, Serialize, Clone)]
pub struct ValidateRequest {
    pub apikey: ApiKey,
    pub eventcode: String,
}

impl ValidateRequest {
    pub fn new(event_code: &str) -> Self {
        Self {
            apikey: ApiKey::Validate,
            eventcode: event_code.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AttendanceRequest {
    pub apikey: ApiKey,
    pub eventcode: String,
    pub username: String,
    pub phone: String,
    pub orgname: String,
    pub deviceid: String,
    pub token: String,
    pub geolat: f64,
    pub geolon: f64,
    pub locationname: String,
    pub submittedat: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    #[serde(rename = "success", alias = "SUCCESS")]
    Success,
    #[serde(rename = "fail", alias = "FAIL", alias = "error")]
    Fail,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResponseItem {
    pub status: ResponseStatus,
    #[serde(default)]
    pub message: String,
    pub token: Option<String>,
    #[serde(rename = "startDatetime")]
    pub start_datetime: Option<String>,
    #[serde(rename = "endDatetime")]
    pub end_datetime: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub data: Vec<ResponseItem>,
}

/// What the remote service answered to a SUBMIT.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub message: String,
    pub token: Option<String>,
}
