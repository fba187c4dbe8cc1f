use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    AttendanceRequest, EventValidation, ResponseEnvelope, ResponseItem, ResponseStatus,
    SubmitReceipt, ValidateRequest,
};
use crate::services::config_loader::RemoteConfig;
use crate::services::event_window::parse_remote_datetime;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("unreadable response: {0}")]
    Decode(String),
    #[error("server returned no data")]
    EmptyResponse,
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            RemoteError::Decode(value.to_string())
        } else {
            RemoteError::Transport(value.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(EventValidation),
    Invalid { message: String },
}

/// The two operations of the attendance service, told apart by `apikey`.
pub trait AttendanceApi: Send + Sync {
    fn validate(
        &self,
        event_code: &str,
    ) -> impl Future<Output = Result<ValidationOutcome, RemoteError>> + Send;

    fn submit(
        &self,
        request: &AttendanceRequest,
    ) -> impl Future<Output = Result<SubmitReceipt, RemoteError>> + Send;
}

pub struct RestAttendanceClient {
    client: Client,
    config: RemoteConfig,
}

impl RestAttendanceClient {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    async fn post<T: serde::Serialize + ?Sized>(&self, body: &T) -> Result<ResponseItem, RemoteError> {
        let mut request = self.client.post(&self.config.endpoint_url).json(body);
        if !self.config.username.is_empty() {
            request = request.basic_auth(&self.config.username, Some(&self.config.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Attendance endpoint returned {}", status);
            return Err(RemoteError::Status(status.as_u16()));
        }

        let raw = response.text().await?;
        debug!("Attendance endpoint replied: {}", raw);
        first_item(&raw)
    }
}

pub fn first_item(raw: &str) -> Result<ResponseItem, RemoteError> {
    let envelope: ResponseEnvelope =
        serde_json::from_str(raw).map_err(|err| RemoteError::Decode(err.to_string()))?;
    envelope
        .data
        .into_iter()
        .next()
        .ok_or(RemoteError::EmptyResponse)
}

pub fn validation_from_item(event_code: &str, item: ResponseItem) -> Result<ValidationOutcome, RemoteError> {
    if item.status == ResponseStatus::Fail {
        let message = if item.message.is_empty() {
            "Invalid event code".to_string()
        } else {
            item.message
        };
        return Ok(ValidationOutcome::Invalid { message });
    }

    let (Some(start_raw), Some(end_raw)) = (item.start_datetime, item.end_datetime) else {
        return Err(RemoteError::Decode(
            "validation reply is missing the event window".to_string(),
        ));
    };
    let start_datetime = parse_remote_datetime(&start_raw).map_err(RemoteError::Decode)?;
    let end_datetime = parse_remote_datetime(&end_raw).map_err(RemoteError::Decode)?;

    Ok(ValidationOutcome::Valid(EventValidation {
        event_code: event_code.trim().to_string(),
        start_datetime,
        end_datetime,
        valid: true,
    }))
}

pub fn receipt_from_item(item: ResponseItem) -> Result<SubmitReceipt, RemoteError> {
    match item.status {
        ResponseStatus::Success => Ok(SubmitReceipt {
            message: item.message,
            token: item.token.filter(|t| !t.trim().is_empty()),
        }),
        ResponseStatus::Fail => Err(RemoteError::Rejected(if item.message.is_empty() {
            "Submission was rejected".to_string()
        } else {
            item.message
        })),
    }
}

impl AttendanceApi for RestAttendanceClient {
    async fn validate(&self, event_code: &str) -> Result<ValidationOutcome, RemoteError> {
        info!("Validating event code {}", event_code.trim());
        let item = self.post(&ValidateRequest::new(event_code)).await?;
        validation_from_item(event_code, item)
    }

    async fn submit(&self, request: &AttendanceRequest) -> Result<SubmitReceipt, RemoteError> {
        info!("Submitting attendance for {}", request.eventcode);
        let item = self.post(request).await?;
        receipt_from_item(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_status_is_an_invalid_code_not_an_error() {
        let item = first_item(r#"{"data":[{"status":"fail","message":"Unknown code"}]}"#).unwrap();
        let outcome = validation_from_item("E404", item).unwrap();
        assert_eq!(
            outcome,
            ValidationOutcome::Invalid {
                message: "Unknown code".to_string()
            }
        );
    }

    #[test]
    fn success_carries_parsed_window() {
        let item = first_item(
            r#"{"data":[{"status":"success","message":"","startDatetime":"2025-05-20 09:00:00","endDatetime":"2025-05-20 18:00:00"}]}"#,
        )
        .unwrap();
        let ValidationOutcome::Valid(validation) = validation_from_item(" E00001", item).unwrap()
        else {
            panic!("expected a valid outcome");
        };
        assert_eq!(validation.event_code, "E00001");
        assert_eq!(validation.start_datetime.to_string(), "2025-05-20 09:00:00");
        assert!(validation.valid);
    }

    #[test]
    fn success_without_window_is_a_decode_error() {
        let item = first_item(r#"{"data":[{"status":"success","message":"ok"}]}"#).unwrap();
        assert!(matches!(
            validation_from_item("E00001", item),
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn empty_envelope_and_garbage_are_errors() {
        assert!(matches!(first_item(r#"{"data":[]}"#), Err(RemoteError::EmptyResponse)));
        assert!(matches!(first_item("<html>"), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn submit_reply_maps_to_receipt_or_rejection() {
        let ok = first_item(r#"{"data":[{"status":"success","message":"Recorded","token":"482913"}]}"#)
            .unwrap();
        assert_eq!(
            receipt_from_item(ok).unwrap(),
            SubmitReceipt {
                message: "Recorded".to_string(),
                token: Some("482913".to_string())
            }
        );

        let rejected =
            first_item(r#"{"data":[{"status":"fail","message":"Already marked"}]}"#).unwrap();
        assert!(matches!(
            receipt_from_item(rejected),
            Err(RemoteError::Rejected(msg)) if msg == "Already marked"
        ));
    }
}
