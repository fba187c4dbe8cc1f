use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::{AttendanceRequest, AttendeeDetails, ApiKey, EventValidation, LocationFix};
use crate::services::eligibility::{ClaimRejected, EligibilityGate};
use crate::services::event_window::{self, EventWindow};
use crate::services::geocode::{self, PlaceResolver};
use crate::services::geolocation::{self, LocationError, LocationProvider, PositionOptions};
use crate::services::local_store::{self, KeyValueStore, VALIDATED_EVENTS_KEY};
use crate::services::remote::{AttendanceApi, RemoteError, ValidationOutcome};
use crate::services::submission_flow::{IllegalTransition, SubmissionFlow, SubmissionPhase};
use crate::services::token::{self, TokenFormat};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Input(String),
    #[error("Attendance for {0} has already been submitted today")]
    AlreadySubmitted(String),
    #[error("A submission for {0} is already in progress")]
    InFlight(String),
    #[error("{0}")]
    InvalidCode(String),
    #[error("{}", .0.describe())]
    WindowClosed(EventWindow),
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("{0}")]
    State(#[from] IllegalTransition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub event_code: String,
    pub message: String,
    /// Server-issued token, or the local advisory one when the server sent none.
    pub token: String,
    pub location_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedValidation {
    validation: EventValidation,
    #[serde(rename = "cachedOn")]
    cached_on: NaiveDate,
}

pub struct PipelineSettings {
    pub device_id: String,
    pub token_format: TokenFormat,
    pub position_options: PositionOptions,
    pub fallback_place_name: String,
}

pub fn check_event_code(event_code: &str) -> Result<String, PipelineError> {
    let trimmed = event_code.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Input("Please enter an event code".to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn check_attendee(details: &AttendeeDetails) -> Result<(), PipelineError> {
    if details.user_name.trim().is_empty() {
        return Err(PipelineError::Input("Please enter your name".to_string()));
    }
    let phone = details.phone_number.trim();
    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(PipelineError::Input(
            "Phone number must be exactly 10 digits".to_string(),
        ));
    }
    Ok(())
}

/// Drives one attendance attempt at a time: gate, validation, location,
/// place name, submit. All waiting happens in sequence.
pub struct AttendancePipeline<A, L, R> {
    api: A,
    locator: L,
    resolver: R,
    gate: EligibilityGate,
    store: Arc<dyn KeyValueStore>,
    settings: PipelineSettings,
    flow: Mutex<SubmissionFlow>,
    cached_fix: Mutex<Option<LocationFix>>,
}

impl<A, L, R> AttendancePipeline<A, L, R>
where
    A: AttendanceApi,
    L: LocationProvider,
    R: PlaceResolver,
{
    pub fn new(
        api: A,
        locator: L,
        resolver: R,
        gate: EligibilityGate,
        store: Arc<dyn KeyValueStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            api,
            locator,
            resolver,
            gate,
            store,
            settings,
            flow: Mutex::new(SubmissionFlow::default()),
            cached_fix: Mutex::new(None),
        }
    }

    fn with_flow<T>(&self, action: impl FnOnce(&mut SubmissionFlow) -> T) -> T {
        let mut flow = self.flow.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        action(&mut flow)
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.with_flow(|flow| flow.phase().clone())
    }

    pub fn acknowledge(&self) -> Result<(), IllegalTransition> {
        self.with_flow(SubmissionFlow::acknowledge)
    }

    fn take_cached_fix(&self) -> Option<LocationFix> {
        self.cached_fix
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Startup location request; a fix obtained here is used by the next
    /// submission instead of asking again.
    pub async fn prefetch_location(&self) -> Result<(), LocationError> {
        let fix = geolocation::acquire_position(&self.locator, &self.settings.position_options).await?;
        *self
            .cached_fix
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(fix);
        Ok(())
    }

    fn cached_validation(&self, event_code: &str, today: NaiveDate) -> Option<EventValidation> {
        let cache: BTreeMap<String, CachedValidation> =
            local_store::get_json(self.store.as_ref(), VALIDATED_EVENTS_KEY)?;
        cache
            .get(event_code)
            .filter(|entry| entry.cached_on == today && entry.validation.valid)
            .map(|entry| entry.validation.clone())
    }

    fn remember_validation(&self, validation: &EventValidation, today: NaiveDate) {
        let mut cache: BTreeMap<String, CachedValidation> =
            local_store::get_json(self.store.as_ref(), VALIDATED_EVENTS_KEY).unwrap_or_default();
        cache.insert(
            validation.event_code.clone(),
            CachedValidation {
                validation: validation.clone(),
                cached_on: today,
            },
        );
        if let Err(err) = local_store::set_json(self.store.as_ref(), VALIDATED_EVENTS_KEY, &cache) {
            warn!("Failed to cache validation for {}: {err:#}", validation.event_code);
        }
    }

    pub async fn validate_code(
        &self,
        event_code: &str,
        now: DateTime<Local>,
    ) -> Result<EventValidation, PipelineError> {
        let event_code = check_event_code(event_code)?;
        let today = now.date_naive();
        if !self.gate.is_allowed(&event_code, today) {
            info!("Event code {} already used today", event_code);
            return Err(PipelineError::AlreadySubmitted(event_code));
        }

        self.with_flow(|flow| flow.gate_check(&event_code))?;

        let validation = match self.cached_validation(&event_code, today) {
            Some(validation) => {
                info!("Using cached validation for {}", event_code);
                validation
            }
            None => match self.api.validate(&event_code).await {
                Ok(ValidationOutcome::Valid(validation)) => validation,
                Ok(ValidationOutcome::Invalid { message }) => {
                    self.with_flow(|flow| flow.validate_fail(&message))?;
                    return Err(PipelineError::InvalidCode(message));
                }
                Err(err) => {
                    self.with_flow(|flow| flow.validate_fail(&err.to_string()))?;
                    return Err(err.into());
                }
            },
        };

        let window = event_window::classify(
            validation.start_datetime,
            validation.end_datetime,
            now.naive_local(),
        );
        if !window.permits_submission() {
            self.with_flow(|flow| flow.validate_fail(window.describe()))?;
            return Err(PipelineError::WindowClosed(window));
        }

        self.remember_validation(&validation, today);
        self.with_flow(|flow| flow.validate_ok(validation.clone()))?;
        Ok(validation)
    }

    pub async fn submit(
        &self,
        details: &AttendeeDetails,
        now: DateTime<Local>,
    ) -> Result<SubmissionOutcome, PipelineError> {
        let event_code = check_event_code(&details.event_code)?;
        check_attendee(details)?;

        let today = now.date_naive();
        let claim = self
            .gate
            .claim(&event_code, today)
            .map_err(|rejected| match rejected {
                ClaimRejected::AlreadySubmitted => PipelineError::AlreadySubmitted(event_code.clone()),
                ClaimRejected::InFlight => PipelineError::InFlight(event_code.clone()),
            })?;

        let validation = match self.phase() {
            SubmissionPhase::CodeValidated { validation } if validation.event_code == event_code => {
                validation
            }
            _ => {
                return Err(PipelineError::Input(
                    "Please validate the event code first".to_string(),
                ));
            }
        };

        let window = event_window::classify(
            validation.start_datetime,
            validation.end_datetime,
            now.naive_local(),
        );
        if !window.permits_submission() {
            self.with_flow(|flow| flow.submit_fail(window.describe()))?;
            return Err(PipelineError::WindowClosed(window));
        }

        self.with_flow(SubmissionFlow::begin_locate)?;

        let fix = match self.take_cached_fix() {
            Some(fix) => fix,
            None => {
                match geolocation::acquire_position(&self.locator, &self.settings.position_options)
                    .await
                {
                    Ok(fix) => fix,
                    Err(err) => {
                        self.with_flow(|flow| flow.locate_fail(err.to_string()))?;
                        return Err(err.into());
                    }
                }
            }
        };
        let (latitude, longitude) = (fix.latitude, fix.longitude);
        self.with_flow(|flow| flow.locate_ok(fix))?;

        let location_name = geocode::resolve_or_fallback(
            &self.resolver,
            latitude,
            longitude,
            &self.settings.fallback_place_name,
        )
        .await;
        self.with_flow(|flow| flow.geocode_done(location_name.clone()))?;

        let local_token = token::generate_token(
            details.user_name.trim(),
            details.phone_number.trim(),
            now.timestamp_millis(),
            &self.settings.token_format,
        );
        let request = AttendanceRequest {
            apikey: ApiKey::Submit,
            eventcode: event_code.clone(),
            username: details.user_name.trim().to_string(),
            phone: details.phone_number.trim().to_string(),
            orgname: details.org_name.trim().to_string(),
            deviceid: self.settings.device_id.clone(),
            token: local_token.clone(),
            geolat: latitude,
            geolon: longitude,
            locationname: location_name.clone(),
            submittedat: now.to_rfc3339(),
        };

        let receipt = match self.api.submit(&request).await {
            Ok(receipt) => receipt,
            Err(err) => {
                self.with_flow(|flow| flow.submit_fail(err.to_string()))?;
                return Err(err.into());
            }
        };

        let token = receipt.token.unwrap_or(local_token);
        let mut message = if receipt.message.is_empty() {
            "Attendance submitted successfully".to_string()
        } else {
            receipt.message
        };
        if let Err(err) = claim.commit() {
            error!("Submission accepted but not recorded locally: {err:#}");
            message.push_str(
                ". Warning: it could not be saved on this device, so do not submit this code again today.",
            );
        }
        self.with_flow(|flow| flow.submit_ok(message.clone(), token.clone()))?;
        info!("Attendance for {} submitted", event_code);

        Ok(SubmissionOutcome {
            event_code,
            message,
            token,
            location_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::TimeZone;

    use crate::models::{SubmitReceipt, SubmissionRecord};
    use crate::services::eligibility::{MemorySubmissionLog, SubmissionLog};
    use crate::services::local_store::MemoryStore;

    #[derive(Default)]
    struct FakeApi {
        validate_calls: AtomicUsize,
        submitted: Mutex<Vec<AttendanceRequest>>,
        invalid: bool,
        reject_submit: bool,
    }

    impl FakeApi {
        fn validate_calls(&self) -> usize {
            self.validate_calls.load(Ordering::SeqCst)
        }

        fn submitted(&self) -> Vec<AttendanceRequest> {
            self.submitted.lock().unwrap().clone()
        }
    }

    impl AttendanceApi for Arc<FakeApi> {
        async fn validate(&self, event_code: &str) -> Result<ValidationOutcome, RemoteError> {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            if self.invalid {
                return Ok(ValidationOutcome::Invalid {
                    message: "Invalid event code".to_string(),
                });
            }
            let day = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
            Ok(ValidationOutcome::Valid(EventValidation {
                event_code: event_code.to_string(),
                start_datetime: day.and_hms_opt(9, 0, 0).unwrap(),
                end_datetime: day.and_hms_opt(18, 0, 0).unwrap(),
                valid: true,
            }))
        }

        async fn submit(&self, request: &AttendanceRequest) -> Result<SubmitReceipt, RemoteError> {
            self.submitted.lock().unwrap().push(request.clone());
            if self.reject_submit {
                return Err(RemoteError::Transport("connection reset".to_string()));
            }
            Ok(SubmitReceipt {
                message: "Attendance recorded".to_string(),
                token: Some("482913".to_string()),
            })
        }
    }

    enum FakeLocator {
        At(f64, f64),
        /// Answers with the Mumbai fix after the given delay.
        After(Duration),
        Denied,
    }

    impl LocationProvider for FakeLocator {
        async fn current_position(&self, _options: &PositionOptions) -> Result<LocationFix, LocationError> {
            match self {
                FakeLocator::At(lat, lon) => Ok(LocationFix::new(*lat, *lon)),
                FakeLocator::After(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(LocationFix::new(19.0760, 72.8777))
                }
                FakeLocator::Denied => Err(LocationError::PermissionDenied),
            }
        }
    }

    struct FakeResolver(Option<&'static str>);

    impl PlaceResolver for FakeResolver {
        async fn resolve(&self, _latitude: f64, _longitude: f64) -> Option<String> {
            self.0.map(ToOwned::to_owned)
        }
    }

    const FALLBACK: &str = "Location unavailable";

    struct Harness {
        api: Arc<FakeApi>,
        log: Arc<MemorySubmissionLog>,
        pipeline: AttendancePipeline<Arc<FakeApi>, FakeLocator, FakeResolver>,
    }

    fn harness(api: FakeApi, locator: FakeLocator, resolver: FakeResolver) -> Harness {
        harness_with_log(api, locator, resolver, MemorySubmissionLog::default())
    }

    fn harness_with_log(
        api: FakeApi,
        locator: FakeLocator,
        resolver: FakeResolver,
        log: MemorySubmissionLog,
    ) -> Harness {
        let api = Arc::new(api);
        let log = Arc::new(log);
        let pipeline = AttendancePipeline::new(
            Arc::clone(&api),
            locator,
            resolver,
            EligibilityGate::new(log.clone()),
            Arc::new(MemoryStore::default()),
            PipelineSettings {
                device_id: "00000000deadbeef".to_string(),
                token_format: TokenFormat::default(),
                position_options: PositionOptions::default(),
                fallback_place_name: FALLBACK.to_string(),
            },
        );
        Harness { api, log, pipeline }
    }

    fn mumbai() -> FakeLocator {
        FakeLocator::At(19.0760, 72.8777)
    }

    fn noon(day: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 5, day, 12, 0, 0).unwrap()
    }

    fn attendee() -> AttendeeDetails {
        AttendeeDetails {
            event_code: "E00001".to_string(),
            user_name: "Asha Rao".to_string(),
            phone_number: "9876543210".to_string(),
            org_name: "Acme".to_string(),
        }
    }

    #[tokio::test]
    async fn end_to_end_records_exactly_one_submission() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(Some("Mumbai, Maharashtra")));

        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();
        let outcome = h.pipeline.submit(&attendee(), noon(20)).await.unwrap();

        assert_eq!(outcome.token, "482913");
        assert_eq!(outcome.location_name, "Mumbai, Maharashtra");

        let sent = h.api.submitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].eventcode, "E00001");
        assert_eq!(sent[0].geolat, 19.0760);
        assert_eq!(sent[0].geolon, 72.8777);
        assert_eq!(sent[0].deviceid, "00000000deadbeef");
        assert_eq!(sent[0].token.len(), 6);

        let day = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        assert_eq!(
            h.log.query(&|_| true),
            vec![SubmissionRecord::new("E00001", day)]
        );
        assert_eq!(h.pipeline.phase().name(), "success");
        h.pipeline.acknowledge().unwrap();
        assert_eq!(h.pipeline.phase(), SubmissionPhase::Idle);
    }

    #[tokio::test]
    async fn repeat_on_same_day_is_blocked_before_network() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(None));
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();
        h.pipeline.submit(&attendee(), noon(20)).await.unwrap();
        h.pipeline.acknowledge().unwrap();

        let err = h.pipeline.validate_code("E00001", noon(20)).await.unwrap_err();
        assert!(matches!(err, PipelineError::AlreadySubmitted(code) if code == "E00001"));
        assert_eq!(h.api.validate_calls(), 1);
        assert_eq!(h.api.submitted().len(), 1);
        assert_eq!(h.pipeline.phase(), SubmissionPhase::Idle);

        assert!(h.pipeline.validate_code("E00001", noon(21)).await.is_err_and(
            |err| matches!(err, PipelineError::WindowClosed(EventWindow::Past))
        ));
    }

    #[tokio::test]
    async fn geocode_failure_still_submits_with_fallback() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(None));
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();
        let outcome = h.pipeline.submit(&attendee(), noon(20)).await.unwrap();

        assert_eq!(outcome.location_name, FALLBACK);
        assert_eq!(h.api.submitted()[0].locationname, FALLBACK);
        assert_eq!(h.log.record_count(), 1);
    }

    #[tokio::test]
    async fn failed_submit_leaves_day_available() {
        let api = FakeApi {
            reject_submit: true,
            ..FakeApi::default()
        };
        let h = harness(api, mumbai(), FakeResolver(None));
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();

        let err = h.pipeline.submit(&attendee(), noon(20)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Remote(RemoteError::Transport(_))));
        assert_eq!(h.log.record_count(), 0);
        assert_eq!(h.pipeline.phase().name(), "failure");

        h.pipeline.acknowledge().unwrap();
        assert!(h.pipeline.gate.is_allowed("E00001", noon(20).date_naive()));
    }

    #[tokio::test]
    async fn denied_location_aborts_without_network() {
        let h = harness(FakeApi::default(), FakeLocator::Denied, FakeResolver(None));
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();

        let err = h.pipeline.submit(&attendee(), noon(20)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Location(LocationError::PermissionDenied)));
        assert!(h.api.submitted().is_empty());
        assert_eq!(h.log.record_count(), 0);
        assert_eq!(h.pipeline.phase().name(), "failure");
    }

    #[tokio::test]
    async fn window_closing_after_validation_blocks_submit() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(None));
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();

        let late = Local.with_ymd_and_hms(2025, 5, 20, 18, 1, 0).unwrap();
        let err = h.pipeline.submit(&attendee(), late).await.unwrap_err();
        assert!(matches!(err, PipelineError::WindowClosed(EventWindow::Past)));
        assert_eq!(h.pipeline.phase().name(), "failure");
        assert!(h.api.submitted().is_empty());
        assert_eq!(h.log.record_count(), 0);

        h.pipeline.acknowledge().unwrap();
        assert!(h.pipeline.gate.claim("E00001", late.date_naive()).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_location_ends_in_failure() {
        let stalled = FakeLocator::After(Duration::from_secs(3600));
        let h = harness(FakeApi::default(), stalled, FakeResolver(None));
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();

        let err = h.pipeline.submit(&attendee(), noon(20)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Location(LocationError::Timeout)));
        assert_eq!(h.pipeline.phase().name(), "failure");
        assert!(h.api.submitted().is_empty());
        assert_eq!(h.log.record_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_submits_send_one_request() {
        let slow = FakeLocator::After(Duration::from_secs(1));
        let h = harness(FakeApi::default(), slow, FakeResolver(None));
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();

        let details = attendee();
        let (first, second) = tokio::join!(
            h.pipeline.submit(&details, noon(20)),
            h.pipeline.submit(&details, noon(20))
        );
        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(PipelineError::InFlight(code)) if code == "E00001"))
        );
        assert_eq!(h.api.submitted().len(), 1);
        assert_eq!(h.log.record_count(), 1);
    }

    #[tokio::test]
    async fn unsaved_record_is_reported_and_still_blocks() {
        let h = harness_with_log(
            FakeApi::default(),
            mumbai(),
            FakeResolver(None),
            MemorySubmissionLog::read_only(),
        );
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();

        let outcome = h.pipeline.submit(&attendee(), noon(20)).await.unwrap();
        assert!(outcome.message.contains("could not be saved"));
        assert_eq!(h.pipeline.phase().name(), "success");
        h.pipeline.acknowledge().unwrap();

        let err = h.pipeline.validate_code("E00001", noon(20)).await.unwrap_err();
        assert!(matches!(err, PipelineError::AlreadySubmitted(_)));
        assert_eq!(h.api.submitted().len(), 1);
    }

    #[tokio::test]
    async fn prefetched_fix_is_used_once() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(None));
        h.pipeline.prefetch_location().await.unwrap();
        assert!(h.pipeline.take_cached_fix().is_some());
        assert!(h.pipeline.take_cached_fix().is_none());
    }

    #[tokio::test]
    async fn invalid_code_returns_to_idle() {
        let api = FakeApi {
            invalid: true,
            ..FakeApi::default()
        };
        let h = harness(api, mumbai(), FakeResolver(None));
        let err = h.pipeline.validate_code("NOPE", noon(20)).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid event code");
        assert_eq!(h.pipeline.phase(), SubmissionPhase::Idle);
    }

    #[tokio::test]
    async fn future_event_is_not_fillable() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(None));
        let early = Local.with_ymd_and_hms(2025, 5, 19, 10, 0, 0).unwrap();
        let err = h.pipeline.validate_code("E00001", early).await.unwrap_err();
        assert!(matches!(err, PipelineError::WindowClosed(EventWindow::Future)));
        assert_eq!(h.pipeline.phase(), SubmissionPhase::Idle);
    }

    #[tokio::test]
    async fn same_day_revalidation_uses_cache() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(None));
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();
        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();
        assert_eq!(h.api.validate_calls(), 1);
    }

    #[tokio::test]
    async fn input_errors_do_not_touch_state() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(None));
        assert!(matches!(
            h.pipeline.validate_code("   ", noon(20)).await,
            Err(PipelineError::Input(_))
        ));

        h.pipeline.validate_code("E00001", noon(20)).await.unwrap();
        let mut details = attendee();
        details.phone_number = "98765".to_string();
        assert!(matches!(
            h.pipeline.submit(&details, noon(20)).await,
            Err(PipelineError::Input(_))
        ));
        assert_eq!(h.pipeline.phase().validated_code(), Some("E00001"));
        assert!(h.api.submitted().is_empty());
    }

    #[tokio::test]
    async fn submit_requires_matching_validated_code() {
        let h = harness(FakeApi::default(), mumbai(), FakeResolver(None));
        let err = h.pipeline.submit(&attendee(), noon(20)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
        assert!(h.api.submitted().is_empty());
    }
}
