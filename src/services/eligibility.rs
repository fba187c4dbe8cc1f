use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::models::SubmissionRecord;
use crate::services::local_store::{self, KeyValueStore, LAST_SUBMISSIONS_KEY};

/// Append-only log of successful submissions.
pub trait SubmissionLog: Send + Sync {
    fn append(&self, record: SubmissionRecord) -> Result<()>;
    fn query(&self, predicate: &dyn Fn(&SubmissionRecord) -> bool) -> Vec<SubmissionRecord>;
}

/// Log kept as a JSON array under `lastSubmissions` in a key/value store.
pub struct StoredSubmissionLog<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> StoredSubmissionLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn load(&self) -> Vec<SubmissionRecord> {
        local_store::get_json::<Vec<SubmissionRecord>>(&*self.store, LAST_SUBMISSIONS_KEY)
            .unwrap_or_default()
    }
}

impl<S: KeyValueStore> SubmissionLog for StoredSubmissionLog<S> {
    fn append(&self, record: SubmissionRecord) -> Result<()> {
        let mut records = self.load();
        records.push(record);
        local_store::set_json(&*self.store, LAST_SUBMISSIONS_KEY, &records)
    }

    fn query(&self, predicate: &dyn Fn(&SubmissionRecord) -> bool) -> Vec<SubmissionRecord> {
        self.load().into_iter().filter(|r| predicate(r)).collect()
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemorySubmissionLog {
    records: Mutex<Vec<SubmissionRecord>>,
    reject_appends: bool,
}

#[cfg(test)]
impl MemorySubmissionLog {
    /// A log whose storage refuses every write.
    pub fn read_only() -> Self {
        Self {
            reject_appends: true,
            ..Self::default()
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl SubmissionLog for MemorySubmissionLog {
    fn append(&self, record: SubmissionRecord) -> Result<()> {
        if self.reject_appends {
            anyhow::bail!("submission log is read-only");
        }
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("submission log lock poisoned"))?
            .push(record);
        Ok(())
    }

    fn query(&self, predicate: &dyn Fn(&SubmissionRecord) -> bool) -> Vec<SubmissionRecord> {
        match self.records.lock() {
            Ok(records) => records.iter().filter(|r| predicate(r)).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Read-only check: no record for `(event_code, today)` exists yet.
pub fn is_submission_allowed(log: &dyn SubmissionLog, event_code: &str, today: NaiveDate) -> bool {
    log.query(&|record| record.matches(event_code, today))
        .is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRejected {
    AlreadySubmitted,
    InFlight,
}

struct GateInner {
    in_flight: HashSet<(String, NaiveDate)>,
    /// Accepted remotely but the local append failed. Blocks until restart.
    unsaved: HashSet<(String, NaiveDate)>,
}

/// Serializes check-and-reserve so two quick attempts for the same code and
/// day cannot both pass before the first one records its result.
pub struct EligibilityGate {
    log: Arc<dyn SubmissionLog>,
    inner: Arc<Mutex<GateInner>>,
}

impl EligibilityGate {
    pub fn new(log: Arc<dyn SubmissionLog>) -> Self {
        Self {
            log,
            inner: Arc::new(Mutex::new(GateInner {
                in_flight: HashSet::new(),
                unsaved: HashSet::new(),
            })),
        }
    }

    pub fn is_allowed(&self, event_code: &str, today: NaiveDate) -> bool {
        let key = (event_code.trim().to_string(), today);
        if lock_inner(&self.inner).unsaved.contains(&key) {
            return false;
        }
        is_submission_allowed(self.log.as_ref(), &key.0, today)
    }

    pub fn claim(&self, event_code: &str, today: NaiveDate) -> Result<SubmissionClaim, ClaimRejected> {
        let key = (event_code.trim().to_string(), today);
        let mut inner = lock_inner(&self.inner);

        if inner.in_flight.contains(&key) {
            warn!("Submission for {} on {} already in flight", key.0, key.1);
            return Err(ClaimRejected::InFlight);
        }
        if inner.unsaved.contains(&key) || !is_submission_allowed(self.log.as_ref(), &key.0, today)
        {
            return Err(ClaimRejected::AlreadySubmitted);
        }

        inner.in_flight.insert(key.clone());
        Ok(SubmissionClaim {
            key: Some(key),
            log: Arc::clone(&self.log),
            inner: Arc::clone(&self.inner),
        })
    }
}

fn lock_inner(inner: &Mutex<GateInner>) -> MutexGuard<'_, GateInner> {
    // The set only holds plain keys; a poisoned guard is still consistent.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reservation for one `(event_code, date)`. Dropping it without `commit`
/// releases the reservation and leaves the log untouched.
pub struct SubmissionClaim {
    key: Option<(String, NaiveDate)>,
    log: Arc<dyn SubmissionLog>,
    inner: Arc<Mutex<GateInner>>,
}

impl SubmissionClaim {
    /// Appends the record and releases the reservation. If the append fails
    /// the pair stays blocked in memory so it cannot be sent again this session.
    pub fn commit(mut self) -> Result<SubmissionRecord> {
        let Some(key) = self.key.take() else {
            anyhow::bail!("claim already released");
        };
        let record = SubmissionRecord::new(&key.0, key.1);
        let mut inner = lock_inner(&self.inner);
        inner.in_flight.remove(&key);
        if let Err(err) = self.log.append(record.clone()) {
            warn!("Keeping {} on {} blocked for this session", key.0, key.1);
            inner.unsaved.insert(key);
            return Err(err);
        }
        info!(
            "Recorded submission for {} on {}",
            record.event_code, record.submitted_on
        );
        Ok(record)
    }
}

impl Drop for SubmissionClaim {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock_inner(&self.inner).in_flight.remove(&key);
        }
    }
}
