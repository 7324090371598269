//! Document Store: one explicitly owned `ResumeDocument` per editing session.
//!
//! Every committed mutation publishes the new document on a `watch` channel, so
//! the preview stream and any other reader observe changes without touching
//! shared globals. Rejected mutations and no-op deletes publish nothing.
//!
//! Exports read a `snapshot()` taken before their first await; edits made
//! while an export runs are visible to the next export only.
//!
//! Sessions untouched for longer than the registry's idle TTL are evicted,
//! unless an export is running or an event stream is still subscribed.

pub mod handlers;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::models::resume::{Collection, Entry, ModelError, PersonalInfo, ResumeDocument};

/// A single mutation of the document.
#[derive(Debug, Clone)]
pub enum ResumeOp {
    SetPersonalInfo(PersonalInfo),
    Add(Entry),
    Update { id: String, entry: Entry },
    Delete { collection: Collection, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    PersonalInfoSet,
    /// Id the new entry was stored under.
    Added(String),
    Updated,
    /// `false` when the id was absent and nothing changed.
    Deleted(bool),
}

pub struct DocumentStore {
    tx: watch::Sender<ResumeDocument>,
}

impl DocumentStore {
    pub fn new(document: ResumeDocument) -> Self {
        let (tx, _rx) = watch::channel(document);
        Self { tx }
    }

    /// Owned copy of the current document.
    pub fn snapshot(&self) -> ResumeDocument {
        self.tx.borrow().clone()
    }

    /// True while at least one event stream is listening.
    pub fn has_subscribers(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    /// Receiver notified after every committed mutation.
    pub fn subscribe(&self) -> watch::Receiver<ResumeDocument> {
        self.tx.subscribe()
    }

    pub fn apply(&self, op: ResumeOp) -> Result<OpOutcome, ModelError> {
        let mut outcome = Err(ModelError::Validation("mutation not applied".to_string()));

        self.tx.send_if_modified(|doc| {
            let (result, modified) = match op {
                ResumeOp::SetPersonalInfo(info) => {
                    doc.set_personal_info(info);
                    (Ok(OpOutcome::PersonalInfoSet), true)
                }
                ResumeOp::Add(entry) => match doc.add(entry) {
                    Ok(id) => (Ok(OpOutcome::Added(id)), true),
                    Err(e) => (Err(e), false),
                },
                ResumeOp::Update { id, entry } => match doc.update(&id, entry) {
                    Ok(()) => (Ok(OpOutcome::Updated), true),
                    Err(e) => (Err(e), false),
                },
                ResumeOp::Delete { collection, id } => {
                    let removed = doc.delete(collection, &id);
                    (Ok(OpOutcome::Deleted(removed)), removed)
                }
            };
            outcome = result;
            modified
        });

        outcome
    }

    /// Overwrites the whole document.
    pub fn replace(&self, document: ResumeDocument) {
        self.tx.send_replace(document);
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(ResumeDocument::default())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sessions
// ────────────────────────────────────────────────────────────────────────────

pub struct Session {
    pub id: Uuid,
    pub store: DocumentStore,
    exporting: AtomicBool,
    last_touched: Mutex<Instant>,
}

impl Session {
    fn new(document: ResumeDocument) -> Self {
        Self {
            id: Uuid::new_v4(),
            store: DocumentStore::new(document),
            exporting: AtomicBool::new(false),
            last_touched: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_touched.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(
            *self.last_touched.lock().unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Claims the session's single export slot. `None` while another export
    /// is in flight; the slot frees itself when the guard drops.
    pub fn begin_export(self: &Arc<Self>) -> Option<ExportGuard> {
        self.exporting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportGuard {
                session: Arc::clone(self),
            })
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::Acquire)
    }
}

#[must_use = "the export slot is released as soon as the guard is dropped"]
pub struct ExportGuard {
    session: Arc<Session>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.session.exporting.store(false, Ordering::Release);
    }
}

/// All live editing sessions, created once at startup.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn create(&self, document: ResumeDocument) -> Arc<Session> {
        let session = Arc::new(Session::new(document));
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        tracing::info!(session_id = %session.id, "session created");
        session
    }

    /// Looks a session up and marks it as used.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        session.touch();
        Some(session)
    }

    /// Ends a session. Returns `false` if it did not exist.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::info!(session_id = %id, "session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session idle for at least the TTL. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.is_exporting()
                || session.store.has_subscribers()
                || session.idle_for(now) < self.idle_ttl;
            if !keep {
                tracing::info!(session_id = %id, "idle session evicted");
            }
            keep
        });
        before - sessions.len()
    }

    /// How often the reaper sweeps: a quarter of the TTL, at least a second.
    pub fn sweep_interval(&self) -> Duration {
        (self.idle_ttl / 4).max(Duration::from_secs(1))
    }
}

/// Runs `evict_idle` every `registry.sweep_interval()` until aborted.
pub fn spawn_idle_reaper(registry: Arc<SessionRegistry>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(registry.sweep_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = registry.evict_idle().await;
            if evicted > 0 {
                let remaining = registry.len().await;
                tracing::debug!(evicted, remaining, "idle sweep finished");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Experience, Skill};

    fn experience(id: &str) -> Entry {
        Entry::Experience(Experience {
            id: id.to_string(),
            company: "Acme".to_string(),
            position: "Engineer".to_string(),
            start_date: "2021-02".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_add_notifies_subscribers() {
        let store = DocumentStore::default();
        let mut rx = store.subscribe();
        let outcome = store.apply(ResumeOp::Add(experience("e1"))).unwrap();
        assert_eq!(outcome, OpOutcome::Added("e1".to_string()));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().experience.len(), 1);
    }

    #[test]
    fn test_rejected_mutation_does_not_notify() {
        let store = DocumentStore::default();
        let rx = store.subscribe();
        let empty_skill = Entry::Skills(Skill {
            category: "Tools".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            store.apply(ResumeOp::Add(empty_skill)),
            Err(ModelError::EmptySkills(_))
        ));
        assert!(!rx.has_changed().unwrap());
        assert!(store.snapshot().skills.is_empty());
    }

    #[test]
    fn test_noop_delete_does_not_notify() {
        let store = DocumentStore::default();
        store.apply(ResumeOp::Add(experience("e1"))).unwrap();
        let rx = store.subscribe();
        let outcome = store
            .apply(ResumeOp::Delete {
                collection: Collection::Experience,
                id: "missing".to_string(),
            })
            .unwrap();
        assert_eq!(outcome, OpOutcome::Deleted(false));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_edits() {
        let store = DocumentStore::default();
        store.apply(ResumeOp::Add(experience("e1"))).unwrap();
        let snapshot = store.snapshot();
        store.apply(ResumeOp::Add(experience("e2"))).unwrap();
        assert_eq!(snapshot.experience.len(), 1);
        assert_eq!(store.snapshot().experience.len(), 2);
    }

    #[test]
    fn test_update_missing_entry_is_not_found() {
        let store = DocumentStore::default();
        let err = store
            .apply(ResumeOp::Update {
                id: "ghost".to_string(),
                entry: experience("ghost"),
            })
            .unwrap_err();
        assert!(matches!(err, ModelError::NotFound { .. }));
    }

    #[test]
    fn test_replace_notifies() {
        let store = DocumentStore::default();
        let mut rx = store.subscribe();
        let mut doc = ResumeDocument::default();
        doc.personal_info.full_name = "Grace Hopper".to_string();
        store.replace(doc);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().personal_info.full_name, "Grace Hopper");
    }

    #[tokio::test]
    async fn test_export_guard_is_exclusive_and_released_on_drop() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let session = registry.create(ResumeDocument::default()).await;

        let guard = session.begin_export().expect("first export claims the slot");
        assert!(session.begin_export().is_none());
        assert!(session.is_exporting());

        drop(guard);
        assert!(!session.is_exporting());
        assert!(session.begin_export().is_some());
    }

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let session = registry.create(ResumeDocument::default()).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(session.id).await.is_some());
        assert!(registry.remove(session.id).await);
        assert!(!registry.remove(session.id).await);
        assert!(registry.get(session.id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_evicted_after_ttl() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let session = registry.create(ResumeDocument::default()).await;

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(registry.get(session.id).await.is_some());

        // The lookup above restarted the idle clock.
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(registry.evict_idle().await, 0);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.get(session.id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_sessions_survive_eviction() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let exporting = registry.create(ResumeDocument::default()).await;
        let watched = registry.create(ResumeDocument::default()).await;
        let _guard = exporting.begin_export().unwrap();
        let _rx = watched.store.subscribe();

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(registry.evict_idle().await, 0);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_sweeps_in_background() {
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
        registry.create(ResumeDocument::default()).await;
        let reaper = spawn_idle_reaper(Arc::clone(&registry));

        tokio::time::sleep(Duration::from_secs(80)).await;
        assert_eq!(registry.len().await, 0);
        reaper.abort();
    }
}
