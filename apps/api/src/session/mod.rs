// Session context: credential, experience store and the last run's artifacts.
// Nothing here outlives the session; ending it drops all three.

pub mod credential;
pub mod experience;
pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::analysis::orchestrator::{prepare_run, AnalysisResult, RunInput};
use crate::errors::AppError;
use self::credential::Credential;
use self::experience::{ExperienceRecord, ExperienceStore};

/// Where a session stands. A session that has not been created yet is "idle".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    AwaitingCredential,
    Ready,
    Running,
    Done,
}

pub struct Session {
    pub id: Uuid,
    credential: Option<Credential>,
    experiences: ExperienceStore,
    phase: SessionPhase,
    last_run: Option<AnalysisResult>,
    pub created_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            credential: None,
            experiences: ExperienceStore::new(),
            phase: SessionPhase::AwaitingCredential,
            last_run: None,
            created_at: now,
            last_seen: now,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Stores the key; the first one set unblocks the session.
    pub fn set_credential(&mut self, token: &str) -> Result<(), AppError> {
        self.credential = Some(Credential::parse(token)?);
        if self.phase == SessionPhase::AwaitingCredential {
            self.phase = SessionPhase::Ready;
        }
        Ok(())
    }

    fn require_credential(&self) -> Result<&Credential, AppError> {
        self.credential.as_ref().ok_or(AppError::CredentialRequired)
    }

    pub fn experiences(&self) -> Result<&[ExperienceRecord], AppError> {
        self.require_credential()?;
        Ok(self.experiences.list())
    }

    pub fn add_experience(
        &mut self,
        title: &str,
        description: &str,
        date_range: &str,
    ) -> Result<(), AppError> {
        self.require_credential()?;
        self.experiences.add(title, description, date_range)
    }

    pub fn remove_experience(&mut self, title: &str) -> Result<ExperienceRecord, AppError> {
        self.require_credential()?;
        self.experiences
            .remove(title)
            .ok_or_else(|| AppError::NotFound(format!("Experience '{title}' not found")))
    }

    /// Ready/Done → Running. A failed validation leaves the session Ready with no artifacts.
    pub fn begin_run(&mut self, job_description: &str) -> Result<RunInput, AppError> {
        if self.phase == SessionPhase::Running {
            return Err(AppError::Conflict(
                "Une analyse est déjà en cours".to_string(),
            ));
        }

        match prepare_run(self.credential.as_ref(), &self.experiences, job_description) {
            Ok(input) => {
                self.phase = SessionPhase::Running;
                self.last_run = None;
                Ok(input)
            }
            Err(e) => {
                if self.credential.is_some() {
                    self.phase = SessionPhase::Ready;
                    self.last_run = None;
                }
                Err(e)
            }
        }
    }

    /// Running → Done.
    pub fn complete_run(&mut self, result: AnalysisResult) {
        self.last_run = Some(result);
        self.phase = SessionPhase::Done;
        self.touch();
    }

    /// Running → Ready, for a run that ended without a result.
    pub fn abort_run(&mut self) {
        if self.phase == SessionPhase::Running {
            self.phase = SessionPhase::Ready;
        }
        self.touch();
    }

    pub fn last_run(&self) -> Option<&AnalysisResult> {
        self.last_run.as_ref()
    }

    /// Session teardown: forget the key, the experiences and the artifacts.
    fn end(&mut self) {
        self.credential = None;
        self.experiences.clear();
        self.last_run = None;
        self.phase = SessionPhase::AwaitingCredential;
    }

    fn is_expired(&self, now: DateTime<Utc>, idle_ttl: Duration) -> bool {
        self.phase != SessionPhase::Running && now - self.last_seen > idle_ttl
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// All live sessions, keyed by id. Sessions never share state with each other.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    /// Starts a session. Idle sessions past their TTL are purged first.
    pub async fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id;
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        // A session locked right now is in use; leave it alone.
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(s) => !s.is_expired(now, self.idle_ttl),
            Err(_) => true,
        });
        if sessions.len() < before {
            info!("Purged {} idle sessions", before - sessions.len());
        }
        sessions.insert(id, Arc::new(Mutex::new(session)));

        info!("Session {id} started");
        id
    }

    /// Looks up a session and marks it as seen.
    pub async fn get(&self, id: Uuid) -> Result<SessionHandle, AppError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        handle.lock().await.touch();
        Ok(handle)
    }

    pub async fn end(&self, id: Uuid) -> Result<(), AppError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        handle.lock().await.end();
        info!("Session {id} ended");
        Ok(())
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_session() -> Session {
        let mut session = Session::new();
        session.set_credential("sk-test").unwrap();
        session
    }

    #[test]
    fn test_new_session_awaits_credential() {
        let session = Session::new();
        assert_eq!(session.phase(), SessionPhase::AwaitingCredential);
        assert!(!session.has_credential());
    }

    #[test]
    fn test_setting_credential_makes_session_ready() {
        let session = ready_session();
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert!(session.has_credential());
    }

    #[test]
    fn test_empty_credential_keeps_session_blocked() {
        let mut session = Session::new();
        assert!(session.set_credential("").is_err());
        assert_eq!(session.phase(), SessionPhase::AwaitingCredential);
    }

    #[test]
    fn test_store_operations_require_credential() {
        let mut session = Session::new();
        assert!(matches!(
            session.add_experience("Analyst", "Built reports", "2020-2022"),
            Err(AppError::CredentialRequired)
        ));
        assert!(matches!(session.experiences(), Err(AppError::CredentialRequired)));
        assert!(matches!(
            session.begin_run("Seeking a data analyst"),
            Err(AppError::CredentialRequired)
        ));
        assert_eq!(session.phase(), SessionPhase::AwaitingCredential);
    }

    #[test]
    fn test_remove_missing_experience_is_not_found() {
        let mut session = ready_session();
        assert!(matches!(
            session.remove_experience("Analyst"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_begin_run_moves_to_running_and_blocks_second_run() {
        let mut session = ready_session();
        session
            .add_experience("Analyst", "Built reports", "2020-2022")
            .unwrap();

        session.begin_run("Seeking a data analyst").unwrap();
        assert_eq!(session.phase(), SessionPhase::Running);

        assert!(matches!(
            session.begin_run("Seeking a data analyst"),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_aborted_run_returns_to_ready_and_allows_another() {
        let mut session = ready_session();
        session
            .add_experience("Analyst", "Built reports", "2020-2022")
            .unwrap();
        session.begin_run("Seeking a data analyst").unwrap();

        session.abort_run();

        assert_eq!(session.phase(), SessionPhase::Ready);
        assert!(session.last_run().is_none());
        assert!(session.begin_run("Seeking a data analyst").is_ok());
    }

    #[test]
    fn test_validation_failure_returns_to_ready() {
        let mut session = ready_session();
        assert!(matches!(
            session.begin_run("Seeking a data analyst"),
            Err(AppError::Validation(_))
        ));
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert!(session.last_run().is_none());
    }

    #[test]
    fn test_ended_session_forgets_everything() {
        let mut session = ready_session();
        session
            .add_experience("Analyst", "Built reports", "2020-2022")
            .unwrap();

        session.end();

        assert!(!session.has_credential());
        assert!(session.experiences.is_empty());
        assert_eq!(session.phase(), SessionPhase::AwaitingCredential);
    }

    #[test]
    fn test_running_session_never_expires() {
        let mut session = ready_session();
        session
            .add_experience("Analyst", "Built reports", "2020-2022")
            .unwrap();
        session.begin_run("Seeking a data analyst").unwrap();

        let later = Utc::now() + Duration::hours(5);
        assert!(!session.is_expired(later, Duration::seconds(60)));
    }

    #[tokio::test]
    async fn test_registry_create_get_end() {
        let registry = SessionRegistry::new(Duration::seconds(3600));
        let id = registry.create().await;

        let handle = registry.get(id).await.unwrap();
        assert_eq!(handle.lock().await.id, id);

        registry.end(id).await.unwrap();
        assert!(matches!(registry.get(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(registry.end(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_registry_purges_idle_sessions_on_create() {
        let registry = SessionRegistry::new(Duration::zero());
        let stale = registry.create().await;
        registry.get(stale).await.unwrap().lock().await.last_seen =
            Utc::now() - Duration::seconds(10);

        let fresh = registry.create().await;

        assert_eq!(registry.len().await, 1);
        assert!(registry.get(fresh).await.is_ok());
        assert!(registry.get(stale).await.is_err());
    }
}
