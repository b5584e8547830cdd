/// Import wizard session store and state machine
///
/// One in-flight import per acting user, held in process memory. Each wizard
/// step is a discrete request: the handler clones the session out, advances
/// it through the transition helpers here, and writes it back. No lock spans
/// a step — two simultaneous requests from the same user can interleave and
/// the later write wins, matching the single-user-at-a-keyboard assumption
/// of the wizard.
///
/// Sessions end three ways, all of which release the stored temp file:
/// commit (success teardown), explicit cancel, or TTL expiry swept when the
/// store is next touched.

use chrono::{Duration, Utc};
use dashmap::DashMap;

use crate::middleware::error_handling::{AppError, Result};
use crate::models::import::{ColumnMapping, WizardSession, WizardState};
use crate::services::channel_homologation_service::HomologationTable;
use crate::services::sku_reconciler_service::CorrectionTable;
use crate::utils::FileStorage;

pub struct WizardStore {
    sessions: DashMap<String, WizardSession>,
    ttl: Duration,
}

impl WizardStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: Duration::minutes(ttl_minutes.max(1)),
        }
    }

    /// Start a session for a user, replacing (and cleaning up) any import
    /// they abandoned earlier. Also sweeps other users' expired sessions —
    /// the store has no background task, so reclamation piggybacks on
    /// traffic.
    pub fn begin(&self, session: WizardSession, storage: &FileStorage) {
        self.sweep_expired(storage);

        if let Some((_, old)) = self.sessions.remove(&session.user) {
            tracing::info!(
                "Replacing abandoned import session {} for user {}",
                old.id,
                old.user
            );
            if let Err(e) = storage.delete_file(&old.file_path) {
                tracing::warn!("Failed to delete abandoned upload {}: {}", old.file_path, e);
            }
        }

        self.sessions.insert(session.user.clone(), session);
    }

    /// Current session for a user. Expired sessions read as absent.
    pub fn get(&self, user: &str) -> Result<WizardSession> {
        let session = self
            .sessions
            .get(user)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound("No import in progress".to_string()))?;

        if Utc::now() - session.touched_at > self.ttl {
            self.sessions.remove(user);
            return Err(AppError::NotFound("Import session expired".to_string()));
        }

        Ok(session)
    }

    /// Write an advanced session back.
    pub fn update(&self, mut session: WizardSession) {
        session.touch();
        self.sessions.insert(session.user.clone(), session);
    }

    /// Drop a session without touching its file (commit teardown deletes the
    /// file itself, as part of its own cleanup ordering).
    pub fn remove(&self, user: &str) -> Option<WizardSession> {
        self.sessions.remove(user).map(|(_, session)| session)
    }

    /// Explicit cancel transition: drop the session and release its file.
    pub fn cancel(&self, user: &str, storage: &FileStorage) -> Result<WizardSession> {
        let (_, mut session) = self
            .sessions
            .remove(user)
            .ok_or_else(|| AppError::NotFound("No import in progress".to_string()))?;

        session.state = WizardState::Cancelled;
        if let Err(e) = storage.delete_file(&session.file_path) {
            tracing::warn!("Failed to delete upload on cancel {}: {}", session.file_path, e);
        }

        tracing::info!("Import session {} cancelled by user {}", session.id, session.user);
        Ok(session)
    }

    /// Expire transition for idle sessions.
    pub fn sweep_expired(&self, storage: &FileStorage) {
        let cutoff = Utc::now() - self.ttl;
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.touched_at < cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        for user in expired {
            if let Some((_, session)) = self.sessions.remove(&user) {
                tracing::info!("Expiring idle import session {} for user {}", session.id, user);
                if let Err(e) = storage.delete_file(&session.file_path) {
                    tracing::warn!("Failed to delete expired upload {}: {}", session.file_path, e);
                }
            }
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================
//
// Steps may be re-entered (the wizard UI has a back button); re-submitting an
// earlier step rewinds the session by clearing everything downstream of it.

pub fn select_sheet(session: &mut WizardSession, sheet: String, headers: Vec<String>) {
    session.sheet = Some(sheet);
    set_headers(session, headers);
}

pub fn set_headers(session: &mut WizardSession, headers: Vec<String>) {
    session.headers = headers;
    session.mapping = None;
    session.channel_table.clear();
    session.sku_corrections.clear();
    session.state = WizardState::HeadersExtracted;
}

pub fn set_mapping(session: &mut WizardSession, mapping: ColumnMapping) {
    session.mapping = Some(mapping);
    session.channel_table.clear();
    session.sku_corrections.clear();
    session.state = WizardState::Mapped;
}

pub fn channels_extracted(session: &mut WizardSession) {
    session.state = WizardState::ChannelsExtracted;
}

pub fn set_channel_table(session: &mut WizardSession, table: std::collections::HashMap<String, Option<String>>) {
    session.channel_table = table;
    session.sku_corrections.clear();
    session.state = WizardState::Homologated;
}

pub fn skus_checked(session: &mut WizardSession) {
    session.state = WizardState::SkusChecked;
}

pub fn set_corrections(session: &mut WizardSession, corrections: std::collections::HashMap<String, String>) {
    session.sku_corrections = corrections;
    session.state = WizardState::CorrectionsCollected;
}

/// The session's accumulated decisions as the typed tables the commit stage
/// applies.
pub fn homologation_table(session: &WizardSession) -> HomologationTable {
    HomologationTable::from_table(session.channel_table.clone())
}

pub fn correction_table(session: &WizardSession) -> CorrectionTable {
    CorrectionTable::new(session.sku_corrections.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn storage() -> FileStorage {
        let dir = std::env::temp_dir().join(format!("sellout-wizard-{}", Uuid::new_v4()));
        FileStorage::new(dir).unwrap()
    }

    fn session_for(user: &str, storage: &FileStorage) -> WizardSession {
        let (path, _) = storage
            .save_file(Uuid::new_v4(), "report.csv", b"sku\nA1\n")
            .unwrap();
        WizardSession::new(user, path, "report.csv".to_string())
    }

    #[test]
    fn test_begin_get_roundtrip() {
        let storage = storage();
        let store = WizardStore::new(60);
        let session = session_for("alice", &storage);
        let id = session.id;

        store.begin(session, &storage);
        assert_eq!(store.get("alice").unwrap().id, id);
        assert!(store.get("bob").is_err());
    }

    #[test]
    fn test_begin_replaces_and_cleans_previous_upload() {
        let storage = storage();
        let store = WizardStore::new(60);

        let first = session_for("alice", &storage);
        let first_path = first.file_path.clone();
        store.begin(first, &storage);

        let second = session_for("alice", &storage);
        store.begin(second, &storage);

        assert!(!storage.full_path(&first_path).exists());
    }

    #[test]
    fn test_cancel_releases_file() {
        let storage = storage();
        let store = WizardStore::new(60);
        let session = session_for("alice", &storage);
        let path = session.file_path.clone();

        store.begin(session, &storage);
        let cancelled = store.cancel("alice", &storage).unwrap();

        assert_eq!(cancelled.state, WizardState::Cancelled);
        assert!(!storage.full_path(&path).exists());
        assert!(store.get("alice").is_err());
    }

    #[test]
    fn test_expired_session_reads_as_absent() {
        let storage = storage();
        let store = WizardStore::new(1);
        let mut session = session_for("alice", &storage);
        session.touched_at = Utc::now() - Duration::minutes(5);
        store.sessions.insert(session.user.clone(), session);

        assert!(store.get("alice").is_err());
    }

    #[test]
    fn test_mapping_resubmission_rewinds_downstream_state() {
        let storage = storage();
        let mut session = session_for("alice", &storage);
        set_headers(&mut session, vec!["sku".to_string(), "canal".to_string()]);

        set_mapping(&mut session, ColumnMapping::default());
        let mut table = std::collections::HashMap::new();
        table.insert("Moderno".to_string(), Some("Retail".to_string()));
        set_channel_table(&mut session, table);
        let mut corrections = std::collections::HashMap::new();
        corrections.insert("X99".to_string(), "X100".to_string());
        set_corrections(&mut session, corrections);
        assert_eq!(session.state, WizardState::CorrectionsCollected);

        // going back to the mapping step drops homologation + corrections
        set_mapping(&mut session, ColumnMapping::default());
        assert_eq!(session.state, WizardState::Mapped);
        assert!(session.channel_table.is_empty());
        assert!(session.sku_corrections.is_empty());
    }
}
