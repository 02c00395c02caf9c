//! Panel state management
//!
//! Reads synthesize default states for missing rows without writing them.
//! Writes are upserts guarded by the backend's uniqueness on (user, brick):
//! when two requests race to create the same row, the loser re-fetches and
//! retries. Persistence is best effort; a state write never fails the
//! request that triggered it.

use crate::error::StoreError;
use crate::storage::StateStorage;
use brick_types::{PanelId, PanelState, StateFields, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for the state manager
#[derive(Debug, Clone)]
pub struct StateManagerConfig {
    /// Retries after a unique-constraint conflict
    pub max_upsert_retries: u32,
}

impl Default for StateManagerConfig {
    fn default() -> Self {
        Self {
            max_upsert_retries: 3,
        }
    }
}

/// Per-user brick state store
pub struct PanelStateManager {
    storage: Arc<dyn StateStorage>,
    config: StateManagerConfig,
}

impl PanelStateManager {
    pub fn new(storage: Arc<dyn StateStorage>, config: StateManagerConfig) -> Self {
        Self { storage, config }
    }

    /// State of one brick; a transient default when nothing is stored.
    pub async fn get(&self, user_id: &UserId, panel_id: &PanelId) -> crate::Result<PanelState> {
        Ok(self
            .storage
            .fetch_state(user_id, panel_id)
            .await?
            .unwrap_or_else(|| PanelState::new(user_id.clone(), panel_id.clone())))
    }

    /// States of many bricks in one query, defaults synthesized for the
    /// missing ones.
    pub async fn get_many(
        &self,
        panel_ids: &[PanelId],
        user_id: &UserId,
    ) -> crate::Result<HashMap<PanelId, PanelState>> {
        let mut states: HashMap<PanelId, PanelState> = self
            .storage
            .fetch_states(user_id, panel_ids)
            .await?
            .into_iter()
            .map(|state| (state.panel_id.clone(), state))
            .collect();

        for panel_id in panel_ids {
            states
                .entry(panel_id.clone())
                .or_insert_with(|| PanelState::new(user_id.clone(), panel_id.clone()));
        }

        Ok(states)
    }

    /// Upsert some fields of a brick state.
    ///
    /// Returns the state as the caller intended it. Storage failures and
    /// exhausted retries are logged, never returned.
    pub async fn set_fields(
        &self,
        user_id: &UserId,
        panel_id: &PanelId,
        fields: &StateFields,
    ) -> PanelState {
        let mut intended = PanelState::new(user_id.clone(), panel_id.clone());
        fields.apply(&mut intended);

        for attempt in 0..=self.config.max_upsert_retries {
            let existing = match self.storage.fetch_state(user_id, panel_id).await {
                Ok(existing) => existing,
                Err(e) => {
                    warn!(panel_id = %panel_id, user_id = %user_id, error = %e, "Failed to fetch brick state");
                    return intended;
                }
            };

            match existing {
                Some(mut state) => {
                    if !fields.apply(&mut state) {
                        return state;
                    }
                    match self.storage.update_state(&state).await {
                        Ok(true) => return state,
                        Ok(false) => {
                            debug!(panel_id = %panel_id, attempt, "Brick state vanished during update, retrying");
                            intended = state;
                        }
                        Err(e) => {
                            warn!(panel_id = %panel_id, user_id = %user_id, error = %e, "Failed to update brick state");
                            return state;
                        }
                    }
                }
                None => {
                    let mut state = PanelState::new(user_id.clone(), panel_id.clone());
                    if !fields.apply(&mut state) {
                        // Default values are not worth a row.
                        return state;
                    }
                    match self.storage.insert_state(&state).await {
                        Ok(()) => return state,
                        Err(StoreError::UniqueViolation { .. }) => {
                            debug!(panel_id = %panel_id, attempt, "Concurrent brick state creation, retrying");
                            intended = state;
                        }
                        Err(e) => {
                            warn!(panel_id = %panel_id, user_id = %user_id, error = %e, "Failed to create brick state");
                            return state;
                        }
                    }
                }
            }
        }

        warn!(
            panel_id = %panel_id,
            user_id = %user_id,
            retries = self.config.max_upsert_retries,
            "Giving up on brick state write"
        );
        intended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::storage::InMemoryStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager(storage: Arc<dyn StateStorage>) -> PanelStateManager {
        PanelStateManager::new(storage, StateManagerConfig::default())
    }

    fn close() -> StateFields {
        StateFields {
            is_open: Some(false),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_returns_transient_default() {
        let storage = Arc::new(InMemoryStorage::new());
        let mgr = manager(storage.clone());
        let (user, panel) = (UserId::new("u1"), PanelId::new("p1"));

        let state = mgr.get(&user, &panel).await.unwrap();
        assert!(state.is_open);
        assert!(state.show_empty_fields);
        assert_eq!(storage.count_states(&user, &panel).await, 0);
    }

    #[tokio::test]
    async fn test_set_fields_creates_then_updates() {
        let storage = Arc::new(InMemoryStorage::new());
        let mgr = manager(storage.clone());
        let (user, panel) = (UserId::new("u1"), PanelId::new("p1"));

        let state = mgr.set_fields(&user, &panel, &close()).await;
        assert!(!state.is_open);

        let fields = StateFields {
            show_empty_fields: Some(false),
            ..Default::default()
        };
        mgr.set_fields(&user, &panel, &fields).await;

        let state = mgr.get(&user, &panel).await.unwrap();
        assert!(!state.is_open);
        assert!(!state.show_empty_fields);
        assert_eq!(storage.count_states(&user, &panel).await, 1);
    }

    #[tokio::test]
    async fn test_default_values_are_not_persisted() {
        let storage = Arc::new(InMemoryStorage::new());
        let mgr = manager(storage.clone());
        let (user, panel) = (UserId::new("u1"), PanelId::new("p1"));

        let fields = StateFields {
            is_open: Some(true),
            ..Default::default()
        };
        mgr.set_fields(&user, &panel, &fields).await;
        assert_eq!(storage.count_states(&user, &panel).await, 0);
    }

    #[tokio::test]
    async fn test_get_many_synthesizes_missing() {
        let storage = Arc::new(InMemoryStorage::new());
        let mgr = manager(storage);
        let user = UserId::new("u1");
        let ids = [PanelId::new("a"), PanelId::new("b")];

        mgr.set_fields(&user, &ids[0], &close()).await;

        let states = mgr.get_many(&ids, &user).await.unwrap();
        assert_eq!(states.len(), 2);
        assert!(!states[&ids[0]].is_open);
        assert!(states[&ids[1]].is_open);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writes_leave_one_row() {
        let storage = Arc::new(InMemoryStorage::new());
        let mgr = Arc::new(manager(storage.clone()));
        let (user, panel) = (UserId::new("u1"), PanelId::new("p1"));

        let open = StateFields {
            show_empty_fields: Some(false),
            is_open: Some(true),
            extra_data: None,
        };

        let a = {
            let (mgr, user, panel) = (mgr.clone(), user.clone(), panel.clone());
            tokio::spawn(async move { mgr.set_fields(&user, &panel, &close()).await })
        };
        let b = {
            let (mgr, user, panel) = (mgr.clone(), user.clone(), panel.clone());
            tokio::spawn(async move { mgr.set_fields(&user, &panel, &open).await })
        };
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(storage.count_states(&user, &panel).await, 1);
    }

    /// Storage whose inserts always lose the race.
    struct AlwaysConflicting {
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl StateStorage for AlwaysConflicting {
        async fn fetch_state(&self, _: &UserId, _: &PanelId) -> Result<Option<PanelState>> {
            Ok(None)
        }

        async fn fetch_states(&self, _: &UserId, _: &[PanelId]) -> Result<Vec<PanelState>> {
            Ok(Vec::new())
        }

        async fn insert_state(&self, state: &PanelState) -> Result<()> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::UniqueViolation {
                user_id: state.user_id.clone(),
                panel_id: state.panel_id.clone(),
            })
        }

        async fn update_state(&self, _: &PanelState) -> Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_still_succeed() {
        let storage = Arc::new(AlwaysConflicting {
            inserts: AtomicUsize::new(0),
        });
        let mgr = PanelStateManager::new(
            storage.clone(),
            StateManagerConfig {
                max_upsert_retries: 2,
            },
        );

        let state = mgr
            .set_fields(&UserId::new("u1"), &PanelId::new("p1"), &close())
            .await;
        assert!(!state.is_open);
        assert_eq!(storage.inserts.load(Ordering::SeqCst), 3);
    }
}
