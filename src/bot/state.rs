//! Dialog state register: which step of a multi-turn flow each user is in.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// The step a user is parked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    AwaitingLessonChoice,
    /// Waiting for "Name Phone" for the roots search form.
    AwaitingRoots,
    AwaitingGoodsChoice,
    /// Waiting for a free-text question for the completion provider.
    AwaitingQuestion,
}

impl DialogState {
    /// Whether free text in this state goes to a dedicated handler.
    pub fn accepts_text(&self) -> bool {
        matches!(self, Self::AwaitingRoots | Self::AwaitingQuestion)
    }
}

impl std::fmt::Display for DialogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingLessonChoice => "awaiting_lesson_choice",
            Self::AwaitingRoots => "awaiting_roots",
            Self::AwaitingGoodsChoice => "awaiting_goods_choice",
            Self::AwaitingQuestion => "awaiting_question",
        };
        write!(f, "{s}")
    }
}

/// Identifies one user's conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub user_id: i64,
    pub chat_id: i64,
}

impl StateKey {
    pub fn new(user_id: i64, chat_id: i64) -> Self {
        Self { user_id, chat_id }
    }
}

/// Process-wide map from conversation to dialog state.
///
/// Holds at most one state per key. Entries never expire and are not
/// persisted. Concurrent writers to the same key race; the last one wins.
#[derive(Debug, Default)]
pub struct StateRegister {
    states: RwLock<HashMap<StateKey, DialogState>>,
}

impl StateRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state for `key`, replacing any previous one.
    pub async fn set(&self, key: StateKey, state: DialogState) {
        let previous = self.states.write().await.insert(key, state);
        tracing::debug!(
            user_id = key.user_id,
            chat_id = key.chat_id,
            state = %state,
            previous = ?previous,
            "Dialog state set"
        );
    }

    pub async fn get(&self, key: StateKey) -> Option<DialogState> {
        self.states.read().await.get(&key).copied()
    }

    /// Remove the state for `key`. Clearing an empty key is a no-op.
    ///
    /// Returns `true` if an entry was removed.
    pub async fn clear(&self, key: StateKey) -> bool {
        let removed = self.states.write().await.remove(&key);
        if let Some(state) = removed {
            tracing::debug!(
                user_id = key.user_id,
                chat_id = key.chat_id,
                state = %state,
                "Dialog state cleared"
            );
        }
        removed.is_some()
    }

    /// Number of conversations currently holding a state.
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

/// Clears a conversation's state when dropped.
///
/// Prefer [`StateGuard::release`] on normal exits; the `Drop` path covers
/// early returns and panics.
#[must_use = "dropping the guard immediately clears the state"]
pub struct StateGuard {
    register: Arc<StateRegister>,
    key: StateKey,
    armed: bool,
}

impl StateGuard {
    pub fn new(register: Arc<StateRegister>, key: StateKey) -> Self {
        Self {
            register,
            key,
            armed: true,
        }
    }

    /// Clear the state now.
    pub async fn release(mut self) {
        self.armed = false;
        self.register.clear(self.key).await;
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut states) = self.register.states.try_write() {
            states.remove(&self.key);
            return;
        }
        // Lock is contended: finish the clear on the runtime.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let register = self.register.clone();
                let key = self.key;
                handle.spawn(async move {
                    register.clear(key).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    user_id = self.key.user_id,
                    chat_id = self.key.chat_id,
                    "Dialog state not cleared: no runtime available"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: StateKey = StateKey {
        user_id: 1,
        chat_id: 10,
    };

    #[tokio::test]
    async fn get_on_empty_register_is_none() {
        let reg = StateRegister::new();
        assert_eq!(reg.get(KEY).await, None);
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn set_overwrites_previous_state() {
        let reg = StateRegister::new();
        reg.set(KEY, DialogState::AwaitingRoots).await;
        reg.set(KEY, DialogState::AwaitingQuestion).await;
        assert_eq!(reg.get(KEY).await, Some(DialogState::AwaitingQuestion));
        assert_eq!(reg.len().await, 1);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let reg = StateRegister::new();
        reg.set(KEY, DialogState::AwaitingRoots).await;
        assert!(reg.clear(KEY).await);
        assert!(!reg.clear(KEY).await);
        assert_eq!(reg.get(KEY).await, None);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let reg = StateRegister::new();
        let same_user_other_chat = StateKey::new(1, 11);
        let other_user_same_chat = StateKey::new(2, 10);

        reg.set(KEY, DialogState::AwaitingRoots).await;
        reg.set(same_user_other_chat, DialogState::AwaitingQuestion)
            .await;

        assert_eq!(reg.get(other_user_same_chat).await, None);
        reg.clear(KEY).await;
        assert_eq!(
            reg.get(same_user_other_chat).await,
            Some(DialogState::AwaitingQuestion)
        );
    }

    #[tokio::test]
    async fn concurrent_writers_leave_one_state() {
        let reg = Arc::new(StateRegister::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let reg = reg.clone();
            handles.push(tokio::spawn(async move {
                let state = if i % 2 == 0 {
                    DialogState::AwaitingRoots
                } else {
                    DialogState::AwaitingQuestion
                };
                reg.set(KEY, state).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(reg.len().await, 1);
        assert!(reg.get(KEY).await.is_some());
    }

    #[tokio::test]
    async fn guard_release_clears_state() {
        let reg = Arc::new(StateRegister::new());
        reg.set(KEY, DialogState::AwaitingQuestion).await;
        let guard = StateGuard::new(reg.clone(), KEY);
        guard.release().await;
        assert_eq!(reg.get(KEY).await, None);
    }

    #[tokio::test]
    async fn guard_drop_clears_state() {
        let reg = Arc::new(StateRegister::new());
        reg.set(KEY, DialogState::AwaitingQuestion).await;
        {
            let _guard = StateGuard::new(reg.clone(), KEY);
        }
        assert_eq!(reg.get(KEY).await, None);
    }

    #[tokio::test]
    async fn guard_clears_on_early_error_return() {
        async fn handle(
            reg: Arc<StateRegister>,
            outcome: Result<(), &'static str>,
        ) -> Result<(), &'static str> {
            let _guard = StateGuard::new(reg, KEY);
            outcome?;
            Ok(())
        }

        let reg = Arc::new(StateRegister::new());
        reg.set(KEY, DialogState::AwaitingQuestion).await;
        assert!(handle(reg.clone(), Err("provider down")).await.is_err());
        assert_eq!(reg.get(KEY).await, None);
    }

    #[tokio::test]
    async fn guard_only_touches_its_own_key() {
        let reg = Arc::new(StateRegister::new());
        let other = StateKey::new(2, 20);
        reg.set(KEY, DialogState::AwaitingQuestion).await;
        reg.set(other, DialogState::AwaitingRoots).await;
        drop(StateGuard::new(reg.clone(), KEY));
        assert_eq!(reg.get(other).await, Some(DialogState::AwaitingRoots));
    }

    #[test]
    fn only_form_states_accept_text() {
        assert!(DialogState::AwaitingRoots.accepts_text());
        assert!(DialogState::AwaitingQuestion.accepts_text());
        assert!(!DialogState::AwaitingLessonChoice.accepts_text());
        assert!(!DialogState::AwaitingGoodsChoice.accepts_text());
    }

    #[test]
    fn display_matches_serde() {
        for state in [
            DialogState::AwaitingLessonChoice,
            DialogState::AwaitingRoots,
            DialogState::AwaitingGoodsChoice,
            DialogState::AwaitingQuestion,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(format!("\"{state}\""), json);
        }
    }
}
