//! Preference learner
//!
//! Records interactions into the user's activity log and, for likes,
//! reinforces the preference counters. Each call is a single
//! `PreferenceStore::update`; concurrent calls for one user may still race on
//! stores that do not make `update` atomic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use swipefeed_core::{ActivityAction, ActivityEvent, UserPreferenceState};
use tracing::{debug, instrument, warn};

use crate::error::ServiceError;
use crate::preference_store::PreferenceStore;

pub struct PreferenceLearner {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceLearner {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Append the event to the activity log and stamp `updated_at`; likes
    /// with metadata also bump the region, source and category counters
    #[instrument(skip(self, event), fields(user_id = %event.user_id, action = %event.action))]
    pub async fn record_activity(&self, event: ActivityEvent) -> Result<UserPreferenceState, ServiceError> {
        validate_user_id(&event.user_id)?;
        if event.article_id.trim().is_empty() {
            return Err(ServiceError::invalid_input("articleId is required"));
        }

        let record = event.to_record();
        let occurred_at = record.timestamp;
        let reinforce = match (event.action, event.metadata) {
            (ActivityAction::Liked, Some(metadata)) => Some(metadata),
            _ => None,
        };

        let state = self
            .store
            .update(
                &event.user_id,
                Box::new(move |state: &mut UserPreferenceState| {
                    if let Some(metadata) = &reinforce {
                        state.reinforce(metadata);
                    }
                    state.push_activity(record);
                    state.updated_at = Some(occurred_at);
                }),
            )
            .await?;

        debug!(activities = state.activities.len(), "Recorded activity");
        Ok(state)
    }

    /// Overwrite the customization level; counters and log are untouched
    #[instrument(skip(self))]
    pub async fn set_customization_level(
        &self,
        user_id: &str,
        level: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<UserPreferenceState, ServiceError> {
        validate_user_id(user_id)?;
        let level = u8::try_from(level)
            .ok()
            .filter(|l| *l <= 100)
            .ok_or_else(|| {
                ServiceError::invalid_input(format!(
                    "customizationLevel must be between 0 and 100, got {}",
                    level
                ))
            })?;

        let state = self
            .store
            .update(
                user_id,
                Box::new(move |state: &mut UserPreferenceState| {
                    state.customization_level = level;
                    state.updated_at = Some(updated_at);
                }),
            )
            .await?;

        Ok(state)
    }

    /// Stored state, or the default when absent or unreadable
    pub async fn load_preferences(&self, user_id: &str) -> UserPreferenceState {
        match self.store.get(user_id).await {
            Ok(Some(state)) => state,
            Ok(None) => UserPreferenceState::default(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load preferences, using defaults");
                UserPreferenceState::default()
            }
        }
    }
}

fn validate_user_id(user_id: &str) -> Result<(), ServiceError> {
    if user_id.trim().is_empty() {
        return Err(ServiceError::invalid_input("userId is required"));
    }
    Ok(())
}
