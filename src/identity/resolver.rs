//! Card scan → user resolution.

use super::enrollment::EnrollmentPrompt;
use super::preferences::{CardId, PreferenceStore, PreferenceTable, UserPreference};
use log::{info, warn};
use std::sync::Arc;

/// Outcome of looking a card up in the preference table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    Known(UserPreference),
    Unknown(CardId),
}

/// Look a scanned card up without side effects.
pub fn resolve(card_id: CardId, table: &PreferenceTable) -> Resolution {
    match table.get(card_id) {
        Some(preference) => Resolution::Known(preference),
        None => Resolution::Unknown(card_id),
    }
}

/// Resolves scans against the shared store and runs enrollment for unknown
/// cards. Each scan is independent; nothing is retried.
pub struct IdentityResolver {
    store: Arc<PreferenceStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<PreferenceStore> {
        &self.store
    }

    /// Handle one scan. Returns the preference that should become active, or
    /// `None` when the card is unknown and enrollment was declined.
    pub fn scan(
        &self,
        card_id: CardId,
        prompt: &mut dyn EnrollmentPrompt,
    ) -> Option<UserPreference> {
        let table = self.store.table();
        match resolve(card_id, &table) {
            Resolution::Known(preference) => {
                info!("Welcome back, user {}", card_id);
                Some(preference)
            }
            Resolution::Unknown(card_id) => {
                info!("Unknown user {}", card_id);
                let setpoints = prompt.offer(card_id)?;
                match self
                    .store
                    .upsert(card_id, setpoints.winter, setpoints.summer)
                {
                    Ok(preference) => Some(preference),
                    Err(e) => {
                        // Saving failed but the table already holds the entry
                        warn!("User {} enrolled for this run only: {}", card_id, e);
                        self.store.get(card_id)
                    }
                }
            }
        }
    }
}
