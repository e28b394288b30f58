//! User identification by proximity card.
//!
//! The card reader itself is external: whatever drives it hands a numeric
//! card identifier to [`IdentityResolver::scan`].

pub mod enrollment;
pub mod preferences;
pub mod resolver;

pub use enrollment::{ConsolePrompt, EnrollmentPrompt};
pub use preferences::{
    CardId, PreferenceStore, PreferenceTable, SeasonalSetpoints, UserPreference, card_id_from_uid,
};
pub use resolver::{IdentityResolver, Resolution, resolve};
