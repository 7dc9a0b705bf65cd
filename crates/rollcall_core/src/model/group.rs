//! Preset group model.

use super::recipient::RecipientId;
use serde::{Deserialize, Serialize};

/// Named, reusable recipient set usable as a targeting mode.
///
/// `member_ids` is kept deduplicated and sorted; sessions snapshot it at
/// creation, so later edits never reach existing sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetGroup {
    pub id: i64,
    pub name: String,
    pub member_ids: Vec<RecipientId>,
}
