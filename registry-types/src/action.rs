use serde::{Deserialize, Serialize};
use strum::Display;

/// The closed set of change-log action types (spec §6).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ActionType {
    Added,
    Modified,
    Deleted,
}
