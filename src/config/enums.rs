use serde::{Deserialize, Serialize};
use strum::{EnumString, Display};

/// Which bubble is dropped when the queue grows past its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum EvictionPolicy {
    /// Drop the bubble that was just appended.
    #[default]
    #[strum(to_string = "newest", serialize = "last")]
    Newest,
    /// Drop the bubble that has been queued the longest.
    #[strum(to_string = "oldest", serialize = "first")]
    Oldest,
}
