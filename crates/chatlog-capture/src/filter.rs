use std::collections::BTreeSet;
use std::fmt;

/// Group whitelist/blacklist. Fixed once the service is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Empty means every group is allowed.
    pub whitelist: BTreeSet<String>,
    pub blacklist: BTreeSet<String>,
}

impl FilterPolicy {
    pub fn new<W, B>(whitelist: W, blacklist: B) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            whitelist: whitelist.into_iter().map(Into::into).collect(),
            blacklist: blacklist.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether events from `group_id` are eligible for recording.
    ///
    /// A non-empty whitelist must contain the group; the blacklist is
    /// checked afterwards, so a group on both lists is not recorded.
    pub fn should_record(&self, group_id: impl fmt::Display) -> bool {
        let group_id = group_id.to_string();

        if !self.whitelist.is_empty() && !self.whitelist.contains(&group_id) {
            return false;
        }

        !self.blacklist.contains(&group_id)
    }
}
