//! Change windows for incremental server diffs.
//!
//! A window covers `[from, to)`: a change stamped exactly `from` belongs to
//! this window, one stamped exactly `to` belongs to the next. Consecutive
//! windows therefore neither overlap nor leave gaps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters of a `get_server_changes` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeQuery {
    /// Start of the window; `None` for an initial sync.
    pub from: Option<DateTime<Utc>>,
    pub to: DateTime<Utc>,
    /// Items last touched before this instant are ignored.
    pub cutoff: Option<DateTime<Utc>>,
    /// Only "did anything change" matters.
    pub ping: bool,
}

impl ChangeQuery {
    pub fn new(from: Option<DateTime<Utc>>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            cutoff: None,
            ping: false,
        }
    }

    pub fn with_cutoff(mut self, cutoff: Option<DateTime<Utc>>) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn ping(mut self, ping: bool) -> Self {
        self.ping = ping;
        self
    }

    /// The window that follows this one, ending at `to`.
    pub fn next(&self, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(self.to),
            to,
            ..*self
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && at < self.to
    }

    /// Inside the window and not older than the cutoff.
    pub fn admits(&self, at: DateTime<Utc>) -> bool {
        self.contains(at) && self.cutoff.is_none_or(|cutoff| at >= cutoff)
    }

    /// Select the ids of items modified inside this window.
    ///
    /// In ping mode at most one id is returned: enough to signal that the
    /// folder changed, and always a subset of the full result.
    pub fn select_changes<I, S>(&self, items: I) -> Vec<String>
    where
        I: IntoIterator<Item = (S, DateTime<Utc>)>,
        S: Into<String>,
    {
        let admitted = items
            .into_iter()
            .filter(|(_, at)| self.admits(*at))
            .map(|(id, _)| id.into());
        if self.ping {
            admitted.take(1).collect()
        } else {
            admitted.collect()
        }
    }
}
