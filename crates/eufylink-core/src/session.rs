// ── Session readiness flags ──
//
// Two booleans the coordinator waits on: "the server accepted our listen
// request" and "the last poll refresh was acknowledged". Each flag is a
// watch channel, so waiters wake on the write instead of polling.

use tokio::sync::watch;

use crate::config::FlagWait;

/// A named session condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionFlag {
    /// A `start_listening` result has been applied.
    ListeningActive,
    /// A `poll_refresh` result has been received.
    PollRefreshed,
}

#[derive(Debug)]
pub struct SessionFlags {
    listening_active: watch::Sender<bool>,
    poll_refreshed: watch::Sender<bool>,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self {
            listening_active: watch::Sender::new(false),
            poll_refreshed: watch::Sender::new(false),
        }
    }

    fn sender(&self, flag: SessionFlag) -> &watch::Sender<bool> {
        match flag {
            SessionFlag::ListeningActive => &self.listening_active,
            SessionFlag::PollRefreshed => &self.poll_refreshed,
        }
    }

    pub fn set(&self, flag: SessionFlag, value: bool) {
        self.sender(flag).send_replace(value);
    }

    pub fn get(&self, flag: SessionFlag) -> bool {
        *self.sender(flag).borrow()
    }

    /// Wait until `flag == expected`, for at most `wait.ceiling()`.
    ///
    /// Returns `true` immediately when the flag already matches, and
    /// `false` (never an error) when the bound elapses first.
    pub async fn wait_for(&self, flag: SessionFlag, expected: bool, wait: FlagWait) -> bool {
        let mut rx = self.sender(flag).subscribe();
        let observed = tokio::time::timeout(wait.ceiling(), async {
            rx.wait_for(|value| *value == expected).await.is_ok()
        })
        .await;

        match observed {
            Ok(matched) => matched,
            Err(_) => {
                tracing::debug!(?flag, expected, "flag wait timed out");
                false
            }
        }
    }
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self::new()
    }
}
