use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::SKEW_MS;

/// Time-bounded cache rejecting re-use of a previously seen
/// `(device, signature)` pair within the signature validity window.
///
/// Shared by every concurrently authenticated request; check-and-insert is a
/// single atomic operation through the map's entry API, so two in-flight
/// requests bearing the same captured signature cannot both pass.
#[derive(Debug)]
pub struct ReplayGuard {
    window_ms: i64,
    seen: DashMap<String, i64>,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(SKEW_MS)
    }
}

impl ReplayGuard {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            seen: DashMap::new(),
        }
    }

    /// Record a signature sighting. Returns `false` when the same
    /// `(device, signature)` pair was already seen within the window.
    ///
    /// Entries older than twice the window are swept on every write, which
    /// bounds memory without a timer task. The incoming timestamp has
    /// already passed the freshness check, so it is a safe sweep baseline.
    pub fn check_and_record(&self, device_id: &str, signature: &str, timestamp_ms: i64) -> bool {
        self.seen
            .retain(|_, last| timestamp_ms.saturating_sub(*last) <= 2 * self.window_ms);

        let key = format!("{}:{}", device_id, signature);
        match self.seen.entry(key) {
            Entry::Occupied(mut entry) => {
                if (timestamp_ms - *entry.get()).abs() <= self.window_ms {
                    return false;
                }
                entry.insert(timestamp_ms);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(timestamp_ms);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
