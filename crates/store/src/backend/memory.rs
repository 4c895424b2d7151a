use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateguard_types::{ClockHandle, SystemClock};
use parking_lot::Mutex;

use crate::errors::StoreError;
use crate::r#trait::{AdmitOutcome, AdmitRequest, TtlValue, WindowStore};

#[derive(Default)]
struct WindowSet {
    entries: BTreeSet<(i64, String)>,
    expires_at_ms: Option<i64>,
}

impl WindowSet {
    fn is_expired(&self, now_ms: i64) -> bool {
        matches!(self.expires_at_ms, Some(at) if at <= now_ms)
    }

    fn purge(&mut self, cutoff_ms: i64) -> u64 {
        let before = self.entries.len();
        self.entries.retain(|(ts, _)| *ts > cutoff_ms);
        (before - self.entries.len()) as u64
    }
}

#[derive(Default)]
struct State {
    windows: HashMap<String, WindowSet>,
    values: HashMap<String, (String, i64)>,
    lists: HashMap<String, VecDeque<String>>,
    writes: u64,
}

/// Writes between full sweeps of expired windows and values.
const SWEEP_EVERY: u64 = 1024;

impl State {
    /// Counts a write and, every [`SWEEP_EVERY`] writes, drops whatever has
    /// expired by `now_ms`.
    fn note_write(&mut self, now_ms: i64) {
        self.writes = self.writes.wrapping_add(1);
        if self.writes % SWEEP_EVERY == 0 {
            self.sweep(now_ms);
        }
    }

    fn sweep(&mut self, now_ms: i64) {
        self.windows
            .retain(|_, set| !set.is_expired(now_ms) && !set.entries.is_empty());
        self.values.retain(|_, (_, expires_at)| *expires_at > now_ms);
    }
}

/// Single-process backend. The whole admit sequence runs under one lock, which
/// gives the same atomicity the Redis script provides.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    clock: ClockHandle,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: ClockHandle) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    fn window_mut<'a>(state: &'a mut State, key: &str, now_ms: i64) -> &'a mut WindowSet {
        let set = state.windows.entry(key.to_string()).or_default();
        if set.is_expired(now_ms) {
            *set = WindowSet::default();
        }
        set
    }

    /// Drops the window under `key` once it holds nothing.
    fn release_if_empty(state: &mut State, key: &str) {
        if state.windows.get(key).is_some_and(|set| set.entries.is_empty()) {
            state.windows.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        let state = self.state.lock();
        state.windows.len() + state.values.len()
    }
}

#[async_trait]
impl WindowStore for MemoryStore {
    async fn admit(&self, key: &str, req: AdmitRequest) -> Result<AdmitOutcome, StoreError> {
        let mut state = self.state.lock();
        let set = Self::window_mut(&mut state, key, req.now_ms);
        set.purge(req.now_ms - req.window_ms);

        let mut count = set.entries.len() as u64;
        let admitted = count < req.limit;
        if admitted {
            set.entries.insert((req.now_ms, req.member));
            set.expires_at_ms = Some(req.now_ms + req.expire_ms);
            count += 1;
        }
        let oldest_ms = set.entries.iter().next().map(|(ts, _)| *ts);
        Self::release_if_empty(&mut state, key);
        state.note_write(req.now_ms);
        Ok(AdmitOutcome {
            admitted,
            count,
            oldest_ms,
        })
    }

    async fn count(&self, key: &str, now_ms: i64, window_ms: i64) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        let cutoff = now_ms - window_ms;
        let live = state.windows.get(key).map(|set| {
            let count = set.entries.iter().filter(|(ts, _)| *ts > cutoff).count() as u64;
            (set.is_expired(now_ms), count)
        });
        match live {
            Some((false, count)) => Ok(count),
            Some((true, _)) => {
                state.windows.remove(key);
                Ok(0)
            }
            None => Ok(0),
        }
    }

    async fn purge_expired(&self, key: &str, cutoff_ms: i64) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        let removed = state
            .windows
            .get_mut(key)
            .map(|set| set.purge(cutoff_ms))
            .unwrap_or(0);
        Self::release_if_empty(&mut state, key);
        Ok(removed)
    }

    async fn set_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state
            .values
            .insert(key.to_string(), (value.to_string(), now + ttl.as_millis() as i64));
        state.note_write(now);
        Ok(())
    }

    async fn get_ttl(&self, key: &str) -> Result<Option<TtlValue>, StoreError> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let live = state
            .values
            .get(key)
            .map(|(value, expires_at)| (value.clone(), *expires_at));
        match live {
            Some((value, expires_at)) if expires_at > now => Ok(Some(TtlValue {
                value,
                ttl_ms: expires_at - now,
            })),
            Some(_) => {
                state.values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn push_capped(&self, key: &str, value: &str, max_len: usize) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let list = state.lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        list.truncate(max_len);
        Ok(())
    }

    async fn list_recent(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .lists
            .get(key)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateguard_types::ManualClock;

    fn req(now_ms: i64, member: &str) -> AdmitRequest {
        AdmitRequest {
            now_ms,
            window_ms: 10_000,
            limit: 2,
            member: member.to_string(),
            expire_ms: 11_000,
        }
    }

    #[tokio::test]
    async fn admit_stops_at_limit_and_reports_oldest() {
        let store = MemoryStore::new();
        assert!(store.admit("k", req(1_000, "a")).await.unwrap().admitted);
        let second = store.admit("k", req(2_000, "b")).await.unwrap();
        assert!(second.admitted);
        assert_eq!(second.count, 2);
        let third = store.admit("k", req(3_000, "c")).await.unwrap();
        assert!(!third.admitted);
        assert_eq!(third.count, 2);
        assert_eq!(third.oldest_ms, Some(1_000));
    }

    #[tokio::test]
    async fn entries_at_cutoff_are_purged() {
        let store = MemoryStore::new();
        store.admit("k", req(1_000, "a")).await.unwrap();
        store.admit("k", req(2_000, "b")).await.unwrap();
        // 11_000 - 10_000 == 1_000, so the first entry is gone.
        let out = store.admit("k", req(11_000, "c")).await.unwrap();
        assert!(out.admitted);
        assert_eq!(out.oldest_ms, Some(2_000));
        assert_eq!(store.count("k", 11_000, 10_000).await.unwrap(), 2);
        assert_eq!(store.purge_expired("k", 11_000).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ttl_values_expire_with_clock() {
        let clock = ManualClock::new(0);
        let store = MemoryStore::with_clock(Arc::new(clock.clone()));
        store
            .set_ttl("block:ip:1", "v", Duration::from_secs(5))
            .await
            .unwrap();
        let got = store.get_ttl("block:ip:1").await.unwrap().unwrap();
        assert_eq!(got.value, "v");
        assert_eq!(got.ttl_ms, 5_000);

        clock.advance_secs(5);
        assert!(store.get_ttl("block:ip:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_keys_do_not_accumulate() {
        let clock = ManualClock::new(0);
        let store = MemoryStore::with_clock(Arc::new(clock.clone()));
        let window = AdmitRequest {
            now_ms: 0,
            window_ms: 1_000,
            limit: 5,
            member: String::new(),
            expire_ms: 2_000,
        };

        for round in 0..4_i64 {
            let now = round * 10_000;
            clock.set_ms(now);
            for n in 0..SWEEP_EVERY {
                let key = format!("rl:ip:{round}.{n}");
                let req = AdmitRequest {
                    now_ms: now,
                    member: format!("m{n}"),
                    ..window.clone()
                };
                store.admit(&key, req).await.unwrap();
                store
                    .set_ttl(&format!("block:{key}"), "v", Duration::from_millis(500))
                    .await
                    .unwrap();
            }
        }
        // Earlier rounds expired long before the last sweep.
        assert!(store.tracked_keys() <= 2 * SWEEP_EVERY as usize);
    }

    #[tokio::test]
    async fn drained_windows_are_released() {
        let store = MemoryStore::new();
        store.admit("k", req(1_000, "a")).await.unwrap();
        assert_eq!(store.purge_expired("k", 5_000).await.unwrap(), 1);
        assert_eq!(store.tracked_keys(), 0);
        assert_eq!(store.count("k", 5_000, 10_000).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn capped_list_keeps_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .push_capped("audit", &i.to_string(), 3)
                .await
                .unwrap();
        }
        assert_eq!(
            store.list_recent("audit", 10).await.unwrap(),
            vec!["4".to_string(), "3".to_string(), "2".to_string()]
        );
    }
}
