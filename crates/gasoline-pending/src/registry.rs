//! The async-RPC correlation fabric (§4.4). The daemon cannot call into the
//! extension synchronously, so a tool handler `Create`s a pending query,
//! `Wait`s on a single-shot rendezvous, and the extension later `Claim`s and
//! `Complete`s/`Fail`s it via HTTP polling.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;
use tokio::sync::oneshot;

/// How long a terminal record is kept around for `observe`-style bucket
/// views before the sweeper prunes it.
const TERMINAL_RETENTION: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    Claimed,
    Completed,
    Failed,
    TimedOut,
}

/// What gets delivered to a blocked `Wait` caller. Distinct from `Status`
/// because a `Wait` caller who already gave up (external deadline elapsed)
/// never observes any of this — the channel send simply fails and is
/// ignored.
#[derive(Debug, Clone)]
pub enum DeliveredOutcome {
    Completed(Value),
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone)]
pub enum WaitResult {
    Completed(Value),
    Failed(String),
    TimedOut,
}

struct Record {
    kind: String,
    params: Value,
    created_at: chrono::DateTime<chrono::Utc>,
    deadline: Instant,
    status: Status,
    result: Option<Value>,
    error: Option<String>,
    sender: Option<oneshot::Sender<DeliveredOutcome>>,
    terminal_at: Option<Instant>,
}

/// A read-only view of a record, safe to hand out across the registry's
/// lock boundary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PendingQueryView {
    pub correlation_id: String,
    pub kind: String,
    pub params: Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct State {
    records: HashMap<String, Record>,
    fifos: HashMap<String, VecDeque<String>>,
}

/// One mutex guards the record map and every per-kind FIFO (§5). Waiter
/// rendezvous (the oneshot channel) lives outside this lock entirely —
/// `Wait` never holds it while blocked.
pub struct Registry {
    state: Mutex<State>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                records: HashMap::new(),
                fifos: HashMap::new(),
            }),
        }
    }

    pub fn create(
        &self,
        kind: &str,
        params: Value,
        ttl: Duration,
    ) -> (String, oneshot::Receiver<DeliveredOutcome>) {
        let correlation_id = new_correlation_id(kind);
        let (tx, rx) = oneshot::channel();
        let record = Record {
            kind: kind.to_string(),
            params,
            created_at: chrono::Utc::now(),
            deadline: Instant::now() + ttl,
            status: Status::Queued,
            result: None,
            error: None,
            sender: Some(tx),
            terminal_at: None,
        };

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.records.insert(correlation_id.clone(), record);
        state
            .fifos
            .entry(kind.to_string())
            .or_default()
            .push_back(correlation_id.clone());
        (correlation_id, rx)
    }

    /// Pops up to `max_n` unclaimed queries of `kind` in FIFO order,
    /// transitioning them `queued -> claimed`.
    pub fn claim(&self, kind: &str, max_n: usize) -> Vec<PendingQueryView> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut claimed = Vec::with_capacity(max_n);
        if let Some(fifo) = state.fifos.get_mut(kind) {
            while claimed.len() < max_n {
                let Some(id) = fifo.pop_front() else { break };
                let Some(record) = state.records.get_mut(&id) else {
                    continue;
                };
                if record.status != Status::Queued {
                    // Timed out or otherwise no longer eligible; drop it.
                    continue;
                }
                record.status = Status::Claimed;
                claimed.push(view_of(&id, record));
            }
        }
        claimed
    }

    /// Transitions `claimed -> completed` and delivers to the waiter, if
    /// one is still listening. Discards silently when the record is not in
    /// a state that can be completed (already timed out or terminal).
    pub fn complete(&self, correlation_id: &str, result: Value) -> bool {
        self.finish(correlation_id, Status::Completed, Some(result), None)
    }

    pub fn fail(&self, correlation_id: &str, error: String) -> bool {
        self.finish(correlation_id, Status::Failed, None, Some(error))
    }

    fn finish(
        &self,
        correlation_id: &str,
        status: Status,
        result: Option<Value>,
        error: Option<String>,
    ) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(record) = state.records.get_mut(correlation_id) else {
            return false;
        };
        if !matches!(record.status, Status::Queued | Status::Claimed) {
            return false;
        }
        record.status = status;
        record.result = result.clone();
        record.error = error.clone();
        record.terminal_at = Some(Instant::now());
        if let Some(sender) = record.sender.take() {
            let outcome = match status {
                Status::Completed => DeliveredOutcome::Completed(result.unwrap_or(Value::Null)),
                Status::Failed => DeliveredOutcome::Failed(error.unwrap_or_default()),
                _ => return true,
            };
            // A send error means the waiter already gave up (its external
            // deadline elapsed and it dropped the receiver) — the result is
            // simply discarded, per the single-shot delivery invariant.
            let _ = sender.send(outcome);
        }
        true
    }

    pub fn get(&self, correlation_id: &str) -> Option<PendingQueryView> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.records.get(correlation_id).map(|r| view_of(correlation_id, r))
    }

    pub fn list_by_status(&self, kind: &str, status: Status) -> Vec<PendingQueryView> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .records
            .iter()
            .filter(|(_, r)| r.kind == kind && r.status == status)
            .map(|(id, r)| view_of(id, r))
            .collect()
    }

    /// Periodic sweep: transitions expired `queued`/`claimed` records to
    /// `timed_out` and wakes their waiters with a structured timeout, then
    /// prunes long-terminal records. Returns how many were timed out this
    /// pass.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut timed_out = 0;
        let expired_ids: Vec<String> = state
            .records
            .iter()
            .filter(|(_, r)| matches!(r.status, Status::Queued | Status::Claimed) && r.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired_ids {
            if let Some(record) = state.records.get_mut(id) {
                record.status = Status::TimedOut;
                record.terminal_at = Some(now);
                if let Some(sender) = record.sender.take() {
                    let _ = sender.send(DeliveredOutcome::TimedOut);
                }
                timed_out += 1;
            }
        }

        for fifo in state.fifos.values_mut() {
            fifo.retain(|id| !expired_ids.contains(id));
        }

        let prune_ids: Vec<String> = state
            .records
            .iter()
            .filter(|(_, r)| r.terminal_at.is_some_and(|t| now.duration_since(t) > TERMINAL_RETENTION))
            .map(|(id, _)| id.clone())
            .collect();
        for id in prune_ids {
            state.records.remove(&id);
        }

        timed_out
    }
}

fn view_of(id: &str, record: &Record) -> PendingQueryView {
    PendingQueryView {
        correlation_id: id.to_string(),
        kind: record.kind.clone(),
        params: record.params.clone(),
        created_at: record.created_at,
        status: record.status,
        result: record.result.clone(),
        error: record.error.clone(),
    }
}

fn new_correlation_id(kind: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("{kind}_{}", suffix.to_lowercase())
}

/// Blocks on `receiver` until it resolves, the sweeper declares a timeout,
/// or the caller's own `timeout` elapses first — whichever comes first, the
/// caller always gets a clean result rather than a dropped socket.
pub async fn wait(receiver: oneshot::Receiver<DeliveredOutcome>, timeout: Duration) -> WaitResult {
    match tokio::time::timeout(timeout, receiver).await {
        Ok(Ok(DeliveredOutcome::Completed(v))) => WaitResult::Completed(v),
        Ok(Ok(DeliveredOutcome::Failed(e))) => WaitResult::Failed(e),
        Ok(Ok(DeliveredOutcome::TimedOut)) => WaitResult::TimedOut,
        Ok(Err(_)) => WaitResult::TimedOut,
        Err(_) => WaitResult::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_claim_complete_round_trip() {
        let registry = Registry::new();
        let (id, rx) = registry.create("network_waterfall", json!({}), Duration::from_secs(5));
        let claimed = registry.claim("network_waterfall", 10);
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].correlation_id, id);

        assert!(registry.complete(&id, json!({"ok": true})));
        let result = wait(rx, Duration::from_secs(1)).await;
        match result {
            WaitResult::Completed(v) => assert_eq!(v["ok"], true),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn late_result_after_caller_timeout_is_discarded() {
        let registry = Registry::new();
        let (id, rx) = registry.create("network_waterfall", json!({}), Duration::from_secs(5));
        registry.claim("network_waterfall", 10);

        // Caller gives up almost immediately.
        let result = wait(rx, Duration::from_millis(10)).await;
        assert!(matches!(result, WaitResult::TimedOut));

        // Extension still delivers — should not panic, and must not find a
        // live waiter.
        assert!(registry.complete(&id, json!({"late": true})));
    }

    #[tokio::test]
    async fn sweeper_times_out_expired_records() {
        let registry = Registry::new();
        let (_id, rx) = registry.create("network_waterfall", json!({}), Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let timed_out = registry.sweep();
        assert_eq!(timed_out, 1);
        let result = wait(rx, Duration::from_secs(1)).await;
        assert!(matches!(result, WaitResult::TimedOut));
    }

    #[tokio::test]
    async fn fifo_order_within_kind() {
        let registry = Registry::new();
        let (id1, _rx1) = registry.create("command", json!({}), Duration::from_secs(5));
        let (id2, _rx2) = registry.create("command", json!({}), Duration::from_secs(5));
        let claimed = registry.claim("command", 10);
        assert_eq!(claimed[0].correlation_id, id1);
        assert_eq!(claimed[1].correlation_id, id2);
    }

}
