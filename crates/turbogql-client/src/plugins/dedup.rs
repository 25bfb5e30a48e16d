//! In-flight query deduplication
//!
//! The first query for a key becomes the leader and runs the rest of the
//! chain. Identical queries arriving while it is in flight wait for the
//! leader's result instead of executing. If the leader ends without a
//! result, the first waiter to notice becomes the new leader. Mutations and
//! subscriptions are never deduplicated.

use crate::plugins::context::OperationContext;
use crate::plugins::core::{ClientPlugin, PluginResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, warn};
use turbogql_protocol::{OperationKey, OperationResult, OperationType};

#[derive(Debug)]
struct PendingOperation {
    id: u64,
    results: watch::Receiver<Option<OperationResult>>,
}

type WaitMap = Arc<Mutex<HashMap<OperationKey, PendingOperation>>>;

/// Plugin collapsing concurrent identical queries into one execution
///
/// Cloning is cheap and clones share the same pending table.
#[derive(Debug, Clone, Default)]
pub struct DedupPlugin {
    wait_map: WaitMap,
    next_id: Arc<AtomicU64>,
}

impl DedupPlugin {
    /// Create a plugin with an empty pending table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently in flight
    pub fn pending_count(&self) -> usize {
        self.wait_map.lock().len()
    }

    /// Return the in-flight leader for the context's key, or register the
    /// context as leader and return `None`
    ///
    /// Check and insert happen under one lock so two identical queries can
    /// never both become leaders.
    fn join_or_lead(
        &self,
        context: &mut OperationContext,
    ) -> Option<(u64, watch::Receiver<Option<OperationResult>>)> {
        let key = context.key;
        let mut locked_wait_map = self.wait_map.lock();
        if let Some(pending) = locked_wait_map.get(&key) {
            return Some((pending.id, pending.results.clone()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        locked_wait_map.insert(
            key,
            PendingOperation {
                id,
                results: context.subscribe_results(),
            },
        );
        let wait_map = Arc::clone(&self.wait_map);
        context.after_query(Box::new(move |_, _| {
            Self::remove_if_owned(&wait_map, key, id);
            Ok(())
        }));
        None
    }

    fn remove_if_owned(wait_map: &WaitMap, key: OperationKey, id: u64) {
        let mut locked_wait_map = wait_map.lock();
        let owned = locked_wait_map.get(&key).is_some_and(|p| p.id == id);
        if owned {
            locked_wait_map.remove(&key);
        }
    }
}

#[async_trait]
impl ClientPlugin for DedupPlugin {
    fn name(&self) -> &str {
        "dedup"
    }

    fn description(&self) -> Option<&str> {
        Some("Collapses concurrent identical queries into a single execution")
    }

    async fn on_operation(&self, context: &mut OperationContext) -> PluginResult<()> {
        if context.kind() != OperationType::Query {
            return Ok(());
        }

        let key = context.key;
        loop {
            let Some((leader_id, mut results)) = self.join_or_lead(context) else {
                debug!("Operation {} is the in-flight leader", key);
                return Ok(());
            };

            debug!("Operation {} joins in-flight leader {}", key, leader_id);
            match results.changed().await {
                Ok(()) => {
                    let result = results.borrow_and_update().clone();
                    if let Some(result) = result {
                        context.use_result(result, true);
                    }
                    return Ok(());
                }
                Err(_) => {
                    // The first waiter through takes over as leader, the
                    // rest join it
                    warn!("Leader for {} ended without a result, retrying", key);
                    Self::remove_if_owned(&self.wait_map, key, leader_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::ClientConfig;
    use serde_json::json;
    use turbogql_protocol::Operation;

    fn context(operation: Operation) -> OperationContext {
        OperationContext::new(operation, &ClientConfig::default())
    }

    #[tokio::test]
    async fn test_follower_receives_leader_result() {
        let dedup = DedupPlugin::new();
        let mut leader = context(Operation::query("{ a }"));
        dedup.on_operation(&mut leader).await.unwrap();
        assert!(!leader.has_outcome());
        assert_eq!(dedup.pending_count(), 1);

        let follower_plugin = dedup.clone();
        let follower = tokio::spawn(async move {
            let mut ctx = context(Operation::query("{ a }"));
            follower_plugin.on_operation(&mut ctx).await.unwrap();
            ctx
        });
        tokio::task::yield_now().await;

        leader.use_result(OperationResult::from_data(json!({"a": 1})), true);
        leader.run_after_query();
        assert_eq!(dedup.pending_count(), 0);

        let follower = follower.await.unwrap();
        assert!(follower.is_terminated());
        assert_eq!(follower.current_result(), leader.current_result());
    }

    #[tokio::test]
    async fn test_mutations_are_never_deduplicated() {
        let dedup = DedupPlugin::new();
        let mut first = context(Operation::mutation("mutation { m }"));
        let mut second = context(Operation::mutation("mutation { m }"));
        dedup.on_operation(&mut first).await.unwrap();
        dedup.on_operation(&mut second).await.unwrap();
        assert_eq!(dedup.pending_count(), 0);
        assert!(!second.has_outcome());
    }

    #[tokio::test]
    async fn test_entry_removed_after_failed_execution() {
        let dedup = DedupPlugin::new();
        let mut leader = context(Operation::query("{ a }"));
        dedup.on_operation(&mut leader).await.unwrap();
        leader.use_result(
            OperationResult::from_error(turbogql_protocol::CombinedError::network("down", None)),
            true,
        );
        leader.run_after_query();
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_waiter_takes_over_when_leader_vanishes() {
        let dedup = DedupPlugin::new();
        let mut leader = context(Operation::query("{ a }"));
        dedup.on_operation(&mut leader).await.unwrap();

        let spawn_waiter = || {
            let plugin = dedup.clone();
            tokio::spawn(async move {
                let mut ctx = context(Operation::query("{ a }"));
                plugin.on_operation(&mut ctx).await.unwrap();
                ctx
            })
        };
        let first = spawn_waiter();
        let second = spawn_waiter();
        tokio::task::yield_now().await;

        drop(leader);
        let (new_leader, waiter) = loop {
            tokio::task::yield_now().await;
            if first.is_finished() {
                break (first, second);
            }
            if second.is_finished() {
                break (second, first);
            }
        };

        let mut new_leader = new_leader.await.unwrap();
        assert!(!new_leader.has_outcome());
        assert_eq!(dedup.pending_count(), 1);
        assert!(!waiter.is_finished());

        new_leader.use_result(OperationResult::from_data(json!({"a": 2})), true);
        new_leader.run_after_query();
        assert_eq!(dedup.pending_count(), 0);

        let waiter = waiter.await.unwrap();
        assert!(waiter.is_terminated());
        assert_eq!(waiter.current_result(), new_leader.current_result());
    }
}
