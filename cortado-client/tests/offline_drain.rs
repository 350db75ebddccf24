//! Offline queue and drain behavior against a scripted transport

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use cortado_client::{
    Cart, ClientError, ClientResult, DrainReport, DrinkSize, ItemDraft, Order, OrderSubmitter,
    PricingPolicy, SubmissionQueue, SubmitOutcome, SubmitTransport,
};

/// One scripted server response
enum Reply {
    /// Echo the submitted order back
    Ack,
    /// 503, the kind of failure that keeps the entry queued
    Retryable,
    /// Validation rejection, the kind that drops the entry
    Permanent,
    /// Acknowledge some other order id
    WrongAck(String),
}

/// Transport that replays a scripted response per call and records every
/// submitted order id. An exhausted script acknowledges everything.
struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmitTransport for ScriptedTransport {
    async fn submit(&self, order: &Order) -> ClientResult<Order> {
        self.seen.lock().unwrap().push(order.id.clone());
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Ack);
        match reply {
            Reply::Ack => Ok(order.clone()),
            Reply::Retryable => Err(ClientError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            }),
            Reply::Permanent => Err(ClientError::Validation(
                "Order totals do not verify".to_string(),
            )),
            Reply::WrongAck(id) => {
                let mut stored = order.clone();
                stored.id = id;
                Ok(stored)
            }
        }
    }
}

fn takeaway_order() -> Order {
    let mut cart = Cart::new(PricingPolicy::default());
    cart.add(ItemDraft::new("latte", "Latte", DrinkSize::Medium, 4.5))
        .unwrap();
    cart.finalize(chrono::Local::now()).unwrap()
}

/// Queue backed by a fresh temp file; the TempDir guard must outlive it
fn temp_queue(dir: &tempfile::TempDir) -> SubmissionQueue {
    SubmissionQueue::open(dir.path().join("queue.redb")).unwrap()
}

fn submitter(
    transport: Arc<ScriptedTransport>,
    queue: SubmissionQueue,
    online: bool,
) -> (Arc<OrderSubmitter>, watch::Sender<bool>, CancellationToken) {
    let (online_tx, online_rx) = watch::channel(online);
    let shutdown = CancellationToken::new();
    let submitter =
        OrderSubmitter::new(transport, queue, online_rx, shutdown.clone()).unwrap();
    (Arc::new(submitter), online_tx, shutdown)
}

#[tokio::test]
async fn offline_submit_skips_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    let transport = ScriptedTransport::new(vec![]);
    let (submitter, _online_tx, _shutdown) = submitter(transport.clone(), queue.clone(), false);

    let outcome = submitter.submit(takeaway_order()).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::SavedOffline { pending: 1 }));
    assert!(transport.seen().is_empty());
    assert_eq!(queue.len().unwrap(), 1);
}

#[tokio::test]
async fn submit_falls_back_to_queue_on_server_failure() {
    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    let transport = ScriptedTransport::new(vec![Reply::Retryable]);
    let (submitter, _online_tx, _shutdown) = submitter(transport.clone(), queue.clone(), true);

    let outcome = submitter.submit(takeaway_order()).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::SavedOffline { pending: 1 }));
    assert_eq!(transport.seen().len(), 1);
    assert_eq!(queue.len().unwrap(), 1);
}

#[tokio::test]
async fn permanent_rejection_surfaces_to_the_caller() {
    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    let transport = ScriptedTransport::new(vec![Reply::Permanent]);
    let (submitter, _online_tx, _shutdown) = submitter(transport, queue.clone(), true);

    let result = submitter.submit(takeaway_order()).await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    // Rejected orders never enter the queue; retrying would replay the rejection
    assert!(queue.is_empty().unwrap());
}

#[tokio::test]
async fn queued_orders_drain_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    let transport = ScriptedTransport::new(vec![]);
    let (submitter, _online_tx, _shutdown) = submitter(transport.clone(), queue.clone(), false);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let order = takeaway_order();
        ids.push(order.id.clone());
        submitter.submit(order).await.unwrap();
    }
    assert_eq!(queue.len().unwrap(), 3);

    let report = submitter.drain().await.unwrap();
    assert_eq!(
        report,
        DrainReport {
            submitted: 3,
            dropped: 0,
            halted: None,
        }
    );
    assert_eq!(transport.seen(), ids);
    assert!(queue.is_empty().unwrap());
}

#[tokio::test]
async fn retryable_failure_halts_the_drain() {
    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    let transport = ScriptedTransport::new(vec![Reply::Ack, Reply::Retryable]);
    let (submitter, _online_tx, _shutdown) = submitter(transport.clone(), queue.clone(), false);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let order = takeaway_order();
        ids.push(order.id.clone());
        submitter.submit(order).await.unwrap();
    }

    let report = submitter.drain().await.unwrap();
    assert_eq!(report.submitted, 1);
    assert_eq!(report.dropped, 0);
    assert!(report.halted.is_some());

    // The third order was never attempted; the failed one stays in front
    assert_eq!(transport.seen(), ids[..2].to_vec());
    assert_eq!(queue.len().unwrap(), 2);
    let front = queue.front().unwrap().unwrap();
    assert_eq!(front.order.id, ids[1]);
    assert_eq!(front.attempts, 1);
    assert!(front.last_error.as_deref().unwrap().contains("503"));
}

#[tokio::test]
async fn permanent_rejection_is_dropped_during_drain() {
    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    let transport = ScriptedTransport::new(vec![Reply::Ack, Reply::Permanent, Reply::Ack]);
    let (submitter, _online_tx, _shutdown) = submitter(transport.clone(), queue.clone(), false);

    for _ in 0..3 {
        submitter.submit(takeaway_order()).await.unwrap();
    }

    let report = submitter.drain().await.unwrap();
    assert_eq!(
        report,
        DrainReport {
            submitted: 2,
            dropped: 1,
            halted: None,
        }
    );
    assert_eq!(transport.seen().len(), 3);
    assert!(queue.is_empty().unwrap());
}

#[tokio::test]
async fn mismatched_ack_keeps_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    let transport =
        ScriptedTransport::new(vec![Reply::WrongAck("order-0-somebody".to_string())]);
    let (submitter, _online_tx, _shutdown) = submitter(transport, queue.clone(), false);

    let order = takeaway_order();
    let id = order.id.clone();
    submitter.submit(order).await.unwrap();

    let report = submitter.drain().await.unwrap();
    assert_eq!(report.submitted, 0);
    assert!(report.halted.is_some());

    let front = queue.front().unwrap().unwrap();
    assert_eq!(front.order.id, id);
    assert_eq!(front.attempts, 1);
}

#[tokio::test]
async fn queue_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.redb");

    let first = takeaway_order();
    let first_id = first.id.clone();
    {
        let queue = SubmissionQueue::open(&path).unwrap();
        queue.enqueue(&first).unwrap();
        queue.enqueue(&takeaway_order()).unwrap();
    }

    let reopened = SubmissionQueue::open(&path).unwrap();
    assert_eq!(reopened.len().unwrap(), 2);
    assert_eq!(reopened.front().unwrap().unwrap().order.id, first_id);
}

#[tokio::test]
async fn reconnect_triggers_background_drain() {
    let dir = tempfile::tempdir().unwrap();
    let queue = temp_queue(&dir);
    queue.enqueue(&takeaway_order()).unwrap();
    queue.enqueue(&takeaway_order()).unwrap();

    let transport = ScriptedTransport::new(vec![]);
    let (submitter, online_tx, shutdown) = submitter(transport, queue.clone(), false);

    let mut pending = submitter.pending_orders();
    assert_eq!(*pending.borrow(), 2);

    tokio::spawn(submitter.clone().run());
    online_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(2), pending.wait_for(|n| *n == 0))
        .await
        .expect("drain did not finish in time")
        .unwrap();
    assert!(queue.is_empty().unwrap());
    shutdown.cancel();
}
