//! Handler execution: bounded concurrency, per-sender ordering, failure isolation.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::sync::{oneshot, Semaphore};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::{
    domain::UserId,
    handler::Invocation,
    messaging::port::MessagingPort,
    reply::{build_outbound, Reply},
    router::{CommandRouter, Route},
    update::Update,
};

pub const HANDLER_FAILURE_TEXT: &str = "⚠️ Sorry, something went wrong. Please try again later.";

/// FIFO chain per sender: each job waits for the previous job of the same
/// sender to finish before it takes a concurrency permit.
#[derive(Default)]
struct SenderQueues {
    next_ticket: AtomicU64,
    tails: Mutex<HashMap<UserId, Tail>>,
}

struct Tail {
    ticket: u64,
    done: oneshot::Receiver<()>,
}

struct Slot {
    ticket: u64,
    previous: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
}

impl SenderQueues {
    fn enqueue(&self, user: UserId) -> Slot {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (done, rx) = oneshot::channel();
        let previous = self
            .tails
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user, Tail { ticket, done: rx })
            .map(|tail| tail.done);
        Slot {
            ticket,
            previous,
            done,
        }
    }

    /// Forget the sender once its last queued job is done.
    fn release(&self, user: UserId, ticket: u64) {
        let mut tails = self.tails.lock().unwrap_or_else(|e| e.into_inner());
        if tails.get(&user).is_some_and(|t| t.ticket == ticket) {
            tails.remove(&user);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tails.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct HandlerExecutor {
    router: Arc<CommandRouter>,
    messenger: Arc<dyn MessagingPort>,
    permits: Arc<Semaphore>,
    queues: Arc<SenderQueues>,
    tracker: TaskTracker,
}

impl HandlerExecutor {
    pub fn new(
        router: Arc<CommandRouter>,
        messenger: Arc<dyn MessagingPort>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            router,
            messenger,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            queues: Arc::new(SenderQueues::default()),
            tracker: TaskTracker::new(),
        }
    }

    /// Schedule `update` for handling and return immediately.
    ///
    /// Returns false when the update has nobody to reply to or the executor is
    /// shutting down.
    pub fn dispatch(&self, update: Update) -> bool {
        if self.tracker.is_closed() {
            warn!(update_id = update.id.0, "executor is draining, update not handled");
            return false;
        }
        let Some(sender) = update.sender.clone() else {
            debug!(update_id = update.id.0, "update has no sender, skipping");
            return false;
        };

        let route = self.router.route(&update);
        debug!(
            update_id = update.id.0,
            user_id = sender.user_id.0,
            route = route.label(),
            "dispatching update"
        );

        let slot = self.queues.enqueue(sender.user_id);
        let job = Job {
            route,
            update,
            messenger: self.messenger.clone(),
            permits: self.permits.clone(),
        };
        let queues = self.queues.clone();
        self.tracker.spawn(async move {
            let Slot {
                ticket,
                previous,
                done,
            } = slot;
            if let Some(previous) = previous {
                // Err means the previous job was abandoned; order is still kept.
                let _ = previous.await;
            }
            job.run().await;
            queues.release(sender.user_id, ticket);
            let _ = done.send(());
        });
        true
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting work and wait up to `grace` for running handlers.
    ///
    /// Returns how many jobs were abandoned.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            let abandoned = self.tracker.len();
            warn!(abandoned, "grace period elapsed, abandoning in-flight handlers");
            return abandoned;
        }
        info!("all handlers drained");
        0
    }

    #[cfg(test)]
    fn queued_senders(&self) -> usize {
        self.queues.len()
    }
}

struct Job {
    route: Route,
    update: Update,
    messenger: Arc<dyn MessagingPort>,
    permits: Arc<Semaphore>,
}

impl Job {
    async fn run(self) {
        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            return;
        };
        let Some(recipient) = self.update.sender.as_ref().map(|s| s.chat_id) else {
            return;
        };
        let update_id = self.update.id.0;
        let label = self.route.label().to_string();
        let callback_id = self.update.callback_id().map(str::to_string);

        let (handler, command) = self.route.into_parts();
        let call = Invocation {
            update: self.update,
            command,
        };

        // Run on its own task so a panicking handler is contained here.
        let outcome = tokio::spawn(async move { handler.handle(&call).await }).await;
        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(update_id, route = %label, "handler failed: {e}");
                Reply::text(HANDLER_FAILURE_TEXT)
            }
            Err(e) => {
                error!(update_id, route = %label, "handler panicked: {e}");
                Reply::text(HANDLER_FAILURE_TEXT)
            }
        };

        let msg = build_outbound(reply, recipient, &self.messenger.capabilities());
        if let Err(e) = self.messenger.send_reply(&msg).await {
            warn!(update_id, chat_id = recipient.0, "failed to send reply: {e}");
        }

        if let Some(id) = callback_id {
            if let Err(e) = self.messenger.answer_callback_query(&id, None).await {
                debug!(update_id, "failed to answer callback query: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::ChatId,
        errors::Error,
        handler::handler_fn,
        test_support::{text_update, RecordingMessenger},
    };
    use std::sync::atomic::AtomicUsize;

    fn executor_with(
        router: CommandRouter,
        messenger: Arc<RecordingMessenger>,
        limit: usize,
    ) -> HandlerExecutor {
        HandlerExecutor::new(Arc::new(router), messenger, limit)
    }

    #[tokio::test]
    async fn per_sender_replies_keep_dispatch_order() {
        let slow_then_echo = handler_fn(|call: Invocation| async move {
            let text = call.text().unwrap_or_default().to_string();
            if text == "slow" {
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            Ok(Reply::text(text))
        });
        let router = CommandRouter::builder(slow_then_echo).build();
        let messenger = Arc::new(RecordingMessenger::default());
        let exec = executor_with(router, messenger.clone(), 8);

        assert!(exec.dispatch(text_update(1, 100, "slow")));
        assert!(exec.dispatch(text_update(2, 100, "fast")));
        assert!(exec.dispatch(text_update(3, 200, "other")));

        assert_eq!(exec.shutdown(Duration::from_secs(5)).await, 0);

        let sent = messenger.sent_texts();
        let for_a: Vec<_> = sent
            .iter()
            .filter(|(chat, _)| *chat == ChatId(100))
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(for_a, vec!["slow", "fast"]);

        // The other sender was not stuck behind the slow handler.
        let pos_other = sent.iter().position(|(c, _)| *c == ChatId(200)).unwrap();
        let pos_slow = sent.iter().position(|(_, t)| t == "slow").unwrap();
        assert!(pos_other < pos_slow);
        assert_eq!(exec.queued_senders(), 0);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (active.clone(), peak.clone());
        let handler = handler_fn(move |_call: Invocation| {
            let (a, p) = (a.clone(), p.clone());
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                Ok(Reply::text("ok"))
            }
        });
        let messenger = Arc::new(RecordingMessenger::default());
        let exec = executor_with(CommandRouter::builder(handler).build(), messenger.clone(), 2);

        for i in 0..6 {
            exec.dispatch(text_update(i, 1000 + i, "x"));
        }
        exec.shutdown(Duration::from_secs(5)).await;

        assert_eq!(messenger.sent_texts().len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn failing_and_panicking_handlers_are_isolated() {
        let handler = handler_fn(|call: Invocation| async move {
            match call.text() {
                Some("fail") => Err(Error::Handler("boom".to_string())),
                Some("panic") => panic!("handler bug"),
                other => Ok(Reply::text(other.unwrap_or_default())),
            }
        });
        let messenger = Arc::new(RecordingMessenger::default());
        let exec = executor_with(CommandRouter::builder(handler).build(), messenger.clone(), 4);

        exec.dispatch(text_update(1, 7, "fail"));
        exec.dispatch(text_update(2, 7, "panic"));
        exec.dispatch(text_update(3, 7, "after"));
        exec.shutdown(Duration::from_secs(5)).await;

        let texts: Vec<_> = messenger.sent_texts().into_iter().map(|(_, t)| t).collect();
        assert_eq!(
            texts,
            vec![
                HANDLER_FAILURE_TEXT.to_string(),
                HANDLER_FAILURE_TEXT.to_string(),
                "after".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn send_failures_do_not_stop_later_replies() {
        let echo = handler_fn(|call: Invocation| async move {
            Ok(Reply::text(call.text().unwrap_or_default()))
        });
        let messenger = Arc::new(RecordingMessenger::failing_first(1));
        let exec = executor_with(CommandRouter::builder(echo).build(), messenger.clone(), 1);

        exec.dispatch(text_update(1, 5, "lost"));
        exec.dispatch(text_update(2, 5, "kept"));
        exec.shutdown(Duration::from_secs(5)).await;

        let texts: Vec<_> = messenger.sent_texts().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn shutdown_abandons_handlers_past_grace() {
        let stuck = handler_fn(|_call: Invocation| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Reply::text("late"))
        });
        let messenger = Arc::new(RecordingMessenger::default());
        let exec = executor_with(CommandRouter::builder(stuck).build(), messenger.clone(), 1);

        exec.dispatch(text_update(1, 1, "x"));
        assert_eq!(exec.shutdown(Duration::from_millis(30)).await, 1);
        assert!(!exec.dispatch(text_update(2, 1, "y")));
        assert!(messenger.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn updates_without_sender_are_skipped() {
        let echo = handler_fn(|_call: Invocation| async move { Ok(Reply::text("x")) });
        let messenger = Arc::new(RecordingMessenger::default());
        let exec = executor_with(CommandRouter::builder(echo).build(), messenger.clone(), 1);

        let mut u = text_update(1, 1, "hi");
        u.sender = None;
        assert!(!exec.dispatch(u));
        assert_eq!(exec.in_flight(), 0);
    }

    #[tokio::test]
    async fn callback_queries_are_answered() {
        let echo = handler_fn(|_call: Invocation| async move { Ok(Reply::text("pressed")) });
        let messenger = Arc::new(RecordingMessenger::default());
        let exec = executor_with(CommandRouter::builder(echo).build(), messenger.clone(), 1);

        let mut u = text_update(1, 1, "");
        u.payload = crate::update::Payload::Callback {
            id: "cb-42".to_string(),
            data: "open".to_string(),
        };
        exec.dispatch(u);
        exec.shutdown(Duration::from_secs(5)).await;

        assert_eq!(messenger.answered(), vec!["cb-42".to_string()]);
    }
}
