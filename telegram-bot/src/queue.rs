//! Per-chat serial processing.
//!
//! Each chat gets an unbounded queue drained by its own task, so messages of one chat run
//! through the [`HandlerChain`] in arrival order while different chats proceed concurrently.
//! A worker that stays idle for the idle timeout removes its queue and exits; the next message
//! of that chat starts a new one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::chain::HandlerChain;
use crate::core::{Bot, Message};
use crate::retry::MSG_GENERIC_FAILURE;

type QueueSender = mpsc::UnboundedSender<Message>;
type QueueMap = Arc<DashMap<i64, QueueSender>>;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct ChatQueues {
    chain: HandlerChain,
    bot: Arc<dyn Bot>,
    queues: QueueMap,
    idle_timeout: Duration,
}

impl ChatQueues {
    pub fn new(chain: HandlerChain, bot: Arc<dyn Bot>) -> Self {
        Self {
            chain,
            bot,
            queues: Arc::new(DashMap::new()),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Number of chats with a live queue.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Queues `message` behind earlier messages of the same chat. Returns immediately.
    #[instrument(skip(self, message), fields(chat_id = message.chat.id, message_id = %message.id))]
    pub fn dispatch(&self, message: Message) {
        let chat_id = message.chat.id;
        let tx = self
            .queues
            .entry(chat_id)
            .or_insert_with(|| self.spawn_queue(chat_id))
            .clone();

        if let Err(mpsc::error::SendError(message)) = tx.send(message) {
            // Worker gone; start a fresh one.
            error!(chat_id, "Chat queue closed; restarting it");
            let tx = self.spawn_queue(chat_id);
            self.queues.insert(chat_id, tx.clone());
            if tx.send(message).is_err() {
                error!(chat_id, "Failed to queue message");
            }
        }
    }

    fn spawn_queue(&self, chat_id: i64) -> QueueSender {
        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(Self::process_queue_loop(
            rx,
            self.chain.clone(),
            self.bot.clone(),
            self.queues.clone(),
            self.idle_timeout,
            chat_id,
        ));
        tx
    }

    async fn process_queue_loop(
        mut rx: mpsc::UnboundedReceiver<Message>,
        chain: HandlerChain,
        bot: Arc<dyn Bot>,
        queues: QueueMap,
        idle_timeout: Duration,
        chat_id: i64,
    ) {
        loop {
            let next = tokio::time::timeout(idle_timeout, rx.recv()).await;
            match next {
                Ok(Some(message)) => Self::process_message(&chain, bot.as_ref(), message).await,
                Ok(None) => break,
                Err(_) => {
                    // Closed under the map lock: a late send is drained below or fails and
                    // restarts the queue in dispatch.
                    queues.remove_if(&chat_id, |_, tx| {
                        rx.close();
                        tx.is_closed()
                    });
                    rx.close();
                    debug!(chat_id, "Chat queue idle; closing it");
                    while let Ok(message) = rx.try_recv() {
                        Self::process_message(&chain, bot.as_ref(), message).await;
                    }
                    break;
                }
            }
        }
    }

    async fn process_message(chain: &HandlerChain, bot: &dyn Bot, message: Message) {
        let chat_id = message.chat.id;
        let waited_ms = (chrono::Utc::now() - message.created_at).num_milliseconds();
        info!(
            chat_id,
            user_id = message.user.id,
            message_id = %message.id,
            waited_ms,
            "step: processing message (handler chain started)"
        );
        if let Err(e) = chain.handle(&message).await {
            error!(error = %e, chat_id, user_id = message.user.id, "Handler chain failed");
            if let Err(e) = bot.send_message(&message.chat, MSG_GENERIC_FAILURE).await {
                error!(error = %e, chat_id, "Failed to send failure notice");
            }
        }
    }
}
