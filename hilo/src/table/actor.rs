//! Table actor implementation with async message handling.

use super::{
    config::TableConfig,
    messages::{ApplyOutcome, SubscriberId, TableError, TableMessage, TableStats},
};
use crate::round::{Command, Dealer, Millis, RoundEngine, RoundState, Stage};
use std::collections::HashMap;
use tokio::{
    sync::{mpsc, oneshot},
    time::{MissedTickBehavior, interval},
};
use uuid::Uuid;

/// Wall clock in milliseconds since the epoch.
fn now_ms() -> Millis {
    chrono::Utc::now().timestamp_millis()
}

/// A registered state stream. Dropping the receiver is enough to be
/// removed on the next push; [`TableHandle::unsubscribe`] removes it
/// immediately.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    /// Snapshot at the moment of subscribing; push it before anything from
    /// `receiver`.
    pub initial: RoundState,
    pub receiver: mpsc::Receiver<RoundState>,
}

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    subscriber_buffer: usize,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, subscriber_buffer: usize) -> Self {
        Self {
            sender,
            subscriber_buffer,
        }
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), TableError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableError::Closed)
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> Result<T, TableError> {
        let (response, reply) = oneshot::channel();
        self.send(message(response)).await?;
        reply.await.map_err(|_| TableError::Closed)
    }

    /// Apply a command to whatever round is current.
    pub async fn apply(&self, command: Command) -> Result<ApplyOutcome, TableError> {
        self.apply_for_round(command, None).await
    }

    /// Apply a command, optionally bound to a specific round.
    pub async fn apply_for_round(
        &self,
        command: Command,
        round_id: Option<Uuid>,
    ) -> Result<ApplyOutcome, TableError> {
        self.request(|response| TableMessage::Apply {
            command,
            round_id,
            response,
        })
        .await
    }

    /// Current round snapshot
    pub async fn state(&self) -> Result<RoundState, TableError> {
        self.request(|response| TableMessage::GetState { response })
            .await
    }

    pub async fn stats(&self) -> Result<TableStats, TableError> {
        self.request(|response| TableMessage::GetStats { response })
            .await
    }

    /// Register a new subscriber channel.
    pub async fn subscribe(&self) -> Result<Subscription, TableError> {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);
        let initial = self
            .request(|response| TableMessage::Subscribe {
                subscriber_id: id,
                sender,
                response,
            })
            .await?;
        Ok(Subscription {
            id,
            initial,
            receiver,
        })
    }

    pub async fn unsubscribe(&self, subscriber_id: SubscriberId) -> Result<(), TableError> {
        self.send(TableMessage::Unsubscribe { subscriber_id }).await
    }

    pub async fn tick(&self) -> Result<(), TableError> {
        self.send(TableMessage::Tick).await
    }

    /// Stop the actor and wait until it has acknowledged.
    pub async fn close(&self) -> Result<(), TableError> {
        self.request(|response| TableMessage::Close { response })
            .await
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Table actor owning the single round engine
pub struct TableActor {
    /// Table configuration
    config: TableConfig,

    /// The only writer of round state
    engine: RoundEngine,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// State push channels, one per connection
    subscribers: HashMap<SubscriberId, mpsc::Sender<RoundState>>,

    /// Deliveries skipped on full channels
    dropped_deliveries: u64,

    /// Rounds that reached FINISH
    rounds_finished: u64,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor with a shuffling dealer
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(config: TableConfig) -> (Self, TableHandle) {
        let engine = RoundEngine::new(config.rules, now_ms());
        Self::with_engine(config, engine)
    }

    /// Create a table actor that deals from `dealer`
    pub fn with_dealer(config: TableConfig, dealer: impl Dealer + 'static) -> (Self, TableHandle) {
        let engine = RoundEngine::with_dealer(config.rules, dealer, now_ms());
        Self::with_engine(config, engine)
    }

    fn with_engine(config: TableConfig, engine: RoundEngine) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity);
        let handle = TableHandle::new(sender, config.subscriber_buffer);

        let actor = Self {
            config,
            engine,
            inbox,
            subscribers: HashMap::new(),
            dropped_deliveries: 0,
            rounds_finished: 0,
            is_closed: false,
        };

        (actor, handle)
    }

    /// Spawn the actor on the current runtime and return its handle
    pub fn spawn(config: TableConfig) -> TableHandle {
        let (actor, handle) = Self::new(config);
        tokio::spawn(actor.run());
        handle
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!(
            "Table '{}' starting, round {}",
            self.config.name,
            self.engine.state().round_id
        );

        let mut tick_interval = interval(self.config.tick_interval);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        // every handle is gone
                        break;
                    };
                    self.handle_message(message);

                    if self.is_closed {
                        break;
                    }
                }

                _ = tick_interval.tick() => {
                    self.tick();
                }
            }
        }

        // Dropping the senders ends every subscriber stream.
        self.subscribers.clear();
        log::info!("Table '{}' closed", self.config.name);
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Apply {
                command,
                round_id,
                response,
            } => {
                let outcome = self.apply(command, round_id);
                let _ = response.send(outcome);
            }

            TableMessage::GetState { response } => {
                let _ = response.send(self.engine.snapshot());
            }

            TableMessage::GetStats { response } => {
                let _ = response.send(self.stats());
            }

            TableMessage::Subscribe {
                subscriber_id,
                sender,
                response,
            } => {
                self.subscribers.insert(subscriber_id, sender);
                log::debug!(
                    "Subscriber {} joined table '{}' ({} total)",
                    subscriber_id,
                    self.config.name,
                    self.subscribers.len()
                );
                let _ = response.send(self.engine.snapshot());
            }

            TableMessage::Unsubscribe { subscriber_id } => {
                if self.subscribers.remove(&subscriber_id).is_some() {
                    log::debug!(
                        "Subscriber {} left table '{}'",
                        subscriber_id,
                        self.config.name
                    );
                }
            }

            TableMessage::Tick => self.tick(),

            TableMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    fn apply(&mut self, command: Command, round_id: Option<Uuid>) -> ApplyOutcome {
        let current = self.engine.state().round_id;
        if let Some(round_id) = round_id
            && round_id != current
        {
            log::debug!("Dropping {command} for stale round {round_id} (current {current})");
            return ApplyOutcome::Stale {
                state: self.engine.snapshot(),
            };
        }

        match self.engine.apply(&command, now_ms()).cloned() {
            Ok(state) => {
                log::debug!("Applied {command}: now {}", state.stage);
                if state.stage == Stage::Finish {
                    self.rounds_finished += 1;
                    log::info!(
                        "Round {} finished with bank {}",
                        state.round_id,
                        state.bank
                    );
                }
                self.broadcast(&state);
                ApplyOutcome::Applied(state)
            }
            Err(reason) => {
                log::debug!("Ignoring {command}: {reason}");
                ApplyOutcome::Rejected {
                    reason,
                    state: self.engine.snapshot(),
                }
            }
        }
    }

    /// Advance time-based transitions (called periodically)
    fn tick(&mut self) {
        if self.is_closed {
            return;
        }

        if self.engine.tick(now_ms()) {
            let state = self.engine.snapshot();
            log::debug!("Finish timeout elapsed, new round {}", state.round_id);
            self.broadcast(&state);
        }
    }

    fn stats(&self) -> TableStats {
        let state = self.engine.state();
        TableStats {
            subscribers: self.subscribers.len(),
            stage: state.stage,
            round_id: state.round_id,
            dropped_deliveries: self.dropped_deliveries,
            rounds_finished: self.rounds_finished,
        }
    }

    /// Push a snapshot to all subscribers
    fn broadcast(&mut self, state: &RoundState) {
        let mut dropped = 0;
        self.subscribers
            .retain(|subscriber_id, sender| match sender.try_send(state.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("Subscriber {subscriber_id} channel full, dropping state");
                    dropped += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Subscriber {subscriber_id} disconnected, removing");
                    false
                }
            });
        self.dropped_deliveries += dropped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{Card, RoundRules, Side, Suit, constants::HAND_SIZE};
    use std::time::Duration;
    use tokio::time::timeout;

    fn fixed_hand() -> [Card; HAND_SIZE] {
        [
            Card(7, Suit::Spade),
            Card(13, Suit::Diamond),
            Card(2, Suit::Club),
            Card(9, Suit::Heart),
            Card(14, Suit::Spade),
        ]
    }

    fn spawn_table(config: TableConfig) -> TableHandle {
        let (actor, handle) = TableActor::with_dealer(config, fixed_hand);
        tokio::spawn(actor.run());
        handle
    }

    async fn play_to_choosing(handle: &TableHandle) -> RoundState {
        handle
            .apply(Command::Arm {
                table_id: 1,
                box_id: 3,
            })
            .await
            .unwrap();
        handle
            .apply(Command::BuyIn { amount: 100 })
            .await
            .unwrap()
            .into_state()
    }

    #[tokio::test]
    async fn test_subscribe_replies_with_snapshot_then_pushes_changes() {
        let handle = spawn_table(TableConfig::default());
        let mut subscription = handle.subscribe().await.unwrap();
        assert_eq!(subscription.initial.stage, Stage::Idle);

        let outcome = handle
            .apply(Command::Arm {
                table_id: 1,
                box_id: 3,
            })
            .await
            .unwrap();
        assert!(outcome.is_applied());

        let pushed = subscription.receiver.recv().await.unwrap();
        assert_eq!(pushed.stage, Stage::Armed);
        assert_eq!(pushed, *outcome.state());
        assert_eq!(pushed.round_id, subscription.initial.round_id);
    }

    #[tokio::test]
    async fn test_rejected_command_is_not_broadcast() {
        let handle = spawn_table(TableConfig::default());
        let mut subscription = handle.subscribe().await.unwrap();

        let outcome = handle.apply(Command::Confirm).await.unwrap();
        assert!(matches!(outcome, ApplyOutcome::Rejected { .. }));
        assert_eq!(*outcome.state(), subscription.initial);
        assert!(subscription.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_round_id_is_dropped() {
        let handle = spawn_table(TableConfig::default());
        let before = handle.state().await.unwrap();

        let outcome = handle
            .apply_for_round(
                Command::Arm {
                    table_id: 1,
                    box_id: 1,
                },
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, ApplyOutcome::Stale { .. }));
        assert_eq!(handle.state().await.unwrap(), before);

        let outcome = handle
            .apply_for_round(
                Command::Arm {
                    table_id: 1,
                    box_id: 1,
                },
                Some(before.round_id),
            )
            .await
            .unwrap();
        assert!(outcome.is_applied());
    }

    #[tokio::test]
    async fn test_full_channel_drops_delivery_but_keeps_subscriber() {
        let config = TableConfig {
            subscriber_buffer: 1,
            ..TableConfig::default()
        };
        let handle = spawn_table(config);
        let mut subscription = handle.subscribe().await.unwrap();

        let choosing = play_to_choosing(&handle).await;
        assert_eq!(choosing.stage, Stage::Choosing);

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.subscribers, 1);
        assert_eq!(stats.dropped_deliveries, 1);

        // only the ARMED push fit in the channel
        let first = subscription.receiver.recv().await.unwrap();
        assert_eq!(first.stage, Stage::Armed);

        handle
            .apply(Command::Choose { side: Side::Hi })
            .await
            .unwrap();
        let next = subscription.receiver.recv().await.unwrap();
        assert_eq!(next.stage, Stage::Confirming);
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_starve_others() {
        let config = TableConfig {
            subscriber_buffer: 1,
            ..TableConfig::default()
        };
        let handle = spawn_table(config);
        let mut slow = handle.subscribe().await.unwrap();
        let mut fast = handle.subscribe().await.unwrap();

        let commands = [
            Command::Arm {
                table_id: 1,
                box_id: 1,
            },
            Command::BuyIn { amount: 100 },
            Command::Choose { side: Side::Hi },
        ];
        let expected = [Stage::Armed, Stage::Choosing, Stage::Confirming];
        for (command, stage) in commands.into_iter().zip(expected) {
            let outcome = handle.apply(command).await.unwrap();
            assert!(outcome.is_applied());
            let pushed = fast.receiver.recv().await.unwrap();
            assert_eq!(pushed.stage, stage);
        }

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.subscribers, 2);
        assert_eq!(stats.dropped_deliveries, 2);

        assert_eq!(slow.receiver.recv().await.unwrap().stage, Stage::Armed);
        assert!(slow.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_removed() {
        let handle = spawn_table(TableConfig::default());
        let subscription = handle.subscribe().await.unwrap();
        drop(subscription);

        handle.apply(Command::Reset).await.unwrap();
        assert_eq!(handle.stats().await.unwrap().subscribers, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let handle = spawn_table(TableConfig::default());
        let subscription = handle.subscribe().await.unwrap();
        handle.unsubscribe(subscription.id).await.unwrap();
        assert_eq!(handle.stats().await.unwrap().subscribers, 0);
    }

    #[tokio::test]
    async fn test_ticker_resets_finished_round() {
        let config = TableConfig {
            tick_interval: Duration::from_millis(10),
            rules: RoundRules {
                finish_timeout_ms: 20,
                tie_enabled: false,
            },
            ..TableConfig::default()
        };
        let handle = spawn_table(config);
        let mut subscription = handle.subscribe().await.unwrap();

        let choosing = play_to_choosing(&handle).await;
        handle
            .apply(Command::Choose { side: Side::Lo })
            .await
            .unwrap();
        let finished = handle.apply(Command::Confirm).await.unwrap().into_state();
        assert_eq!(finished.stage, Stage::Finish);
        assert_eq!(finished.bank, 0);
        assert_eq!(handle.stats().await.unwrap().rounds_finished, 1);

        let reset = timeout(Duration::from_secs(2), async {
            loop {
                let state = subscription.receiver.recv().await.unwrap();
                if state.stage == Stage::Idle {
                    break state;
                }
            }
        })
        .await
        .unwrap();
        assert_ne!(reset.round_id, choosing.round_id);
        assert!(reset.cards.is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_subscriber_streams() {
        let handle = spawn_table(TableConfig::default());
        let mut subscription = handle.subscribe().await.unwrap();

        handle.close().await.unwrap();
        let end = timeout(Duration::from_secs(1), subscription.receiver.recv())
            .await
            .unwrap();
        assert!(end.is_none());
        assert_eq!(handle.state().await, Err(TableError::Closed));
    }
}
