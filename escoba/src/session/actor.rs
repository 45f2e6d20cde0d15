//! Session actor: the single execution context of a match session.
//!
//! Player commands, scheduler ticks and fetch completions all arrive on
//! channels and are handled one at a time by [`SessionActor::run`], so the
//! [`MatchSession`] is only ever touched from one task and needs no lock.

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::{
    config::SessionConfig,
    errors::{LocalRejection, SessionError, SessionResult},
    messages::{SessionMessage, SessionStatus, SessionUpdate},
    notifier::{NoticeKind, describe},
    scheduler::PollScheduler,
    state::{Applied, Epoch, FetchSeq, FetchTicket, MatchSession, SessionPhase, TickDecision},
};
use crate::{
    game::{CardId, MatchId, MatchSnapshot, MatchView, Username},
    net::{
        errors::{TransportError, TransportResult},
        transport::MatchTransport,
    },
};

/// Session actor handle for sending messages
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    local: Username,
}

impl SessionHandle {
    /// The local player this session acts for.
    #[must_use]
    pub fn local(&self) -> &Username {
        &self.local
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> SessionResult<T> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(build(response))
            .await
            .map_err(|_| SessionError::Closed)?;
        receiver.await.map_err(|_| SessionError::Closed)
    }

    pub async fn create(&self, opponent: &str) -> SessionResult<MatchId> {
        let opponent = Username::new(opponent);
        self.request(|response| SessionMessage::Create { opponent, response })
            .await?
    }

    pub async fn quick_match(&self) -> SessionResult<MatchId> {
        self.request(|response| SessionMessage::QuickMatch { response })
            .await?
    }

    /// Join `match_id`. Resolves to [`SessionPhase::Polling`], or to
    /// [`SessionPhase::Finished`] when the match is already over.
    pub async fn join(&self, match_id: &str) -> SessionResult<SessionPhase> {
        let match_id = MatchId::new(match_id);
        self.request(|response| SessionMessage::Join { match_id, response })
            .await?
    }

    pub async fn play(&self, card_id: CardId) -> SessionResult<()> {
        self.request(|response| SessionMessage::Play { card_id, response })
            .await?
    }

    /// Returns whether a match was left.
    pub async fn leave(&self) -> SessionResult<bool> {
        self.request(|response| SessionMessage::Leave { response })
            .await
    }

    /// Returns whether a finished match was closed. A second dismiss is a
    /// no-op.
    pub async fn dismiss(&self) -> SessionResult<bool> {
        self.request(|response| SessionMessage::Dismiss { response })
            .await?
    }

    pub async fn rematch(&self) -> SessionResult<MatchId> {
        self.request(|response| SessionMessage::Rematch { response })
            .await?
    }

    pub async fn refresh(&self) -> SessionResult<()> {
        self.request(|response| SessionMessage::Refresh { response })
            .await?
    }

    pub async fn status(&self) -> SessionResult<SessionStatus> {
        self.request(|response| SessionMessage::GetStatus { response })
            .await
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(SessionMessage::Shutdown).await;
    }
}

/// Events the actor sends itself.
#[derive(Debug)]
enum Internal {
    Tick(Epoch),
    Fetched {
        ticket: FetchTicket,
        result: TransportResult<MatchSnapshot>,
    },
}

/// Session actor driving one local player's match
pub struct SessionActor {
    /// Lifecycle state
    session: MatchSession,

    /// Match authority
    transport: Arc<dyn MatchTransport>,

    config: SessionConfig,

    /// Poll timer, armed only while polling
    scheduler: PollScheduler,

    /// Message inbox
    inbox: mpsc::Receiver<SessionMessage>,

    /// Ticks and background fetch results
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,

    /// Updates towards the presentation layer
    updates: mpsc::Sender<SessionUpdate>,

    /// Epoch of the scheduled fetch currently in flight
    fetch_in_flight: Option<Epoch>,

    is_closed: bool,
}

impl SessionActor {
    /// Create a new session actor
    ///
    /// # Returns
    ///
    /// * `(SessionActor, SessionHandle, Receiver<SessionUpdate>)` - Actor,
    ///   handle for sending messages, and the stream of updates to render
    pub fn new(
        local: Username,
        transport: Arc<dyn MatchTransport>,
        config: SessionConfig,
    ) -> (Self, SessionHandle, mpsc::Receiver<SessionUpdate>) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let (updates, update_rx) = mpsc::channel(config.update_capacity.max(1));
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let handle = SessionHandle {
            sender,
            local: local.clone(),
        };

        let actor = Self {
            session: MatchSession::new(local),
            transport,
            config,
            scheduler: PollScheduler::new(),
            inbox,
            internal_tx,
            internal_rx,
            updates,
            fetch_in_flight: None,
            is_closed: false,
        };

        (actor, handle, update_rx)
    }

    /// Run the session actor event loop
    pub async fn run(mut self) {
        info!("Session for {} starting", self.session.local());

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    self.handle_message(message).await;
                    if self.is_closed {
                        break;
                    }
                }

                Some(event) = self.internal_rx.recv() => {
                    self.handle_internal(event);
                }
            }
        }

        self.scheduler.stop();
        info!("Session for {} closed", self.session.local());
    }

    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Create { opponent, response } => {
                let result = self.handle_create(opponent).await;
                let _ = response.send(result);
            }

            SessionMessage::QuickMatch { response } => {
                let opponent = Username::new(&self.config.bot_opponent);
                let result = self.handle_create(opponent).await;
                let _ = response.send(result);
            }

            SessionMessage::Join { match_id, response } => {
                let result = self.handle_join(match_id).await;
                let _ = response.send(result);
            }

            SessionMessage::Play { card_id, response } => {
                let result = self.handle_play(card_id).await;
                let _ = response.send(result);
            }

            SessionMessage::Leave { response } => {
                let _ = response.send(self.handle_leave());
            }

            SessionMessage::Dismiss { response } => {
                let _ = response.send(self.handle_dismiss());
            }

            SessionMessage::Rematch { response } => {
                let result = self.handle_rematch().await;
                let _ = response.send(result);
            }

            SessionMessage::Refresh { response } => {
                let result = self.handle_refresh().await;
                let _ = response.send(result);
            }

            SessionMessage::GetStatus { response } => {
                let _ = response.send(self.status());
            }

            SessionMessage::Shutdown => {
                self.is_closed = true;
            }
        }
    }

    fn handle_internal(&mut self, event: Internal) {
        match event {
            Internal::Tick(epoch) => self.handle_tick(epoch),
            Internal::Fetched { ticket, result } => {
                if self.fetch_in_flight == Some(ticket.epoch) {
                    self.fetch_in_flight = None;
                }
                match result {
                    Ok(snapshot) => {
                        self.apply(ticket.epoch, ticket.seq, snapshot);
                    }
                    Err(e) => self.poll_failed(ticket.epoch, &e),
                }
            }
        }
    }

    fn handle_tick(&mut self, epoch: Epoch) {
        if self.fetch_in_flight == Some(epoch) {
            debug!("Previous poll still in flight, skipping tick");
            return;
        }

        match self.session.take_tick(epoch) {
            TickDecision::Fetch(ticket) => {
                self.fetch_in_flight = Some(ticket.epoch);
                let transport = Arc::clone(&self.transport);
                let internal = self.internal_tx.clone();
                tokio::spawn(async move {
                    let result = transport
                        .fetch_state(&ticket.match_id, &ticket.as_player)
                        .await;
                    let _ = internal.send(Internal::Fetched { ticket, result });
                });
            }
            TickDecision::Skip => debug!("Post-play fetch covered this interval, skipping tick"),
            TickDecision::Stale => debug!("Ignoring tick armed under epoch {epoch}"),
        }
    }

    async fn handle_create(&mut self, opponent: Username) -> SessionResult<MatchId> {
        self.scheduler.stop();
        self.session.begin_create(opponent.clone());
        self.publish_phase();

        let local = self.session.local().clone();
        let response = match self.transport.create_match(&local, &opponent).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Creating a match against {opponent} failed: {e}");
                self.session.create_failed();
                self.notify(if e.is_network() {
                    NoticeKind::NetworkError {
                        reason: e.to_string(),
                    }
                } else {
                    NoticeKind::CreateRejected {
                        reason: e.to_string(),
                    }
                });
                self.publish_phase();
                return Err(e.into());
            }
        };

        let match_id = response.match_id;
        if self.session.create_succeeded(match_id.clone()).is_none() {
            return Err(LocalRejection::InvalidTransition {
                action: "create",
                phase: self.session.phase(),
            }
            .into());
        }

        info!("Match {match_id} created: {local} vs {opponent}");
        self.notify(NoticeKind::MatchCreated {
            match_id: match_id.clone(),
            opponent,
        });
        self.publish_phase();

        if let Err(e) = self.fetch_now().await {
            debug!("First fetch of match {match_id} failed: {e}");
        }
        self.start_polling();

        Ok(match_id)
    }

    async fn handle_join(&mut self, match_id: MatchId) -> SessionResult<SessionPhase> {
        self.scheduler.stop();
        self.session.begin_join(match_id.clone());
        self.publish_phase();

        let local = self.session.local().clone();
        let snapshot = match self.transport.fetch_state(&match_id, &local).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Joining match {match_id} failed: {e}");
                self.session.join_failed();
                self.notify(if e.is_network() {
                    NoticeKind::NetworkError {
                        reason: e.to_string(),
                    }
                } else {
                    NoticeKind::JoinRejected {
                        reason: e.to_string(),
                    }
                });
                self.publish_phase();
                return Err(e.into());
            }
        };

        let applied = match self.session.join_succeeded(snapshot) {
            Ok(applied) => applied,
            Err(rejection) => {
                warn!("Refusing to join match {match_id}: {rejection}");
                self.notify(NoticeKind::JoinRejected {
                    reason: rejection.to_string(),
                });
                self.publish_phase();
                return Err(rejection.into());
            }
        };

        if let Some(opponent) = self.session.opponent().cloned() {
            info!("Joined match {match_id}: {local} vs {opponent}");
            self.notify(NoticeKind::MatchJoined {
                match_id: match_id.clone(),
                opponent,
            });
        }
        self.publish_phase();
        self.report(&applied);
        self.start_polling();

        Ok(self.session.phase())
    }

    async fn handle_play(&mut self, card_id: CardId) -> SessionResult<()> {
        let ticket = match self.session.plan_play(card_id) {
            Ok(ticket) => ticket,
            Err(e) => {
                debug!("Play of card {card_id} refused locally: {e}");
                self.notify(NoticeKind::TurnRejectedLocally {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let result = self
            .transport
            .play_card(&ticket.match_id, &ticket.as_player, ticket.card_id)
            .await;

        match result {
            Ok(message) => {
                info!(
                    "{} played card {card_id} in match {}: {}",
                    ticket.as_player,
                    ticket.match_id,
                    message.as_deref().unwrap_or("accepted")
                );
                self.notify(NoticeKind::PlayAccepted { card_id });
                self.session.play_accepted(ticket.epoch);
                if let Err(e) = self.fetch_now().await {
                    debug!("Post-play fetch failed: {e}");
                }
                Ok(())
            }
            Err(e) => {
                warn!("Play of card {card_id} in match {} failed: {e}", ticket.match_id);
                self.notify(if e.is_network() {
                    NoticeKind::NetworkError {
                        reason: e.to_string(),
                    }
                } else {
                    NoticeKind::PlayRejectedRemotely {
                        reason: e.to_string(),
                    }
                });
                Err(e.into())
            }
        }
    }

    fn handle_leave(&mut self) -> bool {
        self.scheduler.stop();
        let match_id = self.session.match_id().cloned();
        if !self.session.leave() {
            return false;
        }

        if let Some(match_id) = match_id {
            info!("{} left match {match_id}", self.session.local());
        }
        self.notify(NoticeKind::MatchLeft);
        self.publish_phase();
        true
    }

    fn handle_dismiss(&mut self) -> SessionResult<bool> {
        let dismissed = self.session.dismiss()?;
        self.scheduler.stop();
        if dismissed {
            debug!("Finished match dismissed");
            self.publish_phase();
        }
        Ok(dismissed)
    }

    async fn handle_rematch(&mut self) -> SessionResult<MatchId> {
        let opponent = self.session.rematch_opponent()?;
        if opponent.as_str() == self.config.bot_opponent {
            return Err(LocalRejection::RematchUnavailable(opponent.to_string()).into());
        }
        self.handle_create(opponent).await
    }

    async fn handle_refresh(&mut self) -> SessionResult<()> {
        match self.session.phase() {
            SessionPhase::Polling => self.fetch_now().await.map(|_| ()),
            SessionPhase::Finished => Err(LocalRejection::MatchAlreadyFinished.into()),
            phase @ (SessionPhase::Creating | SessionPhase::Joining) => {
                Err(LocalRejection::InvalidTransition {
                    action: "refresh",
                    phase,
                }
                .into())
            }
            SessionPhase::Idle | SessionPhase::Left => Err(LocalRejection::NoActiveMatch.into()),
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            local: self.session.local().clone(),
            phase: self.session.phase(),
            match_id: self.session.match_id().cloned(),
            opponent: self.session.opponent().cloned(),
            view: self.current_view(),
            poll_failures: self.session.poll_failures(),
        }
    }

    /// Fetch the match state inline, outside the schedule.
    async fn fetch_now(&mut self) -> SessionResult<Applied> {
        let ticket = self
            .session
            .next_fetch()
            .ok_or(SessionError::Rejected(LocalRejection::NoActiveMatch))?;

        match self
            .transport
            .fetch_state(&ticket.match_id, &ticket.as_player)
            .await
        {
            Ok(snapshot) => Ok(self.apply(ticket.epoch, ticket.seq, snapshot)),
            Err(e) => {
                self.poll_failed(ticket.epoch, &e);
                Err(e.into())
            }
        }
    }

    fn apply(&mut self, epoch: Epoch, seq: FetchSeq, snapshot: MatchSnapshot) -> Applied {
        let applied = self.session.apply_fetch(epoch, seq, snapshot);
        self.report(&applied);
        applied
    }

    fn report(&mut self, applied: &Applied) {
        match applied {
            Applied::Updated => self.publish_view(),
            Applied::Finished(outcome) => {
                self.scheduler.stop();
                if let Some(match_id) = self.session.match_id() {
                    info!("Match {match_id} finished: {outcome}");
                }
                self.publish_view();
                self.notify(NoticeKind::MatchFinished(outcome.clone()));
                self.publish_phase();
            }
            Applied::Discarded(reason) => debug!("Discarding fetched snapshot: {reason:?}"),
        }
    }

    fn poll_failed(&mut self, epoch: Epoch, error: &TransportError) {
        let Some(streak) = self.session.record_fetch_failure(epoch) else {
            debug!("Ignoring failure of a stale fetch: {error}");
            return;
        };

        warn!("Polling match state failed ({streak} in a row): {error}");
        if streak == 1 {
            self.notify(NoticeKind::PollFailed {
                reason: error.to_string(),
            });
        }
    }

    fn start_polling(&mut self) {
        if self.session.phase() != SessionPhase::Polling {
            return;
        }

        let epoch = self.session.epoch();
        let internal = self.internal_tx.clone();
        self.scheduler.start(self.config.poll_interval, move || {
            let _ = internal.send(Internal::Tick(epoch));
        });
        debug!(
            "Polling every {} ms under epoch {epoch}",
            self.config.poll_interval.as_millis()
        );
    }

    fn current_view(&self) -> Option<MatchView> {
        self.session
            .snapshot()
            .map(|snapshot| MatchView::from_snapshot(snapshot, self.session.local()))
    }

    fn publish_view(&mut self) {
        if let Some(view) = self.current_view() {
            self.send_update(SessionUpdate::Snapshot(view));
        }
    }

    fn publish_phase(&mut self) {
        self.send_update(SessionUpdate::Phase(self.session.phase()));
    }

    fn notify(&mut self, kind: NoticeKind) {
        let notice = describe(&kind, self.session.local());
        self.send_update(SessionUpdate::Notice(notice));
    }

    fn send_update(&mut self, update: SessionUpdate) {
        match self.updates.try_send(update) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Update channel full, dropping update");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Update receiver gone");
            }
        }
    }
}
