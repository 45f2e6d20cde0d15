//! Integration tests for the session actor against an in-memory authority.

use async_trait::async_trait;
use escoba::{
    game::{CardId, MatchId, MatchSnapshot, MatchStatus, Username},
    net::{
        errors::{TransportError, TransportResult},
        messages::CreateMatchResponse,
        transport::MatchTransport,
    },
    session::{
        LocalRejection, SessionActor, SessionConfig, SessionError, SessionHandle, SessionPhase,
        SessionUpdate, Severity,
    },
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{sync::mpsc, time::sleep};

#[derive(Default)]
struct Authority {
    created: usize,
    snapshot: Option<MatchSnapshot>,
    hands: HashMap<Username, Vec<CardId>>,
}

/// Minimal match authority: knows a fixed set of players, keeps one match,
/// alternates turns on every accepted play.
struct MockAuthority {
    known: Vec<Username>,
    authority: Mutex<Authority>,
    creates: AtomicUsize,
    fetches: AtomicUsize,
    plays: AtomicUsize,
    fail_fetches: AtomicBool,
    fetch_delay: Mutex<Duration>,
}

impl MockAuthority {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            known: ["alice", "bob", "bot_player"]
                .into_iter()
                .map(Username::new)
                .collect(),
            authority: Mutex::new(Authority::default()),
            creates: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            plays: AtomicUsize::new(0),
            fail_fetches: AtomicBool::new(false),
            fetch_delay: Mutex::new(Duration::ZERO),
        })
    }

    fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    fn set_turn(&self, player: &str) {
        let mut authority = self.authority.lock().unwrap();
        authority.snapshot.as_mut().unwrap().current_player = Username::new(player);
    }

    fn finish(&self, alice: i64, bob: i64) {
        let mut authority = self.authority.lock().unwrap();
        let snapshot = authority.snapshot.as_mut().unwrap();
        snapshot.status = MatchStatus::Finished;
        snapshot.scores = BTreeMap::from([(Username::new("alice"), alice), (Username::new("bob"), bob)]);
        snapshot.your_result = Some("win".to_string());
    }

    fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl MatchTransport for MockAuthority {
    async fn create_match(
        &self,
        player1: &Username,
        player2: &Username,
    ) -> TransportResult<CreateMatchResponse> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if !self.known.contains(player2) {
            return Err(TransportError::Protocol("player2 not found".to_string()));
        }

        let mut authority = self.authority.lock().unwrap();
        authority.created += 1;
        let match_id = MatchId::new(&format!("m{}", authority.created));
        authority.snapshot = Some(MatchSnapshot {
            match_id: match_id.clone(),
            players: [player1.clone(), player2.clone()],
            current_player: player1.clone(),
            table_cards: vec![1, 2, 3, 4],
            your_hand: Vec::new(),
            captured_cards: BTreeSet::new(),
            scores: BTreeMap::from([(player1.clone(), 0), (player2.clone(), 0)]),
            status: MatchStatus::Active,
            remaining_deck: Some(30),
            message: None,
            your_result: None,
        });
        authority.hands = HashMap::from([
            (player1.clone(), vec![5, 18, 33]),
            (player2.clone(), vec![6, 19, 34]),
        ]);

        Ok(CreateMatchResponse {
            match_id,
            players: Some([player1.clone(), player2.clone()]),
            message: Some("Match created successfully".to_string()),
        })
    }

    async fn fetch_state(
        &self,
        match_id: &MatchId,
        as_player: &Username,
    ) -> TransportResult<MatchSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(TransportError::Network("connection refused".to_string()));
        }

        let authority = self.authority.lock().unwrap();
        let Some(snapshot) = authority
            .snapshot
            .as_ref()
            .filter(|snapshot| &snapshot.match_id == match_id)
        else {
            return Err(TransportError::Protocol("Match not found".to_string()));
        };

        let mut snapshot = snapshot.clone();
        snapshot.your_hand = authority.hands.get(as_player).cloned().unwrap_or_default();
        Ok(snapshot)
    }

    async fn play_card(
        &self,
        match_id: &MatchId,
        as_player: &Username,
        card_id: CardId,
    ) -> TransportResult<Option<String>> {
        self.plays.fetch_add(1, Ordering::SeqCst);

        let mut authority = self.authority.lock().unwrap();
        let Authority { snapshot, hands, .. } = &mut *authority;
        let Some(snapshot) = snapshot.as_mut().filter(|s| &s.match_id == match_id) else {
            return Err(TransportError::Protocol("Match not found".to_string()));
        };
        if &snapshot.current_player != as_player {
            return Err(TransportError::Protocol("Not your turn".to_string()));
        }
        let hand = hands.entry(as_player.clone()).or_default();
        let Some(position) = hand.iter().position(|card| *card == card_id) else {
            return Err(TransportError::Protocol("Card not in hand".to_string()));
        };

        hand.remove(position);
        snapshot.table_cards.push(card_id);
        snapshot.current_player = snapshot
            .opponent_of(as_player)
            .cloned()
            .unwrap_or_else(|| as_player.clone());
        Ok(Some("Card played".to_string()))
    }
}

fn spawn_session(
    local: &str,
    transport: &Arc<MockAuthority>,
) -> (SessionHandle, mpsc::Receiver<SessionUpdate>) {
    let (actor, handle, updates) = SessionActor::new(
        Username::new(local),
        transport.clone(),
        SessionConfig::default(),
    );
    tokio::spawn(actor.run());
    (handle, updates)
}

fn drain(updates: &mut mpsc::Receiver<SessionUpdate>) -> Vec<SessionUpdate> {
    let mut drained = Vec::new();
    while let Ok(update) = updates.try_recv() {
        drained.push(update);
    }
    drained
}

fn finished_notices(updates: &[SessionUpdate]) -> usize {
    updates
        .iter()
        .filter(|update| {
            matches!(update, SessionUpdate::Notice(notice) if notice.message.starts_with("Match ended"))
        })
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_play_out_of_turn_makes_no_network_call() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);

    alice.create("bob").await.unwrap();
    authority.set_turn("bob");
    alice.refresh().await.unwrap();
    let fetches = authority.fetches();

    let result = alice.play(5).await;
    assert_eq!(result, Err(SessionError::Rejected(LocalRejection::NotYourTurn)));
    assert_eq!(authority.plays(), 0);
    assert_eq!(authority.fetches(), fetches);
}

#[tokio::test(start_paused = true)]
async fn test_play_card_not_in_hand_is_refused_locally() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);

    alice.create("bob").await.unwrap();
    let result = alice.play(6).await;
    assert_eq!(result, Err(SessionError::Rejected(LocalRejection::CardNotInHand(6))));
    let result = alice.play(77).await;
    assert!(matches!(result, Err(SessionError::Decode(_))));
    assert_eq!(authority.plays(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_successful_play_triggers_one_out_of_band_fetch() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);

    alice.create("bob").await.unwrap();
    assert_eq!(authority.fetches(), 1);

    alice.play(5).await.unwrap();
    assert_eq!(authority.plays(), 1);
    assert_eq!(authority.fetches(), 2);

    let status = alice.status().await.unwrap();
    let view = status.view.unwrap();
    assert_eq!(view.current_player, Username::new("bob"));
    assert_eq!(view.hand.len(), 2);
    assert!(!view.is_your_turn);

    // The post-play fetch stands in for the next scheduled tick.
    sleep(Duration::from_millis(3100)).await;
    assert_eq!(authority.fetches(), 2);

    sleep(Duration::from_millis(3000)).await;
    assert_eq!(authority.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_post_play_fetch_keeps_next_tick() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);

    alice.create("bob").await.unwrap();
    authority.fail_fetches.store(true, Ordering::SeqCst);
    alice.play(5).await.unwrap();
    assert_eq!(authority.fetches(), 2);

    authority.fail_fetches.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(3100)).await;
    assert_eq!(authority.fetches(), 3);

    let view = alice.status().await.unwrap().view.unwrap();
    assert_eq!(view.current_player, Username::new("bob"));
    assert!(!view.is_your_turn);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_plays_are_not_double_submitted() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);
    alice.create("bob").await.unwrap();

    let (first, second) = tokio::join!(alice.play(5), alice.play(18));
    assert_eq!(first, Ok(()));
    assert_eq!(second, Err(SessionError::Rejected(LocalRejection::NotYourTurn)));
    assert_eq!(authority.plays(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remote_rejection_leaves_state_unchanged() {
    let authority = MockAuthority::new();
    let (alice, mut updates) = spawn_session("alice", &authority);
    alice.create("bob").await.unwrap();

    // The authority moved on but the last snapshot still says it's alice's turn.
    authority.set_turn("bob");
    drain(&mut updates);

    let result = alice.play(5).await;
    assert_eq!(
        result,
        Err(SessionError::Transport(TransportError::Protocol("Not your turn".to_string())))
    );
    assert_eq!(authority.plays(), 1);

    let status = alice.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Polling);
    assert_eq!(status.view.unwrap().hand.len(), 3);

    let notices: Vec<_> = drain(&mut updates)
        .into_iter()
        .filter_map(|update| match update {
            SessionUpdate::Notice(notice) => Some(notice),
            _ => None,
        })
        .collect();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Error);
    assert_eq!(notices[0].message, "Play rejected: Not your turn");
}

#[tokio::test(start_paused = true)]
async fn test_full_match_until_finished() {
    let authority = MockAuthority::new();
    let (alice, mut updates) = spawn_session("alice", &authority);

    let match_id = alice.create("bob").await.unwrap();
    assert_eq!(match_id, MatchId::new("m1"));

    let status = alice.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Polling);
    assert_eq!(status.opponent, Some(Username::new("bob")));
    assert!(status.view.unwrap().is_your_turn);

    alice.play(5).await.unwrap();
    let status = alice.status().await.unwrap();
    assert_eq!(status.view.unwrap().current_player, Username::new("bob"));

    authority.finish(3, 1);
    sleep(Duration::from_millis(6100)).await;

    let status = alice.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Finished);
    let view = status.view.unwrap();
    assert_eq!(view.status, MatchStatus::Finished);
    assert_eq!(view.your_result.as_deref(), Some("win"));

    let fetches = authority.fetches();
    sleep(Duration::from_secs(30)).await;
    assert_eq!(authority.fetches(), fetches, "scheduler stopped on finish");

    let updates = drain(&mut updates);
    assert_eq!(finished_notices(&updates), 1);
    assert!(updates.iter().any(|update| matches!(
        update,
        SessionUpdate::Notice(notice)
            if notice.message == "Match ended! Winner: alice" && notice.severity == Severity::Success
    )));

    assert_eq!(alice.play(18).await, Err(SessionError::Rejected(LocalRejection::MatchAlreadyFinished)));
}

#[tokio::test(start_paused = true)]
async fn test_create_with_unknown_opponent() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);

    let result = alice.create("ghost").await;
    assert_eq!(
        result,
        Err(SessionError::Transport(TransportError::Protocol(
            "player2 not found".to_string()
        )))
    );

    let status = alice.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Idle);
    assert_eq!(status.match_id, None);
    assert_eq!(authority.fetches(), 0);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(authority.fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_join_derives_opponent() {
    let authority = MockAuthority::new();
    let (alice, _alice_updates) = spawn_session("alice", &authority);
    let (bob, _bob_updates) = spawn_session("bob", &authority);

    let match_id = alice.create("bob").await.unwrap();
    let phase = bob.join(match_id.as_str()).await.unwrap();
    assert_eq!(phase, SessionPhase::Polling);

    let status = bob.status().await.unwrap();
    assert_eq!(status.opponent, Some(Username::new("alice")));
    let view = status.view.unwrap();
    assert!(!view.is_your_turn);
    assert_eq!(view.hand.len(), 3);

    alice.play(5).await.unwrap();
    sleep(Duration::from_millis(3100)).await;
    let status = bob.status().await.unwrap();
    assert!(status.view.unwrap().is_your_turn);
    bob.play(6).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_join_failures_return_to_idle() {
    let authority = MockAuthority::new();
    let (alice, _alice_updates) = spawn_session("alice", &authority);
    let (carol, _carol_updates) = spawn_session("carol", &authority);

    let result = carol.join("m1").await;
    assert_eq!(
        result,
        Err(SessionError::Transport(TransportError::Protocol(
            "Match not found".to_string()
        )))
    );
    assert_eq!(carol.status().await.unwrap().phase, SessionPhase::Idle);

    alice.create("bob").await.unwrap();
    let result = carol.join("m1").await;
    assert!(matches!(
        result,
        Err(SessionError::Rejected(LocalRejection::NotAParticipant(_)))
    ));
    let status = carol.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Idle);
    assert_eq!(status.match_id, None);
}

#[tokio::test(start_paused = true)]
async fn test_join_finished_match_does_not_poll() {
    let authority = MockAuthority::new();
    let (alice, _alice_updates) = spawn_session("alice", &authority);
    let (bob, mut bob_updates) = spawn_session("bob", &authority);

    alice.create("bob").await.unwrap();
    alice.leave().await.unwrap();
    authority.finish(0, 2);

    assert_eq!(bob.join("m1").await, Ok(SessionPhase::Finished));
    let fetches = authority.fetches();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(authority.fetches(), fetches);
    assert_eq!(finished_notices(&drain(&mut bob_updates)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_fetch_after_leave_is_discarded() {
    let authority = MockAuthority::new();
    let (alice, mut updates) = spawn_session("alice", &authority);

    alice.create("bob").await.unwrap();
    authority.set_fetch_delay(Duration::from_secs(2));

    // The tick at 3s starts a fetch that only completes at 5s.
    sleep(Duration::from_millis(3100)).await;
    assert_eq!(authority.fetches(), 2);
    assert_eq!(alice.leave().await, Ok(true));
    drain(&mut updates);

    sleep(Duration::from_secs(10)).await;
    let status = alice.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Left);
    assert!(status.view.is_none());
    assert_eq!(authority.fetches(), 2);
    assert!(drain(&mut updates).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_poll_failures_keep_polling() {
    let authority = MockAuthority::new();
    let (alice, mut updates) = spawn_session("alice", &authority);

    alice.create("bob").await.unwrap();
    drain(&mut updates);
    authority.fail_fetches.store(true, Ordering::SeqCst);

    sleep(Duration::from_millis(6100)).await;
    let status = alice.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Polling);
    assert_eq!(status.poll_failures, 2);

    let notices = drain(&mut updates)
        .into_iter()
        .filter(|update| matches!(update, SessionUpdate::Notice(_)))
        .count();
    assert_eq!(notices, 1, "only the first failure of a streak is reported");

    authority.fail_fetches.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(3000)).await;
    let status = alice.status().await.unwrap();
    assert_eq!(status.poll_failures, 0);
    assert!(status.view.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_is_idempotent() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);

    assert_eq!(alice.dismiss().await, Ok(false));

    alice.create("bob").await.unwrap();
    assert_eq!(
        alice.dismiss().await,
        Err(SessionError::Rejected(LocalRejection::MatchStillActive))
    );

    authority.finish(1, 1);
    alice.refresh().await.unwrap();
    assert_eq!(alice.status().await.unwrap().phase, SessionPhase::Finished);

    assert_eq!(alice.dismiss().await, Ok(true));
    assert_eq!(alice.dismiss().await, Ok(false));
    let status = alice.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Left);
    assert_eq!(status.match_id, None);
}

#[tokio::test(start_paused = true)]
async fn test_rematch_and_quick_match() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);

    alice.create("bob").await.unwrap();
    authority.finish(2, 5);
    alice.refresh().await.unwrap();

    let rematch = alice.rematch().await.unwrap();
    assert_eq!(rematch, MatchId::new("m2"));
    let status = alice.status().await.unwrap();
    assert_eq!(status.phase, SessionPhase::Polling);
    assert_eq!(status.opponent, Some(Username::new("bob")));

    let quick = alice.quick_match().await.unwrap();
    assert_eq!(quick, MatchId::new("m3"));
    authority.finish(0, 0);
    alice.refresh().await.unwrap();
    assert!(matches!(
        alice.rematch().await,
        Err(SessionError::Rejected(LocalRejection::RematchUnavailable(_)))
    ));
    assert_eq!(authority.creates(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_create_replaces_active_match() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);

    alice.create("bob").await.unwrap();
    alice.create("bot_player").await.unwrap();

    let status = alice.status().await.unwrap();
    assert_eq!(status.match_id, Some(MatchId::new("m2")));
    assert_eq!(status.opponent, Some(Username::new("bot_player")));

    // Only one timer survives the replacement.
    let fetches = authority.fetches();
    sleep(Duration::from_millis(3100)).await;
    assert_eq!(authority.fetches(), fetches + 1);
}

#[tokio::test]
async fn test_handle_reports_closed_session() {
    let authority = MockAuthority::new();
    let (alice, _updates) = spawn_session("alice", &authority);
    alice.shutdown().await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(alice.create("bob").await, Err(SessionError::Closed));
}
