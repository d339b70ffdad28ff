//! End-to-end playback flows against the simulated audio node.
//!
//! Covers:
//! - Playing a playlist through to idle
//! - Loop modes across track transitions
//! - Skips, stuck tracks and the events they broadcast
//! - Session replacement and teardown through the registry

mod common;

use std::time::Duration;

use common::{settle, track, Fixture, ROOM, TEXT, VOICE};
use jukebox_core::events::{
    BroadcastEvent, DestroyReason, FaultKind, PlaybackEvent, QueueEvent, SessionEvent,
};
use jukebox_core::{
    JukeboxError, LoopMode, NodeEvent, NodeEventKind, PlayOutcome, Resolution, SessionState,
};

fn playlist(fixture: &Fixture, query: &str, tracks: &[(&str, u64)]) {
    fixture.resolver.insert(
        query,
        Resolution::Playlist {
            name: "Mix".into(),
            items: tracks.iter().map(|(id, secs)| track(id, *secs)).collect(),
        },
    );
}

fn started_titles(events: &[BroadcastEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            BroadcastEvent::Playback(PlaybackEvent::TrackStarted { title, .. }) => {
                Some(title.clone())
            }
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn playlist_plays_through_to_idle() {
    let mut fixture = Fixture::new();
    playlist(&fixture, "mix", &[("a", 10), ("b", 20)]);

    let session = fixture
        .services
        .registry
        .get_or_create(ROOM, VOICE, TEXT)
        .await
        .unwrap();
    let outcome = session.enqueue("alice", "mix").await.unwrap();
    assert_eq!(outcome.added.len(), 2);
    assert_eq!(outcome.playlist.as_deref(), Some("Mix"));
    assert!(outcome.added.iter().all(|item| item.requester == "alice"));

    assert_eq!(session.play().await.unwrap(), PlayOutcome::Started);
    assert_eq!(fixture.node.current_track(ROOM).as_deref(), Some("stream-a"));

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(session.active_item().unwrap().identifier, "b");
    assert_eq!(fixture.node.current_track(ROOM).as_deref(), Some("stream-b"));

    tokio::time::sleep(Duration::from_secs(21)).await;
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.queue_snapshot().is_empty());

    let events = fixture.drain_events();
    assert_eq!(started_titles(&events), ["Song a", "Song b"]);
    assert!(events
        .iter()
        .any(|event| matches!(event, BroadcastEvent::Playback(PlaybackEvent::Idle { .. }))));
}

#[tokio::test(start_paused = true)]
async fn play_twice_reports_already_playing() {
    let fixture = Fixture::new();
    playlist(&fixture, "mix", &[("a", 60)]);

    let session = fixture
        .services
        .registry
        .get_or_create(ROOM, VOICE, TEXT)
        .await
        .unwrap();
    assert_eq!(session.play().await.unwrap(), PlayOutcome::QueueEmpty);

    session.enqueue("alice", "mix").await.unwrap();
    assert_eq!(session.play().await.unwrap(), PlayOutcome::Started);
    assert_eq!(session.play().await.unwrap(), PlayOutcome::AlreadyPlaying);
}

#[tokio::test(start_paused = true)]
async fn repeat_queue_rotates_finished_tracks() {
    let fixture = Fixture::new();
    playlist(&fixture, "mix", &[("a", 10), ("b", 10)]);

    let session = fixture
        .services
        .registry
        .get_or_create(ROOM, VOICE, TEXT)
        .await
        .unwrap();
    session.enqueue("alice", "mix").await.unwrap();
    assert_eq!(session.toggle_loop(LoopMode::RepeatQueue), LoopMode::RepeatQueue);
    session.play().await.unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let order: Vec<_> = session
        .queue_snapshot()
        .into_iter()
        .map(|item| item.identifier)
        .collect();
    assert_eq!(order, ["b", "a"]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(session.active_item().unwrap().identifier, "a");
    assert_eq!(session.state(), SessionState::Playing);
}

#[tokio::test(start_paused = true)]
async fn repeat_item_replays_until_skipped() {
    let mut fixture = Fixture::new();
    playlist(&fixture, "mix", &[("a", 10), ("b", 60)]);

    let session = fixture
        .services
        .registry
        .get_or_create(ROOM, VOICE, TEXT)
        .await
        .unwrap();
    session.enqueue("alice", "mix").await.unwrap();
    session.toggle_loop(LoopMode::RepeatItem);
    session.play().await.unwrap();

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(session.active_item().unwrap().identifier, "a");

    let skipped = session.skip().unwrap();
    assert_eq!(skipped.identifier, "a");
    settle().await;

    assert_eq!(session.active_item().unwrap().identifier, "b");
    assert_eq!(session.loop_mode(), LoopMode::Off);
    assert_eq!(fixture.node.current_track(ROOM).as_deref(), Some("stream-b"));

    let events = fixture.drain_events();
    assert_eq!(started_titles(&events), ["Song a", "Song a", "Song a", "Song b"]);
    assert!(events.iter().any(|event| matches!(
        event,
        BroadcastEvent::Queue(QueueEvent::LoopModeChanged { mode: LoopMode::Off, .. })
    )));
}

#[tokio::test(start_paused = true)]
async fn skip_when_idle_is_rejected() {
    let fixture = Fixture::new();
    let session = fixture
        .services
        .registry
        .get_or_create(ROOM, VOICE, TEXT)
        .await
        .unwrap();

    assert!(matches!(
        session.skip(),
        Err(JukeboxError::NothingPlaying(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn stuck_track_is_skipped_with_fault() {
    let mut fixture = Fixture::new();
    playlist(&fixture, "mix", &[("a", 60), ("b", 60)]);

    let session = fixture
        .services
        .registry
        .get_or_create(ROOM, VOICE, TEXT)
        .await
        .unwrap();
    session.enqueue("alice", "mix").await.unwrap();
    session.play().await.unwrap();

    let stale = NodeEvent {
        room_id: ROOM.into(),
        track: Some("stream-old".into()),
        play_id: None,
        kind: NodeEventKind::Stuck { threshold_ms: 10_000 },
    };
    assert!(fixture.services.node_events.handle_event(&stale));
    settle().await;
    assert_eq!(session.active_item().unwrap().identifier, "a");

    let stuck = NodeEvent {
        track: Some("stream-a".into()),
        ..stale
    };
    assert!(fixture.services.node_events.handle_event(&stuck));
    settle().await;
    assert_eq!(session.active_item().unwrap().identifier, "b");

    let faults: Vec<_> = fixture
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            BroadcastEvent::Playback(PlaybackEvent::Fault {
                kind,
                message,
                text_channel_id,
                ..
            }) => Some((kind, message, text_channel_id)),
            _ => None,
        })
        .collect();
    assert_eq!(
        faults,
        [(FaultKind::Stuck, "Song a is stuck! Skipping.".to_string(), TEXT.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn events_for_unknown_rooms_are_dropped() {
    let fixture = Fixture::new();
    let event = NodeEvent {
        room_id: "elsewhere".into(),
        track: None,
        play_id: None,
        kind: NodeEventKind::Stuck { threshold_ms: 1 },
    };
    assert!(!fixture.services.node_events.handle_event(&event));
}

#[tokio::test(start_paused = true)]
async fn moving_voice_channels_replaces_the_session() {
    let mut fixture = Fixture::new();
    let registry = &fixture.services.registry;

    let first = registry.get_or_create(ROOM, VOICE, TEXT).await.unwrap();
    let again = registry.get_or_create(ROOM, VOICE, TEXT).await.unwrap();
    assert_eq!(first.instance_id(), again.instance_id());

    let moved = registry.get_or_create(ROOM, "voice-2", TEXT).await.unwrap();
    assert_ne!(first.instance_id(), moved.instance_id());
    assert!(first.is_destroyed());
    assert_eq!(*fixture.gateway.joins.lock(), ["voice-1", "voice-2"]);
    assert_eq!(*fixture.gateway.leaves.lock(), [ROOM]);

    let reasons: Vec<_> = fixture
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            BroadcastEvent::Session(SessionEvent::Destroyed { reason, .. }) => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(reasons, [DestroyReason::ChannelChanged]);
}

#[tokio::test(start_paused = true)]
async fn empty_voice_channel_only_tears_down_its_own_session() {
    let fixture = Fixture::new();
    let registry = &fixture.services.registry;
    playlist(&fixture, "mix", &[("a", 60)]);

    let session = registry.get_or_create(ROOM, VOICE, TEXT).await.unwrap();
    session.enqueue("alice", "mix").await.unwrap();
    session.play().await.unwrap();

    assert!(!registry
        .handle_voice_channel_empty(ROOM, "voice-2")
        .await
        .unwrap());
    assert!(registry.get(ROOM).is_some());

    assert!(registry.handle_voice_channel_empty(ROOM, VOICE).await.unwrap());
    assert!(registry.get(ROOM).is_none());
    assert!(fixture.node.current_track(ROOM).is_none());
    assert!(session.is_destroyed());
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_every_room() {
    let fixture = Fixture::new();
    for room in ["r1", "r2", "r3"] {
        fixture
            .services
            .registry
            .get_or_create(room, VOICE, TEXT)
            .await
            .unwrap();
    }
    assert_eq!(fixture.services.registry.len(), 3);

    fixture.services.shutdown().await;
    assert!(fixture.services.registry.is_empty());
    assert_eq!(fixture.gateway.leaves.lock().len(), 3);
}
