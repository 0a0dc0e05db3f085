//! End-to-end scenarios driving the engine through its public API.

use std::cell::{Cell, RefCell};

use vidgate::engine::{Engine, IncomingViewerMessage};
use vidgate::overlay::Stage;
use vidgate::player::{PlaybackProvider, PlayerError, PlayerState};
use vidgate::store::{AttemptSink, SubmitOutcome};
use vidgate::submit::{AttemptPayload, META_KEY};
use vidgate::surface::{Notice, ResponseInput, Surface, SurfaceMessage};
use vidgate::AlarmMessage;
use web_time::Duration;

struct ScriptedPlayer {
    time: Cell<f64>,
    duration: f64,
    state: Cell<PlayerState>,
    seeks: RefCell<Vec<f64>>,
}

impl ScriptedPlayer {
    fn new(duration: f64) -> Self {
        Self {
            time: Cell::new(0.0),
            duration,
            state: Cell::new(PlayerState::Playing),
            seeks: RefCell::new(Vec::new()),
        }
    }
}

impl PlaybackProvider for ScriptedPlayer {
    fn current_time(&self) -> f64 {
        self.time.get()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn player_state(&self) -> PlayerState {
        self.state.get()
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        self.state.set(PlayerState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.state.set(PlayerState::Paused);
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) -> Result<(), PlayerError> {
        self.seeks.borrow_mut().push(seconds);
        self.time.set(seconds);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSurface {
    messages: RefCell<Vec<SurfaceMessage>>,
    response: RefCell<ResponseInput>,
}

impl RecordingSurface {
    fn select(&self, ids: &[&str]) {
        self.response.borrow_mut().selected = ids.iter().map(|s| (*s).to_owned()).collect();
    }

    fn type_text(&self, text: &str) {
        self.response.borrow_mut().text = text.to_owned();
    }

    fn feedback_texts(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter_map(|m| match m {
                SurfaceMessage::Feedback { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn thanks_count(&self) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|m| matches!(m, SurfaceMessage::ThanksOpen { .. }))
            .count()
    }

    fn notice_count(&self, notice: Notice) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|m| matches!(m, SurfaceMessage::Notice(n) if *n == notice))
            .count()
    }
}

impl Surface for RecordingSurface {
    fn render(&self, message: &SurfaceMessage) {
        self.messages.borrow_mut().push(message.clone());
    }

    fn read_response(&self) -> ResponseInput {
        self.response.borrow().clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    dispatched: Vec<(String, AttemptPayload)>,
}

impl AttemptSink for RecordingSink {
    fn dispatch(&mut self, quiz_id: &str, payload: &AttemptPayload) {
        self.dispatched.push((quiz_id.to_owned(), payload.clone()));
    }
}

/// Plays forward in sampling-interval steps until `to` or an overlay opens.
fn play_until(
    engine: &mut Engine,
    player: &mut ScriptedPlayer,
    surface: &RecordingSurface,
    sink: &mut RecordingSink,
    to: f64,
) {
    loop {
        engine.tick(player, surface, sink);
        if engine.overlay().is_open() || player.time.get() >= to {
            break;
        }
        if player.state.get() == PlayerState::Playing {
            player.time.set((player.time.get() + 0.25).min(to));
        }
    }
}

#[test]
fn mcq_at_ten_seconds_full_session() {
    let mut engine = Engine::from_json(
        r#"{
            "id": "demo",
            "feedbackDelaySeconds": 2,
            "items": [{
                "id": "q1", "t": 10, "type": "mcq",
                "prompt": "What is conserved in the collision?",
                "choices": [
                    {"id": "a", "text": "Momentum"},
                    {"id": "b", "text": "Color"}
                ],
                "correct": ["a"]
            }]
        }"#,
    )
    .unwrap();
    let mut player = ScriptedPlayer::new(60.0);
    let surface = RecordingSurface::default();
    let mut sink = RecordingSink::default();

    // the overlay opens at the trigger second and pauses playback
    play_until(&mut engine, &mut player, &surface, &mut sink, 12.0);
    assert_eq!(engine.overlay().stage(), Stage::ItemOpen);
    assert_eq!(player.state.get(), PlayerState::Paused);
    assert!(player.time.get() <= 10.25);

    // the correct choice grades to full credit
    surface.select(&["a"]);
    let mut scheduled: Vec<(AlarmMessage, Duration)> = Vec::new();
    engine.receive_message(
        IncomingViewerMessage::SubmitResponse.into(),
        &mut player,
        &surface,
        &mut sink,
        |message, delay| scheduled.push((message, delay)),
    );
    assert_eq!(surface.feedback_texts(), vec!["Correct.".to_owned()]);

    // the overlay stays open through the feedback delay, then closes
    assert_eq!(engine.overlay().stage(), Stage::ItemOpen);
    let (alarm, delay) = scheduled.pop().unwrap();
    assert_eq!(delay, Duration::from_secs(2));
    engine.receive_alarm(alarm, &mut player, &surface);
    assert_eq!(engine.overlay().stage(), Stage::Closed);
    assert_eq!(player.state.get(), PlayerState::Playing);

    // the answered item never gates again
    play_until(&mut engine, &mut player, &surface, &mut sink, 20.0);
    assert_eq!(engine.overlay().stage(), Stage::Closed);

    let summary = engine.score_summary();
    assert_eq!(summary.points, 1.0);
    assert_eq!(summary.max_points, 1.0);
    assert_eq!(summary.percent, 100.0);
}

#[test]
fn cutoff_reaches_identity_before_media_end() {
    let mut engine = Engine::from_json(
        r#"{
            "id": "demo",
            "endAt": 30,
            "requireIdentity": true,
            "requireWatchToEnd": true,
            "identityPrompt": "Who watched this?",
            "items": []
        }"#,
    )
    .unwrap();
    let mut player = ScriptedPlayer::new(60.0);
    let surface = RecordingSurface::default();
    let mut sink = RecordingSink::default();

    // at 29s the remainder against the 30s cutoff is within tolerance,
    // even though 31s of media remain
    play_until(&mut engine, &mut player, &surface, &mut sink, 29.0);
    assert_eq!(engine.overlay().stage(), Stage::IdentityOpen);
    assert!(player.time.get() <= 29.25);
    let prompt = surface
        .messages
        .borrow()
        .iter()
        .find_map(|m| match m {
            SurfaceMessage::IdentityOpen { prompt } => Some(prompt.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(prompt, "Who watched this?");

    surface.type_text("jane.doe");
    engine.receive_message(
        IncomingViewerMessage::SubmitIdentity.into(),
        &mut player,
        &surface,
        &mut sink,
        |_, _| {},
    );

    assert_eq!(sink.dispatched.len(), 1);
    let (_, payload) = &sink.dispatched[0];
    assert_eq!(payload.viewer, "jane.doe");

    // the recorded watch measurements reflect the cutoff, not the media
    let json = serde_json::to_value(payload).unwrap();
    assert_eq!(json["answers"][META_KEY]["watchPercent"], 100.0);

    engine.receive_submission(&SubmitOutcome::Accepted, &surface);
    assert_eq!(engine.overlay().stage(), Stage::ThanksOpen);
}

#[test]
fn duplicate_submission_is_idempotent() {
    let mut engine = Engine::from_json(
        r#"{
            "id": "demo",
            "endAt": 20,
            "requireIdentity": true,
            "requireWatchToEnd": true,
            "items": [{
                "id": "q1", "t": 5, "type": "checkbox",
                "choices": [
                    {"id": "a", "text": "A"},
                    {"id": "b", "text": "B"},
                    {"id": "c", "text": "C"},
                    {"id": "d", "text": "D"}
                ],
                "correct": ["a", "b", "c"]
            }]
        }"#,
    )
    .unwrap();
    let mut player = ScriptedPlayer::new(60.0);
    let surface = RecordingSurface::default();
    let mut sink = RecordingSink::default();

    play_until(&mut engine, &mut player, &surface, &mut sink, 6.0);
    surface.select(&["a", "b", "d"]);
    engine.receive_message(
        IncomingViewerMessage::SubmitResponse.into(),
        &mut player,
        &surface,
        &mut sink,
        |_, _| {},
    );
    assert_eq!(
        surface.feedback_texts(),
        vec!["Partially correct.".to_owned()]
    );

    play_until(&mut engine, &mut player, &surface, &mut sink, 19.0);
    assert_eq!(engine.overlay().stage(), Stage::IdentityOpen);

    surface.type_text("sam");
    engine.receive_message(
        IncomingViewerMessage::SubmitIdentity.into(),
        &mut player,
        &surface,
        &mut sink,
        |_, _| {},
    );
    assert_eq!(sink.dispatched.len(), 1);

    // the network fails; the viewer retries; storage reports a conflict
    engine.receive_submission(&SubmitOutcome::Failed("timeout".to_owned()), &surface);
    assert_eq!(surface.notice_count(Notice::SubmissionFailed), 1);
    assert_eq!(engine.overlay().stage(), Stage::IdentityOpen);

    engine.receive_message(
        IncomingViewerMessage::RetrySubmission.into(),
        &mut player,
        &surface,
        &mut sink,
        |_, _| {},
    );
    assert_eq!(sink.dispatched.len(), 2);

    // both dispatches carried the same nonce and identical totals
    let first = &sink.dispatched[0].1;
    let second = &sink.dispatched[1].1;
    assert_eq!(first.nonce, second.nonce);
    assert_eq!(first.points, 0.5);
    assert_eq!(second.points, 0.5);
    assert_eq!(first.max_points, second.max_points);

    // the conflict is terminal success and the success path fires once
    engine.receive_submission(&SubmitOutcome::AlreadyRecorded, &surface);
    assert_eq!(engine.overlay().stage(), Stage::ThanksOpen);
    assert_eq!(surface.thanks_count(), 1);

    engine.receive_submission(&SubmitOutcome::AlreadyRecorded, &surface);
    assert_eq!(surface.thanks_count(), 1);
}

#[test]
fn coverage_ignores_skipped_gaps_on_allowed_seeks() {
    let mut engine = Engine::from_json(r#"{"allowSeeking": true, "items": []}"#).unwrap();
    let mut player = ScriptedPlayer::new(100.0);
    let surface = RecordingSurface::default();
    let mut sink = RecordingSink::default();

    // watch the first ten seconds, seek over thirty, watch ten more
    play_until(&mut engine, &mut player, &surface, &mut sink, 10.0);
    player.time.set(40.0);
    engine.tick(&mut player, &surface, &mut sink);
    play_until(&mut engine, &mut player, &surface, &mut sink, 50.0);

    assert!(player.seeks.borrow().is_empty());
    let meta = engine.watch_meta();
    assert!(
        (meta.watch_seconds - 20.0).abs() < 0.6,
        "skipped gap must not count as watched, got {}",
        meta.watch_seconds
    );
}
