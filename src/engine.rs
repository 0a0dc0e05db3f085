//! Core engine state and sampling logic
//!
//! This module contains the engine that turns a stream of player
//! position samples into watched-coverage measurement, time-triggered
//! overlay gating, and an idempotent attempt submission. The engine owns
//! every piece of mutable session state; the playback provider, the
//! rendering collaborator, and the attempt sink are borrowed per call
//! and never hold state of their own.
//!
//! All coordination is single-threaded and cooperative: one `tick` per
//! playback sample, with deliberate early returns so that exactly one
//! corrective action (rewind, forced ceiling seek, overlay open) can
//! happen per sample.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::{
    AlarmMessage,
    coverage::CoverageTracker,
    gate::{self, GateState},
    overlay::{Overlay, Stage},
    player::{PlaybackProvider, PlayerError, PlayerState},
    quiz::{
        answer::Answer,
        config::{Item, ItemKind, Quiz, QuizError},
        grading::{self, GradeTier, ScoreSummary},
    },
    seek::{self, Jump, SeekGuard},
    store::{AttemptSink, SubmitOutcome},
    submit::{self, SubmissionState, WatchMeta},
    surface::{Notice, Surface, SurfaceMessage},
};

/// Feedback shown for item kinds that are recorded but never scored
const UNSCORED_FEEDBACK: &str = "Response recorded.";

/// Prompt used when the quiz does not author its own identity prompt
const DEFAULT_IDENTITY_PROMPT: &str = "Enter your name to record your attempt.";

/// Logs a failed playback-control call and moves on
///
/// Playback control is best-effort: a provider hiccup must never crash
/// the sampling loop.
fn best_effort(result: Result<(), PlayerError>, action: &str) {
    if let Err(error) = result {
        warn!("playback control `{action}` failed: {error}");
    }
}

/// Messages received from the session's collaborators
///
/// Viewer actions and playback-state notifications both arrive here and
/// are routed through one step function, preserving the no-concurrent-
/// tick guarantee regardless of the host runtime's event ordering.
#[derive(Debug, Clone, Serialize, Deserialize, derive_more::From)]
pub enum IncomingMessage {
    /// An action taken by the viewer on a rendered surface
    Viewer(IncomingViewerMessage),
    /// A notification from the playback provider
    Playback(IncomingPlaybackMessage),
}

/// Actions the viewer can take on a rendered surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomingViewerMessage {
    /// Submit the open item with the surface's current input
    SubmitResponse,
    /// Dismiss the open item after feedback (or acknowledge a pause)
    Continue,
    /// Submit the identity surface with the surface's current text
    SubmitIdentity,
    /// Retry a failed attempt submission
    RetrySubmission,
    /// Close the terminal thanks surface
    CloseThanks,
}

/// Notifications from the playback provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomingPlaybackMessage {
    /// The provider's play state changed
    StateChange(PlayerState),
}

/// The playback coverage and quiz-gating engine
///
/// One instance per viewing session. The engine owns the coverage
/// tracker, the seek guard, the gate and overlay state, the answered
/// map, and the submission state; no other component may write them.
pub struct Engine {
    /// The quiz document, immutable after load
    quiz: Quiz,
    /// Watched-interval accumulation
    coverage: CoverageTracker,
    /// One-shot corrective rewind state
    guard: SeekGuard,
    /// Playhead and review-pass bookkeeping
    gate: GateState,
    /// What the viewer currently sees over the video
    overlay: Overlay,
    /// Stored answers, keyed by item id
    answered: BTreeMap<String, Answer>,
    /// Submission protocol state
    submission: SubmissionState,
    /// Captured viewer identity, once provided
    viewer: Option<String>,
    /// Last known media duration, cached from the provider
    media_duration: f64,
}

impl std::fmt::Debug for Engine {
    /// Custom debug implementation that avoids printing the full document
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("quiz", &self.quiz.id)
            .field("stage", &self.overlay.stage())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine for a validated quiz document
    pub fn new(quiz: Quiz) -> Self {
        debug!(
            "engine created for quiz {:?} with {} item(s)",
            quiz.id,
            quiz.len()
        );
        Self {
            quiz,
            coverage: CoverageTracker::default(),
            guard: SeekGuard::default(),
            gate: GateState::default(),
            overlay: Overlay::default(),
            answered: BTreeMap::new(),
            submission: SubmissionState::default(),
            viewer: None,
            media_duration: 0.0,
        }
    }

    /// Parses, validates, and wraps a quiz document in one step
    ///
    /// # Errors
    ///
    /// Returns a [`QuizError`] when the document is malformed or fails
    /// validation; the session must surface it as a blocking status and
    /// run no gating logic.
    pub fn from_json(json: &str) -> Result<Self, QuizError> {
        Ok(Self::new(Quiz::from_json(json)?))
    }

    /// The quiz document this engine runs over
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// The coverage tracker
    pub fn coverage(&self) -> &CoverageTracker {
        &self.coverage
    }

    /// The gate bookkeeping
    pub fn gate(&self) -> &GateState {
        &self.gate
    }

    /// The overlay state machine
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// The stored answers, keyed by item id
    pub fn answers(&self) -> &BTreeMap<String, Answer> {
        &self.answered
    }

    /// The submission protocol state
    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    /// The captured viewer identity, once provided
    pub fn viewer(&self) -> Option<&str> {
        self.viewer.as_deref()
    }

    /// Current score totals over the quiz
    pub fn score_summary(&self) -> ScoreSummary {
        grading::totals(&self.quiz.items, |id| self.answered.get(id))
    }

    /// Current watch measurements as they would be recorded
    pub fn watch_meta(&self) -> WatchMeta {
        let now = self.gate.last_now.unwrap_or(0.0);
        let effective_end = CoverageTracker::effective_end(self.quiz.end_at, self.media_duration);
        WatchMeta {
            watch_seconds: self.coverage.watched_seconds(now, effective_end),
            watch_percent: self
                .coverage
                .watched_percent(now, self.media_duration, self.quiz.end_at),
        }
    }

    /// Processes one playback sample
    ///
    /// Called on a fixed interval (see
    /// [`crate::constants::sampling::INTERVAL_MILLIS`]). Each call runs
    /// to completion before the next; early returns short-circuit the
    /// remaining gating logic so exactly one corrective action happens
    /// per sample.
    pub fn tick<P, R, K>(&mut self, player: &mut P, surface: &R, sink: &mut K)
    where
        P: PlaybackProvider,
        R: Surface,
        K: AttemptSink,
    {
        let now = player.current_time();
        let duration = player.duration();
        let state = player.player_state();

        if duration.is_finite() && duration > 0.0 {
            self.media_duration = duration;
        }

        // first sample establishes the baseline; no gating decisions yet
        let Some(last_now) = self.gate.last_now else {
            self.gate.last_now = Some(now);
            self.gate.note_position(now);
            if state.is_playing() && !self.overlay.is_open() {
                self.coverage.start_watch(now);
            }
            return;
        };

        // an open overlay holds the session: no coverage, no gating
        if self.overlay.is_open() {
            self.coverage.stop_watch(last_now.min(now));
            self.gate.last_now = Some(now);
            return;
        }

        if matches!(state, PlayerState::Ended) {
            let effective_end =
                CoverageTracker::effective_end(self.quiz.end_at, self.media_duration);
            self.coverage
                .stop_watch(if effective_end > 0.0 { now.min(effective_end) } else { now });
            self.gate.last_now = Some(now);
            self.try_finish(player, surface, sink);
            return;
        }

        let jump = seek::classify_jump(now, last_now);

        if jump == Jump::Forward
            && !self.quiz.allow_seeking
            && self.guard.claim_corrective_rewind()
        {
            // the open segment stays anchored where the rewind lands
            self.coverage.split_at(last_now, last_now);
            debug!("first forward jump of the session ({last_now:.2}s -> {now:.2}s), rewinding");
            best_effort(player.seek_to(last_now, true), "seek");
            surface.render(&Notice::SeekBlocked.into());
            self.gate.last_now = Some(last_now);
            return;
        }

        // coverage must never silently span a skipped gap
        if jump != Jump::Smooth {
            self.coverage.split_at(last_now, now);
        }

        // a fast seek must not vault an ungated item between two samples
        if !self.quiz.allow_seeking {
            let ceiling = gate::next_gate_time_after(&self.quiz, &self.answered, &self.gate, last_now);
            if now > ceiling + crate::constants::gate::CEILING_GRACE {
                let target = ceiling - crate::constants::gate::CEILING_SETBACK;
                debug!("playhead {now:.2}s vaulted the gate at {ceiling:.2}s, forcing back");
                best_effort(player.seek_to(target, true), "seek");
                self.coverage.split_at(last_now, target);
                self.gate.last_now = Some(target);
                return;
            }
        }

        self.gate.note_position(now);

        if jump == Jump::Backward && self.quiz.review_on_rewatch && !self.gate.review_mode {
            self.gate.enter_review();
            debug!(
                "entering review until {:.2}s after rewind to {now:.2}s",
                self.gate.review_exit_time
            );
        }
        if self.gate.maybe_exit_review(now) {
            debug!("review pass complete at {now:.2}s");
        }

        if let Some(index) =
            gate::first_due_item(&self.quiz, &self.answered, &self.gate, now).map(|(index, _)| index)
        {
            self.open_item(index, now, player, surface);
            self.gate.last_now = Some(now);
            return;
        }

        if state.is_playing() {
            self.coverage.start_watch(now);
        } else {
            self.coverage.stop_watch(now);
        }

        self.gate.last_now = Some(now);

        if self.quiz.require_watch_to_end
            && self
                .coverage
                .watched_percent(now, self.media_duration, self.quiz.end_at)
                >= 100.0
        {
            self.try_finish(player, surface, sink);
        }
    }

    /// Routes a message from the viewer or the playback provider
    pub fn receive_message<P, R, K, S>(
        &mut self,
        message: IncomingMessage,
        player: &mut P,
        surface: &R,
        sink: &mut K,
        schedule: S,
    ) where
        P: PlaybackProvider,
        R: Surface,
        K: AttemptSink,
        S: FnMut(AlarmMessage, Duration),
    {
        match message {
            IncomingMessage::Viewer(IncomingViewerMessage::SubmitResponse) => {
                self.handle_submit(player, surface, schedule);
            }
            IncomingMessage::Viewer(IncomingViewerMessage::Continue) => {
                self.handle_continue(player, surface);
            }
            IncomingMessage::Viewer(IncomingViewerMessage::SubmitIdentity) => {
                self.handle_identity(surface, sink);
            }
            IncomingMessage::Viewer(IncomingViewerMessage::RetrySubmission) => {
                self.begin_submission(sink);
            }
            IncomingMessage::Viewer(IncomingViewerMessage::CloseThanks) => {
                if self.overlay.change_stage(Stage::ThanksOpen, Stage::Closed) {
                    surface.render(&SurfaceMessage::OverlayClosed);
                }
            }
            IncomingMessage::Playback(IncomingPlaybackMessage::StateChange(state)) => {
                self.handle_state_change(state, player, surface, sink);
            }
        }
    }

    /// Handles a scheduled alarm
    ///
    /// The only alarm is the delayed auto-close of a submitted overlay;
    /// it is ignored unless the same item is still open and not waiting
    /// for an explicit continue.
    pub fn receive_alarm<P, R>(&mut self, message: AlarmMessage, player: &mut P, surface: &R)
    where
        P: PlaybackProvider,
        R: Surface,
    {
        match message {
            AlarmMessage::CloseOverlay { item_id } => {
                let still_open = self
                    .overlay
                    .current()
                    .is_some_and(|open| open.id == item_id && !open.awaiting_continue);
                if still_open {
                    self.close_overlay(player, surface);
                }
            }
        }
    }

    /// Records the outcome of a dispatched attempt submission
    ///
    /// Success and duplicate conflict are both terminal success: the
    /// thanks surface opens exactly once. Failure keeps the current
    /// surface and re-arms the retry affordance.
    pub fn receive_submission<R: Surface>(&mut self, outcome: &SubmitOutcome, surface: &R) {
        let first_success = self.submission.resolve(outcome);
        if first_success {
            debug!("attempt recorded (nonce {})", self.submission.nonce());
            if !self.overlay.change_stage(Stage::IdentityOpen, Stage::ThanksOpen) {
                // identity capture was not required; open thanks directly
                let _ = self.overlay.change_stage(Stage::Closed, Stage::ThanksOpen);
            }
            surface.render(&SurfaceMessage::ThanksOpen {
                score: self.score_summary(),
            });
        } else if let SubmitOutcome::Failed(reason) = outcome {
            warn!("attempt submission failed: {reason}");
            surface.render(&Notice::SubmissionFailed.into());
        }
    }

    /// Opens the item at `index`, pausing playback behind it
    fn open_item<P, R>(&mut self, index: usize, now: f64, player: &mut P, surface: &R)
    where
        P: PlaybackProvider,
        R: Surface,
    {
        let item = self.quiz.items[index].clone();
        let read_only = self.answered.contains_key(&item.id);
        if !self.overlay.open_item(index, item.id.clone(), read_only) {
            return;
        }
        if read_only {
            self.gate.reviewed_this_pass.insert(item.id.clone());
        }
        self.coverage.stop_watch(now);
        best_effort(player.pause(), "pause");
        debug!(
            "opening item {} at {now:.2}s{}",
            item.id,
            if read_only { " (review)" } else { "" }
        );
        surface.render(&SurfaceMessage::ItemOpen {
            stored: self.answered.get(&item.id).cloned(),
            read_only,
            item,
        });
    }

    /// Closes the open overlay and resumes playback
    fn close_overlay<P, R>(&mut self, player: &mut P, surface: &R)
    where
        P: PlaybackProvider,
        R: Surface,
    {
        self.overlay.close();
        surface.render(&SurfaceMessage::OverlayClosed);
        best_effort(player.play(), "play");
    }

    /// Handles a submit action on the open item surface
    fn handle_submit<P, R, S>(&mut self, player: &mut P, surface: &R, mut schedule: S)
    where
        P: PlaybackProvider,
        R: Surface,
        S: FnMut(AlarmMessage, Duration),
    {
        if self.overlay.stage() != Stage::ItemOpen {
            return;
        }
        let Some(open) = self.overlay.current().cloned() else {
            return;
        };
        if open.read_only || open.awaiting_continue {
            return;
        }
        let item = self.quiz.items[open.index].clone();

        // a pause has no input; submitting acknowledges it
        if matches!(item.kind, ItemKind::Pause(_)) {
            self.answered.insert(item.id.clone(), Answer::Pause);
            self.close_overlay(player, surface);
            return;
        }

        let input = surface.read_response();
        if matches!(item.kind, ItemKind::Mcq(_) | ItemKind::Poll(_)) && input.selected.is_empty() {
            surface.render(&Notice::EmptySelection.into());
            return;
        }

        let answer = Answer::from_input(&item.kind, input);
        let tier = grading::grade(&item, &answer).map(|(_, tier)| tier);
        let text = feedback_text(&item, &answer, tier);
        self.answered.insert(item.id.clone(), answer);
        debug!("recorded answer for item {}", item.id);

        if self.quiz.require_continue {
            if let Some(current) = self.overlay.current_mut() {
                current.awaiting_continue = true;
            }
            surface.render(&SurfaceMessage::Feedback {
                item_id: item.id,
                tier,
                text,
                show_continue: true,
            });
        } else if self.quiz.feedback_delay.is_zero() {
            surface.render(&SurfaceMessage::Feedback {
                item_id: item.id,
                tier,
                text,
                show_continue: false,
            });
            self.close_overlay(player, surface);
        } else {
            surface.render(&SurfaceMessage::Feedback {
                item_id: item.id.clone(),
                tier,
                text,
                show_continue: false,
            });
            schedule(
                AlarmMessage::CloseOverlay { item_id: item.id },
                self.quiz.feedback_delay,
            );
        }
    }

    /// Handles a continue action on the open item surface
    fn handle_continue<P, R>(&mut self, player: &mut P, surface: &R)
    where
        P: PlaybackProvider,
        R: Surface,
    {
        if self.overlay.stage() != Stage::ItemOpen {
            return;
        }
        let Some(open) = self.overlay.current().cloned() else {
            return;
        };

        if open.awaiting_continue || open.read_only {
            self.close_overlay(player, surface);
            return;
        }

        // a pause is acknowledged by continuing past it
        if matches!(self.quiz.items[open.index].kind, ItemKind::Pause(_)) {
            self.answered.insert(open.id, Answer::Pause);
            self.close_overlay(player, surface);
        }
    }

    /// Handles the identity surface being submitted
    fn handle_identity<R, K>(&mut self, surface: &R, sink: &mut K)
    where
        R: Surface,
        K: AttemptSink,
    {
        if self.overlay.stage() != Stage::IdentityOpen {
            return;
        }
        let viewer = submit::sanitize_viewer(&surface.read_response().text);
        if viewer.is_empty() {
            surface.render(&Notice::IdentityRequired.into());
            return;
        }
        self.viewer = Some(viewer);
        self.begin_submission(sink);
    }

    /// Handles a play-state notification from the provider
    fn handle_state_change<P, R, K>(
        &mut self,
        state: PlayerState,
        player: &mut P,
        surface: &R,
        sink: &mut K,
    ) where
        P: PlaybackProvider,
        R: Surface,
        K: AttemptSink,
    {
        match state {
            PlayerState::Ended => {
                let now = player.current_time();
                let effective_end =
                    CoverageTracker::effective_end(self.quiz.end_at, self.media_duration);
                self.coverage
                    .stop_watch(if effective_end > 0.0 { now.min(effective_end) } else { now });
                self.gate.last_now = Some(now);
                self.try_finish(player, surface, sink);
            }
            PlayerState::Paused | PlayerState::Buffering => {
                if !self.overlay.is_open() {
                    self.coverage.stop_watch(player.current_time());
                }
            }
            _ => {}
        }
    }

    /// Runs the terminal coverage/identity path once its condition holds
    fn try_finish<P, R, K>(&mut self, player: &mut P, surface: &R, sink: &mut K)
    where
        P: PlaybackProvider,
        R: Surface,
        K: AttemptSink,
    {
        if self.overlay.is_open() {
            return;
        }
        if self.submission.submitting() || self.submission.submitted_once() {
            return;
        }

        if self.quiz.require_identity && self.viewer.is_none() {
            if self.overlay.change_stage(Stage::Closed, Stage::IdentityOpen) {
                best_effort(player.pause(), "pause");
                let prompt = self
                    .quiz
                    .identity_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_IDENTITY_PROMPT.to_owned());
                surface.render(&SurfaceMessage::IdentityOpen { prompt });
            }
        } else {
            self.begin_submission(sink);
        }
    }

    /// Dispatches the aggregate attempt if the guard allows it
    fn begin_submission<K: AttemptSink>(&mut self, sink: &mut K) {
        if !self.submission.begin() {
            return;
        }
        let payload = submit::build_payload(
            &self.quiz,
            &self.answered,
            self.viewer.as_deref(),
            self.watch_meta(),
            self.submission.nonce(),
        );
        let quiz_id = self.quiz.id.clone().unwrap_or_default();
        debug!("dispatching attempt for quiz {quiz_id:?} (nonce {})", payload.nonce);
        sink.dispatch(&quiz_id, &payload);
    }
}

/// Composes the viewer-facing feedback for a just-submitted answer
///
/// The grade verdict comes first; any authored per-choice feedback for
/// the selected choices follows in selection order.
fn feedback_text(item: &Item, answer: &Answer, tier: Option<GradeTier>) -> String {
    let mut parts = vec![tier.map_or(UNSCORED_FEEDBACK, GradeTier::verdict).to_owned()];

    let feedback_map = match &item.kind {
        ItemKind::Mcq(config) | ItemKind::Checkbox(config) => config.feedback.as_ref(),
        _ => None,
    };
    if let (Some(map), Some(selected)) = (feedback_map, answer.selected()) {
        for choice_id in selected {
            if let Some(line) = map.get(choice_id) {
                parts.push(line.clone());
            }
        }
    }

    parts.join(" ")
}
