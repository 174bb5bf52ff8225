//! Playback session state machine.
//!
//! ```text
//!            load             first tick
//!   Idle ──────────► Loading ───────────► Ready ◄──────────────┐
//!    ▲                  │                   │  Playing/Paused   │
//!    │  resolve failed  │                   │  Seeking/Dragging │ replay
//!    └──────────────────┘                   ▼                   │
//!                                  outro / finished ──► EpisodeTransition
//!                                           │ (last episode)
//!                                           ▼
//!                                         Ended
//! ```
//!
//! A session is owned by one task. Status ticks arrive one at a time through
//! [`PlaybackSession::handle_status`] or [`PlaybackSession::next_event`].
//! Commands to the surface and writes to the store run as background tasks;
//! their outcomes are applied when the owner polls.

mod notify;
mod surface;
mod timer;
mod title;

pub use notify::*;
pub use surface::*;
pub use timer::Deadline;
pub use title::*;

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    task::{JoinError, JoinSet},
};

use crate::{
    error::{LumenError, LumenResult},
    store::{PlayRecord, ProgressStore},
};

/// How long the seeking indicator stays up after the last seek.
pub const SEEK_INDICATOR_WINDOW: Duration = Duration::from_secs(1);
/// Minimum distance between two tick-driven progress writes.
pub const SAVE_THROTTLE_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_SEEK_STEP: Duration = Duration::from_secs(10);
const NEAR_END_RATIO: f64 = 0.95;

pub type StatusSender = mpsc::UnboundedSender<PlaybackStatus>;
pub type StatusReceiver = mpsc::UnboundedReceiver<PlaybackStatus>;

pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub source: String,
    pub id: String,
    pub title: String,
    /// 0-based
    pub episode_index: usize,
    /// Explicit resume position, wins over the stored record when > 0.
    pub position_millis: Option<u64>,
}

impl LoadRequest {
    pub fn new(
        source: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
        episode_index: usize,
    ) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
            title: title.into(),
            episode_index,
            position_millis: None,
        }
    }

    pub fn at_position(mut self, position_millis: u64) -> Self {
        self.position_millis = Some(position_millis);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Playing,
    Paused,
    Seeking,
    Dragging,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Loading,
    Ready,
    Ended,
}

/// What happened while the owner was waiting on [`PlaybackSession::next_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status,
    Unloaded,
    EpisodeAdvanced { index: usize },
    Ended,
    SeekingEnded,
    RateChanged(f32),
    CommandCompleted(Command),
    CommandFailed(Command),
    Saved,
    SaveFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveMode {
    Immediate,
    Throttled,
}

enum Outcome {
    Command {
        command: Command,
        result: SurfaceResult<()>,
    },
    Saved(LumenResult<()>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub episodes: Vec<Episode>,
    pub current_episode_index: usize,
    pub position_millis: u64,
    /// 0 until known
    pub duration_millis: u64,
    pub progress_position: f64,
    pub seek_position: f64,
    pub is_dragging: bool,
    pub drag_position: f64,
    pub playback_rate: f32,
    pub initial_position_millis: u64,
    pub intro_end_millis: Option<u64>,
    /// Measured backwards from the end of the media.
    pub outro_start_offset_millis: Option<u64>,
    pub next_episode_overlay_visible: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            episodes: Vec::new(),
            current_episode_index: 0,
            position_millis: 0,
            duration_millis: 0,
            progress_position: 0.,
            seek_position: 0.,
            is_dragging: false,
            drag_position: 0.,
            playback_rate: 1.,
            initial_position_millis: 0,
            intro_end_millis: None,
            outro_start_offset_millis: None,
            next_episode_overlay_visible: false,
        }
    }
}

pub struct PlaybackSession<S, P> {
    surface: Arc<S>,
    store: Arc<P>,
    notifier: Arc<dyn Notifier>,

    tasks: JoinSet<Outcome>,
    seek_window: Deadline,
    save_window: Deadline,

    stage: Stage,
    detail: Option<TitleDetail>,
    status: Option<PlaybackStatus>,
    pending_initial_seek: bool,
    /// Set between issuing a replay and hearing back from the surface. Ticks
    /// seen meanwhile belong to the previous episode and are only recorded.
    awaiting_restart: bool,
    state: SessionState,
}

impl<S, P> PlaybackSession<S, P>
where
    S: PlaybackSurface,
    P: ProgressStore,
{
    pub fn new(surface: S, store: P) -> Self {
        Self {
            surface: Arc::new(surface),
            store: Arc::new(store),
            notifier: Arc::new(LogNotifier),
            tasks: JoinSet::new(),
            seek_window: Deadline::default(),
            save_window: Deadline::default(),
            stage: Stage::Idle,
            detail: None,
            status: None,
            pending_initial_seek: false,
            awaiting_restart: false,
            state: SessionState::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn detail(&self) -> Option<&TitleDetail> {
        self.detail.as_ref()
    }

    pub fn status(&self) -> Option<&PlaybackStatus> {
        self.status.as_ref()
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.state.episodes.get(self.state.current_episode_index)
    }

    pub fn has_next_episode(&self) -> bool {
        self.state.current_episode_index + 1 < self.state.episodes.len()
    }

    pub fn is_seeking(&self) -> bool {
        self.state.is_dragging || self.seek_window.is_active()
    }

    pub fn is_save_throttled(&self) -> bool {
        self.save_window.is_active()
    }

    /// Fraction the progress bar should show. A drag wins over a seek, which
    /// wins over the reported position.
    pub fn displayed_progress(&self) -> f64 {
        if self.state.is_dragging {
            self.state.drag_position
        } else if self.seek_window.is_active() {
            self.state.seek_position
        } else {
            self.state.progress_position
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match self.stage {
            Stage::Idle => SessionPhase::Idle,
            Stage::Loading => SessionPhase::Loading,
            Stage::Ended => SessionPhase::Ended,
            Stage::Ready if self.state.is_dragging => SessionPhase::Dragging,
            Stage::Ready if self.seek_window.is_active() => SessionPhase::Seeking,
            Stage::Ready if self.status.as_ref().is_some_and(|s| s.is_playing) => {
                SessionPhase::Playing
            }
            Stage::Ready => SessionPhase::Paused,
        }
    }

    fn loaded_status(&self) -> Option<&PlaybackStatus> {
        if self.stage == Stage::Idle {
            return None;
        }
        self.status.as_ref().filter(|s| s.is_loaded)
    }

    /// Resolve the title, restore its play record and get ready for the
    /// first status tick.
    pub async fn load<R>(&mut self, resolver: &R, request: LoadRequest) -> LumenResult<()>
    where
        R: TitleResolver,
    {
        self.stage = Stage::Loading;

        let detail = match self.detail.take() {
            Some(detail)
                if detail.is_resolved_for(&request.title, &request.source, &request.id) =>
            {
                detail
            }
            _ => match resolver
                .resolve(&request.title, &request.source, &request.id)
                .await
            {
                Ok(detail) => detail,
                Err(e) => return Err(self.fail_load(e)),
            },
        };

        if request.episode_index >= detail.episodes.len() {
            let len = detail.episodes.len();
            self.detail = Some(detail);
            return Err(self.fail_load(LumenError::EpisodeOutOfRange {
                index: request.episode_index,
                len,
            }));
        }

        let record = match self.store.get(&detail.source, &detail.id).await {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Failed to load play record: {e}");
                None
            }
        };

        let initial_position_millis = request
            .position_millis
            .filter(|&position| position > 0)
            .or_else(|| {
                record
                    .as_ref()
                    .and_then(|r| r.intro_end_millis)
                    .filter(|&position| position > 0)
            })
            .or_else(|| record.as_ref().map(|r| r.play_time.saturating_mul(1000)))
            .unwrap_or(0);

        self.seek_window.cancel();
        self.save_window.cancel();
        self.status = None;
        self.pending_initial_seek = initial_position_millis > 0;
        self.awaiting_restart = false;
        self.state = SessionState {
            episodes: Episode::list(&detail.episodes),
            current_episode_index: request.episode_index,
            playback_rate: self.state.playback_rate,
            initial_position_millis,
            intro_end_millis: record.as_ref().and_then(|r| r.intro_end_millis),
            outro_start_offset_millis: record.as_ref().and_then(|r| r.outro_start_offset_millis),
            ..Default::default()
        };

        log::info!(
            "Loaded {} episode {}/{}, resuming at {}ms",
            detail.title,
            request.episode_index + 1,
            detail.episodes.len(),
            initial_position_millis
        );
        self.detail = Some(detail);
        self.stage = Stage::Ready;
        Ok(())
    }

    fn fail_load(&mut self, error: LumenError) -> LumenError {
        log::info!("Failed to load video: {error}");
        self.stage = Stage::Idle;
        self.state = SessionState::default();
        self.status = None;
        self.notifier
            .notify(Notice::error("Failed to load video").with_detail(error.to_string()));
        error
    }

    /// Apply one status update from the surface.
    pub fn handle_status(&mut self, status: PlaybackStatus) -> SessionEvent {
        if !status.is_loaded {
            if let Some(error) = &status.error {
                log::info!("Playback error: {error}");
            }
            self.status = Some(status);
            return SessionEvent::Unloaded;
        }

        let mut position = status.position_millis;
        let duration = status.duration_millis;
        let finished = status.did_just_finish;
        self.status = Some(status);

        // nothing loaded, or a tick of the previous episode before the replay landed
        if self.stage == Stage::Idle || self.awaiting_restart {
            return SessionEvent::Status;
        }

        if self.pending_initial_seek {
            self.pending_initial_seek = false;
            position = match duration {
                0 => self.state.initial_position_millis,
                duration => self.state.initial_position_millis.min(duration),
            };
            self.dispatch(Command::SeekTo(position));
        }

        self.state.position_millis = position;
        self.state.duration_millis = duration;
        if self.stage == Stage::Ended && !finished {
            self.stage = Stage::Ready;
        }

        let outro = self.state.outro_start_offset_millis;
        if let Some(offset) = outro {
            if duration > 0
                && position >= duration.saturating_sub(offset)
                && self.advance_episode()
            {
                return SessionEvent::EpisodeAdvanced {
                    index: self.state.current_episode_index,
                };
            }
        }

        if duration > 0 {
            self.save_progress(SaveMode::Throttled);

            let near_end = position as f64 / duration as f64 > NEAR_END_RATIO;
            self.state.next_episode_overlay_visible =
                near_end && self.has_next_episode() && outro.is_none();
        }

        let mut event = SessionEvent::Status;
        if finished {
            if self.advance_episode() {
                return SessionEvent::EpisodeAdvanced {
                    index: self.state.current_episode_index,
                };
            }
            self.stage = Stage::Ended;
            event = SessionEvent::Ended;
        }

        self.state.progress_position = if duration > 0 {
            (position as f64 / duration as f64).min(1.)
        } else {
            0.
        };
        event
    }

    /// Move to the next episode, if there is one, and restart the surface.
    pub fn advance_episode(&mut self) -> bool {
        if !self.has_next_episode() {
            return false;
        }

        self.state.current_episode_index += 1;
        self.state.position_millis = 0;
        self.state.progress_position = 0.;
        self.state.seek_position = 0.;
        self.state.initial_position_millis = 0;
        self.state.next_episode_overlay_visible = false;
        self.pending_initial_seek = false;
        self.awaiting_restart = true;
        self.stage = Stage::Ready;

        log::info!(
            "Advancing to episode {}/{}",
            self.state.current_episode_index + 1,
            self.state.episodes.len()
        );
        self.dispatch(Command::Replay);
        true
    }

    pub fn toggle_play_pause(&mut self) {
        let Some(is_playing) = self.loaded_status().map(|s| s.is_playing) else {
            return;
        };

        if let Some(status) = self.status.as_mut() {
            status.is_playing = !is_playing;
        }
        self.dispatch(if is_playing {
            Command::Pause
        } else {
            Command::Play
        });
    }

    /// Seek relative to the current position, clamped to the media.
    pub fn seek_by(&mut self, delta_millis: i64) {
        let duration = self.state.duration_millis;
        if self.loaded_status().is_none() || duration == 0 {
            return;
        }

        let target = self
            .state
            .position_millis
            .saturating_add_signed(delta_millis)
            .min(duration);
        self.dispatch(Command::SeekTo(target));

        self.state.position_millis = target;
        self.state.seek_position = target as f64 / duration as f64;
        self.seek_window.restart(SEEK_INDICATOR_WINDOW);
    }

    pub fn fast_forward(&mut self, step: Duration) {
        self.seek_by(i64::try_from(step.as_millis()).unwrap_or(i64::MAX));
    }

    pub fn rewind(&mut self, step: Duration) {
        self.seek_by(-i64::try_from(step.as_millis()).unwrap_or(i64::MAX));
    }

    /// Seek to a fraction of the media. Does nothing while the duration is unknown.
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        let duration = self.state.duration_millis;
        if self.loaded_status().is_none() || duration == 0 {
            return;
        }

        let target = (fraction.clamp(0., 1.) * duration as f64).round() as u64;
        self.dispatch(Command::SeekTo(target.min(duration)));
    }

    pub fn start_dragging(&mut self, position: f64) {
        let position = position.clamp(0., 1.);
        self.state.is_dragging = true;
        self.state.drag_position = position;
        self.state.seek_position = position;
    }

    pub fn update_dragging(&mut self, position: f64) {
        if !self.state.is_dragging {
            return;
        }

        let position = position.clamp(0., 1.);
        self.state.drag_position = position;
        self.state.seek_position = position;
    }

    pub fn end_dragging(&mut self) {
        if !self.state.is_dragging {
            return;
        }

        self.state.is_dragging = false;
        self.seek_to_fraction(self.state.drag_position);
        self.seek_window.restart(SEEK_INDICATOR_WINDOW);
    }

    /// Ask the surface for a new rate. The state only changes once the
    /// surface accepts it.
    pub fn set_playback_rate(&mut self, rate: f32) {
        if self.loaded_status().is_none() {
            return;
        }
        if !rate.is_finite() || rate <= 0. {
            self.notifier.notify(
                Notice::error("Failed to change playback speed")
                    .with_detail(format!("invalid rate {rate}")),
            );
            return;
        }

        self.dispatch(Command::SetRate {
            rate,
            preserve_pitch: true,
        });
    }

    /// Mark the current position as the end of the intro, or clear the mark.
    pub fn toggle_intro_marker(&mut self) {
        if self.loaded_status().is_none() || self.detail.is_none() {
            return;
        }

        if self.state.intro_end_millis.take().is_some() {
            self.notifier.notify(Notice::info("Intro marker cleared"));
        } else {
            let position = self.state.position_millis;
            self.state.intro_end_millis = Some(position);
            self.notifier.notify(
                Notice::success("Intro marker set").with_detail(format_millis(position)),
            );
        }
        self.save_progress(SaveMode::Immediate);
    }

    /// Mark the current position as the start of the outro, or clear the
    /// mark. The mark is kept as a distance from the end.
    pub fn toggle_outro_marker(&mut self) {
        if self.loaded_status().is_none() || self.detail.is_none() {
            return;
        }

        if self.state.outro_start_offset_millis.take().is_some() {
            self.notifier.notify(Notice::info("Outro marker cleared"));
        } else {
            let duration = self.state.duration_millis;
            if duration == 0 {
                return;
            }
            let offset = duration.saturating_sub(self.state.position_millis);
            self.state.outro_start_offset_millis = Some(offset);
            self.notifier.notify(
                Notice::success("Outro marker set")
                    .with_detail(format_millis(self.state.position_millis)),
            );
        }
        self.save_progress(SaveMode::Immediate);
    }

    /// Drop everything: pending commands and writes, windows and state.
    pub fn reset(&mut self) {
        // dropping the set aborts its tasks
        self.tasks = JoinSet::new();
        self.seek_window.cancel();
        self.save_window.cancel();
        self.stage = Stage::Idle;
        self.detail = None;
        self.status = None;
        self.pending_initial_seek = false;
        self.awaiting_restart = false;
        self.state = SessionState::default();
    }

    /// Wait for the next thing that changes the session: a finished command
    /// or write, the seeking window closing, or a status tick.
    ///
    /// Returns `None` once the status channel is closed.
    pub async fn next_event(&mut self, status: &mut StatusReceiver) -> Option<SessionEvent> {
        loop {
            tokio::select! {
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Some(event) = self.apply_joined(joined) {
                        return Some(event);
                    }
                }
                _ = self.seek_window.expired(), if self.seek_window.is_armed() => {
                    self.seek_window.cancel();
                    if !self.state.is_dragging {
                        return Some(SessionEvent::SeekingEnded);
                    }
                }
                update = status.recv() => return update.map(|s| self.handle_status(s)),
            }
        }
    }

    /// Wait for every in-flight command and write, applying their outcomes.
    pub async fn flush(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            events.extend(self.apply_joined(joined));
        }
        events
    }

    fn dispatch(&mut self, command: Command) {
        log::debug!("Issuing {command}");
        let surface = self.surface.clone();
        self.tasks.spawn(async move {
            let result = surface.execute(command).await;
            Outcome::Command { command, result }
        });
    }

    fn save_progress(&mut self, mode: SaveMode) {
        if self.loaded_status().is_none() {
            return;
        }
        let Some((source, id, record)) = self
            .detail
            .as_ref()
            .map(|detail| (detail.source.clone(), detail.id.clone(), self.record(detail)))
        else {
            return;
        };

        if mode == SaveMode::Throttled {
            if self.save_window.is_active() {
                return;
            }
            self.save_window.restart(SAVE_THROTTLE_WINDOW);
        }

        let store = self.store.clone();
        self.tasks
            .spawn(async move { Outcome::Saved(store.save(&source, &id, record).await) });
    }

    fn record(&self, detail: &TitleDetail) -> PlayRecord {
        let total_time = self.state.duration_millis / 1000;
        let mut play_time = self.state.position_millis / 1000;
        if total_time > 0 {
            play_time = play_time.min(total_time);
        }

        PlayRecord {
            title: detail.title.clone(),
            cover: detail.poster.clone().unwrap_or_default(),
            episode_index: u32::try_from(self.state.current_episode_index + 1).unwrap_or(u32::MAX),
            total_episodes: u32::try_from(self.state.episodes.len()).unwrap_or(u32::MAX),
            play_time,
            total_time,
            source_name: detail.source_name.clone(),
            year: detail.year.clone().unwrap_or_default(),
            intro_end_millis: self.state.intro_end_millis,
            outro_start_offset_millis: self.state.outro_start_offset_millis,
        }
    }

    fn apply_joined(&mut self, joined: Result<Outcome, JoinError>) -> Option<SessionEvent> {
        match joined {
            Ok(outcome) => Some(self.apply_outcome(outcome)),
            Err(e) => {
                log::debug!("Session task did not finish: {e}");
                None
            }
        }
    }

    fn apply_outcome(&mut self, outcome: Outcome) -> SessionEvent {
        match outcome {
            Outcome::Command { command, result } => {
                if command == Command::Replay {
                    self.awaiting_restart = false;
                }

                match result {
                    Ok(()) => match command {
                        Command::SetRate { rate, .. } => {
                            self.state.playback_rate = rate;
                            self.notifier.notify(
                                Notice::success("Playback speed changed")
                                    .with_detail(format!("{rate}x")),
                            );
                            SessionEvent::RateChanged(rate)
                        }
                        command => SessionEvent::CommandCompleted(command),
                    },
                    Err(e) => {
                        log::error!("Failed to {command}: {e}");
                        self.notifier
                            .notify(Notice::error(failure_title(command)).with_detail(e.to_string()));
                        SessionEvent::CommandFailed(command)
                    }
                }
            }
            Outcome::Saved(Ok(())) => SessionEvent::Saved,
            Outcome::Saved(Err(e)) => {
                log::warn!("Failed to save play record: {e}");
                SessionEvent::SaveFailed
            }
        }
    }
}

fn failure_title(command: Command) -> &'static str {
    match command {
        Command::Play | Command::Pause => "Operation failed",
        Command::SeekTo(_) => "Seek failed",
        Command::SetRate { .. } => "Failed to change playback speed",
        Command::Replay => "Playback failed",
    }
}

fn format_millis(millis: u64) -> String {
    let seconds = millis / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
