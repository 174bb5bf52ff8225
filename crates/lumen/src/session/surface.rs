use std::{fmt, future::Future, sync::Arc};

use thiserror::Error;

/// A status update reported by the video surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackStatus {
    pub is_loaded: bool,
    pub position_millis: u64,
    /// 0 until the duration is known
    pub duration_millis: u64,
    pub is_playing: bool,
    pub did_just_finish: bool,
    pub error: Option<String>,
}

impl PlaybackStatus {
    pub fn loaded(position_millis: u64, duration_millis: u64) -> Self {
        Self {
            is_loaded: true,
            position_millis,
            duration_millis,
            ..Default::default()
        }
    }

    pub fn playing(mut self) -> Self {
        self.is_playing = true;
        self
    }

    pub fn finished(mut self) -> Self {
        self.did_just_finish = true;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Media is not loaded")]
    NotLoaded,

    #[error("Command rejected: {0}")]
    Rejected(String),
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Transport commands the session issues to the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    SeekTo(u64),
    SetRate { rate: f32, preserve_pitch: bool },
    Replay,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Play => write!(f, "play"),
            Command::Pause => write!(f, "pause"),
            Command::SeekTo(position) => write!(f, "seek to {position}ms"),
            Command::SetRate { rate, .. } => write!(f, "set rate {rate}x"),
            Command::Replay => write!(f, "replay"),
        }
    }
}

/// The video player the session drives. Decoding and rendering happen behind
/// this trait; every command may fail independently.
pub trait PlaybackSurface: Send + Sync + 'static {
    fn play(&self) -> impl Future<Output = SurfaceResult<()>> + Send;

    fn pause(&self) -> impl Future<Output = SurfaceResult<()>> + Send;

    fn seek_to(&self, position_millis: u64) -> impl Future<Output = SurfaceResult<()>> + Send;

    fn set_rate(
        &self,
        rate: f32,
        preserve_pitch: bool,
    ) -> impl Future<Output = SurfaceResult<()>> + Send;

    /// Restart playback from the beginning of the current source.
    fn replay(&self) -> impl Future<Output = SurfaceResult<()>> + Send;

    fn execute(&self, command: Command) -> impl Future<Output = SurfaceResult<()>> + Send {
        async move {
            match command {
                Command::Play => self.play().await,
                Command::Pause => self.pause().await,
                Command::SeekTo(position) => self.seek_to(position).await,
                Command::SetRate {
                    rate,
                    preserve_pitch,
                } => self.set_rate(rate, preserve_pitch).await,
                Command::Replay => self.replay().await,
            }
        }
    }
}

impl<S> PlaybackSurface for Arc<S>
where
    S: PlaybackSurface,
{
    fn play(&self) -> impl Future<Output = SurfaceResult<()>> + Send {
        self.as_ref().play()
    }

    fn pause(&self) -> impl Future<Output = SurfaceResult<()>> + Send {
        self.as_ref().pause()
    }

    fn seek_to(&self, position_millis: u64) -> impl Future<Output = SurfaceResult<()>> + Send {
        self.as_ref().seek_to(position_millis)
    }

    fn set_rate(
        &self,
        rate: f32,
        preserve_pitch: bool,
    ) -> impl Future<Output = SurfaceResult<()>> + Send {
        self.as_ref().set_rate(rate, preserve_pitch)
    }

    fn replay(&self) -> impl Future<Output = SurfaceResult<()>> + Send {
        self.as_ref().replay()
    }
}
