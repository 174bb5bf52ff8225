pub mod error;
pub mod ingest;
pub mod session;
pub mod store;

pub use error::{LumenError, LumenResult};
pub use ingest::{IngestOptions, PlaylistIngestor};
pub use lumen_m3u as m3u;
pub use lumen_m3u::PlaylistEntry;
pub use session::{LoadRequest, PlaybackSession, PlaybackStatus, PlaybackSurface, SessionEvent};
pub use store::{LumenStore, PlayRecord, ProgressStore};
