//! Channel playlists in the extended M3U format, optionally shipped encrypted
//! with AES-256-CBC under a PBKDF2-derived key.

pub mod crypto;
mod error;
pub mod parser;

pub use crypto::{decrypt, encrypt, Recipe};
pub use error::*;
pub use parser::{parse, EntryReader, PlaylistEntry};
