//! TKey-LUKS - Client
//!
//! - [`DeriveSession`]: the ordered identify, announce, load, derive exchange
//! - [`TkeyClient`]: owns a transport and runs sessions on it
//! - [`ClientConfig`]: port and session settings, built with [`ClientConfigBuilder`]

#[allow(clippy::module_inception)]
mod client;
mod config;
mod error;
mod identity;
mod session;
mod upload;

pub use client::*;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{SessionError, SessionResult, UploadError};
pub use identity::AppIdentity;
pub use session::{DeriveSession, SessionConfig, SessionState, Step};
pub use upload::{ChunkUploader, chunk_frame_id};
