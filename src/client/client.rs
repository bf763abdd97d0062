//! High-level TKey-LUKS client API.
//!
//! [`TkeyClient`] owns a transport and runs one [`DeriveSession`] per
//! derivation. Sessions never share state, so a failed derivation can be
//! retried on the same client.

use super::session::{DeriveSession, SessionConfig};
use crate::core::TkeyResult;
use crate::crypto::DerivedKey;
use crate::transport::{FrameLink, Transport};

#[cfg(all(feature = "serial", unix))]
use super::config::ClientConfig;
#[cfg(all(feature = "serial", unix))]
use crate::transport::SerialTransport;

/// A TKey-LUKS client over transport `T`.
///
/// # Example
///
/// ```ignore
/// use tkey_luks::client::{ClientConfigBuilder, TkeyClient};
///
/// let config = ClientConfigBuilder::new().device("/dev/ttyACM0").build()?;
/// let mut client = TkeyClient::connect(&config)?;
/// let key = client.derive_key_with_prompt(b"my-system-id", || {
///     eprintln!("Touch the TKey to continue...");
/// })?;
/// ```
#[derive(Debug)]
pub struct TkeyClient<T> {
    link: FrameLink<T>,
    config: SessionConfig,
}

impl<T: Transport> TkeyClient<T> {
    /// Client over an already open transport.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            link: FrameLink::new(transport),
            config,
        }
    }

    /// Session settings used for each derivation.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a fresh session for step-by-step control.
    pub fn session(&mut self) -> DeriveSession<'_, T> {
        DeriveSession::new(&mut self.link, self.config.clone())
    }

    /// Run a full derivation for `challenge`.
    pub fn derive_key(&mut self, challenge: &[u8]) -> TkeyResult<DerivedKey> {
        self.derive_key_with_prompt(challenge, || {})
    }

    /// Run a full derivation, calling `on_touch` when the device starts
    /// waiting for a touch.
    pub fn derive_key_with_prompt(
        &mut self,
        challenge: &[u8],
        on_touch: impl FnOnce(),
    ) -> TkeyResult<DerivedKey> {
        Ok(self.session().run(challenge, on_touch)?)
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        self.link.get_ref()
    }

    /// Give back the transport.
    pub fn into_transport(self) -> T {
        self.link.into_inner()
    }
}

#[cfg(all(feature = "serial", unix))]
impl TkeyClient<SerialTransport> {
    /// Validate `config` and open its serial device.
    pub fn connect(config: &ClientConfig) -> TkeyResult<Self> {
        config.validate()?;
        let transport = SerialTransport::open(&config.port)?;
        Ok(Self::new(transport, config.session.clone()))
    }
}

/// Open the device, derive one key, and close the device again.
///
/// The port is released before this returns, on success or failure.
#[cfg(all(feature = "serial", unix))]
pub fn derive_once(
    config: &ClientConfig,
    challenge: &[u8],
    on_touch: impl FnOnce(),
) -> TkeyResult<DerivedKey> {
    let mut client = TkeyClient::connect(config)?;
    let result = client.derive_key_with_prompt(challenge, on_touch);
    drop(client);
    tracing::info!(path = %config.port.path.display(), "serial port closed");
    result
}
