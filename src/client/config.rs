//! Client configuration and builder.

use std::path::PathBuf;
use std::time::Duration;

use super::identity::AppIdentity;
use super::session::SessionConfig;
use crate::core::{TkeyError, TkeyResult};
use crate::transport::PortSettings;

/// Everything needed to open a device and run sessions on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Serial line settings.
    pub port: PortSettings,
    /// Protocol settings for each session.
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Reject settings no session could succeed with.
    pub fn validate(&self) -> TkeyResult<()> {
        if self.port.path.as_os_str().is_empty() {
            return Err(TkeyError::Config("device path is empty".into()));
        }
        if self.port.speed == 0 {
            return Err(TkeyError::Config("line speed must be non-zero".into()));
        }
        if self.session.endpoint > 3 {
            return Err(TkeyError::Config(format!(
                "endpoint {} does not fit the 2-bit header field",
                self.session.endpoint
            )));
        }
        if self.session.response_timeout.is_zero() || self.session.touch_timeout.is_zero() {
            return Err(TkeyError::Config("timeouts must be non-zero".into()));
        }
        if self.session.touch_timeout < self.session.response_timeout {
            return Err(TkeyError::Config(
                "touch timeout must not be shorter than the response timeout".into(),
            ));
        }
        if self.session.max_challenge_size == Some(0) {
            return Err(TkeyError::Config(
                "maximum challenge size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the device node.
    pub fn device(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.port.path = path.into();
        self
    }

    /// Set the line speed.
    pub fn speed(mut self, speed: u32) -> Self {
        self.config.port.speed = speed;
        self
    }

    /// Set the pause between opening the port and the first frame.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.port.settle_delay = delay;
        self
    }

    /// Enable or disable `stty` line setup.
    pub fn configure_line(mut self, enabled: bool) -> Self {
        self.config.port.configure_line = enabled;
        self
    }

    /// Set the deadline for ordinary responses.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.session.response_timeout = timeout;
        self
    }

    /// Set the deadline for the touch-gated derive response.
    pub fn touch_timeout(mut self, timeout: Duration) -> Self {
        self.config.session.touch_timeout = timeout;
        self
    }

    /// Set the largest challenge a session will announce (`None`: no limit).
    pub fn max_challenge_size(mut self, max: Option<usize>) -> Self {
        self.config.session.max_challenge_size = max;
        self
    }

    /// Require this app identity (`None`: accept any app).
    pub fn expected_app(mut self, app: Option<AppIdentity>) -> Self {
        self.config.session.expected_app = app;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> TkeyResult<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
