//! Key derivation session state machine.
//!
//! One session drives one exchange, strictly in order:
//!
//! ```text
//! Idle ──identify──▶ Identified ──announce──▶ SizeAnnounced
//!      ──load──▶ ChallengeLoaded ──derive──▶ Derived
//!
//! any step failure ──▶ Failed(kind)
//! ```
//!
//! Each step is attempted once. A failed session stays failed; the caller
//! starts a new one from `Idle` to retry.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use super::error::{SessionError, SessionResult};
use super::identity::AppIdentity;
use super::upload::ChunkUploader;
use crate::core::{
    ANNOUNCE_DATA_SIZE, CMD_DERIVE_KEY, CMD_GET_NAMEVERSION, CMD_SET_CHALLENGE, DERIVED_KEY_SIZE,
    ENDPOINT_APP, ErrorKind, FRAME_ID_ANNOUNCE, FRAME_ID_DERIVE, FRAME_ID_IDENTIFY,
    IDENTITY_RESPONSE_SIZE, MAX_CHALLENGE_SIZE, RESPONSE_TIMEOUT, RSP_DERIVE_KEY,
    RSP_GET_NAMEVERSION, RSP_SET_CHALLENGE, STATUS_OK, TOUCH_TIMEOUT,
};
use crate::crypto::DerivedKey;
use crate::transport::{FrameLink, Transport, TransportError};

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing sent yet.
    Idle,
    /// Device app answered the identify request.
    Identified,
    /// Device accepted the challenge size.
    SizeAnnounced,
    /// Every challenge chunk was acknowledged.
    ChallengeLoaded,
    /// Key received (terminal).
    Derived,
    /// A step failed (terminal).
    Failed(ErrorKind),
}

impl SessionState {
    /// Check if no further step can run.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Derived | SessionState::Failed(_))
    }
}

/// One protocol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Ask the app for its name and version.
    Identify,
    /// Announce the challenge size.
    AnnounceSize,
    /// Upload the challenge.
    LoadChallenge,
    /// Request the derived key.
    Derive,
}

impl Step {
    /// State a session must be in to run this step.
    fn requires(self) -> SessionState {
        match self {
            Step::Identify => SessionState::Idle,
            Step::AnnounceSize => SessionState::Identified,
            Step::LoadChallenge => SessionState::SizeAnnounced,
            Step::Derive => SessionState::ChallengeLoaded,
        }
    }

    /// State a session moves to when this step succeeds.
    fn yields(self) -> SessionState {
        match self {
            Step::Identify => SessionState::Identified,
            Step::AnnounceSize => SessionState::SizeAnnounced,
            Step::LoadChallenge => SessionState::ChallengeLoaded,
            Step::Derive => SessionState::Derived,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Identify => "identify",
            Step::AnnounceSize => "announce size",
            Step::LoadChallenge => "load challenge",
            Step::Derive => "derive key",
        })
    }
}

/// Per-session protocol settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Destination endpoint of every request.
    pub endpoint: u8,
    /// Deadline for ordinary responses.
    pub response_timeout: Duration,
    /// Deadline for the derive response, which waits on a touch.
    pub touch_timeout: Duration,
    /// Refuse challenges larger than this (`None`: no limit).
    pub max_challenge_size: Option<usize>,
    /// Identity the device must report (`None`: accept any app).
    pub expected_app: Option<AppIdentity>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: ENDPOINT_APP,
            response_timeout: RESPONSE_TIMEOUT,
            touch_timeout: TOUCH_TIMEOUT,
            max_challenge_size: Some(MAX_CHALLENGE_SIZE),
            expected_app: Some(AppIdentity::LUKS),
        }
    }
}

/// A single key derivation exchange over a borrowed [`FrameLink`].
#[derive(Debug)]
pub struct DeriveSession<'a, T> {
    link: &'a mut FrameLink<T>,
    config: SessionConfig,
    state: SessionState,
    identity: Option<AppIdentity>,
    challenge_size: usize,
    uploaded: usize,
}

impl<'a, T: Transport> DeriveSession<'a, T> {
    /// Start a session in `Idle`.
    pub fn new(link: &'a mut FrameLink<T>, config: SessionConfig) -> Self {
        Self {
            link,
            config,
            state: SessionState::Idle,
            identity: None,
            challenge_size: 0,
            uploaded: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identity reported by the device, once identified.
    pub fn identity(&self) -> Option<AppIdentity> {
        self.identity
    }

    /// Challenge size accepted by the device.
    pub fn challenge_size(&self) -> usize {
        self.challenge_size
    }

    /// Challenge bytes acknowledged so far.
    pub fn uploaded(&self) -> usize {
        self.uploaded
    }

    /// `Idle → Identified`: ask the app for its name and version.
    pub fn identify(&mut self) -> SessionResult<AppIdentity> {
        self.step(Step::Identify, |s| {
            let data = s.link.transact(
                FRAME_ID_IDENTIFY,
                s.config.endpoint,
                (CMD_GET_NAMEVERSION, &[]),
                RSP_GET_NAMEVERSION,
                s.config.response_timeout,
            )?;
            let identity =
                AppIdentity::parse(&data).ok_or(SessionError::MalformedResponse {
                    expected: IDENTITY_RESPONSE_SIZE,
                    actual: data.len(),
                })?;

            if let Some(expected) = s.config.expected_app {
                if identity != expected {
                    return Err(SessionError::UnexpectedApp { found: identity });
                }
            }

            info!(app = %identity, "device app identified");
            s.identity = Some(identity);
            Ok(identity)
        })
    }

    /// `Identified → SizeAnnounced`: tell the app how long the challenge is.
    pub fn announce_size(&mut self, size: usize) -> SessionResult<()> {
        self.step(Step::AnnounceSize, |s| {
            let max = s.config.max_challenge_size.unwrap_or(u32::MAX as usize);
            if size == 0 || size > max {
                return Err(SessionError::InvalidChallengeSize { size, max });
            }

            let mut data = [0u8; ANNOUNCE_DATA_SIZE];
            data[..4].copy_from_slice(&(size as u32).to_le_bytes());

            let ack = s.link.transact(
                FRAME_ID_ANNOUNCE,
                s.config.endpoint,
                (CMD_SET_CHALLENGE, &data[..]),
                RSP_SET_CHALLENGE,
                s.config.response_timeout,
            )?;
            match ack.first() {
                Some(&STATUS_OK) => {}
                status => {
                    return Err(SessionError::DeviceRejectedSize {
                        size,
                        status: status.copied(),
                    });
                }
            }

            info!(size, "challenge size accepted");
            s.challenge_size = size;
            Ok(())
        })
    }

    /// `SizeAnnounced → ChallengeLoaded`: upload the challenge in chunks.
    ///
    /// `challenge` must be exactly as long as the announced size.
    pub fn load_challenge(&mut self, challenge: &[u8]) -> SessionResult<()> {
        self.step(Step::LoadChallenge, |s| {
            if challenge.len() != s.challenge_size {
                return Err(SessionError::InvalidChallengeSize {
                    size: challenge.len(),
                    max: s.challenge_size,
                });
            }

            let mut uploader =
                ChunkUploader::new(s.link, s.config.endpoint, s.config.response_timeout);
            s.uploaded = uploader.upload(challenge)?;
            Ok(())
        })
    }

    /// `ChallengeLoaded → Derived`: request the key and wait for the touch.
    ///
    /// Callers should prompt the operator to touch the device before calling.
    pub fn derive(&mut self) -> SessionResult<DerivedKey> {
        self.step(Step::Derive, |s| {
            info!(timeout = ?s.config.touch_timeout, "requesting key derivation");
            let data = s
                .link
                .transact(
                    FRAME_ID_DERIVE,
                    s.config.endpoint,
                    (CMD_DERIVE_KEY, &[]),
                    RSP_DERIVE_KEY,
                    s.config.touch_timeout,
                )
                .map_err(|e| match e {
                    TransportError::Timeout => SessionError::TouchTimeout,
                    other => SessionError::Transport(other),
                })?;

            let key = DerivedKey::from_prefix(&data)
                .ok_or(SessionError::DerivationIncomplete { actual: data.len() })?;
            info!(bytes = DERIVED_KEY_SIZE, "key derived");
            Ok(key)
        })
    }

    /// Run every step in order. `on_touch` runs right before the derive
    /// request so the caller can show a "touch the device" prompt.
    pub fn run(mut self, challenge: &[u8], on_touch: impl FnOnce()) -> SessionResult<DerivedKey> {
        self.identify()?;
        self.announce_size(challenge.len())?;
        self.load_challenge(challenge)?;
        on_touch();
        self.derive()
    }

    /// Check order, run `f`, and record the outcome.
    fn step<R>(
        &mut self,
        step: Step,
        f: impl FnOnce(&mut Self) -> SessionResult<R>,
    ) -> SessionResult<R> {
        if self.state != step.requires() {
            return Err(SessionError::OutOfOrder {
                step,
                state: self.state,
            });
        }

        match f(self) {
            Ok(value) => {
                self.state = step.yields();
                Ok(value)
            }
            Err(e) => {
                warn!(%step, error = %e, "session step failed");
                self.state = SessionState::Failed(e.kind());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::upload::chunk_frame_id;
    use super::*;
    use crate::core::{CMD_LOAD_CHALLENGE, RSP_LOAD_CHALLENGE, STATUS_BAD};
    use crate::transport::{Frame, LengthClass, MockTransport};

    fn any_app() -> SessionConfig {
        SessionConfig {
            expected_app: None,
            response_timeout: Duration::from_millis(10),
            touch_timeout: Duration::from_millis(10),
            ..SessionConfig::default()
        }
    }

    fn identity_bytes(name0: &[u8; 4], name1: &[u8; 4], version: u32) -> Vec<u8> {
        AppIdentity {
            name0: *name0,
            name1: *name1,
            version,
        }
        .to_bytes()
        .to_vec()
    }

    /// Mock answering identify, announce and every chunk of `challenge`.
    fn loaded_mock(challenge: &[u8]) -> MockTransport {
        let mut mock = MockTransport::new();
        mock.push_response(1, RSP_GET_NAMEVERSION, &identity_bytes(b"tk1 ", b"luks", 1));
        mock.push_response(2, RSP_SET_CHALLENGE, &[STATUS_OK]);
        for i in 0..challenge.len().div_ceil(127) {
            mock.push_response(chunk_frame_id(i), RSP_LOAD_CHALLENGE, &[STATUS_OK]);
        }
        mock
    }

    #[test]
    fn test_identify() {
        let mut mock = MockTransport::new();
        mock.push_response(1, RSP_GET_NAMEVERSION, &identity_bytes(b"tkey", b"app1", 5));
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        let identity = session.identify().unwrap();
        assert_eq!(identity.name(), "tkeyapp1");
        assert_eq!(identity.version, 5);
        assert_eq!(session.state(), SessionState::Identified);
        assert_eq!(session.identity(), Some(identity));

        let frames = link.get_ref().sent_frames();
        assert_eq!(frames[0].header.id, 1);
        assert_eq!(frames[0].code, CMD_GET_NAMEVERSION);
    }

    #[test]
    fn test_identify_short_response() {
        let mut mock = MockTransport::new();
        // LEN_4 response: only 3 data bytes
        mock.push_response(1, RSP_GET_NAMEVERSION, b"tk1");
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        let err = session.identify().unwrap_err();
        assert!(matches!(
            err,
            SessionError::MalformedResponse {
                expected: 12,
                actual: 3
            }
        ));
        assert_eq!(
            session.state(),
            SessionState::Failed(ErrorKind::MalformedResponse)
        );
    }

    #[test]
    fn test_identify_wrong_app() {
        let mut mock = MockTransport::new();
        mock.push_response(1, RSP_GET_NAMEVERSION, &identity_bytes(b"tk1 ", b"sign", 1));
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, SessionConfig::default());

        let err = session.identify().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedApp);
    }

    #[test]
    fn test_announce_size() {
        let mut mock = MockTransport::new();
        mock.push_response(1, RSP_GET_NAMEVERSION, &identity_bytes(b"tk1 ", b"luks", 1));
        mock.push_response(2, RSP_SET_CHALLENGE, &[0x00]);
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        session.announce_size(9).unwrap();
        assert_eq!(session.state(), SessionState::SizeAnnounced);
        assert_eq!(session.challenge_size(), 9);

        let frames = link.get_ref().sent_frames();
        let announce = &frames[1];
        assert_eq!(announce.header.id, 2);
        assert_eq!(announce.header.length, LengthClass::Len32);
        assert_eq!(announce.code, CMD_SET_CHALLENGE);
        assert_eq!(&announce.data[..4], &[9, 0, 0, 0]);
        assert_eq!(announce.data.len(), 31);
        assert!(announce.data[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_announce_size_rejected() {
        let mut mock = MockTransport::new();
        mock.push_response(1, RSP_GET_NAMEVERSION, &identity_bytes(b"tk1 ", b"luks", 1));
        mock.push_response(2, RSP_SET_CHALLENGE, &[STATUS_BAD]);
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        let err = session.announce_size(9).unwrap_err();
        assert!(matches!(
            err,
            SessionError::DeviceRejectedSize {
                size: 9,
                status: Some(1)
            }
        ));
        assert_eq!(
            session.state(),
            SessionState::Failed(ErrorKind::DeviceRejectedSize)
        );
    }

    #[test]
    fn test_announce_size_missing_status() {
        let mut mock = MockTransport::new();
        mock.push_response(1, RSP_GET_NAMEVERSION, &identity_bytes(b"tk1 ", b"luks", 1));
        // LEN_1 response: code only, no status byte
        mock.push_frame(Frame::new(2, ENDPOINT_APP, RSP_SET_CHALLENGE, &[]).unwrap());
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        let err = session.announce_size(9).unwrap_err();
        assert!(matches!(
            err,
            SessionError::DeviceRejectedSize { status: None, .. }
        ));
    }

    #[test]
    fn test_announce_size_limits() {
        let mut mock = MockTransport::new();
        mock.push_response(1, RSP_GET_NAMEVERSION, &identity_bytes(b"tk1 ", b"luks", 1));
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        let err = session.announce_size(257).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidChallengeSize { size: 257, max: 256 }
        ));
        // Nothing beyond the identify request went out
        assert_eq!(link.get_ref().sent_frames().len(), 1);
    }

    #[test]
    fn test_load_challenge_failure_propagates() {
        let mut mock = MockTransport::new();
        mock.push_response(1, RSP_GET_NAMEVERSION, &identity_bytes(b"tk1 ", b"luks", 1));
        mock.push_response(2, RSP_SET_CHALLENGE, &[STATUS_OK]);
        mock.push_response(3, RSP_LOAD_CHALLENGE, &[STATUS_OK]);
        mock.push_response(0, RSP_LOAD_CHALLENGE, &[STATUS_BAD]);
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        session.announce_size(200).unwrap();
        let err = session.load_challenge(&[0x61; 200]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChallengeUploadFailed);
        assert_eq!(
            session.state(),
            SessionState::Failed(ErrorKind::ChallengeUploadFailed)
        );
    }

    #[test]
    fn test_load_challenge_must_match_announced() {
        let mut link = FrameLink::new(loaded_mock(b"abc"));
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        session.announce_size(3).unwrap();
        let err = session.load_challenge(b"abcd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidChallengeSize);
    }

    #[test]
    fn test_derive_zero_key() {
        let challenge = b"luks-challenge";
        let mut mock = loaded_mock(challenge);
        mock.push_response(0, RSP_DERIVE_KEY, &[0u8; 64]);
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        session.announce_size(challenge.len()).unwrap();
        session.load_challenge(challenge).unwrap();
        assert_eq!(session.uploaded(), challenge.len());
        assert_eq!(session.state(), SessionState::ChallengeLoaded);

        let key = session.derive().unwrap();
        assert_eq!(key, DerivedKey::from_bytes([0u8; 64]));
        assert_eq!(session.state(), SessionState::Derived);
        assert!(session.state().is_terminal());

        let frames = link.get_ref().sent_frames();
        let derive = frames.last().unwrap();
        assert_eq!(derive.header.id, 0);
        assert_eq!(derive.code, CMD_DERIVE_KEY);
        assert_eq!(derive.header.length, LengthClass::Len1);
    }

    #[test]
    fn test_derive_touch_timeout() {
        let challenge = b"luks-challenge";
        let mut link = FrameLink::new(loaded_mock(challenge));
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        session.announce_size(challenge.len()).unwrap();
        session.load_challenge(challenge).unwrap();

        let err = session.derive().unwrap_err();
        assert!(matches!(err, SessionError::TouchTimeout));
        assert_eq!(session.state(), SessionState::Failed(ErrorKind::TouchTimeout));
    }

    #[test]
    fn test_derive_incomplete() {
        let challenge = b"luks-challenge";
        let mut mock = loaded_mock(challenge);
        // LEN_32 response holds only 31 data bytes
        mock.push_response(0, RSP_DERIVE_KEY, &[0xaa; 31]);
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        session.announce_size(challenge.len()).unwrap();
        session.load_challenge(challenge).unwrap();

        let err = session.derive().unwrap_err();
        assert!(matches!(
            err,
            SessionError::DerivationIncomplete { actual: 31 }
        ));
    }

    #[test]
    fn test_device_error_on_derive() {
        let challenge = b"luks-challenge";
        let mut mock = loaded_mock(challenge);
        mock.push_nok(0);
        let mut link = FrameLink::new(mock);
        let mut session = DeriveSession::new(&mut link, any_app());

        session.identify().unwrap();
        session.announce_size(challenge.len()).unwrap();
        session.load_challenge(challenge).unwrap();

        let err = session.derive().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceReportedError);
    }

    #[test]
    fn test_steps_out_of_order() {
        let mut link = FrameLink::new(MockTransport::new());
        let mut session = DeriveSession::new(&mut link, any_app());

        let err = session.derive().unwrap_err();
        assert!(matches!(
            err,
            SessionError::OutOfOrder {
                step: Step::Derive,
                state: SessionState::Idle
            }
        ));
        // A rejected attempt does not consume the session
        assert_eq!(session.state(), SessionState::Idle);
        assert!(link.get_ref().written().is_empty());
    }

    #[test]
    fn test_failed_session_stays_failed() {
        let mut link = FrameLink::new(MockTransport::new());
        let mut session = DeriveSession::new(&mut link, any_app());

        let err = session.identify().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(session.state(), SessionState::Failed(ErrorKind::Timeout));

        let err = session.identify().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfOrder);
    }

    #[test]
    fn test_run_calls_touch_hook_before_derive() {
        let challenge = b"my-system-id";
        let mut mock = loaded_mock(challenge);
        mock.push_response(0, RSP_DERIVE_KEY, &[0x11; 64]);
        let mut link = FrameLink::new(mock);

        let mut prompted = false;
        let key = DeriveSession::new(&mut link, any_app())
            .run(challenge, || prompted = true)
            .unwrap();
        assert!(prompted);
        assert_eq!(key, DerivedKey::from_bytes([0x11; 64]));

        let codes: Vec<u8> = link.get_ref().sent_frames().iter().map(|f| f.code).collect();
        assert_eq!(
            codes,
            vec![CMD_GET_NAMEVERSION, CMD_SET_CHALLENGE, CMD_LOAD_CHALLENGE, CMD_DERIVE_KEY]
        );
    }
}
