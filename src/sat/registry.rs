use super::{EngineConfig, Result, SatError, Session, SessionState};
use log::debug;
use std::{collections::BTreeMap, fmt::Display, num::NonZeroU64};

/// An opaque token identifying a session of an [`EngineRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(NonZeroU64);

impl Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registry owning sessions, identified by handles.
///
/// Handles are issued from a counter and never reused,
/// so that a destroyed handle can always be told apart from a live one.
///
/// ```
/// # use satbridge::sat::{EngineConfig, EngineRegistry, SessionState};
/// let mut registry = EngineRegistry::default();
/// let handle = registry.create(EngineConfig::default()).unwrap();
/// assert_eq!(SessionState::Fresh, registry.state(handle).unwrap());
/// registry.destroy(handle).unwrap();
/// assert_eq!(SessionState::Destroyed, registry.state(handle).unwrap());
/// assert!(registry.destroy(handle).unwrap_err().is_invalid_usage());
/// ```
#[derive(Default)]
pub struct EngineRegistry {
    sessions: BTreeMap<Handle, Session>,
    last_handle: u64,
}

impl EngineRegistry {
    /// Builds a new session and returns its handle.
    pub fn create(&mut self, config: EngineConfig) -> Result<Handle> {
        let session = Session::new(config)?;
        let id = self.last_handle.checked_add(1).ok_or_else(|| {
            SatError::ResourceExhausted("no more handles are available".to_string())
        })?;
        let handle = NonZeroU64::new(id)
            .map(Handle)
            .ok_or_else(|| SatError::ResourceExhausted("invalid handle".to_string()))?;
        self.last_handle = id;
        debug!("session {} created", handle);
        self.sessions.insert(handle, session);
        Ok(handle)
    }

    /// Destroys a session, releasing its engine.
    pub fn destroy(&mut self, handle: Handle) -> Result<()> {
        self.sessions
            .remove(&handle)
            .map(|_| debug!("session {} destroyed", handle))
            .ok_or_else(|| self.dead_handle_error(handle))
    }

    /// Returns the state of a session, [`Destroyed`](SessionState::Destroyed) for destroyed ones.
    pub fn state(&self, handle: Handle) -> Result<SessionState> {
        match self.sessions.get(&handle) {
            Some(s) => Ok(s.state()),
            None if handle.0.get() <= self.last_handle => Ok(SessionState::Destroyed),
            None => Err(self.dead_handle_error(handle)),
        }
    }

    /// Returns the session of a handle.
    pub fn session(&self, handle: Handle) -> Result<&Session> {
        self.sessions
            .get(&handle)
            .ok_or_else(|| self.dead_handle_error(handle))
    }

    /// Returns the session of a handle, for operations that modify it.
    pub fn session_mut(&mut self, handle: Handle) -> Result<&mut Session> {
        let err = self.dead_handle_error(handle);
        self.sessions.get_mut(&handle).ok_or(err)
    }

    /// Returns the handles of the live sessions.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.sessions.keys().copied()
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` iff no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn dead_handle_error(&self, handle: Handle) -> SatError {
        if handle.0.get() <= self.last_handle {
            SatError::invalid_usage(format!("session {} was destroyed", handle))
        } else {
            SatError::invalid_usage(format!("unknown session {}", handle))
        }
    }
}
