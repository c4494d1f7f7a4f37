//! Observable state of the [`ActorConnection`](super::ActorConnection).

use crate::backend::BackendClient;

/// Coarse lifecycle phase derived from a [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Idle,
    Initializing,
    Ready,
    Failed,
}

/// Snapshot published to every reader of the connection.
///
/// Invariants, upheld by the constructors below:
/// - `is_ready` implies `actor.is_some()`
/// - `init_error.is_some()` implies `!is_ready && !is_initializing`
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub actor: Option<BackendClient>,
    pub is_ready: bool,
    pub is_initializing: bool,
    pub is_retrying: bool,
    pub retry_count: u32,
    pub max_retries: u32,
    pub init_error: Option<String>,
    /// Initialization that produced this state. Bumped by every `initialize()`.
    pub generation: u64,
}

impl ConnectionState {
    pub fn idle(max_retries: u32) -> Self {
        Self {
            actor: None,
            is_ready: false,
            is_initializing: false,
            is_retrying: false,
            retry_count: 0,
            max_retries,
            init_error: None,
            generation: 0,
        }
    }

    pub fn initializing(generation: u64, max_retries: u32) -> Self {
        Self {
            is_initializing: true,
            generation,
            ..Self::idle(max_retries)
        }
    }

    pub fn ready(generation: u64, max_retries: u32, actor: BackendClient, retry_count: u32) -> Self {
        Self {
            actor: Some(actor),
            is_ready: true,
            retry_count,
            generation,
            ..Self::idle(max_retries)
        }
    }

    pub fn failed(generation: u64, max_retries: u32, retry_count: u32, message: impl Into<String>) -> Self {
        Self {
            retry_count,
            init_error: Some(message.into()),
            generation,
            ..Self::idle(max_retries)
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        if self.is_ready {
            ConnectionPhase::Ready
        } else if self.is_initializing {
            ConnectionPhase::Initializing
        } else if self.init_error.is_some() {
            ConnectionPhase::Failed
        } else {
            ConnectionPhase::Idle
        }
    }

    /// Still connecting: first attempt running or waiting to retry.
    pub fn is_connecting(&self) -> bool {
        self.is_initializing || self.is_retrying
    }

    /// The client, but only when it may be used.
    pub fn ready_actor(&self) -> Option<&BackendClient> {
        if self.is_ready && !self.is_initializing {
            self.actor.as_ref()
        } else {
            None
        }
    }

    pub fn upholds_invariants(&self) -> bool {
        let ready_has_actor = !self.is_ready || self.actor.is_some();
        let error_is_terminal =
            self.init_error.is_none() || (!self.is_ready && !self.is_initializing);
        ready_has_actor && error_is_terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn client() -> BackendClient {
        let (sender, _receiver) = mpsc::channel(1);
        BackendClient::new(sender)
    }

    #[test]
    fn test_phases() {
        assert_eq!(ConnectionState::idle(5).phase(), ConnectionPhase::Idle);
        assert_eq!(
            ConnectionState::initializing(1, 5).phase(),
            ConnectionPhase::Initializing
        );
        assert_eq!(
            ConnectionState::ready(1, 5, client(), 0).phase(),
            ConnectionPhase::Ready
        );
        assert_eq!(
            ConnectionState::failed(1, 5, 4, "down").phase(),
            ConnectionPhase::Failed
        );
    }

    #[test]
    fn test_constructors_uphold_invariants() {
        let states = [
            ConnectionState::idle(5),
            ConnectionState::initializing(2, 5),
            ConnectionState::ready(2, 5, client(), 3),
            ConnectionState::failed(2, 5, 4, "down"),
        ];
        for state in &states {
            assert!(state.upholds_invariants(), "{state:?}");
        }
        assert!(ConnectionState::failed(2, 5, 4, "down").ready_actor().is_none());
    }
}
