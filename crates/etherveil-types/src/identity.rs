//! Signing identity and wallet connection state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, ChainId, SessionId};

/// The wallet providers a session can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Whatever EIP-1193 provider the browser injected.
    Injected,
    MetaMask,
    CoinbaseWallet,
    WalletConnect,
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Injected => write!(f, "Injected"),
            Self::MetaMask => write!(f, "MetaMask"),
            Self::CoinbaseWallet => write!(f, "Coinbase Wallet"),
            Self::WalletConnect => write!(f, "WalletConnect"),
        }
    }
}

/// What a connector hands back when the user approves a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectedAccount {
    pub address: Address,
    pub chain_id: ChainId,
}

/// The active signing identity. Exists only while the session is Connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Connected account.
    pub address: Address,
    /// Chain the account is connected on.
    pub chain_id: ChainId,
    /// Which provider produced this identity.
    pub connector: ConnectorKind,
    /// Unique per successful connect.
    pub session: SessionId,
    pub connected_at: DateTime<Utc>,
}

/// Connection state machine of a wallet session.
///
/// `Disconnected → Connecting → Connected → Disconnected`; a `Connecting`
/// attempt may also fall straight back to `Disconnected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting {
        connector: ConnectorKind,
        attempt: SessionId,
    },
    Connected(Identity),
}

impl SessionState {
    /// The identity, if connected.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Connected(identity) => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// Session id of the current identity, if connected.
    #[must_use]
    pub fn session(&self) -> Option<SessionId> {
        self.identity().map(|identity| identity.session)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connecting { connector, .. } => write!(f, "CONNECTING({connector})"),
            Self::Connected(identity) => write!(f, "CONNECTED({})", identity.address.short()),
        }
    }
}
