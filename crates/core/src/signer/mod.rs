use crate::{
    address::TronAddress,
    error::Result,
    gateway::{ChainGateway, UnsignedTransaction},
};

mod local;
mod remote;

pub use local::{InjectedWallet, LocalSigner, WalletBroadcast, WalletPresence, WalletSnapshot};
#[cfg(test)]
pub(crate) use local::MockInjectedWallet;
pub use remote::{
    AppMetadata, DisconnectReason, PeerMetadata, PendingConnection, RelayClient, RelayConnection,
    RelayRequest, RelaySession, RemoteSigner, RequestId, SessionProposal, WalletModal,
    extract_signatures, parse_account, rebuild_signed,
};

/// Whoever signs for the connected account.
#[derive(Debug, Clone)]
pub enum Signer {
    /// Injected wallet that signs and broadcasts on its own.
    Local(LocalSigner),
    /// Wallet reached over a relay session; broadcast goes through the gateway.
    Remote(RemoteSigner),
}

impl Signer {
    pub fn address(&self) -> &TronAddress {
        match self {
            Signer::Local(signer) => signer.address(),
            Signer::Remote(signer) => signer.address(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Signer::Local(_) => "local",
            Signer::Remote(_) => "remote",
        }
    }

    /// Gets `tx` signed and onto the chain, returning the transaction id.
    pub async fn sign_and_broadcast(
        &self,
        tx: UnsignedTransaction,
        gateway: &dyn ChainGateway,
    ) -> Result<String> {
        match self {
            Signer::Local(signer) => signer.sign_and_broadcast(tx).await,
            Signer::Remote(signer) => signer.sign_and_broadcast(tx, gateway).await,
        }
    }
}

/// An injected wallet with an account wins over a relay session.
pub fn select_signer(local: Option<LocalSigner>, remote: Option<RemoteSigner>) -> Option<Signer> {
    local
        .map(Signer::Local)
        .or_else(|| remote.map(Signer::Remote))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    #[test]
    fn test_local_preferred() {
        let local = LocalSigner::new(
            USDT.parse().unwrap(),
            Arc::new(MockInjectedWallet::new()),
            Duration::from_secs(60),
        );
        let signer = select_signer(Some(local), None).unwrap();
        assert_eq!(signer.kind(), "local");
        assert_eq!(signer.address().to_base58(), USDT);
        assert!(select_signer(None, None).is_none());
    }
}
