//! Signing through a wallet on another device, reached over a relay session.
use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    address::TronAddress,
    chain::{MAINNET_RELAY_CHAIN, Network},
    config::RelayConfig,
    error::{Result, SwapError},
    gateway::{ChainGateway, SignedTransaction, UnsignedTransaction},
};

pub const NAMESPACE: &str = "tron";
pub const SIGN_TRANSACTION_METHOD: &str = "tron_signTransaction";
pub const SIGN_MESSAGE_METHOD: &str = "tron_signMessage";
pub const USER_DISCONNECTED_CODE: u32 = 6000;
const WAKE_PROMPT: &str = "Check your wallet to approve the request.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icons: Vec<String>,
}

/// Metadata a relay client is initialized with, next to the project id.
impl From<&RelayConfig> for AppMetadata {
    fn from(config: &RelayConfig) -> Self {
        Self {
            name: config.name.clone().unwrap_or_else(|| "TrcSwap".to_string()),
            description: "SunSwap TRON frontend".to_string(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "https://localhost".to_string()),
            icons: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMetadata {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// App scheme link, e.g. `tronlinkoutside://`
    #[serde(default)]
    pub native_link: Option<String>,
    #[serde(default)]
    pub universal_link: Option<String>,
}

impl PeerMetadata {
    pub fn deep_link(&self) -> Option<&str> {
        self.native_link
            .as_deref()
            .or(self.universal_link.as_deref())
            .filter(|link| !link.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySession {
    pub topic: String,
    /// `tron:<chain>:<address>` entries
    pub accounts: Vec<String>,
    pub peer: PeerMetadata,
}

impl RelaySession {
    pub fn address(&self) -> Option<TronAddress> {
        self.accounts.first().and_then(|account| parse_account(account))
    }

    pub fn chain_id(&self) -> String {
        self.accounts
            .first()
            .and_then(|account| account.rsplit_once(':'))
            .map(|(chain, _)| chain.to_string())
            .unwrap_or_else(|| MAINNET_RELAY_CHAIN.to_string())
    }

    pub fn network(&self) -> Network {
        self.accounts
            .first()
            .map(|account| Network::from_relay_account(account))
            .unwrap_or(Network::Mainnet)
    }
}

/// Address part of a `tron:<chain>:<address>` account.
pub fn parse_account(account: &str) -> Option<TronAddress> {
    account.split(':').nth(2)?.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProposal {
    pub namespace: String,
    pub methods: Vec<String>,
    pub chains: Vec<String>,
    pub events: Vec<String>,
    pub method_version: String,
}

impl SessionProposal {
    pub fn tron(chain_id: &str) -> Self {
        Self {
            namespace: NAMESPACE.to_string(),
            methods: vec![
                SIGN_TRANSACTION_METHOD.to_string(),
                SIGN_MESSAGE_METHOD.to_string(),
            ],
            chains: vec![chain_id.to_string()],
            events: vec!["accountsChanged".to_string(), "chainChanged".to_string()],
            method_version: "v1".to_string(),
        }
    }
}

/// A proposal the relay accepted; the wallet still has to approve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConnection {
    pub id: u64,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayRequest {
    pub topic: String,
    pub chain_id: String,
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisconnectReason {
    pub code: u32,
    pub message: String,
}

impl DisconnectReason {
    pub fn user_disconnected() -> Self {
        Self {
            code: USER_DISCONNECTED_CODE,
            message: "User disconnected".to_string(),
        }
    }
}

/// Persistent client for the relay protocol. Implementations own the
/// session store; callers always go back to it for the current session.
#[async_trait]
pub trait RelayClient: Send + Sync {
    fn sessions(&self) -> Vec<RelaySession>;

    async fn connect(&self, proposal: &SessionProposal) -> Result<PendingConnection>;

    async fn await_approval(&self, pending: PendingConnection) -> Result<RelaySession>;

    /// Queues a request on the session. Returns once it has been published.
    async fn send_request(&self, request: RelayRequest) -> Result<RequestId>;

    async fn await_response(&self, id: RequestId) -> Result<Value>;

    async fn disconnect(&self, topic: &str, reason: DisconnectReason) -> Result<()>;
}

/// Connection UI shown while pairing or signing.
#[async_trait]
pub trait WalletModal: Send + Sync {
    async fn open(&self, uri: &str) -> Result<()>;

    fn close(&self);

    /// Returns false if the platform could not open the link.
    fn open_deep_link(&self, link: &str) -> bool;

    fn show_prompt(&self, message: &str);
}

/// Pulls the signatures out of a signing response. Wallets answer with the
/// signed transaction (`signature` at the root or under `transaction`) or
/// with the bare signature array.
pub fn extract_signatures(response: &Value) -> Result<Vec<String>> {
    let array = match response {
        Value::Array(items) => Some(items),
        Value::Object(map) => map
            .get("signature")
            .and_then(Value::as_array)
            .or_else(|| {
                map.get("transaction")
                    .and_then(|tx| tx.get("signature"))
                    .and_then(Value::as_array)
            }),
        _ => None,
    };

    let signatures: Vec<String> = array
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if signatures.is_empty() {
        return Err(SwapError::SignatureMissing);
    }
    Ok(signatures)
}

/// Attaches `signatures` to the transaction that was sent for signing. The
/// wallet's copy of the transaction is never broadcast.
pub fn rebuild_signed(original: &UnsignedTransaction, signatures: Vec<String>) -> SignedTransaction {
    let mut transaction = original.clone();
    if !transaction.ensure_raw_data_hex() {
        warn!(tx.id = %transaction.txid, "raw_data_hex missing and could not be rebuilt");
    }
    SignedTransaction {
        transaction,
        signature: signatures,
    }
}

#[derive(Clone)]
pub struct RemoteSigner {
    address: TronAddress,
    client: Arc<dyn RelayClient>,
    session: RelaySession,
    modal: Option<Arc<dyn WalletModal>>,
    timeout: Duration,
}

impl fmt::Debug for RemoteSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSigner")
            .field("address", &self.address)
            .field("session", &self.session.topic)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RemoteSigner {
    pub fn new(
        address: TronAddress,
        client: Arc<dyn RelayClient>,
        session: RelaySession,
        modal: Option<Arc<dyn WalletModal>>,
        timeout: Duration,
    ) -> Self {
        Self {
            address,
            client,
            session,
            modal,
            timeout,
        }
    }

    pub fn address(&self) -> &TronAddress {
        &self.address
    }

    /// The session as the client's store has it now. The handle captured at
    /// construction may have been replaced or deleted since.
    fn current_session(&self) -> Result<RelaySession> {
        let sessions = self.client.sessions();
        sessions
            .iter()
            .find(|s| s.topic == self.session.topic)
            // a newer session of the same wallet, never another account's
            .or_else(|| {
                sessions
                    .iter()
                    .find(|s| s.address() == Some(self.address))
            })
            .cloned()
            .ok_or(SwapError::NoActiveSession)
    }

    fn wake_wallet(&self, session: &RelaySession) {
        let Some(modal) = self.modal.as_deref() else {
            debug!("no modal available, relying on wallet push notification");
            return;
        };
        match session.peer.deep_link() {
            Some(link) if modal.open_deep_link(link) => {
                debug!(wallet = %session.peer.name, "opened wallet deep link");
            }
            _ => modal.show_prompt(WAKE_PROMPT),
        }
    }

    #[instrument(skip_all, fields(signer = "remote", tx.id = %tx.txid))]
    pub async fn sign_and_broadcast(
        &self,
        tx: UnsignedTransaction,
        gateway: &dyn ChainGateway,
    ) -> Result<String> {
        let session = self.current_session()?;
        let request = RelayRequest {
            topic: session.topic.clone(),
            chain_id: session.chain_id(),
            method: SIGN_TRANSACTION_METHOD.to_string(),
            params: json!({
                "address": self.address.to_base58(),
                "transaction": tx,
            }),
        };

        // the request must be published before the wallet comes to the
        // foreground, or the wallet finds nothing to approve
        let id = self.client.send_request(request).await?;
        self.wake_wallet(&session);

        let response = tokio::time::timeout(self.timeout, self.client.await_response(id))
            .await
            .map_err(|_| SwapError::SignTimeout(self.timeout))??;

        let signatures = extract_signatures(&response)?;
        let signed = rebuild_signed(&tx, signatures);
        let txid = gateway.broadcast(&signed).await?;
        info!(tx.id = %txid, session = %session.topic, "transaction broadcast after relay signature");
        Ok(txid)
    }
}

/// Owns the relay session lifecycle: restore, connect, disconnect.
pub struct RelayConnection {
    client: Arc<dyn RelayClient>,
    modal: Option<Arc<dyn WalletModal>>,
    session_tx: watch::Sender<Option<RelaySession>>,
}

impl RelayConnection {
    /// Picks up a session left in the client's store, if any.
    pub fn restore(client: Arc<dyn RelayClient>, modal: Option<Arc<dyn WalletModal>>) -> Self {
        let existing = client.sessions().into_iter().next();
        if let Some(session) = &existing {
            info!(session = %session.topic, "restored relay session");
        }
        let (session_tx, _) = watch::channel(existing);
        Self {
            client,
            modal,
            session_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RelaySession>> {
        self.session_tx.subscribe()
    }

    pub fn session(&self) -> Option<RelaySession> {
        self.session_tx.borrow().clone()
    }

    pub fn address(&self) -> Option<TronAddress> {
        self.session_tx.borrow().as_ref().and_then(RelaySession::address)
    }

    pub fn network(&self) -> Option<Network> {
        self.session_tx.borrow().as_ref().map(RelaySession::network)
    }

    #[instrument(skip(self))]
    pub async fn connect(&self, chain_id: &str) -> Result<RelaySession> {
        let pending = self.client.connect(&SessionProposal::tron(chain_id)).await?;
        if let (Some(uri), Some(modal)) = (pending.uri.as_deref(), self.modal.as_deref()) {
            modal.open(uri).await?;
        }

        let approved = self.client.await_approval(pending).await;
        if let Some(modal) = self.modal.as_deref() {
            modal.close();
        }
        let session = approved?;

        info!(
            session = %session.topic,
            address = ?session.address().map(|a| a.to_base58()),
            "relay session approved"
        );
        self.session_tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    pub async fn disconnect(&self) -> Result<()> {
        let Some(session) = self.session() else {
            return Ok(());
        };
        self.client
            .disconnect(&session.topic, DisconnectReason::user_disconnected())
            .await?;
        self.session_tx.send_replace(None);
        info!(session = %session.topic, "relay session disconnected");
        Ok(())
    }

    /// Drops the tracked session when the wallet deletes it remotely.
    pub fn on_session_deleted(&self, topic: &str) {
        self.session_tx.send_if_modified(|current| {
            if current.as_ref().is_some_and(|s| s.topic == topic) {
                *current = None;
                return true;
            }
            false
        });
    }

    pub fn signer(&self, timeout: Duration) -> Option<RemoteSigner> {
        let session = self.session()?;
        let address = session.address()?;
        Some(RemoteSigner::new(
            address,
            self.client.clone(),
            session,
            self.modal.clone(),
            timeout,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::gateway::testing::FakeGateway;

    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    type Log = Arc<Mutex<Vec<String>>>;

    fn session(topic: &str) -> RelaySession {
        RelaySession {
            topic: topic.to_string(),
            accounts: vec![format!("{MAINNET_RELAY_CHAIN}:{USDT}")],
            peer: PeerMetadata {
                name: "TronLink".into(),
                native_link: Some("tronlinkoutside://".into()),
                ..Default::default()
            },
        }
    }

    struct FakeRelay {
        log: Log,
        sessions: Mutex<Vec<RelaySession>>,
        response: Option<Value>,
        requests: Mutex<Vec<RelayRequest>>,
    }

    impl FakeRelay {
        fn new(log: Log, sessions: Vec<RelaySession>, response: Option<Value>) -> Self {
            Self {
                log,
                sessions: Mutex::new(sessions),
                response,
                requests: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl RelayClient for FakeRelay {
        fn sessions(&self) -> Vec<RelaySession> {
            self.sessions.lock().unwrap().clone()
        }

        async fn connect(&self, proposal: &SessionProposal) -> Result<PendingConnection> {
            self.log.lock().unwrap().push(format!("connect {}", proposal.chains[0]));
            Ok(PendingConnection {
                id: 1,
                uri: Some("wc:abc@2".into()),
            })
        }

        async fn await_approval(&self, _pending: PendingConnection) -> Result<RelaySession> {
            self.log.lock().unwrap().push("approved".into());
            let approved = session("fresh");
            self.sessions.lock().unwrap().push(approved.clone());
            Ok(approved)
        }

        async fn send_request(&self, request: RelayRequest) -> Result<RequestId> {
            self.log.lock().unwrap().push(format!("request {}", request.topic));
            self.requests.lock().unwrap().push(request);
            Ok(RequestId(7))
        }

        async fn await_response(&self, _id: RequestId) -> Result<Value> {
            match &self.response {
                Some(value) => Ok(value.clone()),
                None => futures::future::pending().await,
            }
        }

        async fn disconnect(&self, topic: &str, reason: DisconnectReason) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("disconnect {topic} {}", reason.code));
            self.sessions.lock().unwrap().retain(|s| s.topic != topic);
            Ok(())
        }
    }

    struct FakeModal {
        log: Log,
        deep_links_work: bool,
    }

    #[async_trait]
    impl WalletModal for FakeModal {
        async fn open(&self, uri: &str) -> Result<()> {
            self.log.lock().unwrap().push(format!("open {uri}"));
            Ok(())
        }

        fn close(&self) {
            self.log.lock().unwrap().push("close".into());
        }

        fn open_deep_link(&self, link: &str) -> bool {
            self.log.lock().unwrap().push(format!("deep link {link}"));
            self.deep_links_work
        }

        fn show_prompt(&self, message: &str) {
            self.log.lock().unwrap().push(format!("prompt {message}"));
        }
    }

    fn unsigned(with_hex: bool) -> UnsignedTransaction {
        let tx = UnsignedTransaction {
            txid: "tx-1".into(),
            raw_data: json!({ "expiration": 1 }),
            raw_data_hex: Some("0a02beef".into()),
            visible: Some(true),
            raw_bytes: None,
        }
        .with_raw_bytes();
        UnsignedTransaction {
            raw_data_hex: with_hex.then(|| "0a02beef".to_string()),
            ..tx
        }
    }

    #[test]
    fn test_three_response_shapes_agree() {
        let original = unsigned(true);
        let shapes = [
            json!({ "txID": "tx-1", "signature": ["sig-a"], "raw_data": { "tampered": true } }),
            json!({ "transaction": { "txID": "tx-1", "signature": ["sig-a"] } }),
            json!(["sig-a"]),
        ];
        let rebuilt: Vec<SignedTransaction> = shapes
            .iter()
            .map(|shape| rebuild_signed(&original, extract_signatures(shape).unwrap()))
            .collect();

        assert!(rebuilt.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(rebuilt[0].signature, vec!["sig-a".to_string()]);
        // the wallet's copy of raw_data is ignored
        assert_eq!(rebuilt[0].transaction.raw_data, original.raw_data);
    }

    #[test]
    fn test_missing_signatures() {
        for shape in [
            json!([]),
            json!({ "signature": [] }),
            json!({ "transaction": {} }),
            json!({ "result": "ok" }),
            json!("sig"),
            json!(null),
        ] {
            assert!(
                matches!(extract_signatures(&shape), Err(SwapError::SignatureMissing)),
                "{shape}"
            );
        }
    }

    #[test]
    fn test_rebuild_regenerates_raw_hex() {
        let signed = rebuild_signed(&unsigned(false), vec!["sig".into()]);
        assert_eq!(signed.transaction.raw_data_hex.as_deref(), Some("0a02beef"));

        // nothing to rebuild from, proceed without it
        let mut bare = unsigned(false);
        bare.raw_bytes = None;
        let signed = rebuild_signed(&bare, vec!["sig".into()]);
        assert!(signed.transaction.raw_data_hex.is_none());
    }

    #[test]
    fn test_app_metadata_defaults() {
        let metadata = AppMetadata::from(&RelayConfig {
            project_id: "pid".into(),
            name: None,
            url: None,
        });
        assert_eq!(metadata.name, "TrcSwap");
        assert_eq!(metadata.url, "https://localhost");
    }

    #[test]
    fn test_session_accessors() {
        let s = session("t");
        assert_eq!(s.address().map(|a| a.to_base58()).as_deref(), Some(USDT));
        assert_eq!(s.chain_id(), MAINNET_RELAY_CHAIN);
        assert_eq!(s.network(), Network::Mainnet);
        assert!(parse_account("tron:0x2b6653dc").is_none());
    }

    #[tokio::test]
    async fn test_request_precedes_wake_and_uses_current_session() {
        let log: Log = Default::default();
        let relay = Arc::new(FakeRelay::new(
            log.clone(),
            vec![session("current")],
            Some(json!({ "signature": ["sig-a"] })),
        ));
        let modal = Arc::new(FakeModal {
            log: log.clone(),
            deep_links_work: true,
        });
        // constructed with a stale handle
        let signer = RemoteSigner::new(
            USDT.parse().unwrap(),
            relay.clone(),
            session("stale"),
            Some(modal),
            Duration::from_secs(120),
        );
        let gateway = FakeGateway::new();

        let txid = signer.sign_and_broadcast(unsigned(true), &gateway).await.unwrap();

        assert_eq!(txid, "tx-1");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["request current".to_string(), "deep link tronlinkoutside://".to_string()]
        );
        let requests = relay.requests.lock().unwrap();
        assert_eq!(requests[0].method, SIGN_TRANSACTION_METHOD);
        assert_eq!(requests[0].chain_id, MAINNET_RELAY_CHAIN);
        assert_eq!(requests[0].params["transaction"]["txID"], "tx-1");

        let state = gateway.lock();
        assert_eq!(state.broadcasts[0].signature, vec!["sig-a".to_string()]);
    }

    #[tokio::test]
    async fn test_prompt_when_deep_link_fails() {
        let log: Log = Default::default();
        let relay = Arc::new(FakeRelay::new(
            log.clone(),
            vec![session("current")],
            Some(json!(["sig-a"])),
        ));
        let modal = Arc::new(FakeModal {
            log: log.clone(),
            deep_links_work: false,
        });
        let signer = RemoteSigner::new(
            USDT.parse().unwrap(),
            relay,
            session("current"),
            Some(modal),
            Duration::from_secs(120),
        );
        signer
            .sign_and_broadcast(unsigned(true), &FakeGateway::new())
            .await
            .unwrap();
        assert_eq!(log.lock().unwrap().last().unwrap(), &format!("prompt {WAKE_PROMPT}"));
    }

    #[tokio::test]
    async fn test_no_session_in_store() {
        let relay = Arc::new(FakeRelay::new(Default::default(), vec![], None));
        let signer = RemoteSigner::new(
            USDT.parse().unwrap(),
            relay,
            session("gone"),
            None,
            Duration::from_secs(120),
        );
        let err = signer
            .sign_and_broadcast(unsigned(true), &FakeGateway::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::NoActiveSession));
    }

    #[tokio::test]
    async fn test_session_of_other_account_is_not_used() {
        let log: Log = Default::default();
        let mut other = session("other");
        other.accounts = vec![format!("{MAINNET_RELAY_CHAIN}:TSSMHYeV2uE9qYH95DqyoCuNCzEL1NvU3S")];
        let relay = Arc::new(FakeRelay::new(
            log.clone(),
            vec![other],
            Some(json!(["sig-a"])),
        ));
        let signer = RemoteSigner::new(
            USDT.parse().unwrap(),
            relay.clone(),
            session("gone"),
            None,
            Duration::from_secs(120),
        );
        let gateway = FakeGateway::new();

        let err = signer
            .sign_and_broadcast(unsigned(true), &gateway)
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::NoActiveSession));
        assert!(relay.requests.lock().unwrap().is_empty());
        assert!(gateway.lock().broadcasts.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_broadcast_after_signature() {
        let relay = Arc::new(FakeRelay::new(
            Default::default(),
            vec![session("s")],
            Some(json!(["sig-a"])),
        ));
        let signer = RemoteSigner::new(
            USDT.parse().unwrap(),
            relay,
            session("s"),
            None,
            Duration::from_secs(120),
        );
        let gateway = FakeGateway::new().with(|state| {
            state.broadcast_error = Some(SwapError::BroadcastFailed("SIGERROR".into()));
        });

        let err = signer
            .sign_and_broadcast(unsigned(true), &gateway)
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::BroadcastFailed(ref m) if m == "SIGERROR"));
        assert!(gateway.lock().broadcasts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_sign_timeout() {
        let relay = Arc::new(FakeRelay::new(Default::default(), vec![session("s")], None));
        let signer = RemoteSigner::new(
            USDT.parse().unwrap(),
            relay,
            session("s"),
            None,
            Duration::from_secs(120),
        );
        let gateway = FakeGateway::new();
        let err = signer
            .sign_and_broadcast(unsigned(true), &gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::SignTimeout(d) if d == Duration::from_secs(120)));
        assert!(gateway.lock().broadcasts.is_empty());
    }

    #[tokio::test]
    async fn test_connection_lifecycle() {
        let log: Log = Default::default();
        let relay = Arc::new(FakeRelay::new(log.clone(), vec![], None));
        let modal = Arc::new(FakeModal {
            log: log.clone(),
            deep_links_work: true,
        });
        let connection = RelayConnection::restore(relay.clone(), Some(modal));
        assert!(connection.session().is_none());
        assert!(connection.signer(Duration::from_secs(120)).is_none());

        let session = connection.connect(MAINNET_RELAY_CHAIN).await.unwrap();
        assert_eq!(session.topic, "fresh");
        assert_eq!(connection.address().map(|a| a.to_base58()).as_deref(), Some(USDT));
        assert_eq!(connection.network(), Some(Network::Mainnet));
        assert!(connection.signer(Duration::from_secs(120)).is_some());

        connection.disconnect().await.unwrap();
        assert!(connection.session().is_none());
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                format!("connect {MAINNET_RELAY_CHAIN}"),
                "open wc:abc@2".to_string(),
                "approved".to_string(),
                "close".to_string(),
                "disconnect fresh 6000".to_string(),
            ]
        );
    }

    #[test]
    fn test_restore_and_remote_delete() {
        let relay = Arc::new(FakeRelay::new(Default::default(), vec![session("old")], None));
        let connection = RelayConnection::restore(relay, None);
        assert_eq!(connection.session().map(|s| s.topic).as_deref(), Some("old"));

        connection.on_session_deleted("other");
        assert!(connection.session().is_some());
        connection.on_session_deleted("old");
        assert!(connection.session().is_none());
    }
}
