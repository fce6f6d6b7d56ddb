//! Gateway Session Integration Tests
//!
//! Drives the full client against an in-process WebSocket gateway: login,
//! subscription replay across reconnects, shared subscriptions over several
//! connections, duplicate login, malformed frames and logout.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use prost::Message as _;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use openfeed_client::domain::envelope::{
    GatewayMessage, HeartBeat, LoginResponse, LogoutResponse, ResultCode, Status,
    SubscriptionResponse, SubscriptionTarget, gateway_message, gateway_request,
};
use openfeed_client::{
    ClientConfig, ConnectionId, ConnectionPolicy, ConnectionSettings, ConnectionState, Credentials,
    Endpoint, FeedHandler, LivenessConfig, LogPolicy, OpenfeedClient, ReconnectConfig,
    ReferenceRequests, Service, SessionFailure, SubscriptionRequest, SubscriptionState,
    SubscriptionType, WireProtocol,
};

const WAIT: Duration = Duration::from_secs(5);

// =============================================================================
// In-process gateway
// =============================================================================

enum Outbound {
    Reply(gateway_message::Data),
    Raw(Message),
    Drop,
}

#[derive(Clone)]
struct SessionControl {
    session: usize,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl SessionControl {
    fn reply(&self, data: gateway_message::Data) {
        self.outbound.send(Outbound::Reply(data)).unwrap();
    }

    fn raw(&self, message: Message) {
        self.outbound.send(Outbound::Raw(message)).unwrap();
    }

    fn drop_connection(&self) {
        self.outbound.send(Outbound::Drop).unwrap();
    }
}

enum GatewayEvent {
    Connected(SessionControl),
    Request(usize, gateway_request::Data),
}

struct Gateway {
    port: u16,
    events: mpsc::UnboundedReceiver<GatewayEvent>,
}

impl Gateway {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (event_tx, events) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut session = 0;
            while let Ok((stream, _)) = listener.accept().await {
                session += 1;
                tokio::spawn(serve_session(session, stream, event_tx.clone()));
            }
        });

        Self { port, events }
    }

    async fn next_event(&mut self) -> GatewayEvent {
        timeout(WAIT, self.events.recv())
            .await
            .expect("gateway event timed out")
            .expect("gateway stopped")
    }

    async fn expect_connected(&mut self) -> SessionControl {
        match self.next_event().await {
            GatewayEvent::Connected(control) => control,
            GatewayEvent::Request(_, data) => panic!("expected a connection, got {data:?}"),
        }
    }

    async fn expect_request(&mut self) -> (usize, gateway_request::Data) {
        match self.next_event().await {
            GatewayEvent::Request(session, data) => (session, data),
            GatewayEvent::Connected(_) => panic!("expected a request, got a connection"),
        }
    }

    async fn expect_login(&mut self) -> SessionControl {
        let control = self.expect_connected().await;
        let (_, request) = self.expect_request().await;
        assert!(matches!(request, gateway_request::Data::LoginRequest(_)));
        control
    }

    async fn expect_subscription(
        &mut self,
    ) -> openfeed_client::domain::envelope::SubscriptionRequest {
        match self.expect_request().await {
            (_, gateway_request::Data::SubscriptionRequest(request)) => request,
            (_, other) => panic!("expected a subscription request, got {other:?}"),
        }
    }

    /// Requests received within `window`, failing on new connections.
    async fn quiet_for(&mut self, window: Duration) -> Vec<gateway_request::Data> {
        let mut requests = Vec::new();
        while let Ok(Some(event)) = timeout(window, self.events.recv()).await {
            match event {
                GatewayEvent::Request(_, data) => requests.push(data),
                GatewayEvent::Connected(_) => panic!("unexpected reconnect"),
            }
        }
        requests
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.port, "/ws")
    }
}

async fn serve_session(
    session: usize,
    stream: tokio::net::TcpStream,
    events: mpsc::UnboundedSender<GatewayEvent>,
) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (outbound_tx, mut outbound) = mpsc::unbounded_channel();
    let _ = events.send(GatewayEvent::Connected(SessionControl {
        session,
        outbound: outbound_tx,
    }));

    let mut json = false;
    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Reply(data)) => {
                    if ws.send(encode(data, json)).await.is_err() {
                        return;
                    }
                }
                Some(Outbound::Raw(message)) => {
                    if ws.send(message).await.is_err() {
                        return;
                    }
                }
                Some(Outbound::Drop) | None => return,
            },
            message = ws.next() => {
                let data = match message {
                    Some(Ok(Message::Binary(bytes))) => {
                        let request =
                            openfeed_client::GatewayRequest::decode(bytes.as_ref()).unwrap();
                        request.data.unwrap()
                    }
                    Some(Ok(Message::Text(text))) => {
                        json = true;
                        serde_json::from_str::<gateway_request::Data>(text.as_str()).unwrap()
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => return,
                };

                if let Some(reply) = auto_reply(session, &data)
                    && ws.send(encode(reply, json)).await.is_err()
                {
                    return;
                }
                let _ = events.send(GatewayEvent::Request(session, data));
            }
        }
    }
}

fn auto_reply(session: usize, request: &gateway_request::Data) -> Option<gateway_message::Data> {
    match request {
        gateway_request::Data::LoginRequest(login) => {
            Some(gateway_message::Data::LoginResponse(LoginResponse {
                correlation_id: login.correlation_id,
                status: Some(Status::new(ResultCode::Success, "")),
                token: format!("token-{session}"),
            }))
        }
        gateway_request::Data::SubscriptionRequest(request) => {
            Some(gateway_message::Data::SubscriptionResponse(SubscriptionResponse {
                correlation_id: request.correlation_id,
                status: Some(Status::new(ResultCode::Success, "")),
                unsubscribe: request.unsubscribe,
                target: request.target.clone(),
            }))
        }
        _ => None,
    }
}

fn encode(data: gateway_message::Data, json: bool) -> Message {
    if json {
        Message::Text(serde_json::to_string(&data).unwrap().into())
    } else {
        Message::Binary(GatewayMessage::new(data).encode_to_vec().into())
    }
}

// =============================================================================
// Client fixtures
// =============================================================================

#[derive(Default)]
struct RecordingHandler {
    heartbeats: AtomicUsize,
    failures: Mutex<Vec<SessionFailure>>,
}

impl FeedHandler for RecordingHandler {
    fn on_heartbeat(&self, _connection: ConnectionId, _message: &HeartBeat) {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
    }

    fn on_failure(&self, _connection: ConnectionId, failure: &SessionFailure) {
        self.failures.lock().push(failure.clone());
    }
}

fn client_config(
    gateway: &Gateway,
    subscriptions: Vec<SubscriptionRequest>,
    disable_on_duplicate_login: bool,
) -> ClientConfig {
    ClientConfig {
        client_id: "integration".to_string(),
        connection: ConnectionSettings {
            endpoint: gateway.endpoint(),
            credentials: Credentials::new("user", "pass").unwrap(),
            service: Service::RealTime,
            policy: ConnectionPolicy {
                reconnect: true,
                backoff: ReconnectConfig::fixed(Duration::from_millis(50)),
                disable_on_duplicate_login,
            },
            liveness: LivenessConfig::disabled(),
            stats_interval: None,
            references: ReferenceRequests::default(),
            log_tokens: false,
        },
        protocol: WireProtocol::Pb,
        log_policy: LogPolicy::default(),
        number_of_connections: 1,
        share_subscriptions: false,
        subscriptions,
    }
}

fn aapl_bbo() -> SubscriptionRequest {
    SubscriptionRequest::symbol("AAPL", [SubscriptionType::Quote])
}

async fn wait_for_state(client: &OpenfeedClient, state: ConnectionState) {
    let mut receiver = client.state_receiver(0).unwrap();
    timeout(WAIT, receiver.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("connection never reached {state}"))
        .unwrap();
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

async fn stop(mut client: OpenfeedClient) {
    client.shutdown();
    timeout(WAIT, client.join()).await.unwrap();
    let states = client.states();
    assert!(!states.is_empty());
    assert!(states.iter().all(|s| *s == ConnectionState::Closed), "{states:?}");
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn aapl_bbo_is_subscribed_once_and_acked() {
    let mut gateway = Gateway::start().await;
    let mut client = OpenfeedClient::new(
        client_config(&gateway, vec![aapl_bbo()], true),
        Arc::new(RecordingHandler::default()),
        None,
    );
    client.start();

    gateway.expect_login().await;
    let request = gateway.expect_subscription().await;
    assert_eq!(request.target, Some(SubscriptionTarget::Symbol("AAPL".to_string())));
    assert_eq!(request.subscription_type, vec![i32::from(SubscriptionType::Quote)]);
    assert_eq!(request.token, "token-1");
    assert!(!request.unsubscribe);

    let id = client.subscriptions().snapshot()[0].id;
    eventually(|| client.subscriptions().state(id) == Some(SubscriptionState::Acked)).await;
    assert!(gateway.quiet_for(Duration::from_millis(200)).await.is_empty());

    stop(client).await;
}

#[tokio::test]
async fn acked_subscriptions_are_replayed_once_after_disconnect() {
    let mut gateway = Gateway::start().await;
    let mut client = OpenfeedClient::new(
        client_config(
            &gateway,
            vec![
                aapl_bbo(),
                SubscriptionRequest::symbol("MSFT", [SubscriptionType::Trades]),
            ],
            true,
        ),
        Arc::new(RecordingHandler::default()),
        None,
    );
    client.start();

    let first = gateway.expect_login().await;
    let initial = [
        gateway.expect_subscription().await.correlation_id,
        gateway.expect_subscription().await.correlation_id,
    ];
    eventually(|| client.subscriptions().stats().acked == 2).await;

    first.drop_connection();
    let second = gateway.expect_login().await;
    assert_eq!(second.session, 2);

    let replayed = [
        gateway.expect_subscription().await,
        gateway.expect_subscription().await,
    ];
    assert_eq!(
        [replayed[0].correlation_id, replayed[1].correlation_id],
        initial
    );
    assert!(replayed.iter().all(|r| r.token == "token-2"));

    eventually(|| client.subscriptions().stats().acked == 2).await;
    assert!(gateway.quiet_for(Duration::from_millis(200)).await.is_empty());

    stop(client).await;
}

#[tokio::test]
async fn duplicate_login_with_policy_closes_for_good() {
    let mut gateway = Gateway::start().await;
    let handler = Arc::new(RecordingHandler::default());
    let mut client = OpenfeedClient::new(
        client_config(&gateway, vec![], true),
        Arc::clone(&handler) as Arc<dyn FeedHandler>,
        None,
    );
    client.start();

    let session = gateway.expect_login().await;
    wait_for_state(&client, ConnectionState::Ready).await;
    session.reply(gateway_message::Data::LogoutResponse(LogoutResponse {
        correlation_id: 0,
        status: Some(Status::new(ResultCode::DuplicateLogin, "logged in elsewhere")),
    }));

    wait_for_state(&client, ConnectionState::Closed).await;
    timeout(WAIT, client.join()).await.unwrap();
    assert!(gateway.quiet_for(Duration::from_millis(200)).await.is_empty());

    let failures = handler.failures.lock();
    assert!(matches!(
        failures.as_slice(),
        [SessionFailure::FatalAuth { result: ResultCode::DuplicateLogin, .. }]
    ));
}

#[tokio::test]
async fn duplicate_login_without_policy_reconnects() {
    let mut gateway = Gateway::start().await;
    let handler = Arc::new(RecordingHandler::default());
    let mut client = OpenfeedClient::new(
        client_config(&gateway, vec![aapl_bbo()], false),
        Arc::clone(&handler) as Arc<dyn FeedHandler>,
        None,
    );
    client.start();

    let session = gateway.expect_login().await;
    gateway.expect_subscription().await;
    wait_for_state(&client, ConnectionState::Ready).await;

    let mut states = client.state_receiver(0).unwrap();
    session.reply(gateway_message::Data::LogoutResponse(LogoutResponse {
        correlation_id: 0,
        status: Some(Status::new(ResultCode::DuplicateLogin, "logged in elsewhere")),
    }));
    timeout(WAIT, states.wait_for(|s| *s == ConnectionState::Reconnecting))
        .await
        .unwrap()
        .unwrap();

    gateway.expect_login().await;
    gateway.expect_subscription().await;
    assert!(matches!(
        handler.failures.lock().as_slice(),
        [SessionFailure::Auth { result: ResultCode::DuplicateLogin, .. }]
    ));

    stop(client).await;
}

#[tokio::test]
async fn malformed_frames_are_dropped() {
    let mut gateway = Gateway::start().await;
    let handler = Arc::new(RecordingHandler::default());
    let mut client = OpenfeedClient::new(
        client_config(&gateway, vec![], true),
        Arc::clone(&handler) as Arc<dyn FeedHandler>,
        None,
    );
    client.start();

    let session = gateway.expect_login().await;
    wait_for_state(&client, ConnectionState::Ready).await;

    session.raw(Message::Binary(vec![0x0a, 0xff, 0xff].into()));
    session.raw(Message::Text("{not json".into()));
    session.reply(gateway_message::Data::HeartBeat(HeartBeat {
        transaction_time: 1,
        ..Default::default()
    }));

    eventually(|| handler.heartbeats.load(Ordering::SeqCst) == 1).await;
    assert_eq!(client.states(), vec![ConnectionState::Ready]);
    assert!(handler.failures.lock().is_empty());

    stop(client).await;
}

#[tokio::test]
async fn repeated_subscribe_while_ready_sends_once() {
    let mut gateway = Gateway::start().await;
    let mut client = OpenfeedClient::new(
        client_config(&gateway, vec![], true),
        Arc::new(RecordingHandler::default()),
        None,
    );
    client.start();

    gateway.expect_login().await;
    wait_for_state(&client, ConnectionState::Ready).await;

    let id = client.subscribe(aapl_bbo()).unwrap();
    assert_eq!(client.subscribe(aapl_bbo()).unwrap(), id);

    let request = gateway.expect_subscription().await;
    assert_eq!(request.correlation_id, i64::try_from(id).unwrap());
    eventually(|| client.subscriptions().state(id) == Some(SubscriptionState::Acked)).await;
    assert_eq!(client.subscribe(aapl_bbo()).unwrap(), id);
    assert!(gateway.quiet_for(Duration::from_millis(200)).await.is_empty());

    client.unsubscribe(id).unwrap();
    let request = gateway.expect_subscription().await;
    assert!(request.unsubscribe);
    assert_eq!(request.token, "token-1");

    stop(client).await;
}

#[tokio::test]
async fn logout_closes_the_connection() {
    let mut gateway = Gateway::start().await;
    let mut client = OpenfeedClient::new(
        client_config(&gateway, vec![], true),
        Arc::new(RecordingHandler::default()),
        None,
    );
    client.start();

    let session = gateway.expect_login().await;
    wait_for_state(&client, ConnectionState::Ready).await;

    client.logout();
    let (_, request) = gateway.expect_request().await;
    let gateway_request::Data::LogoutRequest(logout) = request else {
        panic!("expected a logout request");
    };
    assert_eq!(logout.token, "token-1");
    session.reply(gateway_message::Data::LogoutResponse(LogoutResponse {
        correlation_id: logout.correlation_id,
        status: Some(Status::new(ResultCode::Success, "")),
    }));

    wait_for_state(&client, ConnectionState::Closed).await;
    timeout(WAIT, client.join()).await.unwrap();
}

#[tokio::test]
async fn json_protocol_round_trip() {
    let mut gateway = Gateway::start().await;
    let mut config = client_config(&gateway, vec![aapl_bbo()], true);
    config.protocol = WireProtocol::Json;
    let mut client = OpenfeedClient::new(config, Arc::new(RecordingHandler::default()), None);
    client.start();

    gateway.expect_login().await;
    let request = gateway.expect_subscription().await;
    assert_eq!(request.token, "token-1");

    let id = client.subscriptions().snapshot()[0].id;
    eventually(|| client.subscriptions().state(id) == Some(SubscriptionState::Acked)).await;

    stop(client).await;
}

#[tokio::test]
async fn shared_subscriptions_are_sent_once_across_connections() {
    let mut gateway = Gateway::start().await;
    let mut config = client_config(
        &gateway,
        vec![
            aapl_bbo(),
            SubscriptionRequest::symbol("MSFT", [SubscriptionType::Trades]),
        ],
        true,
    );
    config.number_of_connections = 2;
    config.share_subscriptions = true;
    let mut client = OpenfeedClient::new(config, Arc::new(RecordingHandler::default()), None);
    client.start();

    let mut logins = 0;
    let mut senders: HashMap<i64, usize> = HashMap::new();
    while logins < 2 || senders.len() < 2 {
        match gateway.next_event().await {
            GatewayEvent::Connected(_) => {}
            GatewayEvent::Request(_, gateway_request::Data::LoginRequest(_)) => logins += 1,
            GatewayEvent::Request(session, gateway_request::Data::SubscriptionRequest(request)) => {
                assert!(!request.unsubscribe);
                assert_eq!(request.token, format!("token-{session}"));
                let previous = senders.insert(request.correlation_id, session);
                assert!(previous.is_none(), "sent twice: {request:?}");
            }
            GatewayEvent::Request(_, other) => panic!("unexpected request {other:?}"),
        }
    }

    eventually(|| client.subscriptions().stats().acked == 2).await;
    assert!(gateway.quiet_for(Duration::from_millis(200)).await.is_empty());

    let id = client.subscriptions().snapshot()[0].id;
    let owner = senders[&i64::try_from(id).unwrap()];
    client.unsubscribe(id).unwrap();

    let (session, request) = gateway.expect_request().await;
    let gateway_request::Data::SubscriptionRequest(request) = request else {
        panic!("expected an unsubscribe request");
    };
    assert!(request.unsubscribe);
    assert_eq!(session, owner);
    assert_eq!(request.token, format!("token-{owner}"));
    assert!(gateway.quiet_for(Duration::from_millis(200)).await.is_empty());

    stop(client).await;
}
