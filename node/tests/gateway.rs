use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use ledgerway_node::{Gateway, GatewayConfig, GatewayError, NetworkConfig, ShutdownController};
use ledgerway_nullables::{NullEventSource, NullLedger};
use ledgerway_types::ConnectionStatus;
use serde_json::{json, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TOPOLOGY: &str = r#"
    [organizations.org1]
    name = "peerOrg1"
    mspid = "Org1MSP"

    [organizations.org1.peers.peer1]
    requests = "grpcs://localhost:7051"
    events = "ws://localhost:7053"

    [organizations.org2]
    name = "peerOrg2"
    mspid = "Org2MSP"

    [organizations.org2.peers.peer1]
    requests = "grpcs://localhost:8051"
    events = "ws://localhost:8053"
"#;

fn config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.host = "127.0.0.1".into();
    config.port = 0;
    config.enable_metrics = true;
    config.metrics_port = 0;
    config.auth.secret = "thisismysecret".into();
    config
}

async fn next_json<S>(stream: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("frame error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn serves_api_and_relays_events_end_to_end() {
    let network = NetworkConfig::from_toml_str(TOPOLOGY).unwrap();
    let ledger = Arc::new(NullLedger::new());
    let source = Arc::new(NullEventSource::new());
    let shutdown = ShutdownController::new();

    let running = Gateway::new(config(), network, ledger.clone(), source.clone())
        .unwrap()
        .start(&shutdown)
        .await
        .unwrap();
    let base = format!("http://{}", running.local_addr());

    assert_eq!(source.subscription_count("org1"), 1);
    assert_eq!(source.subscription_count("org2"), 1);
    assert_eq!(source.endpoints("org1"), vec!["ws://localhost:7053".to_string()]);

    let http = reqwest::Client::new();
    let identity: Value = http
        .post(format!("{base}/identity"))
        .json(&json!({ "username": "alice", "orgName": "org1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(identity["success"], json!(true));
    let token = identity["token"].as_str().unwrap().to_string();

    let channels = http
        .get(format!("{base}/channels?peer=peer1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(channels.status(), 200);
    let channels: Value = channels.json().await.unwrap();
    assert_eq!(
        channels,
        json!({ "success": true, "result": { "operation": "list_channels" } })
    );

    let unauthenticated = http.get(format!("{base}/channels?peer=peer1")).send().await.unwrap();
    assert_eq!(unauthenticated.status(), 401);

    let ws_url = format!("ws://{}/events?access_token={token}", running.local_addr());
    let (mut client, _) = connect_async(ws_url).await.unwrap();
    assert_eq!(
        next_json(&mut client).await,
        json!({ "type": "status", "data": "disconnected" })
    );

    source.emit_status("org1", ConnectionStatus::Connected).await;
    source.emit_block("org2", json!({ "number": 99 })).await;
    source.emit_block("org1", json!({ "number": 5 })).await;
    assert_eq!(
        next_json(&mut client).await,
        json!({ "type": "status", "data": "connected" })
    );
    assert_eq!(
        next_json(&mut client).await,
        json!({ "type": "chainblock", "data": { "number": 5 } })
    );

    let metrics_addr = running.metrics_addr().unwrap();
    let scrape = http
        .get(format!("http://{metrics_addr}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(scrape.contains("ledgerway_ledger_requests_total{operation=\"list_channels\"} 1"));
    assert!(scrape.contains("ledgerway_blocks_relayed{org=\"org1\"} 1"));

    client.close(None).await.unwrap();
    shutdown.shutdown();
    tokio::time::timeout(Duration::from_secs(10), running.wait())
        .await
        .expect("gateway did not stop")
        .unwrap();
    assert_eq!(ledger.call_count(), 1);
}

#[tokio::test]
async fn websocket_without_token_is_refused() {
    let network = NetworkConfig::from_toml_str(TOPOLOGY).unwrap();
    let shutdown = ShutdownController::new();
    let running = Gateway::new(
        config(),
        network,
        Arc::new(NullLedger::new()),
        Arc::new(NullEventSource::new()),
    )
    .unwrap()
    .start(&shutdown)
    .await
    .unwrap();

    let url = format!("ws://{}/events", running.local_addr());
    assert!(connect_async(url).await.is_err());
    assert_eq!(running.relays().total_clients(), 0);

    shutdown.shutdown();
    running.wait().await.unwrap();
}

#[test]
fn gateway_requires_a_signing_secret() {
    let mut config = config();
    config.auth.secret.clear();
    let result = Gateway::new(
        config,
        NetworkConfig::default(),
        Arc::new(NullLedger::new()),
        Arc::new(NullEventSource::new()),
    );
    assert!(matches!(result, Err(GatewayError::Config(_))));
}

#[tokio::test]
async fn gateway_started_after_shutdown_stops_at_once() {
    let network = NetworkConfig::from_toml_str(TOPOLOGY).unwrap();
    let shutdown = ShutdownController::new();
    shutdown.shutdown();

    let running = Gateway::new(
        config(),
        network,
        Arc::new(NullLedger::new()),
        Arc::new(NullEventSource::new()),
    )
    .unwrap()
    .start(&shutdown)
    .await
    .unwrap();

    tokio::time::timeout(Duration::from_secs(10), running.wait())
        .await
        .expect("relays and servers should observe the earlier shutdown")
        .unwrap();
}
