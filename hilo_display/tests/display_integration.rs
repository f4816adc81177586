//! Display client against a real host on a loopback port.

use hilo::{Card, Command, RoundState, Side, Stage, round::Suit};
use hilo_display::{DisplayClient, DisplayConfig, ReconnectPolicy, StatusClient};
use hilo_host::{HostConfig, HostServer};
use std::{net::SocketAddr, time::Duration};
use tokio::{sync::watch, time::timeout};

const WAIT: Duration = Duration::from_secs(3);

fn scenario_hand() -> [Card; 5] {
    [
        Card(7, Suit::Spade),
        Card(13, Suit::Diamond),
        Card(2, Suit::Club),
        Card(9, Suit::Heart),
        Card(14, Suit::Spade),
    ]
}

async fn start_host_at(bind: SocketAddr) -> HostServer {
    let config = HostConfig {
        bind,
        ..HostConfig::default()
    };
    HostServer::start_with_dealer(config, scenario_hand)
        .await
        .unwrap()
}

async fn start_host() -> HostServer {
    start_host_at("127.0.0.1:0".parse().unwrap()).await
}

fn display_config(addr: SocketAddr, reconnect: ReconnectPolicy) -> DisplayConfig {
    DisplayConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        table_id: 1,
        device_id: "test-display".to_string(),
        reconnect,
    }
}

async fn wait_for_state(
    states: &mut watch::Receiver<Option<RoundState>>,
    predicate: impl Fn(&RoundState) -> bool,
) -> RoundState {
    let state = timeout(
        WAIT,
        states.wait_for(|state| state.as_ref().is_some_and(&predicate)),
    )
    .await
    .expect("timed out waiting for state")
    .expect("connection task ended");
    state.clone().unwrap()
}

async fn wait_connected(client: &DisplayClient, up: bool) {
    let mut connected = client.connected();
    let result = timeout(WAIT, connected.wait_for(|flag| *flag == up)).await;
    assert!(result.is_ok(), "timed out waiting for connected == {up}");
}

#[tokio::test]
async fn test_connect_receives_current_state() {
    let host = start_host().await;
    let client = DisplayClient::connect(&display_config(host.local_addr(), ReconnectPolicy::Never))
        .await
        .unwrap();

    assert!(client.is_connected());
    let mut states = client.subscribe();
    let state = wait_for_state(&mut states, |_| true).await;
    assert_eq!(state.stage, Stage::Idle);
    assert_eq!(client.state(), Some(state));

    client.stop().await;
    host.stop().await.unwrap();
}

#[tokio::test]
async fn test_commands_play_a_round() {
    let host = start_host().await;
    let client = DisplayClient::connect(&display_config(host.local_addr(), ReconnectPolicy::Never))
        .await
        .unwrap();
    let mut states = client.subscribe();
    wait_for_state(&mut states, |s| s.stage == Stage::Idle).await;

    assert!(client.send(Command::Arm {
        table_id: 2,
        box_id: 5
    }));
    assert!(client.send(Command::BuyIn { amount: 100 }));
    let choosing = wait_for_state(&mut states, |s| s.stage == Stage::Choosing).await;
    assert_eq!(choosing.table_id, Some(2));
    assert_eq!(choosing.box_id, Some(5));
    assert_eq!(choosing.cards, scenario_hand().to_vec());

    assert!(client.send(Command::Choose { side: Side::Hi }));
    assert!(client.send(Command::Confirm));
    let next = wait_for_state(&mut states, |s| s.bank == 180).await;
    assert_eq!(next.stage, Stage::Choosing);
    assert_eq!(next.compare_index, 1);

    // The host's own view matches what the display holds.
    assert_eq!(host.table().state().await.unwrap(), next);

    client.stop().await;
    host.stop().await.unwrap();
}

#[tokio::test]
async fn test_two_displays_see_the_same_round() {
    let host = start_host().await;
    let config = display_config(host.local_addr(), ReconnectPolicy::Never);
    let first = DisplayClient::connect(&config).await.unwrap();
    let second = DisplayClient::connect(&config).await.unwrap();
    let mut second_states = second.subscribe();
    wait_for_state(&mut second_states, |s| s.stage == Stage::Idle).await;

    assert!(first.send(Command::Arm {
        table_id: 1,
        box_id: 1
    }));
    let armed = wait_for_state(&mut second_states, |s| s.stage == Stage::Armed).await;
    assert_eq!(armed.box_id, Some(1));

    first.stop().await;
    second.stop().await;
    host.stop().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_host_without_reconnect() {
    // Bind and release a port so nothing is listening on it.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = display_config(addr, ReconnectPolicy::Never);

    assert!(DisplayClient::connect(&config).await.is_err());

    let client = DisplayClient::start(&config);
    assert!(!client.is_connected());
    assert!(!client.send(Command::Reset));
    assert_eq!(client.state(), None);
    client.stop().await;
}

#[tokio::test]
async fn test_host_stop_clears_connected_flag() {
    let host = start_host().await;
    let client = DisplayClient::connect(&display_config(host.local_addr(), ReconnectPolicy::Never))
        .await
        .unwrap();

    host.stop().await.unwrap();
    wait_connected(&client, false).await;
    assert!(!client.send(Command::Reset));

    // The last state received stays available.
    assert!(client.state().is_some());
    client.stop().await;
}

#[tokio::test]
async fn test_reconnects_to_restarted_host() {
    let host = start_host().await;
    let addr = host.local_addr();
    let policy = ReconnectPolicy::Backoff {
        initial: Duration::from_millis(50),
        max: Duration::from_millis(200),
    };
    let client = DisplayClient::connect(&display_config(addr, policy))
        .await
        .unwrap();
    let mut states = client.subscribe();
    let before = wait_for_state(&mut states, |_| true).await;

    host.stop().await.unwrap();
    wait_connected(&client, false).await;

    let restarted = start_host_at(addr).await;
    wait_connected(&client, true).await;
    let after = wait_for_state(&mut states, |s| s.round_id != before.round_id).await;
    assert_eq!(after.stage, Stage::Idle);
    assert!(client.send(Command::Arm {
        table_id: 1,
        box_id: 2
    }));
    wait_for_state(&mut states, |s| s.stage == Stage::Armed).await;

    client.stop().await;
    restarted.stop().await.unwrap();
}

#[tokio::test]
async fn test_status_client_drives_round() {
    let host = start_host().await;
    let status = StatusClient::new(format!("http://{}", host.local_addr()));

    assert_eq!(status.status().await.unwrap().stage, Stage::Idle);

    let armed = status
        .command(&Command::Arm {
            table_id: 4,
            box_id: 2,
        })
        .await
        .unwrap();
    assert_eq!(armed.stage, Stage::Armed);
    assert_eq!(armed.table_id, Some(4));

    // CONFIRM while ARMED is rejected: same round comes back.
    let unchanged = status.command(&Command::Confirm).await.unwrap();
    assert_eq!(unchanged, armed);

    let choosing = status
        .command(&Command::BuyIn { amount: 100 })
        .await
        .unwrap();
    assert_eq!(choosing.stage, Stage::Choosing);
    let chosen = status
        .command(&Command::Choose { side: Side::Hi })
        .await
        .unwrap();
    assert_eq!(chosen.choice, Some(Side::Hi));
    assert_eq!(status.status().await.unwrap(), chosen);

    host.stop().await.unwrap();
}
