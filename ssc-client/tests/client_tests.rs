//! Integration tests exercising the client against a loopback fake device

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use ssc_client::{detect_device_type, request, DeviceType, SscClient, SscError, SscResponse};

/// Spawn a fake SSC device on a loopback port
///
/// `respond` maps each decoded request document to an optional reply body;
/// `None` keeps the device silent for that request.
async fn spawn_fake_device<F>(respond: F) -> SocketAddr
where
    F: Fn(&serde_json::Value) -> Option<String> + Send + 'static,
{
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let Ok(document) = serde_json::from_slice::<serde_json::Value>(&buf[..n]) else {
                continue;
            };
            if let Some(reply) = respond(&document) {
                let _ = socket.send_to(reply.as_bytes(), peer).await;
            }
        }
    });
    addr
}

fn client_for(addr: SocketAddr) -> SscClient {
    SscClient::with_port(addr.ip().to_string(), addr.port())
}

#[tokio::test]
async fn request_response_roundtrip() {
    let addr = spawn_fake_device(|document| {
        document
            .get("device")
            .map(|_| r#"{"device":{"name":"EW-DX EM 2"}}"#.to_string())
    })
    .await;

    let client = client_for(addr);
    client.connect().await.unwrap();

    let data = client.send_raw(&request::device_name()).await.unwrap();
    let response = SscResponse::parse(&data).unwrap();
    assert_eq!(response.device_name(), Some("EW-DX EM 2"));
}

#[tokio::test]
async fn silent_device_times_out_within_bound() {
    let addr = spawn_fake_device(|_| None).await;

    let client = client_for(addr);
    client.connect().await.unwrap();

    let started = Instant::now();
    let result = client.send_raw(&request::device_name()).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(SscError::Timeout)));
    assert!(elapsed >= Duration::from_millis(900));
    assert!(elapsed < Duration::from_millis(1800));
}

#[tokio::test]
async fn empty_datagram_is_success_with_no_data() {
    let addr = spawn_fake_device(|_| Some(String::new())).await;

    let client = client_for(addr);
    client.connect().await.unwrap();

    let data = client.send_raw(&request::device_name()).await.unwrap();
    assert!(data.is_empty());
}

#[tokio::test]
async fn identical_queries_yield_identical_state() {
    let addr = spawn_fake_device(|_| {
        Some(r#"{"mates":{"tx1":{"battery":{"gauge":58,"lifetime":210}}}}"#.to_string())
    })
    .await;

    let client = client_for(addr);
    client.connect().await.unwrap();

    let first = client.send_raw(&request::tx_battery_gauge(1)).await.unwrap();
    let second = client.send_raw(&request::tx_battery_gauge(1)).await.unwrap();

    let first = SscResponse::parse(&first).unwrap();
    let second = SscResponse::parse(&second).unwrap();
    assert_eq!(first.tx_battery_gauge(1), second.tx_battery_gauge(1));
    assert_eq!(first.tx_battery_lifetime(1), second.tx_battery_lifetime(1));
}

#[tokio::test]
async fn detect_charger_by_name() {
    let addr = spawn_fake_device(|document| {
        document
            .get("device")
            .map(|_| r#"{"device":{"name":"CHG 70N"}}"#.to_string())
    })
    .await;

    let client = client_for(addr);
    client.connect().await.unwrap();

    let detected = detect_device_type(&client).await.unwrap();
    assert_eq!(detected, Some(DeviceType::Charger));
}

#[tokio::test]
async fn detect_receiver_by_rx_probe_when_name_inconclusive() {
    let addr = spawn_fake_device(|document| {
        if document.get("device").is_some() {
            // Customized display name the tier-1 heuristic cannot place.
            Some(r#"{"device":{"name":"Stage Rack Left"}}"#.to_string())
        } else if document.get("rx1").is_some() {
            Some(r#"{"rx1":{"name":"Vocal 1"}}"#.to_string())
        } else {
            Some(r#"{"osc":{"error":[424]}}"#.to_string())
        }
    })
    .await;

    let client = client_for(addr);
    client.connect().await.unwrap();

    let detected = detect_device_type(&client).await.unwrap();
    assert_eq!(detected, Some(DeviceType::Receiver));
}

#[tokio::test]
async fn detect_charger_by_bay_probe_as_last_resort() {
    let addr = spawn_fake_device(|document| {
        if document.get("bays").is_some() {
            Some(r#"{"bays":{"bat_gauge":[0,0]}}"#.to_string())
        } else {
            Some(r#"{"osc":{"error":[424]}}"#.to_string())
        }
    })
    .await;

    let client = client_for(addr);
    client.connect().await.unwrap();

    let detected = detect_device_type(&client).await.unwrap();
    assert_eq!(detected, Some(DeviceType::Charger));
}

#[tokio::test]
async fn detect_unknown_when_every_tier_is_inconclusive() {
    let addr = spawn_fake_device(|_| Some(r#"{"osc":{"error":[424]}}"#.to_string())).await;

    let client = client_for(addr);
    client.connect().await.unwrap();

    let detected = detect_device_type(&client).await.unwrap();
    assert_eq!(detected, None);
}
