//! End-to-end tests for both ingestion paths: the UDP push listener and
//! the stats snapshot poller, feeding one shared registry.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, UdpSocket};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use uwsgi_dns_application::DomainRegistry;
use uwsgi_dns_domain::Fqdn;
use uwsgi_dns_infrastructure::subscription::{packet, StatsClient, SubscriptionListener};
use uwsgi_dns_jobs::SubscriptionSyncJob;

async fn wait_until(deadline_ms: u64, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_millis(deadline_ms);
    while !condition() {
        assert!(Instant::now() < deadline, "condition never became true");
        sleep(Duration::from_millis(20)).await;
    }
}

/// Stats endpoint that serves the same JSON snapshot to every connection.
async fn spawn_stats_endpoint(body: &'static str) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let _ = stream.write_all(body.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    addr
}

#[tokio::test]
async fn listener_feeds_registry_from_pushed_packets() {
    let registry = Arc::new(DomainRegistry::new());
    let listener = SubscriptionListener::bind("127.0.0.1:0", Arc::clone(&registry))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(listener.run(shutdown.clone()));

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // A torn packet first: it must be dropped without taking the listener down.
    sender.send_to(&[0x00, 0x40, 0x00], addr).await.unwrap();
    for domain in ["one.example", "two.example"] {
        let blob = packet::encode(0, 0, &[(b"key", domain.as_bytes()), (b"address", b":3031")]);
        sender.send_to(&blob, addr).await.unwrap();
    }

    let check = Arc::clone(&registry);
    wait_until(5000, move || {
        check.contains(&Fqdn::new("one.example")) && check.contains(&Fqdn::new("two.example"))
    })
    .await;

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn poller_replaces_registry_with_stats_snapshot() {
    let addr = spawn_stats_endpoint(
        r#"{"version": "2.0.21", "subscriptions": [
            {"key": "polled-a.example", "hash": 11},
            {"key": "polled-b.example", "hash": 12}
        ]}"#,
    )
    .await;

    let registry = Arc::new(DomainRegistry::new());
    registry.add(&Fqdn::new("stale.example"));

    let stats = Arc::new(StatsClient::new(
        addr.ip().to_string(),
        addr.port(),
        Duration::from_secs(5),
    ));
    let job = SubscriptionSyncJob::new(Arc::clone(&registry), stats).with_interval(1);
    Arc::new(job).start().await;

    let check = Arc::clone(&registry);
    wait_until(5000, move || {
        check.contains(&Fqdn::new("polled-a.example"))
            && check.contains(&Fqdn::new("polled-b.example"))
            && !check.contains(&Fqdn::new("stale.example"))
    })
    .await;
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn poller_retries_until_endpoint_comes_up() {
    // Reserve a port, then close it so the first polls are refused.
    let placeholder = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = placeholder.local_addr().unwrap();
    drop(placeholder);

    let registry = Arc::new(DomainRegistry::new());
    let stats = Arc::new(StatsClient::new(
        addr.ip().to_string(),
        addr.port(),
        Duration::from_secs(1),
    ));
    let job = SubscriptionSyncJob::new(Arc::clone(&registry), stats).with_interval(1);
    Arc::new(job).start().await;

    // Refused polls must leave the registry alone and keep the loop alive.
    sleep(Duration::from_millis(1500)).await;
    assert!(registry.is_empty());

    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let _ = stream
                .write_all(br#"{"subscriptions": [{"key": "late.example"}]}"#)
                .await;
            let _ = stream.shutdown().await;
        }
    });

    let check = Arc::clone(&registry);
    wait_until(5000, move || check.contains(&Fqdn::new("late.example"))).await;
}

#[tokio::test]
async fn push_and_poll_feed_the_same_registry() {
    let addr =
        spawn_stats_endpoint(r#"{"subscriptions": [{"key": "snapshot.example"}]}"#).await;

    let registry = Arc::new(DomainRegistry::new());
    let shutdown = CancellationToken::new();

    let listener = SubscriptionListener::bind("127.0.0.1:0", Arc::clone(&registry))
        .await
        .unwrap();
    let push_addr = listener.local_addr().unwrap();
    tokio::spawn(listener.run(shutdown.clone()));

    let stats = Arc::new(StatsClient::new(
        addr.ip().to_string(),
        addr.port(),
        Duration::from_secs(5),
    ));
    let job = SubscriptionSyncJob::new(Arc::clone(&registry), stats)
        .with_interval(3600)
        .with_cancellation(shutdown.clone());
    Arc::new(job).start().await;

    let check = Arc::clone(&registry);
    wait_until(5000, move || check.contains(&Fqdn::new("snapshot.example"))).await;

    // A push on top of the snapshot is additive.
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let blob = packet::encode(0, 0, &[(b"key", b"pushed.example")]);
    sender.send_to(&blob, push_addr).await.unwrap();

    let check = Arc::clone(&registry);
    wait_until(5000, move || check.contains(&Fqdn::new("pushed.example"))).await;
    assert!(registry.contains(&Fqdn::new("snapshot.example")));

    shutdown.cancel();
}
