/// Crash-state gating over the wire.
mod common;

use common::launch;
use vesta_kv::PutArgs;

#[tokio::test]
async fn crashed_node_refuses_gated_operations() {
    let cluster = launch(8500, 1, 1, 2).await;

    assert!(cluster.client(0).put(PutArgs::fresh("k", b"v".to_vec())).await);
    assert!(cluster.client(0).force_crash().await);

    let mut client = cluster.client(0);
    assert!(!client.put(PutArgs::fresh("k", b"x".to_vec())).await);
    assert!(!client.put_raw(PutArgs::fresh("k", b"x".to_vec())).await);
    assert!(client.get("k").await.is_none());
    assert!(client.get_raw("k").await.is_none());
    assert!(!client.gossip().await);
    assert!(!client.crash(10).await);

    // The other node is unaffected.
    assert!(cluster.client(1).put(PutArgs::fresh("k", b"y".to_vec())).await);
}

#[tokio::test]
async fn restore_preserves_data() {
    let cluster = launch(8520, 1, 1, 1).await;
    let mut client = cluster.client(0);

    assert!(client.put(PutArgs::fresh("k", b"v".to_vec())).await);

    assert!(client.force_crash().await);
    assert!(client.get("k").await.is_none());

    assert!(client.force_restore().await);
    let result = client.get("k").await.expect("restored node should serve reads");
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].value, b"v");
}

#[tokio::test]
async fn crash_while_crashed_fails_and_does_not_extend() {
    let cluster = launch(8540, 1, 1, 1).await;
    let mut client = cluster.client(0);

    assert!(client.crash(600).await);
    // Already crashed: refused, deadline untouched.
    assert!(!client.crash(600).await);

    // Force-restore cuts through the timed deadline.
    assert!(client.force_restore().await);
    assert!(client.get_raw("k").await.is_some());
}

#[tokio::test]
async fn force_crash_is_reachable_while_crashed() {
    let cluster = launch(8560, 1, 1, 1).await;
    let mut client = cluster.client(0);

    assert!(client.crash(600).await);
    // Administrative calls stay reachable in any state.
    assert!(client.force_crash().await);
    assert!(client.force_restore().await);

    assert!(client.put(PutArgs::fresh("k", b"v".to_vec())).await);
}

#[tokio::test]
async fn preference_list_update_is_gated() {
    let cluster = launch(8580, 1, 1, 2).await;
    let mut client = cluster.client(0);

    assert!(client.force_crash().await);
    assert!(!client.send_preference_list(cluster.addrs()).await);

    assert!(client.force_restore().await);
    assert!(client.send_preference_list(cluster.addrs()).await);
}
