//! Container initialization tests.
//!
//! Each test owns its `Container` and `TestRegistry`, so nothing here
//! touches the process-global recorder or the static instance.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::thread;

use metrics_test_utils::{ForbiddenRecorder, TestRegistry};
use node_metrics::groups::{ConfigCategory, ConnectionKind, Direction, MempoolStat};
use node_metrics::{
    BlockMetrics, ConfigMetrics, Container, MempoolMetrics, MetricsRegistry, NetMetrics,
    PeerMetrics, TipIndex, TxMetrics, TxSummary, ValidationListener,
};

fn call_every_method(container: &Container) {
    let block = container.block();
    block.update("height", 1.0);
    block.size(1.0);
    block.size_witness(1.0);
    block.weight(1.0);
    block.height(1.0);
    block.version(1.0);
    block.transactions(1.0);
    block.sigops(1.0);
    block.header_time(1.0);
    block.difficulty(1.0);
    block.tip_load_block_disk(1, 1.0);
    block.tip_connect_block(1, 1.0);
    block.tip_flush_view(1, 1.0);
    block.tip_flush_disk(1, 1.0);
    block.tip_update(1, 1.0);
    block.fork_check(1, 1.0);
    block.update_index(1, 1.0);

    call_every_mempool_method(container.mempool());

    let net = container.net();
    net.inc_connection("open");
    net.connection_gauge(ConnectionKind::Total, 8);
    net.bandwidth(Direction::Rx, "inv", 100);
    net.ping_time(1500);
    net.inc_ping_problem();

    let peer = container.peer();
    peer.process_msg_type("tx", 10);
    peer.inc_tx_validation_result(1);
    peer.inc_misbehaving();
    peer.inc_misbehave_amount(10);
    peer.connection_type(0, 4);
    peer.known(1000);
    peer.send_message_time(20);
    peer.push_msg_type("inv");
    peer.banned(2);

    let tx = container.tx();
    tx.inc_invalid("consensus");
    tx.input_time(5);
    tx.inc_orphan_add();
    tx.inc_orphan_remove();
    tx.inc_accepted(1);
    tx.cache_size(10.0);
    tx.inc_transactions("pubkeyhash", 2);
    tx.transaction_check(100, 80.0);

    let config = container.config();
    config.set("dbcache", ConfigCategory::Options, 450);
    config.set_flag("txindex", ConfigCategory::Options, true);
    config.set_ibd(false);

    let tip = TipIndex {
        hash: [1; 32],
        height: 1,
        tx_count: 1,
        time: 1,
        version: 1,
        bits: 0x1d00_ffff,
    };
    let tx_summary = TxSummary {
        inputs: 1,
        outputs: 1,
        total_size: 200,
        value_out: 5000,
    };
    let notifier = container.notifier();
    notifier.updated_block_tip(&tip, None, false);
    notifier.transaction_added_to_mempool(&tx_summary, 1);
    notifier.transaction_removed_from_mempool(&tx_summary, 0, 2);
}

fn call_every_mempool_method(mempool: &dyn MempoolMetrics) {
    mempool.accept_time(12_000, 9_000.0);
    for stat in MempoolStat::ALL {
        mempool.transactions(stat, 42);
    }
    mempool.incoming(2, 3, 400, 100_000);
    mempool.removed(0);
    mempool.removed(99);
    mempool.orphans(5, 12);
}

#[test]
fn test_live_height_is_visible_in_registry() {
    let registry = TestRegistry::new();
    let container = Container::new();
    assert!(container.init("test", &registry.registry(), false));

    container.block().height(700_000.0);

    let snapshot = registry.snapshot();
    assert_eq!(
        snapshot.gauge("block_tip", &[("type", "height"), ("chain", "test")]),
        Some(700_000.0)
    );
}

#[test]
fn test_disabled_mempool_registers_nothing() {
    let registry = TestRegistry::new();
    let container = Container::new();
    assert!(container.init("test", &registry.registry(), true));

    call_every_mempool_method(container.mempool());

    assert!(registry.snapshot().is_empty());
    assert!(registry.snapshot().families().is_empty());
    assert_eq!(registry.registrations(), 0);
}

#[test]
fn test_disabled_groups_never_touch_the_recorder() {
    let container = Container::new();
    let registry = MetricsRegistry::from_recorder(Arc::new(ForbiddenRecorder));
    assert!(container.init("test", &registry, true));

    call_every_method(&container);
}

#[test]
fn test_live_groups_accept_every_method() {
    let registry = TestRegistry::new();
    let container = Container::new();
    container.init("test", &registry.registry(), false);
    let registered = registry.registrations();

    call_every_method(&container);

    // Only the two config options are resolved lazily
    assert_eq!(registry.registrations(), registered + 2);
}

#[test]
fn test_sequential_init_builds_once() {
    let registry = TestRegistry::new();
    let container = Container::new();

    assert!(container.init("test", &registry.registry(), false));
    let registered = registry.registrations();
    assert!(registered > 0);

    assert!(!container.init("test", &registry.registry(), false));
    assert!(!container.init("other", &registry.registry(), true));
    assert_eq!(registry.registrations(), registered);

    // The first init's chain label stands
    assert!(registry.snapshot().find("block_tip", &[("chain", "other")]).is_empty());
}

#[test]
fn test_concurrent_init_builds_once() {
    let reference = TestRegistry::new();
    Container::new().init("test", &reference.registry(), false);
    let single_init = reference.registrations();

    let registry = TestRegistry::new();
    let shared = registry.registry();
    let container = Container::new();
    let winners = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| container.init("test", &shared, false)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count()
    });

    assert_eq!(winners, 1);
    assert_eq!(registry.registrations(), single_init);
    assert!(container.is_initialized());
}

#[test]
fn test_live_series_carry_chain_label() {
    let registry = TestRegistry::new();
    let container = Container::new();
    container.init("regtest", &registry.registry(), false);

    let snapshot = registry.snapshot();
    assert!(!snapshot.is_empty());
    assert!(snapshot
        .series()
        .iter()
        .all(|series| series.label("chain") == Some("regtest") && series.label("kind").is_some()));
}

#[test]
#[should_panic(expected = "metrics container used before init")]
fn test_block_before_init_panics() {
    let container = Container::new();
    container.block().height(1.0);
}

#[test]
#[should_panic(expected = "metrics container used before init")]
fn test_notifier_before_init_panics() {
    let container = Container::new();
    let _ = container.notifier();
}
