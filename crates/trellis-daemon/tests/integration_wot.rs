// crates/trellis-daemon/tests/integration_wot.rs
//
// End-to-end tests for a Trellis node.
//
// Two nodes share an in-memory network: each publishes its own identities
// through the scheduler, fetches the other's documents and answers
// protocol requests through the dispatcher. The daemon is a binary crate
// with no lib.rs, so these tests wire the library crates the way main does.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use trellis_core::{IdentityDocument, InsertUri, TrustValue};
use trellis_graph::{NewOwnIdentity, TrustGraph};
use trellis_publish::{shutdown_channel, Fetcher, PublicationScheduler, PublishSchedule};
use trellis_reputation::ScoreEngine;
use trellis_rpc::{Dispatcher, FieldSet};
use trellis_store::{InMemoryNetwork, MemoryStore, RocksStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory path using UUID to avoid conflicts.
fn temp_db_path(label: &str) -> String {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("trellis_test_{}_{}", label, Uuid::now_v7()));
    path.to_string_lossy().to_string()
}

fn rocks_graph(path: &str) -> Arc<TrustGraph> {
    let store = RocksStore::open(path).expect("open RocksDB");
    Arc::new(TrustGraph::open(Arc::new(store), ScoreEngine::default()).expect("open graph"))
}

fn memory_graph() -> Arc<TrustGraph> {
    Arc::new(TrustGraph::open(Arc::new(MemoryStore::new()), ScoreEngine::default()).expect("open graph"))
}

async fn request(dispatcher: &Dispatcher, fields: &[(&str, &str)]) -> FieldSet {
    let request: FieldSet = fields.iter().copied().collect();
    dispatcher.dispatch(&request).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_nodes_discover_and_score_each_other() {
    let network = Arc::new(InMemoryNetwork::new());

    // Node B: bob trusts carol and publishes.
    let node_b = memory_graph();
    let bob = node_b.create_own_identity(NewOwnIdentity::new("bob")).unwrap();
    let carol = InsertUri::generate().request_uri();
    node_b.add_identity(carol.clone()).unwrap();
    node_b
        .set_trust(bob.id(), &carol.identity_id(), TrustValue::try_from(50).unwrap(), "")
        .unwrap();
    let report = PublicationScheduler::new(node_b.clone(), network.clone(), PublishSchedule::default())
        .run_cycle()
        .await;
    assert_eq!(report.published, 1);

    // Node A: alice trusts bob fully, over the protocol.
    let path = temp_db_path("discovery");
    let node_a = rocks_graph(&path);
    let dispatcher = Dispatcher::new(node_a.clone());

    let created = request(
        &dispatcher,
        &[
            ("Message", "CreateIdentity"),
            ("NickName", "alice"),
            ("PublishTrustList", "true"),
            ("Context", "Freetalk"),
        ],
    )
    .await;
    assert_eq!(created.message_name(), Some("IdentityCreated"));
    let alice = created.get("ID").unwrap().to_string();

    let bob_uri = bob.identity.request_uri.to_string();
    let reply = request(&dispatcher, &[("Message", "AddIdentity"), ("RequestURI", bob_uri.as_str())]).await;
    assert_eq!(reply.message_name(), Some("IdentityAdded"));

    let reply = request(
        &dispatcher,
        &[
            ("Message", "SetTrust"),
            ("Truster", alice.as_str()),
            ("Trustee", bob_uri.as_str()),
            ("Value", "100"),
            ("Comment", "knows crypto"),
        ],
    )
    .await;
    assert_eq!(reply.message_name(), Some("TrustSet"));

    // Fetching bob's document brings in carol through bob's trust list.
    Fetcher::new(node_a.clone(), network.clone())
        .fetch_and_import(&bob.identity.request_uri)
        .await
        .unwrap();

    let carol_uri = carol.to_string();
    let reply = request(
        &dispatcher,
        &[("Message", "GetIdentity"), ("TreeOwner", alice.as_str()), ("Identity", carol_uri.as_str())],
    )
    .await;
    assert_eq!(reply.get("Score"), Some("20"));
    assert_eq!(reply.get("Rank"), Some("2"));
    assert_eq!(reply.get("Trust"), Some("null"));

    let reply = request(
        &dispatcher,
        &[("Message", "GetIdentity"), ("TreeOwner", alice.as_str()), ("Identity", bob_uri.as_str())],
    )
    .await;
    assert_eq!(reply.get("Nickname"), Some("bob"));
    assert_eq!(reply.get("Trust"), Some("100"));

    // Distrusting bob drops both bob and carol from alice's tree.
    request(
        &dispatcher,
        &[
            ("Message", "SetTrust"),
            ("Truster", alice.as_str()),
            ("Trustee", bob_uri.as_str()),
            ("Value", "-10"),
            ("Comment", "spammer"),
        ],
    )
    .await;
    for target in [&bob_uri, &carol_uri] {
        let reply = request(
            &dispatcher,
            &[("Message", "GetIdentity"), ("TreeOwner", alice.as_str()), ("Identity", target.as_str())],
        )
        .await;
        assert_eq!(reply.get("Score"), Some("null"));
        assert_eq!(reply.get("Rank"), Some("null"));
    }

    // Node A publishes alice with her trust list.
    PublicationScheduler::new(node_a.clone(), network.clone(), PublishSchedule::default())
        .run_cycle()
        .await;
    let published = network.history().pop().unwrap();
    let document = IdentityDocument::from_bytes(&published.data).unwrap();
    assert_eq!(document.nickname.as_deref(), Some("alice"));
    assert_eq!(document.trust_list.len(), 1);
    assert_eq!(document.trust_list[0].value.get(), -10);
}

#[tokio::test]
async fn graph_survives_restart() {
    let path = temp_db_path("restart");
    let carol = InsertUri::generate().request_uri();
    let (alice, bob) = {
        let graph = rocks_graph(&path);
        let alice = graph.create_own_identity(NewOwnIdentity::new("alice")).unwrap();
        let bob = graph.create_own_identity(NewOwnIdentity::new("bob")).unwrap();
        graph.add_identity(carol.clone()).unwrap();
        graph
            .set_trust(alice.id(), bob.id(), TrustValue::try_from(100).unwrap(), "")
            .unwrap();
        graph
            .set_trust(bob.id(), &carol.identity_id(), TrustValue::try_from(50).unwrap(), "")
            .unwrap();
        graph.set_property(alice.id(), "avatar", "cat.png").unwrap();
        (alice, bob)
    };

    let graph = rocks_graph(&path);
    assert_eq!(graph.own_identities().unwrap().len(), 2);
    assert_eq!(graph.get_score(alice.id(), &carol.identity_id()).unwrap().score, 20);
    assert_eq!(graph.get_score(bob.id(), &carol.identity_id()).unwrap().score, 50);
    assert_eq!(graph.get_property(alice.id(), "avatar").unwrap(), "cat.png");

    // Nothing was ever published, so both still need an insert.
    assert_eq!(graph.pending_inserts().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn property_change_triggers_exactly_one_publish() {
    let network = Arc::new(InMemoryNetwork::new());
    let graph = memory_graph();
    let dispatcher = Dispatcher::new(graph.clone());

    let created = request(
        &dispatcher,
        &[
            ("Message", "CreateIdentity"),
            ("NickName", "alice"),
            ("PublishTrustList", "false"),
            ("Context", "Chat"),
        ],
    )
    .await;
    let alice = created.get("ID").unwrap().to_string();

    let schedule = PublishSchedule {
        startup_delay: Duration::from_secs(30),
        period: Duration::from_secs(60),
    };
    let scheduler = Arc::new(PublicationScheduler::new(graph.clone(), network.clone(), schedule));
    let (trigger, shutdown) = shutdown_channel();
    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(network.history().len(), 1);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(network.history().len(), 1);

    let reply = request(
        &dispatcher,
        &[
            ("Message", "SetProperty"),
            ("Identity", alice.as_str()),
            ("Property", "avatar"),
            ("Value", "cat.png"),
        ],
    )
    .await;
    assert_eq!(reply.message_name(), Some("PropertyAdded"));

    tokio::time::sleep(Duration::from_secs(60)).await;
    let history = network.history();
    assert_eq!(history.len(), 2);
    let document = IdentityDocument::from_bytes(&history[1].data).unwrap();
    assert_eq!(document.edition(), 1);
    assert_eq!(document.properties.get("avatar").map(String::as_str), Some("cat.png"));
    assert!(document.trust_list.is_empty());

    trigger.trigger();
    runner.await.unwrap();
}
