//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a local Docker
//! daemon, so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use event_store::{
    AggregateId, EventEnvelope, EventStore, EventStoreExt, FindQuery, PostgresEventStore,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_events_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a truncated table
async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

/// Whole seconds, so the value survives PostgreSQL's microsecond precision.
fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn create_test_event(
    aggregate_id: AggregateId,
    name: &str,
    timestamp: DateTime<Utc>,
) -> EventEnvelope {
    EventEnvelope::new(
        name,
        aggregate_id,
        timestamp,
        serde_json::json!({"name": name}),
    )
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn append_and_retrieve_events() {
    let store = get_test_store().await;
    let aggregate_id = AggregateId::generate();

    let event = create_test_event(aggregate_id, "PortfolioCreated", base_time());
    store.append(event.clone()).await.unwrap();

    let events = store.history(aggregate_id).await.unwrap();
    assert_eq!(events, vec![event]);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn find_returns_ascending_timestamps() {
    let store = get_test_store().await;
    let id = AggregateId::generate();
    let t0 = base_time();

    store
        .append(create_test_event(id, "Late", t0 + TimeDelta::seconds(5)))
        .await
        .unwrap();
    store.append(create_test_event(id, "Early", t0)).await.unwrap();
    store.append(create_test_event(id, "Tied", t0)).await.unwrap();

    let names: Vec<_> = store
        .find(FindQuery::all())
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["Early", "Tied", "Late"]);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn find_query_shapes() {
    let store = get_test_store().await;
    let id = AggregateId::generate();
    let other = AggregateId::generate();
    let t0 = base_time();
    let t1 = t0 + TimeDelta::seconds(1);
    let t2 = t0 + TimeDelta::seconds(2);

    store.append(create_test_event(id, "PortfolioCreated", t0)).await.unwrap();
    store.append(create_test_event(other, "PortfolioCreated", t1)).await.unwrap();
    store.append(create_test_event(id, "AssetCreated", t1)).await.unwrap();
    store.append(create_test_event(id, "BuildingCreated", t2)).await.unwrap();

    assert_eq!(store.find(FindQuery::all()).await.unwrap().len(), 4);
    assert_eq!(
        store
            .find(FindQuery::by_name("PortfolioCreated"))
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(store.find(FindQuery::by_aggregate(id)).await.unwrap().len(), 3);

    let prefix = store
        .find(FindQuery::by_aggregate_up_to(id, t1))
        .await
        .unwrap();
    assert_eq!(
        prefix.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        vec!["PortfolioCreated", "AssetCreated"]
    );

    let since = store.find(FindQuery::since(t1)).await.unwrap();
    assert_eq!(since.len(), 3);
    assert!(since.iter().all(|e| e.timestamp >= t1));
}
