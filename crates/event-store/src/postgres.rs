use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{AggregateId, EventEnvelope, EventId, FindQuery, Result, store::EventStore};

const SELECT_EVENTS: &str = "SELECT name, aggregate_id, timestamp, payload FROM events";

/// PostgreSQL-backed event store implementation.
///
/// Rows carry a `seq` column so that equal timestamps are returned in
/// append order.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url` and wraps the pool.
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(PgPool::connect(url).await?))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let aggregate_id: String = row.try_get("aggregate_id")?;

        Ok(EventEnvelope {
            name: row.try_get("name")?,
            aggregate_id: AggregateId::parse(&aggregate_id)?,
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: EventEnvelope) -> Result<EventId> {
        let id = EventId::new();

        sqlx::query(
            r#"
            INSERT INTO events (id, name, aggregate_id, timestamp, payload)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&event.name)
        .bind(event.aggregate_id.to_string())
        .bind(event.timestamp)
        .bind(&event.payload)
        .execute(&self.pool)
        .await?;

        metrics::counter!("event_store_events_appended").increment(1);
        Ok(id)
    }

    async fn find(&self, query: FindQuery) -> Result<Vec<EventEnvelope>> {
        let rows = match query {
            FindQuery::All => {
                sqlx::query(&format!("{SELECT_EVENTS} ORDER BY timestamp ASC, seq ASC"))
                    .fetch_all(&self.pool)
                    .await?
            }
            FindQuery::ByName(name) => {
                sqlx::query(&format!(
                    "{SELECT_EVENTS} WHERE name = $1 ORDER BY timestamp ASC, seq ASC"
                ))
                .bind(name)
                .fetch_all(&self.pool)
                .await?
            }
            FindQuery::ByAggregateId(aggregate_id) => {
                sqlx::query(&format!(
                    "{SELECT_EVENTS} WHERE aggregate_id = $1 ORDER BY timestamp ASC, seq ASC"
                ))
                .bind(aggregate_id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            FindQuery::ByAggregateIdUpTo {
                aggregate_id,
                up_to,
            } => {
                sqlx::query(&format!(
                    "{SELECT_EVENTS} WHERE aggregate_id = $1 AND timestamp <= $2 ORDER BY timestamp ASC, seq ASC"
                ))
                .bind(aggregate_id.to_string())
                .bind(up_to)
                .fetch_all(&self.pool)
                .await?
            }
            FindQuery::Since(from) => {
                sqlx::query(&format!(
                    "{SELECT_EVENTS} WHERE timestamp >= $1 ORDER BY timestamp ASC, seq ASC"
                ))
                .bind(from)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Self::row_to_event).collect()
    }
}
