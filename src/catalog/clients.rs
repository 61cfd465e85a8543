// src/catalog/clients.rs
// Client lookup and idempotent creation (spec 4.7, 8, 9).

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::catalog::models::{Client, NewClient};
use crate::error::AppResult;

pub struct ClientOperations {
    pool: SqlitePool,
}

impl ClientOperations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Client>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, phone, address, created_at
            FROM clients
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_client))
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<Client>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, phone, address, created_at
            FROM clients
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_client))
    }

    /// Resolve a returning client by email, or create one from `draft`.
    /// Two concurrent checkouts racing on the same email must settle on a
    /// single row: allocate a candidate id, attempt an insert that no-ops on
    /// a clashing email, then re-read by email so both callers converge on
    /// the same client regardless of which insert actually landed.
    pub async fn get_or_create(&self, draft: &NewClient) -> AppResult<Client> {
        if let Some(existing) = self.find_by_email(&draft.email).await? {
            return Ok(existing);
        }

        let id = self.next_client_id().await?;
        let now: DateTime<Utc> = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO clients (id, name, email, phone, address, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.address)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        match self.find_by_email(&draft.email).await? {
            Some(client) => Ok(client),
            None => {
                warn!(email = %draft.email, "client row vanished immediately after insert");
                Ok(Client {
                    id,
                    name: draft.name.clone(),
                    email: draft.email.clone(),
                    phone: draft.phone.clone(),
                    address: draft.address.clone(),
                    created_at: now,
                })
            }
        }
    }

    async fn next_client_id(&self) -> AppResult<String> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO id_sequences (name, value) VALUES ('client', 1)
            ON CONFLICT(name) DO UPDATE SET value = value + 1
            "#,
        )
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT value FROM id_sequences WHERE name = 'client'")
            .fetch_one(&mut *tx)
            .await?;
        let value: i64 = row.get("value");

        tx.commit().await?;

        Ok(format!("CUST{:04}", value))
    }

    fn row_to_client(row: sqlx::sqlite::SqliteRow) -> Client {
        let created_at: String = row.get("created_at");
        Client {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            address: row.get("address"),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}
