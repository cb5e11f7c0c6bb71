use sqlx::{FromRow, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use super::DatabaseError;

/// Desired state for one device-bound container.
///
/// `port` is unique across the table and, together with `device`, is fixed
/// for the lifetime of the record. Only `name` can change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: Uuid,
    pub device: String,
    pub port: u16,
    pub name: Option<String>,
}

#[derive(Debug, FromRow)]
struct ContainerRow {
    id: String,
    device: String,
    port: i64,
    name: Option<String>,
}

/// A stored row that does not decode into a [`ContainerRecord`].
#[derive(Debug)]
pub struct InvalidRecord {
    /// The raw `id` column as stored.
    pub id: String,
    pub error: DatabaseError,
}

impl TryFrom<ContainerRow> for ContainerRecord {
    type Error = DatabaseError;

    fn try_from(row: ContainerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&row.id)?,
            device: row.device,
            port: u16::try_from(row.port).map_err(|_| DatabaseError::InvalidPort(row.port))?,
            name: row.name,
        })
    }
}

impl ContainerRecord {
    pub fn new(device: impl Into<String>, port: u16) -> Self {
        Self {
            id: Uuid::new_v4(),
            device: device.into(),
            port,
            name: None,
        }
    }
}

// Database queries
impl ContainerRecord {
    /// All decodable records in insertion order, plus the rows that failed
    /// to decode.
    pub async fn scan(
        pool: &SqlitePool,
    ) -> Result<(Vec<ContainerRecord>, Vec<InvalidRecord>), DatabaseError> {
        let rows = sqlx::query_as::<_, ContainerRow>(
            r#"
            SELECT id, device, port, name
            FROM containers
            ORDER BY rowid
            "#,
        )
        .fetch_all(pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        let mut invalid = Vec::new();
        for row in rows {
            let id = row.id.clone();
            match ContainerRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(error) => invalid.push(InvalidRecord { id, error }),
            }
        }
        Ok((records, invalid))
    }

    /// All records in insertion order. Rows that do not decode are skipped.
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<ContainerRecord>, DatabaseError> {
        let (records, invalid) = Self::scan(pool).await?;
        for row in invalid {
            warn!("Skipping unreadable container row {}: {}", row.id, row.error);
        }
        Ok(records)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<ContainerRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, ContainerRow>(
            r#"
            SELECT id, device, port, name
            FROM containers
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

        row.map(ContainerRecord::try_from).transpose()
    }

    pub async fn ports(pool: &SqlitePool) -> Result<Vec<u16>, DatabaseError> {
        let ports: Vec<i64> = sqlx::query_scalar("SELECT port FROM containers ORDER BY rowid")
            .fetch_all(pool)
            .await?;

        // Rows outside the u16 range can never collide with a real host port
        Ok(ports
            .into_iter()
            .filter_map(|port| u16::try_from(port).ok())
            .collect())
    }

    /// Fails with [`DatabaseError::PortTaken`] when another row already holds `port`.
    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO containers (id, device, port, name)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(self.id.to_string())
        .bind(&self.device)
        .bind(i64::from(self.port))
        .bind(&self.name)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DatabaseError::PortTaken(self.port))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `false` when no record has this id.
    pub async fn update_name(
        pool: &SqlitePool,
        id: Uuid,
        name: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE containers
            SET name = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(id.to_string())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM containers WHERE id = ?")
            .bind(id.to_string())
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
