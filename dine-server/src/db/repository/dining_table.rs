//! Dining Table Repository

use serde_json::json;
use shared::models::{DiningTable, DiningTableCreate, DiningTableUpdate};
use shared::util::snowflake_id;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, record_id};

const TABLE: &str = "dining_table";

#[derive(Clone)]
pub struct DiningTableRepository {
    base: BaseRepository,
}

impl DiningTableRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active dining tables
    pub async fn find_all(&self) -> RepoResult<Vec<DiningTable>> {
        let tables: Vec<DiningTable> = self
            .base
            .db()
            .query(
                "SELECT *, record::id(id) AS id FROM dining_table \
                 WHERE is_active = true ORDER BY name",
            )
            .await?
            .take(0)?;
        Ok(tables)
    }

    /// Find table by id
    pub async fn find_by_id(&self, id: i64) -> RepoResult<Option<DiningTable>> {
        let mut result = self
            .base
            .db()
            .query("SELECT *, record::id(id) AS id FROM dining_table WHERE id = $id LIMIT 1")
            .bind(("id", record_id(TABLE, id)))
            .await?;
        let tables: Vec<DiningTable> = result.take(0)?;
        Ok(tables.into_iter().next())
    }

    /// Find table by name
    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<DiningTable>> {
        let mut result = self
            .base
            .db()
            .query("SELECT *, record::id(id) AS id FROM dining_table WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await?;
        let tables: Vec<DiningTable> = result.take(0)?;
        Ok(tables.into_iter().next())
    }

    /// Create a new dining table
    pub async fn create(&self, data: DiningTableCreate) -> RepoResult<DiningTable> {
        if self.find_by_name(&data.name).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Table '{}' already exists",
                data.name
            )));
        }

        let table = DiningTable {
            id: snowflake_id(),
            name: data.name,
            capacity: data.capacity.unwrap_or(4),
            is_active: true,
        };

        self.base
            .db()
            .query("CREATE dining_table CONTENT $data RETURN NONE")
            .bind(("data", table.clone()))
            .await?
            .check()?;
        Ok(table)
    }

    /// Update a dining table
    pub async fn update(&self, id: i64, data: DiningTableUpdate) -> RepoResult<DiningTable> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Dining table {} not found", id)))?;

        // Check duplicate name if changing name
        if let Some(new_name) = &data.name
            && new_name != &existing.name
            && self.find_by_name(new_name).await?.is_some()
        {
            return Err(RepoError::Duplicate(format!(
                "Table '{}' already exists",
                new_name
            )));
        }

        let updated = DiningTable {
            id: existing.id,
            name: data.name.unwrap_or(existing.name),
            capacity: data.capacity.unwrap_or(existing.capacity),
            is_active: data.is_active.unwrap_or(existing.is_active),
        };

        // Merge everything except the record key
        self.base
            .db()
            .query("UPDATE dining_table MERGE $data WHERE id = $id RETURN NONE")
            .bind(("id", record_id(TABLE, id)))
            .bind((
                "data",
                json!({
                    "name": updated.name.clone(),
                    "capacity": updated.capacity,
                    "is_active": updated.is_active,
                }),
            ))
            .await?
            .check()?;
        Ok(updated)
    }

    /// Soft-delete a dining table
    pub async fn delete(&self, id: i64) -> RepoResult<bool> {
        if self.find_by_id(id).await?.is_none() {
            return Ok(false);
        }
        self.base
            .db()
            .query("UPDATE dining_table SET is_active = false WHERE id = $id RETURN NONE")
            .bind(("id", record_id(TABLE, id)))
            .await?
            .check()?;
        Ok(true)
    }
}
