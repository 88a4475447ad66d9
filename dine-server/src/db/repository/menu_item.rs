//! Menu Item Repository

use serde_json::json;
use shared::models::{MenuItem, MenuItemCreate, MenuItemUpdate};
use shared::util::snowflake_id;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, record_id};

const TABLE: &str = "menu_item";

#[derive(Clone)]
pub struct MenuItemRepository {
    base: BaseRepository,
}

impl MenuItemRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active menu items
    pub async fn find_all(&self) -> RepoResult<Vec<MenuItem>> {
        let items: Vec<MenuItem> = self
            .base
            .db()
            .query(
                "SELECT *, record::id(id) AS id FROM menu_item \
                 WHERE is_active = true ORDER BY name",
            )
            .await?
            .take(0)?;
        Ok(items)
    }

    /// Find menu item by id
    pub async fn find_by_id(&self, id: i64) -> RepoResult<Option<MenuItem>> {
        let mut result = self
            .base
            .db()
            .query("SELECT *, record::id(id) AS id FROM menu_item WHERE id = $id LIMIT 1")
            .bind(("id", record_id(TABLE, id)))
            .await?;
        let items: Vec<MenuItem> = result.take(0)?;
        Ok(items.into_iter().next())
    }

    /// Find menu item by name
    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<MenuItem>> {
        let mut result = self
            .base
            .db()
            .query("SELECT *, record::id(id) AS id FROM menu_item WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await?;
        let items: Vec<MenuItem> = result.take(0)?;
        Ok(items.into_iter().next())
    }

    /// Create a new menu item
    pub async fn create(&self, data: MenuItemCreate) -> RepoResult<MenuItem> {
        if self.find_by_name(&data.name).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Menu item '{}' already exists",
                data.name
            )));
        }

        let item = MenuItem {
            id: snowflake_id(),
            name: data.name,
            price: data.price,
            is_active: true,
        };

        self.base
            .db()
            .query("CREATE menu_item CONTENT $data RETURN NONE")
            .bind(("data", item.clone()))
            .await?
            .check()?;
        Ok(item)
    }

    /// Update a menu item
    ///
    /// Price edits only affect future orders: placed orders carry their own
    /// `price_at_order` snapshot.
    pub async fn update(&self, id: i64, data: MenuItemUpdate) -> RepoResult<MenuItem> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Menu item {} not found", id)))?;

        if let Some(new_name) = &data.name
            && new_name != &existing.name
            && self.find_by_name(new_name).await?.is_some()
        {
            return Err(RepoError::Duplicate(format!(
                "Menu item '{}' already exists",
                new_name
            )));
        }

        let updated = MenuItem {
            id: existing.id,
            name: data.name.unwrap_or(existing.name),
            price: data.price.unwrap_or(existing.price),
            is_active: data.is_active.unwrap_or(existing.is_active),
        };

        // Merge everything except the record key
        self.base
            .db()
            .query("UPDATE menu_item MERGE $data WHERE id = $id RETURN NONE")
            .bind(("id", record_id(TABLE, id)))
            .bind((
                "data",
                json!({
                    "name": updated.name.clone(),
                    "price": updated.price,
                    "is_active": updated.is_active,
                }),
            ))
            .await?
            .check()?;
        Ok(updated)
    }

    /// Soft-delete a menu item
    pub async fn delete(&self, id: i64) -> RepoResult<bool> {
        if self.find_by_id(id).await?.is_none() {
            return Ok(false);
        }
        self.base
            .db()
            .query("UPDATE menu_item SET is_active = false WHERE id = $id RETURN NONE")
            .bind(("id", record_id(TABLE, id)))
            .await?
            .check()?;
        Ok(true)
    }
}
