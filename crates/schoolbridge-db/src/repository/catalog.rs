//! SurrealDB implementation of [`CatalogRepository`].

use schoolbridge_core::error::BridgeResult;
use schoolbridge_core::models::category::Category;
use schoolbridge_core::repository::CatalogRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CategoryRow {
    name: String,
    subcategories: Vec<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            name: row.name,
            subcategories: row.subcategories,
        }
    }
}

/// SurrealDB implementation of the catalog repository.
#[derive(Clone)]
pub struct SurrealCatalogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCatalogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CatalogRepository for SurrealCatalogRepository<C> {
    async fn list(&self) -> BridgeResult<Vec<Category>> {
        let mut result = self
            .db
            .query("SELECT name, subcategories, position FROM category ORDER BY position ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CategoryRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_by_name(&self, name: &str) -> BridgeResult<Category> {
        let mut result = self
            .db
            .query("SELECT name, subcategories FROM category WHERE name = $name")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CategoryRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "category".into(),
            id: name.to_string(),
        })?;

        Ok(row.into())
    }
}
