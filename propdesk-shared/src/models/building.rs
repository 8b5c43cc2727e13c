//! Buildings
//!
//! Top of the portfolio hierarchy: a building groups units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::Pagination;

const COLUMNS: &str =
    "id, company_id, name, address, city, postal_code, year_built, notes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Building {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub year_built: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBuilding {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    pub city: Option<String>,

    #[validate(length(max = 16, message = "Postal code must be at most 16 characters"))]
    pub postal_code: Option<String>,

    #[validate(range(min = 1800, max = 2100, message = "Year built is out of range"))]
    pub year_built: Option<i32>,

    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBuilding {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Address must not be empty"))]
    pub address: Option<String>,

    pub city: Option<String>,

    #[validate(length(max = 16, message = "Postal code must be at most 16 characters"))]
    pub postal_code: Option<String>,

    #[validate(range(min = 1800, max = 2100, message = "Year built is out of range"))]
    pub year_built: Option<i32>,

    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildingFilter {
    pub city: Option<String>,
}

impl Building {
    pub async fn create(pool: &PgPool, company_id: Uuid, data: CreateBuilding) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Building>(&format!(
            "INSERT INTO buildings (company_id, name, address, city, postal_code, year_built, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        ))
        .bind(company_id)
        .bind(data.name)
        .bind(data.address)
        .bind(data.city)
        .bind(data.postal_code)
        .bind(data.year_built)
        .bind(data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Building>(&format!(
            "SELECT {COLUMNS} FROM buildings WHERE id = $1 AND company_id = $2"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &BuildingFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM buildings WHERE company_id = "));
        qb.push_bind(company_id);

        if let Some(city) = &filter.city {
            qb.push(" AND city ILIKE ").push_bind(city.clone());
        }

        qb.push(" ORDER BY name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<Building>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdateBuilding,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE buildings SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(address) = data.address {
            qb.push(", address = ").push_bind(address);
        }
        if let Some(city) = data.city {
            qb.push(", city = ").push_bind(city);
        }
        if let Some(postal_code) = data.postal_code {
            qb.push(", postal_code = ").push_bind(postal_code);
        }
        if let Some(year_built) = data.year_built {
            qb.push(", year_built = ").push_bind(year_built);
        }
        if let Some(notes) = data.notes {
            qb.push(", notes = ").push_bind(notes);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(COLUMNS);

        qb.build_query_as::<Building>().fetch_optional(pool).await
    }

    /// Deleting a building cascades to its units.
    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM buildings WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
