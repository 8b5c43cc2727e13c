//! Units
//!
//! A rentable space inside a building. `status` is driven by contracts:
//! activating a contract marks the unit occupied, terminating or expiring
//! the last active contract frees it again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "unit_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Apartment,
    Office,
    Retail,
    Parking,
    Storage,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Apartment => "apartment",
            UnitKind::Office => "office",
            UnitKind::Retail => "retail",
            UnitKind::Parking => "parking",
            UnitKind::Storage => "storage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "unit_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Available,
    Occupied,
    Maintenance,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Occupied => "occupied",
            UnitStatus::Maintenance => "maintenance",
        }
    }
}

const COLUMNS: &str = "id, company_id, building_id, code, kind, floor, area_m2, bedrooms, \
                       monthly_rent, status, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Unit {
    pub id: Uuid,
    pub company_id: Uuid,
    pub building_id: Uuid,

    /// Door or reference code, unique within the building
    pub code: String,

    pub kind: UnitKind,
    pub floor: Option<i32>,
    pub area_m2: Option<Decimal>,
    pub bedrooms: Option<i32>,
    pub monthly_rent: Decimal,
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUnit {
    pub building_id: Uuid,

    #[validate(length(min = 1, max = 64, message = "Code must be 1-64 characters"))]
    pub code: String,

    #[serde(default = "default_kind")]
    pub kind: UnitKind,

    pub floor: Option<i32>,

    #[validate(custom(function = "super::non_negative"))]
    pub area_m2: Option<Decimal>,

    #[validate(range(min = 0, max = 50, message = "Bedrooms must be between 0 and 50"))]
    pub bedrooms: Option<i32>,

    #[serde(default)]
    #[validate(custom(function = "super::non_negative"))]
    pub monthly_rent: Decimal,

    pub status: Option<UnitStatus>,
}

fn default_kind() -> UnitKind {
    UnitKind::Apartment
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUnit {
    pub building_id: Option<Uuid>,

    #[validate(length(min = 1, max = 64, message = "Code must be 1-64 characters"))]
    pub code: Option<String>,

    pub kind: Option<UnitKind>,
    pub floor: Option<i32>,

    #[validate(custom(function = "super::non_negative"))]
    pub area_m2: Option<Decimal>,

    #[validate(range(min = 0, max = 50, message = "Bedrooms must be between 0 and 50"))]
    pub bedrooms: Option<i32>,

    #[validate(custom(function = "super::non_negative"))]
    pub monthly_rent: Option<Decimal>,

    pub status: Option<UnitStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitFilter {
    pub building_id: Option<Uuid>,
    pub status: Option<UnitStatus>,
}

impl Unit {
    pub async fn create(pool: &PgPool, company_id: Uuid, data: CreateUnit) -> Result<Self, sqlx::Error> {
        let status = data.status.unwrap_or(UnitStatus::Available);

        sqlx::query_as::<_, Unit>(&format!(
            "INSERT INTO units (company_id, building_id, code, kind, floor, area_m2, bedrooms, monthly_rent, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        ))
        .bind(company_id)
        .bind(data.building_id)
        .bind(data.code)
        .bind(data.kind)
        .bind(data.floor)
        .bind(data.area_m2)
        .bind(data.bedrooms)
        .bind(data.monthly_rent)
        .bind(status)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!("SELECT {COLUMNS} FROM units WHERE id = $1 AND company_id = $2"))
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &UnitFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM units WHERE company_id = "));
        qb.push_bind(company_id);

        if let Some(building_id) = filter.building_id {
            qb.push(" AND building_id = ").push_bind(building_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }

        qb.push(" ORDER BY code ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<Unit>().fetch_all(pool).await
    }

    /// Every unit of the company, for dashboard aggregation.
    pub async fn all_for_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Unit>(&format!("SELECT {COLUMNS} FROM units WHERE company_id = $1"))
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdateUnit,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE units SET updated_at = NOW()");

        if let Some(building_id) = data.building_id {
            qb.push(", building_id = ").push_bind(building_id);
        }
        if let Some(code) = data.code {
            qb.push(", code = ").push_bind(code);
        }
        if let Some(kind) = data.kind {
            qb.push(", kind = ").push_bind(kind);
        }
        if let Some(floor) = data.floor {
            qb.push(", floor = ").push_bind(floor);
        }
        if let Some(area) = data.area_m2 {
            qb.push(", area_m2 = ").push_bind(area);
        }
        if let Some(bedrooms) = data.bedrooms {
            qb.push(", bedrooms = ").push_bind(bedrooms);
        }
        if let Some(rent) = data.monthly_rent {
            qb.push(", monthly_rent = ").push_bind(rent);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(COLUMNS);

        qb.build_query_as::<Unit>().fetch_optional(pool).await
    }

    /// Sets the occupancy status. Runs on any executor so contract
    /// transitions can update the unit in the same transaction.
    pub async fn set_status<'e, E>(
        executor: E,
        company_id: Uuid,
        id: Uuid,
        status: UnitStatus,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE units SET status = $1, updated_at = NOW() WHERE id = $2 AND company_id = $3",
        )
        .bind(status)
        .bind(id)
        .bind(company_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Frees the unit unless another active contract still covers it.
    pub async fn release_if_vacant<'e, E>(executor: E, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE units SET status = 'available', updated_at = NOW()
             WHERE id = $1 AND company_id = $2 AND status = 'occupied'
               AND NOT EXISTS (
                   SELECT 1 FROM contracts c
                   WHERE c.unit_id = units.id AND c.status = 'active'
               )",
        )
        .bind(id)
        .bind(company_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM units WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
