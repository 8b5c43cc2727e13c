//! Service marketplace
//!
//! Providers offer services (cleaning, moving, repairs) that tenants or the
//! company book. Each booking snapshots the service's commission rate so
//! later rate changes do not rewrite past revenue.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl BookingStatus {
    /// Bookings that generate commission
    pub fn is_billable(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }
}

const SERVICE_COLUMNS: &str = "id, company_id, provider_name, name, category, base_price, commission_rate, \
                               active, created_at, updated_at";

const BOOKING_COLUMNS: &str = "id, company_id, service_id, tenant_id, scheduled_for, amount, commission_rate, \
                               status, notes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarketplaceService {
    pub id: Uuid,
    pub company_id: Uuid,
    pub provider_name: String,
    pub name: String,
    pub category: String,
    pub base_price: Decimal,

    /// Percentage retained on each booking, `0..=100`
    pub commission_rate: Decimal,

    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_commission_rate() -> Decimal {
    Decimal::TEN
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateService {
    #[validate(length(min = 1, max = 255, message = "Provider name must be 1-255 characters"))]
    pub provider_name: String,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 64, message = "Category must be 1-64 characters"))]
    pub category: String,

    #[validate(custom(function = "super::non_negative"))]
    pub base_price: Decimal,

    #[serde(default = "default_commission_rate")]
    #[validate(custom(function = "super::percentage"))]
    pub commission_rate: Decimal,

    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateService {
    #[validate(length(min = 1, max = 255, message = "Provider name must be 1-255 characters"))]
    pub provider_name: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 64, message = "Category must be 1-64 characters"))]
    pub category: Option<String>,

    #[validate(custom(function = "super::non_negative"))]
    pub base_price: Option<Decimal>,

    #[validate(custom(function = "super::percentage"))]
    pub commission_rate: Option<Decimal>,

    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceFilter {
    pub category: Option<String>,
    pub active: Option<bool>,
}

impl MarketplaceService {
    pub async fn create(pool: &PgPool, company_id: Uuid, data: CreateService) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MarketplaceService>(&format!(
            "INSERT INTO marketplace_services (company_id, provider_name, name, category, base_price, commission_rate, active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(company_id)
        .bind(data.provider_name)
        .bind(data.name)
        .bind(data.category)
        .bind(data.base_price)
        .bind(data.commission_rate)
        .bind(data.active)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MarketplaceService>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM marketplace_services WHERE id = $1 AND company_id = $2"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SERVICE_COLUMNS} FROM marketplace_services WHERE company_id = "
        ));
        qb.push_bind(company_id);

        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(active) = filter.active {
            qb.push(" AND active = ").push_bind(active);
        }

        qb.push(" ORDER BY category ASC, name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<MarketplaceService>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdateService,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE marketplace_services SET updated_at = NOW()");

        if let Some(provider_name) = data.provider_name {
            qb.push(", provider_name = ").push_bind(provider_name);
        }
        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(category) = data.category {
            qb.push(", category = ").push_bind(category);
        }
        if let Some(base_price) = data.base_price {
            qb.push(", base_price = ").push_bind(base_price);
        }
        if let Some(rate) = data.commission_rate {
            qb.push(", commission_rate = ").push_bind(rate);
        }
        if let Some(active) = data.active {
            qb.push(", active = ").push_bind(active);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(SERVICE_COLUMNS);

        qb.build_query_as::<MarketplaceService>().fetch_optional(pool).await
    }

    /// Fails with a foreign key violation while bookings reference the service.
    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM marketplace_services WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarketplaceBooking {
    pub id: Uuid,
    pub company_id: Uuid,
    pub service_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub amount: Decimal,

    /// Copied from the service when the booking was made
    pub commission_rate: Decimal,

    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBooking {
    pub service_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,

    /// Defaults to the service's base price
    #[validate(custom(function = "super::non_negative"))]
    pub amount: Option<Decimal>,

    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBooking {
    pub scheduled_for: Option<DateTime<Utc>>,

    #[validate(custom(function = "super::non_negative"))]
    pub amount: Option<Decimal>,

    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub service_id: Option<Uuid>,
}

/// A booking joined with the service fields commission reports group by.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingLine {
    pub booking_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub amount: Decimal,
    pub commission_rate: Decimal,
    pub status: BookingStatus,
    pub category: String,
    pub provider_name: String,
}

impl MarketplaceBooking {
    /// Inserts a booking priced from `service`: the commission rate is always
    /// the service's current rate, the amount falls back to its base price.
    pub async fn create(
        pool: &PgPool,
        company_id: Uuid,
        service: &MarketplaceService,
        data: CreateBooking,
    ) -> Result<Self, sqlx::Error> {
        let amount = data.amount.unwrap_or(service.base_price);
        let status = data.status.unwrap_or(BookingStatus::Pending);

        sqlx::query_as::<_, MarketplaceBooking>(&format!(
            "INSERT INTO marketplace_bookings
                 (company_id, service_id, tenant_id, scheduled_for, amount, commission_rate, status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(company_id)
        .bind(service.id)
        .bind(data.tenant_id)
        .bind(data.scheduled_for)
        .bind(amount)
        .bind(service.commission_rate)
        .bind(status)
        .bind(data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MarketplaceBooking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM marketplace_bookings WHERE id = $1 AND company_id = $2"
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        company_id: Uuid,
        filter: &BookingFilter,
        page: Pagination,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {BOOKING_COLUMNS} FROM marketplace_bookings WHERE company_id = "
        ));
        qb.push_bind(company_id);

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(service_id) = filter.service_id {
            qb.push(" AND service_id = ").push_bind(service_id);
        }

        qb.push(" ORDER BY scheduled_for DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        qb.build_query_as::<MarketplaceBooking>().fetch_all(pool).await
    }

    /// Booking lines scheduled in `[from, to]` (inclusive dates), any status.
    pub async fn lines_between(
        pool: &PgPool,
        company_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<BookingLine>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT b.id AS booking_id, b.scheduled_for, b.amount, b.commission_rate, b.status, \
                    s.category, s.provider_name \
             FROM marketplace_bookings b \
             JOIN marketplace_services s ON s.id = b.service_id \
             WHERE b.company_id = ",
        );
        qb.push_bind(company_id);

        if let Some(from) = from {
            qb.push(" AND b.scheduled_for::date >= ").push_bind(from);
        }
        if let Some(to) = to {
            qb.push(" AND b.scheduled_for::date <= ").push_bind(to);
        }

        qb.push(" ORDER BY b.scheduled_for ASC");

        qb.build_query_as::<BookingLine>().fetch_all(pool).await
    }

    pub async fn update(
        pool: &PgPool,
        company_id: Uuid,
        id: Uuid,
        data: UpdateBooking,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE marketplace_bookings SET updated_at = NOW()");

        if let Some(scheduled_for) = data.scheduled_for {
            qb.push(", scheduled_for = ").push_bind(scheduled_for);
        }
        if let Some(amount) = data.amount {
            qb.push(", amount = ").push_bind(amount);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(notes) = data.notes {
            qb.push(", notes = ").push_bind(notes);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND company_id = ").push_bind(company_id);
        qb.push(" RETURNING ").push(BOOKING_COLUMNS);

        qb.build_query_as::<MarketplaceBooking>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, company_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM marketplace_bookings WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_defaults() {
        let data: CreateService = serde_json::from_value(serde_json::json!({
            "provider_name": "Limpiezas Sol",
            "name": "Deep clean",
            "category": "cleaning",
            "base_price": "120.00"
        }))
        .unwrap();

        assert_eq!(data.commission_rate, Decimal::TEN);
        assert!(data.active);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_commission_rate_bounds() {
        let data: CreateService = serde_json::from_value(serde_json::json!({
            "provider_name": "Mudanzas Rápidas",
            "name": "Small move",
            "category": "moving",
            "base_price": "300",
            "commission_rate": "150"
        }))
        .unwrap();

        let errors = data.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("commission_rate"));
    }

    #[test]
    fn test_billable_statuses() {
        assert!(BookingStatus::Confirmed.is_billable());
        assert!(BookingStatus::Completed.is_billable());
        assert!(!BookingStatus::Pending.is_billable());
        assert!(!BookingStatus::Cancelled.is_billable());
    }
}
