//! Postgres catalog repository.

use super::decode_error;
use async_trait::async_trait;
use bookline_catalog::{CatalogError, CatalogProvider, Coupon, Product, ServiceCategory, ServiceItem};
use bookline_core::{CategoryId, CouponId, ProductId, ServiceId, TenantId};
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

#[derive(FromRow)]
struct CategoryRow {
    id: String,
    tenant_id: String,
    name: String,
    sort_order: i32,
    active: bool,
}

impl CategoryRow {
    fn try_into_category(self) -> Result<ServiceCategory, sqlx::Error> {
        Ok(ServiceCategory {
            id: CategoryId::from_str(&self.id)
                .map_err(|e| decode_error("category id", &self.id, e))?,
            tenant_id: TenantId::from_str(&self.tenant_id)
                .map_err(|e| decode_error("tenant id", &self.tenant_id, e))?,
            name: self.name,
            sort_order: self.sort_order,
            active: self.active,
        })
    }
}

#[derive(FromRow)]
struct ServiceRow {
    id: String,
    tenant_id: String,
    category_id: Option<String>,
    name: String,
    description: Option<String>,
    duration_minutes: i32,
    buffer_minutes: i32,
    price: i64,
    requires_staff: bool,
    sort_order: i32,
    active: bool,
}

impl ServiceRow {
    fn try_into_service(self) -> Result<ServiceItem, sqlx::Error> {
        let category_id = match &self.category_id {
            Some(raw) => {
                Some(CategoryId::from_str(raw).map_err(|e| decode_error("category id", raw, e))?)
            }
            None => None,
        };
        Ok(ServiceItem {
            id: ServiceId::from_str(&self.id).map_err(|e| decode_error("service id", &self.id, e))?,
            tenant_id: TenantId::from_str(&self.tenant_id)
                .map_err(|e| decode_error("tenant id", &self.tenant_id, e))?,
            category_id,
            name: self.name,
            description: self.description,
            duration_minutes: u32::try_from(self.duration_minutes)
                .map_err(|e| decode_error("duration", &self.duration_minutes.to_string(), e))?,
            buffer_minutes: u32::try_from(self.buffer_minutes)
                .map_err(|e| decode_error("buffer", &self.buffer_minutes.to_string(), e))?,
            price: self.price,
            requires_staff: self.requires_staff,
            sort_order: self.sort_order,
            active: self.active,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: String,
    tenant_id: String,
    name: String,
    description: Option<String>,
    price: i64,
    stock: i32,
    sort_order: i32,
    active: bool,
}

impl ProductRow {
    fn try_into_product(self) -> Result<Product, sqlx::Error> {
        Ok(Product {
            id: ProductId::from_str(&self.id).map_err(|e| decode_error("product id", &self.id, e))?,
            tenant_id: TenantId::from_str(&self.tenant_id)
                .map_err(|e| decode_error("tenant id", &self.tenant_id, e))?,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: u32::try_from(self.stock)
                .map_err(|e| decode_error("stock", &self.stock.to_string(), e))?,
            sort_order: self.sort_order,
            active: self.active,
        })
    }
}

#[derive(FromRow)]
struct CouponRow {
    id: String,
    tenant_id: String,
    title: String,
    description: Option<String>,
    valid_from: NaiveDate,
    valid_until: NaiveDate,
    sort_order: i32,
    active: bool,
}

impl CouponRow {
    fn try_into_coupon(self) -> Result<Coupon, sqlx::Error> {
        Ok(Coupon {
            id: CouponId::from_str(&self.id).map_err(|e| decode_error("coupon id", &self.id, e))?,
            tenant_id: TenantId::from_str(&self.tenant_id)
                .map_err(|e| decode_error("tenant id", &self.tenant_id, e))?,
            title: self.title,
            description: self.description,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            sort_order: self.sort_order,
            active: self.active,
        })
    }
}

fn storage_failed(e: sqlx::Error) -> CatalogError {
    CatalogError::StorageFailed {
        reason: e.to_string(),
    }
}

/// Catalog repository over Postgres.
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Creates a repository over the connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogProvider for PgCatalog {
    async fn list_categories(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ServiceCategory>, CatalogError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, name, sort_order, active
            FROM service_categories
            WHERE tenant_id = $1 AND active
            ORDER BY sort_order, id
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failed)?;

        rows.into_iter()
            .map(|r| r.try_into_category().map_err(storage_failed))
            .collect()
    }

    async fn list_services(
        &self,
        tenant_id: TenantId,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<ServiceItem>, CatalogError> {
        let rows: Vec<ServiceRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, category_id, name, description, duration_minutes,
                   buffer_minutes, price, requires_staff, sort_order, active
            FROM services
            WHERE tenant_id = $1 AND active
              AND ($2::text IS NULL OR category_id = $2)
            ORDER BY sort_order, id
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(category_id.map(|id| id.to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failed)?;

        rows.into_iter()
            .map(|r| r.try_into_service().map_err(storage_failed))
            .collect()
    }

    async fn get_service(
        &self,
        tenant_id: TenantId,
        id: ServiceId,
    ) -> Result<ServiceItem, CatalogError> {
        let row: Option<ServiceRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, category_id, name, description, duration_minutes,
                   buffer_minutes, price, requires_staff, sort_order, active
            FROM services
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match row {
            Some(r) => r.try_into_service().map_err(storage_failed),
            None => Err(CatalogError::ServiceNotFound { tenant_id, id }),
        }
    }

    async fn list_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, CatalogError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, name, description, price, stock, sort_order, active
            FROM products
            WHERE tenant_id = $1 AND active
            ORDER BY sort_order, id
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failed)?;

        rows.into_iter()
            .map(|r| r.try_into_product().map_err(storage_failed))
            .collect()
    }

    async fn get_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
    ) -> Result<Product, CatalogError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, name, description, price, stock, sort_order, active
            FROM products
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match row {
            Some(r) => r.try_into_product().map_err(storage_failed),
            None => Err(CatalogError::ProductNotFound { tenant_id, id }),
        }
    }

    async fn list_coupons(&self, tenant_id: TenantId) -> Result<Vec<Coupon>, CatalogError> {
        let rows: Vec<CouponRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, title, description, valid_from, valid_until,
                   sort_order, active
            FROM coupons
            WHERE tenant_id = $1 AND active
            ORDER BY sort_order, id
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failed)?;

        rows.into_iter()
            .map(|r| r.try_into_coupon().map_err(storage_failed))
            .collect()
    }
}
