//! Catalog access behind a provider trait.
//!
//! The dialogue engine only ever reads the catalog, so the trait is a
//! read-only surface. Production backs it with Postgres; [`MemoryCatalog`]
//! backs tests and local development.

use crate::coupon::Coupon;
use crate::error::CatalogError;
use crate::product::Product;
use crate::service::{ServiceCategory, ServiceItem};
use async_trait::async_trait;
use bookline_core::{CategoryId, ProductId, ServiceId, TenantId};
use std::sync::{Arc, RwLock};

/// Read access to a tenant's catalog.
///
/// List methods return only active entries, sorted by `sort_order` with the
/// ID as tie-break. Get methods return inactive entries too; callers decide
/// whether an inactive entry is still acceptable for their operation.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Lists active service categories for a tenant.
    async fn list_categories(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ServiceCategory>, CatalogError>;

    /// Lists active services, optionally restricted to one category.
    async fn list_services(
        &self,
        tenant_id: TenantId,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<ServiceItem>, CatalogError>;

    /// Gets a service by ID.
    async fn get_service(
        &self,
        tenant_id: TenantId,
        id: ServiceId,
    ) -> Result<ServiceItem, CatalogError>;

    /// Lists active products for a tenant.
    async fn list_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, CatalogError>;

    /// Gets a product by ID.
    async fn get_product(&self, tenant_id: TenantId, id: ProductId)
    -> Result<Product, CatalogError>;

    /// Lists active coupons for a tenant.
    ///
    /// Validity-window filtering is left to the caller, which knows what
    /// "today" is for the conversation being served.
    async fn list_coupons(&self, tenant_id: TenantId) -> Result<Vec<Coupon>, CatalogError>;
}

#[derive(Debug, Default)]
struct CatalogState {
    categories: Vec<ServiceCategory>,
    services: Vec<ServiceItem>,
    products: Vec<Product>,
    coupons: Vec<Coupon>,
}

/// In-memory catalog for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a category.
    pub fn add_category(&self, category: ServiceCategory) {
        self.state.write().unwrap().categories.push(category);
    }

    /// Adds a service.
    pub fn add_service(&self, service: ServiceItem) {
        self.state.write().unwrap().services.push(service);
    }

    /// Adds a product.
    pub fn add_product(&self, product: Product) {
        self.state.write().unwrap().products.push(product);
    }

    /// Adds a coupon.
    pub fn add_coupon(&self, coupon: Coupon) {
        self.state.write().unwrap().coupons.push(coupon);
    }
}

impl Clone for MemoryCatalog {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl CatalogProvider for MemoryCatalog {
    async fn list_categories(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ServiceCategory>, CatalogError> {
        let state = self.state.read().unwrap();
        let mut categories: Vec<_> = state
            .categories
            .iter()
            .filter(|c| c.tenant_id == tenant_id && c.active)
            .cloned()
            .collect();
        categories.sort_by_key(|c| (c.sort_order, c.id.as_ulid()));
        Ok(categories)
    }

    async fn list_services(
        &self,
        tenant_id: TenantId,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<ServiceItem>, CatalogError> {
        let state = self.state.read().unwrap();
        let mut services: Vec<_> = state
            .services
            .iter()
            .filter(|s| s.tenant_id == tenant_id && s.active)
            .filter(|s| category_id.is_none() || s.category_id == category_id)
            .cloned()
            .collect();
        services.sort_by_key(|s| (s.sort_order, s.id.as_ulid()));
        Ok(services)
    }

    async fn get_service(
        &self,
        tenant_id: TenantId,
        id: ServiceId,
    ) -> Result<ServiceItem, CatalogError> {
        let state = self.state.read().unwrap();
        state
            .services
            .iter()
            .find(|s| s.tenant_id == tenant_id && s.id == id)
            .cloned()
            .ok_or(CatalogError::ServiceNotFound { tenant_id, id })
    }

    async fn list_products(&self, tenant_id: TenantId) -> Result<Vec<Product>, CatalogError> {
        let state = self.state.read().unwrap();
        let mut products: Vec<_> = state
            .products
            .iter()
            .filter(|p| p.tenant_id == tenant_id && p.active)
            .cloned()
            .collect();
        products.sort_by_key(|p| (p.sort_order, p.id.as_ulid()));
        Ok(products)
    }

    async fn get_product(
        &self,
        tenant_id: TenantId,
        id: ProductId,
    ) -> Result<Product, CatalogError> {
        let state = self.state.read().unwrap();
        state
            .products
            .iter()
            .find(|p| p.tenant_id == tenant_id && p.id == id)
            .cloned()
            .ok_or(CatalogError::ProductNotFound { tenant_id, id })
    }

    async fn list_coupons(&self, tenant_id: TenantId) -> Result<Vec<Coupon>, CatalogError> {
        let state = self.state.read().unwrap();
        let mut coupons: Vec<_> = state
            .coupons
            .iter()
            .filter(|c| c.tenant_id == tenant_id && c.active)
            .cloned()
            .collect();
        coupons.sort_by_key(|c| (c.sort_order, c.id.as_ulid()));
        Ok(coupons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn seeded_catalog() -> (MemoryCatalog, TenantId, CategoryId) {
        let catalog = MemoryCatalog::new();
        let tenant_id = TenantId::new();

        let category = ServiceCategory::new(tenant_id, "Hair").with_sort_order(1);
        let category_id = category.id;
        catalog.add_category(category);

        catalog.add_service(
            ServiceItem::new(tenant_id, "Cut", 30, 3000)
                .in_category(category_id)
                .with_sort_order(2),
        );
        catalog.add_service(
            ServiceItem::new(tenant_id, "Color", 90, 8000)
                .in_category(category_id)
                .with_sort_order(1),
        );

        (catalog, tenant_id, category_id)
    }

    #[tokio::test]
    async fn services_sorted_by_sort_order() {
        let (catalog, tenant_id, category_id) = seeded_catalog();

        let services = catalog
            .list_services(tenant_id, Some(category_id))
            .await
            .expect("list");
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "Color");
        assert_eq!(services[1].name, "Cut");
    }

    #[tokio::test]
    async fn listing_without_category_returns_all() {
        let (catalog, tenant_id, _category_id) = seeded_catalog();
        catalog.add_service(ServiceItem::new(tenant_id, "Quick trim", 15, 1500));

        let services = catalog
            .list_services(tenant_id, None)
            .await
            .expect("list");
        assert_eq!(services.len(), 3);
    }

    #[tokio::test]
    async fn inactive_services_hidden_from_lists() {
        let (catalog, tenant_id, category_id) = seeded_catalog();

        let mut retired = ServiceItem::new(tenant_id, "Perm", 120, 12000).in_category(category_id);
        retired.active = false;
        let retired_id = retired.id;
        catalog.add_service(retired);

        let services = catalog
            .list_services(tenant_id, Some(category_id))
            .await
            .expect("list");
        assert!(services.iter().all(|s| s.id != retired_id));

        // But direct lookup still finds it.
        let found = catalog
            .get_service(tenant_id, retired_id)
            .await
            .expect("get");
        assert!(!found.active);
    }

    #[tokio::test]
    async fn tenants_cannot_see_each_other() {
        let (catalog, tenant_id, category_id) = seeded_catalog();
        let other_tenant = TenantId::new();

        let services = catalog
            .list_services(other_tenant, Some(category_id))
            .await
            .expect("list");
        assert!(services.is_empty());

        let service_id = catalog
            .list_services(tenant_id, Some(category_id))
            .await
            .expect("list")[0]
            .id;
        let result = catalog.get_service(other_tenant, service_id).await;
        assert!(matches!(
            result,
            Err(CatalogError::ServiceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn coupons_listed_for_tenant() {
        let catalog = MemoryCatalog::new();
        let tenant_id = TenantId::new();
        let from = NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
        let until = NaiveDate::from_ymd_opt(2025, 6, 30).expect("date");
        catalog.add_coupon(Coupon::new(tenant_id, "June special", from, until));

        let coupons = catalog.list_coupons(tenant_id).await.expect("list");
        assert_eq!(coupons.len(), 1);
        assert_eq!(coupons[0].title, "June special");
    }

}
