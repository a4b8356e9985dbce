// src/inventory.rs - Application state container
//
// The product collection and barcode memory form one value. Mutations are
// pure: each update function returns a new Inventory and leaves the input
// untouched; persisting the result is the caller's explicit step.
use chrono::NaiveDate;

use crate::expiration;
use crate::models::{
    BarcodeEntry, BarcodeMemory, DashboardStats, Product, DEFAULT_CATEGORY,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub products: Vec<Product>,
    pub barcode_db: BarcodeMemory,
}

/// Outcome of removing a single batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRemoval {
    NotFound,
    Removed,
    /// The batch was the product's last one; the product is gone too.
    ProductRemoved,
}

impl Inventory {
    pub fn from_snapshot(products: Vec<Product>, barcode_db: BarcodeMemory) -> Self {
        Self {
            products,
            barcode_db,
        }
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Inserts or replaces a product by id, and remembers its barcode when
    /// one is present.
    pub fn with_product(&self, product: Product) -> Inventory {
        let mut next = self.clone();
        match next.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product.clone(),
            None => next.products.push(product.clone()),
        }
        next.remember_barcode(&product);
        next
    }

    pub fn without_product(&self, id: &str) -> (Inventory, bool) {
        let mut next = self.clone();
        let before = next.products.len();
        next.products.retain(|p| p.id != id);
        let removed = next.products.len() < before;
        (next, removed)
    }

    pub fn without_batch(&self, product_id: &str, batch_id: &str) -> (Inventory, BatchRemoval) {
        let mut next = self.clone();
        let Some(product) = next.products.iter_mut().find(|p| p.id == product_id) else {
            return (next, BatchRemoval::NotFound);
        };

        let before = product.batches.len();
        product.batches.retain(|b| b.id != batch_id);
        if product.batches.len() == before {
            return (next, BatchRemoval::NotFound);
        }

        if product.batches.is_empty() {
            // A product with zero remaining batches is invalid and leaves
            // the collection entirely.
            next.products.retain(|p| p.id != product_id);
            (next, BatchRemoval::ProductRemoved)
        } else {
            (next, BatchRemoval::Removed)
        }
    }

    pub fn cleared() -> Inventory {
        Inventory::default()
    }

    fn remember_barcode(&mut self, product: &Product) {
        let Some(barcode) = product.barcode.as_deref() else {
            return;
        };
        if barcode.trim().is_empty() {
            return;
        }
        self.barcode_db.insert(
            barcode.to_string(),
            BarcodeEntry {
                name: product.name.clone(),
                brand: product.brand.clone(),
                category: product
                    .category
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            },
        );
    }

    /// Distinct categories across the collection, sorted for stable output.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .products
            .iter()
            .filter_map(|p| p.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn stats(&self, today: NaiveDate) -> DashboardStats {
        DashboardStats {
            total_products: self.products.len() as i64,
            total_batches: self.products.iter().map(|p| p.batches.len() as i64).sum(),
            warning_products: self
                .products
                .iter()
                .filter(|p| expiration::counts_as_warning(p, today))
                .count() as i64,
            expired_products: self
                .products
                .iter()
                .filter(|p| expiration::has_expired_batch(p, today))
                .count() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Batch;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn batch(expiration: &str, quantity: u32) -> Batch {
        Batch {
            id: uuid::Uuid::new_v4().to_string(),
            expiration_date: date(expiration),
            quantity,
            lot_number: None,
        }
    }

    fn product(name: &str, barcode: Option<&str>, batches: Vec<Batch>) -> Product {
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            brand: Some("Acme".to_string()),
            barcode: barcode.map(str::to_string),
            category: None,
            image_url: None,
            added_at: Utc::now(),
            batches,
        }
    }

    #[test]
    fn test_with_product_inserts_and_replaces() {
        let inv = Inventory::default();
        let mut p = product("Milk", None, vec![batch("2024-02-01", 1)]);
        let inv = inv.with_product(p.clone());
        assert_eq!(inv.products.len(), 1);

        p.name = "Whole milk".to_string();
        let inv = inv.with_product(p.clone());
        assert_eq!(inv.products.len(), 1);
        assert_eq!(inv.products[0].name, "Whole milk");
    }

    #[test]
    fn test_saving_with_barcode_populates_memory() {
        let inv = Inventory::default();
        let p = product("Milk", Some("123"), vec![batch("2024-02-01", 1)]);
        let inv = inv.with_product(p);

        let entry = inv.barcode_db.get("123").unwrap();
        assert_eq!(entry.name, "Milk");
        assert_eq!(entry.brand.as_deref(), Some("Acme"));
        // No category on the product: the memory falls back to the default.
        assert_eq!(entry.category, DEFAULT_CATEGORY);

        // Blank barcodes are not remembered.
        let blank = product("Rice", Some("  "), vec![batch("2025-01-01", 1)]);
        let inv = inv.with_product(blank);
        assert_eq!(inv.barcode_db.len(), 1);
    }

    #[test]
    fn test_deleting_last_batch_removes_product() {
        let p = product("Milk", None, vec![batch("2024-02-01", 1)]);
        let product_id = p.id.clone();
        let batch_id = p.batches[0].id.clone();
        let inv = Inventory::default().with_product(p);

        let (inv, outcome) = inv.without_batch(&product_id, &batch_id);
        assert_eq!(outcome, BatchRemoval::ProductRemoved);
        assert!(inv.products.is_empty());
    }

    #[test]
    fn test_deleting_one_of_many_batches_keeps_product() {
        let p = product(
            "Milk",
            None,
            vec![batch("2024-02-01", 1), batch("2024-03-01", 2)],
        );
        let product_id = p.id.clone();
        let batch_id = p.batches[0].id.clone();
        let inv = Inventory::default().with_product(p);

        let (inv, outcome) = inv.without_batch(&product_id, &batch_id);
        assert_eq!(outcome, BatchRemoval::Removed);
        assert_eq!(inv.products[0].batches.len(), 1);

        let (_, outcome) = inv.without_batch(&product_id, "missing");
        assert_eq!(outcome, BatchRemoval::NotFound);
    }

    #[test]
    fn test_updates_do_not_mutate_input() {
        let p = product("Milk", None, vec![batch("2024-02-01", 1)]);
        let id = p.id.clone();
        let original = Inventory::default().with_product(p);

        let (_, removed) = original.without_product(&id);
        assert!(removed);
        assert_eq!(original.products.len(), 1);
    }

    #[test]
    fn test_stats_warning_suppression() {
        let today = date("2024-01-06");
        let expired = product(
            "Old milk",
            None,
            vec![batch("2024-01-05", 1), batch("2024-01-08", 1)],
        );
        let warning = product("Yogurt", None, vec![batch("2024-01-10", 1)]);
        let good = product("Rice", None, vec![batch("2025-01-01", 1)]);

        let inv = Inventory::default()
            .with_product(expired)
            .with_product(warning)
            .with_product(good);

        let stats = inv.stats(today);
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.total_batches, 4);
        // The expired product also has a batch in the warning window, but an
        // expired batch suppresses the warning count.
        assert_eq!(stats.warning_products, 1);
        assert_eq!(stats.expired_products, 1);
    }

    #[test]
    fn test_categories_are_distinct_and_sorted() {
        let mut a = product("Milk", None, vec![batch("2024-02-01", 1)]);
        a.category = Some("Dairy".to_string());
        let mut b = product("Yogurt", None, vec![batch("2024-02-01", 1)]);
        b.category = Some("Dairy".to_string());
        let mut c = product("Beans", None, vec![batch("2024-02-01", 1)]);
        c.category = Some("Pantry".to_string());

        let inv = Inventory::default()
            .with_product(c)
            .with_product(a)
            .with_product(b);
        assert_eq!(inv.categories(), vec!["Dairy", "Pantry"]);
    }
}
