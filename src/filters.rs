// src/filters.rs - Filter/sort pipeline over the product collection
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::expiration::{nearest_diff_days, nearest_expiration, WARNING_WINDOW_DAYS};
use crate::models::Product;

/// Sentinel accepted by the category and window selectors.
pub const ALL: &str = "ALL";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOption {
    #[default]
    ExpirationAsc,
    ExpirationDesc,
    NameAsc,
    BrandAsc,
    AddedDateDesc,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterStatus {
    #[default]
    All,
    Expired,
    Warning,
    Good,
}

/// Compound criteria applied to a listing request. Unknown selector values
/// fall back to the defaults rather than erroring, mirroring how the sort
/// whitelist behaves elsewhere in the API.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    /// Upper bound in days; `None` means unbounded.
    pub window: Option<i64>,
    pub status: FilterStatus,
    pub sort: SortOption,
}

impl ProductFilter {
    pub fn from_params(
        search: Option<&str>,
        category: Option<&str>,
        window: Option<&str>,
        status: Option<&str>,
        sort: Option<&str>,
    ) -> Self {
        Self {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            category: category
                .map(str::trim)
                .filter(|c| !c.is_empty() && *c != ALL)
                .map(str::to_string),
            window: window.and_then(parse_window),
            status: status
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            sort: sort.and_then(|s| s.parse().ok()).unwrap_or_default(),
        }
    }
}

fn parse_window(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == ALL {
        return None;
    }
    raw.parse::<i64>().ok().filter(|days| *days > 0)
}

fn matches_search(product: &Product, query: &str) -> bool {
    let q = query.to_lowercase();
    product.name.to_lowercase().contains(&q)
        || product
            .barcode
            .as_deref()
            .map(|b| b.contains(&q))
            .unwrap_or(false)
        || product
            .brand
            .as_deref()
            .map(|b| b.to_lowercase().contains(&q))
            .unwrap_or(false)
}

fn matches_status(diff_days: Option<i64>, status: FilterStatus) -> bool {
    match (status, diff_days) {
        (FilterStatus::All, _) => true,
        // Zero-batch products have no expiration and are excluded from
        // every date-bounded selection.
        (_, None) => false,
        (FilterStatus::Expired, Some(diff)) => diff < 0,
        (FilterStatus::Warning, Some(diff)) => (0..=WARNING_WINDOW_DAYS).contains(&diff),
        (FilterStatus::Good, Some(diff)) => diff > WARNING_WINDOW_DAYS,
    }
}

fn matches_window(diff_days: Option<i64>, window: Option<i64>) -> bool {
    match window {
        None => true,
        // A finite window also drops already-expired products, even when the
        // status selector asks for EXPIRED; the two filters are ANDed.
        Some(max) => matches!(diff_days, Some(diff) if diff >= 0 && diff <= max),
    }
}

/// Applies search, category, urgency-window and status filters, then orders
/// the survivors. Pure: same inputs produce the same output list, and the
/// input collection is never mutated.
pub fn apply(products: &[Product], filter: &ProductFilter, today: NaiveDate) -> Vec<Product> {
    let mut result: Vec<Product> = products
        .iter()
        .filter(|p| {
            filter
                .search
                .as_deref()
                .map(|q| matches_search(p, q))
                .unwrap_or(true)
        })
        .filter(|p| {
            filter
                .category
                .as_deref()
                .map(|c| p.category.as_deref() == Some(c))
                .unwrap_or(true)
        })
        .filter(|p| {
            let diff = nearest_diff_days(p, today);
            matches_window(diff, filter.window) && matches_status(diff, filter.status)
        })
        .cloned()
        .collect();

    sort_products(&mut result, filter.sort);
    result
}

fn sort_products(products: &mut [Product], sort: SortOption) {
    match sort {
        SortOption::ExpirationAsc => {
            products.sort_by_key(|p| nearest_expiration(p).unwrap_or(NaiveDate::MAX));
        }
        SortOption::ExpirationDesc => {
            products.sort_by(|a, b| {
                let ka = nearest_expiration(a).unwrap_or(NaiveDate::MAX);
                let kb = nearest_expiration(b).unwrap_or(NaiveDate::MAX);
                kb.cmp(&ka)
            });
        }
        SortOption::NameAsc => {
            products.sort_by(|a, b| {
                (a.name.to_lowercase(), &a.name).cmp(&(b.name.to_lowercase(), &b.name))
            });
        }
        SortOption::BrandAsc => {
            products.sort_by(|a, b| {
                let ka = a.brand.as_deref().unwrap_or("").to_lowercase();
                let kb = b.brand.as_deref().unwrap_or("").to_lowercase();
                ka.cmp(&kb)
            });
        }
        SortOption::AddedDateDesc => {
            products.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        }
    }
}
