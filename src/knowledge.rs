// src/knowledge.rs - Built-in barcode knowledge base
//
// Seed entries that are always available regardless of what the user has
// saved locally. User memory wins on conflict.
use lazy_static::lazy_static;

use crate::models::{BarcodeEntry, BarcodeMemory};

lazy_static! {
    pub static ref PREDEFINED_BARCODES: BarcodeMemory = {
        let mut seed = BarcodeMemory::new();
        seed.insert(
            "7891000053508".to_string(),
            BarcodeEntry {
                name: "Leite Condensado Moça".to_string(),
                brand: Some("Nestlé".to_string()),
                category: "Mercearia Doce".to_string(),
            },
        );
        seed.insert(
            "7891000100103".to_string(),
            BarcodeEntry {
                name: "Cereal Nescau".to_string(),
                brand: Some("Nestlé".to_string()),
                category: "Matinal".to_string(),
            },
        );
        seed.insert(
            "7894900011517".to_string(),
            BarcodeEntry {
                name: "Coca-Cola 2L".to_string(),
                brand: Some("Coca-Cola".to_string()),
                category: "Bebidas".to_string(),
            },
        );
        seed
    };
}

/// Resolves a barcode against user memory first, then the seed map.
pub fn resolve(code: &str, user_memory: &BarcodeMemory) -> Option<BarcodeEntry> {
    user_memory
        .get(code)
        .or_else(|| PREDEFINED_BARCODES.get(code))
        .cloned()
}

/// Seed map with the user's memory layered on top.
pub fn effective_memory(user_memory: &BarcodeMemory) -> BarcodeMemory {
    let mut merged = PREDEFINED_BARCODES.clone();
    merged.extend(user_memory.clone());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_memory_wins_over_seed() {
        let mut user = BarcodeMemory::new();
        user.insert(
            "7894900011517".to_string(),
            BarcodeEntry {
                name: "Soda 2L".to_string(),
                brand: None,
                category: "Drinks".to_string(),
            },
        );

        assert_eq!(resolve("7894900011517", &user).unwrap().name, "Soda 2L");
        assert_eq!(
            resolve("7891000100103", &user).unwrap().name,
            "Cereal Nescau"
        );
        assert_eq!(resolve("0000", &user), None);

        let merged = effective_memory(&user);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("7894900011517").unwrap().name, "Soda 2L");
    }
}
