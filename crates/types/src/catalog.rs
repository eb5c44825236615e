//! Purchasable item catalog.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A purchasable item and its price in coins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub price: u64,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, price: u64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Static, read-only list of items, loaded once at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog, rejecting entries the API could not route.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let catalog = Self { entries };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check item names are non-empty, path-safe and unique.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if entry.name.is_empty() {
                return Err(CatalogError::EmptyName);
            }
            if entry.name.contains('/') {
                return Err(CatalogError::InvalidName(entry.name.clone()));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(CatalogError::DuplicateItem(entry.name.clone()));
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries priced at or below `balance`.
    pub fn affordable(&self, balance: u64) -> impl Iterator<Item = &CatalogEntry> + '_ {
        self.entries.iter().filter(move |e| e.price <= balance)
    }

    /// Pick uniformly among affordable entries.
    pub fn choose_affordable<R: Rng + ?Sized>(
        &self,
        balance: u64,
        rng: &mut R,
    ) -> Option<&CatalogEntry> {
        let affordable: Vec<&CatalogEntry> = self.affordable(balance).collect();
        affordable.choose(rng).copied()
    }
}

impl Default for Catalog {
    /// The shop's merchandise list.
    fn default() -> Self {
        let entries = [
            ("t-shirt", 80),
            ("cup", 20),
            ("book", 50),
            ("pen", 10),
            ("powerbank", 200),
            ("hoody", 300),
            ("umbrella", 200),
            ("socks", 10),
            ("wallet", 50),
            ("pink-hoody", 500),
        ]
        .into_iter()
        .map(|(name, price)| CatalogEntry::new(name, price))
        .collect();

        Self { entries }
    }
}

/// Errors in catalog contents.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog entry has an empty name")]
    EmptyName,

    #[error("Catalog item name is not path-safe: {0}")]
    InvalidName(String),

    #[error("Duplicate catalog item: {0}")]
    DuplicateItem(String),
}
