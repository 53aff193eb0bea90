//! # Accepted Product Catalog
//!
//! Maps medicinal product identifiers to the number of doses the product's
//! standard schedule requires. The calculator uses it for two decisions:
//! whether a completed series is a single-dose series (grace period
//! applies), and whether the issuer recorded fewer doses than the product
//! normally needs, which marks a combined past-infection schedule.
//!
//! The catalog is normally published by the distribution backend as a
//! value set; [`ProductCatalog::eu_default`] ships the authorized products
//! for offline use and tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use covcert_core::VaccinationEntry;

use crate::error::ValidityError;

/// One accepted vaccine product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedProduct {
    /// Medicinal product identifier.
    pub code: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Doses required by the standard schedule.
    pub total_doses: u32,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    products: Vec<AcceptedProduct>,
}

/// Lookup table of accepted products keyed by product code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    products: HashMap<String, AcceptedProduct>,
}

impl ProductCatalog {
    /// Build a catalog from products. Later duplicates replace earlier ones.
    pub fn new(products: impl IntoIterator<Item = AcceptedProduct>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|p| (p.code.clone(), p))
                .collect(),
        }
    }

    /// The products authorized in the EU with their standard schedules.
    pub fn eu_default() -> Self {
        let entry = |code: &str, name: &str, total_doses: u32| AcceptedProduct {
            code: code.to_string(),
            name: Some(name.to_string()),
            total_doses,
        };
        Self::new([
            entry("EU/1/20/1528", "Comirnaty", 2),
            entry("EU/1/20/1507", "Spikevax", 2),
            entry("EU/1/21/1529", "Vaxzevria", 2),
            entry("EU/1/20/1525", "COVID-19 Vaccine Janssen", 1),
            entry("EU/1/21/1618", "Nuvaxovid", 2),
            entry("CoronaVac", "CoronaVac", 2),
            entry("BBIBP-CorV", "Covilo", 2),
            entry("Covishield", "Covishield", 2),
        ])
    }

    /// Parse a catalog document: `{"products": [{"code", "name", "total_doses"}]}`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidityError::InvalidCatalog`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ValidityError> {
        let doc: CatalogDocument =
            serde_json::from_str(json).map_err(|e| ValidityError::InvalidCatalog(e.to_string()))?;
        Ok(Self::new(doc.products))
    }

    /// Look up a product.
    pub fn get(&self, code: &str) -> Option<&AcceptedProduct> {
        self.products.get(code)
    }

    /// Doses the product's standard schedule requires.
    pub fn total_doses(&self, code: &str) -> Option<u32> {
        self.get(code).map(|p| p.total_doses)
    }

    /// Whether the record indicates a reduced schedule after past infection:
    /// the product normally needs more doses than the issuer recorded.
    ///
    /// Unknown products are never treated as past infection.
    pub fn had_past_infection(&self, entry: &VaccinationEntry) -> bool {
        self.total_doses(&entry.medicinal_product)
            .is_some_and(|total| total > entry.total_doses)
    }

    /// Number of products in the catalog.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
