//! Sync stage identifiers and aggregate counts.

use serde::{Deserialize, Serialize};

/// One resource-type synchronization unit within a pipeline run.
///
/// Stages always execute in the order of [`SyncStage::ALL`]: orders resolve
/// customer links against rows written by the customer stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Customers,
    Products,
    Orders,
}

impl SyncStage {
    /// All stages in execution order.
    pub const ALL: [Self; 3] = [Self::Customers, Self::Products, Self::Orders];

    /// Stable lowercase name, used in logs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of upstream records observed per stage.
///
/// A degraded stage reports zero (or the partial number it managed to write).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub customers: usize,
    pub products: usize,
    pub orders: usize,
}

impl SyncCounts {
    /// Set the count for a stage.
    pub const fn record(&mut self, stage: SyncStage, count: usize) {
        match stage {
            SyncStage::Customers => self.customers = count,
            SyncStage::Products => self.products = count,
            SyncStage::Orders => self.orders = count,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert_eq!(
            SyncStage::ALL,
            [SyncStage::Customers, SyncStage::Products, SyncStage::Orders]
        );
    }

    #[test]
    fn test_stage_serde_matches_as_str() {
        for stage in SyncStage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }

    #[test]
    fn test_counts_record() {
        let mut counts = SyncCounts::default();
        counts.record(SyncStage::Products, 3);
        counts.record(SyncStage::Orders, 2);
        assert_eq!(
            counts,
            SyncCounts {
                customers: 0,
                products: 3,
                orders: 2
            }
        );
    }

    #[test]
    fn test_counts_json_shape() {
        let counts = SyncCounts {
            customers: 2,
            products: 1,
            orders: 1,
        };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"customers": 2, "products": 1, "orders": 1})
        );
    }
}
