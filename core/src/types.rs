//! Shared primitive types used across the entire market model.

/// One simulated calendar day.
pub type SimDate = chrono::NaiveDate;

/// Product name as it appears in the catalog (e.g. "Sugar").
pub type ProductName = String;

/// Region name (e.g. "Riyadh").
pub type RegionName = String;

/// Company name (e.g. "National Food Co.").
pub type CompanyName = String;
