//! Re-identification risk assessment for tabular datasets.
//!
//! The engine builds k-anonymity profiles of a dataset under one or more
//! quasi-identifier (QI) sets, classifies every record into a risk tier,
//! and aggregates the outcome into a dataset-level report. A regex-based
//! scanner flags directly identifying values (email addresses, phone
//! numbers, SSNs, credit card numbers) and proposes QI sets from column
//! names.
//!
//! ```
//! use kanon::{assess_dataset, AttrKind, Attribute, Dataset, QiSet, RiskThresholds, Schema, Value};
//!
//! let schema = Schema::new(vec![Attribute::new("city", AttrKind::Text)])?;
//! let rows = ["Boston", "Boston", "Salem"]
//!     .iter()
//!     .map(|city| vec![Value::Text(city.to_string())])
//!     .collect();
//! let dataset = Dataset::new(schema, rows)?;
//!
//! let qi_sets = [QiSet::new(["city"])?];
//! let (risks, report) = assess_dataset(&dataset, &qi_sets, RiskThresholds::default())?;
//! assert_eq!(risks[0].k, 2);
//! assert_eq!(report.unique_records, vec![2]);
//! # Ok::<(), kanon::Error>(())
//! ```

pub mod anonymity;
pub mod data;
pub mod detect;
pub mod engine;
pub mod error;
pub mod io;
pub mod report;
pub mod risk;

pub use data::{AttrKind, Attribute, Dataset, QiSet, Schema, Value};
pub use engine::{assess_dataset, top_high_risk, QiAssessment, RecordRisk};
pub use error::{ConfigurationError, Error, InvariantViolation, Result};
pub use report::{QiSetSummary, RiskReport};
pub use risk::{RiskThresholds, RiskTier};
