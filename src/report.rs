//! Dataset-level risk report: per-tier counts, k statistics, and per-QI-set
//! summaries.
//!
//! Numeric fields are stored unrounded; rounding happens only when the
//! report is rendered. A zero-row input produces a report with every count
//! and statistic at zero and `empty_dataset` set, never a NaN.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::engine::{QiAssessment, RecordRisk};
use crate::risk::RiskTier;

/// Aggregate view of one evaluated QI set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QiSetSummary {
    /// Attribute names of the set, in set order.
    pub attributes: Vec<String>,
    /// Smallest equivalence-class size under this set.
    pub min_k: usize,
    /// Number of distinct value tuples.
    pub class_count: usize,
    /// k value to number of records holding it, smallest k first.
    pub k_distribution: BTreeMap<usize, usize>,
}

impl QiSetSummary {
    fn from_assessment(assessment: &QiAssessment) -> Self {
        let mut k_distribution = BTreeMap::new();
        for &k in &assessment.per_record_k {
            *k_distribution.entry(k).or_insert(0) += 1;
        }
        QiSetSummary {
            attributes: assessment.attributes.clone(),
            min_k: assessment.min_k,
            class_count: assessment.class_count,
            k_distribution,
        }
    }

    /// Attribute names joined with `+`.
    pub fn label(&self) -> String {
        self.attributes.join("+")
    }
}

/// Dataset-level summary of a completed assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    pub total_records: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub high_percentage: f64,
    pub medium_percentage: f64,
    pub low_percentage: f64,
    /// Mean effective k across all records, 0.0 when there are none.
    pub average_k: f64,
    /// Smallest effective k across all records, 0 when there are none.
    pub min_k: usize,
    /// Row indices with effective k = 1.
    pub unique_records: Vec<usize>,
    /// Row indices with effective k in 2..=5.
    pub rare_records: Vec<usize>,
    /// Row indices with effective k > 10.
    pub safe_records: Vec<usize>,
    /// True when the assessed dataset had no rows.
    pub empty_dataset: bool,
    pub qi_sets: Vec<QiSetSummary>,
}

/// Aggregate per-record results and per-set assessments into a report.
pub fn build_report(risks: &[RecordRisk], assessments: &[QiAssessment]) -> RiskReport {
    let total = risks.len();

    let mut high_count = 0;
    let mut medium_count = 0;
    let mut low_count = 0;
    for risk in risks {
        match risk.tier {
            RiskTier::High => high_count += 1,
            RiskTier::Medium => medium_count += 1,
            RiskTier::Low => low_count += 1,
        }
    }

    let percentage = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        }
    };
    let average_k = if total == 0 {
        0.0
    } else {
        risks.iter().map(|r| r.k).sum::<usize>() as f64 / total as f64
    };
    let min_k = risks.iter().map(|r| r.k).min().unwrap_or(0);

    let unique_records = risks.iter().filter(|r| r.k == 1).map(|r| r.row).collect();
    let rare_records = risks
        .iter()
        .filter(|r| (2..=5).contains(&r.k))
        .map(|r| r.row)
        .collect();
    let safe_records = risks.iter().filter(|r| r.k > 10).map(|r| r.row).collect();

    RiskReport {
        total_records: total,
        high_count,
        medium_count,
        low_count,
        high_percentage: percentage(high_count),
        medium_percentage: percentage(medium_count),
        low_percentage: percentage(low_count),
        average_k,
        min_k,
        unique_records,
        rare_records,
        safe_records,
        empty_dataset: total == 0,
        qi_sets: assessments.iter().map(QiSetSummary::from_assessment).collect(),
    }
}

impl fmt::Display for RiskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RISK ASSESSMENT SUMMARY")?;
        writeln!(f, "{}", "-".repeat(70))?;
        writeln!(f, "  Total Records: {}", self.total_records)?;
        if self.empty_dataset {
            writeln!(f, "  Dataset contains no records.")?;
            return Ok(());
        }
        writeln!(f)?;
        writeln!(
            f,
            "  High Risk:   {:4} ({:5.1}%)",
            self.high_count, self.high_percentage
        )?;
        writeln!(
            f,
            "  Medium Risk: {:4} ({:5.1}%)",
            self.medium_count, self.medium_percentage
        )?;
        writeln!(
            f,
            "  Low Risk:    {:4} ({:5.1}%)",
            self.low_count, self.low_percentage
        )?;
        writeln!(f)?;
        writeln!(f, "  K-Anonymity Statistics:")?;
        writeln!(f, "    Average k: {:.2}", self.average_k)?;
        writeln!(f, "    Minimum k: {}", self.min_k)?;
        writeln!(f)?;
        writeln!(f, "  Record Classification:")?;
        writeln!(
            f,
            "    Unique records (k=1):    {}",
            self.unique_records.len()
        )?;
        writeln!(f, "    Rare records (k=2-5):    {}", self.rare_records.len())?;
        writeln!(f, "    Safe records (k>10):     {}", self.safe_records.len())?;
        if !self.qi_sets.is_empty() {
            writeln!(f)?;
            writeln!(f, "  QI Sets:")?;
            for summary in &self.qi_sets {
                writeln!(
                    f,
                    "    {}: min k = {}, classes = {}",
                    summary.label(),
                    summary.min_k,
                    summary.class_count
                )?;
            }
        }
        Ok(())
    }
}
