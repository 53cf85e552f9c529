//! Multi-QI-set assessment: the engine entry point.
//!
//! Each QI set is evaluated on its own (partition, then per-record k) and
//! the results are reduced per record to the smallest k observed. An
//! adversary may hold any of the tested attribute combinations, so a
//! record's exposure is bounded by the QI set under which it is least
//! protected. The min-reduction is commutative, so the outcome does not
//! depend on QI-set order, and the whole call is a pure function of its
//! inputs.

use log::info;
use rayon::prelude::*;
use serde::Serialize;

use crate::anonymity::{equivalence_classes, per_record_k};
use crate::data::{Dataset, QiSet};
use crate::error::{ConfigurationError, Result};
use crate::report::{build_report, RiskReport};
use crate::risk::{RiskThresholds, RiskTier};

/// Outcome of evaluating one QI set in isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QiAssessment {
    /// Attribute names of the evaluated set, in set order.
    pub attributes: Vec<String>,
    /// k value per record, in row order.
    pub per_record_k: Vec<usize>,
    /// Smallest equivalence-class size: the set's overall k-anonymity.
    pub min_k: usize,
    /// Number of distinct value tuples observed.
    pub class_count: usize,
}

impl QiAssessment {
    /// Attribute names joined with `+`.
    pub fn label(&self) -> String {
        self.attributes.join("+")
    }
}

/// Effective assessment of one record across all evaluated QI sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordRisk {
    /// Input row index.
    pub row: usize,
    /// Effective k: the smallest k observed for this record.
    pub k: usize,
    /// Tier of the effective k.
    pub tier: RiskTier,
    /// Number of QI sets under which this record is unique (k = 1).
    pub unique_qi_count: usize,
}

/// Evaluate a single QI set: partition the rows, derive per-record k.
pub fn evaluate_qi_set(dataset: &Dataset, qi: &QiSet) -> Result<QiAssessment> {
    let classes = equivalence_classes(dataset, qi)?;
    let class_count = classes.len();
    let (per_record, min_k) = per_record_k(dataset.n_rows(), &classes)?;
    Ok(QiAssessment {
        attributes: qi.attributes().to_vec(),
        per_record_k: per_record,
        min_k,
        class_count,
    })
}

/// Assess the dataset under every supplied QI set.
///
/// Returns one effective (k, tier) per record in input row order, together
/// with the dataset-level report. QI sets are validated against the schema
/// up front, so the call fails atomically before any evaluation when one of
/// them names an unknown attribute; an empty QI-set list is rejected
/// outright. Evaluation runs in parallel across QI sets and joins before
/// the per-record reduction.
pub fn assess_dataset(
    dataset: &Dataset,
    qi_sets: &[QiSet],
    thresholds: RiskThresholds,
) -> Result<(Vec<RecordRisk>, RiskReport)> {
    if qi_sets.is_empty() {
        return Err(ConfigurationError::EmptyQiSets.into());
    }
    for qi in qi_sets {
        qi.resolve(dataset.schema())?;
    }

    let assessments: Vec<QiAssessment> = qi_sets
        .par_iter()
        .map(|qi| evaluate_qi_set(dataset, qi))
        .collect::<Result<_>>()?;

    let n_rows = dataset.n_rows();
    let mut risks = Vec::with_capacity(n_rows);
    for row in 0..n_rows {
        let mut k = usize::MAX;
        let mut unique_qi_count = 0;
        for assessment in &assessments {
            let set_k = assessment.per_record_k[row];
            k = k.min(set_k);
            if set_k == 1 {
                unique_qi_count += 1;
            }
        }
        let tier = thresholds.classify(k)?;
        risks.push(RecordRisk {
            row,
            k,
            tier,
            unique_qi_count,
        });
    }
    info!(
        "assessed {} records under {} QI sets",
        n_rows,
        qi_sets.len()
    );

    let report = build_report(&risks, &assessments);
    Ok((risks, report))
}

/// Row indices of high-tier records, most exposed first.
///
/// Ordered by ascending effective k, then by how many QI sets leave the
/// record unique (more first), then by row; truncated to `limit`.
pub fn top_high_risk(risks: &[RecordRisk], limit: usize) -> Vec<usize> {
    let mut high: Vec<&RecordRisk> = risks
        .iter()
        .filter(|r| r.tier == RiskTier::High)
        .collect();
    high.sort_by_key(|r| (r.k, std::cmp::Reverse(r.unique_qi_count), r.row));
    high.into_iter().take(limit).map(|r| r.row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AttrKind, Attribute, Schema, Value};
    use crate::error::Error;

    fn dataset(columns: &[(&str, &[&str])]) -> Dataset {
        let schema = Schema::new(
            columns
                .iter()
                .map(|(name, _)| Attribute::new(*name, AttrKind::Text))
                .collect(),
        )
        .unwrap();
        let n_rows = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        let rows = (0..n_rows)
            .map(|row| {
                columns
                    .iter()
                    .map(|(_, values)| Value::Text(values[row].to_string()))
                    .collect()
            })
            .collect();
        Dataset::new(schema, rows).unwrap()
    }

    // 10 rows: 6 share city A, 3 share city B, 1 is unique.
    fn city_fixture() -> Dataset {
        dataset(&[(
            "city",
            &["A", "A", "A", "A", "A", "A", "B", "B", "B", "C"],
        )])
    }

    #[test]
    fn test_single_qi_set_scenario() {
        let data = city_fixture();
        let qi = QiSet::new(["city"]).unwrap();
        let thresholds = RiskThresholds::new(2, 4).unwrap();
        let (risks, report) = assess_dataset(&data, &[qi], thresholds).unwrap();

        let k_values: Vec<usize> = risks.iter().map(|r| r.k).collect();
        assert_eq!(k_values, vec![6, 6, 6, 6, 6, 6, 3, 3, 3, 1]);

        // k=1 high, k=3 medium, k=6 low under (2, 4).
        assert_eq!(report.high_count, 1);
        assert_eq!(report.medium_count, 3);
        assert_eq!(report.low_count, 6);
        assert!((report.high_percentage - 10.0).abs() < 1e-9);
        assert!((report.medium_percentage - 30.0).abs() < 1e-9);
        assert!((report.low_percentage - 60.0).abs() < 1e-9);
        assert!((report.average_k - 4.6).abs() < 1e-9);
        assert_eq!(report.min_k, 1);
    }

    #[test]
    fn test_rows_keep_input_order() {
        let data = city_fixture();
        let qi = QiSet::new(["city"]).unwrap();
        let (risks, _) = assess_dataset(&data, &[qi], RiskThresholds::default()).unwrap();
        let rows: Vec<usize> = risks.iter().map(|r| r.row).collect();
        assert_eq!(rows, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_effective_k_is_minimum_across_sets() {
        // Under [a] row 3 is unique; under [b] rows split 2/2.
        let data = dataset(&[
            ("a", &["x", "x", "x", "y"]),
            ("b", &["p", "p", "q", "q"]),
        ]);
        let sets = [QiSet::new(["a"]).unwrap(), QiSet::new(["b"]).unwrap()];
        let (risks, _) = assess_dataset(&data, &sets, RiskThresholds::default()).unwrap();
        let k_values: Vec<usize> = risks.iter().map(|r| r.k).collect();
        assert_eq!(k_values, vec![2, 2, 2, 1]);
    }

    #[test]
    fn test_adding_a_qi_set_never_increases_k() {
        let data = dataset(&[
            ("a", &["x", "x", "x", "y"]),
            ("b", &["p", "p", "q", "q"]),
        ]);
        let one = [QiSet::new(["a"]).unwrap()];
        let two = [QiSet::new(["a"]).unwrap(), QiSet::new(["b"]).unwrap()];
        let (before, _) = assess_dataset(&data, &one, RiskThresholds::default()).unwrap();
        let (after, _) = assess_dataset(&data, &two, RiskThresholds::default()).unwrap();
        for (b, a) in before.iter().zip(after.iter()) {
            assert!(a.k <= b.k);
        }
    }

    #[test]
    fn test_result_is_independent_of_set_order() {
        let data = dataset(&[
            ("a", &["x", "x", "y", "y"]),
            ("b", &["p", "q", "p", "q"]),
        ]);
        let forward = [QiSet::new(["a"]).unwrap(), QiSet::new(["b"]).unwrap()];
        let backward = [QiSet::new(["b"]).unwrap(), QiSet::new(["a"]).unwrap()];
        let (risks_f, _) = assess_dataset(&data, &forward, RiskThresholds::default()).unwrap();
        let (risks_b, _) = assess_dataset(&data, &backward, RiskThresholds::default()).unwrap();
        assert_eq!(risks_f, risks_b);
    }

    #[test]
    fn test_assessment_is_idempotent() {
        let data = city_fixture();
        let sets = [QiSet::new(["city"]).unwrap()];
        let first = assess_dataset(&data, &sets, RiskThresholds::default()).unwrap();
        let second = assess_dataset(&data, &sets, RiskThresholds::default()).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_unique_qi_count() {
        // Row 2 is unique under both sets, row 0 under neither.
        let data = dataset(&[
            ("a", &["x", "x", "z"]),
            ("b", &["p", "p", "r"]),
        ]);
        let sets = [QiSet::new(["a"]).unwrap(), QiSet::new(["b"]).unwrap()];
        let (risks, _) = assess_dataset(&data, &sets, RiskThresholds::default()).unwrap();
        assert_eq!(risks[0].unique_qi_count, 0);
        assert_eq!(risks[2].unique_qi_count, 2);
    }

    #[test]
    fn test_empty_qi_set_list_is_rejected() {
        let data = city_fixture();
        let result = assess_dataset(&data, &[], RiskThresholds::default());
        assert!(matches!(
            result,
            Err(Error::Configuration(ConfigurationError::EmptyQiSets))
        ));
        let err = assess_dataset(&data, &[], RiskThresholds::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_attribute_fails_before_any_evaluation() {
        let data = city_fixture();
        let sets = [
            QiSet::new(["city"]).unwrap(),
            QiSet::new(["country"]).unwrap(),
        ];
        let result = assess_dataset(&data, &sets, RiskThresholds::default());
        assert!(matches!(
            result,
            Err(Error::Configuration(ConfigurationError::UnknownAttribute(_)))
        ));
    }

    #[test]
    fn test_empty_dataset_yields_empty_report() {
        let data = dataset(&[("city", &[])]);
        let sets = [QiSet::new(["city"]).unwrap()];
        let (risks, report) =
            assess_dataset(&data, &sets, RiskThresholds::default()).unwrap();
        assert!(risks.is_empty());
        assert!(report.empty_dataset);
        assert_eq!(report.total_records, 0);
    }

    #[test]
    fn test_default_thresholds_band_assignment() {
        let data = city_fixture();
        let sets = [QiSet::new(["city"]).unwrap()];
        let (risks, report) =
            assess_dataset(&data, &sets, RiskThresholds::default()).unwrap();
        // Under the (2, 10) defaults k=6 and k=3 both land in medium.
        assert_eq!(report.high_count, 1);
        assert_eq!(report.medium_count, 9);
        assert_eq!(report.low_count, 0);
        assert_eq!(risks[0].tier, RiskTier::Medium);
        assert_eq!(risks[9].tier, RiskTier::High);
    }

    #[test]
    fn test_top_high_risk_ordering_and_limit() {
        let risks = vec![
            RecordRisk { row: 0, k: 2, tier: RiskTier::High, unique_qi_count: 0 },
            RecordRisk { row: 1, k: 1, tier: RiskTier::High, unique_qi_count: 1 },
            RecordRisk { row: 2, k: 5, tier: RiskTier::Medium, unique_qi_count: 0 },
            RecordRisk { row: 3, k: 1, tier: RiskTier::High, unique_qi_count: 2 },
        ];
        assert_eq!(top_high_risk(&risks, 10), vec![3, 1, 0]);
        assert_eq!(top_high_risk(&risks, 2), vec![3, 1]);
    }

    #[test]
    fn test_evaluate_qi_set_min_matches_reported_minimum() {
        let data = city_fixture();
        let qi = QiSet::new(["city"]).unwrap();
        let assessment = evaluate_qi_set(&data, &qi).unwrap();
        let min = assessment.per_record_k.iter().copied().min().unwrap();
        assert_eq!(assessment.min_k, min);
        assert_eq!(assessment.class_count, 3);
        assert_eq!(assessment.label(), "city");
    }
}
