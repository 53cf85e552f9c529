//! Regex-based PII detection and quasi-identifier inference.
//!
//! Four kinds of directly identifying values are recognized: email
//! addresses, phone numbers (US and international), Social Security
//! Numbers (with format validation), and credit card numbers (with Luhn
//! validation). Column-level scanning samples values and blends detection
//! consistency into a confidence score; the QI inference pass turns column
//! names plus scan findings into candidate quasi-identifier sets.

use std::fmt;
use std::fmt::Write as FmtWrite;

use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use log::info;
use regex::Regex;
use serde::Serialize;

use crate::data::{Dataset, QiSet, Schema};
use crate::error::Result;

/// Column-name fragments that mark a direct identifier, never a QI.
const DIRECT_IDENTIFIER_FRAGMENTS: &[&str] = &[
    "name",
    "email",
    "phone",
    "ssn",
    "social_security",
    "credit_card",
    "card",
    "address",
    "street",
    "full_address",
];

/// Column-name fragments typical of demographic or geographic QIs.
const QI_KEYWORDS: &[&str] = &[
    "age",
    "zip",
    "zipcode",
    "gender",
    "city",
    "state",
    "birth",
    "dob",
    "date_of_birth",
    "income",
    "salary",
];

/// Longest sample value kept for display, in characters.
const SAMPLE_CHAR_LIMIT: usize = 50;

/// Kind of directly identifying value a pattern recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiKind {
    Email,
    Phone,
    Ssn,
    CreditCard,
}

impl PiiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiKind::Email => "email",
            PiiKind::Phone => "phone",
            PiiKind::Ssn => "ssn",
            PiiKind::CreditCard => "credit_card",
        }
    }
}

impl fmt::Display for PiiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pattern hit inside a scanned string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PiiMatch {
    pub kind: PiiKind,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    /// Pattern-level confidence in the hit.
    pub confidence: f64,
}

/// Compiled recognizers for every supported PII kind.
pub struct PiiDetector {
    email: Regex,
    phone_us: Regex,
    phone_intl: Regex,
    ssn: Regex,
    credit_card: Regex,
}

impl PiiDetector {
    pub fn new() -> Self {
        PiiDetector {
            email: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
            phone_us: Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap(),
            phone_intl: Regex::new(r"\+\d{1,3}[-.\s]?\(?\d{1,4}\)?[-.\s]?\d{1,4}[-.\s]?\d{1,9}")
                .unwrap(),
            ssn: Regex::new(r"\d{3}-\d{2}-\d{4}").unwrap(),
            credit_card: Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap(),
        }
    }

    pub fn find_emails(&self, text: &str) -> Vec<PiiMatch> {
        self.email
            .find_iter(text)
            .map(|m| PiiMatch {
                kind: PiiKind::Email,
                start: m.start(),
                end: m.end(),
                confidence: 0.95,
            })
            .collect()
    }

    /// International format is tried first; US-format hits that overlap an
    /// international hit are dropped so a number is reported once.
    pub fn find_phones(&self, text: &str) -> Vec<PiiMatch> {
        let mut matches: Vec<PiiMatch> = self
            .phone_intl
            .find_iter(text)
            .map(|m| PiiMatch {
                kind: PiiKind::Phone,
                start: m.start(),
                end: m.end(),
                confidence: 0.90,
            })
            .collect();

        let taken: Vec<(usize, usize)> = matches.iter().map(|m| (m.start, m.end)).collect();
        for m in self.phone_us.find_iter(text) {
            let overlaps = taken.iter().any(|&(start, end)| m.start() < end && m.end() > start);
            if !overlaps {
                matches.push(PiiMatch {
                    kind: PiiKind::Phone,
                    start: m.start(),
                    end: m.end(),
                    confidence: 0.85,
                });
            }
        }
        matches
    }

    pub fn find_ssns(&self, text: &str) -> Vec<PiiMatch> {
        self.ssn
            .find_iter(text)
            .filter(|m| is_valid_ssn(m.as_str()))
            .map(|m| PiiMatch {
                kind: PiiKind::Ssn,
                start: m.start(),
                end: m.end(),
                confidence: 0.90,
            })
            .collect()
    }

    pub fn find_credit_cards(&self, text: &str) -> Vec<PiiMatch> {
        self.credit_card
            .find_iter(text)
            .filter(|m| {
                let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
                digits.len() == 16 && luhn_valid(&digits)
            })
            .map(|m| PiiMatch {
                kind: PiiKind::CreditCard,
                start: m.start(),
                end: m.end(),
                confidence: 0.95,
            })
            .collect()
    }

    /// Every hit of every kind, ordered by position in the text.
    pub fn find_matches(&self, text: &str) -> Vec<PiiMatch> {
        let mut matches = self.find_emails(text);
        matches.extend(self.find_phones(text));
        matches.extend(self.find_ssns(text));
        matches.extend(self.find_credit_cards(text));
        matches.sort_by_key(|m| m.start);
        matches
    }

    /// Distinct kinds present in the text, in first-hit order.
    pub fn kinds_in(&self, text: &str) -> Vec<PiiKind> {
        let mut kinds = Vec::new();
        for m in self.find_matches(text) {
            if !kinds.contains(&m.kind) {
                kinds.push(m.kind);
            }
        }
        kinds
    }
}

impl Default for PiiDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Area must not be 000, 666, or 9xx; group must not be 00; serial must
/// not be 0000.
fn is_valid_ssn(ssn: &str) -> bool {
    let parts: Vec<&str> = ssn.split('-').collect();
    if parts.len() != 3 {
        return false;
    }
    let (area, group, serial) = (parts[0], parts[1], parts[2]);
    if area == "000" || area == "666" || area.starts_with('9') {
        return false;
    }
    group != "00" && serial != "0000"
}

/// Luhn checksum over a digits-only string; an all-zero string is
/// rejected outright.
fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() || digits.bytes().all(|b| b == b'0') {
        return false;
    }
    let mut sum = 0u32;
    for (i, byte) in digits.bytes().rev().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(byte - b'0');
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

/// Scan outcome for one column that contained PII.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnFinding {
    /// Column name.
    pub attribute: String,
    /// Kinds seen in the column, most frequent first.
    pub kinds: Vec<PiiKind>,
    /// Blend of detection consistency (weight 0.6) and kind consistency
    /// (weight 0.4) over the sampled values.
    pub confidence: f64,
    /// Up to three detected values, truncated for display.
    pub samples: Vec<String>,
    /// Number of sampled values containing at least one hit.
    pub detection_count: usize,
}

/// Scan every column of the dataset for directly identifying values.
///
/// At most `sample_size` non-missing values are inspected per column, in
/// row order. Columns with no hits are omitted from the result; the rest
/// come back in schema order.
pub fn scan_dataset(
    dataset: &Dataset,
    detector: &PiiDetector,
    sample_size: usize,
) -> Vec<ColumnFinding> {
    let schema = dataset.schema();
    let progress = ProgressBar::new(schema.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>7}/{len:7} ({eta})",
        )
        .unwrap()
        .with_key("eta", |state: &ProgressState, w: &mut dyn FmtWrite| {
            write!(w, "{:.1}s", state.eta().as_secs_f64()).unwrap()
        })
        .progress_chars("#>-"),
    );

    let mut findings = Vec::new();
    for (col, attr) in schema.attrs().iter().enumerate() {
        if let Some(finding) = scan_column(dataset, col, &attr.name, detector, sample_size) {
            findings.push(finding);
        }
        progress.inc(1);
    }
    progress.finish_with_message("Finished PII scan");
    info!(
        "scanned {} columns, found PII in {}",
        schema.len(),
        findings.len()
    );
    findings
}

fn scan_column(
    dataset: &Dataset,
    col: usize,
    attribute: &str,
    detector: &PiiDetector,
    sample_size: usize,
) -> Option<ColumnFinding> {
    let sample: Vec<String> = dataset
        .column_values(col)
        .filter(|value| !value.is_missing())
        .take(sample_size)
        .map(|value| value.to_string())
        .collect();
    if sample.is_empty() {
        return None;
    }

    let mut kind_counts: Vec<(PiiKind, usize)> = Vec::new();
    let mut samples = Vec::new();
    let mut detection_count = 0;
    for text in &sample {
        if text.trim().is_empty() {
            continue;
        }
        let kinds = detector.kinds_in(text);
        if kinds.is_empty() {
            continue;
        }
        detection_count += 1;
        if samples.len() < 3 {
            samples.push(text.chars().take(SAMPLE_CHAR_LIMIT).collect());
        }
        for kind in kinds {
            match kind_counts.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, count)) => *count += 1,
                None => kind_counts.push((kind, 1)),
            }
        }
    }
    if detection_count == 0 {
        return None;
    }

    let consistency = detection_count as f64 / sample.len() as f64;
    let max_kind_count = kind_counts.iter().map(|&(_, count)| count).max().unwrap_or(0);
    let kind_consistency = max_kind_count as f64 / detection_count as f64;
    let confidence = consistency * 0.6 + kind_consistency * 0.4;

    kind_counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.as_str().cmp(b.0.as_str())));
    Some(ColumnFinding {
        attribute: attribute.to_string(),
        kinds: kind_counts.into_iter().map(|(kind, _)| kind).collect(),
        confidence,
        samples,
        detection_count,
    })
}

/// Candidate quasi-identifier columns, in schema order.
///
/// A column qualifies when its lowercased name contains a QI keyword. It
/// is disqualified when the name contains a direct-identifier fragment or
/// when the scan found directly identifying values inside it.
pub fn infer_quasi_identifiers(schema: &Schema, findings: &[ColumnFinding]) -> Vec<String> {
    schema
        .attrs()
        .iter()
        .map(|attr| attr.name.as_str())
        .filter(|name| {
            let lower = name.to_lowercase();
            if DIRECT_IDENTIFIER_FRAGMENTS
                .iter()
                .any(|fragment| lower.contains(fragment))
            {
                return false;
            }
            if findings.iter().any(|f| f.attribute == *name) {
                return false;
            }
            QI_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .map(str::to_string)
        .collect()
}

/// Pair up inferred QIs into the sets to test.
///
/// Pairs keep re-identification estimates realistic; testing three or four
/// attributes together makes nearly every record unique. With a single
/// candidate the set is that column alone.
pub fn default_qi_sets(quasi_identifiers: &[String]) -> Result<Vec<QiSet>> {
    let mut sets = Vec::new();
    match quasi_identifiers.len() {
        0 => {}
        1 => sets.push(QiSet::new([quasi_identifiers[0].as_str()])?),
        n => {
            sets.push(QiSet::new([
                quasi_identifiers[0].as_str(),
                quasi_identifiers[1].as_str(),
            ])?);
            if n >= 4 {
                sets.push(QiSet::new([
                    quasi_identifiers[0].as_str(),
                    quasi_identifiers[3].as_str(),
                ])?);
            }
            if n >= 3 {
                sets.push(QiSet::new([
                    quasi_identifiers[1].as_str(),
                    quasi_identifiers[2].as_str(),
                ])?);
            }
        }
    }
    Ok(sets)
}
