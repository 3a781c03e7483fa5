//! Cross-validation of the BOM against the cutter layout.
//!
//! Provides [`ValidationReport`] for the outcome, [`ValidationIssue`] for
//! each diagnostic and [`Severity`] for classifying their impact. The
//! report is derived data: recompute it whenever the BOM or the blades
//! change.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::blade::Blade;
use crate::bom::BomRow;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    /// The layout references something the BOM does not define.
    Error,
    /// The two sides disagree but the map is still usable.
    Warning,
    #[default]
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

pub const BOM_ONLY: &str = "BOM_ONLY";
pub const CL_ONLY: &str = "CL_ONLY";
pub const GAPS: &str = "GAPS";
pub const COUNT_MISMATCH: &str = "COUNT_MISMATCH";

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Machine-readable issue code (e.g., "CL_ONLY").
    pub code: String,
    pub message: String,
    /// The BOM index or group number the issue is about.
    pub index: Option<u32>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            index: None,
        }
    }

    pub fn for_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Returns `true` if the issue is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Returns `true` if the issue is a warning.
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// Expected versus placed cutters for one BOM index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CountCheck {
    /// The BOM count.
    pub expected: u32,
    /// Cells referencing the index.
    pub placed: u32,
}

impl CountCheck {
    pub fn matches(&self) -> bool {
        self.expected == self.placed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidationReport {
    pub bom_indices: BTreeSet<u32>,
    /// Group numbers referenced by at least one cell.
    pub cl_groups: BTreeSet<u32>,
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub bom_only: Vec<u32>,
    pub cl_only: Vec<u32>,
    /// Numbers between 1 and the largest index seen on either side that
    /// neither side uses.
    pub gaps: Vec<u32>,
    /// Per-index counts, for indices referenced by a cell and listed in the BOM.
    pub counts: BTreeMap<u32, CountCheck>,
}

impl Default for ValidationReport {
    /// An empty map is trivially consistent.
    fn default() -> Self {
        Self {
            bom_indices: BTreeSet::new(),
            cl_groups: BTreeSet::new(),
            is_valid: true,
            issues: Vec::new(),
            bom_only: Vec::new(),
            cl_only: Vec::new(),
            gaps: Vec::new(),
            counts: BTreeMap::new(),
        }
    }
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_warning())
    }

    /// Issues carrying the given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

fn join(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compare the BOM with the cutter layout.
pub fn validate(rows: &[BomRow], blades: &[Blade]) -> ValidationReport {
    let bom_indices: BTreeSet<u32> = rows.iter().map(|r| r.index).collect();
    let mut placed: BTreeMap<u32, u32> = BTreeMap::new();
    for cell in blades.iter().flat_map(Blade::cells) {
        *placed.entry(cell.group).or_default() += 1;
    }
    let cl_groups: BTreeSet<u32> = placed.keys().copied().collect();

    let bom_only: Vec<u32> = bom_indices.difference(&cl_groups).copied().collect();
    let cl_only: Vec<u32> = cl_groups.difference(&bom_indices).copied().collect();
    let max_seen = bom_indices
        .iter()
        .chain(cl_groups.iter())
        .copied()
        .max()
        .unwrap_or(0);
    let gaps: Vec<u32> = (1..=max_seen)
        .filter(|n| !bom_indices.contains(n) && !cl_groups.contains(n))
        .collect();

    let mut issues = Vec::new();
    for &index in &bom_only {
        issues.push(
            ValidationIssue::new(
                Severity::Warning,
                BOM_ONLY,
                format!("BOM index {index} is not placed on any blade"),
            )
            .for_index(index),
        );
    }
    for &group in &cl_only {
        issues.push(
            ValidationIssue::new(
                Severity::Error,
                CL_ONLY,
                format!("group {group} is placed on a blade but missing from the BOM"),
            )
            .for_index(group),
        );
    }
    if !gaps.is_empty() {
        issues.push(ValidationIssue::new(
            Severity::Info,
            GAPS,
            format!("unused numbers: {}", join(&gaps)),
        ));
    }

    let mut counts = BTreeMap::new();
    for row in rows {
        let Some(&n) = placed.get(&row.index) else {
            continue;
        };
        let check = CountCheck {
            expected: row.count,
            placed: n,
        };
        if !check.matches() {
            issues.push(
                ValidationIssue::new(
                    Severity::Warning,
                    COUNT_MISMATCH,
                    format!(
                        "index {}: BOM count {} but {} placed",
                        row.index, check.expected, check.placed
                    ),
                )
                .for_index(row.index),
            );
        }
        counts.insert(row.index, check);
    }

    let mismatches = counts.values().any(|c| !c.matches());
    let is_valid = bom_only.is_empty() && cl_only.is_empty() && !mismatches;
    ValidationReport {
        bom_indices,
        cl_groups,
        is_valid,
        issues,
        bom_only,
        cl_only,
        gaps,
        counts,
    }
}
