// ==============================================================================
// validator.rs - GWAS Row Validation
// ==============================================================================
// Description: Header column resolution and per-row record validation
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================
// Format: plink2 association output, tab-delimited with a header row
// Example:
//   #CHROM    POS    ID    REF    ALT    A1    TEST    OBS_CT    BETA    SE    T_STAT    P
//   1    69869    rs548049170    T    C    C    ADD    1000    0.02    0.01    2.0    0.045
// ==============================================================================

use thiserror::Error;

use crate::models::VariantRecord;

/// Required header column names, matched exactly (case-sensitive).
pub const CHROMOSOME_COLUMN: &str = "#CHROM";
pub const POSITION_COLUMN: &str = "POS";
pub const P_VALUE_COLUMN: &str = "P";

/// Errors raised while resolving the header row. These are fatal for the
/// whole cleaning run; row-level problems never reach this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Required columns not found. Found: CHROM={chromosome}, POS={position}, P={p_value}")]
    MissingColumns {
        /// Resolved index of each required column, -1 when absent
        chromosome: isize,
        position: isize,
        p_value: isize,
    },
}

/// Indices of the three required columns, resolved once per input from the
/// header row. Rows are then read against this fixed shape instead of
/// re-checking column presence per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub chromosome: usize,
    pub position: usize,
    pub p_value: usize,
}

impl ColumnMap {
    /// Resolve the required columns from the split header fields.
    pub fn resolve(header_fields: &[&str]) -> Result<Self, HeaderError> {
        let find = |name: &str| header_fields.iter().position(|col| *col == name);

        let chromosome = find(CHROMOSOME_COLUMN);
        let position = find(POSITION_COLUMN);
        let p_value = find(P_VALUE_COLUMN);

        match (chromosome, position, p_value) {
            (Some(chromosome), Some(position), Some(p_value)) => Ok(Self {
                chromosome,
                position,
                p_value,
            }),
            _ => Err(HeaderError::MissingColumns {
                chromosome: chromosome.map_or(-1, |i| i as isize),
                position: position.map_or(-1, |i| i as isize),
                p_value: p_value.map_or(-1, |i| i as isize),
            }),
        }
    }

    /// Largest of the three indices; a row must have more fields than this
    /// to be considered at all.
    pub fn max_index(&self) -> usize {
        self.chromosome.max(self.position).max(self.p_value)
    }
}

/// Validates one split row against a resolved column map.
///
/// Any parse failure or range violation is a silent reject: the row is
/// counted as filtered, never surfaced as an error.
#[derive(Debug, Clone, Copy)]
pub struct RecordValidator {
    columns: ColumnMap,
}

impl RecordValidator {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    /// Validate a row's fields, returning a record only when the chromosome,
    /// position, and p-value all parse and satisfy their range checks:
    /// chromosome > 0 and 0 < p <= 1. Position accepts any integer.
    pub fn validate(&self, fields: &[&str]) -> Option<VariantRecord> {
        if fields.len() <= self.columns.max_index() {
            return None; // Malformed row, not enough fields
        }

        // Some upstream exports quote the chromosome column
        let chromosome_field: String = fields[self.columns.chromosome]
            .chars()
            .filter(|c| *c != '\'' && *c != '"')
            .collect();

        let chromosome = chromosome_field.parse::<u32>().ok()?;
        let position = fields[self.columns.position].parse::<i64>().ok()?;
        let p_value = fields[self.columns.p_value].parse::<f64>().ok()?;

        // NaN fails both comparisons, so unparseable-but-lexable values like
        // "NaN" are rejected here rather than at parse time.
        if chromosome > 0 && p_value > 0.0 && p_value <= 1.0 {
            Some(VariantRecord {
                chromosome,
                position,
                p_value,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator_for(header: &[&str]) -> RecordValidator {
        RecordValidator::new(ColumnMap::resolve(header).unwrap())
    }

    #[test]
    fn test_resolve_standard_header() {
        let columns = ColumnMap::resolve(&["#CHROM", "POS", "P"]).unwrap();
        assert_eq!(columns.chromosome, 0);
        assert_eq!(columns.position, 1);
        assert_eq!(columns.p_value, 2);
        assert_eq!(columns.max_index(), 2);
    }

    #[test]
    fn test_resolve_full_plink_header() {
        let header = [
            "#CHROM", "POS", "ID", "REF", "ALT", "A1", "TEST", "OBS_CT", "BETA", "SE",
            "T_STAT", "P",
        ];
        let columns = ColumnMap::resolve(&header).unwrap();
        assert_eq!(columns.chromosome, 0);
        assert_eq!(columns.position, 1);
        assert_eq!(columns.p_value, 11);
    }

    #[test]
    fn test_resolve_missing_position_column() {
        let err = ColumnMap::resolve(&["#CHROM", "P"]).unwrap_err();
        assert_eq!(
            err,
            HeaderError::MissingColumns {
                chromosome: 0,
                position: -1,
                p_value: 1,
            }
        );
        assert!(err.to_string().contains("POS=-1"));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let err = ColumnMap::resolve(&["#chrom", "pos", "p"]).unwrap_err();
        assert_eq!(
            err,
            HeaderError::MissingColumns {
                chromosome: -1,
                position: -1,
                p_value: -1,
            }
        );
    }

    #[test]
    fn test_validate_accepts_well_formed_row() {
        let validator = validator_for(&["#CHROM", "POS", "P"]);
        let record = validator.validate(&["1", "69869", "0.045"]).unwrap();
        assert_eq!(record.chromosome, 1);
        assert_eq!(record.position, 69869);
        assert_eq!(record.p_value, 0.045);
    }

    #[test]
    fn test_validate_strips_quotes_from_chromosome() {
        let validator = validator_for(&["#CHROM", "POS", "P"]);
        assert!(validator.validate(&["\"7\"", "100", "0.5"]).is_some());
        assert!(validator.validate(&["'12'", "100", "0.5"]).is_some());
    }

    #[test]
    fn test_validate_rejects_short_row() {
        let validator = validator_for(&["#CHROM", "POS", "P"]);
        assert!(validator.validate(&["1", "100"]).is_none());
    }

    #[test]
    fn test_validate_rejects_non_numeric_chromosome() {
        let validator = validator_for(&["#CHROM", "POS", "P"]);
        assert!(validator.validate(&["X", "100", "0.5"]).is_none());
        assert!(validator.validate(&["MT", "100", "0.5"]).is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range_p_value() {
        let validator = validator_for(&["#CHROM", "POS", "P"]);
        assert!(validator.validate(&["1", "100", "0"]).is_none());
        assert!(validator.validate(&["1", "100", "-0.1"]).is_none());
        assert!(validator.validate(&["1", "100", "1.5"]).is_none());
        assert!(validator.validate(&["1", "100", "NaN"]).is_none());
        assert!(validator.validate(&["1", "100", "bad"]).is_none());

        // Boundary: exactly 1 is accepted
        assert!(validator.validate(&["1", "100", "1"]).is_some());
    }

    #[test]
    fn test_validate_rejects_chromosome_zero_and_negatives() {
        let validator = validator_for(&["#CHROM", "POS", "P"]);
        assert!(validator.validate(&["0", "100", "0.5"]).is_none());
        assert!(validator.validate(&["-3", "100", "0.5"]).is_none());
    }

    #[test]
    fn test_validate_permits_negative_position() {
        // Position is intentionally not range-checked.
        let validator = validator_for(&["#CHROM", "POS", "P"]);
        let record = validator.validate(&["1", "-50", "0.5"]).unwrap();
        assert_eq!(record.position, -50);
    }

    #[test]
    fn test_validate_uses_resolved_indices_only() {
        let header = ["#CHROM", "POS", "ID", "REF", "ALT", "P"];
        let validator = validator_for(&header);
        let record = validator
            .validate(&["2", "123", "rs1", "A", "G", "1e-9"])
            .unwrap();
        assert_eq!(record.chromosome, 2);
        assert_eq!(record.position, 123);
        assert_eq!(record.p_value, 1e-9);
    }
}
