use serde::{Deserialize, Serialize};

/// Label reported when no haplogroup rule reaches candidate status
pub const UNDETERMINED_HAPLOGROUP: &str = "Undetermined";

/// The four people covered by a family genotype file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FamilyMember {
    Father,
    Mother,
    Son1,
    Son2,
}

/// One tested marker across the whole family.
///
/// Genotype fields are empty for a no-call, otherwise one or two allele
/// characters exactly as reported by the genotyping array.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenotypeRecord {
    pub marker_id: String,
    pub chromosome: String,
    pub position: u64,
    pub father: String,
    pub mother: String,
    pub son1: String,
    pub son2: String,
}

impl GenotypeRecord {
    pub fn new(
        marker_id: impl Into<String>,
        chromosome: impl Into<String>,
        position: u64,
        father: impl Into<String>,
        mother: impl Into<String>,
        son1: impl Into<String>,
        son2: impl Into<String>,
    ) -> Self {
        Self {
            marker_id: marker_id.into(),
            chromosome: chromosome.into(),
            position,
            father: father.into(),
            mother: mother.into(),
            son1: son1.into(),
            son2: son2.into(),
        }
    }

    pub fn genotype(&self, member: FamilyMember) -> &str {
        match member {
            FamilyMember::Father => &self.father,
            FamilyMember::Mother => &self.mother,
            FamilyMember::Son1 => &self.son1,
            FamilyMember::Son2 => &self.son2,
        }
    }

    /// Autosomes are labelled by a plain run of decimal digits. Signs,
    /// sex chromosomes, MT and anything malformed do not qualify.
    pub fn is_autosomal(&self) -> bool {
        !self.chromosome.is_empty() && self.chromosome.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn is_mitochondrial(&self) -> bool {
        self.chromosome == "MT"
    }
}

/// Outcome of the trio inheritance check over autosomal markers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MendelianReport {
    pub total_checked: usize,
    pub consistent_count: usize,
    pub inconsistent_count: usize,
    pub inconsistent_records: Vec<GenotypeRecord>,
}

impl MendelianReport {
    pub fn consistency_percentage(&self) -> f64 {
        percentage(self.consistent_count, self.total_checked)
    }
}

/// Outcome of the maternal mitochondrial identity check
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MitochondrialReport {
    pub total_checked: usize,
    pub match_count: usize,
    pub mismatch_count: usize,
    pub mismatched_records: Vec<GenotypeRecord>,
}

impl MitochondrialReport {
    pub fn match_percentage(&self) -> f64 {
        percentage(self.match_count, self.total_checked)
    }
}

/// Identity-by-state similarity between the two sons
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiblingSharingReport {
    pub total_checked: usize,
    pub shared_allele_sum: f64,
    pub shared_percentage: f64,
}

/// Whose mitochondrial calls backed a haplogroup assignment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LineageSource {
    /// Every tested marker came from the mother's own calls
    Mother,
    /// Every tested marker was filled in from son1
    Son1Proxy,
    /// Some markers from the mother, some from son1
    Mixed,
    #[default]
    None,
}

/// Best-supported mitochondrial lineage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HaplogroupResult {
    pub label: String,
    pub matched_marker_count: usize,
    pub tested_marker_count: usize,
    pub confidence_percentage: f64,
    pub description: String,
    pub source: LineageSource,
}

impl HaplogroupResult {
    pub fn undetermined() -> Self {
        Self {
            label: UNDETERMINED_HAPLOGROUP.to_string(),
            matched_marker_count: 0,
            tested_marker_count: 0,
            confidence_percentage: 0.0,
            description: String::new(),
            source: LineageSource::None,
        }
    }

    pub fn is_determined(&self) -> bool {
        self.label != UNDETERMINED_HAPLOGROUP
    }
}

impl Default for HaplogroupResult {
    fn default() -> Self {
        Self::undetermined()
    }
}

/// A rule that reached at least half of its tested markers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HaplogroupCandidate {
    pub label: String,
    pub matched: usize,
    pub tested: usize,
    pub percentage: f64,
    pub score: f64,
}

/// Diagnostic allele expected at one mitochondrial position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkerRule {
    pub position: u64,
    pub allele: String,
    /// Carried through from rule files but not consulted when scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl MarkerRule {
    pub fn new(position: u64, allele: impl Into<String>) -> Self {
        Self {
            position,
            allele: allele.into(),
            weight: None,
        }
    }
}

/// Named mitochondrial lineage and its defining markers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HaplogroupRule {
    pub label: String,
    pub description: String,
    pub markers: Vec<MarkerRule>,
}

/// Per-file details gathered while parsing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyMetadata {
    pub family_id: String,
    pub source_file: String,
    pub record_count: usize,
    pub skipped_lines: usize,
    pub call_rates: CallRates,
}

/// Fraction of records with a non-empty call, per person
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallRates {
    pub father: f64,
    pub mother: f64,
    pub son1: f64,
    pub son2: f64,
}

pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_on(chromosome: &str) -> GenotypeRecord {
        GenotypeRecord::new("rs1", chromosome, 100, "AA", "AA", "AA", "AA")
    }

    #[test]
    fn test_autosomal_labels() {
        assert!(record_on("1").is_autosomal());
        assert!(record_on("22").is_autosomal());
        assert!(!record_on("X").is_autosomal());
        assert!(!record_on("Y").is_autosomal());
        assert!(!record_on("MT").is_autosomal());
        assert!(!record_on("+1").is_autosomal());
        assert!(!record_on("").is_autosomal());
        assert!(!record_on("1a").is_autosomal());
    }

    #[test]
    fn test_genotype_accessor() {
        let record = GenotypeRecord::new("rs1", "1", 1, "AG", "CT", "AC", "");
        assert_eq!(record.genotype(FamilyMember::Father), "AG");
        assert_eq!(record.genotype(FamilyMember::Mother), "CT");
        assert_eq!(record.genotype(FamilyMember::Son1), "AC");
        assert_eq!(record.genotype(FamilyMember::Son2), "");
    }

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(MendelianReport::default().consistency_percentage(), 0.0);
    }
}
