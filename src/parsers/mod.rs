use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ParseError;
use crate::types::*;

pub mod family;

pub use family::FamilyFileParser;

/// Records parsed from one family file together with file metadata
#[derive(Debug, Clone, Default)]
pub struct ParsedFamilyData {
    pub metadata: FamilyMetadata,
    pub records: Vec<GenotypeRecord>,
}

impl ParsedFamilyData {
    pub fn new(family_id: String, source_file: String) -> Self {
        Self {
            metadata: FamilyMetadata {
                family_id,
                source_file,
                ..Default::default()
            },
            records: Vec::new(),
        }
    }

    /// Wrap records that did not come from a file
    pub fn from_records(family_id: impl Into<String>, records: Vec<GenotypeRecord>) -> Self {
        let mut data = Self::new(family_id.into(), String::new());
        data.records = records;
        data.calculate_call_rates();
        data
    }

    pub fn add_record(&mut self, record: GenotypeRecord) {
        self.records.push(record);
    }

    /// One person's calls in file order, for downstream per-person views
    pub fn genotypes_for(&self, member: FamilyMember) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(move |r| r.genotype(member))
    }

    pub fn calculate_call_rates(&mut self) {
        self.metadata.record_count = self.records.len();

        let rate = |member: FamilyMember| {
            let called = self.genotypes_for(member).filter(|g| !g.is_empty()).count();
            percentage(called, self.records.len()) / 100.0
        };

        let call_rates = CallRates {
            father: rate(FamilyMember::Father),
            mother: rate(FamilyMember::Mother),
            son1: rate(FamilyMember::Son1),
            son2: rate(FamilyMember::Son2),
        };
        self.metadata.call_rates = call_rates;
    }
}

/// Open a file, decompressing by extension (`.gz`, `.bz2`, `.xz`)
pub fn open_file(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let file = File::open(path).map_err(|source| ParseError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let reader: Box<dyn BufRead> = match extension.as_str() {
        "gz" => Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file))),
        "bz2" => Box::new(BufReader::new(bzip2::read::BzDecoder::new(file))),
        "xz" => Box::new(BufReader::new(xz2::read::XzDecoder::new(file))),
        _ => Box::new(BufReader::new(file)),
    };

    Ok(reader)
}

/// Strip a `chr` prefix, upper-case, and map `M` to `MT`
pub fn normalize_chromosome(chrom: &str) -> String {
    let trimmed = chrom.trim();
    let without_prefix = match trimmed.get(..3) {
        Some(prefix) if trimmed.len() > 3 && prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };

    let upper = without_prefix.to_uppercase();
    if upper == "M" {
        "MT".to_string()
    } else {
        upper
    }
}

/// Map array no-call tokens to an empty call and upper-case everything
/// else, so `d`/`i` indel calls line up with the `D`/`I` rule alleles.
pub fn normalize_genotype(genotype: &str) -> String {
    match genotype.trim() {
        "--" | "__" => String::new(),
        call => call.to_ascii_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chromosome() {
        assert_eq!(normalize_chromosome("chr1"), "1");
        assert_eq!(normalize_chromosome("CHRX"), "X");
        assert_eq!(normalize_chromosome("M"), "MT");
        assert_eq!(normalize_chromosome("chrM"), "MT");
        assert_eq!(normalize_chromosome("MT"), "MT");
        assert_eq!(normalize_chromosome("22"), "22");
        assert_eq!(normalize_chromosome("chr"), "CHR");
    }

    #[test]
    fn test_normalize_genotype() {
        assert_eq!(normalize_genotype("--"), "");
        assert_eq!(normalize_genotype("__"), "");
        assert_eq!(normalize_genotype("ag"), "AG");
        assert_eq!(normalize_genotype("dd"), "DD");
        assert_eq!(normalize_genotype("di"), "DI");
        assert_eq!(normalize_genotype("DI"), "DI");
        assert_eq!(normalize_genotype("A"), "A");
        assert_eq!(normalize_genotype("-"), "-");
    }

    #[test]
    fn test_call_rates() {
        let data = ParsedFamilyData::from_records(
            "fam",
            vec![
                GenotypeRecord::new("rs1", "1", 1, "AA", "", "AG", "GG"),
                GenotypeRecord::new("rs2", "1", 2, "", "", "AG", "GG"),
            ],
        );

        assert_eq!(data.metadata.record_count, 2);
        assert_eq!(data.metadata.call_rates.father, 0.5);
        assert_eq!(data.metadata.call_rates.mother, 0.0);
        assert_eq!(data.metadata.call_rates.son1, 1.0);
        let son2: Vec<&str> = data.genotypes_for(FamilyMember::Son2).collect();
        assert_eq!(son2, vec!["GG", "GG"]);
    }
}
