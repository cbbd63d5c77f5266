use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ParseError;
use crate::parsers::{normalize_chromosome, normalize_genotype, open_file, ParsedFamilyData};
use crate::types::*;

/// Columns per data line: marker, chromosome, position, father, son1, son2, mother
const FAMILY_COLUMNS: usize = 7;

/// Parser for whitespace-delimited four-person genotype files
pub struct FamilyFileParser;

impl FamilyFileParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<ParsedFamilyData, ParseError> {
        let reader = open_file(path)?;
        let data = self.initialize_data(path);
        let data = self.read_records(reader, data, path)?;

        info!(
            "Parsed {} records from {} ({} lines skipped)",
            data.metadata.record_count,
            path.display(),
            data.metadata.skipped_lines
        );
        Ok(data)
    }

    /// Parse from any buffered reader; `family_id` names the result
    pub fn parse_reader<R: BufRead>(
        &self,
        reader: R,
        family_id: &str,
    ) -> Result<ParsedFamilyData, ParseError> {
        let data = ParsedFamilyData::new(family_id.to_string(), String::new());
        self.read_records(reader, data, Path::new(family_id))
    }

    fn initialize_data(&self, path: &Path) -> ParsedFamilyData {
        // `family.txt.gz` -> `family`
        let mut stem = path.to_path_buf();
        while matches!(
            stem.extension().and_then(|e| e.to_str()),
            Some("gz" | "bz2" | "xz" | "txt" | "tsv" | "csv")
        ) {
            stem.set_extension("");
        }

        let family_id = stem
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        ParsedFamilyData::new(family_id, path.to_string_lossy().to_string())
    }

    fn read_records<R: BufRead>(
        &self,
        mut reader: R,
        mut data: ParsedFamilyData,
        path: &Path,
    ) -> Result<ParsedFamilyData, ParseError> {
        let mut buf = Vec::new();
        let mut line_number = 0;

        loop {
            buf.clear();
            line_number += 1;
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| ParseError::Read {
                    path: path.to_path_buf(),
                    line: line_number,
                    source,
                })?;
            if read == 0 {
                break;
            }

            // Undecodable bytes spoil only their own line
            let Ok(line) = std::str::from_utf8(&buf) else {
                debug!("Skipping line {}: not valid UTF-8", line_number);
                data.metadata.skipped_lines += 1;
                continue;
            };

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match self.parse_data_line(trimmed) {
                Some(record) => data.add_record(record),
                None => {
                    debug!("Skipping line {}: {}", line_number, trimmed);
                    data.metadata.skipped_lines += 1;
                }
            }
        }

        data.calculate_call_rates();
        Ok(data)
    }

    /// `None` for short lines and lines whose position is not a number,
    /// which also covers header rows.
    fn parse_data_line(&self, line: &str) -> Option<GenotypeRecord> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < FAMILY_COLUMNS {
            return None;
        }

        let position: u64 = parts[2].parse().ok()?;

        Some(GenotypeRecord {
            marker_id: parts[0].to_string(),
            chromosome: normalize_chromosome(parts[1]),
            position,
            father: normalize_genotype(parts[3]),
            son1: normalize_genotype(parts[4]),
            son2: normalize_genotype(parts[5]),
            mother: normalize_genotype(parts[6]),
        })
    }
}

impl Default for FamilyFileParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::HaplogroupClassifier;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    const SAMPLE: &str = "\
# family genotype export
rsid\tchromosome\tposition\tfather\tson1\tson2\tmother

rs1\t1\t1000\tAG\tAC\tGT\tCT
rs2\tchr2\t2000\t--\tAA\tAA\tAA
i700\tMT\t2706\t__\tA\tA\tA
rs3\t1\t3000\tAG\tAC
rs4\tX\tnot_a_number\tA\tA\tA\tA
";

    #[test]
    fn test_parse_family_lines() {
        let parser = FamilyFileParser::new();
        let data = parser
            .parse_reader(Cursor::new(SAMPLE), "family")
            .unwrap();

        assert_eq!(data.records.len(), 3);
        assert_eq!(data.metadata.family_id, "family");
        // header row, short row, bad position
        assert_eq!(data.metadata.skipped_lines, 3);

        let first = &data.records[0];
        assert_eq!(first.marker_id, "rs1");
        assert_eq!(first.father, "AG");
        assert_eq!(first.son1, "AC");
        assert_eq!(first.son2, "GT");
        assert_eq!(first.mother, "CT");

        assert_eq!(data.records[1].chromosome, "2");
        assert_eq!(data.records[1].father, "");
        assert_eq!(data.records[2].chromosome, "MT");
        assert_eq!(data.records[2].position, 2706);
        assert_eq!(data.records[2].father, "");
    }

    #[test]
    fn test_parse_empty_input() {
        let data = FamilyFileParser::new()
            .parse_reader(Cursor::new(""), "empty")
            .unwrap();
        assert!(data.records.is_empty());
        assert_eq!(data.metadata.call_rates.father, 0.0);
    }

    #[test]
    fn test_parse_gzip_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("smith.txt.gz");

        let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let data = FamilyFileParser::new().parse(&path).unwrap();
        assert_eq!(data.metadata.family_id, "smith");
        assert_eq!(data.records.len(), 3);
        assert!(data.metadata.source_file.ends_with("smith.txt.gz"));
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut input = b"rs1\t1\t1000\tAG\tAC\tGT\tCT\n".to_vec();
        input.extend_from_slice(b"rs2\t1\t2000\t\xff\xfe\tAA\tAA\tAA\n");
        input.extend_from_slice(b"rs3\t1\t3000\tAA\tAA\tAA\tAA\n");

        let data = FamilyFileParser::new()
            .parse_reader(Cursor::new(input), "family")
            .unwrap();

        let ids: Vec<&str> = data.records.iter().map(|r| r.marker_id.as_str()).collect();
        assert_eq!(ids, vec!["rs1", "rs3"]);
        assert_eq!(data.metadata.skipped_lines, 1);
    }

    #[test]
    fn test_lowercase_deletion_classifies_as_b() {
        let input = "\
i1\tMT\t8281\t--\td\td\td
i2\tMT\t16189\t--\tC\tC\tC
i3\tMT\t16217\t--\tC\tC\tC
";
        let data = FamilyFileParser::new()
            .parse_reader(Cursor::new(input), "family")
            .unwrap();
        assert_eq!(data.records[0].mother, "D");

        let result = HaplogroupClassifier::with_default_rules().classify(&data.records);
        assert_eq!(result.label, "B");
        assert_eq!(result.matched_marker_count, 3);
        assert_eq!(result.tested_marker_count, 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = FamilyFileParser::new().parse(Path::new("/nonexistent/family.txt"));
        assert!(matches!(result, Err(ParseError::Open { .. })));
    }
}
