use anyhow::{Context, Result};
use chrono::Local;
use csv::WriterBuilder;
use serde_json::to_string_pretty;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::{AnalysisResults, FamilyAnalysis};
use crate::types::*;

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Csv,
    Json,
    Tsv,
    All,
}

/// Report generator for analysis results
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: &Path) -> Result<Self> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir).with_context(|| {
                format!("Failed to create output directory {}", output_dir.display())
            })?;
        }

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Generate reports in the requested format(s), returning the files written
    pub fn generate(&self, results: &AnalysisResults, format: ReportFormat) -> Result<Vec<PathBuf>> {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut written = Vec::new();

        match format {
            ReportFormat::Html => written.push(self.generate_html_report(results, &timestamp)?),
            ReportFormat::Csv => {
                written.extend(self.generate_table_reports(results, &timestamp, Delimited::Csv)?)
            }
            ReportFormat::Json => written.push(self.generate_json_report(results, &timestamp)?),
            ReportFormat::Tsv => {
                written.extend(self.generate_table_reports(results, &timestamp, Delimited::Tsv)?)
            }
            ReportFormat::All => {
                written.push(self.generate_html_report(results, &timestamp)?);
                written.extend(self.generate_table_reports(results, &timestamp, Delimited::Csv)?);
                written.push(self.generate_json_report(results, &timestamp)?);
                written.extend(self.generate_table_reports(results, &timestamp, Delimited::Tsv)?);
            }
        }

        info!("Wrote {} report files to {}", written.len(), self.output_dir.display());
        Ok(written)
    }

    fn generate_json_report(&self, results: &AnalysisResults, timestamp: &str) -> Result<PathBuf> {
        let filename = self.output_dir.join(format!("report_{}.json", timestamp));

        let json_content =
            to_string_pretty(results).with_context(|| "Failed to serialize results to JSON")?;

        fs::write(&filename, json_content)
            .with_context(|| format!("Failed to write JSON report to {}", filename.display()))?;

        Ok(filename)
    }

    fn generate_html_report(&self, results: &AnalysisResults, timestamp: &str) -> Result<PathBuf> {
        let filename = self.output_dir.join(format!("report_{}.html", timestamp));

        fs::write(&filename, self.create_html_content(results))
            .with_context(|| format!("Failed to write HTML report to {}", filename.display()))?;

        Ok(filename)
    }

    fn create_html_content(&self, results: &AnalysisResults) -> String {
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let sections: String = results
            .families
            .iter()
            .map(|family| self.family_html(family))
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Family Concordance Report</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            margin: 40px;
            background-color: #f5f5f5;
        }}
        .container {{
            max-width: 1200px;
            margin: 0 auto;
            background-color: white;
            padding: 30px;
            border-radius: 10px;
            box-shadow: 0 0 10px rgba(0,0,0,0.1);
        }}
        h1, h2, h3 {{
            color: #2c3e50;
        }}
        table {{
            width: 100%;
            border-collapse: collapse;
            margin: 20px 0;
        }}
        th, td {{
            border: 1px solid #ddd;
            padding: 12px;
            text-align: left;
        }}
        th {{
            background-color: #3498db;
            color: white;
        }}
        tr:nth-child(even) {{
            background-color: #f2f2f2;
        }}
        .section {{
            margin: 30px 0;
        }}
        .summary-box {{
            background-color: #e8f4f8;
            padding: 20px;
            border-radius: 5px;
            margin: 20px 0;
            white-space: pre-line;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Family Concordance Report</h1>
        <p>Generated on: {}</p>
        <p>{} families analyzed.</p>
        {}
    </div>
</body>
</html>"#,
            generated,
            results.families.len(),
            sections
        )
    }

    fn family_html(&self, family: &FamilyAnalysis) -> String {
        let mut html = format!(
            "<div class=\"section\"><h2>Family {}</h2>\n<div class=\"summary-box\">{}</div>\n",
            escape_html(&family.metadata.family_id),
            escape_html(&summary_text(family))
        );

        if let Some(report) = &family.mendelian {
            html.push_str(&records_html(
                "Mendelian Inconsistencies",
                &report.inconsistent_records,
            ));
        }
        if let Some(report) = &family.mitochondrial {
            html.push_str(&records_html(
                "Mitochondrial Mismatches",
                &report.mismatched_records,
            ));
        }
        if !family.haplogroup_candidates.is_empty() {
            html.push_str("<h3>Haplogroup Candidates</h3>\n<table>\n<tr><th>Haplogroup</th><th>Matched</th><th>Tested</th><th>Match %</th><th>Score</th></tr>\n");
            for candidate in &family.haplogroup_candidates {
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}</td></tr>\n",
                    escape_html(&candidate.label),
                    candidate.matched,
                    candidate.tested,
                    candidate.percentage,
                    candidate.score
                ));
            }
            html.push_str("</table>\n");
        }

        html.push_str("</div>\n");
        html
    }

    fn generate_table_reports(
        &self,
        results: &AnalysisResults,
        timestamp: &str,
        kind: Delimited,
    ) -> Result<Vec<PathBuf>> {
        let mut written = vec![self.write_summary_table(results, timestamp, kind)?];

        let inconsistent: Vec<(&str, &GenotypeRecord)> = results
            .families
            .iter()
            .flat_map(|family| {
                family.mendelian.iter().flat_map(move |report| {
                    report
                        .inconsistent_records
                        .iter()
                        .map(move |record| (family.metadata.family_id.as_str(), record))
                })
            })
            .collect();
        if !inconsistent.is_empty() {
            written.push(self.write_record_table(
                "mendelian_inconsistencies",
                &inconsistent,
                timestamp,
                kind,
            )?);
        }

        let mismatched: Vec<(&str, &GenotypeRecord)> = results
            .families
            .iter()
            .flat_map(|family| {
                family.mitochondrial.iter().flat_map(move |report| {
                    report
                        .mismatched_records
                        .iter()
                        .map(move |record| (family.metadata.family_id.as_str(), record))
                })
            })
            .collect();
        if !mismatched.is_empty() {
            written.push(self.write_record_table(
                "mitochondrial_mismatches",
                &mismatched,
                timestamp,
                kind,
            )?);
        }

        Ok(written)
    }

    fn write_summary_table(
        &self,
        results: &AnalysisResults,
        timestamp: &str,
        kind: Delimited,
    ) -> Result<PathBuf> {
        let filename = self
            .output_dir
            .join(format!("family_summary_{}.{}", timestamp, kind.extension()));

        let mut wtr = WriterBuilder::new()
            .delimiter(kind.delimiter())
            .from_path(&filename)
            .with_context(|| format!("Failed to create writer for {}", filename.display()))?;

        wtr.write_record([
            "family_id",
            "records",
            "skipped_lines",
            "mendelian_checked",
            "mendelian_consistent",
            "mendelian_inconsistent",
            "mt_checked",
            "mt_match",
            "mt_mismatch",
            "sibling_checked",
            "sibling_shared_allele_sum",
            "sibling_ibs_percentage",
            "haplogroup",
            "haplogroup_matched",
            "haplogroup_tested",
            "haplogroup_confidence",
            "haplogroup_source",
        ])?;

        for family in &results.families {
            let mendelian = family.mendelian.as_ref();
            let mitochondrial = family.mitochondrial.as_ref();
            let sibling = family.sibling_sharing.as_ref();
            let haplogroup = family.haplogroup.as_ref();

            wtr.write_record([
                family.metadata.family_id.clone(),
                family.metadata.record_count.to_string(),
                family.metadata.skipped_lines.to_string(),
                optional(mendelian.map(|r| r.total_checked)),
                optional(mendelian.map(|r| r.consistent_count)),
                optional(mendelian.map(|r| r.inconsistent_count)),
                optional(mitochondrial.map(|r| r.total_checked)),
                optional(mitochondrial.map(|r| r.match_count)),
                optional(mitochondrial.map(|r| r.mismatch_count)),
                optional(sibling.map(|r| r.total_checked)),
                optional(sibling.map(|r| format!("{:.1}", r.shared_allele_sum))),
                optional(sibling.map(|r| format!("{:.4}", r.shared_percentage))),
                optional(haplogroup.map(|h| h.label.clone())),
                optional(haplogroup.map(|h| h.matched_marker_count)),
                optional(haplogroup.map(|h| h.tested_marker_count)),
                optional(haplogroup.map(|h| format!("{:.4}", h.confidence_percentage))),
                optional(haplogroup.map(|h| format!("{:?}", h.source))),
            ])?;
        }

        wtr.flush()?;
        Ok(filename)
    }

    fn write_record_table(
        &self,
        name: &str,
        rows: &[(&str, &GenotypeRecord)],
        timestamp: &str,
        kind: Delimited,
    ) -> Result<PathBuf> {
        let filename = self
            .output_dir
            .join(format!("{}_{}.{}", name, timestamp, kind.extension()));

        let mut wtr = WriterBuilder::new()
            .delimiter(kind.delimiter())
            .from_path(&filename)
            .with_context(|| format!("Failed to create writer for {}", filename.display()))?;

        wtr.write_record([
            "family_id",
            "marker_id",
            "chromosome",
            "position",
            "father",
            "mother",
            "son1",
            "son2",
        ])?;

        for (family_id, record) in rows {
            wtr.write_record([
                *family_id,
                record.marker_id.as_str(),
                record.chromosome.as_str(),
                record.position.to_string().as_str(),
                record.father.as_str(),
                record.mother.as_str(),
                record.son1.as_str(),
                record.son2.as_str(),
            ])?;
        }

        wtr.flush()?;
        Ok(filename)
    }
}

#[derive(Debug, Clone, Copy)]
enum Delimited {
    Csv,
    Tsv,
}

impl Delimited {
    fn delimiter(self) -> u8 {
        match self {
            Delimited::Csv => b',',
            Delimited::Tsv => b'\t',
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Delimited::Csv => "csv",
            Delimited::Tsv => "tsv",
        }
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn records_html(title: &str, records: &[GenotypeRecord]) -> String {
    if records.is_empty() {
        return format!("<h3>{}</h3><p>None found.</p>\n", title);
    }

    let mut html = format!(
        "<h3>{}</h3>\n<table>\n<tr><th>Marker</th><th>Chromosome</th><th>Position</th><th>Father</th><th>Mother</th><th>Son 1</th><th>Son 2</th></tr>\n",
        title
    );
    for record in records {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&record.marker_id),
            escape_html(&record.chromosome),
            record.position,
            escape_html(&record.father),
            escape_html(&record.mother),
            escape_html(&record.son1),
            escape_html(&record.son2)
        ));
    }
    html.push_str("</table>\n");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Plain-text summary of one family's results for the console and HTML report
pub fn summary_text(family: &FamilyAnalysis) -> String {
    let mut text = String::new();

    if let Some(report) = &family.mendelian {
        text.push_str(&format!(
            "Mendelian inheritance: {} of {} autosomal markers consistent ({:.2}%), {} inconsistent.\n",
            report.consistent_count,
            report.total_checked,
            report.consistency_percentage(),
            report.inconsistent_count
        ));
    }

    if let Some(report) = &family.mitochondrial {
        text.push_str(&format!(
            "Mitochondrial DNA: {} of {} markers identical between mother and both sons ({:.2}%), {} mismatched.\n",
            report.match_count,
            report.total_checked,
            report.match_percentage(),
            report.mismatch_count
        ));
    }

    if let Some(report) = &family.sibling_sharing {
        text.push_str(&format!(
            "Sibling sharing: {:.2}% identity by state over {} autosomal markers. \
             This is an IBS measure, not identity by descent; full siblings typically \
             score around 80-90% on it rather than the 50% expected for IBD.\n",
            report.shared_percentage, report.total_checked
        ));
    }

    if let Some(result) = &family.haplogroup {
        if result.is_determined() {
            text.push_str(&format!(
                "Maternal haplogroup: {} ({} of {} markers, {:.1}%). {}\n",
                result.label,
                result.matched_marker_count,
                result.tested_marker_count,
                result.confidence_percentage,
                result.description
            ));
            match result.source {
                LineageSource::Son1Proxy => text.push_str(
                    "Mother's mitochondrial calls were missing; son1's calls were used in their place.\n",
                ),
                LineageSource::Mixed => text.push_str(
                    "Some of the mother's mitochondrial calls were missing and were filled in from son1.\n",
                ),
                LineageSource::Mother | LineageSource::None => {}
            }
        } else {
            text.push_str("Maternal haplogroup: undetermined from the available mitochondrial markers.\n");
        }
        text.push_str(
            "Paternal (Y-DNA) haplogroups are not classified; use a dedicated Y-DNA tool.\n",
        );
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisSelection, FamilyAnalyzer, HaplogroupClassifier};
    use crate::parsers::ParsedFamilyData;
    use tempfile::TempDir;

    fn sample_results() -> AnalysisResults {
        let records = vec![
            GenotypeRecord::new("rs1", "1", 1000, "AG", "CT", "AC", "GT"),
            GenotypeRecord::new("rs2", "1", 2000, "AG", "CT", "CC", "GT"),
            GenotypeRecord::new("i1", "MT", 2706, "", "A", "A", "A"),
            GenotypeRecord::new("i2", "MT", 7028, "", "C", "T", "C"),
        ];
        let analyzer =
            FamilyAnalyzer::new(AnalysisSelection::all(), HaplogroupClassifier::with_default_rules());
        analyzer.analyze_all(&[ParsedFamilyData::from_records("smith", records)])
    }

    #[test]
    fn test_generate_all_formats() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = ReportGenerator::new(&temp_dir.path().join("reports"))?;

        let written = generator.generate(&sample_results(), ReportFormat::All)?;
        for path in &written {
            assert!(path.exists(), "missing {}", path.display());
        }

        let extensions: Vec<String> = written
            .iter()
            .filter_map(|p| p.extension().map(|e| e.to_string_lossy().to_string()))
            .collect();
        assert!(extensions.contains(&"html".to_string()));
        assert!(extensions.contains(&"json".to_string()));
        // summary, inconsistencies and mismatches for each of CSV and TSV
        assert_eq!(extensions.iter().filter(|e| *e == "csv").count(), 3);
        assert_eq!(extensions.iter().filter(|e| *e == "tsv").count(), 3);

        Ok(())
    }

    #[test]
    fn test_csv_summary_contents() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = ReportGenerator::new(temp_dir.path())?;

        let written = generator.generate(&sample_results(), ReportFormat::Csv)?;
        let summary = written
            .iter()
            .find(|p| p.to_string_lossy().contains("family_summary"))
            .expect("summary written");

        let mut reader = csv::Reader::from_path(summary)?;
        let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "smith");
        assert_eq!(&rows[0][3], "2");
        assert_eq!(&rows[0][5], "1");

        Ok(())
    }

    #[test]
    fn test_json_round_trips_family() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let generator = ReportGenerator::new(temp_dir.path())?;

        let written = generator.generate(&sample_results(), ReportFormat::Json)?;
        let parsed: AnalysisResults = serde_json::from_str(&fs::read_to_string(&written[0])?)?;
        assert_eq!(parsed.families[0].metadata.family_id, "smith");
        assert_eq!(
            parsed.families[0].mitochondrial.as_ref().map(|r| r.mismatch_count),
            Some(1)
        );

        Ok(())
    }

    #[test]
    fn test_summary_mentions_ibs_and_proxy() {
        let family = FamilyAnalysis {
            sibling_sharing: Some(SiblingSharingReport {
                total_checked: 4,
                shared_allele_sum: 3.5,
                shared_percentage: 87.5,
            }),
            haplogroup: Some(HaplogroupResult {
                label: "H".to_string(),
                matched_marker_count: 2,
                tested_marker_count: 2,
                confidence_percentage: 100.0,
                description: "Most common maternal lineage in Europe".to_string(),
                source: LineageSource::Son1Proxy,
            }),
            ..Default::default()
        };

        let text = summary_text(&family);
        assert!(text.contains("87.50% identity by state"));
        assert!(text.contains("not identity by descent"));
        assert!(text.contains("son1's calls were used"));
        assert!(!text.contains("Mendelian"));
    }

    #[test]
    fn test_summary_undetermined_haplogroup() {
        let family = FamilyAnalysis {
            haplogroup: Some(HaplogroupResult::undetermined()),
            ..Default::default()
        };
        assert!(summary_text(&family).contains("undetermined"));
    }

    #[test]
    fn test_summary_puts_each_analysis_on_its_own_line() {
        let family = FamilyAnalysis {
            mendelian: Some(MendelianReport {
                total_checked: 2,
                consistent_count: 1,
                inconsistent_count: 1,
                inconsistent_records: Vec::new(),
            }),
            mitochondrial: Some(MitochondrialReport::default()),
            ..Default::default()
        };

        let text = summary_text(&family);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Mendelian inheritance: 1 of 2"));
        assert!(lines[1].starts_with("Mitochondrial DNA: 0 of 0"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
    }
}
