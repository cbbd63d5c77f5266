use family_concordance::{
    haplogroups::load_rules, AnalysisSelection, FamilyAnalyzer, FamilyFileParser, FileDiscovery,
    HaplogroupClassifier, LineageSource, ReportFormat, ReportGenerator,
};
use std::fs;
use tempfile::TempDir;

const FAMILY: &str = "\
# rsid chromosome position father son1 son2 mother
rs1\t1\t1000\tAG\tAC\tGT\tCT
rs2\t2\t2000\tAA\tAG\tAA\tAG
rs3\t3\t3000\tAG\tCC\tAC\tCT
rs4\tX\t4000\tA\tA\tA\tAA
rs5\t5\t5000\t--\tAA\tAA\tAA
i1\tMT\t2706\t--\tA\tA\tA
i2\tMT\t7028\tT\tC\tC\tC
i3\tMT\t11719\t--\tG\tG\t--
i4\tMT\t14766\t--\tC\tT\tC
i5\tMT\t73\t--\tA\tA\tA
";

#[test]
fn test_family_file_end_to_end() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("jones.txt");
    fs::write(&input, FAMILY)?;

    let files = FileDiscovery::new(false).discover(&[temp_dir.path().to_path_buf()])?;
    assert_eq!(files, vec![input.clone()]);

    let family = FamilyFileParser::new().parse(&input)?;
    assert_eq!(family.metadata.family_id, "jones");
    assert_eq!(family.records.len(), 10);

    let analyzer =
        FamilyAnalyzer::new(AnalysisSelection::all(), HaplogroupClassifier::with_default_rules());
    let analysis = analyzer.analyze(&family);

    let mendelian = analysis.mendelian.as_ref().expect("mendelian report");
    assert_eq!(mendelian.total_checked, 3);
    assert_eq!(mendelian.consistent_count, 2);
    assert_eq!(mendelian.inconsistent_count, 1);
    assert_eq!(mendelian.inconsistent_records[0].marker_id, "rs3");

    let mitochondrial = analysis.mitochondrial.as_ref().expect("mitochondrial report");
    assert_eq!(mitochondrial.total_checked, 4);
    assert_eq!(mitochondrial.match_count, 3);
    assert_eq!(mitochondrial.mismatched_records[0].position, 14766);

    // rs1 AC/GT shares 0, rs2 AG/AA 1, rs3 CC/AC 1, rs5 AA/AA 2
    let sibling = analysis.sibling_sharing.as_ref().expect("sibling report");
    assert_eq!(sibling.total_checked, 4);
    assert!((sibling.shared_allele_sum - 2.0).abs() < 1e-9);
    assert!((sibling.shared_percentage - 50.0).abs() < 1e-9);

    // H matches all five of its markers, with 11719 filled in from son1
    let haplogroup = analysis.haplogroup.as_ref().expect("haplogroup result");
    assert_eq!(haplogroup.label, "H");
    assert_eq!(haplogroup.matched_marker_count, 5);
    assert_eq!(haplogroup.tested_marker_count, 5);
    assert_eq!(haplogroup.source, LineageSource::Mixed);
    assert_eq!(analysis.haplogroup_candidates[0].label, "H");

    let generator = ReportGenerator::new(&temp_dir.path().join("out"))?;
    let written = generator.generate(
        &family_concordance::AnalysisResults {
            families: vec![analysis],
        },
        ReportFormat::Json,
    )?;
    assert_eq!(written.len(), 1);
    assert!(fs::read_to_string(&written[0])?.contains("\"label\": \"H\""));

    Ok(())
}

#[test]
fn test_custom_rule_table() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let rules_path = temp_dir.path().join("rules.toml");
    fs::write(
        &rules_path,
        r#"
[[haplogroups]]
label = "Shallow"
description = "One marker"
markers = ["2706A"]

[[haplogroups]]
label = "Deeper"
description = "Two markers"
markers = ["2706A", { position = 7028, allele = "C", weight = 0.5 }]
"#,
    )?;

    let family = FamilyFileParser::new().parse_reader(FAMILY.as_bytes(), "jones")?;
    let classifier = HaplogroupClassifier::new(load_rules(&rules_path)?);
    let result = classifier.classify(&family.records);

    assert_eq!(result.label, "Deeper");
    assert_eq!(result.description, "Two markers");
    assert_eq!(result.source, LineageSource::Mother);

    Ok(())
}
