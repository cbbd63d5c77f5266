use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::parsers::ParsedFamilyData;
use crate::types::*;

/// How many ranked haplogroup candidates are kept alongside the winner
const REPORTED_CANDIDATES: usize = 5;

/// Container for all analysis results
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub families: Vec<FamilyAnalysis>,
}

impl AnalysisResults {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Every report produced for one family file. Analyses that were not
/// selected are left as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyAnalysis {
    pub metadata: FamilyMetadata,
    pub mendelian: Option<MendelianReport>,
    pub mitochondrial: Option<MitochondrialReport>,
    pub sibling_sharing: Option<SiblingSharingReport>,
    pub haplogroup: Option<HaplogroupResult>,
    pub haplogroup_candidates: Vec<HaplogroupCandidate>,
}

/// Which of the four analyses to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSelection {
    pub mendelian: bool,
    pub mitochondrial: bool,
    pub sibling_sharing: bool,
    pub haplogroup: bool,
}

impl AnalysisSelection {
    pub fn all() -> Self {
        Self {
            mendelian: true,
            mitochondrial: true,
            sibling_sharing: true,
            haplogroup: true,
        }
    }

    pub fn none() -> Self {
        Self {
            mendelian: false,
            mitochondrial: false,
            sibling_sharing: false,
            haplogroup: false,
        }
    }
}

impl Default for AnalysisSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Runs the selected analyses over parsed family data
pub struct FamilyAnalyzer {
    selection: AnalysisSelection,
    classifier: HaplogroupClassifier,
}

impl FamilyAnalyzer {
    pub fn new(selection: AnalysisSelection, classifier: HaplogroupClassifier) -> Self {
        Self {
            selection,
            classifier,
        }
    }

    /// Analyze several families in parallel
    pub fn analyze_all(&self, families: &[ParsedFamilyData]) -> AnalysisResults {
        AnalysisResults {
            families: families
                .par_iter()
                .map(|family| self.analyze(family))
                .collect(),
        }
    }

    /// The four analyses share nothing but the read-only records, so they
    /// run side by side on the rayon pool.
    pub fn analyze(&self, family: &ParsedFamilyData) -> FamilyAnalysis {
        let records = family.records.as_slice();
        let selection = self.selection;

        let ((mendelian, mitochondrial), (sibling_sharing, haplogroup)) = rayon::join(
            || {
                rayon::join(
                    || selection.mendelian.then(|| MendelianChecker::new().check(records)),
                    || {
                        selection
                            .mitochondrial
                            .then(|| MitochondrialChecker::new().check(records))
                    },
                )
            },
            || {
                rayon::join(
                    || {
                        selection
                            .sibling_sharing
                            .then(|| SiblingSharingEstimator::new().estimate(records))
                    },
                    || {
                        selection.haplogroup.then(|| {
                            let (result, mut candidates) = self.classifier.assess(records);
                            candidates.truncate(REPORTED_CANDIDATES);
                            (result, candidates)
                        })
                    },
                )
            },
        );

        let (haplogroup, haplogroup_candidates) = match haplogroup {
            Some((result, candidates)) => (Some(result), candidates),
            None => (None, Vec::new()),
        };

        info!(
            "Analyzed family {} ({} records)",
            family.metadata.family_id,
            records.len()
        );

        FamilyAnalysis {
            metadata: family.metadata.clone(),
            mendelian,
            mitochondrial,
            sibling_sharing,
            haplogroup,
            haplogroup_candidates,
        }
    }
}

/// Splits a genotype call into exactly two alleles. Anything shorter or
/// longer is treated as untested.
fn allele_pair(genotype: &str) -> Option<[char; 2]> {
    let mut chars = genotype.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(first), Some(second), None) => Some([first, second]),
        _ => None,
    }
}

/// True when one child allele can come from each parent, in either order.
pub fn is_trio_consistent(child: [char; 2], father: [char; 2], mother: [char; 2]) -> bool {
    (father.contains(&child[0]) && mother.contains(&child[1]))
        || (mother.contains(&child[0]) && father.contains(&child[1]))
}

/// Number of alleles (0, 1 or 2) the two genotypes have in common. Each
/// allele on one side can pair with at most one allele on the other.
pub fn ibs_count(first: [char; 2], second: [char; 2]) -> u8 {
    let mut first = first;
    let mut second = second;
    first.sort_unstable();
    second.sort_unstable();

    let mut consumed = [false; 2];
    let mut shared = 0;
    for allele in first {
        if let Some(slot) = (0..2).find(|&i| !consumed[i] && second[i] == allele) {
            consumed[slot] = true;
            shared += 1;
        }
    }
    shared
}

/// Diploid inheritance check of both sons against their parents
pub struct MendelianChecker;

impl MendelianChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, records: &[GenotypeRecord]) -> MendelianReport {
        let mut report = MendelianReport::default();

        for record in records.iter().filter(|r| r.is_autosomal()) {
            let (Some(father), Some(mother), Some(son1), Some(son2)) = (
                allele_pair(&record.father),
                allele_pair(&record.mother),
                allele_pair(&record.son1),
                allele_pair(&record.son2),
            ) else {
                continue;
            };

            report.total_checked += 1;
            if is_trio_consistent(son1, father, mother) && is_trio_consistent(son2, father, mother)
            {
                report.consistent_count += 1;
            } else {
                report.inconsistent_count += 1;
                report.inconsistent_records.push(record.clone());
            }
        }

        debug!(
            "Mendelian check: {} checked, {} inconsistent",
            report.total_checked, report.inconsistent_count
        );
        report
    }
}

impl Default for MendelianChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Maternal mitochondrial identity check. The father's calls are never read.
pub struct MitochondrialChecker;

impl MitochondrialChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, records: &[GenotypeRecord]) -> MitochondrialReport {
        let mut report = MitochondrialReport::default();

        for record in records.iter().filter(|r| r.is_mitochondrial()) {
            if record.mother.is_empty() || record.son1.is_empty() || record.son2.is_empty() {
                continue;
            }

            report.total_checked += 1;
            if record.mother == record.son1 && record.mother == record.son2 {
                report.match_count += 1;
            } else {
                report.mismatch_count += 1;
                report.mismatched_records.push(record.clone());
            }
        }

        debug!(
            "Mitochondrial check: {} checked, {} mismatched",
            report.total_checked, report.mismatch_count
        );
        report
    }
}

impl Default for MitochondrialChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity-by-state similarity between the two sons over autosomal markers
pub struct SiblingSharingEstimator;

impl SiblingSharingEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(&self, records: &[GenotypeRecord]) -> SiblingSharingReport {
        let mut report = SiblingSharingReport::default();

        for record in records.iter().filter(|r| r.is_autosomal()) {
            let (Some(son1), Some(son2)) = (allele_pair(&record.son1), allele_pair(&record.son2))
            else {
                continue;
            };

            report.shared_allele_sum += f64::from(ibs_count(son1, son2)) / 2.0;
            report.total_checked += 1;
        }

        if report.total_checked > 0 {
            report.shared_percentage =
                100.0 * report.shared_allele_sum / report.total_checked as f64;
        }

        debug!(
            "Sibling sharing: {} markers, {:.2}% IBS",
            report.total_checked, report.shared_percentage
        );
        report
    }
}

impl Default for SiblingSharingEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Position -> mitochondrial call, preferring the mother and falling back
/// to son1 when her call is missing.
struct MitochondrialLookup<'a> {
    calls: HashMap<u64, (&'a str, FamilyMember)>,
}

impl<'a> MitochondrialLookup<'a> {
    fn build(records: &'a [GenotypeRecord]) -> Self {
        let mut calls = HashMap::new();

        for record in records.iter().filter(|r| r.is_mitochondrial()) {
            if !record.mother.is_empty() {
                calls.insert(record.position, (record.mother.as_str(), FamilyMember::Mother));
            } else if !record.son1.is_empty() {
                calls.insert(record.position, (record.son1.as_str(), FamilyMember::Son1));
            }
        }

        Self { calls }
    }

    /// `None` when none of the rule's markers were genotyped
    fn tally(&self, rule: &HaplogroupRule) -> Option<RuleTally> {
        let mut tally = RuleTally::default();

        for marker in rule.markers.iter().filter(|m| !m.allele.is_empty()) {
            let Some(&(genotype, member)) = self.calls.get(&marker.position) else {
                continue;
            };

            tally.tested += 1;
            match member {
                FamilyMember::Mother => tally.from_mother += 1,
                _ => tally.from_proxy += 1,
            }
            if genotype.contains(marker.allele.as_str()) {
                tally.matched += 1;
            }
        }

        (tally.tested > 0).then_some(tally)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RuleTally {
    matched: usize,
    tested: usize,
    from_mother: usize,
    from_proxy: usize,
}

impl RuleTally {
    fn percentage(&self) -> f64 {
        percentage(self.matched, self.tested)
    }

    fn is_candidate(&self) -> bool {
        self.percentage() >= 50.0
    }

    /// Matched count dominates; percentage only separates equal counts.
    fn score(&self) -> f64 {
        self.matched as f64 * 100.0 + self.percentage()
    }

    fn source(&self) -> LineageSource {
        match (self.from_mother, self.from_proxy) {
            (0, 0) => LineageSource::None,
            (_, 0) => LineageSource::Mother,
            (0, _) => LineageSource::Son1Proxy,
            _ => LineageSource::Mixed,
        }
    }
}

/// Scores an ordered mitochondrial rule table against a family's MT calls
#[derive(Debug, Clone)]
pub struct HaplogroupClassifier {
    rules: Vec<HaplogroupRule>,
}

impl HaplogroupClassifier {
    pub fn new(rules: Vec<HaplogroupRule>) -> Self {
        Self { rules }
    }

    pub fn with_default_rules() -> Self {
        Self::new(crate::haplogroups::default_rules().to_vec())
    }

    pub fn rules(&self) -> &[HaplogroupRule] {
        &self.rules
    }

    /// Pick the rule with the highest score. Rules are visited in table
    /// order and only a strictly greater score replaces the current best,
    /// so ties go to the earlier rule.
    pub fn classify(&self, records: &[GenotypeRecord]) -> HaplogroupResult {
        let lookup = MitochondrialLookup::build(records);
        Self::best_of(&self.candidate_tallies(&lookup))
    }

    /// All candidate rules, best first. The sort is stable, so equal scores
    /// keep table order and the head agrees with `classify`.
    pub fn rank(&self, records: &[GenotypeRecord]) -> Vec<HaplogroupCandidate> {
        let lookup = MitochondrialLookup::build(records);
        Self::ranked(&self.candidate_tallies(&lookup))
    }

    /// `classify` and `rank` together, scoring each rule once
    pub fn assess(
        &self,
        records: &[GenotypeRecord],
    ) -> (HaplogroupResult, Vec<HaplogroupCandidate>) {
        let lookup = MitochondrialLookup::build(records);
        let tallies = self.candidate_tallies(&lookup);
        (Self::best_of(&tallies), Self::ranked(&tallies))
    }

    /// Rules that reached candidate status, in table order
    fn candidate_tallies(&self, lookup: &MitochondrialLookup) -> Vec<(&HaplogroupRule, RuleTally)> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let tally = lookup.tally(rule)?;
                tally.is_candidate().then_some((rule, tally))
            })
            .collect()
    }

    fn best_of(tallies: &[(&HaplogroupRule, RuleTally)]) -> HaplogroupResult {
        let mut best: Option<&(&HaplogroupRule, RuleTally)> = None;
        for entry in tallies {
            if best.map_or(true, |(_, current)| entry.1.score() > current.score()) {
                best = Some(entry);
            }
        }

        match best {
            Some((rule, tally)) => {
                debug!(
                    "Haplogroup {} matched {}/{} markers",
                    rule.label, tally.matched, tally.tested
                );
                HaplogroupResult {
                    label: rule.label.clone(),
                    matched_marker_count: tally.matched,
                    tested_marker_count: tally.tested,
                    confidence_percentage: tally.percentage(),
                    description: rule.description.clone(),
                    source: tally.source(),
                }
            }
            None => {
                debug!("No haplogroup rule reached candidate status");
                HaplogroupResult::undetermined()
            }
        }
    }

    fn ranked(tallies: &[(&HaplogroupRule, RuleTally)]) -> Vec<HaplogroupCandidate> {
        let mut candidates: Vec<HaplogroupCandidate> = tallies
            .iter()
            .map(|(rule, tally)| HaplogroupCandidate {
                label: rule.label.clone(),
                matched: tally.matched,
                tested: tally.tested,
                percentage: tally.percentage(),
                score: tally.score(),
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }
}
