//! Mitochondrial haplogroup rule tables.
//!
//! The built-in table lists major lineages from the root outwards. The
//! classifier keeps the earlier rule on a tied score, so a deeper lineage
//! only wins when it matches strictly more markers than its parent.
//!
//! Positions follow the revised Cambridge Reference Sequence. Deletions are
//! written as `D`, matching how consumer arrays report them.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::RuleTableError;
use crate::types::{HaplogroupRule, MarkerRule};

lazy_static! {
    static ref DEFAULT_RULES: Vec<HaplogroupRule> = BUILTIN_TABLE
        .iter()
        .map(|(label, description, markers)| HaplogroupRule {
            label: label.to_string(),
            description: description.to_string(),
            markers: markers
                .iter()
                .map(|&(position, allele)| MarkerRule::new(position, allele))
                .collect(),
        })
        .collect();
    static ref COMPACT_MARKER: Regex = Regex::new(r"^(\d+)([A-Za-z-]+)$").expect("compact marker pattern");
}

type BuiltinRule = (&'static str, &'static str, &'static [(u64, &'static str)]);

const BUILTIN_TABLE: &[BuiltinRule] = &[
    (
        "L1",
        "Deep African lineage, most common among Central and West African populations",
        &[(3666, "A"), (7055, "G"), (7389, "C"), (13789, "C"), (14178, "C")],
    ),
    (
        "L2",
        "African lineage widespread across sub-Saharan Africa",
        &[(2416, "C"), (8206, "A"), (9221, "G"), (10115, "C"), (13590, "A"), (16390, "A")],
    ),
    (
        "L3",
        "African lineage ancestral to all non-African maternal lines",
        &[(769, "G"), (1018, "G"), (16311, "C")],
    ),
    (
        "M",
        "Out-of-Africa macro-haplogroup dominant in South and East Asia",
        &[(489, "C"), (10400, "T"), (14783, "C"), (15043, "A")],
    ),
    (
        "N",
        "Out-of-Africa macro-haplogroup ancestral to most West Eurasian lines",
        &[(8701, "A"), (9540, "T"), (10398, "A"), (10873, "T"), (15301, "A")],
    ),
    (
        "R",
        "Descendant of N, parent of most European and many Asian lineages",
        &[(12705, "C"), (16223, "C")],
    ),
    (
        "HV",
        "West Eurasian branch of R that gave rise to H and V",
        &[(2706, "A"), (7028, "C"), (14766, "C")],
    ),
    (
        "H",
        "Most common maternal lineage in Europe",
        &[(2706, "A"), (7028, "C"), (11719, "G"), (14766, "C"), (73, "A")],
    ),
    (
        "H1",
        "Major branch of H frequent in Western Europe and Scandinavia",
        &[(2706, "A"), (7028, "C"), (11719, "G"), (14766, "C"), (73, "A"), (3010, "A")],
    ),
    (
        "H5",
        "Branch of H concentrated around the Caucasus and Central Europe",
        &[(2706, "A"), (7028, "C"), (11719, "G"), (14766, "C"), (73, "A"), (456, "T"), (16304, "C")],
    ),
    (
        "V",
        "Sister of H, frequent among the Saami and in Iberia",
        &[(2706, "A"), (7028, "C"), (4580, "A"), (15904, "T"), (16298, "C")],
    ),
    (
        "J",
        "Lineage that spread with early Neolithic farmers from the Near East",
        &[(295, "T"), (489, "C"), (10398, "G"), (12612, "G"), (13708, "A"), (16069, "T")],
    ),
    (
        "T",
        "Near Eastern lineage found throughout Europe and Central Asia",
        &[(709, "A"), (1888, "A"), (4917, "G"), (8697, "A"), (10463, "C"), (15607, "G"), (16126, "C"), (16294, "T")],
    ),
    (
        "U",
        "Ancient West Eurasian lineage carried by Palaeolithic hunter-gatherers",
        &[(11467, "G"), (12308, "G"), (12372, "A")],
    ),
    (
        "U5",
        "Oldest European branch of U, frequent in Finland and among the Saami",
        &[(11467, "G"), (12308, "G"), (12372, "A"), (3197, "C"), (9477, "A"), (13617, "C")],
    ),
    (
        "K",
        "Branch of U8 common in Europe and among Ashkenazi Jews",
        &[(11467, "G"), (12308, "G"), (12372, "A"), (1189, "C"), (10550, "G"), (14798, "C"), (16224, "C"), (16311, "C")],
    ),
    (
        "I",
        "Rare West Eurasian lineage derived from N1",
        &[(4529, "T"), (8251, "A"), (10034, "C"), (16129, "A"), (16223, "T"), (16391, "A")],
    ),
    (
        "W",
        "Lineage spread from South Asia through Europe at low frequency",
        &[(189, "G"), (204, "C"), (207, "A"), (1243, "C"), (3505, "G"), (5460, "A"), (8251, "A"), (8994, "A"), (11947, "G"), (15884, "C"), (16292, "T")],
    ),
    (
        "X",
        "Widely scattered lineage found in Europe, the Near East and North America",
        &[(6221, "C"), (6371, "T"), (13966, "G"), (14470, "C"), (16189, "C"), (16278, "T")],
    ),
    (
        "A",
        "East Asian lineage and one of the founding lines of the Americas",
        &[(663, "G"), (1736, "G"), (4248, "C"), (4824, "G"), (8794, "T"), (16290, "T"), (16319, "A")],
    ),
    (
        "B",
        "East Asian and Native American lineage marked by the 9-bp deletion",
        &[(8281, "D"), (16189, "C"), (16217, "C")],
    ),
    (
        "C",
        "Siberian and Native American branch of M",
        &[(3552, "A"), (9545, "G"), (11914, "A"), (13263, "G"), (14318, "C"), (16327, "T")],
    ),
    (
        "D",
        "Branch of M common in Northeast Asia and the Americas",
        &[(4883, "T"), (5178, "A"), (16362, "C")],
    ),
];

/// The curated rule table shipped with the tool
pub fn default_rules() -> &'static [HaplogroupRule] {
    &DEFAULT_RULES
}

#[derive(Debug, Deserialize)]
struct RuleTableFile {
    #[serde(default, alias = "rules")]
    haplogroups: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    label: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    markers: Vec<MarkerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarkerEntry {
    Compact(String),
    Full(MarkerRule),
}

/// Load a rule table from TOML (`.toml`) or JSON (any other extension).
///
/// Markers may be tables (`{ position = 16223, allele = "T" }`) or compact
/// strings (`"16223T"`). Table order is preserved.
pub fn load_rules(path: &Path) -> Result<Vec<HaplogroupRule>, RuleTableError> {
    let content = fs::read_to_string(path).map_err(|source| RuleTableError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    let rules = if is_toml {
        parse_toml_rules(&content)?
    } else {
        parse_json_rules(&content)?
    };

    info!("Loaded {} haplogroup rules from {}", rules.len(), path.display());
    Ok(rules)
}

pub fn parse_toml_rules(content: &str) -> Result<Vec<HaplogroupRule>, RuleTableError> {
    let file: RuleTableFile = toml::from_str(content)?;
    into_rules(file)
}

pub fn parse_json_rules(content: &str) -> Result<Vec<HaplogroupRule>, RuleTableError> {
    let file: RuleTableFile = serde_json::from_str(content)?;
    into_rules(file)
}

fn into_rules(file: RuleTableFile) -> Result<Vec<HaplogroupRule>, RuleTableError> {
    file.haplogroups
        .into_iter()
        .map(|entry| {
            let markers = entry
                .markers
                .into_iter()
                .map(|marker| match marker {
                    MarkerEntry::Full(rule) => Ok(rule),
                    MarkerEntry::Compact(text) => parse_compact_marker(&text).ok_or_else(|| {
                        RuleTableError::InvalidMarker {
                            rule: entry.label.clone(),
                            marker: text.clone(),
                        }
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(HaplogroupRule {
                label: entry.label,
                description: entry.description,
                markers,
            })
        })
        .collect()
}

/// `"16223T"` -> position 16223, allele `T`
pub fn parse_compact_marker(text: &str) -> Option<MarkerRule> {
    let captures = COMPACT_MARKER.captures(text.trim())?;
    let position = captures[1].parse().ok()?;
    Some(MarkerRule::new(position, &captures[2]))
}
