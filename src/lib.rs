//! # Family Concordance Toolkit
//!
//! Biological consistency and maternal lineage statistics for a
//! father / mother / two-son genotype dataset.
//!
//! ## Features
//!
//! - Mendelian trio inheritance validation over autosomal markers
//! - Maternal mitochondrial concordance between mother and sons
//! - Sibling identity-by-state (IBS) allele sharing
//! - Mitochondrial haplogroup classification against a curated rule table
//! - Plain, gzip, bzip2 and xz family genotype files
//! - Multiple output formats (HTML, CSV, TSV, JSON)
//!
//! Paternal (Y-DNA) haplogroups are not classified.

pub mod analysis;
pub mod discovery;
pub mod error;
pub mod haplogroups;
pub mod output;
pub mod parsers;
pub mod types;

// Re-export key types
pub use analysis::{
    AnalysisResults, AnalysisSelection, FamilyAnalysis, FamilyAnalyzer, HaplogroupClassifier,
    MendelianChecker, MitochondrialChecker, SiblingSharingEstimator,
};
pub use discovery::FileDiscovery;
pub use error::{ParseError, RuleTableError};
pub use output::{ReportFormat, ReportGenerator};
pub use parsers::{FamilyFileParser, ParsedFamilyData};
pub use types::*;
