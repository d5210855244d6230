//! Identification records produced by upstream search and validation tools

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One modified residue (or terminus) of an identified peptide
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModificationSite {
    /// Annotation position, e.g. `5` or `N-term`
    pub position: String,
    /// Residue code; `n` and `c` mark the peptide termini
    pub amino_acid: String,
    /// Mass of the modified residue
    pub mass: f64,
    /// Mass delta relative to the unmodified residue
    pub mass_diff: f64,
}

impl ModificationSite {
    /// Site label, e.g. `5M(15.9949)` or `N-term(229.1629)`. Unmodified
    /// sites have no label
    pub fn label(&self) -> Option<String> {
        if self.mass_diff == 0.0 {
            return None;
        }
        match self.amino_acid.as_str() {
            "n" | "c" => Some(format!("{}({:.4})", self.position, self.mass_diff)),
            aa => Some(format!("{}{}({:.4})", self.position, aa, self.mass_diff)),
        }
    }
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scores {
    pub probability: f64,
    pub expectation: f64,
    pub xcorr: f64,
    pub delta_cn: f64,
    pub sp_rank: f64,
    pub hyperscore: f64,
    pub nextscore: f64,
    pub discriminant_value: f64,
}

/// A peptide-spectrum match as reported by the validator
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsmIdentification {
    pub index: u32,
    /// Spectrum name, `run.scan.scan.charge`
    pub spectrum: String,
    pub scan: u32,
    pub peptide: String,
    pub modified_peptide: String,
    pub protein: String,
    pub alternative_proteins: Vec<String>,
    pub charge: u8,
    pub hit_rank: u8,
    pub precursor_neutral_mass: f64,
    pub precursor_exp_mass: f64,
    pub retention_time: f64,
    pub calc_neutral_pep_mass: f64,
    pub raw_mass_diff: f64,
    pub mass_diff: f64,
    pub intensity: f64,
    #[serde(flatten)]
    pub scores: Scores,
    pub modifications: Vec<ModificationSite>,
    pub localized_ptm_sites: BTreeMap<String, u32>,
    pub localized_ptm_mass_diff: BTreeMap<String, String>,
}

/// Aggregation key one level above the PSM
pub fn ion_form(peptide: &str, charge: u8, calc_neutral_pep_mass: f64) -> String {
    format!("{}#{}#{:.4}", peptide, charge, calc_neutral_pep_mass)
}

impl PsmIdentification {
    pub fn ion_form(&self) -> String {
        ion_form(&self.peptide, self.charge, self.calc_neutral_pep_mass)
    }

    /// A PSM is a decoy when its protein and every alternative protein carry
    /// the decoy tag
    pub fn is_decoy(&self, decoy_tag: &str) -> bool {
        self.protein.starts_with(decoy_tag)
            && self
                .alternative_proteins
                .iter()
                .all(|p| p.starts_with(decoy_tag))
    }

    /// Protein and alternative proteins, in reported order
    pub fn proteins(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.protein.as_str())
            .chain(self.alternative_proteins.iter().map(String::as_str))
            .filter(|p| !p.is_empty())
    }
}

/// A peptide ion listed under a protein group
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeptideIonRecord {
    pub sequence: String,
    pub modified_sequence: String,
    pub charge: u8,
    pub calc_neutral_pep_mass: f64,
    pub weight: f64,
    pub group_weight: f64,
    pub initial_probability: f64,
    pub is_unique: bool,
    pub razor: bool,
    /// Other proteins this peptide maps to
    pub parent_proteins: Vec<String>,
}

impl PeptideIonRecord {
    pub fn ion_form(&self) -> String {
        ion_form(&self.sequence, self.charge, self.calc_neutral_pep_mass)
    }
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProteinGroupRecord {
    pub group_number: u32,
    pub sibling_id: String,
    pub protein_name: String,
    pub length: usize,
    pub percent_coverage: f64,
    pub probability: f64,
    pub top_peptide_probability: f64,
    pub indistinguishable_proteins: Vec<String>,
    pub unique_stripped_peptides: Vec<String>,
    pub peptide_ions: Vec<PeptideIonRecord>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn site_labels() {
        let site = |position: &str, aa: &str, mass_diff| ModificationSite {
            position: position.into(),
            amino_acid: aa.into(),
            mass: 0.0,
            mass_diff,
        };
        assert_eq!(
            site("N-term", "n", 229.162932).label().as_deref(),
            Some("N-term(229.1629)")
        );
        assert_eq!(
            site("5", "M", 15.9949).label().as_deref(),
            Some("5M(15.9949)")
        );
        assert_eq!(
            site("C-term", "c", -0.984).label().as_deref(),
            Some("C-term(-0.9840)")
        );
        assert_eq!(site("3", "K", 0.0).label(), None);
    }

    #[test]
    fn decoy_psm() {
        let mut psm = PsmIdentification {
            protein: "rev_sp|P1|A".into(),
            alternative_proteins: vec!["rev_sp|P2|B".into()],
            ..Default::default()
        };
        assert!(psm.is_decoy("rev_"));
        psm.alternative_proteins.push("sp|P3|C".into());
        assert!(!psm.is_decoy("rev_"));
    }

    #[test]
    fn ion_form_key() {
        assert_eq!(ion_form("PEPTIDE", 2, 1000.0), "PEPTIDE#2#1000.0000");
    }

    #[test]
    fn deserialize_flattened_scores() {
        let psm: PsmIdentification = serde_json::from_str(
            r#"{"spectrum": "run.00002.00002.2", "peptide": "PEPTIDE", "charge": 2,
                "probability": 0.98, "hyperscore": 31.5}"#,
        )
        .unwrap();
        assert_eq!(psm.scores.probability, 0.98);
        assert_eq!(psm.scores.hyperscore, 31.5);
        assert!(psm.modifications.is_empty());
    }
}
