//! The four-level evidence graph: PSM -> Ion -> Peptide -> Protein
//!
//! Entities live in flat vectors owned by [`Evidence`]. Proteins refer to
//! ions by IonForm key (and arena index), and every protein keeps its own
//! [`ProteinIon`] snapshot of the ions it lists. Status propagation passes
//! rewrite those snapshots so that all views of an IonForm agree.

use crate::identification::{ModificationSite, Scores};
use crate::mass::{PHOSPHO_MASS, REAGENT_TAG_MASS, UNMODIFIED_WINDOW};
use crate::modification::MassBin;
use crate::tmt::Label;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct PsmEvidence {
    pub index: u32,
    pub spectrum: String,
    pub scan: u32,
    pub peptide: String,
    pub modified_peptide: String,
    /// `peptide#charge#calculated_mass`
    pub ion_form: String,
    pub charge: u8,
    pub hit_rank: u8,
    /// Working protein; replaced by the razor protein during status propagation
    pub protein: String,
    pub protein_id: String,
    pub entry_name: String,
    pub gene_name: String,
    pub protein_description: String,
    pub razor_protein: Option<String>,
    pub mapped_proteins: BTreeSet<String>,
    pub mapped_genes: BTreeSet<String>,
    pub precursor_neutral_mass: f64,
    pub precursor_exp_mass: f64,
    pub retention_time: f64,
    pub calc_neutral_pep_mass: f64,
    pub raw_mass_diff: f64,
    pub mass_diff: f64,
    pub intensity: f64,
    pub scores: Scores,
    pub purity: f64,
    pub is_decoy: bool,
    pub is_unique: bool,
    pub is_razor: bool,
    pub modifications: Vec<ModificationSite>,
    pub assigned_modifications: BTreeSet<String>,
    pub observed_modifications: BTreeSet<String>,
    pub localized_ptm_sites: BTreeMap<String, u32>,
    pub localized_ptm_mass_diff: BTreeMap<String, String>,
    pub label: Label,
}

impl PsmEvidence {
    pub fn probability(&self) -> f64 {
        self.scores.probability
    }

    /// Precursor mass difference is small enough to be a plain observation
    pub fn is_unmodified(&self) -> bool {
        self.mass_diff.abs() <= UNMODIFIED_WINDOW
    }

    /// Carries a modification large enough to be a reagent tag
    pub fn has_reagent_tag(&self) -> bool {
        self.modifications
            .iter()
            .any(|m| m.mass_diff >= REAGENT_TAG_MASS)
    }

    /// Carries a phosphorylation on S, T or Y
    pub fn is_phospho(&self) -> bool {
        self.modifications.iter().any(|m| {
            matches!(m.amino_acid.as_str(), "S" | "T" | "Y")
                && (m.mass_diff - PHOSPHO_MASS).abs() <= 0.01
        })
    }

    /// Summed reporter intensity over all channels
    pub fn label_total(&self) -> f64 {
        self.label.total()
    }
}

#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct IonEvidence {
    pub sequence: String,
    pub modified_sequence: String,
    pub ion_form: String,
    pub charge: u8,
    pub mz: f64,
    pub peptide_mass: f64,
    pub precursor_neutral_mass: f64,
    pub retention_time: f64,
    pub spectra: BTreeSet<String>,
    pub mapped_proteins: BTreeSet<String>,
    pub mapped_genes: BTreeSet<String>,
    pub protein: String,
    pub protein_id: String,
    pub entry_name: String,
    pub gene_name: String,
    pub protein_description: String,
    pub razor_protein: Option<String>,
    pub modified_observations: u32,
    pub unmodified_observations: u32,
    pub assigned_modifications: BTreeSet<String>,
    pub observed_modifications: BTreeSet<String>,
    pub weight: f64,
    pub group_weight: f64,
    /// Most intense PSM precursor
    pub intensity: f64,
    /// Best PSM probability
    pub probability: f64,
    pub expectation: f64,
    pub summed_label_intensity: f64,
    pub is_decoy: bool,
    pub is_unique: bool,
    pub is_razor: bool,
    pub label: Label,
    pub phospho_label: Label,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct PeptideEvidence {
    pub sequence: String,
    pub charge_states: BTreeSet<u8>,
    pub spectra: BTreeSet<String>,
    pub protein: String,
    pub protein_id: String,
    pub entry_name: String,
    pub gene_name: String,
    pub protein_description: String,
    pub mapped_proteins: BTreeSet<String>,
    pub mapped_genes: BTreeSet<String>,
    /// Spectral count
    pub spc: usize,
    pub intensity: f64,
    pub probability: f64,
    pub modified_observations: u32,
    pub unmodified_observations: u32,
    pub assigned_modifications: BTreeSet<String>,
    pub observed_modifications: BTreeSet<String>,
    pub is_decoy: bool,
    pub label: Label,
    pub phospho_label: Label,
}

/// A protein's view of one of its peptide ions
#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct ProteinIon {
    pub ion_form: String,
    pub sequence: String,
    pub modified_sequence: String,
    pub charge: u8,
    pub calc_neutral_pep_mass: f64,
    pub weight: f64,
    pub group_weight: f64,
    pub initial_probability: f64,
    /// Position in [`Evidence::ions`], `None` when the ion was not identified
    /// at PSM level
    pub ion: Option<usize>,
    pub spectra: BTreeSet<String>,
    /// Other proteins this ion maps to
    pub mapped_proteins: BTreeSet<String>,
    pub upstream_unique: bool,
    pub upstream_razor: bool,
    pub is_unique: bool,
    pub is_razor: bool,
    pub razor_protein: Option<String>,
}

impl ProteinIon {
    /// Counts toward the Unique+Razor bucket of protein `header`
    pub fn is_razor_for(&self, header: &str) -> bool {
        self.is_razor && self.razor_protein.as_deref() == Some(header)
    }
}

/// Total, Unique and Unique+Razor aggregates of one label kind
#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct LabelBuckets {
    pub total: Label,
    pub unique: Label,
    pub razor: Label,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct ProteinEvidence {
    pub original_header: String,
    pub part_header: String,
    pub protein_name: String,
    pub group: u32,
    pub sub_group: String,
    pub protein_id: String,
    pub entry_name: String,
    pub description: String,
    pub organism: String,
    pub gene_names: String,
    pub protein_existence: String,
    pub sequence: String,
    pub length: usize,
    pub coverage: f64,
    pub probability: f64,
    pub top_peptide_probability: f64,
    pub unique_stripped_peptides: usize,
    pub indistinguishable_proteins: BTreeSet<String>,
    pub supporting_spectra: BTreeSet<String>,
    pub total_peptide_ions: BTreeMap<String, ProteinIon>,
    pub total_spc: usize,
    pub unique_spc: usize,
    pub razor_spc: usize,
    pub total_intensity: f64,
    pub unique_intensity: f64,
    pub razor_intensity: f64,
    pub razor_modified_observations: u32,
    pub razor_unmodified_observations: u32,
    pub razor_assigned_modifications: BTreeMap<String, u32>,
    pub razor_observed_modifications: BTreeMap<String, u32>,
    pub is_decoy: bool,
    pub labels: LabelBuckets,
    pub phospho_labels: LabelBuckets,
}

impl ProteinEvidence {
    /// Proteins without peptide ions are kept in memory but never reported
    pub fn is_reportable(&self) -> bool {
        !self.total_peptide_ions.is_empty()
    }

    /// Label aggregate used for protein-level quantification
    pub fn reported_labels(&self, unique_only: bool) -> &Label {
        if unique_only {
            &self.labels.unique
        } else {
            &self.labels.razor
        }
    }
}

#[derive(Default, Debug, Serialize)]
pub struct Evidence {
    pub decoy_tag: String,
    pub psms: Vec<PsmEvidence>,
    pub ions: Vec<IonEvidence>,
    pub peptides: Vec<PeptideEvidence>,
    pub proteins: Vec<ProteinEvidence>,
    pub modifications: Vec<MassBin>,
}

impl Evidence {
    pub fn new(decoy_tag: &str) -> Self {
        Evidence {
            decoy_tag: decoy_tag.into(),
            ..Default::default()
        }
    }

    pub fn ion(&self, ion_form: &str) -> Option<&IonEvidence> {
        self.ions
            .binary_search_by(|ion| ion.ion_form.as_str().cmp(ion_form))
            .ok()
            .map(|ix| &self.ions[ix])
    }

    pub fn protein(&self, part_header: &str) -> Option<&ProteinEvidence> {
        self.proteins.iter().find(|p| p.part_header == part_header)
    }

    pub fn reportable_proteins(&self) -> impl Iterator<Item = &ProteinEvidence> {
        self.proteins.iter().filter(|p| p.is_reportable())
    }
}
