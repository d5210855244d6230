//! Ordered evidence pipeline: assemble, propagate status, quantify, normalize

use crate::assemble::{assemble_ions, assemble_peptides, assemble_proteins, assemble_psms};
use crate::database::ProteinDatabase;
use crate::evidence::Evidence;
use crate::identification::{ProteinGroupRecord, PsmIdentification};
use crate::inference::{self, IonStatusTable};
use crate::modification::{self, KnownModification};
use crate::normalize::normalize_to_total_proteins;
use crate::purity::calculate_purity;
use crate::rollup;
use crate::spectrum::{Spectrum, SpectrumIndex};
use crate::tmt::{apply_sample_names, Channel, Isobaric, Label, LabelExtractor};
use crate::Error;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantSettings {
    pub decoy_tag: String,
    pub plex: Isobaric,
    /// MS level carrying the reporter ions, 2 or 3
    pub level: u8,
    /// Channel matching tolerance (ppm)
    pub tolerance: f64,
    pub min_probability: f64,
    pub min_purity: f64,
    /// Report the Unique bucket instead of Unique+Razor
    pub unique_only: bool,
    /// Reporter name -> sample name
    pub label_names: BTreeMap<String, String>,
    pub known_modifications: Vec<KnownModification>,
}

impl Default for QuantSettings {
    fn default() -> Self {
        Self {
            decoy_tag: "rev_".into(),
            plex: Isobaric::Tmt10,
            level: 2,
            tolerance: 20.0,
            min_probability: 0.7,
            min_purity: 0.5,
            unique_only: false,
            label_names: BTreeMap::new(),
            known_modifications: Vec::new(),
        }
    }
}

impl QuantSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.level, 2 | 3) {
            return Err(Error::InvalidSettings(format!(
                "reporter ion level must be 2 or 3, got {}",
                self.level
            )));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(Error::InvalidSettings(format!(
                "channel tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.decoy_tag.is_empty() {
            return Err(Error::InvalidSettings("decoy tag must not be empty".into()));
        }
        Ok(())
    }

    /// Channel table of the configured plex with sample names applied
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = self.plex.channels();
        apply_sample_names(&mut channels, &self.label_names);
        channels
    }
}

pub struct Pipeline {
    settings: QuantSettings,
    database: ProteinDatabase,
}

impl Pipeline {
    pub fn new(settings: QuantSettings, database: ProteinDatabase) -> Result<Self, Error> {
        settings.validate()?;
        Ok(Pipeline { settings, database })
    }

    pub fn settings(&self) -> &QuantSettings {
        &self.settings
    }

    /// Build PSM, ion, peptide and protein evidence
    pub fn assemble(
        &self,
        identifications: &[PsmIdentification],
        groups: &[ProteinGroupRecord],
    ) -> Result<Evidence, Error> {
        let tag = self.settings.decoy_tag.as_str();
        let mut evidence = Evidence::new(tag);
        evidence.psms = assemble_psms(identifications, tag, &self.database);
        evidence.ions = assemble_ions(identifications, tag, &self.database);
        evidence.peptides = assemble_peptides(identifications, tag, &self.database);
        evidence.proteins = assemble_proteins(groups, tag, &evidence.ions, &self.database)?;

        if !self.settings.known_modifications.is_empty() {
            modification::annotate_observed_modifications(
                &mut evidence.psms,
                &self.settings.known_modifications,
            );
        }
        Ok(evidence)
    }

    /// Resolve razor assignments and propagate them, then recompute mapped
    /// proteins, modification counts, supporting spectra and protein totals
    pub fn propagate(&self, evidence: &mut Evidence) -> Result<IonStatusTable, Error> {
        let table = inference::resolve_razor(&mut evidence.proteins);
        inference::update_ion_status(evidence, &table);
        inference::update_protein_status(evidence);
        inference::update_mapped_proteins(evidence, &table);
        modification::update_ion_mod_count(evidence);
        modification::update_peptide_mod_count(evidence);
        modification::update_assigned_modifications(evidence);
        inference::update_supporting_spectra(evidence);
        inference::update_protein_metadata(evidence, &self.database);
        inference::calculate_spectral_counts(evidence)?;
        inference::calculate_intensities(evidence);
        inference::calculate_razor_modifications(evidence);
        evidence.modifications = modification::assemble_modifications(&evidence.psms);
        Ok(table)
    }

    /// Purity, label extraction and roll-up to ions, peptides and proteins
    pub fn quantify(&self, evidence: &mut Evidence, spectra: Vec<Spectrum>) {
        let index = SpectrumIndex::new(spectra);
        calculate_purity(&mut evidence.psms, &index);

        let extractor = LabelExtractor::new(
            self.settings.channels(),
            self.settings.tolerance,
            self.settings.level,
        );
        let labels = extractor.extract_all(index.level(extractor.level()));
        rollup::map_labeled_spectra(&mut evidence.psms, &labels);
        rollup::correct_unlabelled_spectra(&mut evidence.psms);

        let (labels, phospho) = rollup::spectrum_labels(
            &evidence.psms,
            self.settings.min_probability,
            self.settings.min_purity,
        );
        rollup::roll_up_ions(&mut evidence.ions, &labels, &phospho);
        rollup::roll_up_peptides(&mut evidence.peptides, &labels, &phospho);
        rollup::roll_up_proteins(&mut evidence.proteins, &labels, &phospho);
    }

    /// Protein-level quantification of every reportable protein: the Unique
    /// bucket with `unique_only`, Unique+Razor otherwise
    pub fn reported_labels<'a>(&self, evidence: &'a Evidence) -> BTreeMap<&'a str, &'a Label> {
        evidence
            .reportable_proteins()
            .map(|p| {
                (
                    p.part_header.as_str(),
                    p.reported_labels(self.settings.unique_only),
                )
            })
            .collect()
    }

    pub fn run(
        &self,
        identifications: &[PsmIdentification],
        groups: &[ProteinGroupRecord],
        spectra: Vec<Spectrum>,
    ) -> Result<Evidence, Error> {
        let start = Instant::now();
        let mut evidence = self.assemble(identifications, groups)?;
        self.propagate(&mut evidence)?;
        self.quantify(&mut evidence, spectra);
        normalize_to_total_proteins(&mut evidence.proteins);
        info!(
            "-  finished evidence for {} PSMs, {} ions, {} peptides, {} proteins in {:?}ms",
            evidence.psms.len(),
            evidence.ions.len(),
            evidence.peptides.len(),
            evidence.proteins.len(),
            (Instant::now() - start).as_millis()
        );
        Ok(evidence)
    }
}
