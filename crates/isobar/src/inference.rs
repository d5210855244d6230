//! Unique/razor classification and its propagation through the evidence graph
//!
//! [`resolve_razor`] decides, for every IonForm listed by any protein,
//! whether it is unique and which protein owns it as razor. The resulting
//! [`IonStatusTable`] is handed to the update passes, which must run in
//! order: ion status, protein swap, mapped proteins, supporting spectra.

use crate::assemble::ProteinMetadata;
use crate::database::ProteinDatabase;
use crate::evidence::{Evidence, ProteinEvidence, PsmEvidence};
use crate::Error;
use fnv::FnvHashMap;
use log::info;
use std::collections::BTreeSet;
use std::time::Instant;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IonStatus {
    pub is_unique: bool,
    pub razor_protein: Option<String>,
    /// Headers of every protein listing this IonForm
    pub proteins: BTreeSet<String>,
}

pub type IonStatusTable = FnvHashMap<String, IonStatus>;

/// Classify every IonForm and rewrite all protein views of it with the same
/// uniqueness and razor assignment.
///
/// An ion listed by a single protein is unique unless the upstream grouping
/// says otherwise; either way that protein is its razor protein. A shared
/// ion goes to the one protein claiming it as razor upstream; without a
/// single claimant, the candidate with the most unique ions wins and ties go
/// to the lexicographically smallest header.
pub fn resolve_razor(proteins: &mut [ProteinEvidence]) -> IonStatusTable {
    let start = Instant::now();

    let mut sharers: FnvHashMap<String, Vec<usize>> = FnvHashMap::default();
    for (ix, protein) in proteins.iter().enumerate() {
        for ion_form in protein.total_peptide_ions.keys() {
            sharers.entry(ion_form.clone()).or_default().push(ix);
        }
    }

    let single_unique = |ix: usize, ion_form: &str, proteins: &[ProteinEvidence]| {
        proteins[ix]
            .total_peptide_ions
            .get(ion_form)
            .map(|view| view.upstream_unique || view.mapped_proteins.is_empty())
            .unwrap_or(false)
    };

    let mut support = vec![0usize; proteins.len()];
    for (ion_form, ixs) in &sharers {
        if let [ix] = ixs.as_slice() {
            if single_unique(*ix, ion_form, proteins) {
                support[*ix] += 1;
            }
        }
    }

    let mut table = IonStatusTable::default();
    for (ion_form, ixs) in sharers {
        let (is_unique, owner) = match ixs.as_slice() {
            [ix] => (single_unique(*ix, &ion_form, proteins), *ix),
            _ => {
                let claimants = ixs
                    .iter()
                    .copied()
                    .filter(|&ix| proteins[ix].total_peptide_ions[&ion_form].upstream_razor)
                    .collect::<Vec<_>>();
                let owner = match claimants.as_slice() {
                    [ix] => *ix,
                    [] => strongest(&ixs, &support, proteins),
                    _ => strongest(&claimants, &support, proteins),
                };
                (false, owner)
            }
        };

        let status = IonStatus {
            is_unique,
            razor_protein: Some(proteins[owner].part_header.clone()),
            proteins: ixs
                .iter()
                .map(|&ix| proteins[ix].part_header.clone())
                .collect(),
        };
        for &ix in &ixs {
            if let Some(view) = proteins[ix].total_peptide_ions.get_mut(&ion_form) {
                view.is_unique = status.is_unique;
                view.is_razor = true;
                view.razor_protein.clone_from(&status.razor_protein);
            }
        }
        table.insert(ion_form, status);
    }

    let shared = table.values().filter(|s| s.proteins.len() > 1).count();
    info!(
        "-  resolved razor assignment for {} ions ({} shared) in {:?}ms",
        table.len(),
        shared,
        (Instant::now() - start).as_millis()
    );
    table
}

/// Candidate with the most unique ions, ties broken by smallest header
fn strongest(candidates: &[usize], support: &[usize], proteins: &[ProteinEvidence]) -> usize {
    candidates
        .iter()
        .copied()
        .max_by(|&a, &b| {
            support[a]
                .cmp(&support[b])
                .then_with(|| proteins[b].part_header.cmp(&proteins[a].part_header))
        })
        .unwrap_or_default()
}

/// Write uniqueness and razor assignment onto every PSM and ion
pub fn update_ion_status(evidence: &mut Evidence, table: &IonStatusTable) {
    for psm in evidence.psms.iter_mut() {
        match table.get(&psm.ion_form) {
            Some(status) => {
                psm.is_unique = status.is_unique;
                psm.is_razor = status.razor_protein.is_some();
                psm.razor_protein.clone_from(&status.razor_protein);
            }
            None => {
                psm.is_unique = false;
                psm.is_razor = false;
                psm.razor_protein = None;
            }
        }
        // nothing to share with
        if psm.mapped_proteins.is_empty() {
            psm.is_unique = true;
        }
    }

    for ion in evidence.ions.iter_mut() {
        match table.get(&ion.ion_form) {
            Some(status) => {
                ion.is_unique = status.is_unique;
                ion.is_razor = status.razor_protein.is_some();
                ion.razor_protein.clone_from(&status.razor_protein);
            }
            None => {
                ion.is_unique = ion.mapped_proteins.len() <= 1;
                ion.is_razor = false;
                ion.razor_protein = None;
            }
        }
    }
}

/// Swap the working protein of razor PSMs and ions to their razor protein.
/// Non-razor PSMs mirror their current protein as razor protein
pub fn update_protein_status(evidence: &mut Evidence) {
    let mut swapped = 0usize;
    for psm in evidence.psms.iter_mut() {
        if !psm.is_razor {
            psm.razor_protein = Some(psm.protein.clone());
            continue;
        }
        if let Some(razor) = psm.razor_protein.clone() {
            if razor != psm.protein {
                let original = std::mem::replace(&mut psm.protein, razor);
                psm.mapped_proteins.remove(&psm.protein);
                if !original.is_empty() {
                    psm.mapped_proteins.insert(original);
                }
                swapped += 1;
            }
        }
    }

    for ion in evidence.ions.iter_mut() {
        if let (true, Some(razor)) = (ion.is_razor, ion.razor_protein.as_ref()) {
            ion.protein.clone_from(razor);
        }
    }

    let mut by_peptide: FnvHashMap<&str, &str> = FnvHashMap::default();
    for psm in evidence.psms.iter().filter(|psm| psm.is_razor) {
        by_peptide
            .entry(psm.peptide.as_str())
            .or_insert(psm.protein.as_str());
    }
    for peptide in evidence.peptides.iter_mut() {
        if let Some(protein) = by_peptide.get(peptide.sequence.as_str()) {
            if peptide.protein != *protein {
                let original = std::mem::replace(&mut peptide.protein, protein.to_string());
                peptide.mapped_proteins.remove(*protein);
                peptide.mapped_proteins.insert(original);
            }
        }
    }

    info!("-  swapped {} PSMs to their razor protein", swapped);
}

/// Extend mapped-protein sets with every protein listing the same IonForm.
/// Ions listed by proteins map to exactly that protein set
pub fn update_mapped_proteins(evidence: &mut Evidence, table: &IonStatusTable) {
    for psm in evidence.psms.iter_mut() {
        if let Some(status) = table.get(&psm.ion_form) {
            psm.mapped_proteins.extend(
                status
                    .proteins
                    .iter()
                    .filter(|p| **p != psm.protein)
                    .cloned(),
            );
        }
    }

    for ion in evidence.ions.iter_mut() {
        if let Some(status) = table.get(&ion.ion_form) {
            ion.mapped_proteins.clone_from(&status.proteins);
        }
    }
    let mut by_peptide: FnvHashMap<&str, BTreeSet<&str>> = FnvHashMap::default();
    for ion in &evidence.ions {
        if let Some(status) = table.get(&ion.ion_form) {
            by_peptide
                .entry(ion.sequence.as_str())
                .or_default()
                .extend(status.proteins.iter().map(String::as_str));
        }
    }
    for peptide in evidence.peptides.iter_mut() {
        if let Some(proteins) = by_peptide.get(peptide.sequence.as_str()) {
            let representative = peptide.protein.as_str();
            let extra = proteins
                .iter()
                .filter(|p| **p != representative)
                .map(|p| p.to_string())
                .collect::<Vec<_>>();
            peptide.mapped_proteins.extend(extra);
        }
    }
}

/// Rebuild supporting spectra of every protein from the PSMs now assigned to
/// it, and the spectra of every protein view from the PSMs of its IonForm
pub fn update_supporting_spectra(evidence: &mut Evidence) {
    let start = Instant::now();
    let mut by_protein: FnvHashMap<&str, BTreeSet<String>> = FnvHashMap::default();
    let mut by_ion: FnvHashMap<&str, Vec<&PsmEvidence>> = FnvHashMap::default();
    for psm in &evidence.psms {
        by_protein
            .entry(psm.protein.as_str())
            .or_default()
            .insert(psm.spectrum.clone());
        by_ion.entry(psm.ion_form.as_str()).or_default().push(psm);
    }

    for protein in evidence.proteins.iter_mut() {
        protein.supporting_spectra = by_protein
            .get(protein.part_header.as_str())
            .cloned()
            .unwrap_or_default();
        for view in protein.total_peptide_ions.values_mut() {
            view.spectra = by_ion
                .get(view.ion_form.as_str())
                .into_iter()
                .flatten()
                .filter(|psm| (psm.is_unique && view.is_unique) || (psm.is_razor && view.is_razor))
                .map(|psm| psm.spectrum.clone())
                .collect();
        }
    }
    info!(
        "-  updated supporting spectra for {} proteins in {:?}ms",
        evidence.proteins.len(),
        (Instant::now() - start).as_millis()
    );
}

/// Refresh gene, description, id and entry name of PSMs, ions and peptides
/// from their current working protein
pub fn update_protein_metadata(evidence: &mut Evidence, db: &ProteinDatabase) {
    let genes = |proteins: &BTreeSet<String>| {
        proteins
            .iter()
            .filter_map(|p| db.get(p))
            .filter(|r| !r.gene_names.is_empty())
            .map(|r| r.gene_names.clone())
            .collect::<BTreeSet<_>>()
    };

    for psm in evidence.psms.iter_mut() {
        let meta = ProteinMetadata::of(db, &psm.protein);
        psm.protein_id = meta.protein_id;
        psm.entry_name = meta.entry_name;
        psm.gene_name = meta.gene_name;
        psm.protein_description = meta.description;
        psm.mapped_genes = genes(&psm.mapped_proteins);
    }
    for ion in evidence.ions.iter_mut() {
        let meta = ProteinMetadata::of(db, &ion.protein);
        ion.protein_id = meta.protein_id;
        ion.entry_name = meta.entry_name;
        ion.gene_name = meta.gene_name;
        ion.protein_description = meta.description;
        ion.mapped_genes = genes(&ion.mapped_proteins);
    }
    for peptide in evidence.peptides.iter_mut() {
        let meta = ProteinMetadata::of(db, &peptide.protein);
        peptide.protein_id = meta.protein_id;
        peptide.entry_name = meta.entry_name;
        peptide.gene_name = meta.gene_name;
        peptide.protein_description = meta.description;
        peptide.mapped_genes = genes(&peptide.mapped_proteins);
    }
}

/// Total, Unique and Unique+Razor spectral counts of every protein
pub fn calculate_spectral_counts(evidence: &mut Evidence) -> Result<(), Error> {
    if evidence.psms.is_empty() && evidence.ions.is_empty() {
        return Err(Error::EmptyEvidence);
    }
    for protein in evidence.proteins.iter_mut() {
        protein.total_spc = protein.supporting_spectra.len();
        protein.unique_spc = 0;
        protein.razor_spc = 0;
        for view in protein.total_peptide_ions.values() {
            if view.is_unique {
                protein.unique_spc += view.spectra.len();
            }
            if view.is_razor_for(&protein.part_header) {
                protein.razor_spc += view.spectra.len();
            }
        }
    }
    Ok(())
}

/// Total, Unique and Unique+Razor summed ion intensities of every protein
pub fn calculate_intensities(evidence: &mut Evidence) {
    let ions = &evidence.ions;
    for protein in evidence.proteins.iter_mut() {
        let (mut total, mut unique, mut razor) = (0.0, 0.0, 0.0);
        for view in protein.total_peptide_ions.values() {
            let intensity = match view.ion {
                Some(ix) => ions[ix].intensity,
                None => continue,
            };
            total += intensity;
            if view.is_unique {
                unique += intensity;
            }
            if view.is_razor_for(&protein.part_header) {
                razor += intensity;
            }
        }
        protein.total_intensity = total;
        protein.unique_intensity = unique;
        protein.razor_intensity = razor;
    }
}

/// Modified/unmodified observation counts and modification tallies over the
/// ions each protein owns as razor. Runs after the modification sets of the
/// ions have been refreshed
pub fn calculate_razor_modifications(evidence: &mut Evidence) {
    let ions = &evidence.ions;
    for protein in evidence.proteins.iter_mut() {
        protein.razor_modified_observations = 0;
        protein.razor_unmodified_observations = 0;
        protein.razor_assigned_modifications.clear();
        protein.razor_observed_modifications.clear();

        for view in protein.total_peptide_ions.values() {
            if !view.is_razor_for(&protein.part_header) {
                continue;
            }
            let ion = match view.ion {
                Some(ix) => &ions[ix],
                None => continue,
            };
            protein.razor_modified_observations += ion.modified_observations;
            protein.razor_unmodified_observations += ion.unmodified_observations;
            for m in &ion.assigned_modifications {
                *protein
                    .razor_assigned_modifications
                    .entry(m.clone())
                    .or_default() += 1;
            }
            for m in &ion.observed_modifications {
                *protein
                    .razor_observed_modifications
                    .entry(m.clone())
                    .or_default() += 1;
            }
        }
    }
}
