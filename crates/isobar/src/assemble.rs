//! Assembly of PSM, ion, peptide and protein evidence from identification
//! records

use crate::database::{DatabaseRecord, ProteinDatabase};
use crate::evidence::{IonEvidence, PeptideEvidence, ProteinEvidence, ProteinIon, PsmEvidence};
use crate::identification::{ModificationSite, ProteinGroupRecord, PsmIdentification};
use crate::mass::{self, round_to, UNMODIFIED_WINDOW};
use crate::Error;
use fnv::FnvHashMap;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Gene, description, id and entry name columns copied onto lower levels
#[derive(Default)]
pub(crate) struct ProteinMetadata {
    pub protein_id: String,
    pub entry_name: String,
    pub gene_name: String,
    pub description: String,
}

impl ProteinMetadata {
    pub(crate) fn of(db: &ProteinDatabase, protein: &str) -> Self {
        db.get(protein)
            .map(|r: &DatabaseRecord| ProteinMetadata {
                protein_id: r.id.clone(),
                entry_name: r.entry_name.clone(),
                gene_name: r.gene_names.clone(),
                description: r.description.clone(),
            })
            .unwrap_or_default()
    }
}

fn mapped_genes<'a, I>(db: &ProteinDatabase, proteins: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    proteins
        .into_iter()
        .filter_map(|p| db.get(p))
        .filter(|r| !r.gene_names.is_empty())
        .map(|r| r.gene_names.clone())
        .collect()
}

fn site_labels(sites: &[ModificationSite]) -> BTreeSet<String> {
    sites.iter().filter_map(ModificationSite::label).collect()
}

fn is_unmodified(id: &PsmIdentification) -> bool {
    id.mass_diff.abs() <= UNMODIFIED_WINDOW
}

/// One PSM per identification record, sorted by spectrum name
pub fn assemble_psms(
    identifications: &[PsmIdentification],
    decoy_tag: &str,
    db: &ProteinDatabase,
) -> Vec<PsmEvidence> {
    let start = Instant::now();
    let mut psms = identifications
        .iter()
        .map(|id| {
            let meta = ProteinMetadata::of(db, &id.protein);
            let mapped_proteins = id
                .alternative_proteins
                .iter()
                .filter(|p| **p != id.protein)
                .cloned()
                .collect::<BTreeSet<_>>();
            PsmEvidence {
                index: id.index,
                spectrum: id.spectrum.clone(),
                scan: id.scan,
                peptide: id.peptide.clone(),
                modified_peptide: id.modified_peptide.clone(),
                ion_form: id.ion_form(),
                charge: id.charge,
                hit_rank: id.hit_rank,
                protein: id.protein.clone(),
                protein_id: meta.protein_id,
                entry_name: meta.entry_name,
                gene_name: meta.gene_name,
                protein_description: meta.description,
                razor_protein: None,
                mapped_genes: mapped_genes(db, &mapped_proteins),
                mapped_proteins,
                precursor_neutral_mass: id.precursor_neutral_mass,
                precursor_exp_mass: id.precursor_exp_mass,
                retention_time: id.retention_time,
                calc_neutral_pep_mass: id.calc_neutral_pep_mass,
                raw_mass_diff: id.raw_mass_diff,
                mass_diff: id.mass_diff,
                intensity: id.intensity,
                scores: id.scores.clone(),
                purity: 0.0,
                is_decoy: id.is_decoy(decoy_tag),
                is_unique: false,
                is_razor: false,
                modifications: id.modifications.clone(),
                assigned_modifications: site_labels(&id.modifications),
                observed_modifications: BTreeSet::new(),
                localized_ptm_sites: id.localized_ptm_sites.clone(),
                localized_ptm_mass_diff: id.localized_ptm_mass_diff.clone(),
                label: Default::default(),
            }
        })
        .collect::<Vec<_>>();

    psms.sort_by(|a, b| a.spectrum.cmp(&b.spectrum));

    let decoys = psms.iter().filter(|p| p.is_decoy).count();
    info!(
        "-  assembled {} PSMs ({} decoys) in {:?}ms",
        psms.len(),
        decoys,
        (Instant::now() - start).as_millis()
    );
    psms
}

/// One ion per distinct IonForm, sorted by IonForm. The first record of an
/// IonForm is its representative
pub fn assemble_ions(
    identifications: &[PsmIdentification],
    decoy_tag: &str,
    db: &ProteinDatabase,
) -> Vec<IonEvidence> {
    let start = Instant::now();
    let mut by_ion: BTreeMap<String, Vec<&PsmIdentification>> = BTreeMap::new();
    let mut by_spectrum: FnvHashMap<&str, Vec<&PsmIdentification>> = FnvHashMap::default();
    for id in identifications {
        by_ion.entry(id.ion_form()).or_default().push(id);
        by_spectrum.entry(id.spectrum.as_str()).or_default().push(id);
    }

    let ions = by_ion
        .into_iter()
        .filter_map(|(ion_form, group)| {
            let rep = *group.first()?;

            let mut mapped_proteins = by_spectrum
                .get(rep.spectrum.as_str())
                .into_iter()
                .flatten()
                .flat_map(|id| id.proteins())
                .map(String::from)
                .collect::<BTreeSet<_>>();
            if !rep.protein.is_empty() {
                mapped_proteins.insert(rep.protein.clone());
            }

            let unmodified = group.iter().filter(|id| is_unmodified(id)).count() as u32;
            let meta = ProteinMetadata::of(db, &rep.protein);
            Some(IonEvidence {
                sequence: rep.peptide.clone(),
                modified_sequence: rep.modified_peptide.clone(),
                ion_form,
                charge: rep.charge,
                mz: round_to(mass::mz(rep.calc_neutral_pep_mass, rep.charge), 4),
                peptide_mass: rep.calc_neutral_pep_mass,
                precursor_neutral_mass: rep.precursor_neutral_mass,
                retention_time: rep.retention_time,
                spectra: group.iter().map(|id| id.spectrum.clone()).collect(),
                mapped_genes: mapped_genes(db, &mapped_proteins),
                mapped_proteins,
                protein: rep.protein.clone(),
                protein_id: meta.protein_id,
                entry_name: meta.entry_name,
                gene_name: meta.gene_name,
                protein_description: meta.description,
                razor_protein: None,
                modified_observations: group.len() as u32 - unmodified,
                unmodified_observations: unmodified,
                assigned_modifications: group
                    .iter()
                    .flat_map(|id| site_labels(&id.modifications))
                    .collect(),
                observed_modifications: BTreeSet::new(),
                weight: 0.0,
                group_weight: 0.0,
                intensity: group.iter().map(|id| id.intensity).fold(0.0, f64::max),
                probability: group
                    .iter()
                    .map(|id| id.scores.probability)
                    .fold(0.0, f64::max),
                expectation: rep.scores.expectation,
                summed_label_intensity: 0.0,
                is_decoy: rep.is_decoy(decoy_tag),
                is_unique: false,
                is_razor: false,
                label: Default::default(),
                phospho_label: Default::default(),
            })
        })
        .collect::<Vec<_>>();

    info!(
        "-  assembled {} ions from {} PSMs in {:?}ms",
        ions.len(),
        identifications.len(),
        (Instant::now() - start).as_millis()
    );
    ions
}

/// One peptide per stripped sequence, sorted by sequence. A peptide is a
/// decoy only if every one of its PSMs is a decoy; its representative
/// protein is that of its most probable PSM
pub fn assemble_peptides(
    identifications: &[PsmIdentification],
    decoy_tag: &str,
    db: &ProteinDatabase,
) -> Vec<PeptideEvidence> {
    let start = Instant::now();
    let mut by_sequence: BTreeMap<&str, Vec<&PsmIdentification>> = BTreeMap::new();
    for id in identifications {
        by_sequence.entry(id.peptide.as_str()).or_default().push(id);
    }

    let peptides = by_sequence
        .into_iter()
        .filter_map(|(sequence, group)| {
            let best = group.iter().copied().reduce(|best, id| {
                if id.scores.probability > best.scores.probability {
                    id
                } else {
                    best
                }
            })?;

            let spectra = group
                .iter()
                .map(|id| id.spectrum.clone())
                .collect::<BTreeSet<_>>();
            let mapped_proteins = group
                .iter()
                .flat_map(|id| id.proteins())
                .filter(|p| *p != best.protein)
                .map(String::from)
                .collect::<BTreeSet<_>>();
            let unmodified = group.iter().filter(|id| is_unmodified(id)).count() as u32;
            let meta = ProteinMetadata::of(db, &best.protein);

            Some(PeptideEvidence {
                sequence: sequence.into(),
                charge_states: group.iter().map(|id| id.charge).collect(),
                spc: spectra.len(),
                spectra,
                protein: best.protein.clone(),
                protein_id: meta.protein_id,
                entry_name: meta.entry_name,
                gene_name: meta.gene_name,
                protein_description: meta.description,
                mapped_genes: mapped_genes(db, &mapped_proteins),
                mapped_proteins,
                intensity: group.iter().map(|id| id.intensity).fold(0.0, f64::max),
                probability: best.scores.probability,
                modified_observations: group.len() as u32 - unmodified,
                unmodified_observations: unmodified,
                assigned_modifications: group
                    .iter()
                    .flat_map(|id| site_labels(&id.modifications))
                    .collect(),
                observed_modifications: BTreeSet::new(),
                is_decoy: group.iter().all(|id| id.is_decoy(decoy_tag)),
                label: Default::default(),
                phospho_label: Default::default(),
            })
        })
        .collect::<Vec<_>>();

    info!(
        "-  assembled {} peptides in {:?}ms",
        peptides.len(),
        (Instant::now() - start).as_millis()
    );
    peptides
}

fn enrich(protein: &mut ProteinEvidence, record: &DatabaseRecord) {
    protein.original_header.clone_from(&record.original_header);
    protein.part_header.clone_from(&record.part_header);
    protein.protein_id.clone_from(&record.id);
    protein.entry_name.clone_from(&record.entry_name);
    protein.protein_existence.clone_from(&record.protein_existence);
    protein.gene_names.clone_from(&record.gene_names);
    protein.sequence.clone_from(&record.sequence);
    protein.organism.clone_from(&record.organism);
    if !record.protein_name.is_empty() {
        protein.protein_name.clone_from(&record.protein_name);
    }
    protein.description = if record.description.is_empty() {
        protein.protein_name.clone()
    } else {
        record.description.clone()
    };
}

/// One protein per protein-group record, sorted by group number. `ions` must
/// be sorted by IonForm, as returned by [`assemble_ions`]
pub fn assemble_proteins(
    groups: &[ProteinGroupRecord],
    decoy_tag: &str,
    ions: &[IonEvidence],
    db: &ProteinDatabase,
) -> Result<Vec<ProteinEvidence>, Error> {
    if db.is_empty() {
        return Err(Error::MissingDatabase);
    }
    let start = Instant::now();
    let mut missing_ions = 0usize;

    let mut proteins = groups
        .iter()
        .map(|group| {
            let mut protein = ProteinEvidence {
                part_header: group.protein_name.clone(),
                protein_name: group.protein_name.clone(),
                description: group.protein_name.clone(),
                group: group.group_number,
                sub_group: group.sibling_id.clone(),
                length: group.length,
                coverage: group.percent_coverage,
                probability: group.probability,
                top_peptide_probability: group.top_peptide_probability,
                unique_stripped_peptides: group.unique_stripped_peptides.len(),
                indistinguishable_proteins: group
                    .indistinguishable_proteins
                    .iter()
                    .cloned()
                    .collect(),
                is_decoy: group.protein_name.contains(decoy_tag),
                ..Default::default()
            };

            match db.lookup(&group.protein_name, protein.is_decoy) {
                Some(record) => enrich(&mut protein, record),
                None => debug!("no database record for {}", group.protein_name),
            }

            for record in &group.peptide_ions {
                let ion_form = record.ion_form();
                let ion_ix = ions
                    .binary_search_by(|ion| ion.ion_form.cmp(&ion_form))
                    .ok();
                let ion = ion_ix.map(|ix| &ions[ix]);
                if ion.is_none() {
                    missing_ions += 1;
                }

                let view = ProteinIon {
                    ion_form: ion_form.clone(),
                    sequence: record.sequence.clone(),
                    modified_sequence: record.modified_sequence.clone(),
                    charge: record.charge,
                    calc_neutral_pep_mass: record.calc_neutral_pep_mass,
                    weight: record.weight,
                    group_weight: record.group_weight,
                    initial_probability: record.initial_probability,
                    ion: ion_ix,
                    spectra: ion.map(|i| i.spectra.clone()).unwrap_or_default(),
                    mapped_proteins: record
                        .parent_proteins
                        .iter()
                        .filter(|p| **p != group.protein_name && **p != protein.part_header)
                        .cloned()
                        .collect(),
                    upstream_unique: record.is_unique,
                    upstream_razor: record.razor,
                    is_unique: record.is_unique,
                    is_razor: record.razor,
                    razor_protein: record.razor.then(|| protein.part_header.clone()),
                };

                if let Some(ion) = ion {
                    protein.supporting_spectra.extend(ion.spectra.iter().cloned());
                }
                protein.total_peptide_ions.insert(ion_form, view);
            }
            protein
        })
        .collect::<Vec<_>>();

    proteins.sort_by_key(|p| p.group);

    if missing_ions > 0 {
        debug!(
            "{} protein peptide ions had no PSM-level ion; kept as inline records",
            missing_ions
        );
    }
    info!(
        "-  assembled {} proteins ({} reportable) in {:?}ms",
        proteins.len(),
        proteins.iter().filter(|p| p.is_reportable()).count(),
        (Instant::now() - start).as_millis()
    );
    Ok(proteins)
}
