//! Modification bookkeeping: observation counts, assigned/observed
//! modification sets and the mass-shift histogram

use crate::evidence::{Evidence, PsmEvidence};
use crate::mass::round_to;
use fnv::{FnvHashMap, FnvHashSet};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

/// Histogram covers mass shifts in `[-MASS_AMPLITUDE, MASS_AMPLITUDE]`
pub const MASS_AMPLITUDE: f64 = 500.0;
pub const BIN_SIZE: f64 = 0.1;

/// Mass tolerance (Da) when matching against known modifications
const KNOWN_MOD_TOLERANCE: f64 = 0.01;

/// A modification with a known mass, e.g. from UniMod
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnownModification {
    pub mass: f64,
    pub title: String,
}

/// One mass-shift bin `(lower, upper]`
#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct MassBin {
    pub lower: f64,
    pub upper: f64,
    pub center: f64,
    pub average_mass: f64,
    pub corrected_mass: f64,
    /// Positions in [`Evidence::psms`] carrying an assigned modification
    /// of this mass
    pub assigned_psms: Vec<usize>,
    /// Positions in [`Evidence::psms`] whose precursor mass difference
    /// falls in this bin
    pub observed_psms: Vec<usize>,
}

impl MassBin {
    fn new(ix: usize) -> Self {
        let center = round_to(-MASS_AMPLITUDE + ix as f64 * BIN_SIZE, 4);
        MassBin {
            lower: round_to(center - BIN_SIZE / 2.0, 4),
            upper: round_to(center + BIN_SIZE / 2.0, 4),
            center,
            ..Default::default()
        }
    }

    fn contains(&self, mass: f64) -> bool {
        mass > self.lower && mass <= self.upper
    }
}

fn bin_count() -> usize {
    (2.0 * MASS_AMPLITUDE / BIN_SIZE).round() as usize + 1
}

/// Index of the bin holding `mass`, if it lies inside the histogram
fn bin_of(bins: &[MassBin], mass: f64) -> Option<usize> {
    let guess = ((mass + MASS_AMPLITUDE) / BIN_SIZE).round() as i64;
    (guess - 1..=guess + 1)
        .filter(|&ix| ix >= 0 && (ix as usize) < bins.len())
        .map(|ix| ix as usize)
        .find(|&ix| bins[ix].contains(mass))
}

/// Build the mass-shift histogram over all PSMs
pub fn assemble_modifications(psms: &[PsmEvidence]) -> Vec<MassBin> {
    let start = Instant::now();
    let mut bins = (0..bin_count()).map(MassBin::new).collect::<Vec<_>>();

    for (psm_ix, psm) in psms.iter().enumerate() {
        let assigned = psm
            .modifications
            .iter()
            .filter(|m| m.mass_diff != 0.0)
            .filter_map(|m| bin_of(&bins, m.mass_diff))
            .collect::<BTreeSet<_>>();
        for ix in assigned {
            bins[ix].assigned_psms.push(psm_ix);
        }
        if let Some(ix) = bin_of(&bins, psm.mass_diff) {
            bins[ix].observed_psms.push(psm_ix);
        }
    }

    for bin in bins.iter_mut() {
        if !bin.observed_psms.is_empty() {
            let sum = bin
                .observed_psms
                .iter()
                .map(|&ix| psms[ix].mass_diff)
                .sum::<f64>();
            bin.average_mass = round_to(sum / bin.observed_psms.len() as f64, 4);
        }
    }

    let zero_deviation = bin_of(&bins, 0.0)
        .map(|ix| bins[ix].average_mass)
        .unwrap_or(0.0);
    for bin in bins.iter_mut() {
        bin.corrected_mass = if bin.observed_psms.is_empty() {
            bin.center
        } else {
            round_to(bin.average_mass - zero_deviation, 4)
        };
    }

    let populated = bins.iter().filter(|b| !b.observed_psms.is_empty()).count();
    info!(
        "-  binned mass shifts into {} populated bins in {:?}ms",
        populated,
        (Instant::now() - start).as_millis()
    );
    bins
}

/// Annotate assigned and observed modifications from a table of known
/// modification masses. A mass difference without a known counterpart is
/// recorded as `Unknown`
pub fn annotate_observed_modifications(psms: &mut [PsmEvidence], known: &[KnownModification]) {
    let find = |mass: f64| {
        known
            .iter()
            .find(|k| (k.mass - mass).abs() <= KNOWN_MOD_TOLERANCE)
    };

    for psm in psms.iter_mut() {
        let mut assigned_masses = Vec::new();
        for site in psm.modifications.iter().filter(|m| m.mass_diff != 0.0) {
            if let Some(k) = find(site.mass_diff) {
                psm.assigned_modifications
                    .insert(format!("{:.4}:{}", k.mass, k.title));
                assigned_masses.push(k.mass);
            }
        }

        if psm.is_unmodified() {
            continue;
        }
        match find(psm.mass_diff) {
            Some(k) if assigned_masses.contains(&k.mass) => {}
            Some(k) => {
                psm.observed_modifications
                    .insert(format!("{:.4}:{}", k.mass, k.title));
            }
            None => {
                psm.observed_modifications.insert("Unknown".into());
            }
        }
    }
}

/// Recount modified/unmodified observations of every ion from its PSMs
pub fn update_ion_mod_count(evidence: &mut Evidence) {
    let mut counts: FnvHashMap<&str, (u32, u32)> = FnvHashMap::default();
    for psm in &evidence.psms {
        let entry = counts.entry(psm.ion_form.as_str()).or_default();
        if psm.is_unmodified() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    for ion in evidence.ions.iter_mut() {
        let (unmodified, modified) = counts.get(ion.ion_form.as_str()).copied().unwrap_or_default();
        ion.unmodified_observations = unmodified;
        ion.modified_observations = modified;
    }
}

/// Recount modified/unmodified observations of every peptide from its PSMs
pub fn update_peptide_mod_count(evidence: &mut Evidence) {
    let mut counts: FnvHashMap<&str, (u32, u32)> = FnvHashMap::default();
    for psm in &evidence.psms {
        let entry = counts.entry(psm.peptide.as_str()).or_default();
        if psm.is_unmodified() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    for peptide in evidence.peptides.iter_mut() {
        let (unmodified, modified) = counts
            .get(peptide.sequence.as_str())
            .copied()
            .unwrap_or_default();
        peptide.unmodified_observations = unmodified;
        peptide.modified_observations = modified;
    }
}

/// Collect assigned and observed modification sets of ions and peptides
/// from their PSMs
pub fn update_assigned_modifications(evidence: &mut Evidence) {
    type Mods<'a> = (FnvHashSet<&'a str>, FnvHashSet<&'a str>);
    let mut by_ion: FnvHashMap<&str, Mods> = FnvHashMap::default();
    let mut by_peptide: FnvHashMap<&str, Mods> = FnvHashMap::default();
    for psm in &evidence.psms {
        for table in [
            by_ion.entry(psm.ion_form.as_str()).or_default(),
            by_peptide.entry(psm.peptide.as_str()).or_default(),
        ] {
            table
                .0
                .extend(psm.assigned_modifications.iter().map(String::as_str));
            table
                .1
                .extend(psm.observed_modifications.iter().map(String::as_str));
        }
    }

    for ion in evidence.ions.iter_mut() {
        if let Some((assigned, observed)) = by_ion.get(ion.ion_form.as_str()) {
            ion.assigned_modifications = assigned.iter().map(|s| s.to_string()).collect();
            ion.observed_modifications = observed.iter().map(|s| s.to_string()).collect();
        }
    }
    for peptide in evidence.peptides.iter_mut() {
        if let Some((assigned, observed)) = by_peptide.get(peptide.sequence.as_str()) {
            peptide.assigned_modifications = assigned.iter().map(|s| s.to_string()).collect();
            peptide.observed_modifications = observed.iter().map(|s| s.to_string()).collect();
        }
    }
}
