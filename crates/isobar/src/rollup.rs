//! Reporter-ion label aggregation from spectra up to proteins

use crate::evidence::{IonEvidence, LabelBuckets, PeptideEvidence, ProteinEvidence, PsmEvidence};
use crate::spectrum::scan_of;
use crate::tmt::Label;
use fnv::FnvHashMap;
use log::{debug, info};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::time::Instant;

/// Spectrum name -> label of the PSM identifying it
pub type SpectrumLabels<'a> = FnvHashMap<&'a str, &'a Label>;

/// Attach extracted labels (keyed by padded scan) to their PSMs. Returns the
/// number of PSMs that received a label
pub fn map_labeled_spectra(psms: &mut [PsmEvidence], labels: &FnvHashMap<String, Label>) -> usize {
    let mut mapped = 0;
    for psm in psms.iter_mut() {
        if let Some(label) = labels.get(&scan_of(&psm.spectrum)) {
            psm.label = label.clone();
            psm.label.spectrum.clone_from(&psm.spectrum);
            psm.label.used = true;
            mapped += 1;
        }
    }
    info!("-  mapped labels onto {}/{} PSMs", mapped, psms.len());
    mapped
}

/// Zero the labels of PSMs without a reagent-tag modification. Returns the
/// number of labels cleared
pub fn correct_unlabelled_spectra(psms: &mut [PsmEvidence]) -> usize {
    let mut cleared = 0;
    for psm in psms.iter_mut().filter(|psm| !psm.has_reagent_tag()) {
        psm.label.zero();
        cleared += 1;
    }
    if cleared > 0 {
        debug!("cleared labels of {} PSMs without reagent tag", cleared);
    }
    cleared
}

/// Labels eligible for roll-up: attached to a PSM reaching both quality
/// thresholds. The second table holds the phosphorylated subset
pub fn spectrum_labels(
    psms: &[PsmEvidence],
    min_probability: f64,
    min_purity: f64,
) -> (SpectrumLabels<'_>, SpectrumLabels<'_>) {
    let mut labels = SpectrumLabels::default();
    let mut phospho = SpectrumLabels::default();
    for psm in psms.iter().filter(|psm| {
        psm.label.used && psm.probability() >= min_probability && psm.purity >= min_purity
    }) {
        labels.insert(psm.spectrum.as_str(), &psm.label);
        if psm.is_phospho() {
            phospho.insert(psm.spectrum.as_str(), &psm.label);
        }
    }
    (labels, phospho)
}

fn sum_labels(spectra: &BTreeSet<String>, labels: &SpectrumLabels<'_>) -> Label {
    let mut sum = Label::default();
    for label in spectra.iter().filter_map(|s| labels.get(s.as_str())) {
        sum.accumulate(label);
    }
    sum
}

pub fn roll_up_ions(
    ions: &mut [IonEvidence],
    labels: &SpectrumLabels<'_>,
    phospho: &SpectrumLabels<'_>,
) {
    let start = Instant::now();
    ions.par_iter_mut().for_each(|ion| {
        ion.label = sum_labels(&ion.spectra, labels);
        ion.phospho_label = sum_labels(&ion.spectra, phospho);
        ion.summed_label_intensity = ion.label.total();
    });
    info!(
        "-  rolled up labels for {} ions in {:?}ms",
        ions.len(),
        (Instant::now() - start).as_millis()
    );
}

pub fn roll_up_peptides(
    peptides: &mut [PeptideEvidence],
    labels: &SpectrumLabels<'_>,
    phospho: &SpectrumLabels<'_>,
) {
    let start = Instant::now();
    peptides.par_iter_mut().for_each(|peptide| {
        peptide.label = sum_labels(&peptide.spectra, labels);
        peptide.phospho_label = sum_labels(&peptide.spectra, phospho);
    });
    info!(
        "-  rolled up labels for {} peptides in {:?}ms",
        peptides.len(),
        (Instant::now() - start).as_millis()
    );
}

fn roll_up_buckets(protein: &ProteinEvidence, labels: &SpectrumLabels<'_>) -> LabelBuckets {
    let mut buckets = LabelBuckets::default();
    for view in protein.total_peptide_ions.values() {
        let sum = sum_labels(&view.spectra, labels);
        if sum.channels.is_empty() {
            continue;
        }
        buckets.total.accumulate(&sum);
        if view.is_unique {
            buckets.unique.accumulate(&sum);
        }
        if view.is_razor_for(&protein.part_header) {
            buckets.razor.accumulate(&sum);
        }
    }
    buckets
}

/// Sum the labels of every protein view into the Total bucket, and into the
/// Unique and Unique+Razor buckets where the view qualifies
pub fn roll_up_proteins(
    proteins: &mut [ProteinEvidence],
    labels: &SpectrumLabels<'_>,
    phospho: &SpectrumLabels<'_>,
) {
    let start = Instant::now();
    proteins.par_iter_mut().for_each(|protein| {
        protein.labels = roll_up_buckets(protein, labels);
        protein.phospho_labels = roll_up_buckets(protein, phospho);
    });
    info!(
        "-  rolled up labels for {} proteins in {:?}ms",
        proteins.len(),
        (Instant::now() - start).as_millis()
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::evidence::ProteinIon;
    use crate::identification::{ModificationSite, Scores};
    use crate::tmt::Isobaric;

    fn tagged() -> Vec<ModificationSite> {
        vec![ModificationSite {
            position: "N-term".into(),
            amino_acid: "n".into(),
            mass: 230.17,
            mass_diff: 229.162932,
        }]
    }

    fn label(values: &[f64]) -> Label {
        let mut channels = Isobaric::Tmt6.channels();
        for (ch, v) in channels.iter_mut().zip(values) {
            ch.intensity = *v;
        }
        Label {
            channels,
            ..Default::default()
        }
    }

    fn psm(spectrum: &str) -> PsmEvidence {
        PsmEvidence {
            spectrum: spectrum.into(),
            modifications: tagged(),
            purity: 0.9,
            scores: Scores {
                probability: 0.99,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn map_and_correct() {
        let mut labels = FnvHashMap::default();
        labels.insert("00002".to_string(), label(&[1.0, 2.0]));
        labels.insert("00003".to_string(), label(&[5.0, 5.0]));

        let mut untagged = psm("run.00003.00003.2");
        untagged.modifications.clear();
        let mut psms = vec![psm("run.00002.00002.2"), untagged, psm("run.00009.00009.2")];

        assert_eq!(map_labeled_spectra(&mut psms, &labels), 2);
        assert!(psms[0].label.used);
        assert_eq!(psms[0].label.spectrum, "run.00002.00002.2");
        assert!(!psms[2].label.used);

        correct_unlabelled_spectra(&mut psms);
        assert_eq!(psms[0].label_total(), 3.0);
        assert_eq!(psms[1].label_total(), 0.0);
    }

    #[test]
    fn quality_filter() {
        let mut psms = vec![psm("a"), psm("b"), psm("c")];
        for p in psms.iter_mut() {
            p.label = label(&[1.0]);
            p.label.used = true;
        }
        psms[1].purity = 0.2;
        psms[2].scores.probability = 0.1;
        psms[0].modifications.push(ModificationSite {
            position: "3".into(),
            amino_acid: "S".into(),
            mass: 166.998,
            mass_diff: 79.96633,
        });
        let (labels, phospho) = spectrum_labels(&psms, 0.7, 0.5);
        assert_eq!(labels.len(), 1);
        assert!(labels.contains_key("a"));
        assert_eq!(phospho.len(), 1);
    }

    #[test]
    fn phospho_labels_reach_ions_and_proteins() {
        let mut phospho = psm("s1");
        phospho.modifications.push(ModificationSite {
            position: "4".into(),
            amino_acid: "T".into(),
            mass: 181.014,
            mass_diff: 79.96633,
        });
        phospho.label = label(&[6.0, 0.0, 2.0]);
        phospho.label.used = true;
        let mut plain = psm("s2");
        plain.label = label(&[1.0, 1.0]);
        plain.label.used = true;
        let psms = vec![phospho, plain];
        let (labels, phospho) = spectrum_labels(&psms, 0.7, 0.5);
        assert_eq!(phospho.len(), 1);

        let spectra = |s: &[&str]| s.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        let mut ions = vec![IonEvidence {
            ion_form: "PEPTK#2#1.0000".into(),
            spectra: spectra(&["s1", "s2"]),
            ..Default::default()
        }];
        roll_up_ions(&mut ions, &labels, &phospho);
        assert_eq!(ions[0].label.total(), 10.0);
        assert_eq!(
            ions[0].phospho_label.intensities().collect::<Vec<_>>(),
            vec![6.0, 0.0, 2.0, 0.0, 0.0, 0.0]
        );

        let view = |ion_form: &str, unique: bool, razor: &str, s: &[&str]| ProteinIon {
            ion_form: ion_form.into(),
            spectra: spectra(s),
            is_unique: unique,
            is_razor: true,
            razor_protein: Some(razor.into()),
            ..Default::default()
        };
        let mut proteins = vec![
            ProteinEvidence {
                part_header: "P".into(),
                total_peptide_ions: [view("PEPTK#2#1.0000", true, "P", &["s1", "s2"])]
                    .into_iter()
                    .map(|v| (v.ion_form.clone(), v))
                    .collect(),
                ..Default::default()
            },
            ProteinEvidence {
                part_header: "Q".into(),
                total_peptide_ions: [view("SHARED#2#1.0000", false, "P", &["s1"])]
                    .into_iter()
                    .map(|v| (v.ion_form.clone(), v))
                    .collect(),
                ..Default::default()
            },
        ];
        roll_up_proteins(&mut proteins, &labels, &phospho);

        let p = &proteins[0].phospho_labels;
        for bucket in [&p.total, &p.unique, &p.razor] {
            assert_eq!(bucket.channels[0].intensity, 6.0);
            assert_eq!(bucket.total(), 8.0);
        }
        assert_eq!(proteins[0].labels.total.total(), 10.0);

        // shared view owned by P: total only
        let q = &proteins[1].phospho_labels;
        assert_eq!(q.total.total(), 8.0);
        assert_eq!(q.unique.total(), 0.0);
        assert_eq!(q.razor.total(), 0.0);
    }

    #[test]
    fn rollup_buckets_are_additive() {
        let psms = ["s1", "s2", "s3"]
            .iter()
            .zip([[1.0, 2.0], [3.0, 4.0], [10.0, 0.0]])
            .map(|(s, v)| {
                let mut p = psm(s);
                p.label = label(&v);
                p.label.used = true;
                p
            })
            .collect::<Vec<_>>();
        let (labels, phospho) = spectrum_labels(&psms, 0.0, 0.0);

        let spectra = |s: &[&str]| s.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        let mut ions = vec![
            IonEvidence {
                ion_form: "A#2#1.0000".into(),
                spectra: spectra(&["s1", "s2"]),
                ..Default::default()
            },
            IonEvidence {
                ion_form: "B#2#1.0000".into(),
                spectra: spectra(&["s3"]),
                ..Default::default()
            },
        ];
        roll_up_ions(&mut ions, &labels, &phospho);
        assert_eq!(ions[0].label.channels[0].intensity, 4.0);
        assert_eq!(ions[0].summed_label_intensity, 10.0);
        assert!(ions[0].phospho_label.channels.is_empty());

        let mut proteins = vec![ProteinEvidence {
            part_header: "P".into(),
            total_peptide_ions: [
                ProteinIon {
                    ion_form: "A#2#1.0000".into(),
                    spectra: spectra(&["s1", "s2"]),
                    is_unique: true,
                    is_razor: true,
                    razor_protein: Some("P".into()),
                    ..Default::default()
                },
                ProteinIon {
                    ion_form: "B#2#1.0000".into(),
                    spectra: spectra(&["s3"]),
                    is_razor: true,
                    razor_protein: Some("Q".into()),
                    ..Default::default()
                },
            ]
            .into_iter()
            .map(|v| (v.ion_form.clone(), v))
            .collect(),
            ..Default::default()
        }];
        roll_up_proteins(&mut proteins, &labels, &phospho);

        let p = &proteins[0];
        for ch in 0..6 {
            let expected: f64 = ions.iter().map(|i| i.label.channels[ch].intensity).sum();
            assert_eq!(p.labels.total.channels[ch].intensity, expected);
        }
        assert_eq!(p.labels.unique.total(), 10.0);
        assert_eq!(p.labels.razor.total(), 10.0);
        assert_eq!(p.labels.total.total(), 20.0);
        assert!(p.phospho_labels.total.channels.is_empty());
    }
}
