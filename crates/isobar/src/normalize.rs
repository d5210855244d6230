use crate::evidence::ProteinEvidence;
use log::{info, warn};

/// Scale the Unique+Razor label of every protein by a per-channel factor:
/// the channel's total over all proteins divided by the largest channel
/// total. Returns the factors applied
pub fn normalize_to_total_proteins(proteins: &mut [ProteinEvidence]) -> Vec<f64> {
    let channels = proteins
        .iter()
        .map(|p| p.labels.razor.channels.len())
        .max()
        .unwrap_or(0);

    let mut sums = vec![0.0; channels];
    for protein in proteins.iter() {
        for (sum, intensity) in sums.iter_mut().zip(protein.labels.razor.intensities()) {
            *sum += intensity;
        }
    }

    let max = sums.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        warn!("no Unique+Razor reporter intensity found; skipping normalization");
        return vec![1.0; channels];
    }

    let factors = sums.iter().map(|sum| sum / max).collect::<Vec<_>>();
    for protein in proteins.iter_mut() {
        protein.labels.razor.scale(&factors);
    }

    info!(
        "-  normalized {} channels across {} proteins",
        channels,
        proteins.len()
    );
    factors
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tmt::{Isobaric, Label};
    use quickcheck_macros::quickcheck;

    fn protein(values: &[f64]) -> ProteinEvidence {
        let mut channels = Isobaric::Tmt6.channels();
        for (ch, v) in channels.iter_mut().zip(values) {
            ch.intensity = *v;
        }
        let mut protein = ProteinEvidence::default();
        protein.labels.razor = Label {
            channels,
            ..Default::default()
        };
        protein
    }

    fn sums(proteins: &[ProteinEvidence]) -> Vec<f64> {
        let mut sums = vec![0.0; 6];
        for p in proteins {
            for (s, v) in sums.iter_mut().zip(p.labels.razor.intensities()) {
                *s += v;
            }
        }
        sums
    }

    #[test]
    fn factors() {
        let mut proteins = vec![
            protein(&[10.0, 5.0, 0.0, 2.0, 1.0, 1.0]),
            protein(&[10.0, 15.0, 0.0, 2.0, 1.0, 1.0]),
        ];
        let factors = normalize_to_total_proteins(&mut proteins);
        assert_eq!(factors, vec![1.0, 1.0, 0.0, 0.2, 0.1, 0.1]);
        assert_eq!(proteins[1].labels.razor.channels[1].intensity, 15.0);
        assert_eq!(proteins[0].labels.razor.channels[3].intensity, 0.4);
    }

    #[test]
    fn empty_intensities_are_left_alone() {
        let mut proteins = vec![protein(&[]), ProteinEvidence::default()];
        let factors = normalize_to_total_proteins(&mut proteins);
        assert_eq!(factors, vec![1.0; 6]);
        assert_eq!(proteins[0].labels.razor.total(), 0.0);
    }

    #[quickcheck]
    fn max_channel_is_fixed_point(values: Vec<(u16, u16, u16, u16, u16, u16)>) -> bool {
        let mut proteins = values
            .iter()
            .map(|v| {
                protein(&[
                    v.0 as f64, v.1 as f64, v.2 as f64, v.3 as f64, v.4 as f64, v.5 as f64,
                ])
            })
            .collect::<Vec<_>>();
        let before = sums(&proteins);
        let max = before.iter().copied().fold(0.0, f64::max);
        normalize_to_total_proteins(&mut proteins);
        let after = sums(&proteins);

        let tolerance = 1e-9 * max.max(1.0);
        let argmax = before
            .iter()
            .position(|&s| s == max)
            .unwrap_or_default();
        (after[argmax] - before[argmax]).abs() <= tolerance
            && after.iter().all(|&s| s <= max + tolerance)
    }
}
