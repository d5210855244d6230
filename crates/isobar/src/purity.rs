//! Precursor isolation purity
//!
//! Purity is the share of MS1 signal inside the isolation window that belongs
//! to the isotope envelope of the selected precursor. Low purity indicates
//! co-isolated interference that would distort reporter-ion ratios.

use crate::evidence::PsmEvidence;
use crate::mass::{round_to, truncate_to};
use crate::spectrum::{scan_of, Spectrum, SpectrumIndex};
use log::info;
use rayon::prelude::*;
use std::time::Instant;

/// Number of isotope harmonics (`k / charge`) considered part of the envelope
const ISOTOPE_HARMONICS: u8 = 6;

/// Tolerance (m/z) when matching a window peak against an isotope harmonic
const ISOTOPE_TOLERANCE: f64 = 0.02;

/// Purity of an MS2 precursor given its parent MS1 spectrum
pub fn ion_purity(ms2: &Spectrum, ms1: &Spectrum) -> f64 {
    let precursor = match ms2.precursor.as_ref() {
        Some(p) => p,
        None => return 0.0,
    };
    let (lo, hi) = precursor.isolation_window();
    let charge = precursor.charge.max(1) as f64;
    let deltas = (1..=ISOTOPE_HARMONICS)
        .map(|k| truncate_to(k as f64 / charge, 2))
        .collect::<Vec<_>>();

    let mut window = 0.0;
    let mut package = precursor.peak_intensity;
    for (mz, intensity) in ms1.peaks().filter(|(mz, _)| *mz >= lo && *mz <= hi) {
        window += intensity;
        let offset = (precursor.target_mz - mz).abs();
        if deltas
            .iter()
            .any(|delta| (offset - delta).abs() <= ISOTOPE_TOLERANCE)
        {
            package += intensity;
        }
    }

    if window == 0.0 || package == 0.0 {
        return 0.0;
    }
    round_to(package / window, 4).clamp(0.0, 1.0)
}

/// Assign a purity to every PSM whose spectrum and parent are both indexed.
/// PSMs without a resolvable spectrum keep a purity of zero
pub fn calculate_purity(psms: &mut [PsmEvidence], index: &SpectrumIndex) {
    let start = Instant::now();
    psms.par_iter_mut().for_each(|psm| {
        psm.purity = index
            .ms2(&scan_of(&psm.spectrum))
            .and_then(|ms2| index.parent_of(ms2).map(|ms1| ion_purity(ms2, ms1)))
            .unwrap_or(0.0);
    });
    let resolved = psms.iter().filter(|psm| psm.purity > 0.0).count();
    info!(
        "-  calculated precursor purity for {}/{} PSMs in {:?}ms",
        resolved,
        psms.len(),
        (Instant::now() - start).as_millis()
    );
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::spectrum::Precursor;
    use quickcheck_macros::quickcheck;

    fn ms1(peaks: &[(f64, f64)]) -> Spectrum {
        Spectrum {
            scan: "1".into(),
            index: "0".into(),
            level: 1,
            precursor: None,
            mz: peaks.iter().map(|p| p.0).collect(),
            intensity: peaks.iter().map(|p| p.1).collect(),
        }
    }

    fn ms2(target_mz: f64, charge: u8, peak_intensity: f64) -> Spectrum {
        Spectrum {
            scan: "2".into(),
            index: "1".into(),
            level: 2,
            precursor: Some(Precursor {
                parent_scan: "1".into(),
                parent_index: "0".into(),
                target_mz,
                charge,
                isolation_lower: 0.0,
                isolation_upper: 0.0,
                peak_intensity,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn clean_envelope() {
        let mut s = ms2(500.0, 2, 100.0);
        s.normalize();
        // precursor, +1/2 and +2/2 isotopes, one interfering peak
        let parent = ms1(&[(500.0, 100.0), (500.5, 50.0), (499.8, 50.0)]);
        // package = 100 (reported) + 50 (500.5); window = 200
        assert_eq!(ion_purity(&s, &parent), 0.75);
    }

    #[test]
    fn purity_is_clamped() {
        let mut s = ms2(500.0, 2, 1000.0);
        s.normalize();
        let parent = ms1(&[(500.0, 10.0)]);
        assert_eq!(ion_purity(&s, &parent), 1.0);
    }

    #[test]
    fn empty_window() {
        let mut s = ms2(500.0, 2, 100.0);
        s.normalize();
        let parent = ms1(&[(400.0, 100.0)]);
        assert_eq!(ion_purity(&s, &parent), 0.0);
    }

    #[test]
    fn unresolved_spectrum_has_zero_purity() {
        let mut s = ms2(500.0, 2, 100.0);
        s.scan = "7".into();
        let index = SpectrumIndex::new(vec![ms1(&[(500.0, 10.0)]), s]);
        let mut psms = vec![
            PsmEvidence {
                spectrum: "run.00007.00007.2".into(),
                ..Default::default()
            },
            PsmEvidence {
                spectrum: "run.00008.00008.2".into(),
                purity: 0.3,
                ..Default::default()
            },
        ];
        calculate_purity(&mut psms, &index);
        assert_eq!(psms[0].purity, 1.0);
        assert_eq!(psms[1].purity, 0.0);
    }

    #[quickcheck]
    fn purity_bounded(peaks: Vec<(u16, u16)>, reported: u16, charge: u8) -> bool {
        let parent = ms1(
            &peaks
                .iter()
                .map(|&(mz, int)| (499.0 + mz as f64 / 30000.0, int as f64))
                .collect::<Vec<_>>(),
        );
        let mut s = ms2(500.0, charge % 5, reported as f64);
        s.normalize();
        let purity = ion_purity(&s, &parent);
        (0.0..=1.0).contains(&purity)
    }
}
