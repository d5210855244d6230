//! Decoded spectra and the scan-level lookup tables used by purity
//! estimation and reporter-ion extraction

use fnv::FnvHashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Scan and index identifiers are zero padded to this width
pub const ID_WIDTH: usize = 5;

/// Half-width (m/z) assumed for an isolation window that was not reported
pub const DEFAULT_ISOLATION_OFFSET: f64 = 0.5;

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Precursor {
    pub parent_scan: String,
    pub parent_index: String,
    pub target_mz: f64,
    pub charge: u8,
    pub isolation_lower: f64,
    pub isolation_upper: f64,
    /// Reported intensity of the selected precursor peak
    pub peak_intensity: f64,
}

impl Precursor {
    /// Isolation window in m/z around the precursor target
    pub fn isolation_window(&self) -> (f64, f64) {
        (
            self.target_mz - self.isolation_lower,
            self.target_mz + self.isolation_upper,
        )
    }
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub scan: String,
    pub index: String,
    /// MSn level
    pub level: u8,
    /// Selected precursor, if `level > 1`
    #[serde(default)]
    pub precursor: Option<Precursor>,
    /// Peak m/z values, sorted in ascending order
    #[serde(default)]
    pub mz: Vec<f64>,
    #[serde(default)]
    pub intensity: Vec<f64>,
}

/// Left-pad an identifier with zeros to [`ID_WIDTH`]. Longer identifiers
/// are returned unchanged
pub fn pad_id(id: &str) -> String {
    format!("{:0>width$}", id, width = ID_WIDTH)
}

/// Extract the scan number from a PSM spectrum name of the form
/// `run.scan.scan.charge`, padded for index lookups
pub fn scan_of(spectrum_name: &str) -> String {
    let scan = spectrum_name.split('.').nth(1).unwrap_or(spectrum_name);
    pad_id(scan)
}

impl Spectrum {
    /// Pad identifiers and default missing isolation windows in place
    pub fn normalize(&mut self) {
        self.scan = pad_id(&self.scan);
        self.index = pad_id(&self.index);
        if let Some(precursor) = self.precursor.as_mut() {
            precursor.parent_scan = pad_id(&precursor.parent_scan);
            precursor.parent_index = pad_id(&precursor.parent_index);
            if self.level >= 2
                && precursor.isolation_lower == 0.0
                && precursor.isolation_upper == 0.0
            {
                precursor.isolation_lower = DEFAULT_ISOLATION_OFFSET;
                precursor.isolation_upper = DEFAULT_ISOLATION_OFFSET;
            }
        }
    }

    pub fn peaks(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mz
            .iter()
            .copied()
            .zip(self.intensity.iter().copied())
    }
}

/// Spectra keyed by padded scan id, one table per MS level
#[derive(Default, Debug)]
pub struct SpectrumIndex {
    ms1: FnvHashMap<String, Spectrum>,
    ms2: FnvHashMap<String, Spectrum>,
    ms3: FnvHashMap<String, Spectrum>,
}

impl SpectrumIndex {
    pub fn new(spectra: Vec<Spectrum>) -> Self {
        let start = Instant::now();
        let mut index = SpectrumIndex::default();
        let mut ignored = 0usize;
        for mut spectrum in spectra {
            spectrum.normalize();
            let table = match spectrum.level {
                1 => &mut index.ms1,
                2 => &mut index.ms2,
                3 => &mut index.ms3,
                _ => {
                    ignored += 1;
                    continue;
                }
            };
            table.insert(spectrum.scan.clone(), spectrum);
        }
        if ignored > 0 {
            debug!("ignored {} spectra with unsupported MS level", ignored);
        }
        info!(
            "-  indexed {} MS1, {} MS2 and {} MS3 spectra in {:?}ms",
            index.ms1.len(),
            index.ms2.len(),
            index.ms3.len(),
            (Instant::now() - start).as_millis()
        );
        index
    }

    pub fn ms1(&self, scan: &str) -> Option<&Spectrum> {
        self.ms1.get(scan)
    }

    pub fn ms2(&self, scan: &str) -> Option<&Spectrum> {
        self.ms2.get(scan)
    }

    pub fn ms3(&self, scan: &str) -> Option<&Spectrum> {
        self.ms3.get(scan)
    }

    /// Spectra of a given MS level, in no particular order
    pub fn level(&self, level: u8) -> impl Iterator<Item = &Spectrum> {
        let table = match level {
            1 => Some(&self.ms1),
            2 => Some(&self.ms2),
            3 => Some(&self.ms3),
            _ => None,
        };
        table.into_iter().flat_map(|t| t.values())
    }

    /// Resolve the parent spectrum of an MS2 (in the MS1 table) or an MS3
    /// (in the MS2 table)
    pub fn parent_of(&self, spectrum: &Spectrum) -> Option<&Spectrum> {
        let precursor = spectrum.precursor.as_ref()?;
        match spectrum.level {
            2 => self.ms1(&precursor.parent_scan),
            3 => self.ms2(&precursor.parent_scan),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.ms1.len() + self.ms2.len() + self.ms3.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ms2(scan: &str, parent: &str) -> Spectrum {
        Spectrum {
            scan: scan.into(),
            index: scan.into(),
            level: 2,
            precursor: Some(Precursor {
                parent_scan: parent.into(),
                parent_index: parent.into(),
                target_mz: 500.0,
                charge: 2,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn padding() {
        assert_eq!(pad_id("12"), "00012");
        assert_eq!(pad_id("123456"), "123456");
        assert_eq!(scan_of("run.42.42.2"), "00042");
        assert_eq!(scan_of("42"), "00042");
    }

    #[test]
    fn index_levels() {
        let spectra = vec![
            Spectrum {
                scan: "1".into(),
                index: "0".into(),
                level: 1,
                ..Default::default()
            },
            ms2("2", "1"),
            Spectrum {
                scan: "3".into(),
                index: "2".into(),
                level: 3,
                precursor: Some(Precursor {
                    parent_scan: "2".into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Spectrum {
                scan: "4".into(),
                level: 7,
                ..Default::default()
            },
        ];
        let index = SpectrumIndex::new(spectra);
        assert_eq!(index.len(), 3);

        let ms2 = index.ms2("00002").unwrap();
        let precursor = ms2.precursor.as_ref().unwrap();
        assert_eq!(precursor.parent_scan, "00001");
        assert_eq!(precursor.isolation_lower, DEFAULT_ISOLATION_OFFSET);
        assert_eq!(precursor.isolation_upper, DEFAULT_ISOLATION_OFFSET);
        assert_eq!(precursor.isolation_window(), (499.5, 500.5));

        assert_eq!(index.parent_of(ms2).unwrap().scan, "00001");
        let ms3 = index.ms3("00003").unwrap();
        assert_eq!(index.parent_of(ms3).unwrap().scan, "00002");
        assert!(index.ms1("00004").is_none());
    }

    #[test]
    fn reported_window_is_kept() {
        let mut spectrum = ms2("10", "9");
        if let Some(p) = spectrum.precursor.as_mut() {
            p.isolation_lower = 0.7;
            p.isolation_upper = 0.3;
        }
        spectrum.normalize();
        let p = spectrum.precursor.unwrap();
        assert_eq!((p.isolation_lower, p.isolation_upper), (0.7, 0.3));
    }
}
