//! TMT reporter-ion channels and per-spectrum label extraction

use crate::mass::Tolerance;
use crate::spectrum::Spectrum;
use fnv::FnvHashMap;
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Reporter ions all sit below this m/z; peaks past it are not scanned
/// unless a channel window extends further
pub const REPORTER_SCAN_LIMIT: f64 = 135.0;

pub const TMT6PLEX: [f64; 6] = [
    126.127726, 127.124761, 128.134436, 129.131471, 130.141145, 131.138180,
];

pub const TMT10PLEX: [f64; 10] = [
    126.127726, 127.124761, 127.131081, 128.128116, 128.134436, 129.131471, 129.137790,
    130.134825, 130.141145, 131.138180,
];

pub const TMT11PLEX: [f64; 11] = [
    126.127726, 127.124761, 127.131081, 128.128116, 128.134436, 129.131471, 129.137790,
    130.134825, 130.141145, 131.138180, 131.144499,
];

pub const TMT16PLEX: [f64; 16] = [
    126.127726, 127.124761, 127.131081, 128.128116, 128.134436, 129.131471, 129.137790,
    130.134825, 130.141145, 131.138180, 131.144500, 132.141535, 132.147855, 133.144890,
    133.151210, 134.148245,
];

pub const TMT18PLEX: [f64; 18] = [
    126.127726, 127.124761, 127.131081, 128.128116, 128.134436, 129.131471, 129.137790,
    130.134825, 130.141145, 131.138180, 131.144500, 132.141535, 132.147855, 133.144890,
    133.151210, 134.148245, 134.154565, 135.151600,
];

const TMT6_NAMES: [&str; 6] = ["126", "127", "128", "129", "130", "131"];

const TMTPRO_NAMES: [&str; 18] = [
    "126", "127N", "127C", "128N", "128C", "129N", "129C", "130N", "130C", "131N", "131C",
    "132N", "132C", "133N", "133C", "134N", "134C", "135N",
];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Isobaric {
    Tmt6,
    #[default]
    Tmt10,
    Tmt11,
    Tmt16,
    Tmt18,
}

impl Isobaric {
    pub fn reporter_masses(&self) -> &'static [f64] {
        match self {
            Isobaric::Tmt6 => &TMT6PLEX,
            Isobaric::Tmt10 => &TMT10PLEX,
            Isobaric::Tmt11 => &TMT11PLEX,
            Isobaric::Tmt16 => &TMT16PLEX,
            Isobaric::Tmt18 => &TMT18PLEX,
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        match self {
            Isobaric::Tmt6 => TMT6_NAMES.to_vec(),
            // The 10-plex has no 131C reporter, so its last channel is plain 131
            Isobaric::Tmt10 => {
                let mut names = TMTPRO_NAMES[..10].to_vec();
                names[9] = "131";
                names
            }
            Isobaric::Tmt11 => TMTPRO_NAMES[..11].to_vec(),
            Isobaric::Tmt16 => TMTPRO_NAMES[..16].to_vec(),
            Isobaric::Tmt18 => TMTPRO_NAMES.to_vec(),
        }
    }

    /// Ordered channel table with zero intensities
    pub fn channels(&self) -> Vec<Channel> {
        self.headers()
            .into_iter()
            .zip(self.reporter_masses())
            .map(|(name, &mz)| Channel {
                name: name.into(),
                sample: None,
                mz,
                intensity: 0.0,
            })
            .collect()
    }
}

#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct Channel {
    /// Reporter ion name, e.g. `127N`
    pub name: String,
    /// User supplied sample name for this channel
    pub sample: Option<String>,
    pub mz: f64,
    pub intensity: f64,
}

/// Attach user supplied sample names to channels, keyed by reporter name
pub fn apply_sample_names(channels: &mut [Channel], names: &BTreeMap<String, String>) {
    for channel in channels {
        if let Some(sample) = names.get(&channel.name) {
            channel.sample = Some(sample.clone());
        }
    }
}

/// Reporter-ion intensities of a single spectrum, or the sum over several
#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct Label {
    pub spectrum: String,
    pub index: String,
    pub scan: String,
    pub charge: u8,
    pub channels: Vec<Channel>,
    /// Set once the label has been attached to an identified PSM
    pub used: bool,
}

impl Label {
    pub fn intensities(&self) -> impl Iterator<Item = f64> + '_ {
        self.channels.iter().map(|c| c.intensity)
    }

    pub fn total(&self) -> f64 {
        self.intensities().sum()
    }

    pub fn zero(&mut self) {
        self.channels.iter_mut().for_each(|c| c.intensity = 0.0);
    }

    /// Add the channel intensities of `other` into `self`. Channel names and
    /// m/z are taken from `other`
    pub fn accumulate(&mut self, other: &Label) {
        if self.channels.is_empty() {
            self.channels = other
                .channels
                .iter()
                .map(|c| Channel {
                    intensity: 0.0,
                    ..c.clone()
                })
                .collect();
        }
        for (ch, rhs) in self.channels.iter_mut().zip(&other.channels) {
            ch.name.clone_from(&rhs.name);
            ch.sample.clone_from(&rhs.sample);
            ch.mz = rhs.mz;
            ch.intensity += rhs.intensity;
        }
    }

    pub fn scale(&mut self, factors: &[f64]) {
        for (ch, factor) in self.channels.iter_mut().zip(factors) {
            ch.intensity *= factor;
        }
    }
}

/// Highest intensity peak within `tolerance` of `mz`. Only a strictly
/// greater intensity replaces the running maximum
pub fn select_most_intense_peak(
    spectrum: &Spectrum,
    mz: f64,
    tolerance: Tolerance,
    limit: f64,
) -> f64 {
    let (lo, hi) = tolerance.bounds(mz);
    let mut max_int = 0.0;
    for (peak_mz, intensity) in spectrum.peaks() {
        if peak_mz >= lo && peak_mz <= hi && intensity > max_int {
            max_int = intensity;
        }
        if peak_mz > limit {
            break;
        }
    }
    max_int
}

pub struct LabelExtractor {
    channels: Vec<Channel>,
    tolerance: Tolerance,
    level: u8,
    limit: f64,
}

impl LabelExtractor {
    /// `ppm` is the symmetric channel tolerance, `level` is 2 for MS2
    /// reporter ions or 3 for MS3 (SPS) quantification
    pub fn new(channels: Vec<Channel>, ppm: f64, level: u8) -> Self {
        let tolerance = Tolerance::Ppm(-ppm.abs(), ppm.abs());
        let limit = channels
            .iter()
            .map(|c| tolerance.bounds(c.mz).1)
            .fold(REPORTER_SCAN_LIMIT, f64::max);
        debug!(
            "extracting channels [{}] from MS{} up to m/z {:.4}",
            channels.iter().map(|c| c.name.as_str()).join(", "),
            level,
            limit
        );
        LabelExtractor {
            channels,
            tolerance,
            level,
            limit,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Scan id the label of `spectrum` is reported under: its own scan for
    /// MS2, the parent MS2 scan for MS3
    fn key(&self, spectrum: &Spectrum) -> Option<String> {
        match self.level {
            3 => spectrum.precursor.as_ref().map(|p| p.parent_scan.clone()),
            _ => Some(spectrum.scan.clone()),
        }
    }

    pub fn extract(&self, spectrum: &Spectrum) -> Label {
        let channels = self
            .channels
            .iter()
            .map(|ch| Channel {
                intensity: select_most_intense_peak(spectrum, ch.mz, self.tolerance, self.limit),
                ..ch.clone()
            })
            .collect();

        Label {
            spectrum: String::new(),
            index: spectrum.index.clone(),
            scan: spectrum.scan.clone(),
            charge: spectrum.precursor.as_ref().map(|p| p.charge).unwrap_or(0),
            channels,
            used: false,
        }
    }

    /// Extract a label from every spectrum of the configured level. When
    /// several spectra report under the same key, the highest scan wins
    pub fn extract_all<'a, I>(&self, spectra: I) -> FnvHashMap<String, Label>
    where
        I: IntoIterator<Item = &'a Spectrum>,
    {
        let start = Instant::now();
        let mut spectra = spectra
            .into_iter()
            .filter(|s| s.level == self.level)
            .collect::<Vec<_>>();
        // numeric order for padded ids: a longer id is a higher scan
        spectra.sort_by(|a, b| (a.scan.len(), &a.scan).cmp(&(b.scan.len(), &b.scan)));

        let labels = spectra
            .par_iter()
            .filter_map(|s| self.key(s).map(|key| (key, self.extract(s))))
            .collect::<Vec<_>>();

        let mut map = FnvHashMap::default();
        for (key, mut label) in labels {
            label.scan.clone_from(&key);
            map.insert(key, label);
        }

        info!(
            "-  extracted {} reporter-ion labels from MS{} spectra in {:?}ms",
            map.len(),
            self.level,
            (Instant::now() - start).as_millis()
        );
        map
    }
}
