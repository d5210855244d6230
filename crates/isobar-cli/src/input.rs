use anyhow::{ensure, Context};
use clap::ArgMatches;
use isobar_core::modification::KnownModification;
use isobar_core::pipeline::QuantSettings;
use isobar_core::tmt::Isobaric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Run {
    pub version: String,
    pub quant: QuantSettings,
    pub psms: String,
    pub protein_groups: String,
    pub database: String,
    pub spectra: Option<String>,
    pub output: String,
}

#[derive(Deserialize)]
/// Input parameters deserialized from JSON file
pub struct Input {
    quant: Option<QuantOptions>,
    psms: Option<String>,
    protein_groups: Option<String>,
    database: Option<String>,
    spectra: Option<String>,
    output: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct TmtOptions {
    level: Option<u8>,
    tolerance: Option<f64>,
    min_purity: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct QuantOptions {
    pub decoy_tag: Option<String>,
    pub tmt: Option<Isobaric>,
    #[serde(rename = "tmt_settings")]
    pub tmt_options: Option<TmtOptions>,
    pub min_probability: Option<f64>,
    pub unique_only: Option<bool>,
    pub label_names: Option<BTreeMap<String, String>>,
    pub known_modifications: Option<Vec<KnownModification>>,
}

impl From<QuantOptions> for QuantSettings {
    fn from(value: QuantOptions) -> QuantSettings {
        let default = QuantSettings::default();
        let tmt = value.tmt_options.unwrap_or_default();
        let settings = QuantSettings {
            decoy_tag: value.decoy_tag.unwrap_or(default.decoy_tag),
            plex: value.tmt.unwrap_or(default.plex),
            level: tmt.level.unwrap_or(default.level),
            tolerance: tmt.tolerance.unwrap_or(default.tolerance).abs(),
            min_probability: value.min_probability.unwrap_or(default.min_probability),
            min_purity: tmt.min_purity.unwrap_or(default.min_purity),
            unique_only: value.unique_only.unwrap_or(default.unique_only),
            label_names: value.label_names.unwrap_or_default(),
            known_modifications: value.known_modifications.unwrap_or_default(),
        };
        if settings.tolerance > 50.0 {
            log::warn!("tmt_settings.tolerance is higher than expected");
        }
        if !(0.0..=1.0).contains(&settings.min_purity) {
            log::warn!("tmt_settings.min_purity should be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&settings.min_probability) {
            log::warn!("quant.min_probability should be between 0 and 1");
        }
        let channels = settings.plex.headers();
        for name in settings.label_names.keys() {
            if !channels.contains(&name.as_str()) {
                log::warn!("label name `{}` does not match any {:?} channel", name, settings.plex);
            }
        }
        settings
    }
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .context("missing required `parameters` argument")?;
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(psms) = matches.get_one::<String>("psms") {
            log::trace!("overriding `psms` parameter.");
            input.psms = Some(psms.into());
        }
        if let Some(groups) = matches.get_one::<String>("protein_groups") {
            log::trace!("overriding `protein_groups` parameter.");
            input.protein_groups = Some(groups.into());
        }
        if let Some(database) = matches.get_one::<String>("database") {
            log::trace!("overriding `database` parameter.");
            input.database = Some(database.into());
        }
        if let Some(spectra) = matches.get_one::<String>("spectra") {
            log::trace!("overriding `spectra` parameter.");
            input.spectra = Some(spectra.into());
        }
        if let Some(output) = matches.get_one::<String>("output") {
            log::trace!("overriding `output` parameter.");
            input.output = Some(output.into());
        }

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        crate::read_json(path)
    }

    pub fn build(self) -> anyhow::Result<Run> {
        ensure!(
            self.psms.is_some(),
            "`psms` must be set. For more information try '--help'"
        );
        ensure!(
            self.protein_groups.is_some(),
            "`protein_groups` must be set. For more information try '--help'"
        );
        ensure!(
            self.database.is_some(),
            "`database` must be set. For more information try '--help'"
        );
        if self.spectra.is_none() {
            log::warn!("no `spectra` given: evidence will be assembled without quantification");
        }

        let quant: QuantSettings = self.quant.map(Into::into).unwrap_or_default();
        quant.validate()?;

        Ok(Run {
            version: clap::crate_version!().into(),
            quant,
            psms: self.psms.unwrap_or_default(),
            protein_groups: self.protein_groups.unwrap_or_default(),
            database: self.database.unwrap_or_default(),
            spectra: self.spectra,
            output: self.output.unwrap_or_else(|| "evidence.json".into()),
        })
    }
}
