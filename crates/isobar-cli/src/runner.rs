use crate::input::Run;
use anyhow::Context;
use isobar_core::database::{DatabaseRecord, ProteinDatabase};
use isobar_core::evidence::Evidence;
use isobar_core::identification::{ProteinGroupRecord, PsmIdentification};
use isobar_core::pipeline::Pipeline;
use isobar_core::spectrum::Spectrum;
use isobar_core::tmt::Label;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Instant;

pub struct Runner {
    pipeline: Pipeline,
    parameters: Run,
    start: Instant,
}

#[derive(Serialize)]
struct Output<'a> {
    parameters: &'a Run,
    /// Reported protein quantification, keyed by protein header
    proteins: BTreeMap<&'a str, &'a Label>,
    evidence: &'a Evidence,
}

impl Runner {
    pub fn new(parameters: Run) -> anyhow::Result<Self> {
        let start = Instant::now();
        let records: Vec<DatabaseRecord> = crate::read_json(&parameters.database)
            .with_context(|| format!("Failed to build database from `{}`", parameters.database))?;
        let database = ProteinDatabase::new(records);
        info!(
            "loaded {} protein entries in {}ms",
            database.len(),
            (Instant::now() - start).as_millis()
        );
        let pipeline = Pipeline::new(parameters.quant.clone(), database)?;
        Ok(Self {
            pipeline,
            parameters,
            start,
        })
    }

    fn load_spectra(&self) -> anyhow::Result<Vec<Spectrum>> {
        match &self.parameters.spectra {
            Some(path) => {
                let spectra: Vec<Spectrum> = crate::read_json(path)?;
                info!("- read {} spectra from {}", spectra.len(), path);
                Ok(spectra)
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let psms: Vec<PsmIdentification> = crate::read_json(&self.parameters.psms)
            .with_context(|| format!("Failed to read PSMs from `{}`", self.parameters.psms))?;
        let groups: Vec<ProteinGroupRecord> =
            crate::read_json(&self.parameters.protein_groups).with_context(|| {
                format!(
                    "Failed to read protein groups from `{}`",
                    self.parameters.protein_groups
                )
            })?;
        info!(
            "- read {} PSMs and {} protein groups",
            psms.len(),
            groups.len()
        );

        let spectra = self.load_spectra()?;
        let evidence = self.pipeline.run(&psms, &groups, spectra)?;

        let output = Output {
            parameters: &self.parameters,
            proteins: self.pipeline.reported_labels(&evidence),
            evidence: &evidence,
        };
        let file = std::fs::File::create(&self.parameters.output)
            .with_context(|| format!("Failed to create `{}`", self.parameters.output))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &output)?;
        writer.flush()?;

        println!("{}", serde_json::to_string_pretty(&self.parameters)?);

        let run_time = (Instant::now() - self.start).as_secs();
        info!("finished in {}s", run_time);
        info!("wrote evidence to {}", self.parameters.output);
        Ok(())
    }
}
