use clap::{value_parser, Arg, Command, ValueHint};
use isobar_cli::input::Input;
use isobar_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("ISOBAR_LOG", "error,isobar=info"))
        .init();

    let matches = Command::new("isobar")
        .version(clap::crate_version!())
        .about("Evidence aggregation and isobaric TMT quantification")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("psms")
                .long("psms")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to PSM identifications (JSON). Overrides the configuration file.")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("protein_groups")
                .long("protein-groups")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to protein groups (JSON). Overrides the configuration file.")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("spectra")
                .long("spectra")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to centroided spectra (JSON). Without spectra, evidence is \
                     assembled but not quantified.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("database")
                .short('d')
                .long("database")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to the protein database (JSON). Overrides the configuration file.")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path where the evidence graph will be written")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_parser(value_parser!(u16).range(1..))
                .help("Number of worker threads (default = # of CPUs)")
                .value_hint(ValueHint::Other),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let threads = matches
        .get_one::<u16>("threads")
        .copied()
        .map(usize::from)
        .unwrap_or_else(num_cpus::get);

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;
    log::debug!("using {} worker threads", threads);

    let input = Input::from_arguments(matches)?;
    let runner = input.build().and_then(Runner::new)?;
    runner.run()
}
