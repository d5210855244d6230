pub mod assemble;
pub mod database;
pub mod evidence;
pub mod identification;
pub mod inference;
pub mod mass;
pub mod modification;
pub mod normalize;
pub mod pipeline;
pub mod purity;
pub mod rollup;
pub mod spectrum;
pub mod tmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot locate protein database records; protein metadata is required for assembly")]
    MissingDatabase,
    #[error("no PSMs or ions available to compute spectral counts")]
    EmptyEvidence,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}
