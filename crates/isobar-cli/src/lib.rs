pub mod input;
pub mod runner;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Read and deserialize a JSON document from a local path
pub fn read_json<S, T>(path: S) -> anyhow::Result<T>
where
    S: AsRef<str>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open `{path}`"))?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| format!("Failed to parse JSON in `{path}`"))
}
