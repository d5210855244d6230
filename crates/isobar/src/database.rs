//! Protein database records used to enrich protein evidence with metadata

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseRecord {
    pub original_header: String,
    /// First word of the header, e.g. `sp|P02768|ALBU_HUMAN`
    pub part_header: String,
    pub id: String,
    pub entry_name: String,
    pub protein_name: String,
    pub description: String,
    pub gene_names: String,
    pub organism: String,
    pub sequence: String,
    pub protein_existence: String,
    pub is_decoy: bool,
}

#[derive(Default, Debug)]
pub struct ProteinDatabase {
    records: Vec<DatabaseRecord>,
    by_part_header: FnvHashMap<String, Vec<usize>>,
}

impl ProteinDatabase {
    pub fn new(records: Vec<DatabaseRecord>) -> Self {
        let mut by_part_header: FnvHashMap<String, Vec<usize>> = FnvHashMap::default();
        for (idx, record) in records.iter().enumerate() {
            by_part_header
                .entry(record.part_header.clone())
                .or_default()
                .push(idx);
        }
        ProteinDatabase {
            records,
            by_part_header,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Record for a protein name, restricted to the same target/decoy
    /// partition. Exact header-fragment matches are preferred, otherwise the
    /// first record whose full header contains `name` is returned
    pub fn lookup(&self, name: &str, decoy: bool) -> Option<&DatabaseRecord> {
        self.by_part_header
            .get(name)
            .and_then(|ixs| {
                ixs.iter()
                    .map(|&ix| &self.records[ix])
                    .find(|r| r.is_decoy == decoy)
            })
            .or_else(|| {
                self.records
                    .iter()
                    .find(|r| r.is_decoy == decoy && r.original_header.contains(name))
            })
    }

    /// Record keyed by exact header fragment, in either partition
    pub fn get(&self, part_header: &str) -> Option<&DatabaseRecord> {
        self.by_part_header
            .get(part_header)
            .and_then(|ixs| ixs.first())
            .map(|&ix| &self.records[ix])
    }
}
