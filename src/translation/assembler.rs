use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use crate::file_utils::FileManager;
use crate::unit_processor::UnitCollection;

use super::partition::Partition;

// @module: Merging of worker partitions and writing of the output file

/// Put returned partitions back into `base`.
///
/// Each partition overwrites the slots starting at its offset. A partition that
/// never came back leaves the base units, i.e. the source text, in place.
pub fn merge_partitions<I>(base: &UnitCollection, partitions: I) -> UnitCollection
where
    I: IntoIterator<Item = Partition>,
{
    let mut merged = base.clone();
    for partition in partitions {
        let offset = partition.offset;
        debug!("Merging partition {} ({} units at {})", partition.thread_id, partition.len(), offset);
        for (slot, unit) in merged.units.iter_mut().skip(offset).zip(partition.units) {
            *slot = unit;
        }
    }
    merged
}

/// Render the collection in the line protocol: header, units (translated text,
/// source text when untranslated) and passthrough lines in input order
pub fn render(collection: &UnitCollection) -> String {
    let mut content = collection.output_lines().join("\n");
    if collection.trailing_newline && !collection.layout.is_empty() {
        content.push('\n');
    }
    content
}

/// Atomically replace `path` with the rendered collection
pub fn write_output<P: AsRef<Path>>(path: P, collection: &UnitCollection) -> Result<()> {
    let path = path.as_ref();
    FileManager::write_atomic(path, &render(collection))
        .with_context(|| format!("Failed to write output: {}", path.display()))
}
