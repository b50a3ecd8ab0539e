/*!
 * Partitioning of units across workers and batching inside a partition.
 *
 * Partitions are contiguous and deterministic: the same input and worker count
 * always produce the same ranges. Batches are index ranges over a partition and
 * are computed lazily, so every worker iterates its own batches independently.
 */

use std::ops::Range;

use crate::unit_processor::TranslationUnit;

/// Contiguous slice of units owned by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Worker that owns this partition (0-based)
    pub thread_id: usize,

    /// Index of the first unit in the full collection
    pub offset: usize,

    /// Units in input order
    pub units: Vec<TranslationUnit>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Input line numbers of the first and last unit
    pub fn line_range(&self) -> Option<(usize, usize)> {
        match (self.units.first(), self.units.last()) {
            (Some(first), Some(last)) => Some((first.line, last.line)),
            _ => None,
        }
    }

    /// Lazy batch ranges over this partition's units
    pub fn batches(&self, batch_size: usize) -> BatchRanges {
        BatchRanges::new(self.units.len(), batch_size)
    }
}

/// Split `len` items into exactly `workers` contiguous ranges of `ceil(len / workers)`
/// items; trailing ranges may be shorter or empty
pub fn partition_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let chunk = len.div_ceil(workers);
    (0..workers)
        .map(|i| {
            let start = (i * chunk).min(len);
            let end = (start + chunk).min(len);
            start..end
        })
        .collect()
}

/// Copy `units` into one partition per worker
pub fn partition(units: &[TranslationUnit], workers: usize) -> Vec<Partition> {
    partition_ranges(units.len(), workers)
        .into_iter()
        .enumerate()
        .map(|(thread_id, range)| Partition {
            thread_id,
            offset: range.start,
            units: units[range].to_vec(),
        })
        .collect()
}

/// Iterator over consecutive batch ranges of at most `size` items
#[derive(Debug, Clone)]
pub struct BatchRanges {
    len: usize,
    size: usize,
    next: usize,
}

impl BatchRanges {
    pub fn new(len: usize, size: usize) -> Self {
        Self {
            len,
            size: size.max(1),
            next: 0,
        }
    }

    /// Number of batches in total
    pub fn count_total(&self) -> usize {
        self.len.div_ceil(self.size)
    }
}

impl Iterator for BatchRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let start = self.next;
        let end = (start + self.size).min(self.len);
        self.next = end;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.len - self.next.min(self.len)).div_ceil(self.size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchRanges {}
