//! Key space partitioning
//!
//! Two policies: a static equal split assigned once at start, and a
//! reservoir of pre-sliced ranges for dynamic hand-out when workers go
//! idle. Both guarantee that the dispatched ranges cover the space
//! exactly, with no gaps and no overlaps.

use rand::Rng;

use crate::cipher::KEY_SPACE_END;

/// A contiguous sub-interval `[start, end)` of the key space.
///
/// Immutable once created and consumed by exactly one range scan. The
/// `start == end` sentinel means "no more work".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyRange {
    pub start: u64,
    pub end: u64,
    pub priority: f64,
}

impl KeyRange {
    /// Sentinel handed to a worker when the reservoir is drained.
    pub const EMPTY: KeyRange = KeyRange {
        start: 0,
        end: 0,
        priority: 0.0,
    };

    pub fn new(start: u64, end: u64) -> Self {
        Self::with_priority(start, end, 0.0)
    }

    pub fn with_priority(start: u64, end: u64, priority: f64) -> Self {
        debug_assert!(start <= end && end <= KEY_SPACE_END);
        Self {
            start,
            end,
            priority,
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `space` into `workers` contiguous equal ranges.
///
/// The last range absorbs the division remainder so the partition is
/// exact for any worker count. When the space is smaller than the worker
/// count, leading ranges come out empty and scan as an immediate
/// `NotFound`.
pub fn static_partition(space: KeyRange, workers: usize) -> Vec<KeyRange> {
    assert!(workers >= 1, "at least one worker is required");
    let per_worker = space.len() / workers as u64;

    (0..workers)
        .map(|i| {
            let start = space.start + per_worker * i as u64;
            let end = if i == workers - 1 {
                space.end
            } else {
                start + per_worker
            };
            KeyRange::new(start, end)
        })
        .collect()
}

/// Pool of unassigned ranges for dynamic load balancing.
///
/// The space is pre-sliced into many more ranges than workers so that a
/// fast worker can keep pulling fresh slices while slow ones are still
/// busy. Slices carry random priorities and are granted best-priority
/// first. The pool only ever shrinks; the key space is finite.
pub struct WorkReservoir {
    /// Sorted ascending by priority; grants pop from the back.
    slices: Vec<KeyRange>,
}

impl WorkReservoir {
    /// Slices per worker in the default pre-split.
    pub const OVERSUBSCRIPTION: usize = 10;

    pub fn new(space: KeyRange, workers: usize) -> Self {
        Self::with_slices(space, workers.max(1) * Self::OVERSUBSCRIPTION)
    }

    pub fn with_slices(space: KeyRange, slice_count: usize) -> Self {
        let slice_count = slice_count.max(1);
        let mut rng = rand::thread_rng();
        let per_slice = space.len() / slice_count as u64;

        // A space smaller than the slice count yields empty slices; they
        // never reach a worker, the empty range is the drained sentinel.
        let mut slices: Vec<KeyRange> = (0..slice_count)
            .map(|i| {
                let start = space.start + per_slice * i as u64;
                let end = if i == slice_count - 1 {
                    space.end
                } else {
                    start + per_slice
                };
                KeyRange::with_priority(start, end, rng.gen::<f64>())
            })
            .filter(|slice| !slice.is_empty())
            .collect();

        slices.sort_by(|a, b| a.priority.total_cmp(&b.priority));
        Self { slices }
    }

    /// Grant the highest-priority remaining slice, or the empty sentinel.
    pub fn take(&mut self) -> KeyRange {
        self.slices.pop().unwrap_or(KeyRange::EMPTY)
    }

    /// Grant up to `n` slices for a worker's initial batch.
    pub fn take_batch(&mut self, n: usize) -> Vec<KeyRange> {
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            let slice = self.take();
            if slice.is_empty() {
                break;
            }
            batch.push(slice);
        }
        batch
    }

    pub fn remaining(&self) -> usize {
        self.slices.len()
    }
}
