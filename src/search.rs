//! Range testing: decrypt-and-match over a contiguous slice of keys
//!
//! The scanner tries every key of a range in ascending order, which makes
//! the result deterministic when exactly one key matches. A `StopProbe`
//! is polled every `poll_stride` keys so that a peer's find stops the
//! scan within one stride instead of after the full remaining range.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::cipher::BlockCipher;
use crate::partition::KeyRange;
use crate::text::candidate_text;

/// Keys scanned between two stop-probe polls.
pub const DEFAULT_POLL_STRIDE: u64 = 4096;

/// Result of scanning one key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(u64),
    NotFound,
}

/// Write-once slot for the globally found key.
///
/// The first `try_set` wins; later calls are discarded under the same
/// lock, so two workers confirming a match concurrently still agree on a
/// single value for the rest of the run. `is_set` is a lock-free fast
/// path for the hot polling loops.
#[derive(Debug, Default)]
pub struct FoundSlot {
    set: AtomicBool,
    key: Mutex<Option<u64>>,
}

impl FoundSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a found key. Returns false if a key was already recorded.
    pub fn try_set(&self, key: u64) -> bool {
        let mut guard = self.key.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(key);
        self.set.store(true, Ordering::Release);
        true
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    pub fn get(&self) -> Option<u64> {
        if !self.is_set() {
            return None;
        }
        *self.key.lock()
    }
}

/// Periodic termination check polled by the scanners.
///
/// Implementations must be cheap and non-blocking; the probe sits between
/// search throughput and early-exit latency.
pub trait StopProbe {
    fn should_stop(&mut self) -> bool;
}

/// Probe that never fires, for standalone scans.
pub struct NeverStop;

impl StopProbe for NeverStop {
    fn should_stop(&mut self) -> bool {
        false
    }
}

impl StopProbe for &FoundSlot {
    fn should_stop(&mut self) -> bool {
        self.is_set()
    }
}

/// C `strstr` semantics over a decrypted candidate buffer.
///
/// The candidate ends at its first NUL byte; an empty candidate never
/// matches.
pub fn contains_phrase(candidate: &[u8], phrase: &[u8]) -> bool {
    let text = candidate_text(candidate);
    if text.is_empty() {
        return false;
    }
    if phrase.is_empty() {
        return true;
    }
    text.len() >= phrase.len() && text.windows(phrase.len()).any(|w| w == phrase)
}

/// Sequential decrypt-and-match scanner for one worker.
///
/// Ciphertext and phrase are read-only after setup and shared without
/// locking; the only mutable state is the trial counter.
pub struct RangeScanner<'a, C: BlockCipher + ?Sized> {
    cipher: &'a C,
    ciphertext: &'a [u8],
    phrase: &'a [u8],
    poll_stride: u64,
    keys_tried: AtomicU64,
}

impl<'a, C: BlockCipher + ?Sized> RangeScanner<'a, C> {
    pub fn new(cipher: &'a C, ciphertext: &'a [u8], phrase: &'a [u8]) -> Self {
        Self {
            cipher,
            ciphertext,
            phrase,
            poll_stride: DEFAULT_POLL_STRIDE,
            keys_tried: AtomicU64::new(0),
        }
    }

    pub fn with_poll_stride(mut self, stride: u64) -> Self {
        self.poll_stride = stride.max(1);
        self
    }

    /// Total keys tried across all scans by this scanner.
    pub fn keys_tried(&self) -> u64 {
        self.keys_tried.load(Ordering::Relaxed)
    }

    /// Decrypt one candidate and test it.
    ///
    /// A key the cipher rejects (weak key schedule) is a silent
    /// non-match; the search space necessarily contains such keys.
    fn try_key(&self, key: u64, scratch: &mut [u8]) -> bool {
        match self.cipher.decrypt(key, self.ciphertext, scratch) {
            Ok(()) => contains_phrase(scratch, self.phrase),
            Err(_) => false,
        }
    }

    /// Scan `range` in ascending key order, returning the first match.
    ///
    /// Polls `probe` every `poll_stride` keys; once the probe fires the
    /// scan returns `NotFound` without touching the rest of the range.
    pub fn scan(&self, range: KeyRange, probe: &mut dyn StopProbe) -> SearchOutcome {
        let mut scratch = vec![0u8; self.ciphertext.len()];
        let mut key = range.start;

        while key < range.end {
            let stride_end = range.end.min(key + self.poll_stride);
            while key < stride_end {
                self.keys_tried.fetch_add(1, Ordering::Relaxed);
                if self.try_key(key, &mut scratch) {
                    return SearchOutcome::Found(key);
                }
                key += 1;
            }
            if probe.should_stop() {
                return SearchOutcome::NotFound;
            }
        }
        SearchOutcome::NotFound
    }

    /// Batched variant: decrypt `batch` adjacent keys, then test them in
    /// key order.
    ///
    /// Throughput optimization only. Batch boundaries never skip keys and
    /// the reported key is the same one `scan` would report.
    pub fn scan_batched(
        &self,
        range: KeyRange,
        batch: usize,
        probe: &mut dyn StopProbe,
    ) -> SearchOutcome {
        let batch = batch.max(1);
        let len = self.ciphertext.len();
        let mut scratch = vec![0u8; len * batch];
        let mut decrypted = vec![false; batch];
        let mut key = range.start;
        let mut since_poll = 0u64;

        while key < range.end {
            let n = batch.min((range.end - key) as usize);
            for i in 0..n {
                let slot = &mut scratch[i * len..(i + 1) * len];
                decrypted[i] = self
                    .cipher
                    .decrypt(key + i as u64, self.ciphertext, slot)
                    .is_ok();
            }
            self.keys_tried.fetch_add(n as u64, Ordering::Relaxed);

            for i in 0..n {
                let slot = &scratch[i * len..(i + 1) * len];
                if decrypted[i] && contains_phrase(slot, self.phrase) {
                    return SearchOutcome::Found(key + i as u64);
                }
            }

            key += n as u64;
            since_poll += n as u64;
            if since_poll >= self.poll_stride {
                since_poll = 0;
                if probe.should_stop() {
                    return SearchOutcome::NotFound;
                }
            }
        }
        SearchOutcome::NotFound
    }

    /// Thread-team variant: split `range` into sub-chunks scanned by the
    /// rayon pool, with a shared early-exit flag.
    ///
    /// Every thread polls `found` at stride boundaries and bails as soon
    /// as any thread (or a peer, through the shared slot) has a key. The
    /// lowest matching key is reported so the outcome matches `scan` even
    /// if the space held duplicates.
    pub fn scan_team(&self, range: KeyRange, chunk: u64, found: &FoundSlot) -> SearchOutcome {
        let chunk = chunk.max(1);
        let n_chunks = (range.len() + chunk - 1) / chunk;

        let hit = AtomicU64::new(u64::MAX);
        (0..n_chunks).into_par_iter().for_each(|i| {
            if hit.load(Ordering::Acquire) != u64::MAX || found.is_set() {
                return;
            }
            let start = range.start + i * chunk;
            let end = range.end.min(start + chunk);
            let mut scratch = vec![0u8; self.ciphertext.len()];
            let mut key = start;
            while key < end {
                let stride_end = end.min(key + self.poll_stride);
                while key < stride_end {
                    self.keys_tried.fetch_add(1, Ordering::Relaxed);
                    if self.try_key(key, &mut scratch) {
                        hit.fetch_min(key, Ordering::AcqRel);
                        return;
                    }
                    key += 1;
                }
                if hit.load(Ordering::Acquire) != u64::MAX || found.is_set() {
                    return;
                }
            }
        });

        match hit.load(Ordering::Acquire) {
            u64::MAX => SearchOutcome::NotFound,
            key => SearchOutcome::Found(key),
        }
    }
}
