//! Three-stage local pipeline: generate → decrypt → compare
//!
//! The stages run on their own threads, connected by two bounded
//! channels, so key generation and comparison overlap the decrypt
//! latency. A stage blocked on an empty (or full) queue must wake as
//! soon as the found flag transitions, not only when data arrives; every
//! blocking hand-off is therefore a `select!` over the data channel and
//! a stop channel that disconnects the moment the compare stage confirms
//! a match.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, select};

use crate::cipher::BlockCipher;
use crate::partition::KeyRange;
use crate::search::{contains_phrase, FoundSlot, SearchOutcome};

/// In-flight items per hand-off queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

/// Pipelined scanner for one worker.
pub struct Pipeline<'a, C: BlockCipher + ?Sized> {
    cipher: &'a C,
    ciphertext: &'a [u8],
    phrase: &'a [u8],
    queue_depth: usize,
    keys_tried: AtomicU64,
}

impl<'a, C: BlockCipher + ?Sized> Pipeline<'a, C> {
    pub fn new(cipher: &'a C, ciphertext: &'a [u8], phrase: &'a [u8]) -> Self {
        Self {
            cipher,
            ciphertext,
            phrase,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            keys_tried: AtomicU64::new(0),
        }
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Keys decrypted across all scans by this pipeline.
    pub fn keys_tried(&self) -> u64 {
        self.keys_tried.load(Ordering::Relaxed)
    }

    /// Scan `range` with the three concurrent stages.
    ///
    /// The compare stage try-sets `found` exactly once on success; a hit
    /// that loses the race to a peer's key is discarded and reported as
    /// `NotFound`, matching the write-once contract of the slot. For a
    /// fixed range and ciphertext the outcome equals the sequential
    /// scanner's.
    pub fn scan(&self, range: KeyRange, found: &FoundSlot) -> SearchOutcome {
        let (key_tx, key_rx) = bounded::<u64>(self.queue_depth);
        let (cand_tx, cand_rx) = bounded::<(u64, Vec<u8>)>(self.queue_depth);
        // Never carries data; dropping the sender wakes every blocked stage.
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let hit = std::thread::scope(|s| {
            // Generate: successive keys of the range onto the key queue.
            let gen_stop = stop_rx.clone();
            s.spawn(move || {
                for key in range.start..range.end {
                    if found.is_set() {
                        break;
                    }
                    select! {
                        send(key_tx, key) -> res => {
                            if res.is_err() {
                                break;
                            }
                        }
                        recv(gen_stop) -> _ => break,
                    }
                }
                // key_tx drops here and unblocks the decrypt stage.
            });

            // Decrypt: key -> candidate buffer. Weak keys are skipped.
            let dec_stop = stop_rx.clone();
            s.spawn(move || loop {
                if found.is_set() {
                    break;
                }
                let key = select! {
                    recv(key_rx) -> msg => match msg {
                        Ok(key) => key,
                        Err(_) => break,
                    },
                    recv(dec_stop) -> _ => break,
                };

                let mut candidate = vec![0u8; self.ciphertext.len()];
                if self.cipher.decrypt(key, self.ciphertext, &mut candidate).is_err() {
                    continue;
                }
                self.keys_tried.fetch_add(1, Ordering::Relaxed);

                select! {
                    send(cand_tx, (key, candidate)) -> res => {
                        if res.is_err() {
                            break;
                        }
                    }
                    recv(dec_stop) -> _ => break,
                }
            });

            // Compare: substring match, first success wins the slot.
            let compare = s.spawn(move || {
                let mut hit = None;
                while let Ok((key, candidate)) = cand_rx.recv() {
                    if found.is_set() {
                        break;
                    }
                    if contains_phrase(&candidate, self.phrase) {
                        if found.try_set(key) {
                            hit = Some(key);
                        }
                        break;
                    }
                }
                drop(stop_tx);
                hit
            });

            compare.join().expect("compare stage panicked")
        });

        match hit {
            Some(key) => SearchOutcome::Found(key),
            None => SearchOutcome::NotFound,
        }
    }
}
