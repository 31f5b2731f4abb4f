//! Distributed driver: worker state machines, termination fan-out, and
//! the dynamic work coordinator
//!
//! Workers are threads standing in for distributed ranks; they share the
//! read-only ciphertext and phrase, and otherwise cooperate only through
//! explicit messages: point-to-point found-key notification and
//! request/grant traffic with the coordinator. The worker that confirms
//! a match notifies every peer and stops without waiting for
//! acknowledgement; everyone else polls its inbox non-blockingly at
//! stride and range boundaries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::cipher::{BlockCipher, KEY_SPACE_END};
use crate::cli::format_number;
use crate::partition::{static_partition, KeyRange, WorkReservoir};
use crate::pipeline::{Pipeline, DEFAULT_QUEUE_DEPTH};
use crate::search::{FoundSlot, RangeScanner, SearchOutcome, StopProbe, DEFAULT_POLL_STRIDE};

/// Work distribution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One contiguous equal range per worker, assigned at start.
    Static,
    /// Oversubscribed reservoir served on demand by the coordinator.
    Dynamic,
}

/// Range scanning strategy inside one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// Sequential scan (batched when `batch > 1`).
    Scan,
    /// Rayon thread team over sub-chunks of each range.
    Team,
    /// Three-stage generate/decrypt/compare pipeline.
    Pipeline,
}

/// Point-to-point notification that a peer confirmed a key.
#[derive(Debug, Clone, Copy)]
pub enum PeerMsg {
    FoundKey(u64),
}

/// Request for another slice of the key space.
#[derive(Debug, Clone, Copy)]
pub struct WorkRequest {
    pub worker: usize,
}

/// Per-worker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    AwaitingWork,
    Searching,
    RequestingMore,
    /// Own or peer match confirmed.
    Done,
    /// All assigned and reservoir work exhausted without a match.
    Idle,
}

#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub id: usize,
    pub state: WorkerState,
    pub keys_tried: u64,
    /// Key this worker discovered itself, if any.
    pub found: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub workers: usize,
    pub mode: Mode,
    pub engine: Engine,
    /// Adjacent keys decrypted per step of the sequential scan.
    pub batch: usize,
    /// Keys between two termination polls.
    pub poll_stride: u64,
    /// Sub-chunk size for the thread-team engine.
    pub team_chunk: u64,
    /// Queue depth for the pipeline engine.
    pub queue_depth: usize,
    /// Reservoir slices handed to each worker before the run (dynamic).
    pub initial_grants: usize,
    /// Progress report period; 0 disables reporting.
    pub report_interval_secs: u64,
    /// The key space to search.
    pub space: KeyRange,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            mode: Mode::Static,
            engine: Engine::Scan,
            batch: 1,
            poll_stride: DEFAULT_POLL_STRIDE,
            team_chunk: 4096,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            initial_grants: 2,
            report_interval_secs: 0,
            space: KeyRange::new(0, KEY_SPACE_END),
        }
    }
}

/// Result of one distributed run.
#[derive(Debug, Clone)]
pub struct DriverOutcome {
    /// The globally adopted key, identical on every worker that saw one.
    pub found: Option<u64>,
    /// Wall-clock time between the pre- and post-search barriers.
    pub elapsed: Duration,
    pub keys_tried: u64,
    pub workers: Vec<WorkerReport>,
}

/// Inbox probe: drains pending peer notifications, adopts the first key
/// into the shared slot, and reports whether scanning should stop.
struct PeerProbe<'a> {
    inbox: &'a Receiver<PeerMsg>,
    found: &'a FoundSlot,
}

impl StopProbe for PeerProbe<'_> {
    fn should_stop(&mut self) -> bool {
        while let Ok(PeerMsg::FoundKey(key)) = self.inbox.try_recv() {
            self.found.try_set(key);
        }
        self.found.is_set()
    }
}

struct WorkChannels {
    request_tx: Sender<WorkRequest>,
    grant_rx: Receiver<KeyRange>,
}

struct WorkerCtx<'a, C: BlockCipher + ?Sized> {
    id: usize,
    cipher: &'a C,
    ciphertext: &'a [u8],
    phrase: &'a [u8],
    cfg: &'a DriverConfig,
    found: &'a FoundSlot,
    total_tried: &'a AtomicU64,
    inbox: Receiver<PeerMsg>,
    peers: Vec<Sender<PeerMsg>>,
    work: Option<WorkChannels>,
    initial: Vec<KeyRange>,
    barrier: &'a Barrier,
}

fn run_worker<C: BlockCipher + ?Sized>(ctx: WorkerCtx<'_, C>) -> WorkerReport {
    let cfg = ctx.cfg;
    let scanner = RangeScanner::new(ctx.cipher, ctx.ciphertext, ctx.phrase)
        .with_poll_stride(cfg.poll_stride);

    let mut local = ctx.initial;
    let mut own_find = None;
    let mut keys_tried = 0u64;

    ctx.barrier.wait();

    // AwaitingWork -> Searching -> RequestingMore -> ... until a terminal
    // state; the loop value is the state the worker parks in.
    let state = loop {
        let mut probe = PeerProbe {
            inbox: &ctx.inbox,
            found: ctx.found,
        };

        // Range boundary: adopt a peer's key before touching new work.
        if probe.should_stop() {
            break WorkerState::Done;
        }

        let range = match local.pop() {
            Some(range) => range,
            None => match &ctx.work {
                Some(work) => {
                    if work
                        .request_tx
                        .send(WorkRequest { worker: ctx.id })
                        .is_err()
                    {
                        break WorkerState::Idle;
                    }
                    match work.grant_rx.recv() {
                        Ok(range) if !range.is_empty() => range,
                        // Empty sentinel or a gone coordinator: no more work.
                        _ => break WorkerState::Idle,
                    }
                }
                None => break WorkerState::Idle,
            },
        };
        if range.is_empty() {
            continue;
        }

        let before = scanner.keys_tried();
        let (outcome, scanned) = match cfg.engine {
            Engine::Scan if cfg.batch > 1 => {
                let outcome = scanner.scan_batched(range, cfg.batch, &mut probe);
                (outcome, scanner.keys_tried() - before)
            }
            Engine::Scan => {
                let outcome = scanner.scan(range, &mut probe);
                (outcome, scanner.keys_tried() - before)
            }
            Engine::Team => {
                let outcome = scanner.scan_team(range, cfg.team_chunk, ctx.found);
                (outcome, scanner.keys_tried() - before)
            }
            Engine::Pipeline => {
                let pipeline = Pipeline::new(ctx.cipher, ctx.ciphertext, ctx.phrase)
                    .with_queue_depth(cfg.queue_depth);
                let outcome = pipeline.scan(range, ctx.found);
                (outcome, pipeline.keys_tried())
            }
        };
        keys_tried += scanned;
        ctx.total_tried.fetch_add(scanned, Ordering::Relaxed);

        match outcome {
            SearchOutcome::Found(key) => {
                // The pipeline engine already claimed the slot itself;
                // the scan engines claim it here. Either way the finder
                // fans out and stops without waiting for anyone.
                ctx.found.try_set(key);
                own_find = Some(key);
                for peer in &ctx.peers {
                    let _ = peer.send(PeerMsg::FoundKey(key));
                }
                break WorkerState::Done;
            }
            SearchOutcome::NotFound => {
                if ctx.found.is_set() {
                    break WorkerState::Done;
                }
                // Range exhausted; loop back for more work.
            }
        }
    };

    ctx.barrier.wait();

    WorkerReport {
        id: ctx.id,
        state,
        keys_tried,
        found: own_find,
    }
}

/// FIFO request service over the reservoir.
///
/// Runs on its own thread rather than inside a searching worker's loop,
/// so a loaded worker never delays grants. Once a key is known the
/// service answers every further request with the empty sentinel.
fn run_coordinator(
    mut reservoir: WorkReservoir,
    request_rx: Receiver<WorkRequest>,
    grant_txs: Vec<Sender<KeyRange>>,
    found: &FoundSlot,
) {
    while let Ok(request) = request_rx.recv() {
        let grant = if found.is_set() {
            KeyRange::EMPTY
        } else {
            reservoir.take()
        };
        let _ = grant_txs[request.worker].send(grant);
    }
}

/// Run the full distributed search over `cfg.space`.
pub fn run<C: BlockCipher>(
    cipher: &C,
    ciphertext: &[u8],
    phrase: &[u8],
    cfg: &DriverConfig,
) -> DriverOutcome {
    let workers = cfg.workers.max(1);
    let found = FoundSlot::new();
    let total_tried = AtomicU64::new(0);
    let barrier = Barrier::new(workers + 1);

    // One inbox per worker for point-to-point found-key fan-out.
    let (peer_txs, peer_rxs): (Vec<Sender<PeerMsg>>, Vec<Receiver<PeerMsg>>) =
        (0..workers).map(|_| unbounded()).unzip();

    // Initial assignments, plus the reservoir for dynamic mode.
    let (mut initials, dynamic): (Vec<Vec<KeyRange>>, Option<WorkReservoir>) = match cfg.mode {
        Mode::Static => (
            static_partition(cfg.space, workers)
                .into_iter()
                .map(|range| vec![range])
                .collect(),
            None,
        ),
        Mode::Dynamic => {
            let mut reservoir = WorkReservoir::new(cfg.space, workers);
            let initials = (0..workers)
                .map(|_| reservoir.take_batch(cfg.initial_grants))
                .collect();
            (initials, Some(reservoir))
        }
    };

    let (elapsed, reports) = std::thread::scope(|s| {
        // Dynamic mode: request/grant plumbing plus the coordinator thread.
        let mut work_channels: Vec<Option<WorkChannels>> = Vec::with_capacity(workers);
        if let Some(reservoir) = dynamic {
            let (request_tx, request_rx) = unbounded::<WorkRequest>();
            let mut grant_txs = Vec::with_capacity(workers);
            for _ in 0..workers {
                let (grant_tx, grant_rx) = bounded::<KeyRange>(1);
                grant_txs.push(grant_tx);
                work_channels.push(Some(WorkChannels {
                    request_tx: request_tx.clone(),
                    grant_rx,
                }));
            }
            let found = &found;
            s.spawn(move || run_coordinator(reservoir, request_rx, grant_txs, found));
            // The workers hold the only remaining request senders; the
            // coordinator exits when the last one hangs up.
            drop(request_tx);
        } else {
            work_channels.resize_with(workers, || None);
        }

        let mut handles = Vec::with_capacity(workers);
        for (id, (inbox, work)) in peer_rxs.into_iter().zip(work_channels).enumerate() {
            let peers: Vec<Sender<PeerMsg>> = peer_txs
                .iter()
                .enumerate()
                .filter(|(peer_id, _)| *peer_id != id)
                .map(|(_, tx)| tx.clone())
                .collect();
            let ctx = WorkerCtx {
                id,
                cipher,
                ciphertext,
                phrase,
                cfg,
                found: &found,
                total_tried: &total_tried,
                inbox,
                peers,
                work,
                initial: std::mem::take(&mut initials[id]),
                barrier: &barrier,
            };
            handles.push(s.spawn(move || run_worker(ctx)));
        }

        // Progress monitor, disconnect-terminated.
        let (monitor_done_tx, monitor_done_rx) = bounded::<()>(0);
        if cfg.report_interval_secs > 0 {
            let interval = Duration::from_secs(cfg.report_interval_secs);
            let total_tried = &total_tried;
            s.spawn(move || {
                let started = Instant::now();
                while let Err(crossbeam_channel::RecvTimeoutError::Timeout) =
                    monitor_done_rx.recv_timeout(interval)
                {
                    let tried = total_tried.load(Ordering::Relaxed);
                    let secs = started.elapsed().as_secs_f64();
                    println!(
                        "⚡ {} keys | {:.2} M/s | elapsed {:.1}s",
                        format_number(tried),
                        tried as f64 / secs / 1_000_000.0,
                        secs
                    );
                }
            });
        }

        // Barriers bound the timed section on both sides.
        barrier.wait();
        let start = Instant::now();
        barrier.wait();
        let elapsed = start.elapsed();
        drop(monitor_done_tx);

        let reports: Vec<WorkerReport> = handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked"))
            .collect();
        (elapsed, reports)
    });

    DriverOutcome {
        found: found.get(),
        elapsed,
        keys_tried: total_tried.load(Ordering::Relaxed),
        workers: reports,
    }
}
