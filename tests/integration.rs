// tests/integration.rs
// End-to-end scenarios: encrypt a known plaintext, brute-force the key
// space, and check the user-visible report.

use descrack::driver::{self, DriverConfig, Engine, Mode, WorkerState};
use descrack::partition::KeyRange;
use descrack::session::{self, SessionConfig};
use descrack::text::normalize;
use descrack::{BlockCipher, CrackError, DesCipher, SearchOutcome};

const PLAINTEXT: &str = "the quick brown fox";

fn make_ciphertext(key: u64) -> Vec<u8> {
    let mut buf = descrack::text::pad_blocks(PLAINTEXT);
    DesCipher.encrypt(key, &mut buf).unwrap();
    buf
}

fn session(key: u64, phrase: &str, driver: DriverConfig) -> SessionConfig {
    SessionConfig {
        plaintext: PLAINTEXT.to_string(),
        phrase: phrase.to_string(),
        key,
        driver,
    }
}

/// Scenario A: the key sits in the searched space and the phrase occurs
/// in the plaintext; the run reports the key and the decrypted text.
#[test]
fn scenario_a_key_found_with_decrypted_text() {
    let cfg = session(
        123_456,
        "the",
        DriverConfig {
            workers: 4,
            space: KeyRange::new(0, 1 << 17),
            ..DriverConfig::default()
        },
    );

    let report = session::run(&cfg).unwrap();
    let found = report.found.expect("key must be found");
    assert_eq!(found.key, 123_456);
    assert!(found.decrypted.contains("the"));
    assert_eq!(found.decrypted, PLAINTEXT);
}

/// Scenario B: the key lies outside one worker's share. That worker
/// exhausts its own range without a find while the run as a whole still
/// reports the key.
#[test]
fn scenario_b_found_by_a_different_worker() {
    let key = 123_456; // inside the last quarter of [0, 2^17)
    let cfg = session(
        key,
        "quick",
        DriverConfig {
            workers: 4,
            space: KeyRange::new(0, 1 << 17),
            ..DriverConfig::default()
        },
    );

    let report = session::run(&cfg).unwrap();
    assert_eq!(report.found.unwrap().key, key);

    // Verified at the driver level: the first worker's share is
    // [0, 2^15), which cannot contain the key.
    let ciphertext = make_ciphertext(key);
    let outcome = driver::run(&DesCipher, &ciphertext, b"quick", &cfg.driver);
    assert_eq!(outcome.found, Some(key));
    assert_eq!(outcome.workers[0].found, None);
}

/// Scenario C: the phrase occurs in no achievable decryption; the run
/// exhausts the (reduced) space and reports not-found.
#[test]
fn scenario_c_absent_phrase_reports_not_found() {
    let cfg = session(
        123,
        "phrase that no eight-byte-block decryption will ever contain",
        DriverConfig {
            workers: 4,
            space: KeyRange::new(0, 1 << 14),
            ..DriverConfig::default()
        },
    );

    let report = session::run(&cfg).unwrap();
    assert!(report.found.is_none());
    assert_eq!(report.keys_tried, 1 << 14);
}

/// The outcome is invariant across distribution modes and engines.
#[test]
fn all_mode_engine_combinations_agree() {
    let key = 50_000;
    for mode in [Mode::Static, Mode::Dynamic] {
        for engine in [Engine::Scan, Engine::Team, Engine::Pipeline] {
            let cfg = session(
                key,
                "brown",
                DriverConfig {
                    workers: 3,
                    mode,
                    engine,
                    space: KeyRange::new(0, 1 << 16),
                    ..DriverConfig::default()
                },
            );
            let report = session::run(&cfg).unwrap();
            assert_eq!(
                report.found.map(|f| f.key),
                Some(key),
                "mode {mode:?}, engine {engine:?}"
            );
        }
    }
}

/// Dynamic mode keeps every worker busy until the reservoir drains, then
/// parks them all in the idle state on a no-match run.
#[test]
fn dynamic_no_match_run_parks_workers_idle() {
    let cfg = session(
        123,
        "absent phrase",
        DriverConfig {
            workers: 4,
            mode: Mode::Dynamic,
            space: KeyRange::new(0, 1 << 15),
            ..DriverConfig::default()
        },
    );

    let ciphertext = make_ciphertext(123);
    let outcome = driver::run(&DesCipher, &ciphertext, b"absent phrase", &cfg.driver);

    assert_eq!(outcome.found, None);
    assert_eq!(outcome.keys_tried, 1 << 15);
    for worker in &outcome.workers {
        assert_eq!(worker.state, WorkerState::Idle);
    }
}

/// Normalization feeds the session the same flat strings the original
/// files would produce.
#[test]
fn normalized_multiline_inputs_search_end_to_end() {
    let plaintext = normalize("the quick\n\n  brown fox  \n");
    let phrase = normalize("\nquick brown\n");
    assert_eq!(plaintext, PLAINTEXT);
    assert_eq!(phrase, "quick brown");

    let cfg = SessionConfig {
        plaintext,
        phrase,
        key: 4_242,
        driver: DriverConfig {
            workers: 2,
            space: KeyRange::new(0, 1 << 13),
            ..DriverConfig::default()
        },
    };
    let report = session::run(&cfg).unwrap();
    assert_eq!(report.found.unwrap().key, 4_242);
}

/// Setup failures abort before any search begins.
#[test]
fn setup_errors_are_fatal() {
    let weak = session(0, "the", DriverConfig::default());
    assert!(matches!(session::run(&weak), Err(CrackError::WeakKey(0))));

    let out_of_range = session(1 << 56, "the", DriverConfig::default());
    assert!(matches!(
        session::run(&out_of_range),
        Err(CrackError::KeyOutOfRange(_))
    ));

    let mut empty = session(123, "the", DriverConfig::default());
    empty.phrase.clear();
    assert!(matches!(
        session::run(&empty),
        Err(CrackError::EmptyPhrase)
    ));
}

/// The elapsed measurement is bounded by the barriers around the search,
/// never zero for real work.
#[test]
fn report_carries_a_plausible_elapsed_time() {
    let cfg = session(
        9_000,
        "fox",
        DriverConfig {
            workers: 2,
            space: KeyRange::new(0, 1 << 14),
            ..DriverConfig::default()
        },
    );
    let report = session::run(&cfg).unwrap();
    assert!(report.elapsed.as_nanos() > 0);
}

/// A ciphertext manufactured under one key is never "found" under a
/// space that excludes it, even when the phrase is common.
#[test]
fn key_outside_space_is_not_found() {
    let ciphertext = make_ciphertext(200_000);

    let cfg = DriverConfig {
        workers: 2,
        space: KeyRange::new(0, 1 << 16), // 200_000 > 2^16
        ..DriverConfig::default()
    };
    let outcome = driver::run(&DesCipher, &ciphertext, b"the", &cfg);
    assert_eq!(outcome.found, None);
}

/// Duplicate-tolerant reporting: the sequential scanner reports the
/// first match in ascending order.
#[test]
fn sequential_scan_reports_lowest_matching_key_first() {
    use descrack::search::{NeverStop, RangeScanner};

    let ciphertext = make_ciphertext(7_777);

    let scanner = RangeScanner::new(&DesCipher, &ciphertext, b"quick");
    let outcome = scanner.scan(KeyRange::new(0, 1 << 13), &mut NeverStop);
    assert_eq!(outcome, SearchOutcome::Found(7_777));
}
