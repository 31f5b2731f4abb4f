use std::process;

use clap::Parser;

use descrack::cli::{format_number, Args};
use descrack::driver::DriverConfig;
use descrack::partition::KeyRange;
use descrack::session::{self, SessionConfig};
use descrack::text::load_normalized;
use descrack::{CrackError, KEY_SPACE_BITS};

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("[✗] {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CrackError> {
    let plaintext = load_normalized(&args.plaintext)?;
    let phrase = load_normalized(&args.phrase)?;

    let workers = args.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });
    let space_bits = args.space_bits.clamp(1, KEY_SPACE_BITS);

    let cfg = SessionConfig {
        plaintext,
        phrase,
        key: args.key,
        driver: DriverConfig {
            workers,
            mode: args.mode.into(),
            engine: args.engine.into(),
            batch: args.batch.max(1),
            report_interval_secs: args.report_interval,
            space: KeyRange::new(0, 1 << space_bits),
            ..DriverConfig::default()
        },
    };

    println!("╔═══════════════════════════════════════════════════╗");
    println!("║   descrack  •  DES key-space brute-force search   ║");
    println!("╚═══════════════════════════════════════════════════╝");
    println!("Plaintext:     -{}-", cfg.plaintext);
    println!("Search phrase: -{}-", cfg.phrase);
    println!("Encryption key: {}", cfg.key);
    println!(
        "Workers: {} | mode: {:?} | engine: {:?} | space: 2^{} keys\n",
        workers, cfg.driver.mode, cfg.driver.engine, space_bits
    );

    let report = session::run(&cfg)?;

    match &report.found {
        Some(found) => {
            println!("[✓] Key found: {}", found.key);
            println!("    Decrypted text: -{}-", found.decrypted);
        }
        None => {
            println!("[✗] Key not found in the searched space.");
        }
    }
    let secs = report.elapsed.as_secs_f64();
    println!(
        "⚡ {} keys in {:.3}s ({:.2} M/s)",
        format_number(report.keys_tried),
        secs,
        report.keys_tried as f64 / secs.max(f64::EPSILON) / 1_000_000.0
    );

    Ok(())
}
