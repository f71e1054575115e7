//! CLI tool for inspecting rawlog files.
//!
//! Displays the header and, on request, per-sensor statistics.
//!
//! # Usage
//!
//! ```bash
//! rawlog_info run.rawlog
//! rawlog_info --verbose run_located-GICP.rawlog
//! ```

use std::collections::BTreeMap;
use std::env;

use rig_fusion::RawlogReader;

fn main() {
    let args: Vec<String> = env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Config {
    path: String,
    verbose: bool,
    count_records: bool,
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut path = None;
    let mut verbose = false;
    let mut count_records = false;

    for arg in &args[1..] {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            "--count" | "-c" => count_records = true,
            "--help" | "-h" => return Err("Help requested".to_string()),
            a if !a.starts_with('-') => {
                if path.is_some() {
                    return Err("Multiple rawlog files specified".to_string());
                }
                path = Some(a.to_string());
            }
            _ => return Err(format!("Unknown argument: {}", arg)),
        }
    }

    let path = path.ok_or("Missing rawlog file argument")?;
    Ok(Config {
        path,
        verbose,
        count_records,
    })
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Usage: {} [OPTIONS] <RAWLOG_FILE>

Display information about a rawlog file.

OPTIONS:
    -v, --verbose   Show per-sensor breakdown and pose coverage
    -c, --count     Count actual records (reads entire file)
    -h, --help      Show this help message
"#,
        program
    );
}

#[derive(Default)]
struct SensorStats {
    records: u64,
    posed: u64,
    points: u64,
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let reader = RawlogReader::open(&config.path)?;
    let header = reader.header().clone();

    println!("Rawlog Information");
    println!("==================");
    println!("File: {}", config.path);
    println!();
    println!("Header Information:");
    println!("  Format version: {}", header.version);
    println!(
        "  Flags: 0x{:04x}{}",
        header.flags,
        if header.is_localized() {
            " (localized)"
        } else {
            ""
        }
    );
    println!(
        "  Start time: {} us ({:.3} s)",
        header.start_time_us,
        header.start_time_us as f64 / 1_000_000.0
    );
    println!(
        "  End time: {} us ({:.3} s)",
        header.end_time_us,
        header.end_time_us as f64 / 1_000_000.0
    );
    println!("  Duration: {:.3} seconds", header.duration_secs());
    println!("  Record count (header): {}", header.record_count);

    if config.count_records || config.verbose {
        let mut total = 0u64;
        let mut scans = 0u64;
        let mut sensors: BTreeMap<String, SensorStats> = BTreeMap::new();

        for record in reader {
            let record = record?;
            total += 1;
            if let Some(frame) = record.as_range() {
                let entry = sensors.entry(frame.sensor.clone()).or_default();
                entry.records += 1;
                entry.points += frame.cloud.valid_count() as u64;
                if frame.pose.is_some() {
                    entry.posed += 1;
                }
            } else {
                scans += 1;
            }
        }

        println!();
        println!("Record Statistics:");
        println!("  Total records: {}", total);
        println!(
            "  Planar scans: {} ({:.1}%)",
            scans,
            100.0 * scans as f64 / total.max(1) as f64
        );
        println!("  3D frames: {}", total - scans);

        if config.verbose {
            for (label, stats) in &sensors {
                println!(
                    "  {:<12} {:>6} frames, {:>6} posed, {:>8.0} points/frame",
                    label,
                    stats.records,
                    stats.posed,
                    stats.points as f64 / stats.records.max(1) as f64
                );
            }
        }
    }

    let file_size = std::fs::metadata(&config.path)?.len();
    println!();
    println!("File Size:");
    println!(
        "  {} bytes ({:.2} KB, {:.2} MB)",
        file_size,
        file_size as f64 / 1024.0,
        file_size as f64 / 1_048_576.0
    );
    if header.record_count > 0 {
        println!(
            "  Average per record: {:.1} bytes",
            file_size as f64 / header.record_count as f64
        );
    }

    Ok(())
}
