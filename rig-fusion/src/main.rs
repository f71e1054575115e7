//! rig-localize - Offline pose fusion for multi-camera rigs
//!
//! Reads a recorded stream (planar scans plus 3D range frames), estimates
//! the 2D trajectory against a reference map, poses every 3D frame and
//! optionally refines the poses with pairwise 3D registration. The result
//! is written as a new stream next to the input.
//!
//! # Usage
//!
//! ```bash
//! # 2D trajectory only
//! rig-localize run.rawlog map.txt
//!
//! # With GICP refinement over an accumulated reference
//! rig-localize run.rawlog map.txt -enable_GICP3D -enable_memory
//!
//! # With a config file and explicit output
//! rig-localize run.rawlog map.txt -config rig.toml -o out.rawlog
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use rig_fusion::algorithms::matching::RefineMethod;
use rig_fusion::engine::MemoryMode;
use rig_fusion::io::rawlog::FLAG_LOCALIZED;
use rig_fusion::{
    FusionError, FusionPipeline, RawlogReader, RawlogWriter, RunConfig, TrajectoryLog,
    load_reference_map,
};

/// Config file picked up from the working directory when `-config` is absent.
const DEFAULT_CONFIG: &str = "rig-localize.toml";

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Default, PartialEq)]
struct Args {
    stream: PathBuf,
    reference_map: PathBuf,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    disable_icp2d: bool,
    enable_icp3d: bool,
    enable_gicp3d: bool,
    enable_memory: bool,
    enable_key_poses: bool,
    enable_overlapping: bool,
    enable_smoothing: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Run(Box<Args>),
    /// `-h` or missing positionals
    Usage,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut result = Args::default();
    let mut positionals: Vec<PathBuf> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Command::Usage),
            "-disable_ICP2D" => result.disable_icp2d = true,
            "-enable_ICP3D" => result.enable_icp3d = true,
            "-enable_GICP3D" => result.enable_gicp3d = true,
            "-enable_memory" => result.enable_memory = true,
            "-enable_keyPoses" => result.enable_key_poses = true,
            "-enable_overlapping" => result.enable_overlapping = true,
            "-enable_smoothing" => result.enable_smoothing = true,
            "-config" | "-o" => {
                let flag = args[i].clone();
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| format!("{} requires a file argument", flag))?;
                if flag == "-config" {
                    result.config_path = Some(PathBuf::from(value));
                } else {
                    result.output = Some(PathBuf::from(value));
                }
                i += 1;
            }
            arg if !arg.starts_with('-') => positionals.push(PathBuf::from(arg)),
            other => return Err(format!("Unknown argument: {}", other)),
        }
        i += 1;
    }

    if positionals.len() > 2 {
        return Err(format!("Unexpected argument: {}", positionals[2].display()));
    }
    let mut positionals = positionals.into_iter();
    let (Some(stream), Some(reference_map)) = (positionals.next(), positionals.next()) else {
        return Ok(Command::Usage);
    };
    result.stream = stream;
    result.reference_map = reference_map;
    Ok(Command::Run(Box::new(result)))
}

impl Args {
    /// Command-line switches override the configuration file.
    fn apply(&self, config: &mut RunConfig) {
        let modes = &mut config.modes;
        if self.disable_icp2d {
            modes.use_2d_guess = false;
        }
        if self.enable_gicp3d {
            if self.enable_icp3d {
                log::warn!("Both -enable_ICP3D and -enable_GICP3D given, using GICP");
            }
            modes.refine = RefineMethod::Gicp;
        } else if self.enable_icp3d {
            modes.refine = RefineMethod::Icp;
        }
        if self.enable_memory {
            modes.memory = MemoryMode::Accumulate;
        }
        if self.enable_key_poses {
            modes.use_key_poses = true;
        }
        if self.enable_overlapping {
            modes.use_overlap_filter = true;
        }
        if self.enable_smoothing {
            modes.smooth_clouds = true;
        }
        if let Some(output) = &self.output {
            config.output.path = Some(output.clone());
        }
    }
}

fn print_usage() {
    println!("rig-localize - Offline pose fusion for multi-camera rigs");
    println!();
    println!("USAGE:");
    println!("    rig-localize <STREAM> <REFERENCE_MAP> [OPTIONS]");
    println!();
    println!("ARGUMENTS:");
    println!("    <STREAM>            Recorded rawlog with scans and 3D frames");
    println!("    <REFERENCE_MAP>     2D reference map, one 'x y' point per line");
    println!();
    println!("OPTIONS:");
    println!("    -disable_ICP2D      Pose frames at their mounting, no 2D trajectory");
    println!("    -enable_ICP3D       Refine poses with point-to-point ICP");
    println!("    -enable_GICP3D      Refine poses with generalized ICP");
    println!("    -enable_memory      Accumulate the registration reference");
    println!("    -enable_keyPoses    Drop sets where any sensor did not move");
    println!("    -enable_overlapping Use only overlapping reference frames");
    println!("    -enable_smoothing   Bilateral smoothing of 3D frames");
    println!("    -config <FILE>      Configuration file (default: {})", DEFAULT_CONFIG);
    println!("    -o <FILE>           Output stream (default: <STREAM>_located*.rawlog)");
    println!("    -h                  Print help information");
}

// ============================================================================
// Run
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<RunConfig, FusionError> {
    match path {
        Some(path) => Ok(RunConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG).exists() => Ok(RunConfig::load(DEFAULT_CONFIG)?),
        None => Ok(RunConfig::default()),
    }
}

fn run(args: &Args) -> Result<(), FusionError> {
    let mut config = load_config(args.config_path.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    log::info!("rig-localize starting");
    log::info!("  Stream: {}", args.stream.display());
    log::info!("  Reference map: {}", args.reference_map.display());
    log::info!(
        "  2D guess: {}",
        if config.modes.use_2d_guess {
            "enabled"
        } else {
            "disabled"
        }
    );
    log::info!("  3D refinement: {}", config.modes.refine.description());
    log::info!("  Memory: {:?}", config.modes.memory);

    let map = load_reference_map(&args.reference_map)?;
    let reader = RawlogReader::open(&args.stream)?;
    log::info!(
        "Stream holds {} records over {:.1}s",
        reader.record_count(),
        reader.header().duration_secs()
    );

    let output_path = config.output_path_for(&args.stream);
    let mut writer = RawlogWriter::create(&output_path)?;

    let trajectory_log = if config.output.write_trajectory && config.modes.use_2d_guess {
        let path = &config.output.trajectory_log;
        let log = TrajectoryLog::create(path).map_err(|source| FusionError::Io {
            path: path.clone(),
            source,
        })?;
        Some(log)
    } else {
        None
    };

    let mut pipeline = FusionPipeline::new(&config);
    let output = pipeline.run(reader, map, trajectory_log)?;

    writer.set_flags(FLAG_LOCALIZED);
    for record in &output.records {
        writer.write_record(record)?;
    }
    let info = writer.finish()?;
    if let Some(log) = output.trajectory_log {
        let path = log.path().to_path_buf();
        log.finish()
            .map_err(|source| FusionError::Io { path, source })?;
    }

    output.stats.log_summary();
    log::info!(
        "Wrote {} records ({:.1} MB) to {}",
        info.record_count,
        info.file_size_bytes as f64 / 1_048_576.0,
        info.path.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args: Vec<String> = std::env::args().collect();
    let args = match parse_args(&args) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Usage) => {
            print_usage();
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
