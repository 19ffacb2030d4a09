use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use wrenvm::config::ConfigFile;
use wrenvm::{Configuration, ErrorKind, GcStats, InterpretResult, Vm};

/// Exit codes follow the BSD sysexits convention used by wren_test.
const EXIT_COMPILE_ERROR: u8 = 65;
const EXIT_NO_INPUT: u8 = 66;
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum StatsFormatArg {
    #[default]
    Human,
    Json,
}

#[derive(Parser)]
#[command(name = "wrenvm")]
#[command(about = "An embeddable scripting VM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script file
    Run {
        /// The script to run
        file: PathBuf,

        /// Heap settings in TOML
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print GC statistics to stderr after the run (human or json format)
        #[arg(long, value_enum, require_equals = true, num_args = 0..=1, default_missing_value = "human")]
        gc_stats: Option<StatsFormatArg>,

        /// Dump bytecode to stderr before running
        #[arg(long)]
        dump_bytecode: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            config,
            gc_stats,
            dump_bytecode,
        } => run_file(&file, config.as_deref(), gc_stats, dump_bytecode),
    }
}

fn run_file(
    path: &Path,
    config_path: Option<&Path>,
    gc_stats: Option<StatsFormatArg>,
    dump_bytecode: bool,
) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", path.display(), e);
            return ExitCode::from(EXIT_NO_INPUT);
        }
    };

    let mut config = Configuration {
        write_fn: Some(write_stdout),
        error_fn: Some(write_error),
        ..Default::default()
    };
    if let Some(config_path) = config_path {
        match ConfigFile::load(config_path) {
            Ok(file) => config = file.apply(config),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let mut vm = match Vm::new(config) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if dump_bytecode {
        match vm.disassemble(&source) {
            Ok(text) => eprint!("{}", text),
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::from(EXIT_COMPILE_ERROR);
            }
        }
    }

    let module = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    let result = vm.interpret(&module, &source);
    let _ = std::io::stdout().flush();

    if let Some(format) = gc_stats {
        print_gc_stats(&vm, format);
    }

    match result {
        InterpretResult::Success => ExitCode::SUCCESS,
        InterpretResult::CompileError => ExitCode::from(EXIT_COMPILE_ERROR),
        InterpretResult::RuntimeError => ExitCode::from(EXIT_RUNTIME_ERROR),
    }
}

fn write_stdout(text: &str) {
    print!("{}", text);
}

fn write_error(kind: ErrorKind, module: &str, line: usize, message: &str) {
    match kind {
        ErrorKind::Compile => eprintln!("[{} line {}] {}", module, line, message),
        ErrorKind::Runtime => eprintln!("{}", message),
        ErrorKind::StackTrace => eprintln!("[{} line {}] in {}", module, line, message),
    }
}

fn print_gc_stats(vm: &Vm, format: StatsFormatArg) {
    let stats: &GcStats = vm.gc_stats();
    match format {
        StatsFormatArg::Human => {
            eprintln!("gc cycles:      {}", stats.cycles);
            eprintln!("total pause:    {}us", stats.total_pause_us);
            eprintln!("max pause:      {}us", stats.max_pause_us);
            eprintln!("bytes freed:    {}", stats.bytes_freed);
            eprintln!("objects freed:  {}", stats.objects_freed);
            eprintln!("bytes live:     {}", vm.bytes_allocated());
            eprintln!("next gc at:     {}", vm.next_gc());
        }
        StatsFormatArg::Json => {
            let report = serde_json::json!({
                "gc": stats,
                "bytes_allocated": vm.bytes_allocated(),
                "next_gc": vm.next_gc(),
                "objects": vm.object_count(),
            });
            eprintln!("{}", report);
        }
    }
}
