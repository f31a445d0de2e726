use std::path::{Path, PathBuf};

use args::WasmArg;
use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Result, bail};
use log::{debug, info};
use stackvm::{Config, ExecutionContext, Imports, Module, ModuleExt, validate};

use crate::args::to_wasm_args;
mod args;

/// stackvm CLI
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand)]
enum Command {
    /// run a wasm file
    Run {
        /// wasm (or wat) file to run
        file: PathBuf,

        /// exported function to invoke
        #[arg(short, long)]
        invoke: Option<String>,

        /// arguments to pass to the function, as `type:value`
        #[arg(short, long = "arg")]
        args: Vec<WasmArg>,

        /// skip strict validation before running
        #[arg(long)]
        no_validate: bool,
    },

    /// evaluate the stack effects of every function in a wasm file
    Check {
        /// wasm (or wat) file to check
        file: PathBuf,

        /// substitute expected types instead of failing
        #[arg(long)]
        lenient: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    pretty_env_logger::formatted_builder().filter_level(cli.log_level.into()).init();

    match cli.command {
        Command::Run { file, invoke, args, no_validate } => {
            debug!("args: {args:?}");
            let config = Config::new().with_validate_before_run(!no_validate);
            run(load(&file)?, config, invoke, args)
        }
        Command::Check { file, lenient } => check(&load(&file)?, lenient),
    }
}

fn load(path: &Path) -> Result<Module> {
    match path.extension().is_some_and(|ext| ext == "wat") {
        #[cfg(feature = "wat")]
        true => {
            let wasm = wat::parse_file(path)?;
            Ok(Module::parse_bytes(&wasm)?)
        }
        #[cfg(not(feature = "wat"))]
        true => bail!("wat support is not enabled in this build"),
        false => Ok(Module::parse_file(path)?),
    }
}

fn run(module: Module, config: Config, invoke: Option<String>, args: Vec<WasmArg>) -> Result<()> {
    let mut ctx = ExecutionContext::new(module, Imports::new(), config)?;

    if let Some(func) = invoke {
        match ctx.call(&func, &to_wasm_args(args))? {
            Some(value) => println!("{value:?}"),
            None => info!("{func} returned no value"),
        }
    }

    Ok(())
}

fn check(module: &Module, lenient: bool) -> Result<()> {
    let first = module.imported_func_count() as u32;
    let mut failed = false;

    for func in first..first + module.funcs.len() as u32 {
        let name = module.func_name(func).unwrap_or("<anonymous>");
        match validate(module, func, !lenient) {
            Ok(effects) => println!("func {func} ({name}): max stack height {}", effects.max_height),
            Err(err) => {
                println!("func {func} ({name}): {err}");
                failed = true;
            }
        }
    }

    if failed {
        bail!("validation failed");
    }
    Ok(())
}
