//! wasigate command-line interface.
//!
//! Two ways to drive the bridge:
//!
//! - `serve` - run the HTTP gateway, executing the module once per request
//! - `run` - execute the module once locally and print its stdout
//!
//! # Examples
//!
//! ```bash
//! # Serve php.wasm on the default address
//! wasigate serve --module php.wasm --docroot ./www
//!
//! # One-shot run with explicit arguments
//! wasigate run php.wasm --arg cli-args.php --env APP_ENV=dev
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wasigate_core::{GatewayConfig, ModuleId};
use wasigate_core::invocation::InvocationEnv;
use wasigate_runtime::{Executor, ModuleLoader, RuntimeLimits};

/// wasigate - serve WASI command modules over HTTP.
///
/// Bridges HTTP requests to single executions of a prepared WebAssembly
/// module (for example a PHP interpreter compiled for WASI), projecting
/// the request into CGI-style environment variables and returning the
/// module's stdout as the response body.
#[derive(Parser, Debug)]
#[command(name = "wasigate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    ///
    /// Flags override values loaded from the configuration file; both
    /// override the built-in defaults.
    Serve {
        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path of the module image to execute per request
        #[arg(short, long)]
        module: Option<PathBuf>,

        /// Address to listen on (e.g. 127.0.0.1:8080)
        #[arg(short, long)]
        addr: Option<String>,

        /// Host directory exposed to the guest at /
        #[arg(short, long)]
        docroot: Option<PathBuf>,

        /// Entry file name passed as the module's second argument
        #[arg(short, long)]
        entry: Option<String>,

        /// Wall-clock limit per execution, in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Execute the module once and print its captured stdout.
    Run {
        /// Path of the module image
        module: PathBuf,

        /// Arguments passed to the module after its own name
        #[arg(short, long = "arg", num_args = 1)]
        args: Vec<String>,

        /// Environment variables in KEY=VALUE format
        #[arg(short, long = "env", num_args = 1)]
        env: Vec<String>,

        /// Host directory exposed read/write to the guest at /
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Wall-clock limit in seconds
        #[arg(long, default_value_t = RuntimeLimits::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Guest memory ceiling in megabytes
        #[arg(long, default_value_t = RuntimeLimits::DEFAULT_MEMORY_LIMIT_MB)]
        memory_limit_mb: usize,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell for completion generation
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            config,
            module,
            addr,
            docroot,
            entry,
            timeout,
        } => {
            let mut gateway = match config {
                Some(path) => GatewayConfig::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => GatewayConfig::default(),
            };
            if let Some(module) = module {
                gateway.module_path = module;
            }
            if let Some(addr) = addr {
                gateway.listen_addr = addr;
            }
            if let Some(docroot) = docroot {
                gateway.docroot = docroot;
            }
            if let Some(entry) = entry {
                gateway.entry_file = entry;
            }
            if let Some(timeout) = timeout {
                gateway.timeout_secs = timeout;
            }
            wasigate_server::serve(gateway).await
        }

        Commands::Run {
            module,
            args,
            env,
            dir,
            timeout,
            memory_limit_mb,
        } => run_once(module, args, env, dir, timeout, memory_limit_mb).await,

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

/// One-shot local invocation: load, run, print stdout.
async fn run_once(
    module: PathBuf,
    args: Vec<String>,
    env: Vec<String>,
    dir: Option<PathBuf>,
    timeout: u64,
    memory_limit_mb: usize,
) -> Result<()> {
    let limits = RuntimeLimits::builder()
        .memory_limit_mb(memory_limit_mb)
        .execution_timeout(Duration::from_secs(timeout))
        .build();
    let executor = Executor::new(limits, 1)?;

    let loader = ModuleLoader::new(&module);
    let image = loader.read().await?;

    let module_name = module
        .file_name()
        .map_or_else(|| "module.wasm".to_string(), |n| n.to_string_lossy().into_owned());

    let mut builder = InvocationEnv::builder(ModuleId::new(module_name));
    for arg in args {
        builder = builder.arg(arg);
    }
    for pair in env {
        let (key, value) = split_env_pair(&pair)?;
        builder = builder.env(key, value);
    }
    if let Some(dir) = dir {
        builder = builder.mount_rw(dir, "/");
    }

    let output = executor.run(&image, &builder.build()).await?;

    std::io::stdout().write_all(output.stdout())?;
    if !output.stderr().is_empty() {
        std::io::stderr().write_all(output.stderr())?;
    }
    Ok(())
}

/// Splits `KEY=VALUE` into its parts.
fn split_env_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("invalid environment variable '{pair}', expected KEY=VALUE"),
    }
}

/// Sets up tracing to stderr with an env-filter.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["wasigate", "serve", "--module", "php.wasm"]);
        assert!(matches!(cli.command, Commands::Serve { .. }));
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from([
            "wasigate",
            "serve",
            "--module",
            "php.wasm",
            "--addr",
            "0.0.0.0:9000",
            "--entry",
            "app.php",
        ]);
        if let Commands::Serve {
            module,
            addr,
            entry,
            ..
        } = cli.command
        {
            assert_eq!(module, Some(PathBuf::from("php.wasm")));
            assert_eq!(addr, Some("0.0.0.0:9000".to_string()));
            assert_eq!(entry, Some("app.php".to_string()));
        } else {
            panic!("expected serve command");
        }
    }

    #[test]
    fn test_parse_run_with_args_and_env() {
        let cli = Cli::parse_from([
            "wasigate",
            "run",
            "php.wasm",
            "--arg=cli-args.php",
            "--arg=--verbose",
            "--env=APP_ENV=dev",
        ]);
        if let Commands::Run { module, args, env, .. } = cli.command {
            assert_eq!(module, PathBuf::from("php.wasm"));
            assert_eq!(args, vec!["cli-args.php", "--verbose"]);
            assert_eq!(env, vec!["APP_ENV=dev"]);
        } else {
            panic!("expected run command");
        }
    }

    #[test]
    fn test_verbose_flag_is_global() {
        let cli = Cli::parse_from(["wasigate", "--verbose", "run", "php.wasm"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_split_env_pair() {
        assert_eq!(split_env_pair("A=1").unwrap(), ("A", "1"));
        assert_eq!(split_env_pair("A=x=y").unwrap(), ("A", "x=y"));
        assert!(split_env_pair("no-equals").is_err());
        assert!(split_env_pair("=value").is_err());
    }
}
