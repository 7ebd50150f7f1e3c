//! Command-line entry point for the order catalog.
//!
//! Each run performs a single `init`, `invoke` or `query` request against the
//! configured storage backend and prints the returned payload to stdout.
//! Logs go to stderr.

use clap::{Parser, Subcommand};
use order_config::Config;
use order_core::{Dispatcher, OrderError};
use order_storage::{get_all_implementations, StorageFactory, StorageInterface};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Command-line arguments for the order catalog.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Reset the order index to empty
	Init {
		#[arg(default_value = "init")]
		nonce: String,
	},
	/// Run a mutating function, e.g. `createOrder '<order json>'`
	Invoke {
		function: String,
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		args: Vec<String>,
	},
	/// Run a read-only function, e.g. `read OrderKeys`
	Query {
		function: String,
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		args: Vec<String>,
	},
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = match Config::from_file(&args.config).await {
		Ok(config) => config,
		Err(e) => {
			tracing::error!("Failed to load configuration {:?}: {}", args.config, e);
			return ExitCode::FAILURE;
		},
	};
	tracing::debug!("Loaded configuration [{}]", config.service.id);

	let storage = match build_storage(&config) {
		Ok(storage) => storage,
		Err(e) => {
			tracing::error!("Failed to create storage: {}", e);
			return ExitCode::FAILURE;
		},
	};

	let dispatcher = Dispatcher::new(storage);
	match run(&dispatcher, args.command).await {
		Ok(payload) => {
			if !payload.is_empty() {
				let mut stdout = std::io::stdout().lock();
				if let Err(e) = stdout.write_all(&payload).and_then(|_| writeln!(stdout)) {
					tracing::error!("Failed to write output: {}", e);
					return ExitCode::FAILURE;
				}
			}
			ExitCode::SUCCESS
		},
		Err(e) => {
			tracing::error!(kind = e.kind(), retryable = e.is_retryable(), "{}", e);
			eprintln!("Error: {}", e);
			ExitCode::FAILURE
		},
	}
}

/// Builds the primary storage backend named in the configuration.
fn build_storage(config: &Config) -> Result<Arc<dyn StorageInterface>, String> {
	let factories: HashMap<&'static str, StorageFactory> =
		get_all_implementations().into_iter().collect();

	let name = config.storage.primary.as_str();
	let factory = factories
		.get(name)
		.ok_or_else(|| format!("Unknown storage implementation '{}'", name))?;
	let table = config
		.storage
		.primary_config()
		.ok_or_else(|| format!("No configuration for storage '{}'", name))?;

	let backend = factory(table).map_err(|e| e.to_string())?;
	tracing::debug!("Using {} storage", name);
	Ok(Arc::from(backend))
}

async fn run(dispatcher: &Dispatcher, command: Command) -> Result<Vec<u8>, OrderError> {
	match command {
		Command::Init { nonce } => dispatcher.init(&[nonce]).await,
		Command::Invoke { function, args } => dispatcher.invoke(&function, &args).await,
		Command::Query { function, args } => dispatcher.query(&function, &args).await,
	}
}
