use std::num::NonZeroUsize ;
use std::sync::Arc ;
use anyhow::Context ;
use clap::Parser ;
use tracing_subscriber::EnvFilter ;

use agent_isolator::{ Engine, HostContext, Linker, Orchestrator, Scheduling, SharedScope, VERSION };
use agent_isolator::bootstrap ;
use agent_isolator::component::ComponentOpener ;

/// Starts every agent listed in a configuration file, each in its own isolation scope
#[derive( Parser, Debug )]
#[command( name = "agent-isolator", version, about, long_about = None )]
struct Cli {
	/// Path to the YAML configuration listing the agents
	config: String,

	/// Start agents concurrently on at most N threads instead of one after another
	#[arg( long, value_name = "N" )]
	concurrent: Option<NonZeroUsize>,
}

/// What the host hands to its agents.
#[derive( Debug )]
struct HostProcess {
	pid: u32,
	version: &'static str,
}

fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(| _ | EnvFilter::new( "info" ));
	tracing_subscriber::fmt()
		.with_env_filter( filter )
		.with_target( true )
		.with_thread_names( true )
		.init();
}

fn main() -> anyhow::Result<()> {

	init_tracing();
	let cli = Cli::parse();

	let engine = Engine::default();
	let linker = Linker::new( &engine );
	let opener = ComponentOpener::with_resource_tables( engine, linker );

	let scheduling = match cli.concurrent {
		Some( max_workers ) => Scheduling::Concurrent { max_workers },
		None => Scheduling::Sequential,
	};

	let orchestrator = Orchestrator::new( Arc::new( opener ), Arc::new( SharedScope::empty() ))
		.with_scheduling( scheduling );

	let process = HostProcess { pid: std::process::id(), version: VERSION };
	tracing::debug!( pid = process.pid, version = process.version, "host context created" );
	let host = HostContext::new( process );

	let active = bootstrap::attach( &cli.config, &host, &orchestrator )
		.with_context(|| format!( "failed to attach agents from {}", cli.config ))?;

	tracing::info!( agents = active.len(), "agents running, press Ctrl-C to exit" );

	// Modules keep running off the scopes held by `active`.
	loop { std::thread::park(); }

}
