//! Attaching to the host process.
//!
//! [`attach`] is the single entry point the host calls once at startup: it takes
//! the path to a configuration file, reads the module list from it and runs the
//! orchestrator over that list.

use std::path::PathBuf ;
use thiserror::Error ;

use crate::{ ActiveModules, HostContext, Orchestrator, StartupAborted };
use crate::config::{ self, ConfigError };



/// Why attaching failed. Every variant is fatal for the host.
#[derive( Error, Debug )]
pub enum AttachError {
	#[error( "Missing Argument: expected the path of a configuration file" )] MissingArgument,
	#[error( "Configuration Not Found: {}", .0.display() )] ConfigNotFound( PathBuf ),
	#[error( transparent )] Config( #[from] ConfigError ),
	#[error( transparent )] Aborted( #[from] StartupAborted ),
}

/// Reads the configuration named by `argument` and starts every enabled module.
///
/// # Errors
/// - [`AttachError::MissingArgument`] if `argument` is blank
/// - [`AttachError::ConfigNotFound`] if it does not name a regular file
/// - [`AttachError::Config`] if the file is not a valid configuration
/// - [`AttachError::Aborted`] if startup was aborted; nothing is left running
pub fn attach(
	argument: &str,
	host: &HostContext,
	orchestrator: &Orchestrator,
) -> Result<ActiveModules, AttachError> {

	tracing::info!( version = orchestrator.version(), argument, "attaching agent isolator" );

	let argument = argument.trim();
	if argument.is_empty() { return Err( AttachError::MissingArgument ) }

	let path = PathBuf::from( argument );
	if !path.is_file() { return Err( AttachError::ConfigNotFound( path )) }

	let descriptors = config::parse_path( &path )?;
	tracing::debug!( config = %path.display(), agents = descriptors.len(), "configuration loaded" );

	Ok( orchestrator.run( descriptors, host )?)

}
