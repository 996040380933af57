//! YAML configuration.
//!
//! ```yaml
//! agents:
//!   - package: /opt/agents/tracer.wasm
//!     entryPoint: demo:tracer/entry
//!     options: "sample=0.1"
//!   - package: /opt/agents/profiler.wasm
//!     entryPoint: demo:profiler/entry
//!     enabled: false
//! ```
//!
//! `options` defaults to an empty string and `enabled` to `true`. `enabled` may
//! also be written as a string, see [`EnabledSource::Text`]. Numbers are not
//! flags: `enabled: 1` is rejected, `enabled: "1"` enables the agent.

use std::io::Read ;
use std::path::{ Path, PathBuf };
use serde_yaml::{ Mapping, Value };
use thiserror::Error ;

use crate::{ EnabledSource, InvalidDescriptor, ModuleDescriptor };



/// Key of the list of modules at the root of the document.
pub const AGENTS_KEY: &str = "agents" ;

/// Errors that can occur while reading a configuration.
///
/// Any of these fails the whole configuration; no partial list is returned.
#[derive( Error, Debug )]
pub enum ConfigError {
	#[error( "Failed to read {}: {source}", .path.display() )]
	Io { path: PathBuf, #[source] source: std::io::Error },
	#[error( "YAML Error: {0}" )] Yaml( #[from] serde_yaml::Error ),
	#[error( "Configuration root must be a mapping" )] NotAMapping,
	#[error( "Configuration has no `{}` list", AGENTS_KEY )] MissingAgentList,
	#[error( "Agent [{}] must be a mapping", .index + 1 )] AgentNotAMapping { index: usize },
	#[error( "Agent [{}]: invalid `{field}`: {reason}", .index + 1 )]
	InvalidField { index: usize, field: &'static str, reason: String },
	#[error( "Agent [{}]: {source}", .index + 1 )]
	InvalidDescriptor { index: usize, #[source] source: InvalidDescriptor },
}

/// Parses a configuration document.
///
/// # Errors
/// See [`ConfigError`].
pub fn parse_str( source: &str ) -> Result<Vec<ModuleDescriptor>, ConfigError> {
	from_value( serde_yaml::from_str( source )? )
}

/// Parses a configuration document read from `reader`.
///
/// # Errors
/// See [`ConfigError`].
pub fn parse_reader( reader: impl Read ) -> Result<Vec<ModuleDescriptor>, ConfigError> {
	from_value( serde_yaml::from_reader( reader )? )
}

/// Reads and parses the configuration file at `path`.
///
/// # Errors
/// Returns [`ConfigError::Io`] if the file cannot be opened, otherwise see [`ConfigError`].
pub fn parse_path( path: &Path ) -> Result<Vec<ModuleDescriptor>, ConfigError> {
	let file = std::fs::File::open( path )
		.map_err(| source | ConfigError::Io { path: path.to_path_buf(), source })?;
	parse_reader( std::io::BufReader::new( file ))
}

fn from_value( root: Value ) -> Result<Vec<ModuleDescriptor>, ConfigError> {

	let Value::Mapping( root ) = root else { return Err( ConfigError::NotAMapping ) };

	let agents = match root.get( AGENTS_KEY ) {
		Some( Value::Sequence( agents )) => agents,
		Some( Value::Null ) => return Ok( Vec::new() ),
		Some( _ ) | None => return Err( ConfigError::MissingAgentList ),
	};

	agents.iter()
		.enumerate()
		.map(|( index, agent )| match agent {
			Value::Mapping( agent ) => descriptor( index, agent ),
			_ => Err( ConfigError::AgentNotAMapping { index }),
		})
		.collect()

}

fn descriptor( index: usize, agent: &Mapping ) -> Result<ModuleDescriptor, ConfigError> {

	let package = string_field( index, agent, "package" )?.unwrap_or_default();
	let entry_point = string_field( index, agent, "entryPoint" )?.unwrap_or_default();
	let options = string_field( index, agent, "options" )?.unwrap_or_default().trim();

	let enabled = match agent.get( "enabled" ) {
		None | Some( Value::Null ) => EnabledSource::Absent,
		Some( Value::Bool( enabled )) => EnabledSource::Bool( *enabled ),
		Some( Value::String( text )) => EnabledSource::Text( text ),
		Some( other ) => EnabledSource::Other( kind_of( other )),
	};

	ModuleDescriptor::new( package, entry_point, options, enabled )
		.map_err(| source | ConfigError::InvalidDescriptor { index, source })

}

fn string_field<'a>( index: usize, agent: &'a Mapping, field: &'static str ) -> Result<Option<&'a str>, ConfigError> {
	match agent.get( field ) {
		None | Some( Value::Null ) => Ok( None ),
		Some( Value::String( text )) => Ok( Some( text )),
		Some( other ) => Err( ConfigError::InvalidField {
			index,
			field,
			reason: format!( "expected a string, found {}", kind_of( other )),
		}),
	}
}

fn kind_of( value: &Value ) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool( _ ) => "a boolean",
		Value::Number( _ ) => "a number",
		Value::String( _ ) => "a string",
		Value::Sequence( _ ) => "a sequence",
		Value::Mapping( _ ) => "a mapping",
		Value::Tagged( _ ) => "a tagged value",
	}
}

#[cfg( test )]
mod tests {
	use super::{ ConfigError, kind_of };
	use serde_yaml::Value ;

	#[test]
	fn value_kinds_are_described() {
		assert_eq!( kind_of( &Value::Bool( true )), "a boolean" );
		assert_eq!( kind_of( &serde_yaml::from_str::<Value>( "[1]" ).unwrap() ), "a sequence" );
	}

	#[test]
	fn errors_count_agents_from_one() {
		let err = ConfigError::AgentNotAMapping { index: 0 };
		assert_eq!( err.to_string(), "Agent [1] must be a mapping" );
	}
}
