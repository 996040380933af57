use agent_isolator::InvalidDescriptor ;
use agent_isolator::config::{ self, ConfigError };

#[test]
fn syntax_error() {
	assert!( matches!( config::parse_str( "agents: [ unterminated" ), Err( ConfigError::Yaml( _ ))));
}

#[test]
fn root_must_be_a_mapping() {
	assert!( matches!( config::parse_str( "- a\n- b\n" ), Err( ConfigError::NotAMapping )));
}

#[test]
fn agent_list_is_required() {
	assert!( matches!( config::parse_str( "other: 1\n" ), Err( ConfigError::MissingAgentList )));
	assert!( matches!( config::parse_str( "agents: not-a-list\n" ), Err( ConfigError::MissingAgentList )));
}

#[test]
fn every_agent_must_be_a_mapping() {
	let source = "agents:\n  - package: a.wasm\n    entryPoint: demo:a/entry\n  - just-a-string\n" ;
	match config::parse_str( source ) {
		Err( ConfigError::AgentNotAMapping { index: 1 }) => {},
		other => panic!( "Expected AgentNotAMapping, found: {:?}", other ),
	}
}

#[test]
fn missing_package_fails_the_whole_parse() {
	let source = "agents:\n  - package: a.wasm\n    entryPoint: demo:a/entry\n  - entryPoint: demo:b/entry\n" ;
	match config::parse_str( source ) {
		Err( ConfigError::InvalidDescriptor { index: 1, source: InvalidDescriptor::EmptyPackageLocation }) => {},
		other => panic!( "Expected InvalidDescriptor, found: {:?}", other ),
	}
}

#[test]
fn blank_entry_point_is_rejected() {
	let source = "agents:\n  - package: a.wasm\n    entryPoint: \"   \"\n" ;
	assert!( matches!(
		config::parse_str( source ),
		Err( ConfigError::InvalidDescriptor { index: 0, source: InvalidDescriptor::EmptyEntryPoint })
	));
}

#[test]
fn fields_must_be_strings() {
	let source = "agents:\n  - package: [ a, b ]\n    entryPoint: demo:a/entry\n" ;
	match config::parse_str( source ) {
		Err( ConfigError::InvalidField { index: 0, field: "package", reason }) => assert!( reason.contains( "sequence" ), "{}", reason ),
		other => panic!( "Expected InvalidField, found: {:?}", other ),
	}
}

#[test]
fn enabled_must_be_boolean_or_text() {
	let source = "agents:\n  - package: a.wasm\n    entryPoint: demo:a/entry\n    enabled: [ true ]\n" ;
	match config::parse_str( source ) {
		Err( ConfigError::InvalidDescriptor { index: 0, source: InvalidDescriptor::InvalidEnabled( _ )}) => {},
		other => panic!( "Expected InvalidEnabled, found: {:?}", other ),
	}
}

#[test]
fn numeric_enabled_flag_must_be_quoted() {
	let bare = "agents:\n  - package: a.wasm\n    entryPoint: demo:a/entry\n    enabled: 1\n" ;
	match config::parse_str( bare ) {
		Err( ConfigError::InvalidDescriptor { index: 0, source: InvalidDescriptor::InvalidEnabled( kind )}) => assert_eq!( kind, "a number" ),
		other => panic!( "Expected InvalidEnabled, found: {:?}", other ),
	}
	let quoted = "agents:\n  - package: a.wasm\n    entryPoint: demo:a/entry\n    enabled: \"1\"\n" ;
	assert!( config::parse_str( quoted ).unwrap()[0].is_enabled() );
}

#[test]
fn missing_file() {
	let dir = tempfile::tempdir().unwrap();
	assert!( matches!( config::parse_path( &dir.path().join( "nope.yaml" )), Err( ConfigError::Io { .. })));
}
