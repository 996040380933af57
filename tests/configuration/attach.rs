use std::path::PathBuf ;
use std::sync::Arc ;
use agent_isolator::{ HostContext, InvocationFailureKind, Orchestrator, SharedScope };
use agent_isolator::bootstrap::{ AttachError, attach };
use crate::fakes::FakeOpener ;

fn orchestrator( opener: &Arc<FakeOpener> ) -> Orchestrator {
	Orchestrator::new( opener.clone(), Arc::new( SharedScope::empty() ))
}

fn write_config( dir: &tempfile::TempDir, contents: &str ) -> String {
	let path = dir.path().join( "agents.yaml" );
	std::fs::write( &path, contents ).unwrap();
	path.display().to_string()
}

#[test]
fn blank_argument_is_rejected() {
	let opener = Arc::new( FakeOpener::new() );
	assert!( matches!( attach( "", &HostContext::new(()), &orchestrator( &opener )), Err( AttachError::MissingArgument )));
	assert!( matches!( attach( "   ", &HostContext::new(()), &orchestrator( &opener )), Err( AttachError::MissingArgument )));
}

#[test]
fn missing_configuration_file() {
	let dir = tempfile::tempdir().unwrap();
	let missing = dir.path().join( "missing.yaml" );
	let opener = Arc::new( FakeOpener::new() );
	match attach( &missing.display().to_string(), &HostContext::new(()), &orchestrator( &opener )) {
		Err( AttachError::ConfigNotFound( path )) => assert_eq!( path, missing ),
		other => panic!( "Expected ConfigNotFound, found: {:?}", other ),
	}
}

#[test]
fn directory_is_not_a_configuration() {
	let dir = tempfile::tempdir().unwrap();
	let opener = Arc::new( FakeOpener::new() );
	assert!( matches!(
		attach( &dir.path().display().to_string(), &HostContext::new(()), &orchestrator( &opener )),
		Err( AttachError::ConfigNotFound( _ ))
	));
}

#[test]
fn malformed_configuration_starts_nothing() {
	let dir = tempfile::tempdir().unwrap();
	let argument = write_config( &dir, "agents:\n  - package: a.wasm\n" );
	let opener = Arc::new( FakeOpener::new().with_ok_agent( "a.wasm", "demo:a/entry" ));

	assert!( matches!( attach( &argument, &HostContext::new(()), &orchestrator( &opener )), Err( AttachError::Config( _ ))));
	assert!( opener.opened().is_empty() );
}

#[test]
fn attaches_every_enabled_agent() {
	let dir = tempfile::tempdir().unwrap();
	let argument = write_config( &dir, concat!(
		"agents:\n",
		"  - package: agents/a.wasm\n",
		"    entryPoint: demo:a/entry\n",
		"  - package: agents/ghost.wasm\n",
		"    entryPoint: demo:ghost/entry\n",
		"    enabled: false\n",
		"  - package: agents/b.wasm\n",
		"    entryPoint: demo:b/entry\n",
		"    options: verbose\n",
	));
	let opener = Arc::new( FakeOpener::new()
		.with_ok_agent( "agents/a.wasm", "demo:a/entry" )
		.with_agent( "agents/b.wasm", "demo:b/entry", | args | {
			assert_eq!( args.options, "verbose" );
			Ok(())
		}));

	let active = attach( &format!( "  {}  ", argument ), &HostContext::new(()), &orchestrator( &opener )).unwrap();

	assert_eq!( active.len(), 2 );
	assert_eq!( opener.opened_paths(), [ PathBuf::from( "agents/a.wasm" ), PathBuf::from( "agents/b.wasm" )]);
}

#[test]
fn aborted_startup_is_fatal() {
	let dir = tempfile::tempdir().unwrap();
	let argument = write_config( &dir, "agents:\n  - package: agents/a.wasm\n    entryPoint: demo:a/entry\n  - package: agents/b.wasm\n    entryPoint: demo:missing/entry\n" );
	let opener = Arc::new( FakeOpener::new()
		.with_ok_agent( "agents/a.wasm", "demo:a/entry" )
		.with_ok_agent( "agents/b.wasm", "demo:b/entry" ));

	match attach( &argument, &HostContext::new(()), &orchestrator( &opener )) {
		Err( AttachError::Aborted( aborted )) => {
			assert_eq!( aborted.index, 1 );
			assert_eq!( aborted.kind(), InvocationFailureKind::EntryPointMissing );
		},
		other => panic!( "Expected Aborted, found: {:?}", other ),
	}
	assert_eq!( opener.still_open(), 0 );
}
