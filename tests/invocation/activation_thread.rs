use std::cell::Cell ;
use std::sync::{ Arc, Mutex };
use agent_isolator::{ HostContext, Resolver, SharedScope, UnitMap, invoke };
use crate::fakes::{ agent, plain_unit };
use crate::scopes::scope_over ;

thread_local! {
	static BOUND_BY_ACTIVATION: Cell<bool> = const { Cell::new( false ) };
}

#[test]
fn activation_runs_on_its_own_named_thread() {

	let seen = Arc::new( Mutex::new( None ));
	let recorder = Arc::clone( &seen );

	let shared = Arc::new( SharedScope::empty() );
	let scope = scope_over(
		UnitMap::new().with_unit( agent( "demo:agent/entry", move | _ | {
			let current = std::thread::current();
			*recorder.lock().unwrap() = Some(( current.id(), current.name().map( str::to_string )));
			Ok(())
		})),
		&shared,
	);

	invoke( &scope, "demo:agent/entry", "", &HostContext::new(()) ).unwrap();

	let ( thread, name ) = seen.lock().unwrap().take().unwrap();
	assert_ne!( thread, std::thread::current().id() );
	assert_eq!( name, Some( format!( "activation-{}", scope.id() )));

}

#[test]
fn thread_bound_state_does_not_leak_to_the_caller() {

	let shared = Arc::new( SharedScope::empty() );
	let scope = scope_over(
		UnitMap::new().with_unit( agent( "demo:agent/entry", | _ | {
			BOUND_BY_ACTIVATION.with(| bound | bound.set( true ));
			Ok(())
		})),
		&shared,
	);

	invoke( &scope, "demo:agent/entry", "", &HostContext::new(()) ).unwrap();
	assert!( !BOUND_BY_ACTIVATION.with( Cell::get ));

}

#[test]
fn activation_receives_options_host_and_its_own_scope() {

	#[derive( Debug, PartialEq )]
	struct Host { name: &'static str }

	let host = HostContext::new( Host { name: "jvm-17" });
	let expected_host = host.clone();
	let helper = plain_unit( "demo:agent/helper" );
	let expected_helper = Arc::clone( &helper );
	let checked = Arc::new( Mutex::new( false ));
	let done = Arc::clone( &checked );

	let shared = Arc::new( SharedScope::empty() );
	let scope = scope_over(
		UnitMap::new()
			.with_unit( helper )
			.with_unit( agent( "demo:agent/entry", move | args | {
				assert_eq!( args.options, "level=debug" );
				assert!( args.host.same_as( &expected_host ));
				assert_eq!( args.host.downcast_ref::<Host>(), Some( &Host { name: "jvm-17" }));
				let resolved = args.scope.resolve( "demo:agent/helper" ).unwrap();
				assert!( Arc::ptr_eq( &resolved, &expected_helper ));
				*done.lock().unwrap() = true ;
				Ok(())
			})),
		&shared,
	);

	invoke( &scope, "demo:agent/entry", "level=debug", &host ).unwrap();
	assert!( *checked.lock().unwrap() );

}
