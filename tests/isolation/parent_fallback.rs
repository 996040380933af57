use std::sync::Arc ;
use agent_isolator::{ Resolver, ResolveError, SharedScope, UnitMap };
use crate::fakes::plain_unit ;
use crate::scopes::{ MapResolver, scope_over, scope_with_parent };

#[test]
fn unknown_name_without_parent_is_not_found() {

	let shared = Arc::new( SharedScope::empty() );
	let scope = scope_over( UnitMap::new(), &shared );

	match scope.resolve( "nowhere:to/be-found" ) {
		Err( ResolveError::NameNotFound( name )) => assert_eq!( name, "nowhere:to/be-found" ),
		other => panic!( "Expected NameNotFound, found: {:?}", other ),
	}

}

#[test]
fn parent_is_consulted_last() {

	let from_parent = plain_unit( "host:legacy/bridge" );
	let parent = Arc::new( MapResolver( UnitMap::new().with_unit( Arc::clone( &from_parent ))));

	let shared = Arc::new( SharedScope::empty() );
	let scope = scope_with_parent( UnitMap::new(), &shared, parent );

	assert!( Arc::ptr_eq( &scope.resolve( "host:legacy/bridge" ).unwrap(), &from_parent ));

}

#[test]
fn shared_scope_wins_over_parent() {

	let in_shared = plain_unit( "host:platform/clock" );
	let in_parent = plain_unit( "host:platform/clock" );

	let shared = Arc::new( SharedScope::empty() );
	shared.register( Arc::clone( &in_shared ));
	let parent = Arc::new( MapResolver( UnitMap::new().with_unit( in_parent )));

	let scope = scope_with_parent( UnitMap::new(), &shared, parent );
	assert!( Arc::ptr_eq( &scope.resolve( "host:platform/clock" ).unwrap(), &in_shared ));

}

#[test]
fn parent_miss_is_not_found() {

	let shared = Arc::new( SharedScope::empty() );
	let parent = Arc::new( MapResolver( UnitMap::new() ));
	let scope = scope_with_parent( UnitMap::new(), &shared, parent );

	assert!( matches!( scope.resolve( "missing:unit/x" ), Err( ResolveError::NameNotFound( _ ))));

}
