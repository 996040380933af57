use std::sync::Arc ;
use agent_isolator::{ Resolver, SharedScope, UnitMap };
use crate::fakes::plain_unit ;
use crate::scopes::scope_over ;

#[test]
fn own_bundle_shadows_shared_scope() {

	let shared = Arc::new( SharedScope::empty() );
	let platform = plain_unit( "lib:util/helpers" );
	shared.register( Arc::clone( &platform ));

	let bundled = plain_unit( "lib:util/helpers" );
	let scope_a = scope_over( UnitMap::new().with_unit( Arc::clone( &bundled )), &shared );
	let scope_b = scope_over( UnitMap::new(), &shared );

	let from_a = scope_a.resolve( "lib:util/helpers" ).unwrap();
	let from_b = scope_b.resolve( "lib:util/helpers" ).unwrap();

	assert!( Arc::ptr_eq( &from_a, &bundled ), "scope A must see its bundled copy" );
	assert!( Arc::ptr_eq( &from_b, &platform ), "scope B must fall through to the shared scope" );

}

#[test]
fn modules_bundling_the_same_name_stay_apart() {

	let shared = Arc::new( SharedScope::empty() );
	let unit_a = plain_unit( "vendor:json/parser" );
	let unit_b = plain_unit( "vendor:json/parser" );

	let scope_a = scope_over( UnitMap::new().with_unit( Arc::clone( &unit_a )), &shared );
	let scope_b = scope_over( UnitMap::new().with_unit( Arc::clone( &unit_b )), &shared );

	assert!( Arc::ptr_eq( &scope_a.resolve( "vendor:json/parser" ).unwrap(), &unit_a ));
	assert!( Arc::ptr_eq( &scope_b.resolve( "vendor:json/parser" ).unwrap(), &unit_b ));
	assert_ne!( scope_a.id(), scope_b.id() );

}

#[test]
fn shared_units_are_singletons_across_scopes() {

	let shared = Arc::new( SharedScope::empty() );
	shared.register( plain_unit( "host:platform/clock" ));

	let scope_a = scope_over( UnitMap::new(), &shared );
	let scope_b = scope_over( UnitMap::new(), &shared );

	let from_a = scope_a.resolve( "host:platform/clock" ).unwrap();
	let from_b = scope_b.resolve( "host:platform/clock" ).unwrap();
	assert!( Arc::ptr_eq( &from_a, &from_b ));

}

#[test]
fn shared_providers_are_searched_in_order() {

	let first = plain_unit( "lib:log/sink" );
	let second = plain_unit( "lib:log/sink" );
	let shared = Arc::new( SharedScope::new([
		Arc::new( UnitMap::new().with_unit( Arc::clone( &first ))) as Arc<dyn agent_isolator::UnitProvider>,
		Arc::new( UnitMap::new().with_unit( Arc::clone( &second ))) as Arc<dyn agent_isolator::UnitProvider>,
	]));

	let scope = scope_over( UnitMap::new(), &shared );
	assert!( Arc::ptr_eq( &scope.resolve( "lib:log/sink" ).unwrap(), &first ));

}
