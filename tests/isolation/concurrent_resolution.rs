use std::sync::{ Arc, Barrier };
use agent_isolator::{ Resolver, SharedScope, UnitMap };
use crate::fakes::plain_unit ;
use crate::scopes::scope_over ;

#[test]
fn threads_racing_on_a_name_agree_on_the_unit() {

	const THREADS: usize = 8 ;

	let shared = Arc::new( SharedScope::empty() );
	shared.register( plain_unit( "host:platform/clock" ));
	let scope = scope_over( UnitMap::new(), &shared );
	let barrier = Barrier::new( THREADS );

	let resolved = std::thread::scope(| threads | {
		let handles = ( 0..THREADS )
			.map(| _ | threads.spawn(|| {
				barrier.wait();
				scope.resolve( "host:platform/clock" ).unwrap()
			}))
			.collect::<Vec<_>>();
		handles.into_iter().map(| handle | handle.join().unwrap() ).collect::<Vec<_>>()
	});

	assert!( resolved.windows( 2 ).all(| pair | Arc::ptr_eq( &pair[0], &pair[1] )));

}
