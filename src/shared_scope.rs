use std::collections::HashMap ;
use std::sync::{ Arc, RwLock };

use crate::{ Unit, UnitMap, UnitProvider, Resolver, ResolveError };



/// The process-wide tier every [`IsolationScope`]( crate::IsolationScope ) consults
/// after its own bundle.
///
/// Holds platform units that must be singletons across all modules. Lookups are
/// read-mostly: the memo cache is only written the first time a name resolves,
/// and when two threads race on that first resolution the entry that landed
/// first is the one both of them get back.
pub struct SharedScope {
	registered: UnitMap,
	providers: Vec<Arc<dyn UnitProvider>>,
	cache: RwLock<HashMap<String, Arc<dyn Unit>>>,
}

impl SharedScope {

	/// A shared scope with no providers and no registered units.
	pub fn empty() -> Self { Self::new( Vec::with_capacity( 0 )) }

	/// A shared scope over `providers`, searched in order.
	pub fn new( providers: impl IntoIterator<Item = Arc<dyn UnitProvider>> ) -> Self {
		Self {
			registered: UnitMap::new(),
			providers: providers.into_iter().collect(),
			cache: RwLock::new( HashMap::new() ),
		}
	}

	/// Makes `unit` resolvable under its own name.
	///
	/// Searched before the providers. Names that were already resolved through
	/// this scope keep resolving to their cached unit.
	pub fn register( &self, unit: Arc<dyn Unit> ) { self.registered.insert( unit ); }

	/// Removes a registered unit. Cached resolutions are unaffected.
	pub fn unregister( &self, name: &str ) -> Option<Arc<dyn Unit>> { self.registered.remove( name ) }

	fn cached( &self, name: &str ) -> Result<Option<Arc<dyn Unit>>, ResolveError> {
		let lock = self.cache.read().map_err(| _ | ResolveError::LockRejected )?;
		Ok( lock.get( name ).cloned() )
	}

	fn search( &self, name: &str ) -> Result<Option<Arc<dyn Unit>>, ResolveError> {
		let registered: &dyn UnitProvider = &self.registered ;
		std::iter::once( registered )
			.chain( self.providers.iter().map(| provider | provider.as_ref() ))
			.find_map(| provider | provider.find_unit( name ).transpose() )
			.transpose()
			.map_err(| source | ResolveError::Provider { name: name.to_string(), source })
	}

}

impl Resolver for SharedScope {

	fn resolve( &self, name: &str ) -> Result<Arc<dyn Unit>, ResolveError> {

		if let Some( unit ) = self.cached( name )? { return Ok( unit ) }

		let unit = self.search( name )?.ok_or_else(|| ResolveError::NameNotFound( name.to_string() ))?;

		let mut lock = self.cache.write().map_err(| _ | ResolveError::LockRejected )?;
		Ok( Arc::clone( lock.entry( name.to_string() ).or_insert( unit )))

	}

}

impl Default for SharedScope {
	fn default() -> Self { Self::empty() }
}

impl std::fmt::Debug for SharedScope {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "SharedScope" )
			.field( "registered", &self.registered )
			.field( "providers", &self.providers.len() )
			.field( "cached", &self.cache.read().map_or( 0, | lock | lock.len() ))
			.finish()
	}
}

#[cfg( test )]
mod tests {
	use std::sync::{ Arc, Barrier };
	use super::SharedScope ;
	use crate::{ NativeUnit, Resolver, ResolveError, UnitMap, UnitProvider };

	#[test]
	fn registered_units_take_precedence_over_providers() {
		let provided = NativeUnit::new( "platform" ).shared();
		let registered = NativeUnit::new( "platform" ).shared();
		let provider: Arc<dyn UnitProvider> = Arc::new( UnitMap::new().with_unit( Arc::clone( &provided )));
		let shared = SharedScope::new([ provider ]);
		shared.register( Arc::clone( &registered ));
		assert!( Arc::ptr_eq( &shared.resolve( "platform" ).unwrap(), &registered ));
	}

	#[test]
	fn unknown_names_are_not_found() {
		assert!( matches!( SharedScope::empty().resolve( "missing" ), Err( ResolveError::NameNotFound( name )) if name == "missing" ));
	}

	#[test]
	fn racing_first_resolutions_agree() {
		let shared = Arc::new( SharedScope::empty() );
		shared.register( NativeUnit::new( "platform" ).shared() );
		let barrier = Arc::new( Barrier::new( 8 ));

		let handles = ( 0..8 ).map(| _ | {
			let shared = Arc::clone( &shared );
			let barrier = Arc::clone( &barrier );
			std::thread::spawn( move || {
				barrier.wait();
				shared.resolve( "platform" ).unwrap()
			})
		}).collect::<Vec<_>>();

		let units = handles.into_iter().map(| handle | handle.join().unwrap() ).collect::<Vec<_>>();
		assert!( units.windows( 2 ).all(| pair | Arc::ptr_eq( &pair[0], &pair[1] )));
	}
}
