//! Per-module isolation scopes.
//!
//! An [`IsolationScope`] resolves names **child-first**:
//!
//! 1. the module's own bundle(s),
//! 2. the process-wide [`SharedScope`],
//! 3. the optional fallback parent.
//!
//! The first tier that knows a name wins for the life of the scope, which keeps a
//! module's bundled copy of a unit from being shadowed by another module's copy of
//! the same name.

use std::collections::HashMap ;
use std::sync::{ Arc, Mutex };
use std::sync::atomic::{ AtomicU64, Ordering };
use itertools::Itertools ;
use nonempty_collections::NEVec ;
use thiserror::Error ;

use crate::{ Unit, UnitProvider, ProviderError, SharedScope };



static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new( 1 );

/// Process-unique identifier of an [`IsolationScope`].
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd )]
pub struct ScopeId( u64 );

impl ScopeId {
	fn next() -> Self { Self( NEXT_SCOPE_ID.fetch_add( 1, Ordering::Relaxed ))}
}

impl std::fmt::Display for ScopeId {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "scope#{}", self.0 )}
}

/// Errors that can occur while resolving a name.
#[derive( Error, Debug )]
pub enum ResolveError {
	/// The scope was released; it cannot resolve anything any more.
	#[error( "Scope Closed: {0}" )] ScopeClosed( ScopeId ),
	/// None of the tiers knows the name.
	#[error( "Name Not Found: {0}" )] NameNotFound( String ),
	/// A bundle failed while it was being searched.
	#[error( "Provider Error while resolving {name}: {source}" )]
	Provider { name: String, #[source] source: ProviderError },
	/// The scope's lock was poisoned by a panicking thread.
	#[error( "Lock Rejected" )] LockRejected,
}

/// Failure to close one or more bundles while releasing a scope.
///
/// The scope is closed regardless; this only reports what could not be cleaned up.
#[derive( Error, Debug )]
#[error( "Failed to release {scope} ({label}): {}", .failures.iter().join( "; " ))]
pub struct ReleaseError {
	pub scope: ScopeId,
	pub label: String,
	pub failures: Vec<ProviderError>,
}

/// Anything a name can be resolved through.
///
/// Implemented by [`SharedScope`] and [`IsolationScope`]; the fallback parent of an
/// isolation scope is any `Resolver`.
pub trait Resolver: Send + Sync {
	/// Resolves `name` to a unit.
	///
	/// # Errors
	/// Returns [`ResolveError::NameNotFound`] if no tier knows the name.
	fn resolve( &self, name: &str ) -> Result<Arc<dyn Unit>, ResolveError> ;
}

enum ScopeState {
	Open {
		roots: Vec<Box<dyn UnitProvider>>,
		resolved: HashMap<String, Arc<dyn Unit>>,
	},
	Closed,
}

/// A code-resolution scope bound to exactly one module.
///
/// Created right before a module is activated. If activation fails the scope is
/// released immediately; otherwise it stays open for as long as the module runs.
pub struct IsolationScope {
	id: ScopeId,
	label: String,
	shared: Arc<SharedScope>,
	parent: Option<Arc<dyn Resolver>>,
	state: Mutex<ScopeState>,
}

impl IsolationScope {

	/// Creates an open scope over `roots`.
	///
	/// `label` names the scope in logs and errors, usually the package location.
	pub fn new(
		label: impl Into<String>,
		roots: NEVec<Box<dyn UnitProvider>>,
		shared: Arc<SharedScope>,
		parent: Option<Arc<dyn Resolver>>,
	) -> Self {
		Self {
			id: ScopeId::next(),
			label: label.into(),
			shared,
			parent,
			state: Mutex::new( ScopeState::Open {
				roots: roots.into_iter().collect(),
				resolved: HashMap::new(),
			}),
		}
	}

	#[inline] pub fn id( &self ) -> ScopeId { self.id }
	#[inline] pub fn label( &self ) -> &str { &self.label }

	/// Whether the scope has not been released yet.
	pub fn is_open( &self ) -> bool {
		match self.state.lock() {
			Ok( state ) => matches!( *state, ScopeState::Open { .. }),
			Err( poisoned ) => matches!( *poisoned.into_inner(), ScopeState::Open { .. }),
		}
	}

	/// Discards all resolution state and closes every bundle.
	///
	/// Idempotent: only the first call closes anything, later calls return `Ok`.
	/// After this, [`resolve`]( Resolver::resolve ) fails with [`ResolveError::ScopeClosed`].
	///
	/// # Errors
	/// Returns the bundles that failed to close. Every bundle is attempted.
	pub fn release( &self ) -> Result<(), ReleaseError> {

		let previous = match self.state.lock() {
			Ok( mut state ) => std::mem::replace( &mut *state, ScopeState::Closed ),
			Err( poisoned ) => std::mem::replace( &mut *poisoned.into_inner(), ScopeState::Closed ),
		};

		let ScopeState::Open { roots, resolved } = previous else { return Ok(()) };
		drop( resolved );

		let failures = roots.iter()
			.filter_map(| root | root.close().err() )
			.collect::<Vec<_>>();

		match failures.is_empty() {
			true => Ok(()),
			false => Err( ReleaseError { scope: self.id, label: self.label.clone(), failures }),
		}

	}

	fn find_local( roots: &[Box<dyn UnitProvider>], name: &str ) -> Result<Option<Arc<dyn Unit>>, ResolveError> {
		for root in roots {
			if let Some( unit ) = root.find_unit( name )
				.map_err(| source | ResolveError::Provider { name: name.to_string(), source })?
			{
				return Ok( Some( unit ));
			}
		}
		Ok( None )
	}

	fn find_outside( &self, name: &str ) -> Result<Arc<dyn Unit>, ResolveError> {
		match self.shared.resolve( name ) {
			Err( ResolveError::NameNotFound( _ )) => match &self.parent {
				Some( parent ) => parent.resolve( name ),
				None => Err( ResolveError::NameNotFound( name.to_string() )),
			},
			result => result,
		}
	}

}

impl Resolver for IsolationScope {

	fn resolve( &self, name: &str ) -> Result<Arc<dyn Unit>, ResolveError> {

		// Held across the whole lookup so two threads resolving the same name
		// always agree on the unit.
		let mut state = self.state.lock().map_err(| _ | ResolveError::LockRejected )?;
		let ScopeState::Open { roots, resolved } = &mut *state else {
			return Err( ResolveError::ScopeClosed( self.id ));
		};

		if let Some( unit ) = resolved.get( name ) { return Ok( Arc::clone( unit )) }

		let unit = match Self::find_local( roots, name )? {
			Some( unit ) => unit,
			None => self.find_outside( name )?,
		};

		resolved.insert( name.to_string(), Arc::clone( &unit ));
		Ok( unit )

	}

}

impl std::fmt::Debug for IsolationScope {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "IsolationScope" )
			.field( "id", &self.id )
			.field( "label", &self.label )
			.field( "open", &self.is_open() )
			.field( "parent", &self.parent.as_ref().map(| _ | "<resolver>" ))
			.finish_non_exhaustive()
	}
}

#[cfg( test )]
mod tests {
	use std::sync::Arc ;
	use nonempty_collections::nev ;
	use super::{ IsolationScope, Resolver, ResolveError };
	use crate::{ NativeUnit, SharedScope, UnitMap, UnitProvider };

	fn scope_over( map: UnitMap ) -> IsolationScope {
		let root: Box<dyn UnitProvider> = Box::new( map );
		IsolationScope::new( "test", nev![ root ], Arc::new( SharedScope::empty() ), None )
	}

	#[test]
	fn scope_ids_are_unique() {
		let first = scope_over( UnitMap::new() );
		let second = scope_over( UnitMap::new() );
		assert_ne!( first.id(), second.id() );
	}

	#[test]
	fn closed_scope_rejects_resolution() {
		let scope = scope_over( UnitMap::new().with_unit( NativeUnit::new( "a" ).shared() ));
		assert!( scope.resolve( "a" ).is_ok() );
		scope.release().unwrap();
		assert!( matches!( scope.resolve( "a" ), Err( ResolveError::ScopeClosed( id )) if id == scope.id() ));
	}
}
