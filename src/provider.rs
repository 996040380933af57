//! Sources of resolvable units.
//!
//! A [`UnitProvider`] is one code bundle: it can look a name up among the units it
//! contains and it can be closed. Providers know nothing about precedence; the
//! three-tier lookup lives in [`IsolationScope`]( crate::IsolationScope ).

use std::collections::HashMap ;
use std::sync::{ Arc, RwLock };
use thiserror::Error ;

use crate::Unit ;



/// Errors reported by a [`UnitProvider`].
#[derive( Error, Debug )]
pub enum ProviderError {
	/// The provider was already closed.
	#[error( "Provider Closed" )] Closed,
	/// The provider's internal state was poisoned by a panicking thread.
	#[error( "Lock Rejected" )] LockRejected,
	/// The underlying runtime failed while looking a unit up or closing.
	#[error( "Runtime Exception: {0}" )] RuntimeException( wasmtime::Error ),
	/// Any other provider-specific failure.
	#[error( transparent )] Other( Box<dyn std::error::Error + Send + Sync> ),
}

/// One bundle of resolvable units.
///
/// Implementations must be safe to query from several threads at once; the scope
/// that owns a provider serialises its own lookups but a shared-scope provider
/// sees lookups from every module.
pub trait UnitProvider: Send + Sync {

	/// Looks `name` up in this bundle only.
	///
	/// Returns `Ok( None )` when the bundle simply does not contain the name.
	///
	/// # Errors
	/// Returns an error when the bundle could not be searched.
	fn find_unit( &self, name: &str ) -> Result<Option<Arc<dyn Unit>>, ProviderError> ;

	/// Releases whatever the bundle holds open.
	///
	/// # Errors
	/// Returns an error when the release itself failed. Callers treat this as
	/// best effort and keep releasing other bundles.
	fn close( &self ) -> Result<(), ProviderError> ;

}

/// An in-memory [`UnitProvider`] keyed by unit name.
///
/// Cloning a `UnitMap` yields another handle to the same map, so units registered
/// after the map was handed to a scope are visible through it.
#[derive( Clone, Default )]
pub struct UnitMap {
	units: Arc<RwLock<HashMap<String, Arc<dyn Unit>>>>,
}

impl UnitMap {

	pub fn new() -> Self { Self::default() }

	/// Adds `unit` under its own name, replacing any unit already stored there.
	pub fn with_unit( self, unit: Arc<dyn Unit> ) -> Self {
		self.insert( unit );
		self
	}

	/// Adds `unit` under `name`, replacing any unit already stored there.
	pub fn insert_as( &self, name: impl Into<String>, unit: Arc<dyn Unit> ) {
		let mut lock = match self.units.write() {
			Ok( lock ) => lock,
			Err( poisoned ) => poisoned.into_inner(),
		};
		lock.insert( name.into(), unit );
	}

	/// Adds `unit` under its own name.
	pub fn insert( &self, unit: Arc<dyn Unit> ) {
		self.insert_as( unit.name().to_string(), unit );
	}

	/// Removes the unit stored under `name`.
	pub fn remove( &self, name: &str ) -> Option<Arc<dyn Unit>> {
		match self.units.write() {
			Ok( mut lock ) => lock.remove( name ),
			Err( poisoned ) => poisoned.into_inner().remove( name ),
		}
	}

	pub fn len( &self ) -> usize {
		self.units.read().map_or( 0, | lock | lock.len() )
	}

	pub fn is_empty( &self ) -> bool { self.len() == 0 }

}

impl UnitProvider for UnitMap {

	fn find_unit( &self, name: &str ) -> Result<Option<Arc<dyn Unit>>, ProviderError> {
		let lock = self.units.read().map_err(| _ | ProviderError::LockRejected )?;
		Ok( lock.get( name ).cloned() )
	}

	fn close( &self ) -> Result<(), ProviderError> { Ok(()) }

}

impl std::fmt::Debug for UnitMap {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		let names = self.units.read()
			.map(| lock | lock.keys().cloned().collect::<Vec<_>>() )
			.unwrap_or_default();
		f.debug_struct( "UnitMap" ).field( "units", &names ).finish()
	}
}

#[cfg( test )]
mod tests {
	use std::sync::Arc ;
	use super::{ UnitMap, UnitProvider };
	use crate::NativeUnit ;

	#[test]
	fn clones_see_later_inserts() {
		let map = UnitMap::new();
		let handle = map.clone();
		assert!( map.find_unit( "late" ).unwrap().is_none() );
		handle.insert( NativeUnit::new( "late" ).shared() );
		assert!( map.find_unit( "late" ).unwrap().is_some() );
		assert_eq!( map.len(), 1 );
	}

	#[test]
	fn lookup_returns_the_stored_arc() {
		let unit = NativeUnit::new( "a" ).shared();
		let map = UnitMap::new().with_unit( Arc::clone( &unit ));
		let found = map.find_unit( "a" ).unwrap().unwrap();
		assert!( Arc::ptr_eq( &found, &unit ));
	}
}
