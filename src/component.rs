//! WebAssembly component bundles.
//!
//! A module packaged as a WASM component exposes its units as exported interface
//! instances. The entry point `demo:agent/entry` names such an instance, and the
//! activation function is that instance's `agentmain` export:
//!
//! ```wit
//! package demo:agent ;
//!
//! interface entry {
//! 	agentmain: func( options: string, host: u64 );
//! }
//! ```
//!
//! The `host` argument is the [`HostContext::token`]( crate::HostContext::token ).
//!
//! Every bundle is instantiated in its own wasmtime [`Store`], so no two modules
//! share linear memory, tables or globals. Host functions added to the [`Linker`]
//! handed to the [`ComponentOpener`] are available to every bundle.

use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex };
use wasmtime::{ Engine, Store };
use wasmtime::component::{ Component, Instance, Linker, ResourceTable, TypedFunc };

use crate::{
	ActivationArgs, ActivationError, BundleError, BundleOpener, FunctionSignature,
	ProviderError, Unit, UnitProvider, ValueKind,
};



struct Loaded<Ctx: 'static> {
	store: Store<Ctx>,
	instance: Instance,
}

type SharedLoaded<Ctx> = Arc<Mutex<Option<Loaded<Ctx>>>> ;

/// Opens WASM component files as module bundles.
///
/// # Type Parameters
/// - `Ctx`: data stored inside each bundle's wasmtime `Store`, created per bundle
/// 	by the context factory
pub struct ComponentOpener<Ctx: 'static> {
	engine: Engine,
	linker: Linker<Ctx>,
	#[allow( clippy::type_complexity )]
	make_context: Box<dyn Fn( &Path ) -> Ctx + Send + Sync>,
}

impl<Ctx: Send + 'static> ComponentOpener<Ctx> {

	/// Creates an opener that instantiates every bundle against `linker`.
	///
	/// `make_context` produces the store data for the bundle at the given path.
	pub fn new(
		engine: Engine,
		linker: Linker<Ctx>,
		make_context: impl Fn( &Path ) -> Ctx + Send + Sync + 'static,
	) -> Self {
		Self { engine, linker, make_context: Box::new( make_context ) }
	}

	#[inline] pub fn engine( &self ) -> &Engine { &self.engine }

	/// Compiles and instantiates the component at `location`.
	///
	/// # Errors
	/// Returns [`BundleError::NotFound`] if there is no file at `location` and
	/// [`BundleError::Invalid`] if it does not compile or instantiate.
	pub fn open_component( &self, location: &Path ) -> Result<ComponentBundle<Ctx>, BundleError> {

		match std::fs::metadata( location ) {
			Ok( metadata ) if metadata.is_file() => {},
			Ok( _ ) => return Err( BundleError::NotFound( location.to_path_buf() )),
			Err( err ) if err.kind() == std::io::ErrorKind::NotFound => return Err( BundleError::NotFound( location.to_path_buf() )),
			Err( source ) => return Err( BundleError::Io { path: location.to_path_buf(), source }),
		}

		let invalid = | err: wasmtime::Error | BundleError::Invalid { path: location.to_path_buf(), reason: err.to_string() };

		let component = Component::from_file( &self.engine, location ).map_err( invalid )?;
		let mut store = Store::new( &self.engine, ( self.make_context )( location ));
		let instance = self.linker.instantiate( &mut store, &component ).map_err( invalid )?;

		tracing::debug!( bundle = %location.display(), "instantiated component bundle" );

		Ok( ComponentBundle {
			path: location.to_path_buf(),
			loaded: Arc::new( Mutex::new( Some( Loaded { store, instance }))),
		})

	}

}

impl ComponentOpener<ResourceTable> {
	/// An opener whose bundles carry nothing but a fresh [`ResourceTable`].
	pub fn with_resource_tables( engine: Engine, linker: Linker<ResourceTable> ) -> Self {
		Self::new( engine, linker, | _ | ResourceTable::new() )
	}
}

impl<Ctx: Send + 'static> BundleOpener for ComponentOpener<Ctx> {
	fn open( &self, location: &Path ) -> Result<Box<dyn UnitProvider>, BundleError> {
		Ok( Box::new( self.open_component( location )? ))
	}
}

impl<Ctx: 'static> std::fmt::Debug for ComponentOpener<Ctx> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ComponentOpener" )
			.field( "engine", &"<Engine>" )
			.field( "linker", &"<Linker>" )
			.field( "make_context", &"<closure>" )
			.finish()
	}
}

/// One instantiated component, serving its exported instances as units.
pub struct ComponentBundle<Ctx: 'static> {
	path: PathBuf,
	loaded: SharedLoaded<Ctx>,
}

impl<Ctx: 'static> ComponentBundle<Ctx> {
	#[inline] pub fn path( &self ) -> &Path { &self.path }
}

impl<Ctx: Send + 'static> UnitProvider for ComponentBundle<Ctx> {

	fn find_unit( &self, name: &str ) -> Result<Option<Arc<dyn Unit>>, ProviderError> {

		let mut lock = self.loaded.lock().map_err(| _ | ProviderError::LockRejected )?;
		let Loaded { store, instance } = lock.as_mut().ok_or( ProviderError::Closed )?;

		Ok( instance.get_export_index( &mut *store, None, name ).map(| _ | {
			let unit: Arc<dyn Unit> = Arc::new( ComponentUnit {
				name: name.to_string(),
				loaded: Arc::clone( &self.loaded ),
			});
			unit
		}))

	}

	fn close( &self ) -> Result<(), ProviderError> {
		let loaded = match self.loaded.lock() {
			Ok( mut lock ) => lock.take(),
			Err( poisoned ) => poisoned.into_inner().take(),
		};
		if loaded.is_some() {
			tracing::debug!( bundle = %self.path.display(), "dropped component store" );
		}
		Ok(())
	}

}

impl<Ctx: 'static> std::fmt::Debug for ComponentBundle<Ctx> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		let open = self.loaded.lock().is_ok_and(| lock | lock.is_some() );
		f.debug_struct( "ComponentBundle" )
			.field( "path", &self.path )
			.field( "open", &open )
			.finish()
	}
}

/// An exported interface instance of a [`ComponentBundle`].
///
/// The bundle's store is locked for as long as one of its functions runs. Host
/// functions called from inside the component must not resolve names through the
/// scope of the very module that is calling them.
struct ComponentUnit<Ctx: 'static> {
	name: String,
	loaded: SharedLoaded<Ctx>,
}

type ActivationFunc<'a> = TypedFunc<( &'a str, u64 ), ()> ;

impl<Ctx: 'static> ComponentUnit<Ctx> {

	fn activation_func<'a>( &self, loaded: &mut Loaded<Ctx>, function: &str ) -> Option<Result<ActivationFunc<'a>, wasmtime::Error>> {
		let Loaded { store, instance } = loaded ;
		let interface_index = instance.get_export_index( &mut *store, None, &self.name )?;
		let func_index = instance.get_export_index( &mut *store, Some( &interface_index ), function )?;
		Some( instance.get_typed_func::<( &'a str, u64 ), ()>( &mut *store, func_index ))
	}

}

impl<Ctx: Send + 'static> Unit for ComponentUnit<Ctx> {

	fn name( &self ) -> &str { &self.name }

	fn signature( &self, function: &str ) -> Option<FunctionSignature> {
		let mut lock = self.loaded.lock().ok()?;
		let loaded = lock.as_mut()?;
		match self.activation_func( loaded, function )? {
			Ok( _ ) => Some( FunctionSignature::activation() ),
			Err( err ) => Some( FunctionSignature::new([ ValueKind::Other( format!( "<{}>", err ))], None )),
		}
	}

	fn call( &self, function: &str, args: ActivationArgs<'_> ) -> Result<(), ActivationError> {

		let mut lock = self.loaded.lock().map_err(| _ | ActivationError::failed( "component store lock poisoned" ))?;
		let loaded = lock.as_mut().ok_or( ActivationError::BundleClosed )?;

		let func = self.activation_func( loaded, function )
			.ok_or_else(|| ActivationError::UnknownFunction( format!( "{}:{}", self.name, function )))?
			.map_err(| err | ActivationError::InvalidArgumentList( err.to_string() ))?;

		func.call( &mut loaded.store, ( args.options, args.host.token() ))
			.map_err( ActivationError::RuntimeException )?;
		let _ = func.post_return( &mut loaded.store );

		Ok(())

	}

}

#[cfg( test )]
mod tests {
	use std::path::Path ;
	use wasmtime::Engine ;
	use wasmtime::component::Linker ;
	use super::ComponentOpener ;
	use crate::BundleError ;

	#[test]
	fn missing_file_is_not_found() {
		let engine = Engine::default();
		let opener = ComponentOpener::with_resource_tables( engine.clone(), Linker::new( &engine ));
		match opener.open_component( Path::new( "/definitely/not/here.wasm" )) {
			Err( BundleError::NotFound( path )) => assert_eq!( path, Path::new( "/definitely/not/here.wasm" )),
			other => panic!( "expected NotFound, found {:?}", other.map(| _ | "<bundle>" )),
		}
	}

	#[test]
	fn directory_is_not_a_bundle() {
		let engine = Engine::default();
		let opener = ComponentOpener::with_resource_tables( engine.clone(), Linker::new( &engine ));
		let dir = tempfile::tempdir().unwrap();
		assert!( matches!( opener.open_component( dir.path() ), Err( BundleError::NotFound( _ ))));
	}
}
