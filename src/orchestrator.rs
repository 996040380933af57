//! Startup orchestration.
//!
//! The [`Orchestrator`] activates every enabled module of a run, in declaration
//! order, each through a fresh [`IsolationScope`]. Startup is all-or-nothing:
//! when one activation fails, the failing module's scope and the scopes of every
//! module that had already started are released, and the run reports a single
//! [`StartupAborted`].
//!
//! ```text
//! Idle -> Activating( i ) -> Completed
//!                         -> Aborting( i ) -> Aborted
//! ```

mod concurrent ;

use std::num::NonZeroUsize ;
use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use nonempty_collections::nev ;
use pipe_trait::Pipe ;
use thiserror::Error ;

use crate::{
	BundleOpener, HostContext, InvocationFailure, InvocationFailureKind, IsolationScope,
	ModuleDescriptor, Resolver, SharedScope, invoke,
};



/// How the module activations of a run are scheduled.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum Scheduling {
	/// One module at a time; module `i + 1` starts only after module `i` succeeded.
	#[default] Sequential,
	/// All modules at once on a pool of at most `max_workers` threads.
	///
	/// When several modules fail at the same time, whichever failure arrives first
	/// is the one reported; which one that is, is unspecified.
	Concurrent { max_workers: NonZeroUsize },
}

/// Where a run currently is. Only used for diagnostics.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum RunState {
	Idle,
	Activating( usize ),
	Completed,
	Aborting( usize ),
	Aborted,
}

impl std::fmt::Display for RunState {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "{:?}", self )}
}

/// A run that failed.
///
/// Nothing from the run is left active once this is returned.
#[derive( Error, Debug )]
#[error( "Startup Aborted: module [{}] {descriptor} failed: {cause}", .index + 1 )]
pub struct StartupAborted {
	/// Position of the failing module among the run's enabled modules.
	pub index: usize,
	pub descriptor: ModuleDescriptor,
	#[source] pub cause: InvocationFailure,
	/// How many scopes failed to release cleanly during the abort. Those failures
	/// were logged; the scopes are closed regardless.
	pub release_failures: usize,
}

impl StartupAborted {
	#[inline] pub fn kind( &self ) -> InvocationFailureKind { self.cause.kind() }
}

/// A module that started successfully.
#[derive( Debug )]
pub struct ActiveModule {
	index: usize,
	package_location: PathBuf,
	entry_point_id: String,
	scope: Arc<IsolationScope>,
}

impl ActiveModule {

	fn new( index: usize, descriptor: &ModuleDescriptor, scope: Arc<IsolationScope> ) -> Self {
		Self {
			index,
			package_location: descriptor.package_location().to_path_buf(),
			entry_point_id: descriptor.entry_point_id().to_string(),
			scope,
		}
	}

	#[inline] pub fn index( &self ) -> usize { self.index }
	#[inline] pub fn package_location( &self ) -> &Path { &self.package_location }
	#[inline] pub fn entry_point_id( &self ) -> &str { &self.entry_point_id }
	/// The scope backing the running module. It stays open for the rest of the process.
	#[inline] pub fn scope( &self ) -> &Arc<IsolationScope> { &self.scope }

}

/// Every module of a completed run, in declaration order.
///
/// Dropping this does not release anything: modules keep running and keep
/// resolving through their scopes.
#[derive( Debug, Default )]
pub struct ActiveModules( Vec<ActiveModule> );

impl ActiveModules {
	#[inline] pub fn len( &self ) -> usize { self.0.len() }
	#[inline] pub fn is_empty( &self ) -> bool { self.0.is_empty() }
	#[inline] pub fn iter( &self ) -> std::slice::Iter<'_, ActiveModule> { self.0.iter() }
	#[inline] pub fn get( &self, index: usize ) -> Option<&ActiveModule> { self.0.get( index ) }
}

impl<'a> IntoIterator for &'a ActiveModules {
	type Item = &'a ActiveModule ;
	type IntoIter = std::slice::Iter<'a, ActiveModule> ;
	fn into_iter( self ) -> Self::IntoIter { self.0.iter() }
}

impl IntoIterator for ActiveModules {
	type Item = ActiveModule ;
	type IntoIter = std::vec::IntoIter<ActiveModule> ;
	fn into_iter( self ) -> Self::IntoIter { self.0.into_iter() }
}

/// A failed activation together with how many releases failed while cleaning it up.
type ActivationOutcome = Result<Arc<IsolationScope>, ( InvocationFailure, usize )> ;

/// Drives one startup run.
///
/// Holds everything a run needs explicitly: the bundle opener, the shared scope
/// every module falls back to, an optional parent resolver and the version string
/// used in logs.
pub struct Orchestrator {
	opener: Arc<dyn BundleOpener>,
	shared: Arc<SharedScope>,
	parent: Option<Arc<dyn Resolver>>,
	scheduling: Scheduling,
	version: String,
}

impl Orchestrator {

	pub fn new( opener: Arc<dyn BundleOpener>, shared: Arc<SharedScope> ) -> Self {
		Self {
			opener,
			shared,
			parent: None,
			scheduling: Scheduling::default(),
			version: crate::VERSION.to_string(),
		}
	}

	/// Sets the fallback tier consulted after a module's bundle and the shared scope.
	pub fn with_parent( mut self, parent: Arc<dyn Resolver> ) -> Self {
		self.parent = Some( parent );
		self
	}

	pub fn with_scheduling( mut self, scheduling: Scheduling ) -> Self {
		self.scheduling = scheduling ;
		self
	}

	pub fn with_version( mut self, version: impl Into<String> ) -> Self {
		self.version = version.into();
		self
	}

	#[inline] pub fn scheduling( &self ) -> Scheduling { self.scheduling }
	#[inline] pub fn version( &self ) -> &str { &self.version }
	#[inline] pub fn shared( &self ) -> &Arc<SharedScope> { &self.shared }

	/// Activates every enabled module in `descriptors`.
	///
	/// Disabled descriptors are dropped before anything else happens; they never
	/// get a scope and their packages are never opened.
	///
	/// # Errors
	/// Returns [`StartupAborted`] for the first failure observed. By then every scope
	/// created during this run has been released.
	pub fn run(
		&self,
		descriptors: impl IntoIterator<Item = ModuleDescriptor>,
		host: &HostContext,
	) -> Result<ActiveModules, StartupAborted> {

		let ( enabled, disabled ) = descriptors.into_iter()
			.partition::<Vec<_>, _>( ModuleDescriptor::is_enabled );

		disabled.iter().for_each(| descriptor | tracing::info!(
			package = %descriptor.package_location().display(),
			entry = descriptor.entry_point_id(),
			"skipping disabled agent"
		));

		tracing::info!( version = %self.version, agents = enabled.len(), "Starting agents..." );
		tracing::debug!( state = %RunState::Idle, "run state" );

		let result = match self.scheduling {
			Scheduling::Sequential => self.run_sequential( enabled, host ),
			Scheduling::Concurrent { max_workers } => concurrent::run( self, enabled, host, max_workers ),
		};

		match &result {
			Ok( active ) => {
				tracing::debug!( state = %RunState::Completed, "run state" );
				tracing::info!( agents = active.len(), "All agents started successfully" );
			},
			Err( aborted ) => {
				tracing::debug!( state = %RunState::Aborted, "run state" );
				tracing::error!(
					index = aborted.index + 1,
					package = %aborted.descriptor.package_location().display(),
					entry = aborted.descriptor.entry_point_id(),
					options = aborted.descriptor.options(),
					kind = %aborted.kind(),
					error = %aborted.cause,
					release_failures = aborted.release_failures,
					"Agent startup failed"
				);
			},
		}

		result

	}

	fn run_sequential( &self, enabled: Vec<ModuleDescriptor>, host: &HostContext ) -> Result<ActiveModules, StartupAborted> {

		let mut active = Vec::with_capacity( enabled.len() );

		for ( index, descriptor ) in enabled.into_iter().enumerate() {
			match self.activate_one( index, &descriptor, host ) {
				Ok( scope ) => active.push( ActiveModule::new( index, &descriptor, scope )),
				Err(( cause, release_failures )) => {
					tracing::debug!( state = %RunState::Aborting( index ), "run state" );
					let release_failures = release_failures + release_all( active.iter().map( ActiveModule::scope ));
					return Err( StartupAborted { index, descriptor, cause, release_failures });
				},
			}
		}

		Ok( ActiveModules( active ))

	}

	/// Opens the module's bundle, creates its scope and runs its entry point.
	///
	/// On failure the scope created here is already released.
	fn activate_one( &self, index: usize, descriptor: &ModuleDescriptor, host: &HostContext ) -> ActivationOutcome {

		tracing::debug!( state = %RunState::Activating( index ), "run state" );
		tracing::info!(
			index = index + 1,
			package = %descriptor.package_location().display(),
			entry = descriptor.entry_point_id(),
			options = descriptor.options(),
			"Starting agent"
		);

		let scope = self.open_scope( descriptor ).map_err(| cause | ( cause, 0 ))?;

		match invoke( &scope, descriptor.entry_point_id(), descriptor.options(), host ) {
			Ok(()) => {
				tracing::info!( index = index + 1, scope = %scope.id(), "Agent started" );
				Ok( scope )
			},
			Err( cause ) => {
				tracing::error!( index = index + 1, scope = %scope.id(), error = %cause, "Agent failed during startup" );
				Err(( cause, release_all( std::iter::once( &scope ))))
			},
		}

	}

	fn open_scope( &self, descriptor: &ModuleDescriptor ) -> Result<Arc<IsolationScope>, InvocationFailure> {
		let root = self.opener.open( descriptor.package_location() )?;
		IsolationScope::new(
			descriptor.package_location().display().to_string(),
			nev![ root ],
			Arc::clone( &self.shared ),
			self.parent.clone(),
		).pipe( Arc::new ).pipe( Ok )
	}

}

impl std::fmt::Debug for Orchestrator {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Orchestrator" )
			.field( "shared", &self.shared )
			.field( "parent", &self.parent.as_ref().map(| _ | "<resolver>" ))
			.field( "scheduling", &self.scheduling )
			.field( "version", &self.version )
			.finish_non_exhaustive()
	}
}

/// Releases every scope, logging failures instead of stopping at them.
///
/// Returns how many scopes failed to release cleanly.
fn release_all<'a>( scopes: impl IntoIterator<Item = &'a Arc<IsolationScope>> ) -> usize {
	scopes.into_iter()
		.filter_map(| scope | scope.release().err() )
		.inspect(| err | tracing::warn!( scope = %err.scope, error = %err, "failed to release scope" ))
		.count()
}
