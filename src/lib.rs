//! Attaches independently packaged extension modules ("agents") to a host process
//! without letting them see each other's code.
//!
//! Every module gets its own [`IsolationScope`], which resolves names child-first:
//! the module's own bundle wins over the process-wide [`SharedScope`], which in
//! turn wins over an optional fallback parent. A module's entry point is run by
//! [`invoke`] on a thread created for that call alone, and the [`Orchestrator`]
//! starts a whole list of modules all-or-nothing: if one of them fails, every
//! module started so far is released again and the run reports a single
//! [`StartupAborted`].
//!
//! # Core Concepts
//!
//! - [`ModuleDescriptor`]: which bundle to open, which unit to enter, the option
//! 	string for it and whether it is enabled at all.
//!
//! - [`Unit`]: a named piece of module code exporting functions. The entry unit
//! 	of a module exports [`ACTIVATION_FUNCTION`] with the signature
//! 	[`FunctionSignature::activation`]. [`NativeUnit`] builds one from closures.
//!
//! - [`UnitProvider`]: one bundle of units. [`UnitMap`] keeps them in memory,
//! 	[`component::ComponentBundle`] serves the exported instances of a WASM component.
//!
//! - [`BundleOpener`]: turns a package location into a fresh provider for one
//! 	module. [`component::ComponentOpener`] opens WASM component files.
//!
//! - [`HostContext`]: the opaque handle to the host that every activation receives.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc ;
//! use agent_isolator::{
//! 	BundleError, HostContext, ModuleDescriptor, NativeUnit, Orchestrator,
//! 	SharedScope, UnitMap, UnitProvider,
//! };
//!
//! let opener = | _: &std::path::Path | -> Result<Box<dyn UnitProvider>, BundleError> {
//! 	Ok( Box::new( UnitMap::new().with_unit(
//! 		NativeUnit::new( "demo:agent/entry" )
//! 			.with_activation(| args | {
//! 				assert_eq!( args.options, "verbose" );
//! 				Ok(())
//! 			})
//! 			.shared()
//! 	)))
//! };
//!
//! let orchestrator = Orchestrator::new( Arc::new( opener ), Arc::new( SharedScope::empty() ));
//! let host = HostContext::new( "host" );
//!
//! let active = orchestrator.run([
//! 	ModuleDescriptor::enabled( "agents/a.wasm", "demo:agent/entry", "verbose" )?,
//! 	ModuleDescriptor::enabled( "agents/b.wasm", "demo:agent/entry", "verbose" )?,
//! ], &host )?;
//!
//! assert_eq!( active.len(), 2 );
//! assert!( active.iter().all(| module | module.scope().is_open() ));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod host_context ;
mod unit ;
mod provider ;
mod scope ;
mod shared_scope ;
mod descriptor ;
mod bundle ;
mod invoker ;
mod orchestrator ;
pub mod component ;
pub mod config ;
pub mod bootstrap ;

#[doc( no_inline )]
pub use wasmtime::Engine ;
#[doc( no_inline )]
pub use wasmtime::component::{ Linker, ResourceTable };
#[doc( no_inline )]
pub use nonempty_collections::{ NEVec, nev };

pub use host_context::HostContext ;
pub use unit::{ Unit, NativeUnit, ActivationArgs, ActivationError, FunctionSignature, ValueKind, ACTIVATION_FUNCTION };
pub use provider::{ UnitProvider, UnitMap, ProviderError };
pub use scope::{ IsolationScope, ScopeId, Resolver, ResolveError, ReleaseError };
pub use shared_scope::SharedScope ;
pub use descriptor::{ ModuleDescriptor, EnabledSource, InvalidDescriptor };
pub use bundle::{ BundleOpener, BundleError };
pub use invoker::{ invoke, InvocationFailure, InvocationFailureKind };
pub use orchestrator::{ Orchestrator, Scheduling, RunState, ActiveModule, ActiveModules, StartupAborted };

/// Version of this crate, as logged at the start of every run.
pub const VERSION: &str = env!( "CARGO_PKG_VERSION" );
