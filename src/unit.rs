//! Resolvable code units and their functions.
//!
//! A [`Unit`] is the thing an [`IsolationScope`]( crate::IsolationScope ) hands out
//! when a name is resolved. Units are shared behind an `Arc` so that identity can
//! be compared with [`Arc::ptr_eq`] and a resolved unit can outlive the lookup.

use std::collections::HashMap ;
use std::sync::Arc ;
use thiserror::Error ;

use crate::{ HostContext, IsolationScope };



/// Name of the function every module's entry unit must export.
pub const ACTIVATION_FUNCTION: &str = "agentmain" ;

/// Kind of a single parameter or result value.
#[derive( Debug, Clone, PartialEq, Eq, Hash )]
pub enum ValueKind {
	Bool,
	String,
	U32,
	U64,
	/// The host context handle. Components see it as a `u64` token.
	HostContext,
	/// Anything the isolator has no use for, named for diagnostics.
	Other( String ),
}

impl std::fmt::Display for ValueKind {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self {
			Self::Bool => write!( f, "bool" ),
			Self::String => write!( f, "string" ),
			Self::U32 => write!( f, "u32" ),
			Self::U64 => write!( f, "u64" ),
			Self::HostContext => write!( f, "host-context" ),
			Self::Other( name ) => write!( f, "{}", name ),
		}
	}
}

/// Parameter and result kinds of a function exported by a [`Unit`].
#[derive( Debug, Clone, PartialEq, Eq, Hash )]
pub struct FunctionSignature {
	params: Vec<ValueKind>,
	result: Option<ValueKind>,
}

impl FunctionSignature {

	/// Creates a signature from its parameter kinds and optional result kind.
	pub fn new( params: impl IntoIterator<Item = ValueKind>, result: Option<ValueKind> ) -> Self {
		Self { params: params.into_iter().collect(), result }
	}

	/// The only signature accepted for [`ACTIVATION_FUNCTION`]:
	/// `( options: string, host: host-context )` returning nothing.
	pub fn activation() -> Self {
		Self::new([ ValueKind::String, ValueKind::HostContext ], None )
	}

	#[inline] pub fn params( &self ) -> &[ValueKind] { &self.params }
	#[inline] pub fn result( &self ) -> Option<&ValueKind> { self.result.as_ref() }

}

impl std::fmt::Display for FunctionSignature {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "func(" )?;
		for ( index, param ) in self.params.iter().enumerate() {
			if index > 0 { write!( f, ", " )?; }
			write!( f, "{}", param )?;
		}
		write!( f, ")" )?;
		match &self.result {
			Some( result ) => write!( f, " -> {}", result ),
			None => Ok(()),
		}
	}
}

/// Arguments handed to an activation function.
///
/// `scope` is the scope the module was loaded through. Activation code that needs
/// to resolve further names, now or from threads it spawns later, resolves them
/// through this scope rather than through any ambient state.
#[derive( Clone, Copy )]
pub struct ActivationArgs<'a> {
	pub options: &'a str,
	pub host: &'a HostContext,
	pub scope: &'a Arc<IsolationScope>,
}

impl std::fmt::Debug for ActivationArgs<'_> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ActivationArgs" )
			.field( "options", &self.options )
			.field( "host", &self.host )
			.field( "scope", &self.scope.id() )
			.finish()
	}
}

/// A failure raised while an activation function ran.
#[derive( Error, Debug )]
pub enum ActivationError {
	/// The activation function reported a failure of its own.
	#[error( "{0}" )] Failed( String ),
	/// The activation function, or something it called, panicked.
	#[error( "Panicked: {0}" )] Panicked( String ),
	/// The WASM function trapped.
	#[error( "Runtime Exception: {0}" )] RuntimeException( wasmtime::Error ),
	/// The arguments did not fit the function that was called.
	#[error( "Invalid Argument List: {0}" )] InvalidArgumentList( String ),
	/// The unit has no function of that name.
	#[error( "Unknown Function: {0}" )] UnknownFunction( String ),
	/// The bundle backing the unit was released.
	#[error( "Bundle Closed" )] BundleClosed,
	/// The dedicated activation thread could not be started.
	#[error( "Thread Spawn Failed: {0}" )] ThreadSpawn( #[source] std::io::Error ),
	/// Any other error raised by module code.
	#[error( transparent )] Other( Box<dyn std::error::Error + Send + Sync> ),
}

impl ActivationError {
	/// A [`ActivationError::Failed`] carrying `message`.
	pub fn failed( message: impl Into<String> ) -> Self { Self::Failed( message.into() ) }
}

/// A named, resolvable unit of module code.
///
/// Implementations must be cheap to share: a scope memoises the `Arc` it first
/// resolved and hands out clones of it from then on.
pub trait Unit: Send + Sync {

	/// The fully qualified name this unit was resolved under.
	fn name( &self ) -> &str ;

	/// The signature of `function`, or `None` if the unit does not export it.
	fn signature( &self, function: &str ) -> Option<FunctionSignature> ;

	/// Calls `function` with the activation arguments.
	///
	/// # Errors
	/// Returns whatever failure the function raised.
	fn call( &self, function: &str, args: ActivationArgs<'_> ) -> Result<(), ActivationError> ;

}

impl std::fmt::Debug for dyn Unit {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Unit" ).field( "name", &self.name() ).finish_non_exhaustive()
	}
}

type NativeBody = Arc<dyn Fn( ActivationArgs<'_> ) -> Result<(), ActivationError> + Send + Sync> ;

struct NativeFunction {
	signature: FunctionSignature,
	body: NativeBody,
}

/// A [`Unit`] implemented by Rust closures.
///
/// Used for platform units registered in the [`SharedScope`]( crate::SharedScope )
/// and for modules linked into the host binary itself.
///
/// ```
/// use agent_isolator::{ NativeUnit, Unit, ACTIVATION_FUNCTION, FunctionSignature };
///
/// let unit = NativeUnit::new( "demo:agent/entry" )
/// 	.with_activation(| args | {
/// 		assert!( args.options.is_empty() );
/// 		Ok(())
/// 	});
/// assert_eq!( unit.signature( ACTIVATION_FUNCTION ), Some( FunctionSignature::activation() ));
/// ```
pub struct NativeUnit {
	name: String,
	functions: HashMap<String, NativeFunction>,
}

impl NativeUnit {

	/// A unit named `name` exporting no functions yet.
	pub fn new( name: impl Into<String> ) -> Self {
		Self { name: name.into(), functions: HashMap::with_capacity( 1 ) }
	}

	/// Adds a function under `name` with an explicit signature.
	pub fn with_function<F>( mut self, name: impl Into<String>, signature: FunctionSignature, body: F ) -> Self
	where
		F: Fn( ActivationArgs<'_> ) -> Result<(), ActivationError> + Send + Sync + 'static,
	{
		self.functions.insert( name.into(), NativeFunction { signature, body: Arc::new( body ) });
		self
	}

	/// Adds the [`ACTIVATION_FUNCTION`] with the activation signature.
	pub fn with_activation<F>( self, body: F ) -> Self
	where
		F: Fn( ActivationArgs<'_> ) -> Result<(), ActivationError> + Send + Sync + 'static,
	{
		self.with_function( ACTIVATION_FUNCTION, FunctionSignature::activation(), body )
	}

	/// Wraps the unit for handing out through a provider.
	pub fn shared( self ) -> Arc<dyn Unit> { Arc::new( self ) }

}

impl Unit for NativeUnit {

	fn name( &self ) -> &str { &self.name }

	fn signature( &self, function: &str ) -> Option<FunctionSignature> {
		self.functions.get( function ).map(| function | function.signature.clone() )
	}

	fn call( &self, function: &str, args: ActivationArgs<'_> ) -> Result<(), ActivationError> {
		let function = self.functions.get( function )
			.ok_or_else(|| ActivationError::UnknownFunction( format!( "{}:{}", self.name, function )))?;
		( function.body )( args )
	}

}

impl std::fmt::Debug for NativeUnit {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "NativeUnit" )
			.field( "name", &self.name )
			.field( "functions", &self.functions.keys().collect::<Vec<_>>() )
			.finish()
	}
}

#[cfg( test )]
mod tests {
	use super::*;

	#[test]
	fn signature_display_reads_like_wit() {
		let signature = FunctionSignature::new([ ValueKind::String, ValueKind::U64 ], Some( ValueKind::Bool ));
		assert_eq!( signature.to_string(), "func(string, u64) -> bool" );
		assert_eq!( FunctionSignature::activation().to_string(), "func(string, host-context)" );
	}

	#[test]
	fn native_unit_reports_only_declared_functions() {
		let unit = NativeUnit::new( "a" )
			.with_function( "helper", FunctionSignature::new([], None ), | _ | Ok(()) );
		assert!( unit.signature( ACTIVATION_FUNCTION ).is_none() );
		assert_eq!( unit.signature( "helper" ), Some( FunctionSignature::new([], None )));
	}
}
