//! Entry-point invocation.
//!
//! [`invoke`] resolves a module's entry unit through its scope, checks that the
//! unit exports the activation function with the expected signature, then runs
//! that function on a thread created for this call alone. Whatever goes wrong on
//! that thread, including a panic, comes back as a value.

use std::any::Any ;
use std::panic::AssertUnwindSafe ;
use std::sync::Arc ;
use thiserror::Error ;

use crate::{
	ActivationArgs, ActivationError, BundleError, FunctionSignature, HostContext,
	IsolationScope, Resolver, ResolveError, ACTIVATION_FUNCTION,
};



/// Why a module's entry point could not be run to completion.
#[derive( Error, Debug )]
pub enum InvocationFailure {
	/// The module's package could not be opened, so no scope was created.
	#[error( "Bundle Unavailable: {0}" )] BundleUnavailable( #[from] BundleError ),
	/// The entry point name did not resolve through the module's scope.
	#[error( "Entry Point Missing: {entry_point}: {source}" )]
	EntryPointMissing { entry_point: String, #[source] source: ResolveError },
	/// The entry unit has no activation function with the expected signature.
	#[error( "Activation Signature Missing: {entry_point} does not export `{}: {}`{}",
		ACTIVATION_FUNCTION,
		FunctionSignature::activation(),
		.found.as_ref().map(| found | format!( " (found `{}`)", found )).unwrap_or_default()
	)]
	ActivationSignatureMissing { entry_point: String, found: Option<FunctionSignature> },
	/// The activation function ran and failed.
	#[error( "Activation Failed: {entry_point}: {cause}" )]
	ActivationFailed { entry_point: String, #[source] cause: ActivationError },
}

/// The four kinds of [`InvocationFailure`], without their payloads.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum InvocationFailureKind {
	BundleUnavailable,
	EntryPointMissing,
	ActivationSignatureMissing,
	ActivationFailed,
}

impl InvocationFailure {
	/// Which of the four failures this is.
	pub fn kind( &self ) -> InvocationFailureKind {
		match self {
			Self::BundleUnavailable( _ ) => InvocationFailureKind::BundleUnavailable,
			Self::EntryPointMissing { .. } => InvocationFailureKind::EntryPointMissing,
			Self::ActivationSignatureMissing { .. } => InvocationFailureKind::ActivationSignatureMissing,
			Self::ActivationFailed { .. } => InvocationFailureKind::ActivationFailed,
		}
	}
}

impl std::fmt::Display for InvocationFailureKind {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "{:?}", self )}
}

/// Runs the activation function of `entry_point_id` as resolved through `scope`.
///
/// Blocks until the dedicated activation thread has finished. The thread is never
/// reused, so nothing an activation leaves bound to its thread can reach another
/// module or the caller.
///
/// # Errors
/// - [`InvocationFailure::EntryPointMissing`] if the name does not resolve
/// - [`InvocationFailure::ActivationSignatureMissing`] if the unit lacks
/// 	`agentmain( options: string, host: host-context )`
/// - [`InvocationFailure::ActivationFailed`] if the activation function failed or panicked
pub fn invoke(
	scope: &Arc<IsolationScope>,
	entry_point_id: &str,
	options: &str,
	host: &HostContext,
) -> Result<(), InvocationFailure> {

	let unit = scope.resolve( entry_point_id )
		.map_err(| source | InvocationFailure::EntryPointMissing { entry_point: entry_point_id.to_string(), source })?;

	match unit.signature( ACTIVATION_FUNCTION ) {
		Some( signature ) if signature == FunctionSignature::activation() => {},
		found => return Err( InvocationFailure::ActivationSignatureMissing { entry_point: entry_point_id.to_string(), found }),
	}

	let thread_name = format!( "activation-{}", scope.id() );
	tracing::debug!( scope = %scope.id(), entry = entry_point_id, thread = %thread_name, "spawning activation thread" );

	let args = ActivationArgs { options, host, scope };
	let outcome = std::thread::scope(| threads | {
		std::thread::Builder::new()
			.name( thread_name )
			.spawn_scoped( threads, || activate( unit.as_ref(), args ))
			.map_err( ActivationError::ThreadSpawn )?
			.join()
			.unwrap_or_else(| payload | Err( ActivationError::Panicked( panic_message( payload.as_ref() ))))
	});

	outcome.map_err(| cause | InvocationFailure::ActivationFailed { entry_point: entry_point_id.to_string(), cause })

}

fn activate( unit: &dyn crate::Unit, args: ActivationArgs<'_> ) -> Result<(), ActivationError> {
	std::panic::catch_unwind( AssertUnwindSafe(|| unit.call( ACTIVATION_FUNCTION, args )))
		.unwrap_or_else(| payload | Err( ActivationError::Panicked( panic_message( payload.as_ref() ))))
}

fn panic_message( payload: &( dyn Any + Send )) -> String {
	match ( payload.downcast_ref::<&str>(), payload.downcast_ref::<String>() ) {
		( Some( message ), _ ) => ( *message ).to_string(),
		( None, Some( message )) => message.clone(),
		( None, None ) => "<non-string panic payload>".to_string(),
	}
}

#[cfg( test )]
mod tests {
	use super::panic_message ;

	#[test]
	fn panic_payloads_are_described() {
		let text: Box<dyn std::any::Any + Send> = Box::new( "static text" );
		let owned: Box<dyn std::any::Any + Send> = Box::new( String::from( "owned text" ));
		let other: Box<dyn std::any::Any + Send> = Box::new( 42_u8 );
		assert_eq!( panic_message( text.as_ref() ), "static text" );
		assert_eq!( panic_message( owned.as_ref() ), "owned text" );
		assert_eq!( panic_message( other.as_ref() ), "<non-string panic payload>" );
	}
}
