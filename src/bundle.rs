use std::path::{ Path, PathBuf };
use thiserror::Error ;

use crate::UnitProvider ;



/// Failure to open a module's package.
#[derive( Error, Debug )]
pub enum BundleError {
	/// Nothing readable exists at the package location.
	#[error( "Bundle Not Found: {}", .0.display() )] NotFound( PathBuf ),
	/// The package could not be read.
	#[error( "Failed to read bundle {}: {source}", .path.display() )]
	Io { path: PathBuf, #[source] source: std::io::Error },
	/// The package was read but is not a loadable bundle.
	#[error( "Invalid Bundle {}: {reason}", .path.display() )]
	Invalid { path: PathBuf, reason: String },
}

/// Turns a package location into the provider backing a module's scope.
///
/// The orchestrator calls this once per enabled module, right before creating the
/// module's [`IsolationScope`]( crate::IsolationScope ). Each call must produce a
/// fresh provider; two modules must never share bundle state.
pub trait BundleOpener: Send + Sync {

	/// Opens the bundle at `location`.
	///
	/// # Errors
	/// Returns a [`BundleError`] when the bundle is missing or unreadable.
	fn open( &self, location: &Path ) -> Result<Box<dyn UnitProvider>, BundleError> ;

}

impl<F> BundleOpener for F
where
	F: Fn( &Path ) -> Result<Box<dyn UnitProvider>, BundleError> + Send + Sync,
{
	fn open( &self, location: &Path ) -> Result<Box<dyn UnitProvider>, BundleError> { self( location ) }
}
