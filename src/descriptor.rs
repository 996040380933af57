//! Module descriptors.

use std::path::{ Path, PathBuf };
use thiserror::Error ;



/// A malformed module entry.
///
/// Raised while building a [`ModuleDescriptor`]; a descriptor that exists is valid.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum InvalidDescriptor {
	#[error( "package location must be a non-empty path" )] EmptyPackageLocation,
	#[error( "entry point must be a non-empty name" )] EmptyEntryPoint,
	#[error( "enabled must be a boolean, found {0}" )] InvalidEnabled( String ),
}

/// How the `enabled` flag appeared in the source a descriptor was built from.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum EnabledSource<'a> {
	/// The flag was left out; modules are enabled by default.
	Absent,
	Bool( bool ),
	/// A textual flag: `true`, `yes` and `1` (any case) enable, anything else disables.
	Text( &'a str ),
	/// Some other kind of value, described for the error message.
	Other( &'a str ),
}

impl EnabledSource<'_> {

	/// Interprets the flag.
	///
	/// # Errors
	/// Returns [`InvalidDescriptor::InvalidEnabled`] for [`EnabledSource::Other`].
	pub fn interpret( self ) -> Result<bool, InvalidDescriptor> {
		match self {
			Self::Absent => Ok( true ),
			Self::Bool( enabled ) => Ok( enabled ),
			Self::Text( text ) => Ok( matches!(
				text.trim().to_ascii_lowercase().as_str(),
				"true" | "yes" | "1"
			)),
			Self::Other( kind ) => Err( InvalidDescriptor::InvalidEnabled( kind.to_string() )),
		}
	}

}

/// Identifies one extension module to attach.
///
/// Immutable once built. Only enabled descriptors are ever activated.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct ModuleDescriptor {
	/// Location of the module's self-contained bundle
	package_location: PathBuf,
	/// Fully qualified name of the unit holding the activation function
	entry_point_id: String,
	/// Passed to the module unparsed
	options: String,
	enabled: bool,
}

impl ModuleDescriptor {

	/// Builds a descriptor, trimming the location and the entry point.
	///
	/// # Errors
	/// Fails if either the package location or the entry point is empty after
	/// trimming, or if the `enabled` flag is not a boolean.
	pub fn new(
		package_location: &str,
		entry_point_id: &str,
		options: impl Into<String>,
		enabled: EnabledSource<'_>,
	) -> Result<Self, InvalidDescriptor> {

		let package_location = package_location.trim();
		if package_location.is_empty() { return Err( InvalidDescriptor::EmptyPackageLocation ) }

		let entry_point_id = entry_point_id.trim();
		if entry_point_id.is_empty() { return Err( InvalidDescriptor::EmptyEntryPoint ) }

		Ok( Self {
			package_location: PathBuf::from( package_location ),
			entry_point_id: entry_point_id.to_string(),
			options: options.into(),
			enabled: enabled.interpret()?,
		})

	}

	/// Shorthand for an enabled descriptor.
	///
	/// # Errors
	/// See [`ModuleDescriptor::new`].
	pub fn enabled(
		package_location: &str,
		entry_point_id: &str,
		options: impl Into<String>,
	) -> Result<Self, InvalidDescriptor> {
		Self::new( package_location, entry_point_id, options, EnabledSource::Absent )
	}

	#[inline] pub fn package_location( &self ) -> &Path { &self.package_location }
	#[inline] pub fn entry_point_id( &self ) -> &str { &self.entry_point_id }
	#[inline] pub fn options( &self ) -> &str { &self.options }
	#[inline] pub fn is_enabled( &self ) -> bool { self.enabled }

}

impl std::fmt::Display for ModuleDescriptor {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{} ({})", self.entry_point_id, self.package_location.display() )
	}
}

#[cfg( test )]
mod tests {
	use super::{ EnabledSource, InvalidDescriptor, ModuleDescriptor };

	#[test]
	fn trims_location_and_entry_point() {
		let descriptor = ModuleDescriptor::enabled( "  agents/a.wasm ", "\tdemo:a/entry\n", " raw " ).unwrap();
		assert_eq!( descriptor.package_location().to_str(), Some( "agents/a.wasm" ));
		assert_eq!( descriptor.entry_point_id(), "demo:a/entry" );
		assert_eq!( descriptor.options(), " raw " );
		assert!( descriptor.is_enabled() );
	}

	#[test]
	fn rejects_blank_required_fields() {
		assert_eq!( ModuleDescriptor::enabled( "   ", "x", "" ), Err( InvalidDescriptor::EmptyPackageLocation ));
		assert_eq!( ModuleDescriptor::enabled( "a.wasm", "  ", "" ), Err( InvalidDescriptor::EmptyEntryPoint ));
	}

	#[test]
	fn textual_enabled_flags() {
		for text in [ "true", "TRUE", "Yes", "1", " yes " ] {
			assert_eq!( EnabledSource::Text( text ).interpret(), Ok( true ), "{text}" );
		}
		for text in [ "false", "no", "0", "", "enabled", "on" ] {
			assert_eq!( EnabledSource::Text( text ).interpret(), Ok( false ), "{text}" );
		}
	}

	#[test]
	fn absent_flag_defaults_to_enabled() {
		assert_eq!( EnabledSource::Absent.interpret(), Ok( true ));
		assert_eq!( EnabledSource::Bool( false ).interpret(), Ok( false ));
	}

	#[test]
	fn non_boolean_flag_is_invalid() {
		assert_eq!(
			ModuleDescriptor::new( "a.wasm", "x", "", EnabledSource::Other( "a sequence" )),
			Err( InvalidDescriptor::InvalidEnabled( "a sequence".to_string() )),
		);
	}
}
