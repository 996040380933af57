use std::any::Any ;
use std::sync::Arc ;
use std::sync::atomic::{ AtomicU64, Ordering };



static NEXT_TOKEN: AtomicU64 = AtomicU64::new( 1 );

/// The opaque value a host hands to every module's activation function.
///
/// The isolator never looks inside. Cloning produces another handle to the same
/// payload; the `token` stays the same across clones so that modules which cannot
/// hold Rust values (such as WebAssembly components) can still refer to it.
#[derive( Clone )]
pub struct HostContext {
	token: u64,
	payload: Arc<dyn Any + Send + Sync>,
}

impl HostContext {

	/// Wraps a host value into a context handle with a fresh token.
	pub fn new<T: Any + Send + Sync>( payload: T ) -> Self {
		Self::from_arc( Arc::new( payload ))
	}

	/// Same as [`HostContext::new`] for a payload the host already shares.
	pub fn from_arc( payload: Arc<dyn Any + Send + Sync> ) -> Self {
		Self { token: NEXT_TOKEN.fetch_add( 1, Ordering::Relaxed ), payload }
	}

	/// Process-unique number identifying this handle.
	#[inline] pub fn token( &self ) -> u64 { self.token }

	/// Borrows the payload if it is a `T`.
	#[inline] pub fn downcast_ref<T: Any>( &self ) -> Option<&T> { self.payload.downcast_ref::<T>() }

	/// Whether two handles refer to the same host payload.
	#[inline] pub fn same_as( &self, other: &Self ) -> bool { Arc::ptr_eq( &self.payload, &other.payload ) }

}

impl std::fmt::Debug for HostContext {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "HostContext" )
			.field( "token", &self.token )
			.field( "payload", &"<opaque>" )
			.finish()
	}
}

#[cfg( test )]
mod tests {
	use super::HostContext ;

	#[test]
	fn clones_share_token_and_payload() {
		let context = HostContext::new( 7_u32 );
		let clone = context.clone();
		assert_eq!( context.token(), clone.token() );
		assert!( context.same_as( &clone ));
		assert_eq!( clone.downcast_ref::<u32>(), Some( &7 ));
	}

	#[test]
	fn distinct_contexts_get_distinct_tokens() {
		let first = HostContext::new( () );
		let second = HostContext::new( () );
		assert_ne!( first.token(), second.token() );
		assert!( !first.same_as( &second ));
	}
}
