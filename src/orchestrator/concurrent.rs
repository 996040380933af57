use std::num::NonZeroUsize ;
use std::sync::Arc ;
use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
use std::sync::mpsc ;
use pipe_trait::Pipe ;

use crate::{ ActivationError, HostContext, InvocationFailure, IsolationScope, ModuleDescriptor };
use super::{ ActivationOutcome, ActiveModule, ActiveModules, Orchestrator, RunState, StartupAborted, release_all };



struct Failure {
	index: usize,
	cause: InvocationFailure,
	release_failures: usize,
}

/// Runs every activation on a bounded worker pool and collects completions in
/// arrival order.
///
/// The first failure cancels the pool as soon as its worker sees it: workers start nothing new, but
/// activations that are already running finish and their results are discarded.
/// The pool is drained before the abort is reported, so every scope the run
/// created is released by then.
pub(super) fn run(
	orchestrator: &Orchestrator,
	enabled: Vec<ModuleDescriptor>,
	host: &HostContext,
	max_workers: NonZeroUsize,
) -> Result<ActiveModules, StartupAborted> {

	let total = enabled.len();
	if total == 0 { return Ok( ActiveModules::default() ) }

	let next = AtomicUsize::new( 0 );
	let cancelled = AtomicBool::new( false );
	let ( sender, receiver ) = mpsc::channel::<( usize, ActivationOutcome )>();

	let mut slots: Vec<Option<Arc<IsolationScope>>> = vec![ None; total ];
	let mut failure: Option<Failure> = None ;
	let mut spawn_error: Option<std::io::Error> = None ;
	let mut late_release_failures = 0 ;

	std::thread::scope(| threads | {

		for worker in 0..max_workers.get().min( total ) {
			let sender = sender.clone();
			let ( next, cancelled, enabled ) = ( &next, &cancelled, &enabled );
			let spawned = std::thread::Builder::new()
				.name( format!( "startup-worker-{}", worker ))
				.spawn_scoped( threads, move || loop {
					if cancelled.load( Ordering::Acquire ) { break }
					let index = next.fetch_add( 1, Ordering::AcqRel );
					let Some( descriptor ) = enabled.get( index ) else { break };
					let outcome = orchestrator.activate_one( index, descriptor, host );
					if outcome.is_err() { cancelled.store( true, Ordering::Release ) }
					if sender.send(( index, outcome )).is_err() { break }
				});
			if let Err( err ) = spawned {
				tracing::warn!( worker, error = %err, "failed to spawn startup worker" );
				spawn_error.get_or_insert( err );
			}
		}

		// The loop below ends once every worker has exited and dropped its sender.
		drop( sender );

		while let Ok(( index, outcome )) = receiver.recv() {
			match ( outcome, failure.is_some() ) {
				( Ok( scope ), false ) => slots[index] = Some( scope ),
				( Ok( scope ), true ) => {
					tracing::debug!( index = index + 1, "discarding activation that finished after abort" );
					late_release_failures += release_all( std::iter::once( &scope ));
				},
				( Err(( cause, release_failures )), false ) => {
					cancelled.store( true, Ordering::Release );
					tracing::debug!( state = %RunState::Aborting( index ), "run state" );
					failure = Some( Failure { index, cause, release_failures });
				},
				( Err(( cause, release_failures )), true ) => {
					tracing::debug!( index = index + 1, error = %cause, "discarding failure observed after abort" );
					late_release_failures += release_failures ;
				},
			}
		}

	});

	// Only reachable without a reported failure if no worker could be spawned.
	if failure.is_none() {
		if let Some( index ) = slots.iter().position( Option::is_none ) {
			let cause = spawn_error.unwrap_or_else(|| std::io::Error::other( "startup worker exited early" ));
			failure = Some( Failure {
				index,
				cause: InvocationFailure::ActivationFailed {
					entry_point: enabled[index].entry_point_id().to_string(),
					cause: ActivationError::ThreadSpawn( cause ),
				},
				release_failures: 0,
			});
		}
	}

	match failure {
		None => Ok( enabled.iter()
			.zip( slots )
			.enumerate()
			.filter_map(|( index, ( descriptor, scope ))| scope.map(| scope | ActiveModule::new( index, descriptor, scope )))
			.collect::<Vec<_>>()
			.pipe( ActiveModules )
		),
		Some( Failure { index, cause, release_failures }) => {
			let release_failures = release_failures
				+ late_release_failures
				+ release_all( slots.iter().flatten() );
			let mut enabled = enabled ;
			let descriptor = enabled.swap_remove( index );
			Err( StartupAborted { index, descriptor, cause, release_failures })
		},
	}

}
