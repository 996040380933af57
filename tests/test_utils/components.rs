#[allow( dead_code )]
mod components {

	use std::path::PathBuf ;

	/// A component exporting `demo:agent/entry` whose `agentmain` runs `body`.
	///
	/// Inside `body` the options string is `( local 0, local 1 )` and the host token is `local 2`.
	pub fn entry_component( body: &str ) -> String {
		format!( r#"
(component
	(core module $agent
		(memory (export "memory") 1)
		(func (export "realloc") (param i32 i32 i32 i32) (result i32) i32.const 16)
		(func (export "agentmain") (param i32 i32 i64) {body})
	)
	(core instance $agent_instance (instantiate $agent))
	(func $agentmain (param "options" string) (param "host" u64)
		(canon lift (core func $agent_instance "agentmain")
			(memory (core memory $agent_instance "memory"))
			(realloc (core func $agent_instance "realloc"))
		)
	)
	(instance $entry (export "agentmain" (func $agentmain)))
	(export "demo:agent/entry" (instance $entry))
)
"# )
	}

	/// Traps unless it receives exactly `options_len` bytes of options and the given host token.
	pub fn checking_component( options_len: usize, token: u64 ) -> String {
		entry_component( &format!(
			"local.get 1 i32.const {} i32.ne if unreachable end local.get 2 i64.const {} i64.ne if unreachable end",
			options_len,
			token as i64,
		))
	}

	pub fn succeeding_component() -> String { entry_component( "" ) }

	pub fn trapping_component() -> String { entry_component( "unreachable" ) }

	/// `agentmain` takes only the options string.
	pub fn wrong_signature_component() -> String {
		r#"
(component
	(core module $agent
		(memory (export "memory") 1)
		(func (export "realloc") (param i32 i32 i32 i32) (result i32) i32.const 16)
		(func (export "agentmain") (param i32 i32))
	)
	(core instance $agent_instance (instantiate $agent))
	(func $agentmain (param "options" string)
		(canon lift (core func $agent_instance "agentmain")
			(memory (core memory $agent_instance "memory"))
			(realloc (core func $agent_instance "realloc"))
		)
	)
	(instance $entry (export "agentmain" (func $agentmain)))
	(export "demo:agent/entry" (instance $entry))
)
"#.to_string()
	}

	/// Exports `demo:agent/entry` without any `agentmain`.
	pub fn no_activation_component() -> String {
		r#"
(component
	(core module $agent
		(func (export "premain"))
	)
	(core instance $agent_instance (instantiate $agent))
	(func $premain (canon lift (core func $agent_instance "premain")))
	(instance $entry (export "premain" (func $premain)))
	(export "demo:agent/entry" (instance $entry))
)
"#.to_string()
	}

	/// Writes `wat` to `name` inside `dir`.
	pub fn write_component( dir: &tempfile::TempDir, name: &str, wat: &str ) -> PathBuf {
		let path = dir.path().join( name );
		std::fs::write( &path, wat ).unwrap();
		path
	}

}
