//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every pluggable implementation (currently the storage backends) provides a
/// `Registry` struct implementing this trait, so that the binary can build a
/// name-to-factory map without hard-coding each backend.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. `"memory"` for `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
