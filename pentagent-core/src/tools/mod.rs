//! Tool backends: registry, target resolution, argument preparation and invocation

pub mod arguments;
pub mod invoker;
pub mod registry;
pub mod resolve;

pub use arguments::{ArgumentContext, prepare_arguments, with_scheme};
pub use invoker::{OperationInfo, PhaseContext, PhaseOperations, ToolInvoker};
pub use registry::{BackendEndpoint, BackendRegistry, BackendSpec, known_operations};
pub use resolve::{ResolvedTarget, host_of, resolve_to_address, resolve_with_timeout};
