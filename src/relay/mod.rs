pub mod registry;
pub mod router;

pub use registry::{Address, ConnectionId, ConnectionRegistry};
pub use router::{deliver, route, Envelope, RouteOutcome, SignalKind};
