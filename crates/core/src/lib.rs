pub mod error;
pub mod event;
pub mod route;
pub mod signer;
pub mod types;

pub use error::GatewayError;
pub use event::SlackEvent;
pub use route::{Method, RouteKind, RouteTable};
pub use signer::RequestSigner;
pub use types::{
    BodyDescriptor, BusEntry, CustomOrigin, Discriminator, EdgeEvent, EdgeRequest, EdgeResponse,
    HeaderEntry, Origin, Outcome,
};
