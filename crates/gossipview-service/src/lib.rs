mod http;
mod traits;

pub use http::{HttpService, GOSSIP_TIMEOUT};
pub use traits::{GossipSource, ServerConfig, ServiceError};
