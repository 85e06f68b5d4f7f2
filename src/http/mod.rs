pub mod mock;
pub mod transport;
pub mod types;

pub use mock::{MockReply, MockTransport};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{HttpRequest, HttpResponse, TransportError};
