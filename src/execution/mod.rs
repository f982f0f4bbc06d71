//! Execution layer: the dispatch pipeline and the transports it drives.

pub mod dispatch;
pub mod transport;

pub use dispatch::{DispatchPhase, Dispatcher, ResolvedProvider};
pub use transport::{
    BlockingHttpTransport, HttpTransport, HttpTransportRequest, HttpTransportResponse,
    ReqwestBlockingTransport, ReqwestTransport, TransportError, TransportErrorKind,
    build_http_client,
};
