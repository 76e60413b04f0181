// Adapters layer: concrete implementations for external systems (backend HTTP API, session file).

pub mod http;
pub mod session_file;

pub use http::BackendClient;
pub use session_file::FileSessionStore;
