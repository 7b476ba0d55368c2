mod http;

pub use http::HttpAuthorizationServer;
