mod http;
pub mod messages;

pub use http::HttpNotifier;
