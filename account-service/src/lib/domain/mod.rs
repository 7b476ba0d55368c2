pub mod account;
pub mod errors;
pub mod oauth;
pub mod role;
