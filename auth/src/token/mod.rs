pub mod compare;
pub mod entropy;
pub mod issuer;

pub use compare::constant_time_eq;
pub use entropy::EntropySource;
pub use entropy::OsEntropy;
pub use issuer::IssuedToken;
pub use issuer::TokenIssuer;
pub use issuer::TokenKind;
pub use issuer::TokenValidation;
pub use issuer::TokenWindows;
