/// Stable classification of domain failures.
///
/// Every domain error maps onto exactly one kind; inbound adapters translate
/// kinds into transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Expired,
    InvalidCredentials,
    InvalidToken,
    NotVerified,
    Forbidden,
    ExternalService,
    ReauthorizationRequired,
    Internal,
}
