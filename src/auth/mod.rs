/// Authentication module
///
/// Access/refresh token issuance, refresh-token hashing, and the session
/// engine that composes them with a user repository.

mod claims;
mod hasher;
mod service;
mod token;

pub use claims::Claims;
pub use hasher::{CredentialHasher, DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST};
pub use service::SessionService;
pub use token::{TokenManager, TokenPair, REFRESH_TOKEN_LENGTH};
