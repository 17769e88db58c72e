/// Authentication and tenant resolution
///
/// Local accounts sign in with a password and receive an HS256 session
/// token. Users of the external identity provider exchange the provider's
/// token for a local one once their subject is mapped to a user of a site.

pub mod error;
pub mod external;
pub mod extractor;
pub mod jwks;
pub mod password;
pub mod service;
pub mod tenant_code;
pub mod token;

pub use error::AuthError;
pub use external::{ExternalIdentityService, ExternalLogin, ExternalSync};
pub use extractor::{AdminUser, AuthUser};
pub use jwks::{ExternalClaims, ExternalTokenValidator, HttpKeySetProvider, KeySetProvider, StaticKeySetProvider};
pub use service::{AuthService, AuthSession, CreateUserRequest, LoginRequest, RegisterRequest};
pub use token::{SessionClaims, TokenService};
