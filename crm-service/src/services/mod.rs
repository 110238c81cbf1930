pub mod audit;
pub mod auth;
pub mod database;
pub mod jwt;

pub use audit::{AuditRecorder, AuditSink, PgAuditSink};
pub use auth::AuthService;
pub use database::{AuditFilter, Database};
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims, TokenResponse};
