//! Authentication flows: login, refresh rotation, logout.

use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::auth::{LoginRequest, RefreshRequest};
use crate::models::{AuditAction, AuditRecord, RefreshToken, User};
use crate::services::{AuditRecorder, Database, JwtService, TokenResponse};
use crate::utils::{Password, PasswordHashString, verify_password};

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: JwtService,
    audit: AuditRecorder,
    refresh_token_expiry_days: i64,
}

impl AuthService {
    pub fn new(
        db: Database,
        jwt: JwtService,
        audit: AuditRecorder,
        refresh_token_expiry_days: i64,
    ) -> Self {
        Self {
            db,
            jwt,
            audit,
            refresh_token_expiry_days,
        }
    }

    /// Login with email and password.
    ///
    /// Unknown email, wrong password, inactive account, and inactive
    /// tenant all fail identically.
    pub async fn login(&self, req: LoginRequest) -> Result<TokenResponse, AppError> {
        let user = self
            .db
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Unknown email")))?;

        if !user.active {
            return Err(AppError::Unauthenticated(anyhow::anyhow!("Account inactive")));
        }

        let tenant = self
            .db
            .find_tenant_by_id(user.tenant_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Tenant not found")))?;

        if !tenant.active {
            return Err(AppError::Unauthenticated(anyhow::anyhow!("Tenant inactive")));
        }

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| AppError::Unauthenticated(anyhow::anyhow!("Invalid credentials")))?;

        let tokens = self.issue_token_pair(&user).await?;

        tracing::info!(user_id = %user.user_id, "User logged in");

        self.audit.record(AuditRecord::new(
            user.tenant_id,
            Some(user.user_id),
            AuditAction::UserLogin,
            "session",
            user.user_id,
            None,
        ));

        Ok(tokens)
    }

    /// Rotate a refresh token: validate, delete the old row, and insert
    /// its replacement in one transaction, then issue a fresh pair.
    pub async fn refresh(&self, req: RefreshRequest) -> Result<TokenResponse, AppError> {
        let claims = self.jwt.validate_refresh_token(&req.refresh_token)?;

        let stored = self
            .db
            .find_valid_refresh_token(claims.jti)
            .await?
            .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Refresh token not found")))?;

        if !stored.matches(&req.refresh_token) {
            tracing::warn!(user_id = %claims.sub, "Refresh token hash mismatch");
            return Err(AppError::Unauthenticated(anyhow::anyhow!("Token hash mismatch")));
        }

        // Fresh identity check; the account may have been deactivated
        // since the token was issued.
        let user = self
            .db
            .find_user_by_id(claims.sub)
            .await
            .map_err(|e| AppError::Unauthenticated(anyhow::anyhow!("Identity lookup failed: {}", e)))?
            .ok_or_else(|| AppError::Unauthenticated(anyhow::anyhow!("Account not found")))?;

        if !user.active {
            return Err(AppError::Unauthenticated(anyhow::anyhow!("Account inactive")));
        }

        let new_token_id = Uuid::new_v4();
        let refresh_token_str = self.jwt.generate_refresh_token(user.user_id, new_token_id)?;
        let new_row = RefreshToken::new_with_id(
            new_token_id,
            user.user_id,
            &refresh_token_str,
            self.refresh_token_expiry_days,
        );

        self.db.rotate_refresh_token(stored.token_id, &new_row).await?;

        let access_token =
            self.jwt
                .generate_access_token(user.user_id, user.tenant_id, user.role(), &user.email)?;

        self.audit.record(AuditRecord::new(
            user.tenant_id,
            Some(user.user_id),
            AuditAction::TokenRefreshed,
            "session",
            user.user_id,
            None,
        ));

        Ok(TokenResponse {
            access_token,
            refresh_token: refresh_token_str,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }

    /// Logout: delete the refresh-token row.
    pub async fn logout(&self, refresh_token: String, tenant_id: Uuid) -> Result<(), AppError> {
        let claims = self.jwt.validate_refresh_token(&refresh_token)?;

        let removed = self.db.delete_refresh_token(claims.jti, claims.sub).await?;
        if removed == 0 {
            return Err(AppError::Unauthenticated(anyhow::anyhow!(
                "Refresh token not found"
            )));
        }

        tracing::info!(user_id = %claims.sub, "User logged out");

        self.audit.record(AuditRecord::new(
            tenant_id,
            Some(claims.sub),
            AuditAction::UserLogout,
            "session",
            claims.sub,
            None,
        ));

        Ok(())
    }

    async fn issue_token_pair(&self, user: &User) -> Result<TokenResponse, AppError> {
        let access_token =
            self.jwt
                .generate_access_token(user.user_id, user.tenant_id, user.role(), &user.email)?;

        let refresh_token_id = Uuid::new_v4();
        let refresh_token_str = self.jwt.generate_refresh_token(user.user_id, refresh_token_id)?;

        let row = RefreshToken::new_with_id(
            refresh_token_id,
            user.user_id,
            &refresh_token_str,
            self.refresh_token_expiry_days,
        );
        self.db.insert_refresh_token(&row).await?;

        Ok(TokenResponse {
            access_token,
            refresh_token: refresh_token_str,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
        })
    }
}
