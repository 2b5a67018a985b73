use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::{Rng, distr::Alphanumeric};
use tracing::{debug, info, warn};
use uuid::Uuid;

use skillmatch_db::models::parse_timestamp;
use skillmatch_types::api::{
    Claims, LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegisterResponse,
    ResetPasswordRequest, ResetRequestRequest,
};
use skillmatch_types::events::{ChangeOp, Table};

use crate::error::ApiError;
use crate::state::AppState;

const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("invalid email".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    // Creates the user and its empty profile row in one transaction.
    state
        .db
        .create_user(&user_id.to_string(), &email, &password_hash)?;
    state.dispatcher.publish(Table::Profiles, ChangeOp::Insert);

    let token = create_token(&state.jwt_secret, user_id)?;

    info!(%user_id, %email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let user = state
        .db
        .get_user_by_email(&email)?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&req.password, &user.password)? {
        warn!(%email, "login with invalid password");
        return Err(ApiError::Unauthorized);
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow!("corrupt user id '{}': {}", user.id, e))?;
    let token = create_token(&state.jwt_secret, user_id)?;

    info!(%user_id, %email, "user logged in");
    Ok(Json(LoginResponse {
        user_id,
        email: user.email,
        token,
    }))
}

/// Session retrieval: who does this token belong to.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(MeResponse {
        id: claims.sub,
        email: user.email,
        created_at: parse_timestamp(&user.created_at),
    }))
}

/// Issues a single-use reset token. Always answers 202 so the endpoint
/// does not disclose which emails have accounts; the actual email
/// transport is out of process.
pub async fn reset_request(
    State(state): State<AppState>,
    Json(req): Json<ResetRequestRequest>,
) -> Result<StatusCode, ApiError> {
    let email = req.email.trim().to_lowercase();

    if let Some(user) = state.db.get_user_by_email(&email)? {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();

        state
            .db
            .create_password_reset(&token, &user.id, RESET_TOKEN_TTL_MINUTES)?;

        info!(user_id = %user.id, "password reset email dispatched");
        debug!(%token, "reset token (dev only)");
    }

    Ok(StatusCode::ACCEPTED)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let user_id = state
        .db
        .consume_password_reset(&req.token)?
        .ok_or(ApiError::Unauthorized)?;

    let password_hash = hash_password(&req.password)?;
    state.db.update_password(&user_id, &password_hash)?;

    info!(%user_id, "password reset");
    Ok(StatusCode::NO_CONTENT)
}

fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow!("hash password: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(plain: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("parse password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(secret: &str, user_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ada@campus.edu"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("@campus.edu"));
        assert!(!is_valid_email("ada@localhost"));
        assert!(!is_valid_email("ada@.edu"));
    }

    #[test]
    fn token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, user_id);
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("correct-horse-battery").unwrap();
        assert!(verify_password("correct-horse-battery", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
