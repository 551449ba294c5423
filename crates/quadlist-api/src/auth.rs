use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::info;

use quadlist_db::DbError;
use quadlist_db::models::NewUser;
use quadlist_types::api::{
    AuthCheckResponse, AuthUser, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
    SimpleResponse, VerifiedUser, VerifyEmailRequest, VerifyEmailResponse,
};

use crate::error::ApiError;
use crate::session::{SESSION_COOKIE, generate_token};
use crate::{AppState, blocking};

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<RegisterResponse>), ApiError> {
    let domain_suffix = format!("@{}", state.email_domain);
    if !req.email.ends_with(&domain_suffix) {
        return Err(ApiError::Validation(format!(
            "Only institutional email addresses ({}) are allowed",
            domain_suffix
        )));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let email = req.email.clone();
    let password = req.password;
    let user = NewUser {
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        major: req.major,
        graduation_year: req.graduation_year,
        campus: req.campus,
    };

    let state2 = state.clone();
    let (user_id, code) = blocking(move || {
        // Best-effort pre-check; the unique constraint below is authoritative.
        if state2.db.email_exists(&user.email)? {
            return Err(duplicate_email());
        }
        let hash = hash_password(&password)?;
        let user_id = state2.db.create_user(&user, &hash).map_err(|e| match e {
            DbError::Conflict => duplicate_email(),
            other => other.into(),
        })?;
        let code = generate_token();
        state2.db.create_verification(user_id, &code)?;
        Ok((user_id, code))
    })
    .await?;

    // No mail delivery here; the code goes to the log so an operator can
    // hand it out.
    info!("Verification code for {}: {}", email, code);

    if state.require_verification {
        Ok((
            jar,
            Json(RegisterResponse {
                success: true,
                message: "Registration successful. Please check your email for verification."
                    .to_string(),
                verification_code: Some(code),
            }),
        ))
    } else {
        let token = state.sessions.create(user_id, &email)?;
        Ok((
            jar.add(session_cookie(token)),
            Json(RegisterResponse {
                success: true,
                message: "Registration successful.".to_string(),
                verification_code: None,
            }),
        ))
    }
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let state2 = state.clone();
    let user = blocking(move || {
        let user = state2
            .db
            .user_auth_by_email(&req.email)?
            .ok_or_else(invalid_credentials)?;

        let parsed = PasswordHash::new(&user.password)
            .map_err(|e| ApiError::Internal(anyhow!("stored password hash unparsable: {}", e)))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed)
            .map_err(|_| invalid_credentials())?;

        if state2.require_verification && !state2.db.has_verified_email(user.id)? {
            return Err(ApiError::Auth(
                "Please verify your email before logging in".to_string(),
            ));
        }
        Ok(user)
    })
    .await?;

    let token = state.sessions.create(user.id, &user.email)?;
    info!("User {} logged in", user.id);

    Ok((
        jar.add(session_cookie(token)),
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            user: AuthUser {
                id: user.id,
                email: user.email,
                first_name: user.first_name,
                last_name: user.last_name,
            },
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SimpleResponse>), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value())?;
    }

    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    Ok((
        jar.remove(removal),
        Json(SimpleResponse {
            success: true,
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// One-shot transition PENDING → VERIFIED. The conditioned UPDATE in the
/// gateway makes replays indistinguishable from unknown codes. Success
/// doubles as login.
pub async fn verify_email(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<(CookieJar, Json<VerifyEmailResponse>), ApiError> {
    let email = req.email.clone();
    let state2 = state.clone();
    let user_id = blocking(move || {
        state2
            .db
            .consume_verification(&req.email, &req.verification_code)?
            .ok_or_else(|| ApiError::Validation("Invalid verification code".to_string()))
    })
    .await?;

    let token = state.sessions.create(user_id, &email)?;
    info!("Email verified for user {}", user_id);

    Ok((
        jar.add(session_cookie(token)),
        Json(VerifyEmailResponse {
            success: true,
            message: "Email verified successfully".to_string(),
            user: VerifiedUser { id: user_id, email },
        }),
    ))
}

/// Pure read of the caller's session state; never fails the request over a
/// missing session.
pub async fn check(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<AuthCheckResponse>, ApiError> {
    let session = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state.sessions.get(cookie.value())?,
        None => None,
    };

    Ok(Json(match session {
        Some(s) => AuthCheckResponse {
            authenticated: true,
            user_id: Some(s.user_id),
            user_email: Some(s.email),
        },
        None => AuthCheckResponse {
            authenticated: false,
            user_id: None,
            user_email: None,
        },
    }))
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {}", e)))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build()
}

fn invalid_credentials() -> ApiError {
    ApiError::Auth("Invalid email or password".to_string())
}

fn duplicate_email() -> ApiError {
    ApiError::Conflict("User already exists with this email".to_string())
}
