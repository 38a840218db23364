use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            CredentialsInput, PublicUser, RegisterInput, RegisterOutput, ResendVerificationOutput,
            VerifyEmailOutput,
        },
        password,
        repo_types::{NewUser, User},
        tokens::VerificationKeys,
    },
    error::ApiError,
    mail::VerificationEmail,
    state::AppState,
};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const NAME_MAX_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validated_email(raw: &str) -> Result<String, ApiError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    Ok(email)
}

pub(crate) fn validate_password(plain: &str) -> Result<(), ApiError> {
    let len = plain.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at most {PASSWORD_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// Trims the name; blank names are stored as absent.
pub(crate) fn validated_name(name: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > NAME_MAX_LEN {
        return Err(ApiError::bad_request(format!(
            "Name must be at most {NAME_MAX_LEN} characters"
        )));
    }
    Ok(Some(name.to_string()))
}

async fn hash_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain)).await?
}

async fn verify_blocking(plain: String, stored: String) -> anyhow::Result<bool> {
    Ok(tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored)).await?)
}

fn verification_link(state: &AppState, token: &str) -> String {
    format!(
        "{}/verify-email?token={}",
        state.config.primary_web_url().trim_end_matches('/'),
        token
    )
}

async fn send_verification(state: &AppState, user: &User) -> anyhow::Result<()> {
    let keys = VerificationKeys::from_ref(state);
    let token = keys.issue(user.id, &user.email)?;
    let message = VerificationEmail {
        to: user.email.clone(),
        name: user.name.clone(),
        link: verification_link(state, &token),
    };
    state.mailer.send_verification(&message).await
}

#[instrument(skip(state, input), fields(email = %input.email))]
pub async fn register(state: &AppState, input: RegisterInput) -> Result<RegisterOutput, ApiError> {
    let email = validated_email(&input.email)?;
    validate_password(&input.password)?;
    let name = validated_name(input.name.as_deref())?;

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let hash = hash_blocking(input.password).await?;
    let user = state
        .users
        .create(NewUser {
            email,
            password: Some(hash),
            name,
            image: None,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    let verification_email_sent = match send_verification(state, &user).await {
        Ok(()) => true,
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "verification email not sent");
            false
        }
    };

    Ok(RegisterOutput {
        user: user.into(),
        verification_email_sent,
    })
}

/// Returns `None` for an unknown email, an OAuth-only account or a wrong password.
#[instrument(skip(state, input))]
pub async fn verify_credentials(
    state: &AppState,
    input: CredentialsInput,
) -> Result<Option<PublicUser>, ApiError> {
    let email = validated_email(&input.email)?;

    let Some(user) = state.users.find_by_email(&email).await? else {
        debug!("credentials for unknown email");
        return Ok(None);
    };

    let Some(stored) = user.password.clone() else {
        debug!(user_id = %user.id, "account has no password");
        return Ok(None);
    };

    if !verify_blocking(input.password, stored).await? {
        warn!(user_id = %user.id, "invalid password");
        return Ok(None);
    }

    Ok(Some(user.into()))
}

#[instrument(skip(state, token))]
pub async fn verify_email(state: &AppState, token: &str) -> Result<VerifyEmailOutput, ApiError> {
    let invalid = || ApiError::bad_request("Invalid or expired verification token");

    let keys = VerificationKeys::from_ref(state);
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "verification token rejected");
        invalid()
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(invalid)?;
    if user.email != claims.email {
        warn!(user_id = %user.id, "verification token for a previous email");
        return Err(invalid());
    }

    let user = state
        .users
        .mark_email_verified(user.id, OffsetDateTime::now_utc())
        .await?
        .ok_or_else(invalid)?;
    let verified_at = user
        .email_verified
        .ok_or_else(|| anyhow::anyhow!("email_verified not set after update"))?;

    info!(user_id = %user.id, "email verified");
    Ok(VerifyEmailOutput {
        email: user.email,
        verified_at,
    })
}

#[instrument(skip(state))]
pub async fn resend_verification(
    state: &AppState,
    email: &str,
) -> Result<ResendVerificationOutput, ApiError> {
    let email = validated_email(email)?;

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::bad_request("No account found for this email"))?;
    if user.email_verified.is_some() {
        return Err(ApiError::bad_request("Email is already verified"));
    }

    send_verification(state, &user).await.map_err(|e| {
        warn!(user_id = %user.id, error = %e, "verification email not sent");
        ApiError::bad_request("Failed to send verification email")
    })?;

    info!(user_id = %user.id, "verification email resent");
    Ok(ResendVerificationOutput { sent: true })
}
