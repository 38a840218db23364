use axum::{extract::State, routing::post, Router};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            CredentialsInput, PublicUser, RegisterInput, RegisterOutput, ResendVerificationInput,
            ResendVerificationOutput, VerifyEmailInput, VerifyEmailOutput,
        },
        services,
    },
    rpc::{unsupported_method, RpcInput, RpcReply, RpcResponse},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth.register", post(register).fallback(unsupported_method))
        .route(
            "/auth.verifyCredentials",
            post(verify_credentials).fallback(unsupported_method),
        )
        .route("/auth.verifyEmail", post(verify_email).fallback(unsupported_method))
        .route(
            "/auth.resendVerification",
            post(resend_verification).fallback(unsupported_method),
        )
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    RpcInput(input): RpcInput<RegisterInput>,
) -> RpcReply<RegisterOutput> {
    let out = services::register(&state, input).await?;
    Ok(RpcResponse::json(out))
}

#[instrument(skip_all)]
pub async fn verify_credentials(
    State(state): State<AppState>,
    RpcInput(input): RpcInput<CredentialsInput>,
) -> RpcReply<Option<PublicUser>> {
    let user = services::verify_credentials(&state, input).await?;
    Ok(RpcResponse::json(user))
}

#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    RpcInput(input): RpcInput<VerifyEmailInput>,
) -> RpcReply<VerifyEmailOutput> {
    let out = services::verify_email(&state, &input.token).await?;
    Ok(RpcResponse::json(out))
}

#[instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    RpcInput(input): RpcInput<ResendVerificationInput>,
) -> RpcReply<ResendVerificationOutput> {
    let out = services::resend_verification(&state, &input.email).await?;
    Ok(RpcResponse::json(out))
}
