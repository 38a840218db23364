use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::Method,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ApiError;

/// Successful procedure result: `{"result": {"data": ...}}`.
#[derive(Debug, Serialize)]
pub struct RpcResponse<T> {
    pub result: RpcResult<T>,
}

#[derive(Debug, Serialize)]
pub struct RpcResult<T> {
    pub data: T,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn json(data: T) -> Json<Self> {
        Json(Self {
            result: RpcResult { data },
        })
    }
}

pub type RpcReply<T> = Result<Json<RpcResponse<T>>, ApiError>;

/// JSON procedure input. Body errors become `BAD_REQUEST` envelopes
/// instead of axum's plain-text rejections.
pub struct RpcInput<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for RpcInput<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection_message(&rejection))),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`".into()
        }
        other => other.body_text(),
    }
}

pub async fn unknown_procedure() -> ApiError {
    ApiError::NotFound("No such procedure".into())
}

/// Fallback for a known procedure called with the wrong HTTP method.
pub async fn unsupported_method(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(format!("Method {method} is not supported for this procedure"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_wrapped_in_result_data() {
        let Json(body) = RpcResponse::json(serde_json::json!({ "ok": true }));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["result"]["data"]["ok"], true);
    }

    #[test]
    fn null_data_serializes_as_null() {
        let Json(body) = RpcResponse::json(Option::<u8>::None);
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"result":{"data":null}}"#);
    }
}
