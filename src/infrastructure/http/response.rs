use reqwest::Response;

use crate::domain::{RequestError, RequestResult};

/// Sort a response into "hand back to the caller" or "retry".
///
/// Anything below 500 is returned as-is, even when not a success: client
/// errors are the caller's to interpret and are never retried. Server errors
/// become a transient [`RequestError::ServerError`].
pub async fn classify_response(response: Response) -> RequestResult<Response> {
    let status = response.status();
    if status.as_u16() >= 500 {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        return Err(RequestError::from_status(status.as_u16(), body));
    }
    Ok(response)
}
