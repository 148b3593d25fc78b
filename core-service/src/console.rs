//! Console consent prompt for desktop hosts.

use async_trait::async_trait;
use core_auth::{AuthError, ConsentHandler, ConsentResponse};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Prints the authorization URL and reads the pasted code from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleConsentHandler;

impl ConsoleConsentHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConsentHandler for ConsoleConsentHandler {
    async fn request_consent(&self, auth_url: &str) -> core_auth::Result<ConsentResponse> {
        let prompt = format!(
            "Please go to this URL and authorize access:\n{}\nEnter the authorization code: ",
            auth_url
        );

        let mut stderr = tokio::io::stderr();
        stderr
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| AuthError::ConsentFailed(e.to_string()))?;
        stderr
            .flush()
            .await
            .map_err(|e| AuthError::ConsentFailed(e.to_string()))?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| AuthError::ConsentFailed(e.to_string()))?;

        let code = line.trim();
        if code.is_empty() {
            return Err(AuthError::ConsentFailed(
                "no authorization code entered".to_string(),
            ));
        }

        Ok(ConsentResponse {
            code: code.to_string(),
            state: None,
        })
    }
}
