//! Google Drive API connector implementation
//!
//! Implements the `RemoteObjectStore` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{
    NewObject, Permission, PermissionScope, RemoteObject, RemoteObjectStore, UploadSource,
};
use bytes::Bytes;
use core_auth::CredentialProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, instrument, warn};

use crate::error::GoogleDriveError;
use crate::types::{
    ApiErrorResponse, DriveFile, FileMetadataRequest, PermissionRequest, FOLDER_MIME_TYPE,
};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Google Drive upload endpoint base URL
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,parents";

/// Resumable upload chunks must be a multiple of this size (except the last).
pub const UPLOAD_CHUNK_ALIGNMENT: usize = 256 * 1024;

/// Default resumable upload chunk size (8 MiB)
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 32 * UPLOAD_CHUNK_ALIGNMENT;

/// Timeout for metadata calls
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single upload chunk
const CHUNK_TIMEOUT: Duration = Duration::from_secs(300);

/// Google Drive API connector
///
/// Implements `RemoteObjectStore` for Google Drive API v3.
///
/// # Features
///
/// - Folder creation (`application/vnd.google-apps.folder`)
/// - Resumable uploads streamed in 256 KiB-aligned chunks
/// - Sharing permissions
/// - File metadata lookup
/// - Bearer tokens fetched from a [`CredentialProvider`] before every call
///
/// Each call is issued once unless a [`RetryPolicy`] is configured with
/// [`with_retry_policy`](Self::with_retry_policy).
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::{NewObject, RemoteObjectStore};
///
/// let connector = GoogleDriveConnector::new(http_client, credentials);
/// let folder = connector.create_container(&NewObject::container("Albums", None)).await?;
/// ```
pub struct GoogleDriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Source of OAuth 2.0 access tokens
    credentials: Arc<dyn CredentialProvider>,

    retry_policy: RetryPolicy,

    chunk_size: usize,
}

impl GoogleDriveConnector {
    /// Create a new Google Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `credentials` - Provider of access tokens with the `drive.file` scope
    pub fn new(http_client: Arc<dyn HttpClient>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http_client,
            credentials,
            retry_policy: RetryPolicy::single_attempt(),
            chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }

    /// Retry policy handed to the HTTP client for every call.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the upload chunk size, rounded up to a multiple of 256 KiB.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        let chunks = bytes
            .div_ceil(UPLOAD_CHUNK_ALIGNMENT)
            .clamp(1, usize::MAX / UPLOAD_CHUNK_ALIGNMENT);
        self.chunk_size = chunks * UPLOAD_CHUNK_ALIGNMENT;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Attach a fresh bearer token and send the request.
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, GoogleDriveError> {
        let token = self.credentials.access_token().await?;
        let response = self
            .http_client
            .execute_with_retry(request.bearer_token(token), self.retry_policy.clone())
            .await?;
        Ok(response)
    }

    /// Send a metadata request and parse the returned file resource.
    async fn send_for_file(
        &self,
        request: HttpRequest,
        file_id: Option<&str>,
    ) -> std::result::Result<DriveFile, GoogleDriveError> {
        let response = self.send(request).await?;

        if !response.is_success() {
            return Err(Self::error_from_response(&response, file_id));
        }

        Self::parse_file(&response)
    }

    fn parse_file(response: &HttpResponse) -> std::result::Result<DriveFile, GoogleDriveError> {
        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse file resource: {}", e))
        })
    }

    /// Map a non-success response onto a provider error.
    fn error_from_response(response: &HttpResponse, file_id: Option<&str>) -> GoogleDriveError {
        let parsed = serde_json::from_slice::<ApiErrorResponse>(&response.body).ok();
        let rate_limited = parsed.as_ref().is_some_and(|body| {
            body.error.errors.iter().any(|detail| {
                matches!(
                    detail.reason.as_str(),
                    "rateLimitExceeded" | "userRateLimitExceeded"
                )
            })
        });
        let message = parsed
            .map(|body| body.error.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| String::from_utf8_lossy(&response.body).to_string());

        match response.status {
            401 => GoogleDriveError::AuthenticationFailed(message),
            429 => Self::rate_limited(response),
            403 if rate_limited => Self::rate_limited(response),
            404 => match file_id {
                Some(id) => GoogleDriveError::FileNotFound {
                    file_id: id.to_string(),
                },
                None => GoogleDriveError::ApiError {
                    status_code: 404,
                    message,
                },
            },
            status => GoogleDriveError::ApiError {
                status_code: status,
                message,
            },
        }
    }

    fn rate_limited(response: &HttpResponse) -> GoogleDriveError {
        let retry_after_seconds = response
            .header("Retry-After")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0);
        GoogleDriveError::RateLimitExceeded {
            retry_after_seconds,
        }
    }

    /// Convert DriveFile to RemoteObject
    fn convert_file(drive_file: DriveFile) -> RemoteObject {
        RemoteObject {
            id: drive_file.id,
            name: drive_file.name,
            mime_type: drive_file.mime_type,
            parent_ids: drive_file.parents,
        }
    }

    fn metadata_body(object: &NewObject, mime_type: Option<String>) -> FileMetadataRequest {
        FileMetadataRequest {
            name: object.name.clone(),
            mime_type,
            parents: object.parent_id.iter().cloned().collect(),
            description: object.description.clone(),
        }
    }

    /// Open a resumable upload session and return its session URI.
    async fn start_resumable_session(
        &self,
        object: &NewObject,
        mime_type: &str,
        length: u64,
    ) -> std::result::Result<String, GoogleDriveError> {
        let url = format!(
            "{}/files?uploadType=resumable&fields={}",
            DRIVE_UPLOAD_BASE, FILE_FIELDS
        );
        let body = Self::metadata_body(object, Some(mime_type.to_string()));

        let request = HttpRequest::new(HttpMethod::Post, url)
            .json(&body)?
            .header("X-Upload-Content-Type", mime_type)
            .header("X-Upload-Content-Length", length.to_string())
            .timeout(METADATA_TIMEOUT);

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(Self::error_from_response(&response, None));
        }

        response
            .header("Location")
            .map(str::to_string)
            .ok_or_else(|| {
                GoogleDriveError::UploadSession(
                    "upload initiation response carried no Location header".to_string(),
                )
            })
    }

    /// Stream the content into an open session, one aligned chunk per request.
    async fn upload_chunks(
        &self,
        session_uri: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        total: u64,
    ) -> std::result::Result<DriveFile, GoogleDriveError> {
        let mut offset: u64 = 0;
        let mut pending: Vec<u8> = Vec::with_capacity(self.chunk_size);

        loop {
            let remaining = total - offset;
            let limit = (self.chunk_size as u64).min(remaining) as usize;
            fill_buffer(reader, &mut pending, limit).await?;

            if pending.len() < limit {
                return Err(GoogleDriveError::SourceTruncated {
                    expected: total,
                    actual: offset + pending.len() as u64,
                });
            }

            let content_range = if total == 0 {
                "bytes */0".to_string()
            } else {
                format!(
                    "bytes {}-{}/{}",
                    offset,
                    offset + pending.len() as u64 - 1,
                    total
                )
            };

            debug!(content_range = %content_range, "Uploading chunk");

            let request = HttpRequest::new(HttpMethod::Put, session_uri)
                .header("Content-Range", content_range)
                .body(Bytes::copy_from_slice(&pending))
                .timeout(CHUNK_TIMEOUT);

            let response = self.send(request).await?;

            match response.status {
                200 | 201 => return Self::parse_file(&response),
                308 => {
                    let committed = committed_bytes(&response);
                    if committed < offset || committed > offset + pending.len() as u64 {
                        return Err(GoogleDriveError::UploadSession(format!(
                            "server acknowledged {} bytes, expected between {} and {}",
                            committed,
                            offset,
                            offset + pending.len() as u64
                        )));
                    }
                    if committed == total {
                        return Err(GoogleDriveError::UploadSession(
                            "upload incomplete after all bytes were acknowledged".to_string(),
                        ));
                    }
                    if committed == offset {
                        return Err(GoogleDriveError::UploadSession(format!(
                            "server accepted none of the {} bytes sent at offset {}",
                            pending.len(),
                            offset
                        )));
                    }

                    let accepted = (committed - offset) as usize;
                    if accepted < pending.len() {
                        warn!(
                            accepted,
                            sent = pending.len(),
                            "Server accepted a partial chunk, resending remainder"
                        );
                    }
                    pending.drain(..accepted);
                    offset = committed;
                }
                _ => return Err(Self::error_from_response(&response, None)),
            }
        }
    }
}

/// Read from `reader` until `buffer` holds `limit` bytes or the stream ends.
async fn fill_buffer(
    reader: &mut (dyn AsyncRead + Send + Unpin),
    buffer: &mut Vec<u8>,
    limit: usize,
) -> std::io::Result<()> {
    let mut scratch = vec![0u8; 64 * 1024];
    while buffer.len() < limit {
        let want = (limit - buffer.len()).min(scratch.len());
        let read = reader.read(&mut scratch[..want]).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&scratch[..read]);
    }
    Ok(())
}

/// Bytes the server has persisted, from a `308` response's `Range: bytes=0-N`.
fn committed_bytes(response: &HttpResponse) -> u64 {
    response
        .header("Range")
        .and_then(|range| range.trim().strip_prefix("bytes=0-"))
        .and_then(|end| end.parse::<u64>().ok())
        .map_or(0, |end| end + 1)
}

fn permission_body(permission: &Permission) -> PermissionRequest {
    PermissionRequest {
        role: permission.role.as_str().to_string(),
        grantee_type: "anyone".to_string(),
        allow_file_discovery: permission.scope == PermissionScope::Anyone,
    }
}

#[async_trait]
impl RemoteObjectStore for GoogleDriveConnector {
    #[instrument(skip(self, object), fields(name = %object.name, parent_id = ?object.parent_id))]
    async fn create_container(&self, object: &NewObject) -> Result<RemoteObject> {
        info!("Creating folder");

        let url = format!("{}/files?fields={}", DRIVE_API_BASE, FILE_FIELDS);
        let body = Self::metadata_body(object, Some(FOLDER_MIME_TYPE.to_string()));
        let request = HttpRequest::new(HttpMethod::Post, url)
            .json(&body)?
            .timeout(METADATA_TIMEOUT);

        let folder = self.send_for_file(request, None).await?;

        info!(object_id = %folder.id, "Folder created");
        Ok(Self::convert_file(folder))
    }

    #[instrument(
        skip(self, object, content),
        fields(name = %object.name, parent_id = ?object.parent_id, length = content.length)
    )]
    async fn create_object(&self, object: &NewObject, content: UploadSource) -> Result<RemoteObject> {
        info!("Uploading file");

        let mime_type = object
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let UploadSource { mut reader, length } = content;

        let session_uri = self
            .start_resumable_session(object, &mime_type, length)
            .await?;
        debug!("Resumable upload session opened");

        let file = self
            .upload_chunks(&session_uri, reader.as_mut(), length)
            .await?;

        info!(object_id = %file.id, bytes = length, "File uploaded");
        Ok(Self::convert_file(file))
    }

    #[instrument(skip(self), fields(object_id = %object_id, permission = %permission))]
    async fn create_permission(&self, object_id: &str, permission: &Permission) -> Result<()> {
        debug!("Creating permission");

        let url = format!(
            "{}/files/{}/permissions",
            DRIVE_API_BASE,
            urlencoding::encode(object_id)
        );
        let request = HttpRequest::new(HttpMethod::Post, url)
            .json(&permission_body(permission))?
            .timeout(METADATA_TIMEOUT);

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(Self::error_from_response(&response, Some(object_id)).into());
        }

        debug!("Permission created");
        Ok(())
    }

    #[instrument(skip(self), fields(object_id = %object_id))]
    async fn get_object(&self, object_id: &str) -> Result<RemoteObject> {
        debug!("Getting file metadata");

        let url = format!(
            "{}/files/{}?fields={}",
            DRIVE_API_BASE,
            urlencoding::encode(object_id),
            FILE_FIELDS
        );
        let request = HttpRequest::new(HttpMethod::Get, url)
            .header("Accept", "application/json")
            .timeout(METADATA_TIMEOUT);

        let file = self.send_for_file(request, Some(object_id)).await?;
        Ok(Self::convert_file(file))
    }
}
