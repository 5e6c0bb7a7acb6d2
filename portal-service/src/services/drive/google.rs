//! Google Drive v3 client authenticated with a service account.
//!
//! Access tokens are minted by signing an RS256 JWT assertion with the
//! service-account key and exchanging it at the token endpoint; the token
//! is cached until shortly before expiry.

use super::{DriveClient, DriveEntry, DriveError};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// The fields we need from a service-account credential blob.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

pub struct GoogleDrive {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: Client,
    api_base: String,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleDrive {
    pub fn from_service_account_json(raw: &str) -> Result<Self, DriveError> {
        let key: ServiceAccountKey = serde_json::from_str(raw)
            .map_err(|e| DriveError::Auth(format!("invalid service account JSON: {}", e)))?;
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| DriveError::Auth(format!("invalid service account key: {}", e)))?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| DriveError::Network(e.to_string()))?;

        Ok(Self {
            key,
            encoding_key,
            client,
            api_base: DRIVE_API_BASE.to_string(),
            cached: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, DriveError> {
        let now = Utc::now().timestamp();
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(token.token.clone());
            }
        }

        let claims = TokenClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| DriveError::Auth(format!("failed to sign token assertion: {}", e)))?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DriveError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Auth(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::Auth(format!("bad token response: {}", e)))?;

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    async fn get_bytes(&self, url: String) -> Result<Vec<u8>, DriveError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DriveError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DriveError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DriveClient for GoogleDrive {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveEntry>, DriveError> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.access_token().await?;
            let query = format!("'{}' in parents and trashed=false", folder_id);
            let mut request = self
                .client
                .get(format!("{}/files", self.api_base))
                .bearer_auth(token)
                .query(&[
                    ("q", query.as_str()),
                    ("fields", "nextPageToken, files(id, name, mimeType)"),
                    ("pageSize", "1000"),
                ]);
            if let Some(ref next) = page_token {
                request = request.query(&[("pageToken", next.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| DriveError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(DriveError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let page: FileList = response
                .json()
                .await
                .map_err(|e| DriveError::Network(e.to_string()))?;

            entries.extend(page.files.into_iter().map(|f| DriveEntry {
                id: f.id,
                name: f.name,
                mime_type: f.mime_type,
            }));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(entries)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        self.get_bytes(format!("{}/files/{}?alt=media", self.api_base, file_id))
            .await
    }

    async fn export_text(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        self.get_bytes(format!(
            "{}/files/{}/export?mimeType=text/plain",
            self.api_base, file_id
        ))
        .await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileMeta>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMeta {
    id: String,
    name: String,
    mime_type: String,
}
