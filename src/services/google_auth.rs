use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::core::config::Settings;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Fixed read-only scopes: courses, course work, student submissions,
/// rosters.
const SCOPES: &str = "https://www.googleapis.com/auth/classroom.courses.readonly \
     https://www.googleapis.com/auth/classroom.coursework.students.readonly \
     https://www.googleapis.com/auth/classroom.student-submissions.students.readonly \
     https://www.googleapis.com/auth/classroom.rosters.readonly";

const VERIFIER_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

const EXPIRY_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct CachedTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Interactive OAuth2 for an installed application: loopback redirect plus
/// PKCE, with cached access/refresh tokens next to the state file.
#[derive(Debug, Clone)]
pub(crate) struct GoogleAuthService {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_port: u16,
    cache_path: PathBuf,
}

impl GoogleAuthService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.google().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            client,
            client_id: settings.google().client_id.clone(),
            client_secret: settings.google().client_secret.clone(),
            redirect_port: settings.google().redirect_port.get(),
            cache_path: PathBuf::from(&settings.storage().token_cache_file),
        })
    }

    pub(crate) fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
    }

    /// Cached token if still fresh, silent refresh when possible, interactive
    /// login otherwise.
    pub(crate) async fn ensure_token(&self) -> Result<String> {
        if let Some(cached) = self.read_cache() {
            let now = OffsetDateTime::now_utc().unix_timestamp();
            if cached.expires_at > now + EXPIRY_MARGIN_SECONDS {
                return Ok(cached.access_token);
            }
            if let Some(refresh_token) = cached.refresh_token {
                match self.refresh(&refresh_token).await {
                    Ok(access_token) => return Ok(access_token),
                    Err(err) => {
                        tracing::warn!(error = %err, "Token refresh failed; falling back to login")
                    }
                }
            }
        }

        self.interactive_login().await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if !self.client_secret.is_empty() {
            form.push(("client_secret", self.client_secret.as_str()));
        }

        let parsed = self.request_tokens(&form).await?;
        self.write_cache(&parsed, Some(refresh_token))?;
        Ok(parsed.access_token)
    }

    async fn interactive_login(&self) -> Result<String> {
        if !self.is_configured() {
            anyhow::bail!("Google OAuth client is not configured");
        }

        // The redirect must land on the loopback interface; anything else is
        // refused before the browser is involved.
        let listener = TcpListener::bind(("127.0.0.1", self.redirect_port)).await.with_context(
            || {
                format!(
                    "No se pudo abrir el puerto local {} para completar el inicio de sesión; \
                     cierra la aplicación que lo ocupa o cambia GOOGLE_REDIRECT_PORT",
                    self.redirect_port
                )
            },
        )?;

        let verifier = random_token(64);
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        let state = random_token(32);
        let redirect_uri = format!("http://127.0.0.1:{}", self.redirect_port);

        let auth_url = reqwest::Url::parse_with_params(
            AUTH_ENDPOINT,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .context("Failed to build the authorization URL")?;

        println!("Abre esta dirección en tu navegador para iniciar sesión con Google:");
        println!("  {auth_url}");

        let code = wait_for_redirect(&listener, &state).await?;

        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("code", code.as_str()),
            ("code_verifier", verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        if !self.client_secret.is_empty() {
            form.push(("client_secret", self.client_secret.as_str()));
        }

        let parsed = self.request_tokens(&form).await?;
        self.write_cache(&parsed, None)?;
        Ok(parsed.access_token)
    }

    async fn request_tokens(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(form)
            .send()
            .await
            .context("Failed to call the OAuth token endpoint")?;

        let status = response.status();
        let raw_body = response.text().await.context("Failed to read the token response")?;
        if !status.is_success() {
            anyhow::bail!("Token request failed (status {}): {}", status, raw_body.trim());
        }

        serde_json::from_str(&raw_body)
            .map_err(|err| anyhow::anyhow!("Token endpoint returned an unexpected body: {err}"))
    }

    fn read_cache(&self) -> Option<CachedTokens> {
        let raw = fs::read_to_string(&self.cache_path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn write_cache(&self, tokens: &TokenResponse, previous_refresh: Option<&str>) -> Result<()> {
        let cached = CachedTokens {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens
                .refresh_token
                .clone()
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: OffsetDateTime::now_utc().unix_timestamp() + tokens.expires_in,
        };
        let raw = serde_json::to_string_pretty(&cached).context("Failed to encode token cache")?;
        fs::write(&self.cache_path, raw)
            .with_context(|| format!("Failed to write {}", self.cache_path.display()))
    }
}

async fn wait_for_redirect(listener: &TcpListener, expected_state: &str) -> Result<String> {
    let (mut socket, _) =
        listener.accept().await.context("Failed to accept the OAuth redirect")?;

    let mut buffer = vec![0_u8; 4096];
    let read = socket.read(&mut buffer).await.context("Failed to read the OAuth redirect")?;
    let request = String::from_utf8_lossy(&buffer[..read]).to_string();

    let outcome = parse_redirect_request(&request, expected_state);
    let body = match &outcome {
        Ok(_) => "<html><body>Sesión iniciada. Ya puedes cerrar esta ventana.</body></html>",
        Err(_) => "<html><body>No se pudo iniciar sesión. Vuelve a intentarlo.</body></html>",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;

    outcome.map_err(|reason| anyhow::anyhow!("OAuth redirect rejected: {reason}"))
}

fn parse_redirect_request(request: &str, expected_state: &str) -> Result<String, String> {
    let request_line = request.lines().next().unwrap_or_default();
    let target = request_line.split_whitespace().nth(1).unwrap_or_default();
    let query = target.split_once('?').map(|(_, query)| query).unwrap_or_default();

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "code" => code = Some(percent_decode(value)),
            "state" => state = Some(percent_decode(value)),
            "error" => error = Some(percent_decode(value)),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(error);
    }
    if state.as_deref() != Some(expected_state) {
        return Err("state mismatch".to_string());
    }
    code.filter(|code| !code.is_empty()).ok_or_else(|| "missing code".to_string())
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'%' if index + 2 < bytes.len() => {
                let decoded = value
                    .get(index + 1..index + 3)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(byte) => {
                        output.push(byte);
                        index += 3;
                    }
                    None => {
                        output.push(b'%');
                        index += 1;
                    }
                }
            }
            b'+' => {
                output.push(b' ');
                index += 1;
            }
            byte => {
                output.push(byte);
                index += 1;
            }
        }
    }
    String::from_utf8_lossy(&output).into_owned()
}

fn random_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut output = String::with_capacity(length);
    for _ in 0..length {
        let index = rng.gen_range(0..VERIFIER_ALPHABET.len());
        output.push(VERIFIER_ALPHABET[index] as char);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_parser_accepts_matching_state() {
        let request = "GET /?state=abc&code=4%2F0Axyz HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n";
        assert_eq!(parse_redirect_request(request, "abc").unwrap(), "4/0Axyz");
    }

    #[test]
    fn redirect_parser_rejects_state_mismatch() {
        let request = "GET /?state=other&code=4%2F0Axyz HTTP/1.1\r\n\r\n";
        assert!(parse_redirect_request(request, "abc").is_err());
    }

    #[test]
    fn redirect_parser_surfaces_denial() {
        let request = "GET /?error=access_denied&state=abc HTTP/1.1\r\n\r\n";
        assert_eq!(parse_redirect_request(request, "abc").unwrap_err(), "access_denied");
    }

    #[test]
    fn percent_decode_handles_reserved_characters() {
        assert_eq!(percent_decode("4%2F0Axyz"), "4/0Axyz");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("plain"), "plain");
    }

    #[test]
    fn random_token_uses_unreserved_alphabet() {
        let token = random_token(64);
        assert_eq!(token.len(), 64);
        assert!(token.bytes().all(|byte| VERIFIER_ALPHABET.contains(&byte)));
    }
}
