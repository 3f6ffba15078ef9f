//! Supabase connection config and the GoTrue auth client.

use koi_utils::{User, UserRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
    #[error("auth transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The raw message the auth service returned. Surfaced to the caller
    /// unchanged so the form can show it.
    #[error("{0}")]
    Service(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl SupabaseConfig {
    pub fn from_env() -> Result<SupabaseConfig, AuthError> {
        let supabase_url = std::env::var("SUPABASE_URL")
            .map_err(|_| AuthError::MissingConfig("SUPABASE_URL"))?;
        let supabase_anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| AuthError::MissingConfig("SUPABASE_ANON_KEY"))?;
        Ok(SupabaseConfig {
            supabase_url,
            supabase_anon_key,
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The auth service's user record. Only the fields the profile mapping needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

pub fn default_avatar(user_id: &str) -> String {
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={user_id}")
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Derive the forum profile from an auth user. Display name falls back from
/// the metadata full name to the email local part to "User"; unknown role
/// strings degrade to the default member role.
pub fn map_user(auth_user: &AuthUser) -> User {
    let meta = &auth_user.user_metadata;
    let name = non_empty(meta.full_name.as_ref())
        .or_else(|| {
            non_empty(auth_user.email.as_ref())
                .map(|email| email.split('@').next().unwrap_or(email))
        })
        .unwrap_or("User")
        .to_string();
    let role = non_empty(meta.role.as_ref())
        .and_then(|label| label.parse::<UserRole>().ok())
        .unwrap_or_default();
    let avatar = non_empty(meta.avatar_url.as_ref())
        .map(str::to_string)
        .unwrap_or_else(|| default_avatar(&auth_user.id));
    User {
        id: auth_user.id.clone(),
        name,
        role,
        avatar,
        email: auth_user.email.clone(),
    }
}

/// GoTrue error bodies come in a few shapes depending on the endpoint.
#[derive(Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

async fn expect_auth_ok(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.error))
        .unwrap_or_else(|| format!("auth request failed with status {status}"));
    Err(AuthError::Service(message))
}

/// Thin client over the GoTrue HTTP endpoints under `/auth/v1`.
pub struct AuthClient {
    config: SupabaseConfig,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(config: SupabaseConfig) -> AuthClient {
        AuthClient {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.config.supabase_url)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthSession, AuthError> {
        let response = self
            .http
            .post(self.endpoint("signup"))
            .header("apikey", &self.config.supabase_anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await?;
        let response = expect_auth_ok(response).await?;
        Ok(response.json().await?)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .http
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.config.supabase_anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;
        let response = expect_auth_ok(response).await?;
        Ok(response.json().await?)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.config.supabase_anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        expect_auth_ok(response).await?;
        Ok(())
    }

    /// Restore the user for a stored token, e.g. after a page reload.
    pub async fn current_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.config.supabase_anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = expect_auth_ok(response).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_user(full_name: Option<&str>, email: Option<&str>) -> AuthUser {
        AuthUser {
            id: "0f6b".to_string(),
            email: email.map(str::to_string),
            user_metadata: UserMetadata {
                full_name: full_name.map(str::to_string),
                role: None,
                avatar_url: None,
            },
        }
    }

    #[test]
    fn profile_name_prefers_metadata_full_name() {
        let user = map_user(&auth_user(Some("林長青"), Some("lin@koi.example")));
        assert_eq!(user.name, "林長青");
    }

    #[test]
    fn profile_name_falls_back_to_email_local_part() {
        let user = map_user(&auth_user(None, Some("lin@koi.example")));
        assert_eq!(user.name, "lin");
        // empty strings count as absent
        let user = map_user(&auth_user(Some(""), Some("wang@koi.example")));
        assert_eq!(user.name, "wang");
    }

    #[test]
    fn profile_name_last_resort_is_user() {
        let user = map_user(&auth_user(None, None));
        assert_eq!(user.name, "User");
    }

    #[test]
    fn profile_role_and_avatar_defaults() {
        let mut raw = auth_user(Some("小王"), None);
        raw.user_metadata.role = Some("not a role".to_string());
        let user = map_user(&raw);
        assert_eq!(user.role, UserRole::Member);
        assert_eq!(
            user.avatar,
            "https://api.dicebear.com/7.x/avataaars/svg?seed=0f6b"
        );
    }
}
