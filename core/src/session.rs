// storefront/src/session.rs

//! The caller's authentication state, held in one explicit, passed-down handle.
//!
//! [`SessionContext`] is the single source of truth for "who is browsing". It is
//! cloned into whatever needs it (the access gate, admin views) rather than read
//! from a global. Its role is only ever derived from a successful identity
//! response; any failure resets it to [`Role::Guest`].

use crate::error::{ApiError, Result, StorefrontError};
use crate::http::ApiClient;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const IDENTITY_PATH: &str = "/me";
const LOGIN_PATH: &str = "/login";
const REGISTER_PATH: &str = "/register";
pub const ADMIN_USERS_PATH: &str = "/admin/users";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Guest,
  User,
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub authenticated: bool,
  pub role: Role,
  /// Username or email; not interpreted beyond display and logging.
  pub identity: Option<String>,
}

impl Principal {
  pub fn guest() -> Self {
    Self {
      authenticated: false,
      role: Role::Guest,
      identity: None,
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  fn from_user(user: &UserRecord, admin_flag: Option<bool>) -> Self {
    let admin = admin_flag == Some(true) || user.is_admin();
    Self {
      authenticated: true,
      role: if admin { Role::Admin } else { Role::User },
      identity: user.email.clone().or_else(|| user.username.clone()),
    }
  }
}

/// User record as the backend returns it. Only the fields the core reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
  #[serde(default, alias = "_id")]
  pub id: Option<String>,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub admin: Option<bool>,
  #[serde(default)]
  pub role: Option<String>,
}

impl UserRecord {
  /// Elevated privilege: `admin: true` or `role: "admin"`. Absent means no.
  pub fn is_admin(&self) -> bool {
    self.admin == Some(true) || self.role.as_deref() == Some("admin")
  }

  fn has_identity(&self) -> bool {
    self.id.is_some() || self.username.is_some() || self.email.is_some()
  }
}

/// `GET /me` answers either `{ user: {...} }` or the user object itself.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdentityEnvelope {
  Wrapped {
    user: UserRecord,
    #[serde(default)]
    admin: Option<bool>,
  },
  Bare(UserRecord),
}

impl IdentityEnvelope {
  fn into_principal(self) -> Option<Principal> {
    match self {
      IdentityEnvelope::Wrapped { user, admin } => Some(Principal::from_user(&user, admin)),
      IdentityEnvelope::Bare(user) if user.has_identity() => Some(Principal::from_user(&user, None)),
      IdentityEnvelope::Bare(_) => None,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
  user: UserRecord,
  #[serde(default)]
  token: Option<String>,
}

/// Registration payload. New accounts are never created as admins.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub mobile: String,
  pub password: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub gender: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date_of_birth: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub zip_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
  #[serde(flatten)]
  user: &'a NewUser,
  admin: bool,
  cart: Vec<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct SessionContext {
  api: ApiClient,
  principal: Arc<RwLock<Principal>>,
}

impl SessionContext {
  pub fn new(api: ApiClient) -> Self {
    Self {
      api,
      principal: Arc::new(RwLock::new(Principal::guest())),
    }
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  pub fn principal(&self) -> Principal {
    self.principal.read().clone()
  }

  pub fn is_authenticated(&self) -> bool {
    self.principal.read().authenticated
  }

  pub fn is_admin(&self) -> bool {
    self.principal.read().is_admin()
  }

  /// Refuses early when the cached principal is not an admin. The server
  /// still enforces the role on every admin call.
  pub(crate) fn require_admin(&self) -> Result<()> {
    if self.is_admin() {
      Ok(())
    } else {
      Err(StorefrontError::Forbidden("admin privileges required".to_string()))
    }
  }

  fn set(&self, principal: Principal) {
    *self.principal.write() = principal;
  }

  /// Queries the identity endpoint once and replaces the cached principal.
  ///
  /// On any failure the principal becomes `Guest` and the error is returned so
  /// callers can tell a transient outage from a rejected session.
  #[instrument(name = "SessionContext::refresh", skip_all, err(Display))]
  pub async fn refresh(&self) -> std::result::Result<Principal, ApiError> {
    let outcome = self
      .api
      .get_json::<IdentityEnvelope>(IDENTITY_PATH)
      .await
      .and_then(|envelope| {
        envelope.into_principal().ok_or_else(|| ApiError::Decode {
          path: IDENTITY_PATH.to_string(),
          message: "identity response carried no user".to_string(),
        })
      });

    match outcome {
      Ok(principal) => {
        debug!(role = ?principal.role, "identity resolved");
        self.set(principal.clone());
        Ok(principal)
      }
      Err(e) => {
        self.set(Principal::guest());
        Err(e)
      }
    }
  }

  #[instrument(name = "SessionContext::login", skip_all, fields(email = %credentials.email), err(Display))]
  pub async fn login(&self, credentials: &Credentials) -> Result<Principal> {
    let response: LoginResponse = self.api.post_json(LOGIN_PATH, credentials).await?;
    self.api.set_bearer_token(response.token);
    let principal = Principal::from_user(&response.user, None);
    info!(role = ?principal.role, "login successful");
    self.set(principal.clone());
    Ok(principal)
  }

  #[instrument(name = "SessionContext::register", skip_all, fields(email = %new_user.email), err(Display))]
  pub async fn register(&self, new_user: &NewUser) -> Result<()> {
    let body = RegisterBody {
      user: new_user,
      admin: false,
      cart: Vec::new(),
    };
    let _: serde_json::Value = self.api.post_json(REGISTER_PATH, &body).await?;
    info!("registration accepted");
    Ok(())
  }

  /// Drops the cached principal and any bearer token.
  pub fn logout(&self) {
    if !self.is_authenticated() {
      warn!("logout called without an authenticated session");
    }
    self.api.set_bearer_token(None);
    self.set(Principal::guest());
  }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserList {
  Wrapped {
    #[serde(default)]
    users: Vec<UserRecord>,
  },
  Bare(Vec<UserRecord>),
}

/// Back-office view of registered accounts.
#[derive(Debug, Clone)]
pub struct AdminUsers {
  session: SessionContext,
}

impl AdminUsers {
  pub fn new(session: SessionContext) -> Self {
    Self { session }
  }

  #[instrument(name = "AdminUsers::list", skip_all, err(Display))]
  pub async fn list(&self) -> Result<Vec<UserRecord>> {
    self.session.require_admin()?;
    let list: UserList = self.session.api().get_json(ADMIN_USERS_PATH).await?;
    let users = match list {
      UserList::Wrapped { users } | UserList::Bare(users) => users,
    };
    debug!(count = users.len(), "users loaded");
    Ok(users)
  }
}
