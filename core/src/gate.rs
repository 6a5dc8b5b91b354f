// storefront/src/gate.rs

//! The access gate evaluated before any protected view renders.
//!
//! One identity query per evaluation; the caller is either let through or sent
//! to the login page with the original destination carried along, so that
//! navigation resumes there after authentication.

use crate::error::ApiError;
use crate::session::{Principal, SessionContext};
use tracing::{info, instrument, warn};
use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/login";
pub const REDIRECT_PARAM: &str = "redirect";
pub const ADMIN_LANDING_PATH: &str = "/admin/dashboard";
pub const CHECKING_MESSAGE: &str = "Checking access...";

/// A navigable location: path plus optional raw query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
  pub path: String,
  pub query: Option<String>,
}

impl Route {
  /// Splits `"/checkout/abc?x=1"` into path and query. A `#fragment` is dropped.
  pub fn parse(location: &str) -> Self {
    let location = location.split('#').next().unwrap_or_default();
    match location.split_once('?') {
      Some((path, query)) if !query.is_empty() => Route {
        path: path.to_string(),
        query: Some(query.to_string()),
      },
      Some((path, _)) => Route {
        path: path.to_string(),
        query: None,
      },
      None => Route {
        path: location.to_string(),
        query: None,
      },
    }
  }

  /// Path and query exactly as they should be resumed after login.
  pub fn return_path(&self) -> String {
    match &self.query {
      Some(q) => format!("{}?{}", self.path, q),
      None => self.path.clone(),
    }
  }

  /// `/login?redirect=<urlencoded return path>`.
  pub fn login_redirect(&self) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
      .append_pair(REDIRECT_PARAM, &self.return_path())
      .finish();
    format!("{LOGIN_PATH}?{query}")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRequirement {
  Authenticated,
  Admin,
}

impl AccessRequirement {
  pub fn admin_required(self) -> bool {
    self == AccessRequirement::Admin
  }
}

/// Why a deny happened. Every deny redirects to login; the reason lets a view
/// offer a retry instead when the identity endpoint was merely unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
  Unauthenticated,
  NotAdmin,
  IdentityUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
  Allow(Principal),
  Deny { redirect_to: String, reason: DenyReason },
}

impl GateDecision {
  pub fn is_allowed(&self) -> bool {
    matches!(self, GateDecision::Allow(_))
  }
}

/// What a protected view shows. `Checking` renders a neutral placeholder, never
/// the content and never a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
  Checking,
  Allowed(Principal),
  Denied { redirect_to: String, reason: DenyReason },
}

impl GateState {
  /// Moves out of `Checking`. A settled state ignores later decisions.
  pub fn settle(self, decision: GateDecision) -> GateState {
    match (self, decision) {
      (GateState::Checking, GateDecision::Allow(p)) => GateState::Allowed(p),
      (GateState::Checking, GateDecision::Deny { redirect_to, reason }) => GateState::Denied { redirect_to, reason },
      (settled, _) => {
        warn!("gate decision arrived for an already settled view, ignoring");
        settled
      }
    }
  }

  pub fn is_settled(&self) -> bool {
    !matches!(self, GateState::Checking)
  }

  pub fn loading_message(&self) -> Option<&'static str> {
    matches!(self, GateState::Checking).then_some(CHECKING_MESSAGE)
  }
}

#[derive(Debug, Clone)]
pub struct AccessGate {
  session: SessionContext,
  transient_retries: u32,
}

impl AccessGate {
  pub fn new(session: SessionContext, transient_retries: u32) -> Self {
    Self {
      session,
      transient_retries,
    }
  }

  pub fn session(&self) -> &SessionContext {
    &self.session
  }

  /// Decides whether `route` may render for the current session.
  ///
  /// Read-only apart from refreshing the session's principal. Transport errors,
  /// timeouts and 5xx are retried up to `transient_retries` times; a 401/403 or
  /// an unreadable identity is never retried.
  #[instrument(name = "AccessGate::evaluate", skip(self, route), fields(route = %route.return_path()))]
  pub async fn evaluate(&self, route: &Route, requirement: AccessRequirement) -> GateDecision {
    let mut attempt = 0;
    let identity = loop {
      match self.session.refresh().await {
        Err(e) if e.is_transient() && attempt < self.transient_retries => {
          attempt += 1;
          warn!(attempt, error = %e, "identity query failed transiently, retrying");
        }
        other => break other,
      }
    };

    let deny = |reason: DenyReason| {
      info!(?reason, "access denied");
      GateDecision::Deny {
        redirect_to: route.login_redirect(),
        reason,
      }
    };

    match identity {
      Err(e) => deny(classify_failure(&e)),
      Ok(principal) if requirement.admin_required() && !principal.is_admin() => deny(DenyReason::NotAdmin),
      Ok(principal) => GateDecision::Allow(principal),
    }
  }
}

fn classify_failure(e: &ApiError) -> DenyReason {
  if e.is_transient() {
    DenyReason::IdentityUnavailable
  } else {
    DenyReason::Unauthenticated
  }
}

/// Where to go after a successful login.
///
/// Admins land on the dashboard. Everyone else resumes at the `redirect`
/// parameter of the login page's query, provided it is a local path; anything
/// else falls back to `/`.
pub fn post_login_destination(login_query: &str, principal: &Principal) -> String {
  if principal.is_admin() {
    return ADMIN_LANDING_PATH.to_string();
  }
  form_urlencoded::parse(login_query.trim_start_matches('?').as_bytes())
    .find(|(k, _)| k == REDIRECT_PARAM)
    .map(|(_, v)| v.into_owned())
    .filter(|target| is_local_path(target))
    .unwrap_or_else(|| "/".to_string())
}

fn is_local_path(target: &str) -> bool {
  target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

/// Route patterns mapped to their requirement. Unlisted routes are public.
#[derive(Debug, Clone)]
pub struct RouteTable {
  entries: Vec<(Vec<String>, AccessRequirement)>,
}

impl Default for RouteTable {
  fn default() -> Self {
    let mut table = Self { entries: Vec::new() };
    for pattern in [
      "/product",
      "/cart",
      "/admin/create-products",
      "/single-cart/:id",
      "/checkout/:id",
      "/orders",
      "/profile",
    ] {
      table.protect(pattern, AccessRequirement::Authenticated);
    }
    table.protect(ADMIN_LANDING_PATH, AccessRequirement::Admin);
    table
  }
}

impl RouteTable {
  pub fn empty() -> Self {
    Self { entries: Vec::new() }
  }

  /// Registers `pattern` (segments, `:name` matches any one segment).
  pub fn protect(&mut self, pattern: &str, requirement: AccessRequirement) -> &mut Self {
    self.entries.push((segments(pattern), requirement));
    self
  }

  pub fn requirement_for(&self, route: &Route) -> Option<AccessRequirement> {
    let path = segments(&route.path);
    self
      .entries
      .iter()
      .find(|(pattern, _)| {
        pattern.len() == path.len() && pattern.iter().zip(&path).all(|(p, s)| p.starts_with(':') || p == s)
      })
      .map(|(_, requirement)| *requirement)
  }
}

fn segments(path: &str) -> Vec<String> {
  path
    .split('/')
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}
