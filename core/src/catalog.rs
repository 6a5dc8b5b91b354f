// storefront/src/catalog.rs

//! Reads the checkout view needs before an order intent can exist: the product
//! being bought and a fresh copy of the buyer's profile.

use crate::error::ApiError;
use crate::http::ApiClient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const PROFILE_PATH: &str = "/profile";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
  #[serde(alias = "_id")]
  pub id: String,
  pub title: String,
  pub price: Decimal,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub image: Option<String>,
}

impl Product {
  pub fn primary_image(&self) -> Option<&str> {
    self.images.first().map(String::as_str).or(self.image.as_deref())
  }
}

/// The profile as `GET /profile` returns it under `user`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub mobile: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub zip_code: String,
}

impl CustomerProfile {
  pub fn snapshot(&self) -> CustomerSnapshot {
    CustomerSnapshot {
      name: self.username.clone(),
      address: self.address.clone(),
      phone: self.mobile.clone(),
    }
  }

  pub fn full_address(&self) -> String {
    format!("{}, {}, {} {}", self.address, self.city, self.state, self.zip_code)
  }
}

/// Who and where, frozen at the moment the order intent is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub phone: String,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
  user: CustomerProfile,
}

#[derive(Debug, Clone)]
pub struct Catalog {
  api: ApiClient,
}

impl Catalog {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  #[instrument(name = "Catalog::product", skip(self), err(Display))]
  pub async fn product(&self, product_id: &str) -> Result<Product, ApiError> {
    self.api.get_json(&format!("/products/{product_id}")).await
  }

  /// Always hits the network; a checkout must not reuse an earlier session's profile.
  #[instrument(name = "Catalog::fresh_profile", skip(self), err(Display))]
  pub async fn fresh_profile(&self) -> Result<CustomerProfile, ApiError> {
    let envelope: ProfileEnvelope = self.api.get_json(PROFILE_PATH).await?;
    Ok(envelope.user)
  }
}
