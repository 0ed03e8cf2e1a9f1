// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed back-office endpoints: reservations, the vehicle fleet and its
//! catalogues, and staff registration.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::UserProfile;

pub const REGISTER_PATH: &str = "auth/register/";

/// A numeric field the backend sends either as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Default for Amount {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One vehicle line on a reservation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationItem {
    pub vehicle_id: u64,
    pub line_amount: Amount,
    pub model: String,
    pub brand_name: String,
    pub license_plate: String,
    pub year: u32,
    pub status: String,
    pub price_per_day: Amount,
    pub price_per_hour: Amount,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reservation {
    pub id: u64,
    pub customer_user_id: u64,
    /// ISO-8601 timestamps, passed through as sent.
    pub start_at: String,
    pub end_at: String,
    pub status: String,
    pub note: String,
    pub total_amount: Amount,
    pub items: Vec<ReservationItem>,
    pub customer_username: String,
    pub customer_email: String,
    pub document_number: String,
    pub full_name: String,
    pub nationality: String,
    pub phone_number: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vehicle {
    pub id: u64,
    pub brand_id: u64,
    pub type_id: u64,
    pub model: String,
    pub year: u32,
    pub license_plate: String,
    pub transmission: String,
    pub seats: u32,
    pub price_per_hour: Amount,
    pub price_per_day: Amount,
    pub color: Option<String>,
    pub vin: Option<String>,
    pub fuel_type: Option<String>,
    pub images: Vec<String>,
}

/// Brand or vehicle type catalogue entry.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReservationItem {
    pub vehicle_id: u64,
}

/// Body of a reservation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReservation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_user_id: Option<u64>,
    pub start_at: String,
    pub end_at: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    pub items: Vec<NewReservationItem>,
}

/// Staff account registration, sent form-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub document_type: String,
    pub document_number: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    /// ISO country code, upper-cased before sending.
    pub nationality_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    /// Registration channel; back-office accounts are always `WEB`.
    pub context: String,
}

impl ApiClient {
    /// List reservations, optionally filtered by status (e.g. `pending`).
    pub async fn list_reservations(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<Reservation>, ApiError> {
        let mut url = self.url("reservations")?;
        if let Some(status) = status.filter(|s| !s.is_empty() && *s != "all") {
            url.query_pairs_mut().append_pair("status", status);
        }
        let request = self.http.request(Method::GET, url);
        self.send_json(request).await
    }

    pub async fn get_reservation(&self, id: u64) -> Result<Reservation, ApiError> {
        self.get_json(&format!("reservations/{id}")).await
    }

    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, ApiError> {
        self.get_json("vehicles").await
    }

    pub async fn get_vehicle(&self, id: u64) -> Result<Vehicle, ApiError> {
        self.get_json(&format!("vehicles/{id}")).await
    }

    pub async fn list_vehicle_brands(&self) -> Result<Vec<CatalogEntry>, ApiError> {
        self.get_json("vehicles/brands").await
    }

    pub async fn list_vehicle_types(&self) -> Result<Vec<CatalogEntry>, ApiError> {
        self.get_json("vehicles/types").await
    }

    pub async fn create_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<Reservation, ApiError> {
        if reservation.items.is_empty() {
            return Err(ApiError::Request("a reservation needs at least one vehicle".to_owned()));
        }
        self.post_json("reservations/", reservation).await
    }

    /// Register a staff account. Returns the created user as the backend
    /// reports it.
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<UserProfile, ApiError> {
        let mut form = request.clone();
        form.nationality_code = form.nationality_code.to_uppercase();
        let request = self.request(Method::POST, REGISTER_PATH)?.form(&form);
        self.send_json(request).await
    }
}
