use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::customers;

/// One person's punch card at one merchant. Identity is anchored by the
/// merchant-salted phone hash, optionally claimed later by an authenticated
/// user id; both carry unique indexes so the same person never gets two rows.
#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq, Serialize)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Customer {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub phone_hash: String,
    pub phone_last_4: String,
    pub user_id: Option<Uuid>,
    pub stamps_current: i32,
    pub stamps_lifetime: i32,
    pub visits_total: i32,
    pub first_visit_at: DateTime<Utc>,
    pub last_visit_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub phone_hash: String,
    pub phone_last_4: String,
    pub user_id: Option<Uuid>,
    pub stamps_current: i32,
    pub stamps_lifetime: i32,
    pub visits_total: i32,
    pub first_visit_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct LinkCustomer {
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct LinkResponse {
    pub success: bool,
    pub customer: Customer,
}
