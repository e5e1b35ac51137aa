use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub image: Option<String>,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub firebase_uid: Option<String>,
    pub is_onboarded: bool,
    pub created_at: String,
}

/// Fields supplied when a user is created on first sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub version: String,
    pub platform: String,
    pub firebase_uid: String,
}
