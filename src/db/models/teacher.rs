use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::utils::error::AppError;

/// Multipart field carrying a teacher's profile image.
pub const TEACHER_IMAGE_FIELD: &str = "profile_image";
use crate::validation::{is_valid_email, is_valid_phone};

/// A row of the `teachers` table.
#[derive(Debug, Clone, FromRow)]
pub struct TeacherRow {
    pub id: i32,
    pub teacher_name: String,
    pub email: String,
    pub password_hash: String,
    pub tel_num: String,
    pub profile_image: Option<String>,
    pub nic: String,
    pub highest_qualification: String,
    pub degrees: Json<Vec<String>>,
    pub diplomas: Json<Vec<String>>,
    pub specialization: String,
    pub experience_years: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Qualifications {
    pub highest_qualification: String,
    pub degrees: Vec<String>,
    pub diplomas: Vec<String>,
    pub specialization: String,
    pub experience_years: i32,
}

/// The teacher profile handed to the client after login or registration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct TeacherProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(rename = "profileImage")]
    pub profile_image: Option<String>,
    pub qualifications: Qualifications,
}

impl From<TeacherRow> for TeacherProfile {
    fn from(row: TeacherRow) -> Self {
        TeacherProfile {
            id: row.id,
            name: row.teacher_name,
            email: row.email,
            profile_image: row.profile_image,
            qualifications: Qualifications {
                highest_qualification: row.highest_qualification,
                degrees: row.degrees.0,
                diplomas: row.diplomas.0,
                specialization: row.specialization,
                experience_years: row.experience_years,
            },
        }
    }
}

/// Body of `POST /api/teachers/register`.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(default)]
pub struct RegisterTeacher {
    pub name: String,
    pub email: String,
    pub password: String,
    pub tel_num: String,
    pub nic: String,
    pub highest_qualification: String,
    pub degrees: Vec<String>,
    pub diplomas: Vec<String>,
    pub specialization: String,
    /// Number or numeric string; empty means 0
    #[schema(value_type = Object)]
    pub experience_years: Value,
}

impl RegisterTeacher {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Name is required"));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("Please enter a valid email"));
        }
        if self.password.chars().count() < 8 {
            return Err(AppError::validation("Password must be at least 8 characters"));
        }
        if !is_valid_phone(&self.tel_num) {
            return Err(AppError::validation("Please enter a valid 10-digit phone number"));
        }
        if self.nic.chars().count() < 5 {
            return Err(AppError::validation("Please enter a valid NIC"));
        }
        self.experience_years()?;
        Ok(())
    }

    pub fn experience_years(&self) -> Result<i32, AppError> {
        let invalid = || AppError::validation("Experience must be a whole number of years");
        match &self.experience_years {
            Value::Null => Ok(0),
            Value::Number(number) => number
                .as_i64()
                .and_then(|years| i32::try_from(years).ok())
                .ok_or_else(invalid),
            Value::String(text) if text.trim().is_empty() => Ok(0),
            Value::String(text) => text.trim().parse().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

/// Body of `POST /api/teachers/login`.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(default)]
pub struct LoginTeacher {
    pub email: String,
    pub password: String,
    #[serde(rename = "rememberMe")]
    pub remember_me: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct AuthPayload {
    pub token: String,
    pub teacher: TeacherProfile,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TeacherPayload {
    pub teacher: TeacherProfile,
}

/// A teacher as shown in the guide listing, without credentials.
#[derive(Serialize, Debug, Clone, PartialEq, FromRow, ToSchema)]
pub struct TeacherSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(rename = "profileImage")]
    pub profile_image: Option<String>,
    pub nic: String,
    pub highest_qualification: String,
    #[sqlx(json)]
    pub degrees: Vec<String>,
    #[sqlx(json)]
    pub diplomas: Vec<String>,
    pub specialization: String,
    pub experience_years: i32,
    #[serde(rename = "joinDate")]
    pub join_date: DateTime<Utc>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TeacherList {
    pub teachers: Vec<TeacherSummary>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TeacherDetail {
    pub teacher: TeacherSummary,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ProfileImageUpdated {
    #[serde(rename = "profileImage")]
    pub profile_image: String,
}

/// Multipart layout of `POST /api/teachers/update` (documentation only).
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct ProfileImageUploadSchema {
    /// A single image file
    profile_image: String,
}
