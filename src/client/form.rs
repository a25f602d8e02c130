use std::collections::BTreeMap;

use serde::Serialize;

use crate::validation::{is_valid_email, is_valid_phone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    Register,
}

impl AuthMode {
    /// Path segment under `/api/teachers/`.
    pub fn endpoint(self) -> &'static str {
        match self {
            AuthMode::SignIn => "login",
            AuthMode::Register => "register",
        }
    }
}

/// Text inputs of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    TelNum,
    Nic,
    HighestQualification,
    Specialization,
    ExperienceYears,
    CurrentDegree,
    CurrentDiploma,
}

pub type FieldErrors = BTreeMap<Field, &'static str>;

/// Body posted to the login or register endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuthRequest {
    Login {
        email: String,
        password: String,
        #[serde(rename = "rememberMe")]
        remember_me: bool,
    },
    Register {
        name: String,
        email: String,
        password: String,
        tel_num: String,
        nic: String,
        highest_qualification: String,
        degrees: Vec<String>,
        diplomas: Vec<String>,
        specialization: String,
        experience_years: String,
    },
}

/// State of the teacher sign-in / registration form.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    mode: AuthMode,
    values: BTreeMap<Field, String>,
    remember_me: bool,
    degrees: Vec<String>,
    diplomas: Vec<String>,
    errors: FieldErrors,
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        AuthForm {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or_default()
    }

    pub fn degrees(&self) -> &[String] {
        &self.degrees
    }

    pub fn diplomas(&self) -> &[String] {
        &self.diplomas
    }

    pub fn remember_me(&self) -> bool {
        self.remember_me
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Stores `value` and clears any error shown for `field`.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
        self.errors.remove(&field);
    }

    pub fn set_remember_me(&mut self, remember_me: bool) {
        self.remember_me = remember_me;
    }

    /// Switches between sign-in and registration and clears all errors.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::Register,
            AuthMode::Register => AuthMode::SignIn,
        };
        self.errors.clear();
    }

    pub fn add_degree(&mut self) {
        if let Some(degree) = self.take_entry(Field::CurrentDegree) {
            self.degrees.push(degree);
        }
    }

    pub fn add_diploma(&mut self) {
        if let Some(diploma) = self.take_entry(Field::CurrentDiploma) {
            self.diplomas.push(diploma);
        }
    }

    pub fn remove_degree(&mut self, index: usize) {
        if index < self.degrees.len() {
            self.degrees.remove(index);
        }
    }

    pub fn remove_diploma(&mut self, index: usize) {
        if index < self.diplomas.len() {
            self.diplomas.remove(index);
        }
    }

    /// Clears the input and returns its text as typed, unless it was blank.
    fn take_entry(&mut self, field: Field) -> Option<String> {
        if self.value(field).trim().is_empty() {
            return None;
        }
        self.values.insert(field, String::new())
    }

    /// Evaluates every rule of the current mode without touching state.
    pub fn check(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        let email = self.value(Field::Email);
        if email.is_empty() {
            errors.insert(Field::Email, "Email is required");
        } else if !is_valid_email(email) {
            errors.insert(Field::Email, "Invalid email format");
        }

        let password = self.value(Field::Password);
        if password.is_empty() {
            errors.insert(Field::Password, "Password is required");
        } else if password.chars().count() < 8 {
            errors.insert(Field::Password, "Password must be at least 8 characters");
        }

        if self.mode == AuthMode::Register {
            let required = [
                (Field::Name, "Name is required"),
                (Field::Nic, "NIC is required"),
                (Field::HighestQualification, "Highest qualification is required"),
                (Field::Specialization, "Specialization is required"),
                (Field::ExperienceYears, "Experience is required"),
            ];
            for (field, message) in required {
                if self.value(field).is_empty() {
                    errors.insert(field, message);
                }
            }

            let tel_num = self.value(Field::TelNum);
            if tel_num.is_empty() {
                errors.insert(Field::TelNum, "Phone number is required");
            } else if !is_valid_phone(tel_num) {
                errors.insert(Field::TelNum, "Phone number must be 10 digits");
            }

            if self.value(Field::ConfirmPassword) != password {
                errors.insert(Field::ConfirmPassword, "Passwords do not match");
            }
        }

        errors
    }

    /// Runs `check`, replaces the stored errors with its result and reports
    /// whether the form is valid.
    pub fn validate(&mut self) -> bool {
        self.errors = self.check();
        self.errors.is_empty()
    }

    /// The payload for the current mode.
    pub fn request(&self) -> AuthRequest {
        let text = |field| self.value(field).to_string();
        match self.mode {
            AuthMode::SignIn => AuthRequest::Login {
                email: text(Field::Email),
                password: text(Field::Password),
                remember_me: self.remember_me,
            },
            AuthMode::Register => AuthRequest::Register {
                name: text(Field::Name),
                email: text(Field::Email),
                password: text(Field::Password),
                tel_num: text(Field::TelNum),
                nic: text(Field::Nic),
                highest_qualification: text(Field::HighestQualification),
                degrees: self.degrees.clone(),
                diplomas: self.diplomas.clone(),
                specialization: text(Field::Specialization),
                experience_years: text(Field::ExperienceYears),
            },
        }
    }
}
