use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::db::models::{fold_rows, serialize_money, truthy_id};
use crate::utils::error::AppError;
use crate::utils::upload::UploadForm;
use crate::validation::{truthy_decimal, truthy_text, Numeric};

/// Multipart field carrying the profile image.
pub const PROFILE_IMAGE_FIELD: &str = "profileImage";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i32,
    pub emp_id: String,
    pub name: String,
    pub position: String,
    #[schema(value_type = String, example = "85000.00")]
    #[serde(serialize_with = "serialize_money")]
    pub salary: BigDecimal,
}

/// An employee with the file name of its profile image, if any.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: i32,
    pub emp_id: String,
    pub name: String,
    pub position: String,
    #[schema(value_type = String, example = "85000.00")]
    #[serde(serialize_with = "serialize_money")]
    pub salary: BigDecimal,
    pub profile_image: Option<String>,
}

impl EmployeeRecord {
    pub fn new(employee: Employee, profile_image: Option<String>) -> Self {
        EmployeeRecord {
            id: employee.id,
            emp_id: employee.emp_id,
            name: employee.name,
            position: employee.position,
            salary: employee.salary,
            profile_image,
        }
    }
}

/// One row of `employees LEFT JOIN employee_images`.
#[derive(Debug, Clone, FromRow)]
pub struct EmployeeImageRow {
    pub id: i32,
    pub emp_id: String,
    pub name: String,
    pub position: String,
    pub salary: BigDecimal,
    pub file_name: Option<String>,
}

pub fn group_employee_rows(rows: Vec<EmployeeImageRow>) -> Vec<EmployeeRecord> {
    fold_rows(
        rows,
        |row| row.id,
        |row| EmployeeRecord {
            id: row.id,
            emp_id: row.emp_id.clone(),
            name: row.name.clone(),
            position: row.position.clone(),
            salary: row.salary.clone(),
            profile_image: None,
        },
        |record, row| {
            if let Some(file_name) = row.file_name.filter(|name| !name.is_empty()) {
                record.profile_image = Some(file_name);
            }
        },
    )
}

/// Validated fields of an employee creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub emp_id: String,
    pub name: String,
    pub position: String,
    pub salary: BigDecimal,
}

impl NewEmployee {
    pub fn from_form(form: &UploadForm) -> Result<Self, AppError> {
        const MISSING: &str = "All fields are required.";

        let emp_id = truthy_text(form.text("empId")).ok_or_else(|| AppError::validation(MISSING))?;
        let name = truthy_text(form.text("name")).ok_or_else(|| AppError::validation(MISSING))?;
        let position =
            truthy_text(form.text("position")).ok_or_else(|| AppError::validation(MISSING))?;
        let salary = required_salary(form, MISSING)?;

        Ok(NewEmployee {
            emp_id: emp_id.to_string(),
            name: name.to_string(),
            position: position.to_string(),
            salary,
        })
    }
}

/// Validated fields of an employee update. A zero salary is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeUpdate {
    pub id: i32,
    pub name: String,
    pub position: String,
    pub salary: BigDecimal,
}

impl EmployeeUpdate {
    pub fn from_form(form: &UploadForm) -> Result<Self, AppError> {
        const MISSING: &str = "All fields are required.";

        let id = form
            .text("id")
            .and_then(|text| text.trim().parse::<i32>().ok())
            .and_then(|id| truthy_id(Some(id)))
            .ok_or_else(|| AppError::validation(MISSING))?;
        let name = truthy_text(form.text("name")).ok_or_else(|| AppError::validation(MISSING))?;
        let position =
            truthy_text(form.text("position")).ok_or_else(|| AppError::validation(MISSING))?;
        let salary = required_salary(form, MISSING)?;

        Ok(EmployeeUpdate {
            id,
            name: name.to_string(),
            position: position.to_string(),
            salary,
        })
    }
}

fn required_salary(form: &UploadForm, missing: &str) -> Result<BigDecimal, AppError> {
    match truthy_decimal(form.text("salary")) {
        Numeric::Value(salary) => Ok(salary),
        Numeric::Missing => Err(AppError::validation(missing)),
        Numeric::Invalid => Err(AppError::validation("Salary must be a number.")),
        Numeric::OutOfRange => Err(AppError::validation("Salary is out of range.")),
    }
}

/// Multipart layout of the employee add/update endpoints (documentation only).
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUploadSchema {
    /// Required on update only
    id: Option<i32>,
    /// Required on create only
    emp_id: Option<String>,
    name: String,
    position: String,
    salary: String,
    /// A single image file
    profile_image: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct EmployeeCreated {
    pub employee: EmployeeRecord,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct EmployeeList {
    pub employees: Vec<EmployeeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn form(value: serde_json::Value) -> UploadForm {
        UploadForm::from_json(value.as_object().cloned().unwrap())
    }

    fn row(id: i32, file_name: Option<&str>) -> EmployeeImageRow {
        EmployeeImageRow {
            id,
            emp_id: format!("E-{id}"),
            name: "Nimal".into(),
            position: "Clerk".into(),
            salary: BigDecimal::from_str("45000.00").unwrap(),
            file_name: file_name.map(str::to_string),
        }
    }

    #[test]
    fn grouping_sets_profile_image_or_null() {
        let grouped = group_employee_rows(vec![row(1, Some("1-profileImage.png")), row(2, None)]);
        assert_eq!(grouped[0].profile_image.as_deref(), Some("1-profileImage.png"));
        assert_eq!(grouped[1].profile_image, None);

        let value = serde_json::to_value(&grouped[1]).unwrap();
        assert_eq!(value["profileImage"], serde_json::Value::Null);
        assert_eq!(value["empId"], "E-2");
    }

    #[test]
    fn create_rejects_zero_salary() {
        let err = NewEmployee::from_form(&form(json!({
            "empId": "E-1", "name": "Nimal", "position": "Clerk", "salary": 0
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "All fields are required.");
    }

    #[test]
    fn update_requires_truthy_id_and_salary() {
        let ok = EmployeeUpdate::from_form(&form(json!({
            "id": 4, "name": "Nimal", "position": "Lead", "salary": "52000"
        })))
        .unwrap();
        assert_eq!(ok.id, 4);
        assert_eq!(ok.salary, BigDecimal::from(52000));

        for bad in [
            json!({ "id": 0, "name": "Nimal", "position": "Lead", "salary": 1 }),
            json!({ "name": "Nimal", "position": "Lead", "salary": 1 }),
            json!({ "id": 4, "name": "Nimal", "position": "Lead", "salary": 0 }),
            json!({ "id": 4, "name": "", "position": "Lead", "salary": 1 }),
        ] {
            assert!(matches!(
                EmployeeUpdate::from_form(&form(bad)),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn out_of_range_salary_is_a_validation_error() {
        for salary in ["1e9223372036854775807", "1e-9223372036854775807", "1e40"] {
            let err = NewEmployee::from_form(&form(json!({
                "empId": "E-1", "name": "Nimal", "position": "Clerk", "salary": salary
            })))
            .unwrap_err();
            assert_eq!(err.to_string(), "Salary is out of range.");
        }
    }
}
