use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::db::models::{fold_rows, serialize_money, truthy_id};
use crate::utils::error::AppError;
use crate::utils::upload::UploadForm;
use crate::validation::{money, truthy_decimal, truthy_integer, truthy_text, Numeric};

pub const PRICE_OUT_OF_RANGE: &str = "Unit price is out of range.";

/// A row of the `materials` table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: i32,
    pub item_id: String,
    pub item_name: String,
    pub available_qty: i32,
    #[schema(value_type = String, example = "12.50")]
    #[serde(serialize_with = "serialize_money")]
    pub unit_price: BigDecimal,
}

/// A material together with its images.
///
/// `images` holds stored file paths in the create response and image file
/// names in the listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRecord {
    pub id: i32,
    pub item_id: String,
    pub item_name: String,
    pub available_qty: i32,
    #[schema(value_type = String, example = "12.50")]
    #[serde(serialize_with = "serialize_money")]
    pub unit_price: BigDecimal,
    pub images: Vec<String>,
}

impl MaterialRecord {
    pub fn new(material: Material, images: Vec<String>) -> Self {
        MaterialRecord {
            id: material.id,
            item_id: material.item_id,
            item_name: material.item_name,
            available_qty: material.available_qty,
            unit_price: material.unit_price,
            images,
        }
    }
}

/// One row of `materials LEFT JOIN material_images`.
#[derive(Debug, Clone, FromRow)]
pub struct MaterialImageRow {
    pub id: i32,
    pub item_id: String,
    pub item_name: String,
    pub available_qty: i32,
    pub unit_price: BigDecimal,
    pub file_name: Option<String>,
}

/// Groups joined rows into one record per material; a material without
/// images gets an empty list.
pub fn group_material_rows(rows: Vec<MaterialImageRow>) -> Vec<MaterialRecord> {
    fold_rows(
        rows,
        |row| row.id,
        |row| {
            let material = Material {
                id: row.id,
                item_id: row.item_id.clone(),
                item_name: row.item_name.clone(),
                available_qty: row.available_qty,
                unit_price: row.unit_price.clone(),
            };
            MaterialRecord::new(material, Vec::new())
        },
        |record, row| {
            if let Some(file_name) = row.file_name.filter(|name| !name.is_empty()) {
                record.images.push(file_name);
            }
        },
    )
}

/// Validated fields of a material creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMaterial {
    pub item_id: String,
    pub item_name: String,
    pub available_qty: i32,
    pub unit_price: BigDecimal,
}

impl NewMaterial {
    /// Every field must be present and truthy; a zero quantity or price is
    /// rejected like an empty one.
    pub fn from_form(form: &UploadForm) -> Result<Self, AppError> {
        const MISSING: &str = "All fields are required.";

        let item_id =
            truthy_text(form.text("itemId")).ok_or_else(|| AppError::validation(MISSING))?;
        let item_name =
            truthy_text(form.text("itemName")).ok_or_else(|| AppError::validation(MISSING))?;
        let available_qty = match truthy_integer(form.text("availableQty")) {
            Numeric::Value(qty) => qty,
            Numeric::Missing => return Err(AppError::validation(MISSING)),
            Numeric::Invalid | Numeric::OutOfRange => {
                return Err(AppError::validation("Available quantity must be a whole number."))
            }
        };
        let unit_price = match truthy_decimal(form.text("unitPrice")) {
            Numeric::Value(price) => price,
            Numeric::Missing => return Err(AppError::validation(MISSING)),
            Numeric::Invalid => return Err(AppError::validation("Unit price must be a number.")),
            Numeric::OutOfRange => return Err(AppError::validation(PRICE_OUT_OF_RANGE)),
        };

        Ok(NewMaterial {
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            available_qty,
            unit_price,
        })
    }
}

/// Body of `PUT /api/material/update`. Quantity and price only need to be
/// present, zero is a valid value.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterial {
    pub id: Option<i32>,
    pub available_qty: Option<i32>,
    #[schema(value_type = Option<String>, example = "12.50")]
    pub unit_price: Option<BigDecimal>,
}

impl UpdateMaterial {
    /// Id, quantity and price, each present; the id must also be non-zero.
    pub fn fields(self) -> Result<(i32, i32, BigDecimal), AppError> {
        let (Some(id), Some(available_qty), Some(unit_price)) =
            (truthy_id(self.id), self.available_qty, self.unit_price)
        else {
            return Err(AppError::validation("ID, Quantity, and Price are required."));
        };
        let unit_price =
            money(unit_price).ok_or_else(|| AppError::validation(PRICE_OUT_OF_RANGE))?;
        Ok((id, available_qty, unit_price))
    }
}

/// Body of `PUT /api/material/update-quantity`.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialQuantity {
    pub id: Option<i32>,
    pub available_qty: Option<i32>,
}

/// Multipart layout of `POST /api/material/add` (documentation only).
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialUploadSchema {
    item_id: String,
    item_name: String,
    available_qty: i32,
    unit_price: String,
    /// Any number of image files
    images: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct MaterialCreated {
    pub material: MaterialRecord,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct MaterialList {
    pub materials: Vec<MaterialRecord>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct FlatMaterialList {
    pub materials: Vec<Material>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::Zero;
    use serde_json::json;
    use std::str::FromStr;

    fn row(id: i32, file_name: Option<&str>) -> MaterialImageRow {
        MaterialImageRow {
            id,
            item_id: format!("M-{id}"),
            item_name: format!("Item {id}"),
            available_qty: 5,
            unit_price: BigDecimal::from_str("2.50").unwrap(),
            file_name: file_name.map(str::to_string),
        }
    }

    fn form(value: serde_json::Value) -> UploadForm {
        UploadForm::from_json(value.as_object().cloned().unwrap())
    }

    #[test]
    fn grouping_collects_images_per_material() {
        let grouped = group_material_rows(vec![
            row(1, Some("a.png")),
            row(1, Some("b.png")),
            row(2, None),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].images, vec!["a.png", "b.png"]);
        assert!(grouped[1].images.is_empty());
    }

    #[test]
    fn record_serializes_with_camel_case_and_empty_images() {
        let grouped = group_material_rows(vec![row(7, None)]);
        let value = serde_json::to_value(&grouped[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "itemId": "M-7",
                "itemName": "Item 7",
                "availableQty": 5,
                "unitPrice": "2.50",
                "images": []
            })
        );
    }

    #[test]
    fn new_material_requires_truthy_fields() {
        let ok = NewMaterial::from_form(&form(json!({
            "itemId": "M-1", "itemName": "Chalk", "availableQty": "10", "unitPrice": "2.5"
        })))
        .unwrap();
        assert_eq!(ok.available_qty, 10);

        for missing in [
            json!({ "itemName": "Chalk", "availableQty": 10, "unitPrice": 2.5 }),
            json!({ "itemId": "", "itemName": "Chalk", "availableQty": 10, "unitPrice": 2.5 }),
            json!({ "itemId": "M-1", "itemName": "Chalk", "availableQty": 0, "unitPrice": 2.5 }),
            json!({ "itemId": "M-1", "itemName": "Chalk", "availableQty": 10, "unitPrice": 0 }),
        ] {
            let err = NewMaterial::from_form(&form(missing)).unwrap_err();
            assert_eq!(err.to_string(), "All fields are required.");
        }

        let err = NewMaterial::from_form(&form(json!({
            "itemId": "M-1", "itemName": "Chalk", "availableQty": "ten", "unitPrice": 2.5
        })))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn update_distinguishes_zero_from_missing() {
        let zero: UpdateMaterial =
            serde_json::from_value(json!({ "id": 1, "availableQty": 0, "unitPrice": 0 })).unwrap();
        assert_eq!(zero.available_qty, Some(0));
        assert!(zero.unit_price.is_some());

        let missing: UpdateMaterial = serde_json::from_value(json!({ "id": 1 })).unwrap();
        assert!(missing.available_qty.is_none());
        assert!(missing.unit_price.is_none());
    }

    #[test]
    fn out_of_range_prices_are_rejected_on_create_and_update() {
        for price in ["1e9223372036854775807", "1e-9223372036854775807", "1e40"] {
            let err = NewMaterial::from_form(&form(json!({
                "itemId": "M-1", "itemName": "Chalk", "availableQty": 1, "unitPrice": price
            })))
            .unwrap_err();
            assert_eq!(err.to_string(), PRICE_OUT_OF_RANGE);

            let update = UpdateMaterial {
                id: Some(1),
                available_qty: Some(1),
                unit_price: Some(BigDecimal::from_str(price).unwrap()),
            };
            assert_eq!(update.fields().unwrap_err().to_string(), PRICE_OUT_OF_RANGE);
        }

        let update: UpdateMaterial =
            serde_json::from_value(json!({ "id": 2, "availableQty": 0, "unitPrice": 0 })).unwrap();
        let (id, qty, price) = update.fields().unwrap();
        assert_eq!((id, qty), (2, 0));
        assert!(price.is_zero());
    }
}
