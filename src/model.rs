//! Statically typed request models for both resources. Body validation is
//! deserialization into these structs: required fields are non-optional,
//! unknown fields are ignored, and optional fields left out of the body
//! are not written to the store.

use crate::errors::ApiError;
use crate::query;
use bson::Document as BsonDocument;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_true() -> bool {
    true
}

fn default_version() -> Option<i64> {
    Some(0)
}

/// Template record as accepted on create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plantilla {
    pub tipo_plantilla_id: String,
    pub sistema_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codigo_abreviacion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contenido: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grupo_id: Option<Uuid>,
    #[serde(default = "default_version", skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadatos: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default = "default_true")]
    pub activo: bool,
}

/// Template-type record: three required strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipoPlantilla {
    pub nombre: String,
    pub descripcion: String,
    pub codigo_abreviacion: String,
}

/// Validates a template create body. Assigns a fresh `grupo_id` when the
/// body carries none and stamps `fecha_creacion`.
///
/// # Errors
/// Returns `ApiError::Validation` on a schema violation.
pub fn plantilla_create(value: serde_json::Value) -> Result<BsonDocument, ApiError> {
    let mut model: Plantilla =
        serde_json::from_value(value).map_err(|e| ApiError::Validation(e.to_string()))?;
    if model.grupo_id.is_none() {
        model.grupo_id = Some(Uuid::new_v4());
    }
    let mut doc = to_document(&model, &["grupo_id"])?;
    doc.insert("fecha_creacion", bson::DateTime::from_millis(Utc::now().timestamp_millis()));
    Ok(doc)
}

/// Validates a template update body.
///
/// # Errors
/// Returns `ApiError::Validation` on a schema violation.
pub fn plantilla_update(value: serde_json::Value) -> Result<BsonDocument, ApiError> {
    let model: Plantilla =
        serde_json::from_value(value).map_err(|e| ApiError::Validation(e.to_string()))?;
    to_document(&model, &["grupo_id"])
}

/// Validates a template-type body (create and update share the schema).
///
/// # Errors
/// Returns `ApiError::Validation` on a schema violation.
pub fn tipo_plantilla_body(value: serde_json::Value) -> Result<BsonDocument, ApiError> {
    let model: TipoPlantilla =
        serde_json::from_value(value).map_err(|e| ApiError::Validation(e.to_string()))?;
    to_document(&model, &[])
}

fn to_document<T: Serialize>(model: &T, uuid_fields: &[&str]) -> Result<BsonDocument, ApiError> {
    let mut doc = bson::serialize_to_document(model).map_err(|e| ApiError::Bson(e.to_string()))?;
    coerce_uuid_fields(&mut doc, uuid_fields)?;
    Ok(doc)
}

/// Rewrites string-valued UUID fields into the binary representation the
/// store and the filter coercion agree on.
fn coerce_uuid_fields(doc: &mut BsonDocument, fields: &[&str]) -> Result<(), ApiError> {
    for field in fields {
        if let Some(bson::Bson::String(s)) = doc.get(*field) {
            let u = Uuid::parse_str(s).map_err(|e| ApiError::InvalidUuid(e.to_string()))?;
            doc.insert(*field, query::uuid_to_bson(u));
        }
    }
    Ok(())
}
