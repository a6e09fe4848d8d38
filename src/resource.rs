//! Resource descriptors: the per-collection data that parameterizes the
//! generic CRUD engine. Behavioral differences between the two resources
//! (field typing, delete policy, body validation) live here as data.

use crate::errors::ApiError;
use crate::model;
use crate::query::FieldTypes;
use bson::Document as BsonDocument;

/// How DELETE is carried out for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Mark the record inactive via the given flag field; never remove it.
    Soft { flag: &'static str },
    /// Physically remove the record, returning the removed document.
    Hard,
}

type Validator = fn(serde_json::Value) -> Result<BsonDocument, ApiError>;

pub struct ResourceDescriptor {
    /// Collection name in the document store.
    pub collection: &'static str,
    /// Human-readable name interpolated into envelope messages.
    pub label: &'static str,
    pub fields: FieldTypes,
    pub delete: DeletePolicy,
    pub validate_create: Validator,
    pub validate_update: Validator,
}

pub static PLANTILLA: ResourceDescriptor = ResourceDescriptor {
    collection: "plantilla",
    label: "plantilla",
    fields: FieldTypes { int_fields: &["version", "sistema_id"], uuid_fields: &["grupo_id"] },
    delete: DeletePolicy::Soft { flag: "activo" },
    validate_create: model::plantilla_create,
    validate_update: model::plantilla_update,
};

pub static TIPO_PLANTILLA: ResourceDescriptor = ResourceDescriptor {
    collection: "tipo_plantilla",
    label: "tipo_plantilla",
    fields: FieldTypes { int_fields: &[], uuid_fields: &[] },
    delete: DeletePolicy::Hard,
    validate_create: model::tipo_plantilla_body,
    validate_update: model::tipo_plantilla_body,
};
