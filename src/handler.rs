//! Method-dispatching CRUD engine. One generic `handle` covers both
//! resources; the differences (schema, field typing, delete policy) come
//! from the `ResourceDescriptor`. Status codes and messages follow the
//! v2 API contract exactly, including the historical oddities: 500 for an
//! unsupported method, 400 for update/delete of an unknown id, and the
//! `Success: true` 404 answer on a malformed read-many parameter.

use crate::config::Config;
use crate::errors::ApiError;
use crate::query::{self, Filter};
use crate::resource::{DeletePolicy, ResourceDescriptor};
use crate::response::{HttpResponse, Payload, format_response};
use crate::store::{self, Collection};
use bson::doc;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Inbound request description from the host collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "httpMethod")]
    pub http_method: String,
    #[serde(rename = "pathParameters", default, skip_serializing_if = "Option::is_none")]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(rename = "queryStringParameters", default, skip_serializing_if = "Option::is_none")]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Event {
    #[must_use]
    pub fn new(method: &str) -> Self {
        Self { http_method: method.to_string(), ..Self::default() }
    }

    #[must_use]
    pub fn with_path_id(mut self, id: &str) -> Self {
        self.path_parameters
            .get_or_insert_with(HashMap::new)
            .insert("id".to_string(), id.to_string());
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, key: &str, value: &str) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }
}

/// Entry point for the `plantilla` resource.
#[must_use]
pub fn handle_plantilla(cfg: &Config, event: &Event) -> HttpResponse {
    handle(&crate::resource::PLANTILLA, cfg, event)
}

/// Entry point for the `tipo_plantilla` resource.
#[must_use]
pub fn handle_tipo_plantilla(cfg: &Config, event: &Event) -> HttpResponse {
    handle(&crate::resource::TIPO_PLANTILLA, cfg, event)
}

/// Health check: no inputs, always a static 200 envelope.
#[must_use]
pub fn health() -> HttpResponse {
    format_response(Payload::None, "API CRUD Plantillas v2", 200, true)
}

/// Dispatches on the HTTP method and runs the matching operation.
#[must_use]
pub fn handle(resource: &ResourceDescriptor, cfg: &Config, event: &Event) -> HttpResponse {
    match event.http_method.as_str() {
        "POST" => post(resource, cfg, event),
        "PUT" => put(resource, cfg, event),
        "DELETE" => delete(resource, cfg, event),
        "GET" => get(resource, cfg, event),
        _ => format_response(Payload::Record(doc! {}), "HTTP method not allowed", 500, false),
    }
}

fn post(resource: &ResourceDescriptor, cfg: &Config, event: &Event) -> HttpResponse {
    let Ok(value) = parse_body(event) else {
        return format_response(
            Payload::Record(doc! {}),
            &format!("Error registering new {}! Detail: Error in input data", resource.label),
            500,
            false,
        );
    };
    let data = match (resource.validate_create)(value) {
        Ok(doc) => doc,
        Err(e) => return request_fault(resource, &e),
    };
    let Ok(client) = store::connect(cfg) else {
        return format_response(
            Payload::Record(doc! {}),
            &format!("Error registering new {}!", resource.label),
            500,
            false,
        );
    };
    let collection = client.database(&cfg.database).collection(resource.collection);
    let response = create(&collection, data);
    client.close();
    response
}

fn put(resource: &ResourceDescriptor, cfg: &Config, event: &Event) -> HttpResponse {
    let Ok(value) = parse_body(event) else {
        return format_response(
            Payload::Record(doc! {}),
            &format!("Error updating {}! Detail: Error in input data", resource.label),
            500,
            false,
        );
    };
    let id = match path_id(event) {
        Ok(id) => id,
        Err(e) => return request_fault(resource, &e),
    };
    let data = match (resource.validate_update)(value) {
        Ok(doc) => doc,
        Err(e) => return request_fault(resource, &e),
    };
    let Ok(client) = store::connect(cfg) else {
        return format_response(
            Payload::Record(doc! {}),
            &format!("Error updating {}!", resource.label),
            500,
            false,
        );
    };
    let collection = client.database(&cfg.database).collection(resource.collection);
    let response = update(&collection, &id, &data);
    client.close();
    response
}

fn delete(resource: &ResourceDescriptor, cfg: &Config, event: &Event) -> HttpResponse {
    let id = match path_id(event) {
        Ok(id) => id,
        Err(e) => return request_fault(resource, &e),
    };
    let Ok(client) = store::connect(cfg) else {
        return format_response(
            Payload::None,
            &format!("Error deleting {}!", resource.label),
            500,
            false,
        );
    };
    let collection = client.database(&cfg.database).collection(resource.collection);
    let response = match resource.delete {
        DeletePolicy::Soft { flag } => soft_delete(&collection, &id, flag),
        DeletePolicy::Hard => hard_delete(&collection, &id),
    };
    client.close();
    response
}

fn get(resource: &ResourceDescriptor, cfg: &Config, event: &Event) -> HttpResponse {
    let Ok(client) = store::connect(cfg) else {
        return format_response(
            Payload::Record(doc! {}),
            &format!("Error getting {}!", resource.label),
            500,
            false,
        );
    };
    let collection = client.database(&cfg.database).collection(resource.collection);
    let response = if event.path_parameters.is_some() {
        match path_id(event) {
            Ok(id) => get_one(&collection, &id),
            Err(e) => request_fault(resource, &e),
        }
    } else {
        match query::parse_query_params(event.query_string_parameters.as_ref(), &resource.fields) {
            Ok(opts) => get_all(&collection, &opts),
            Err(e) => {
                log::error!("Error in parse_query_params. Detail: {e}");
                format_response(
                    Payload::Record(doc! {}),
                    "Error service GetAll: The request contains an incorrect parameter or no record exists",
                    404,
                    true,
                )
            }
        }
    };
    client.close();
    response
}

// --- terminal operations against the collection ---

fn create(collection: &Arc<Collection>, data: bson::Document) -> HttpResponse {
    match collection.insert_one(data) {
        Ok(id) => match collection.find_by_id(id) {
            Some(new_data) => {
                format_response(Payload::Record(new_data), "Registration successful", 201, true)
            }
            None => format_response(
                Payload::Record(doc! {}),
                "Registration unsuccessful",
                400,
                false,
            ),
        },
        Err(e) => format_response(
            Payload::Record(doc! {}),
            &format!("Error service Post: {e}"),
            500,
            false,
        ),
    }
}

fn update(collection: &Arc<Collection>, id: &str, data: &bson::Document) -> HttpResponse {
    let oid = match ObjectId::parse_str(id) {
        Ok(oid) => oid,
        Err(e) => {
            return format_response(
                Payload::Record(doc! {}),
                &format!("Error service Put: {e}"),
                500,
                false,
            );
        }
    };
    let filter = Filter::default().eq("_id", oid);
    let report = collection.update_one(&filter, data);
    if report.modified > 0 {
        let updated = collection.find_one(&filter).map_or(Payload::None, Payload::Record);
        return format_response(updated, "Update successful", 200, true);
    }
    format_response(Payload::Record(doc! {}), "Update unsuccessful", 400, false)
}

fn soft_delete(collection: &Arc<Collection>, id: &str, flag: &str) -> HttpResponse {
    let oid = match ObjectId::parse_str(id) {
        Ok(oid) => oid,
        Err(e) => {
            return format_response(
                Payload::Record(doc! {}),
                &format!("Error service Delete: {e}"),
                500,
                false,
            );
        }
    };
    let filter = Filter::default().eq("_id", oid);
    let mut patch = bson::Document::new();
    patch.insert(flag, false);
    let report = collection.update_one(&filter, &patch);
    if report.modified > 0 {
        let updated = collection.find_one(&filter).map_or(Payload::None, Payload::Record);
        return format_response(updated, "Delete successful", 200, true);
    }
    format_response(Payload::None, "Delete unsuccessful", 400, false)
}

fn hard_delete(collection: &Arc<Collection>, id: &str) -> HttpResponse {
    let oid = match ObjectId::parse_str(id) {
        Ok(oid) => oid,
        Err(e) => {
            return format_response(
                Payload::Record(doc! {}),
                &format!("Error service Delete: {e}"),
                500,
                false,
            );
        }
    };
    let filter = Filter::default().eq("_id", oid);
    if let Some(data) = collection.find_one(&filter)
        && collection.delete_one(&filter).deleted > 0
    {
        return format_response(Payload::Record(data), "Delete successful", 200, true);
    }
    format_response(Payload::None, "Delete unsuccessful", 400, false)
}

fn get_one(collection: &Arc<Collection>, id: &str) -> HttpResponse {
    let oid = match ObjectId::parse_str(id) {
        Ok(oid) => oid,
        Err(e) => {
            return format_response(
                Payload::Record(doc! {}),
                &format!("Error service GetOne: {e}"),
                500,
                false,
            );
        }
    };
    match collection.find_by_id(oid) {
        Some(data) => format_response(Payload::Record(data), "Request successful", 200, true),
        None => format_response(Payload::Record(doc! {}), "Request unsuccessful", 404, false),
    }
}

fn get_all(collection: &Arc<Collection>, opts: &query::FindOptions) -> HttpResponse {
    // An empty result set is still a success.
    match collection.find(opts) {
        Ok(data) => format_response(Payload::Records(data), "Request successful", 200, true),
        Err(e) => format_response(
            Payload::Record(doc! {}),
            &format!("Error service GetAll: {e}"),
            500,
            false,
        ),
    }
}

// --- shared plumbing ---

fn parse_body(event: &Event) -> Result<serde_json::Value, ApiError> {
    let body = event
        .body
        .as_deref()
        .ok_or_else(|| ApiError::Validation("missing request body".to_string()))?;
    Ok(serde_json::from_str(body)?)
}

fn path_id(event: &Event) -> Result<String, ApiError> {
    event
        .path_parameters
        .as_ref()
        .and_then(|params| params.get("id"))
        .cloned()
        .ok_or_else(|| ApiError::QueryError("missing path parameter 'id'".to_string()))
}

/// Outermost degradation: anything not mapped by a more specific call
/// site becomes a generic 500 with the cause in the message.
fn request_fault(resource: &ResourceDescriptor, e: &ApiError) -> HttpResponse {
    log::error!("Error in {} request: {e}", resource.label);
    format_response(
        Payload::Record(doc! {}),
        &format!("Error in {} request! Detail: {e}", resource.label),
        500,
        false,
    )
}
