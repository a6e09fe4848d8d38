//! The uniform response envelope and the BSON-to-JSON conversion that
//! stringifies non-JSON-native values (object ids, timestamps, UUIDs).
//! Everything here is pure; the persistence layer is never touched.

use bson::spec::BinarySubtype;
use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The `{Success, Status, Message, Data}` wrapper every handler returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Status")]
    pub status: u16,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response description handed back to the host collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

/// Result shapes the formatter normalizes.
#[derive(Debug, Clone)]
pub enum Payload {
    Record(BsonDocument),
    Records(Vec<BsonDocument>),
    None,
}

/// Builds the envelope and serializes it. `Data` is attached only on a
/// success carrying a payload; an empty record list still serializes as
/// `"Data": []`.
#[must_use]
pub fn format_response(result: Payload, message: &str, status: u16, success: bool) -> HttpResponse {
    let data = if success {
        match result {
            Payload::Record(doc) => Some(document_to_json(&doc)),
            Payload::Records(docs) => {
                Some(Value::Array(docs.iter().map(document_to_json).collect()))
            }
            Payload::None => None,
        }
    } else {
        None
    };
    let envelope = Envelope { success, status, message: message.to_string(), data };
    let body = serde_json::to_string(&envelope).unwrap_or_else(|e| {
        log::error!("Error serializing envelope: {e}");
        format!("{{\"Success\":false,\"Status\":500,\"Message\":\"{message}\"}}")
    });
    HttpResponse { status_code: status, body }
}

/// Converts a stored document to JSON, stringifying the well-known
/// non-native values in place: object ids to hex, datetimes to their
/// textual form, binary UUIDs to hyphenated strings.
#[must_use]
pub fn document_to_json(doc: &BsonDocument) -> Value {
    let mut out = serde_json::Map::with_capacity(doc.len());
    for (k, v) in doc {
        out.insert(k.clone(), bson_to_json(v));
    }
    Value::Object(out)
}

fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(dt.to_string()),
        Bson::Binary(bin) if bin.subtype == BinarySubtype::Uuid => Uuid::from_slice(&bin.bytes)
            .map_or(Value::Null, |u| Value::String(u.to_string())),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Bson::Null => Value::Null,
        Bson::Document(d) => document_to_json(d),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        other => Value::String(other.to_string()),
    }
}
