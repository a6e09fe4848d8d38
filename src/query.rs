use crate::errors::ApiError;
use bson::oid::ObjectId;
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

/// Default page size applied when the request carries no `limit`.
pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    /// Maps an `order` token to a direction. Unrecognized tokens default
    /// to ascending.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "desc" => Self::Desc,
            _ => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

/// Per-resource field typing consulted by filter coercion.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldTypes {
    pub int_fields: &'static [&'static str],
    pub uuid_fields: &'static [&'static str],
}

/// One equality clause of a filter. `Bson::Null` matches a field that is
/// absent or explicitly null.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub value: Bson,
}

/// Conjunction of equality clauses over typed fields. An empty filter
/// matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Adds an equality clause. A later clause on the same field replaces
    /// the earlier one in place (map semantics).
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        let field = field.into();
        let value = value.into();
        if let Some(existing) = self.clauses.iter_mut().find(|c| c.field == field) {
            existing.value = value;
        } else {
            self.clauses.push(Clause { field, value });
        }
        self
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Options for a read-many query, built per request and never persisted.
///
/// Semantics:
/// - When `projection` is `Some(fields)`, returned documents contain only
///   those fields (plus `_id` when present).
/// - Sorting is applied before pagination, pagination before projection.
/// - `limit` follows the wire protocol: `0` means no limit and a negative
///   value caps the result at its absolute value. A negative `skip` is
///   rejected by the store at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct FindOptions {
    pub filter: Filter,
    pub projection: Option<Vec<String>>,
    pub sort: Vec<SortSpec>,
    pub limit: i64,
    pub skip: i64,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            projection: None,
            sort: Vec::new(),
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

/// Parses the `query=k1:v1,k2:v2` mini-language into a typed filter.
///
/// Each comma token is split on its first colon; a token without a colon
/// becomes a null-valued clause. Coercion, in order: the literals
/// `true`/`false` become booleans; keys in the resource's integer set are
/// parsed as integers; the resource's UUID keys are parsed as UUIDs and
/// stored as binary; `_id` is parsed as an object id; anything else stays
/// a string. Values are not escaped, so commas and colons cannot appear
/// inside them.
///
/// # Errors
/// Returns an error when an integer, UUID, or object-id value fails to
/// parse. Mismatched *types* are not an error: they yield a filter that
/// matches nothing.
pub fn parse_query(query_str: &str, fields: &FieldTypes) -> Result<Filter, ApiError> {
    let mut filter = Filter::default();
    for cond in query_str.split(',') {
        let (key, value) = match cond.split_once(':') {
            Some((k, v)) => (k, coerce_value(k, v, fields)?),
            None => (cond, Bson::Null),
        };
        filter = filter.eq(key, value);
    }
    Ok(filter)
}

fn coerce_value(key: &str, raw: &str, fields: &FieldTypes) -> Result<Bson, ApiError> {
    if raw == "true" {
        return Ok(Bson::Boolean(true));
    }
    if raw == "false" {
        return Ok(Bson::Boolean(false));
    }
    if fields.int_fields.contains(&key) {
        let n: i64 = raw
            .parse()
            .map_err(|e| ApiError::QueryError(format!("invalid integer for '{key}': {e}")))?;
        return Ok(Bson::Int64(n));
    }
    if fields.uuid_fields.contains(&key) {
        let u = Uuid::parse_str(raw).map_err(|e| ApiError::InvalidUuid(e.to_string()))?;
        return Ok(uuid_to_bson(u));
    }
    if key == "_id" {
        let oid = ObjectId::parse_str(raw)
            .map_err(|e| ApiError::InvalidObjectId(e.to_string()))?;
        return Ok(Bson::ObjectId(oid));
    }
    Ok(Bson::String(raw.to_string()))
}

/// Renders a UUID as the BSON binary representation used for stored
/// `grupo_id` values, so filters and documents compare structurally.
#[must_use]
pub fn uuid_to_bson(u: Uuid) -> Bson {
    Bson::Binary(Binary { subtype: BinarySubtype::Uuid, bytes: u.as_bytes().to_vec() })
}

/// Pairs `sortby` fields with `order` directions.
///
/// Policy: no `order` means all ascending; a single `order` token applies
/// to every field; equal lengths pair positionally; unequal lengths with
/// more than one order token fall back to all ascending, ignoring the
/// order list entirely.
#[must_use]
pub fn parse_sort_by(sortby: &str, order: Option<&str>) -> Vec<SortSpec> {
    let sort_fields: Vec<&str> = sortby.split(',').collect();
    let Some(order) = order else {
        return all_ascending(&sort_fields);
    };
    let order_tokens: Vec<&str> = order.split(',').collect();
    if order_tokens.len() == 1 {
        let dir = Order::from_token(order_tokens[0]);
        return sort_fields
            .iter()
            .map(|f| SortSpec { field: (*f).to_string(), order: dir })
            .collect();
    }
    if order_tokens.len() == sort_fields.len() {
        return sort_fields
            .iter()
            .zip(&order_tokens)
            .map(|(f, o)| SortSpec { field: (*f).to_string(), order: Order::from_token(o) })
            .collect();
    }
    all_ascending(&sort_fields)
}

fn all_ascending(fields: &[&str]) -> Vec<SortSpec> {
    fields
        .iter()
        .map(|f| SortSpec { field: (*f).to_string(), order: Order::Asc })
        .collect()
}

/// Assembles the full query descriptor from the raw query-string map.
///
/// Recognized parameters: `query` (filter mini-language), `fields`
/// (comma-separated projection, unvalidated), `sortby`/`order`, `limit`
/// (default 10) and `offset` (default 0). An absent or empty map yields
/// the defaults.
///
/// # Errors
/// Returns an error when the filter fails to parse or when `limit`/
/// `offset` are non-numeric. The caller maps any such failure to a single
/// generic "incorrect parameter or no record" response.
pub fn parse_query_params(
    params: Option<&HashMap<String, String>>,
    fields: &FieldTypes,
) -> Result<FindOptions, ApiError> {
    let mut opts = FindOptions::default();
    let Some(params) = params else {
        return Ok(opts);
    };
    if let Some(query) = non_empty(params, "query") {
        opts.filter = parse_query(query, fields)?;
    }
    if let Some(projection) = non_empty(params, "fields") {
        opts.projection = Some(projection.split(',').map(str::to_string).collect());
    }
    if let Some(sortby) = non_empty(params, "sortby") {
        opts.sort = parse_sort_by(sortby, non_empty(params, "order"));
    }
    if let Some(limit) = non_empty(params, "limit") {
        opts.limit = parse_count("limit", limit)?;
    }
    if let Some(offset) = non_empty(params, "offset") {
        opts.skip = parse_count("offset", offset)?;
    }
    Ok(opts)
}

// Empty parameter values count as absent.
fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

// Numeric values pass through unclamped; the store decides what a zero or
// negative limit/skip means.
fn parse_count(name: &str, raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::QueryError(format!("invalid integer for '{name}': {e}")))
}

/// Evaluates a filter against one document. Every clause must hold.
#[must_use]
pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    filter.clauses().iter().all(|c| match &c.value {
        // {field: null} matches a missing field or an explicit null.
        Bson::Null => get_path(doc, &c.field).is_none_or(|v| matches!(v, Bson::Null)),
        value => get_path(doc, &c.field).is_some_and(|v| bson_equal(v, value)),
    })
}

fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut iter = path.split('.');
    let first = iter.next()?;
    let mut cur: Option<&Bson> = doc.get(first);
    for part in iter {
        match cur {
            Some(Bson::Document(d)) => cur = d.get(part),
            _ => return None,
        }
    }
    cur
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Structural equality with numeric cross-width coercion. Any other type
/// mismatch compares unequal, so a wrongly typed filter value silently
/// matches nothing.
#[allow(clippy::float_cmp, clippy::cast_precision_loss)]
#[must_use]
pub fn bson_equal(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Int32(x), Bson::Int64(y)) => i64::from(*x) == *y,
        (Bson::Int64(x), Bson::Int32(y)) => *x == i64::from(*y),
        (Bson::Int32(x), Bson::Double(y)) => f64::from(*x) == *y,
        (Bson::Double(x), Bson::Int32(y)) => *x == f64::from(*y),
        (Bson::Int64(x), Bson::Double(y)) => (*x as f64) == *y,
        (Bson::Double(x), Bson::Int64(y)) => *x == (*y as f64),
        _ => a == b,
    }
}

fn bson_cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(af), Some(bf)) = (to_f64(a), to_f64(b)) {
        return af.partial_cmp(&bf);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Sorts documents in place by the given specs. Documents missing a sort
/// field order before documents that carry it.
pub fn sort_docs(docs: &mut [BsonDocument], specs: &[SortSpec]) {
    docs.sort_by(|a, b| compare_docs(a, b, specs));
}

fn compare_docs(a: &BsonDocument, b: &BsonDocument, specs: &[SortSpec]) -> Ordering {
    for s in specs {
        let av = get_path(a, &s.field);
        let bv = get_path(b, &s.field);
        let ord = match (av, bv) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(ax), Some(bx)) => bson_cmp(ax, bx).unwrap_or(Ordering::Equal),
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Restricts a document to the projected fields. `_id` is retained when
/// present, matching the store's default projection behavior.
#[must_use]
pub fn project(doc: &BsonDocument, fields: &[String]) -> BsonDocument {
    let mut out = BsonDocument::new();
    if let Some(id) = doc.get("_id") {
        out.insert("_id", id.clone());
    }
    for f in fields {
        if f == "_id" {
            continue;
        }
        if let Some(v) = get_path(doc, f) {
            out.insert(f.clone(), v.clone());
        }
    }
    out
}
