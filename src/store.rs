//! In-memory document store implementing the persistence contract the
//! handlers rely on: insert-one, find-one, find-many with
//! filter/projection/sort/skip/limit, update-one and delete-one.
//!
//! Deployments are process-wide and keyed by connection URI, so every
//! per-request client connected with the same configuration observes the
//! same data. Clients themselves are scoped resources: acquired at the
//! start of a request and closed on every exit path.

use crate::config::Config;
use crate::errors::ApiError;
use crate::query::{self, Filter, FindOptions};
use bson::oid::ObjectId;
use bson::{Bson, Document as BsonDocument};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u64,
}

/// One named collection of BSON documents, insertion-ordered.
pub struct Collection {
    name: String,
    docs: RwLock<Vec<BsonDocument>>,
}

impl Collection {
    fn new(name: String) -> Self {
        Self { name, docs: RwLock::new(Vec::new()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts one document, assigning a fresh `_id` when the document does
    /// not carry one, and returns the id.
    pub fn insert_one(&self, mut doc: BsonDocument) -> Result<ObjectId, ApiError> {
        let id = match doc.get("_id") {
            Some(Bson::ObjectId(oid)) => *oid,
            Some(other) => {
                return Err(ApiError::InvalidObjectId(format!(
                    "_id must be an object id, got {other}"
                )));
            }
            None => {
                let oid = ObjectId::new();
                doc.insert("_id", oid);
                oid
            }
        };
        self.docs.write().push(doc);
        Ok(id)
    }

    /// Returns the first document matching the filter.
    #[must_use]
    pub fn find_one(&self, filter: &Filter) -> Option<BsonDocument> {
        self.docs
            .read()
            .iter()
            .find(|d| query::eval_filter(d, filter))
            .cloned()
    }

    /// Convenience lookup by object id.
    #[must_use]
    pub fn find_by_id(&self, id: ObjectId) -> Option<BsonDocument> {
        self.find_one(&Filter::default().eq("_id", id))
    }

    /// Runs a filtered, sorted, paginated and projected read.
    ///
    /// A `limit` of zero means no limit and a negative `limit` caps the
    /// page at its absolute value.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::QueryError` when `skip` is negative.
    pub fn find(&self, opts: &FindOptions) -> Result<Vec<BsonDocument>, ApiError> {
        let skip = usize::try_from(opts.skip).map_err(|_| {
            ApiError::QueryError(format!(
                "skip must be a non-negative integer, got {}",
                opts.skip
            ))
        })?;
        let limit = match opts.limit {
            0 => usize::MAX,
            n => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
        };
        let mut out: Vec<BsonDocument> = {
            let docs = self.docs.read();
            docs.iter()
                .filter(|d| query::eval_filter(d, &opts.filter))
                .cloned()
                .collect()
        };
        if !opts.sort.is_empty() {
            query::sort_docs(&mut out, &opts.sort);
        }
        let end = skip.saturating_add(limit).min(out.len());
        let mut page: Vec<BsonDocument> =
            if skip >= out.len() { Vec::new() } else { out[skip..end].to_vec() };
        if let Some(fields) = &opts.projection {
            for d in &mut page {
                *d = query::project(d, fields);
            }
        }
        Ok(page)
    }

    /// Applies a `$set`-style partial update to the first matching
    /// document. `modified` stays zero when every written field already
    /// held the same value.
    pub fn update_one(&self, filter: &Filter, set: &BsonDocument) -> UpdateReport {
        let mut docs = self.docs.write();
        let Some(doc) = docs.iter_mut().find(|d| query::eval_filter(d, filter)) else {
            return UpdateReport::default();
        };
        let mut changed = false;
        for (k, v) in set {
            let prev = doc.get(k);
            if prev.is_none_or(|p| !query::bson_equal(p, v)) {
                changed = true;
            }
            doc.insert(k.clone(), v.clone());
        }
        UpdateReport { matched: 1, modified: u64::from(changed) }
    }

    /// Physically removes the first matching document.
    pub fn delete_one(&self, filter: &Filter) -> DeleteReport {
        let mut docs = self.docs.write();
        match docs.iter().position(|d| query::eval_filter(d, filter)) {
            Some(idx) => {
                docs.remove(idx);
                DeleteReport { deleted: 1 }
            }
            None => DeleteReport::default(),
        }
    }
}

/// A logical database: a set of named collections, created on first use.
#[derive(Default)]
pub struct Database {
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(col) = self.collections.read().get(name) {
            return col.clone();
        }
        let mut cols = self.collections.write();
        cols.entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name.to_string())))
            .clone()
    }
}

/// Everything reachable through one connection URI.
#[derive(Default)]
struct Deployment {
    databases: RwLock<HashMap<String, Arc<Database>>>,
}

impl Deployment {
    fn database(&self, name: &str) -> Arc<Database> {
        if let Some(db) = self.databases.read().get(name) {
            return db.clone();
        }
        let mut dbs = self.databases.write();
        dbs.entry(name.to_string()).or_default().clone()
    }
}

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<Deployment>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// A per-request connection handle.
pub struct Client {
    deployment: Arc<Deployment>,
}

impl Client {
    #[must_use]
    pub fn database(&self, name: &str) -> Arc<Database> {
        self.deployment.database(name)
    }

    /// Releases the connection. Consumes the handle so no operation can
    /// reference it afterwards.
    pub fn close(self) {
        log::info!("Closing client DB");
    }
}

/// Opens a connection to the store addressed by the configuration.
///
/// # Errors
/// Infallible for the in-process store, but callers treat a failure as
/// persistence-unreachable and answer with a 500 envelope.
pub fn connect(cfg: &Config) -> Result<Client, ApiError> {
    let uri = cfg.uri();
    let deployment = {
        if let Some(d) = REGISTRY.read().get(&uri) {
            d.clone()
        } else {
            let mut reg = REGISTRY.write();
            reg.entry(uri).or_default().clone()
        }
    };
    log::info!("Successful connection to the database");
    Ok(Client { deployment })
}
