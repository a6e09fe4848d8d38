use bson::doc;
use plantillas_crud::Config;
use plantillas_crud::query::{FindOptions, Filter, parse_sort_by};
use plantillas_crud::store::{self, Collection};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn test_collection(stem: &str) -> Arc<Collection> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let cfg = Config::new("localhost", "27017", &format!("{stem}_{now}"));
    let client = store::connect(&cfg).unwrap();
    client.database(&cfg.database).collection("plantilla")
}

#[test]
fn insert_assigns_id_and_find_by_id_round_trips() {
    let col = test_collection("store_insert");
    let id = col.insert_one(doc! {"nombre": "a"}).unwrap();
    let found = col.find_by_id(id).unwrap();
    assert_eq!(found.get_object_id("_id").unwrap(), id);
    assert_eq!(found.get_str("nombre").unwrap(), "a");
}

#[test]
fn connections_to_the_same_database_share_state() {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    let cfg = Config::new("localhost", "27017", &format!("store_shared_{now}"));

    let client = store::connect(&cfg).unwrap();
    let id = client
        .database(&cfg.database)
        .collection("plantilla")
        .insert_one(doc! {"nombre": "a"})
        .unwrap();
    client.close();

    let client = store::connect(&cfg).unwrap();
    let col = client.database(&cfg.database).collection("plantilla");
    assert!(col.find_by_id(id).is_some());
    client.close();
}

#[test]
fn update_one_reports_matched_and_modified() {
    let col = test_collection("store_update");
    let id = col.insert_one(doc! {"nombre": "a", "version": 0_i64}).unwrap();
    let filter = Filter::default().eq("_id", id);

    let report = col.update_one(&filter, &doc! {"nombre": "b"});
    assert_eq!(report.matched, 1);
    assert_eq!(report.modified, 1);
    assert_eq!(col.find_by_id(id).unwrap().get_str("nombre").unwrap(), "b");

    // Writing the same value again matches but modifies nothing.
    let report = col.update_one(&filter, &doc! {"nombre": "b"});
    assert_eq!(report.matched, 1);
    assert_eq!(report.modified, 0);

    let missing = Filter::default().eq("_id", bson::oid::ObjectId::new());
    let report = col.update_one(&missing, &doc! {"nombre": "c"});
    assert_eq!(report.matched, 0);
    assert_eq!(report.modified, 0);
}

#[test]
fn delete_one_removes_only_the_first_match() {
    let col = test_collection("store_delete");
    col.insert_one(doc! {"nombre": "dup"}).unwrap();
    col.insert_one(doc! {"nombre": "dup"}).unwrap();

    let filter = Filter::default().eq("nombre", "dup");
    assert_eq!(col.delete_one(&filter).deleted, 1);
    assert_eq!(col.find(&FindOptions::default()).unwrap().len(), 1);
    assert_eq!(col.delete_one(&filter).deleted, 1);
    assert_eq!(col.delete_one(&filter).deleted, 0);
}

#[test]
fn find_applies_sort_pagination_and_projection() {
    let col = test_collection("store_find");
    for (nombre, version) in [("c", 3_i64), ("a", 1), ("d", 4), ("b", 2)] {
        col.insert_one(doc! {"nombre": nombre, "version": version}).unwrap();
    }

    let opts = FindOptions {
        sort: parse_sort_by("nombre", Some("desc")),
        limit: 2,
        skip: 1,
        projection: Some(vec!["nombre".to_string()]),
        ..FindOptions::default()
    };
    let page = col.find(&opts).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].get_str("nombre").unwrap(), "c");
    assert_eq!(page[1].get_str("nombre").unwrap(), "b");
    // Projection keeps _id and drops everything not listed.
    assert!(page[0].get_object_id("_id").is_ok());
    assert!(page[0].get("version").is_none());
}

#[test]
fn find_skip_beyond_end_is_empty() {
    let col = test_collection("store_skip");
    col.insert_one(doc! {"nombre": "a"}).unwrap();
    let opts = FindOptions { skip: 5, ..FindOptions::default() };
    assert!(col.find(&opts).unwrap().is_empty());
}

#[test]
fn find_zero_limit_means_no_limit() {
    let col = test_collection("store_limit_zero");
    for i in 0..15_i64 {
        col.insert_one(doc! {"version": i}).unwrap();
    }
    let opts = FindOptions { limit: 0, ..FindOptions::default() };
    assert_eq!(col.find(&opts).unwrap().len(), 15);
}

#[test]
fn find_negative_limit_caps_at_absolute_value() {
    let col = test_collection("store_limit_negative");
    for i in 0..5_i64 {
        col.insert_one(doc! {"version": i}).unwrap();
    }
    let opts = FindOptions { limit: -2, ..FindOptions::default() };
    assert_eq!(col.find(&opts).unwrap().len(), 2);
}

#[test]
fn find_negative_skip_is_an_error() {
    let col = test_collection("store_skip_negative");
    col.insert_one(doc! {"nombre": "a"}).unwrap();
    let opts = FindOptions { skip: -1, ..FindOptions::default() };
    assert!(col.find(&opts).is_err());
}
