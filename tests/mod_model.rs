use bson::Bson;
use bson::spec::BinarySubtype;
use plantillas_crud::model::{plantilla_create, plantilla_update, tipo_plantilla_body};
use serde_json::json;
use uuid::Uuid;

#[test]
fn plantilla_create_applies_defaults_and_generated_fields() {
    let doc = plantilla_create(json!({"tipo_plantilla_id": "t1", "sistema_id": 3}))
        .expect("valid body");
    assert_eq!(doc.get_str("tipo_plantilla_id").unwrap(), "t1");
    assert_eq!(doc.get_i64("sistema_id").unwrap(), 3);
    assert!(doc.get_bool("activo").unwrap());
    assert_eq!(doc.get_i64("version").unwrap(), 0);
    assert!(doc.get_datetime("fecha_creacion").is_ok());
    match doc.get("grupo_id") {
        Some(Bson::Binary(bin)) => assert_eq!(bin.subtype, BinarySubtype::Uuid),
        other => panic!("grupo_id should be a binary uuid, got {other:?}"),
    }
}

#[test]
fn plantilla_create_keeps_supplied_grupo_id_as_binary() {
    let grupo = Uuid::new_v4();
    let doc = plantilla_create(json!({
        "tipo_plantilla_id": "t1",
        "sistema_id": 1,
        "grupo_id": grupo.to_string(),
    }))
    .expect("valid body");
    match doc.get("grupo_id") {
        Some(Bson::Binary(bin)) => {
            assert_eq!(bin.subtype, BinarySubtype::Uuid);
            assert_eq!(bin.bytes, grupo.as_bytes());
        }
        other => panic!("grupo_id should be a binary uuid, got {other:?}"),
    }
}

#[test]
fn plantilla_update_omits_absent_optionals() {
    let doc = plantilla_update(json!({"tipo_plantilla_id": "t1", "sistema_id": 1}))
        .expect("valid body");
    assert!(doc.get("nombre").is_none());
    assert!(doc.get("fecha_creacion").is_none());
    // Updates re-apply the schema defaults for the flags the body omits.
    assert!(doc.get_bool("activo").unwrap());
    assert_eq!(doc.get_i64("version").unwrap(), 0);
}

#[test]
fn missing_required_fields_are_validation_errors() {
    assert!(plantilla_create(json!({"sistema_id": 1})).is_err());
    assert!(plantilla_update(json!({"nombre": "x"})).is_err());
    assert!(tipo_plantilla_body(json!({"nombre": "x"})).is_err());
}
