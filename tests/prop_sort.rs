use bson::Bson;
use plantillas_crud::query::{FieldTypes, Order, parse_query, parse_sort_by};
use proptest::collection::vec;
use proptest::prelude::*;

const FIELDS: FieldTypes =
    FieldTypes { int_fields: &["version", "sistema_id"], uuid_fields: &["grupo_id"] };

fn field() -> impl Strategy<Value = String> {
    "[a-z_]{1,10}"
}

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("asc".to_string()),
        Just("desc".to_string()),
        Just("sideways".to_string()),
    ]
}

proptest! {
    #[test]
    fn equal_lengths_pair_positionally(pairs in vec((field(), token()), 1..6)) {
        let sortby = pairs.iter().map(|(f, _)| f.clone()).collect::<Vec<_>>().join(",");
        let order = pairs.iter().map(|(_, o)| o.clone()).collect::<Vec<_>>().join(",");
        let specs = parse_sort_by(&sortby, Some(&order));
        prop_assert_eq!(specs.len(), pairs.len());
        for (spec, (f, o)) in specs.iter().zip(&pairs) {
            prop_assert_eq!(&spec.field, f);
            let expected = if o == "desc" { Order::Desc } else { Order::Asc };
            prop_assert_eq!(spec.order, expected);
        }
    }

    #[test]
    fn mismatched_lengths_fall_back_to_ascending(
        fields in vec(field(), 1..6),
        orders in vec(token(), 2..8),
    ) {
        prop_assume!(orders.len() != fields.len());
        let specs = parse_sort_by(&fields.join(","), Some(&orders.join(",")));
        prop_assert_eq!(specs.len(), fields.len());
        prop_assert!(specs.iter().all(|s| s.order == Order::Asc));
    }

    #[test]
    fn single_order_token_applies_to_every_field(
        fields in vec(field(), 1..6),
        tok in token(),
    ) {
        let specs = parse_sort_by(&fields.join(","), Some(&tok));
        let expected = if tok == "desc" { Order::Desc } else { Order::Asc };
        prop_assert_eq!(specs.len(), fields.len());
        prop_assert!(specs.iter().all(|s| s.order == expected));
    }

    #[test]
    fn integer_field_values_round_trip(n in any::<i64>()) {
        let filter = parse_query(&format!("sistema_id:{n}"), &FIELDS).unwrap();
        prop_assert_eq!(filter.clauses()[0].value.clone(), Bson::Int64(n));
    }

    #[test]
    fn free_string_values_stay_strings(s in "[a-zA-Z][a-zA-Z0-9_-]{0,12}") {
        prop_assume!(s != "true" && s != "false");
        let filter = parse_query(&format!("nombre:{s}"), &FIELDS).unwrap();
        prop_assert_eq!(filter.clauses()[0].value.clone(), Bson::String(s));
    }
}
