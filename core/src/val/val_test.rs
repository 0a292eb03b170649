use std::sync::Arc;

use crate::val::{TableKey, TableValue, Val};

#[test]
fn type_names() {
    assert_eq!(Val::Nil.type_name(), "nil");
    assert_eq!(Val::Bool(true).type_name(), "boolean");
    assert_eq!(Val::Int(1).type_name(), "number");
    assert_eq!(Val::Float(1.0).type_name(), "number");
    assert_eq!(Val::Str("".into()).type_name(), "string");
    assert_eq!(Val::Table(Arc::new(TableValue::new())).type_name(), "table");
}

#[test]
fn truthiness() {
    assert!(!Val::Nil.truthy());
    assert!(!Val::Bool(false).truthy());
    assert!(Val::Bool(true).truthy());
    assert!(Val::Int(0).truthy());
    assert!(Val::Str("".into()).truthy());
}

#[test]
fn number_equality_crosses_the_int_float_split() {
    assert_eq!(Val::Int(1), Val::Float(1.0));
    assert_eq!(Val::Float(2.0), Val::Int(2));
    assert_ne!(Val::Int(1), Val::Float(1.5));
    assert_ne!(Val::Float(f64::NAN), Val::Float(f64::NAN));
}

#[test]
fn tables_compare_by_identity() {
    let a = Arc::new(TableValue::new());
    let b = Arc::new(TableValue::new());
    assert_eq!(Val::Table(a.clone()), Val::Table(a.clone()));
    // Structurally equal (both empty) but distinct objects.
    assert_ne!(Val::Table(a), Val::Table(b));
}

#[test]
fn raw_table_operations() {
    let t = TableValue::new();
    t.raw_set(&Val::Str("k".into()), Val::Int(1)).unwrap();
    assert_eq!(t.raw_get(&Val::Str("k".into())), Some(Val::Int(1)));

    // Integral float keys collapse onto the integer key.
    t.raw_set(&Val::Int(2), Val::Str("two".into())).unwrap();
    assert_eq!(t.raw_get(&Val::Float(2.0)), Some(Val::Str("two".into())));

    // Writing nil removes the entry.
    t.raw_set(&Val::Str("k".into()), Val::Nil).unwrap();
    assert_eq!(t.raw_get(&Val::Str("k".into())), None);

    assert!(t.raw_set(&Val::Nil, Val::Int(1)).is_err());
    assert!(t.raw_set(&Val::Float(f64::NAN), Val::Int(1)).is_err());
}

#[test]
fn table_key_normalization() {
    assert_eq!(TableKey::from_val(&Val::Float(3.0)), Some(TableKey::Int(3)));
    assert_eq!(TableKey::from_val(&Val::Float(3.5)), None);
    assert_eq!(TableKey::from_val(&Val::Nil), None);
}

#[test]
fn display_formats() {
    assert_eq!(Val::Nil.to_string(), "nil");
    assert_eq!(Val::Int(42).to_string(), "42");
    assert_eq!(Val::Float(1.5).to_string(), "1.5");
    assert_eq!(Val::Float(2.0).to_string(), "2.0");
    assert_eq!(Val::Str("hi".into()).to_string(), "hi");
    let t = Val::Table(Arc::new(TableValue::new()));
    assert!(t.to_string().starts_with("table: 0x"));
}

#[test]
fn metatable_round_trip() {
    let t = Arc::new(TableValue::new());
    assert!(t.metatable().is_none());
    let mt = Arc::new(TableValue::new());
    t.set_metatable(Some(mt.clone()));
    assert!(Arc::ptr_eq(&t.metatable().unwrap(), &mt));
    t.set_metatable(None);
    assert!(t.metatable().is_none());
}

#[test]
fn meta_field_ignores_stored_nil() {
    let t = Arc::new(TableValue::new());
    let mt = Arc::new(TableValue::new());
    t.set_metatable(Some(mt.clone()));
    assert!(t.meta_field("__index").is_none());
    mt.insert_str("__index", Val::Int(1));
    assert_eq!(t.meta_field("__index"), Some(Val::Int(1)));
}
