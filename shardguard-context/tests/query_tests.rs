mod common;

use common::{new_invoice, new_line_item, seed, Fixture};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shardguard_context::ContextError;
use shardguard_model::Entity;

fn invoice(name: &str, status: Value) -> Entity {
    Entity::new("invoice", json!({ "invoice_name": name, "status": status }))
}

fn names(rows: &[Entity]) -> Vec<&str> {
    rows.iter().map(|r| r.get_str("/invoice_name").unwrap()).collect()
}

fn seeded() -> Fixture {
    let fx = Fixture::new();
    seed(
        &fx,
        "1.",
        [
            invoice("c", json!("open")),
            invoice("a", json!("paid")),
            invoice("b", json!("open")),
            invoice("d", Value::Null),
        ],
    );
    seed(&fx, "2.", [invoice("z", json!("open"))]);
    fx
}

#[test]
fn where_eq_filters_within_tenant() {
    let fx = seeded();
    let ctx = fx.open("1.");
    let open = ctx.query("invoice").unwrap().where_eq("status", "open").order_by("invoice_name").all().unwrap();
    assert_eq!(names(&open), vec!["b", "c"]);
}

#[test]
fn where_null_matches_missing_values() {
    let fx = seeded();
    let ctx = fx.open("1.");
    let rows = ctx.query("invoice").unwrap().where_eq("status", Value::Null).all().unwrap();
    assert_eq!(names(&rows), vec!["d"]);
}

#[test]
fn default_order_is_insertion_order() {
    let fx = seeded();
    let rows = fx.open("1.").query("invoice").unwrap().all().unwrap();
    assert_eq!(names(&rows), vec!["c", "a", "b", "d"]);
}

#[test]
fn order_desc_and_limit() {
    let fx = seeded();
    let rows = fx.open("1.").query("invoice").unwrap().order_by_desc("invoice_name").limit(2).all().unwrap();
    assert_eq!(names(&rows), vec!["d", "c"]);
}

#[test]
fn first_and_count() {
    let fx = seeded();
    let ctx = fx.open("1.");
    let q = ctx.query("invoice").unwrap().where_eq("status", "open").order_by("invoice_name");
    assert_eq!(q.count().unwrap(), 2);
    assert_eq!(q.first().unwrap().unwrap().get_str("/invoice_name"), Some("b"));
    assert!(ctx.query("invoice").unwrap().where_eq("status", "void").first().unwrap().is_none());
}

#[test]
fn where_id_uses_row_column() {
    let fx = Fixture::new();
    let inv = new_invoice("a-1");
    seed(&fx, "1.", [inv.clone(), new_invoice("a-2")]);
    let rows = fx.open("1.").query("invoice").unwrap().where_eq("id", inv.id.to_string()).all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, inv.id);
}

#[test]
fn decimal_conditions_are_normalized() {
    let fx = Fixture::new();
    let inv = new_invoice("a-1");
    seed(
        &fx,
        "1.",
        [inv.clone(), new_line_item(&inv, "w", json!("4.50")), new_line_item(&inv, "x", json!(7))],
    );
    let ctx = fx.open("1.");
    assert_eq!(ctx.query("line_item").unwrap().where_eq("item_price", "4.5").count().unwrap(), 1);
    assert_eq!(ctx.query("line_item").unwrap().where_eq("item_price", 7).count().unwrap(), 1);
    assert_eq!(
        ctx.query("line_item").unwrap().where_eq("invoice_id", inv.id.to_string()).count().unwrap(),
        2
    );
}

#[test]
fn booleans_compare_as_json_booleans() {
    let fx = Fixture::new();
    seed(
        &fx,
        "1.",
        [
            Entity::new("company", json!({ "company_name": "Acme", "active": true })),
            Entity::new("company", json!({ "company_name": "Initech", "active": false })),
        ],
    );
    let rows = fx.open("1.").query("company").unwrap().where_eq("active", false).all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("/company_name"), Some("Initech"));
    assert_eq!(rows[0].get_bool("/active"), Some(false));
}

#[test]
fn unknown_field_is_invalid_query() {
    let fx = seeded();
    let ctx = fx.open("1.");
    let err = ctx.query("invoice").unwrap().where_eq("data_key", "2.").all().unwrap_err();
    assert!(matches!(err, ContextError::InvalidQuery(_)), "{err}");
    assert!(ctx.query("invoice").unwrap().order_by("nope").all().is_err());
}

#[test]
fn object_values_are_invalid_query() {
    let fx = seeded();
    let ctx = fx.open("1.");
    let err = ctx.query("invoice").unwrap().where_eq("status", json!({ "a": 1 })).count().unwrap_err();
    assert!(matches!(err, ContextError::InvalidQuery(_)));
}
