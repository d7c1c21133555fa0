//! Value conversion through the key pipeline against `MemoryGraph`.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use common::Fixture;
use graphkeys::property::keys;
use graphkeys::property::{
    ArrayProperty, BooleanProperty, ConstantBooleanProperty, DateProperty, DoubleProperty, EncryptedStringProperty,
    EnumProperty, FunctionProperty, IntegerProperty, LongProperty, PasswordProperty, StringProperty,
};
use graphkeys::{
    EntityId, EntityType, Error, GraphObject, KeyRef, PasswordPolicy, Principal, PropertyBuilder,
    PropertyContainer, PropertyKey, PropertyMap, Schema, SecurityContext, Services, Settings, Value,
};

fn article_schema(keys: &[KeyRef]) -> Schema {
    let mut schema = Schema::new();
    schema.register(EntityType::node("Article").with_keys(keys.iter().cloned()));
    schema
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_integer_from_input_string() {
    let age = IntegerProperty::new("age").declared_by("Article").build();
    let fx = Fixture::new(article_schema(&[age.clone()]));
    let obj = fx.create("Article");

    let logical = PropertyMap::input_value_to_logical(&fx.ctx, &age, Value::from("42")).unwrap();
    age.set_property(&fx.ctx, &obj, logical).unwrap();

    assert_eq!(obj.get_property("age"), Some(Value::Int(42)));
    assert_eq!(age.get_property(&fx.ctx, &obj, true, None), Value::Int(42));
}

#[test]
fn test_date_with_format_round_trip() {
    let published = DateProperty::new("published").with_format("yyyy-MM-dd").build();
    let fx = Fixture::new(article_schema(&[published.clone()]));
    let obj = fx.create("Article");

    let logical = PropertyMap::input_value_to_logical(&fx.ctx, &published, Value::from("2024-01-15")).unwrap();
    published.set_property(&fx.ctx, &obj, logical).unwrap();

    assert_eq!(obj.get_property("published"), Some(Value::Long(1_705_276_800_000)));
    let read = published.get_property(&fx.ctx, &obj, true, None);
    let output = PropertyMap::logical_value_to_input(&fx.ctx, &published, read).unwrap();
    assert_eq!(output, Value::from("2024-01-15"));
}

#[test]
fn test_enum_membership() {
    let status = EnumProperty::new("status", ["DRAFT", "PUBLISHED"]).declared_by("Article").build();
    let fx = Fixture::new(article_schema(&[status.clone()]));
    let obj = fx.create("Article");

    status.set_property(&fx.ctx, &obj, Value::from("PUBLISHED")).unwrap();
    assert_eq!(status.get_property(&fx.ctx, &obj, true, None), Value::from("PUBLISHED"));

    let err = status.set_property(&fx.ctx, &obj, Value::from("ARCHIVED")).unwrap_err();
    assert!(matches!(err, Error::ValueNotAllowed { .. }));
    assert!(err.to_string().contains("ARCHIVED"));
    assert_eq!(err.status(), 422);
    assert_eq!(obj.get_property("status"), Some(Value::from("PUBLISHED")));
}

#[test]
fn test_enum_blank_bypasses_validation() {
    let status = EnumProperty::new("status", ["DRAFT"]).build();
    let fx = Fixture::new(article_schema(&[status.clone()]));
    let obj = fx.create("Article");

    status.set_property(&fx.ctx, &obj, Value::from("")).unwrap();
    assert_eq!(obj.get_property("status"), Some(Value::from("")));
}

// ============================================================================
// Defaults and read-only keys
// ============================================================================

#[test]
fn test_missing_value_reads_default() {
    let rank = IntegerProperty::new("rank").with_default(7).build();
    let flag = BooleanProperty::new("featured").build();
    let title = StringProperty::new("title").build();
    let fx = Fixture::new(article_schema(&[rank.clone(), flag.clone(), title.clone()]));
    let obj = fx.create("Article");

    assert_eq!(rank.get_property(&fx.ctx, &obj, true, None), rank.default_value());
    assert_eq!(rank.get_property(&fx.ctx, &obj, true, None), Value::Int(7));
    assert_eq!(flag.get_property(&fx.ctx, &obj, true, None), Value::Bool(false));
    assert_eq!(title.get_property(&fx.ctx, &obj, true, None), Value::Null);
}

#[test]
fn test_read_only_keys_reject_writes_and_keep_value() {
    let fixed = ConstantBooleanProperty::new("archived", true).build();
    let computed = FunctionProperty::new("score").with_read_function("1").build();
    let fx = Fixture::new(article_schema(&[fixed.clone(), computed.clone()]));
    let obj = fx.create("Article");

    let uuid_before = obj.get_property(keys::ID_DB_NAME);
    let err = keys::ID.set_property(&fx.ctx, &obj, Value::from(keys::generate_uuid())).unwrap_err();
    assert!(matches!(err, Error::ReadOnlyProperty { .. }));
    assert_eq!(obj.get_property(keys::ID_DB_NAME), uuid_before);

    let err = keys::TYPE.set_property(&fx.ctx, &obj, Value::from("Other")).unwrap_err();
    assert!(matches!(err, Error::ReadOnlyProperty { .. }));
    assert_eq!(obj.type_name().as_deref(), Some("Article"));

    assert!(matches!(
        fixed.set_property(&fx.ctx, &obj, Value::Bool(false)),
        Err(Error::ReadOnlyProperty { .. })
    ));
    assert_eq!(fixed.get_property(&fx.ctx, &obj, true, None), Value::Bool(true));

    assert!(matches!(
        computed.set_property(&fx.ctx, &obj, Value::Int(3)),
        Err(Error::ReadOnlyProperty { .. })
    ));
}

#[test]
fn test_unlock_applies_to_one_write_only() {
    let fx = Fixture::new(article_schema(&[]));
    let obj = fx.create("Article");

    obj.unlock_read_only_properties_once();
    obj.unlock_system_properties_once();
    let replacement = keys::generate_uuid();
    keys::ID.set_property(&fx.ctx, &obj, Value::from(replacement.clone())).unwrap();
    assert_eq!(obj.uuid(), Some(replacement));

    let err = keys::ID.set_property(&fx.ctx, &obj, Value::from(keys::generate_uuid())).unwrap_err();
    assert!(matches!(err, Error::ReadOnlyProperty { .. }));
}

#[test]
fn test_write_without_transaction_fails() {
    let title = StringProperty::new("title").build();
    let fx = Fixture::new(article_schema(&[title.clone()]));
    let obj = fx.create("Article");

    let err = title.set_property(&fx.read_only_ctx(), &obj, Value::from("x")).unwrap_err();
    assert!(matches!(err, Error::NotInTransaction));
}

#[test]
fn test_modifications_are_recorded() {
    let title = StringProperty::new("title").build();
    let fx = Fixture::new(article_schema(&[title.clone()]));
    let obj = fx.create("Article");
    let before = fx.tx.modifications().len();

    title.set_property(&fx.ctx, &obj, Value::from("Hello")).unwrap();
    assert_eq!(fx.tx.modifications().len(), before + 1);
}

fn user_ctx(fx: &Fixture, user: &str) -> SecurityContext {
    SecurityContext::new(Principal::new(user, "Ursula"), fx.ctx.services().clone()).with_transaction(fx.tx.clone())
}

#[test]
fn test_modification_records_values_and_user() {
    let title = StringProperty::new("title").build();
    let fx = Fixture::new(article_schema(&[title.clone()]));
    let obj = fx.create("Article");
    let ctx = user_ctx(&fx, "u1");

    title.set_property(&ctx, &obj, Value::from("Hello")).unwrap();
    title.set_property(&ctx, &obj, Value::from("World")).unwrap();

    let changes: Vec<_> = fx.tx.modifications().snapshot().into_iter().filter(|m| m.key == "title").collect();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].entity, EntityId::Node(obj.node_id().unwrap()));
    assert_eq!(changes[0].user.as_deref(), Some("u1"));
    assert_eq!(changes[0].previous, Value::Null);
    assert_eq!(changes[0].new, Value::from("Hello"));
    assert_eq!(changes[1].previous, Value::from("Hello"));
    assert_eq!(changes[1].new, Value::from("World"));
}

#[test]
fn test_unvalidated_key_skips_modification_queue() {
    let scratch = StringProperty::new("scratch").unvalidated().build();
    let fx = Fixture::new(article_schema(&[scratch.clone()]));
    let obj = fx.create("Article");
    let before = fx.tx.modifications().len();

    scratch.set_property(&fx.ctx, &obj, Value::from("x")).unwrap();
    assert_eq!(fx.tx.modifications().len(), before);
    assert_eq!(obj.get_property("scratch"), Some(Value::from("x")));
}

#[test]
fn test_write_stamps_last_modified_info() {
    let title = StringProperty::new("title").build();
    let fx = Fixture::new(article_schema(&[title.clone()]));
    let obj = fx.create("Article");
    obj.remove_property(keys::LAST_MODIFIED_DATE_DB_NAME).unwrap();
    let started = Utc::now().timestamp_millis();

    title.set_property(&user_ctx(&fx, "u1"), &obj, Value::from("Hello")).unwrap();

    let stamped = obj.get_property(keys::LAST_MODIFIED_DATE_DB_NAME).and_then(|v| v.as_long()).unwrap();
    assert!(stamped >= started);
    assert_eq!(obj.get_property(keys::LAST_MODIFIED_BY_DB_NAME), Some(Value::from("u1")));
}

#[test]
fn test_write_without_access_time_tracking_leaves_stamps_alone() {
    let title = StringProperty::new("title").build();
    let fx = Fixture::new(article_schema(&[title.clone()]));
    let obj = fx.create("Article");
    obj.remove_property(keys::LAST_MODIFIED_DATE_DB_NAME).unwrap();
    obj.remove_property(keys::LAST_MODIFIED_BY_DB_NAME).unwrap();

    let ctx = user_ctx(&fx, "u1").without_access_time_tracking();
    title.set_property(&ctx, &obj, Value::from("Hello")).unwrap();

    assert_eq!(obj.get_property("title"), Some(Value::from("Hello")));
    assert_eq!(obj.get_property(keys::LAST_MODIFIED_DATE_DB_NAME), None);
    assert_eq!(obj.get_property(keys::LAST_MODIFIED_BY_DB_NAME), None);
}

#[test]
fn test_system_internal_write_needs_unlock() {
    let internal = StringProperty::new("internal").system_internal().build();
    let fx = Fixture::new(article_schema(&[internal.clone()]));
    let obj = fx.create("Article");
    let before = fx.tx.modifications().len();

    assert_eq!(internal.set_property(&fx.ctx, &obj, Value::from("x")).unwrap(), None);
    assert_eq!(obj.get_property("internal"), None);
    assert_eq!(fx.tx.modifications().len(), before);

    obj.unlock_system_properties_once();
    internal.set_property(&fx.ctx, &obj, Value::from("x")).unwrap();
    assert_eq!(obj.get_property("internal"), Some(Value::from("x")));

    assert_eq!(internal.set_property(&fx.ctx, &obj, Value::from("y")).unwrap(), None);
    assert_eq!(obj.get_property("internal"), Some(Value::from("x")));
}

#[test]
fn test_update_callback_sees_logical_value() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let published = DateProperty::new("published")
        .with_format("yyyy-MM-dd")
        .on_update(move |_: &SecurityContext, _: &GraphObject, value: &Value| -> graphkeys::Result<()> {
            sink.lock().push(value.clone());
            Ok(())
        })
        .build();
    let fx = Fixture::new(article_schema(&[published.clone()]));
    let obj = fx.create("Article");

    let logical = PropertyMap::input_value_to_logical(&fx.ctx, &published, Value::from("2024-01-15")).unwrap();
    published.set_property(&fx.ctx, &obj, logical.clone()).unwrap();
    published.set_property(&fx.ctx, &obj, Value::Null).unwrap();

    assert_eq!(*seen.lock(), vec![logical, Value::Null]);
    assert_eq!(obj.get_property("published"), None);
}

#[test]
fn test_failing_update_callback_fails_the_write() {
    let title = StringProperty::new("title")
        .on_update(|_: &SecurityContext, _: &GraphObject, value: &Value| -> graphkeys::Result<()> {
            if value.as_str() == Some("forbidden") {
                return Err(Error::BadRequest("title rejected".into()));
            }
            Ok(())
        })
        .build();
    let fx = Fixture::new(article_schema(&[title.clone()]));
    let obj = fx.create("Article");

    title.set_property(&fx.ctx, &obj, Value::from("fine")).unwrap();
    let err = title.set_property(&fx.ctx, &obj, Value::from("forbidden")).unwrap_err();
    assert_eq!(err.status(), 400);
}

// ============================================================================
// Secrets
// ============================================================================

fn secret_settings() -> Settings {
    Settings {
        encryption_secret: Some("correct horse battery staple".into()),
        password_policy: PasswordPolicy { enforce: true, ..PasswordPolicy::default() },
        ..Settings::default()
    }
}

#[test]
fn test_password_is_stored_salted_and_verifiable() {
    let password = PasswordProperty::new("password").build();
    let fx = Fixture::with_settings(article_schema(&[password.clone()]), secret_settings());
    let obj = fx.create("Article");

    password.set_property(&fx.ctx, &obj, Value::from("Str0ngPassword")).unwrap();
    let hash = obj.get_property("password").unwrap();
    assert_ne!(hash, Value::from("Str0ngPassword"));
    assert!(obj.get_property("passwordSalt").is_some());
    assert!(password.flags().serialization_disabled);

    let typed = PasswordProperty::new("password");
    assert!(typed.verify_password(&obj, "Str0ngPassword"));
    assert!(!typed.verify_password(&obj, "Str0ngPassw0rd"));

    // Same password, fresh salt.
    let salt = obj.get_property("passwordSalt");
    password.set_property(&fx.ctx, &obj, Value::from("Str0ngPassword")).unwrap();
    assert_ne!(obj.get_property("passwordSalt"), salt);
    assert!(typed.verify_password(&obj, "Str0ngPassword"));

    password.set_property(&fx.ctx, &obj, Value::Null).unwrap();
    assert_eq!(obj.get_property("password"), None);
    assert_eq!(obj.get_property("passwordSalt"), None);
    assert!(!typed.verify_password(&obj, "Str0ngPassword"));
}

#[test]
fn test_password_policy_violation_keeps_old_hash() {
    let password = PasswordProperty::new("password").declared_by("Article").build();
    let fx = Fixture::with_settings(article_schema(&[password.clone()]), secret_settings());
    let obj = fx.create("Article");
    password.set_property(&fx.ctx, &obj, Value::from("Str0ngPassword")).unwrap();
    let hash = obj.get_property("password");

    let err = password.set_property(&fx.ctx, &obj, Value::from("weak")).unwrap_err();
    assert!(matches!(err, Error::Policy { .. }));
    assert!(err.to_string().contains("at least 8"));
    assert_eq!(obj.get_property("password"), hash);
    assert!(PasswordProperty::new("password").verify_password(&obj, "Str0ngPassword"));
}

#[test]
fn test_encrypted_string_round_trip() {
    let token = EncryptedStringProperty::new("token").build();
    let fx = Fixture::with_settings(article_schema(&[token.clone()]), secret_settings());
    let obj = fx.create("Article");

    token.set_property(&fx.ctx, &obj, Value::from("api-key-123")).unwrap();
    let stored = obj.get_property("token").unwrap();
    assert!(stored.is_string());
    assert_ne!(stored, Value::from("api-key-123"));
    assert_eq!(token.get_property(&fx.ctx, &obj, true, None), Value::from("api-key-123"));

    // Another secret cannot read it back.
    let other = Settings { encryption_secret: Some("other".into()), ..Settings::default() };
    let other_ctx = SecurityContext::super_user(Services::builder().schema(article_schema(&[])).settings(other).build());
    assert_eq!(token.get_property(&other_ctx, &obj, true, None), Value::Null);
}

#[test]
fn test_encrypted_string_without_secret_fails_to_store() {
    let token = EncryptedStringProperty::new("token").build();
    let fx = Fixture::new(article_schema(&[token.clone()]));
    let obj = fx.create("Article");

    let err = token.set_property(&fx.ctx, &obj, Value::from("api-key-123")).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(obj.get_property("token"), None);
}

// ============================================================================
// Repair and retry
// ============================================================================

#[test]
fn test_flattened_array_is_repaired_on_read() {
    let tags = ArrayProperty::strings("tags").build();
    let fx = Fixture::new(article_schema(&[tags.clone()]));
    let obj = fx.create("Article");

    obj.set_property("tags", Value::from("red,green,blue")).unwrap();
    let expected = Value::List(vec![Value::from("red"), Value::from("green"), Value::from("blue")]);

    assert_eq!(tags.get_property(&fx.ctx, &obj, true, None), expected);
    assert_eq!(obj.get_property("tags"), Some(expected));
}

#[test]
fn test_flattened_array_without_entity_is_only_returned() {
    let ctx = SecurityContext::super_user(Services::builder().build());
    let counts = ArrayProperty::integers("counts");
    let fixed = counts.fix_database_property(&ctx, None, Value::from("1 2 3"));
    assert_eq!(fixed, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
}

#[test]
fn test_retry_signal_propagates_unchanged() {
    let title = StringProperty::new("title").build();
    let fx = Fixture::new(article_schema(&[title.clone()]));
    let obj = fx.create("Article");

    fx.memory.inject_retry_once();
    let err = title.set_property(&fx.ctx, &obj, Value::from("x")).unwrap_err();
    assert!(err.is_retry());
    assert_eq!(err.status(), 503);

    title.set_property(&fx.ctx, &obj, Value::from("y")).unwrap();
    assert_eq!(title.get_property(&fx.ctx, &obj, true, None), Value::from("y"));
}

#[test]
fn test_read_conversion_failure_keeps_raw_value() {
    let rank = IntegerProperty::new("rank").build();
    let fx = Fixture::new(article_schema(&[rank.clone()]));
    let obj = fx.create("Article");

    obj.set_property("rank", Value::from("not a number")).unwrap();
    assert_eq!(rank.get_property(&fx.ctx, &obj, true, None), Value::from("not a number"));
}

// ============================================================================
// Round-trip laws
// ============================================================================

fn plain_ctx(lenient: bool) -> SecurityContext {
    let settings = Settings { lenient_json: lenient, ..Settings::default() };
    SecurityContext::super_user(Services::builder().settings(settings).build())
}

fn db_round_trip(key: &dyn PropertyKey, ctx: &SecurityContext, value: Value) -> Value {
    let converter = key.database_converter(ctx, None).expect("key has a database converter");
    converter.revert(converter.convert(value).unwrap()).unwrap()
}

#[test]
fn test_boolean_round_trip() {
    let ctx = plain_ctx(false);
    let key = BooleanProperty::new("b");
    for b in [true, false] {
        assert_eq!(db_round_trip(&key, &ctx, Value::Bool(b)), Value::Bool(b));
    }
}

#[test]
fn test_fixed_date_round_trip() {
    let ctx = plain_ctx(false);
    let key = DateProperty::new("d");
    let date = Value::Date(Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap());
    assert_eq!(db_round_trip(&key, &ctx, date.clone()), date);
}

#[test]
fn test_enum_constants_round_trip() {
    let ctx = plain_ctx(false);
    let key = EnumProperty::new("e", ["DRAFT", "PUBLISHED"]);
    for constant in key.constants().to_vec() {
        let input = key.input_converter(&ctx).unwrap();
        let logical = input.convert(Value::from(constant.as_str())).unwrap();
        assert_eq!(input.revert(logical).unwrap(), Value::from(constant.as_str()));
    }
}

#[test]
fn test_double_non_finite_by_mode() {
    let key = DoubleProperty::new("ratio");
    assert_eq!(db_round_trip(&key, &plain_ctx(false), Value::Double(f64::NAN)), Value::Null);
    assert_eq!(db_round_trip(&key, &plain_ctx(false), Value::Double(f64::NEG_INFINITY)), Value::Null);

    let kept = db_round_trip(&key, &plain_ctx(true), Value::Double(f64::NAN));
    assert!(matches!(kept, Value::Double(d) if d.is_nan()));
    assert_eq!(
        db_round_trip(&key, &plain_ctx(true), Value::Double(f64::INFINITY)),
        Value::Double(f64::INFINITY)
    );
}

proptest! {
    #[test]
    fn prop_integer_round_trip(i in any::<i32>()) {
        let key = IntegerProperty::new("i");
        prop_assert_eq!(db_round_trip(&key, &plain_ctx(false), Value::Int(i)), Value::Int(i));
    }

    #[test]
    fn prop_long_round_trip(l in any::<i64>()) {
        let key = LongProperty::new("l");
        prop_assert_eq!(db_round_trip(&key, &plain_ctx(false), Value::Long(l)), Value::Long(l));
    }

    #[test]
    fn prop_finite_double_round_trip(d in prop::num::f64::NORMAL | prop::num::f64::ZERO, lenient in any::<bool>()) {
        let key = DoubleProperty::new("d");
        prop_assert_eq!(db_round_trip(&key, &plain_ctx(lenient), Value::Double(d)), Value::Double(d));
    }

    #[test]
    fn prop_integer_input_from_text(i in any::<i32>()) {
        let ctx = plain_ctx(false);
        let key = IntegerProperty::new("i");
        let input = key.input_converter(&ctx).unwrap();
        prop_assert_eq!(input.convert(Value::from(i.to_string())).unwrap(), Value::Int(i));
    }
}
