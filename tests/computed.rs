//! Derived keys: scripted functions, string composition, counters and sums.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::Fixture;
use graphkeys::property::computed::function::clear_source_cache;
use graphkeys::property::{
    Cardinality, CollectionSumProperty, ConcatProperty, CypherQueryProperty, DoubleProperty,
    ElementCounterProperty, FunctionProperty, IntegerProperty, IntegerSumProperty, JoinProperty, LongProperty,
    LongSumProperty, RelatedProperty, Relation, StringProperty,
};
use graphkeys::script::{EvaluationConfig, FnEvaluator, QueryService, ScriptError};
use graphkeys::{
    EntityType, Error, GraphObject, KeyRef, PropertyBuilder, PropertyContainer, PropertyKey, Schema,
    SecurityContext, Services, Value,
};

fn order_schema(keys: &[KeyRef]) -> Schema {
    let mut schema = Schema::new();
    schema.register(EntityType::node("Order").with_keys(keys.iter().cloned()));
    schema
}

#[test]
fn test_concat_skips_nulls() {
    let first = StringProperty::new("first").build();
    let last = StringProperty::new("last").build();
    let full = ConcatProperty::new("full", vec![first.clone(), last.clone()], " ").build();
    let fx = Fixture::new(order_schema(&[first.clone(), last.clone(), full.clone()]));
    let obj = fx.create("Order");

    assert_eq!(full.get_property(&fx.ctx, &obj, true, None), Value::Null);
    last.set_property(&fx.ctx, &obj, Value::from("Lovelace")).unwrap();
    assert_eq!(full.get_property(&fx.ctx, &obj, true, None), Value::from("Lovelace"));
    first.set_property(&fx.ctx, &obj, Value::from("Ada")).unwrap();
    assert_eq!(full.get_property(&fx.ctx, &obj, true, None), Value::from("Ada Lovelace"));
    assert!(matches!(full.set_property(&fx.ctx, &obj, Value::from("x")), Err(Error::ReadOnlyProperty { .. })));
}

#[test]
fn test_join_distributes_fragments() {
    let prefix = StringProperty::new("prefix").build();
    let number = IntegerProperty::new("number").build();
    let code = JoinProperty::new("code", vec![prefix.clone(), number.clone()], "{0}-{1}").unwrap().build();
    let fx = Fixture::new(order_schema(&[prefix.clone(), number.clone(), code.clone()]));
    let obj = fx.create("Order");

    code.set_property(&fx.ctx, &obj, Value::from("ORD-1042")).unwrap();
    assert_eq!(prefix.get_property(&fx.ctx, &obj, true, None), Value::from("ORD"));
    assert_eq!(number.get_property(&fx.ctx, &obj, true, None), Value::Int(1042));
    assert_eq!(code.get_property(&fx.ctx, &obj, true, None), Value::from("ORD-1042"));

    let err = code.set_property(&fx.ctx, &obj, Value::from("no separator")).unwrap_err();
    assert_eq!(err.status(), 400);
}

#[test]
fn test_join_conversion_failure_leaves_sources_untouched() {
    let prefix = StringProperty::new("prefix").build();
    let number = IntegerProperty::new("number").build();
    let code = JoinProperty::new("code", vec![prefix.clone(), number.clone()], "{0}-{1}").unwrap().build();
    let fx = Fixture::new(order_schema(&[prefix.clone(), number.clone(), code.clone()]));
    let obj = fx.create("Order");

    code.set_property(&fx.ctx, &obj, Value::from("ORD-1")).unwrap();
    let writes = fx.tx.modifications().len();

    assert!(code.set_property(&fx.ctx, &obj, Value::from("NEW-abc")).is_err());
    assert_eq!(prefix.get_property(&fx.ctx, &obj, true, None), Value::from("ORD"));
    assert_eq!(number.get_property(&fx.ctx, &obj, true, None), Value::Int(1));
    assert_eq!(code.get_property(&fx.ctx, &obj, true, None), Value::from("ORD-1"));
    assert_eq!(fx.tx.modifications().len(), writes);
}

#[test]
fn test_join_renders_braces_in_source_values_verbatim() {
    let a = StringProperty::new("a").build();
    let b = StringProperty::new("b").build();
    let label = JoinProperty::new("label", vec![a.clone(), b.clone()], "{0}:{1}").unwrap().build();
    let fx = Fixture::new(order_schema(&[a.clone(), b.clone(), label.clone()]));
    let obj = fx.create("Order");

    a.set_property(&fx.ctx, &obj, Value::from("{1}")).unwrap();
    b.set_property(&fx.ctx, &obj, Value::from("tail")).unwrap();
    assert_eq!(label.get_property(&fx.ctx, &obj, true, None), Value::from("{1}:tail"));
}

#[test]
fn test_sibling_sums() {
    let a = IntegerProperty::new("a").build();
    let b = IntegerProperty::new("b").build();
    let c = LongProperty::new("c").build();
    let total = IntegerSumProperty::new("total", vec![a.clone(), b.clone()]).build();
    let long_total = LongSumProperty::new("longTotal", vec![a.clone(), c.clone()]).build();
    let fx = Fixture::new(order_schema(&[a.clone(), b.clone(), c.clone()]));
    let obj = fx.create("Order");

    a.set_property(&fx.ctx, &obj, Value::Int(3)).unwrap();
    assert_eq!(total.get_property(&fx.ctx, &obj, true, None), Value::Int(3));
    b.set_property(&fx.ctx, &obj, Value::Int(4)).unwrap();
    c.set_property(&fx.ctx, &obj, Value::Long(10_000_000_000)).unwrap();
    assert_eq!(total.get_property(&fx.ctx, &obj, true, None), Value::Int(7));
    assert_eq!(long_total.get_property(&fx.ctx, &obj, true, None), Value::Long(10_000_000_003));
}

struct Shop {
    fx: Fixture,
    lines: KeyRef,
    price: KeyRef,
    quantity: KeyRef,
}

impl Shop {
    fn new() -> Self {
        let price = DoubleProperty::new("price").build();
        let quantity = IntegerProperty::new("quantity").build();
        let mut schema = Schema::new();
        let arena = schema.relations_mut();
        let has_line = arena.add(Relation::new("Order", "HAS_LINE", "Line", Cardinality::OneToMany));
        let lines = RelatedProperty::end_nodes("lines", arena, has_line).unwrap().build();
        schema.register(EntityType::node("Order").with_key(lines.clone()));
        schema.register(EntityType::node("Line").with_keys([price.clone(), quantity.clone()]));
        Self { fx: Fixture::new(schema), lines, price, quantity }
    }

    fn line(&self, price: Option<f64>, quantity: i32) -> GraphObject {
        let line = self.fx.create("Line");
        if let Some(p) = price {
            self.price.set_property(&self.fx.ctx, &line, Value::Double(p)).unwrap();
        }
        self.quantity.set_property(&self.fx.ctx, &line, Value::Int(quantity)).unwrap();
        line
    }

    fn order_with(&self, lines: &[GraphObject]) -> GraphObject {
        let order = self.fx.create("Order");
        let refs = lines.iter().map(|l| Value::Node(l.node_id().unwrap())).collect();
        self.lines.set_property(&self.fx.ctx, &order, Value::List(refs)).unwrap();
        order
    }
}

#[test]
fn test_element_counter() {
    let shop = Shop::new();
    let count = ElementCounterProperty::new("lineCount", shop.lines.clone()).build();
    let order = shop.order_with(&[shop.line(Some(1.0), 1), shop.line(Some(2.0), 1)]);
    assert_eq!(count.get_property(&shop.fx.ctx, &order, true, None), Value::Int(2));

    let empty = shop.order_with(&[]);
    assert_eq!(count.get_property(&shop.fx.ctx, &empty, true, None), Value::Int(0));
}

#[test]
fn test_collection_sum_follows_element_type() {
    let shop = Shop::new();
    let order = shop.order_with(&[shop.line(Some(1.5), 2), shop.line(None, 3), shop.line(Some(2.25), 0)]);

    let price_sum = CollectionSumProperty::new("priceSum", shop.lines.clone(), shop.price.clone()).build();
    assert_eq!(price_sum.get_property(&shop.fx.ctx, &order, true, None), Value::Double(3.75));

    let quantity_sum = CollectionSumProperty::new("quantitySum", shop.lines.clone(), shop.quantity.clone()).build();
    assert_eq!(quantity_sum.get_property(&shop.fx.ctx, &order, true, None), Value::Int(5));
}

fn scripted_fixture(schema: Schema) -> Fixture {
    let evaluator = FnEvaluator(
        |_ctx: &SecurityContext, obj: &GraphObject, src: &str, cfg: &EvaluationConfig| -> Result<Value, ScriptError> {
            match src {
                "double(base)" => Ok(Value::Long(obj.get_property("base").and_then(|v| v.as_long()).unwrap_or(0) * 2)),
                "store(value)" => {
                    let value = cfg.bindings.get("value").cloned().unwrap_or(Value::Null);
                    obj.set_property("base", value).map_err(|e| ScriptError::new(e.to_string()))?;
                    Ok(Value::Null)
                }
                other => Err(ScriptError { errors: vec![format!("unknown function {other}"), "line 1".into()] }),
            }
        },
    );
    let services = Services::builder().schema(schema).evaluator(Arc::new(evaluator)).build();
    Fixture::with_services(services)
}

#[test]
fn test_function_read_and_write() {
    let doubled = FunctionProperty::new("doubled")
        .with_read_function("double(base)")
        .with_write_function("store(value)")
        .with_type_hint("Long")
        .declared_by("Order")
        .build();
    let fx = scripted_fixture(order_schema(&[doubled.clone()]));
    let obj = fx.create("Order");

    doubled.set_property(&fx.ctx, &obj, Value::Long(21)).unwrap();
    assert_eq!(doubled.get_property(&fx.ctx, &obj, true, None), Value::Long(42));
}

#[test]
fn test_function_write_error_carries_all_messages() {
    let broken = FunctionProperty::new("broken")
        .with_read_function("nope")
        .with_write_function("nope")
        .declared_by("Order")
        .build();
    let fx = scripted_fixture(order_schema(&[broken.clone()]));
    let obj = fx.create("Order");

    let err = broken.set_property(&fx.ctx, &obj, Value::Int(1)).unwrap_err();
    let Error::Scripting { label, errors } = &err else { panic!("expected scripting error, got {err:?}") };
    assert_eq!(label, "Order.broken");
    assert_eq!(errors.len(), 2);
    assert_eq!(err.status(), 422);

    assert_eq!(broken.get_property(&fx.ctx, &obj, true, None), Value::Null);
}

#[test]
fn test_function_source_loaded_from_schema_entity() {
    let schema_name = StringProperty::new("name").build();
    let mut schema = order_schema(&[]);
    schema.register(EntityType::node("SchemaProperty").with_key(schema_name));
    let fx = scripted_fixture(schema);

    let definition = fx.create("SchemaProperty");
    definition.set_property("readFunction", Value::from("double(base)")).unwrap();
    let source_id = definition.uuid().unwrap();

    clear_source_cache();
    let key = FunctionProperty::new("doubled").with_source_id(source_id).build();
    let obj = fx.create("Order");
    obj.set_property("base", Value::Long(5)).unwrap();
    assert_eq!(key.get_property(&fx.ctx, &obj, true, None), Value::Long(10));

    // Cached until cleared.
    definition.set_property("readFunction", Value::from("nope")).unwrap();
    assert_eq!(key.get_property(&fx.ctx, &obj, true, None), Value::Long(10));
    clear_source_cache();
    assert_eq!(key.get_property(&fx.ctx, &obj, true, None), Value::Null);
}

struct CannedQueries;

impl QueryService for CannedQueries {
    fn query(
        &self,
        _ctx: &SecurityContext,
        query: &str,
        params: &BTreeMap<String, Value>,
    ) -> graphkeys::Result<Vec<Value>> {
        match query {
            "MATCH (n {id: $this}) RETURN n.id" => Ok(vec![params["this"].clone()]),
            "MATCH (n) RETURN n.id" => Ok(vec![Value::from("a"), Value::from("b")]),
            _ => Err(Error::BadRequest("unsupported query".into())),
        }
    }
}

#[test]
fn test_query_backed_key() {
    let services = Services::builder().schema(order_schema(&[])).query_service(Arc::new(CannedQueries)).build();
    let fx = Fixture::with_services(services);
    let obj = fx.create("Order");

    let own = CypherQueryProperty::new("self", "MATCH (n {id: $this}) RETURN n.id").build();
    assert_eq!(own.get_property(&fx.ctx, &obj, true, None), Value::from(obj.uuid().unwrap()));

    let all = CypherQueryProperty::new("all", "MATCH (n) RETURN n.id").build();
    assert_eq!(all.get_property(&fx.ctx, &obj, true, None), Value::List(vec![Value::from("a"), Value::from("b")]));

    let failing = CypherQueryProperty::new("bad", "DELETE everything").build();
    assert_eq!(failing.get_property(&fx.ctx, &obj, true, None), Value::Null);
    assert!(failing.is_read_only());
}
