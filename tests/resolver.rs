//! Tests for dependency resolution, memoization and error propagation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use feature_flow::{
    Context, Error, ExecutionResult, Node, NodeName, Registry, Resolver, Roots, Tracer, Value,
};

fn counted(name: &str, deps: &[&Node], counter: &Arc<AtomicUsize>, value: i64) -> Node {
    let counter = counter.clone();
    let mut builder = Node::builder(name).name(name);
    for dep in deps {
        builder = builder.depends_on(*dep);
    }
    builder
        .process(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::new(value))
        })
        .build()
}

// =============================================================================
// Memoization
// =============================================================================

#[test]
fn test_diamond_computes_shared_node_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let shared = counted("shared", &[], &calls, 10);

    let left = Node::unary("left", &shared, |v: &i64| v + 1);
    let right = Node::unary("right", &shared, |v: &i64| v * 2);
    let top = Node::builder("top")
        .depends_on(&left)
        .depends_on(&right)
        .process(|args| Ok(Value::new(args.get::<i64>(0)? + args.get::<i64>(1)?)))
        .build();

    let resolver = Resolver::default();
    let mut ctx = Context::new();
    let value = resolver.solve(&top, &mut ctx).unwrap();

    assert_eq!(value.get::<i64>(), Ok(&31));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.computed(), 4);
}

#[test]
fn test_cached_value_is_shared() {
    let calls = Arc::new(AtomicUsize::new(0));
    let shared = counted("shared", &[], &calls, 1);

    let resolver = Resolver::default();
    let mut ctx = Context::new();
    let first = resolver.solve(&shared, &mut ctx).unwrap();
    let second = resolver.solve(&shared, &mut ctx).unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fresh_context_recomputes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let node = counted("node", &[], &calls, 1);

    let resolver = Resolver::default();
    resolver.evaluate(&[node.clone()], &Roots::new()).unwrap();
    resolver.evaluate(&[node], &Roots::new()).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_same_node_requested_twice() {
    let calls = Arc::new(AtomicUsize::new(0));
    let node = counted("node", &[], &calls, 5);

    let values = Resolver::default()
        .extract(&[node.clone(), node], &Roots::new())
        .unwrap();

    assert_eq!(values, [5.0, 5.0]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_supplied_value_overrides_computation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let node = counted("expensive", &[], &calls, 1);

    let roots = Roots::new().with(&node, Value::new(42i64));
    let values = Resolver::default().extract(&[node], &roots).unwrap();

    assert_eq!(values, [42.0]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Ordering and determinism
// =============================================================================

#[test]
fn test_results_follow_request_order() {
    let x = Node::root("x");
    let double = Node::unary("double", &x, |v: &i64| v * 2);
    let triple = Node::unary("triple", &x, |v: &i64| v * 3);

    let roots = Roots::new().with(&x, Value::new(2i64));
    let resolver = Resolver::default();

    assert_eq!(
        resolver.extract(&[triple.clone(), x.clone(), double.clone()], &roots).unwrap(),
        [6.0, 2.0, 4.0]
    );
    assert_eq!(
        resolver.extract(&[double, triple, x], &roots).unwrap(),
        [4.0, 6.0, 2.0]
    );
}

#[test]
fn test_evaluation_is_deterministic() {
    let x = Node::root("x");
    let ratio = Node::unary("ratio", &x, |v: &i64| *v as f64 / 3.0);
    let roots = Roots::new().with(&x, Value::new(7i64));

    let resolver = Resolver::default();
    let first = resolver.extract(&[ratio.clone()], &roots).unwrap();
    for _ in 0..10 {
        assert_eq!(resolver.extract(&[ratio.clone()], &roots).unwrap(), first);
    }
}

#[test]
fn test_dependencies_arrive_in_declaration_order() {
    let a = Node::root("a");
    let b = Node::root("b");
    let pair = Node::builder("pair")
        .depends_on(&b)
        .depends_on(&a)
        .process(|args| {
            Ok(Value::new(format!(
                "{}{}",
                args.get::<String>(0)?,
                args.get::<String>(1)?
            )))
        })
        .build();

    let roots = Roots::new()
        .with(&a, Value::new("a".to_string()))
        .with(&b, Value::new("b".to_string()));
    let values = Resolver::default().evaluate(&[pair], &roots).unwrap();

    assert_eq!(values[0].get::<String>().map(String::as_str), Ok("ba"));
}

#[test]
fn test_dependency_order() {
    let root = Node::root("root");
    let mid = Node::unary("mid", &root, |v: &i64| *v);
    let top = Node::unary("top", &mid, |v: &i64| *v);

    let order = Resolver::default().dependency_order(&[top, mid]).unwrap();
    let names: Vec<&str> = order.iter().map(|n| n.name().as_str()).collect();
    assert_eq!(names, ["root", "mid", "top"]);
}

// =============================================================================
// Cycles
// =============================================================================

#[test]
fn test_named_cycle_is_detected() {
    let mut registry = Registry::new();
    let a = Node::builder("a")
        .name("a")
        .depends_on_named("b")
        .process(|_| Ok(Value::new(1i64)))
        .build();
    let b = Node::builder("b")
        .name("b")
        .depends_on_named("a")
        .process(|_| Ok(Value::new(1i64)))
        .build();
    registry.register(&a);
    registry.register(&b);

    let resolver = Resolver::new(registry);
    match resolver.evaluate(&[b], &Roots::new()) {
        Err(Error::Cycle { path }) => assert_eq!(path, ["b", "a", "b"]),
        other => panic!("Expected Cycle, got {:?}", other),
    }
}

#[test]
fn test_self_reference_through_name_collision() {
    let inner = Node::builder("inner")
        .name("x")
        .process(|_| Ok(Value::new(1i64)))
        .build();
    let outer = Node::builder("outer")
        .name("x")
        .depends_on(&inner)
        .process(|_| Ok(Value::new(2i64)))
        .build();

    let err = Resolver::default()
        .evaluate(&[outer], &Roots::new())
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("x -> x"));
}

#[test]
fn test_context_is_usable_after_cycle() {
    let mut registry = Registry::new();
    registry.register(
        &Node::builder("loop")
            .name("loop")
            .depends_on_named("loop")
            .process(|_| Ok(Value::new(1i64)))
            .build(),
    );
    let fine = Node::builder("fine")
        .process(|_| Ok(Value::new(1i64)))
        .build();

    let resolver = Resolver::new(registry);
    let looped = resolver.registry().get("loop").cloned().unwrap();
    let mut ctx = Context::new();

    assert!(matches!(resolver.solve(&looped, &mut ctx), Err(Error::Cycle { .. })));
    assert_eq!(resolver.solve(&fine, &mut ctx).unwrap().get::<i64>(), Ok(&1));
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn test_missing_process() {
    let node = Node::builder("empty").build();
    match Resolver::default().evaluate(&[node], &Roots::new()) {
        Err(Error::MissingProcess { node }) => assert_eq!(node.as_str(), "empty()"),
        other => panic!("Expected MissingProcess, got {:?}", other),
    }
}

#[test]
fn test_unknown_named_dependency() {
    let node = Node::builder("orphan")
        .depends_on_named("nowhere")
        .process(|_| Ok(Value::new(1i64)))
        .build();
    match Resolver::default().evaluate(&[node], &Roots::new()) {
        Err(Error::UnknownNode { name }) => assert_eq!(name.as_str(), "nowhere"),
        other => panic!("Expected UnknownNode, got {:?}", other),
    }
}

#[test]
fn test_missing_root_input() {
    let text = Node::root("revision.text");
    let chars = Node::unary("revision.chars", &text, |t: &String| t.len() as i64);
    match Resolver::default().evaluate(&[chars], &Roots::new()) {
        Err(Error::MissingRootInput { node }) => assert_eq!(node.as_str(), "revision.text"),
        other => panic!("Expected MissingRootInput, got {:?}", other),
    }
}

// =============================================================================
// Computation errors
// =============================================================================

#[derive(Debug, PartialEq)]
struct ParseFailure(String);

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "could not parse {}", self.0)
    }
}

impl std::error::Error for ParseFailure {}

#[test]
fn test_computation_error_is_tagged_and_downcastable() {
    let input = Node::root("input");
    let parsed = Node::builder("parsed")
        .depends_on(&input)
        .process(|args| {
            let input = args.get::<String>(0)?;
            Err(ParseFailure(input.clone()).into())
        })
        .build();
    let downstream = Node::unary("downstream", &parsed, |v: &i64| *v);

    let roots = Roots::new().with(&input, Value::new("oops".to_string()));
    let err = Resolver::default()
        .evaluate(&[downstream], &roots)
        .unwrap_err();

    assert!(!err.is_configuration());
    assert_eq!(err.node().map(NodeName::as_str), Some("parsed(input)"));
    assert_eq!(
        err.downcast_ref::<ParseFailure>(),
        Some(&ParseFailure("oops".to_string()))
    );
    assert!(err.to_string().contains("could not parse oops"));
}

#[test]
fn test_failed_node_is_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let flaky = Node::builder("flaky")
        .process(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("nope")
        })
        .build();

    let resolver = Resolver::default();
    let mut ctx = Context::new();
    assert!(resolver.solve(&flaky, &mut ctx).is_err());
    assert!(resolver.solve(&flaky, &mut ctx).is_err());

    assert!(!ctx.is_cached(&flaky));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_non_numeric_output() {
    let text = Node::root("text");
    let roots = Roots::new().with(&text, Value::new("words".to_string()));
    match Resolver::default().extract(&[text], &roots) {
        Err(Error::NonNumericOutput { node, .. }) => assert_eq!(node.as_str(), "text"),
        other => panic!("Expected NonNumericOutput, got {:?}", other),
    }
}

// =============================================================================
// Tracing
// =============================================================================

#[derive(Default)]
struct RecordingTracer {
    events: Mutex<Vec<String>>,
}

impl Tracer for RecordingTracer {
    fn on_node_start(&self, node: &NodeName) {
        self.events.lock().unwrap().push(format!("start {}", node));
    }

    fn on_cache_hit(&self, node: &NodeName) {
        self.events.lock().unwrap().push(format!("hit {}", node));
    }

    fn on_node_end(&self, node: &NodeName, result: &ExecutionResult) {
        let outcome = match result {
            ExecutionResult::Computed => "ok",
            ExecutionResult::Failed { .. } => "failed",
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("end {} {}", node, outcome));
    }
}

#[test]
fn test_tracer_sees_cache_hits() {
    let tracer = Arc::new(RecordingTracer::default());
    let resolver = Resolver::builder()
        .shared_tracer(tracer.clone())
        .build(Registry::new());

    let x = Node::root("x");
    let double = Node::unary("double", &x, |v: &i64| v * 2);
    let sum = Node::builder("sum")
        .depends_on(&double)
        .depends_on(&double)
        .process(|args| Ok(Value::new(args.get::<i64>(0)? + args.get::<i64>(1)?)))
        .build();

    let roots = Roots::new().with(&x, Value::new(1i64));
    assert_eq!(resolver.extract(&[sum], &roots).unwrap(), [4.0]);

    let events = tracer.events.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "hit x",
            "start double",
            "end double ok",
            "hit double",
            "start sum(double, double)",
            "end sum(double, double) ok",
        ]
    );
}
