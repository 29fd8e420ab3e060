use anyhow::Result;
use jsbridge::{Error, Session, Value, ValueKind, args};
use serde::Deserialize;
use serde_json::json;

use super::common::{StaticHost, builder, init_tracing};

#[derive(Debug, Deserialize, PartialEq)]
struct Shape {
    a: String,
    b: f64,
}

fn session() -> Result<(Session, tempfile::TempDir)> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let session = builder(&StaticHost::shared(), dir.path()).build()?;
    Ok((session, dir))
}

#[tokio::test]
async fn evaluate_arithmetic() -> Result<()> {
    let (mut session, _dir) = session()?;
    let n: i64 = session.evaluate("1 + 1").await?;
    assert_eq!(n, 2);

    let n: i64 = session.evaluate("4 / 2").await?;
    assert_eq!(n, 2);

    let f: f64 = session.evaluate("7 / 2").await?;
    assert!((f - 3.5).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn script_errors_carry_the_engine_message() -> Result<()> {
    let (mut session, _dir) = session()?;

    let err = session.evaluate::<Value>("undefinedVar.x").await.unwrap_err();
    match err {
        Error::Script { message, .. } => assert!(message.contains("undefinedVar"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }

    let err = session.evaluate::<Value>("let = ;").await.unwrap_err();
    match err {
        Error::Script { message, .. } => assert!(message.starts_with("SyntaxError"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }

    // The session stays usable after a failure.
    let n: i64 = session.evaluate("40 + 2").await?;
    assert_eq!(n, 42);
    Ok(())
}

#[tokio::test]
async fn result_shape_is_checked() -> Result<()> {
    let (mut session, _dir) = session()?;

    let shape: Shape = session.evaluate("({ a: 'x', b: 2.5 })").await?;
    assert_eq!(
        shape,
        Shape {
            a: "x".into(),
            b: 2.5
        }
    );

    let err = session.evaluate::<Shape>("({ a: 1 })").await.unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn unreadable_properties_fail_the_call() -> Result<()> {
    let (mut session, _dir) = session()?;

    let err = session
        .evaluate::<Value>("({ ok: 1, get broken() { throw new Error('boom') } })")
        .await
        .unwrap_err();
    match err {
        Error::Marshal(message) => assert!(message.contains("boom"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }

    let n: i64 = session.evaluate("({ ok: 1 }).ok").await?;
    assert_eq!(n, 1);
    Ok(())
}

#[tokio::test]
async fn evaluate_value_reports_kind() -> Result<()> {
    let (mut session, _dir) = session()?;
    assert_eq!(session.evaluate_value("({})").await?.kind(), ValueKind::Object);
    assert_eq!(session.evaluate_value("[1, 2]").await?.kind(), ValueKind::Array);
    assert_eq!(session.evaluate_value("'s'").await?.kind(), ValueKind::Scalar);
    assert_eq!(session.evaluate_value("undefined").await?, Value::null());
    Ok(())
}

#[tokio::test]
async fn scope_is_shared_between_calls() -> Result<()> {
    let (mut session, _dir) = session()?;

    session
        .evaluate::<Value>("var counter = 1; function bump() { return ++counter; }")
        .await?;
    let n: i64 = session.call_function("bump", args![]?).await?;
    assert_eq!(n, 2);
    let n: i64 = session.evaluate("counter").await?;
    assert_eq!(n, 2);
    Ok(())
}

#[tokio::test]
async fn call_function_with_positional_and_named_args() -> Result<()> {
    let (mut session, _dir) = session()?;
    session
        .evaluate::<Value>("function greet(name, opts) { return `${opts.greeting}, ${name}!`; }")
        .await?;

    let greeting: String = session
        .call_function("greet", args!["Ada", greeting = "Hello"]?)
        .await?;
    assert_eq!(greeting, "Hello, Ada!");

    session
        .evaluate::<Value>("function sum(xs) { return xs.reduce((a, b) => a + b, 0); }")
        .await?;
    let total: i64 = session.call_function("sum", args![vec![1, 2, 3]]?).await?;
    assert_eq!(total, 6);
    Ok(())
}

#[tokio::test]
async fn missing_function_is_reported() -> Result<()> {
    let (mut session, _dir) = session()?;
    session.evaluate::<Value>("var notFn = 3;").await?;

    for name in ["nope", "notFn"] {
        let err = session.call_function::<Value>(name, args![]?).await.unwrap_err();
        assert!(matches!(&err, Error::FunctionNotFound(n) if n == name), "{err:?}");
        assert_eq!(err.to_string(), format!("fn {name} not found"));
    }
    Ok(())
}

#[tokio::test]
async fn promises_are_settled() -> Result<()> {
    let (mut session, _dir) = session()?;

    let n: i64 = session.evaluate("Promise.resolve(41).then(x => x + 1)").await?;
    assert_eq!(n, 42);

    session
        .evaluate::<Value>("async function twice(x) { await null; return x * 2; }")
        .await?;
    let n: i64 = session.call_function("twice", args![21]?).await?;
    assert_eq!(n, 42);

    let err = session
        .evaluate::<Value>("Promise.reject(new Error('nope'))")
        .await
        .unwrap_err();
    assert!(matches!(&err, Error::Script { message, .. } if message.contains("nope")), "{err:?}");

    let err = session
        .evaluate::<Value>("new Promise(() => {})")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Engine(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn properties_are_visible_to_scripts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut session = builder(&StaticHost::shared(), dir.path())
        .property("config", &json!({ "limit": 3, "tags": ["a"] }))
        .property("name", &"jsbridge")
        .property("tree", &Value::from_json(r#"{"depth": [1, [2]]}"#)?)
        .build()?;

    let n: i64 = session.evaluate("config.limit + config.tags.length").await?;
    assert_eq!(n, 4);
    let name: String = session.evaluate("name.toUpperCase()").await?;
    assert_eq!(name, "JSBRIDGE");

    // Value itself is a valid property and result type.
    let tree: Value = session.evaluate("tree").await?;
    assert_eq!(tree.to_json(), r#"{"depth":[1,[2]]}"#);
    let inner: Vec<Value> = session.evaluate("tree.depth").await?;
    assert_eq!(inner[1].kind(), ValueKind::Array);
    Ok(())
}

#[tokio::test]
async fn bootstrap_defines_globals() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("init.js"),
        "const VERSION = 3;\nfunction version() { return VERSION; }\n",
    )?;
    let mut session = builder(&StaticHost::shared(), dir.path())
        .bootstrap("init.js")
        .build()?;

    let v: i64 = session.call_function("version", args![]?).await?;
    assert_eq!(v, 3);
    Ok(())
}

#[tokio::test]
async fn lenient_bootstrap_keeps_going() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("broken.js"), "function (")?;

    let mut session = builder(&StaticHost::shared(), dir.path())
        .bootstrap("broken.js")
        .build()?;
    let n: i64 = session.evaluate("1").await?;
    assert_eq!(n, 1);

    let mut session = builder(&StaticHost::shared(), dir.path())
        .bootstrap("missing.js")
        .build()?;
    let n: i64 = session.evaluate("2").await?;
    assert_eq!(n, 2);
    Ok(())
}

#[tokio::test]
async fn strict_bootstrap_fails_build() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("broken.js"), "function (")?;

    let err = builder(&StaticHost::shared(), dir.path())
        .bootstrap("broken.js")
        .strict_bootstrap(true)
        .build()
        .err()
        .expect("build should fail");
    match err {
        Error::Bootstrap { what, source } => {
            assert!(what.contains("broken.js"), "{what}");
            assert!(matches!(*source, Error::Script { .. }), "{source:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = builder(&StaticHost::shared(), dir.path())
        .bootstrap("missing.js")
        .strict_bootstrap(true)
        .build()
        .err()
        .expect("build should fail");
    assert!(matches!(&err, Error::Bootstrap { source, .. } if matches!(**source, Error::Io(_))));
    Ok(())
}

#[tokio::test]
async fn bootstrap_can_fetch_on_a_current_thread_runtime() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("boot.js"), "var n = xhr('http://static.test/n').n;")?;
    let host = StaticHost::shared();
    host.route("/n", 200, "application/json", r#"{"n": 9}"#);

    let mut session = builder(&host, dir.path())
        .bootstrap("boot.js")
        .strict_bootstrap(true)
        .build()?;
    assert_eq!(session.evaluate::<i64>("n").await?, 9);

    let n: i64 = session.evaluate_blocking("xhr('http://static.test/n').n + 1")?;
    assert_eq!(n, 10);
    assert_eq!(host.requests.lock().len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_can_fetch_on_a_multi_thread_runtime() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("boot.js"), "var n = xhr('http://static.test/n').n;")?;
    let host = StaticHost::shared();
    host.route("/n", 200, "application/json", r#"{"n": 4}"#);

    let mut session = builder(&host, dir.path())
        .bootstrap("boot.js")
        .strict_bootstrap(true)
        .build()?;
    assert_eq!(session.evaluate::<i64>("n").await?, 4);
    Ok(())
}

#[test]
fn blocking_api_without_a_runtime() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let host = StaticHost::shared();
    host.route("/n", 200, "application/json", r#"{"n": 5}"#);
    let mut session = builder(&host, dir.path()).build()?;

    session.evaluate_blocking::<Value>("function n() { return xhr('http://static.test/n').n; }")?;
    let n: i64 = session.call_function_blocking("n", args![]?)?;
    assert_eq!(n, 5);
    assert_eq!(host.requests.lock().len(), 1);
    session.close();
    Ok(())
}
