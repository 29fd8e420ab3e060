use anyhow::Result;
use jsbridge::{Error, Session, Value};
use serde::Deserialize;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{any, body_string, header, method, path},
};

use super::common::init_tracing;

async fn session(server: &MockServer) -> Result<(Session, tempfile::TempDir)> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let session = Session::builder()
        .root_dir(dir.path())
        .property("base", &server.uri())
        .build()?;
    Ok((session, dir))
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_text_and_metadata() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-trace", "t-1")
                .set_body_raw("hi there", "text/plain"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (mut session, _dir) = session(&server).await?;

    let out: (String, i64, String, String, String, String) = session
        .evaluate(
            "const r = fetch(base + '/hello'); \
             [r.text(), r.status, r.statusText, r.headers['x-trace'], r.url, String(r)]",
        )
        .await?;
    assert_eq!(out.0, "hi there");
    assert_eq!(out.1, 200);
    assert_eq!(out.2, "OK");
    assert_eq!(out.3, "t-1");
    assert_eq!(out.4, format!("{}/hello", server.uri()));
    assert_eq!(out.5, "hi there");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_json_and_base_url() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"items":[{"id":1},{"id":2}]}"#, "application/json"),
        )
        .mount(&server)
        .await;
    let (mut session, _dir) = session(&server).await?;

    let ids: Vec<i64> = session
        .evaluate("fetch(base + '/data').json().items.map(i => i.id)")
        .await?;
    assert_eq!(ids, [1, 2]);

    let base: String = session.evaluate("fetch(base + '/data').baseUrl").await?;
    assert_eq!(base, server.uri());

    let first: i64 = session.evaluate("xhr(base + '/data').items[0].id").await?;
    assert_eq!(first, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_posts_json_body() -> Result<()> {
    #[derive(Deserialize)]
    struct Reply {
        ok: bool,
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("content-type", "application/json"))
        .and(header("x-count", "2"))
        .and(body_string(r#"{"hello":"world"}"#))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"ok":true}"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (mut session, _dir) = session(&server).await?;

    let reply: Reply = session
        .evaluate(
            "fetch(base + '/echo', { method: 'post', headers: { 'x-count': 2 }, body: { hello: 'world' } }).json()",
        )
        .await?;
    assert!(reply.ok);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn error_status_is_typed() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let (mut session, _dir) = session(&server).await?;

    for script in ["fetch(base + '/gone')", "xhr(base + '/gone')"] {
        let err = session.evaluate::<Value>(script).await.unwrap_err();
        match err {
            Error::HttpStatus { code, description } => {
                assert_eq!(code, 404);
                assert_eq!(description, "Not Found");
            }
            other => panic!("{script}: unexpected error {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_url_sends_nothing() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (mut session, _dir) = session(&server).await?;

    for script in ["fetch()", "fetch('')", "fetch(null)", "xhr()"] {
        let err = session.evaluate::<Value>(script).await.unwrap_err();
        assert!(matches!(err, Error::Argument(_)), "{script}: {err:?}");
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_json_body() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;
    let (mut session, _dir) = session(&server).await?;

    for script in ["xhr(base + '/broken')", "fetch(base + '/broken').json()"] {
        let err = session.evaluate::<Value>(script).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)), "{script}: {err:?}");
    }
    let name: String = session
        .evaluate("try { xhr(base + '/broken') } catch (e) { e.name }")
        .await?;
    assert_eq!(name, "SyntaxError");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn html_document_queries() -> Result<()> {
    let page = r#"<html><head><title>Listing</title></head><body>
        <ul><li><a href="/one" class="x">One</a></li><li><a href="/two">Two</a></li></ul>
        </body></html>"#;
    let server = MockServer::start().await;
    Mock::given(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(page, "text/html"),
        )
        .mount(&server)
        .await;
    let (mut session, _dir) = session(&server).await?;

    let out: (String, Vec<String>, String, String, String) = session
        .evaluate(
            "const doc = fetch(base + '/page').html(); \
             const list = doc.select('ul')[0]; \
             [doc.title(), list.select('li').map(li => li.text()), \
              doc.select('a')[0].attr('href'), doc.select('a.x')[0].tagName, doc.baseUrl]",
        )
        .await?;
    assert_eq!(out.0, "Listing");
    assert_eq!(out.1, ["One", "Two"]);
    assert_eq!(out.2, "/one");
    assert_eq!(out.3, "a");
    assert_eq!(out.4, server.uri());

    let err = session
        .evaluate::<Value>("fetch(base + '/page').html().select('a[[')")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Argument(_)), "{err:?}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn text_honours_declared_charset() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(path("/latin1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain; charset=iso-8859-1")
                .set_body_bytes(b"caf\xe9".to_vec()),
        )
        .mount(&server)
        .await;
    let (mut session, _dir) = session(&server).await?;

    let out: (String, usize) = session
        .evaluate("const r = fetch(base + '/latin1'); [r.text(), new Uint8Array(r.bytes()).length]")
        .await?;
    assert_eq!(out.0, "café");
    assert_eq!(out.1, 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_refused_is_a_transport_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut session = Session::builder().root_dir(dir.path()).build()?;

    let err = session
        .evaluate::<Value>("fetch('http://127.0.0.1:9/')")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err:?}");

    let name: String = session
        .evaluate("try { fetch('http://127.0.0.1:9/') } catch (e) { e.name }")
        .await?;
    assert_eq!(name, "FetchError");
    Ok(())
}
