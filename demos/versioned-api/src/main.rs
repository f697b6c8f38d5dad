//! Demo server for versioned response bodies
//!
//! ```text
//! cargo run -p versioned-api
//!
//! curl localhost:8080/orders/5             # default version 3
//! curl localhost:8080/orders/5?v=1         # query parameter
//! curl -H 'Model-Version: 2' localhost:8080/orders/5
//! curl -H 'Invoice-Schema: 1' localhost:8080/invoices/9
//! ```
//!
//! The invoice policy can be configured with `INVOICES_DEFAULT_VERSION`,
//! `INVOICES_QUERY_PARAM_NAME` and `INVOICES_HEADER_NAME`.

use bytes::Bytes;
use http::request::Parts;
use http::{header, Method, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::ser::{SerializeStruct, Serializer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use versioned_response::config::load_dotenv;
use versioned_response::prelude::*;
use versioned_response::{ConfigError, Response};

/// An order whose JSON shape depends on the requested model version
#[derive(Debug, VersionedModel)]
struct Order {
    id: u64,
    total_cents: u64,
    #[version_sink]
    model_version: Option<String>,
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.model_version.as_deref() {
            Some("1") => {
                let mut state = serializer.serialize_struct("Order", 2)?;
                state.serialize_field("id", &self.id)?;
                state.serialize_field(
                    "total",
                    &format!("{}.{:02}", self.total_cents / 100, self.total_cents % 100),
                )?;
                state.end()
            }
            Some("2") => {
                let mut state = serializer.serialize_struct("Order", 2)?;
                state.serialize_field("id", &self.id)?;
                state.serialize_field("total_cents", &self.total_cents)?;
                state.end()
            }
            version => {
                let mut state = serializer.serialize_struct("Order", 3)?;
                state.serialize_field("id", &self.id)?;
                state.serialize_field(
                    "total",
                    &Money {
                        amount: self.total_cents,
                        currency: "EUR",
                    },
                )?;
                state.serialize_field("model_version", &version)?;
                state.end()
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct Money {
    amount: u64,
    currency: &'static str,
}

/// An invoice that only knows numeric schema revisions
#[derive(Debug, Serialize, VersionedModel)]
#[versioned(accessor = "set_schema")]
struct Invoice {
    number: String,
    schema: u8,
}

impl Invoice {
    fn set_schema(&mut self, version: &str) -> Result<(), SinkWriteError> {
        self.schema = version
            .parse()
            .map_err(|_| SinkWriteError::new(format!("unknown invoice schema `{}`", version)))?;
        Ok(())
    }
}

#[derive(Debug, Serialize, VersionedModel)]
struct Health {
    status: &'static str,
}

#[versioned_body(default = "3", query_param = "v", header = "Model-Version")]
async fn get_order(id: u64) -> Order {
    Order {
        id,
        total_cents: 1250,
        model_version: None,
    }
}

async fn get_invoice(id: u64) -> Invoice {
    Invoice {
        number: format!("INV-{}", id),
        schema: 0,
    }
}

fn invoice_policy() -> std::result::Result<EndpointVersionPolicy, VersioningError> {
    match EndpointVersionPolicy::from_env_prefixed("INVOICES") {
        Ok(policy) => Ok(policy),
        Err(VersioningError::Config(ConfigError::MissingVar(var))) => {
            warn!(%var, "invoice version policy not configured, using defaults");
            EndpointVersionPolicy::new("2")?.header("Invoice-Schema")
        }
        Err(err) => Err(err),
    }
}

fn build_advice() -> std::result::Result<VersionedBodyAdvice, VersioningError> {
    let endpoints = VersionedEndpoints::new()
        .with(Method::GET, "/orders/{id}", get_order_version_policy())?
        .with(Method::GET, "/invoices/{id}", invoice_policy()?)?;

    Ok(VersionedBodyAdvice::new(endpoints))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    load_dotenv();

    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,versioned_response_core=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    let advice = Arc::new(build_advice()?);
    let addr: SocketAddr = std::env::var("ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("versioned-api listening on http://{}", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let advice = advice.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: hyper::Request<Incoming>| {
                let advice = advice.clone();
                async move { Ok::<_, Infallible>(handle_request(&advice, req).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Connection error: {}", err);
            }
        });
    }
}

/// Route a request and write its versioned body
async fn handle_request(advice: &VersionedBodyAdvice, req: hyper::Request<Incoming>) -> Response {
    let start = std::time::Instant::now();
    let (parts, _body) = req.into_parts();

    let response = route(advice, &parts).await;

    log_request(&parts.method, parts.uri.path(), response.status(), start);
    response
}

async fn route(advice: &VersionedBodyAdvice, parts: &Parts) -> Response {
    let segments: Vec<&str> = parts.uri.path().trim_matches('/').split('/').collect();

    match (&parts.method, segments.as_slice()) {
        (&Method::GET, ["health"]) => {
            let key = EndpointKey::new(Method::GET, "/health");
            advice.write_body(Health { status: "ok" }, &key, parts)
        }
        (&Method::GET, ["orders", id]) => match id.parse() {
            Ok(id) => {
                let key = EndpointKey::new(Method::GET, "/orders/{id}");
                advice.write_body(get_order(id).await, &key, parts)
            }
            Err(_) => plain(StatusCode::BAD_REQUEST, "order id must be a number"),
        },
        (&Method::GET, ["invoices", id]) => match id.parse() {
            Ok(id) => {
                let key = EndpointKey::new(Method::GET, "/invoices/{id}");
                advice.write_body(get_invoice(id).await, &key, parts)
            }
            Err(_) => plain(StatusCode::BAD_REQUEST, "invoice id must be a number"),
        },
        _ => plain(StatusCode::NOT_FOUND, "not found"),
    }
}

fn plain(status: StatusCode, message: &'static str) -> Response {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Log request completion
fn log_request(method: &Method, path: &str, status: StatusCode, start: std::time::Instant) {
    let elapsed = start.elapsed();

    if status.is_success() {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    } else {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    }
}
