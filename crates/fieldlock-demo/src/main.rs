//! Fieldlock demo host.
//!
//! Minimal HTTP application showing how a host drives the protocol: GET `/`
//! renders a form with a freshly issued public key, POST `/` decrypts the
//! protected fields and reports them back. Sessions are cookie-addressed
//! and held in memory, so state lasts only as long as the process.
//!
//! # Usage
//!
//! ```bash
//! fieldlock-demo --bind 127.0.0.1:8080 --bits 2048 --field password
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Form, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use fieldlock_core::{Error, FieldList, MemorySessionStore, Orchestrator, SlotHandle};
use rand::RngCore;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the cookie carrying the demo session id.
const SESSION_COOKIE: &str = "fieldlock_sid";

/// Fieldlock demo server
#[derive(Parser, Debug)]
#[command(name = "fieldlock-demo")]
#[command(about = "Fieldlock form-field encryption demo")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// RSA key size in bits (1024, 2048, 4096)
    #[arg(long, default_value = "2048")]
    bits: usize,

    /// Form field to encrypt (repeatable)
    #[arg(long = "field", default_value = "password")]
    fields: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Shared application state: protocol configuration plus one in-memory
/// session store per cookie-identified visitor.
///
/// Sessions are never evicted, so the map grows by one entry per
/// first-time visitor for the life of the process.
struct AppState {
    orchestrator: Orchestrator,
    sessions: Mutex<HashMap<String, MemorySessionStore>>,
}

impl AppState {
    /// Session store for the request, creating one for first-time visitors.
    ///
    /// Returns the session id, the store, and whether the id is new and
    /// needs a `Set-Cookie`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). This is acceptable for demo code.
    #[allow(clippy::expect_used)]
    fn session_for(&self, headers: &HeaderMap) -> (String, MemorySessionStore, bool) {
        let mut sessions = self.sessions.lock().expect("Mutex poisoned");

        if let Some(sid) = cookie_session_id(headers) {
            if let Some(session) = sessions.get(&sid) {
                return (sid, session.clone(), false);
            }
        }

        let sid = fresh_session_id();
        let session = MemorySessionStore::new();
        sessions.insert(sid.clone(), session.clone());
        (sid, session, true)
    }
}

/// Session id from the request's `Cookie` header, if present.
fn cookie_session_id(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Random 128-bit session id, hex-encoded.
fn fresh_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Map a protocol error onto an HTTP response.
///
/// `NoKey` means the submission raced a completed exchange or arrived
/// without a render; the client should reload the form. Malformed input is
/// the client's fault; everything else is ours.
fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::NoKey => StatusCode::GONE,
        Error::Decode(_) | Error::Decryption => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if err.is_stale_submission() {
        tracing::debug!(error = %err, "stale submission");
    } else {
        tracing::warn!(error = %err, "request failed");
    }

    (status, err.to_string()).into_response()
}

/// GET `/`: issue a key and render the form.
async fn render_form(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (sid, session, is_new) = state.session_for(&headers);

    // Key generation is CPU-bound; keep it off the async workers.
    let orchestrator = state.orchestrator.clone();
    let rendered =
        tokio::task::spawn_blocking(move || orchestrator.render(&session, &SlotHandle::Default))
            .await;

    let output = match rendered {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => return error_response(&err),
        Err(join_err) => {
            tracing::error!(error = %join_err, "render task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
        },
    };

    let fields_json =
        serde_json::to_string(output.fields.names()).unwrap_or_else(|_| "[]".to_string());
    let inputs: String = output
        .fields
        .names()
        .iter()
        .map(|name| {
            format!(
                "<label>{name} <input id=\"{name}\" name=\"{name}\" type=\"password\"></label><br>\n"
            )
        })
        .collect();

    let body = format!(
        "<!doctype html>\n<html>\n<head><title>Fieldlock demo</title></head>\n<body>\n\
         <form id=\"fieldlock_form\" method=\"post\" action=\"/\">\n\
         <label>Name <input id=\"fname\" name=\"fname\"></label><br>\n\
         {inputs}\
         <button type=\"submit\">Send</button>\n\
         </form>\n\
         <!-- A real host serves a client-side encryption script here that\n\
              reads these two values, encrypts each listed field with the\n\
              public key and replaces the input value with ciphertext hex\n\
              before the form is submitted. -->\n\
         <script>\n\
         var fieldlockPublicKey = \"{public_key}\";\n\
         var fieldlockFields = {fields_json};\n\
         </script>\n\
         </body>\n</html>\n",
        public_key = output.public_key,
    );

    let mut response = Html(body).into_response();
    if is_new {
        let cookie = format!("{SESSION_COOKIE}={sid}; HttpOnly; Path=/; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// POST `/`: decrypt the protected fields and consume the key.
#[allow(clippy::unused_async)] // handler signature
async fn submit_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let (_, session, _) = state.session_for(&headers);

    let pairs: Vec<(&str, &str)> = state
        .orchestrator
        .fields()
        .names()
        .iter()
        .filter_map(|name| form.get(name).map(|value| (name.as_str(), value.as_str())))
        .collect();

    match state.orchestrator.submit(&session, &SlotHandle::Default, &pairs) {
        Ok(fields) => {
            let mut report = String::from("Decrypted submission:\n");
            if let Some(fname) = form.get("fname") {
                report.push_str(&format!("  fname: {fname} (not encrypted)\n"));
            }
            for (name, plaintext) in fields {
                report.push_str(&format!("  {name}: {}\n", String::from_utf8_lossy(&plaintext)));
            }
            (StatusCode::OK, report).into_response()
        },
        Err(err) => error_response(&err),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Fieldlock demo starting");
    tracing::info!("Key size: {} bits, fields: {:?}", args.bits, args.fields);

    let state = Arc::new(AppState {
        orchestrator: Orchestrator::new(args.bits, FieldList::new(args.fields)),
        sessions: Mutex::new(HashMap::new()),
    });

    let app = Router::new().route("/", get(render_form).post(submit_form)).with_state(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
