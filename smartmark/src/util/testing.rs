// smartmark/src/util/testing.rs

use std::env;
use std::sync::{Arc, OnceLock};

use chrono::{TimeZone, Utc};
use tracing::{debug, info, instrument};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::config::{
    AccountSettings, ENV_ACCOUNT_EMAIL, ENV_ACCOUNT_NAME, ENV_DB_URL, ENV_FEED_POLL_MS,
    ENV_PENDING_TIMEOUT_SECS,
};
use crate::domain::clock::SteppingClock;
use crate::domain::session_provider::{AuthProvider, SessionProvider};
use crate::infrastructure::accounts::AccountDirectory;
use crate::infrastructure::memory::{InMemoryBackend, InMemorySessionProvider};

static TEST_ENV: OnceLock<()> = OnceLock::new();

/// Sets up test logging exactly once per process.
pub fn init_test_env() {
    TEST_ENV.get_or_init(|| {
        setup_test_logging();
        info!("Test environment initialized");
    });
}

fn setup_test_logging() {
    debug!("Attempting logger init from testing.rs");
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
        return;
    }

    let noisy_modules = ["diesel", "mio", "tokio"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    subscriber.try_init().unwrap_or_else(|e| {
        eprintln!("Error: Failed to set up logging: {}", e);
    });
}

const GUARDED_VARS: [&str; 5] = [
    ENV_DB_URL,
    ENV_FEED_POLL_MS,
    ENV_PENDING_TIMEOUT_SECS,
    ENV_ACCOUNT_EMAIL,
    ENV_ACCOUNT_NAME,
];

/// Restores the `SMARTMARK_*` variables on drop
#[derive(Debug, Clone)]
pub struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
}

impl Default for EnvGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvGuard {
    pub fn new() -> Self {
        Self {
            saved: GUARDED_VARS
                .iter()
                .map(|name| (*name, env::var(name).ok()))
                .collect(),
        }
    }

    /// Saves and then unsets every guarded variable
    pub fn cleared() -> Self {
        let guard = Self::new();
        for name in GUARDED_VARS {
            env::remove_var(name);
        }
        guard
    }
}

impl Drop for EnvGuard {
    #[instrument(level = "trace")]
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(val) => env::set_var(name, val),
                None => env::remove_var(name),
            }
        }
    }
}

/// Two identities: `google` signs in Jane, `github` signs in John.
pub fn test_accounts() -> AccountDirectory {
    AccountDirectory::new(&[
        AccountSettings {
            provider: "google".to_string(),
            email: "jane@example.com".to_string(),
            full_name: Some("Jane Doe".to_string()),
            avatar_url: Some("https://avatars.example.com/jane.png".to_string()),
        },
        AccountSettings {
            provider: "github".to_string(),
            email: "john@example.com".to_string(),
            full_name: None,
            avatar_url: None,
        },
    ])
}

/// Backend with a clock that advances one second per bookmark
pub fn test_backend() -> InMemoryBackend {
    let start = Utc
        .with_ymd_and_hms(2025, 6, 1, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    InMemoryBackend::with_clock(
        test_accounts(),
        Arc::new(SteppingClock::new(start, chrono::Duration::seconds(1))),
    )
}

/// Session signed in as Jane, with the sign-in calls already discounted
pub async fn signed_in_session() -> (InMemoryBackend, Arc<InMemorySessionProvider>) {
    let backend = test_backend();
    let session = Arc::new(backend.connect());
    if let Err(e) = session.sign_in_with_provider(&AuthProvider::google()).await {
        panic!("test sign-in failed: {}", e);
    }
    session.reset_calls();
    (backend, session)
}
