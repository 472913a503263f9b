use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use codereview_genai::{GenerationError, GenerationOutcome, Generator, SystemInstruction};
use once_cell::sync::Lazy;

use crate::AppState;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Serialized process-env mutation; values are restored on drop.
pub(crate) mod env {
    use super::*;
    use std::collections::HashMap;
    use std::sync::MutexGuard;

    pub(crate) struct EnvGuard {
        _lock: MutexGuard<'static, ()>,
        saved: HashMap<String, Option<String>>,
    }

    pub(crate) fn guard() -> EnvGuard {
        EnvGuard {
            _lock: ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
            saved: HashMap::new(),
        }
    }

    impl EnvGuard {
        fn remember(&mut self, key: &str) {
            self.saved
                .entry(key.to_string())
                .or_insert_with(|| std::env::var(key).ok());
        }

        pub(crate) fn set(&mut self, key: &str, value: impl AsRef<str>) {
            self.set_opt(key, Some(value.as_ref()));
        }

        pub(crate) fn set_opt(&mut self, key: &str, value: Option<&str>) {
            self.remember(key);
            match value {
                Some(val) => std::env::set_var(key, val),
                None => std::env::remove_var(key),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain() {
                match value {
                    Some(val) => std::env::set_var(&key, val),
                    None => std::env::remove_var(&key),
                }
            }
        }
    }
}

#[derive(Clone)]
pub(crate) enum Reply {
    Text(String),
    Empty,
    Fail(GenerationError),
}

/// Canned generator that records how often and with what it was called.
pub(crate) struct StubGenerator {
    reply: Reply,
    calls: AtomicUsize,
    last: Mutex<Option<(SystemInstruction, String)>>,
}

impl StubGenerator {
    pub(crate) fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    pub(crate) fn text(text: &str) -> Arc<Self> {
        Self::new(Reply::Text(text.to_string()))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_call(&self) -> Option<(SystemInstruction, String)> {
        self.last.lock().expect("stub lock poisoned").clone()
    }
}

#[async_trait]
impl Generator for StubGenerator {
    fn backend(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        instruction: SystemInstruction,
        input: &str,
    ) -> Result<GenerationOutcome, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().expect("stub lock poisoned") = Some((instruction, input.to_string()));
        match &self.reply {
            Reply::Text(text) => Ok(GenerationOutcome::Text(text.clone())),
            Reply::Empty => Ok(GenerationOutcome::Empty),
            Reply::Fail(err) => Err(err.clone()),
        }
    }
}

/// Minimal state around `generator`, with the real endpoint index.
pub(crate) fn state_with(generator: Arc<StubGenerator>) -> AppState {
    let (_, endpoints, meta) = crate::router::build_router();
    AppState::builder(generator)
        .with_endpoints(Arc::new(endpoints))
        .with_endpoints_meta(Arc::new(meta))
        .build()
}
