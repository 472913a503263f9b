use std::net::SocketAddr;
use std::sync::Arc;

use codereview_genai::{Generator, SystemInstruction};

#[derive(Clone)]
pub(crate) struct AppState {
    generator: Arc<dyn Generator>,
    instruction: SystemInstruction,
    bind: SocketAddr,
    endpoints: Arc<Vec<String>>,
    endpoints_meta: Arc<Vec<serde_json::Value>>,
}

impl AppState {
    pub(crate) fn builder(generator: Arc<dyn Generator>) -> AppStateBuilder {
        AppStateBuilder {
            generator,
            instruction: SystemInstruction::default(),
            bind: None,
            endpoints: None,
            endpoints_meta: None,
        }
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    pub fn instruction(&self) -> SystemInstruction {
        self.instruction
    }

    pub fn bind(&self) -> SocketAddr {
        self.bind
    }

    pub fn endpoints(&self) -> Arc<Vec<String>> {
        self.endpoints.clone()
    }

    pub fn endpoints_meta(&self) -> Arc<Vec<serde_json::Value>> {
        self.endpoints_meta.clone()
    }
}

pub(crate) struct AppStateBuilder {
    generator: Arc<dyn Generator>,
    instruction: SystemInstruction,
    bind: Option<SocketAddr>,
    endpoints: Option<Arc<Vec<String>>>,
    endpoints_meta: Option<Arc<Vec<serde_json::Value>>>,
}

impl AppStateBuilder {
    pub(crate) fn with_instruction(mut self, instruction: SystemInstruction) -> Self {
        self.instruction = instruction;
        self
    }

    pub(crate) fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = Some(bind);
        self
    }

    pub(crate) fn with_endpoints(mut self, endpoints: Arc<Vec<String>>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub(crate) fn with_endpoints_meta(mut self, meta: Arc<Vec<serde_json::Value>>) -> Self {
        self.endpoints_meta = Some(meta);
        self
    }

    pub(crate) fn build(self) -> AppState {
        AppState {
            generator: self.generator,
            instruction: self.instruction,
            bind: self.bind.unwrap_or_else(|| {
                SocketAddr::from(([0, 0, 0, 0], crate::config::DEFAULT_PORT))
            }),
            endpoints: self.endpoints.unwrap_or_default(),
            endpoints_meta: self.endpoints_meta.unwrap_or_default(),
        }
    }
}
