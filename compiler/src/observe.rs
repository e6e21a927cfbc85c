// observe.rs — Injectable translation observer
//
// Translation echoes what it discovers (regimes, parameters, variables,
// generated code) through an observer rather than writing to the console.
// The CLI plugs in `TracingObserver`; tests use `NullObserver` or
// `RecordingObserver`.

use crate::cache::ModelKey;
use crate::component::ComponentKind;
use crate::id::RegimeId;

/// Receives informational events during translation. All methods default to
/// no-ops so implementors only override what they need.
pub trait TranslationObserver {
    fn on_model(&mut self, _kind: ComponentKind, _name: &str) {}
    fn on_regime(&mut self, _name: &str, _id: RegimeId) {}
    fn on_parameter(&mut self, _name: &str) {}
    fn on_variable(&mut self, _name: &str, _ty: &str) {}
    fn on_port(&mut self, _port: &str, _target: &str) {}
    fn on_code(&mut self, _purpose: &str, _code: &str) {}
    fn on_model_created(&mut self, _key: &ModelKey) {}
    fn on_population(&mut self, _name: &str, _size: u32) {}
    fn on_projection(&mut self, _source: &str, _target: &str) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl TranslationObserver for NullObserver {}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TranslationObserver for TracingObserver {
    fn on_model(&mut self, kind: ComponentKind, name: &str) {
        tracing::info!(%kind, model = name, "translating component");
    }

    fn on_regime(&mut self, name: &str, id: RegimeId) {
        tracing::debug!(regime = name, id = id.0, "regime");
    }

    fn on_parameter(&mut self, name: &str) {
        tracing::debug!(parameter = name, "parameter");
    }

    fn on_variable(&mut self, name: &str, ty: &str) {
        tracing::debug!(variable = name, ty, "variable");
    }

    fn on_port(&mut self, port: &str, target: &str) {
        tracing::debug!(port, target, "analogue receive port");
    }

    fn on_code(&mut self, purpose: &str, code: &str) {
        tracing::debug!(purpose, "generated code:\n{}", code);
    }

    fn on_model_created(&mut self, key: &ModelKey) {
        tracing::info!(url = %key.url, fingerprint = %key.fingerprint(), "creating new model");
    }

    fn on_population(&mut self, name: &str, size: u32) {
        tracing::info!(population = name, size, "population");
    }

    fn on_projection(&mut self, source: &str, target: &str) {
        tracing::info!(source, target, "projection");
    }
}

/// Collects events as text lines, one per event.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub lines: Vec<String>,
}

impl TranslationObserver for RecordingObserver {
    fn on_model(&mut self, kind: ComponentKind, name: &str) {
        self.lines.push(format!("model {} {}", kind, name));
    }

    fn on_regime(&mut self, name: &str, id: RegimeId) {
        self.lines.push(format!("regime {} {}", name, id));
    }

    fn on_parameter(&mut self, name: &str) {
        self.lines.push(format!("param {}", name));
    }

    fn on_variable(&mut self, name: &str, ty: &str) {
        self.lines.push(format!("var {}:{}", name, ty));
    }

    fn on_port(&mut self, port: &str, target: &str) {
        self.lines.push(format!("port {} -> {}", port, target));
    }

    fn on_code(&mut self, purpose: &str, _code: &str) {
        self.lines.push(format!("code {}", purpose));
    }

    fn on_model_created(&mut self, key: &ModelKey) {
        self.lines.push(format!("created {}", key.url));
    }

    fn on_population(&mut self, name: &str, size: u32) {
        self.lines.push(format!("population {} {}", name, size));
    }

    fn on_projection(&mut self, source: &str, target: &str) {
        self.lines.push(format!("projection {} -> {}", source, target));
    }
}
