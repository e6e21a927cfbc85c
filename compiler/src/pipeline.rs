// pipeline.rs — Translation entry points and provenance
//
// Ties the reader, assemblers and network driver together for the CLI and
// for tests: load → parse → translate, plus the build-info record that lets
// generated artifacts be cached by their inputs.
//
// Preconditions: none.
// Postconditions: translation of identical inputs yields identical output
//                 and identical provenance.
// Failure modes: any `TranslateError`; translation stops at the first one.
// Side effects: file reads in the `*_file` entry points.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::component::ComponentKind;
use crate::diag::{Result, TranslateError};
use crate::network::{translate_network, NetworkPlan, TranslateOptions};
use crate::neuron::NeuronModel;
use crate::observe::TranslationObserver;
use crate::postsynaptic::PostsynapticModel;
use crate::source::{parse_document, ComponentSource, FileSource};
use crate::weight_update::WeightUpdateModel;

// ── Provenance ─────────────────────────────────────────────────────────────

/// Fingerprint of one translated model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelFingerprint {
    pub kind: ComponentKind,
    pub url: String,
    pub fingerprint: String,
}

/// Provenance metadata for `--emit build-info` and cache-key use.
///
/// `source_hash`: SHA-256 of the raw source document text.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub source_hash: String,
    pub compiler_version: &'static str,
    pub models: Vec<ModelFingerprint>,
}

impl Provenance {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = hasher.finalize();
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Provenance of a single-component translation.
pub fn compute_provenance(source: &str) -> Provenance {
    Provenance {
        source_hash: sha256_hex(source),
        compiler_version: env!("CARGO_PKG_VERSION"),
        models: Vec::new(),
    }
}

/// Provenance of a network translation, listing every model it created.
pub fn compute_network_provenance(source: &str, plan: &NetworkPlan) -> Provenance {
    let mut provenance = compute_provenance(source);
    let entries = plan
        .neuron_models
        .iter()
        .map(|m| (m.kind, &m.key.url, &m.fingerprint))
        .chain(plan.postsynaptic_models.iter().map(|m| (m.kind, &m.key.url, &m.fingerprint)))
        .chain(plan.weight_update_models.iter().map(|m| (m.kind, &m.key.url, &m.fingerprint)));
    provenance.models = entries
        .map(|(kind, url, fingerprint)| ModelFingerprint {
            kind,
            url: url.clone(),
            fingerprint: fingerprint.clone(),
        })
        .collect();
    provenance
}

// ── Single component ───────────────────────────────────────────────────────

/// A single translated component of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranslatedComponent {
    NeuronBody(NeuronModel),
    Postsynaptic(PostsynapticModel),
    WeightUpdate(WeightUpdateModel),
}

impl TranslatedComponent {
    /// `(purpose, code)` pairs in emission order.
    pub fn code_sections(&self) -> Vec<(&'static str, &str)> {
        match self {
            TranslatedComponent::NeuronBody(m) => vec![
                ("sim_code", m.sim_code.as_str()),
                ("threshold_condition_code", m.threshold_condition_code.as_str()),
            ],
            TranslatedComponent::Postsynaptic(m) => vec![
                ("decay_code", m.decay_code.as_str()),
                ("apply_input_code", m.apply_input_code.as_str()),
            ],
            TranslatedComponent::WeightUpdate(m) => vec![
                ("sim_code", m.sim_code.as_str()),
                ("synapse_dynamics_code", m.synapse_dynamics_code.as_str()),
            ],
        }
    }

    /// Human-readable listing of every code buffer.
    pub fn code_listing(&self) -> String {
        let mut out = String::new();
        for (purpose, code) in self.code_sections() {
            write_section(&mut out, purpose, code);
        }
        out
    }
}

fn write_section(out: &mut String, purpose: &str, code: &str) {
    let _ = writeln!(out, "// ── {} ──", purpose);
    out.push_str(code);
    if !code.is_empty() && !code.ends_with('\n') {
        out.push('\n');
    }
}

/// Translate component markup held in memory. `label` names the document in
/// error messages.
pub fn translate_component_text(
    label: &str,
    text: &str,
    kind: ComponentKind,
    variable_params: &BTreeSet<String>,
    observer: &mut dyn TranslationObserver,
) -> Result<TranslatedComponent> {
    let doc = parse_document(label, text)?;
    let translated = match kind {
        ComponentKind::NeuronBody => {
            NeuronModel::from_document(&doc, variable_params, observer).map(TranslatedComponent::NeuronBody)
        }
        ComponentKind::Postsynaptic => PostsynapticModel::from_document(&doc, variable_params, observer)
            .map(TranslatedComponent::Postsynaptic),
        ComponentKind::WeightUpdate => WeightUpdateModel::from_document(&doc, variable_params, observer)
            .map(TranslatedComponent::WeightUpdate),
    };
    translated.map_err(|e| e.within(label))
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| TranslateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Translate a component document from disk.
pub fn translate_component_file(
    path: &Path,
    kind: ComponentKind,
    variable_params: &BTreeSet<String>,
    observer: &mut dyn TranslationObserver,
) -> Result<(TranslatedComponent, Provenance)> {
    let text = read_source(path)?;
    let label = path.display().to_string();
    let component = translate_component_text(&label, &text, kind, variable_params, observer)?;
    Ok((component, compute_provenance(&text)))
}

// ── Network ────────────────────────────────────────────────────────────────

/// Network name derived from the document file name, extension removed.
pub fn network_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "network".to_string())
}

/// Translate network markup held in memory, loading components from `source`.
pub fn translate_network_text(
    label: &str,
    text: &str,
    name: &str,
    base: &Path,
    source: &dyn ComponentSource,
    options: &TranslateOptions,
    observer: &mut dyn TranslationObserver,
) -> Result<(NetworkPlan, Provenance)> {
    let doc = parse_document(label, text)?;
    let plan = translate_network(&doc, name, base, source, options, observer)
        .map_err(|e| e.within(label))?;
    let provenance = compute_network_provenance(text, &plan);
    Ok((plan, provenance))
}

/// Translate a network document from disk; component URLs resolve against
/// the network file's directory.
pub fn translate_network_file(
    path: &Path,
    options: &TranslateOptions,
    observer: &mut dyn TranslationObserver,
) -> Result<(NetworkPlan, Provenance)> {
    let text = read_source(path)?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
    translate_network_text(
        &path.display().to_string(),
        &text,
        &network_name(path),
        &base,
        &FileSource,
        options,
        observer,
    )
}

/// Human-readable listing of every model's code buffers in a network plan.
pub fn network_code_listing(plan: &NetworkPlan) -> String {
    let mut out = String::new();
    for m in &plan.neuron_models {
        let _ = writeln!(out, "// neuron model {} ({})", m.model.name, m.key.url);
        write_section(&mut out, "sim_code", &m.model.sim_code);
        write_section(&mut out, "threshold_condition_code", &m.model.threshold_condition_code);
    }
    for m in &plan.postsynaptic_models {
        let _ = writeln!(out, "// postsynaptic model {} ({})", m.model.name, m.key.url);
        write_section(&mut out, "decay_code", &m.model.decay_code);
        write_section(&mut out, "apply_input_code", &m.model.apply_input_code);
    }
    for m in &plan.weight_update_models {
        let _ = writeln!(out, "// weight update model {} ({})", m.model.name, m.key.url);
        write_section(&mut out, "sim_code", &m.model.sim_code);
        write_section(&mut out, "synapse_dynamics_code", &m.model.synapse_dynamics_code);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::ErrorKind;
    use crate::observe::NullObserver;

    const LEAKY: &str = r#"<SpineML><ComponentClass name="Leaky" type="neuron_body">
        <Dynamics><Regime name="only">
          <TimeDerivative variable="V"><MathInline>-V / tau</MathInline></TimeDerivative>
        </Regime><StateVariable name="V"/></Dynamics>
        <Parameter name="tau"/>
    </ComponentClass></SpineML>"#;

    #[test]
    fn provenance_is_deterministic() {
        let a = compute_provenance(LEAKY);
        let b = compute_provenance(LEAKY);
        assert_eq!(a, b);
        assert_eq!(a.source_hash.len(), 64);
        assert_eq!(a.compiler_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn provenance_json_has_fields() {
        let json = compute_provenance(LEAKY).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["source_hash"].is_string());
        assert!(value["models"].as_array().unwrap().is_empty());
    }

    #[test]
    fn component_text_dispatches_by_kind() {
        let translated = translate_component_text(
            "leaky.xml",
            LEAKY,
            ComponentKind::NeuronBody,
            &BTreeSet::new(),
            &mut NullObserver,
        )
        .unwrap();
        let sections = translated.code_sections();
        assert_eq!(sections[0], ("sim_code", "$(V) += DT * (-$(V) / $(tau));\n"));
        assert_eq!(sections[1], ("threshold_condition_code", ""));
    }

    #[test]
    fn component_errors_name_the_document() {
        let err = translate_component_text(
            "leaky.xml",
            LEAKY,
            ComponentKind::Postsynaptic,
            &BTreeSet::new(),
            &mut NullObserver,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(format!("{err}").contains("leaky.xml: "));
    }

    #[test]
    fn listing_labels_sections() {
        let translated = translate_component_text(
            "leaky.xml",
            LEAKY,
            ComponentKind::NeuronBody,
            &BTreeSet::new(),
            &mut NullObserver,
        )
        .unwrap();
        let listing = translated.code_listing();
        assert!(listing.starts_with("// ── sim_code ──\n$(V) += DT"));
        assert!(listing.contains("// ── threshold_condition_code ──\n"));
    }

    #[test]
    fn network_name_strips_extension() {
        assert_eq!(network_name(Path::new("models/cortex.xml")), "cortex");
    }
}
