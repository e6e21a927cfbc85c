// cache.rs — Memoized model translation
//
// A component referenced many times by a network is translated once per
// (document URL, variable-parameter set) pair. Keys are ordered so cached
// models are reported in a deterministic order.
//
// Preconditions: none.
// Postconditions: `get_or_create` translates a key at most once.
// Failure modes: load and translation errors propagate with the component
//                URL prefixed to their context.
// Side effects: none (echoing goes through the observer).

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::component::{ComponentKind, ModelVariables};
use crate::diag::Result;
use crate::doc::Document;
use crate::neuron::NeuronModel;
use crate::observe::TranslationObserver;
use crate::postsynaptic::PostsynapticModel;
use crate::source::ComponentSource;
use crate::weight_update::WeightUpdateModel;

/// Identity of one translated model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModelKey {
    pub url: String,
    pub variable_params: BTreeSet<String>,
}

impl ModelKey {
    pub fn new(url: impl Into<String>, variable_params: BTreeSet<String>) -> Self {
        ModelKey {
            url: url.into(),
            variable_params,
        }
    }

    /// SHA-256 hex digest of the key's canonical rendering.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_bytes());
        for param in &self.variable_params {
            hasher.update(b"\n");
            hasher.update(param.as_bytes());
        }
        let hash = hasher.finalize();
        hash.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// A model kind the cache can translate.
pub trait TranslateModel: Sized {
    const KIND: ComponentKind;

    fn translate(
        doc: &Document,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self>;

    fn variables(&self) -> &ModelVariables;
}

impl TranslateModel for NeuronModel {
    const KIND: ComponentKind = ComponentKind::NeuronBody;

    fn translate(
        doc: &Document,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        NeuronModel::from_document(doc, variable_params, observer)
    }

    fn variables(&self) -> &ModelVariables {
        &self.variables
    }
}

impl TranslateModel for PostsynapticModel {
    const KIND: ComponentKind = ComponentKind::Postsynaptic;

    fn translate(
        doc: &Document,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        PostsynapticModel::from_document(doc, variable_params, observer)
    }

    fn variables(&self) -> &ModelVariables {
        &self.variables
    }
}

impl TranslateModel for WeightUpdateModel {
    const KIND: ComponentKind = ComponentKind::WeightUpdate;

    fn translate(
        doc: &Document,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        WeightUpdateModel::from_document(doc, variable_params, observer)
    }

    fn variables(&self) -> &ModelVariables {
        &self.variables
    }
}

/// A cached model together with its key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedModel<M> {
    pub key: ModelKey,
    pub fingerprint: String,
    pub kind: ComponentKind,
    pub model: M,
}

/// One translated model per distinct key.
#[derive(Debug)]
pub struct ModelCache<M> {
    models: BTreeMap<ModelKey, M>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        ModelCache {
            models: BTreeMap::new(),
        }
    }
}

impl<M: TranslateModel> ModelCache<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &mut self,
        key: &ModelKey,
        source: &dyn ComponentSource,
        observer: &mut dyn TranslationObserver,
    ) -> Result<&M> {
        match self.models.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                observer.on_model_created(key);
                let doc = source.load(&key.url)?;
                let model = M::translate(&doc, &key.variable_params, observer)
                    .map_err(|e| e.within(&key.url))?;
                Ok(entry.insert(model))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Cached models in key order.
    pub fn into_entries(self) -> Vec<TranslatedModel<M>> {
        self.models
            .into_iter()
            .map(|(key, model)| TranslatedModel {
                fingerprint: key.fingerprint(),
                key,
                kind: M::KIND,
                model,
            })
            .collect()
    }
}
