// network.rs — Low-level network driver
//
// Walks an `LL:SpineML` network description, translates every distinct
// component it references (through the model caches) and resolves the fixed
// property values of each population and projection against the translated
// models' parameter and variable orderings.
//
// Preconditions: component URLs are relative to `base`.
// Postconditions: `NetworkPlan` lists populations and projections in
//                 document order and models in key order.
// Failure modes: configuration errors for malformed network nodes;
//                reference errors for unknown populations; unsupported
//                errors for non-fixed delays or unknown connection types.
// Side effects: loads component documents through `ComponentSource`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;

use crate::cache::{ModelCache, ModelKey, TranslateModel, TranslatedModel};
use crate::diag::{codes, Result, TranslateError};
use crate::doc::{Document, Element};
use crate::neuron::NeuronModel;
use crate::observe::TranslationObserver;
use crate::postsynaptic::PostsynapticModel;
use crate::source::ComponentSource;
use crate::values::{ParamValues, PropertyValues, VarValues};
use crate::weight_update::WeightUpdateModel;

/// Neuron URL denoting a built-in spike source rather than a component.
pub const SPIKE_SOURCE_URL: &str = "SpikeSource";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslateOptions {
    /// Simulation timestep in milliseconds.
    pub dt: f64,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions { dt: 0.1 }
    }
}

/// Replace every character that cannot appear in a generated identifier.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn parse_number(text: &str, node: &Element) -> Result<f64> {
    text.trim().parse::<f64>().map_err(|_| {
        TranslateError::configuration(
            codes::E0108,
            node.describe(),
            format!("'{}' is not a number", text),
        )
    })
}

fn parse_size(text: &str, node: &Element) -> Result<u32> {
    text.trim().parse::<u32>().map_err(|_| {
        TranslateError::configuration(
            codes::E0108,
            node.describe(),
            format!("'{}' is not a population size", text),
        )
    })
}

// ── Model properties ────────────────────────────────────────────────────────

/// The model a node refers to and the values fixed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProperties {
    pub key: ModelKey,
    pub fixed: PropertyValues,
}

/// Split a node's `Property` children into fixed values and variable names.
///
/// A property with a `FixedValue` can be baked into the model or initialised
/// directly; any other property must become a model variable.
pub fn read_model_properties(base: &Path, node: &Element) -> Result<ModelProperties> {
    let url = base.join(node.require_attr("url")?);
    let mut fixed = PropertyValues::new();
    let mut variable = BTreeSet::new();
    for property in node.children("Property") {
        let name = property.require_attr("name")?;
        match property.child("FixedValue") {
            Some(value) => {
                let value = parse_number(value.require_attr("value")?, value)?;
                fixed.insert(name.to_string(), value);
            }
            None => {
                variable.insert(name.to_string());
            }
        }
    }
    Ok(ModelProperties {
        key: ModelKey::new(url.to_string_lossy(), variable),
        fixed,
    })
}

/// A translated model bound to one population or projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelBinding {
    pub key: ModelKey,
    pub param_values: Vec<f64>,
    pub var_values: Vec<f64>,
}

fn bind<M>(
    properties: ModelProperties,
    cache: &mut ModelCache<M>,
    source: &dyn ComponentSource,
    observer: &mut dyn TranslationObserver,
) -> Result<ModelBinding>
where
    M: TranslateModel,
{
    let model = cache.get_or_create(&properties.key, source, observer)?;
    let variables = model.variables();
    Ok(ModelBinding {
        param_values: ParamValues::new(&properties.fixed, variables).values(),
        var_values: VarValues::new(&properties.fixed, variables).values(),
        key: properties.key,
    })
}

// ── Connectivity ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityKind {
    OneToOne,
    AllToAll,
    FixedProbability,
    ConnectionList,
}

impl ConnectivityKind {
    /// Checked in this order; the first present connection node wins.
    pub const ALL: [ConnectivityKind; 4] = [
        ConnectivityKind::OneToOne,
        ConnectivityKind::AllToAll,
        ConnectivityKind::FixedProbability,
        ConnectivityKind::ConnectionList,
    ];

    pub fn node_name(self) -> &'static str {
        match self {
            ConnectivityKind::OneToOne => "OneToOneConnection",
            ConnectivityKind::AllToAll => "AllToAllConnection",
            ConnectivityKind::FixedProbability => "FixedProbabilityConnection",
            ConnectivityKind::ConnectionList => "ConnectionList",
        }
    }
}

/// Axonal delay of a connection node in whole timesteps.
pub fn read_delay_steps(node: &Element, dt: f64) -> Result<u32> {
    let delay = node.child("Delay").ok_or_else(|| {
        TranslateError::configuration(codes::E0107, node.describe(), "connector has no 'Delay' node")
    })?;
    let fixed = delay.child("FixedValue").ok_or_else(|| {
        TranslateError::unsupported(
            codes::E0300,
            node.describe(),
            "only projections with a single delay value are supported",
        )
    })?;
    check_timestep(dt)?;
    let value = parse_number(fixed.require_attr("value")?, fixed)?;
    if !value.is_finite() || value < 0.0 {
        return Err(TranslateError::configuration(
            codes::E0108,
            fixed.describe(),
            format!("'{}' is not a valid delay", value),
        ));
    }
    let steps = (value / dt).round();
    if steps > u32::MAX as f64 {
        return Err(TranslateError::configuration(
            codes::E0108,
            fixed.describe(),
            format!("delay of {} ms does not fit in a step count at dt {}", value, dt),
        ));
    }
    Ok(steps as u32)
}

/// The timestep must be a positive, finite number of milliseconds.
pub fn check_timestep(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(TranslateError::configuration(
            codes::E0110,
            "dt",
            format!("timestep {} is not a positive number of milliseconds", dt),
        ))
    }
}

/// Connection type and delay of a synapse.
pub fn read_connectivity(synapse: &Element, dt: f64) -> Result<(ConnectivityKind, u32)> {
    for kind in ConnectivityKind::ALL {
        if let Some(node) = synapse.child(kind.node_name()) {
            return Ok((kind, read_delay_steps(node, dt)?));
        }
    }
    Err(TranslateError::unsupported(
        codes::E0302,
        synapse.describe(),
        "no supported connection type found for projection",
    ))
}

// ── Plan ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PopulationModel {
    SpikeSource,
    Component(ModelBinding),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Population {
    pub name: String,
    pub size: u32,
    pub model: PopulationModel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub name: String,
    pub source: String,
    pub target: String,
    pub connectivity: ConnectivityKind,
    pub delay_steps: u32,
    /// No variable weight-update properties, so one shared weight suffices.
    pub global_g: bool,
    pub weight_update: ModelBinding,
    pub postsynapse: ModelBinding,
}

/// Everything the downstream generator needs to assemble the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkPlan {
    pub name: String,
    pub dt: f64,
    pub populations: Vec<Population>,
    pub projections: Vec<Projection>,
    pub neuron_models: Vec<TranslatedModel<NeuronModel>>,
    pub postsynaptic_models: Vec<TranslatedModel<PostsynapticModel>>,
    pub weight_update_models: Vec<TranslatedModel<WeightUpdateModel>>,
}

impl NetworkPlan {
    pub fn population(&self, name: &str) -> Option<&Population> {
        self.populations.iter().find(|p| p.name == name)
    }
}

// ── Driver ──────────────────────────────────────────────────────────────────

/// Translate a low-level network document.
pub fn translate_network(
    doc: &Document,
    name: &str,
    base: &Path,
    source: &dyn ComponentSource,
    options: &TranslateOptions,
    observer: &mut dyn TranslationObserver,
) -> Result<NetworkPlan> {
    check_timestep(options.dt)?;
    let root = doc.root_named("LL:SpineML").ok_or_else(|| {
        TranslateError::configuration(
            codes::E0100,
            doc.root.name.as_str(),
            "not a low-level SpineML network - it has no root LL:SpineML node",
        )
    })?;

    let mut neuron_models: ModelCache<NeuronModel> = ModelCache::new();
    let mut postsynaptic_models: ModelCache<PostsynapticModel> = ModelCache::new();
    let mut weight_update_models: ModelCache<WeightUpdateModel> = ModelCache::new();

    let mut sizes: BTreeMap<String, u32> = BTreeMap::new();
    let mut populations = Vec::new();
    for population in root.children("LL:Population") {
        let neuron = population.require_child("LL:Neuron")?;
        let pop_name = safe_name(neuron.require_attr("name")?);
        let size = parse_size(neuron.require_attr("size")?, neuron)?;
        observer.on_population(&pop_name, size);
        sizes.insert(pop_name.clone(), size);

        let model = if neuron.require_attr("url")? == SPIKE_SOURCE_URL {
            PopulationModel::SpikeSource
        } else {
            let properties = read_model_properties(base, neuron)?;
            PopulationModel::Component(bind(
                properties,
                &mut neuron_models,
                source,
                observer,
            )?)
        };
        populations.push(Population {
            name: pop_name,
            size,
            model,
        });
    }

    let lookup = |name: &str, node: &Element| -> Result<()> {
        if sizes.contains_key(name) {
            Ok(())
        } else {
            Err(TranslateError::reference(
                codes::E0201,
                node.describe(),
                format!("cannot find neuron population '{}'", name),
            ))
        }
    };

    let mut projections = Vec::new();
    for population in root.children("LL:Population") {
        let neuron = population.require_child("LL:Neuron")?;
        let src = safe_name(neuron.require_attr("name")?);
        lookup(&src, neuron)?;

        for projection in population.children("LL:Projection") {
            let trg = safe_name(projection.require_attr("dst_population")?);
            lookup(&trg, projection)?;
            observer.on_projection(&src, &trg);

            let synapse = projection.require_child("LL:Synapse")?;

            let weight_update = read_model_properties(base, synapse.require_child("LL:WeightUpdate")?)?;
            let global_g = weight_update.key.variable_params.is_empty();
            let weight_update = bind(
                weight_update,
                &mut weight_update_models,
                source,
                observer,
            )?;

            let postsynapse = read_model_properties(base, synapse.require_child("LL:PostSynapse")?)?;
            let postsynapse = bind(
                postsynapse,
                &mut postsynaptic_models,
                source,
                observer,
            )?;

            let (connectivity, delay_steps) = read_connectivity(synapse, options.dt)?;

            projections.push(Projection {
                name: format!("{}_{}", src, trg),
                source: src.clone(),
                target: trg,
                connectivity,
                delay_steps,
                global_g,
                weight_update,
                postsynapse,
            });
        }
    }

    Ok(NetworkPlan {
        name: name.to_string(),
        dt: options.dt,
        populations,
        projections,
        neuron_models: neuron_models.into_entries(),
        postsynaptic_models: postsynaptic_models.into_entries(),
        weight_update_models: weight_update_models.into_entries(),
    })
}
