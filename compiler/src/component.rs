// component.rs — Hybrid-automaton reader
//
// Validates a `ComponentClass` node and derives the two facts every
// downstream assembler shares: the regime-ID table and the classification of
// declared parameters into free parameters and model variables.
//
// Preconditions: the document has been parsed without errors.
// Postconditions: `Automaton.regimes` is the single regime table for the
//                 component; every transition target in the component
//                 resolves against it.
// Failure modes: configuration errors for wrong-kind or malformed components;
//                reference errors for unknown transition targets.
// Side effects: none (echoing goes through the observer).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diag::{codes, Result, TranslateError};
use crate::doc::{Document, Element};
use crate::id::RegimeTable;
use crate::observe::TranslationObserver;

/// Name of the synthetic variable holding the active regime.
pub const REGIME_ID_VAR: &str = "_regimeID";

/// Scalar type of ordinary model variables.
pub const SCALAR: &str = "scalar";

/// Type of the synthetic regime variable.
pub const UNSIGNED_INT: &str = "unsigned int";

/// Transition node names, in traversal order.
pub const TRANSITION_NODES: [&str; 3] = ["OnCondition", "OnEvent", "OnImpulse"];

// ── Component kind ──────────────────────────────────────────────────────────

/// The three model kinds a `ComponentClass@type` may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    NeuronBody,
    Postsynaptic,
    WeightUpdate,
}

impl ComponentKind {
    /// The `type` attribute value.
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::NeuronBody => "neuron_body",
            ComponentKind::Postsynaptic => "postsynaptic",
            ComponentKind::WeightUpdate => "weight_update",
        }
    }

    pub fn from_type_attr(value: &str) -> Option<Self> {
        match value {
            "neuron_body" => Some(ComponentKind::NeuronBody),
            "postsynaptic" => Some(ComponentKind::Postsynaptic),
            "weight_update" => Some(ComponentKind::WeightUpdate),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Validated component view ────────────────────────────────────────────────

/// A `ComponentClass` node known to be of the expected kind and to carry a
/// `Dynamics` block.
#[derive(Debug, Clone, Copy)]
pub struct ComponentClass<'d> {
    pub node: &'d Element,
    pub dynamics: &'d Element,
    pub kind: ComponentKind,
    pub name: &'d str,
}

impl<'d> ComponentClass<'d> {
    /// Locate the component inside a `SpineML` component document.
    pub fn from_document(doc: &'d Document, expected: ComponentKind) -> Result<Self> {
        let root = doc.root_named("SpineML").ok_or_else(|| {
            TranslateError::configuration(
                codes::E0100,
                doc.root.name.as_str(),
                "not a SpineML component - it has no root SpineML node",
            )
        })?;
        let node = root.child("ComponentClass").ok_or_else(|| {
            TranslateError::configuration(
                codes::E0101,
                "SpineML",
                format!("not a SpineML {} component - it has no ComponentClass node", expected),
            )
        })?;
        Self::from_node(node, expected)
    }

    /// Validate a `ComponentClass` node directly.
    pub fn from_node(node: &'d Element, expected: ComponentKind) -> Result<Self> {
        if node.name != "ComponentClass" {
            return Err(TranslateError::configuration(
                codes::E0101,
                node.describe(),
                "expected a ComponentClass node",
            ));
        }
        let name = node.attr("name").unwrap_or("");
        let context = || format!("ComponentClass[@name='{}']", name);

        let declared = node.attr("type").unwrap_or("");
        if ComponentKind::from_type_attr(declared) != Some(expected) {
            return Err(TranslateError::configuration(
                codes::E0101,
                context(),
                format!(
                    "not a SpineML {} component - its type is '{}'",
                    expected, declared
                ),
            ));
        }

        let dynamics = node.child("Dynamics").ok_or_else(|| {
            TranslateError::configuration(codes::E0102, context(), "component has no Dynamics node")
        })?;

        Ok(ComponentClass {
            node,
            dynamics,
            kind: expected,
            name,
        })
    }

    pub fn regimes(&self) -> impl Iterator<Item = &'d Element> {
        self.dynamics.children("Regime")
    }

    pub fn parameter_names(&self) -> Result<Vec<&'d str>> {
        self.node
            .children("Parameter")
            .map(|p| p.require_attr("name"))
            .collect()
    }

    pub fn state_variable_names(&self) -> Result<Vec<&'d str>> {
        self.dynamics
            .children("StateVariable")
            .map(|s| s.require_attr("name"))
            .collect()
    }

    /// Names of ports of the given node type (`AnalogReceivePort`, ...).
    pub fn port_names(&self, port_node: &'static str) -> Result<Vec<&'d str>> {
        self.node
            .children(port_node)
            .map(|p| p.require_attr("name"))
            .collect()
    }
}

// ── Classification ──────────────────────────────────────────────────────────

/// A generated model variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub ty: String,
}

/// Free parameters and variables of a translated model, in the order the
/// downstream code generator and the value resolvers rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelVariables {
    pub param_names: Vec<String>,
    pub vars: Vec<Variable>,
    pub multiple_regimes: bool,
}

impl ModelVariables {
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|v| v.name.as_str())
    }
}

/// Partition declared parameters into free parameters and variables.
///
/// Variables are the externally variable names plus every state variable,
/// in ascending lexical order, followed by `_regimeID` when the component has
/// more than one regime. Free parameters are the remaining `Parameter`
/// declarations in document order.
pub fn classify(
    component: &ComponentClass<'_>,
    variable_params: &BTreeSet<String>,
    multiple_regimes: bool,
) -> Result<ModelVariables> {
    let mut variables: BTreeSet<String> = variable_params.clone();
    variables.extend(
        component
            .state_variable_names()?
            .into_iter()
            .map(str::to_string),
    );

    let mut param_names: Vec<String> = Vec::new();
    for name in component.parameter_names()? {
        if !variables.contains(name) && !param_names.iter().any(|p| p == name) {
            param_names.push(name.to_string());
        }
    }

    let mut vars: Vec<Variable> = variables
        .into_iter()
        .map(|name| Variable {
            name,
            ty: SCALAR.to_string(),
        })
        .collect();
    if multiple_regimes {
        vars.push(Variable {
            name: REGIME_ID_VAR.to_string(),
            ty: UNSIGNED_INT.to_string(),
        });
    }

    Ok(ModelVariables {
        param_names,
        vars,
        multiple_regimes,
    })
}

// ── Reader ──────────────────────────────────────────────────────────────────

/// Everything the reader derives from a component.
#[derive(Debug, Clone)]
pub struct Automaton {
    pub regimes: RegimeTable,
    pub variables: ModelVariables,
}

/// Build the regime table and variable classification for a component.
///
/// Regime names must be unique, and every transition target is resolved
/// here, so an unknown target aborts translation before any handler runs.
pub fn read_automaton(
    component: &ComponentClass<'_>,
    variable_params: &BTreeSet<String>,
    observer: &mut dyn TranslationObserver,
) -> Result<Automaton> {
    observer.on_model(component.kind, component.name);

    let mut regimes = RegimeTable::new();
    for regime in component.regimes() {
        let name = regime.require_attr("name")?;
        let id = regimes.insert(name, &regime.describe())?;
        observer.on_regime(name, id);
    }

    for regime in component.regimes() {
        for node_name in TRANSITION_NODES {
            for transition in regime.children(node_name) {
                let target = transition.require_attr("target_regime")?;
                regimes.resolve(target, &transition.describe())?;
            }
        }
    }

    let variables = classify(component, variable_params, regimes.has_multiple())?;
    Ok(Automaton { regimes, variables })
}
