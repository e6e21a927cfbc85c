// neuron.rs — Neuron-body model assembler
//
// Translates a `neuron_body` component into simulation code plus a threshold
// condition. Conditions that emit on the `spike` port contribute one
// disjunct each to the threshold, guarded by their source regime.
//
// Preconditions: the document is a parsed component document.
// Postconditions: both code buffers are token-substituted; analogue receive
//                 ports are bound to the synaptic input `Isyn`.
// Failure modes: configuration/reference errors from the reader; OnEvent and
//                OnImpulse transitions and more than one analogue receive
//                port are unsupported.
// Side effects: none (echoing goes through the observer).

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::codegen::{generate_model_code, CodeStream, Handlers, RegimeSink};
use crate::component::{read_automaton, ComponentClass, ComponentKind, ModelVariables, REGIME_ID_VAR};
use crate::diag::{codes, Result, TranslateError};
use crate::doc::{Document, Element};
use crate::handler::{
    trigger_text, ConditionHandler, ObjectHandler, TimeDerivativeHandler, UnsupportedHandler,
};
use crate::id::{RegimeId, RegimeTable};
use crate::observe::TranslationObserver;
use crate::subst::{substitute_model_variables, substitute_ports, PortSubstitution};

/// Name analogue receive ports are bound to.
pub const SYNAPTIC_INPUT: &str = "Isyn";

/// Event port whose emission marks a spike.
pub const SPIKE_PORT: &str = "spike";

/// A translated neuron-body model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeuronModel {
    pub name: String,
    #[serde(flatten)]
    pub variables: ModelVariables,
    pub regimes: RegimeTable,
    pub sim_code: String,
    pub threshold_condition_code: String,
}

#[derive(Debug, Default)]
struct NeuronStreams {
    sim: CodeStream,
    threshold: String,
}

impl RegimeSink for NeuronStreams {
    fn on_regime_end(&mut self, multiple_regimes: bool, current: RegimeId) {
        self.sim.on_regime_end(multiple_regimes, current);
    }
}

fn sim_stream(streams: &mut NeuronStreams) -> &mut CodeStream {
    &mut streams.sim
}

/// Condition handler that also ORs spiking triggers into the threshold.
struct SpikingConditionHandler {
    inner: ConditionHandler<NeuronStreams>,
    multiple_regimes: bool,
}

impl ObjectHandler<NeuronStreams> for SpikingConditionHandler {
    fn on_object(
        &mut self,
        node: &Element,
        current: RegimeId,
        target: RegimeId,
        streams: &mut NeuronStreams,
    ) -> Result<()> {
        self.inner.on_object(node, current, target, streams)?;

        if node.has_child_with_attr("EventOut", "port", SPIKE_PORT) {
            let trigger = trigger_text(node)?;
            let threshold = &mut streams.threshold;
            if !threshold.is_empty() {
                threshold.push_str(" || ");
            }
            if self.multiple_regimes {
                let _ = write!(threshold, "({} == {} && ({}))", REGIME_ID_VAR, current, trigger);
            } else {
                let _ = write!(threshold, "({})", trigger);
            }
        }
        Ok(())
    }
}

impl NeuronModel {
    pub fn from_document(
        doc: &Document,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        let component = ComponentClass::from_document(doc, ComponentKind::NeuronBody)?;
        Self::from_component(&component, variable_params, observer)
    }

    pub fn from_component(
        component: &ComponentClass<'_>,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        let automaton = read_automaton(component, variable_params, observer)?;
        let multiple = automaton.regimes.has_multiple();

        let inputs = component.port_names("AnalogReceivePort")?;
        if inputs.len() > 1 {
            return Err(TranslateError::unsupported(
                codes::E0303,
                component.node.describe(),
                format!(
                    "neuron bodies take a single synaptic input, found analogue receive ports {}",
                    inputs.join(", ")
                ),
            ));
        }

        let mut streams = NeuronStreams::default();
        let mut condition = SpikingConditionHandler {
            inner: ConditionHandler::new(sim_stream, multiple),
            multiple_regimes: multiple,
        };
        let mut event = UnsupportedHandler { kind: component.kind };
        let mut impulse = UnsupportedHandler { kind: component.kind };
        let mut derivative = TimeDerivativeHandler::new(sim_stream);
        generate_model_code(
            component,
            &automaton.regimes,
            Handlers {
                condition: &mut condition,
                event: &mut event,
                impulse: &mut impulse,
                time_derivative: &mut derivative,
            },
            &mut streams,
        )?;

        let mut sim_code = streams.sim.finish();
        let mut threshold_condition_code = streams.threshold;
        let ports: Vec<PortSubstitution> = inputs
            .into_iter()
            .map(|port| PortSubstitution::renamed(port, SYNAPTIC_INPUT))
            .collect();
        {
            let mut codes = [&mut sim_code, &mut threshold_condition_code];
            substitute_model_variables(&automaton.variables, &mut codes, observer);
            substitute_ports(&ports, &mut codes, observer);
        }
        observer.on_code("sim_code", &sim_code);
        observer.on_code("threshold_condition_code", &threshold_condition_code);

        Ok(NeuronModel {
            name: component.name.to_string(),
            variables: automaton.variables,
            regimes: automaton.regimes,
            sim_code,
            threshold_condition_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{codes, ErrorKind};
    use crate::observe::NullObserver;

    fn translate(source: &str, variable: &[&str]) -> Result<NeuronModel> {
        let result = crate::parser::parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let doc = result.document.expect("document");
        let set = variable.iter().map(|s| s.to_string()).collect();
        NeuronModel::from_document(&doc, &set, &mut NullObserver)
    }

    const IZHIKEVICH: &str = r#"<SpineML>
  <ComponentClass name="Izhikevich" type="neuron_body">
    <Dynamics initial_regime="integrating">
      <Regime name="integrating">
        <TimeDerivative variable="U"><MathInline>a*(b*V - U)</MathInline></TimeDerivative>
        <TimeDerivative variable="V"><MathInline>0.04*V*V + 5*V + 140 - U + I</MathInline></TimeDerivative>
        <OnCondition target_regime="integrating">
          <StateAssignment variable="V"><MathInline>c</MathInline></StateAssignment>
          <StateAssignment variable="U"><MathInline>U + d</MathInline></StateAssignment>
          <Trigger><MathInline>V &gt; 30</MathInline></Trigger>
          <EventOut port="spike"/>
        </OnCondition>
      </Regime>
      <StateVariable name="V"/>
      <StateVariable name="U"/>
    </Dynamics>
    <AnalogReceivePort name="I"/>
    <EventSendPort name="spike"/>
    <Parameter name="a"/>
    <Parameter name="b"/>
    <Parameter name="c"/>
    <Parameter name="d"/>
  </ComponentClass>
</SpineML>"#;

    #[test]
    fn single_regime_izhikevich() {
        let model = translate(IZHIKEVICH, &[]).unwrap();
        assert_eq!(model.name, "Izhikevich");
        assert_eq!(model.variables.param_names, vec!["a", "b", "c", "d"]);
        assert_eq!(model.variables.var_names().collect::<Vec<_>>(), vec!["U", "V"]);
        assert!(!model.variables.multiple_regimes);
        assert_eq!(
            model.sim_code,
            "if($(V) > 30) {\n    $(V) = $(c);\n    $(U) = $(U) + $(d);\n}\n\
             $(U) += DT * ($(a)*($(b)*$(V) - $(U)));\n\
             $(V) += DT * (0.04*$(V)*$(V) + 5*$(V) + 140 - $(U) + $(Isyn));\n"
        );
        assert_eq!(model.threshold_condition_code, "($(V) > 30)");
    }

    #[test]
    fn variable_param_moves_out_of_params() {
        let model = translate(IZHIKEVICH, &["d"]).unwrap();
        assert_eq!(model.variables.param_names, vec!["a", "b", "c"]);
        assert_eq!(model.variables.var_names().collect::<Vec<_>>(), vec!["U", "V", "d"]);
    }

    #[test]
    fn no_spike_port_means_empty_threshold() {
        let source = IZHIKEVICH.replace(r#"<EventOut port="spike"/>"#, r#"<EventOut port="burst"/>"#);
        let model = translate(&source, &[]).unwrap();
        assert!(model.threshold_condition_code.is_empty());
    }

    #[test]
    fn event_transition_unsupported() {
        let source = IZHIKEVICH.replace(
            "<TimeDerivative variable=\"U\">",
            "<OnEvent target_regime=\"integrating\" src_port=\"x\"/><TimeDerivative variable=\"U\">",
        );
        let err = translate(&source, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(err.code(), codes::E0301);
    }

    #[test]
    fn two_analogue_inputs_unsupported() {
        let source = IZHIKEVICH
            .replace("+ I</MathInline>", "+ I_exc - I_inh</MathInline>")
            .replace(
                r#"<AnalogReceivePort name="I"/>"#,
                r#"<AnalogReceivePort name="I_exc"/><AnalogReceivePort name="I_inh"/>"#,
            );
        let err = translate(&source, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(err.code(), codes::E0303);
        assert!(format!("{err}").contains("I_exc, I_inh"));
    }

    #[test]
    fn wrong_kind_rejected() {
        let source = IZHIKEVICH.replace("neuron_body", "postsynaptic");
        let err = translate(&source, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
