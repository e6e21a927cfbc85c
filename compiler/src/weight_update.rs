// weight_update.rs — Weight-update model assembler
//
// Translates a `weight_update` component into presynaptic-spike code and
// continuous synapse dynamics. OnEvent transitions run on every presynaptic
// spike and deliver their impulses into the postsynaptic accumulator;
// conditions and time derivatives run every timestep.
//
// Preconditions: the document is a parsed component document.
// Postconditions: both code buffers are token-substituted; analogue receive
//                 ports carry the `_pre` suffix.
// Failure modes: configuration/reference errors from the reader; OnImpulse
//                transitions are unsupported.
// Side effects: none (echoing goes through the observer).

use std::collections::BTreeSet;

use serde::Serialize;

use crate::codegen::{generate_model_code, CodeStream, Handlers, RegimeSink};
use crate::component::{read_automaton, ComponentClass, ComponentKind, ModelVariables};
use crate::diag::Result;
use crate::doc::{Document, Element};
use crate::handler::{
    write_regime_transition, write_state_assignments, ConditionHandler, ObjectHandler,
    TimeDerivativeHandler, UnsupportedHandler,
};
use crate::id::{RegimeId, RegimeTable};
use crate::observe::TranslationObserver;
use crate::subst::{substitute_model_variables, substitute_ports, PortSubstitution};

/// Suffix for analogue receive ports read from the presynaptic neuron.
pub const PRE_SUFFIX: &str = "_pre";

/// A translated weight-update model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightUpdateModel {
    pub name: String,
    #[serde(flatten)]
    pub variables: ModelVariables,
    pub regimes: RegimeTable,
    pub sim_code: String,
    pub synapse_dynamics_code: String,
}

#[derive(Debug, Default)]
struct WeightUpdateStreams {
    sim: CodeStream,
    dynamics: CodeStream,
}

impl RegimeSink for WeightUpdateStreams {
    fn on_regime_end(&mut self, multiple_regimes: bool, current: RegimeId) {
        self.sim.on_regime_end(multiple_regimes, current);
        self.dynamics.on_regime_end(multiple_regimes, current);
    }
}

fn dynamics_stream(streams: &mut WeightUpdateStreams) -> &mut CodeStream {
    &mut streams.dynamics
}

/// OnEvent → assignments, one `$(addToInSyn, port);` per ImpulseOut, then
/// the regime transition.
struct EventHandler {
    multiple_regimes: bool,
}

impl ObjectHandler<WeightUpdateStreams> for EventHandler {
    fn on_object(
        &mut self,
        node: &Element,
        current: RegimeId,
        target: RegimeId,
        streams: &mut WeightUpdateStreams,
    ) -> Result<()> {
        let stream = &mut streams.sim;
        write_state_assignments(node, stream)?;
        for impulse in node.children("ImpulseOut") {
            let port = impulse.require_attr("port")?;
            stream.write_line(&format!("$(addToInSyn, {});", port));
        }
        write_regime_transition(node, stream, self.multiple_regimes, current, target)
    }
}

impl WeightUpdateModel {
    pub fn from_document(
        doc: &Document,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        let component = ComponentClass::from_document(doc, ComponentKind::WeightUpdate)?;
        Self::from_component(&component, variable_params, observer)
    }

    pub fn from_component(
        component: &ComponentClass<'_>,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        let automaton = read_automaton(component, variable_params, observer)?;
        let multiple = automaton.regimes.has_multiple();

        let mut streams = WeightUpdateStreams::default();
        let mut condition = ConditionHandler::new(dynamics_stream, multiple);
        let mut event = EventHandler {
            multiple_regimes: multiple,
        };
        let mut impulse = UnsupportedHandler { kind: component.kind };
        let mut derivative = TimeDerivativeHandler::new(dynamics_stream);
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
        let mut synapse_dynamics_code = streams.dynamics.finish();
        let ports: Vec<PortSubstitution> = component
            .port_names("AnalogReceivePort")?
            .into_iter()
            .map(|port| PortSubstitution::suffixed(port, PRE_SUFFIX))
            .collect();
        {
            let mut codes = [&mut sim_code, &mut synapse_dynamics_code];
            substitute_model_variables(&automaton.variables, &mut codes, observer);
            substitute_ports(&ports, &mut codes, observer);
        }
        observer.on_code("sim_code", &sim_code);
        observer.on_code("synapse_dynamics_code", &synapse_dynamics_code);

        Ok(WeightUpdateModel {
            name: component.name.to_string(),
            variables: automaton.variables,
            regimes: automaton.regimes,
            sim_code,
            synapse_dynamics_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{codes, ErrorKind};
    use crate::observe::NullObserver;

    fn translate(source: &str, variable: &[&str]) -> Result<WeightUpdateModel> {
        let result = crate::parser::parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let doc = result.document.expect("document");
        let set = variable.iter().map(|s| s.to_string()).collect();
        WeightUpdateModel::from_document(&doc, &set, &mut NullObserver)
    }

    const FIXED_WEIGHT: &str = r#"<SpineML>
  <ComponentClass name="FixedWeight" type="weight_update">
    <Dynamics initial_regime="static">
      <Regime name="static">
        <OnEvent target_regime="static" src_port="spike">
          <ImpulseOut port="w"/>
        </OnEvent>
      </Regime>
    </Dynamics>
    <EventReceivePort name="spike"/>
    <ImpulseSendPort name="w"/>
    <Parameter name="w"/>
  </ComponentClass>
</SpineML>"#;

    #[test]
    fn fixed_weight_delivers_impulse() {
        let model = translate(FIXED_WEIGHT, &[]).unwrap();
        assert_eq!(model.sim_code, "$(addToInSyn, $(w));\n");
        assert!(model.synapse_dynamics_code.is_empty());
        assert_eq!(model.variables.param_names, vec!["w"]);
        assert!(model.variables.vars.is_empty());
    }

    #[test]
    fn variable_weight_becomes_var() {
        let model = translate(FIXED_WEIGHT, &["w"]).unwrap();
        assert!(model.variables.param_names.is_empty());
        assert_eq!(model.variables.var_names().collect::<Vec<_>>(), vec!["w"]);
        assert_eq!(model.sim_code, "$(addToInSyn, $(w));\n");
    }

    const TRACE: &str = r#"<SpineML>
  <ComponentClass name="Trace" type="weight_update">
    <Dynamics initial_regime="idle">
      <Regime name="idle">
        <OnEvent target_regime="primed" src_port="spike">
          <StateAssignment variable="trace"><MathInline>trace + 1</MathInline></StateAssignment>
          <ImpulseOut port="g"/>
        </OnEvent>
      </Regime>
      <Regime name="primed">
        <OnCondition target_regime="idle">
          <Trigger><MathInline>trace &lt; V_m</MathInline></Trigger>
        </OnCondition>
        <TimeDerivative variable="trace"><MathInline>-trace / tau</MathInline></TimeDerivative>
      </Regime>
      <StateVariable name="trace"/>
    </Dynamics>
    <AnalogReceivePort name="V_m"/>
    <Parameter name="g"/>
    <Parameter name="tau"/>
  </ComponentClass>
</SpineML>"#;

    #[test]
    fn events_and_dynamics_split_by_regime() {
        let model = translate(TRACE, &[]).unwrap();
        assert_eq!(
            model.sim_code,
            "if($(_regimeID) == 0) {\n    $(trace) = $(trace) + 1;\n    $(addToInSyn, $(g));\n    $(_regimeID) = 1;\n}\n"
        );
        assert_eq!(
            model.synapse_dynamics_code,
            "if($(_regimeID) == 1) {\n    if($(trace) < $(V_m_pre)) {\n        $(_regimeID) = 0;\n    }\n    $(trace) += DT * (-$(trace) / $(tau));\n}\n"
        );
    }

    #[test]
    fn impulse_transition_unsupported() {
        let source = FIXED_WEIGHT.replace(
            "</OnEvent>",
            r#"</OnEvent><OnImpulse target_regime="static" src_port="x"/>"#,
        );
        let err = translate(&source, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(err.code(), codes::E0301);
    }
}
