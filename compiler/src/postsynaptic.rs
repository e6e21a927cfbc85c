// postsynaptic.rs — Postsynaptic model assembler
//
// Translates a `postsynaptic` component into decay code and input-apply
// code. Impulses arrive through the accumulated synaptic input `inSyn`:
// every OnImpulse becomes a block that fires while `inSyn` is non-zero and
// consumes it.
//
// Preconditions: the document is a parsed component document.
// Postconditions: both code buffers are token-substituted; impulse receive
//                 ports are bound to `inSyn`, analogue receive ports carry the
//                 `_post` suffix.
// Failure modes: configuration/reference errors from the reader; OnEvent
//                transitions are unsupported.
// Side effects: none (echoing goes through the observer).

use std::collections::BTreeSet;

use serde::Serialize;

use crate::codegen::{generate_model_code, CodeStream, Handlers};
use crate::component::{read_automaton, ComponentClass, ComponentKind, ModelVariables};
use crate::diag::Result;
use crate::doc::{Document, Element};
use crate::handler::{
    whole_stream, write_regime_transition, write_state_assignments, ConditionHandler,
    ObjectHandler, TimeDerivativeHandler, UnsupportedHandler,
};
use crate::id::{RegimeId, RegimeTable};
use crate::neuron::SYNAPTIC_INPUT;
use crate::observe::TranslationObserver;
use crate::subst::{substitute_model_variables, substitute_ports, token, PortSubstitution};

/// Accumulated weighted input delivered by the incoming projection.
pub const ACCUMULATED_INPUT: &str = "inSyn";

/// Suffix for analogue receive ports read from the postsynaptic neuron.
pub const POST_SUFFIX: &str = "_post";

/// A translated postsynaptic model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostsynapticModel {
    pub name: String,
    #[serde(flatten)]
    pub variables: ModelVariables,
    pub regimes: RegimeTable,
    pub decay_code: String,
    pub apply_input_code: String,
}

struct ImpulseHandler {
    multiple_regimes: bool,
}

impl ObjectHandler<CodeStream> for ImpulseHandler {
    fn on_object(
        &mut self,
        node: &Element,
        current: RegimeId,
        target: RegimeId,
        stream: &mut CodeStream,
    ) -> Result<()> {
        let input = token(ACCUMULATED_INPUT);
        stream.open_block(&format!("if({} != 0)", input));
        write_state_assignments(node, stream)?;
        write_regime_transition(node, stream, self.multiple_regimes, current, target)?;
        stream.write_line(&format!("{} = 0;", input));
        stream.close_block();
        Ok(())
    }
}

impl PostsynapticModel {
    pub fn from_document(
        doc: &Document,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        let component = ComponentClass::from_document(doc, ComponentKind::Postsynaptic)?;
        Self::from_component(&component, variable_params, observer)
    }

    pub fn from_component(
        component: &ComponentClass<'_>,
        variable_params: &BTreeSet<String>,
        observer: &mut dyn TranslationObserver,
    ) -> Result<Self> {
        let automaton = read_automaton(component, variable_params, observer)?;
        let multiple = automaton.regimes.has_multiple();

        let mut stream = CodeStream::new();
        let mut condition = ConditionHandler::new(whole_stream, multiple);
        let mut event = UnsupportedHandler { kind: component.kind };
        let mut impulse = ImpulseHandler {
            multiple_regimes: multiple,
        };
        let mut derivative = TimeDerivativeHandler::new(whole_stream);
        generate_model_code(
            component,
            &automaton.regimes,
            Handlers {
                condition: &mut condition,
                event: &mut event,
                impulse: &mut impulse,
                time_derivative: &mut derivative,
            },
            &mut stream,
        )?;

        let mut decay_code = stream.finish();
        let mut apply_input_code = match component.port_names("AnalogSendPort")?.first() {
            Some(send) => format!("{} += {};", token(SYNAPTIC_INPUT), send),
            None => String::new(),
        };

        let mut ports: Vec<PortSubstitution> = component
            .port_names("ImpulseReceivePort")?
            .into_iter()
            .map(|port| PortSubstitution::renamed(port, ACCUMULATED_INPUT))
            .collect();
        ports.extend(
            component
                .port_names("AnalogReceivePort")?
                .into_iter()
                .map(|port| PortSubstitution::suffixed(port, POST_SUFFIX)),
        );
        {
            let mut codes = [&mut decay_code, &mut apply_input_code];
            substitute_model_variables(&automaton.variables, &mut codes, observer);
            substitute_ports(&ports, &mut codes, observer);
        }
        observer.on_code("decay_code", &decay_code);
        observer.on_code("apply_input_code", &apply_input_code);

        Ok(PostsynapticModel {
            name: component.name.to_string(),
            variables: automaton.variables,
            regimes: automaton.regimes,
            decay_code,
            apply_input_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::ErrorKind;
    use crate::observe::{NullObserver, RecordingObserver};

    fn document(source: &str) -> Document {
        let result = crate::parser::parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        result.document.expect("document")
    }

    const EXP_SYN: &str = r#"<SpineML>
  <ComponentClass name="ExpSyn" type="postsynaptic">
    <Dynamics initial_regime="decaying">
      <Regime name="decaying">
        <OnImpulse target_regime="decaying" src_port="w">
          <StateAssignment variable="I"><MathInline>I + w</MathInline></StateAssignment>
        </OnImpulse>
        <TimeDerivative variable="I"><MathInline>-I / tau</MathInline></TimeDerivative>
      </Regime>
      <StateVariable name="I"/>
    </Dynamics>
    <ImpulseReceivePort name="w"/>
    <AnalogSendPort name="I"/>
    <Parameter name="tau"/>
  </ComponentClass>
</SpineML>"#;

    #[test]
    fn exponential_synapse() {
        let doc = document(EXP_SYN);
        let model = PostsynapticModel::from_document(&doc, &BTreeSet::new(), &mut NullObserver)
            .unwrap();
        assert_eq!(
            model.decay_code,
            "if($(inSyn) != 0) {\n    $(I) = $(I) + $(inSyn);\n    $(inSyn) = 0;\n}\n\
             $(I) += DT * (-$(I) / $(tau));\n"
        );
        assert_eq!(model.apply_input_code, "$(Isyn) += $(I);");
    }

    #[test]
    fn no_send_port_means_no_apply_input() {
        let doc = document(&EXP_SYN.replace(r#"<AnalogSendPort name="I"/>"#, ""));
        let model = PostsynapticModel::from_document(&doc, &BTreeSet::new(), &mut NullObserver)
            .unwrap();
        assert!(model.apply_input_code.is_empty());
    }

    #[test]
    fn analog_receive_port_gets_post_suffix() {
        let source = EXP_SYN
            .replace("-I / tau", "-I / tau + 0 * V")
            .replace(r#"<Parameter name="tau"/>"#, r#"<Parameter name="tau"/><AnalogReceivePort name="V"/>"#);
        let doc = document(&source);
        let mut observer = RecordingObserver::default();
        let model = PostsynapticModel::from_document(&doc, &BTreeSet::new(), &mut observer).unwrap();
        assert!(model.decay_code.contains("0 * $(V_post)"));
        assert!(observer.lines.contains(&"port w -> inSyn".to_string()));
        assert!(observer.lines.contains(&"port V -> V_post".to_string()));
    }

    #[test]
    fn event_transition_unsupported() {
        let source = EXP_SYN.replace(
            "<TimeDerivative",
            r#"<OnEvent target_regime="decaying" src_port="s"/><TimeDerivative"#,
        );
        let doc = document(&source);
        let err = PostsynapticModel::from_document(&doc, &BTreeSet::new(), &mut NullObserver)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
