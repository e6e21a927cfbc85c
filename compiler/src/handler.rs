// handler.rs — Object handler protocol
//
// One capability per traversal role (condition, event, impulse, time
// derivative). The traversal in `codegen` is written once against
// `ObjectHandler`; each model kind plugs in its own emission policy.
//
// Preconditions: `current` and `target` come from the component's regime
//                table.
// Postconditions: handlers only append to the buffers they select from the
//                 stream set; the regime table is never touched.
// Failure modes: missing trigger or expression text is a configuration
//                error; a role without a policy is an unsupported-feature
//                error.
// Side effects: none.

use crate::codegen::CodeStream;
use crate::component::{ComponentKind, REGIME_ID_VAR};
use crate::diag::{codes, Result, TranslateError};
use crate::doc::Element;
use crate::id::RegimeId;

/// Emission policy for one traversal role.
pub trait ObjectHandler<S> {
    fn on_object(
        &mut self,
        node: &Element,
        current: RegimeId,
        target: RegimeId,
        streams: &mut S,
    ) -> Result<()>;
}

/// Picks the code buffer a handler writes to out of a stream set.
pub type StreamSelector<S> = fn(&mut S) -> &mut CodeStream;

/// Selector for handlers driven over a bare `CodeStream`.
pub fn whole_stream(stream: &mut CodeStream) -> &mut CodeStream {
    stream
}

// ── Emission helpers ────────────────────────────────────────────────────────

/// Text of `Trigger/MathInline`.
pub fn trigger_text(node: &Element) -> Result<&str> {
    node.child("Trigger")
        .and_then(|t| t.child_text("MathInline"))
        .ok_or_else(|| {
            TranslateError::configuration(
                codes::E0103,
                node.describe(),
                "no trigger condition for transition between regimes",
            )
        })
}

/// `variable = expr;` for every `StateAssignment` child.
pub fn write_state_assignments(node: &Element, stream: &mut CodeStream) -> Result<()> {
    for assignment in node.children("StateAssignment") {
        let variable = assignment.require_attr("variable")?;
        let expr = assignment.require_child("MathInline")?.text();
        stream.write_line(&format!("{} = {};", variable, expr));
    }
    Ok(())
}

/// Record the regime change, or check that a single-regime model stays put.
pub fn write_regime_transition(
    node: &Element,
    stream: &mut CodeStream,
    multiple_regimes: bool,
    current: RegimeId,
    target: RegimeId,
) -> Result<()> {
    if multiple_regimes {
        stream.write_line(&format!("{} = {};", REGIME_ID_VAR, target));
    } else if target != current {
        return Err(TranslateError::configuration(
            codes::E0104,
            node.describe(),
            "transition in single-regime model doesn't target its own regime",
        ));
    }
    Ok(())
}

// ── Shared handlers ─────────────────────────────────────────────────────────

/// `OnCondition` → `if(trigger) { assignments; transition }`.
pub struct ConditionHandler<S> {
    pub select: StreamSelector<S>,
    pub multiple_regimes: bool,
}

impl<S> ConditionHandler<S> {
    pub fn new(select: StreamSelector<S>, multiple_regimes: bool) -> Self {
        ConditionHandler {
            select,
            multiple_regimes,
        }
    }
}

impl<S> ObjectHandler<S> for ConditionHandler<S> {
    fn on_object(
        &mut self,
        node: &Element,
        current: RegimeId,
        target: RegimeId,
        streams: &mut S,
    ) -> Result<()> {
        let trigger = trigger_text(node)?;
        let stream = (self.select)(streams);
        stream.open_block(&format!("if({})", trigger));
        write_state_assignments(node, stream)?;
        write_regime_transition(node, stream, self.multiple_regimes, current, target)?;
        stream.close_block();
        Ok(())
    }
}

/// `TimeDerivative` → forward-Euler step `x += DT * (expr);`.
pub struct TimeDerivativeHandler<S> {
    pub select: StreamSelector<S>,
}

impl<S> TimeDerivativeHandler<S> {
    pub fn new(select: StreamSelector<S>) -> Self {
        TimeDerivativeHandler { select }
    }
}

impl<S> ObjectHandler<S> for TimeDerivativeHandler<S> {
    fn on_object(
        &mut self,
        node: &Element,
        _current: RegimeId,
        _target: RegimeId,
        streams: &mut S,
    ) -> Result<()> {
        let variable = node.require_attr("variable")?;
        let expr = node.require_child("MathInline")?.text();
        (self.select)(streams).write_line(&format!("{} += DT * ({});", variable, expr));
        Ok(())
    }
}

/// Rejects a role the model kind has no translation for.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedHandler {
    pub kind: ComponentKind,
}

impl<S> ObjectHandler<S> for UnsupportedHandler {
    fn on_object(
        &mut self,
        node: &Element,
        _current: RegimeId,
        _target: RegimeId,
        _streams: &mut S,
    ) -> Result<()> {
        Err(TranslateError::unsupported(
            codes::E0301,
            node.describe(),
            format!("{} transitions are not supported in {} models", node.name, self.kind),
        ))
    }
}
