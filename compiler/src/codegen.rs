// codegen.rs — Regime-driven traversal and code assembly
//
// Walks a component's regimes in document order, dispatching every
// transition and time derivative to a per-role handler, and assembles the
// emitted statements into regime-guarded code.
//
// Preconditions: `regimes` is the table built by `component::read_automaton`
//                for the same component.
// Postconditions: each non-empty regime contributes exactly one block; empty
//                 regimes contribute nothing. Output depends only on the
//                 document, never on hash order.
// Failure modes: handler errors abort traversal; unknown transition targets
//                produce reference errors.
// Side effects: none.

use std::fmt::Write as _;

use crate::component::{ComponentClass, REGIME_ID_VAR};
use crate::diag::Result;
use crate::handler::ObjectHandler;
use crate::id::{RegimeId, RegimeTable};

const INDENT: &str = "    ";

// ── Code stream ─────────────────────────────────────────────────────────────

/// Assembles one code buffer regime by regime.
///
/// Handlers append to a scratch buffer for the current regime; at each regime
/// boundary the scratch buffer is folded into the finished output, wrapped in
/// an `if(_regimeID == N)` guard (chained with `else`) when the component has
/// more than one regime.
#[derive(Debug, Clone, Default)]
pub struct CodeStream {
    out: String,
    scratch: String,
    depth: usize,
    emitted_guard: bool,
}

impl CodeStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one statement to the current regime.
    pub fn write_line(&mut self, line: &str) {
        for _ in 0..self.depth {
            self.scratch.push_str(INDENT);
        }
        let _ = writeln!(self.scratch, "{}", line);
    }

    /// Open a `header {` block inside the current regime.
    pub fn open_block(&mut self, header: &str) {
        self.write_line(&format!("{} {{", header));
        self.depth += 1;
    }

    pub fn close_block(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.write_line("}");
    }

    pub fn regime_is_empty(&self) -> bool {
        self.scratch.is_empty()
    }

    /// Fold the current regime's statements into the output.
    pub fn on_regime_end(&mut self, multiple_regimes: bool, current: RegimeId) {
        if self.regime_is_empty() {
            return;
        }
        let scratch = std::mem::take(&mut self.scratch);
        self.depth = 0;

        if !multiple_regimes {
            self.out.push_str(&scratch);
            return;
        }

        if self.emitted_guard {
            self.out.push_str("else ");
        }
        self.emitted_guard = true;
        let _ = writeln!(self.out, "if({} == {}) {{", REGIME_ID_VAR, current);
        for line in scratch.lines() {
            let _ = writeln!(self.out, "{}{}", INDENT, line);
        }
        self.out.push_str("}\n");
    }

    /// Finished output. Statements of an unterminated regime are dropped.
    pub fn finish(self) -> String {
        self.out
    }
}

// ── Traversal ───────────────────────────────────────────────────────────────

/// A set of code buffers notified at every regime boundary.
pub trait RegimeSink {
    fn on_regime_end(&mut self, multiple_regimes: bool, current: RegimeId);
}

impl RegimeSink for CodeStream {
    fn on_regime_end(&mut self, multiple_regimes: bool, current: RegimeId) {
        CodeStream::on_regime_end(self, multiple_regimes, current);
    }
}

/// One handler per role. The same handler value may not fill two roles, so
/// kinds that reject a role pass a separate `UnsupportedHandler` for each.
pub struct Handlers<'h, S> {
    pub condition: &'h mut dyn ObjectHandler<S>,
    pub event: &'h mut dyn ObjectHandler<S>,
    pub impulse: &'h mut dyn ObjectHandler<S>,
    pub time_derivative: &'h mut dyn ObjectHandler<S>,
}

/// Drive every handler over the component and return whether it has more
/// than one regime.
pub fn generate_model_code<S: RegimeSink>(
    component: &ComponentClass<'_>,
    regimes: &RegimeTable,
    handlers: Handlers<'_, S>,
    streams: &mut S,
) -> Result<bool> {
    let multiple = regimes.has_multiple();

    for regime in component.regimes() {
        let name = regime.require_attr("name")?;
        let current = regimes.resolve(name, &regime.describe())?;

        for condition in regime.children("OnCondition") {
            let target = resolve_target(regimes, condition)?;
            handlers.condition.on_object(condition, current, target, streams)?;
        }
        for event in regime.children("OnEvent") {
            let target = resolve_target(regimes, event)?;
            handlers.event.on_object(event, current, target, streams)?;
        }
        for impulse in regime.children("OnImpulse") {
            let target = resolve_target(regimes, impulse)?;
            handlers.impulse.on_object(impulse, current, target, streams)?;
        }
        for derivative in regime.children("TimeDerivative") {
            handlers
                .time_derivative
                .on_object(derivative, current, current, streams)?;
        }

        streams.on_regime_end(multiple, current);
    }

    Ok(multiple)
}

fn resolve_target(regimes: &RegimeTable, node: &crate::doc::Element) -> Result<RegimeId> {
    let target = node.require_attr("target_regime")?;
    regimes.resolve(target, &node.describe())
}
