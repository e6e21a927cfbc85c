// subst.rs — Placeholder token substitution
//
// Rewrites bare identifiers in generated code into the `$(name)` form the
// downstream code generator binds. Matching is boundary-constrained: an
// occurrence is rewritten only when neither neighbour is an identifier
// character, and never when it already sits directly inside `$(`.
//
// Preconditions: names are identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
// Postconditions: substitution for a given name is idempotent.
// Failure modes: none.
// Side effects: none (echoing goes through the observer).

use crate::component::ModelVariables;
use crate::observe::TranslationObserver;

const TOKEN_OPEN: &str = "$(";
const TOKEN_CLOSE: &str = ")";

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Render `name` as a placeholder token.
pub fn token(name: &str) -> String {
    format!("{}{}{}", TOKEN_OPEN, name, TOKEN_CLOSE)
}

/// Wrap every standalone occurrence of `name` as `$(replacement)`.
pub fn wrap_and_replace_variable_names(code: &mut String, name: &str, replacement: &str) {
    if name.is_empty() || !code.contains(name) {
        return;
    }

    let mut out = String::with_capacity(code.len() + 8);
    let mut last = 0;
    for (start, matched) in code.match_indices(name) {
        let end = start + matched.len();
        let before = &code[..start];
        let left_bounded = before.chars().next_back().map_or(true, |c| !is_ident_char(c));
        let right_bounded = code[end..].chars().next().map_or(true, |c| !is_ident_char(c));
        if left_bounded && right_bounded && !before.ends_with(TOKEN_OPEN) {
            out.push_str(&code[last..start]);
            out.push_str(&token(replacement));
            last = end;
        }
    }
    out.push_str(&code[last..]);
    *code = out;
}

/// Wrap every standalone occurrence of `name` under its own name.
pub fn wrap_variable_names(code: &mut String, name: &str) {
    wrap_and_replace_variable_names(code, name, name);
}

// ── Port references ─────────────────────────────────────────────────────────

/// How one receive port is referenced in generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSubstitution {
    pub port: String,
    pub target: String,
}

impl PortSubstitution {
    /// `port` becomes `$(port<suffix>)`, e.g. `V` → `$(V_pre)`.
    pub fn suffixed(port: &str, suffix: &str) -> Self {
        PortSubstitution {
            port: port.to_string(),
            target: format!("{}{}", port, suffix),
        }
    }

    /// `port` becomes `$(target)`, e.g. `I` → `$(Isyn)`.
    pub fn renamed(port: &str, target: &str) -> Self {
        PortSubstitution {
            port: port.to_string(),
            target: target.to_string(),
        }
    }
}

// ── Buffer-wide passes ──────────────────────────────────────────────────────

/// Wrap every free parameter and every variable in each buffer.
pub fn substitute_model_variables(
    variables: &ModelVariables,
    codes: &mut [&mut String],
    observer: &mut dyn TranslationObserver,
) {
    for name in &variables.param_names {
        observer.on_parameter(name);
        for code in codes.iter_mut() {
            wrap_variable_names(code, name);
        }
    }
    for var in &variables.vars {
        observer.on_variable(&var.name, &var.ty);
        for code in codes.iter_mut() {
            wrap_variable_names(code, &var.name);
        }
    }
}

/// Rewrite receive-port references in each buffer.
pub fn substitute_ports(
    ports: &[PortSubstitution],
    codes: &mut [&mut String],
    observer: &mut dyn TranslationObserver,
) {
    for sub in ports {
        observer.on_port(&sub.port, &sub.target);
        for code in codes.iter_mut() {
            wrap_and_replace_variable_names(code, &sub.port, &sub.target);
        }
    }
}
