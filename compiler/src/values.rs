// values.rs — Positional value resolution
//
// Maps sparse name → value tables (typically the fixed properties of a
// network population or projection) onto the dense parameter and variable
// orderings of a translated model.

use std::collections::BTreeMap;

use crate::component::ModelVariables;

/// Sparse name → literal value table.
pub type PropertyValues = BTreeMap<String, f64>;

/// One value per name, in `names` order. Absent names resolve to `0.0`;
/// entries of `sparse` not in `names` are ignored.
pub fn resolve<'n, I>(names: I, sparse: &PropertyValues) -> Vec<f64>
where
    I: IntoIterator<Item = &'n str>,
{
    names
        .into_iter()
        .map(|name| sparse.get(name).copied().unwrap_or(0.0))
        .collect()
}

/// Free-parameter values for one model instantiation.
#[derive(Debug, Clone, Copy)]
pub struct ParamValues<'a> {
    values: &'a PropertyValues,
    model: &'a ModelVariables,
}

impl<'a> ParamValues<'a> {
    pub fn new(values: &'a PropertyValues, model: &'a ModelVariables) -> Self {
        ParamValues { values, model }
    }

    pub fn values(&self) -> Vec<f64> {
        resolve(self.model.param_names.iter().map(String::as_str), self.values)
    }
}

/// Initial variable values for one model instantiation.
#[derive(Debug, Clone, Copy)]
pub struct VarValues<'a> {
    values: &'a PropertyValues,
    model: &'a ModelVariables,
}

impl<'a> VarValues<'a> {
    pub fn new(values: &'a PropertyValues, model: &'a ModelVariables) -> Self {
        VarValues { values, model }
    }

    pub fn values(&self) -> Vec<f64> {
        resolve(self.model.var_names(), self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Variable;

    fn sparse(pairs: &[(&str, f64)]) -> PropertyValues {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn missing_names_default_to_zero() {
        let values = sparse(&[("b", 2.5)]);
        assert_eq!(resolve(["a", "b", "c"], &values), vec![0.0, 2.5, 0.0]);
    }

    #[test]
    fn unknown_keys_ignored() {
        let values = sparse(&[("z", 1.0), ("a", -65.0)]);
        assert_eq!(resolve(["a"], &values), vec![-65.0]);
    }

    #[test]
    fn empty_declaration_is_empty() {
        assert!(resolve(std::iter::empty(), &sparse(&[("a", 1.0)])).is_empty());
    }

    #[test]
    fn params_and_vars_follow_model_order() {
        let model = ModelVariables {
            param_names: vec!["c".into(), "a".into()],
            vars: vec![
                Variable { name: "U".into(), ty: "scalar".into() },
                Variable { name: "V".into(), ty: "scalar".into() },
                Variable { name: "_regimeID".into(), ty: "unsigned int".into() },
            ],
            multiple_regimes: true,
        };
        let values = sparse(&[("a", 0.02), ("c", -65.0), ("V", -70.0)]);
        assert_eq!(ParamValues::new(&values, &model).values(), vec![-65.0, 0.02]);
        assert_eq!(VarValues::new(&values, &model).values(), vec![0.0, -70.0, 0.0]);
    }
}
