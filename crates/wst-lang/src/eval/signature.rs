use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use smallvec::SmallVec;

use crate::ir::FunctionDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Value,
    Closure,
}

/// Runtime shape of a registered function, used by overload selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    params: SmallVec<[ParamKind; 4]>,
    variadic: bool,
    inherit_parent_vars: bool,
}

impl Signature {
    pub fn new(params: &[ParamKind]) -> Self {
        Signature {
            params: params.into(),
            variadic: false,
            inherit_parent_vars: false,
        }
    }

    /// The last parameter repeats; zero or more trailing arguments match it.
    pub fn variadic(params: &[ParamKind]) -> Self {
        Signature {
            variadic: true,
            ..Signature::new(params)
        }
    }

    pub fn of_definition(def: &FunctionDefinition) -> Self {
        Signature {
            params: def.args.iter().map(|_| ParamKind::Value).collect(),
            variadic: false,
            inherit_parent_vars: def.inherit_parent_vars,
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn inherit_parent_vars(&self) -> bool {
        self.inherit_parent_vars
    }

    pub fn accepts_arity(&self, n: usize) -> bool {
        if self.variadic {
            n + 1 >= self.params.len()
        } else {
            n == self.params.len()
        }
    }

    pub fn param(&self, index: usize) -> ParamKind {
        self.params
            .get(index)
            .or_else(|| self.params.last())
            .copied()
            .unwrap_or(ParamKind::Value)
    }

    /// `arg_kind` returns `None` for arguments whose shape is not known yet,
    /// such as free parameters of a closure under construction.
    pub fn accepts(&self, arity: usize, arg_kind: impl Fn(usize) -> Option<ParamKind>) -> bool {
        self.accepts_arity(arity)
            && (0..arity).all(|i| arg_kind(i).is_none_or(|kind| kind == self.param(i)))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let params = self.params.iter().map(|p| match p {
            ParamKind::Value => "value",
            ParamKind::Closure => "closure",
        });
        write!(
            f,
            "({}{})",
            params.format(", "),
            if self.variadic { "..." } else { "" }
        )
    }
}
