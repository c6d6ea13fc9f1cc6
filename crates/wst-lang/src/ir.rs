//! Intermediate representation produced by the compiler and executed by the
//! evaluator. Every block, branch and lambda of the source program is a named
//! [`FunctionDefinition`] here; everything else is a tree of [`ValueSource`]s.
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use smol_str::SmolStr;

use crate::Shared;
use crate::range::Range;
use crate::value::{MergeMode, Path};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionReference {
    /// Empty for unqualified calls.
    pub package: SmolStr,
    pub name: SmolStr,
}

impl FunctionReference {
    pub fn new(package: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<SmolStr>) -> Self {
        Self::new("", name)
    }
}

impl Display for FunctionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.package, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub reference: FunctionReference,
    pub args: Vec<ValueSource>,
    /// Construct a closure over the callee instead of invoking it.
    pub build_closure: bool,
    #[serde(skip)]
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueSource {
    ConstInt(i64),
    ConstFloat(f64),
    ConstString(SmolStr),
    ConstBool(bool),
    FromLocal(SmolStr),
    FreeParameter(SmolStr),
    FunctionCall(Box<FunctionCall>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MappingTarget {
    /// Writes into the frame's `$this`. An empty path targets the whole output.
    Field { path: Path },
    Variable { name: SmolStr, path: Path },
    /// Writes into the innermost `withSides` output, or the root output when
    /// there is none.
    Side { path: Path },
    CustomSink { call: FunctionCall },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub target: MappingTarget,
    pub value: ValueSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<MergeMode>,
    /// Write every element of the value in turn instead of the value itself.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub iterate_source: bool,
}

impl FieldMapping {
    pub fn new(target: MappingTarget, value: ValueSource) -> Self {
        Self {
            target,
            value,
            mode: None,
            iterate_source: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub name: SmolStr,
}

impl Argument {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    pub name: SmolStr,
    pub args: Vec<Argument>,
    pub inherit_parent_vars: bool,
    pub mappings: Vec<FieldMapping>,
}

/// A compiled program. `functions` holds the user-defined and synthesized
/// functions in the order they were produced; `root` is not among them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub package: SmolStr,
    pub root: Shared<FunctionDefinition>,
    pub functions: Vec<Shared<FunctionDefinition>>,
    /// Program text, kept for error reports.
    #[serde(skip)]
    pub source: Shared<str>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Shared<FunctionDefinition>> {
        self.functions.iter().find(|f| f.name == name)
    }
}
