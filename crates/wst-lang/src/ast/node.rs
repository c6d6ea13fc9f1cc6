use smol_str::SmolStr;

use crate::number::Number;
use crate::range::Range;
use crate::value::{MergeMode, Path};

#[derive(PartialEq, Debug, Clone)]
pub struct Node {
    pub range: Range,
    pub expr: Expr,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    /// A variable read, `foo` or `$foo`.
    Ident(SmolStr),
    Call(Call),
    Block(Vec<Mapping>),
    /// Plain field/index/wildcard access on the value of the inner node.
    Path(Box<Node>, Path),
    /// `xs[]`: the enclosing call or mapping runs once per element.
    Iterate(Box<Node>),
}

#[derive(PartialEq, Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(Number),
    String(SmolStr),
    Bool(bool),
}

#[derive(PartialEq, Debug, Clone)]
pub struct Call {
    pub package: Option<SmolStr>,
    pub name: SmolStr,
    pub args: Vec<Node>,
}

impl Call {
    pub fn new(name: impl Into<SmolStr>, args: Vec<Node>) -> Self {
        Call {
            package: None,
            name: name.into(),
            args,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Target {
    /// `var name.path: value`
    Variable { name: SmolStr, path: Path },
    /// `$this.path: value`, `field.path: value`, or a bare expression when the
    /// path is empty.
    Field(Path),
    /// `side path: value` writes into the nearest `withSides` output instead
    /// of the current one.
    Side(Path),
    /// `sink(args): value`. The value is appended as the last argument.
    Sink(Call),
}

#[derive(PartialEq, Debug, Clone)]
pub struct Mapping {
    pub range: Range,
    /// Explicit `merge`, `replace`, `append` or `extend` keyword.
    pub mode: Option<MergeMode>,
    pub target: Target,
    pub value: Node,
}

#[derive(PartialEq, Debug, Clone)]
pub struct FunctionDef {
    pub range: Range,
    pub name: SmolStr,
    pub params: Vec<SmolStr>,
    pub body: Node,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct Program {
    pub defs: Vec<FunctionDef>,
    pub mappings: Vec<Mapping>,
}
