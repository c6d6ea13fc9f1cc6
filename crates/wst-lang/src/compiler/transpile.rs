use smol_str::{SmolStr, format_smolstr};

use super::error::CompileError;
use super::id_generator::IdGenerator;
use super::scope::{ScopeId, Scopes, Undeclared};
use super::signature::{ArgType, LambdaKind, Signature};
use crate::Shared;
use crate::ast::{self, Expr, Literal, Node, Target, constants};
use crate::ir::{FieldMapping, FunctionCall, FunctionDefinition, FunctionReference, MappingTarget, Program, ValueSource};
use crate::range::Range;
use crate::value::{MergeMode, Path, Segment};

pub struct Transpiler<'a> {
    source: &'a str,
    package: SmolStr,
    ids: &'a mut dyn IdGenerator,
    scopes: Scopes,
    current: ScopeId,
    functions: Vec<Shared<FunctionDefinition>>,
}

impl<'a> Transpiler<'a> {
    pub fn new(source: &'a str, package: impl Into<SmolStr>, ids: &'a mut dyn IdGenerator) -> Self {
        let mut scopes = Scopes::new();
        let toplevel = scopes.create_root("", &[]);

        Self {
            source,
            package: package.into(),
            ids,
            scopes,
            current: toplevel,
            functions: Vec::new(),
        }
    }

    pub fn transpile(mut self, program: &ast::Program) -> Result<Program, CompileError> {
        for def in &program.defs {
            self.function_def(def)?;
        }

        let root_name = format_smolstr!("{}_root_function", self.package);
        let root_scope = self
            .scopes
            .create_root(root_name, &[SmolStr::new(constants::ROOT)]);
        let mappings = self.in_scope(root_scope, |t| t.mappings(&program.mappings))?;
        let root = self.scopes.generate_definition(root_scope, false, mappings);

        Ok(Program {
            package: self.package,
            root: Shared::new(root),
            functions: self.functions,
            source: Shared::from(self.source),
        })
    }

    fn function_def(&mut self, def: &ast::FunctionDef) -> Result<(), CompileError> {
        let scope = self.scopes.create_root(def.name.clone(), &def.params);
        let mappings = self.in_scope(scope, |t| match &def.body.expr {
            Expr::Block(mappings) => t.mappings(mappings),
            _ => {
                let (value, iterate_source) = t.mapping_value(&def.body)?;
                Ok(vec![FieldMapping {
                    iterate_source,
                    ..FieldMapping::new(MappingTarget::Field { path: Path::empty() }, value)
                }])
            }
        })?;

        let def = self.scopes.generate_definition(scope, false, mappings);
        self.define(def);
        Ok(())
    }

    fn in_scope<T>(
        &mut self,
        scope: ScopeId,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let outer = std::mem::replace(&mut self.current, scope);
        let result = f(self);
        self.current = outer;
        result
    }

    fn define(&mut self, def: FunctionDefinition) {
        self.functions.push(Shared::new(def));
    }

    fn undeclared(range: Range) -> impl Fn(Undeclared) -> CompileError {
        move |Undeclared(name)| CompileError::UndeclaredVariable { name, range }
    }

    fn mappings(&mut self, mappings: &[ast::Mapping]) -> Result<Vec<FieldMapping>, CompileError> {
        mappings.iter().map(|m| self.mapping(m)).collect()
    }

    fn mapping(&mut self, mapping: &ast::Mapping) -> Result<FieldMapping, CompileError> {
        let (value, iterate_source) = self.mapping_value(&mapping.value)?;
        if let Some(mode) = mapping.mode {
            Self::check_mode(mode, &mapping.target, mapping.range)?;
        }

        let target = match &mapping.target {
            Target::Variable { name, path } => {
                self.scopes.declare_or_inherit(self.current, name);
                MappingTarget::Variable {
                    name: name.clone(),
                    path: path.clone(),
                }
            }
            Target::Field(path) => MappingTarget::Field { path: path.clone() },
            Target::Side(path) => MappingTarget::Side { path: path.clone() },
            Target::Sink(call) => MappingTarget::CustomSink {
                call: FunctionCall {
                    reference: self.reference(call),
                    args: call
                        .args
                        .iter()
                        .map(|arg| self.expr(arg))
                        .collect::<Result<_, _>>()?,
                    build_closure: false,
                    range: mapping.range,
                },
            },
        };

        Ok(FieldMapping {
            target,
            value,
            mode: mapping.mode,
            iterate_source,
        })
    }

    /// A value written by a mapping. `xs[]` in this position writes every
    /// element of `xs` in turn.
    fn mapping_value(&mut self, node: &Node) -> Result<(ValueSource, bool), CompileError> {
        match &node.expr {
            Expr::Iterate(source) => Ok((self.expr(source)?, true)),
            _ => Ok((self.expr(node)?, false)),
        }
    }

    fn check_mode(mode: MergeMode, target: &Target, range: Range) -> Result<(), CompileError> {
        let path = match target {
            Target::Variable { path, .. } | Target::Field(path) | Target::Side(path) => path,
            Target::Sink(_) => {
                return Err(CompileError::MergeModeNotApplicable {
                    mode,
                    target: "a sink",
                    range,
                });
            }
        };

        if path.segments().iter().any(|s| matches!(s, Segment::Index(None))) {
            return Err(CompileError::MergeModeNotApplicable {
                mode,
                target: "an appending path",
                range,
            });
        }
        Ok(())
    }

    fn expr(&mut self, node: &Node) -> Result<ValueSource, CompileError> {
        match &node.expr {
            Expr::Literal(Literal::Int(i)) => Ok(ValueSource::ConstInt(*i)),
            Expr::Literal(Literal::Float(n)) => Ok(ValueSource::ConstFloat(n.value())),
            Expr::Literal(Literal::String(s)) => Ok(ValueSource::ConstString(s.clone())),
            Expr::Literal(Literal::Bool(b)) => Ok(ValueSource::ConstBool(*b)),
            Expr::Ident(name) => {
                self.scopes
                    .read_var(self.current, name)
                    .map_err(Self::undeclared(node.range))?;
                Ok(ValueSource::FromLocal(name.clone()))
            }
            Expr::Path(source, path) => {
                let source = self.expr(source)?;
                Ok(ValueSource::FunctionCall(Box::new(FunctionCall {
                    reference: FunctionReference::new(constants::BUILTINS_PACKAGE, constants::GET),
                    args: vec![source, ValueSource::ConstString(path.to_string().into())],
                    build_closure: false,
                    range: node.range,
                })))
            }
            Expr::Call(call) => self.call(call, node.range),
            Expr::Block(mappings) => self.block(mappings, node.range),
            Expr::Iterate(_) => Err(CompileError::MisplacedIteration { range: node.range }),
        }
    }

    fn reference(&self, call: &ast::Call) -> FunctionReference {
        FunctionReference::new(call.package.clone().unwrap_or_default(), call.name.clone())
    }

    fn call(&mut self, call: &ast::Call, range: Range) -> Result<ValueSource, CompileError> {
        let num_args = call.args.len();
        let signatures = Signature::lookup(call.package.as_deref(), &call.name);
        let signature = signatures
            .iter()
            .find(|s| s.supports_num_args(num_args))
            .ok_or_else(|| CompileError::Arity {
                function: call.name.clone(),
                accepted: Signature::describe_accepted(&signatures),
                given: num_args,
                snippet: range.snippet(self.source).to_string(),
                range,
            })?;

        self.check_literal_path(call, range)?;

        let mut iterated = Vec::new();
        let args = call
            .args
            .iter()
            .enumerate()
            .map(|(i, arg)| match (signature.arg_type(i, num_args), &arg.expr) {
                (ArgType::Value, Expr::Iterate(source)) => {
                    iterated.push(self.expr(source)?);
                    Ok(ValueSource::FreeParameter(format_smolstr!("iteratedArg{i}")))
                }
                (ArgType::Value, _) => self.expr(arg),
                (ArgType::Closure { .. }, Expr::Iterate(_)) => {
                    Err(CompileError::MisplacedIteration { range: arg.range })
                }
                (
                    ArgType::Closure {
                        prefix,
                        kind,
                        params,
                    },
                    _,
                ) => self.lambda(arg, &prefix, kind, &params),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let call = FunctionCall {
            reference: self.reference(call),
            args,
            build_closure: !iterated.is_empty(),
            range,
        };
        if iterated.is_empty() {
            return Ok(ValueSource::FunctionCall(Box::new(call)));
        }

        // f(xs[], ys[]) runs as iterate(f(_, _), xs, ys).
        let args = std::iter::once(ValueSource::FunctionCall(Box::new(call)))
            .chain(iterated)
            .collect();
        Ok(ValueSource::FunctionCall(Box::new(FunctionCall {
            reference: FunctionReference::new(constants::BUILTINS_PACKAGE, constants::ITERATE),
            args,
            build_closure: false,
            range,
        })))
    }

    fn check_literal_path(&self, call: &ast::Call, range: Range) -> Result<(), CompileError> {
        if call.name != constants::GET {
            return Ok(());
        }

        match call.args.get(1).map(|arg| &arg.expr) {
            Some(Expr::Literal(Literal::String(path))) => Path::parse(path)
                .map(|_| ())
                .map_err(|cause| CompileError::MalformedPath {
                    path: path.to_string(),
                    cause,
                    range,
                }),
            _ => Ok(()),
        }
    }

    /// Synthesizes a function for a deferred expression and returns the call
    /// that builds it as a closure over `params`.
    fn lambda(
        &mut self,
        body: &Node,
        prefix: &str,
        kind: LambdaKind,
        params: &[SmolStr],
    ) -> Result<ValueSource, CompileError> {
        let name = format!("{prefix}{}", self.ids.next_id());
        let scope = self.scopes.create_child(self.current, name, params);

        let value = self.in_scope(scope, |t| t.expr(body))?;
        let mapping = FieldMapping::new(MappingTarget::Field { path: Path::empty() }, value);
        let def = self
            .scopes
            .generate_definition(scope, kind.inherits_parent_vars(), vec![mapping]);
        self.define(def);

        let free = params.iter().cloned().map(ValueSource::FreeParameter).collect();
        self.invocation(scope, true, free, body.range)
    }

    fn block(&mut self, mappings: &[ast::Mapping], range: Range) -> Result<ValueSource, CompileError> {
        let name = format!("block_{}", self.ids.next_id());
        let scope = self.scopes.create_child(self.current, name, &[]);

        let mappings = self.in_scope(scope, |t| t.mappings(mappings))?;
        let def = self.scopes.generate_definition(scope, true, mappings);
        self.define(def);

        self.invocation(scope, false, Vec::new(), range)
    }

    fn invocation(
        &mut self,
        scope: ScopeId,
        build_closure: bool,
        args: Vec<ValueSource>,
        range: Range,
    ) -> Result<ValueSource, CompileError> {
        let package = self.package.clone();
        self.scopes
            .generate_invocation(scope, &package, build_closure, args, range)
            .map(|call| ValueSource::FunctionCall(Box::new(call)))
            .map_err(Self::undeclared(range))
    }
}
