//! Compile-time lexical scopes.
//!
//! Scopes live in an arena and point at their parent by id. A read that
//! resolves in an ancestor is recorded in `vars_from_parents` of every scope
//! between the reader and the declaring scope; those names become explicit
//! trailing arguments of the synthesized function and of its invocation.
use smol_str::SmolStr;

use crate::arena::{Arena, ArenaId};
use crate::ast::constants;
use crate::ir::{Argument, FieldMapping, FunctionCall, FunctionDefinition, FunctionReference, ValueSource};
use crate::range::Range;

pub type ScopeId = ArenaId<Scope>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Undeclared(pub SmolStr);

#[derive(Debug, Clone)]
pub struct Scope {
    name: SmolStr,
    parent: Option<ScopeId>,
    local_vars: Vec<SmolStr>,
    vars_from_parents: Vec<SmolStr>,
    args: Vec<SmolStr>,
}

impl Scope {
    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.local_vars.iter().any(|v| v == name)
    }

    pub fn is_inherited(&self, name: &str) -> bool {
        self.vars_from_parents.iter().any(|v| v == name)
    }

    pub fn vars_from_parents(&self) -> &[SmolStr] {
        &self.vars_from_parents
    }

    fn is_visible(&self, name: &str) -> bool {
        self.is_local(name) || self.is_inherited(name)
    }
}

#[derive(Debug, Default)]
pub struct Scopes {
    arena: Arena<Scope>,
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(32),
        }
    }

    /// A scope with no parent, used for the program root and for `def` bodies.
    pub fn create_root(&mut self, name: impl Into<SmolStr>, args: &[SmolStr]) -> ScopeId {
        self.alloc(name.into(), None, args)
    }

    pub fn create_child(&mut self, parent: ScopeId, name: impl Into<SmolStr>, args: &[SmolStr]) -> ScopeId {
        self.alloc(name.into(), Some(parent), args)
    }

    fn alloc(&mut self, name: SmolStr, parent: Option<ScopeId>, args: &[SmolStr]) -> ScopeId {
        let mut local_vars = vec![SmolStr::new(constants::THIS)];
        local_vars.extend(args.iter().cloned());

        self.arena.alloc(Scope {
            name,
            parent,
            local_vars,
            vars_from_parents: Vec::new(),
            args: args.to_vec(),
        })
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id]
    }

    /// Resolves `name` from `id`, walking ancestors and recording the
    /// inheritance on the way back down.
    pub fn read_var(&mut self, id: ScopeId, name: &str) -> Result<(), Undeclared> {
        let scope = &self.arena[id];
        if scope.is_visible(name) {
            return Ok(());
        }

        match scope.parent {
            Some(parent) => {
                self.read_var(parent, name)?;
                self.arena[id].vars_from_parents.push(SmolStr::new(name));
                Ok(())
            }
            None => Err(Undeclared(SmolStr::new(name))),
        }
    }

    /// Inherits `name` if any ancestor can see it, otherwise declares it here.
    pub fn declare_or_inherit(&mut self, id: ScopeId, name: &str) {
        if self.read_var(id, name).is_err() {
            self.declare_local(id, name);
        }
    }

    /// Declares `name` in this scope only. Reads in this scope resolve to the
    /// new binding from now on; ancestors are untouched.
    pub fn declare_local(&mut self, id: ScopeId, name: &str) {
        let scope = &mut self.arena[id];
        if !scope.is_local(name) {
            scope.local_vars.push(SmolStr::new(name));
        }
    }

    /// Builds the call that activates the function of scope `id`. `args` must
    /// match the scope's declared arguments; the inherited variables follow
    /// them, read from the parent scope.
    pub fn generate_invocation(
        &mut self,
        id: ScopeId,
        package: &str,
        build_closure: bool,
        args: Vec<ValueSource>,
        range: Range,
    ) -> Result<FunctionCall, Undeclared> {
        let scope = &self.arena[id];
        debug_assert_eq!(scope.args.len(), args.len());

        let name = scope.name.clone();
        let parent = scope.parent;
        let inherited = scope.vars_from_parents.clone();

        let mut call_args = args;
        for var in inherited {
            if let Some(parent) = parent {
                self.read_var(parent, &var)?;
            }
            call_args.push(ValueSource::FromLocal(var));
        }

        Ok(FunctionCall {
            reference: FunctionReference::new(package, name),
            args: call_args,
            build_closure,
            range,
        })
    }

    pub fn generate_definition(
        &self,
        id: ScopeId,
        inherit_parent_vars: bool,
        mappings: Vec<FieldMapping>,
    ) -> FunctionDefinition {
        let scope = &self.arena[id];

        FunctionDefinition {
            name: scope.name.clone(),
            args: scope
                .args
                .iter()
                .chain(scope.vars_from_parents.iter())
                .cloned()
                .map(Argument::new)
                .collect(),
            inherit_parent_vars,
            mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn scopes() -> Scopes {
        Scopes::new()
    }

    #[rstest]
    fn test_undeclared_in_root(mut scopes: Scopes) {
        let root = scopes.create_root("root", &[]);
        assert_eq!(scopes.read_var(root, "x"), Err(Undeclared("x".into())));
    }

    #[rstest]
    fn test_this_is_never_inherited(mut scopes: Scopes) {
        let root = scopes.create_root("root", &[]);
        let child = scopes.create_child(root, "child", &[]);

        scopes.read_var(child, constants::THIS).unwrap();
        assert!(scopes.get(child).vars_from_parents().is_empty());
    }

    #[rstest]
    fn test_descendant_variables_are_invisible(mut scopes: Scopes) {
        let root = scopes.create_root("root", &[]);
        let child = scopes.create_child(root, "child", &[]);
        scopes.declare_local(child, "y");

        assert!(scopes.read_var(root, "y").is_err());
        let sibling = scopes.create_child(root, "sibling", &[]);
        assert!(scopes.read_var(sibling, "y").is_err());
    }

    #[rstest]
    fn test_inherit_threads_through_every_level(mut scopes: Scopes) {
        let root = scopes.create_root("root", &["$root".into()]);
        let middle = scopes.create_child(root, "middle", &[]);
        let inner = scopes.create_child(middle, "inner", &[]);

        scopes.read_var(inner, "$root").unwrap();

        assert!(scopes.get(inner).is_inherited("$root"));
        assert!(scopes.get(middle).is_inherited("$root"));
        assert!(!scopes.get(root).is_inherited("$root"));
    }

    #[rstest]
    fn test_parent_declared_before_child(mut scopes: Scopes) {
        let root = scopes.create_root("root", &[]);
        scopes.declare_or_inherit(root, "x");
        let child = scopes.create_child(root, "child", &[]);

        scopes.declare_or_inherit(child, "x");

        assert!(scopes.get(child).is_inherited("x"));
        assert!(!scopes.get(child).is_local("x"));
    }

    #[rstest]
    fn test_child_declared_before_parent(mut scopes: Scopes) {
        let root = scopes.create_root("root", &[]);
        let child = scopes.create_child(root, "child", &[]);

        scopes.declare_or_inherit(child, "x");
        scopes.declare_or_inherit(root, "x");

        assert!(scopes.get(child).is_local("x"));
        assert!(!scopes.get(child).is_inherited("x"));
        assert!(scopes.get(root).is_local("x"));
    }

    #[rstest]
    fn test_parent_declaration_visible_to_existing_child(mut scopes: Scopes) {
        let root = scopes.create_root("root", &[]);
        let child = scopes.create_child(root, "child", &[]);
        scopes.declare_local(root, "x");

        scopes.read_var(child, "x").unwrap();
        assert!(scopes.get(child).is_inherited("x"));
    }

    #[rstest]
    fn test_shadowing_does_not_touch_parent(mut scopes: Scopes) {
        let root = scopes.create_root("root", &[]);
        scopes.declare_local(root, "x");
        let child = scopes.create_child(root, "child", &[]);
        scopes.read_var(child, "x").unwrap();

        scopes.declare_local(child, "x");
        scopes.declare_local(child, "only_child");

        assert!(scopes.get(child).is_local("x"));
        assert!(scopes.get(root).is_local("x"));
        assert!(!scopes.get(root).is_local("only_child"));
    }

    #[rstest]
    fn test_generate_invocation_and_definition(mut scopes: Scopes) {
        let root = scopes.create_root("root", &[]);
        scopes.declare_local(root, "a");
        scopes.declare_local(root, "b");
        let lambda = scopes.create_child(root, "lambda_0", &["$".into()]);
        scopes.read_var(lambda, "b").unwrap();
        scopes.read_var(lambda, "a").unwrap();
        scopes.read_var(lambda, "b").unwrap();

        let call = scopes
            .generate_invocation(
                lambda,
                "main",
                true,
                vec![ValueSource::FreeParameter("$".into())],
                Range::default(),
            )
            .unwrap();
        let def = scopes.generate_definition(lambda, false, Vec::new());

        assert_eq!(call.reference, FunctionReference::new("main", "lambda_0"));
        assert_eq!(
            call.args,
            vec![
                ValueSource::FreeParameter("$".into()),
                ValueSource::FromLocal("b".into()),
                ValueSource::FromLocal("a".into()),
            ]
        );
        assert_eq!(
            def.args.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            vec!["$", "b", "a"]
        );
    }
}
