use std::fmt;
use std::path::PathBuf;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use smol_str::SmolStr;
use thiserror::Error;

use super::Evaluator;
use super::closure::RuntimeValue;
use super::error::EvalError;
use super::signature::Signature;
use crate::Shared;
use crate::ast::constants;
use crate::ir::{FunctionDefinition, FunctionReference, Program};
use crate::value::Value;

pub type BuiltinFn = fn(&mut Evaluator, Vec<RuntimeValue>) -> Result<Value, EvalError>;

pub const ALL_PACKAGES: &str = "*";
pub const DEFAULT_SCHEME: &str = "file";

#[derive(Debug)]
pub enum Callable {
    Defined {
        def: Shared<FunctionDefinition>,
        signature: Signature,
    },
    Builtin {
        name: SmolStr,
        signature: Signature,
        func: BuiltinFn,
    },
}

impl Callable {
    pub fn defined(def: Shared<FunctionDefinition>) -> Self {
        Callable::Defined {
            signature: Signature::of_definition(&def),
            def,
        }
    }

    pub fn builtin(name: impl Into<SmolStr>, signature: Signature, func: BuiltinFn) -> Self {
        Callable::Builtin {
            name: name.into(),
            signature,
            func,
        }
    }

    pub fn name(&self) -> &SmolStr {
        match self {
            Callable::Defined { def, .. } => &def.name,
            Callable::Builtin { name, .. } => name,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Callable::Defined { signature, .. } | Callable::Builtin { signature, .. } => signature,
        }
    }
}

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("No loader registered for scheme `{0}`")]
    UnknownScheme(String),
    #[error("`{0}` not found")]
    NotFound(String),
    #[error("Failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait Loader: Send + Sync {
    fn load(&self, path: &str) -> Result<Vec<u8>, LoaderError>;
    fn exists(&self, path: &str) -> bool;
}

/// Reads programs from the file system. Relative paths are tried as given,
/// then against each search path in order.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    search_paths: Vec<PathBuf>,
}

impl FileLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    fn find(&self, path: &str) -> Option<PathBuf> {
        let candidate = PathBuf::from(path);
        if candidate.is_file() || candidate.is_absolute() {
            return candidate.is_file().then_some(candidate);
        }

        self.search_paths
            .iter()
            .map(|dir| dir.join(path))
            .find(|p| p.is_file())
    }
}

impl Loader for FileLoader {
    fn load(&self, path: &str) -> Result<Vec<u8>, LoaderError> {
        let file = self
            .find(path)
            .ok_or_else(|| LoaderError::NotFound(path.to_string()))?;
        std::fs::read(&file).map_err(|source| LoaderError::Io {
            path: file.display().to_string(),
            source,
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.find(path).is_some()
    }
}

type Functions = FxHashMap<SmolStr, Vec<Shared<Callable>>>;

/// The functions one compiled program defines. Its calls into its own package
/// resolve here first, so a later compilation that reuses a name does not
/// change what an earlier program runs.
#[derive(Debug, Clone, Default)]
pub struct ProgramFunctions {
    package: SmolStr,
    functions: Functions,
}

impl ProgramFunctions {
    pub fn new(program: &Program) -> Self {
        let mut functions = Functions::default();
        for def in program.functions.iter().chain(std::iter::once(&program.root)) {
            functions
                .entry(def.name.clone())
                .or_default()
                .push(Shared::new(Callable::defined(def.clone())));
        }

        Self {
            package: program.package.clone(),
            functions,
        }
    }

    fn lookup(&self, package: &str, name: &str) -> Option<&[Shared<Callable>]> {
        (package == self.package)
            .then(|| self.functions.get(name))
            .flatten()
            .map(Vec::as_slice)
    }
}

/// Registered functions by package, plus loaders by URI scheme.
#[derive(Clone)]
pub struct Registry {
    packages: FxHashMap<SmolStr, Functions>,
    order: Vec<SmolStr>,
    loaders: FxHashMap<SmolStr, Shared<dyn Loader>>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Registry {
            packages: FxHashMap::default(),
            order: Vec::new(),
            loaders: FxHashMap::default(),
        };
        registry.register_loader(DEFAULT_SCHEME, FileLoader::default());
        registry
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("packages", &self.order)
            .field("loaders", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn with_builtins() -> Self {
        let mut registry = Registry::default();
        for callable in super::builtin::functions() {
            registry.register(constants::BUILTINS_PACKAGE, callable);
        }
        registry
    }

    /// Adds an overload. A defined function replaces an earlier one with the
    /// same name and signature, so recompiling a program does not pile up
    /// duplicates. Programs compiled earlier keep their own definitions through
    /// [`ProgramFunctions`].
    pub fn register(&mut self, package: &str, callable: Callable) {
        if !self.packages.contains_key(package) {
            self.order.push(SmolStr::new(package));
        }

        let overloads = self
            .packages
            .entry(SmolStr::new(package))
            .or_default()
            .entry(callable.name().clone())
            .or_default();

        let existing = overloads.iter().position(|c| {
            matches!(c.as_ref(), Callable::Defined { .. }) && c.signature() == callable.signature()
        });
        match existing {
            Some(i) if matches!(callable, Callable::Defined { .. }) => {
                overloads[i] = Shared::new(callable)
            }
            _ => overloads.push(Shared::new(callable)),
        }
    }

    pub fn register_program(&mut self, program: &Program) {
        for def in program.functions.iter().chain(std::iter::once(&program.root)) {
            self.register(&program.package, Callable::defined(def.clone()));
        }
    }

    pub fn lookup(&self, package: &str, name: &str) -> &[Shared<Callable>] {
        self.packages
            .get(package)
            .and_then(|functions| functions.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Candidate groups for `reference` in search order. An unqualified call
    /// searches `current` and then the builtins. Names the running program
    /// defines itself come from `program` rather than from the registry.
    pub fn candidates<'a>(
        &'a self,
        reference: &FunctionReference,
        current: &str,
        program: &'a ProgramFunctions,
    ) -> SmallVec<[&'a [Shared<Callable>]; 2]> {
        let lookup = |package: &str| {
            program
                .lookup(package, &reference.name)
                .unwrap_or_else(|| self.lookup(package, &reference.name))
        };

        match reference.package.as_str() {
            "" => [current, constants::BUILTINS_PACKAGE]
                .into_iter()
                .map(lookup)
                .collect(),
            ALL_PACKAGES => self.order.iter().map(|package| lookup(package.as_str())).collect(),
            package => SmallVec::from_iter([lookup(package)]),
        }
    }

    pub fn register_loader(&mut self, scheme: &str, loader: impl Loader + 'static) {
        self.loaders.insert(SmolStr::new(scheme), Shared::new(loader));
    }

    pub fn resolve_loader(&self, scheme: &str) -> Result<Shared<dyn Loader>, LoaderError> {
        self.loaders
            .get(scheme)
            .cloned()
            .ok_or_else(|| LoaderError::UnknownScheme(scheme.to_string()))
    }
}
