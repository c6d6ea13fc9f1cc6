use smol_str::SmolStr;

use crate::compiler::{self, IdGenerator, SeededIdGenerator};
use crate::error::Error;
use crate::eval::cancel::CancellationToken;
use crate::eval::registry::{DEFAULT_SCHEME, Loader, Registry};
use crate::eval::{DEFAULT_FRAME_LIMIT, Evaluator};
use crate::ir::Program;
use crate::value::Value;
use crate::{Shared, WstResult};

const SCHEME_SEPARATOR: &str = "://";

#[derive(Debug, Clone)]
pub struct Options {
    /// Seed for synthesized function names. `None` picks a random seed.
    pub seed: Option<u64>,
    pub frame_limit: usize,
    /// Package that compiled functions are registered in.
    pub package: SmolStr,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            seed: None,
            frame_limit: DEFAULT_FRAME_LIMIT,
            package: SmolStr::new_static("main"),
        }
    }
}

/// Compiles programs into a shared registry and runs them against inputs.
///
/// A compiled [`Program`] only reads the registry, so clones of an engine can
/// run it on separate threads, each run with its own frames.
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Shared<Registry>,
    options: Options,
    ids: SeededIdGenerator,
    token: CancellationToken,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Engine {
    pub fn new(options: Options) -> Self {
        let ids = options
            .seed
            .map(SeededIdGenerator::new)
            .unwrap_or_else(SeededIdGenerator::random);

        Self {
            registry: Shared::new(Registry::with_builtins()),
            options,
            ids,
            token: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registers a loader for `scheme://` URIs used by [`Engine::compile_file`].
    pub fn register_loader(&mut self, scheme: &str, loader: impl Loader + 'static) {
        Shared::make_mut(&mut self.registry).register_loader(scheme, loader);
    }

    /// Token observed by every run of this engine and its clones. Cancelling
    /// it makes running programs fail with a cancellation error; call
    /// [`CancellationToken::reset`] before running again.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn compile(&mut self, code: &str) -> Result<Program, Error> {
        let ast = crate::parse(code)?;
        let program = compiler::compile(code, &ast, &self.options.package, &mut self.ids as &mut dyn IdGenerator)
            .map_err(|e| Error::from_error(code, e))?;

        Shared::make_mut(&mut self.registry).register_program(&program);
        Ok(program)
    }

    /// Loads a program through the loader registered for its URI scheme.
    /// A URI without a scheme is read from the file system.
    pub fn compile_file(&mut self, uri: &str) -> Result<Program, Error> {
        let (scheme, path) = uri.split_once(SCHEME_SEPARATOR).unwrap_or((DEFAULT_SCHEME, uri));
        tracing::debug!(scheme, path, "loading program");

        let code = self
            .registry
            .resolve_loader(scheme)
            .and_then(|loader| loader.load(path))
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|e| Error::from_error("", e))?;

        self.compile(&code)
    }

    pub fn eval(&mut self, code: &str, input: Value) -> WstResult {
        let program = self.compile(code)?;
        self.run(&program, input)
    }

    /// Runs `program` against a private copy of `input`.
    pub fn run(&self, program: &Program, input: Value) -> WstResult {
        let mut evaluator = Evaluator::new(Shared::clone(&self.registry), program.package.clone())
            .with_program(program)
            .with_frame_limit(self.options.frame_limit)
            .with_cancellation_token(self.token.clone());

        evaluator
            .run(&program.root, input.deep_copy())
            .map_err(|e| Error::with_range(program.source.as_ref(), e, evaluator.error_range()))
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InnerError;
    use crate::eval::error::EvalError;
    use crate::eval::registry::LoaderError;
    use rstest::{fixture, rstest};

    #[fixture]
    fn engine() -> Engine {
        Engine::new(Options {
            seed: Some(7),
            ..Options::default()
        })
    }

    #[test]
    fn test_options_default() {
        let options = Options::default();
        assert_eq!(options.seed, None);
        assert_eq!(options.frame_limit, 480);
        assert_eq!(options.package, "main");
    }

    #[rstest]
    fn test_eval(mut engine: Engine) {
        let input = crate::json::parse(br#"{"a": 20}"#).unwrap();
        assert_eq!(engine.eval("$root.a + 1", input).unwrap(), Value::from(21));
    }

    #[test]
    fn test_same_seed_same_names() {
        let compile = |code: &str| {
            let mut engine = Engine::new(Options {
                seed: Some(42),
                ..Options::default()
            });
            engine.compile(code).unwrap()
        };

        let code = "if $root.a then 1 else 2";
        let names = |p: &Program| p.functions.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&compile(code)), names(&compile(code)));
    }

    #[rstest]
    fn test_programs_do_not_clash(mut engine: Engine) {
        let first = engine.compile("if $root then \"first\"").unwrap();
        let second = engine.compile("if $root then \"second\"").unwrap();

        assert_eq!(engine.run(&first, true.into()).unwrap(), Value::from("first"));
        assert_eq!(engine.run(&second, true.into()).unwrap(), Value::from("second"));
    }

    #[rstest]
    fn test_recompiling_keeps_earlier_definitions(mut engine: Engine) {
        let first = engine.compile("def f(x) \"first\"\nf(1)").unwrap();
        assert_eq!(engine.run(&first, Value::Null).unwrap(), Value::from("first"));

        let second = engine.compile("def f(x) \"second\"\nf(1)").unwrap();
        assert_eq!(engine.run(&second, Value::Null).unwrap(), Value::from("second"));
        assert_eq!(engine.run(&first, Value::Null).unwrap(), Value::from("first"));
    }

    #[rstest]
    fn test_run_reports_location(mut engine: Engine) {
        let error = engine.eval("a: 1\nb: 1 / 0", Value::Null).unwrap_err();

        assert!(matches!(error.cause, InnerError::Eval(EvalError::ZeroDivision)));
        assert_eq!(error.source_code, "a: 1\nb: 1 / 0");
        assert_eq!(error.location.offset(), 8);
    }

    #[rstest]
    fn test_compile_error(mut engine: Engine) {
        let error = engine.compile("a: y").unwrap_err();
        assert!(matches!(error.cause, InnerError::Compile(_)));
    }

    #[rstest]
    fn test_cancelled_engine(mut engine: Engine) {
        let program = engine.compile("1 + 1").unwrap();

        engine.cancellation_token().cancel();
        assert!(matches!(
            engine.run(&program, Value::Null).unwrap_err().cause,
            InnerError::Eval(EvalError::Cancelled)
        ));

        engine.cancellation_token().reset();
        assert_eq!(engine.run(&program, Value::Null).unwrap(), Value::from(2));
    }

    #[rstest]
    fn test_compile_file(mut engine: Engine) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("double.wst");
        std::fs::write(&path, "$root * 2").unwrap();

        let uri = format!("file://{}", path.display());
        let program = engine.compile_file(&uri).unwrap();
        assert_eq!(engine.run(&program, 4.into()).unwrap(), Value::from(8));

        let bare = engine.compile_file(&path.display().to_string()).unwrap();
        assert_eq!(engine.run(&bare, 5.into()).unwrap(), Value::from(10));
    }

    #[rstest]
    fn test_compile_file_unknown_scheme(mut engine: Engine) {
        let error = engine.compile_file("gs://bucket/prog.wst").unwrap_err();
        assert!(matches!(error.cause, InnerError::Loader(LoaderError::UnknownScheme(_))));
    }

    #[rstest]
    fn test_run_does_not_mutate_input(mut engine: Engine) {
        let input = crate::json::parse(br#"{"xs": [1]}"#).unwrap();
        let program = engine.compile("var v: $root\nvar v.xs[]: 2\nv").unwrap();

        let output = engine.run(&program, input.clone()).unwrap();
        assert_eq!(output, crate::json::parse(br#"{"xs": [1, 2]}"#).unwrap());
        assert_eq!(input, crate::json::parse(br#"{"xs": [1]}"#).unwrap());
    }
}
