use std::fs;
use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use itertools::Itertools;
use miette::{IntoDiagnostic, miette};
use rayon::prelude::*;
use wst_lang::ir::Program;
use wst_lang::{Engine, Options, Value};

use crate::config::Config;

/// Stack for evaluation threads. Every wst call nests several Rust frames,
/// so the default thread stack is too small for the default frame limit.
const EVAL_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Parser, Debug, Default)]
#[command(name = "wst")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To reshape a JSON file:\n\
    wst 'name: $root.first + \" \" + $root.last' person.json\n\n\
    ## To read the program from a file:\n\
    wst -f mapping.wst a.json b.json\n\n\
    ## To show the compiled functions:\n\
    wst compile 'if $root then 1 else 2'")]
#[command(
    about = "wst reshapes JSON documents with a small mapping language.",
    long_about = None
)]
pub struct Cli {
    #[clap(flatten)]
    input: InputArgs,

    #[clap(flatten)]
    output: OutputArgs,

    #[clap(subcommand)]
    commands: Option<Commands>,

    /// Number of inputs to process before switching to parallel processing
    #[arg(short = 'P')]
    parallel_threshold: Option<usize>,

    #[arg(value_name = "PROGRAM OR FILE")]
    program: Option<String>,
    inputs: Option<Vec<PathBuf>>,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct InputArgs {
    /// Load the program from the file
    #[arg(short, long, default_value_t = false)]
    from_file: bool,

    /// Evaluate the program once against null instead of reading input
    #[arg(short = 'n', long, default_value_t = false)]
    null_input: bool,

    /// Seed for synthesized function names
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum call depth
    #[arg(long)]
    frame_limit: Option<usize>,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct OutputArgs {
    /// Print each result on a single line
    #[arg(short, long, default_value_t = false)]
    compact: bool,

    /// Write results to the file instead of stdout
    #[clap(short = 'o', long = "output", value_name = "FILE")]
    output_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the compiled functions of a program as JSON
    Compile {
        /// Load the program from the file
        #[arg(short, long, default_value_t = false)]
        from_file: bool,
        program: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Null,
    Stdin(String),
    File(PathBuf),
}

impl Input {
    fn label(&self) -> String {
        match self {
            Input::Null => "null input".to_string(),
            Input::Stdin(_) => "stdin".to_string(),
            Input::File(path) => path.display().to_string(),
        }
    }

    fn load(&self) -> miette::Result<Value> {
        let text = match self {
            Input::Null => return Ok(Value::Null),
            Input::Stdin(text) => text.clone(),
            Input::File(path) => fs::read_to_string(path)
                .into_diagnostic()
                .map_err(|e| e.wrap_err(format!("Failed to read {}", path.display())))?,
        };

        wst_lang::json::parse(text.as_bytes()).map_err(|e| wst_lang::Error::from_error(text, e).into())
    }
}

impl Cli {
    pub fn run(&self, config: &Config) -> miette::Result<()> {
        match &self.commands {
            Some(Commands::Compile { from_file, program }) => {
                let mut engine = self.create_engine(config);
                let program = Self::compile(&mut engine, program, *from_file)?;
                let json = serde_json::to_string_pretty(&program).into_diagnostic()?;
                self.write_all(&[json])
            }
            None => {
                let program = self.program.as_ref().ok_or_else(|| miette!("Program is required"))?;
                self.process_batch(config, program)
            }
        }
    }

    fn create_engine(&self, config: &Config) -> Engine {
        Engine::new(Options {
            seed: self.input.seed.or(config.seed),
            frame_limit: self.input.frame_limit.unwrap_or(config.frame_limit),
            ..Options::default()
        })
    }

    fn compile(engine: &mut Engine, program: &str, from_file: bool) -> miette::Result<Program> {
        let compiled = if from_file {
            engine.compile_file(program)
        } else {
            engine.compile(program)
        };

        let program = compiled?;
        tracing::debug!(
            package = %program.package,
            functions = program.functions.len(),
            "compiled program"
        );
        Ok(program)
    }

    fn read_inputs(&self) -> miette::Result<Vec<Input>> {
        if self.input.null_input {
            return Ok(vec![Input::Null]);
        }

        match &self.inputs {
            Some(files) if !files.is_empty() => Ok(files.iter().cloned().map(Input::File).collect()),
            _ if io::stdin().is_terminal() => Ok(vec![Input::Null]),
            _ => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text).into_diagnostic()?;
                Ok(vec![Input::Stdin(text)])
            }
        }
    }

    fn process_batch(&self, config: &Config, program: &str) -> miette::Result<()> {
        let mut engine = self.create_engine(config);
        let program = Self::compile(&mut engine, program, self.input.from_file)?;
        let inputs = self.read_inputs()?;

        let threshold = self.parallel_threshold.unwrap_or(config.parallel_threshold);
        let parallel = inputs.len() > threshold;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(if parallel { 0 } else { 1 })
            .stack_size(EVAL_STACK_SIZE)
            .build()
            .into_diagnostic()?;

        tracing::debug!(inputs = inputs.len(), parallel, "evaluating");

        let results = pool.install(|| {
            let evaluate = |input: &Input| {
                input
                    .load()
                    .and_then(|value| engine.run(&program, value).map_err(miette::Report::new))
                    .and_then(|value| self.render(&value))
            };

            if parallel {
                inputs.par_iter().map(evaluate).collect::<Vec<_>>()
            } else {
                inputs.iter().map(evaluate).collect::<Vec<_>>()
            }
        });

        let (outputs, failures): (Vec<_>, Vec<_>) = inputs.iter().zip(results).partition_map(|(input, result)| match result {
            Ok(output) => itertools::Either::Left(output),
            Err(report) => itertools::Either::Right((input.label(), report)),
        });

        self.write_all(&outputs)?;

        for (label, report) in &failures {
            tracing::warn!(input = %label, "evaluation failed");
            eprintln!("{report:?}");
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(miette!(
                "{} of {} input(s) failed: {}",
                failures.len(),
                inputs.len(),
                failures.iter().map(|(label, _)| label).join(", ")
            ))
        }
    }

    fn render(&self, value: &Value) -> miette::Result<String> {
        let bytes = if self.output.compact {
            wst_lang::json::serialize(value)
        } else {
            wst_lang::json::serialize_pretty(value)
        }
        .into_diagnostic()?;

        String::from_utf8(bytes).into_diagnostic()
    }

    fn write_all(&self, outputs: &[String]) -> miette::Result<()> {
        let stdout = io::stdout();
        let mut handle: Box<dyn Write> = match &self.output.output_file {
            Some(path) => Box::new(BufWriter::new(fs::File::create(path).into_diagnostic()?)),
            None => Box::new(BufWriter::new(stdout.lock())),
        };

        for output in outputs {
            writeln!(handle, "{output}").into_diagnostic()?;
        }

        handle.flush().into_diagnostic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use scopeguard::defer;

    fn create_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("Failed to write temp file");
        path
    }

    fn cli(program: &str, inputs: Vec<PathBuf>, output_file: &std::path::Path) -> Cli {
        Cli {
            output: OutputArgs {
                compact: true,
                output_file: Some(output_file.to_path_buf()),
            },
            program: Some(program.to_string()),
            inputs: Some(inputs),
            ..Cli::default()
        }
    }

    #[test]
    fn test_null_input() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let cli = Cli {
            input: InputArgs {
                null_input: true,
                ..Default::default()
            },
            ..cli("answer: 6 * 7", vec![], &output)
        };

        assert!(cli.run(&Config::default()).is_ok());
        assert_eq!(fs::read_to_string(&output).unwrap(), "{\"answer\":42}\n");
    }

    #[rstest]
    #[case::sequential(10)]
    #[case::parallel(0)]
    fn test_batch_keeps_input_order(#[case] threshold: usize) {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let inputs = (0..5)
            .map(|i| create_file(&dir, &format!("{i}.json"), &format!("{{\"n\": {i}}}")))
            .collect::<Vec<_>>();

        let cli = Cli {
            parallel_threshold: Some(threshold),
            ..cli("$root.n * 10", inputs, &output)
        };

        assert!(cli.run(&Config::default()).is_ok());
        assert_eq!(fs::read_to_string(&output).unwrap(), "0\n10\n20\n30\n40\n");
    }

    #[test]
    fn test_failing_input_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let inputs = vec![
            create_file(&dir, "a.json", "2"),
            create_file(&dir, "b.json", "0"),
            create_file(&dir, "c.json", "{not json"),
            create_file(&dir, "d.json", "5"),
        ];

        let error = cli("10 / $root", inputs, &output).run(&Config::default()).unwrap_err();

        assert!(error.to_string().starts_with("2 of 4 input(s) failed"));
        assert_eq!(fs::read_to_string(&output).unwrap(), "5\n2\n");
    }

    #[test]
    fn test_program_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let program = create_file(&dir, "double.wst", "doubled: $root * 2");
        let input = create_file(&dir, "in.json", "4");
        let output = dir.path().join("out.json");

        let cli = Cli {
            input: InputArgs {
                from_file: true,
                ..Default::default()
            },
            ..cli(&program.display().to_string(), vec![input], &output)
        };

        assert!(cli.run(&Config::default()).is_ok());
        assert_eq!(fs::read_to_string(&output).unwrap(), "{\"doubled\":8}\n");
    }

    #[test]
    fn test_compile_error_stops_before_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let input = create_file(&dir, "in.json", "1");

        let result = cli("out: undeclared", vec![input], &output).run(&Config::default());

        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_compile_command() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ir.json");
        defer! {
            if output.exists() {
                fs::remove_file(&output).expect("Failed to delete output file");
            }
        }

        let cli = Cli {
            input: InputArgs {
                seed: Some(1),
                ..Default::default()
            },
            output: OutputArgs {
                output_file: Some(output.clone()),
                ..Default::default()
            },
            commands: Some(Commands::Compile {
                from_file: false,
                program: "if $root then 1 else 2".to_string(),
            }),
            ..Cli::default()
        };

        assert!(cli.run(&Config::default()).is_ok());
        let ir: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(ir["package"], "main");
        assert_eq!(ir["functions"].as_array().map(|f| f.len()), Some(2));
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            seed: Some(1),
            frame_limit: 100,
            ..Config::default()
        };
        let cli = Cli {
            input: InputArgs {
                frame_limit: Some(32),
                ..Default::default()
            },
            ..Cli::default()
        };

        let engine = cli.create_engine(&config);
        assert_eq!(engine.options().seed, Some(1));
        assert_eq!(engine.options().frame_limit, 32);
    }
}
