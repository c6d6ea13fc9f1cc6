use assert_cmd::cargo;
use rstest::rstest;
use scopeguard::defer;
use std::io::Write;
use std::{fs::File, path::PathBuf};

pub fn create_file(name: &str, content: &str) -> (PathBuf, PathBuf) {
    let temp_dir = std::env::temp_dir();
    let temp_file_path = temp_dir.join(name);
    let mut file = File::create(&temp_file_path).expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");

    (temp_dir, temp_file_path)
}

#[test]
fn test_cli_run_with_stdin() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("wst");

    let assert = cmd
        .arg("-c")
        .arg(r#"name: $root.first + " " + $root.last"#)
        .write_stdin(r#"{"first": "Ada", "last": "Lovelace"}"#)
        .assert();
    assert.success().code(0).stdout("{\"name\":\"Ada Lovelace\"}\n");

    Ok(())
}

#[rstest]
#[case::null_input(vec!["-c", "-n", "sum: 1 + 2"], "", Some("{\"sum\":3}\n"))]
#[case::pretty(vec!["-n", "a.b: 1"], "", Some("{\n  \"a\": {\n    \"b\": 1\n  }\n}\n"))]
#[case::selectors(
    vec!["-c", "$root[where $.n > 1][sortByDescending $.n][*].n"],
    r#"[{"n": 2}, {"n": 1}, {"n": 5}]"#,
    Some("[5,2]\n")
)]
#[case::def_and_branches(
    vec!["-c", "def sign(x) if x < 0 then \"neg\" else if x == 0 then \"zero\" else \"pos\"\niterate(sign($), $root)"],
    "[-3, 0, 8]",
    Some("[\"neg\",\"zero\",\"pos\"]\n")
)]
#[case::seeded(vec!["-c", "-n", "--seed", "7", "if true then { ok: true }"], "", Some("{\"ok\":true}\n"))]
#[case::frame_limit(vec!["-c", "-n", "--frame-limit", "200", "def f(n) if n == 0 then 0 else f(n - 1)\nf(50)"], "", Some("0\n"))]
fn test_cli_commands(
    #[case] args: Vec<&str>,
    #[case] input: &str,
    #[case] expected_output: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("wst");
    let mut assert = cmd.args(args);

    if !input.is_empty() {
        assert = assert.write_stdin(input);
    }

    let assert = assert.assert();

    if let Some(output) = expected_output {
        assert.success().code(0).stdout(output.to_owned());
    } else {
        assert.success().code(0);
    }

    Ok(())
}

#[test]
fn test_cli_multiple_files_in_parallel() -> Result<(), Box<dyn std::error::Error>> {
    let files = (0..4)
        .map(|i| create_file(&format!("wst_parallel_{i}.json"), &format!("{{\"id\": {i}}}")).1)
        .collect::<Vec<_>>();
    let cleanup = files.clone();

    defer! {
        for file in &cleanup {
            if file.exists() {
                std::fs::remove_file(file).expect("Failed to delete temp file");
            }
        }
    }

    let mut cmd = cargo::cargo_bin_cmd!("wst");
    let assert = cmd
        .args(["-c", "-P", "0", "next: $root.id + 1"])
        .args(&files)
        .assert();
    assert
        .success()
        .code(0)
        .stdout("{\"next\":1}\n{\"next\":2}\n{\"next\":3}\n{\"next\":4}\n");

    Ok(())
}

#[test]
fn test_cli_failing_input_sets_exit_code() -> Result<(), Box<dyn std::error::Error>> {
    let (_, good) = create_file("wst_good.json", "4");
    let (_, bad) = create_file("wst_bad.json", "0");
    let cleanup = [good.clone(), bad.clone()];

    defer! {
        for file in &cleanup {
            if file.exists() {
                std::fs::remove_file(file).expect("Failed to delete temp file");
            }
        }
    }

    let mut cmd = cargo::cargo_bin_cmd!("wst");
    let output = cmd.args(["-c", "8 / $root"]).arg(&bad).arg(&good).output()?;

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8(output.stdout)?, "2\n");
    assert!(String::from_utf8(output.stderr)?.contains("Divided by 0"));

    Ok(())
}

#[test]
fn test_cli_program_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_, program) = create_file("wst_program.wst", "var total: $root.a + $root.b\ntotal: total");
    let program_clone = program.clone();

    defer! {
        if program_clone.exists() {
            std::fs::remove_file(&program_clone).expect("Failed to delete temp file");
        }
    }

    let mut cmd = cargo::cargo_bin_cmd!("wst");
    let assert = cmd
        .arg("-c")
        .arg("-f")
        .arg(program.to_string_lossy().to_string())
        .write_stdin(r#"{"a": 1, "b": 2}"#)
        .assert();
    assert.success().code(0).stdout("{\"total\":3}\n");

    Ok(())
}

#[test]
fn test_cli_compile_command() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("wst");
    let output = cmd
        .args(["--seed", "1", "compile", "if $root then 1 else 2"])
        .output()?;

    assert!(output.status.success());
    let ir: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(ir["package"], "main");
    assert!(ir["root"].is_object());

    Ok(())
}

#[rstest]
#[case::lexer("a: 1 @ 2", "LexerError::UnexpectedCharacter")]
#[case::undeclared("out: nope", "CompileError::UndeclaredVariable")]
fn test_cli_reports_diagnostics(#[case] program: &str, #[case] code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = cargo::cargo_bin_cmd!("wst");
    let output = cmd.args(["-n", program]).output()?;

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)?.contains(code));

    Ok(())
}
