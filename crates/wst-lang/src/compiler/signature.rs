use itertools::Itertools;
use smol_str::{SmolStr, format_smolstr};

use crate::ast::constants;

/// How a lambda's frame relates to the frame that invokes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaKind {
    /// Branches and bodies that read and write the enclosing variables.
    Implicit,
    /// Selector and iteration callbacks, isolated from the caller's frame.
    Lambda,
}

impl LambdaKind {
    pub fn inherits_parent_vars(self) -> bool {
        matches!(self, LambdaKind::Implicit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgType {
    Value,
    Closure {
        prefix: SmolStr,
        kind: LambdaKind,
        params: Vec<SmolStr>,
    },
}

impl ArgType {
    fn closure(prefix: &str, kind: LambdaKind, params: &[&str]) -> Self {
        ArgType::Closure {
            prefix: prefix.into(),
            kind,
            params: params.iter().map(|p| SmolStr::new(p)).collect(),
        }
    }
}

/// Transpile-time shape of a call. With `synchronized`, the closure receives
/// one free parameter per remaining argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    args: Vec<ArgType>,
    variadic: bool,
    synchronized: bool,
}

const LAMBDA_PREFIX: &str = "lambda_";

impl Signature {
    fn fixed(args: Vec<ArgType>) -> Self {
        Signature {
            args,
            variadic: false,
            synchronized: false,
        }
    }

    fn variadic(args: Vec<ArgType>) -> Self {
        Signature {
            args,
            variadic: true,
            synchronized: false,
        }
    }

    pub fn supports_num_args(&self, n: usize) -> bool {
        self.args.len() == n || (self.variadic && n + 1 >= self.args.len())
    }

    /// Argument types beyond the declared list repeat the last one.
    pub fn arg_type(&self, index: usize, num_args: usize) -> ArgType {
        let arg = self
            .args
            .get(index)
            .or_else(|| self.args.last())
            .cloned()
            .unwrap_or(ArgType::Value);

        match arg {
            ArgType::Closure { prefix, kind, .. } if self.synchronized => ArgType::Closure {
                prefix,
                kind,
                params: synchronized_params(num_args.saturating_sub(1)),
            },
            arg => arg,
        }
    }

    pub fn accepted(&self) -> String {
        if self.variadic {
            format!("at least {}", self.args.len().saturating_sub(1))
        } else {
            self.args.len().to_string()
        }
    }

    /// All overloads of `name` as seen by the transpiler. Unknown functions
    /// take any number of plain values.
    pub fn lookup(package: Option<&str>, name: &str) -> Vec<Signature> {
        if package.is_some_and(|p| p != constants::BUILTINS_PACKAGE) {
            return vec![Signature::variadic(vec![ArgType::Value])];
        }

        use ArgType::Value;
        use LambdaKind::{Implicit, Lambda};

        match name {
            constants::TERNARY => vec![
                Signature::fixed(vec![
                    Value,
                    ArgType::closure("ternary-then_", Implicit, &[]),
                ]),
                Signature::fixed(vec![
                    Value,
                    ArgType::closure("ternary-then_", Implicit, &[]),
                    ArgType::closure("ternary-else_", Implicit, &[]),
                ]),
            ],
            constants::AND | constants::OR => vec![Signature::variadic(vec![ArgType::closure(
                &format!("infix-operator-{name}_"),
                Implicit,
                &[],
            )])],
            constants::ITERATE => vec![Signature {
                args: vec![ArgType::closure(LAMBDA_PREFIX, Lambda, &[]), Value],
                variadic: true,
                synchronized: true,
            }],
            constants::WITH_ERROR | constants::RETHROW_ERROR => vec![Signature::fixed(vec![
                ArgType::closure(LAMBDA_PREFIX, Implicit, &[]),
                ArgType::closure(LAMBDA_PREFIX, Implicit, &["$error"]),
            ])],
            constants::TIMED => vec![Signature::fixed(vec![
                ArgType::closure(LAMBDA_PREFIX, Implicit, &[]),
                ArgType::closure(LAMBDA_PREFIX, Implicit, &["$time"]),
            ])],
            constants::WITH_SIDES => vec![Signature::fixed(vec![ArgType::closure(
                LAMBDA_PREFIX,
                Implicit,
                &[],
            )])],
            constants::WITH_TIMEOUT => vec![Signature::fixed(vec![
                ArgType::closure(LAMBDA_PREFIX, Implicit, &[]),
                Value,
                ArgType::closure(LAMBDA_PREFIX, Implicit, &[]),
            ])],
            name if constants::SELECTORS.contains(&name) => {
                let prefix = format_smolstr!("selector-{}_", name.to_lowercase());
                vec![Signature::fixed(vec![
                    Value,
                    ArgType::closure(&prefix, Lambda, &["$"]),
                ])]
            }
            constants::REDUCE => vec![
                Signature::fixed(vec![
                    Value,
                    ArgType::closure(LAMBDA_PREFIX, Lambda, &["$acc", "$cur"]),
                ]),
                Signature::fixed(vec![
                    Value,
                    Value,
                    ArgType::closure(LAMBDA_PREFIX, Lambda, &["$acc", "$cur"]),
                ]),
            ],
            constants::JOIN => vec![Signature::fixed(vec![
                Value,
                Value,
                ArgType::closure(LAMBDA_PREFIX, Lambda, &["$left", "$right"]),
            ])],
            _ => vec![Signature::variadic(vec![Value])],
        }
    }

    pub fn describe_accepted(signatures: &[Signature]) -> String {
        signatures.iter().map(Signature::accepted).join(" or ")
    }
}

fn synchronized_params(count: usize) -> Vec<SmolStr> {
    if count == 1 {
        vec![SmolStr::new("$")]
    } else {
        (1..=count).map(|i| format_smolstr!("${i}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::ternary_two(constants::TERNARY, 2, true)]
    #[case::ternary_three(constants::TERNARY, 3, true)]
    #[case::ternary_four(constants::TERNARY, 4, false)]
    #[case::where_two(constants::WHERE, 2, true)]
    #[case::where_one(constants::WHERE, 1, false)]
    #[case::and_any("and", 3, true)]
    #[case::reduce_three(constants::REDUCE, 3, true)]
    #[case::unknown_none("anything", 0, true)]
    #[case::iterate_none(constants::ITERATE, 0, false)]
    fn test_supports_num_args(#[case] name: &str, #[case] n: usize, #[case] expected: bool) {
        assert_eq!(
            Signature::lookup(None, name)
                .iter()
                .any(|s| s.supports_num_args(n)),
            expected
        );
    }

    #[rstest]
    #[case::single(2, vec!["$"])]
    #[case::zipped(4, vec!["$1", "$2", "$3"])]
    fn test_synchronized_params(#[case] num_args: usize, #[case] expected: Vec<&str>) {
        let signature = &Signature::lookup(None, constants::ITERATE)[0];

        match signature.arg_type(0, num_args) {
            ArgType::Closure { params, kind, .. } => {
                assert_eq!(params, expected);
                assert_eq!(kind, LambdaKind::Lambda);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(signature.arg_type(1, num_args), ArgType::Value);
    }

    #[test]
    fn test_selector_prefix_is_lowercased() {
        let signature = &Signature::lookup(None, constants::SORT_BY_DESCENDING)[0];
        assert!(matches!(
            signature.arg_type(1, 2),
            ArgType::Closure { prefix, .. } if prefix == "selector-sortbydescending_"
        ));
    }

    #[test]
    fn test_qualified_user_function_is_plain() {
        let signatures = Signature::lookup(Some("main"), constants::WHERE);
        assert_eq!(signatures[0].arg_type(1, 2), ArgType::Value);
    }

    #[test]
    fn test_describe_accepted() {
        assert_eq!(
            Signature::describe_accepted(&Signature::lookup(None, constants::TERNARY)),
            "2 or 3"
        );
    }
}
