use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use rule_engine::api::{self, CombineRulesResponse, CreateRuleRequest, EvaluateRuleRequest, RuleSource};
use rule_engine::error::{self, RuleError};
use rule_engine::{LogicalOperator, Node, Record, combine_all, logging};

#[derive(Parser)]
#[command(
    name = "rule-engine",
    about = "Compile, combine and evaluate rules such as \"age > 30 AND department == 'Sales'\".",
    version
)]
struct Cli {
    /// Set log level (trace, debug, info, warn, error) or a filter directive
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a rule and print its tree as JSON
    Parse {
        rule: String,
    },

    /// Combine rules under one operator, folding left in the given order
    Combine {
        /// AND or OR
        #[arg(long, short, default_value = "AND", value_parser = parse_operator)]
        operator: LogicalOperator,

        /// Rule text, or a JSON tree printed by an earlier command
        #[arg(required = true, value_name = "RULE")]
        rules: Vec<String>,
    },

    /// Evaluate a rule against a JSON record
    Evaluate {
        /// Rule text
        #[arg(required_unless_present = "ast", conflicts_with = "ast")]
        rule: Option<String>,

        /// JSON tree to evaluate instead of rule text
        #[arg(long, value_name = "JSON")]
        ast: Option<String>,

        /// Record as a flat JSON object, e.g. '{"age": 35, "department": "Sales"}'
        #[arg(long, short, value_name = "JSON")]
        data: String,

        /// Also print every comparison that was evaluated
        #[arg(long)]
        trace: bool,
    },
}

fn parse_operator(s: &str) -> Result<LogicalOperator, String> {
    s.parse::<LogicalOperator>()
        .map_err(|s| format!("expected AND or OR, got '{}'", s))
}

/// An error together with the text it points into.
#[derive(Debug)]
struct Failure {
    source: String,
    error: RuleError,
}

impl Failure {
    fn new(source: &str, error: impl Into<RuleError>) -> Self {
        Failure { source: source.to_string(), error: error.into() }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::setup_logging(cli.log_level.as_deref()) {
        eprintln!("Failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    match execute(cli.command) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            error::print_error("rule", &failure.source, &failure.error);
            ExitCode::FAILURE
        }
    }
}

/// Runs one command and returns what to print on stdout.
fn execute(command: Command) -> Result<String, Failure> {
    match command {
        Command::Parse { rule } => {
            let response = api::create_rule(CreateRuleRequest { rule: rule.clone() })
                .map_err(|e| Failure::new(&rule, e))?;
            to_json(&response)
        }
        Command::Combine { operator, rules } => {
            let exprs = rules
                .iter()
                .enumerate()
                .map(|(index, arg)| {
                    rule_source(arg)
                        .and_then(|source| source.into_expr(index))
                        .map_err(|e| Failure::new(arg, e))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let combined = combine_all(exprs, operator).map_err(|e| Failure::new("", e))?;
            to_json(&CombineRulesResponse { combined_ast: Node::from(&combined) })
        }
        Command::Evaluate { rule, ast, data, trace } => {
            let ast = match ast {
                Some(json) => serde_json::from_str::<Node>(&json).map_err(|e| Failure::new(&json, e))?,
                None => {
                    // clap requires one of the two
                    let rule = rule.unwrap_or_default();
                    let expr = rule_engine::compile(&rule).map_err(|e| Failure::new(&rule, e))?;
                    Node::from(&expr)
                }
            };
            let data: Record = serde_json::from_str(&data).map_err(|e| Failure::new(&data, e))?;
            debug!(fields = data.len(), "read record");

            let response = api::evaluate_rule(EvaluateRuleRequest { ast, data, trace })
                .map_err(|e| Failure::new("", e))?;
            to_json(&response)
        }
    }
}

/// Arguments that look like a JSON object are trees, anything else is rule text.
fn rule_source(arg: &str) -> Result<RuleSource, RuleError> {
    if arg.trim_start().starts_with('{') {
        Ok(RuleSource::Ast(serde_json::from_str::<Node>(arg)?))
    } else {
        Ok(RuleSource::Text(arg.to_string()))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, Failure> {
    serde_json::to_string_pretty(value).map_err(|e| Failure::new("", e))
}
