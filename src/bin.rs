use std::io::{stdin, stdout, BufRead, BufReader, Write};

use anyhow::{anyhow, Context, Result};
use calc_lib::{AstPrinter, Dynamic, Environment, ExprVisitor, ParseOptions};
use structopt::StructOpt;

/// Evaluate an expression against a set of variable bindings.
#[derive(StructOpt)]
struct Cli {
    /// Expression to evaluate. Reads expressions line by line when omitted.
    expression: Option<String>,

    /// Variable binding as name=value. Values are read as bool, integer,
    /// float or "quoted string", falling back to a bare string.
    #[structopt(short = "v", long = "var", parse(try_from_str = parse_binding))]
    vars: Vec<(String, Dynamic)>,

    /// Print the parsed tree instead of evaluating it.
    #[structopt(long)]
    ast: bool,

    /// Deepest nesting accepted by the parser.
    #[structopt(long, default_value = "256")]
    max_depth: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Cli::from_args();
    let options = ParseOptions {
        max_depth: args.max_depth,
    };
    let env: Environment = args.vars.into_iter().collect();

    match args.expression {
        Some(source) => {
            println!("{}", run(&source, &env, &options, args.ast)?);
            Ok(())
        }
        None => run_prompt(&env, &options, args.ast),
    }
}

fn run(source: &str, env: &Environment, options: &ParseOptions, ast: bool) -> Result<String> {
    let expr = calc_lib::parse_with(source, options)
        .with_context(|| format!("could not parse {:?}", source))?;
    if ast {
        return Ok(AstPrinter.visit_expr(&expr));
    }
    let value = calc_lib::evaluate(&expr, env)
        .with_context(|| format!("could not evaluate {:?}", source))?;
    Ok(value.to_string())
}

fn run_prompt(env: &Environment, options: &ParseOptions, ast: bool) -> Result<()> {
    let mut reader = BufReader::new(stdin());
    loop {
        let mut buffer = String::new();
        print!("> ");
        stdout().flush().with_context(|| "could not flush stdout")?;
        reader.read_line(&mut buffer)?;
        if buffer.is_empty() {
            return Ok(());
        };
        if buffer.trim().is_empty() {
            continue;
        }
        match run(buffer.trim_end(), env, options, ast) {
            Ok(output) => println!("{}", output),
            Err(err) => eprintln!("{:#}", err),
        }
    }
}

fn parse_binding(arg: &str) -> Result<(String, Dynamic)> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got {:?}", arg))?;
    let value = match raw {
        "true" => Dynamic::Bool(true),
        "false" => Dynamic::Bool(false),
        _ => {
            if let Ok(int) = raw.parse::<i64>() {
                Dynamic::Int(int)
            } else if let Some(float) = parse_decimal(raw) {
                Dynamic::Float(float)
            } else if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
                Dynamic::Str(raw[1..raw.len() - 1].to_owned())
            } else {
                Dynamic::Str(raw.to_owned())
            }
        }
    };
    Ok((name.trim().to_owned(), value))
}

/// Floats use the same `digits.digits` form as float literals, with an
/// optional sign, so words like `inf` or `nan` stay strings.
fn parse_decimal(raw: &str) -> Option<f64> {
    let unsigned = raw.strip_prefix('-').unwrap_or(raw);
    let (whole, fraction) = unsigned.split_once('.')?;
    let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if is_digits(whole) && is_digits(fraction) {
        raw.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_typed() {
        assert_eq!(
            parse_binding("a=1").unwrap(),
            ("a".to_owned(), Dynamic::Int(1))
        );
        assert_eq!(
            parse_binding("b=2.5").unwrap(),
            ("b".to_owned(), Dynamic::Float(2.5))
        );
        assert_eq!(
            parse_binding("c=true").unwrap(),
            ("c".to_owned(), Dynamic::Bool(true))
        );
        assert_eq!(
            parse_binding(r#"d="42""#).unwrap(),
            ("d".to_owned(), Dynamic::Str("42".into()))
        );
        assert_eq!(
            parse_binding("e=a=b").unwrap(),
            ("e".to_owned(), Dynamic::Str("a=b".into()))
        );
        assert!(parse_binding("novalue").is_err());
    }

    #[test]
    fn only_decimal_text_becomes_a_float() {
        assert_eq!(
            parse_binding("t=-0.25").unwrap(),
            ("t".to_owned(), Dynamic::Float(-0.25))
        );
        for word in ["nan", "NaN", "inf", "-inf", "infinity", "1e5", "1.", ".5"] {
            assert_eq!(
                parse_binding(&format!("w={}", word)).unwrap(),
                ("w".to_owned(), Dynamic::Str(word.into()))
            );
        }
    }

    #[test]
    fn run_evaluates_or_prints() {
        let env = Environment::new().with("a", 89.5).with("b", 2);
        let options = ParseOptions::default();
        assert_eq!(run("a + 1 * b", &env, &options, false).unwrap(), "91.5");
        assert_eq!(run("a + 1 * b", &env, &options, true).unwrap(), "(+ a (* 1 b))");
        assert!(run("a +", &env, &options, false).is_err());
        assert!(run("zzz", &env, &options, false).is_err());
    }
}
