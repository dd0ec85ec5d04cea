use std::borrow::Cow;
use std::cmp::Ordering;

use crate::{
    env::{Dynamic, Environment},
    error::EvalError,
    expr::{BinaryOp, Expr, UnaryOp},
    value::Value,
    visitor::ExprVisitor,
};

type Result<T> = std::result::Result<T, EvalError>;

/// Walks a tree against one set of bindings. Holds no state besides the
/// borrowed environment, so a fresh one is cheap to build per evaluation.
pub struct Interpreter<'e> {
    env: &'e Environment,
}

impl<'e> Interpreter<'e> {
    pub fn new(env: &'e Environment) -> Self {
        Interpreter { env }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value> {
        self.visit_expr(expr)
    }

    fn lookup(&self, name: &str) -> Result<&'e Dynamic> {
        let env: &'e Environment = self.env;
        env.get(name)
            .ok_or_else(|| EvalError::UndefinedIdentifier(name.to_owned()))
    }

    /// Evaluates the base of an index or member expression. Bindings, and
    /// elements or fields reached through them, are returned as-is so that
    /// nested lists and records can be addressed.
    fn resolve(&self, expr: &Expr) -> Result<Cow<'e, Dynamic>> {
        match expr {
            Expr::Identifier(name) => self.lookup(name).map(Cow::Borrowed),
            Expr::Paren(inner) => self.resolve(inner),
            Expr::Index(base, index) => self.index(base, index),
            Expr::Member(base, name) => self.member(base, name),
            _ => Ok(Cow::Owned(self.visit_expr(expr)?.into())),
        }
    }

    fn index(&self, base: &Expr, index: &Expr) -> Result<Cow<'e, Dynamic>> {
        let base = self.resolve(base)?;
        let position = match self.visit_expr(index)? {
            Value::Integer(position) => position,
            other => return Err(EvalError::InvalidIndex { kind: other.kind() }),
        };
        match base {
            Cow::Borrowed(base) => element(base, position),
            Cow::Owned(base) => {
                element(&base, position).map(|item| Cow::Owned(item.into_owned()))
            }
        }
    }

    fn member(&self, base: &Expr, name: &str) -> Result<Cow<'e, Dynamic>> {
        match self.resolve(base)? {
            Cow::Borrowed(base) => field(base, name).map(Cow::Borrowed),
            Cow::Owned(base) => field(&base, name).map(|value| Cow::Owned(value.clone())),
        }
    }
}

impl ExprVisitor<Result<Value>> for Interpreter<'_> {
    fn visit_expr(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(literal.value.clone()),
            Expr::Identifier(name) => self.lookup(name)?.to_value(name),
            Expr::Paren(inner) => self.visit_expr(inner),
            Expr::Unary(operator, operand) => {
                let value = self.visit_expr(operand)?;
                unary(*operator, value)
            }
            Expr::Binary(left, operator, right) => {
                // both sides are always evaluated, even for && and ||
                let left_val = self.visit_expr(left)?;
                let right_val = self.visit_expr(right)?;
                binary(*operator, left_val, right_val)
            }
            Expr::Index(base, index) => self.index(base, index)?.to_value("list element"),
            Expr::Member(base, name) => self.member(base, name)?.to_value(name),
        }
    }
}

fn element(base: &Dynamic, position: i64) -> Result<Cow<'_, Dynamic>> {
    match base {
        Dynamic::List(items) => {
            let idx = checked_index(position, items.len())?;
            Ok(Cow::Borrowed(&items[idx]))
        }
        Dynamic::Str(text) => {
            let len = text.chars().count();
            let idx = checked_index(position, len)?;
            text.chars()
                .nth(idx)
                .map(|ch| Cow::Owned(Dynamic::Char(ch)))
                .ok_or(EvalError::IndexOutOfBounds {
                    index: position,
                    len,
                })
        }
        other => Err(EvalError::NotIndexable { kind: other.kind() }),
    }
}

fn field<'d>(base: &'d Dynamic, name: &str) -> Result<&'d Dynamic> {
    match base {
        Dynamic::Record(fields) => fields
            .get(name)
            .ok_or_else(|| EvalError::UndefinedMember(name.to_owned())),
        other => Err(EvalError::NotARecord {
            member: name.to_owned(),
            kind: other.kind(),
        }),
    }
}

fn checked_index(position: i64, len: usize) -> Result<usize> {
    usize::try_from(position)
        .ok()
        .filter(|&idx| idx < len)
        .ok_or(EvalError::IndexOutOfBounds {
            index: position,
            len,
        })
}

fn unary(operator: UnaryOp, value: Value) -> Result<Value> {
    match (operator, value) {
        (UnaryOp::Plus, value @ (Value::Integer(_) | Value::Float(_))) => Ok(value),
        (UnaryOp::Minus, Value::Integer(x)) => {
            x.checked_neg()
                .map(Value::Integer)
                .ok_or(EvalError::ArithmeticOverflow {
                    operator: operator.into(),
                })
        }
        (UnaryOp::Minus, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Not, Value::Bool(x)) => Ok(Value::Bool(!x)),
        (operator, value) => Err(EvalError::InvalidUnaryOperand {
            operator,
            kind: value.kind(),
        }),
    }
}

fn mismatch(operator: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::InvalidBinaryOperands {
        operator,
        left: left.kind(),
        right: right.kind(),
    }
}

fn binary(operator: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match operator {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(operator, left, right)
        }
        BinaryOp::Rem
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Shl
        | BinaryOp::Shr => match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => integer_op(operator, a, b),
            (left, right) => Err(mismatch(operator, &left, &right)),
        },
        BinaryOp::And | BinaryOp::Or => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => {
                Ok(Value::Bool(if operator == BinaryOp::And {
                    a && b
                } else {
                    a || b
                }))
            }
            (left, right) => Err(mismatch(operator, &left, &right)),
        },
        BinaryOp::Greater
        | BinaryOp::Less
        | BinaryOp::GreaterEqual
        | BinaryOp::LessEqual
        | BinaryOp::Equal
        | BinaryOp::NotEqual => compare(operator, &left, &right),
        BinaryOp::Comma => Err(EvalError::UnsupportedOperator { operator }),
    }
}

/// `+ - * /` with integer to float promotion; `+` also joins strings.
fn arithmetic(operator: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_op(operator, a, b),
        (Value::Float(a), Value::Float(b)) => float_op(operator, a, b),
        (Value::Integer(a), Value::Float(b)) => float_op(operator, a as f32, b),
        (Value::Float(a), Value::Integer(b)) => float_op(operator, a, b as f32),
        (Value::String(a), Value::String(b)) if operator == BinaryOp::Add => {
            Ok(Value::String(a + &b))
        }
        (left, right) => Err(mismatch(operator, &left, &right)),
    }
}

fn integer_op(operator: BinaryOp, a: i64, b: i64) -> Result<Value> {
    if matches!(operator, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
        return Err(EvalError::DivisionByZero { operator });
    }
    let shift = || u32::try_from(b).ok();
    let result = match operator {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => a.checked_div(b),
        // only i64::MIN % -1 overflows, and its remainder is 0
        BinaryOp::Rem => Some(a.wrapping_rem(b)),
        BinaryOp::BitAnd => Some(a & b),
        BinaryOp::BitOr => Some(a | b),
        BinaryOp::BitXor => Some(a ^ b),
        BinaryOp::Shl => shift().and_then(|s| a.checked_shl(s)),
        BinaryOp::Shr => shift().and_then(|s| a.checked_shr(s)),
        _ => {
            return Err(mismatch(
                operator,
                &Value::Integer(a),
                &Value::Integer(b),
            ))
        }
    };
    result
        .map(Value::Integer)
        .ok_or(EvalError::ArithmeticOverflow {
            operator: operator.into(),
        })
}

fn float_op(operator: BinaryOp, a: f32, b: f32) -> Result<Value> {
    let result = match operator {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero { operator });
            }
            a / b
        }
        _ => return Err(mismatch(operator, &Value::Float(a), &Value::Float(b))),
    };
    Ok(Value::Float(result))
}

/// Orders numbers (with promotion), strings and chars; bools only support
/// `==` and `!=`. Unordered floats (NaN) compare unequal to everything.
fn compare(operator: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let equality_only = matches!(operator, BinaryOp::Equal | BinaryOp::NotEqual);
    let ordering = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Integer(a), Value::Float(b)) => (*a as f32).partial_cmp(b),
        (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f32)),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        (Value::Char(a), Value::Char(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) if equality_only => a.partial_cmp(b),
        _ => return Err(mismatch(operator, left, right)),
    };

    let result = match operator {
        BinaryOp::Greater => ordering == Some(Ordering::Greater),
        BinaryOp::Less => ordering == Some(Ordering::Less),
        BinaryOp::GreaterEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        BinaryOp::LessEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Equal => ordering == Some(Ordering::Equal),
        BinaryOp::NotEqual => ordering != Some(Ordering::Equal),
        _ => return Err(mismatch(operator, left, right)),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Operator;
    use crate::parser::{ParseOptions, Parser};

    fn eval_in(source: &str, env: &Environment) -> Result<Value> {
        let expr = Parser::new(source, &ParseOptions::default())
            .parse()
            .unwrap();
        Interpreter::new(env).evaluate(&expr)
    }

    fn eval(source: &str) -> Result<Value> {
        eval_in(source, &Environment::new())
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(eval("1 + 2"), Ok(Value::Integer(3)));
        assert_eq!(eval("2 - 5 * 3"), Ok(Value::Integer(-13)));
        assert_eq!(eval("7 / 2"), Ok(Value::Integer(3)));
        assert_eq!(eval("-7 / 2"), Ok(Value::Integer(-3)));
        assert_eq!(eval("7 % 3"), Ok(Value::Integer(1)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(Value::Integer(9)));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        assert_eq!(eval("7.0 / 2"), Ok(Value::Float(3.5)));
        assert_eq!(eval("1 + 0.5"), Ok(Value::Float(1.5)));
        assert_eq!(eval("3 - 0.5"), Ok(Value::Float(2.5)));
        assert_eq!(eval("1.5 * 2"), Ok(Value::Float(3.0)));
    }

    #[test]
    fn strings_concatenate_only_with_plus() {
        assert_eq!(eval(r#""ab" + "cd""#), Ok(Value::String("abcd".into())));
        assert_eq!(
            eval(r#""ab" - "cd""#),
            Err(EvalError::InvalidBinaryOperands {
                operator: BinaryOp::Sub,
                left: "string",
                right: "string"
            })
        );
        assert_eq!(
            eval(r#""ab" + 1"#),
            Err(EvalError::InvalidBinaryOperands {
                operator: BinaryOp::Add,
                left: "string",
                right: "integer"
            })
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let div = Err(EvalError::DivisionByZero {
            operator: BinaryOp::Div,
        });
        assert_eq!(eval("1 / 0"), div);
        assert_eq!(eval("1.0 / 0"), div);
        assert_eq!(eval("1 / 0.0"), div);
        assert_eq!(
            eval("1 % 0"),
            Err(EvalError::DivisionByZero {
                operator: BinaryOp::Rem
            })
        );
    }

    #[test]
    fn modulus_needs_integers() {
        assert!(matches!(
            eval("7.5 % 2"),
            Err(EvalError::InvalidBinaryOperands {
                operator: BinaryOp::Rem,
                ..
            })
        ));
    }

    #[test]
    fn integer_overflow_is_reported() {
        let env = Environment::new().with("min", i64::MIN).with("max", i64::MAX);
        assert!(matches!(
            eval_in("max + 1", &env),
            Err(EvalError::ArithmeticOverflow { .. })
        ));
        assert!(matches!(
            eval_in("min / -1", &env),
            Err(EvalError::ArithmeticOverflow { .. })
        ));
        assert!(matches!(
            eval_in("-min", &env),
            Err(EvalError::ArithmeticOverflow { .. })
        ));
        assert!(matches!(
            eval("1 << 64"),
            Err(EvalError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn overflow_names_the_operator() {
        let env = Environment::new().with("min", i64::MIN).with("max", i64::MAX);
        assert_eq!(
            eval_in("max * 2", &env),
            Err(EvalError::ArithmeticOverflow {
                operator: Operator::Binary(BinaryOp::Mul)
            })
        );
        let negated = eval_in("-min", &env).unwrap_err();
        assert_eq!(
            negated,
            EvalError::ArithmeticOverflow {
                operator: Operator::Unary(UnaryOp::Minus)
            }
        );
        assert_eq!(negated.to_string(), "integer overflow in unary -");
    }

    #[test]
    fn remainder_of_min_by_minus_one_is_zero() {
        let env = Environment::new().with("min", i64::MIN);
        assert_eq!(eval_in("min % -1", &env), Ok(Value::Integer(0)));
        assert_eq!(eval_in("min % 2", &env), Ok(Value::Integer(0)));
        assert_eq!(eval_in("-7 % 3", &env), Ok(Value::Integer(-1)));
    }

    #[test]
    fn bitwise_operators_on_integers() {
        assert_eq!(eval("6 & 3"), Ok(Value::Integer(2)));
        assert_eq!(eval("6 | 3"), Ok(Value::Integer(7)));
        assert_eq!(eval("6 ^ 3"), Ok(Value::Integer(5)));
        assert_eq!(eval("1 << 4"), Ok(Value::Integer(16)));
        assert_eq!(eval("-16 >> 2"), Ok(Value::Integer(-4)));
        assert!(matches!(
            eval("true & false"),
            Err(EvalError::InvalidBinaryOperands { .. })
        ));
    }

    #[test]
    fn unary_operators() {
        assert_eq!(eval("- - 4"), Ok(Value::Integer(4)));
        assert_eq!(eval("-2.5"), Ok(Value::Float(-2.5)));
        assert_eq!(eval("+3"), Ok(Value::Integer(3)));
        assert_eq!(eval("!true"), Ok(Value::Bool(false)));
        assert_eq!(eval("!!false"), Ok(Value::Bool(false)));
        assert_eq!(
            eval("!1"),
            Err(EvalError::InvalidUnaryOperand {
                operator: UnaryOp::Not,
                kind: "integer"
            })
        );
        assert_eq!(
            eval(r#"-"a""#),
            Err(EvalError::InvalidUnaryOperand {
                operator: UnaryOp::Minus,
                kind: "string"
            })
        );
        assert_eq!(
            eval("~1"),
            Err(EvalError::InvalidUnaryOperand {
                operator: UnaryOp::BitNot,
                kind: "integer"
            })
        );
        assert_eq!(
            eval("^1"),
            Err(EvalError::InvalidUnaryOperand {
                operator: UnaryOp::Xor,
                kind: "integer"
            })
        );
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("1 < 2 && 3 > 4"), Ok(Value::Bool(false)));
        assert_eq!(eval("2 >= 2"), Ok(Value::Bool(true)));
        assert_eq!(eval("2 <= 1.5"), Ok(Value::Bool(false)));
        assert_eq!(eval("2 == 2.0"), Ok(Value::Bool(true)));
        assert_eq!(eval("true != false"), Ok(Value::Bool(true)));
        assert_eq!(eval("true == true"), Ok(Value::Bool(true)));
        assert_eq!(eval(r#""abc" < "abd""#), Ok(Value::Bool(true)));
        assert_eq!(eval(r#""b" == "b""#), Ok(Value::Bool(true)));
        assert_eq!(eval("'a' < 'b'"), Ok(Value::Bool(true)));
        assert_eq!(
            eval("true < false"),
            Err(EvalError::InvalidBinaryOperands {
                operator: BinaryOp::Less,
                left: "bool",
                right: "bool"
            })
        );
        assert!(matches!(
            eval("'1' > 321"),
            Err(EvalError::InvalidBinaryOperands { .. })
        ));
    }

    #[test]
    fn logical_operators_need_bools() {
        assert_eq!(eval("true || false"), Ok(Value::Bool(true)));
        assert_eq!(eval("true && false"), Ok(Value::Bool(false)));
        assert!(matches!(
            eval("1 && true"),
            Err(EvalError::InvalidBinaryOperands {
                operator: BinaryOp::And,
                ..
            })
        ));
    }

    #[test]
    fn logical_operators_evaluate_both_sides() {
        assert_eq!(
            eval("false && missing"),
            Err(EvalError::UndefinedIdentifier("missing".into()))
        );
        assert_eq!(
            eval("true || 1 / 0 == 1"),
            Err(EvalError::DivisionByZero {
                operator: BinaryOp::Div
            })
        );
    }

    #[test]
    fn comma_is_reserved() {
        assert_eq!(
            eval("1, 2"),
            Err(EvalError::UnsupportedOperator {
                operator: BinaryOp::Comma
            })
        );
    }

    #[test]
    fn identifiers_resolve_against_the_environment() {
        let env = Environment::new()
            .with("a", 1)
            .with("b", 2.5)
            .with("name", "kit")
            .with("flag", true)
            .with("small", 3u8);
        assert_eq!(eval_in("a + b", &env), Ok(Value::Float(3.5)));
        assert_eq!(eval_in(r#"name + "ty""#, &env), Ok(Value::String("kitty".into())));
        assert_eq!(eval_in("!flag", &env), Ok(Value::Bool(false)));
        assert_eq!(eval_in("small * a", &env), Ok(Value::Integer(3)));
        assert_eq!(
            eval_in("x", &env),
            Err(EvalError::UndefinedIdentifier("x".into()))
        );
    }

    #[test]
    fn structured_bindings_are_not_scalars() {
        let env = Environment::new().with("xs", vec![1, 2, 3]);
        assert_eq!(
            eval_in("xs + 1", &env),
            Err(EvalError::UnsupportedValueType {
                name: "xs".into(),
                kind: "list"
            })
        );
    }

    #[test]
    fn indexing_lists_and_strings() {
        let env = Environment::new()
            .with("xs", vec![10, 20, 30])
            .with("word", "héllo");
        assert_eq!(eval_in("xs[1]", &env), Ok(Value::Integer(20)));
        assert_eq!(eval_in("xs[1 + 1] * 2", &env), Ok(Value::Integer(60)));
        assert_eq!(eval_in("(xs)[0]", &env), Ok(Value::Integer(10)));
        assert_eq!(eval_in("word[1]", &env), Ok(Value::Char('é')));
        assert_eq!(eval_in(r#""abc"[2]"#, &env), Ok(Value::Char('c')));
        assert_eq!(
            eval_in("xs[3]", &env),
            Err(EvalError::IndexOutOfBounds { index: 3, len: 3 })
        );
        assert_eq!(
            eval_in("xs[-1]", &env),
            Err(EvalError::IndexOutOfBounds { index: -1, len: 3 })
        );
        assert_eq!(
            eval_in("xs[0.5]", &env),
            Err(EvalError::InvalidIndex { kind: "float" })
        );
        assert_eq!(
            eval_in("5[0]", &env),
            Err(EvalError::NotIndexable { kind: "integer" })
        );
    }

    #[test]
    fn member_access_on_records() {
        let user: Dynamic = vec![("age", Dynamic::from(42)), ("name", Dynamic::from("ann"))]
            .into_iter()
            .collect();
        let env = Environment::new().with("user", user).with("n", 1);
        assert_eq!(eval_in("user.age >= 18", &env), Ok(Value::Bool(true)));
        assert_eq!(eval_in("user.name", &env), Ok(Value::String("ann".into())));
        assert_eq!(
            eval_in("user.email", &env),
            Err(EvalError::UndefinedMember("email".into()))
        );
        assert_eq!(
            eval_in("n.value", &env),
            Err(EvalError::NotARecord {
                member: "value".into(),
                kind: "integer"
            })
        );
    }

    #[test]
    fn nested_lists_and_records() {
        let ann: Dynamic = vec![("age", Dynamic::from(42)), ("tags", vec!["a", "b"].into())]
            .into_iter()
            .collect();
        let bob: Dynamic = vec![("age", Dynamic::from(17))].into_iter().collect();
        let grid = vec![vec![1, 2], vec![3, 4]];
        let env = Environment::new()
            .with("people", vec![ann.clone(), bob])
            .with("grid", grid)
            .with("ann", ann);
        assert_eq!(eval_in("(people[0]).age", &env), Ok(Value::Integer(42)));
        assert_eq!(eval_in("(people[1]).age < 18", &env), Ok(Value::Bool(true)));
        assert_eq!(eval_in("(ann.tags)[1]", &env), Ok(Value::String("b".into())));
        assert_eq!(eval_in("(grid[1])[0]", &env), Ok(Value::Integer(3)));
        assert_eq!(eval_in("((ann.tags)[0])[0]", &env), Ok(Value::Char('a')));
        assert_eq!(
            eval_in("(people[1]).tags", &env),
            Err(EvalError::UndefinedMember("tags".into()))
        );
        assert_eq!(
            eval_in("people[0]", &env),
            Err(EvalError::UnsupportedValueType {
                name: "list element".into(),
                kind: "record"
            })
        );
    }

    #[test]
    fn environment_is_left_untouched() {
        let env = Environment::new().with("a", 1);
        let before = env.clone();
        assert!(eval_in("a + 1", &env).is_ok());
        assert!(eval_in("a / 0", &env).is_err());
        assert_eq!(env, before);
    }
}
