//! Expression evaluation with checked arithmetic and strict boolean logic.
//!
//! [`eval_expr`] walks an [`Expr`] against an [`EvaluationContext`]. Integer
//! arithmetic is checked (overflow and division by zero are errors), mixed
//! int/float arithmetic promotes to float, and `&&`, `||`, `!` and the
//! ternary condition only accept booleans.

use std::cmp::Ordering;

use deal_core::Value;

use super::error::EvalError;
use crate::context::EvaluationContext;
use crate::expr::{BinaryOp, Expr, UnaryOp};

/// Evaluates an expression to a value.
pub fn eval_expr(expr: &Expr, ctx: &EvaluationContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Variable(name) => ctx
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable { name: name.clone() }),

        Expr::Field { target, field } => match eval_expr(target, ctx)? {
            Value::Object(obj) => obj.field(field).cloned().ok_or(EvalError::UndefinedField {
                class: obj.class.clone(),
                field: field.clone(),
            }),
            other => Err(EvalError::mismatch("field access", "object", &other)),
        },

        Expr::Index { target, index } => {
            let target = eval_expr(target, ctx)?;
            let index = eval_expr(index, ctx)?;
            eval_index(&target, &index)
        }

        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval_expr(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(name, &args)
        }

        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| eval_expr(item, ctx))
                .collect::<Result<Vec<_>, _>>()?,
        )),

        Expr::Unary { op, operand } => {
            let val = eval_expr(operand, ctx)?;
            eval_unary(*op, &val)
        }

        // Short-circuit ops evaluate the right side only when needed.
        Expr::Binary {
            op: op @ (BinaryOp::And | BinaryOp::Or),
            lhs,
            rhs,
        } => {
            let operation = op.symbol();
            let lhs = expect_bool(operation, eval_expr(lhs, ctx)?)?;
            match (op, lhs) {
                (BinaryOp::And, false) => Ok(Value::Bool(false)),
                (BinaryOp::Or, true) => Ok(Value::Bool(true)),
                _ => Ok(Value::Bool(expect_bool(operation, eval_expr(rhs, ctx)?)?)),
            }
        }

        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, ctx)?;
            let rhs = eval_expr(rhs, ctx)?;
            eval_binary(*op, &lhs, &rhs)
        }

        Expr::Ternary {
            cond,
            then,
            otherwise,
        } => {
            if expect_bool("?:", eval_expr(cond, ctx)?)? {
                eval_expr(then, ctx)
            } else {
                eval_expr(otherwise, ctx)
            }
        }
    }
}

/// Evaluates a contract condition, which must produce a boolean.
pub fn eval_condition(expr: &Expr, ctx: &EvaluationContext) -> Result<bool, EvalError> {
    match eval_expr(expr, ctx)? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::NonBooleanCondition {
            got: other.type_name().into(),
        }),
    }
}

fn expect_bool(operation: &str, value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::mismatch(operation, "bool", &other)),
    }
}

fn eval_index(target: &Value, index: &Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::List(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|idx| items.get(idx))
            .cloned()
            .ok_or(EvalError::OutOfBounds {
                index: *i,
                len: items.len(),
            }),
        (Value::List(_), other) => Err(EvalError::mismatch("list index", "int", other)),
        (Value::Object(obj), Value::Str(key)) => {
            obj.field(key).cloned().ok_or_else(|| EvalError::UndefinedField {
                class: obj.class.clone(),
                field: key.clone(),
            })
        }
        (Value::Object(_), other) => Err(EvalError::mismatch("object index", "string", other)),
        (Value::Str(s), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|idx| s.chars().nth(idx))
            .map(|c| Value::Str(c.to_string()))
            .ok_or(EvalError::OutOfBounds {
                index: *i,
                len: s.chars().count(),
            }),
        (other, _) => Err(EvalError::mismatch("index", "list, object or string", other)),
    }
}

fn eval_unary(op: UnaryOp, val: &Value) -> Result<Value, EvalError> {
    match (op, val) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, other) => Err(EvalError::mismatch("!", "bool", other)),
        (UnaryOp::Neg, Value::Int(i)) => {
            i.checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::IntegerOverflow {
                    operation: "negation".into(),
                })
        }
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, other) => Err(EvalError::mismatch("-", "number", other)),
    }
}

/// Evaluates a non-short-circuit binary operation on evaluated operands.
pub fn eval_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            eval_arith(op, lhs, rhs)
        }
        BinaryOp::Concat => Ok(Value::Str(format!(
            "{}{}",
            stringify(lhs, op)?,
            stringify(rhs, op)?
        ))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(lhs, rhs, op)?;
            let result = match op {
                BinaryOp::Lt => ordering == Some(Ordering::Less),
                BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                BinaryOp::Gt => ordering == Some(Ordering::Greater),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(lhs, rhs))),
        BinaryOp::Identical => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotIdentical => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::And | BinaryOp::Or => {
            let l = expect_bool(op.symbol(), lhs.clone())?;
            let r = expect_bool(op.symbol(), rhs.clone())?;
            Ok(Value::Bool(if op == BinaryOp::And { l && r } else { l || r }))
        }
    }
}

fn eval_arith(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let overflow = |name: &str| EvalError::IntegerOverflow {
        operation: name.to_string(),
    };

    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(|| overflow("addition")),
                BinaryOp::Sub => a
                    .checked_sub(b)
                    .map(Value::Int)
                    .ok_or_else(|| overflow("subtraction")),
                BinaryOp::Mul => a
                    .checked_mul(b)
                    .map(Value::Int)
                    .ok_or_else(|| overflow("multiplication")),
                BinaryOp::Div => {
                    if b == 0 {
                        return Err(EvalError::DivideByZero);
                    }
                    // Inexact integer division yields a float.
                    match a.checked_rem(b) {
                        Some(0) => a.checked_div(b).map(Value::Int).ok_or_else(|| overflow("division")),
                        Some(_) => Ok(Value::Float(a as f64 / b as f64)),
                        None => Err(overflow("division")),
                    }
                }
                _ => {
                    if b == 0 {
                        return Err(EvalError::DivideByZero);
                    }
                    a.checked_rem(b).map(Value::Int).ok_or_else(|| overflow("remainder"))
                }
            }
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            if op == BinaryOp::Rem {
                return Err(EvalError::mismatch("%", "int", if matches!(lhs, Value::Float(_)) { lhs } else { rhs }));
            }
            let a = as_f64(lhs);
            let b = as_f64(rhs);
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => {
                    if b == 0.0 {
                        return Err(EvalError::DivideByZero);
                    }
                    a / b
                }
            };
            Ok(Value::Float(result))
        }
        (Value::Int(_) | Value::Float(_), other) | (other, _) => {
            Err(EvalError::mismatch(op.symbol(), "number", other))
        }
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

fn stringify(value: &Value, op: BinaryOp) -> Result<String, EvalError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(true) => Ok("1".into()),
        Value::Bool(false) => Ok(String::new()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Str(s) => Ok(s.clone()),
        other => Err(EvalError::mismatch(op.symbol(), "scalar", other)),
    }
}

/// Orders numbers numerically and strings lexicographically. `None` means
/// unordered (a NaN operand).
fn compare(lhs: &Value, rhs: &Value, op: BinaryOp) -> Result<Option<Ordering>, EvalError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(as_f64(lhs).partial_cmp(&as_f64(rhs)))
        }
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::Int(_) | Value::Float(_) | Value::Str(_), other) | (other, _) => {
            Err(EvalError::mismatch(op.symbol(), "two numbers or two strings", other))
        }
    }
}

/// Loose equality: numbers compare numerically across int/float, lists and
/// objects compare element-wise, values of different kinds are unequal.
pub fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            as_f64(lhs) == as_f64(rhs)
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.class == b.class
                && a.fields.len() == b.fields.len()
                && a.fields
                    .iter()
                    .all(|(k, v)| b.fields.get(k).is_some_and(|w| loose_eq(v, w)))
        }
        _ => lhs == rhs,
    }
}

/// Dispatches a built-in function by (lowercased) name.
pub fn call_builtin(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let arity = |expected: &str| EvalError::WrongArgumentCount {
        name: name.to_string(),
        expected: expected.to_string(),
        got: args.len(),
    };

    match name {
        "count" => match args {
            [Value::List(items)] => Ok(Value::Int(items.len() as i64)),
            [Value::Object(obj)] => Ok(Value::Int(obj.fields.len() as i64)),
            [other] => Err(EvalError::mismatch("count()", "list or object", other)),
            _ => Err(arity("1")),
        },
        "strlen" => match args {
            [Value::Str(s)] => Ok(Value::Int(s.len() as i64)),
            [other] => Err(EvalError::mismatch("strlen()", "string", other)),
            _ => Err(arity("1")),
        },
        "abs" => match args {
            [Value::Int(i)] => i.checked_abs().map(Value::Int).ok_or_else(|| {
                EvalError::IntegerOverflow {
                    operation: "abs()".into(),
                }
            }),
            [Value::Float(f)] => Ok(Value::Float(f.abs())),
            [other] => Err(EvalError::mismatch("abs()", "number", other)),
            _ => Err(arity("1")),
        },
        "is_null" => match args {
            [value] => Ok(Value::Bool(value.is_null())),
            _ => Err(arity("1")),
        },
        "empty" => match args {
            [value] => Ok(Value::Bool(is_empty(value))),
            _ => Err(arity("1")),
        },
        "in_array" => match args {
            [needle, Value::List(haystack)] => {
                Ok(Value::Bool(haystack.iter().any(|item| loose_eq(needle, item))))
            }
            [_, other] => Err(EvalError::mismatch("in_array()", "list", other)),
            _ => Err(arity("2")),
        },
        "min" | "max" => {
            let candidates: &[Value] = match args {
                [Value::List(items)] => items,
                [] => return Err(arity("at least 1")),
                _ => args,
            };
            let wanted = if name == "min" { Ordering::Less } else { Ordering::Greater };
            let op = if name == "min" { BinaryOp::Lt } else { BinaryOp::Gt };
            let mut best = candidates
                .first()
                .ok_or_else(|| EvalError::mismatch("min()/max()", "non-empty list", &Value::List(Vec::new())))?;
            for candidate in &candidates[1..] {
                if compare(candidate, best, op)? == Some(wanted) {
                    best = candidate;
                }
            }
            Ok(best.clone())
        }
        _ => Err(EvalError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Int(i) => *i == 0,
        Value::Float(f) => *f == 0.0,
        Value::Str(s) => s.is_empty() || s == "0",
        Value::List(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{OLD, RESULT, THIS};
    use crate::expr::parse;
    use deal_core::Object;
    use proptest::prelude::*;

    fn account(balance: i64) -> Value {
        Value::Object(
            Object::new("Account")
                .with_field("balance", balance)
                .with_field("owner", "ada")
                .with_field("history", Value::List(vec![Value::Int(10), Value::Int(-3)])),
        )
    }

    fn ctx() -> EvaluationContext {
        let mut ctx = EvaluationContext::new();
        ctx.bind(THIS, account(15));
        ctx.bind(OLD, account(10));
        ctx.bind("amount", Value::Int(5));
        ctx.bind(RESULT, Value::Bool(true));
        ctx
    }

    fn eval(src: &str) -> Result<Value, EvalError> {
        eval_expr(&parse(src).unwrap(), &ctx())
    }

    #[test]
    fn old_state_arithmetic() {
        assert_eq!(
            eval("$this->balance == $__old->balance + $amount"),
            Ok(Value::Bool(true))
        );
        assert_eq!(eval("$this->history[1]"), Ok(Value::Int(-3)));
        assert_eq!(eval("$this['owner'] . '!'"), Ok(Value::Str("ada!".into())));
    }

    #[test]
    fn undefined_names_are_errors() {
        assert_eq!(
            eval("$missing > 0"),
            Err(EvalError::UndefinedVariable {
                name: "missing".into()
            })
        );
        assert_eq!(
            eval("$this->nope"),
            Err(EvalError::UndefinedField {
                class: "Account".into(),
                field: "nope".into()
            })
        );
        assert!(matches!(
            eval("$amount->x"),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn checked_integer_arithmetic() {
        assert_eq!(
            eval("9223372036854775807 + 1"),
            Err(EvalError::IntegerOverflow {
                operation: "addition".into()
            })
        );
        assert_eq!(eval("1 / 0"), Err(EvalError::DivideByZero));
        assert_eq!(eval("1 % 0"), Err(EvalError::DivideByZero));
        assert_eq!(eval("6 / 3"), Ok(Value::Int(2)));
        assert_eq!(eval("7 / 2"), Ok(Value::Float(3.5)));
        assert_eq!(eval("1 + 0.5"), Ok(Value::Float(1.5)));
        assert_eq!(eval("-(-9223372036854775807 - 1)"), Err(EvalError::IntegerOverflow {
            operation: "negation".into()
        }));
    }

    #[test]
    fn loose_and_strict_equality() {
        assert_eq!(eval("1 == 1.0"), Ok(Value::Bool(true)));
        assert_eq!(eval("1 === 1.0"), Ok(Value::Bool(false)));
        assert_eq!(eval("'1' == 1"), Ok(Value::Bool(false)));
        assert_eq!(eval("null == null"), Ok(Value::Bool(true)));
        assert_eq!(eval("[1, 2] == [1.0, 2]"), Ok(Value::Bool(true)));
        assert_eq!(eval("$this != $__old"), Ok(Value::Bool(true)));
    }

    #[test]
    fn logic_short_circuits_and_requires_bools() {
        assert_eq!(eval("false && $missing"), Ok(Value::Bool(false)));
        assert_eq!(eval("true || $missing"), Ok(Value::Bool(true)));
        assert!(matches!(eval("1 && true"), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(eval("!1"), Err(EvalError::TypeMismatch { .. })));
        assert_eq!(eval("$amount > 3 ? 'big' : 'small'"), Ok(Value::Str("big".into())));
    }

    #[test]
    fn comparisons_need_compatible_operands() {
        assert_eq!(eval("'abc' < 'abd'"), Ok(Value::Bool(true)));
        assert_eq!(eval("2 >= 2.0"), Ok(Value::Bool(true)));
        assert!(matches!(eval("'a' < 1"), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(eval("null < 1"), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn builtins() {
        assert_eq!(eval("count($this->history)"), Ok(Value::Int(2)));
        assert_eq!(eval("count($this)"), Ok(Value::Int(3)));
        assert_eq!(eval("strlen($this->owner)"), Ok(Value::Int(3)));
        assert_eq!(eval("abs(-4)"), Ok(Value::Int(4)));
        assert_eq!(eval("min(3, 1.5, 2)"), Ok(Value::Float(1.5)));
        assert_eq!(eval("max($this->history)"), Ok(Value::Int(10)));
        assert_eq!(eval("is_null(null) && !is_null(0)"), Ok(Value::Bool(true)));
        assert_eq!(eval("empty('0') && empty([]) && !empty($this)"), Ok(Value::Bool(true)));
        assert_eq!(eval("in_array(10.0, $this->history)"), Ok(Value::Bool(true)));
        assert_eq!(
            eval("sqrt(4)"),
            Err(EvalError::UnknownFunction { name: "sqrt".into() })
        );
        assert!(matches!(eval("count()"), Err(EvalError::WrongArgumentCount { .. })));
        assert!(matches!(eval("max([])"), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn conditions_must_be_boolean() {
        let expr = parse("$amount + 1").unwrap();
        assert_eq!(
            eval_condition(&expr, &ctx()),
            Err(EvalError::NonBooleanCondition { got: "int".into() })
        );
    }

    proptest! {
        #[test]
        fn int_comparisons_agree_with_rust(a in any::<i64>(), b in any::<i64>()) {
            let mut ctx = EvaluationContext::new();
            ctx.bind("a", Value::Int(a));
            ctx.bind("b", Value::Int(b));
            let lt = eval_condition(&parse("$a < $b").unwrap(), &ctx).unwrap();
            let eq = eval_condition(&parse("$a == $b").unwrap(), &ctx).unwrap();
            prop_assert_eq!(lt, a < b);
            prop_assert_eq!(eq, a == b);
        }

        #[test]
        fn addition_either_matches_or_reports_overflow(a in any::<i64>(), b in any::<i64>()) {
            let result = eval_binary(BinaryOp::Add, &Value::Int(a), &Value::Int(b));
            match a.checked_add(b) {
                Some(sum) => prop_assert_eq!(result, Ok(Value::Int(sum))),
                None => prop_assert!(
                    matches!(result, Err(EvalError::IntegerOverflow { .. })),
                    "expected overflow for {} + {}, got {:?}",
                    a,
                    b,
                    result
                ),
            }
        }
    }
}
