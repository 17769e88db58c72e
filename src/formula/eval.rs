use std::cmp::Ordering;

use serde_json::Value;

use super::{
    parser::{BinaryOp, Expr, Function},
    FormulaError,
};

static NULL: Value = Value::Null;

/// Largest integer an f64 represents exactly
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

pub(crate) fn evaluate(expr: &Expr, row: &Value) -> Result<Value, FormulaError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Column(path) => Ok(resolve(row, path).clone()),
        Expr::Negate(inner) => number(-to_number(&evaluate(inner, row)?)?),
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, row)?;
            let right = evaluate(right, row)?;
            binary(*op, &left, &right)
        }
        Expr::Call { function, args } => call(*function, args, row),
    }
}

/// Column lookup: an exact key first, then a dot path (array indices allowed)
fn resolve<'a>(row: &'a Value, path: &str) -> &'a Value {
    if let Some(value) = row.get(path) {
        return value;
    }
    let mut current = row;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .unwrap_or(&NULL);
    }
    current
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, FormulaError> {
    let ordering = || compare(left, right);
    match op {
        BinaryOp::Add => number(to_number(left)? + to_number(right)?),
        BinaryOp::Sub => number(to_number(left)? - to_number(right)?),
        BinaryOp::Mul => number(to_number(left)? * to_number(right)?),
        BinaryOp::Div | BinaryOp::Rem => {
            let (l, r) = (to_number(left)?, to_number(right)?);
            if r == 0.0 {
                return Err(FormulaError::DivisionByZero);
            }
            number(if op == BinaryOp::Div { l / r } else { l % r })
        }
        BinaryOp::Concat => Ok(Value::String(to_text(left) + &to_text(right))),
        BinaryOp::Eq => Ok(Value::Bool(ordering() == Ordering::Equal)),
        BinaryOp::Ne => Ok(Value::Bool(ordering() != Ordering::Equal)),
        BinaryOp::Lt => Ok(Value::Bool(ordering() == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(ordering() != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(ordering() == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(ordering() != Ordering::Less)),
    }
}

fn call(function: Function, args: &[Expr], row: &Value) -> Result<Value, FormulaError> {
    let arg = |i: usize| args.get(i).map_or(Ok(Value::Null), |e| evaluate(e, row));
    match function {
        // Only the chosen branch is evaluated
        Function::If => {
            if truthy(&arg(0)?) {
                arg(1)
            } else {
                arg(2)
            }
        }
        Function::Sum => number(numbers(args, row)?.into_iter().sum()),
        Function::Min => extreme(numbers(args, row)?, f64::min),
        Function::Max => extreme(numbers(args, row)?, f64::max),
        Function::Avg => {
            let values = numbers(args, row)?;
            if values.is_empty() {
                return Ok(Value::Null);
            }
            number(values.iter().sum::<f64>() / values.len() as f64)
        }
        Function::Round => {
            let digits = if args.len() > 1 { to_number(&arg(1)?)? } else { 0.0 };
            round(to_number(&arg(0)?)?, digits)
        }
        Function::Abs => number(to_number(&arg(0)?)?.abs()),
        Function::Concat => {
            let mut out = String::new();
            for expr in args {
                out.push_str(&to_text(&evaluate(expr, row)?));
            }
            Ok(Value::String(out))
        }
        Function::Len => Ok(Value::from(to_text(&arg(0)?).chars().count())),
        Function::Upper => Ok(Value::String(to_text(&arg(0)?).to_uppercase())),
        Function::Lower => Ok(Value::String(to_text(&arg(0)?).to_lowercase())),
    }
}

/// Numeric arguments for aggregates; arrays are flattened and nulls skipped
fn numbers(args: &[Expr], row: &Value) -> Result<Vec<f64>, FormulaError> {
    let mut out = Vec::with_capacity(args.len());
    for expr in args {
        match evaluate(expr, row)? {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    out.push(to_number(item)?);
                }
            }
            value => out.push(to_number(&value)?),
        }
    }
    Ok(out)
}

fn extreme(values: Vec<f64>, pick: fn(f64, f64) -> f64) -> Result<Value, FormulaError> {
    match values.into_iter().reduce(pick) {
        Some(value) => number(value),
        None => Ok(Value::Null),
    }
}

/// Half away from zero; negative `digits` round to tens, hundreds, ...
fn round(value: f64, digits: f64) -> Result<Value, FormulaError> {
    let digits = digits.trunc().clamp(-15.0, 15.0) as i32;
    let rounded = if digits >= 0 {
        let factor = 10f64.powi(digits);
        (value * factor).round() / factor
    } else {
        let factor = 10f64.powi(-digits);
        (value / factor).round() * factor
    };
    number(rounded)
}

/// JSON number for `n`, integral values as integers
pub(crate) fn number(n: f64) -> Result<Value, FormulaError> {
    if !n.is_finite() {
        return Err(FormulaError::NotFinite);
    }
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INT {
        return Ok(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or(FormulaError::NotFinite)
}

fn to_number(value: &Value) -> Result<f64, FormulaError> {
    match value {
        Value::Null => Ok(0.0),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        other => numeric(other).ok_or_else(|| match other {
            Value::String(s) => FormulaError::NotANumber(s.clone()),
            other => FormulaError::NotANumber(other.to_string()),
        }),
    }
}

/// Number a value stands for, if any; blank strings are not numbers here
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => (f as i64).to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Numeric when both sides are numbers, otherwise by text
fn compare(left: &Value, right: &Value) -> Ordering {
    match (numeric(left), numeric(right)) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => to_text(left).cmp(&to_text(right)),
    }
}
