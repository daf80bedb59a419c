//! Conversion between infix kinetic-law formulas and content MathML.

use meval::tokenizer::{Operation, Token};
use meval::Expr;

use super::error::SBMLError;
use super::xml::XmlNode;

pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// Parses an infix formula and returns the equivalent `<math>` element.
pub fn formula_to_mathml(formula: &str) -> Result<XmlNode, SBMLError> {
    let invalid = |reason: String| SBMLError::InvalidFormula {
        formula: formula.to_string(),
        reason,
    };

    let expr: Expr = formula.parse().map_err(|e| invalid(format!("{e}")))?;
    let mut stack: Vec<XmlNode> = Vec::new();

    for token in expr.iter() {
        let node = match token {
            Token::Number(n) => XmlNode::new("cn").text(n.to_string()),
            Token::Var(name) => XmlNode::new("ci").text(name.clone()),
            Token::Binary(op) => {
                let rhs = stack.pop();
                let lhs = stack.pop();
                match (lhs, rhs) {
                    (Some(lhs), Some(rhs)) => apply(binary_tag(op), vec![lhs, rhs]),
                    _ => return Err(invalid("missing operand".into())),
                }
            }
            Token::Unary(op) => {
                let arg = stack
                    .pop()
                    .ok_or_else(|| invalid("missing operand".into()))?;
                match op {
                    Operation::Plus => arg,
                    Operation::Minus => apply("minus", vec![arg]),
                    _ => return Err(invalid(format!("unsupported unary operator {op:?}"))),
                }
            }
            Token::Func(name, nargs) => {
                let n = nargs.unwrap_or(1);
                if stack.len() < n {
                    return Err(invalid(format!("missing arguments for {name}")));
                }
                let args = stack.split_off(stack.len() - n);
                match function_tag(name) {
                    Some(tag) => apply(tag, args),
                    None => {
                        let mut node = XmlNode::new("apply").child(XmlNode::new("ci").text(name.clone()));
                        node.children.extend(args);
                        node
                    }
                }
            }
            other => return Err(invalid(format!("unexpected token {other:?}"))),
        };
        stack.push(node);
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok(XmlNode::with_namespace("math", MATHML_NS).child(root)),
        _ => Err(invalid("expression does not reduce to a single term".into())),
    }
}

/// Renders a `<math>` element back to an infix formula.
pub fn mathml_to_formula(math: &XmlNode) -> Result<String, SBMLError> {
    let root = math
        .children
        .first()
        .ok_or_else(|| SBMLError::UnsupportedMath("empty math".into()))?;
    Ok(render(root)?.0)
}

fn apply(tag: &str, args: Vec<XmlNode>) -> XmlNode {
    let mut node = XmlNode::new("apply").child(XmlNode::new(tag));
    node.children.extend(args);
    node
}

fn binary_tag(op: &Operation) -> &'static str {
    match op {
        Operation::Plus => "plus",
        Operation::Minus => "minus",
        Operation::Times => "times",
        Operation::Div => "divide",
        Operation::Rem => "rem",
        Operation::Pow => "power",
    }
}

fn function_tag(name: &str) -> Option<&'static str> {
    Some(match name {
        "exp" => "exp",
        "ln" => "ln",
        "log" => "log",
        "sqrt" => "root",
        "abs" => "abs",
        "floor" => "floor",
        "ceil" => "ceiling",
        "sin" => "sin",
        "cos" => "cos",
        "tan" => "tan",
        _ => return None,
    })
}

const ATOM: u8 = 5;

/// Returns the rendered text and its binding strength.
fn render(node: &XmlNode) -> Result<(String, u8), SBMLError> {
    match node.local_name() {
        "ci" | "cn" => Ok((node.text.clone().unwrap_or_default(), ATOM)),
        "apply" => render_apply(node),
        other => Err(SBMLError::UnsupportedMath(other.to_string())),
    }
}

fn render_apply(node: &XmlNode) -> Result<(String, u8), SBMLError> {
    let (head, args) = node
        .children
        .split_first()
        .ok_or_else(|| SBMLError::UnsupportedMath("empty apply".into()))?;
    let args = args.iter().map(render).collect::<Result<Vec<_>, _>>()?;

    let infix = |symbol: &str, prec: u8, args: Vec<(String, u8)>| {
        let parts: Vec<String> = args
            .into_iter()
            .enumerate()
            .map(|(i, (text, p))| {
                // left-associative: a right operand of equal strength needs parentheses
                if p < prec || (i > 0 && p == prec && symbol != "+" && symbol != "*") {
                    format!("({text})")
                } else {
                    text
                }
            })
            .collect();
        (parts.join(&format!(" {symbol} ")), prec)
    };

    let result = match head.local_name() {
        "plus" => infix("+", 1, args),
        "minus" if args.len() == 1 => {
            let (text, p) = &args[0];
            let text = if *p < ATOM { format!("({text})") } else { text.clone() };
            (format!("-{text}"), 4)
        }
        "minus" => infix("-", 1, args),
        "times" => infix("*", 2, args),
        "divide" => infix("/", 2, args),
        "rem" => infix("%", 2, args),
        "power" => infix("^", 3, args),
        "factorial" => {
            let (text, p) = args
                .first()
                .cloned()
                .ok_or_else(|| SBMLError::UnsupportedMath("factorial".into()))?;
            let text = if p < ATOM { format!("({text})") } else { text };
            (format!("{text}!"), ATOM)
        }
        "ci" => {
            let name = head.text.clone().unwrap_or_default();
            call(&name, args)
        }
        other => {
            let name = match other {
                "root" => "sqrt",
                "ceiling" => "ceil",
                f => f,
            };
            call(name, args)
        }
    };

    Ok(result)
}

fn call(name: &str, args: Vec<(String, u8)>) -> (String, u8) {
    let args: Vec<String> = args.into_iter().map(|(text, _)| text).collect();
    (format!("{name}({})", args.join(", ")), ATOM)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn round_trip(formula: &str) -> String {
        let math = formula_to_mathml(formula).expect("Failed to convert formula");
        let xml = math.to_xml_string().expect("Failed to write MathML");
        let parsed = XmlNode::parse(&xml).expect("Failed to parse MathML");
        mathml_to_formula(&parsed).expect("Failed to render MathML")
    }

    #[test]
    fn test_michaelis_menten_round_trip() {
        assert_eq!(
            round_trip("vmax * s0 / (km + s0)"),
            "vmax * s0 / (km + s0)"
        );
    }

    #[test]
    fn test_precedence_is_preserved() {
        assert_eq!(round_trip("a - (b - c)"), "a - (b - c)");
        assert_eq!(round_trip("(a + b) * c"), "(a + b) * c");
        assert_eq!(round_trip("k * s0^2"), "k * s0 ^ 2");
    }

    #[test]
    fn test_functions_map_to_mathml() {
        let math = formula_to_mathml("exp(k * t)").expect("Failed to convert formula");
        let apply = &math.children[0];
        assert_eq!(apply.children[0].name, "exp");
        assert_eq!(round_trip("exp(k * t)"), "exp(k * t)");
    }

    #[test]
    fn test_invalid_formula_is_rejected() {
        assert!(matches!(
            formula_to_mathml("k * (s0"),
            Err(SBMLError::InvalidFormula { .. })
        ));
    }
}
