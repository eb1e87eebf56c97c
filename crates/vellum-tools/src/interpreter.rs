//! Extracts [`CallDescriptor`]s from parse trees.
//!
//! Two shapes are recognized:
//!
//! ```text
//! LambdaCall(GetAttr(Variable(ns), String(fn)), Tuple(args..))
//! LambdaCall(Variable("print"), Tuple(<the shape above>))
//! ```
//!
//! Everything else is "not a call" and yields `None`, so callers fall back
//! to showing the raw tree.

use tracing::{debug, warn};

use crate::ast::{AstNode, NodeTag};
use crate::call::{ArgValue, Arguments, CallDescriptor};

const PRINT_FUNCTION: &str = "print";

pub fn parse_call(node: &AstNode) -> Option<CallDescriptor> {
    let node = unwrap_single_statement(node);
    if node.tag() != NodeTag::LambdaCall {
        return None;
    }

    let callee = node.child(0)?;
    match callee.tag() {
        NodeTag::GetAttr => descriptor_from_call(node, false),
        NodeTag::Variable(name) if name == PRINT_FUNCTION => {
            let inner = first_argument(node.child(1)?)?;
            if inner.tag() != NodeTag::LambdaCall {
                return None;
            }
            if inner.child(0).map(AstNode::tag) != Some(NodeTag::GetAttr) {
                return None;
            }
            descriptor_from_call(inner, true)
        }
        _ => None,
    }
}

/// Parses serialized parse-tree JSON and extracts the call from it.
pub fn parse_call_json(json: &str) -> Option<CallDescriptor> {
    match AstNode::from_json(json) {
        Ok(node) => parse_call(&node),
        Err(err) => {
            debug!(target: "interpreter::parse_call_json", %err, "Rejected parse tree");
            None
        }
    }
}

/// One entry per top-level statement; `None` marks statements that are not
/// tool calls.
pub fn interpret_program(node: &AstNode) -> Vec<(AstNode, Option<CallDescriptor>)> {
    let statements: Vec<&AstNode> = if node.tag() == NodeTag::Expressions {
        node.children.iter().collect()
    } else {
        vec![node]
    };

    statements
        .into_iter()
        .map(|statement| (statement.clone(), parse_call(statement)))
        .collect()
}

fn unwrap_single_statement(mut node: &AstNode) -> &AstNode {
    while node.tag() == NodeTag::Expressions && node.children.len() == 1 {
        node = &node.children[0];
    }
    node
}

fn first_argument(args: &AstNode) -> Option<&AstNode> {
    if args.tag() == NodeTag::Tuple {
        args.child(0)
    } else {
        Some(args)
    }
}

fn descriptor_from_call(call: &AstNode, print_call: bool) -> Option<CallDescriptor> {
    let attr = call.child(0)?;

    let api_name = attr.child(0).and_then(|n| match n.tag() {
        NodeTag::Variable(name) => Some(name),
        _ => None,
    });
    let function_name = attr.child(1).and_then(|n| match n.tag() {
        NodeTag::String(name) => Some(name),
        _ => None,
    });

    let descriptor = CallDescriptor {
        api_name,
        function_name,
        arguments: call.child(1).map(decode_arguments).unwrap_or_default(),
        print_call,
    };

    if descriptor.is_valid() {
        Some(descriptor)
    } else {
        debug!(
            target: "interpreter::parse_call",
            api = ?descriptor.api_name,
            function = ?descriptor.function_name,
            "Attribute access did not resolve to a namespace and function name"
        );
        None
    }
}

fn decode_arguments(args: &AstNode) -> Arguments {
    let entries: Vec<&AstNode> = if args.tag() == NodeTag::Tuple {
        args.children.iter().collect()
    } else {
        vec![args]
    };

    let mut arguments = Arguments::new();
    for entry in entries {
        if entry.tag() != NodeTag::Assign {
            debug!(
                target: "interpreter::decode_arguments",
                node_type = %entry.node_type,
                "Skipping positional argument"
            );
            continue;
        }
        let (Some(name_node), Some(value_node)) = (entry.child(0), entry.child(1)) else {
            continue;
        };
        let Some(name) = argument_name(name_node) else {
            continue;
        };
        arguments.insert(name, decode_value(value_node));
    }
    arguments
}

fn argument_name(node: &AstNode) -> Option<String> {
    match node.tag() {
        NodeTag::Variable(name) | NodeTag::String(name) => Some(name),
        _ => node.raw_token().map(str::to_string),
    }
}

fn decode_value(node: &AstNode) -> ArgValue {
    let tag = node.tag();
    let raw = node.raw_token();

    match tag {
        NodeTag::String(text) => ArgValue::String(text),
        NodeTag::Number(literal) => match literal.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => ArgValue::Number(n),
            _ => ArgValue::String(literal),
        },
        NodeTag::Boolean(literal) => {
            let text = raw.map(str::to_string).or(literal).unwrap_or_default();
            ArgValue::Bool(text.trim().eq_ignore_ascii_case("true"))
        }
        NodeTag::Null => ArgValue::Null,
        _ if raw.is_some_and(is_none_token) => ArgValue::Null,
        tag if tag.is_composite() => {
            warn!(
                target: "interpreter::decode_value",
                node_type = %node.node_type,
                "Composite argument values are unsupported; keeping the raw token"
            );
            ArgValue::String(fallback_text(node))
        }
        _ => {
            warn!(
                target: "interpreter::decode_value",
                node_type = %node.node_type,
                "Unrecognized argument value; keeping the raw token"
            );
            ArgValue::String(fallback_text(node))
        }
    }
}

fn is_none_token(token: &str) -> bool {
    matches!(token.trim(), "None" | "none" | "null")
}

fn fallback_text(node: &AstNode) -> String {
    match (node.raw_token(), node.tag()) {
        (Some(raw), _) => raw.to_string(),
        (None, NodeTag::Other { literal: Some(literal), .. }) => literal,
        (None, _) => node.node_type.clone(),
    }
}
