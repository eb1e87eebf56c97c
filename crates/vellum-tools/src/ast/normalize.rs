use super::{AstNode, NodeTag};

/// Rewrites a parse tree until no rule applies:
///
/// - `Expressions` nested directly in `Expressions` are flattened;
/// - `LambdaCall(Expressions[a.., last], args..)` becomes
///   `Expressions[a.., LambdaCall(last, args..)]`, which is how the parser
///   reads `(a; f)(x)` and `print(x); default_api.f(y)` style sources.
pub fn normalize(node: &mut AstNode) {
    while normalize_pass(node) {}
}

fn normalize_pass(node: &mut AstNode) -> bool {
    let mut changed = false;
    for child in &mut node.children {
        changed |= normalize_pass(child);
    }

    match node.tag() {
        NodeTag::LambdaCall => changed |= hoist_lambda_call(node),
        NodeTag::Expressions => changed |= flatten_expressions(node),
        _ => {}
    }
    changed
}

fn hoist_lambda_call(node: &mut AstNode) -> bool {
    let Some(first) = node.children.first() else {
        return false;
    };
    if first.tag() != NodeTag::Expressions || first.children.is_empty() {
        return false;
    }

    let mut children = std::mem::take(&mut node.children);
    let mut statements = children.remove(0).children;
    let Some(callee) = statements.pop() else {
        return false;
    };

    let mut call_children = Vec::with_capacity(children.len() + 1);
    call_children.push(callee);
    call_children.extend(children);

    statements.push(AstNode {
        node_type: node.node_type.clone(),
        start_token: node.start_token.clone(),
        end_token: node.end_token.clone(),
        children: call_children,
    });

    *node = AstNode {
        node_type: "Expressions".to_string(),
        start_token: node.start_token.clone(),
        end_token: node.end_token.clone(),
        children: statements,
    };
    true
}

fn flatten_expressions(node: &mut AstNode) -> bool {
    if !node
        .children
        .iter()
        .any(|child| child.tag() == NodeTag::Expressions)
    {
        return false;
    }

    let children = std::mem::take(&mut node.children);
    for child in children {
        if child.tag() == NodeTag::Expressions {
            node.children.extend(child.children);
        } else {
            node.children.push(child);
        }
    }
    true
}
