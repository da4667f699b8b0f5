//! Node resolution.
//!
//! Runs whenever the parser closes an operator application: validates the
//! `<...>` arguments against the opcode's codec, packs the operand, checks
//! the parameter count, and fixes the output arity. Multi-output operators
//! additionally spawn placeholder values that replace `_` sentinels among
//! their left siblings when the enclosing group closes.
//!
//! All failures land in the node's `error` field; resolution itself never
//! returns one.

use crate::tree::{OpNode, ParseNode, Span, ValueNode};
use rain_spec::{OpMetaRegistry, OperandError, Resolved};

/// Resolve a shaped op node in place.
pub(crate) fn resolve_op(op: &mut OpNode, registry: &OpMetaRegistry) {
    match registry.find(&op.opcode.name) {
        None => {
            op.error = Some("unknown opcode".to_string());
        }
        Some(Resolved::Pseudo(pseudo)) => {
            let meta = registry.pseudo_meta(pseudo);
            op.opcode.description = meta.doc.description.clone();
            op.data = meta.doc.data.clone();
            if op.operand_args.is_some() {
                op.error = Some("invalid operand arguments".to_string());
            } else if op.parameters.len() != 2 {
                op.error =
                    Some("invalid number of parameters, need 2 items to compare".to_string());
            } else {
                op.operand = Some(0);
                op.output = Some(1);
            }
        }
        Some(Resolved::Op(meta)) => {
            op.opcode.description = meta.doc.description.clone();
            op.data = meta.doc.data.clone();
            let args: Vec<i64> = op
                .operand_args
                .as_ref()
                .map(|supplied| supplied.args.iter().map(|arg| arg.value).collect())
                .unwrap_or_default();
            let param_count = op.parameters.len();
            match meta.codec.encode(&args, param_count) {
                Err(OperandError::OutOfBound { index }) => {
                    op.error = Some(format!("out-of-bound operand argument at index {index}"));
                }
                Err(OperandError::WrongArgCount { .. }) => {
                    op.error = Some("invalid operand arguments".to_string());
                }
                Ok(operand) => {
                    if meta.params.accepts(param_count) {
                        op.operand = Some(operand);
                        op.output = Some(meta.outputs.resolve(operand));
                    } else {
                        op.error = Some("invalid number of parameters".to_string());
                    }
                }
            }
        }
    }
}

/// Placeholder values a multi-output op contributes to its level.
pub(crate) fn spawn_placeholders(op: &OpNode) -> Vec<ValueNode> {
    let output = op.output.unwrap_or(1);
    (1..output)
        .map(|k| ValueNode {
            value: format!("{} output {} placeholder", op.opcode.name, k),
            position: op.position,
        })
        .collect()
}

/// One multi-output op awaiting placeholder consumption at its level.
pub(crate) struct PendingOutputs {
    /// Index of the op among its siblings.
    pub op_index: usize,
    pub placeholders: Vec<ValueNode>,
}

/// Drain the multi-output cache of a closing level.
///
/// For each pending op, the rightmost `_` sentinels among its left siblings
/// are replaced by the spawned placeholders; a shortfall marks the op with
/// the illegal-placement diagnostic.
pub(crate) fn drain_outputs(
    children: &mut [ParseNode],
    pending: Vec<PendingOutputs>,
    placeholder: char,
) {
    let mut sentinel = [0u8; 4];
    let sentinel = &*placeholder.encode_utf8(&mut sentinel);
    for entry in pending {
        let need = entry.placeholders.len();
        let slots: Vec<usize> = children[..entry.op_index]
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, ParseNode::Value(v) if v.value == sentinel))
            .map(|(index, _)| index)
            .collect();
        if slots.len() < need {
            if let ParseNode::Op(op) = &mut children[entry.op_index] {
                if op.error.is_none() {
                    op.error = Some(format!(
                        "illegal placement of outputs, parameter {} cannot be accessed by this opcode",
                        slots.len()
                    ));
                }
            }
        } else {
            let taken = &slots[slots.len() - need..];
            for (&slot, node) in taken.iter().zip(entry.placeholders) {
                children[slot] = ParseNode::Value(node);
            }
        }
    }
}

/// Collapse an infix level into one prefix-shaped op.
///
/// `operators` indexes the operator tokens among `children`. Operators must
/// alternate with operands (`v op v op v`) and share one canonical name.
pub(crate) fn resolve_infix(
    mut children: Vec<ParseNode>,
    operators: Vec<usize>,
    group: Span,
    registry: &OpMetaRegistry,
) -> OpNode {
    let canonical = |name: &str| -> Option<String> {
        registry.find(name).map(|found| match found {
            Resolved::Op(meta) => meta.name.clone(),
            Resolved::Pseudo(pseudo) => registry.pseudo_meta(pseudo).name.clone(),
        })
    };

    let shape_ok = children.len() >= 3
        && children.len() % 2 == 1
        && operators.len() == children.len() / 2
        && operators.iter().enumerate().all(|(k, &i)| i == 2 * k + 1);

    let first_operator = operators.first().copied().unwrap_or(0);
    let (name, name_span) = match children.get(first_operator) {
        Some(ParseNode::Op(marker)) => (marker.opcode.name.clone(), marker.opcode.position),
        _ => (String::new(), group),
    };

    let names_agree = shape_ok && {
        let target = canonical(&name);
        operators.iter().all(|&i| match &children[i] {
            ParseNode::Op(marker) => canonical(&marker.opcode.name) == target,
            _ => false,
        })
    };

    let mut op = OpNode::unresolved(name, name_span);
    op.position = group;
    op.parens = group;
    op.infix = true;

    if names_agree {
        // Operands in textual order; the markers are discarded.
        op.parameters = children
            .drain(..)
            .enumerate()
            .filter(|(index, _)| index % 2 == 0)
            .map(|(_, node)| node)
            .collect();
        resolve_op(&mut op, registry);
    } else {
        op.parameters = children
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !operators.contains(index))
            .map(|(_, node)| node)
            .collect();
        op.error = Some("invalid infix expression".to_string());
    }
    op
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{OperandArg, OperandArgs};
    use rain_spec::OpMetaRegistry;

    fn shaped(name: &str, params: usize) -> OpNode {
        let mut op = OpNode::unresolved(name.to_string(), Span::new(0, 2));
        op.parameters = (0..params)
            .map(|k| {
                ParseNode::Value(ValueNode {
                    value: k.to_string(),
                    position: Span::point(4 + k),
                })
            })
            .collect();
        op
    }

    #[test]
    fn test_resolve_reducer() {
        let registry = OpMetaRegistry::standard();
        let mut op = shaped("add", 4);
        resolve_op(&mut op, &registry);
        assert_eq!(op.error, None);
        assert_eq!(op.operand, Some(4));
        assert_eq!(op.output, Some(1));
        assert!(!op.opcode.description.is_empty());
    }

    #[test]
    fn test_resolve_param_count_failure() {
        let registry = OpMetaRegistry::standard();
        let mut op = shaped("add", 1);
        resolve_op(&mut op, &registry);
        assert_eq!(op.error.as_deref(), Some("invalid number of parameters"));
    }

    #[test]
    fn test_resolve_pseudo_arity() {
        let registry = OpMetaRegistry::standard();
        let mut op = shaped("gte", 2);
        resolve_op(&mut op, &registry);
        assert_eq!(op.operand, Some(0));
        assert_eq!(op.output, Some(1));

        let mut op = shaped("gte", 3);
        resolve_op(&mut op, &registry);
        assert_eq!(
            op.error.as_deref(),
            Some("invalid number of parameters, need 2 items to compare")
        );
    }

    #[test]
    fn test_resolve_out_of_bound_argument() {
        let registry = OpMetaRegistry::standard();
        let mut op = shaped("call", 2);
        op.operand_args = Some(OperandArgs {
            position: Span::new(4, 10),
            args: [2i64, 0, 1]
                .iter()
                .map(|&value| OperandArg {
                    value,
                    position: Span::point(5),
                })
                .collect(),
        });
        resolve_op(&mut op, &registry);
        assert_eq!(
            op.error.as_deref(),
            Some("out-of-bound operand argument at index 1")
        );
    }

    #[test]
    fn test_spawn_and_drain() {
        let registry = OpMetaRegistry::standard();
        let mut op = shaped("call", 1);
        op.operand_args = Some(OperandArgs {
            position: Span::new(4, 10),
            args: [1i64, 3, 1]
                .iter()
                .map(|&value| OperandArg {
                    value,
                    position: Span::point(5),
                })
                .collect(),
        });
        resolve_op(&mut op, &registry);
        assert_eq!(op.output, Some(3));
        let placeholders = spawn_placeholders(&op);
        assert_eq!(placeholders.len(), 2);
        assert_eq!(placeholders[0].value, "call output 1 placeholder");

        let underscore = |at: usize| {
            ParseNode::Value(ValueNode {
                value: "_".to_string(),
                position: Span::point(at),
            })
        };
        let mut children = vec![underscore(0), underscore(2), ParseNode::Op(op)];
        drain_outputs(
            &mut children,
            vec![PendingOutputs {
                op_index: 2,
                placeholders,
            }],
            '_',
        );
        assert!(matches!(
            &children[0],
            ParseNode::Value(v) if v.value == "call output 1 placeholder"
        ));
        assert!(matches!(
            &children[1],
            ParseNode::Value(v) if v.value == "call output 2 placeholder"
        ));
    }

    #[test]
    fn test_drain_shortfall_marks_op() {
        let registry = OpMetaRegistry::standard();
        let mut op = shaped("call", 1);
        op.operand_args = Some(OperandArgs {
            position: Span::new(4, 10),
            args: [1i64, 2, 1]
                .iter()
                .map(|&value| OperandArg {
                    value,
                    position: Span::point(5),
                })
                .collect(),
        });
        resolve_op(&mut op, &registry);
        let placeholders = spawn_placeholders(&op);
        let mut children = vec![ParseNode::Op(op)];
        drain_outputs(
            &mut children,
            vec![PendingOutputs {
                op_index: 0,
                placeholders,
            }],
            '_',
        );
        match &children[0] {
            ParseNode::Op(op) => assert_eq!(
                op.error.as_deref(),
                Some("illegal placement of outputs, parameter 0 cannot be accessed by this opcode")
            ),
            other => panic!("expected op, got {other:?}"),
        }
    }

    #[test]
    fn test_infix_mismatched_operators() {
        let registry = OpMetaRegistry::standard();
        let value = |text: &str, at: usize| {
            ParseNode::Value(ValueNode {
                value: text.to_string(),
                position: Span::point(at),
            })
        };
        let marker = |name: &str, at: usize| {
            let mut op = OpNode::unresolved(name.to_string(), Span::point(at));
            op.infix = true;
            ParseNode::Op(op)
        };
        let children = vec![
            value("1", 0),
            marker("add", 2),
            value("2", 6),
            marker("mul", 8),
            value("3", 12),
        ];
        let op = resolve_infix(children, vec![1, 3], Span::new(0, 12), &registry);
        assert_eq!(op.error.as_deref(), Some("invalid infix expression"));
        assert_eq!(op.parameters.len(), 3);
    }

    #[test]
    fn test_infix_alias_operators_agree() {
        let registry = OpMetaRegistry::standard();
        let value = |text: &str, at: usize| {
            ParseNode::Value(ValueNode {
                value: text.to_string(),
                position: Span::point(at),
            })
        };
        let marker = |name: &str, at: usize| {
            let mut op = OpNode::unresolved(name.to_string(), Span::point(at));
            op.infix = true;
            ParseNode::Op(op)
        };
        // SAT_ADD aliases SATURATING_ADD, so the group is uniform.
        let children = vec![
            value("1", 0),
            marker("saturating-add", 2),
            value("2", 18),
            marker("sat_add", 20),
            value("3", 28),
        ];
        let op = resolve_infix(children, vec![1, 3], Span::new(0, 28), &registry);
        assert_eq!(op.error, None);
        assert_eq!(op.parameters.len(), 3);
        assert_eq!(op.operand, Some(3));
        assert!(op.infix);
    }
}
