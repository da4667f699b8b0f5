//! The notation-aware expression parser.
//!
//! One pass over the raw text. The input splits on `;` into sub-expressions;
//! within one, the next significant character picks the transition: `(`
//! opens a group (with or without a named head), `)` closes and resolves it
//! in whichever notation the group turned out to use, `<` starts operand
//! arguments, anything else is a word.
//!
//! Three notations are supported and resolved per nesting level:
//! - prefix: `op(a b)` — the head names the group up front;
//! - postfix: `(a b)op` — a bare group named by its tail;
//! - infix: `(a op b op c)` — bare operator words inside a level collapse
//!   the whole level into one application.
//!
//! The parser always completes. Diagnostics are recorded in the tree, never
//! returned; spans refer to the original input.

use crate::lexer::{is_separator, next_boundary, normalize, parse_integer, skip_separators};
use crate::resolver::{self, PendingOutputs};
use crate::tree::{
    ErrorNode, OpNode, OperandArg, OperandArgs, ParseNode, ParseTree, SourceTree, Span, ValueNode,
};
use rain_spec::{OpMetaRegistry, Word256, WordError};

/// Normalized spellings of the all-ones sentinel value.
const MAX_WORD_NAMES: [&str; 3] = ["MAXUINT256", "MAX_UINT256", "INFINITY"];

/// A single-use parse pass over one input string.
pub(crate) struct Parser<'r> {
    registry: &'r OpMetaRegistry,
    placeholder: char,
}

/// The head of an open group: a named prefix op, or a bare `(` awaiting
/// postfix or infix resolution.
struct OpFrame {
    name: String,
    name_span: Span,
    head_start: usize,
    open_paren: usize,
    operand_args: Option<OperandArgs>,
    error: Option<String>,
}

impl OpFrame {
    fn bare(at: usize) -> Self {
        OpFrame {
            name: String::new(),
            name_span: Span::point(at),
            head_start: at,
            open_paren: at,
            operand_args: None,
            error: None,
        }
    }
}

/// One nesting level: the sub-expression root, or an open paren group.
struct Level {
    owner: Option<OpFrame>,
    children: Vec<ParseNode>,
    /// Indices of infix operator markers among `children`.
    infix_ops: Vec<usize>,
    /// Multi-output ops at this level awaiting placeholder consumption.
    pending: Vec<PendingOutputs>,
}

impl Level {
    fn root() -> Self {
        Level {
            owner: None,
            children: Vec::new(),
            infix_ops: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn group(frame: OpFrame) -> Self {
        Level {
            owner: Some(frame),
            ..Level::root()
        }
    }
}

/// Result of scanning a `<...>` argument list.
struct ArgScan {
    args: Vec<OperandArg>,
    /// Span from `<` through `>` (or through the failure point).
    position: Span,
    error: Option<(String, Span)>,
    /// Where parsing continues.
    next: usize,
}

impl<'r> Parser<'r> {
    pub(crate) fn new(registry: &'r OpMetaRegistry, placeholder: char) -> Self {
        Parser {
            registry,
            placeholder,
        }
    }

    /// Parse the whole program into one tree, one entry per sub-expression.
    pub(crate) fn parse_tree(&self, text: &str) -> ParseTree {
        log::debug!("parsing {} bytes of source", text.len());
        let mut tree = ParseTree::default();
        for (start, end) in split_sub_expressions(text) {
            tree.sources
                .push(self.parse_sub_expression(text, start, end));
        }
        log::debug!(
            "parsed {} sub-expressions, errors: {}",
            tree.len(),
            tree.has_errors()
        );
        tree
    }

    fn parse_sub_expression(&self, text: &str, start: usize, end: usize) -> SourceTree {
        let bytes = text.as_bytes();
        let mut levels = vec![Level::root()];
        let mut pos = start;

        loop {
            pos = self.skip_leading(text, pos, end, &mut levels);
            if pos >= end {
                break;
            }
            match bytes[pos] {
                b'(' => {
                    levels.push(Level::group(OpFrame::bare(pos)));
                    pos += 1;
                }
                b')' => {
                    pos = self.close_group(text, pos, end, &mut levels);
                }
                b'<' => {
                    // No opcode head to attach to.
                    let scan = self.scan_operand_args(text, pos, end);
                    let (error, position) = match scan.error {
                        Some((message, span)) => (message, span),
                        None => ("invalid use of <...>".to_string(), scan.position),
                    };
                    attach(
                        &mut levels,
                        ParseNode::Error(ErrorNode { error, position }),
                    );
                    pos = scan.next;
                }
                _ => {
                    pos = self.word(text, pos, end, &mut levels);
                }
            }
        }

        // Unclosed groups swallow their children and carry the diagnostic.
        while levels.len() > 1 {
            let level = levels.pop().expect("length checked");
            let mut op = self.finish_level(text, level, end.saturating_sub(1).max(start));
            op.error = Some("no closing parenthesis".to_string());
            attach(&mut levels, ParseNode::Op(op));
        }

        let mut root = levels.pop().expect("root level always present");
        resolver::drain_outputs(
            &mut root.children,
            std::mem::take(&mut root.pending),
            self.placeholder,
        );
        let span_end = if end > start { end - 1 } else { start };
        let mut nodes = root.children;
        if !root.infix_ops.is_empty() {
            let op = resolver::resolve_infix(
                nodes,
                root.infix_ops,
                Span::new(start, span_end),
                self.registry,
            );
            nodes = vec![ParseNode::Op(op)];
        }
        SourceTree {
            position: Span::new(start, span_end),
            nodes,
        }
    }

    /// Skip separators; a comma before the first element of a level is a
    /// lexical error.
    fn skip_leading(&self, text: &str, mut pos: usize, end: usize, levels: &mut Vec<Level>) -> usize {
        let bytes = text.as_bytes();
        while pos < end && is_separator(bytes[pos]) {
            if bytes[pos] == b',' {
                let separates_nothing = {
                    let here = levels.last().expect("root level always present");
                    here.children.is_empty() && here.infix_ops.is_empty()
                };
                if separates_nothing {
                    attach(
                        levels,
                        ParseNode::Error(ErrorNode {
                            error: "invalid comma".to_string(),
                            position: Span::point(pos),
                        }),
                    );
                }
            }
            pos += 1;
        }
        pos
    }

    /// Consume one word and classify it.
    fn word(&self, text: &str, pos: usize, end: usize, levels: &mut Vec<Level>) -> usize {
        let bytes = text.as_bytes();
        let rest = &text[pos..end];
        let word_end = pos + next_boundary(rest).unwrap_or(rest.len());
        let word = &text[pos..word_end];
        let span = Span::new(pos, word_end - 1);
        let next_char = if word_end < end {
            Some(bytes[word_end])
        } else {
            None
        };

        // Integer literal.
        if crate::lexer::is_integer(word) {
            let node = match Word256::parse(word) {
                Ok(_) => ParseNode::Value(ValueNode {
                    value: word.to_string(),
                    position: span,
                }),
                Err(WordError::Overflow(_)) | Err(WordError::Malformed(_)) => {
                    ParseNode::Error(ErrorNode {
                        error: "value out of range".to_string(),
                        position: span,
                    })
                }
            };
            attach(levels, node);
            return word_end;
        }

        // Placeholder.
        let mut sentinel = [0u8; 4];
        if word == &*self.placeholder.encode_utf8(&mut sentinel) {
            attach(
                levels,
                ParseNode::Value(ValueNode {
                    value: word.to_string(),
                    position: span,
                }),
            );
            return word_end;
        }

        let norm = normalize(word);

        // All-ones sentinel.
        if MAX_WORD_NAMES.contains(&norm.as_str()) {
            attach(
                levels,
                ParseNode::Value(ValueNode {
                    value: word.to_string(),
                    position: span,
                }),
            );
            return word_end;
        }

        // arg(n) reference.
        if norm == "ARG" && next_char == Some(b'(') {
            return self.arg_reference(text, pos, word_end, end, levels);
        }

        match next_char {
            Some(b'<') => self.head_with_args(text, pos, word, span, word_end, end, levels),
            Some(b'(') => {
                let mut frame = OpFrame {
                    name: word.to_string(),
                    name_span: span,
                    head_start: pos,
                    open_paren: word_end,
                    operand_args: None,
                    error: None,
                };
                if self.registry.find(word).is_none() {
                    frame.error = Some("unknown opcode".to_string());
                }
                levels.push(Level::group(frame));
                word_end + 1
            }
            _ => {
                if self.registry.find(word).is_some() {
                    let leads_the_level = levels
                        .last()
                        .expect("root level always present")
                        .children
                        .is_empty();
                    if leads_the_level {
                        // Could open a group or name a value; neither holds.
                        attach(
                            levels,
                            ParseNode::Error(ErrorNode {
                                error: "ambiguous expression/opcode".to_string(),
                                position: span,
                            }),
                        );
                    } else {
                        let level = levels.last_mut().expect("root level always present");
                        let mut marker = OpNode::unresolved(word.to_string(), span);
                        marker.infix = true;
                        level.infix_ops.push(level.children.len());
                        level.children.push(ParseNode::Op(marker));
                    }
                } else {
                    attach(
                        levels,
                        ParseNode::Error(ErrorNode {
                            error: "unknown opcode".to_string(),
                            position: span,
                        }),
                    );
                }
                word_end
            }
        }
    }

    /// A word directly followed by `<...>` operand arguments.
    #[allow(clippy::too_many_arguments)]
    fn head_with_args(
        &self,
        text: &str,
        pos: usize,
        word: &str,
        span: Span,
        lt_pos: usize,
        end: usize,
        levels: &mut Vec<Level>,
    ) -> usize {
        let bytes = text.as_bytes();
        let scan = self.scan_operand_args(text, lt_pos, end);
        if let Some((error, position)) = scan.error {
            attach(levels, ParseNode::Error(ErrorNode { error, position }));
            return scan.next;
        }

        let mut frame = OpFrame {
            name: word.to_string(),
            name_span: span,
            head_start: pos,
            open_paren: 0,
            operand_args: Some(OperandArgs {
                position: scan.position,
                args: scan.args,
            }),
            error: None,
        };
        if self.registry.find(word).is_none() {
            frame.error = Some("unknown opcode".to_string());
        }

        let after = skip_separators(text, scan.next, end);
        if after < end && bytes[after] == b'(' {
            frame.open_paren = after;
            levels.push(Level::group(frame));
            return after + 1;
        }

        // Junk between the argument list and the parenthesis.
        let rest = &text[after..end];
        let junk_end = after + next_boundary(rest).unwrap_or(rest.len());
        if junk_end > after && junk_end < end && bytes[junk_end] == b'(' {
            frame.open_paren = junk_end;
            frame.error =
                Some("illegal characters between opcode and parenthesis".to_string());
            levels.push(Level::group(frame));
            return junk_end + 1;
        }

        attach(
            levels,
            ParseNode::Error(ErrorNode {
                error: "invalid use of <...>".to_string(),
                position: Span::new(pos, scan.position.end),
            }),
        );
        scan.next
    }

    /// `arg` `(` INT `)` — a compile-time argument reference.
    fn arg_reference(
        &self,
        text: &str,
        start: usize,
        lparen: usize,
        end: usize,
        levels: &mut Vec<Level>,
    ) -> usize {
        let bytes = text.as_bytes();
        let index_start = skip_separators(text, lparen + 1, end);
        let rest = &text[index_start..end];
        let index_end = index_start + next_boundary(rest).unwrap_or(rest.len());
        let token = &text[index_start..index_end];
        let after = skip_separators(text, index_end, end);

        let index = parse_integer(token).filter(|&n| n >= 0);
        if let (Some(index), true) = (index, after < end && bytes[after] == b')') {
            attach(
                levels,
                ParseNode::Value(ValueNode {
                    value: format!("arg({index})"),
                    position: Span::new(start, after),
                }),
            );
            after + 1
        } else {
            let recover = if after < end && bytes[after] == b')' {
                after + 1
            } else {
                index_end
            };
            attach(
                levels,
                ParseNode::Error(ErrorNode {
                    error: "invalid arg reference".to_string(),
                    position: Span::new(start, recover.saturating_sub(1)),
                }),
            );
            recover
        }
    }

    /// Scan `<...>` starting at the `<`.
    fn scan_operand_args(&self, text: &str, lt_pos: usize, end: usize) -> ArgScan {
        let bytes = text.as_bytes();
        let mut args = Vec::new();
        let mut pos = lt_pos + 1;
        loop {
            pos = skip_separators(text, pos, end);
            if pos >= end {
                return ArgScan {
                    args,
                    position: Span::new(lt_pos, end.saturating_sub(1)),
                    error: Some((
                        "expected \">\"".to_string(),
                        Span::new(lt_pos, end.saturating_sub(1)),
                    )),
                    next: end,
                };
            }
            match bytes[pos] {
                b'>' => {
                    return ArgScan {
                        args,
                        position: Span::new(lt_pos, pos),
                        error: None,
                        next: pos + 1,
                    };
                }
                b'(' | b')' | b'<' => {
                    return ArgScan {
                        args,
                        position: Span::new(lt_pos, pos),
                        error: Some((
                            "found invalid character in operand arguments".to_string(),
                            Span::point(pos),
                        )),
                        next: pos,
                    };
                }
                _ => {
                    let token_start = pos;
                    while pos < end
                        && !is_separator(bytes[pos])
                        && !matches!(bytes[pos], b'>' | b'<' | b'(' | b')')
                    {
                        pos += 1;
                    }
                    let token = &text[token_start..pos];
                    match parse_integer(token) {
                        Some(value) => args.push(OperandArg {
                            value,
                            position: Span::new(token_start, pos - 1),
                        }),
                        None => {
                            return ArgScan {
                                args,
                                position: Span::new(lt_pos, pos - 1),
                                error: Some((
                                    "invalid operand arguments".to_string(),
                                    Span::new(token_start, pos - 1),
                                )),
                                next: pos,
                            };
                        }
                    }
                }
            }
        }
    }

    /// Handle `)`: pop the level and resolve it in its notation.
    fn close_group(
        &self,
        text: &str,
        close_pos: usize,
        end: usize,
        levels: &mut Vec<Level>,
    ) -> usize {
        let bytes = text.as_bytes();
        if levels.len() == 1 {
            attach(
                levels,
                ParseNode::Error(ErrorNode {
                    error: "invalid closing paren".to_string(),
                    position: Span::point(close_pos),
                }),
            );
            return close_pos + 1;
        }

        let mut level = levels.pop().expect("length checked");
        resolver::drain_outputs(
            &mut level.children,
            std::mem::take(&mut level.pending),
            self.placeholder,
        );
        let frame = level.owner.take().expect("group levels always have owners");
        let mut next = close_pos + 1;

        // Infix wins the level: the children collapse into one op.
        if !level.infix_ops.is_empty() {
            let inner = resolver::resolve_infix(
                level.children,
                level.infix_ops,
                Span::new(frame.open_paren, close_pos),
                self.registry,
            );
            if frame.name.is_empty() && frame.error.is_none() && frame.operand_args.is_none() {
                let mut inner = inner;
                // A postfix tail after an infix group mixes notations.
                if let Some((tail_end, _)) = self.postfix_tail(text, next, end) {
                    inner.error = Some("invalid notation".to_string());
                    inner.position = Span::new(frame.head_start, tail_end - 1);
                    next = tail_end;
                } else {
                    inner.position = Span::new(frame.head_start, close_pos);
                }
                attach(levels, ParseNode::Op(inner));
            } else {
                let mut op = self.build_op(frame, vec![ParseNode::Op(inner)], close_pos);
                if op.error.is_none() {
                    resolver::resolve_op(&mut op, self.registry);
                }
                attach(levels, ParseNode::Op(op));
            }
            return next;
        }

        let mut frame = frame;
        if frame.name.is_empty() && frame.error.is_none() {
            // Bare group: look for a postfix tail.
            match self.postfix_tail(text, next, end) {
                Some((tail_end, word_span)) => {
                    let word = &text[word_span.start..=word_span.end];
                    let after_tail = tail_end;
                    if after_tail < end && matches!(bytes[after_tail], b'(' | b'<') {
                        // `)op(` reads as postfix and prefix at once.
                        frame.name = word.to_string();
                        frame.name_span = word_span;
                        frame.error = Some("invalid notation".to_string());
                        next = after_tail;
                    } else {
                        frame.name = word.to_string();
                        frame.name_span = word_span;
                        next = after_tail;
                    }
                }
                None => {
                    frame.error = Some("unknown opcode".to_string());
                }
            }
        }

        let close_at = next.saturating_sub(1).max(close_pos);
        let mut op = self.build_op(frame, level.children, close_pos);
        op.position.end = close_at;
        if op.error.is_none() {
            resolver::resolve_op(&mut op, self.registry);
        }
        attach(levels, ParseNode::Op(op));
        next
    }

    /// A known opcode word after `)`, with optional separators between.
    ///
    /// Returns the position after the word and the word's span.
    fn postfix_tail(&self, text: &str, from: usize, end: usize) -> Option<(usize, Span)> {
        let tail_start = skip_separators(text, from, end);
        if tail_start >= end {
            return None;
        }
        let rest = &text[tail_start..end];
        let word_end = tail_start + next_boundary(rest).unwrap_or(rest.len());
        if word_end == tail_start {
            return None;
        }
        let word = &text[tail_start..word_end];
        self.registry
            .find(word)
            .map(|_| (word_end, Span::new(tail_start, word_end - 1)))
    }

    fn build_op(&self, frame: OpFrame, children: Vec<ParseNode>, close_pos: usize) -> OpNode {
        let mut op = OpNode::unresolved(frame.name, frame.name_span);
        op.position = Span::new(frame.head_start, close_pos);
        op.parens = Span::new(frame.open_paren, close_pos);
        op.parameters = children;
        op.operand_args = frame.operand_args;
        op.error = frame.error;
        op
    }

    /// Close an unterminated group at the end of the sub-expression.
    fn finish_level(&self, _text: &str, mut level: Level, at: usize) -> OpNode {
        resolver::drain_outputs(
            &mut level.children,
            std::mem::take(&mut level.pending),
            self.placeholder,
        );
        let frame = level.owner.take().expect("group levels always have owners");
        if !level.infix_ops.is_empty() {
            let inner = resolver::resolve_infix(
                level.children,
                level.infix_ops,
                Span::new(frame.open_paren, at),
                self.registry,
            );
            return self.build_op(frame, vec![ParseNode::Op(inner)], at);
        }
        self.build_op(frame, level.children, at)
    }
}

/// Push a finished node onto the innermost level, registering multi-output
/// placeholders with that level's cache.
fn attach(levels: &mut Vec<Level>, node: ParseNode) {
    let level = levels.last_mut().expect("root level always present");
    if let ParseNode::Op(op) = &node {
        if op.output.unwrap_or(1) > 1 {
            level.pending.push(PendingOutputs {
                op_index: level.children.len(),
                placeholders: resolver::spawn_placeholders(op),
            });
        }
    }
    level.children.push(node);
}

/// Byte spans of the `;`-separated sub-expressions.
///
/// Every `;` terminates one sub-expression; text after the final `;` forms
/// another only if it is not blank.
fn split_sub_expressions(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (index, byte) in text.bytes().enumerate() {
        if byte == b';' {
            spans.push((start, index));
            start = index + 1;
        }
    }
    if text[start..].bytes().any(|b| !is_separator(b)) {
        spans.push((start, text.len()));
    }
    spans
}
