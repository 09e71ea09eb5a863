use log::debug;

use crate::access::DebugAccess;
use crate::ctype::{CType, TypeKind};
use crate::descriptor::arith::{ArithOp, BitwiseOp, CompareOp, LogicalOp};
use crate::descriptor::{Storage, SymbolDescriptor};
use crate::error::{EvalError, EvalResult};
use crate::ops::{BinOp, UnaryOp};

/// Expression tree produced by the parser.
#[derive(Clone, Debug)]
pub enum AstNode {
    /// A number, character or string literal, already converted to a
    /// descriptor.
    Literal(SymbolDescriptor),
    /// A name to resolve against the host symbol table. Also used for
    /// the right-hand side of `.`/`->`, where only the name matters.
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<AstNode>,
    },
    Binary {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
}

/// State of one `eval` call. Nothing outlives the call; concurrent
/// sessions each carry their own context and `DebugAccess`.
pub struct EvalContext<'a> {
    pub data: &'a mut dyn DebugAccess,
    pub assignment_allowed: bool,
}

/// Post-order walk of the tree.
///
/// Both operands of a binary operator are evaluated before the
/// operator is applied, so `&&` and `||` do not short-circuit; a fault
/// on either side faults the whole expression.
pub fn evaluate(node: &AstNode, ctx: &mut EvalContext) -> EvalResult<SymbolDescriptor> {
    match node {
        AstNode::Literal(value) => Ok(value.clone()),
        AstNode::Identifier(name) => ctx.data.lookup_symbol(name),
        AstNode::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            match op {
                UnaryOp::Plus => Ok(value),
                UnaryOp::Neg => value.neg(ctx.data),
                UnaryOp::Deref => value.dereference(0, ctx.data),
                UnaryOp::AddrOf => value.address_of(ctx.data),
                UnaryOp::Not => value.logical_not(ctx.data),
                UnaryOp::BitNot => value.bit_not(ctx.data),
            }
        }
        AstNode::Binary { op, left, right } => match op {
            BinOp::Member => {
                let base = evaluate(left, ctx)?;
                base.member(member_name(right)?)
            }
            BinOp::Arrow => {
                let base = evaluate(left, ctx)?;
                base.arrow(member_name(right)?, ctx.data)
            }
            BinOp::Index => {
                let base = evaluate(left, ctx)?;
                let index = evaluate(right, ctx)?;
                let index = index.to_signed(ctx.data)?;
                base.dereference(index, ctx.data)
            }
            BinOp::Assign => {
                let mut target = evaluate(left, ctx)?;
                let value = evaluate(right, ctx)?;
                debug!("assignment through `{}`", target.type_of());
                target.assign(&value, ctx.assignment_allowed, ctx.data)
            }
            _ => {
                if let Some(base) = op.compound_base() {
                    let mut target = evaluate(left, ctx)?;
                    let value = evaluate(right, ctx)?;
                    let combined =
                        apply_value_op(&target, &value, base, ctx.data)?;
                    debug!("compound assignment through `{}`", target.type_of());
                    return target.assign(
                        &combined,
                        ctx.assignment_allowed,
                        ctx.data,
                    );
                }
                let lhs = evaluate(left, ctx)?;
                let rhs = evaluate(right, ctx)?;
                apply_value_op(&lhs, &rhs, *op, ctx.data)
            }
        },
    }
}

/// Pure value-level binary operators; structural and assigning
/// operators are handled by the walker above.
fn apply_value_op(
    left: &SymbolDescriptor,
    right: &SymbolDescriptor,
    op: BinOp,
    data: &mut dyn DebugAccess,
) -> EvalResult<SymbolDescriptor> {
    match op {
        BinOp::Add => left.arith(right, ArithOp::Add, data),
        BinOp::Sub => left.arith(right, ArithOp::Sub, data),
        BinOp::Mul => left.arith(right, ArithOp::Mul, data),
        BinOp::Div => left.arith(right, ArithOp::Div, data),
        BinOp::Rem => left.rem(right, data),
        BinOp::BitAnd => left.bitwise(right, BitwiseOp::And, data),
        BinOp::BitOr => left.bitwise(right, BitwiseOp::Or, data),
        BinOp::BitXor => left.bitwise(right, BitwiseOp::Xor, data),
        BinOp::Shl => left.bitwise(right, BitwiseOp::Shl, data),
        BinOp::Shr => left.bitwise(right, BitwiseOp::Shr, data),
        BinOp::Eq => left.compare(right, CompareOp::Eq, data),
        BinOp::Ne => left.compare(right, CompareOp::Ne, data),
        BinOp::Lt => left.compare(right, CompareOp::Lt, data),
        BinOp::Le => left.compare(right, CompareOp::Le, data),
        BinOp::Gt => left.compare(right, CompareOp::Gt, data),
        BinOp::Ge => left.compare(right, CompareOp::Ge, data),
        BinOp::And => left.logical(right, LogicalOp::And, data),
        BinOp::Or => left.logical(right, LogicalOp::Or, data),
        _ => Err(EvalError::Type(format!(
            "operator `{}` cannot be applied to values",
            op.symbol(),
        ))),
    }
}

fn member_name(node: &AstNode) -> EvalResult<&str> {
    match node {
        AstNode::Identifier(name) => Ok(name),
        _ => Err(EvalError::Type(
            "member name must be a plain identifier".into(),
        )),
    }
}

fn lex_err(text: &str, at: usize, reason: &'static str) -> EvalError {
    EvalError::Lex {
        text: text.to_string(),
        at,
        reason,
    }
}

/// Convert a number token into an immediate descriptor.
///
/// Suffixes follow C: `u` selects unsigned (signed otherwise), `ll`
/// widens to `long long`, `l` to `long`; `f` on a floating form
/// selects `float` over `double`.
pub(crate) fn literal_from_number(
    text: &str,
    at: usize,
) -> EvalResult<SymbolDescriptor> {
    let lower = text.to_ascii_lowercase();

    if let Some(body) = lower.strip_prefix("0x") {
        return prefixed_int(text, at, body, 16);
    }
    if let Some(body) = lower.strip_prefix("0b") {
        return prefixed_int(text, at, body, 2);
    }

    let digits_end = lower
        .len()
        - lower
            .bytes()
            .rev()
            .take_while(|c| matches!(c, b'u' | b'l' | b'f'))
            .count();
    let (body, suffix) = lower.split_at(digits_end);

    let is_float = body.contains('.') || body.contains('e') || suffix.contains('f');
    if is_float {
        let value: f64 = body
            .parse()
            .map_err(|_| lex_err(text, at, "malformed floating-point literal"))?;
        return Ok(if suffix.contains('f') {
            SymbolDescriptor::from_float(value as f32)
        } else {
            SymbolDescriptor::from_double(value)
        });
    }

    let radix = if body.len() > 1 && body.starts_with('0') {
        8
    } else {
        10
    };
    let value = u64::from_str_radix(body, radix)
        .map_err(|_| lex_err(text, at, "integer literal out of range"))?;
    int_literal(value, suffix)
}

fn prefixed_int(
    text: &str,
    at: usize,
    body: &str,
    radix: u32,
) -> EvalResult<SymbolDescriptor> {
    let digits_end = body
        .len()
        - body
            .bytes()
            .rev()
            .take_while(|c| matches!(c, b'u' | b'l'))
            .count();
    let (digits, suffix) = body.split_at(digits_end);
    let value = u64::from_str_radix(digits, radix)
        .map_err(|_| lex_err(text, at, "integer literal out of range"))?;
    int_literal(value, suffix)
}

fn int_literal(value: u64, suffix: &str) -> EvalResult<SymbolDescriptor> {
    let kind = if suffix.contains("ll") {
        TypeKind::LongLong
    } else if suffix.contains('l') {
        TypeKind::Long
    } else {
        TypeKind::Int
    };
    let mut sym = SymbolDescriptor::new(
        vec![CType::new(kind)],
        Storage::Immediate(value),
    );
    sym.is_signed = !suffix.contains('u');
    Ok(sym)
}

/// Convert a quoted token into an immediate descriptor: single quotes
/// yield a `char`, double quotes a `char` array carrying up to the
/// first 8 bytes of the decoded text (there is no debuggee allocation
/// to place longer strings in).
pub(crate) fn literal_from_quoted(
    text: &str,
    at: usize,
) -> EvalResult<SymbolDescriptor> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return Err(lex_err(text, at, "malformed quoted literal"));
    }
    let decoded = decode_escapes(&bytes[1..bytes.len() - 1]);

    if bytes[0] == b'\'' {
        let Some(&byte) = decoded.first() else {
            return Err(lex_err(text, at, "empty character literal"));
        };
        let mut sym = SymbolDescriptor::new(
            vec![CType::new(TypeKind::Char)],
            Storage::Immediate(u64::from(byte)),
        );
        sym.is_signed = true;
        return Ok(sym);
    }

    let mut bits = 0u64;
    for (i, byte) in decoded.iter().take(8).enumerate() {
        bits |= u64::from(*byte) << (i * 8);
    }
    let mut sym = SymbolDescriptor::new(
        vec![
            CType::array(decoded.len() as u32),
            CType::new(TypeKind::Char),
        ],
        Storage::Immediate(bits),
    );
    sym.is_signed = true;
    sym.size = decoded.len() as u64;
    Ok(sym)
}

fn decode_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let c = raw[i];
        i += 1;
        if c != b'\\' || i >= raw.len() {
            out.push(c);
            continue;
        }
        let escaped = raw[i];
        i += 1;
        out.push(match escaped {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'0' => 0,
            other => other,
        });
    }
    out
}
