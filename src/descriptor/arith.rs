use num_traits::{CheckedDiv, PrimInt, WrappingAdd, WrappingMul, WrappingSub};

use crate::access::{host_err, DebugAccess};
use crate::ctype::{promote_kind, CType, TypeKind};
use crate::descriptor::{Storage, SymbolDescriptor};
use crate::error::{EvalError, EvalResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Modular integer arithmetic shared by the signed and unsigned paths.
/// Division is the one partial case: a zero divisor faults, and the
/// lone overflowing quotient (MIN / -1) wraps.
fn int_arith<T>(op: ArithOp, a: T, b: T) -> EvalResult<T>
where
    T: PrimInt + WrappingAdd + WrappingSub + WrappingMul + CheckedDiv,
{
    Ok(match op {
        ArithOp::Add => a.wrapping_add(&b),
        ArithOp::Sub => a.wrapping_sub(&b),
        ArithOp::Mul => a.wrapping_mul(&b),
        ArithOp::Div => match a.checked_div(&b) {
            Some(quotient) => quotient,
            None if b.is_zero() => return Err(EvalError::DivisionByZero),
            None => a,
        },
    })
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> f64 {
    // IEEE semantics: division by zero produces ±inf / NaN
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
    }
}

impl SymbolDescriptor {
    /// Reject operand types that have no scalar projection.
    fn scalar_operand(&self, op: &str) -> EvalResult<&CType> {
        let head = self.head()?;
        if matches!(head.kind, TypeKind::Struct | TypeKind::Union) {
            return Err(EvalError::Type(format!(
                "operator `{op}` is not defined for `{}`",
                self.type_of(),
            )));
        }
        Ok(head)
    }

    /// Fresh immediate result carrying `kind` at the head of this
    /// value's layer stack.
    fn scalar_result(
        &self,
        kind: TypeKind,
        bits: u64,
        signed: bool,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        let mut ctype = self.ctype.clone();
        if ctype.is_empty() {
            ctype.push(CType::new(TypeKind::Unknown));
        } else {
            ctype[0] = CType::new(kind);
        }
        let mut result = SymbolDescriptor::new(ctype, Storage::Immediate(bits));
        result.is_signed = signed;
        result.size =
            u64::from(data.type_size(&CType::new(kind)).map_err(host_err)?);
        Ok(result)
    }

    /// `+ - * /` with C promotion: float-ness computes in double,
    /// otherwise a signed operand forces the signed 64-bit path.
    /// Pointers participate as plain integers; only dereference and
    /// indexing scale by the element size.
    pub fn arith(
        &self,
        right: &SymbolDescriptor,
        op: ArithOp,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        self.scalar_operand(op_name(op))?;
        right.scalar_operand(op_name(op))?;

        let promoted = promote_kind(self.head()?, right.head()?, data)?;
        let signed = self.is_signed || right.is_signed;

        if promoted.is_float() {
            let value =
                float_arith(op, self.to_double(data)?, right.to_double(data)?);
            return self.scalar_result(
                TypeKind::Double,
                value.to_bits(),
                signed,
                data,
            );
        }
        let bits = if signed {
            let a = if self.is_signed {
                self.to_signed(data)?
            } else {
                self.to_unsigned(data)? as i64
            };
            let b = if right.is_signed {
                right.to_signed(data)?
            } else {
                right.to_unsigned(data)? as i64
            };
            int_arith(op, a, b)? as u64
        } else {
            int_arith(op, self.to_unsigned(data)?, right.to_unsigned(data)?)?
        };
        self.scalar_result(promoted, bits, signed, data)
    }

    /// Unary minus: negate in the value's own promoted domain.
    pub fn neg(&self, data: &mut dyn DebugAccess) -> EvalResult<SymbolDescriptor> {
        let kind = self.scalar_operand("-")?.kind;
        if kind.is_float() {
            let value = -self.to_double(data)?;
            return self.scalar_result(
                TypeKind::Double,
                value.to_bits(),
                self.is_signed,
                data,
            );
        }
        let bits = if self.is_signed {
            self.to_signed(data)?.wrapping_neg() as u64
        } else {
            self.to_unsigned(data)?.wrapping_neg()
        };
        self.scalar_result(kind, bits, self.is_signed, data)
    }

    /// `%` always operates on unsigned 64-bit values; the result type
    /// is plain `int`. This intentionally diverges from C's signed
    /// modulo.
    pub fn rem(
        &self,
        right: &SymbolDescriptor,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        self.scalar_operand("%")?;
        right.scalar_operand("%")?;
        let divisor = right.to_unsigned(data)?;
        if divisor == 0 {
            return Err(EvalError::DivisionByZero);
        }
        let bits = self.to_unsigned(data)? % divisor;
        let mut result = SymbolDescriptor::new(
            vec![CType::new(TypeKind::Int)],
            Storage::Immediate(bits),
        );
        result.is_signed = self.is_signed;
        result.size =
            u64::from(data.type_size(&CType::new(TypeKind::Int)).map_err(host_err)?);
        Ok(result)
    }

    /// `& | ^ << >>`: both operands cast to unsigned 64-bit, logical
    /// shifts, no sign extension. Shift counts past the container
    /// produce 0.
    pub fn bitwise(
        &self,
        right: &SymbolDescriptor,
        op: BitwiseOp,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        self.scalar_operand(bit_name(op))?;
        right.scalar_operand(bit_name(op))?;
        let a = self.to_unsigned(data)?;
        let b = right.to_unsigned(data)?;
        let bits = match op {
            BitwiseOp::And => a & b,
            BitwiseOp::Or => a | b,
            BitwiseOp::Xor => a ^ b,
            BitwiseOp::Shl => {
                u32::try_from(b).ok().and_then(|s| a.checked_shl(s)).unwrap_or(0)
            }
            BitwiseOp::Shr => {
                u32::try_from(b).ok().and_then(|s| a.checked_shr(s)).unwrap_or(0)
            }
        };
        let (kind, signed) = match op {
            // shifts keep the left operand's type
            BitwiseOp::Shl | BitwiseOp::Shr => (self.head()?.kind, self.is_signed),
            _ => (
                promote_kind(self.head()?, right.head()?, data)?,
                self.is_signed || right.is_signed,
            ),
        };
        self.scalar_result(kind, bits, signed, data)
    }

    /// `~`.
    pub fn bit_not(&self, data: &mut dyn DebugAccess) -> EvalResult<SymbolDescriptor> {
        let kind = self.scalar_operand("~")?.kind;
        let bits = !self.to_unsigned(data)?;
        self.scalar_result(kind, bits, self.is_signed, data)
    }

    /// `== != < <= > >=`: compared as doubles if either side is a
    /// float, as signed if either side is signed, as unsigned
    /// otherwise. The result is a `bool` holding 0 or 1.
    pub fn compare(
        &self,
        right: &SymbolDescriptor,
        op: CompareOp,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        self.scalar_operand(cmp_name(op))?;
        right.scalar_operand(cmp_name(op))?;
        let truth = if self.head()?.kind.is_float() || right.head()?.kind.is_float()
        {
            cmp(op, &self.to_double(data)?, &right.to_double(data)?)
        } else if self.is_signed || right.is_signed {
            cmp(op, &self.to_signed(data)?, &right.to_signed(data)?)
        } else {
            cmp(op, &self.to_unsigned(data)?, &right.to_unsigned(data)?)
        };
        self.bool_result(truth, data)
    }

    /// `&& ||`. Both operands have already been evaluated by the time
    /// this runs: these operators do not short-circuit.
    pub fn logical(
        &self,
        right: &SymbolDescriptor,
        op: LogicalOp,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        let a = self.truthy(data)?;
        let b = right.truthy(data)?;
        let truth = match op {
            LogicalOp::And => a && b,
            LogicalOp::Or => a || b,
        };
        self.bool_result(truth, data)
    }

    /// `!`.
    pub fn logical_not(&self, data: &mut dyn DebugAccess) -> EvalResult<SymbolDescriptor> {
        let truth = !self.truthy(data)?;
        self.bool_result(truth, data)
    }

    fn truthy(&self, data: &mut dyn DebugAccess) -> EvalResult<bool> {
        if self.head()?.kind.is_float() {
            Ok(self.to_double(data)? != 0.0)
        } else {
            Ok(self.to_unsigned(data)? != 0)
        }
    }

    fn bool_result(
        &self,
        truth: bool,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        let mut result = SymbolDescriptor::new(
            vec![CType::new(TypeKind::Bool)],
            Storage::Immediate(u64::from(truth)),
        );
        result.size =
            u64::from(data.type_size(&CType::new(TypeKind::Bool)).map_err(host_err)?);
        Ok(result)
    }
}

fn cmp<T: PartialOrd>(op: CompareOp, a: &T, b: &T) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

fn op_name(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
    }
}

fn bit_name(op: BitwiseOp) -> &'static str {
    match op {
        BitwiseOp::And => "&",
        BitwiseOp::Or => "|",
        BitwiseOp::Xor => "^",
        BitwiseOp::Shl => "<<",
        BitwiseOp::Shr => ">>",
    }
}

fn cmp_name(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}
