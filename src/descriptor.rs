pub mod arith;
pub mod format;

use indexmap::IndexMap;
use log::trace;

use crate::access::{host_err, DebugAccess};
use crate::ctype::{item_size, CType, TypeKind};
use crate::error::{EvalError, EvalResult};

/// Where a value's bits live. Exactly one interpretation applies per
/// read or write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Storage {
    /// Immediate bit pattern: integer bits, or IEEE-754 float bits
    /// zero-extended to 64.
    Immediate(u64),
    /// The value lives in debuggee memory at this address.
    Address(u64),
    /// The value lives at `stack_pointer() + offset`.
    Stack(i32),
    /// The value is assembled from these registers, ascending index =
    /// ascending byte (little-endian). At most 8 are used.
    Registers(Vec<u8>),
}

impl Storage {
    /// Anything with addressable backing may be assigned to or have
    /// `&` applied; immediates may not.
    pub fn is_lvalue(&self) -> bool {
        !matches!(self, Storage::Immediate(_))
    }
}

/// A struct or union member: the member's own descriptor plus its byte
/// offset inside the containing object.
#[derive(Clone, Debug)]
pub struct Member {
    pub symbol: Box<SymbolDescriptor>,
    pub offset: i64,
}

/// One typed value: a layered C type plus the storage backing it.
///
/// Descriptors are value objects. Operators return fresh descriptors;
/// the only mutating operation is [`SymbolDescriptor::assign`], which
/// writes through the backing storage of an lvalue.
#[derive(Clone, Debug)]
pub struct SymbolDescriptor {
    pub name: Option<String>,
    /// Type layers, outermost first. See [`CType`] for the invariants.
    pub ctype: Vec<CType>,
    pub storage: Storage,
    /// Interpretation flag for integer kinds.
    pub is_signed: bool,
    /// Cached byte size; 0 when it has not been computed yet.
    pub size: u64,
    /// `Struct`/`Union` members, in declaration order.
    pub members: IndexMap<String, Member>,
}

impl SymbolDescriptor {
    pub fn new(ctype: Vec<CType>, storage: Storage) -> Self {
        SymbolDescriptor {
            name: None,
            ctype,
            storage,
            is_signed: false,
            size: 0,
            members: IndexMap::new(),
        }
    }

    /// `long long` immediate, signed.
    pub fn from_signed(value: i64) -> Self {
        let mut sym = SymbolDescriptor::new(
            vec![CType::new(TypeKind::LongLong)],
            Storage::Immediate(value as u64),
        );
        sym.is_signed = true;
        sym
    }

    /// `unsigned long long` immediate.
    pub fn from_unsigned(value: u64) -> Self {
        SymbolDescriptor::new(
            vec![CType::new(TypeKind::LongLong)],
            Storage::Immediate(value),
        )
    }

    /// `double` immediate.
    pub fn from_double(value: f64) -> Self {
        SymbolDescriptor::new(
            vec![CType::new(TypeKind::Double)],
            Storage::Immediate(value.to_bits()),
        )
    }

    /// `float` immediate; bits are zero-extended to the 64-bit container.
    pub fn from_float(value: f32) -> Self {
        SymbolDescriptor::new(
            vec![CType::new(TypeKind::Float)],
            Storage::Immediate(u64::from(value.to_bits())),
        )
    }

    /// Outermost type layer.
    pub fn head(&self) -> EvalResult<&CType> {
        self.ctype
            .first()
            .ok_or_else(|| EvalError::Type("value has an empty type stack".into()))
    }

    pub fn is_lvalue(&self) -> bool {
        self.storage.is_lvalue()
    }

    fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.type_of(),
        }
    }

    /// Memory address of the backing, when the backing is memory.
    fn memory_address(&self, data: &mut dyn DebugAccess) -> EvalResult<Option<u64>> {
        match self.storage {
            Storage::Address(addr) => Ok(Some(addr)),
            Storage::Stack(offset) => {
                let sp = data.stack_pointer().map_err(host_err)?;
                Ok(Some(sp.wrapping_add(offset as i64 as u64)))
            }
            _ => Ok(None),
        }
    }

    /// Number of bytes a memory or register read/write covers: the
    /// width of the outermost layer, capped at the 64-bit container.
    fn backing_width(&self, data: &mut dyn DebugAccess) -> EvalResult<usize> {
        let head = self.head()?;
        let width = match head.kind {
            // enough bytes to cover the addressed bits
            TypeKind::Bitfield => ((head.offset + head.size) as usize).div_ceil(8),
            _ => usize::from(data.type_size(head).map_err(host_err)?),
        };
        Ok(width.min(8))
    }

    /// Raw 64-bit little-endian bit pattern behind this value.
    ///
    /// Arrays decay: an array lvalue reads as the address of its first
    /// element, which is what indexing and pointer arithmetic consume.
    /// Narrow signed integers read from memory or registers are
    /// sign-extended into the 64-bit container; immediates are already
    /// full-width. Bitfields read their containing bytes and extract
    /// the addressed bit range.
    pub fn read_bits(&self, data: &mut dyn DebugAccess) -> EvalResult<u64> {
        let (bits, width) = match &self.storage {
            Storage::Registers(regs) => {
                let mut bits = 0u64;
                for (i, reg) in regs.iter().take(8).enumerate() {
                    let byte = data.read_register(*reg).map_err(host_err)?;
                    bits |= u64::from(byte) << (i * 8);
                }
                (bits, Some(regs.len().min(8)))
            }
            Storage::Address(_) | Storage::Stack(_) => {
                let addr = self.memory_address(data)?.unwrap();
                if self.head()?.kind == TypeKind::Array {
                    return Ok(addr);
                }
                let width = self.backing_width(data)?;
                let mut bits = 0u64;
                for i in 0..width {
                    let byte =
                        data.read_byte(addr.wrapping_add(i as u64)).map_err(host_err)?;
                    bits |= u64::from(byte) << (i * 8);
                }
                (bits, Some(width))
            }
            Storage::Immediate(value) => (*value, None),
        };
        let head = self.head()?;
        if head.kind == TypeKind::Bitfield {
            return Ok(self.extract_bitfield(bits, head.offset, head.size));
        }
        if let Some(width) = width {
            return Ok(self.sign_extend(bits, width, head.kind));
        }
        Ok(bits)
    }

    fn sign_extend(&self, bits: u64, width: usize, kind: TypeKind) -> u64 {
        let extendable = self.is_signed
            && !kind.is_float()
            && !kind.is_indirect()
            && width > 0
            && width < 8;
        if extendable && bits & (1u64 << (width * 8 - 1)) != 0 {
            bits | (u64::MAX << (width * 8))
        } else {
            bits
        }
    }

    fn extract_bitfield(&self, container: u64, start: u32, width: u32) -> u64 {
        let width = width.min(64);
        let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
        let raw = (container >> start) & mask;
        if self.is_signed && width < 64 && raw & (1 << (width - 1)) != 0 {
            raw | !mask
        } else {
            raw
        }
    }

    /// Write a 64-bit pattern through the backing. Memory and register
    /// backings only write the outermost layer's width; immediates
    /// replace the stored pattern.
    pub fn write_bits(&mut self, bits: u64, data: &mut dyn DebugAccess) -> EvalResult<()> {
        let head = self.head()?.clone();
        let bits = if head.kind == TypeKind::Bitfield {
            let container = self.read_container(data)?;
            let width = head.size.min(64);
            let mask = if width == 64 {
                u64::MAX
            } else {
                ((1u64 << width) - 1) << head.offset
            };
            (container & !mask) | ((bits << head.offset) & mask)
        } else {
            bits
        };
        trace!("write through {:?}: {bits:#x}", self.storage);
        if let Storage::Immediate(_) = self.storage {
            self.storage = Storage::Immediate(bits);
            return Ok(());
        }
        let width = self.backing_width(data)?;
        match &self.storage {
            Storage::Registers(regs) => {
                for (i, reg) in regs.iter().take(width).enumerate() {
                    let byte = ((bits >> (i * 8)) & 0xff) as u8;
                    data.write_register(*reg, byte).map_err(host_err)?;
                }
            }
            Storage::Address(_) | Storage::Stack(_) => {
                let addr = self.memory_address(data)?.unwrap();
                for i in 0..width {
                    let byte = ((bits >> (i * 8)) & 0xff) as u8;
                    data.write_byte(addr.wrapping_add(i as u64), byte)
                        .map_err(host_err)?;
                }
            }
            Storage::Immediate(_) => unreachable!(),
        }
        Ok(())
    }

    /// Raw container bits without bitfield extraction, for
    /// read-modify-write.
    fn read_container(&self, data: &mut dyn DebugAccess) -> EvalResult<u64> {
        match &self.storage {
            Storage::Immediate(value) => Ok(*value),
            Storage::Registers(regs) => {
                let mut bits = 0u64;
                for (i, reg) in regs.iter().take(8).enumerate() {
                    bits |= u64::from(data.read_register(*reg).map_err(host_err)?) << (i * 8);
                }
                Ok(bits)
            }
            Storage::Address(_) | Storage::Stack(_) => {
                let addr = self.memory_address(data)?.unwrap();
                let mut bits = 0u64;
                for i in 0..self.backing_width(data)? {
                    let byte =
                        data.read_byte(addr.wrapping_add(i as u64)).map_err(host_err)?;
                    bits |= u64::from(byte) << (i * 8);
                }
                Ok(bits)
            }
        }
    }

    // ---- projections --------------------------------------------------
    //
    // The four projections below are the only paths from raw backing
    // bits to a typed number. Arithmetic never touches raw bits of a
    // float directly.

    pub fn to_unsigned(&self, data: &mut dyn DebugAccess) -> EvalResult<u64> {
        let bits = self.read_bits(data)?;
        Ok(match self.head()?.kind {
            TypeKind::Float => f32::from_bits(bits as u32) as u64,
            TypeKind::Double => f64::from_bits(bits) as u64,
            _ => bits,
        })
    }

    pub fn to_signed(&self, data: &mut dyn DebugAccess) -> EvalResult<i64> {
        let bits = self.read_bits(data)?;
        Ok(match self.head()?.kind {
            TypeKind::Float => f32::from_bits(bits as u32) as i64,
            TypeKind::Double => f64::from_bits(bits) as i64,
            _ => bits as i64,
        })
    }

    pub fn to_double(&self, data: &mut dyn DebugAccess) -> EvalResult<f64> {
        let bits = self.read_bits(data)?;
        Ok(match self.head()?.kind {
            TypeKind::Float => f64::from(f32::from_bits(bits as u32)),
            TypeKind::Double => f64::from_bits(bits),
            _ if self.is_signed => bits as i64 as f64,
            _ => bits as f64,
        })
    }

    pub fn to_float(&self, data: &mut dyn DebugAccess) -> EvalResult<f32> {
        let bits = self.read_bits(data)?;
        Ok(match self.head()?.kind {
            TypeKind::Float => f32::from_bits(bits as u32),
            TypeKind::Double => f64::from_bits(bits) as f32,
            _ if self.is_signed => bits as i64 as f32,
            _ => bits as f32,
        })
    }

    // ---- structural operations ----------------------------------------

    /// `*value` and `value[index]`.
    ///
    /// Strips the outermost pointer/array layer and lands on
    /// `base + index * element_size`. The result is an lvalue at that
    /// address except when another array layer remains: arrays decay,
    /// so dereferencing an array-of-array yields the sub-array's
    /// address as an rvalue.
    pub fn dereference(
        &self,
        index: i64,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        let head = self.head()?;
        if !head.kind.is_indirect() || self.ctype.len() < 2 {
            return Err(EvalError::Type(format!(
                "cannot dereference non-pointer `{}` of type `{}`",
                self.label(),
                self.type_of(),
            )));
        }
        let stripped: Vec<CType> = self.ctype[1..].to_vec();
        let elem_size = item_size(&stripped, 0, data)?;
        let base = self.read_bits(data)?;
        let addr = base.wrapping_add(index.wrapping_mul(elem_size as i64) as u64);

        let mut result = SymbolDescriptor::new(stripped, Storage::Address(addr));
        result.is_signed = self.is_signed;
        result.size = elem_size;
        if result.head()?.kind == TypeKind::Array {
            // arrays decay: the sub-array is its address, not an lvalue
            result.storage = Storage::Immediate(addr);
        }
        if !self.members.is_empty() {
            result.members = self.members.clone();
            result.rebase_members(addr);
        }
        Ok(result)
    }

    /// Re-bind the member template to a concrete object address, so a
    /// dereferenced pointer-to-struct exposes members at
    /// `addr + offset`. Nested aggregates follow recursively.
    fn rebase_members(&mut self, base: u64) {
        for member in self.members.values_mut() {
            let at = base.wrapping_add(member.offset as u64);
            member.symbol.storage = Storage::Address(at);
            member.symbol.rebase_members(at);
        }
    }

    /// `&value`. A true address only exists for lvalues; anything else
    /// yields the host's invalid-address sentinel. The result is never
    /// itself an lvalue.
    pub fn address_of(&self, data: &mut dyn DebugAccess) -> EvalResult<SymbolDescriptor> {
        let addr = match &self.storage {
            Storage::Address(_) | Storage::Stack(_) => {
                self.memory_address(data)?.unwrap()
            }
            // register backings have no memory address either
            _ => data.invalid_address(),
        };
        let mut ctype = Vec::with_capacity(self.ctype.len() + 1);
        ctype.push(CType::new(TypeKind::Pointer));
        ctype.extend(self.ctype.iter().cloned());
        let mut result = SymbolDescriptor::new(ctype, Storage::Immediate(addr));
        result.is_signed = self.is_signed;
        result.size = u64::from(
            data.type_size(&CType::new(TypeKind::Pointer)).map_err(host_err)?,
        );
        // carry the member template along so (&s)->m resolves
        result.members = self.members.clone();
        Ok(result)
    }

    /// `value.name`.
    pub fn member(&self, name: &str) -> EvalResult<SymbolDescriptor> {
        let head = self.head()?;
        if !matches!(head.kind, TypeKind::Struct | TypeKind::Union) {
            return Err(EvalError::Type(format!(
                "member access on non-struct `{}` of type `{}`",
                self.label(),
                self.type_of(),
            )));
        }
        match self.members.get(name) {
            Some(member) => Ok((*member.symbol).clone()),
            None => Err(EvalError::MemberNotFound {
                container: self.label(),
                member: name.to_string(),
            }),
        }
    }

    /// `value->name`: dereference, then member access.
    pub fn arrow(
        &self,
        name: &str,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        if self.head()?.kind != TypeKind::Pointer {
            return Err(EvalError::Type(format!(
                "`->` on non-pointer `{}` of type `{}`",
                self.label(),
                self.type_of(),
            )));
        }
        self.dereference(0, data)?.member(name)
    }

    /// `target = right`: convert the right-hand value into this
    /// value's interpretation and write it through the backing. Only
    /// permitted when the evaluation was opened with assignment
    /// allowed, and only on lvalues.
    pub fn assign(
        &mut self,
        right: &SymbolDescriptor,
        assignment_allowed: bool,
        data: &mut dyn DebugAccess,
    ) -> EvalResult<SymbolDescriptor> {
        if !assignment_allowed {
            return Err(EvalError::AssignmentDenied);
        }
        if !self.is_lvalue() {
            return Err(EvalError::NotAnLvalue(self.label()));
        }
        let bits = match self.head()?.kind {
            TypeKind::Float => u64::from((right.to_double(data)? as f32).to_bits()),
            TypeKind::Double => right.to_double(data)?.to_bits(),
            _ if self.is_signed => right.to_signed(data)? as u64,
            _ => right.to_unsigned(data)?,
        };
        self.write_bits(bits, data)?;
        Ok(self.clone())
    }
}
