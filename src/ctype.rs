use crate::access::{host_err, DebugAccess};
use crate::error::{EvalError, EvalResult};

/// Tag of a single type layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    Struct,
    Union,
    Pointer,
    Array,
    Bitfield,
    Unknown,
}

impl TypeKind {
    pub fn is_float(self) -> bool {
        matches!(self, TypeKind::Float | TypeKind::Double)
    }

    pub fn is_indirect(self) -> bool {
        matches!(self, TypeKind::Pointer | TypeKind::Array)
    }
}

/// One layer of a declarator.
///
/// A value's type is an ordered stack of layers read outermost-first:
/// `[Pointer, Pointer, Char]` is pointer-to-pointer-to-char,
/// `[Array(4), Int]` is array-of-4-int. A well-formed stack is never
/// empty, `Pointer`/`Array` layers always have a deeper layer under
/// them, and `Struct`/`Union` only appear as the innermost layer (their
/// substructure lives in the descriptor's member map, not in further
/// layers).
#[derive(Clone, Debug)]
pub struct CType {
    pub kind: TypeKind,
    /// Tag name, used by `Struct`/`Union` only.
    pub name: Option<String>,
    /// `Array`: element count. `Bitfield`: width in bits.
    pub size: u32,
    /// `Bitfield`: starting bit inside the containing storage unit.
    pub offset: u32,
}

/// Layer equality is kind-only; tag names, element counts and bitfield
/// geometry do not participate.
impl PartialEq for CType {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for CType {}

impl CType {
    pub fn new(kind: TypeKind) -> Self {
        CType {
            kind,
            name: None,
            size: 0,
            offset: 0,
        }
    }

    pub fn tagged(kind: TypeKind, name: impl Into<String>) -> Self {
        CType {
            kind,
            name: Some(name.into()),
            size: 0,
            offset: 0,
        }
    }

    pub fn array(elements: u32) -> Self {
        CType {
            kind: TypeKind::Array,
            name: None,
            size: elements,
            offset: 0,
        }
    }

    pub fn bitfield(width: u32, start_bit: u32) -> Self {
        CType {
            kind: TypeKind::Bitfield,
            name: None,
            size: width,
            offset: start_bit,
        }
    }
}

/// Byte size of the object described by `stack[level..]`.
///
/// Array layers multiply the element count with the size one level
/// deeper; every other layer is a primitive whose width the host
/// dictates (so 16- vs 32- vs 64-bit targets can disagree).
pub fn item_size(
    stack: &[CType],
    level: usize,
    data: &mut dyn DebugAccess,
) -> EvalResult<u64> {
    let Some(layer) = stack.get(level) else {
        return Err(EvalError::Type(
            "type stack exhausted while computing a size".into(),
        ));
    };
    match layer.kind {
        TypeKind::Array => {
            let inner = item_size(stack, level + 1, data)?;
            Ok(u64::from(layer.size) * inner)
        }
        _ => {
            let size = data.type_size(layer).map_err(host_err)?;
            Ok(u64::from(size))
        }
    }
}

/// Usual-arithmetic-conversion, reduced: float-ness wins and widens to
/// double, then pointer-ness, then the wider operand. Ties pick left.
pub fn promote_kind(
    left: &CType,
    right: &CType,
    data: &mut dyn DebugAccess,
) -> EvalResult<TypeKind> {
    if left.kind.is_float() || right.kind.is_float() {
        return Ok(TypeKind::Double);
    }
    if left.kind == TypeKind::Pointer || right.kind == TypeKind::Pointer {
        return Ok(TypeKind::Pointer);
    }
    let left_size = data.type_size(left).map_err(host_err)?;
    let right_size = data.type_size(right).map_err(host_err)?;
    if right_size > left_size {
        Ok(right.kind)
    } else {
        Ok(left.kind)
    }
}

/// Parse a whitespace-separated C type spelling into a layer stack plus
/// an unsigned flag: `"unsigned long long * *"`, `"char *"`, `"point *"`.
///
/// `*` prepends a pointer layer, `unsigned`/`signed` set the flag,
/// `long long` merges into one layer, `struct`/`union` mark the next
/// word as a tag, and an unknown word is taken to be a struct tag.
pub fn parse_type_string(text: &str) -> (Vec<CType>, bool) {
    let mut stack = Vec::new();
    let mut unsigned = false;
    let mut pending_long = false;
    let mut pending_tag: Option<TypeKind> = None;

    let mut flush_long = |stack: &mut Vec<CType>, pending: &mut bool| {
        if *pending {
            stack.push(CType::new(TypeKind::Long));
            *pending = false;
        }
    };

    for word in text.split_whitespace() {
        if let Some(kind) = pending_tag.take() {
            stack.insert(0, CType::tagged(kind, word));
            continue;
        }
        match word {
            "*" => stack.insert(0, CType::new(TypeKind::Pointer)),
            "unsigned" => unsigned = true,
            "signed" => unsigned = false,
            "long" => {
                if pending_long {
                    stack.push(CType::new(TypeKind::LongLong));
                    pending_long = false;
                } else {
                    pending_long = true;
                }
            }
            "int" => {
                // "long int" spells a plain long
                if pending_long {
                    flush_long(&mut stack, &mut pending_long);
                } else {
                    stack.push(CType::new(TypeKind::Int));
                }
            }
            "void" => stack.push(CType::new(TypeKind::Void)),
            "bool" => stack.push(CType::new(TypeKind::Bool)),
            "char" => stack.push(CType::new(TypeKind::Char)),
            "short" => stack.push(CType::new(TypeKind::Short)),
            "float" => stack.push(CType::new(TypeKind::Float)),
            "double" => stack.push(CType::new(TypeKind::Double)),
            "struct" => pending_tag = Some(TypeKind::Struct),
            "union" => pending_tag = Some(TypeKind::Union),
            tag => stack.insert(0, CType::tagged(TypeKind::Struct, tag)),
        }
    }
    flush_long(&mut stack, &mut pending_long);

    (stack, unsigned)
}
