use std::fmt::Write;

use crate::access::DebugAccess;
use crate::ctype::TypeKind;
use crate::descriptor::SymbolDescriptor;
use crate::error::EvalResult;

impl SymbolDescriptor {
    /// C spelling of the type stack: leading `*`s for pointer layers,
    /// the base type with an `unsigned` prefix where it applies, then
    /// `[N]` suffixes for array layers.
    pub fn type_of(&self) -> String {
        if self.ctype.is_empty() {
            return "<unknown type>".to_string();
        }
        let mut out = String::new();

        let mut level = 0;
        while level < self.ctype.len() && self.ctype[level].kind == TypeKind::Pointer
        {
            out.push('*');
            level += 1;
        }
        let mut suffix = String::new();
        while level < self.ctype.len() && self.ctype[level].kind == TypeKind::Array {
            let _ = write!(suffix, "[{}]", self.ctype[level].size);
            level += 1;
        }
        let Some(base) = self.ctype.get(level) else {
            out.push_str("<unknown type>");
            return out;
        };

        let unsigned_applies = !matches!(
            base.kind,
            TypeKind::Void
                | TypeKind::Bool
                | TypeKind::Float
                | TypeKind::Double
                | TypeKind::Struct
                | TypeKind::Union
        );
        if !self.is_signed && unsigned_applies {
            out.push_str("unsigned ");
        }
        for (i, layer) in self.ctype[level..].iter().enumerate() {
            if layer.kind == TypeKind::Pointer {
                out.push('*');
                continue;
            }
            if i != 0 {
                out.push(' ');
            }
            match layer.kind {
                TypeKind::Void => out.push_str("void"),
                TypeKind::Bool => out.push_str("bool"),
                TypeKind::Char => out.push_str("char"),
                TypeKind::Short => out.push_str("short"),
                TypeKind::Int => out.push_str("int"),
                TypeKind::Long => out.push_str("long"),
                TypeKind::LongLong => out.push_str("long long"),
                TypeKind::Float => out.push_str("float"),
                TypeKind::Double => out.push_str("double"),
                TypeKind::Struct => {
                    out.push_str("struct");
                    if let Some(tag) = &layer.name {
                        let _ = write!(out, " {tag}");
                    }
                }
                TypeKind::Union => {
                    out.push_str("union");
                    if let Some(tag) = &layer.name {
                        let _ = write!(out, " {tag}");
                    }
                }
                TypeKind::Bitfield => {
                    let _ = write!(out, "int : {}", layer.size);
                }
                TypeKind::Unknown => out.push_str("<unknown type>"),
                TypeKind::Pointer | TypeKind::Array => unreachable!(),
            }
        }
        if !suffix.is_empty() {
            out.push(' ');
            out.push_str(&suffix);
        }
        out
    }

    /// Human-readable rendering of the value.
    ///
    /// Scalars print as `(type) value`. Pointers print bare addresses,
    /// with pointer-to-char following the NUL-terminated string at the
    /// target (`0x4000 "hi"`, NULL as `0x0`). Structs print their
    /// members in declaration order, arrays their elements.
    pub fn display(&self, data: &mut dyn DebugAccess) -> EvalResult<String> {
        let Some(head) = self.ctype.first() else {
            return Ok("<unknown type>".to_string());
        };
        match head.kind {
            TypeKind::Pointer => {
                let addr = self.read_bits(data)?;
                if self.ctype.get(1).map(|layer| layer.kind)
                    == Some(TypeKind::Char)
                {
                    if addr == 0 {
                        return Ok("0x0".to_string());
                    }
                    let mut out = format!("{addr:#x} \"");
                    let mut at = addr;
                    loop {
                        let byte = data
                            .read_byte(at)
                            .map_err(crate::access::host_err)?;
                        if byte == 0 {
                            break;
                        }
                        out.push(byte as char);
                        at = at.wrapping_add(1);
                    }
                    out.push('"');
                    Ok(out)
                } else {
                    Ok(format!("{addr:#x}"))
                }
            }
            TypeKind::Struct | TypeKind::Union => {
                let mut out = match &head.name {
                    Some(tag) => format!("{tag}{{ "),
                    None => "{ ".to_string(),
                };
                for (name, member) in &self.members {
                    let value = member.symbol.display(data)?;
                    let _ = write!(out, "{name} = {value}, ");
                }
                out.push('}');
                Ok(out)
            }
            TypeKind::Array => {
                let mut out = String::from("[");
                for index in 0..head.size {
                    if index != 0 {
                        out.push_str(", ");
                    }
                    let element = self.dereference(i64::from(index), data)?;
                    out.push_str(&element.display(data)?);
                }
                out.push(']');
                Ok(out)
            }
            TypeKind::Float | TypeKind::Double => {
                Ok(format!("({}) {}", self.type_of(), self.to_double(data)?))
            }
            TypeKind::Bool => {
                Ok(format!("({}) {}", self.type_of(), self.to_unsigned(data)?))
            }
            _ if self.is_signed => {
                Ok(format!("({}) {}", self.type_of(), self.to_signed(data)?))
            }
            _ => Ok(format!("({}) {}", self.type_of(), self.to_unsigned(data)?)),
        }
    }
}
