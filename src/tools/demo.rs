use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};

use cdbg_expr::{
    CType, DebugAccess, EvalError, EvalResult, Member, Storage,
    SymbolDescriptor, TypeKind,
};

const STACK_POINTER: u64 = 0x7000;

/// A canned 32-bit debuggee image so the tools have something to poke
/// at: a global counter, a `point` struct with a pointer to it, an int
/// array, a C string and a register-resident tick counter.
pub struct DemoDebugger {
    memory: HashMap<u64, u8>,
    registers: [u8; 16],
    symbols: HashMap<String, SymbolDescriptor>,
}

impl DemoDebugger {
    pub fn new() -> Self {
        let mut demo = DemoDebugger {
            memory: HashMap::new(),
            registers: [0; 16],
            symbols: HashMap::new(),
        };

        // counter: unsigned int = 41 at 0x1000
        demo.poke_u32(0x1000, 41);
        let mut counter = scalar("counter", TypeKind::Int, Storage::Address(0x1000));
        counter.is_signed = false;
        demo.symbols.insert("counter".into(), counter);

        // pt: struct point { int x = 5; int y = 9; } at 0x2000
        demo.poke_u32(0x2000, 5);
        demo.poke_u32(0x2004, 9);
        let pt = point_struct("pt", Storage::Address(0x2000), 0x2000);
        demo.symbols.insert("pt".into(), pt.clone());

        // p: struct point * at 0x1010, pointing at pt
        demo.poke_u32(0x1010, 0x2000);
        let mut p = SymbolDescriptor::new(
            vec![
                CType::new(TypeKind::Pointer),
                CType::tagged(TypeKind::Struct, "point"),
            ],
            Storage::Address(0x1010),
        );
        p.name = Some("p".into());
        p.size = 4;
        p.members = pt.members;
        demo.symbols.insert("p".into(), p);

        // arr: int[4] = { 10, 20, 30, 40 } at 0x3000
        for (i, value) in [10u32, 20, 30, 40].into_iter().enumerate() {
            demo.poke_u32(0x3000 + 4 * i as u64, value);
        }
        let mut arr = SymbolDescriptor::new(
            vec![CType::array(4), CType::new(TypeKind::Int)],
            Storage::Address(0x3000),
        );
        arr.name = Some("arr".into());
        arr.is_signed = true;
        arr.size = 16;
        demo.symbols.insert("arr".into(), arr);

        // msg: char * at 0x1020 -> "hello" at 0x4000
        demo.poke_u32(0x1020, 0x4000);
        for (i, byte) in b"hello\0".iter().enumerate() {
            demo.memory.insert(0x4000 + i as u64, *byte);
        }
        let mut msg = SymbolDescriptor::new(
            vec![CType::new(TypeKind::Pointer), CType::new(TypeKind::Char)],
            Storage::Address(0x1020),
        );
        msg.name = Some("msg".into());
        msg.size = 4;
        demo.symbols.insert("msg".into(), msg);

        // ticks: unsigned long resident in r0..r3
        demo.registers[0] = 0x05;
        demo.registers[1] = 0x2a;
        let mut ticks = scalar(
            "ticks",
            TypeKind::Long,
            Storage::Registers(vec![0, 1, 2, 3]),
        );
        ticks.is_signed = false;
        demo.symbols.insert("ticks".into(), ticks);

        // depth: int local at sp + 8
        demo.poke_u32(STACK_POINTER + 8, 3);
        demo.symbols
            .insert("depth".into(), scalar("depth", TypeKind::Int, Storage::Stack(8)));

        demo
    }

    fn poke_u32(&mut self, addr: u64, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.memory.insert(addr + i as u64, byte);
        }
    }
}

fn scalar(name: &str, kind: TypeKind, storage: Storage) -> SymbolDescriptor {
    let mut sym = SymbolDescriptor::new(vec![CType::new(kind)], storage);
    sym.name = Some(name.into());
    sym.is_signed = true;
    sym.size = 4;
    sym
}

fn point_struct(name: &str, storage: Storage, base: u64) -> SymbolDescriptor {
    let mut sym = SymbolDescriptor::new(
        vec![CType::tagged(TypeKind::Struct, "point")],
        storage,
    );
    sym.name = Some(name.into());
    sym.size = 8;
    for (member, offset) in [("x", 0i64), ("y", 4)] {
        let field =
            scalar(member, TypeKind::Int, Storage::Address(base + offset as u64));
        sym.members.insert(
            member.to_string(),
            Member {
                symbol: Box::new(field),
                offset,
            },
        );
    }
    sym
}

impl DebugAccess for DemoDebugger {
    fn lookup_symbol(&mut self, name: &str) -> EvalResult<SymbolDescriptor> {
        self.symbols
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedSymbol(name.to_string()))
    }

    fn read_byte(&mut self, addr: u64) -> Result<u8> {
        self.memory
            .get(&addr)
            .copied()
            .ok_or_else(|| anyhow!("unmapped address {addr:#x}"))
    }

    fn write_byte(&mut self, addr: u64, value: u8) -> Result<()> {
        self.memory.insert(addr, value);
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8> {
        self.registers
            .get(usize::from(reg))
            .copied()
            .ok_or_else(|| anyhow!("no register {reg}"))
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
        match self.registers.get_mut(usize::from(reg)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => bail!("no register {reg}"),
        }
    }

    fn stack_pointer(&mut self) -> Result<u64> {
        Ok(STACK_POINTER)
    }

    fn type_size(&mut self, layer: &CType) -> Result<u8> {
        Ok(match layer.kind {
            TypeKind::Void => 0,
            TypeKind::Bool | TypeKind::Char => 1,
            TypeKind::Short => 2,
            TypeKind::Int | TypeKind::Long | TypeKind::Float => 4,
            TypeKind::LongLong | TypeKind::Double => 8,
            TypeKind::Pointer => 4,
            TypeKind::Bitfield => {
                ((layer.offset + layer.size) as usize).div_ceil(8) as u8
            }
            TypeKind::Struct | TypeKind::Union => match layer.name.as_deref() {
                Some("point") => 8,
                tag => bail!("unknown struct tag {tag:?}"),
            },
            TypeKind::Array => bail!("array layer has no primitive size"),
            TypeKind::Unknown => bail!("value of unknown type"),
        })
    }

    fn invalid_address(&self) -> u64 {
        u64::MAX
    }
}
