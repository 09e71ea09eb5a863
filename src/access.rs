use anyhow::Result;

use crate::ctype::CType;
use crate::descriptor::SymbolDescriptor;
use crate::error::{EvalError, EvalResult};

/// Port to the debuggee, implemented by the host debugger.
///
/// The core never fabricates an address on its own; every memory,
/// register and stack access during an evaluation is routed through
/// this trait. The host is expected to have paused the debuggee, so
/// reads observe a consistent snapshot. Methods take `&mut self` so
/// implementations are free to seek, page or cache.
///
/// Host-side failures are plain [`anyhow::Result`]s; the core tags
/// them as [`EvalError::HostIo`] before they reach the caller.
pub trait DebugAccess {
    /// Resolve a name to a descriptor already bound to its storage:
    /// globals carry an absolute address, locals a stack offset,
    /// register-resident values their register list, enum constants an
    /// immediate. Struct members must be fully materialised, each with
    /// its byte offset inside the containing object.
    fn lookup_symbol(&mut self, name: &str) -> EvalResult<SymbolDescriptor>;

    fn read_byte(&mut self, addr: u64) -> Result<u8>;
    fn write_byte(&mut self, addr: u64, value: u8) -> Result<()>;

    /// Byte-granular register file access.
    fn read_register(&mut self, reg: u8) -> Result<u8>;
    fn write_register(&mut self, reg: u8, value: u8) -> Result<()>;

    /// Current frame's stack pointer, base for stack-relative storage.
    fn stack_pointer(&mut self) -> Result<u64>;

    /// Byte width of one type layer on the target. Hosts control this
    /// so 16-, 32- and 64-bit targets can disagree about `int` or a
    /// struct tag's size. Element counting for ARRAY layers happens in
    /// [`crate::ctype::item_size`]; an ARRAY head can still arrive
    /// here through arithmetic promotion, and a host may reject it.
    fn type_size(&mut self, layer: &CType) -> Result<u8>;

    /// Sentinel produced by `&` applied to a value with no storage.
    fn invalid_address(&self) -> u64;
}

/// Wrap a host-side failure into the evaluation error taxonomy.
pub(crate) fn host_err(err: anyhow::Error) -> EvalError {
    EvalError::host(err)
}
