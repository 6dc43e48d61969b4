//! The allocator: a process-lifetime store of function/global/table/memory
//! instances, indexed by opaque addresses that stay stable for the life of
//! the allocator.

use std::rc::Rc;

use crate::ast::{Limit, Mutability, Signature};
use crate::error::RuntimeError;
use crate::runtime::trap::Trap;
use crate::runtime::values::Value;

/// Which arena an `Address` points into.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AddressKind {
    Function,
    Global,
    Memory,
    Table,
}

/// An opaque `{ type, index }` pair naming a slot in the allocator. Never
/// constructed by hand outside this module — callers receive addresses
/// from `Allocator::alloc_*` and `ModuleInstance`'s address vectors.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Address {
    pub kind: AddressKind,
    pub index: usize,
}

/// A function the host supplies directly, bound to an import by
/// `(module, name)`. Held behind `Rc` so `FunctionInstance` stays `Clone`.
pub type HostFn = Rc<dyn Fn(&[Value]) -> Result<Option<Value>, Trap>>;

#[derive(Clone)]
pub enum FunctionInstance {
    Local {
        signature: Signature,
        body: Vec<crate::ast::Instruction>,
    },
    External {
        signature: Signature,
        callable: HostFn,
    },
}

impl FunctionInstance {
    pub fn signature(&self) -> &Signature {
        match self {
            FunctionInstance::Local { signature, .. } => signature,
            FunctionInstance::External { signature, .. } => signature,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, FunctionInstance::External { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlobalInstance {
    pub value: Value,
    pub mutability: Mutability,
}

/// One page is 64 KiB, per the text format's memory unit.
pub const PAGE_SIZE: usize = 65536;

#[derive(Clone, Debug, PartialEq)]
pub struct Memory {
    pub data: Vec<u8>,
    pub limit: Limit,
}

impl Memory {
    pub fn new(initial: u32) -> Self {
        Memory::with_limit(Limit::new(initial, None))
    }

    pub fn with_limit(limit: Limit) -> Self {
        Memory {
            data: vec![0u8; limit.min as usize * PAGE_SIZE],
            limit,
        }
    }

    pub fn pages(&self) -> u32 {
        (self.data.len() / PAGE_SIZE) as u32
    }

    pub fn read(&self, offset: u32, len: usize) -> Result<&[u8], Trap> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or_else(|| Trap::new("out of bounds memory access"))?;
        self.data
            .get(start..end)
            .ok_or_else(|| Trap::new("out of bounds memory access"))
    }

    pub fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Trap> {
        let start = offset as usize;
        let end = start
            .checked_add(bytes.len())
            .ok_or_else(|| Trap::new("out of bounds memory access"))?;
        let slice = self
            .data
            .get_mut(start..end)
            .ok_or_else(|| Trap::new("out of bounds memory access"))?;
        slice.copy_from_slice(bytes);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableInstance {
    pub elements: Vec<Option<Address>>,
    pub limit: Limit,
}

impl TableInstance {
    pub fn with_limit(limit: Limit) -> Self {
        TableInstance {
            elements: vec![None; limit.min as usize],
            limit,
        }
    }
}

/// The store: one arena per instance kind. Shared (via `Rc<RefCell<_>>`, at
/// the call site) across every stack frame of a module's execution.
#[derive(Default)]
pub struct Allocator {
    functions: Vec<FunctionInstance>,
    globals: Vec<GlobalInstance>,
    tables: Vec<TableInstance>,
    memories: Vec<Memory>,
}

impl Allocator {
    pub fn new() -> Self {
        Allocator::default()
    }

    pub fn alloc_function(&mut self, instance: FunctionInstance) -> Address {
        self.functions.push(instance);
        Address {
            kind: AddressKind::Function,
            index: self.functions.len() - 1,
        }
    }

    pub fn alloc_global(&mut self, instance: GlobalInstance) -> Address {
        self.globals.push(instance);
        Address {
            kind: AddressKind::Global,
            index: self.globals.len() - 1,
        }
    }

    pub fn alloc_table(&mut self, instance: TableInstance) -> Address {
        self.tables.push(instance);
        Address {
            kind: AddressKind::Table,
            index: self.tables.len() - 1,
        }
    }

    pub fn alloc_memory(&mut self, instance: Memory) -> Address {
        self.memories.push(instance);
        Address {
            kind: AddressKind::Memory,
            index: self.memories.len() - 1,
        }
    }

    pub fn function(&self, addr: Address) -> Result<&FunctionInstance, RuntimeError> {
        self.functions
            .get(addr.index)
            .ok_or(RuntimeError::UnknownFunction(addr.index as u32))
    }

    pub fn global(&self, addr: Address) -> Result<&GlobalInstance, RuntimeError> {
        self.globals
            .get(addr.index)
            .ok_or(RuntimeError::UnknownGlobal(addr.index as u32))
    }

    pub fn global_mut(&mut self, addr: Address) -> Result<&mut GlobalInstance, RuntimeError> {
        self.globals
            .get_mut(addr.index)
            .ok_or(RuntimeError::UnknownGlobal(addr.index as u32))
    }

    pub fn table(&self, addr: Address) -> Result<&TableInstance, RuntimeError> {
        self.tables
            .get(addr.index)
            .ok_or(RuntimeError::UnknownTable(addr.index as u32))
    }

    pub fn table_mut(&mut self, addr: Address) -> Result<&mut TableInstance, RuntimeError> {
        self.tables
            .get_mut(addr.index)
            .ok_or(RuntimeError::UnknownTable(addr.index as u32))
    }

    pub fn memory(&self, addr: Address) -> Result<&Memory, RuntimeError> {
        self.memories
            .get(addr.index)
            .ok_or(RuntimeError::UnknownMemory(addr.index as u32))
    }

    pub fn memory_mut(&mut self, addr: Address) -> Result<&mut Memory, RuntimeError> {
        self.memories
            .get_mut(addr.index)
            .ok_or(RuntimeError::UnknownMemory(addr.index as u32))
    }
}

/// Builds an allocator with no preallocated instances — the convenience
/// constructor named in the public surface (`createAllocator`), which in
/// the source took a pre-built `Memory`; this crate instead lets module
/// instantiation allocate memory per the module's own `Limit`; callers
/// wanting a standalone memory construct one with `Memory::new` and
/// allocate it directly.
pub fn create_allocator() -> Allocator {
    Allocator::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_stay_stable() {
        let mut allocator = Allocator::new();
        let a = allocator.alloc_memory(Memory::new(1));
        let b = allocator.alloc_memory(Memory::new(2));
        assert_eq!(allocator.memory(a).unwrap().pages(), 1);
        assert_eq!(allocator.memory(b).unwrap().pages(), 2);
    }

    #[test]
    fn memory_rejects_out_of_bounds_access() {
        let memory = Memory::new(1);
        assert!(memory.read(PAGE_SIZE as u32, 1).is_err());
    }

    #[test]
    fn memory_round_trips_a_write() {
        let mut memory = Memory::new(1);
        memory.write(4, &[1, 2, 3]).unwrap();
        assert_eq!(memory.read(4, 3).unwrap(), &[1, 2, 3]);
    }
}
