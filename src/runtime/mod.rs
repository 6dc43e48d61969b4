//! The tree-walking execution engine: typed values, the allocator (the
//! process-lifetime store of function/global/table/memory instances),
//! module instantiation, stack frames, and the instruction executors.

pub mod allocator;
pub mod exec;
pub mod frame;
pub mod instance;
pub mod trap;
pub mod values;

pub use allocator::{
    create_allocator, Address, AddressKind, Allocator, FunctionInstance, GlobalInstance, HostFn,
    Memory, TableInstance, PAGE_SIZE,
};
pub use frame::{
    create_and_execute_child_stack_frame, create_stack_frame, execute_stack_frame,
    ExecutionOutcome, Label, Step, StackFrame,
};
pub use instance::{create_instance, create_instance_from_module, ExportInstance, ModuleInstance};
pub use trap::Trap;
pub use values::Value;
