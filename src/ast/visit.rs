//! Depth-first traversal over a parsed `Program`.
//!
//! `traverse` walks every module field and every instruction reachable from
//! a function body, invoking the matching `Visitor` method for each node it
//! enters. Each callback receives a [`Path`] wrapping a mutable reference to
//! the node plus a `remove()` escape hatch; a node whose path is marked
//! removed is dropped from its parent sequence once the visitor returns.

use crate::ast::instruction::*;
use crate::ast::module::*;

/// A node reached during traversal, together with the ability to ask the
/// traversal to drop it from its parent sequence.
pub struct Path<'a, T> {
    node: &'a mut T,
    removed: bool,
}

impl<'a, T> Path<'a, T> {
    fn new(node: &'a mut T) -> Self {
        Path {
            node,
            removed: false,
        }
    }

    pub fn node(&self) -> &T {
        self.node
    }

    pub fn node_mut(&mut self) -> &mut T {
        self.node
    }

    /// Marks this node for removal from its parent sequence. Has no effect
    /// on nodes that are not held in a removable sequence (e.g. a module's
    /// optional `start` field).
    pub fn remove(&mut self) {
        self.removed = true;
    }

    fn is_removed(&self) -> bool {
        self.removed
    }
}

/// Callbacks invoked by `traverse`, one per node kind, each a no-op by
/// default so a caller only implements the kinds it cares about.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_module(&mut self, path: &mut Path<'_, Module>) {}
    fn visit_func(&mut self, path: &mut Path<'_, Func>) {}
    fn visit_module_import(&mut self, path: &mut Path<'_, ModuleImport>) {}
    fn visit_module_export(&mut self, path: &mut Path<'_, ModuleExport>) {}
    fn visit_memory(&mut self, path: &mut Path<'_, Memory>) {}
    fn visit_table(&mut self, path: &mut Path<'_, Table>) {}
    fn visit_global(&mut self, path: &mut Path<'_, Global>) {}
    fn visit_data(&mut self, path: &mut Path<'_, Data>) {}
    fn visit_elem(&mut self, path: &mut Path<'_, Elem>) {}
    fn visit_start(&mut self, path: &mut Path<'_, Start>) {}
    fn visit_type_instruction(&mut self, path: &mut Path<'_, TypeInstruction>) {}
    fn visit_instr(&mut self, path: &mut Path<'_, Instr>) {}
    fn visit_block(&mut self, path: &mut Path<'_, BlockInstruction>) {}
    fn visit_loop(&mut self, path: &mut Path<'_, LoopInstruction>) {}
    fn visit_if(&mut self, path: &mut Path<'_, IfInstruction>) {}
    fn visit_call(&mut self, path: &mut Path<'_, CallInstruction>) {}
    fn visit_call_indirect(&mut self, path: &mut Path<'_, CallIndirectInstruction>) {}
}

/// Walks the whole program, depth-first, left to right.
pub fn traverse(program: &mut Program, visitor: &mut dyn Visitor) {
    let mut keep = Vec::with_capacity(program.body.len());

    for top_level in program.body.iter_mut() {
        let removed = match top_level {
            TopLevel::Module(module) => {
                let mut path = Path::new(module);
                visitor.visit_module(&mut path);
                let removed = path.is_removed();

                if let Module::Text(text) = module {
                    walk_fields(&mut text.fields, visitor);
                }

                removed
            }
            TopLevel::Field(field) => walk_field(field, visitor),
        };

        keep.push(!removed);
    }

    let mut keep = keep.into_iter();
    program.body.retain(|_| keep.next().unwrap());
}

fn walk_fields(fields: &mut Vec<ModuleField>, visitor: &mut dyn Visitor) {
    let mut keep = Vec::with_capacity(fields.len());

    for field in fields.iter_mut() {
        keep.push(!walk_field(field, visitor));
    }

    let mut keep = keep.into_iter();
    fields.retain(|_| keep.next().unwrap());
}

fn walk_field(field: &mut ModuleField, visitor: &mut dyn Visitor) -> bool {
    match field {
        ModuleField::Func(f) => {
            let mut path = Path::new(f);
            visitor.visit_func(&mut path);
            let removed = path.is_removed();
            walk_instructions(&mut f.body, visitor);
            removed
        }
        ModuleField::Import(i) => {
            let mut path = Path::new(i);
            visitor.visit_module_import(&mut path);
            path.is_removed()
        }
        ModuleField::Export(e) => {
            let mut path = Path::new(e);
            visitor.visit_module_export(&mut path);
            path.is_removed()
        }
        ModuleField::Memory(m) => {
            let mut path = Path::new(m);
            visitor.visit_memory(&mut path);
            path.is_removed()
        }
        ModuleField::Table(t) => {
            let mut path = Path::new(t);
            visitor.visit_table(&mut path);
            path.is_removed()
        }
        ModuleField::Global(g) => {
            let mut path = Path::new(g);
            visitor.visit_global(&mut path);
            let removed = path.is_removed();
            walk_instructions(&mut g.init, visitor);
            removed
        }
        ModuleField::Data(d) => {
            let mut path = Path::new(d);
            visitor.visit_data(&mut path);
            path.is_removed()
        }
        ModuleField::Elem(e) => {
            let mut path = Path::new(e);
            visitor.visit_elem(&mut path);
            let removed = path.is_removed();
            walk_instructions(&mut e.offset, visitor);
            removed
        }
        ModuleField::Start(s) => {
            let mut path = Path::new(s);
            visitor.visit_start(&mut path);
            path.is_removed()
        }
        ModuleField::Type(t) => {
            let mut path = Path::new(t);
            visitor.visit_type_instruction(&mut path);
            path.is_removed()
        }
    }
}

fn walk_instructions(instrs: &mut Vec<Instruction>, visitor: &mut dyn Visitor) {
    let mut keep = Vec::with_capacity(instrs.len());

    for instr in instrs.iter_mut() {
        keep.push(!walk_instruction(instr, visitor));
    }

    let mut keep = keep.into_iter();
    instrs.retain(|_| keep.next().unwrap());
}

fn walk_instruction(instr: &mut Instruction, visitor: &mut dyn Visitor) -> bool {
    match instr {
        Instruction::Plain(p) => {
            let mut path = Path::new(p);
            visitor.visit_instr(&mut path);
            let removed = path.is_removed();

            for arg in p.args.iter_mut() {
                if let Operand::Nested(nested) = arg {
                    walk_instruction(nested, visitor);
                }
            }

            removed
        }
        Instruction::Block(b) => {
            let mut path = Path::new(b);
            visitor.visit_block(&mut path);
            let removed = path.is_removed();
            walk_instructions(&mut b.instr, visitor);
            removed
        }
        Instruction::Loop(l) => {
            let mut path = Path::new(l);
            visitor.visit_loop(&mut path);
            let removed = path.is_removed();
            walk_instructions(&mut l.instr, visitor);
            removed
        }
        Instruction::If(i) => {
            let mut path = Path::new(i);
            visitor.visit_if(&mut path);
            let removed = path.is_removed();
            walk_instructions(&mut i.test, visitor);
            walk_instructions(&mut i.consequent, visitor);
            walk_instructions(&mut i.alternate, visitor);
            removed
        }
        Instruction::Call(c) => {
            let mut path = Path::new(c);
            visitor.visit_call(&mut path);
            let removed = path.is_removed();
            walk_instructions(&mut c.instr_args, visitor);
            removed
        }
        Instruction::CallIndirect(c) => {
            let mut path = Path::new(c);
            visitor.visit_call_indirect(&mut path);
            let removed = path.is_removed();
            walk_instructions(&mut c.instr_args, visitor);
            removed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::ast::ident::Identifier;
    use crate::ast::types::{Signature, ValueType};

    struct CountFuncs(u32);

    impl Visitor for CountFuncs {
        fn visit_func(&mut self, _path: &mut Path<'_, Func>) {
            self.0 += 1;
        }
    }

    struct RemoveExports;

    impl Visitor for RemoveExports {
        fn visit_module_export(&mut self, path: &mut Path<'_, ModuleExport>) {
            path.remove();
        }
    }

    fn sample_program() -> Program {
        let func = build::func(
            Identifier::generated("func_0"),
            SignatureOrRef::Signature(Signature::empty()),
            vec![],
            None,
        );
        let export = build::module_export(
            "f",
            ExportDescr {
                export_type: ExportType::Func,
                id: crate::ast::values::Index::Id(Identifier::generated("func_0")),
            },
            None,
        );
        let module = build::module_text(
            None,
            vec![ModuleField::Func(func), ModuleField::Export(export)],
            None,
        );

        build::program(vec![TopLevel::Module(module)])
    }

    #[test]
    fn visits_nested_funcs() {
        let mut program = sample_program();
        let mut counter = CountFuncs(0);

        traverse(&mut program, &mut counter);

        assert_eq!(counter.0, 1);
        let _ = ValueType::I32;
    }

    #[test]
    fn remove_drops_the_node_from_its_parent() {
        let mut program = sample_program();
        let mut remover = RemoveExports;

        traverse(&mut program, &mut remover);

        let TopLevel::Module(Module::Text(text)) = &program.body[0] else {
            panic!("expected a text module");
        };
        assert_eq!(text.fields.len(), 1);
        assert!(matches!(text.fields[0], ModuleField::Func(_)));
    }
}
