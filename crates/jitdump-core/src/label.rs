//! Label identifiers and the "no label" sentinel
//!
//! A label names a potential branch target inside a function body. Labels are
//! backed by Cranelift blocks, so a [`LabelId`] has exactly the width of a
//! block index. The maximum representable value is reserved to mean "no label
//! yet": every label starts out as the sentinel and is bound to a real block
//! the first time it is branched to or placed.

use std::mem::size_of;

use cranelift_codegen::ir::{Block, InstBuilder, Value};
use cranelift_frontend::FunctionBuilder;

/// Identifier of a branch target within one function
pub type LabelId = u32;

/// The reserved "no label" identifier: all bits set in the width of [`LabelId`]
pub const EMPTY_LABEL: LabelId = !(0 as LabelId);

// Block indices and label identifiers must share a width, otherwise the
// sentinel would not be the block entity's reserved value.
const _: () = assert!(size_of::<LabelId>() == size_of::<Block>());

/// Returns the reserved "no label" identifier.
#[must_use]
pub const fn empty_label() -> LabelId {
    EMPTY_LABEL
}

/// Returns true if `id` is the "no label" sentinel.
#[must_use]
pub const fn is_empty_label(id: LabelId) -> bool {
    id == EMPTY_LABEL
}

/// A branch target that may not have been assigned a block yet
///
/// Branches may reference a label before it is placed; the block is allocated
/// on first use and reused by every later branch and by [`Label::place`].
///
/// A label is neither `Copy` nor `Clone`: an unbound duplicate would allocate
/// a block of its own. Share one label through `&mut` instead.
///
/// ```compile_fail
/// use jitdump_core::Label;
///
/// let label = Label::new();
/// let duplicate = label;
/// assert_eq!(label.id(), duplicate.id());
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Label {
    id: LabelId,
}

impl Label {
    /// Create an unbound label
    #[must_use]
    pub const fn new() -> Self {
        Self { id: EMPTY_LABEL }
    }

    /// The label's identifier, or [`EMPTY_LABEL`] while unbound
    #[must_use]
    pub const fn id(&self) -> LabelId {
        self.id
    }

    /// Returns true once a block has been allocated for this label
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        !is_empty_label(self.id)
    }

    /// The block backing this label, if it has been bound
    #[must_use]
    pub fn block(&self) -> Option<Block> {
        self.is_bound().then(|| Block::from_u32(self.id))
    }

    /// Get the backing block, allocating it on first use
    pub fn bind(&mut self, builder: &mut FunctionBuilder<'_>) -> Block {
        if let Some(block) = self.block() {
            return block;
        }
        let block = builder.create_block();
        self.id = block.as_u32();
        block
    }

    /// Place the label at the current position.
    ///
    /// An unterminated current block falls through into the label.
    pub fn place(&mut self, builder: &mut FunctionBuilder<'_>) -> Block {
        let block = self.bind(builder);
        if falls_through(builder) {
            builder.ins().jump(block, &[]);
        }
        builder.switch_to_block(block);
        block
    }

    /// Unconditionally branch to the label
    pub fn jump(&mut self, builder: &mut FunctionBuilder<'_>) {
        let target = self.bind(builder);
        builder.ins().jump(target, &[]);
    }

    /// Branch to the label when `condition` is non-zero, otherwise continue
    /// in a fresh block.
    pub fn branch_if(&mut self, builder: &mut FunctionBuilder<'_>, condition: Value) {
        let target = self.bind(builder);
        let next = builder.create_block();
        builder.ins().brif(condition, target, &[], next, &[]);
        builder.switch_to_block(next);
    }

    /// Branch to the label when `condition` is zero, otherwise continue in a
    /// fresh block.
    pub fn branch_if_not(&mut self, builder: &mut FunctionBuilder<'_>, condition: Value) {
        let target = self.bind(builder);
        let next = builder.create_block();
        builder.ins().brif(condition, next, &[], target, &[]);
        builder.switch_to_block(next);
    }
}

/// Returns true if the builder's current block does not end in a terminator.
fn falls_through(builder: &FunctionBuilder<'_>) -> bool {
    let Some(current) = builder.current_block() else {
        return false;
    };
    match builder.func.layout.last_inst(current) {
        Some(inst) => !builder.func.dfg.insts[inst].opcode().is_terminator(),
        None => true,
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}
