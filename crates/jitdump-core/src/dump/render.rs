//! Text rendering for functions, types and values
//!
//! Function and type text is Cranelift's canonical CLIF form. Values get a
//! one-line description built from the function's data flow graph.

use std::fmt::{self, Write};

use cranelift_codegen::ir::{Block, Function, Inst, InstructionData, Value, ValueDef};

use crate::handle::{FunctionHandle, TypeDescriptor};

use super::{DumpError, DumpResult, HandleKind};

/// How a value came to exist inside its function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// Result of a constant-materializing instruction, with its immediate
    Constant(String),
    /// Parameter of the entry block, i.e. a function argument
    Parameter(usize),
    /// Parameter of a non-entry block
    BlockParam { block: Block, index: usize },
    /// Any other instruction result
    Temporary(Inst),
    /// Union of two equivalent values
    Union(Value, Value),
}

impl ValueKind {
    /// Classify `value` within `func`.
    ///
    /// The value must be valid in `func`.
    pub fn of(func: &Function, value: Value) -> Self {
        match func.dfg.value_def(value) {
            ValueDef::Result(inst, _) => match constant_immediate(func, inst) {
                Some(imm) => ValueKind::Constant(imm),
                None => ValueKind::Temporary(inst),
            },
            ValueDef::Param(block, index) => {
                if func.layout.entry_block() == Some(block) {
                    ValueKind::Parameter(index)
                } else {
                    ValueKind::BlockParam { block, index }
                }
            }
            ValueDef::Union(a, b) => ValueKind::Union(a, b),
        }
    }
}

fn constant_immediate(func: &Function, inst: Inst) -> Option<String> {
    match &func.dfg.insts[inst] {
        InstructionData::UnaryImm { imm, .. } => Some(imm.to_string()),
        InstructionData::UnaryIeee32 { imm, .. } => Some(imm.to_string()),
        InstructionData::UnaryIeee64 { imm, .. } => Some(imm.to_string()),
        _ => None,
    }
}

/// Render a whole function, preceded by a `; tag` comment line when `tag` is
/// not empty.
pub fn render_function(func: &Function, tag: &str) -> Result<String, fmt::Error> {
    let mut output = String::new();

    let tag = tag.trim();
    if !tag.is_empty() {
        // Keep the tag on one line so it stays a single CLIF comment
        let tag = tag.replace(['\n', '\r'], " ");
        writeln!(output, "; {tag}")?;
    }
    write!(output, "{func}")?;

    Ok(output)
}

/// Render a type descriptor
pub fn render_type(ty: TypeDescriptor<'_>) -> DumpResult<String> {
    if ty.is_invalid() {
        // INVALID has no text form, so the descriptor itself is not printed
        return Err(DumpError::invalid(HandleKind::Type, "descriptor names the INVALID type"));
    }
    Ok(ty.to_string())
}

/// Render one value in the context of its function
///
/// Named values print as `name (vN)`, unnamed ones as the plain `vN`.
pub fn render_value<F: FunctionHandle + ?Sized>(function: &F, value: Value) -> DumpResult<String> {
    let func = function.ir();
    if !func.dfg.value_is_valid(value) {
        return Err(DumpError::invalid(
            HandleKind::Value,
            format!("{value} is not defined in function {}", func.name),
        ));
    }

    let mut output = String::new();
    match function.value_name(value) {
        Some(name) => write!(output, "{name} ({value})")?,
        None => write!(output, "{value}")?,
    }
    write!(output, ": {}", func.dfg.value_type(value))?;

    match ValueKind::of(func, value) {
        ValueKind::Constant(imm) => write!(output, " const {imm}")?,
        ValueKind::Parameter(index) => write!(output, " param {index}")?,
        ValueKind::BlockParam { block, index } => write!(output, " param {block}[{index}]")?,
        ValueKind::Temporary(inst) => write!(output, " temp {}", func.dfg.display_inst(inst))?,
        ValueKind::Union(a, b) => write!(output, " union {a}, {b}")?,
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_codegen::entity::EntityRef;
    use cranelift_codegen::ir::{types, AbiParam, InstBuilder, Signature, UserFuncName};
    use cranelift_codegen::isa::CallConv;
    use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};

    /// fn(i64) -> i64 { v1 = iconst 7; v2 = imul v0, v1; jump block1(v2); block1(v3): return v3 }
    fn sample() -> Function {
        let mut sig = Signature::new(CallConv::SystemV);
        sig.params.push(AbiParam::new(types::I64));
        sig.returns.push(AbiParam::new(types::I64));
        let mut func = Function::with_name_signature(UserFuncName::testcase("sample"), sig);
        let mut ctx = FunctionBuilderContext::new();
        let mut builder = FunctionBuilder::new(&mut func, &mut ctx);

        let entry = builder.create_block();
        let exit = builder.create_block();
        builder.append_block_params_for_function_params(entry);

        builder.switch_to_block(entry);
        let x = builder.block_params(entry)[0];
        let seven = builder.ins().iconst(types::I64, 7);
        let product = builder.ins().imul(x, seven);
        // Appended after the entry body so it is numbered v3
        builder.append_block_param(exit, types::I64);
        builder.ins().jump(exit, &[product]);

        builder.switch_to_block(exit);
        let result = builder.block_params(exit)[0];
        builder.ins().return_(&[result]);

        builder.seal_all_blocks();
        builder.finalize();
        func
    }

    #[test]
    fn classify_values() {
        let func = sample();
        assert_eq!(ValueKind::of(&func, Value::new(0)), ValueKind::Parameter(0));
        assert_eq!(ValueKind::of(&func, Value::new(1)), ValueKind::Constant("7".to_string()));
        assert!(matches!(ValueKind::of(&func, Value::new(2)), ValueKind::Temporary(_)));
        assert!(matches!(
            ValueKind::of(&func, Value::new(3)),
            ValueKind::BlockParam { index: 0, .. }
        ));
    }

    #[test]
    fn function_text_has_tag_and_body() {
        let output = render_function(&sample(), "dumpfunc").unwrap();
        assert!(output.starts_with("; dumpfunc\nfunction %sample(i64) -> i64 system_v {"));
        assert!(output.contains("v2 = imul v0, v1"));
        assert!(output.contains("return v3"));
        assert!(output.ends_with("}\n"));
    }

    #[test]
    fn empty_tag_omits_comment() {
        let output = render_function(&sample(), "  ").unwrap();
        assert!(output.starts_with("function %sample"));
    }

    #[test]
    fn multiline_tag_is_flattened() {
        let output = render_function(&sample(), "first\nsecond").unwrap();
        assert!(output.starts_with("; first second\n"));
    }

    #[test]
    fn render_values() {
        let func = sample();
        assert_eq!(render_value(&func, Value::new(0)).unwrap(), "v0: i64 param 0");
        assert_eq!(render_value(&func, Value::new(1)).unwrap(), "v1: i64 const 7");
        assert_eq!(
            render_value(&func, Value::new(2)).unwrap(),
            "v2: i64 temp v2 = imul v0, v1"
        );
        assert_eq!(render_value(&func, Value::new(3)).unwrap(), "v3: i64 param block1[0]");
    }

    #[test]
    fn unknown_value_rejected() {
        let func = sample();
        let err = render_value(&func, Value::new(99)).unwrap_err();
        assert!(matches!(err, DumpError::InvalidHandle { kind: HandleKind::Value, .. }));
    }

    #[test]
    fn invalid_type_rejected() {
        let err = render_type(TypeDescriptor::Value(types::INVALID)).unwrap_err();
        assert!(matches!(err, DumpError::InvalidHandle { kind: HandleKind::Type, .. }));
    }
}
