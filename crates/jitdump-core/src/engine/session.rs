//! JIT session implementation
//!
//! This module provides the `JitSession` that owns the Cranelift JIT module
//! and turns function bodies into `EngineFunction` snapshots.

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use cranelift_codegen::ir::{types, AbiParam, Function, Signature, Type, UserFuncName, Value};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::{verify_function, Context};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};

use crate::handle::{FunctionHandle, ValueNames};

use super::{EngineConfig, EngineError, EngineResult};

/// Source of per-session stamps; function ids restart at zero in every module
static NEXT_SESSION: AtomicU64 = AtomicU64::new(0);

/// A function defined by a [`JitSession`]
///
/// Holds the IR exactly as it was handed to the backend, before any
/// backend-side rewriting, together with the value display names recorded
/// while it was built.
#[derive(Debug, Clone)]
pub struct EngineFunction {
    name: String,
    id: FuncId,
    session: u64,
    ir: Function,
    names: ValueNames,
}

impl EngineFunction {
    /// The symbol name the function was declared with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module-level function id
    pub fn id(&self) -> FuncId {
        self.id
    }

    /// Display names recorded while the body was built
    pub fn names(&self) -> &ValueNames {
        &self.names
    }

    /// The entry block parameters, i.e. the function's arguments
    pub fn params(&self) -> Vec<Value> {
        self.ir
            .layout
            .entry_block()
            .map(|entry| self.ir.dfg.block_params(entry).to_vec())
            .unwrap_or_default()
    }
}

impl FunctionHandle for EngineFunction {
    fn ir(&self) -> &Function {
        &self.ir
    }

    fn value_name(&self, value: Value) -> Option<&str> {
        self.names.get(value)
    }
}

/// The Cranelift JIT session
///
/// This struct manages the Cranelift JIT module and the contexts reused
/// between function definitions.
pub struct JitSession {
    /// The Cranelift JIT module
    module: JITModule,

    /// Compilation context (reused between definitions)
    ctx: Context,

    /// Function builder context (reused between definitions)
    builder_ctx: FunctionBuilderContext,

    config: EngineConfig,

    /// Stamp copied into every `EngineFunction` this session defines
    stamp: u64,

    /// Defined functions by symbol name
    functions: HashMap<String, FuncId>,

    /// Symbol names in definition order
    order: Vec<String>,

    /// Whether every defined function has been finalized
    finalized: bool,
}

impl JitSession {
    /// Create a session for the host machine
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        // Configure Cranelift for the host machine
        let mut flag_builder = settings::builder();
        flag_builder
            .set("opt_level", config.opt_level.as_setting())
            .map_err(|e| EngineError::Settings(e.to_string()))?;
        flag_builder
            .set("is_pic", "false")
            .map_err(|e| EngineError::Settings(e.to_string()))?;

        let isa_builder = cranelift_native::builder()
            .map_err(|msg| EngineError::Isa(format!("host machine is not supported: {msg}")))?;

        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| EngineError::Isa(e.to_string()))?;

        let jit_builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        let module = JITModule::new(jit_builder);

        Ok(Self {
            module,
            ctx: Context::new(),
            builder_ctx: FunctionBuilderContext::new(),
            config,
            stamp: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            functions: HashMap::new(),
            order: Vec::new(),
            finalized: true,
        })
    }

    /// The session configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The target triple code is generated for
    pub fn target(&self) -> String {
        self.module.isa().triple().to_string()
    }

    /// Build a signature in the host's default calling convention
    pub fn signature(&self, params: &[Type], ret: Option<Type>) -> Signature {
        let mut sig = self.module.make_signature();
        sig.params.extend(params.iter().copied().map(AbiParam::new));
        sig.returns.extend(ret.map(AbiParam::new));
        sig
    }

    /// Declare and define a function.
    ///
    /// `body` receives a builder positioned at no block and the name table for
    /// the function. All blocks are sealed after `body` returns.
    pub fn define<F>(&mut self, name: &str, signature: Signature, body: F) -> EngineResult<EngineFunction>
    where
        F: FnOnce(&mut FunctionBuilder<'_>, &mut ValueNames) -> EngineResult<()>,
    {
        let id = self
            .module
            .declare_function(name, Linkage::Export, &signature)
            .map_err(|e| EngineError::Module(e.to_string()))?;

        self.ctx.func.signature = signature;
        self.ctx.func.name = UserFuncName::user(0, id.as_u32());

        let mut names = ValueNames::new();
        let built = {
            let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_ctx);
            let built = body(&mut builder, &mut names);
            if built.is_ok() {
                builder.seal_all_blocks();
                builder.finalize();
            }
            built
        };
        if let Err(e) = built {
            // An abandoned builder leaves its context dirty
            self.builder_ctx = FunctionBuilderContext::new();
            self.module.clear_context(&mut self.ctx);
            return Err(e);
        }

        if self.config.verify {
            if let Err(errors) = verify_function(&self.ctx.func, self.module.isa()) {
                self.module.clear_context(&mut self.ctx);
                return Err(EngineError::Verifier {
                    function: name.to_string(),
                    detail: errors.to_string(),
                });
            }
        }

        let ir = self.ctx.func.clone();

        let defined = self.module.define_function(id, &mut self.ctx);
        self.module.clear_context(&mut self.ctx);
        defined.map_err(|e| EngineError::Module(e.to_string()))?;

        if self.functions.insert(name.to_string(), id).is_none() {
            self.order.push(name.to_string());
        }
        self.finalized = false;

        Ok(EngineFunction {
            name: name.to_string(),
            id,
            session: self.stamp,
            ir,
            names,
        })
    }

    /// Finalize every function defined so far
    pub fn finalize(&mut self) -> EngineResult<()> {
        self.module
            .finalize_definitions()
            .map_err(|e| EngineError::Module(e.to_string()))?;
        self.finalized = true;
        Ok(())
    }

    /// Look up a defined function by symbol name
    pub fn lookup(&self, name: &str) -> Option<FuncId> {
        self.functions.get(name).copied()
    }

    /// Names of all defined functions, in definition order
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Run a finalized `() -> i64` function and return its result
    pub fn call_nullary_i64(&self, function: &EngineFunction) -> EngineResult<i64> {
        if function.session != self.stamp || self.lookup(&function.name) != Some(function.id) {
            return Err(EngineError::UnknownFunction(function.name.clone()));
        }
        if !self.finalized {
            return Err(EngineError::NotFinalized(function.name.clone()));
        }

        // Check the declaration the code was compiled against, not the snapshot
        let sig = &self.module.declarations().get_function_decl(function.id).signature;
        let compatible = sig.params.is_empty()
            && sig.returns.len() == 1
            && sig.returns[0].value_type == types::I64
            && sig.call_conv == self.module.isa().default_call_conv();
        if !compatible {
            return Err(EngineError::SignatureMismatch {
                function: function.name.clone(),
                expected: "() -> i64".to_string(),
                actual: sig.to_string(),
            });
        }

        let ptr = self.module.get_finalized_function(function.id);
        // SAFETY: the function was defined by this session, the module is
        // finalized, and its declared signature is `() -> i64` in the host
        // calling convention.
        let code: extern "C" fn() -> i64 = unsafe { mem::transmute::<*const u8, extern "C" fn() -> i64>(ptr) };
        Ok(code())
    }
}
