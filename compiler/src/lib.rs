pub mod action;
pub mod block;
pub mod compile;
pub mod config;
pub mod error;
pub mod generator;
pub mod nfo;
pub mod reduce;
pub mod registry;
pub mod template;
pub mod validate;

pub use action::ActionRecord;
pub use compile::{Compilation, compile_program, compile_program_with_registry};
pub use config::{CompilerConfig, ConfigError};
pub use error::{CompileError, CompileErrorKind, CompileWarning};
pub use generator::{GenerateActions, GenerationContext, generate_actions};
pub use registry::{ActionSetId, ResolveActionId, SymbolRegistry};
pub use validate::Validate;
