//! ModelGen: an embeddable, dynamically-typed scripting language for
//! emitting 3D geometry.
//!
//! A host creates an [`Instance`], runs source against it, and reads
//! back the [`VertexBuffer`] the program populated via `emit`.

mod ast;
mod error;
mod evaluator;
mod frame;
mod instance;
mod io;
mod lexer;
mod module;
mod parser;
mod stdlib;
mod token;
mod value;
mod vertex;

pub use error::{FatalError, ParseError, RuntimeError, RuntimeErrorKind};
pub use instance::Instance;
pub use io::{CollectStringPrint, NoPrint, PrintSink, StdPrint};
pub use module::ModuleRef;
pub use token::Pos;
pub use value::{CFunction, Value};
pub use vertex::{VertexBuffer, VertexStride};
