//! psur_dsl
//!
//! Lexer, parser, AST and compiler for the PSUR regulatory DSL (§4.A).
//! A `.psur` source file declares `SOURCE`, `OBLIGATION` and `CONSTRAINT`
//! records (plus `IMPORT`s of sibling files); compiling a program resolves
//! every enum-valued field against the closed sets in `psur_model` and
//! produces the two IR documents (`CompiledObligations`, `CompiledRules`)
//! that the rest of the kernel consumes.

pub mod ast;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::DslProgram;
pub use compiler::{compile, compile_file, compile_string, compile_to_files};
pub use error::DslError;
pub use parser::parse;
