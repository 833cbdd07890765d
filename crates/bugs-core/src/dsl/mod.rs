//! The Bugs language front end and evaluator
//!
//! Source text goes through the [`Lexer`] and [`Parser`] into an AST, which
//! each [`Bug`] then walks on its own thread.

pub mod ast;
pub mod evaluator;
pub mod lexer;
pub mod parser;


pub use ast::*;
pub use evaluator::{Bug, BugState, EPSILON};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{
    parse_allbugs, parse_block, parse_bug_definition, parse_command, parse_expression,
    parse_function_call, parse_function_definition, parse_initialization_block, parse_program,
    parse_var_declaration, recognize, Parser,
};
