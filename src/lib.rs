//! Traductor de CosmosCode a C.
//!
//! # Front end
//! Cada programa deriva de un único texto fuente. Este texto se somete
//! a análisis léxico en [`lex`], de lo cual se obtiene un flujo de tokens
//! que se consume de forma perezosa. El flujo de tokens se dispone en un
//! AST por medio de análisis sintáctico en [`parse`], el cual lleva a
//! cabo a la vez el análisis semántico de [`semantic`]: declaración
//! implícita de variables y consistencia de etiquetas.
//!
//! # Back end
//! El AST se traduce directamente a C en [`codegen`]. No existe otra
//! representación intermedia ni fase de optimización. Compilar el
//! código resultante es responsabilidad de un compilador de C externo,
//! el cual puede invocarse por medio de [`link`].
//!
//! Cualquier error es terminal: una traducción produce código completo
//! o un único [`TranslateError`], nunca una salida parcial.

#[macro_use]
mod macros;

pub mod codegen;
pub mod error;
pub mod lex;
pub mod link;
pub mod parse;
pub mod semantic;
pub mod source;

pub use error::{ErrorKind, TranslateError};

use lex::{Lexer, Token};
use parse::Ast;
use source::Located;

/// Traduce un programa completo a código fuente C.
///
/// `name` identifica al origen en mensajes de error.
pub fn translate(text: &str, name: &str) -> Result<String, TranslateError> {
    let ast = parse_source(text, name)?;
    let output = codegen::emit(&ast);

    log::debug!("Translated {} into {} bytes of C", name, output.len());
    Ok(output)
}

/// Analiza un programa sin generar código.
pub fn parse_source(text: &str, name: &str) -> Result<Ast, TranslateError> {
    let (start, stream) = source::consume(text, name);
    parse::parse(Lexer::new(start, stream))
}

/// Obtiene todos los tokens de un programa, hasta [`Token::Eof`] inclusive.
pub fn tokenize(text: &str, name: &str) -> Result<Vec<Located<Token>>, TranslateError> {
    let (start, stream) = source::consume(text, name);
    let tokens = Lexer::new(start, stream).collect::<Result<Vec<_>, _>>()?;

    log::debug!("Lexed {} tokens from {}", tokens.len(), name);
    Ok(tokens)
}
