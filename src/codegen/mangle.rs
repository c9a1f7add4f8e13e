//! Nombres válidos en C para identificadores del lenguaje fuente.
//!
//! Un identificador fuente puede coincidir con una palabra reservada
//! de C o con un nombre que `<stdio.h>` define o que el programa generado
//! utiliza. Como las variables se declaran dentro de `main()`, una variable
//! `printf` ocultaría a la función. A estos nombres se les agrega `_`, lo
//! cual nunca colisiona con otro identificador fuente ya que el lexer no
//! admite `_` en identificadores.

use crate::lex::Identifier;
use std::borrow::Cow;

const RESERVED: &[&str] = &[
    // Palabras clave de C, incluyendo C23 y extensiones GNU
    "alignas", "alignof", "asm", "auto", "bool", "break", "case", "char",
    "const", "constexpr", "continue", "default", "do", "double", "else",
    "enum", "extern", "false", "float", "for", "goto", "if", "inline", "int",
    "long", "nullptr", "register", "restrict", "return", "short", "signed",
    "sizeof", "static", "struct", "switch", "true", "typedef",
    "typeof", "union", "unsigned", "void", "volatile", "while",

    // Nombres que el programa generado requiere
    "main", "printf", "scanf",

    // Macros y tipos de <stdio.h> que no contienen `_`
    "BUFSIZ", "EOF", "FILE", "NULL", "stderr", "stdin", "stdout",

    // Macros predefinidas por GCC y Clang en modo `gnu*`, que es el
    // dialecto por defecto de `cc`
    "i386", "linux", "unix",
];

/// Obtiene el nombre C para un identificador.
pub fn mangle(id: &Identifier) -> Cow<'_, str> {
    let name = id.as_ref();
    if RESERVED.contains(&name) {
        Cow::Owned(format!("{}_", name))
    } else {
        Cow::Borrowed(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(mangle(&Identifier::from("counter")), "counter");
        assert_eq!(mangle(&Identifier::from("Int")), "Int");
    }

    #[test]
    fn reserved_names_get_suffix() {
        assert_eq!(mangle(&Identifier::from("int")), "int_");
        assert_eq!(mangle(&Identifier::from("stdin")), "stdin_");
        assert_eq!(mangle(&Identifier::from("main")), "main_");
    }

    #[test]
    fn predefined_macros_get_suffix() {
        assert_eq!(mangle(&Identifier::from("linux")), "linux_");
        assert_eq!(mangle(&Identifier::from("unix")), "unix_");
        assert_eq!(mangle(&Identifier::from("i386")), "i386_");
        assert_eq!(mangle(&Identifier::from("Linux")), "Linux");
    }
}
