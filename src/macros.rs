/// Emite una línea indentada sin terminador de sentencia, como
/// las que abren o cierran un bloque.
macro_rules! emit {
    ($generator:expr, $($format:tt)*) => {{
        $generator.indent();
        $generator.out.emit(&format!($($format)*));
        $generator.out.emit("\n");
    }};
}

/// Emite una sentencia indentada, con su terminador.
macro_rules! emit_line {
    ($generator:expr, $($format:tt)*) => {{
        $generator.indent();
        $generator.out.emit_line(&format!($($format)*));
    }};
}
