//! Emisión de código C.
//!
//! El programa generado consiste en una única función `main()`. Todas
//! las variables del programa fuente se declaran al inicio de esta
//! función, inicializadas en cero, de modo que tanto los saltos hacia
//! adelante como las lecturas previas a cualquier asignación son
//! válidos en C. Por esta razón la salida se acumula en dos partes:
//! un encabezado con declaraciones y el cuerpo traducido.

mod mangle;

use crate::{
    lex::Identifier,
    parse::{Ast, Expr, Sign, Statement},
    source::Located,
};

pub use mangle::mangle;

/// Acumulador de texto generado.
#[derive(Default)]
pub struct Emitter {
    header: String,
    code: String,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter::default()
    }

    /// Agrega un fragmento al cuerpo, tal cual.
    pub fn emit(&mut self, fragment: &str) {
        self.code.push_str(fragment);
    }

    /// Agrega una sentencia al cuerpo, con terminador y cambio de línea.
    pub fn emit_line(&mut self, fragment: &str) {
        self.code.push_str(fragment);
        self.code.push_str(";\n");
    }

    /// Agrega una línea al encabezado.
    pub fn header_line(&mut self, fragment: &str) {
        self.header.push_str(fragment);
        self.header.push('\n');
    }

    /// Une encabezado y cuerpo.
    ///
    /// Solo debe invocarse luego de que el análisis completo, incluyendo
    /// la verificación de etiquetas, haya sido exitoso.
    pub fn finalize(self) -> String {
        let Emitter { mut header, code } = self;
        header.push_str(&code);
        header
    }
}

/// Traduce un programa ya analizado a código fuente C.
pub fn emit(ast: &Ast) -> String {
    let mut generator = Generator {
        out: Emitter::new(),
        depth: 1,
    };

    generator.prologue(ast.variables());
    generator.block(ast.statements());
    generator.epilogue();

    generator.out.finalize()
}

struct Generator {
    out: Emitter,
    depth: usize,
}

impl Generator {
    fn prologue(&mut self, variables: &[Identifier]) {
        self.out.header_line("#include <stdio.h>");
        self.out.header_line("");
        self.out.header_line("int main(void)");
        self.out.header_line("{");

        log::debug!("Declaring {} variables", variables.len());
        for variable in variables {
            self.out.header_line(&format!("\tfloat {} = 0;", mangle(variable)));
        }

        if !variables.is_empty() {
            self.out.header_line("");
        }
    }

    fn epilogue(&mut self) {
        emit_line!(self, "return 0");
        self.out.emit("}\n");
    }

    fn block(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::PrintString(string) => {
                emit_line!(self, "printf(\"{}\\n\")", escape(string.val()))
            }

            Statement::PrintExpr(expr) => {
                self.indent();
                self.out.emit("printf(\"%.2f\\n\", (float)(");
                self.expr(expr);
                self.out.emit_line("))");
            }

            // Si la lectura falla, la variable queda en cero y se descarta
            // la palabra que no pudo interpretarse
            Statement::Input(variable) => {
                let variable = mangle(variable.val());

                emit!(self, "if (1 != scanf(\"%f\", &{})) {{", variable);
                self.nested(|this| {
                    emit_line!(this, "{} = 0", variable);
                    emit_line!(this, "scanf(\"%*s\")");
                });
                emit!(self, "}}");
            }

            Statement::Let { target, value } => {
                self.indent();
                self.out.emit(&format!("{} = ", mangle(target.val())));
                self.expr(value);
                self.out.emit_line("");
            }

            Statement::If { condition, body } => self.conditional("if", condition, body),
            Statement::While { condition, body } => self.conditional("while", condition, body),

            // La sentencia vacía permite que una etiqueta cierre un bloque
            Statement::Label(label) => emit!(self, "{}:;", mangle(label.val())),
            Statement::Goto(label) => emit_line!(self, "goto {}", mangle(label.val())),
        }
    }

    fn conditional(&mut self, keyword: &str, condition: &Located<Expr>, body: &[Statement]) {
        self.indent();
        self.out.emit(keyword);
        self.out.emit(" (");
        self.expr(condition);
        self.out.emit(") {\n");

        self.nested(|this| this.block(body));
        emit!(self, "}}");
    }

    fn expr(&mut self, expr: &Located<Expr>) {
        match expr.val() {
            Expr::Number(number) => self.out.emit(&float_literal(number)),
            Expr::Read(variable) => self.out.emit(&mangle(variable)),

            Expr::Unary(sign, operand) => {
                self.out.emit(match sign {
                    Sign::Plus => "+",
                    Sign::Minus => "-",
                });

                self.expr(operand);
            }

            Expr::Binary(lhs, op, rhs) => {
                // En C, `<` y similares tienen mayor precedencia que `==` y `!=`,
                // mientras que en el lenguaje fuente todas las comparaciones
                // tienen igual precedencia y asocian a la izquierda
                let group = op.is_comparison() && lhs.val().is_comparison();

                if group {
                    self.out.emit("(");
                }

                self.expr(lhs);

                if group {
                    self.out.emit(")");
                }

                // Los espacios evitan formar `--` o `++` con un signo unario
                self.out.emit(&format!(" {} ", op.symbol()));
                self.expr(rhs);
            }
        }
    }

    fn nested<F: FnOnce(&mut Self)>(&mut self, body: F) {
        self.depth += 1;
        body(self);
        self.depth -= 1;
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.emit("\t");
        }
    }
}

/// Todo número es de punto flotante: `1 / 2` debe resultar en `0.5`.
///
/// Esto además evita que `010` se interprete como octal.
fn float_literal(number: &str) -> String {
    if number.contains('.') {
        number.to_string()
    } else {
        format!("{}.0", number)
    }
}

/// Prepara el contenido de una cadena para un literal C.
///
/// El lexer ya rechaza `"`, `\`, `%` y cambios de línea. Solo resta
/// escapar `?`, que de otra forma podría formar trigraphs.
fn escape(string: &str) -> String {
    string.replace('?', "\\?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::Lexer, parse, source};

    fn translate(text: &str) -> String {
        let (start, stream) = source::consume(text, "test");
        let ast = parse::parse(Lexer::new(start, stream)).expect("parse failed");

        emit(&ast)
    }

    #[test]
    fn emitter_buffers() {
        let mut emitter = Emitter::new();

        emitter.emit("x = ");
        emitter.emit("1");
        emitter.emit_line("");
        emitter.header_line("float x;");

        assert_eq!(emitter.finalize(), "float x;\nx = 1;\n");
    }

    #[test]
    fn empty_program() {
        assert_eq!(
            translate(""),
            "#include <stdio.h>\n\
             \n\
             int main(void)\n\
             {\n\
             \treturn 0;\n\
             }\n"
        );
    }

    #[test]
    fn let_and_print() {
        assert_eq!(
            translate("LET x = 1\nPRINT x\n"),
            "#include <stdio.h>\n\
             \n\
             int main(void)\n\
             {\n\
             \tfloat x = 0;\n\
             \n\
             \tx = 1.0;\n\
             \tprintf(\"%.2f\\n\", (float)(x));\n\
             \treturn 0;\n\
             }\n"
        );
    }

    #[test]
    fn input_falls_back_to_zero() {
        let output = translate("INPUT n\n");

        assert!(output.contains(
            "\tif (1 != scanf(\"%f\", &n)) {\n\
             \t\tn = 0;\n\
             \t\tscanf(\"%*s\");\n\
             \t}\n"
        ));
    }

    #[test]
    fn control_flow() {
        let output = translate(
            "WHILE n > 0 REPEAT\n\
             IF n == 2 THEN\n\
             GOTO done\n\
             ENDIF\n\
             LET n = n - 1\n\
             ENDWHILE\n\
             LABEL done\n",
        );

        assert!(output.contains(
            "\twhile (n > 0.0) {\n\
             \t\tif (n == 2.0) {\n\
             \t\t\tgoto done;\n\
             \t\t}\n\
             \t\tn = n - 1.0;\n\
             \t}\n\
             \tdone:;\n"
        ));
    }

    #[test]
    fn operators_are_spaced() {
        let output = translate("LET a = b - -c * +2.5 / d\n");
        assert!(output.contains("\ta = b - -c * +2.5 / d;\n"));
    }

    #[test]
    fn comparison_chains_keep_source_grouping() {
        let output = translate("IF a == b < c THEN\nENDIF\n");
        assert!(output.contains("\tif ((a == b) < c) {\n"));

        let output = translate("IF a < b == c THEN\nENDIF\n");
        assert!(output.contains("\tif ((a < b) == c) {\n"));
    }

    #[test]
    fn reserved_names_are_mangled() {
        let output = translate("LET int = 1\nLABEL while\nPRINT printf\n");

        assert!(output.contains("\tfloat int_ = 0;\n"));
        assert!(output.contains("\tfloat printf_ = 0;\n"));
        assert!(output.contains("\twhile_:;\n"));
        assert!(output.contains("(float)(printf_)"));
    }

    #[test]
    fn predefined_macros_are_mangled() {
        let output = translate("LET linux = 1\nINPUT unix\nPRINT linux + unix\n");

        assert!(output.contains("\tfloat linux_ = 0;\n"));
        assert!(output.contains("\tfloat unix_ = 0;\n"));
        assert!(output.contains("\tlinux_ = 1.0;\n"));
        assert!(output.contains("&unix_"));
        assert!(output.contains("(float)(linux_ + unix_)"));
        assert!(!output.contains("linux "));
    }

    #[test]
    fn strings_are_trigraph_safe() {
        let output = translate("PRINT \"what??!\"\n");
        assert!(output.contains("\tprintf(\"what\\?\\?!\\n\");\n"));
    }

    #[test]
    fn each_variable_declared_once() {
        let output = translate("LET a = a + b\nINPUT b\nLET a = b * a\nPRINT a\n");

        assert_eq!(output.matches("float a = 0;").count(), 1);
        assert_eq!(output.matches("float b = 0;").count(), 1);
        assert_eq!(output.matches("float ").count(), 2);
    }
}
