//! Análisis sintáctico.
//!
//! Descenso recursivo con un token de lookahead. La gramática es
//! LL(1), por lo cual nunca se requiere retroceder: cada regla examina
//! el token actual, falla de inmediato si no corresponde y solo entonces
//! lo consume. El análisis semántico de [`crate::semantic`] ocurre
//! durante el mismo recorrido, de modo que el primer error en orden
//! de aparición es el que se reporta.
//!
//! ```text
//! program    := statement*
//! statement  := "PRINT" (string | expression)
//!             | "INPUT" identifier
//!             | "LET" identifier "=" expression
//!             | "IF" comparison "THEN" nl statement* "ENDIF"
//!             | "WHILE" comparison "REPEAT" nl statement* "ENDWHILE"
//!             | "LABEL" identifier
//!             | "GOTO" identifier
//! comparison := expression (("==" | "!=" | ">" | ">=" | "<" | "<=") expression)+
//! expression := term (("+" | "-") term)*
//! term       := unary (("*" | "/") unary)*
//! unary      := ("+" | "-")? primary
//! primary    := number | identifier
//! ```
//!
//! Los bloques `IF` y `WHILE` no pueden anidarse a más de
//! [`MAX_NESTING`] niveles.

use std::fmt::{self, Display};
use thiserror::Error;

use crate::{
    error::TranslateError,
    lex::{Identifier, Keyword, Lexer, Token},
    semantic::SymbolTable,
    source::{InputStream, Located, Location},
};

/// Programa completo, junto a las variables que declara.
#[derive(Debug)]
pub struct Ast {
    statements: Vec<Statement>,
    variables: Vec<Identifier>,
}

impl Ast {
    /// Sentencias de nivel superior.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Variables en orden de primer uso, sin repeticiones.
    pub fn variables(&self) -> &[Identifier] {
        &self.variables
    }
}

#[derive(Debug)]
pub enum Statement {
    PrintString(Located<String>),
    PrintExpr(Located<Expr>),
    Input(Located<Identifier>),

    Let {
        target: Located<Identifier>,
        value: Located<Expr>,
    },

    If {
        condition: Located<Expr>,
        body: Vec<Statement>,
    },

    While {
        condition: Located<Expr>,
        body: Vec<Statement>,
    },

    Label(Located<Identifier>),
    Goto(Located<Identifier>),
}

#[derive(Debug)]
pub enum Expr {
    Number(String),
    Read(Identifier),
    Unary(Sign, Box<Located<Expr>>),
    Binary(Box<Located<Expr>>, BinOp, Box<Located<Expr>>),
}

impl Expr {
    /// Determina si esta expresión es una comparación.
    pub fn is_comparison(&self) -> bool {
        matches!(self, Expr::Binary(_, op, _) if op.is_comparison())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        !matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }

    /// Operador homónimo en el lenguaje objetivo.
    pub fn symbol(self) -> &'static str {
        use BinOp::*;

        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessOrEqual => "<=",
            Greater => ">",
            GreaterOrEqual => ">=",
        }
    }
}

/// Descripción de lo que se esperaba encontrar.
#[derive(Debug)]
pub enum Expected {
    Token(Token),
    Identifier,
    Statement,
    Expression,
    ComparisonOperator,
}

impl Display for Expected {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Token(token) => token.fmt(fmt),
            Expected::Identifier => fmt.write_str("identifier"),
            Expected::Statement => fmt.write_str(
                "any of `PRINT`, `INPUT`, `LET`, `IF`, `WHILE`, `LABEL`, `GOTO`",
            ),
            Expected::Expression => fmt.write_str("number or identifier"),
            Expected::ComparisonOperator => {
                fmt.write_str("comparison operator (`==`, `!=`, `>`, `>=`, `<`, `<=`)")
            }
        }
    }
}

/// Profundidad máxima de bloques anidados.
pub const MAX_NESTING: usize = 64;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {0}, found {1} instead")]
    Unexpected(Expected, Token),

    #[error("Blocks are nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Analiza un programa completo a partir de un lexer.
///
/// Los errores léxicos se manifiestan aquí, conforme el parser
/// solicita tokens.
pub fn parse<S: InputStream>(lexer: Lexer<S>) -> Result<Ast, TranslateError> {
    Parser::new(lexer)?.program()
}

type Parse<T> = Result<T, TranslateError>;

struct Parser<S: InputStream> {
    lexer: Lexer<S>,
    current: Located<Token>,
    symbols: SymbolTable,
    depth: usize,
}

impl<S: InputStream> Parser<S> {
    fn new(mut lexer: Lexer<S>) -> Parse<Self> {
        let current = lexer.next_token()?;

        Ok(Parser {
            lexer,
            current,
            symbols: SymbolTable::default(),
            depth: 0,
        })
    }

    fn program(mut self) -> Parse<Ast> {
        // Pueden existir líneas en blanco antes de la primera sentencia
        while self.check(&Token::Newline) {
            self.next()?;
        }

        let mut statements = Vec::new();
        while !self.check(&Token::Eof) {
            statements.push(self.statement()?);
        }

        let variables = self.symbols.resolve()?;
        log::debug!(
            "Parsed {} top-level statements, {} variables",
            statements.len(),
            variables.len()
        );

        Ok(Ast {
            statements,
            variables,
        })
    }

    fn statement(&mut self) -> Parse<Statement> {
        let keyword = match self.current.val() {
            Token::Keyword(keyword) => *keyword,
            _ => return self.fail(Expected::Statement),
        };

        let statement = match keyword {
            Keyword::Print => {
                self.next()?;
                self.print()?
            }

            Keyword::Input => {
                self.next()?;
                Statement::Input(self.variable()?)
            }

            Keyword::Let => {
                self.next()?;
                self.assignment()?
            }

            Keyword::If => {
                self.next()?;

                let condition = self.comparison()?;
                self.keyword(Keyword::Then)?;
                let body = self.block(Keyword::EndIf)?;

                Statement::If { condition, body }
            }

            Keyword::While => {
                self.next()?;

                let condition = self.comparison()?;
                self.keyword(Keyword::Repeat)?;
                let body = self.block(Keyword::EndWhile)?;

                Statement::While { condition, body }
            }

            Keyword::Label => {
                self.next()?;

                let label = self.id()?;
                self.symbols.declare_label(&label)?;

                Statement::Label(label)
            }

            Keyword::Goto => {
                self.next()?;

                let label = self.id()?;
                self.symbols.goto(&label);

                Statement::Goto(label)
            }

            Keyword::Then | Keyword::EndIf | Keyword::Repeat | Keyword::EndWhile => {
                return self.fail(Expected::Statement)
            }
        };

        self.newline()?;
        Ok(statement)
    }

    fn print(&mut self) -> Parse<Statement> {
        match self.current.val() {
            Token::StringLiteral(string) => {
                let string = string.clone();
                let location = self.next()?.location().clone();

                Ok(Statement::PrintString(Located::at(string, location)))
            }

            _ => Ok(Statement::PrintExpr(self.expression()?)),
        }
    }

    fn assignment(&mut self) -> Parse<Statement> {
        let target = self.variable()?;
        self.expect(Token::Assign)?;
        let value = self.expression()?;

        Ok(Statement::Let { target, value })
    }

    /// Sentencias hasta la palabra clave de cierre, la cual se consume.
    fn block(&mut self, end: Keyword) -> Parse<Vec<Statement>> {
        if self.depth == MAX_NESTING {
            let error = ParserError::TooDeep(MAX_NESTING);
            return Err(Located::at(error, self.current.location().clone()).into());
        }

        self.newline()?;

        let end = Token::Keyword(end);
        let mut body = Vec::new();

        self.depth += 1;
        let body = loop {
            if self.check(&end) {
                self.next()?;
                break body;
            } else if self.check(&Token::Eof) {
                return self.fail(Expected::Token(end));
            }

            body.push(self.statement()?);
        };

        self.depth -= 1;
        Ok(body)
    }

    fn comparison(&mut self) -> Parse<Located<Expr>> {
        let mut lhs = self.expression()?;
        let mut operators = 0;

        while let Some(op) = self.comparison_operator() {
            self.next()?;
            let rhs = self.expression()?;

            lhs = binary(lhs, op, rhs);
            operators += 1;
        }

        if operators == 0 {
            self.fail(Expected::ComparisonOperator)
        } else {
            Ok(lhs)
        }
    }

    fn expression(&mut self) -> Parse<Located<Expr>> {
        let mut lhs = self.term()?;

        loop {
            let op = match self.current.val() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break Ok(lhs),
            };

            self.next()?;
            let rhs = self.term()?;
            lhs = binary(lhs, op, rhs);
        }
    }

    fn term(&mut self) -> Parse<Located<Expr>> {
        let mut lhs = self.unary()?;

        loop {
            let op = match self.current.val() {
                Token::Times => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break Ok(lhs),
            };

            self.next()?;
            let rhs = self.unary()?;
            lhs = binary(lhs, op, rhs);
        }
    }

    fn unary(&mut self) -> Parse<Located<Expr>> {
        let sign = match self.current.val() {
            Token::Plus => Sign::Plus,
            Token::Minus => Sign::Minus,
            _ => return self.primary(),
        };

        let start = self.next()?.location().clone();
        let operand = self.primary()?;
        let location = Location::span(start, operand.location());

        Ok(Located::at(Expr::Unary(sign, Box::new(operand)), location))
    }

    fn primary(&mut self) -> Parse<Located<Expr>> {
        match self.current.val() {
            Token::Number(number) => {
                let number = Expr::Number(number.clone());
                let location = self.next()?.location().clone();

                Ok(Located::at(number, location))
            }

            Token::Id(_) => Ok(self.variable()?.map(Expr::Read)),
            _ => self.fail(Expected::Expression),
        }
    }

    /// Un identificador que nombra a una variable, declarándola si es nueva.
    fn variable(&mut self) -> Parse<Located<Identifier>> {
        let id = self.id()?;
        self.symbols.declare_var(id.val());

        Ok(id)
    }

    fn comparison_operator(&self) -> Option<BinOp> {
        let op = match self.current.val() {
            Token::Equal => BinOp::Equal,
            Token::NotEqual => BinOp::NotEqual,
            Token::Less => BinOp::Less,
            Token::LessOrEqual => BinOp::LessOrEqual,
            Token::Greater => BinOp::Greater,
            Token::GreaterOrEqual => BinOp::GreaterOrEqual,
            _ => return None,
        };

        Some(op)
    }

    /// Uno o más cambios de línea.
    fn newline(&mut self) -> Parse<()> {
        self.expect(Token::Newline)?;
        while self.check(&Token::Newline) {
            self.next()?;
        }

        Ok(())
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        match self.current.val() {
            Token::Id(id) => {
                let id = id.clone();
                let location = self.next()?.location().clone();

                Ok(Located::at(id, location))
            }

            _ => self.fail(Expected::Identifier),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Parse<()> {
        if self.check(&token) {
            self.next()?;
            Ok(())
        } else {
            self.fail(Expected::Token(token))
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.current.val() == token
    }

    /// Consume el token actual y solicita el siguiente al lexer.
    fn next(&mut self) -> Parse<Located<Token>> {
        let upcoming = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, upcoming))
    }

    /// Falla señalando al token actual.
    fn fail<T>(&self, expected: Expected) -> Parse<T> {
        let found = self.current.val().clone();
        let error = ParserError::Unexpected(expected, found);

        Err(Located::at(error, self.current.location().clone()).into())
    }
}

fn binary(lhs: Located<Expr>, op: BinOp, rhs: Located<Expr>) -> Located<Expr> {
    let location = Location::span(lhs.location().clone(), rhs.location());
    Located::at(Expr::Binary(Box::new(lhs), op, Box::new(rhs)), location)
}
