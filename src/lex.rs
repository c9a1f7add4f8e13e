//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del traductor. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios se descartan durante esta operación. Cada
//! token emitido esta asociado a una ubicación en el código fuente original,
//! lo cual permite rastrear errores en tanto los mismos como constructos
//! más elevados de fases posteriores.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por el hecho de lo
//! que son y no incluyen lexemas. Por su parte, identificadores, literales
//! numéricos y cadenas sí preservan su texto original, ya que este pasa
//! sin cambios al código generado.
//!
//! # Reglas importantes del lenguaje
//! - Los cambios de línea terminan sentencias y por tanto son tokens.
//!   Varios cambios de línea consecutivos se reducen a uno solo.
//! - `#` inicia un comentario que se extiende hasta el fin de la línea.
//! - Las palabras clave se escriben en mayúsculas y se comparan de forma
//!   exacta, por lo cual `print` es un identificador y no [`Keyword::Print`].
//! - Las cadenas no pueden contener `\`, `%`, `$` ni cambios de línea.
//!
//! # Errores
//! El lexer no se recupera de errores. El primer error encontrado es
//! terminal para la traducción completa.

use crate::source::{InputStream, Located, Location};
use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Se esperaba un carácter específico en esta posición.
    #[error("Expected {0:?}")]
    Expected(char),

    /// Carácter prohibido dentro de una cadena literal.
    #[error("Illegal character {0:?} in string literal")]
    BadStringChar(char),

    /// Un punto decimal sin dígitos a su derecha.
    #[error("Expected a digit after the decimal point")]
    MissingFraction,
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(fmt)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Fin de la entrada.
    Eof,

    /// Fin de sentencia.
    Newline,

    /// Literal numérico, con su lexema original.
    Number(String),

    /// Identificador.
    Id(Identifier),

    /// Cadena literal, sin las comillas.
    StringLiteral(String),

    /// Palabra clave.
    Keyword(Keyword),

    /// `=`
    Assign,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `==`
    Equal,

    /// `!=`
    NotEqual,

    /// `>`
    Greater,

    /// `>=`
    GreaterOrEqual,

    /// `<`
    Less,

    /// `<=`
    LessOrEqual,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Eof => fmt.write_str("end of file"),
            Newline => fmt.write_str("newline"),
            Number(number) => write!(fmt, "literal `{}`", number),
            Id(id) => write!(fmt, "identifier `{}`", id),
            StringLiteral(string) => write!(fmt, "string \"{}\"", string),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Assign => fmt.write_str("`=`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            Equal => fmt.write_str("`==`"),
            NotEqual => fmt.write_str("`!=`"),
            Greater => fmt.write_str("`>`"),
            GreaterOrEqual => fmt.write_str("`>=`"),
            Less => fmt.write_str("`<`"),
            LessOrEqual => fmt.write_str("`<=`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Label,
    Goto,
    Print,
    Input,
    Let,
    If,
    Then,
    EndIf,
    While,
    Repeat,
    EndWhile,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("LABEL",    Keyword::Label),
    ("GOTO",     Keyword::Goto),
    ("PRINT",    Keyword::Print),
    ("INPUT",    Keyword::Input),
    ("LET",      Keyword::Let),
    ("IF",       Keyword::If),
    ("THEN",     Keyword::Then),
    ("ENDIF",    Keyword::EndIf),
    ("WHILE",    Keyword::While),
    ("REPEAT",   Keyword::Repeat),
    ("ENDWHILE", Keyword::EndWhile),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == *self)
            .map(|&(name, _)| name)
            .unwrap_or("?");

        fmt.write_str(name)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<S: Iterator> {
    source: Peekable<S>,
    state: State,
    start: Location,
    next: Location,
    after_newline: bool,
    finished: bool,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`,
    /// sin consumirlo.
    Comment,

    /// Se encontró `=`, que puede ser el inicio de `==`.
    AfterEquals,

    /// Se encontró `!`, que debe ser el inicio de `!=`.
    AfterBang,

    /// Se encontró `<`.
    AfterLess,

    /// Se encontró `>`.
    AfterGreater,

    /// Parte entera de una constante numérica.
    Integer(String),

    /// Parte entera seguida de `.`; debe seguir al menos un dígito.
    Point(String),

    /// Parte fraccionaria de una constante numérica.
    Fraction(String),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),

    /// Interior de una cadena literal.
    Quoted(String),
}

impl<S: InputStream> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(start: Location, source: S) -> Self {
        let next = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            next,
            after_newline: false,
            finished: false,
        }
    }

    /// Obtiene el siguiente token.
    ///
    /// Una vez agotada la entrada, toda llamada subsecuente retorna
    /// [`Token::Eof`]. Los errores son terminales: no debe invocarse
    /// esta función nuevamente luego de un error.
    pub fn next_token(&mut self) -> Result<Located<Token>, Located<LexerError>> {
        loop {
            let (token, last_accepted) = match self.lex() {
                Ok(Some(result)) => result,
                Ok(None) => return Ok(Located::at(Token::Eof, self.next.clone())),
                Err(error) => return Err(Located::at(error, self.next.clone())),
            };

            self.state = State::Start;

            // Una secuencia de líneas vacías termina una única sentencia
            let newline = token == Token::Newline;
            if newline && self.after_newline {
                continue;
            }

            self.after_newline = newline;

            let location = Location::span(self.start.clone(), &last_accepted);
            break Ok(Located::at(token, location));
        }
    }

    /// Observa el siguiente carácter sin consumirlo.
    pub fn peek(&mut self) -> Option<char> {
        self.source.peek().map(|&(c, _)| c)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<(Token, Location)>, LexerError> {
        use {State::*, Token::*};

        let mut last_accepted = self.start.clone();
        let token = loop {
            let next_char = self.peek();

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.next.clone();
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some('\n')) => self.state = Complete(Newline),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Times),
                (Start, Some('/')) => self.state = Complete(Slash),

                // Operadores de uno o dos caracteres
                (Start, Some('=')) => self.state = AfterEquals,
                (Start, Some('!')) => self.state = AfterBang,
                (Start, Some('<')) => self.state = AfterLess,
                (Start, Some('>')) => self.state = AfterGreater,

                (Start, Some('#')) => self.state = Comment,
                (Start, Some('"')) => self.state = Quoted(String::new()),

                // Identificadores, palabras clave y constantes
                (Start, Some(c)) if c.is_ascii_alphabetic() => self.state = Word(c.to_string()),
                (Start, Some(c)) if c.is_ascii_digit() => self.state = Integer(c.to_string()),

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => break Err(LexerError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(value), _) => break Ok(std::mem::replace(value, Eof)),

                // El cambio de línea que cierra un comentario sí es un token
                (Comment, Some('\n')) | (Comment, None) => {
                    self.state = Start;
                    continue;
                }

                (Comment, Some(_)) => (),

                (AfterEquals, Some('=')) => self.state = Complete(Equal),
                (AfterEquals, _) => break Ok(Assign),

                (AfterLess, Some('=')) => self.state = Complete(LessOrEqual),
                (AfterLess, _) => break Ok(Less),

                (AfterGreater, Some('=')) => self.state = Complete(GreaterOrEqual),
                (AfterGreater, _) => break Ok(Greater),

                // `!` no es un operador por sí solo
                (AfterBang, Some('=')) => self.state = Complete(NotEqual),
                (AfterBang, _) => break Err(LexerError::Expected('=')),

                // Acumulación dígito por dígito de constantes
                (Integer(digits), Some(c)) if c.is_ascii_digit() => digits.push(c),
                (Integer(digits), Some('.')) => {
                    let mut digits = std::mem::take(digits);
                    digits.push('.');

                    self.state = Point(digits);
                }

                (Integer(digits), _) => break Ok(Number(std::mem::take(digits))),

                (Point(digits), Some(c)) if c.is_ascii_digit() => {
                    let mut digits = std::mem::take(digits);
                    digits.push(c);

                    self.state = Fraction(digits);
                }

                (Point(_), _) => break Err(LexerError::MissingFraction),

                (Fraction(digits), Some(c)) if c.is_ascii_digit() => digits.push(c),
                (Fraction(digits), _) => break Ok(Number(std::mem::take(digits))),

                // Extensión de términos
                (Word(word), Some(c)) if c.is_ascii_alphanumeric() => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    if let Ok(keyword) = self::Keyword::from_str(word) {
                        break Ok(Keyword(keyword));
                    } else {
                        break Ok(Id(Identifier(Rc::from(std::mem::take(word)))));
                    }
                }

                (Quoted(text), Some('"')) => {
                    let text = std::mem::take(text);
                    self.state = Complete(StringLiteral(text));
                }

                (Quoted(_), Some(c)) if is_forbidden_in_string(c) => {
                    break Err(LexerError::BadStringChar(c))
                }

                (Quoted(text), Some(c)) => text.push(c),
                (Quoted(_), None) => break Err(LexerError::BadStringChar('\n')),
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some((_, next_position)) = self.source.next() {
                last_accepted = std::mem::replace(&mut self.next, next_position);
            }
        };

        token.map(|token| Some((token, last_accepted)))
    }
}

impl<S: InputStream> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    /// Emite tokens hasta [`Token::Eof`] inclusive o hasta el primer error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.next_token();
        match &result {
            Ok(token) if *token.val() != Token::Eof => (),
            _ => self.finished = true,
        }

        Some(result)
    }
}

/// Caracteres reservados para escapes futuros o que romperían
/// una cadena de formato en el código generado.
fn is_forbidden_in_string(c: char) -> bool {
    matches!(c, '\n' | '\\' | '%' | '$') || (c.is_control() && c != '\t')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;

    fn lex(text: &str) -> Result<Vec<Located<Token>>, Located<LexerError>> {
        let (start, stream) = source::consume(text, "test");
        Lexer::new(start, stream).collect()
    }

    fn kinds(text: &str) -> Vec<Token> {
        lex(text)
            .expect("lexing failed")
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    fn id(name: &str) -> Token {
        Token::Id(Identifier::from(name))
    }

    #[test]
    fn let_statement() {
        assert_eq!(
            kinds("LET x = 1.5\n"),
            vec![
                Token::Keyword(Keyword::Let),
                id("x"),
                Token::Assign,
                Token::Number(String::from("1.5")),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn operators_with_lookahead() {
        use Token::*;

        assert_eq!(
            kinds("= == != > >= < <= + - * /"),
            vec![
                Assign,
                Equal,
                NotEqual,
                Greater,
                GreaterOrEqual,
                Less,
                LessOrEqual,
                Plus,
                Minus,
                Times,
                Slash,
                Newline,
                Eof,
            ]
        );
    }

    #[test]
    fn operators_without_spaces() {
        use Token::*;

        assert_eq!(
            kinds("a<=b==-1"),
            vec![
                id("a"),
                LessOrEqual,
                id("b"),
                Equal,
                Minus,
                Number(String::from("1")),
                Newline,
                Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_exact() {
        assert_eq!(
            kinds("print PRINT Print ENDWHILE x2"),
            vec![
                id("print"),
                Token::Keyword(Keyword::Print),
                id("Print"),
                Token::Keyword(Keyword::EndWhile),
                id("x2"),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn newlines_collapse() {
        let tokens = kinds("PRINT 1\n\n\n# comment\n   \nPRINT 2");
        let newlines = tokens.iter().filter(|&t| *t == Token::Newline).count();

        assert_eq!(newlines, 2);
        assert_eq!(tokens[2], Token::Newline);
        assert_eq!(tokens[3], Token::Keyword(Keyword::Print));
    }

    #[test]
    fn trailing_comment_keeps_newline() {
        assert_eq!(
            kinds("GOTO end # skip ahead\nLABEL end"),
            vec![
                Token::Keyword(Keyword::Goto),
                id("end"),
                Token::Newline,
                Token::Keyword(Keyword::Label),
                id("end"),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn string_literal() {
        assert_eq!(
            kinds("PRINT \"hello, world!\""),
            vec![
                Token::Keyword(Keyword::Print),
                Token::StringLiteral(String::from("hello, world!")),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn forbidden_string_characters() {
        for (text, bad) in &[
            ("PRINT \"100% ok\"", '%'),
            ("PRINT \"$5\"", '$'),
            ("PRINT \"a\\n\"", '\\'),
            ("PRINT \"unterminated\nPRINT 1", '\n'),
        ] {
            let error = lex(text).unwrap_err();
            assert!(matches!(error.val(), LexerError::BadStringChar(c) if c == bad));
            assert_eq!(error.location().start().line(), 1);
        }
    }

    #[test]
    fn bad_character_reports_line() {
        let error = lex("LET x = 1\nLET y = @\n").unwrap_err();

        assert!(matches!(error.val(), LexerError::BadChar('@')));
        assert_eq!(error.location().start().line(), 2);
        assert_eq!(error.location().start().column(), 9);
    }

    #[test]
    fn lone_bang() {
        let error = lex("IF a ! b THEN").unwrap_err();
        assert!(matches!(error.val(), LexerError::Expected('=')));
    }

    #[test]
    fn number_needs_fraction_digits() {
        let error = lex("LET x = 1.\n").unwrap_err();
        assert!(matches!(error.val(), LexerError::MissingFraction));
    }

    #[test]
    fn token_locations() {
        let tokens = lex("LET x = 10\nPRINT x\n").unwrap();

        let number = &tokens[3];
        assert_eq!(*number.val(), Token::Number(String::from("10")));
        assert_eq!(number.location().start().column(), 9);
        assert_eq!(number.location().end().column(), 11);

        let print = &tokens[5];
        assert_eq!(*print.val(), Token::Keyword(Keyword::Print));
        assert_eq!(print.location().start().line(), 2);
    }

    #[test]
    fn eof_repeats() {
        let (start, stream) = source::consume("", "test");
        let mut lexer = Lexer::new(start, stream);

        assert_eq!(*lexer.next_token().unwrap().val(), Token::Eof);
        assert_eq!(*lexer.next_token().unwrap().val(), Token::Eof);
    }
}
