//! Errores terminales de traducción y su presentación.
//!
//! Cada fase define su propio tipo de error, el cual viaja envuelto en
//! [`Located`]. Al salir de la fase, este se convierte en un
//! [`TranslateError`], que es el único objeto de error que observa
//! quien invoca al traductor. No existe recuperación ni acumulación
//! de múltiples errores: el primero es definitivo.

use crate::{
    lex::LexerError,
    parse::ParserError,
    semantic::SemanticError,
    source::{Located, Location},
};

use std::{
    error::Error,
    fmt::{self, Debug, Display},
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

/// Clasificación de errores de traducción.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Carácter fuera del alfabeto del lenguaje.
    InvalidCharacter,

    /// Token que no puede iniciar o continuar la producción actual.
    Syntax,

    /// `LABEL` repetido.
    DuplicateLabel,

    /// `GOTO` hacia una etiqueta que nunca se declara.
    UndeclaredLabel,
}

impl ErrorKind {
    /// Fase en la que se origina esta clase de error.
    fn phase(self) -> &'static str {
        match self {
            ErrorKind::InvalidCharacter => "Lexical error",
            ErrorKind::Syntax => "Syntax error",
            ErrorKind::DuplicateLabel | ErrorKind::UndeclaredLabel => "Semantic error",
        }
    }
}

/// Error terminal de una traducción.
pub struct TranslateError {
    kind: ErrorKind,
    error: Box<dyn 'static + LocatedError>,
}

impl TranslateError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Mensaje legible, sin ubicación.
    pub fn message(&self) -> String {
        self.error.source().to_string()
    }

    pub fn location(&self) -> &Location {
        self.error.location()
    }

    /// Línea en la que se detectó el error.
    pub fn line(&self) -> u32 {
        self.location().start().line()
    }

    /// Presentación detallada, con la línea de código afectada.
    pub fn diagnostics(&self) -> Diagnostics<'_> {
        Diagnostics { error: self }
    }

    fn new<E: 'static + Error>(kind: ErrorKind, error: Located<E>) -> Self {
        TranslateError {
            kind,
            error: Box::new(error),
        }
    }
}

impl From<Located<LexerError>> for TranslateError {
    fn from(error: Located<LexerError>) -> Self {
        TranslateError::new(ErrorKind::InvalidCharacter, error)
    }
}

impl From<Located<ParserError>> for TranslateError {
    fn from(error: Located<ParserError>) -> Self {
        TranslateError::new(ErrorKind::Syntax, error)
    }
}

impl From<Located<SemanticError>> for TranslateError {
    fn from(error: Located<SemanticError>) -> Self {
        let kind = match error.val() {
            SemanticError::DuplicateLabel(_) => ErrorKind::DuplicateLabel,
            SemanticError::UndeclaredLabel(_) => ErrorKind::UndeclaredLabel,
        };

        TranslateError::new(kind, error)
    }
}

impl Display for TranslateError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: {}", self.location(), self.error.source())
    }
}

impl Debug for TranslateError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("TranslateError")
            .field("kind", &self.kind)
            .field("location", self.location())
            .field("message", &self.message())
            .finish()
    }
}

impl Error for TranslateError {}

/// Reporte al estilo de `rustc` para un [`TranslateError`].
pub struct Diagnostics<'a> {
    error: &'a TranslateError,
}

impl Display for Diagnostics<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let error = self.error;
        writeln!(fmt, "{}: {}", error.kind.phase(), error.error.source())?;

        let location = error.location();
        writeln!(fmt, " --> {}", location)?;

        let digits = location.end().line().to_string().chars().count();
        writeln!(fmt, "{:digits$} |", "", digits = digits)?;

        for line_number in location.start().line()..=location.end().line() {
            location.source().with_line(line_number, |line| {
                writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
            })?
        }

        let (from, to) = (location.start().column(), location.end().column() - 1);
        let min = from.min(to).max(1);
        let max = from.max(to);

        let skip = (min - 1) as usize;
        let highlight = (max - min + 1) as usize;

        writeln!(
            fmt,
            "{:digits$} | {:skip$}{:^<highlight$}",
            "",
            "",
            "",
            digits = digits,
            skip = skip,
            highlight = highlight
        )?;

        writeln!(fmt)?;
        writeln!(fmt, "Translation failed with 1 error")
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::ErrorKind, translate};

    #[test]
    fn diagnostics_point_at_offender() {
        let error = translate("LET x = 1\nLET y = x $ 2\n", "demo.cos").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidCharacter);

        let report = error.diagnostics().to_string();
        let lines: Vec<_> = report.lines().collect();

        assert_eq!(lines[0], "Lexical error: Bad character '$' in input stream");
        assert_eq!(lines[1], " --> demo.cos:2:11");
        assert_eq!(lines[3], "2 | LET y = x $ 2");
        assert_eq!(lines[4], "  |           ^");
        assert_eq!(lines.last(), Some(&"Translation failed with 1 error"));
    }

    #[test]
    fn display_is_single_line() {
        let error = translate("LABEL a\nLABEL a\n", "labels.cos").unwrap_err();
        assert_eq!(
            error.to_string(),
            "labels.cos:2:7: Label `a` is already declared"
        );
    }
}
