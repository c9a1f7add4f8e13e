//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el traductor construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto o aproximado en donde ocurre un error.

use std::{
    fmt::{self, Debug, Display, Formatter},
    iter,
    ops::Range,
    rc::Rc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un flujo de entrada, carácter por carácter.
///
/// Cada carácter viaja junto a la ubicación del carácter que le sigue.
pub trait InputStream: Iterator<Item = (char, Location)> {}

impl<I: Iterator<Item = (char, Location)>> InputStream for I {}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            position: from.position.start..to.position.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Obtiene el origen de esta ubicación.
    pub fn source(&self) -> &Source {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column - 1,
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Nombre de origen y líneas retenidas para diagnósticos.
pub struct Source {
    name: String,
    lines: Vec<String>,
}

impl Source {
    /// Nombre con el que se identifica al origen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoca a `callback` con el contenido de una línea (base 1).
    ///
    /// Líneas fuera de rango, como la posición que sigue al final
    /// del archivo, se presentan como líneas vacías.
    pub fn with_line<F, R>(&self, line: u32, callback: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let text = (line as usize)
            .checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .map(String::as_str)
            .unwrap_or("");

        callback(text)
    }
}

/// Transforma un texto fuente en un flujo que itera por carácter.
///
/// La ubicación que se encuentra en la tupla de retorno es la posición
/// que le corresponderá al primer caracter en la salida. Cada carácter
/// emitido incluye a la ubicación del siguiente. Toda línea, incluyendo
/// la última, termina en `'\n'`.
pub fn consume<'a, S>(text: &'a str, name: S) -> (Location, impl InputStream + 'a)
where
    S: Into<String>,
{
    let source = Rc::new(Source {
        name: name.into(),
        lines: text.lines().map(String::from).collect(),
    });

    let start = Location {
        from: Rc::clone(&source),
        position: Position::default()..Position::default().advance(),
    };

    let chars = text
        .lines()
        .enumerate()
        .flat_map(move |(line_index, line)| {
            let source = Rc::clone(&source);

            let mut column = 1;
            line.chars().chain(iter::once('\n')).map(move |c| {
                let here = Position {
                    line: line_index as u32 + 1,
                    column,
                };

                let next = match c {
                    '\n' => here.newline(),
                    '\t' => here.tab(),
                    _ => here.advance(),
                };

                column = next.column;
                let location = Location {
                    from: Rc::clone(&source),
                    position: next..next.advance(),
                };

                (c, location)
            })
        })
        .fuse();

    (start, chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_line_ends_in_newline() {
        let (_, stream) = consume("a\nb", "test");
        let chars: String = stream.map(|(c, _)| c).collect();

        assert_eq!(chars, "a\nb\n");
    }

    #[test]
    fn locations_point_to_following_char() {
        let (start, stream) = consume("ab\ncd", "test");
        assert_eq!(start.start(), Position { line: 1, column: 1 });

        let locations: Vec<_> = stream.map(|(_, location)| location.start()).collect();
        assert_eq!(locations[0], Position { line: 1, column: 2 });
        assert_eq!(locations[2], Position { line: 2, column: 1 });
        assert_eq!(locations[3], Position { line: 2, column: 2 });
    }

    #[test]
    fn tabs_advance_to_next_stop() {
        let position = Position { line: 1, column: 2 };
        assert_eq!(position.tab().column(), 5);
    }

    #[test]
    fn lines_are_retained() {
        let (start, _) = consume("LET x = 1\nPRINT x\n", "program.cos");

        assert_eq!(start.source().name(), "program.cos");
        start.source().with_line(2, |line| assert_eq!(line, "PRINT x"));
        start.source().with_line(9, |line| assert_eq!(line, ""));
    }
}
