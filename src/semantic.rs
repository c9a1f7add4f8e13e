//! Análisis semántico.
//!
//! El lenguaje tiene un único espacio de nombres global. Las variables
//! se declaran implícitamente en su primer uso, ya sea como destino de
//! una asignación, de un `INPUT` o como lectura dentro de una expresión.
//! Las etiquetas, en cambio, deben declararse exactamente una vez con
//! `LABEL`. Como un `GOTO` puede referirse a una etiqueta declarada más
//! adelante, la completitud de las referencias se verifica una sola vez
//! al terminar de recorrer el programa completo.

use std::collections::HashSet;
use thiserror::Error;

use crate::{
    lex::Identifier,
    source::{Located, Location},
};

pub type Semantic<T> = Result<T, Located<SemanticError>>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Label `{0}` is already declared")]
    DuplicateLabel(Identifier),

    #[error("Attempting to go to undeclared label `{0}`")]
    UndeclaredLabel(Identifier),
}

/// Tablas de símbolos de una unidad de traducción.
#[derive(Default)]
pub struct SymbolTable {
    variables: Vec<Identifier>,
    declared_vars: HashSet<Identifier>,
    declared_labels: HashSet<Identifier>,
    goto_labels: Vec<Located<Identifier>>,
}

impl SymbolTable {
    /// Registra un uso de variable.
    ///
    /// Retorna `true` si este es el primer uso, en cuyo caso la variable
    /// queda declarada.
    pub fn declare_var(&mut self, id: &Identifier) -> bool {
        let first_use = self.declared_vars.insert(id.clone());
        if first_use {
            self.variables.push(id.clone());
        }

        first_use
    }

    /// Declara una etiqueta, la cual no debe existir previamente.
    pub fn declare_label(&mut self, id: &Located<Identifier>) -> Semantic<()> {
        if self.declared_labels.insert(id.val().clone()) {
            Ok(())
        } else {
            Err(Located::at(
                SemanticError::DuplicateLabel(id.val().clone()),
                id.location().clone(),
            ))
        }
    }

    /// Registra una referencia desde un `GOTO`, sin validarla todavía.
    pub fn goto(&mut self, id: &Located<Identifier>) {
        self.goto_labels.push(id.clone());
    }

    /// Concluye el análisis: todo `GOTO` debe tener su `LABEL`.
    ///
    /// Retorna las variables declaradas en orden de primer uso. Si
    /// hay referencias rotas, se reporta la primera en orden de aparición.
    pub fn resolve(self) -> Semantic<Vec<Identifier>> {
        let SymbolTable {
            variables,
            declared_labels,
            goto_labels,
            ..
        } = self;

        match goto_labels
            .into_iter()
            .find(|id| !declared_labels.contains(id.val()))
        {
            Some(missing) => {
                let (location, id): (Location, Identifier) = missing.split();
                Err(Located::at(SemanticError::UndeclaredLabel(id), location))
            }

            None => Ok(variables),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;

    fn located(name: &str, at: &Location) -> Located<Identifier> {
        Located::at(Identifier::from(name), at.clone())
    }

    #[test]
    fn variables_keep_first_use_order() {
        let mut symbols = SymbolTable::default();

        assert!(symbols.declare_var(&Identifier::from("b")));
        assert!(symbols.declare_var(&Identifier::from("a")));
        assert!(!symbols.declare_var(&Identifier::from("b")));

        let variables = symbols.resolve().unwrap();
        assert_eq!(
            variables,
            vec![Identifier::from("b"), Identifier::from("a")]
        );
    }

    #[test]
    fn duplicate_label() {
        let (at, _) = source::consume("", "test");
        let mut symbols = SymbolTable::default();

        symbols.declare_label(&located("a", &at)).unwrap();
        let error = symbols.declare_label(&located("a", &at)).unwrap_err();

        assert!(matches!(error.val(), SemanticError::DuplicateLabel(id) if id.as_ref() == "a"));
    }

    #[test]
    fn forward_goto_resolves() {
        let (at, _) = source::consume("", "test");
        let mut symbols = SymbolTable::default();

        symbols.goto(&located("end", &at));
        symbols.declare_label(&located("end", &at)).unwrap();

        assert!(symbols.resolve().is_ok());
    }

    #[test]
    fn first_missing_label_is_reported() {
        let (at, _) = source::consume("", "test");
        let mut symbols = SymbolTable::default();

        symbols.goto(&located("here", &at));
        symbols.goto(&located("nowhere", &at));
        symbols.goto(&located("elsewhere", &at));
        symbols.declare_label(&located("here", &at)).unwrap();

        let error = symbols.resolve().unwrap_err();
        assert!(matches!(error.val(), SemanticError::UndeclaredLabel(id) if id.as_ref() == "nowhere"));
    }

    #[test]
    fn unused_labels_are_legal() {
        let (at, _) = source::consume("", "test");
        let mut symbols = SymbolTable::default();

        symbols.declare_label(&located("unused", &at)).unwrap();
        assert!(symbols.resolve().is_ok());
    }
}
