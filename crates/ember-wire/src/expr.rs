//! Owned expression trees and their depth-first token streams.
//!
//! [`Expr`] is the in-memory representation callers hand to the serialiser.
//! [`Expr::tokens`] flattens a tree into the lazy pre-order token sequence
//! the wire format expects; it is also the identity token provider used
//! when no custom provider is configured.

use crate::token::Token;

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A function application: head applied to arguments.
    Function {
        /// Expression in head position.
        head: Box<Expr>,
        /// Argument expressions, in order.
        args: Vec<Expr>,
    },
    /// A symbol.
    Symbol(String),
    /// A UTF-8 string.
    String(String),
    /// Raw binary data.
    Binary(Vec<u8>),
    /// A signed integer, narrowed to the smallest wire token that holds it.
    Integer(i64),
    /// A 64-bit real.
    Real(f64),
    /// A key/value association.
    Association(Vec<AssocEntry>),
}

/// One key/value entry of an association.
#[derive(Debug, Clone, PartialEq)]
pub struct AssocEntry {
    /// Key expression.
    pub key: Expr,
    /// Value expression.
    pub value: Expr,
    /// Whether the entry uses the delayed rule token.
    pub delayed: bool,
}

impl Expr {
    /// Builds a function application from a head symbol and arguments.
    #[must_use]
    pub fn function(head: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Function {
            head: Box::new(Self::Symbol(head.into())),
            args,
        }
    }

    /// Builds an association from `(key, value)` pairs using plain rules.
    #[must_use]
    pub fn association(entries: Vec<(Expr, Expr)>) -> Self {
        Self::Association(
            entries
                .into_iter()
                .map(|(key, value)| AssocEntry {
                    key,
                    value,
                    delayed: false,
                })
                .collect(),
        )
    }

    /// Returns the lazy depth-first pre-order token stream for this tree.
    #[must_use]
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens {
            stack: vec![Visit::Node(self)],
        }
    }
}

enum Visit<'a> {
    Node(&'a Expr),
    Entry(&'a AssocEntry),
}

/// Depth-first token iterator over an [`Expr`] tree.
pub struct Tokens<'a> {
    stack: Vec<Visit<'a>>,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.stack.pop()? {
            Visit::Node(expr) => Some(self.visit_node(expr)),
            Visit::Entry(entry) => {
                self.stack.push(Visit::Node(&entry.value));
                self.stack.push(Visit::Node(&entry.key));
                Some(if entry.delayed {
                    Token::RuleDelayed
                } else {
                    Token::Rule
                })
            }
        }
    }
}

impl<'a> Tokens<'a> {
    fn visit_node(&mut self, expr: &'a Expr) -> Token<'a> {
        match expr {
            Expr::Function { head, args } => {
                for arg in args.iter().rev() {
                    self.stack.push(Visit::Node(arg));
                }
                self.stack.push(Visit::Node(head));
                Token::Function { argc: args.len() }
            }
            Expr::Symbol(name) => Token::Symbol(name),
            Expr::String(text) => Token::String(text),
            Expr::Binary(data) => Token::Binary(data),
            Expr::Integer(value) => narrow_integer(*value),
            Expr::Real(value) => Token::Real64(*value),
            Expr::Association(entries) => {
                for entry in entries.iter().rev() {
                    self.stack.push(Visit::Entry(entry));
                }
                Token::Association {
                    len: entries.len(),
                }
            }
        }
    }
}

/// Picks the smallest integer token able to hold `value`.
fn narrow_integer(value: i64) -> Token<'static> {
    if let Ok(small) = i8::try_from(value) {
        Token::Int8(small)
    } else if let Ok(small) = i16::try_from(value) {
        Token::Int16(small)
    } else if let Ok(small) = i32::try_from(value) {
        Token::Int32(small)
    } else {
        Token::Int64(value)
    }
}
