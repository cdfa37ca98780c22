//! Pluggable mapping from expression trees to wire token streams.

use crate::expr::Expr;
use crate::token::Token;

/// Produces the lazy, finite, single-pass token sequence for an expression.
///
/// Implementations may rewrite the tree on the fly (normalising heads,
/// interning symbols, and so on); the serialiser only requires the result
/// to be in depth-first pre-order.
pub trait TokenProvider {
    /// Returns the token stream for `expr`.
    fn provide<'a>(&self, expr: &'a Expr) -> Box<dyn Iterator<Item = Token<'a>> + 'a>;
}

/// Default provider: the expression's own depth-first traversal.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityProvider;

impl TokenProvider for IdentityProvider {
    fn provide<'a>(&self, expr: &'a Expr) -> Box<dyn Iterator<Item = Token<'a>> + 'a> {
        Box::new(expr.tokens())
    }
}
