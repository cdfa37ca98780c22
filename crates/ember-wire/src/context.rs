//! Structural bookkeeping for depth-first expression serialisation.
//!
//! The finalised expression is a tree, serialised depth first. While the
//! traversal is in flight many nodes at different depths are incomplete, so
//! the context remembers, per level, the declared length, the number of
//! parts already emitted, and whether the node is an association. The first
//! two catch mismatches between declared and actual child counts; the last
//! rejects rule tokens emitted outside an association.

use crate::errors::StructuralError;

/// One level of the expression tree being serialised.
#[derive(Debug, Clone, Copy)]
struct Frame {
    expected: usize,
    emitted: usize,
    is_association: bool,
}

impl Frame {
    const fn complete(self) -> bool {
        self.emitted == self.expected
    }
}

/// Tracks declared-versus-actual child counts during serialisation.
///
/// The enforcing variant maintains a frame stack seeded with a synthetic
/// root frame declaring exactly one top-level expression. The permissive
/// variant skips all bookkeeping and trusts the caller to supply a
/// well-formed token stream.
#[derive(Debug)]
pub enum StructuralContext {
    /// Full bookkeeping; malformed streams fail before bytes are written.
    Enforcing(FrameStack),
    /// No bookkeeping; every check passes.
    Permissive,
}

/// Explicit push/pop stack backing the enforcing variant.
#[derive(Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl StructuralContext {
    /// Builds an enforcing context expecting one top-level expression.
    #[must_use]
    pub fn enforcing() -> Self {
        Self::Enforcing(FrameStack {
            frames: vec![Frame {
                expected: 1,
                emitted: 0,
                is_association: false,
            }],
        })
    }

    /// Builds a context that performs no validation.
    #[must_use]
    pub const fn permissive() -> Self {
        Self::Permissive
    }

    /// Counts one part against the current frame.
    ///
    /// Frames whose declared length is reached are popped, cascading
    /// through any ancestors completed by the pop.
    ///
    /// # Errors
    ///
    /// Fails when the current frame already holds as many parts as it
    /// declared, or when no frame remains open.
    pub fn record_part(&mut self) -> Result<(), StructuralError> {
        match self {
            Self::Enforcing(stack) => stack.record_part(),
            Self::Permissive => Ok(()),
        }
    }

    /// Counts the new node as a part of its parent, then opens a frame for
    /// it with the given declared length.
    ///
    /// A zero-length node closes itself immediately.
    ///
    /// # Errors
    ///
    /// Fails when the parent frame cannot accept another part.
    pub fn enter_new_node(
        &mut self,
        declared_length: usize,
        is_association: bool,
    ) -> Result<(), StructuralError> {
        match self {
            Self::Enforcing(stack) => stack.enter_new_node(declared_length, is_association),
            Self::Permissive => Ok(()),
        }
    }

    /// Whether every frame, root included, has been fully consumed.
    #[must_use]
    pub fn is_final_state(&self) -> bool {
        match self {
            Self::Enforcing(stack) => stack.frames.is_empty(),
            Self::Permissive => true,
        }
    }

    /// Whether the current frame was opened as an association.
    #[must_use]
    pub fn is_association_context(&self) -> bool {
        match self {
            Self::Enforcing(stack) => stack
                .frames
                .last()
                .is_some_and(|frame| frame.is_association),
            Self::Permissive => true,
        }
    }
}

impl FrameStack {
    fn record_part(&mut self) -> Result<(), StructuralError> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(StructuralError::NoOpenNode);
        };
        if frame.emitted >= frame.expected {
            return Err(StructuralError::TooManyParts {
                declared: frame.expected,
            });
        }
        frame.emitted += 1;
        self.pop_complete();
        Ok(())
    }

    fn enter_new_node(
        &mut self,
        declared_length: usize,
        is_association: bool,
    ) -> Result<(), StructuralError> {
        // The new node counts as one part of its parent.
        self.record_part()?;
        self.frames.push(Frame {
            expected: declared_length,
            emitted: 0,
            is_association,
        });
        // A zero-length node is complete the moment it opens.
        self.pop_complete();
        Ok(())
    }

    fn pop_complete(&mut self) {
        while self.frames.last().is_some_and(|frame| frame.complete()) {
            self.frames.pop();
        }
    }
}
