//! Nested output buffers for length-prefixed objects.
//!
//! An object's header holds the byte length of its payload, which is only
//! known once every field has been written. Each object therefore writes its
//! fields into a fresh buffer on top of the stack; when the object closes, the
//! buffer is popped and framed into its parent.

use bytes::{Bytes, BytesMut};

/// A stack of byte buffers. Only the top buffer is writable.
#[derive(Debug)]
pub struct ScopeStack {
    // Invariant: never empty. Index 0 is the root buffer.
    buffers: Vec<BytesMut>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            buffers: vec![BytesMut::new()],
        }
    }

    /// Pushes a fresh buffer and makes it the write target.
    pub fn begin_scope(&mut self) {
        self.buffers.push(BytesMut::new());
    }

    /// Pops the top buffer and returns its contents; the parent becomes
    /// the write target again.
    ///
    /// # Panics
    ///
    /// Panics if no scope is open. Popping the root is a bug in the caller.
    pub fn end_scope(&mut self) -> BytesMut {
        assert!(
            self.buffers.len() > 1,
            "end_scope called without a matching begin_scope"
        );
        let top = self.buffers.pop();
        top.unwrap_or_default()
    }

    /// The buffer currently accepting writes.
    pub fn active(&mut self) -> &mut BytesMut {
        let last = self.buffers.len() - 1;
        &mut self.buffers[last]
    }

    /// Number of scopes open above the root.
    pub fn depth(&self) -> usize {
        self.buffers.len() - 1
    }

    /// Consumes the stack, returning the root buffer.
    ///
    /// # Panics
    ///
    /// Panics if a scope is still open.
    pub fn into_bytes(mut self) -> Bytes {
        assert_eq!(self.depth(), 0, "into_bytes called with open scopes");
        self.buffers.swap_remove(0).freeze()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
