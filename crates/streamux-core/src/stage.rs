//! Transform stages and chains.
//!
//! A [`Transform`] is a streaming byte-to-byte conversion applied in one
//! direction (encoding, compression, ciphers, ...). Stages may keep state
//! across calls, e.g. to align input to a block size; whatever they still
//! hold when the stream ends comes out of [`Transform::finish`].
//!
//! A [`Chain`] composes stages for one direction of a channel:
//!
//! ```text
//! write:  data ─▶ stage₁ ─▶ stage₂ ─▶ … ─▶ raw
//! read:   raw  ─▶ … ─▶ stage₂ ─▶ stage₁ ─▶ data
//! ```
//!
//! Both lists are written data-side first, so a read chain that mirrors the
//! peer's write chain position by position (with each stage inverted)
//! undoes it.

use crate::error::Result;

/// One streaming transform stage.
///
/// **Contract:**
/// - `transform()` appends its output to `out` and never clears it.
/// - Output length need not match input length or timing; a stage may
///   hold bytes back until more input (or `finish()`) arrives.
/// - `finish()` is called at most once, at end of stream.
pub trait Transform {
    /// Short stage name, used in errors and logs.
    fn name(&self) -> &str;

    /// Transform `chunk`, appending the result to `out`.
    fn transform(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()>;

    /// Emit any buffered tail. Stateless stages keep the default.
    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn transform(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        (**self).transform(chunk, out)
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<()> {
        (**self).finish(out)
    }
}

/// Which side of a channel a chain serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Raw stream towards the caller; stages run last-to-first.
    Read,
    /// Caller towards the raw stream; stages run first-to-last.
    Write,
}

/// Ordered stages for one direction.
pub struct Chain {
    direction: Direction,
    stages: Vec<Box<dyn Transform>>,
}

impl Chain {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            stages: Vec::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Append a stage at the raw-stream end of the list.
    pub fn push(&mut self, stage: Box<dyn Transform>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in list order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run `input` through every stage in application order.
    pub fn apply(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut carry = input.to_vec();
        let mut out = Vec::with_capacity(input.len());
        for stage in self.ordered() {
            out.clear();
            stage.transform(&carry, &mut out)?;
            std::mem::swap(&mut carry, &mut out);
        }
        Ok(carry)
    }

    /// Flush every stage at end of stream.
    ///
    /// Each stage's tail is pushed through the stages after it, which are
    /// then finished in turn.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        let mut carry = Vec::new();
        let mut out = Vec::new();
        for stage in self.ordered() {
            out.clear();
            if !carry.is_empty() {
                stage.transform(&carry, &mut out)?;
            }
            stage.finish(&mut out)?;
            std::mem::swap(&mut carry, &mut out);
        }
        Ok(carry)
    }

    fn ordered(&mut self) -> Box<dyn Iterator<Item = &mut Box<dyn Transform>> + '_> {
        match self.direction {
            Direction::Write => Box::new(self.stages.iter_mut()),
            Direction::Read => Box::new(self.stages.iter_mut().rev()),
        }
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("direction", &self.direction)
            .field("stages", &self.names())
            .finish()
    }
}

/// Stateless stage built from a closure.
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F> Transform for FnStage<F>
where
    F: FnMut(&[u8], &mut Vec<u8>) -> Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        (self.f)(chunk, out)
    }
}

/// Wrap a closure as a boxed stage.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> Box<dyn Transform>
where
    F: FnMut(&[u8], &mut Vec<u8>) -> Result<()> + 'static,
{
    Box::new(FnStage {
        name: name.into(),
        f,
    })
}
