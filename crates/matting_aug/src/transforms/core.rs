use crate::sample::Sample;
use anyhow::{Context, Result};
use std::marker::PhantomData;

/// Defines the core `Transform` trait for composable data processing pipelines.
///
/// The `Transform<I, O>` trait represents an operation converting an input
/// of type `I` into an output of type `O`. Sample transforms are
/// `Transform<Sample, Sample>`: they take the record by value, add or
/// overwrite the features they own and hand it back.
///
/// Steps can be chained statically via `.then(...)`, or collected at runtime
/// into a [`Compose`] when the order comes from configuration.
pub trait Transform<I, O>: Send + Sync {
    /// Applies the transformation to the input
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

impl<I, O> Transform<I, O> for Box<dyn Transform<I, O>> {
    fn apply(&self, input: I) -> Result<O> {
        self.as_ref().apply(input)
    }
}

/// A chain of two transforms (`A` -> `B`)
/// - `PhantomData<M>` enforces intermediate type alignment.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    /// Creates a new transform chain.
    /// Use [`Transform::then`] for better ergonomics.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        self.first
            .apply(input)
            .and_then(|mid| self.second.apply(mid))
            .with_context(|| {
                format!(
                    "Transform chain failed: {} → {} → {}",
                    std::any::type_name::<A>(),
                    std::any::type_name::<B>(),
                    std::any::type_name::<O>()
                )
            })
    }
}

/// An ordered, runtime-built sequence of sample transforms.
///
/// Each step receives the record produced by the previous one. The first
/// failing step aborts the sequence; its position and name are attached to
/// the error.
#[derive(Default)]
pub struct Compose {
    steps: Vec<(String, Box<dyn Transform<Sample, Sample>>)>,
}

impl Compose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step, recording its type name for error messages.
    pub fn push<T>(mut self, step: T) -> Self
    where
        T: Transform<Sample, Sample> + 'static,
    {
        let name = std::any::type_name::<T>().to_string();
        self.steps.push((name, Box::new(step)));
        self
    }

    /// Appends an already boxed step under an explicit name.
    pub fn push_boxed(
        mut self,
        name: impl Into<String>,
        step: Box<dyn Transform<Sample, Sample>>,
    ) -> Self {
        self.steps.push((name.into(), step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Names of the steps, in application order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|(name, _)| name.as_str())
    }
}

impl std::fmt::Debug for Compose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Transform<Sample, Sample> for Compose {
    fn apply(&self, input: Sample) -> Result<Sample> {
        self.steps
            .iter()
            .enumerate()
            .try_fold(input, |sample, (idx, (name, step))| {
                step.apply(sample)
                    .with_context(|| format!("Pipeline step {} ({}) failed", idx, name))
            })
    }
}
