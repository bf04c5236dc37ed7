//! Item processors and the processing pipeline that composes them.
//!
//! A processor returns `Ok(None)` to filter an item out. A pipeline stops at
//! the first `None` so later stages never observe a filtered item.

use crate::errors::ProcessError;
use std::fmt::Debug;

/// Result of processing one item.
pub type ProcessResult<O> = Result<Option<O>, ProcessError>;

/// A single transform stage.
pub trait ItemProcessor<I, O>: Send + Sync {
    /// Transforms an item, or returns `None` to filter it out.
    fn process(&self, item: I) -> ProcessResult<O>;

    /// Returns the stage name used in errors and logs.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// A function-based processor.
pub struct FnProcessor<F> {
    name: String,
    func: F,
}

impl<F> FnProcessor<F> {
    /// Creates a processor from a closure returning `ProcessResult`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProcessor")
            .field("name", &self.name)
            .finish()
    }
}

impl<I, O, F> ItemProcessor<I, O> for FnProcessor<F>
where
    F: Fn(I) -> ProcessResult<O> + Send + Sync,
{
    fn process(&self, item: I) -> ProcessResult<O> {
        (self.func)(item)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A processor that converts every item.
pub fn map<I, O>(
    name: &str,
    func: impl Fn(I) -> O + Send + Sync,
) -> FnProcessor<impl Fn(I) -> ProcessResult<O> + Send + Sync> {
    FnProcessor::new(name, move |item| Ok(Some(func(item))))
}

/// A processor that keeps only items accepted by `keep`.
pub fn filter<T>(
    name: &str,
    keep: impl Fn(&T) -> bool + Send + Sync,
) -> FnProcessor<impl Fn(T) -> ProcessResult<T> + Send + Sync> {
    FnProcessor::new(name, move |item| Ok(keep(&item).then_some(item)))
}

type Chain<I, O> = Box<dyn Fn(I) -> ProcessResult<O> + Send + Sync>;

/// An ordered, typed composition of processors.
///
/// Each stage receives the previous stage's output, so the item type may
/// change along the chain (e.g. record → name → greeting). An empty
/// pipeline is the identity.
pub struct ProcessingPipeline<I, O> {
    chain: Chain<I, O>,
    stage_names: Vec<String>,
}

impl<T: 'static> ProcessingPipeline<T, T> {
    /// Creates the identity pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain: Box::new(|item| Ok(Some(item))),
            stage_names: Vec::new(),
        }
    }
}

impl<T: 'static> Default for ProcessingPipeline<T, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: 'static, O: 'static> ProcessingPipeline<I, O> {
    /// Creates a pipeline with a single stage.
    pub fn of<P>(stage: P) -> Self
    where
        P: ItemProcessor<I, O> + 'static,
    {
        ProcessingPipeline::<I, I>::new().then(stage)
    }

    /// Appends a stage fed with this pipeline's output.
    #[must_use]
    pub fn then<N: 'static, P>(self, stage: P) -> ProcessingPipeline<I, N>
    where
        P: ItemProcessor<O, N> + 'static,
    {
        let Self {
            chain,
            mut stage_names,
        } = self;
        stage_names.push(stage.name().to_string());

        ProcessingPipeline {
            chain: Box::new(move |item| match chain(item)? {
                Some(value) => stage
                    .process(value)
                    .map_err(|e| e.in_stage(stage.name())),
                None => Ok(None),
            }),
            stage_names,
        }
    }

    /// Runs an item through every stage.
    pub fn process(&self, item: I) -> ProcessResult<O> {
        (self.chain)(item)
    }

    /// Returns the stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> &[String] {
        &self.stage_names
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stage_names.len()
    }

    /// Returns true for the identity pipeline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stage_names.is_empty()
    }
}

impl<I, O> Debug for ProcessingPipeline<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingPipeline")
            .field("stages", &self.stage_names)
            .finish()
    }
}

impl<I: 'static, O: 'static> ItemProcessor<I, O> for ProcessingPipeline<I, O> {
    fn process(&self, item: I) -> ProcessResult<O> {
        ProcessingPipeline::process(self, item)
    }

    fn name(&self) -> &str {
        "pipeline"
    }
}

/// A processor built from a list of same-typed delegates, run in order.
pub struct CompositeProcessor<T> {
    name: String,
    delegates: Vec<Box<dyn ItemProcessor<T, T>>>,
}

impl<T> CompositeProcessor<T> {
    /// Creates a composite processor.
    #[must_use]
    pub fn new(name: impl Into<String>, delegates: Vec<Box<dyn ItemProcessor<T, T>>>) -> Self {
        Self {
            name: name.into(),
            delegates,
        }
    }

    /// Returns the number of delegates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    /// Returns true if there are no delegates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }
}

impl<T> Debug for CompositeProcessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.delegates.iter().map(|d| d.name()).collect();
        f.debug_struct("CompositeProcessor")
            .field("name", &self.name)
            .field("delegates", &names)
            .finish()
    }
}

impl<T> ItemProcessor<T, T> for CompositeProcessor<T> {
    fn process(&self, item: T) -> ProcessResult<T> {
        let mut current = item;
        for delegate in &self.delegates {
            match delegate.process(current).map_err(|e| e.in_stage(delegate.name()))? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording(
        name: &str,
        seen: Arc<Mutex<Vec<String>>>,
    ) -> FnProcessor<impl Fn(i64) -> ProcessResult<i64> + Send + Sync> {
        let label = name.to_string();
        FnProcessor::new(name, move |item: i64| {
            seen.lock().push(format!("{label}:{item}"));
            Ok(Some(item))
        })
    }

    #[test]
    fn test_identity_pipeline() {
        let pipeline = ProcessingPipeline::<i64, i64>::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.process(7).unwrap(), Some(7));
    }

    #[test]
    fn test_typed_chain_changes_item_type() {
        let pipeline = ProcessingPipeline::new()
            .then(map("double", |x: i64| x * 2))
            .then(map("render", |x: i64| format!("#{x}")));

        assert_eq!(pipeline.process(21).unwrap(), Some("#42".to_string()));
        assert_eq!(pipeline.stage_names(), &["double".to_string(), "render".to_string()]);
    }

    #[test]
    fn test_filter_short_circuits_later_stages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = ProcessingPipeline::new()
            .then(recording("first", seen.clone()))
            .then(filter("odd-only", |x: &i64| x % 2 == 1))
            .then(recording("last", seen.clone()));

        assert_eq!(pipeline.process(2).unwrap(), None);
        assert_eq!(pipeline.process(3).unwrap(), Some(3));
        assert_eq!(*seen.lock(), vec!["first:2", "first:3", "last:3"]);
    }

    #[test]
    fn test_stage_error_is_attributed() {
        let pipeline = ProcessingPipeline::new()
            .then(map("inc", |x: i64| x + 1))
            .then(FnProcessor::new("explode", |_x: i64| -> ProcessResult<i64> {
                Err(ProcessError::new("cannot handle"))
            }));

        let err = pipeline.process(1).unwrap_err();
        assert_eq!(err.stage, "explode");
    }

    #[test]
    fn test_single_stage_pipeline() {
        let pipeline = ProcessingPipeline::of(map("len", |s: String| s.len()));
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.process("four".to_string()).unwrap(), Some(4));
    }

    #[test]
    fn test_composite_processor_runs_delegates_in_order() {
        let composite = CompositeProcessor::new(
            "composite",
            vec![
                Box::new(map("plus-one", |x: i64| x + 1)) as Box<dyn ItemProcessor<i64, i64>>,
                Box::new(map("times-ten", |x: i64| x * 10)),
            ],
        );

        assert_eq!(composite.len(), 2);
        assert_eq!(composite.process(1).unwrap(), Some(20));
    }

    #[test]
    fn test_composite_processor_short_circuits() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let composite = CompositeProcessor::new(
            "composite",
            vec![
                Box::new(filter("drop-even", |x: &i64| x % 2 != 0)) as Box<dyn ItemProcessor<i64, i64>>,
                Box::new(recording("after", seen.clone())),
            ],
        );

        assert_eq!(composite.process(4).unwrap(), None);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_empty_composite_is_identity() {
        let composite: CompositeProcessor<i64> = CompositeProcessor::new("empty", Vec::new());
        assert!(composite.is_empty());
        assert_eq!(composite.process(9).unwrap(), Some(9));
    }

    #[test]
    fn test_pipeline_nests_as_processor() {
        let inner = ProcessingPipeline::new().then(map("inc", |x: i64| x + 1));
        let outer = ProcessingPipeline::new()
            .then(inner)
            .then(map("inc-again", |x: i64| x + 1));
        assert_eq!(outer.process(0).unwrap(), Some(2));
    }
}
