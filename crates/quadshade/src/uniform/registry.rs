use crate::context::GpuContext;
use crate::error::{EngineError, EngineResult};
use crate::program::ShaderProgram;

use super::value::{UniformData, UniformType, UniformValue};

/// Where a uniform's value comes from.
pub enum UniformSource<T> {
    /// Set once at registration; never touched again.
    Constant(T),
    /// Evaluated before every frame.
    Producer(Box<dyn FnMut() -> anyhow::Result<T>>),
}

impl<T> UniformSource<T> {
    /// Infallible per-frame producer.
    pub fn producer(mut f: impl FnMut() -> T + 'static) -> Self {
        Self::Producer(Box::new(move || Ok(f())))
    }

    /// Fallible per-frame producer. An `Err` aborts the frame and halts the
    /// instance's frame loop.
    pub fn try_producer(f: impl FnMut() -> anyhow::Result<T> + 'static) -> Self {
        Self::Producer(Box::new(f))
    }
}

impl<T: UniformData> From<T> for UniformSource<T> {
    fn from(value: T) -> Self {
        Self::Constant(value)
    }
}

type Producer = Box<dyn FnMut() -> anyhow::Result<UniformValue>>;

/// A per-frame uniform update.
pub struct UniformBinding {
    name: String,
    ty: UniformType,
    producer: Producer,
}

impl UniformBinding {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> UniformType {
        self.ty
    }
}

/// Ordered list of per-frame uniform updates.
///
/// Registration order is evaluation order. Registering a name twice appends a
/// second binding; both run every frame, the later one last.
#[derive(Default)]
pub struct UniformRegistry {
    bindings: Vec<UniformBinding>,
}

impl UniformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under `name`.
    ///
    /// Constants are written to the program immediately and leave no trace in
    /// the registry. Producers are appended to the per-frame list.
    pub fn register<C, T>(
        &mut self,
        ctx: &mut C,
        program: &ShaderProgram<C>,
        name: &str,
        source: UniformSource<T>,
    ) where
        C: GpuContext,
        T: UniformData,
    {
        match source {
            UniformSource::Constant(value) => {
                log::debug!("uniform `{name}` ({}) set once", T::TYPE);
                set_named(ctx, program, name, value.into_value());
            }
            UniformSource::Producer(mut f) => {
                log::debug!("uniform `{name}` ({}) registered for per-frame update", T::TYPE);
                self.bindings.push(UniformBinding {
                    name: name.to_owned(),
                    ty: T::TYPE,
                    producer: Box::new(move || f().map(T::into_value)),
                });
            }
        }
    }

    /// Runs every producer in registration order and pushes the results.
    ///
    /// Stops at the first failing producer; bindings after it are not
    /// evaluated for this frame.
    pub fn evaluate<C: GpuContext>(
        &mut self,
        ctx: &mut C,
        program: &ShaderProgram<C>,
    ) -> EngineResult<()> {
        for binding in &mut self.bindings {
            let value = (binding.producer)().map_err(|source| EngineError::Producer {
                name: binding.name.clone(),
                source,
            })?;
            debug_assert_eq!(value.ty(), binding.ty);
            set_named(ctx, program, &binding.name, value);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UniformBinding> {
        self.bindings.iter()
    }
}

/// Resolves `name` against the linked program and writes `value`.
///
/// The location is looked up on every call; it is only meaningful for the
/// program it was resolved from.
pub(crate) fn set_named<C: GpuContext>(
    ctx: &mut C,
    program: &ShaderProgram<C>,
    name: &str,
    value: UniformValue,
) {
    let location = ctx.uniform_location(program.handle(), name);
    if location.is_none() {
        log::trace!("uniform `{name}` not found in program; write ignored");
    }
    ctx.set_uniform(location.as_ref(), value);
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::program::compile_and_link;
    use crate::program::VERTEX_SOURCE;
    use crate::test_support::{RecordingContext, FRAGMENT};

    fn linked() -> (RecordingContext, ShaderProgram<RecordingContext>) {
        let mut ctx = RecordingContext::default();
        let program = compile_and_link(&mut ctx, VERTEX_SOURCE, FRAGMENT).unwrap();
        (ctx, program)
    }

    #[test]
    fn constant_is_written_once_and_not_queued() {
        let (mut ctx, program) = linked();
        let mut registry = UniformRegistry::new();

        registry.register(&mut ctx, &program, "uColor", UniformSource::Constant([1.0f32, 0.0, 0.0, 1.0]));

        assert!(registry.is_empty());
        assert_eq!(
            ctx.uniform_writes("uColor"),
            vec![UniformValue::F4([1.0, 0.0, 0.0, 1.0])]
        );

        for _ in 0..10 {
            registry.evaluate(&mut ctx, &program).unwrap();
        }
        assert_eq!(ctx.uniform_writes("uColor").len(), 1);
    }

    #[test]
    fn producers_run_in_registration_order() {
        let (mut ctx, program) = linked();
        let mut registry = UniformRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let a = Rc::clone(&log);
        registry.register(
            &mut ctx,
            &program,
            "uA",
            UniformSource::producer(move || {
                a.borrow_mut().push("A");
                1.0f32
            }),
        );
        let b = Rc::clone(&log);
        registry.register(
            &mut ctx,
            &program,
            "uB",
            UniformSource::producer(move || {
                b.borrow_mut().push("B");
                2.0f32
            }),
        );

        registry.evaluate(&mut ctx, &program).unwrap();

        assert_eq!(*log.borrow(), ["A", "B"]);
        assert_eq!(ctx.uniform_writes("uA"), vec![UniformValue::F1(1.0)]);
        assert_eq!(ctx.uniform_writes("uB"), vec![UniformValue::F1(2.0)]);
    }

    #[test]
    fn duplicate_names_append_and_both_fire() {
        let (mut ctx, program) = linked();
        let mut registry = UniformRegistry::new();

        registry.register(&mut ctx, &program, "uA", UniformSource::producer(|| 1.0f32));
        registry.register(&mut ctx, &program, "uA", UniformSource::producer(|| 2.0f32));
        registry.evaluate(&mut ctx, &program).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            ctx.uniform_writes("uA"),
            vec![UniformValue::F1(1.0), UniformValue::F1(2.0)]
        );
    }

    #[test]
    fn unknown_name_is_a_silent_no_op() {
        let (mut ctx, program) = linked();
        let mut registry = UniformRegistry::new();

        registry.register(&mut ctx, &program, "uMissing", UniformSource::Constant(3.0f32));
        registry.register(&mut ctx, &program, "uMissing", UniformSource::producer(|| [1.0f32, 2.0]));
        registry.evaluate(&mut ctx, &program).unwrap();

        assert!(ctx.uniform_writes("uMissing").is_empty());
        assert_eq!(ctx.unresolved_uniform_writes(), 2);
    }

    #[test]
    fn failing_producer_stops_evaluation() {
        let (mut ctx, program) = linked();
        let mut registry = UniformRegistry::new();

        registry.register(
            &mut ctx,
            &program,
            "uA",
            UniformSource::<f32>::try_producer(|| anyhow::bail!("no value")),
        );
        registry.register(&mut ctx, &program, "uB", UniformSource::producer(|| 1.0f32));

        let err = registry.evaluate(&mut ctx, &program).unwrap_err();

        assert!(matches!(err, EngineError::Producer { ref name, .. } if name == "uA"));
        assert!(ctx.uniform_writes("uB").is_empty());
    }

    #[test]
    fn binding_records_declared_type() {
        let (mut ctx, program) = linked();
        let mut registry = UniformRegistry::new();

        registry.register(&mut ctx, &program, "uCells", UniformSource::producer(|| [0i32; 3]));

        let binding = registry.iter().next().unwrap();
        assert_eq!(binding.name(), "uCells");
        assert_eq!(binding.ty().to_string(), "3i");
    }
}
