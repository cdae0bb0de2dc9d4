//! HandlerDescriptor - handler 型の識別子と capability table
//!
//! A descriptor names a concrete handler type without holding an instance.
//! Flows store descriptors and ask their resolver for a fresh instance on
//! every `execute`.
//!
//! # Capability check
//! Rust cannot ask "does this `TypeId` implement that trait" at runtime, so a
//! handler type declares the capabilities it implements up front through
//! [`HandlerType::declare`]. Each declaration is bounded by the trait itself
//! (`H: Capability<T>`), so a type can only declare what it really
//! implements. Registration then only looks the capability up in the table.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Upcast from a concrete handler into a handler trait object.
///
/// Implemented once per handler trait object (`dyn Middleware<P>`,
/// `dyn ChainMiddleware<P, R>`, ...), for every `T` implementing that trait.
pub trait Capability<T>: 'static {
    fn upcast(handler: Box<T>) -> Box<Self>;
}

/// A handler type that can be registered by descriptor.
///
/// # 使用例
/// ```ignore
/// #[derive(Default)]
/// struct InvalidateDataHandler;
///
/// impl ChainMiddleware<Fault, bool> for InvalidateDataHandler { /* ... */ }
///
/// impl HandlerType for InvalidateDataHandler {
///     fn declare(capabilities: &mut Capabilities<Self>) {
///         capabilities.implements::<dyn ChainMiddleware<Fault, bool>>();
///     }
/// }
///
/// let chain = ResponsibilityChain::<Fault, bool>::default()
///     .chain_type(HandlerDescriptor::of::<InvalidateDataHandler>())?;
/// ```
pub trait HandlerType: Any + Send + Sized {
    fn declare(capabilities: &mut Capabilities<Self>);
}

type CapabilityTable = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Builder for the capability table of one handler type.
pub struct Capabilities<T> {
    table: CapabilityTable,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send> Capabilities<T> {
    fn new() -> Self {
        Self {
            table: HashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Declare that `T` implements the handler trait object `H`.
    pub fn implements<H: ?Sized + Capability<T>>(&mut self) -> &mut Self {
        self.table
            .insert(TypeId::of::<H>(), Arc::new(Caster::<H>::of::<T>()));
        self
    }
}

/// Turns a resolved instance back into the handler trait object `H`.
pub(crate) struct Caster<H: ?Sized> {
    cast: fn(Box<dyn Any + Send>) -> Option<Box<H>>,
}

impl<H: ?Sized> Clone for Caster<H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: ?Sized> Copy for Caster<H> {}

impl<H: ?Sized + 'static> Caster<H> {
    pub(crate) fn of<T: Any + Send>() -> Self
    where
        H: Capability<T>,
    {
        Self {
            cast: downcast_into::<T, H>,
        }
    }

    pub(crate) fn cast(&self, instance: Box<dyn Any + Send>) -> Option<Box<H>> {
        (self.cast)(instance)
    }
}

fn downcast_into<T: Any + Send, H: ?Sized + Capability<T>>(
    instance: Box<dyn Any + Send>,
) -> Option<Box<H>> {
    instance.downcast::<T>().ok().map(<H as Capability<T>>::upcast)
}

fn construct_default<T: Default + Any + Send>() -> Box<dyn Any + Send> {
    Box::new(T::default())
}

/// Opaque identifier of a concrete handler type.
#[derive(Clone)]
pub struct HandlerDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    constructor: Option<fn() -> Box<dyn Any + Send>>,
    capabilities: Arc<CapabilityTable>,
}

impl HandlerDescriptor {
    /// Descriptor for a handler type with a parameterless constructor.
    pub fn of<T: HandlerType + Default>() -> Self {
        let mut descriptor = Self::without_constructor::<T>();
        descriptor.constructor = Some(construct_default::<T>);
        descriptor
    }

    /// Descriptor for a handler type that only a custom resolver can build.
    pub fn without_constructor<T: HandlerType>() -> Self {
        let mut capabilities = Capabilities::<T>::new();
        T::declare(&mut capabilities);
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructor: None,
            capabilities: Arc::new(capabilities.table),
        }
    }

    /// Descriptor for an arbitrary type. It declares no capabilities, so
    /// every flow rejects it.
    pub fn plain<T: Any + Send>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructor: None,
            capabilities: Arc::default(),
        }
    }

    /// Descriptor used by the statically typed `add::<M>()` / `chain::<M>()`
    /// forms. The bound proves `H`, so `H` goes into the table and the
    /// descriptor can be registered again on another flow of the same kind.
    pub(crate) fn activatable<T, H>() -> Self
    where
        T: Default + Any + Send,
        H: ?Sized + Capability<T>,
    {
        let mut capabilities = Capabilities::<T>::new();
        capabilities.implements::<H>();
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructor: Some(construct_default::<T>),
            capabilities: Arc::new(capabilities.table),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_activatable(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Run the parameterless constructor, if the type has one.
    pub fn construct(&self) -> Option<Box<dyn Any + Send>> {
        self.constructor.map(|construct| construct())
    }

    pub(crate) fn caster<H: ?Sized + 'static>(&self) -> Option<Caster<H>> {
        self.capabilities
            .get(&TypeId::of::<H>())
            .and_then(|caster| caster.downcast_ref::<Caster<H>>())
            .copied()
    }
}

impl PartialEq for HandlerDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for HandlerDescriptor {}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("type_name", &self.type_name)
            .field("activatable", &self.is_activatable())
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}
