//! Adaptation of user handler signatures into uniform chain entries.
//!
//! Every accepted signature family is wrapped, at registration time, into a
//! monomorphized closure `Fn(&mut Context) -> Result<Option<PipeValue>>`.
//! The family is selected by trait inference over a marker type parameter,
//! so each shape gets its own code path and unsupported shapes fail to
//! compile at the registration site.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use crate::bind::{Bind, FieldSpec};
use crate::error::{Error, Result};
use crate::pipeline::{Context, ResponseParts};
use crate::server::ParsedRequest;

/// A value traveling through the pipe slot.
///
/// Blanket-implemented for everything `Any + Send + Serialize`, so a piped
/// value can be downcast by a typed consumer or rendered by the stock JSON
/// after-middleware without knowing its concrete type.
pub trait PipePayload: Any + Send {
    fn as_any(&self) -> &(dyn Any + Send);
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
    fn to_json(&self) -> Result<serde_json::Value>;
    fn payload_type(&self) -> &'static str;
}

impl<T> PipePayload for T
where
    T: Any + Send + Serialize,
{
    fn as_any(&self) -> &(dyn Any + Send) {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| Error::internal().wrap(e))
    }

    fn payload_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Boxed pipe slot contents.
pub type PipeValue = Box<dyn PipePayload>;

/// The pipe value handed to a `(ctx, Pipe)` handler.
///
/// The handler takes ownership: the slot is emptied for the call and
/// refilled only if the handler returns a new value.
pub struct Pipe(pub(crate) Option<PipeValue>);

impl Pipe {
    pub fn empty() -> Self {
        Pipe(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Downcast and take the value, consuming the pipe.
    pub fn take<T: Any>(self) -> Option<T> {
        self.0
            .and_then(|v| v.into_any().downcast::<T>().ok())
            .map(|b| *b)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|v| v.as_any().downcast_ref())
    }

    /// Render the value as JSON; an empty pipe renders `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match &self.0 {
            Some(v) => v.to_json(),
            None => Ok(serde_json::Value::Null),
        }
    }
}

/// Uniform adapted handler.
pub type HandlerFn = Arc<dyn Fn(&mut Context) -> Result<Option<PipeValue>> + Send + Sync>;

/// Error-consuming handler: `Ok(())` consumes the error, `Err(next)`
/// forwards a (possibly replaced) error to the next catcher.
pub type ErrorHandlerFn = Arc<dyn Fn(&mut Context, Error) -> Result<()> + Send + Sync>;

/// One element of a composed handler chain.
#[derive(Clone)]
pub enum Entry {
    Handler(HandlerFn),
    ErrorHandler(ErrorHandlerFn),
    /// Sentinel: the dispatcher starts the cursor after the last one,
    /// discarding every preceding "before" entry for this route.
    SkipBefore,
}

/// Introspection record kept parallel to each chain entry.
#[derive(Debug, Clone)]
pub struct HandlerMeta {
    /// Type name of the registered function or closure.
    pub name: &'static str,
    /// Source file of the registration call.
    pub file: &'static str,
    /// Line of the registration call.
    pub line: u32,
    /// Router path the entry was attached to; empty for route handlers.
    pub scope: String,
}

/// Argument descriptor surfaced to the documentation collaborator.
#[derive(Debug, Clone, Copy)]
pub struct ArgsDoc {
    pub type_name: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Per-part documentation captured at registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryDoc {
    pub args: Option<ArgsDoc>,
    pub response: Option<&'static str>,
}

/// Return shapes a handler may produce.
///
/// `()` means "no result"; `Result<R, Error>` pipes `R` forward unless `R`
/// is `()`. The unit filter compiles to a constant branch per signature.
pub trait Outcome {
    fn into_outcome(self) -> Result<Option<PipeValue>>;

    fn response_type() -> Option<&'static str> {
        None
    }
}

impl Outcome for () {
    fn into_outcome(self) -> Result<Option<PipeValue>> {
        Ok(None)
    }
}

impl<R> Outcome for Result<R, Error>
where
    R: PipePayload,
{
    fn into_outcome(self) -> Result<Option<PipeValue>> {
        match self {
            Ok(value) => {
                if TypeId::of::<R>() == TypeId::of::<()>() {
                    Ok(None)
                } else {
                    Ok(Some(Box::new(value)))
                }
            }
            Err(err) => Err(err),
        }
    }

    fn response_type() -> Option<&'static str> {
        if TypeId::of::<R>() == TypeId::of::<()>() {
            None
        } else {
            Some(std::any::type_name::<R>())
        }
    }
}

/// Wraps an error handler `(ctx, error) -> Result<()>` so it registers as a
/// distinct entry type instead of being adapted.
pub struct Catch<F>(pub F);

/// Stock error handler that swallows whatever reaches it.
pub fn ignore_err(_ctx: &mut Context, _err: Error) -> Result<()> {
    Ok(())
}

/// Sentinel marker dropping all parent "before" entries for one route.
pub struct SkipBefore;

/// Explicit route summary part, equivalent to passing a bare string.
pub struct Summary(pub String);

/// Wraps an infallible value producer `(ctx) -> R` so its return feeds the
/// pipe slot. Fallible producers return `Result<R, Error>` and need no
/// wrapper; trait coherence cannot tell a unit closure from a value closure,
/// so the infallible shape gets a named constructor instead.
pub struct Supply<F>(F);

/// Register a producer whose return value becomes the pipe value.
pub fn supply<F, R>(f: F) -> Supply<F>
where
    F: Fn(&mut Context) -> R + Send + Sync + 'static,
    R: PipePayload,
{
    Supply(f)
}

/// Inference markers distinguishing the accepted signature families.
pub mod markers {
    use std::marker::PhantomData;

    pub struct ViaContext<O>(PhantomData<O>);
    pub struct ViaBind<T, O>(PhantomData<(T, O)>);
    pub struct ViaPipe<O>(PhantomData<O>);
    pub struct ViaRaw<O>(PhantomData<O>);
    pub struct ViaSupply<R>(PhantomData<R>);
    pub struct ViaCatch;
    pub struct ViaSentinel;
    pub struct ViaSummary;
}
use markers::*;

/// One registration part: a chain entry or a route summary.
pub enum Part {
    Entry {
        entry: Entry,
        name: &'static str,
        doc: EntryDoc,
    },
    Summary(String),
}

/// Conversion of a single registration argument into a [`Part`].
///
/// The `M` marker is inferred from the argument's shape; see the module
/// docs for the accepted families.
pub trait IntoPart<M> {
    fn into_part(self) -> Part;
}

impl<F, O> IntoPart<ViaContext<O>> for F
where
    F: Fn(&mut Context) -> O + Send + Sync + 'static,
    O: Outcome + 'static,
{
    fn into_part(self) -> Part {
        Part::Entry {
            entry: Entry::Handler(Arc::new(move |ctx| self(ctx).into_outcome())),
            name: std::any::type_name::<F>(),
            doc: EntryDoc {
                args: None,
                response: O::response_type(),
            },
        }
    }
}

impl<F, T, O> IntoPart<ViaBind<T, O>> for F
where
    F: Fn(&mut Context, T) -> O + Send + Sync + 'static,
    T: Bind + 'static,
    O: Outcome + 'static,
{
    fn into_part(self) -> Part {
        Part::Entry {
            entry: Entry::Handler(Arc::new(move |ctx| {
                let args = T::bind(ctx)?;
                self(ctx, args).into_outcome()
            })),
            name: std::any::type_name::<F>(),
            doc: EntryDoc {
                args: Some(ArgsDoc {
                    type_name: std::any::type_name::<T>(),
                    fields: T::FIELDS,
                }),
                response: O::response_type(),
            },
        }
    }
}

impl<F, O> IntoPart<ViaPipe<O>> for F
where
    F: Fn(&mut Context, Pipe) -> O + Send + Sync + 'static,
    O: Outcome + 'static,
{
    fn into_part(self) -> Part {
        Part::Entry {
            entry: Entry::Handler(Arc::new(move |ctx| {
                let pipe = ctx.take_pipe();
                self(ctx, pipe).into_outcome()
            })),
            name: std::any::type_name::<F>(),
            doc: EntryDoc {
                args: None,
                response: O::response_type(),
            },
        }
    }
}

impl<F, O> IntoPart<ViaRaw<O>> for F
where
    F: Fn(&ParsedRequest, &mut ResponseParts) -> O + Send + Sync + 'static,
    O: Outcome + 'static,
{
    fn into_part(self) -> Part {
        Part::Entry {
            entry: Entry::Handler(Arc::new(move |ctx| {
                let (req, res) = ctx.req_res_mut();
                self(req, res).into_outcome()
            })),
            name: std::any::type_name::<F>(),
            doc: EntryDoc::default(),
        }
    }
}

impl<F, R> IntoPart<ViaSupply<R>> for Supply<F>
where
    F: Fn(&mut Context) -> R + Send + Sync + 'static,
    R: PipePayload,
{
    fn into_part(self) -> Part {
        let f = self.0;
        Part::Entry {
            entry: Entry::Handler(Arc::new(move |ctx| Ok(Some(Box::new(f(ctx)) as PipeValue)))),
            name: std::any::type_name::<F>(),
            doc: EntryDoc {
                args: None,
                response: Some(std::any::type_name::<R>()),
            },
        }
    }
}

impl<F> IntoPart<ViaCatch> for Catch<F>
where
    F: Fn(&mut Context, Error) -> Result<()> + Send + Sync + 'static,
{
    fn into_part(self) -> Part {
        let f = self.0;
        Part::Entry {
            entry: Entry::ErrorHandler(Arc::new(move |ctx, err| f(ctx, err))),
            name: std::any::type_name::<F>(),
            doc: EntryDoc::default(),
        }
    }
}

impl IntoPart<ViaSentinel> for SkipBefore {
    fn into_part(self) -> Part {
        Part::Entry {
            entry: Entry::SkipBefore,
            name: "SkipBefore",
            doc: EntryDoc::default(),
        }
    }
}

impl IntoPart<ViaSummary> for &'static str {
    fn into_part(self) -> Part {
        Part::Summary(self.to_string())
    }
}

impl IntoPart<ViaSummary> for String {
    fn into_part(self) -> Part {
        Part::Summary(self)
    }
}

impl IntoPart<ViaSummary> for Summary {
    fn into_part(self) -> Part {
        Part::Summary(self.0)
    }
}

/// Product of converting a registration argument list.
#[derive(Default)]
pub struct Chain {
    pub(crate) entries: Vec<Entry>,
    pub(crate) names: Vec<&'static str>,
    pub(crate) summary: Option<String>,
    pub(crate) args: Option<ArgsDoc>,
    pub(crate) response: Option<&'static str>,
}

impl Chain {
    fn push(&mut self, part: Part) {
        match part {
            Part::Entry { entry, name, doc } => {
                self.entries.push(entry);
                self.names.push(name);
                if self.args.is_none() {
                    self.args = doc.args;
                }
                if self.response.is_none() {
                    self.response = doc.response;
                }
            }
            Part::Summary(text) => self.summary = Some(text),
        }
    }
}

/// Conversion of a full registration argument — one part or a tuple of
/// parts — into a [`Chain`].
pub trait IntoChain<M> {
    fn into_chain(self) -> Chain;
}

impl<T, M> IntoChain<PhantomData<M>> for T
where
    T: IntoPart<M>,
{
    fn into_chain(self) -> Chain {
        let mut chain = Chain::default();
        chain.push(self.into_part());
        chain
    }
}

macro_rules! impl_into_chain_tuple {
    ($(($part:ident, $marker:ident)),+) => {
        impl<$($part, $marker),+> IntoChain<($($marker,)+)> for ($($part,)+)
        where
            $($part: IntoPart<$marker>),+
        {
            fn into_chain(self) -> Chain {
                #[allow(non_snake_case)]
                let ($($part,)+) = self;
                let mut chain = Chain::default();
                $(chain.push($part.into_part());)+
                chain
            }
        }
    };
}

impl_into_chain_tuple!((P1, M1));
impl_into_chain_tuple!((P1, M1), (P2, M2));
impl_into_chain_tuple!((P1, M1), (P2, M2), (P3, M3));
impl_into_chain_tuple!((P1, M1), (P2, M2), (P3, M3), (P4, M4));
impl_into_chain_tuple!((P1, M1), (P2, M2), (P3, M3), (P4, M4), (P5, M5));
impl_into_chain_tuple!((P1, M1), (P2, M2), (P3, M3), (P4, M4), (P5, M5), (P6, M6));
impl_into_chain_tuple!(
    (P1, M1),
    (P2, M2),
    (P3, M3),
    (P4, M4),
    (P5, M5),
    (P6, M6),
    (P7, M7)
);
impl_into_chain_tuple!(
    (P1, M1),
    (P2, M2),
    (P3, M3),
    (P4, M4),
    (P5, M5),
    (P6, M6),
    (P7, M7),
    (P8, M8)
);
