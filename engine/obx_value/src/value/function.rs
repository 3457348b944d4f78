//! Host-provided callables: free functions and constructors.
//!
//! Both wrap a shared native closure. Identity (`same`) is the closure
//! allocation, which is what the structural comparer folds into cache keys:
//! two `Function`s with the same name but different bodies never share an
//! observation.

use std::fmt;
use std::sync::Arc;

use super::{QualifiedName, Value};
use crate::errors::{wrong_arg_count, EvalResult};

/// Native callable signature.
pub type NativeFn = dyn Fn(&[Value]) -> EvalResult + Send + Sync;

/// A named host function (static method, static getter, user operator,
/// conversion function, or first-class function value).
#[derive(Clone)]
pub struct Function {
    name: QualifiedName,
    arity: Option<usize>,
    body: Arc<NativeFn>,
}

impl Function {
    /// A function taking exactly `arity` arguments.
    pub fn new<F>(name: impl Into<QualifiedName>, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> EvalResult + Send + Sync + 'static,
    {
        Function {
            name: name.into(),
            arity: Some(arity),
            body: Arc::new(body),
        }
    }

    /// A function accepting any number of arguments.
    pub fn variadic<F>(name: impl Into<QualifiedName>, body: F) -> Self
    where
        F: Fn(&[Value]) -> EvalResult + Send + Sync + 'static,
    {
        Function {
            name: name.into(),
            arity: None,
            body: Arc::new(body),
        }
    }

    #[inline]
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    #[inline]
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Invoke with arity checking.
    pub fn invoke(&self, args: &[Value]) -> EvalResult {
        if let Some(expected) = self.arity {
            if args.len() != expected {
                return Err(wrong_arg_count(
                    &self.name.to_string(),
                    expected,
                    args.len(),
                ));
            }
        }
        (self.body)(args)
    }

    /// Identity comparison on the shared body.
    #[inline]
    pub fn same(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.body), Arc::as_ptr(&other.body))
    }

    /// Address of the shared body, used for identity hashing.
    #[inline]
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.body).cast::<()>() as usize
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// A host constructor for the `new` expression kinds.
#[derive(Clone)]
pub struct Constructor {
    ty: QualifiedName,
    arity: Option<usize>,
    body: Arc<NativeFn>,
}

impl Constructor {
    pub fn new<F>(ty: impl Into<QualifiedName>, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> EvalResult + Send + Sync + 'static,
    {
        Constructor {
            ty: ty.into(),
            arity: Some(arity),
            body: Arc::new(body),
        }
    }

    /// The type this constructor produces.
    #[inline]
    pub fn ty(&self) -> &QualifiedName {
        &self.ty
    }

    pub fn construct(&self, args: &[Value]) -> EvalResult {
        if let Some(expected) = self.arity {
            if args.len() != expected {
                return Err(wrong_arg_count(&self.ty.to_string(), expected, args.len()));
            }
        }
        (self.body)(args)
    }

    #[inline]
    pub fn same(&self, other: &Constructor) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.body), Arc::as_ptr(&other.body))
    }

    #[inline]
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.body).cast::<()>() as usize
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<constructor {}>", self.ty)
    }
}
