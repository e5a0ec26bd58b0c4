//! Per-fetch result containers.
//!
//! A [`LoaderReturn`] carries one tile's fetched payload(s) and the
//! renderable objects the interpreter built from them. The loader creates
//! exactly one per completed fetch through its return factory, hands it to
//! the interpreter once, and drops it. Loader variants that need to carry
//! extra state override the factory with their own implementation of the
//! trait; [`ObjectLoaderReturn`] is the default.

use std::sync::Arc;

use bytes::Bytes;

use crate::coord::TileIdent;
use crate::fetcher::FetchError;
use crate::interp::RenderObject;

/// Result container for one tile load.
///
/// The base contract every loader-return variant honors: the tile identity,
/// zero or more fetched payloads (zero in no-fetcher mode and on failure),
/// an optional fetch error, and the render objects the interpreter adds.
pub trait LoaderReturn: Send {
    /// The tile this result belongs to.
    fn ident(&self) -> TileIdent;

    /// Appends a fetched payload. Called once per completed source fetch.
    fn add_payload(&mut self, data: Bytes);

    /// The fetched payloads, in completion order.
    fn payloads(&self) -> &[Bytes];

    /// Records a fetch failure. The payload for the failed source is absent.
    fn set_error(&mut self, error: FetchError);

    /// The recorded fetch failure, if any.
    fn error(&self) -> Option<&FetchError>;

    /// Adds a render object produced by the interpreter.
    fn add_object(&mut self, object: RenderObject);

    /// The render objects accumulated so far.
    fn objects(&self) -> &[RenderObject];
}

/// Default loader-return implementation for plain object geometry.
#[derive(Debug)]
pub struct ObjectLoaderReturn {
    ident: TileIdent,
    payloads: Vec<Bytes>,
    error: Option<FetchError>,
    objects: Vec<RenderObject>,
}

impl ObjectLoaderReturn {
    /// Creates an empty return for one tile.
    pub fn new(ident: TileIdent) -> Self {
        Self {
            ident,
            payloads: Vec::new(),
            error: None,
            objects: Vec::new(),
        }
    }
}

impl LoaderReturn for ObjectLoaderReturn {
    fn ident(&self) -> TileIdent {
        self.ident
    }

    fn add_payload(&mut self, data: Bytes) {
        self.payloads.push(data);
    }

    fn payloads(&self) -> &[Bytes] {
        &self.payloads
    }

    fn set_error(&mut self, error: FetchError) {
        self.error = Some(error);
    }

    fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    fn add_object(&mut self, object: RenderObject) {
        self.objects.push(object);
    }

    fn objects(&self) -> &[RenderObject] {
        &self.objects
    }
}

/// Factory producing one fresh [`LoaderReturn`] per tile fetch.
///
/// Loader variants override this to vary the concrete return type; the
/// default builds [`ObjectLoaderReturn`].
pub type ReturnFactory = Arc<dyn Fn(TileIdent) -> Box<dyn LoaderReturn> + Send + Sync>;

/// The default return factory.
pub(crate) fn default_return_factory() -> ReturnFactory {
    Arc::new(|ident| Box::new(ObjectLoaderReturn::new(ident)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident() -> TileIdent {
        TileIdent::new(6, 33, 21).unwrap()
    }

    #[test]
    fn test_empty_return() {
        let ret = ObjectLoaderReturn::new(ident());
        assert_eq!(ret.ident(), ident());
        assert!(ret.payloads().is_empty());
        assert!(ret.error().is_none());
        assert!(ret.objects().is_empty());
    }

    #[test]
    fn test_payloads_accumulate_in_order() {
        let mut ret = ObjectLoaderReturn::new(ident());
        ret.add_payload(Bytes::from_static(b"first"));
        ret.add_payload(Bytes::from_static(b"second"));
        assert_eq!(ret.payloads().len(), 2);
        assert_eq!(ret.payloads()[0].as_ref(), b"first");
        assert_eq!(ret.payloads()[1].as_ref(), b"second");
    }

    #[test]
    fn test_error_recorded() {
        let mut ret = ObjectLoaderReturn::new(ident());
        ret.set_error(FetchError::Cancelled);
        assert!(matches!(ret.error(), Some(FetchError::Cancelled)));
    }

    #[test]
    fn test_objects_accumulate() {
        let mut ret = ObjectLoaderReturn::new(ident());
        ret.add_object(RenderObject::new(ident()));
        ret.add_object(RenderObject::new(ident()));
        assert_eq!(ret.objects().len(), 2);
    }

    #[test]
    fn test_default_factory_builds_object_returns() {
        let factory = default_return_factory();
        let ret = factory(ident());
        assert_eq!(ret.ident(), ident());
        assert!(ret.payloads().is_empty());
    }
}
