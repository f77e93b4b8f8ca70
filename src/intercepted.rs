use crate::errors::SlashingError;
use crate::types::{Hash32, HeaderInfo, ShardHeader};
use std::any::Any;
use std::sync::Arc;

/// Data plucked off the wire by an interceptor, before being routed to a
/// subsystem processor. The hash is computed once at interception time.
pub trait InterceptedData: Send + Sync {
    fn hash(&self) -> &Hash32;
    fn as_any(&self) -> &dyn Any;
}

/// An intercepted shard block header plus its canonical hash.
///
/// The payload is optional: an envelope whose header failed to decode still
/// carries the hash it was announced under.
#[derive(Clone, Debug)]
pub struct InterceptedHeaderInfo {
    header: Option<Arc<ShardHeader>>,
    hash: Hash32,
}

impl InterceptedHeaderInfo {
    pub fn new(header: ShardHeader, hash: Hash32) -> Self {
        Self { header: Some(Arc::new(header)), hash }
    }

    /// Envelope with no decoded header payload.
    pub fn empty(hash: Hash32) -> Self {
        Self { header: None, hash }
    }

    pub fn header(&self) -> Option<&Arc<ShardHeader>> {
        self.header.as_ref()
    }
}

impl InterceptedData for InterceptedHeaderInfo {
    fn hash(&self) -> &Hash32 {
        &self.hash
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Narrows generic intercepted data down to a header envelope.
pub(crate) fn to_header_info(data: &dyn InterceptedData) -> Result<HeaderInfo, SlashingError> {
    let intercepted = data
        .as_any()
        .downcast_ref::<InterceptedHeaderInfo>()
        .ok_or(SlashingError::CannotCastInterceptedDataToHeader)?;
    let header = intercepted
        .header
        .clone()
        .ok_or(SlashingError::NilHeaderHandler)?;
    Ok(HeaderInfo { header, hash: intercepted.hash.clone() })
}
