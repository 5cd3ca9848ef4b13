use crate::error::QueueError;
use crate::queue::deferred::Completer;
use crate::storage::BlobMapper;

/// Requests that only read driver state.
pub(crate) enum ReadRequest<T> {
    Peek {
        reply: Completer<Option<T>>,
    },
    PeekList {
        limit: Option<usize>,
        reply: Completer<Vec<T>>,
    },
    Size {
        reply: Completer<usize>,
    },
}

/// Requests that may change driver state.
///
/// `Push` carries the already encoded value.
pub(crate) enum WriteRequest<T> {
    Push {
        blob: Vec<u8>,
        reply: Completer<bool>,
    },
    Poll {
        reply: Completer<Option<T>>,
    },
    Remove {
        limit: Option<usize>,
        reply: Completer<usize>,
    },
    RemoveHead {
        reply: Completer<bool>,
    },
    Mutate {
        mapper: Box<BlobMapper>,
        reply: Completer<usize>,
    },
}

impl<T> ReadRequest<T> {
    pub(crate) fn op(&self) -> &'static str {
        match self {
            ReadRequest::Peek { .. } => "peek",
            ReadRequest::PeekList { .. } => "peek_list",
            ReadRequest::Size { .. } => "size",
        }
    }

    pub(crate) fn fail(self, err: QueueError) {
        match self {
            ReadRequest::Peek { reply } => reply.complete(Err(err)),
            ReadRequest::PeekList { reply, .. } => reply.complete(Err(err)),
            ReadRequest::Size { reply } => reply.complete(Err(err)),
        }
    }
}

impl<T> WriteRequest<T> {
    pub(crate) fn op(&self) -> &'static str {
        match self {
            WriteRequest::Push { .. } => "push",
            WriteRequest::Poll { .. } => "poll",
            WriteRequest::Remove { .. } => "remove",
            WriteRequest::RemoveHead { .. } => "remove_head",
            WriteRequest::Mutate { .. } => "mutate",
        }
    }

    pub(crate) fn fail(self, err: QueueError) {
        match self {
            WriteRequest::Push { reply, .. } => reply.complete(Err(err)),
            WriteRequest::Poll { reply } => reply.complete(Err(err)),
            WriteRequest::Remove { reply, .. } => reply.complete(Err(err)),
            WriteRequest::RemoveHead { reply } => reply.complete(Err(err)),
            WriteRequest::Mutate { reply, .. } => reply.complete(Err(err)),
        }
    }
}
