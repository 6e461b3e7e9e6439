use crate::error::ServiceRequestException;
use crate::session::Session;
use beam_buffer::{Buffer, SharedBuffer};
use beam_serialize::{BufferReceiver, BufferSender, ReceiveError, Sender, Shuttle, TypeRegistry};
use hashbrown::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Shared handle to the endpoint a slot handler runs on, passed so
/// handlers can call back into it (e.g. to read the session, or to
/// `send` a push message while servicing a request).
pub type ClientHandle = Arc<crate::client::ServiceProtocolClient>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request/response service pair, identified on the wire by a single
/// UID (`"Beam.<Subsystem>.<Service>"`, §6). The response is correlated
/// by `request_id`, not by a second tag, so one UID per service is
/// sufficient — the source's separate `.Request`/`.Response` names are
/// simply this UID's two wire message shapes.
pub trait Service: Send + Sync + 'static {
    const UID: &'static str;
    type Args: Shuttle + Send + 'static;
    type Return: Shuttle + Send + 'static;
}

/// A one-way push message (`Services/RecordMessage.hpp`).
pub trait RecordMessageType: Send + Sync + 'static {
    const UID: &'static str;
    type Body: Shuttle + Send + 'static;
}

/// Completion handle for an `add_request_slot` handler that answers
/// asynchronously (`Services/RequestToken.hpp`). The handler may call
/// `set_result`/`set_exception` from another task; the dispatch future
/// installed at registration time simply awaits it.
pub struct RequestToken<R> {
    sender: oneshot::Sender<Result<Vec<u8>, ServiceRequestException>>,
    _marker: PhantomData<R>,
}

impl<R: Shuttle> RequestToken<R> {
    pub fn set_result(self, value: R) {
        let _ = self.sender.send(Ok(encode_value(&value)));
    }

    pub fn set_exception(self, exception: ServiceRequestException) {
        let _ = self.sender.send(Err(exception));
    }
}

fn encode_value<T: Shuttle>(value: &T) -> Vec<u8> {
    let mut buffer = SharedBuffer::new();
    {
        let mut sender = BufferSender::new(&mut buffer);
        value.send(&mut sender, 0);
    }
    buffer.data().to_vec()
}

/// Runs before a slot's handler; a throwing pre-hook aborts dispatch
/// (§4.7). Used by the authentication adapter to gate every inner
/// request slot on `session.is_logged_in()`.
pub type PreHook = Arc<dyn Fn(&Session) -> Result<(), ServiceRequestException> + Send + Sync>;

type RequestBody =
    Arc<dyn Fn(ClientHandle, Vec<u8>) -> Result<BoxFuture<'static, Result<Vec<u8>, ServiceRequestException>>, ReceiveError> + Send + Sync>;
type MessageBody = Arc<dyn Fn(ClientHandle, Vec<u8>) -> Result<(), ReceiveError> + Send + Sync>;

enum SlotBody {
    Request(RequestBody),
    Message(MessageBody),
}

struct SlotEntry {
    uid: String,
    pre_hooks: Vec<PreHook>,
    body: SlotBody,
}

/// Per-endpoint table binding wire type tags to local handlers
/// (`Services/ServiceSlots.hpp`), plus the `TypeRegistry` that assigns
/// those tags. Both a client and a servlet endpoint own one; a client
/// that never handles incoming requests still uses it to register the
/// UIDs of the services it *calls*, so its tag assignment matches the
/// server's as long as both register in the same order (see
/// `locator::wire`/`registry::wire` for the shared registration order
/// this crate's reference services rely on).
#[derive(Default)]
pub struct ServiceSlots {
    registry: TypeRegistry,
    slots: HashMap<u32, SlotEntry>,
}

impl ServiceSlots {
    pub fn new() -> Self {
        ServiceSlots { registry: TypeRegistry::new(), slots: HashMap::new() }
    }

    /// Registers `S`'s UID without installing a handler — what a client
    /// does for every service it intends to call with `send_request`.
    pub fn register_service<S: Service>(&mut self) -> u32 {
        self.registry.register(S::UID)
    }

    /// Registers `M`'s UID without installing a handler — what a client
    /// does for one-way messages it only ever sends.
    pub fn register_message<M: RecordMessageType>(&mut self) -> u32 {
        self.registry.register(M::UID)
    }

    pub fn tag_for_uid(&self, uid: &str) -> Option<u32> {
        self.registry.tag_for(uid)
    }

    pub fn uid_for_tag(&self, tag: u32) -> Option<&str> {
        self.registry.uid_for(tag)
    }

    /// Synchronous convenience slot (`ServiceSlots::AddRequestSlot` +
    /// the auto-respond wrapper the original applies on top): `handler`
    /// returns the response (or throws) immediately, and the dispatch
    /// loop sends it without further coordination.
    pub fn add_slot<S, F>(&mut self, handler: F)
    where
        S: Service,
        F: Fn(ClientHandle, S::Args) -> Result<S::Return, ServiceRequestException> + Send + Sync + 'static,
    {
        let tag = self.register_service::<S>();
        let handler = Arc::new(handler);
        let body: RequestBody = Arc::new(move |client, bytes| {
            let mut receiver = BufferReceiver::new(&bytes);
            let args = S::Args::receive(&mut receiver, 0)?;
            let handler = handler.clone();
            let fut: BoxFuture<'static, Result<Vec<u8>, ServiceRequestException>> =
                Box::pin(async move { handler(client, args).map(|value| encode_value(&value)) });
            Ok(fut)
        });
        self.slots.insert(tag, SlotEntry { uid: S::UID.to_string(), pre_hooks: Vec::new(), body: SlotBody::Request(body) });
    }

    /// Asynchronous-completion slot: `handler` is called synchronously
    /// with a `RequestToken` it may complete later (from another task),
    /// modelling `Services/RequestToken.hpp`'s deferred-reply idiom.
    pub fn add_request_slot<S, F>(&mut self, handler: F)
    where
        S: Service,
        F: Fn(ClientHandle, RequestToken<S::Return>, S::Args) + Send + Sync + 'static,
    {
        let tag = self.register_service::<S>();
        let handler = Arc::new(handler);
        let body: RequestBody = Arc::new(move |client, bytes| {
            let mut receiver = BufferReceiver::new(&bytes);
            let args = S::Args::receive(&mut receiver, 0)?;
            let handler = handler.clone();
            let (sender, receiver_done) = oneshot::channel();
            let token = RequestToken::<S::Return> { sender, _marker: PhantomData };
            handler(client, token, args);
            let fut: BoxFuture<'static, Result<Vec<u8>, ServiceRequestException>> = Box::pin(async move {
                match receiver_done.await {
                    Ok(result) => result,
                    Err(_) => Err(ServiceRequestException::new("request handler dropped its token")),
                }
            });
            Ok(fut)
        });
        self.slots.insert(tag, SlotEntry { uid: S::UID.to_string(), pre_hooks: Vec::new(), body: SlotBody::Request(body) });
    }

    /// One-way message slot (`Services/ServiceSlots.hpp::AddMessageSlot`).
    pub fn add_message_slot<M, F>(&mut self, handler: F)
    where
        M: RecordMessageType,
        F: Fn(ClientHandle, M::Body) + Send + Sync + 'static,
    {
        let tag = self.register_message::<M>();
        let handler = Arc::new(handler);
        let body: MessageBody = Arc::new(move |client, bytes| {
            let mut receiver = BufferReceiver::new(&bytes);
            let value = M::Body::receive(&mut receiver, 0)?;
            handler(client, value);
            Ok(())
        });
        self.slots.insert(tag, SlotEntry { uid: M::UID.to_string(), pre_hooks: Vec::new(), body: SlotBody::Message(body) });
    }

    /// Installs `hook` on every request slot currently registered — how
    /// the authentication adapter gates an inner servlet's services on
    /// `session.is_logged_in()` without the inner servlet knowing about
    /// authentication at all.
    pub fn add_pre_hook_to_all_request_slots(&mut self, hook: PreHook) {
        for entry in self.slots.values_mut() {
            if matches!(entry.body, SlotBody::Request(_)) {
                entry.pre_hooks.push(hook.clone());
            }
        }
    }

    /// Merges `other`'s slots into `self`, re-registering each UID in
    /// `other`'s own tag order so the combined table's tags stay
    /// self-consistent even if `self` and `other` built their registries
    /// independently (`Services/ServiceSlots.hpp::Add`). Iterating
    /// `other.slots` (a `HashMap`) directly would re-register UIDs in
    /// arbitrary bucket order instead, which a peer that registers the
    /// same services via a fixed-order helper (e.g. a generated
    /// `register_wire_types`) would not agree with.
    pub fn add(&mut self, mut other: ServiceSlots) {
        let uids: Vec<String> = other.registry.uids_in_order().map(str::to_string).collect();
        for uid in uids {
            let old_tag = other.registry.tag_for(&uid).expect("uid came from other's own registry");
            let new_tag = self.registry.register(&uid);
            if let Some(entry) = other.slots.remove(&old_tag) {
                self.slots.insert(new_tag, entry);
            }
        }
    }

    pub(crate) fn dispatch_request(
        &self,
        client: ClientHandle,
        session: &Session,
        tag: u32,
        body: Vec<u8>,
    ) -> Result<BoxFuture<'static, Result<Vec<u8>, ServiceRequestException>>, ReceiveError> {
        let entry = self.slots.get(&tag).ok_or(ReceiveError::UnknownType(tag))?;
        for hook in &entry.pre_hooks {
            if let Err(e) = hook(session) {
                return Ok(Box::pin(async move { Err(e) }));
            }
        }
        match &entry.body {
            SlotBody::Request(f) => f(client, body),
            SlotBody::Message(_) => Err(ReceiveError::Malformed(format!("tag {} is a message slot, not a request slot", tag))),
        }
    }

    pub(crate) fn dispatch_message(
        &self,
        client: ClientHandle,
        session: &Session,
        tag: u32,
        body: Vec<u8>,
    ) -> Result<(), ReceiveError> {
        let entry = self.slots.get(&tag).ok_or(ReceiveError::UnknownType(tag))?;
        for hook in &entry.pre_hooks {
            if hook(session).is_err() {
                // Pre-hook failures on one-way messages are swallowed
                // (§4.7): there is no response to carry the exception.
                return Ok(());
            }
        }
        match &entry.body {
            SlotBody::Message(f) => f(client, body),
            SlotBody::Request(_) => Err(ReceiveError::Malformed(format!("tag {} is a request slot, not a message slot", tag))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    impl Service for Echo {
        const UID: &'static str = "Test.Echo";
        type Args = String;
        type Return = String;
    }

    #[test]
    fn register_service_is_idempotent_across_construction_order() {
        let mut client_side = ServiceSlots::new();
        let mut server_side = ServiceSlots::new();
        let client_tag = client_side.register_service::<Echo>();
        server_side.add_slot::<Echo, _>(|_client, args| Ok(args));
        assert_eq!(client_tag, server_side.tag_for_uid(Echo::UID).unwrap());
    }

    #[test]
    fn merge_preserves_pre_hooks_and_reassigns_tags() {
        let mut inner = ServiceSlots::new();
        inner.add_slot::<Echo, _>(|_client, args| Ok(args));
        inner.add_pre_hook_to_all_request_slots(Arc::new(|session: &Session| {
            if session.is_logged_in() {
                Ok(())
            } else {
                Err(ServiceRequestException::new("Not logged in."))
            }
        }));

        let mut outer = ServiceSlots::new();
        outer.register_message::<crate::tests_support::Ping>();
        outer.add(inner);

        let tag = outer.tag_for_uid(Echo::UID).unwrap();
        assert!(outer.slots.get(&tag).unwrap().pre_hooks.len() == 1);
    }
}

#[cfg(test)]
mod tests_support {
    use super::RecordMessageType;

    pub struct Ping;
    impl RecordMessageType for Ping {
        const UID: &'static str = "Test.Ping";
        type Body = bool;
    }
}
