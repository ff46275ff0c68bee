//! Message-type to handler registry.

use crate::message::{Message, MessageType, Payload};
use crate::ClientId;
use log::{trace, warn};
use std::collections::HashMap;

type Handler<S> = Box<dyn Fn(&mut S, ClientId, Message) + Send + Sync>;

/// Static table of typed handlers over some state `S`.
///
/// Built once at startup with [`register`](Self::register); afterwards
/// [`dispatch`](Self::dispatch) routes each decoded message to the handler
/// bound to its type. Types with no handler are ignored.
pub struct Dispatcher<S> {
    handlers: HashMap<MessageType, Handler<S>>,
}

impl<S> Dispatcher<S> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Bind `handler` to payload type `P`, replacing any earlier binding.
    pub fn register<P, F>(mut self, handler: F) -> Self
    where
        P: Payload + 'static,
        F: Fn(&mut S, ClientId, P) + Send + Sync + 'static,
    {
        let erased: Handler<S> = Box::new(move |state, from, message| {
            if let Some(payload) = P::from_message(message) {
                handler(state, from, payload);
            }
        });

        if self.handlers.insert(P::TYPE, erased).is_some() {
            warn!("Replaced existing handler for {:?}", P::TYPE);
        }
        self
    }

    pub fn is_registered(&self, message_type: MessageType) -> bool {
        self.handlers.contains_key(&message_type)
    }

    /// Run the handler for `message`. Returns false if none is registered.
    pub fn dispatch(&self, state: &mut S, from: ClientId, message: Message) -> bool {
        let message_type = message.message_type();
        match self.handlers.get(&message_type) {
            Some(handler) => {
                handler(state, from, message);
                true
            }
            None => {
                trace!("No handler for {:?} from {}", message_type, from);
                false
            }
        }
    }
}

impl<S> Default for Dispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}
