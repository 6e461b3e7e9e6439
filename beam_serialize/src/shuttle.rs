use crate::error::ReceiveResult;
use crate::receiver::{BufferReceiver, Receiver};
use crate::sender::{BufferSender, Sender};
use beam_buffer::SharedBuffer;
use hashbrown::HashMap;

/// A value that can be carried across the wire. `version` lets a type
/// change its own wire layout over time while still being shuttled
/// through the same call site (`Serialization/Shuttle.hpp`'s `Shuttle`
/// free function, unified here into a trait since Rust has no
/// `void Shuttle(Shuttler&, T&, unsigned int)` overload set to hang this
/// off of).
pub trait Shuttle: Sized {
    fn send<S: Sender>(&self, sender: &mut S, version: u32);
    fn receive<R: Receiver>(receiver: &mut R, version: u32) -> ReceiveResult<Self>;
}

macro_rules! shuttle_primitive {
    ($ty:ty, $send:ident, $receive:ident) => {
        impl Shuttle for $ty {
            fn send<S: Sender>(&self, sender: &mut S, _version: u32) {
                sender.$send(*self);
            }

            fn receive<R: Receiver>(receiver: &mut R, _version: u32) -> ReceiveResult<Self> {
                receiver.$receive()
            }
        }
    };
}

shuttle_primitive!(bool, send_bool, receive_bool);
shuttle_primitive!(i8, send_i8, receive_i8);
shuttle_primitive!(u8, send_u8, receive_u8);
shuttle_primitive!(i16, send_i16, receive_i16);
shuttle_primitive!(u16, send_u16, receive_u16);
shuttle_primitive!(i32, send_i32, receive_i32);
shuttle_primitive!(u32, send_u32, receive_u32);
shuttle_primitive!(i64, send_i64, receive_i64);
shuttle_primitive!(u64, send_u64, receive_u64);
shuttle_primitive!(f32, send_f32, receive_f32);
shuttle_primitive!(f64, send_f64, receive_f64);

impl Shuttle for String {
    fn send<S: Sender>(&self, sender: &mut S, _version: u32) {
        sender.send_string(self);
    }

    fn receive<R: Receiver>(receiver: &mut R, _version: u32) -> ReceiveResult<Self> {
        receiver.receive_string()
    }
}

impl<T: Shuttle> Shuttle for Vec<T> {
    fn send<S: Sender>(&self, sender: &mut S, version: u32) {
        sender.send_sequence(self, |s, v| v.send(s, version));
    }

    fn receive<R: Receiver>(receiver: &mut R, version: u32) -> ReceiveResult<Self> {
        receiver.receive_sequence(|r| T::receive(r, version))
    }
}

impl<T: Shuttle> Shuttle for Option<T> {
    fn send<S: Sender>(&self, sender: &mut S, version: u32) {
        sender.send_optional(self, |s, v| v.send(s, version));
    }

    fn receive<R: Receiver>(receiver: &mut R, version: u32) -> ReceiveResult<Self> {
        receiver.receive_optional(|r| T::receive(r, version))
    }
}

impl<K: Shuttle + Eq + std::hash::Hash, V: Shuttle> Shuttle for HashMap<K, V> {
    fn send<S: Sender>(&self, sender: &mut S, version: u32) {
        sender.send_map(
            self.iter(),
            |s, k| k.send(s, version),
            |s, v| v.send(s, version),
        );
    }

    fn receive<R: Receiver>(receiver: &mut R, version: u32) -> ReceiveResult<Self> {
        let entries = receiver.receive_map(|r| K::receive(r, version), |r| V::receive(r, version))?;
        Ok(entries.into_iter().collect())
    }
}

/// Clones a `Shuttle` value by round-tripping it through its own wire
/// contract rather than a derived `Clone` impl (`Serialization/
/// ShuttleClone.hpp`). `ServiceRequestException` uses this so cloning a
/// received exception — including one a future version attached extra
/// fields to — reproduces exactly what re-sending it would have produced.
pub fn shuttle_clone<T: Shuttle>(value: &T, version: u32) -> ReceiveResult<T> {
    let mut buffer = SharedBuffer::new();
    {
        let mut sender = BufferSender::new(&mut buffer);
        value.send(&mut sender, version);
    }
    let mut receiver = BufferReceiver::new(buffer.data());
    T::receive(&mut receiver, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuttle_clone_round_trips_a_vec_of_strings() {
        let original = vec!["a".to_string(), "beam".to_string()];
        let cloned = shuttle_clone(&original, 0).unwrap();
        assert_eq!(original, cloned);
    }

    #[test]
    fn shuttle_clone_round_trips_nested_option() {
        let original: Option<Vec<i32>> = Some(vec![1, 2, 3]);
        let cloned = shuttle_clone(&original, 0).unwrap();
        assert_eq!(original, cloned);
    }
}
