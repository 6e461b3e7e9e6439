use crate::error::{ReceiveError, ReceiveResult};
use byteorder::{ByteOrder, LittleEndian};

/// Reads primitive wire values off a byte slice, mirroring [`crate::Sender`]
/// field-for-field (`Serialization/BufferReceiver.hpp`).
pub trait Receiver {
    fn receive_bool(&mut self) -> ReceiveResult<bool>;
    fn receive_i8(&mut self) -> ReceiveResult<i8>;
    fn receive_u8(&mut self) -> ReceiveResult<u8>;
    fn receive_i16(&mut self) -> ReceiveResult<i16>;
    fn receive_u16(&mut self) -> ReceiveResult<u16>;
    fn receive_i32(&mut self) -> ReceiveResult<i32>;
    fn receive_u32(&mut self) -> ReceiveResult<u32>;
    fn receive_i64(&mut self) -> ReceiveResult<i64>;
    fn receive_u64(&mut self) -> ReceiveResult<u64>;
    fn receive_f32(&mut self) -> ReceiveResult<f32>;
    fn receive_f64(&mut self) -> ReceiveResult<f64>;
    fn receive_bytes(&mut self, len: usize) -> ReceiveResult<Vec<u8>>;

    fn receive_string(&mut self) -> ReceiveResult<String> {
        let len = self.receive_u32()? as usize;
        let bytes = self.receive_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| ReceiveError::InvalidUtf8)
    }

    fn receive_sequence<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> ReceiveResult<T>,
    ) -> ReceiveResult<Vec<T>> {
        let count = self.receive_i32()?;
        if count < 0 {
            return Err(ReceiveError::Malformed("negative sequence length".into()));
        }
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(element(self)?);
        }
        Ok(values)
    }

    fn receive_optional<T>(
        &mut self,
        element: impl FnOnce(&mut Self) -> ReceiveResult<T>,
    ) -> ReceiveResult<Option<T>> {
        if self.receive_bool()? {
            Ok(Some(element(self)?))
        } else {
            Ok(None)
        }
    }

    fn receive_map<K, V>(
        &mut self,
        mut key: impl FnMut(&mut Self) -> ReceiveResult<K>,
        mut value: impl FnMut(&mut Self) -> ReceiveResult<V>,
    ) -> ReceiveResult<Vec<(K, V)>> {
        let count = self.receive_i32()?;
        if count < 0 {
            return Err(ReceiveError::Malformed("negative map length".into()));
        }
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let k = key(self)?;
            let v = value(self)?;
            entries.push((k, v));
        }
        Ok(entries)
    }
}

/// The concrete `Receiver` used everywhere in this crate: a cursor over an
/// already-decoded payload slice.
pub struct BufferReceiver<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BufferReceiver<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BufferReceiver { data, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn take(&mut self, len: usize) -> ReceiveResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ReceiveError::UnexpectedEnd);
        }
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }
}

macro_rules! receive_le {
    ($name:ident, $ty:ty, $read:ident) => {
        fn $name(&mut self) -> ReceiveResult<$ty> {
            let bytes = self.take(std::mem::size_of::<$ty>())?;
            Ok(LittleEndian::$read(bytes))
        }
    };
}

impl<'a> Receiver for BufferReceiver<'a> {
    fn receive_bool(&mut self) -> ReceiveResult<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    fn receive_i8(&mut self) -> ReceiveResult<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    fn receive_u8(&mut self) -> ReceiveResult<u8> {
        Ok(self.take(1)?[0])
    }

    receive_le!(receive_i16, i16, read_i16);
    receive_le!(receive_u16, u16, read_u16);
    receive_le!(receive_i32, i32, read_i32);
    receive_le!(receive_u32, u32, read_u32);
    receive_le!(receive_i64, i64, read_i64);
    receive_le!(receive_u64, u64, read_u64);
    receive_le!(receive_f32, f32, read_f32);
    receive_le!(receive_f64, f64, read_f64);

    fn receive_bytes(&mut self, len: usize) -> ReceiveResult<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::{BufferSender, Sender};
    use beam_buffer::SharedBuffer;

    #[test]
    fn round_trips_primitives() {
        let mut buffer = SharedBuffer::new();
        {
            let mut sender = BufferSender::new(&mut buffer);
            sender.send_u32(42);
            sender.send_bool(true);
            sender.send_string("beam");
        }
        let mut receiver = BufferReceiver::new(buffer.data());
        assert_eq!(receiver.receive_u32().unwrap(), 42);
        assert_eq!(receiver.receive_bool().unwrap(), true);
        assert_eq!(receiver.receive_string().unwrap(), "beam");
    }

    #[test]
    fn truncated_payload_errors() {
        let mut receiver = BufferReceiver::new(&[0, 0]);
        assert!(matches!(receiver.receive_u32(), Err(ReceiveError::UnexpectedEnd)));
    }

    #[test]
    fn round_trips_sequence_and_optional() {
        let mut buffer = SharedBuffer::new();
        {
            let mut sender = BufferSender::new(&mut buffer);
            sender.send_sequence(&[1i32, 2, 3], |s, v| s.send_i32(*v));
            sender.send_optional(&Some(7i32), |s, v| s.send_i32(*v));
            sender.send_optional::<i32>(&None, |s, v| s.send_i32(*v));
        }
        let mut receiver = BufferReceiver::new(buffer.data());
        let seq = receiver.receive_sequence(|r| r.receive_i32()).unwrap();
        assert_eq!(seq, vec![1, 2, 3]);
        let some = receiver.receive_optional(|r| r.receive_i32()).unwrap();
        assert_eq!(some, Some(7));
        let none = receiver.receive_optional(|r| r.receive_i32()).unwrap();
        assert_eq!(none, None);
    }
}
