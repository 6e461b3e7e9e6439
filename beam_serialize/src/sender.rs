use beam_buffer::Buffer;
use byteorder::{ByteOrder, LittleEndian};

/// Appends primitive wire values to a `Buffer`, little-endian throughout
/// (`Serialization/BufferSender.hpp`). Sequences are length-prefixed with
/// an `i32` count, strings with a `u32` byte length, and optionals with a
/// leading `bool`.
pub trait Sender {
    fn send_bool(&mut self, value: bool);
    fn send_i8(&mut self, value: i8);
    fn send_u8(&mut self, value: u8);
    fn send_i16(&mut self, value: i16);
    fn send_u16(&mut self, value: u16);
    fn send_i32(&mut self, value: i32);
    fn send_u32(&mut self, value: u32);
    fn send_i64(&mut self, value: i64);
    fn send_u64(&mut self, value: u64);
    fn send_f32(&mut self, value: f32);
    fn send_f64(&mut self, value: f64);
    fn send_bytes(&mut self, value: &[u8]);

    fn send_string(&mut self, value: &str) {
        self.send_u32(value.len() as u32);
        self.send_bytes(value.as_bytes());
    }

    fn send_sequence<T>(&mut self, values: &[T], mut element: impl FnMut(&mut Self, &T)) {
        self.send_i32(values.len() as i32);
        for value in values {
            element(self, value);
        }
    }

    fn send_optional<T>(&mut self, value: &Option<T>, element: impl FnOnce(&mut Self, &T)) {
        match value {
            Some(inner) => {
                self.send_bool(true);
                element(self, inner);
            }
            None => self.send_bool(false),
        }
    }

    fn send_map<K, V>(
        &mut self,
        entries: impl ExactSizeIterator<Item = (K, V)>,
        mut key: impl FnMut(&mut Self, &K),
        mut value: impl FnMut(&mut Self, &V),
    ) {
        self.send_i32(entries.len() as i32);
        for (k, v) in entries {
            key(self, &k);
            value(self, &v);
        }
    }
}

/// The concrete `Sender` used everywhere in this crate: appends directly
/// into a caller-owned `Buffer`.
pub struct BufferSender<'a> {
    destination: &'a mut dyn Buffer,
}

impl<'a> BufferSender<'a> {
    pub fn new(destination: &'a mut dyn Buffer) -> Self {
        BufferSender { destination }
    }
}

macro_rules! send_le {
    ($name:ident, $ty:ty, $write:ident) => {
        fn $name(&mut self, value: $ty) {
            let mut bytes = [0u8; std::mem::size_of::<$ty>()];
            LittleEndian::$write(&mut bytes, value);
            self.destination.append(&bytes);
        }
    };
}

impl<'a> Sender for BufferSender<'a> {
    fn send_bool(&mut self, value: bool) {
        self.destination.append(&[value as u8]);
    }

    fn send_i8(&mut self, value: i8) {
        self.destination.append(&[value as u8]);
    }

    fn send_u8(&mut self, value: u8) {
        self.destination.append(&[value]);
    }

    send_le!(send_i16, i16, write_i16);
    send_le!(send_u16, u16, write_u16);
    send_le!(send_i32, i32, write_i32);
    send_le!(send_u32, u32, write_u32);
    send_le!(send_i64, i64, write_i64);
    send_le!(send_u64, u64, write_u64);
    send_le!(send_f32, f32, write_f32);
    send_le!(send_f64, f64, write_f64);

    fn send_bytes(&mut self, value: &[u8]) {
        self.destination.append(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_buffer::SharedBuffer;

    #[test]
    fn sends_primitives_little_endian() {
        let mut buffer = SharedBuffer::new();
        let mut sender = BufferSender::new(&mut buffer);
        sender.send_u32(0x01020304);
        assert_eq!(buffer.data(), &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn sends_string_with_length_prefix() {
        let mut buffer = SharedBuffer::new();
        let mut sender = BufferSender::new(&mut buffer);
        sender.send_string("hi");
        assert_eq!(buffer.data(), &[2, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn sends_sequence_with_count_prefix() {
        let mut buffer = SharedBuffer::new();
        let mut sender = BufferSender::new(&mut buffer);
        sender.send_sequence(&[1i32, 2, 3], |s, v| s.send_i32(*v));
        assert_eq!(
            buffer.data(),
            &[3, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]
        );
    }
}
