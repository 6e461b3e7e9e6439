//! `serde_with`-style helper module for (de)serializing byte buffers as
//! base64 strings, the module `flux::session::server::SessionKey`
//! expects at `crate::encoding::base64` but never actually defined.
//! Fixed here so anything carrying a fixed-size secret (session keys,
//! AEAD key material) can derive `Serialize`/`Deserialize` with
//! `#[serde(with = "beam_buffer::encoding::base64")]` the way the
//! original field declaration intended.

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&base64::encode(bytes))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    base64::decode(&encoded).map_err(D::Error::custom)
}

/// Variant for fixed-size arrays, used by `SessionKey`-style `[u8; N]` fields.
pub mod fixed {
    use super::*;
    use std::convert::TryInto;

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&base64::encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let decoded = base64::decode(&encoded).map_err(D::Error::custom)?;
        decoded
            .try_into()
            .map_err(|_| D::Error::custom("unexpected decoded length"))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Wrapper {
        #[serde(with = "crate::encoding::base64")]
        data: Vec<u8>,
    }

    #[test]
    fn base64_round_trips_through_json() {
        let original = Wrapper { data: vec![1, 2, 3, 255, 0] };
        let json = serde_json::to_string(&original).unwrap();
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }
}
