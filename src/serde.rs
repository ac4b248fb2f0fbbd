//! # Serde module for Sketch
//!
//! This module provides serde-based (serialization and deserialization) features for
//! `Sketch`. A sketch is serialized as its packed form (`[version, precision, registers...]`),
//! so deserialization goes through the same validation as sketches read from storage:
//! a length that does not match the declared precision, or an unknown version, is rejected.
//!
//! Refer to the serde documentation for more details on custom serialization and deserialization:
//! - [Serialization](https://serde.rs/impl-serialize.html)
//! - [Deserialization](https://serde.rs/impl-deserialize.html)
use serde::de::Error;
use serde::{Deserialize, Serialize};

use crate::hyperloglog::Sketch;

impl Serialize for Sketch {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.to_packed())
    }
}

impl<'de> Deserialize<'de> for Sketch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Self-describing formats such as JSON hand bytes back as a sequence,
        // so accept an owned vector rather than a borrowed slice.
        let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
        Sketch::from_packed(&bytes).map_err(D::Error::custom)
    }
}
