//! Keeps the concrete error of the outermost deserializer call.
//!
//! Crossing an `erased_serde` boundary flattens errors into plain messages,
//! losing the parser's category and position. Wrapping the concrete
//! deserializer in [`Capture`] before erasing it stashes the original error
//! so the codec can still classify it. Nested failures surface through the
//! outermost call, so forwarding the top-level methods is enough.

use serde::de::{Deserializer, Visitor};

pub(crate) struct Capture<'s, D, E> {
    inner: D,
    slot: &'s mut Option<E>,
}

impl<'s, D, E> Capture<'s, D, E> {
    pub(crate) fn new(inner: D, slot: &'s mut Option<E>) -> Self {
        Capture { inner, slot }
    }
}

/// Store `err` and hand back a message-only copy to keep unwinding with.
fn keep<E: serde::de::Error>(slot: &mut Option<E>, err: E) -> E {
    let relay = E::custom(&err);
    *slot = Some(err);
    relay
}

macro_rules! forward {
    ($($method:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            fn $method<V>(self, $($arg: $ty,)* visitor: V) -> Result<V::Value, Self::Error>
            where
                V: Visitor<'de>,
            {
                let Capture { inner, slot } = self;
                inner.$method($($arg,)* visitor).map_err(|err| keep(slot, err))
            }
        )*
    };
}

impl<'de, 's, D> Deserializer<'de> for Capture<'s, D, D::Error>
where
    D: Deserializer<'de>,
{
    type Error = D::Error;

    forward! {
        deserialize_any();
        deserialize_bool();
        deserialize_i8();
        deserialize_i16();
        deserialize_i32();
        deserialize_i64();
        deserialize_i128();
        deserialize_u8();
        deserialize_u16();
        deserialize_u32();
        deserialize_u64();
        deserialize_u128();
        deserialize_f32();
        deserialize_f64();
        deserialize_char();
        deserialize_str();
        deserialize_string();
        deserialize_bytes();
        deserialize_byte_buf();
        deserialize_option();
        deserialize_unit();
        deserialize_unit_struct(name: &'static str);
        deserialize_newtype_struct(name: &'static str);
        deserialize_seq();
        deserialize_tuple(len: usize);
        deserialize_tuple_struct(name: &'static str, len: usize);
        deserialize_map();
        deserialize_struct(name: &'static str, fields: &'static [&'static str]);
        deserialize_enum(name: &'static str, variants: &'static [&'static str]);
        deserialize_identifier();
        deserialize_ignored_any();
    }

    fn is_human_readable(&self) -> bool {
        self.inner.is_human_readable()
    }
}
