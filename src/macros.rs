//! Token enum macro
//!
//! Filter enums are persisted by fixed tokens rather than by ordinal. Each
//! variant declares its legacy token (also what the Wallhaven API expects)
//! and its current document tag next to it, so the vocabulary stays frozen
//! even if variants are reordered.

/// Declare an enum together with its frozen legacy/current token table
#[macro_export]
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($legacy:literal, $tag:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Token used by the legacy query-string format and the Wallhaven API
            pub fn legacy_token(self) -> &'static str {
                match self {
                    $($name::$variant => $legacy),+
                }
            }

            /// Tag used by the current document format
            pub fn tag(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            pub fn from_legacy_token(token: &str) -> Option<Self> {
                match token {
                    $($legacy => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.tag())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
                let tag = <::std::string::String as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::from_tag(&tag)
                    .ok_or_else(|| <D::Error as ::serde::de::Error>::unknown_variant(&tag, &[$($tag),+]))
            }
        }
    };
}
