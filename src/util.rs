//! # Utilities

macro_rules! impl_try_from_into {
    ($enum_name:ident, $( $name:ident => $variant_type:ty ),*) => {
       $(
           impl ::std::convert::TryFrom<$enum_name> for $variant_type {
               type Error = $crate::errors::Error;

               fn try_from(other: $enum_name) -> ::std::result::Result<$variant_type, Self::Error> {
                   if let $enum_name::$name(value) = other {
                       Ok(value)
                   } else {
                      Err($crate::errors::format_err!("invalid packet type: {:?}", other))
                   }
               }
           }

           impl From<$variant_type> for $enum_name {
               fn from(other: $variant_type) -> $enum_name {
                   $enum_name::$name(other)
               }
           }
       )*
    }
}

pub(crate) use impl_try_from_into;

/// Writes `data` as a length prefixed slice, with a one octet length.
pub(crate) fn write_short_string<W: std::io::Write>(writer: &mut W, data: &[u8]) -> crate::errors::Result<()> {
    let len: u8 = data.len().try_into()?;
    writer.write_all(&[len])?;
    writer.write_all(data)?;
    Ok(())
}
