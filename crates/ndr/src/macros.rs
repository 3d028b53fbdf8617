//! Declarative bindings for IDL constructs
//!
//! Structures, parameter lists, enumerations and non-encapsulated unions are
//! all marshalled by the same handful of rules, so bindings are declared
//! through these macros instead of implementing the codec traits by hand.

/// Declare IDL structures.
///
/// The struct aligns to its most-aligned member; member heads are written in
/// declaration order, then member pointees in declaration order.
///
/// ```
/// ndr::ndr_struct! {
///     pub struct HostInfo {
///         pub ip_address: u32,
///         pub net_bios_name: ndr::LpWStr,
///     }
/// }
/// ```
#[macro_export]
macro_rules! ndr_struct {
    ($(
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    )*) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::NdrAlign for $name {
            const NDR_ALIGN: usize =
                $crate::max_align(&[$(<$ty as $crate::NdrAlign>::NDR_ALIGN),*]);
        }

        impl $crate::NdrEncode for $name {
            fn encode_head(&self, w: &mut $crate::NdrWriter) -> $crate::Result<()> {
                w.align(<Self as $crate::NdrAlign>::NDR_ALIGN);
                $( $crate::NdrEncode::encode_head(&self.$field, w)?; )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn encode_deferred(&self, w: &mut $crate::NdrWriter) -> $crate::Result<()> {
                $( $crate::NdrEncode::encode_deferred(&self.$field, w)?; )*
                Ok(())
            }
        }

        impl $crate::NdrDecode for $name {
            fn decode_head(&mut self, r: &mut $crate::NdrReader) -> $crate::Result<()> {
                r.align(<Self as $crate::NdrAlign>::NDR_ALIGN)?;
                $( $crate::NdrDecode::decode_head(&mut self.$field, r)?; )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn decode_deferred(&mut self, r: &mut $crate::NdrReader) -> $crate::Result<()> {
                $( $crate::NdrDecode::decode_deferred(&mut self.$field, r)?; )*
                Ok(())
            }
        }
    )*};
}

/// Declare the parameter list of one direction of an RPC call.
///
/// Each field is a separate top-level construct: its head and then its
/// pointees are written before the next field starts.
#[macro_export]
macro_rules! ndr_params {
    ($(
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    )*) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::NdrAlign for $name {}

        impl $crate::NdrEncode for $name {
            #[allow(unused_variables)]
            fn encode_head(&self, w: &mut $crate::NdrWriter) -> $crate::Result<()> {
                $( $crate::NdrEncode::ndr_encode(&self.$field, w)?; )*
                Ok(())
            }
        }

        impl $crate::NdrDecode for $name {
            #[allow(unused_variables)]
            fn decode_head(&mut self, r: &mut $crate::NdrReader) -> $crate::Result<()> {
                $( self.$field = $crate::NdrDecode::ndr_decode(r)?; )*
                Ok(())
            }
        }
    )*};
}

/// Declare an IDL enumeration carried as `u16` (plain `enum`) or `u32`
/// (`v1_enum`). One variant must be marked `#[default]`.
#[macro_export]
macro_rules! ndr_enum {
    ($(
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal
            ),* $(,)?
        }
    )*) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[repr($repr)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )*
        }

        impl TryFrom<$repr> for $name {
            type Error = $crate::NdrError;

            fn try_from(value: $repr) -> ::std::result::Result<Self, Self::Error> {
                match value {
                    $( $value => Ok(Self::$variant), )*
                    other => Err($crate::NdrError::InvalidEnumValue(u32::from(other))),
                }
            }
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                value as $repr
            }
        }

        impl $crate::NdrAlign for $name {
            const NDR_ALIGN: usize = ::std::mem::size_of::<$repr>();
        }

        impl $crate::NdrEncode for $name {
            fn encode_head(&self, w: &mut $crate::NdrWriter) -> $crate::Result<()> {
                $crate::NdrEncode::encode_head(&(*self as $repr), w)
            }
        }

        impl $crate::NdrDecode for $name {
            fn decode_head(&mut self, r: &mut $crate::NdrReader) -> $crate::Result<()> {
                let mut raw: $repr = 0;
                $crate::NdrDecode::decode_head(&mut raw, r)?;
                *self = Self::try_from(raw)?;
                Ok(())
            }
        }
    )*};
}

/// Declare a structure made of a discriminant and a non-encapsulated union
/// switched on it, as one Rust enum.
///
/// Wire layout: the discriminant field, then the union aligned to the larger
/// of the switch and its arms, which repeats the switch value before the
/// selected arm. Arms without a type carry no data. The first arm is the
/// `Default`.
///
/// An arm written `5 as 0 => ...` keeps field value 5 but travels under
/// switch value 0, for discriminants that the IDL maps before switching.
#[macro_export]
macro_rules! ndr_union {
    (@switch $disc:literal) => { $disc };
    (@switch $disc:literal, $switch:literal) => { $switch };

    (@default $name:ident $variant:ident) => { $name::$variant };
    (@default $name:ident $variant:ident, $ty:ty) => {
        $name::$variant(<$ty as Default>::default())
    };

    (@wild $name:ident $variant:ident) => { $name::$variant };
    (@wild $name:ident $variant:ident, $ty:ty) => { $name::$variant(_) };

    (@bind $name:ident $variant:ident $arm:ident) => { $name::$variant };
    (@bind $name:ident $variant:ident $arm:ident, $ty:ty) => { $name::$variant($arm) };

    (@encode_head $w:ident $arm:ident) => { Ok(()) };
    (@encode_head $w:ident $arm:ident, $ty:ty) => { $crate::NdrEncode::encode_head($arm, $w) };

    (@encode_deferred $w:ident $arm:ident) => { Ok(()) };
    (@encode_deferred $w:ident $arm:ident, $ty:ty) => {
        $crate::NdrEncode::encode_deferred($arm, $w)
    };

    (@decode_head $name:ident $variant:ident $r:ident) => { $name::$variant };
    (@decode_head $name:ident $variant:ident $r:ident, $ty:ty) => {{
        let mut arm = <$ty as Default>::default();
        $crate::NdrDecode::decode_head(&mut arm, $r)?;
        $name::$variant(arm)
    }};

    (@decode_deferred $r:ident $arm:ident) => { Ok(()) };
    (@decode_deferred $r:ident $arm:ident, $ty:ty) => {
        $crate::NdrDecode::decode_deferred($arm, $r)
    };

    (@define [$($meta:tt)*] $vis:vis $name:ident $dty:ty;
        $($(#[$vmeta:meta])* $disc:literal $(as $switch:literal)? => $variant:ident $(($ty:ty))?),*
    ) => {
        $($meta)*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant $(($ty))?,
            )*
        }

        impl $name {
            /// Discriminant field value of the selected arm
            pub fn discriminant(&self) -> $dty {
                match self {
                    $( $crate::ndr_union!(@wild $name $variant $(, $ty)?) => $disc, )*
                }
            }

            /// Union switch value of the selected arm
            pub fn switch_value(&self) -> $dty {
                match self {
                    $(
                        $crate::ndr_union!(@wild $name $variant $(, $ty)?) =>
                            $crate::ndr_union!(@switch $disc $(, $switch)?),
                    )*
                }
            }
        }

        impl $crate::NdrAlign for $name {
            const NDR_ALIGN: usize = $crate::max_align(&[
                ::std::mem::size_of::<$dty>()
                $($(, <$ty as $crate::NdrAlign>::NDR_ALIGN)?)*
            ]);
        }

        impl $crate::NdrEncode for $name {
            fn encode_head(&self, w: &mut $crate::NdrWriter) -> $crate::Result<()> {
                let field: $dty = self.discriminant();
                let tag: $dty = self.switch_value();
                w.align(<Self as $crate::NdrAlign>::NDR_ALIGN);
                $crate::NdrEncode::encode_head(&field, w)?;
                w.align(<Self as $crate::NdrAlign>::NDR_ALIGN);
                $crate::NdrEncode::encode_head(&tag, w)?;
                match self {
                    $(
                        $crate::ndr_union!(@bind $name $variant arm $(, $ty)?) =>
                            $crate::ndr_union!(@encode_head w arm $(, $ty)?),
                    )*
                }
            }

            fn encode_deferred(&self, w: &mut $crate::NdrWriter) -> $crate::Result<()> {
                match self {
                    $(
                        $crate::ndr_union!(@bind $name $variant arm $(, $ty)?) =>
                            $crate::ndr_union!(@encode_deferred w arm $(, $ty)?),
                    )*
                }
            }
        }

        impl $crate::NdrDecode for $name {
            fn decode_head(&mut self, r: &mut $crate::NdrReader) -> $crate::Result<()> {
                let mut field: $dty = 0;
                let mut tag: $dty = 0;
                r.align(<Self as $crate::NdrAlign>::NDR_ALIGN)?;
                $crate::NdrDecode::decode_head(&mut field, r)?;
                r.align(<Self as $crate::NdrAlign>::NDR_ALIGN)?;
                $crate::NdrDecode::decode_head(&mut tag, r)?;
                *self = match field {
                    $(
                        $disc => {
                            if tag != $crate::ndr_union!(@switch $disc $(, $switch)?) {
                                return Err($crate::NdrError::InvalidDiscriminant(u32::from(tag)));
                            }
                            $crate::ndr_union!(@decode_head $name $variant r $(, $ty)?)
                        }
                    )*
                    other => return Err($crate::NdrError::InvalidDiscriminant(u32::from(other))),
                };
                Ok(())
            }

            fn decode_deferred(&mut self, r: &mut $crate::NdrReader) -> $crate::Result<()> {
                match self {
                    $(
                        $crate::ndr_union!(@bind $name $variant arm $(, $ty)?) =>
                            $crate::ndr_union!(@decode_deferred r arm $(, $ty)?),
                    )*
                }
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $dty:ty {
            $(#[$fmeta:meta])*
            $fdisc:literal $(as $fswitch:literal)? => $fvariant:ident $(($fty:ty))?
            $(,
                $(#[$vmeta:meta])*
                $disc:literal $(as $switch:literal)? => $variant:ident $(($ty:ty))?
            )* $(,)?
        }
    ) => {
        $crate::ndr_union!(@define [$(#[$meta])*] $vis $name $dty;
            $(#[$fmeta])* $fdisc $(as $fswitch)? => $fvariant $(($fty))?
            $(, $(#[$vmeta])* $disc $(as $switch)? => $variant $(($ty))?)*
        );

        impl Default for $name {
            fn default() -> Self {
                $crate::ndr_union!(@default $name $fvariant $(, $fty)?)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{
        LpWStr, NdrContext, NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, SizedArray,
        UniquePtr,
    };
    use bytes::Bytes;

    crate::ndr_struct! {
        struct Host {
            ip: u32,
            name: LpWStr,
            comment: LpWStr,
        }

        struct Stamp {
            flag: u8,
            when: u64,
        }

        struct Outer {
            host: Host,
            hosts: SizedArray<Host>,
        }
    }

    crate::ndr_enum! {
        enum Colour: u16 {
            #[default]
            Red = 0,
            Green = 1,
            Blue = 7,
        }
    }

    crate::ndr_union! {
        enum Element: u16 {
            0 => Byte(u8),
            1 => Range(UniquePtr<Stamp>),
            2 => Name(LpWStr),
        }
    }

    crate::ndr_union! {
        enum Scope: u16 {
            0 => Everywhere,
            2 => Subnet(u32),
            4 => Named(LpWStr),
        }
    }

    crate::ndr_union! {
        enum Mapped: u16 {
            0 => Plain(u32),
            1 => Other,
            5 as 0 => Narrow(u32),
        }
    }

    crate::ndr_params! {
        struct Params {
            server: LpWStr,
            host: Host,
            count: u32,
        }
    }

    fn encode<T: NdrEncode>(value: &T) -> Bytes {
        let mut w = NdrWriter::default();
        value.ndr_encode(&mut w).unwrap();
        w.into_bytes()
    }

    fn decode<T: NdrDecode>(bytes: Bytes) -> crate::Result<T> {
        T::ndr_decode(&mut NdrReader::new(bytes, NdrContext::new()))
    }

    #[test]
    fn test_struct_defers_pointees() {
        let host = Host {
            ip: 0x0A000001,
            name: "a".into(),
            comment: LpWStr::null(),
        };
        let bytes = encode(&host);
        assert_eq!(
            &bytes[..],
            &[
                1, 0, 0, 10, 0, 0, 2, 0, 0, 0, 0, 0, // head
                2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'a', 0, 0, 0,
            ]
        );
        assert_eq!(decode::<Host>(bytes).unwrap(), host);
    }

    #[test]
    fn test_struct_alignment() {
        assert_eq!(<Stamp as crate::NdrAlign>::NDR_ALIGN, 8);
        let mut w = NdrWriter::default();
        w.write_u8(0xFF);
        Stamp { flag: 1, when: 2 }.ndr_encode(&mut w).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(bytes[8], 1);
        assert_eq!(bytes[16], 2);
    }

    #[test]
    fn test_nested_deferral_order() {
        let outer = Outer {
            host: Host {
                ip: 1,
                name: "x".into(),
                comment: LpWStr::null(),
            },
            hosts: vec![Host {
                ip: 2,
                name: "y".into(),
                comment: "z".into(),
            }]
            .into(),
        };
        let bytes = encode(&outer);
        // outer head: host head, count, array referent
        assert_eq!(&bytes[..20], &[1, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 1, 0, 0, 0, 4, 0, 2, 0]);
        // first deferred pointee is host.name
        assert_eq!(&bytes[20..36], &[2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'x', 0, 0, 0]);
        assert_eq!(decode::<Outer>(bytes).unwrap(), outer);
    }

    #[test]
    fn test_enum() {
        let bytes = encode(&Colour::Blue);
        assert_eq!(&bytes[..], &[7, 0]);
        assert_eq!(decode::<Colour>(bytes).unwrap(), Colour::Blue);
        assert_eq!(Colour::default(), Colour::Red);
        assert_eq!(u16::from(Colour::Green), 1);
        assert!(matches!(Colour::try_from(3u16), Err(NdrError::InvalidEnumValue(3))));
    }

    #[test]
    fn test_union_layout() {
        assert_eq!(<Element as crate::NdrAlign>::NDR_ALIGN, 4);
        let element = Element::Name("q".into());
        let bytes = encode(&element);
        assert_eq!(
            &bytes[..],
            &[
                2, 0, 0, 0, 2, 0, 0, 0, 0, 0, 2, 0, // field, padding, switch, referent
                2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b'q', 0, 0, 0,
            ]
        );
        assert_eq!(decode::<Element>(bytes).unwrap(), element);

        let byte = Element::Byte(9);
        assert_eq!(&encode(&byte)[..], &[0, 0, 0, 0, 0, 0, 9]);
        assert_eq!(Element::default(), Element::Byte(0));
    }

    #[test]
    fn test_union_pointer_arm() {
        let element = Element::Range(UniquePtr::new(Stamp { flag: 3, when: 4 }));
        assert_eq!(element.discriminant(), 1);
        let bytes = encode(&element);
        assert_eq!(decode::<Element>(bytes).unwrap(), element);
    }

    #[test]
    fn test_union_rejects_unknown_arm() {
        let bytes = Bytes::from_static(&[5, 0, 0, 0, 5, 0, 0, 0]);
        assert!(matches!(decode::<Element>(bytes), Err(NdrError::InvalidDiscriminant(5))));

        let mismatched = Bytes::from_static(&[0, 0, 0, 0, 1, 0, 0, 0]);
        assert!(matches!(
            decode::<Element>(mismatched),
            Err(NdrError::InvalidDiscriminant(1))
        ));
    }

    #[test]
    fn test_union_field_differs_from_switch() {
        let narrow = Mapped::Narrow(7);
        assert_eq!(narrow.discriminant(), 5);
        assert_eq!(narrow.switch_value(), 0);
        let bytes = encode(&narrow);
        assert_eq!(&bytes[..], &[5, 0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0]);
        assert_eq!(decode::<Mapped>(bytes).unwrap(), narrow);

        let plain = encode(&Mapped::Plain(7));
        assert_eq!(&plain[..], &[0, 0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0]);

        let wrong_switch = Bytes::from_static(&[5, 0, 0, 0, 5, 0, 0, 0, 7, 0, 0, 0]);
        assert!(matches!(
            decode::<Mapped>(wrong_switch),
            Err(NdrError::InvalidDiscriminant(5))
        ));
    }

    #[test]
    fn test_union_empty_arm() {
        assert_eq!(Scope::default(), Scope::Everywhere);
        assert_eq!(Scope::Everywhere.discriminant(), 0);
        let bytes = encode(&Scope::Everywhere);
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 0, 0]);
        assert_eq!(decode::<Scope>(bytes).unwrap(), Scope::Everywhere);

        let subnet = Scope::Subnet(0xC0A80100);
        let bytes = encode(&subnet);
        assert_eq!(&bytes[..], &[2, 0, 0, 0, 2, 0, 0, 0, 0, 1, 0xA8, 0xC0]);
        assert_eq!(decode::<Scope>(bytes).unwrap(), subnet);

        let named = Scope::Named("m".into());
        assert_eq!(decode::<Scope>(encode(&named)).unwrap(), named);
    }

    #[test]
    fn test_params_are_separate_constructs() {
        let params = Params {
            server: "s".into(),
            host: Host {
                ip: 5,
                name: "n".into(),
                comment: LpWStr::null(),
            },
            count: 6,
        };
        let bytes = encode(&params);
        // server pointee comes right after its referent, before the host
        assert_eq!(&bytes[..20], &[0, 0, 2, 0, 2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, b's', 0, 0, 0]);
        assert_eq!(&bytes[20..24], &[5, 0, 0, 0]);
        assert_eq!(decode::<Params>(bytes).unwrap(), params);
    }
}
