/// Declare a record type whose fields can be bound from configuration.
///
/// The struct is emitted as written, minus the binding suffixes, together
/// with its [`Record`](crate::Record), [`Bindable`](crate::Bindable) and
/// [`Element`](crate::Element) impls. Each field may end with:
///
/// - `=> { cfg: "key", flag: "key" }`: the key to look up per tag namespace;
/// - `=> flatten`: an embedded record matched against the same mapping;
/// - nothing: the field is never bound.
///
/// Every field type must be [`Bindable`](crate::Bindable), and the record
/// itself must implement `Default` so it can appear in sequences, mappings
/// and `Option`s.
///
/// ```ignore
/// cfgbind::record! {
///     #[derive(Debug, Default)]
///     pub struct Server {
///         pub name: String => { cfg: "name", flag: "name" },
///         pub retries: i32 => { cfg: "retries" },
///         pub common: Common => flatten,
///         pub scratch: u8,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty $(=> $binding:tt)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn fields(&mut self) -> ::std::vec::Vec<$crate::Field<'_>> {
                ::std::vec![
                    $(
                        $crate::Field::new(
                            ::core::stringify!($field),
                            $crate::__binding!($($binding)?),
                            &mut self.$field,
                        ),
                    )*
                ]
            }
        }

        impl $crate::Bindable for $name {
            fn shape(&self) -> $crate::Shape {
                $crate::Shape::Record
            }

            fn bind_value(
                &mut self,
                raw: &$crate::ConfigValue,
                cx: &$crate::Context<'_>,
            ) -> ::core::result::Result<(), $crate::BindError> {
                $crate::bind_record(self, raw, cx)
            }

            fn as_record(&mut self) -> ::core::option::Option<&mut dyn $crate::Record> {
                ::core::option::Option::Some(self)
            }
        }

        impl $crate::Element for $name {}
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __binding {
    () => {
        $crate::Binding::Untagged
    };
    (flatten) => {
        $crate::Binding::Flatten
    };
    ({ $($namespace:ident : $tag:literal),* $(,)? }) => {
        $crate::Binding::Tags(&[$((::core::stringify!($namespace), $tag)),*])
    };
}
