#[cfg(test)]
pub mod test {
    use std::collections::HashMap;
    use std::time::Duration;

    use crate::value::ConfigValue;

    crate::record! {
        /// A small service description bound from files and flags.
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct Service {
            pub name: String => { cfg: "name" },
            pub retries: i32 => { cfg: "retries", flag: "retries" },
            pub tags: Vec<String> => { cfg: "tags", flag: "tags" },
        }
    }

    crate::record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct Any {
            pub test_any: String => { cfg: "any-test" },
        }
    }

    crate::record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct MapFoo {
            pub key: String => { cfg: "key" },
            pub value: String => { cfg: "value" },
        }
    }

    crate::record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct StructFoo {
            pub key: String => { cfg: "key" },
            pub value: String => { cfg: "value" },
        }
    }

    crate::record! {
        /// One field of every supported kind.
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct MapTest {
            pub any: Any => flatten,
            pub test: i32,
            pub test_int: i64 => { cfg: "int", json: "int" },
            pub test_int8: i8 => { cfg: "int8" },
            pub test_int16: i16 => { cfg: "int16" },
            pub test_int32: i32 => { cfg: "int32" },
            pub test_int64: i64 => { cfg: "int64" },
            pub test_duration: Duration => { cfg: "duration" },
            pub test_string: String => { cfg: "string" },
            pub test_bool: bool => { cfg: "bool" },
            pub slice_test: Vec<String> => { cfg: "slice" },
            pub map_foo: HashMap<String, MapFoo> => { cfg: "map-foo" },
            pub struct_foo: StructFoo => { cfg: "struct-foo" },
        }
    }

    crate::record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct Limits {
            pub ratios: Vec<f64> => { toml: "ratios" },
            pub timeout: Duration => { toml: "timeout" },
            pub max_open: u32 => { toml: "max_open" },
            pub scale: f32 => { toml: "scale" },
        }
    }

    crate::record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        pub struct Settings {
            pub limits: Option<Limits> => { toml: "limits" },
            pub extra: Option<Limits> => flatten,
            pub ports: Vec<u16> => { toml: "ports" },
            pub weights: HashMap<u16, f64> => { toml: "weights" },
            pub raw: ConfigValue => { toml: "raw" },
            pub label: String => { toml: "" },
        }
    }

    mod tests {
        use super::*;
        use crate::bind::{Binding, Record};

        #[test]
        fn binding_variants() {
            let mut test = MapTest::default();
            let fields = test.fields();
            assert!(matches!(fields[0].binding(), Binding::Flatten));
            assert!(matches!(fields[1].binding(), Binding::Untagged));
            assert_eq!(fields[2].binding().tag("json"), Some("int"));
        }

        #[test]
        fn empty_tag_counts_as_absent() {
            let mut settings = Settings::default();
            let fields = settings.fields();
            assert_eq!(fields[5].binding().tag("toml"), None);
        }
    }
}
