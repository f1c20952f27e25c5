//! Types for use when configuring batchfetch modules.

use crate::*;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> BfResult<D> {
    serde_json::from_str(
        &serde_json::to_string(s)
            .map_err(|e| BfError::other_src("encode", e))?,
    )
    .map_err(|e| BfError::other_src("decode", e))
}

/// Denotes a type used to configure a specific batchfetch module.
///
/// A module config is a struct with a single top-level property named
/// after the module, for example `{ "batch": { ... } }`. All module
/// configs share one flat [Config] object, so the top-level names must
/// not collide.
///
/// Module configs are loaded from files that humans edit, so they should
/// be tolerant of missing properties by falling back to sane defaults.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

/// Batchfetch configuration.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    /// Called by module factories when generating a default configuration.
    /// Refuses to overwrite properties that another module already
    /// registered.
    pub fn set_default_module_config<M: ModConfig>(
        &mut self,
        module_config: &M,
    ) -> BfResult<()> {
        let props: serde_json::Map<String, serde_json::Value> =
            tc(module_config)?;
        for key in props.keys() {
            if self.0.contains_key(key) {
                return Err(BfError::other(format!(
                    "Refusing to overwrite conflicting module config: {key}"
                )));
            }
        }
        self.0.extend(props);
        Ok(())
    }

    /// Set (or replace) the properties of a module config.
    pub fn set_module_config<M: ModConfig>(
        &mut self,
        module_config: &M,
    ) -> BfResult<()> {
        let props: serde_json::Map<String, serde_json::Value> =
            tc(module_config)?;
        self.0.extend(props);
        Ok(())
    }

    /// Extract a module config. Properties belonging to other modules
    /// are ignored, properties missing from the config take the module
    /// defaults.
    pub fn get_module_config<M: ModConfig>(&self) -> BfResult<M> {
        tc(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase", default)]
    struct InnerA {
        p_a: u32,
        p_b: String,
    }

    impl Default for InnerA {
        fn default() -> Self {
            Self {
                p_a: 3,
                p_b: "b".into(),
            }
        }
    }

    #[derive(
        Debug, Default, serde::Serialize, serde::Deserialize, PartialEq,
    )]
    #[serde(rename_all = "camelCase", default)]
    struct ModA {
        mod_a: InnerA,
    }

    impl ModConfig for ModA {}

    #[derive(
        Debug, Default, serde::Serialize, serde::Deserialize, PartialEq,
    )]
    #[serde(rename_all = "camelCase", default)]
    struct ModB {
        mod_b: u32,
    }

    impl ModConfig for ModB {}

    #[test]
    fn config_usage_example() {
        let mut config = Config::default();
        config.set_default_module_config(&ModA::default()).unwrap();
        config.set_default_module_config(&ModB::default()).unwrap();

        assert_eq!(
            r##"{
  "modA": {
    "pA": 3,
    "pB": "b"
  },
  "modB": 0
}"##,
            serde_json::to_string_pretty(&config).unwrap()
        );

        // ensure we can load a partial config from disk
        let config: Config = serde_json::from_str(
            r#"{
          "modBAD": { "foo": "bar" },
          "modA": { "pB": "test-p_b", "extra": "foo" }
        }"#,
        )
        .unwrap();

        assert_eq!(
            ModA {
                mod_a: InnerA {
                    p_a: 3,
                    p_b: "test-p_b".into(),
                }
            },
            config.get_module_config::<ModA>().unwrap(),
        );

        // unset mods get the default
        assert_eq!(ModB::default(), config.get_module_config().unwrap());
    }

    #[test]
    fn refuse_conflicting_defaults() {
        let mut config = Config::default();
        config.set_default_module_config(&ModA::default()).unwrap();
        assert!(config.set_default_module_config(&ModA::default()).is_err());

        // explicit overrides are fine
        config
            .set_module_config(&ModA {
                mod_a: InnerA {
                    p_a: 9,
                    ..Default::default()
                },
            })
            .unwrap();
        assert_eq!(9, config.get_module_config::<ModA>().unwrap().mod_a.p_a);
    }
}
