//! Board definitions
//!
//! A board is one buildable target of a platform release. Its properties come
//! from the `<board>.*` subtree of `boards.txt`; configuration menus live
//! under `<board>.menu.<option>.<value>.*` and are selected through the
//! options of an [`Fqbn`].

use crate::core::catalog::PlatformReleaseId;
use crate::core::fqbn::Fqbn;
use crate::core::properties::Properties;
use crate::error::ResolveError;

/// A board declared by a platform release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Identifier in `boards.txt` (`uno`, `nano`, ...)
    pub id: String,
    pub properties: Properties,
    /// Release that declares this board
    pub release: PlatformReleaseId,
}

impl Board {
    pub fn new(id: &str, release: PlatformReleaseId) -> Self {
        Self {
            id: id.to_string(),
            properties: Properties::new(),
            release,
        }
    }

    /// Human readable name
    pub fn name(&self) -> &str {
        self.properties.get_or_empty("name")
    }

    /// `package:architecture:board`
    pub fn fqbn(&self) -> String {
        format!(
            "{}:{}:{}",
            self.release.package, self.release.architecture, self.id
        )
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.get_boolean("hide")
    }

    /// Match a USB vendor/product id against the `vid.N`/`pid.N` declarations
    pub fn has_usb_id(&self, vid: &str, pid: &str) -> bool {
        let vids = self.properties.sub_tree("vid");
        let pids = self.properties.sub_tree("pid");
        let found = vids.iter().any(|(n, board_vid)| {
            board_vid.eq_ignore_ascii_case(vid)
                && pids.get(n).is_some_and(|board_pid| board_pid.eq_ignore_ascii_case(pid))
        });
        found
    }

    /// Configuration options as `(option, label)` in declaration order
    ///
    /// Labels come from the `menu.*` section of the release's `boards.txt`.
    pub fn config_options(&self, menus: &Properties) -> Vec<(String, String)> {
        self.properties
            .sub_tree("menu")
            .first_level_keys()
            .into_iter()
            .map(|option| {
                let label = menus.get_or_empty(&option).to_string();
                (option, label)
            })
            .collect()
    }

    /// Values of one option as `value -> label`, in declaration order
    pub fn config_option_values(&self, option: &str) -> Properties {
        let subtree = self.properties.sub_tree(&format!("menu.{option}"));
        let mut values = Properties::new();
        for value in subtree.first_level_keys() {
            let label = subtree.get_or_empty(&value).to_string();
            values.set(value, label);
        }
        values
    }

    /// First declared value of every option
    pub fn default_config(&self) -> Properties {
        let menu = self.properties.sub_tree("menu");
        let mut config = Properties::new();
        for option in menu.first_level_keys() {
            if let Some(first) = menu.sub_tree(&option).first_level_keys().into_iter().next() {
                config.set(option, first);
            }
        }
        config
    }

    pub fn default_programmer_id(&self) -> Option<&str> {
        self.properties.get("programmer.default")
    }

    /// Board properties with menu selections applied
    ///
    /// Every option starts at its first declared value; selections in `fqbn`
    /// override them. `build.fqbn` and `build.arch` are set as well.
    pub fn build_properties(&self, fqbn: &Fqbn) -> Result<Properties, ResolveError> {
        let mut config = self.default_config();
        config.merge(&fqbn.configs);

        let mut props = self.properties.clone();
        props.set("build.fqbn", fqbn.to_string());
        props.set("build.arch", self.release.architecture.to_uppercase());

        let menu = self.properties.sub_tree("menu");
        let declared = menu.first_level_keys();
        for (option, value) in config.iter() {
            if option.is_empty() || !declared.iter().any(|d| d == option) {
                return Err(ResolveError::InvalidOption {
                    board: self.fqbn(),
                    option: option.to_string(),
                });
            }
            let selected = menu.sub_tree(&format!("{option}.{value}"));
            if selected.is_empty() && !menu.contains_key(&format!("{option}.{value}")) {
                return Err(ResolveError::InvalidOptionValue {
                    board: self.fqbn(),
                    option: option.to_string(),
                    value: value.to_string(),
                });
            }
            props.merge(&selected);
        }
        Ok(props)
    }
}
