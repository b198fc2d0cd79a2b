use std::{
    collections::{BTreeMap, HashMap},
    sync::LazyLock,
};

use regex::Regex;
use tracing::debug;

use crate::{
    builtin_functions::BuiltinFunction,
    functions::{
        FunctionFactory, ParseFunction, factory,
        mysql::DateFormat,
        oracle::{Extract, Nvl2},
    },
};

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("a valid regex"));

/// The three kinds of custom function the ORM configuration distinguishes.
///  The parser treats them alike; the category is kept for callers that
///  report or filter on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display, strum_macros::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FunctionCategory {
    String,
    Numeric,
    Datetime,
}

/// The function extensions shipped with this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[strum(ascii_case_insensitive)]
pub enum FunctionKind {
    #[strum(serialize = "DATE_FORMAT")]
    DateFormat,
    #[strum(serialize = "EXTRACT")]
    Extract,
    #[strum(serialize = "NVL2")]
    Nvl2,
}

impl FunctionKind {
    pub fn factory(self) -> FunctionFactory {
        match self {
            FunctionKind::DateFormat => factory::<DateFormat>,
            FunctionKind::Extract => factory::<Extract>,
            FunctionKind::Nvl2 => factory::<Nvl2>,
        }
    }

    pub fn default_category(self) -> FunctionCategory {
        match self {
            FunctionKind::DateFormat | FunctionKind::Nvl2 => FunctionCategory::String,
            FunctionKind::Extract => FunctionCategory::Numeric,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("'{0}' is not a valid function name")]
    InvalidName(String),
    #[error("'{0}' is a built-in DQL function and can't be overridden")]
    ReservedName(String),
}

/// Custom function configuration, one map per category, keyed by the name
///  the function is called by in DQL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub string_functions: BTreeMap<String, FunctionKind>,
    pub numeric_functions: BTreeMap<String, FunctionKind>,
    pub datetime_functions: BTreeMap<String, FunctionKind>,
}

impl Config {
    /// Every shipped extension under its own name.
    pub fn with_defaults() -> Self {
        let mut config = Self::default();
        for kind in [FunctionKind::DateFormat, FunctionKind::Extract, FunctionKind::Nvl2] {
            config.functions_mut(kind.default_category()).insert(kind.to_string(), kind);
        }
        config
    }

    pub fn functions_mut(&mut self, category: FunctionCategory) -> &mut BTreeMap<String, FunctionKind> {
        match category {
            FunctionCategory::String => &mut self.string_functions,
            FunctionCategory::Numeric => &mut self.numeric_functions,
            FunctionCategory::Datetime => &mut self.datetime_functions,
        }
    }
}

#[derive(Clone, Copy)]
struct Registration {
    factory: FunctionFactory,
    category: FunctionCategory,
}

/// Maps function names (case-insensitively) to the extensions that parse
///  them. The parser consults it for any identifier followed by `(` that
///  isn't a built-in function.
#[derive(Clone, Default)]
pub struct Registry {
    functions: HashMap<String, Registration>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.iter().map(|(n, r)| (n, r.category)).collect();
        names.sort();
        f.debug_struct("Registry").field("functions", &names).finish()
    }
}

impl Registry {
    /// An empty registry: only built-in functions will parse.
    pub fn new() -> Self {
        Self::default()
    }

    /// The MySQL pack: `DATE_FORMAT`.
    pub fn mysql() -> Self {
        let mut registry = Self::new();
        registry.insert_kind(FunctionKind::DateFormat);
        registry
    }

    /// The Oracle pack: `EXTRACT` and `NVL2`.
    pub fn oracle() -> Self {
        let mut registry = Self::new();
        registry.insert_kind(FunctionKind::Extract);
        registry.insert_kind(FunctionKind::Nvl2);
        registry
    }

    /// Every extension shipped with this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::mysql();
        registry.functions.extend(Self::oracle().functions);
        registry
    }

    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (category, functions) in [
            (FunctionCategory::String, &config.string_functions),
            (FunctionCategory::Numeric, &config.numeric_functions),
            (FunctionCategory::Datetime, &config.datetime_functions),
        ] {
            for (name, kind) in functions {
                registry.register_kind(name, *kind, category)?;
            }
        }
        Ok(registry)
    }

    // Shipped names are known to be valid, so this skips the checks.
    fn insert_kind(&mut self, kind: FunctionKind) {
        let registration = Registration {
            factory: kind.factory(),
            category: kind.default_category(),
        };
        self.functions.insert(kind.to_string(), registration);
    }

    /// Registers [T] under [name]. A previous registration under the same name
    ///  is replaced.
    pub fn register<T: ParseFunction>(
        &mut self,
        name: &str,
        category: FunctionCategory,
    ) -> Result<(), RegistryError> {
        self.register_factory(name, category, factory::<T>)
    }

    pub fn register_kind(
        &mut self,
        name: &str,
        kind: FunctionKind,
        category: FunctionCategory,
    ) -> Result<(), RegistryError> {
        self.register_factory(name, category, kind.factory())
    }

    pub fn register_factory(
        &mut self,
        name: &str,
        category: FunctionCategory,
        factory: FunctionFactory,
    ) -> Result<(), RegistryError> {
        if !FUNCTION_NAME.is_match(name) {
            return Err(RegistryError::InvalidName(name.to_owned()));
        }
        if BuiltinFunction::lookup(name).is_some() {
            return Err(RegistryError::ReservedName(name.to_owned()));
        }

        let key = name.to_ascii_uppercase();
        let replaced = self
            .functions
            .insert(key, Registration { factory, category })
            .is_some();
        debug!(function = name, %category, replaced, "registered custom DQL function");
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<FunctionFactory> {
        self.functions
            .get(&name.to_ascii_uppercase())
            .map(|r| r.factory)
    }

    pub fn category(&self, name: &str) -> Option<FunctionCategory> {
        self.functions
            .get(&name.to_ascii_uppercase())
            .map(|r| r.category)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_uppercase())
    }

    /// Registered names, upper-cased, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs() {
        let mysql = Registry::mysql();
        assert!(mysql.contains("date_format"));
        assert!(!mysql.contains("NVL2"));

        let oracle = Registry::oracle();
        assert!(oracle.contains("Nvl2"));
        assert!(oracle.contains("EXTRACT"));
        assert!(!oracle.contains("DATE_FORMAT"));

        let defaults = Registry::with_defaults();
        let mut names: Vec<_> = defaults.names().collect();
        names.sort();
        assert_eq!(names, ["DATE_FORMAT", "EXTRACT", "NVL2"]);
    }

    #[test]
    fn categories() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.category("date_format"), Some(FunctionCategory::String));
        assert_eq!(registry.category("EXTRACT"), Some(FunctionCategory::Numeric));
        assert_eq!(registry.category("SOUNDEX"), None);
    }

    #[test]
    fn rejects_builtin_names() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.register_kind("lower", FunctionKind::Nvl2, FunctionCategory::String),
            Err(RegistryError::ReservedName("lower".into()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_malformed_names() {
        let mut registry = Registry::new();
        for name in ["", "1NVL", "NVL-2", "u.nvl", "NVL2 "] {
            assert_eq!(
                registry.register_kind(name, FunctionKind::Nvl2, FunctionCategory::String),
                Err(RegistryError::InvalidName(name.into())),
                "{name:?}"
            );
        }
    }

    #[test]
    fn aliases_and_replacement() {
        let mut registry = Registry::new();
        registry
            .register_kind("ifnotnull", FunctionKind::Nvl2, FunctionCategory::String)
            .expect("a valid name");
        registry
            .register_kind("IFNOTNULL", FunctionKind::Extract, FunctionCategory::Numeric)
            .expect("a valid name");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.category("IfNotNull"), Some(FunctionCategory::Numeric));
    }

    #[test]
    fn from_config() {
        let mut config = Config::with_defaults();
        config
            .datetime_functions
            .insert("year_of".into(), FunctionKind::Extract);
        let registry = Registry::from_config(&config).expect("a valid config");
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.category("YEAR_OF"), Some(FunctionCategory::Datetime));
        assert_eq!(registry.category("NVL2"), Some(FunctionCategory::String));

        config
            .string_functions
            .insert("trim".into(), FunctionKind::Nvl2);
        assert_eq!(
            Registry::from_config(&config).unwrap_err(),
            RegistryError::ReservedName("trim".into())
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_json() {
        let config: Config = serde_json::from_str(
            r#"{"numeric_functions": {"year_of": "EXTRACT"}, "string_functions": {"ifnotnull": "NVL2"}}"#,
        )
        .expect("a valid config");
        assert!(config.datetime_functions.is_empty());
        assert_eq!(config.numeric_functions["year_of"], FunctionKind::Extract);

        let registry = Registry::from_config(&config).expect("valid names");
        assert_eq!(registry.category("YEAR_OF"), Some(FunctionCategory::Numeric));
        assert_eq!(registry.category("IfNotNull"), Some(FunctionCategory::String));

        let defaults = Config::with_defaults();
        let json = serde_json::to_string(&defaults).expect("serializable");
        assert!(json.contains(r#""DATE_FORMAT":"DATE_FORMAT""#), "{json}");
        assert_eq!(serde_json::from_str::<Config>(&json).expect("a valid config"), defaults);
    }

    #[test]
    fn kinds_parse_from_names() {
        assert_eq!("nvl2".parse::<FunctionKind>(), Ok(FunctionKind::Nvl2));
        assert_eq!("Date_Format".parse::<FunctionKind>(), Ok(FunctionKind::DateFormat));
        assert!("soundex".parse::<FunctionKind>().is_err());
        assert_eq!("DATETIME".parse::<FunctionCategory>(), Ok(FunctionCategory::Datetime));
    }
}
