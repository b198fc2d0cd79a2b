/// Functions the DQL grammar knows natively. Custom functions may not be
///  registered under any of these names.
#[allow(non_camel_case_types)]
#[derive(strum_macros::Display, strum_macros::EnumString, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum BuiltinFunction {
    ABS,
    AVG,
    BIT_AND,
    BIT_OR,
    COALESCE,
    CONCAT,
    COUNT,
    CURRENT_DATE,
    CURRENT_TIME,
    CURRENT_TIMESTAMP,
    DATE_ADD,
    DATE_DIFF,
    DATE_SUB,
    IDENTITY,
    LENGTH,
    LOCATE,
    LOWER,
    MAX,
    MIN,
    MOD,
    NULLIF,
    SIZE,
    SQRT,
    SUBSTRING,
    SUM,
    TRIM,
    UPPER,
}

impl BuiltinFunction {
    pub fn lookup(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}
