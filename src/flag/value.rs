//! Flag value types
//!
//! Every registered flag is backed by a [`Value`]. Typed registrations hand
//! back a [`FlagValue`] handle sharing the storage with the registry, so the
//! caller reads the final value after all parse passes have run.

use crate::utils::duration::{format_duration, parse_duration};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A settable flag value.
///
/// `set` is called once per occurrence of the flag, in order, so a value may
/// either keep the last occurrence or accumulate all of them.
pub trait Value {
    /// Parse `raw` and store it.
    fn set(&mut self, raw: &str) -> Result<(), String>;

    /// Current value rendered as a string.
    fn current(&self) -> String;

    /// Boolean flags may appear without a value (`-verbose`).
    fn is_bool_flag(&self) -> bool {
        false
    }
}

/// Shared handle to a flag's storage.
pub struct FlagValue<T> {
    slot: Rc<RefCell<T>>,
}

impl<T> FlagValue<T> {
    pub(crate) fn new(initial: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(initial)),
        }
    }

    /// Run `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.borrow())
    }
}

impl<T: Clone> FlagValue<T> {
    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }
}

impl<T> Clone for FlagValue<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FlagValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FlagValue").field(&*self.slot.borrow()).finish()
    }
}

/// Conversion rules for the built-in scalar flag types.
pub(crate) trait Scalar: Clone + 'static {
    const TYPE_NAME: &'static str;

    fn parse_flag(raw: &str) -> Result<Self, String>;

    fn render(&self) -> String;

    fn is_bool() -> bool {
        false
    }
}

/// Registry-side view of a scalar handle.
pub(crate) struct ScalarValue<T> {
    handle: FlagValue<T>,
}

impl<T: Scalar> ScalarValue<T> {
    pub(crate) fn new(handle: FlagValue<T>) -> Self {
        Self { handle }
    }
}

impl<T: Scalar> Value for ScalarValue<T> {
    fn set(&mut self, raw: &str) -> Result<(), String> {
        let parsed = T::parse_flag(raw)?;
        *self.handle.slot.borrow_mut() = parsed;
        Ok(())
    }

    fn current(&self) -> String {
        self.handle.with(T::render)
    }

    fn is_bool_flag(&self) -> bool {
        T::is_bool()
    }
}

/// Registry-side view of a caller-supplied [`Value`].
pub(crate) struct SharedValue<V> {
    handle: FlagValue<V>,
}

impl<V: Value> SharedValue<V> {
    pub(crate) fn new(handle: FlagValue<V>) -> Self {
        Self { handle }
    }
}

impl<V: Value> Value for SharedValue<V> {
    fn set(&mut self, raw: &str) -> Result<(), String> {
        self.handle.slot.borrow_mut().set(raw)
    }

    fn current(&self) -> String {
        self.handle.with(|v| v.current())
    }

    fn is_bool_flag(&self) -> bool {
        self.handle.with(|v| v.is_bool_flag())
    }
}

/// Parse a boolean the way command-line flags spell them.
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err("parse error".to_string()),
    }
}

/// Split an optional radix prefix off an unsigned digit string.
fn split_radix(digits: &str) -> (u32, &str) {
    let lower = digits.get(..2).map(|p| p.to_ascii_lowercase());
    match lower.as_deref() {
        Some("0x") => (16, &digits[2..]),
        Some("0o") => (8, &digits[2..]),
        Some("0b") => (2, &digits[2..]),
        _ if digits.len() > 1 && digits.starts_with('0') => (8, &digits[1..]),
        _ => (10, digits),
    }
}

fn parse_magnitude(raw: &str, digits: &str) -> Result<u128, String> {
    let (radix, body) = split_radix(digits);
    // Underscores are only permitted between digits of a prefixed literal.
    if body.contains('_') && radix == 10 {
        return Err(format!("invalid syntax {:?}", raw));
    }
    let cleaned: String = body.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() || body.ends_with('_') || body.contains("__") {
        return Err(format!("invalid syntax {:?}", raw));
    }
    u128::from_str_radix(&cleaned, radix).map_err(|_| format!("invalid syntax {:?}", raw))
}

/// Parse a signed integer with optional sign and radix prefix.
pub fn parse_signed(raw: &str) -> Result<i128, String> {
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let magnitude = parse_magnitude(raw, digits)?;
    let value = i128::try_from(magnitude).map_err(|_| format!("value out of range {:?}", raw))?;
    Ok(if negative { -value } else { value })
}

/// Parse an unsigned integer with optional radix prefix.
pub fn parse_unsigned(raw: &str) -> Result<u128, String> {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    parse_magnitude(raw, digits)
}

impl Scalar for bool {
    const TYPE_NAME: &'static str = "bool";

    fn parse_flag(raw: &str) -> Result<Self, String> {
        parse_bool(raw)
    }

    fn render(&self) -> String {
        self.to_string()
    }

    fn is_bool() -> bool {
        true
    }
}

macro_rules! signed_scalar {
    ($ty:ty, $name:expr) => {
        impl Scalar for $ty {
            const TYPE_NAME: &'static str = $name;

            fn parse_flag(raw: &str) -> Result<Self, String> {
                let wide = parse_signed(raw)?;
                <$ty>::try_from(wide).map_err(|_| format!("value out of range {:?}", raw))
            }

            fn render(&self) -> String {
                self.to_string()
            }
        }
    };
}

macro_rules! unsigned_scalar {
    ($ty:ty, $name:expr) => {
        impl Scalar for $ty {
            const TYPE_NAME: &'static str = $name;

            fn parse_flag(raw: &str) -> Result<Self, String> {
                let wide = parse_unsigned(raw)?;
                <$ty>::try_from(wide).map_err(|_| format!("value out of range {:?}", raw))
            }

            fn render(&self) -> String {
                self.to_string()
            }
        }
    };
}

signed_scalar!(isize, "int");
signed_scalar!(i64, "int");
unsigned_scalar!(usize, "uint");
unsigned_scalar!(u64, "uint");

impl Scalar for f64 {
    const TYPE_NAME: &'static str = "float";

    fn parse_flag(raw: &str) -> Result<Self, String> {
        raw.parse::<f64>().map_err(|e| e.to_string())
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl Scalar for String {
    const TYPE_NAME: &'static str = "string";

    fn parse_flag(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }

    fn render(&self) -> String {
        self.clone()
    }
}

impl Scalar for Duration {
    const TYPE_NAME: &'static str = "duration";

    fn parse_flag(raw: &str) -> Result<Self, String> {
        parse_duration(raw)
    }

    fn render(&self) -> String {
        format_duration(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_spellings() {
        for raw in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(parse_bool(raw), Ok(true), "{}", raw);
        }
        for raw in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_bool(raw), Ok(false), "{}", raw);
        }
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn test_parse_signed_radix_prefixes() {
        assert_eq!(parse_signed("42"), Ok(42));
        assert_eq!(parse_signed("-42"), Ok(-42));
        assert_eq!(parse_signed("+7"), Ok(7));
        assert_eq!(parse_signed("0x1F"), Ok(31));
        assert_eq!(parse_signed("0o17"), Ok(15));
        assert_eq!(parse_signed("017"), Ok(15));
        assert_eq!(parse_signed("0b101"), Ok(5));
        assert_eq!(parse_signed("0x_ff"), Ok(255));
        assert_eq!(parse_signed("0"), Ok(0));
        assert!(parse_signed("1_000").is_err());
        assert!(parse_signed("").is_err());
        assert!(parse_signed("-").is_err());
        assert!(parse_signed("12a").is_err());
    }

    #[test]
    fn test_narrowing_rejects_overflow() {
        assert_eq!(<i64 as Scalar>::parse_flag("-9223372036854775808"), Ok(i64::MIN));
        assert!(<i64 as Scalar>::parse_flag("9223372036854775808").is_err());
        assert!(<u64 as Scalar>::parse_flag("-1").is_err());
        assert_eq!(<u64 as Scalar>::parse_flag("0xffffffffffffffff"), Ok(u64::MAX));
    }

    #[test]
    fn test_scalar_value_writes_through_handle() {
        let handle = FlagValue::new(8080usize);
        let mut value = ScalarValue::new(handle.clone());
        value.set("9090").unwrap();
        assert_eq!(handle.get(), 9090);
        assert_eq!(value.current(), "9090");
        assert!(value.set("nope").is_err());
        assert_eq!(handle.get(), 9090);
    }

    #[test]
    fn test_duration_scalar() {
        let handle = FlagValue::new(Duration::from_secs(5));
        let mut value = ScalarValue::new(handle.clone());
        assert_eq!(value.current(), "5s");
        value.set("1m30s").unwrap();
        assert_eq!(handle.get(), Duration::from_secs(90));
    }

    #[derive(Default)]
    struct Tags(Vec<String>);

    impl Value for Tags {
        fn set(&mut self, raw: &str) -> Result<(), String> {
            self.0.extend(raw.split(',').map(str::to_string));
            Ok(())
        }

        fn current(&self) -> String {
            self.0.join(",")
        }
    }

    #[test]
    fn test_shared_value_accumulates() {
        let handle = FlagValue::new(Tags::default());
        let mut value = SharedValue::new(handle.clone());
        value.set("a,b").unwrap();
        value.set("c").unwrap();
        assert_eq!(handle.with(|t| t.0.clone()), vec!["a", "b", "c"]);
        assert!(!value.is_bool_flag());
    }
}
