//! Counter widgets embedded in block text.
//!
//! A counter shows `value` out of `max`, either as a bar or as a row of
//! tokens. Values are stored as given and clamped for display, with flags
//! recording which clamp applied.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Most tokens a token counter renders.
pub const MAX_TOKENS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStyle {
    Bar,
    Tokens,
}

/// Token grid width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Columns {
    Fixed(i64),
    #[default]
    Unbounded,
}

impl Columns {
    /// Non-numeric text means unbounded.
    pub fn parse(text: &str) -> Self {
        parse_int(text).map_or(Columns::Unbounded, Columns::Fixed)
    }
}

impl fmt::Display for Columns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Columns::Fixed(columns) => write!(f, "{columns}"),
            Columns::Unbounded => f.write_str("Infinity"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterFlags {
    pub underflow: bool,
    pub overflow: bool,
    pub invalid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped {
    pub value: i64,
    pub max: i64,
    pub flags: CounterFlags,
}

/// Clamps `max` to at least 1 and `value` into `[0, max]`.
pub fn clamp(value: i64, max: i64) -> Clamped {
    let mut flags = CounterFlags::default();
    let mut value = value;
    if value < 0 {
        flags.underflow = true;
        value = 0;
    }
    let mut max = max;
    if max < 1 {
        flags.invalid = true;
        max = 1;
    }
    if value > max {
        flags.overflow = true;
        value = max;
    }
    Clamped { value, max, flags }
}

/// Leading integer of `text`, read the way HTML attributes are: leading
/// whitespace and an optional sign are accepted, `0x` selects hex and parsing
/// stops at the first non-digit.
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = match rest.get(..2) {
        Some("0x" | "0X") => (16, &rest[2..]),
        _ => (10, rest),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = i64::from_str_radix(&digits[..end], radix).unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// First `a / b` pair in `text`, whitespace around the slash allowed.
pub fn find_ratio(text: &str) -> Option<(i64, i64)> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }
        let first_end = digit_run(bytes, start);
        let mut cursor = skip_whitespace(bytes, first_end);
        if bytes.get(cursor) == Some(&b'/') {
            cursor = skip_whitespace(bytes, cursor + 1);
            let second_end = digit_run(bytes, cursor);
            if second_end > cursor {
                return Some((
                    text[start..first_end].parse().unwrap_or(i64::MAX),
                    text[cursor..second_end].parse().unwrap_or(i64::MAX),
                ));
            }
        }
        start = first_end;
    }
    None
}

fn digit_run(bytes: &[u8], from: usize) -> usize {
    from + bytes[from..]
        .iter()
        .take_while(|byte| byte.is_ascii_digit())
        .count()
}

fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
    from + bytes[from..]
        .iter()
        .take_while(|byte| byte.is_ascii_whitespace())
        .count()
}

type Listener = Rc<dyn Fn(&Counter, i64, i64)>;

pub struct Counter {
    style: CounterStyle,
    value: Cell<i64>,
    max: Cell<i64>,
    columns: Cell<Columns>,
    listeners: RefCell<Vec<Listener>>,
    dispatching: Cell<bool>,
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("style", &self.style)
            .field("value", &self.value.get())
            .field("max", &self.max.get())
            .field("columns", &self.columns.get())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl Counter {
    pub fn new(style: CounterStyle) -> Self {
        Self {
            style,
            value: Cell::new(0),
            max: Cell::new(1),
            columns: Cell::new(Columns::Unbounded),
            listeners: RefCell::new(Vec::new()),
            dispatching: Cell::new(false),
        }
    }

    /// Counter for wrapped text: the first `a / b` in `text` sets value and
    /// maximum, `0 / 1` otherwise.
    pub fn from_selection_text(style: CounterStyle, text: &str) -> Self {
        let counter = Self::new(style);
        let (value, max) = find_ratio(text).unwrap_or((0, 1));
        counter.max.set(max);
        counter.value.set(value);
        counter
    }

    /// Text replacing the counter when it is unwrapped.
    pub fn to_text(&self) -> String {
        format!("{} / {}", self.value.get(), self.max.get())
    }

    pub fn style(&self) -> CounterStyle {
        self.style
    }

    pub fn value(&self) -> i64 {
        self.value.get()
    }

    pub fn max(&self) -> i64 {
        self.max.get()
    }

    pub fn columns(&self) -> Columns {
        self.columns.get()
    }

    pub fn clamped(&self) -> Clamped {
        clamp(self.value.get(), self.max.get())
    }

    pub fn set_value(&self, value: i64) {
        self.value.set(value);
        self.notify();
    }

    pub fn set_max(&self, max: i64) {
        self.max.set(max);
        self.notify();
    }

    /// Sets both from an edit dialog, notifying once.
    pub fn set_properties(&self, value: i64, max: i64) {
        self.max.set(max);
        self.value.set(value);
        self.notify();
    }

    /// Attribute style setter; unparsable text reads as 0.
    pub fn set_value_text(&self, text: &str) {
        self.set_value(parse_int(text).unwrap_or(0));
    }

    pub fn set_max_text(&self, text: &str) {
        self.set_max(parse_int(text).unwrap_or(0));
    }

    pub fn set_columns(&self, columns: Columns) {
        self.columns.set(columns);
    }

    /// Registers `listener` for `(value, max)` updates.
    pub fn on_properties_updated(&self, listener: impl Fn(&Counter, i64, i64) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Caption shown on bar counters.
    pub fn caption(&self) -> String {
        self.to_text()
    }

    /// Filled share of a bar counter, in percent.
    pub fn bar_percent(&self) -> f64 {
        let clamped = self.clamped();
        100.0 * clamped.value as f64 / clamped.max as f64
    }

    /// Fill state of each token.
    /// Fill state per token, at most [`MAX_TOKENS`] of them.
    pub fn tokens(&self) -> Vec<bool> {
        let clamped = self.clamped();
        (0..clamped.max.min(MAX_TOKENS))
            .map(|index| index < clamped.value)
            .collect()
    }

    /// Clicking token `index` fills up to it; the first token toggles.
    pub fn click_token(&self, index: usize) {
        if index == 0 {
            self.set_value(if self.value.get() == 1 { 0 } else { 1 });
        } else {
            self.set_value(index as i64 + 1);
        }
    }

    /// CSS `grid-template-columns` for the token grid.
    pub fn grid_template_columns(&self) -> Option<String> {
        match self.columns.get() {
            Columns::Fixed(columns) => Some(format!("repeat({columns}, 2em)")),
            Columns::Unbounded => None,
        }
    }

    pub fn grid_auto_flow(&self) -> &'static str {
        match self.columns.get() {
            Columns::Fixed(_) => "row",
            Columns::Unbounded => "column",
        }
    }

    fn notify(&self) {
        if self.dispatching.replace(true) {
            return;
        }
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(self, self.value.get(), self.max.get());
        }
        self.dispatching.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_flags() {
        assert_eq!(
            clamp(-3, 5),
            Clamped {
                value: 0,
                max: 5,
                flags: CounterFlags {
                    underflow: true,
                    ..Default::default()
                },
            }
        );
        let clamped = clamp(7, 0);
        assert_eq!((clamped.value, clamped.max), (1, 1));
        assert!(clamped.flags.invalid && clamped.flags.overflow);
        assert_eq!(clamp(2, 4).flags, CounterFlags::default());
    }

    #[test]
    fn test_parse_int_reads_leading_integer() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  -7 apples"), Some(-7));
        assert_eq!(parse_int("3.9"), Some(3));
        assert_eq!(parse_int("0x1A"), Some(26));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_text_setters_default_to_zero() {
        let counter = Counter::new(CounterStyle::Bar);
        counter.set_value_text("abc");
        assert_eq!(counter.value(), 0);
        counter.set_max_text("nope");
        assert_eq!(counter.max(), 0);
        assert!(counter.clamped().flags.invalid);
        assert_eq!(counter.clamped().max, 1);
    }

    #[test]
    fn test_wrap_and_unwrap_text() {
        let counter = Counter::from_selection_text(CounterStyle::Tokens, "HP 12 /  20 left");
        assert_eq!((counter.value(), counter.max()), (12, 20));
        assert_eq!(counter.to_text(), "12 / 20");

        let counter = Counter::from_selection_text(CounterStyle::Bar, "no numbers 5 here");
        assert_eq!((counter.value(), counter.max()), (0, 1));
        assert_eq!(find_ratio("1 2/3"), Some((2, 3)));
    }

    #[test]
    fn test_token_fill_and_first_token_toggle() {
        let counter = Counter::new(CounterStyle::Tokens);
        counter.set_properties(2, 4);
        assert_eq!(counter.tokens(), vec![true, true, false, false]);

        counter.click_token(3);
        assert_eq!(counter.value(), 4);
        counter.click_token(0);
        assert_eq!(counter.value(), 1);
        counter.click_token(0);
        assert_eq!(counter.value(), 0);
        assert_eq!(counter.tokens(), vec![false; 4]);
    }

    #[test]
    fn test_huge_ratio_renders_capped_tokens() {
        let counter = Counter::from_selection_text(CounterStyle::Tokens, "1 / 99999999999");
        assert_eq!(counter.max(), 99_999_999_999);
        let tokens = counter.tokens();
        assert_eq!(tokens.len(), MAX_TOKENS as usize);
        assert_eq!(tokens.iter().filter(|filled| **filled).count(), 1);
    }

    #[test]
    fn test_bar_percent_uses_clamped_values() {
        let counter = Counter::new(CounterStyle::Bar);
        counter.set_properties(3, 4);
        assert_eq!(counter.bar_percent(), 75.0);
        counter.set_value(9);
        assert_eq!(counter.bar_percent(), 100.0);
        assert_eq!(counter.caption(), "9 / 4");
    }

    #[test]
    fn test_columns_layout() {
        let counter = Counter::new(CounterStyle::Tokens);
        assert_eq!(counter.grid_auto_flow(), "column");
        assert_eq!(counter.grid_template_columns(), None);
        counter.set_columns(Columns::parse("3"));
        assert_eq!(counter.grid_auto_flow(), "row");
        assert_eq!(
            counter.grid_template_columns().as_deref(),
            Some("repeat(3, 2em)")
        );
        assert_eq!(Columns::parse("wide"), Columns::Unbounded);
        assert_eq!(Columns::Unbounded.to_string(), "Infinity");
    }

    #[test]
    fn test_listener_updates_do_not_reenter() {
        let counter = Counter::new(CounterStyle::Bar);
        counter.set_max(10);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        counter.on_properties_updated(move |counter, value, _max| {
            seen.set(seen.get() + 1);
            counter.set_value(value + 1);
        });

        counter.set_value(3);
        assert_eq!(calls.get(), 1);
        assert_eq!(counter.value(), 4);

        counter.set_value(0);
        assert_eq!(calls.get(), 2);
        assert_eq!(counter.value(), 1);
    }
}
