use std::str;

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes).
    String(String),
    /// FITS complex value `(real, imaginary)`.
    Complex(f64, f64),
    /// A value field this crate does not interpret (including the empty,
    /// "undefined" value). Written back verbatim.
    Raw(String),
}

impl Value {
    /// Integer view of the value. Floats with no fractional part count too,
    /// since some writers emit counts as `3.0`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_logical(&self) -> Option<bool> {
        match self {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Logical(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(String::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Parse the 70-byte value field of a card (bytes 10..80).
///
/// Returns the value and the comment following the `/` separator, if any.
/// Text that is not a recognised FITS value comes back as [`Value::Raw`],
/// so every value card survives a read/write cycle.
pub fn parse_value(field: &[u8]) -> (Value, Option<String>) {
    let start = field
        .iter()
        .position(|&b| b != b' ')
        .unwrap_or(field.len());
    let field = &field[start..];

    if field.first() == Some(&b'\'') {
        let (text, rest) = parse_quoted(field);
        return (Value::String(text), comment_after(rest));
    }

    let (value_part, comment) = match field.iter().position(|&b| b == b'/') {
        Some(slash) => (&field[..slash], comment_after(&field[slash..])),
        None => (field, None),
    };
    let text = String::from_utf8_lossy(value_part);
    let text = text.trim();

    (interpret(text), comment)
}

/// Read a quoted string starting at `field[0] == '\''`. Returns the string
/// content (trailing blanks dropped) and the bytes after the closing quote.
fn parse_quoted(field: &[u8]) -> (String, &[u8]) {
    let mut text = String::new();
    let mut i = 1;
    while i < field.len() {
        if field[i] == b'\'' {
            if field.get(i + 1) == Some(&b'\'') {
                text.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            break;
        }
        text.push(field[i] as char);
        i += 1;
    }
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    (text, &field[i.min(field.len())..])
}

/// Extract the comment from bytes that may start with `/`.
fn comment_after(rest: &[u8]) -> Option<String> {
    let slash = rest.iter().position(|&b| b == b'/')?;
    let text = str::from_utf8(&rest[slash + 1..]).ok()?;
    let text = text.strip_prefix(' ').unwrap_or(text).trim_end();
    if text.is_empty() {
        None
    } else {
        Some(String::from(text))
    }
}

fn interpret(text: &str) -> Value {
    match text {
        "T" => return Value::Logical(true),
        "F" => return Value::Logical(false),
        _ => {}
    }

    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        if let Some((re, im)) = inner.split_once(',') {
            if let (Some(re), Some(im)) = (parse_float(re.trim()), parse_float(im.trim())) {
                return Value::Complex(re, im);
            }
        }
    }

    let looks_float = text.contains(['.', 'E', 'e', 'D', 'd']);
    if !looks_float {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Integer(n);
        }
    }
    match parse_float(text) {
        Some(f) => Value::Float(f),
        None => Value::Raw(String::from(text)),
    }
}

/// Parse a float, accepting the Fortran `D` exponent marker.
fn parse_float(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.replace(['D', 'd'], "E").parse::<f64>().ok()
}

/// Serialize a [`Value`] into the 70-byte value field of a card.
///
/// Numbers and logicals are right-justified in the first 20 bytes (card
/// columns 11-30); strings start at the first byte with a quote.
pub fn format_value(value: &Value) -> [u8; 70] {
    let mut buf = [b' '; 70];
    match value {
        Value::Logical(b) => buf[19] = if *b { b'T' } else { b'F' },
        Value::Integer(n) => right_justify(n.to_string().as_bytes(), &mut buf[..20]),
        Value::Float(f) => right_justify(format_float(*f, 20).as_bytes(), &mut buf[..20]),
        Value::String(s) => write_quoted(s, &mut buf),
        Value::Complex(re, im) => {
            let s = format!("({}, {})", format_float(*re, 20), format_float(*im, 20));
            right_justify(s.as_bytes(), &mut buf[..50]);
        }
        Value::Raw(s) => {
            let len = s.len().min(70);
            buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        }
    }
    buf
}

fn right_justify(src: &[u8], dest: &mut [u8]) {
    let len = src.len().min(dest.len());
    let start = dest.len() - len;
    dest[start..].copy_from_slice(&src[..len]);
}

/// Shortest round-tripping representation that fits in `max_len` bytes,
/// always carrying a decimal point or exponent so it reads back as a float.
fn format_float(f: f64, max_len: usize) -> String {
    let short = format!("{f:?}").replace('e', "E");
    if short.len() <= max_len {
        return short;
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{f:.precision$E}");
        if s.len() <= max_len || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

fn write_quoted(s: &str, buf: &mut [u8; 70]) {
    buf[0] = b'\'';
    let mut pos = 1;
    for ch in s.bytes() {
        let width = if ch == b'\'' { 2 } else { 1 };
        if pos + width > 69 {
            break;
        }
        buf[pos] = ch;
        if ch == b'\'' {
            buf[pos + 1] = b'\'';
        }
        pos += width;
    }
    // Strings are padded to at least 8 characters between the quotes.
    pos = pos.max(9);
    buf[pos] = b'\'';
}
