//! Entity lump and save-block parsing: `{ "key" "value" ... }` blocks applied
//! through [`parse_epair`].

use tracing::debug;

use crate::epair::{parse_epair, EpairTarget};
use crate::error::{EpairError, VmError};
use crate::instance::VmInstance;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Text(String),
}

/// Splits lump text into braces and (optionally quoted) words, skipping
/// whitespace and `//` comments.
struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn skip_blank(&mut self) {
        loop {
            self.rest = self.rest.trim_start();
            if let Some(after) = self.rest.strip_prefix("//") {
                self.rest = after.find('\n').map_or("", |i| &after[i + 1..]);
            } else {
                break;
            }
        }
    }
}

/// Byte offset of the quote closing a quoted token. A backslash escapes the
/// character after it.
fn quoted_end(body: &str) -> usize {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return i,
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    bytes.len()
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.skip_blank();
        let mut chars = self.rest.chars();
        let first = chars.next()?;
        match first {
            '{' => {
                self.rest = chars.as_str();
                Some(Token::Open)
            }
            '}' => {
                self.rest = chars.as_str();
                Some(Token::Close)
            }
            '"' => {
                let body = chars.as_str();
                let end = quoted_end(body);
                let text = body[..end].to_string();
                self.rest = body.get(end + 1..).unwrap_or("");
                Some(Token::Text(text))
            }
            _ => {
                let end = self
                    .rest
                    .find(|c: char| c.is_whitespace() || c == '{' || c == '}' || c == '"')
                    .unwrap_or(self.rest.len());
                let text = self.rest[..end].to_string();
                self.rest = &self.rest[end..];
                Some(Token::Text(text))
            }
        }
    }
}

/// Reads `"key" "value"` pairs up to the closing brace of the current block.
fn read_pairs(tokens: &mut Tokenizer<'_>) -> Result<Vec<(String, String)>, EpairError> {
    let mut pairs = Vec::new();
    loop {
        let key = match tokens.next() {
            Some(Token::Close) => return Ok(pairs),
            Some(Token::Text(key)) => key,
            Some(Token::Open) => return Err(EpairError::Syntax("unexpected {".into())),
            None => return Err(EpairError::Syntax("EOF without closing brace".into())),
        };
        let value = match tokens.next() {
            Some(Token::Text(value)) => value,
            Some(_) => return Err(EpairError::Syntax("closing brace without data".into())),
            None => return Err(EpairError::Syntax("EOF without closing brace".into())),
        };
        pairs.push((key, value));
    }
}

fn expect_open(tokens: &mut Tokenizer<'_>) -> Result<bool, EpairError> {
    match tokens.next() {
        None => Ok(false),
        Some(Token::Open) => Ok(true),
        Some(Token::Close) => Err(EpairError::Syntax("found } when expecting {".into())),
        Some(Token::Text(t)) => Err(EpairError::Syntax(format!("found {t} when expecting {{"))),
    }
}

/// Applies `pairs` to entity `num`. Editor-only keys (leading `_`) are
/// skipped, `angle` is stored as `angles`, and keys that name no field are
/// ignored.
pub fn apply_entity_pairs(vm: &mut VmInstance, num: usize, pairs: &[(String, String)]) -> Result<(), EpairError> {
    for (key, value) in pairs {
        if key.starts_with('_') {
            continue;
        }

        let (key, value) = if key == "angle" {
            ("angles", format!("0 {value} 0"))
        } else {
            (key.as_str(), value.clone())
        };

        let Some(def) = vm.find_field(key).copied() else {
            debug!(key, "not a field");
            continue;
        };

        match parse_epair(vm, EpairTarget::Entity(num), def, &value) {
            Ok(()) => {}
            Err(e) if !e.is_fatal() => debug!(key, error = %e, "skipped entity key"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Parses a whole entity lump, filling one record per block starting at the
/// next free entity (entity 0 is the world). Returns the entity numbers used.
pub fn parse_entity_lump(vm: &mut VmInstance, text: &str) -> Result<Vec<usize>, VmError> {
    let mut tokens = Tokenizer::new(text);
    let mut spawned = Vec::new();

    while expect_open(&mut tokens)? {
        let pairs = read_pairs(&mut tokens)?;
        let num = vm.alloc_entity()?;
        apply_entity_pairs(vm, num, &pairs)?;
        spawned.push(num);
    }

    debug!(entities = spawned.len(), "entity lump parsed");
    Ok(spawned)
}

/// Applies `pairs` to globals by name; unknown names are skipped. Returns how
/// many pairs were stored.
pub fn apply_global_pairs(vm: &mut VmInstance, pairs: &[(String, String)]) -> Result<usize, EpairError> {
    let mut applied = 0;
    for (key, value) in pairs {
        let Some(def) = vm.find_global(key).copied() else {
            debug!(key, "not a global");
            continue;
        };
        match parse_epair(vm, EpairTarget::Globals, def, value) {
            Ok(()) => applied += 1,
            Err(e) if !e.is_fatal() => debug!(key, error = %e, "skipped global"),
            Err(e) => return Err(e),
        }
    }
    Ok(applied)
}

/// Reads one `{ }` block of globals, as written by
/// [`write_globals`](crate::save::write_globals).
pub fn parse_globals(vm: &mut VmInstance, text: &str) -> Result<usize, EpairError> {
    let mut tokens = Tokenizer::new(text);
    if !expect_open(&mut tokens)? {
        return Ok(0);
    }
    let pairs = read_pairs(&mut tokens)?;
    apply_global_pairs(vm, &pairs)
}

/// Reads one `{ }` block into entity `num`, as written by
/// [`write_entity`](crate::save::write_entity).
pub fn parse_entity(vm: &mut VmInstance, num: usize, text: &str) -> Result<(), EpairError> {
    let mut tokens = Tokenizer::new(text);
    if !expect_open(&mut tokens)? {
        return Err(EpairError::Syntax("expected {".into()));
    }
    let pairs = read_pairs(&mut tokens)?;
    vm.entities_mut().clear_entity(num)?;
    apply_entity_pairs(vm, num, &pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        Tokenizer::new(text).collect()
    }

    #[test]
    fn test_tokenizer_quoted_and_bare() {
        assert_eq!(
            tokens("{ \"classname\" \"worldspawn\" wad gfx.wad }"),
            vec![
                Token::Open,
                Token::Text("classname".into()),
                Token::Text("worldspawn".into()),
                Token::Text("wad".into()),
                Token::Text("gfx.wad".into()),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_tokenizer_skips_comments() {
        assert_eq!(
            tokens("// header\n{\n// inner\n\"a\" \"b\"}"),
            vec![
                Token::Open,
                Token::Text("a".into()),
                Token::Text("b".into()),
                Token::Close
            ]
        );
    }

    #[test]
    fn test_quoted_brace_is_text() {
        assert_eq!(tokens("\"{\""), vec![Token::Text("{".into())]);
    }

    #[test]
    fn test_escaped_quote_stays_in_token() {
        assert_eq!(
            tokens(r#""message" "say \"hi\" C:\\q" }"#),
            vec![
                Token::Text("message".into()),
                Token::Text(r#"say \"hi\" C:\\q"#.into()),
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_read_pairs_rejects_dangling_key() {
        let mut t = Tokenizer::new("\"origin\" }");
        assert!(matches!(read_pairs(&mut t), Err(EpairError::Syntax(_))));
        let mut t = Tokenizer::new("\"origin\" \"1 2 3\"");
        assert!(matches!(read_pairs(&mut t), Err(EpairError::Syntax(_))));
    }
}
