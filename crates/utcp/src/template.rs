//! `${name}` placeholder substitution.
//!
//! Placeholders are resolved against two mappings: the client's environment
//! variables first, then the call parameters. A placeholder that neither
//! mapping knows is left verbatim. Inserted values are never re-scanned, so
//! a value that itself contains `${...}` cannot trigger further expansion.

use crate::value::Parameters;
use std::collections::BTreeMap;

/// Environment values available to every template (API keys, hosts, ...).
pub type Variables = BTreeMap<String, String>;

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Replace every resolvable `${name}` in `template`.
pub fn substitute(template: &str, environment: &Variables, parameters: &Parameters) -> String {
    scan(template, |name| {
        environment
            .get(name)
            .cloned()
            .or_else(|| parameters.get(name).map(ToString::to_string))
    })
}

/// Names of all placeholders referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    scan(template, |name| {
        names.push(name);
        None
    });
    names
}

/// Whether any placeholder in `template` would be left unresolved.
pub fn has_unresolved(template: &str, environment: &Variables, parameters: &Parameters) -> bool {
    placeholders(template)
        .into_iter()
        .any(|name| !environment.contains_key(name) && !parameters.contains_key(name))
}

/// Walk `template` once, asking `resolve` for each placeholder name.
fn scan<'a>(template: &'a str, mut resolve: impl FnMut(&'a str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];

        let Some(end) = after.find(CLOSE) else {
            // Unterminated: nothing more to resolve.
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        if name.contains(OPEN) {
            // `${a${b}}`: the outer marker is literal text, keep scanning inside.
            out.push('$');
            rest = &rest[start + 1..];
            continue;
        }

        match resolve(name) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + OPEN.len() + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
