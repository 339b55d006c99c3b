// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier derivation.

/// Fixed substitutions applied to semantic names.
///
/// Characters not listed here that are neither ASCII alphanumeric nor `_`
/// become `_`.
pub const SUBSTITUTIONS: [(char, &str); 6] = [
    ('-', "_"),
    (' ', "_"),
    (':', "_"),
    ('(', ""),
    (')', ""),
    ('%', "p"),
];

/// Separator between namespace and sanitized name.
pub const SEPARATOR: char = '_';

/// Replaces every character that is unsafe in an identifier.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if let Some((_, replacement)) = SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            out.push_str(replacement);
        } else if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

/// Returns the identifier of `name` within `namespace`.
///
/// The function is pure: the same pair always yields the same identifier,
/// which is how existing nodes are found again after a restart.
///
/// # Examples
///
/// ```
/// use polltree::reconcile::identifier;
///
/// assert_eq!(identifier("SMA", "Power Today"), "SMA_Power_Today");
/// assert_eq!(identifier("UniFi", "CPU (%)"), "UniFi_CPU_p");
/// assert_eq!(identifier("UniFi", "00:0a:95:9d:68:16"), "UniFi_00_0a_95_9d_68_16");
/// ```
#[must_use]
pub fn identifier(namespace: &str, name: &str) -> String {
    let name = sanitize(name);
    if namespace.is_empty() {
        return name;
    }
    let mut ident = String::with_capacity(namespace.len() + 1 + name.len());
    ident.push_str(namespace);
    ident.push(SEPARATOR);
    ident.push_str(&name);
    ident
}

/// Returns `true` if `namespace` can prefix identifiers unchanged.
#[must_use]
pub fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && sanitize(namespace) == namespace
}
