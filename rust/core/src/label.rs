// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Label ordering used for display and export.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

/// Natural label order.
///
/// Labels split into alternating text and digit runs. Text runs compare
/// case-insensitively, digit runs by numeric value, so `A < AA < AB < B`
/// and `05-9 < 05-100`. Labels with equal keys fall back to a plain byte
/// comparison, keeping the order total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Runs::new(a);
    let mut right = Runs::new(b);
    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => cmp_run(x, y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

fn cmp_run(a: &str, b: &str) -> Ordering {
    match (is_digits(a), is_digits(b)) {
        (true, true) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase)),
    }
}

fn is_digits(run: &str) -> bool {
    run.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Maximal runs of ASCII digits and of everything else.
struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Runs<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Runs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let digits = is_digits(self.rest);
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .bytes()
            .position(|b| b.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(run)
    }
}

/// Sorts labels in natural order.
pub fn natural_sort<S: AsRef<str>>(labels: &mut [S]) {
    labels.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

/// Extracts the bundle number from labels like `B1`, `B 12` or
/// `B2 (2x4 Gar)`.
pub fn bundle_number(label: &str) -> Option<u32> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"B\s*(\d+)").expect("static pattern"));
    re.captures(label)?.get(1)?.as_str().parse().ok()
}
