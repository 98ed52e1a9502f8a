//! Backtick code fences inside a comment body.
//!
//! Suggested content is free text and may contain lines that look like
//! protocol lines (`**Status:** ...`, `- [ ] Apply this change`). Protocol
//! lookups only consider matches outside fenced blocks.

use std::ops::Range;

use regex::{Captures, Regex};

/// Byte ranges of every fenced block, fence lines included.
///
/// A fence opens with three or more backticks and closes at the next line
/// made only of at least as many backticks. An unclosed fence runs to the
/// end of the body.
pub(crate) fn fenced_ranges(body: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<(usize, usize)> = None;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        let text = line.trim_end_matches(&['\n', '\r'][..]);
        let trimmed = text.trim_start();
        let ticks = trimmed.len() - trimmed.trim_start_matches('`').len();
        match open {
            None if ticks >= 3 => open = Some((offset, ticks)),
            Some((start, width)) if ticks >= width && trimmed.trim_end().len() == ticks => {
                ranges.push(start..offset + line.len());
                open = None;
            }
            _ => {}
        }
        offset += line.len();
    }
    if let Some((start, _)) = open {
        ranges.push(start..body.len());
    }
    ranges
}

/// First match of `re` that starts outside every fenced block.
pub(crate) fn first_unfenced<'h>(re: &Regex, body: &'h str) -> Option<Captures<'h>> {
    let fenced = fenced_ranges(body);
    re.captures_iter(body).find(|caps| {
        caps.get(0)
            .is_some_and(|m| !fenced.iter().any(|r| r.contains(&m.start())))
    })
}
