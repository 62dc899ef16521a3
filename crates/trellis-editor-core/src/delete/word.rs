use unicode_segmentation::UnicodeSegmentation;

use super::segment::record_removed;
use super::{DeleteResult, DeleteStepContext};
use crate::error::{ModelError, Result};
use crate::execute::EntityRemoval;
use crate::model::SegmentKind;

pub fn backward_delete_word(ctx: &mut DeleteStepContext<'_>) -> Result<DeleteResult> {
    delete_word(ctx, false)
}

pub fn forward_delete_word(ctx: &mut DeleteStepContext<'_>) -> Result<DeleteResult> {
    delete_word(ctx, true)
}

fn is_word(part: &str) -> bool {
    part.chars().any(|c| c.is_alphanumeric() || c == '_')
}

/// Number of chars a word delete removes from `text`, counting outward from
/// the caret at its end (backward) or start (forward).
///
/// Works on word-bound parts: backward skips separators and then takes the
/// word before them; forward takes the rest of the word and then the
/// separators after it.
fn word_span(text: &str, forward: bool) -> usize {
    let mut parts: Vec<&str> = text.split_word_bounds().collect();
    if !forward {
        parts.reverse();
    }
    let len = |part: &str| part.chars().count();
    let mut parts = parts.into_iter().peekable();
    let mut n = 0;
    if forward {
        if let Some(word) = parts.next_if(|p| is_word(p)) {
            n += len(word);
        }
        while let Some(separator) = parts.next_if(|p| !is_word(p)) {
            n += len(separator);
        }
    } else {
        while let Some(separator) = parts.next_if(|p| !is_word(p)) {
            n += len(separator);
        }
        if let Some(word) = parts.next_if(|p| is_word(p)) {
            n += len(word);
        }
    }
    n
}

/// Delete to the next word boundary, scanning the run of text segments next
/// to the caret. Anything that is not text ends the run.
fn delete_word(ctx: &mut DeleteStepContext<'_>, forward: bool) -> Result<DeleteResult> {
    let location = &ctx.insert_point.paragraph;
    let marker = ctx.insert_point.marker_index;
    let paragraph = ctx
        .model
        .paragraph_at_mut(location)
        .ok_or_else(|| ModelError::NotAParagraph(location.clone()))?;

    // Indices of the adjacent text run, nearest to the caret first.
    let run: Vec<usize> = if forward {
        (marker + 1..paragraph.segments.len())
            .take_while(|&i| paragraph.segments[i].as_text().is_some())
            .collect()
    } else {
        (0..marker)
            .rev()
            .take_while(|&i| paragraph.segments[i].as_text().is_some())
            .collect()
    };
    if run.is_empty() {
        return Ok(DeleteResult::NotDeleted);
    }

    let mut in_order = run.clone();
    if !forward {
        in_order.reverse();
    }
    let text: String = in_order
        .iter()
        .filter_map(|&i| paragraph.segments[i].as_text())
        .collect();
    let mut remaining = word_span(&text, forward);
    if remaining == 0 {
        return Ok(DeleteResult::NotDeleted);
    }

    let mut cuts: Vec<(usize, usize)> = Vec::new();
    for &i in &run {
        if remaining == 0 {
            break;
        }
        let len = paragraph.segments[i].len();
        let take = remaining.min(len);
        cuts.push((i, take));
        remaining -= take;
    }

    cuts.sort_by(|a, b| b.0.cmp(&a.0));
    for (index, take) in cuts {
        let segment = &mut paragraph.segments[index];
        let SegmentKind::Text(text) = &mut segment.kind else {
            continue;
        };
        let count = text.chars().count();
        if take >= count {
            paragraph.segments.remove(index);
        } else if forward {
            *text = text.chars().skip(take).collect();
        } else {
            *text = text.chars().take(count - take).collect();
        }
    }

    paragraph.is_implicit = false;
    tracing::trace!(target: "trellis::delete", forward, "deleted word");
    Ok(DeleteResult::Range)
}

/// Remove everything before the caret in its paragraph.
pub fn delete_all_segments_before(ctx: &mut DeleteStepContext<'_>) -> Result<DeleteResult> {
    let location = &ctx.insert_point.paragraph;
    let marker = ctx.insert_point.marker_index;
    let paragraph = ctx
        .model
        .paragraph_at_mut(location)
        .ok_or_else(|| ModelError::NotAParagraph(location.clone()))?;
    if marker == 0 || marker > paragraph.segments.len() {
        return Ok(DeleteResult::NotDeleted);
    }

    for removed in paragraph.segments.drain(..marker).collect::<Vec<_>>() {
        record_removed(ctx.format_context, &removed, EntityRemoval::RemoveFromEnd);
    }
    paragraph.is_implicit = false;
    Ok(DeleteResult::Range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backward_span() {
        assert_eq!(word_span("hello world", false), 5);
        assert_eq!(word_span("hello ", false), 6);
        assert_eq!(word_span("foo_bar", false), 7);
        assert_eq!(word_span("a, ", false), 3);
        assert_eq!(word_span("naïve café", false), 4);
    }

    #[test]
    fn test_forward_span() {
        assert_eq!(word_span("hello world", true), 6);
        assert_eq!(word_span("  world", true), 2);
        assert_eq!(word_span("end", true), 3);
    }

    #[test]
    fn test_ideographs_are_single_words() {
        assert_eq!(word_span("你好", false), 1);
        assert_eq!(word_span("你好", true), 1);
    }
}
