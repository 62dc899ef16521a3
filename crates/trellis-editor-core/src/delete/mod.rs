//! The delete pipeline.
//!
//! A delete first removes whatever range is selected. If only a caret is
//! selected, an ordered list of [`DeleteStep`]s runs against it; the first
//! step that reports anything other than [`DeleteResult::NotDeleted`] wins
//! and the rest are skipped.

mod collapsed;
mod expanded;
mod list;
mod segment;
mod word;

pub use collapsed::{backward_delete_collapsed_selection, forward_delete_collapsed_selection};
pub use expanded::delete_expanded_selection;
pub use list::delete_list;
pub use word::{backward_delete_word, delete_all_segments_before, forward_delete_word};

use crate::actions::RawEvent;
use crate::error::Result;
use crate::events::{Notification, NotificationSink};
use crate::execute::FormatContext;
use crate::model::{Document, normalize};
use crate::platform::DeleteGesturePolicy;
use crate::selection::{InsertPoint, find_insert_point};

/// Outcome of a delete attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    /// Nothing was handled; the host should run its native behaviour.
    NotDeleted,
    /// The delete was recognised but had no effect (start of document).
    NothingToDelete,
    /// More than a character went: a range, a paragraph boundary, a block.
    Range,
    /// One grapheme or one atomic segment went.
    SingleChar,
}

/// State handed to each step.
pub struct DeleteStepContext<'a> {
    pub model: &'a mut Document,
    pub insert_point: InsertPoint,
    pub format_context: &'a mut FormatContext,
}

pub type DeleteStep = fn(&mut DeleteStepContext<'_>) -> Result<DeleteResult>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSelectionResult {
    pub result: DeleteResult,
    /// Where the caret ended up.
    pub insert_point: Option<InsertPoint>,
}

/// Delete the selection, then run `steps` against the caret until one of
/// them handles it.
pub fn delete_selection(
    model: &mut Document,
    steps: &[DeleteStep],
    format_context: &mut FormatContext,
) -> Result<DeleteSelectionResult> {
    let (mut result, insert_point) = delete_expanded_selection(model, format_context)?;

    if let Some(insert_point) = insert_point {
        let mut ctx = DeleteStepContext {
            model: &mut *model,
            insert_point,
            format_context: &mut *format_context,
        };
        for step in steps {
            if result != DeleteResult::NotDeleted {
                break;
            }
            result = step(&mut ctx)?;
        }
    }

    tracing::debug!(target: "trellis::delete", ?result, "delete selection");
    Ok(DeleteSelectionResult {
        result,
        insert_point: find_insert_point(model),
    })
}

/// The standard step ordering for a delete gesture.
///
/// Backward: line-start (if the gesture asks for it), word (if the gesture
/// asks for it), single character, list outdent. Forward: word, single
/// character.
pub fn delete_steps_for(event: &RawEvent, policy: &dyn DeleteGesturePolicy) -> Vec<DeleteStep> {
    let forward = policy.is_delete_after(event);
    let mut steps: Vec<DeleteStep> = Vec::with_capacity(4);
    if !forward && policy.should_delete_all_segments_before(event) {
        steps.push(delete_all_segments_before);
    }
    if policy.should_delete_word(event) {
        steps.push(if forward {
            forward_delete_word
        } else {
            backward_delete_word
        });
    }
    steps.push(if forward {
        forward_delete_collapsed_selection
    } else {
        backward_delete_collapsed_selection
    });
    if !forward {
        steps.push(delete_list);
    }
    steps
}

/// Translate a delete result into context flags and notifications.
///
/// Returns whether the model changed.
pub fn handle_keyboard_event_result(
    model: &mut Document,
    raw_event: &RawEvent,
    result: DeleteResult,
    context: &mut FormatContext,
    sink: &mut dyn NotificationSink,
) -> bool {
    context.skip_undo_snapshot = true;
    context.clear_model_cache = false;

    match result {
        DeleteResult::NotDeleted => {
            context.clear_model_cache = true;
            false
        }
        DeleteResult::NothingToDelete => {
            context.prevent_default = true;
            false
        }
        DeleteResult::Range | DeleteResult::SingleChar => {
            context.prevent_default = true;
            normalize(model);
            if result == DeleteResult::Range {
                context.skip_undo_snapshot = false;
            }
            sink.publish(Notification::BeforeKeyboardEditing {
                raw_event: raw_event.clone(),
            });
            true
        }
    }
}

/// Run a keyboard or beforeinput delete against the model.
pub fn keyboard_delete(
    model: &mut Document,
    raw_event: &RawEvent,
    policy: &dyn DeleteGesturePolicy,
    context: &mut FormatContext,
    sink: &mut dyn NotificationSink,
) -> Result<bool> {
    let steps = delete_steps_for(raw_event, policy);
    let outcome = delete_selection(model, &steps, context)?;
    Ok(handle_keyboard_event_result(
        model,
        raw_event,
        outcome.result,
        context,
        sink,
    ))
}
