//! The mutation command surface.
//!
//! Every edit is a [`ModelMutation`]: it receives exclusive access to the
//! document plus a [`FormatContext`], and reports whether it changed anything.
//! The context carries the flags the undo collaborator and the host read
//! afterwards.

use smol_str::SmolStr;

use crate::actions::RawEvent;
use crate::error::Result;
use crate::model::{Document, Entity, normalize};

/// What triggered a content change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChangeSource {
    Keyboard,
    #[default]
    Format,
    SetContent,
    /// Delimiter maintenance around entities.
    EntityDelimiter,
    Other(SmolStr),
}

/// How an entity left the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRemoval {
    /// Deleted forward from before the entity.
    RemoveFromStart,
    /// Deleted backward from after the entity.
    RemoveFromEnd,
    /// Covered by a deleted range.
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedEntity {
    pub entity: Entity,
    pub removal: EntityRemoval,
}

/// Flags a mutation leaves for the undo collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationFlags {
    pub skip_undo_snapshot: bool,
    pub clear_model_cache: bool,
}

/// Per-mutation side channel.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    /// The change does not deserve its own undo step.
    pub skip_undo_snapshot: bool,
    /// The cached model no longer matches the render tree; the host is
    /// expected to rebuild it before the next edit.
    pub clear_model_cache: bool,
    /// The host must not run its native handling of the raw event.
    pub prevent_default: bool,
    pub raw_event: Option<RawEvent>,
    pub change_source: ChangeSource,
    pub deleted_entities: Vec<DeletedEntity>,
    pub new_entities: Vec<Entity>,
}

impl FormatContext {
    pub fn new(change_source: ChangeSource) -> Self {
        Self {
            change_source,
            ..Default::default()
        }
    }

    pub fn with_raw_event(mut self, raw_event: RawEvent) -> Self {
        self.raw_event = Some(raw_event);
        self
    }

    pub fn flags(&self) -> MutationFlags {
        MutationFlags {
            skip_undo_snapshot: self.skip_undo_snapshot,
            clear_model_cache: self.clear_model_cache,
        }
    }
}

/// A unit of editing work.
pub trait ModelMutation {
    /// Apply the edit. Returns whether the document changed.
    fn mutate(&mut self, model: &mut Document, context: &mut FormatContext) -> Result<bool>;
}

impl<F> ModelMutation for F
where
    F: FnMut(&mut Document, &mut FormatContext) -> Result<bool>,
{
    fn mutate(&mut self, model: &mut Document, context: &mut FormatContext) -> Result<bool> {
        self(model, context)
    }
}

/// Run a mutation and normalize the document if it reported a change.
pub fn execute<M: ModelMutation + ?Sized>(
    model: &mut Document,
    context: &mut FormatContext,
    mutation: &mut M,
) -> Result<bool> {
    let changed = mutation.mutate(model, context)?;
    if changed {
        normalize(model);
    }
    tracing::debug!(
        target: "trellis::editor",
        changed,
        source = ?context.change_source,
        skip_undo_snapshot = context.skip_undo_snapshot,
        "mutation executed"
    );
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, BlockGroup, Segment};

    #[test]
    fn test_closure_mutation_normalizes() {
        let mut doc = BlockGroup::document()
            .with_blocks(vec![Block::paragraph(vec![Segment::text("a")])]);
        let mut ctx = FormatContext::new(ChangeSource::Format);
        let mut append = |doc: &mut Document, _: &mut FormatContext| -> Result<bool> {
            if let Some(p) = doc.blocks[0].as_paragraph_mut() {
                p.segments.push(Segment::text("b"));
            }
            Ok(true)
        };
        let changed = execute(&mut doc, &mut ctx, &mut append).unwrap();
        assert!(changed);
        assert_eq!(
            doc.blocks[0].as_paragraph().unwrap().segments,
            vec![Segment::text("ab")]
        );
    }

    #[test]
    fn test_unchanged_mutation_skips_normalize() {
        let mut doc = BlockGroup::document().with_blocks(vec![Block::paragraph(vec![
            Segment::text("a"),
            Segment::text("b"),
        ])]);
        let mut ctx = FormatContext::default();
        let mut noop = |_: &mut Document, ctx: &mut FormatContext| -> Result<bool> {
            ctx.skip_undo_snapshot = true;
            Ok(false)
        };
        let changed = execute(&mut doc, &mut ctx, &mut noop).unwrap();
        assert!(!changed);
        assert_eq!(doc.blocks[0].as_paragraph().unwrap().segments.len(), 2);
        assert!(ctx.flags().skip_undo_snapshot);
    }
}
