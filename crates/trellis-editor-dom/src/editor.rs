//! The editor facade.
//!
//! [`Editor`] owns a document and the render tree it is synchronized into.
//! Every edit follows the same cycle: read the host selection back into the
//! model, run a [`ModelMutation`], report flags to the undo collaborator,
//! resync the tree and restore the selection, then publish notifications.

use trellis_editor_core::entity::{
    adjust_selection_around_entity, handle_enter_inline_entity,
    handle_key_down_in_block_delimiter, prevent_type_in_delimiter,
};
use trellis_editor_core::{
    Block, BlockLocation, ChangeSource, DelimiterOwner, Document, EditorOptions, EntityOperation,
    EntityRemoval, ExperimentalFeature, FormatContext, IndexEntry, InputEvent, Key, KeyboardEvent,
    KeydownResult, ModelError, ModelMutation, Notification, NotificationSink, Paragraph, Platform,
    RawEvent, RecordingSink, RenderIndex, RenderNodeId, RenderTree, RewriteLedger, Segment,
    SegmentLocation, SelectionContext, SnapshotLog, UndoCollaborator, content_model_to_tree,
    execute, keyboard_delete, normalize, set_selection, validate,
};
use web_time::Instant;

use crate::delimiter::{
    DelimiterKeyAction, DelimiterScan, handle_delimiter_content_changed, handle_delimiter_keydown,
};
use crate::dom_sync::{delimiter_position, should_delete_with_model, tree_selection_to_model};
use crate::error::Result;

pub struct Editor<
    T: RenderTree,
    N: NotificationSink = RecordingSink,
    U: UndoCollaborator = SnapshotLog,
> {
    model: Document,
    tree: T,
    root: RenderNodeId,
    options: EditorOptions,
    index: RenderIndex,
    sink: N,
    undo: U,
    platform: Platform,
    /// Set when a mutation left the model out of step with the tree.
    model_stale: bool,
}

impl<T: RenderTree> Editor<T> {
    /// Editor recording its notifications and snapshots in memory.
    pub fn new(
        tree: T,
        root: RenderNodeId,
        model: Document,
        options: EditorOptions,
    ) -> Result<Self> {
        Self::with_collaborators(
            tree,
            root,
            model,
            options,
            RecordingSink::new(),
            SnapshotLog::new(),
        )
    }
}

impl<T: RenderTree, N: NotificationSink, U: UndoCollaborator> Editor<T, N, U> {
    pub fn with_collaborators(
        tree: T,
        root: RenderNodeId,
        mut model: Document,
        options: EditorOptions,
        sink: N,
        undo: U,
    ) -> Result<Self> {
        validate(&model)?;
        normalize(&mut model);
        let platform = Platform::new(options.is_mac);
        let mut editor = Self {
            model,
            tree,
            root,
            options,
            index: RenderIndex::default(),
            sink,
            undo,
            platform,
            model_stale: false,
        };
        editor.sync()?;
        Ok(editor)
    }

    pub fn model(&self) -> &Document {
        &self.model
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Direct access to the host tree, for simulating host edits. Call
    /// [`Editor::on_content_changed`] afterwards.
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn root(&self) -> RenderNodeId {
        self.root
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn index(&self) -> &RenderIndex {
        &self.index
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn undo(&self) -> &U {
        &self.undo
    }

    /// Whether a mutation asked for the model to be rebuilt from the tree.
    pub fn is_model_stale(&self) -> bool {
        self.model_stale
    }

    /// Render the model into the tree and restore its selection there.
    pub fn sync(&mut self) -> Result<RewriteLedger> {
        let result =
            content_model_to_tree(&mut self.tree, self.root, &mut self.model, &self.options)?;
        self.index = result.index;
        self.tree.set_selection(result.selection);
        Ok(result.ledger)
    }

    /// Pull the host selection into the model. A selection outside the
    /// rendered content leaves the model's own selection in place.
    fn sync_selection_from_tree(&mut self) -> Result<()> {
        let Some(selection) = self.tree.selection() else {
            return Ok(());
        };
        match tree_selection_to_model(&self.tree, &self.index, &self.model, &selection) {
            Some(context) => set_selection(&mut self.model, Some(&context))?,
            None => tracing::debug!(
                target: "trellis::editor",
                ?selection,
                "tree selection not mapped, keeping model selection"
            ),
        }
        Ok(())
    }

    /// Run a mutation against the model with the host selection applied.
    pub fn format_content_model<M: ModelMutation + ?Sized>(
        &mut self,
        mutation: &mut M,
        context: FormatContext,
    ) -> Result<bool> {
        self.sync_selection_from_tree()?;
        self.run_mutation(mutation, context)
    }

    /// Run a mutation against the model selection as it stands.
    fn run_mutation<M: ModelMutation + ?Sized>(
        &mut self,
        mutation: &mut M,
        mut context: FormatContext,
    ) -> Result<bool> {
        let changed = execute(&mut self.model, &mut context, mutation)?;
        self.finish_mutation(changed, context)?;
        Ok(changed)
    }

    /// Put the model caret just outside the entity owning `delimiter`.
    ///
    /// A block entity gets a block boundary, which hosts the caret in a new
    /// implicit paragraph beside it. `false` if the last sync did not
    /// produce `delimiter`.
    fn place_model_caret_outside(&mut self, delimiter: RenderNodeId) -> Result<bool> {
        let Some(IndexEntry::Delimiter { owner, before }) = self.index.get(delimiter) else {
            return Ok(false);
        };
        let caret = delimiter_position(owner, *before);
        set_selection(&mut self.model, Some(&SelectionContext::caret(caret)))?;
        Ok(true)
    }

    fn finish_mutation(&mut self, changed: bool, context: FormatContext) -> Result<()> {
        self.undo.record_mutation(context.flags());
        if context.clear_model_cache {
            self.model_stale = true;
        }
        for deleted in &context.deleted_entities {
            let operation = match deleted.removal {
                EntityRemoval::RemoveFromStart => EntityOperation::RemoveFromStart,
                EntityRemoval::RemoveFromEnd => EntityOperation::RemoveFromEnd,
                EntityRemoval::Overwrite => EntityOperation::Overwrite,
            };
            self.sink.publish(Notification::EntityOperation {
                operation,
                entity: deleted.entity.clone(),
                raw_event: context.raw_event.clone(),
            });
        }
        if changed {
            let ledger = self.sync()?;
            self.sink.publish(Notification::ContentChanged {
                source: context.change_source,
                raw_event: context.raw_event,
                ledger,
                timestamp: Instant::now(),
            });
        }
        Ok(())
    }

    /// Replace the whole document.
    pub fn set_content(&mut self, mut model: Document) -> Result<()> {
        validate(&model)?;
        normalize(&mut model);
        self.model = model;
        self.model_stale = false;
        let ledger = self.sync()?;
        self.sink.publish(Notification::ContentChanged {
            source: ChangeSource::SetContent,
            raw_event: None,
            ledger,
            timestamp: Instant::now(),
        });
        Ok(())
    }

    pub fn handle_keydown(&mut self, event: &KeyboardEvent) -> Result<KeydownResult> {
        if event.is_composing {
            return Ok(KeydownResult::PassThrough);
        }
        // Deletes go to the model before any delimiter handling. A caret in a
        // block delimiter reads back as a boundary beside the entity, so the
        // delete pipeline removes the entity as one unit.
        if matches!(event.key, Key::Backspace | Key::Delete) {
            return self.handle_delete(event.clone().into());
        }

        let raw_event: RawEvent = event.clone().into();
        match handle_delimiter_keydown(&mut self.tree, event) {
            DelimiterKeyAction::None => Ok(KeydownResult::NotHandled),
            DelimiterKeyAction::LeftInlineDelimiter => {
                self.undo.take_snapshot();
                Ok(KeydownResult::PassThrough)
            }
            DelimiterKeyAction::BlockDelimiter { delimiter, enter } => {
                // The host caret now sits beside the container, which reads
                // back as the edge of a neighbouring paragraph.
                if !self.place_model_caret_outside(delimiter)? {
                    return Ok(KeydownResult::PassThrough);
                }
                let context =
                    FormatContext::new(ChangeSource::EntityDelimiter).with_raw_event(raw_event);
                let changed = self.run_mutation(
                    &mut |doc: &mut Document, _: &mut FormatContext| {
                        handle_key_down_in_block_delimiter(doc)
                    },
                    context,
                )?;
                Ok(if enter && changed {
                    KeydownResult::Handled
                } else {
                    KeydownResult::PassThrough
                })
            }
            DelimiterKeyAction::EnterInlineEntity { delimiter } => {
                if !self
                    .options
                    .is_feature_enabled(ExperimentalFeature::HandleEnterKey)
                {
                    return Ok(KeydownResult::PassThrough);
                }
                if !self.place_model_caret_outside(delimiter)? {
                    return Ok(KeydownResult::PassThrough);
                }
                let context = FormatContext::new(ChangeSource::Keyboard).with_raw_event(raw_event);
                let changed = self.run_mutation(
                    &mut |doc: &mut Document, _: &mut FormatContext| {
                        handle_enter_inline_entity(doc)
                    },
                    context,
                )?;
                Ok(if changed {
                    KeydownResult::Handled
                } else {
                    KeydownResult::PassThrough
                })
            }
            DelimiterKeyAction::AdjustSelection { key, shift } => {
                self.sync_selection_from_tree()?;
                if !adjust_selection_around_entity(&mut self.model, &key, shift)? {
                    return Ok(KeydownResult::NotHandled);
                }
                self.sync()?;
                Ok(KeydownResult::Handled)
            }
            DelimiterKeyAction::ClickEntity(entity) => {
                self.sink.publish(Notification::EntityOperation {
                    operation: EntityOperation::Click,
                    entity,
                    raw_event: Some(raw_event),
                });
                Ok(KeydownResult::Handled)
            }
        }
    }

    pub fn handle_beforeinput(&mut self, event: &InputEvent) -> Result<KeydownResult> {
        if !event.input_type.is_deletion() {
            return Ok(KeydownResult::NotHandled);
        }
        self.handle_delete(event.clone().into())
    }

    fn handle_delete(&mut self, raw_event: RawEvent) -> Result<KeydownResult> {
        let Some(selection) = self.tree.selection() else {
            return Ok(KeydownResult::NotHandled);
        };
        if !should_delete_with_model(&self.tree, &selection, &raw_event, &self.platform) {
            return Ok(KeydownResult::PassThrough);
        }
        self.sync_selection_from_tree()?;
        let mut context =
            FormatContext::new(ChangeSource::Keyboard).with_raw_event(raw_event.clone());
        let changed = keyboard_delete(
            &mut self.model,
            &raw_event,
            &self.platform,
            &mut context,
            &mut self.sink,
        )?;
        let prevent_default = context.prevent_default;
        self.finish_mutation(changed, context)?;
        Ok(if changed || prevent_default {
            KeydownResult::Handled
        } else {
            KeydownResult::NotHandled
        })
    }

    /// Rescan delimiters after the host changed the tree, and move any text
    /// typed into them back into the model.
    pub fn on_content_changed(&mut self) -> Result<DelimiterScan> {
        let scan = handle_delimiter_content_changed(&mut self.tree, self.root, &self.options)?;
        let mut inline = Vec::new();
        let mut block = Vec::new();
        for excised in &scan.excised {
            match self.index.get(excised.node) {
                Some(IndexEntry::Delimiter {
                    owner: DelimiterOwner::Inline(location),
                    before,
                }) => inline.push((location.clone(), !*before, excised.text.clone())),
                Some(IndexEntry::Delimiter {
                    owner: DelimiterOwner::Block(location),
                    before,
                }) => block.push((location.clone(), !*before, excised.text.clone())),
                _ => {}
            }
        }
        if inline.is_empty() && block.is_empty() {
            return Ok(scan);
        }

        // Inline text never shifts block locations, so it goes in first.
        // Within each kind the last position goes first.
        inline.sort_by(|a, b| (&b.0, b.1).cmp(&(&a.0, a.1)));
        block.sort_by(|a, b| (&b.0, b.1).cmp(&(&a.0, a.1)));
        let mut context = FormatContext::new(ChangeSource::EntityDelimiter);
        let changed = execute(
            &mut self.model,
            &mut context,
            &mut |doc: &mut Document,
                  context: &mut FormatContext|
             -> std::result::Result<bool, ModelError> {
                let mut changed = false;
                for (location, after, text) in &inline {
                    changed |= reinsert_inline(doc, location, *after, text);
                }
                for (location, after, text) in &block {
                    changed |= reinsert_block(doc, location, *after, text);
                }
                changed |= prevent_type_in_delimiter(doc, context);
                Ok(changed)
            },
        )?;
        self.finish_mutation(changed, context)?;
        Ok(scan)
    }
}

/// Put text that was typed into an inline delimiter back beside its entity.
fn reinsert_inline(
    doc: &mut Document,
    location: &SegmentLocation,
    after: bool,
    text: &str,
) -> bool {
    let Some(paragraph) = doc.paragraph_at_mut(&location.block) else {
        return false;
    };
    let Some(entity) = paragraph.segments.get(location.index) else {
        return false;
    };
    let segment = Segment::text(text).with_format(entity.format.clone());
    paragraph
        .segments
        .insert(location.index + usize::from(after), segment);
    true
}

/// Text typed beside a block entity becomes a paragraph of its own.
fn reinsert_block(doc: &mut Document, location: &BlockLocation, after: bool, text: &str) -> bool {
    let Some(group) = doc.group_at_mut(&location.group) else {
        return false;
    };
    if location.index >= group.blocks.len() {
        return false;
    }
    let paragraph = Paragraph::with_segments(vec![Segment::text(text)]);
    group
        .blocks
        .insert(location.index + usize::from(after), Block::Paragraph(paragraph));
    true
}
