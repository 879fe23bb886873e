//! # Document Session
//!
//! [`DocumentSession`] is the one context object a document lives in: the attribute tree,
//! its overlays, the counters, the registered controls and the observers. It is created
//! by the embedding application, fed events (document loaded, control focused,
//! selection changed, value edited, attribute deleted) and keeps everything consistent.
//!
//! The session is generic over the [`DocumentSurface`] it draws on, the same way the
//! application facade is generic over its store elsewhere: production code passes the
//! real image view, tests pass a [`crate::overlay::surface::MemSurface`].
//!
//! ## Batching
//!
//! Every change normally ends with a refresh: decorations raised, the surface redrawn,
//! the selection snapshot recomputed. Callers making many changes take an
//! [`UpdateScope`] with [`DocumentSession::begin_update`]. While any scope is alive,
//! counter bookkeeping and refreshes are deferred; dropping the last scope reconciles
//! the counters with one recount and refreshes once.
//!
//! While a document is loading, notifications are suppressed entirely.
//!
//! ## Errors
//!
//! Contract violations (propagating an unrouted node, unknown ids) are returned as
//! errors and logged. Collaborator failures (store reads, OCR) are logged and treated
//! as "no data".

use crate::config::HostConfig;
use crate::controls::{ControlId, ControlRegistry, ControlSpec, DataEntryControl};
use crate::counters::{CounterKind, CounterSignal, Counters};
use crate::error::{HostError, Result};
use crate::events::{EventRegistry, HostEvent, SubscriptionId};
use crate::geometry::RasterZone;
use crate::model::{AttributeId, AttributeNode, HintType, Validity};
use crate::overlay::surface::DocumentSurface;
use crate::overlay::OverlayManager;
use crate::propagation::{
    first_in_display_order, genealogy_of, owner_runs, route_tree, FocusChange, FocusEvent,
    FocusTracker,
};
use crate::snapshot::{is_displayed_in_selection, SelectionSnapshot};
use crate::store::AttributeStore;
use crate::swipe::{OcrEngine, SwipeQueue, SwipeTicket};
use crate::tree::{find_next_in_display_order, AttributeTree, Direction, Genealogy};
use crate::validation::{evaluate_save, SaveVerdict, ValidationOutcome, Validator};
use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use tracing::{debug, error, warn};

pub struct DocumentSession<S: DocumentSurface> {
    config: HostConfig,
    surface: S,
    tree: AttributeTree,
    overlays: OverlayManager,
    counters: Counters,
    controls: ControlRegistry,
    focus: FocusTracker,
    selections: HashMap<ControlId, Vec<AttributeId>>,
    hover: Option<AttributeId>,
    snapshot: SelectionSnapshot,
    events: EventRegistry,
    validator: Option<Box<dyn Validator>>,
    swipes: SwipeQueue,
    loading: bool,
    update_depth: usize,
    refresh_pending: bool,
}

impl<S: DocumentSurface> DocumentSession<S> {
    pub fn new(config: HostConfig, surface: S) -> Self {
        Self {
            overlays: OverlayManager::new(&config),
            config,
            surface,
            tree: AttributeTree::new(),
            counters: Counters::new(),
            controls: ControlRegistry::new(),
            focus: FocusTracker::new(),
            selections: HashMap::new(),
            hover: None,
            snapshot: SelectionSnapshot::default(),
            events: EventRegistry::new(),
            validator: None,
            swipes: SwipeQueue::new(),
            loading: false,
            update_depth: 0,
            refresh_pending: false,
        }
    }

    /// Without a validator, attributes keep the status they were loaded with.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    // --- Accessors ---

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn tree(&self) -> &AttributeTree {
        &self.tree
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn overlays(&self) -> &OverlayManager {
        &self.overlays
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        self.snapshot
    }

    pub fn active_control(&self) -> Option<ControlId> {
        self.focus.active()
    }

    /// Selection of the active control.
    pub fn active_attributes(&self) -> &[AttributeId] {
        self.focus
            .active()
            .and_then(|c| self.selections.get(&c))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The active attribute that comes first in tab order.
    pub fn current_attribute(&self) -> Option<AttributeId> {
        first_in_display_order(&self.tree, self.active_attributes())
    }

    pub fn hovered(&self) -> Option<AttributeId> {
        self.hover
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn pending_swipes(&self) -> usize {
        self.swipes.pending()
    }

    // --- Observers and controls ---

    pub fn subscribe(&mut self, handler: impl FnMut(&HostEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Registers a control and re-routes the loaded tree so it picks up its attributes.
    pub fn register_control(
        &mut self,
        spec: ControlSpec,
        control: impl DataEntryControl + 'static,
    ) -> Result<()> {
        debug!(control = %spec.id, attribute = %spec.attribute_name, "registering control");
        self.controls.register(spec, Box::new(control))?;
        if !self.tree.is_empty() {
            route_tree(&mut self.tree, &self.controls);
            self.push_roots()?;
        }
        Ok(())
    }

    // --- Document lifecycle ---

    /// Replaces the document with `tree`.
    pub fn load_tree(&mut self, tree: AttributeTree) -> Result<()> {
        self.clear_document();
        self.loading = true;
        let populated = self.populate(tree);
        self.loading = false;
        populated?;

        debug!(
            attributes = self.tree.len(),
            unviewed = self.counters.unviewed(),
            invalid = self.counters.invalid(),
            "document loaded"
        );
        self.emit(HostEvent::DocumentLoaded {
            attributes: self.tree.len(),
        });
        for kind in [CounterKind::Unviewed, CounterKind::Invalid] {
            if self.counters.get(kind) > 0 {
                self.emit(HostEvent::ItemsExist { kind });
            }
        }
        self.request_refresh();
        Ok(())
    }

    fn populate(&mut self, tree: AttributeTree) -> Result<()> {
        self.tree = tree;
        route_tree(&mut self.tree, &self.controls);
        for id in self.tree.walk() {
            self.revalidate(id, false)?;
        }
        self.counters = Counters::recount(&self.tree);
        self.overlays.refresh_all(&mut self.surface, &self.tree);
        self.push_roots()
    }

    /// Loads from `store`. A store that fails to load yields an empty document.
    pub fn load_from(&mut self, store: &dyn AttributeStore) -> Result<usize> {
        let tree = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load attributes, starting with an empty document");
            AttributeTree::new()
        });
        self.load_tree(tree)?;
        Ok(self.tree.len())
    }

    pub fn save_to(&self, store: &dyn AttributeStore) -> Result<()> {
        store.save(&self.tree)
    }

    pub fn evaluate_save(&self) -> SaveVerdict {
        evaluate_save(
            &self.tree,
            self.config.unviewed_policy,
            self.config.invalid_policy,
        )
    }

    fn clear_document(&mut self) {
        self.overlays.clear(&mut self.surface);
        self.tree.clear();
        self.selections.clear();
        self.hover = None;
        self.swipes.clear();
        self.counters = Counters::new();
        self.snapshot = SelectionSnapshot::default();
    }

    /// Closes the document and tears the session down: overlays, attributes and every
    /// observer are dropped.
    pub fn clear(&mut self) {
        if let Some(active) = self.focus.active() {
            if let Ok(control) = self.controls.control_mut(active) {
                control.mark_active(false, self.config.active_control_color);
            }
        }
        self.clear_document();
        for id in self.controls.children_of(None) {
            if let Ok(control) = self.controls.control_mut(id) {
                control.set_attributes(&[]);
            }
        }
        self.focus.reset();
        self.emit(HostEvent::DocumentCleared);
        self.events.clear();
        self.surface.redraw();
    }

    // --- Structural changes ---

    /// Inserts a new attribute under `parent` (or as a root) at sibling `position`.
    pub fn insert_attribute(
        &mut self,
        parent: Option<AttributeId>,
        position: usize,
        node: AttributeNode,
    ) -> Result<AttributeId> {
        let id = self.tree.insert_at(parent, position, node)?;
        route_tree(&mut self.tree, &self.controls);
        let node = self.tree.node(&id)?;
        let unviewed = CounterKind::Unviewed.counts(node);
        let invalid = CounterKind::Invalid.counts(node);
        self.track(CounterKind::Unviewed, false, unviewed);
        self.track(CounterKind::Invalid, false, invalid);
        self.revalidate(id, false)?;

        if let Some(node) = self.tree.get(&id) {
            let visible = self.overlays.default_visibility(node);
            self.overlays.set_highlight(&mut self.surface, node, visible);
            self.overlays.set_error_icon(&mut self.surface, node, visible);
        }
        self.emit(HostEvent::AttributeInitialized { attribute: id });
        self.push_to_controls_of(parent)?;
        self.request_refresh();
        Ok(id)
    }

    /// Deletes `id` and its subtree. Returns the number of attributes removed.
    pub fn delete_attribute(&mut self, id: AttributeId) -> Result<usize> {
        let parent = self.tree.node(&id)?.parent;
        let doomed: HashSet<AttributeId> = self.tree.descendants(&id).into_iter().collect();
        for node_id in &doomed {
            self.overlays.remove(&mut self.surface, node_id);
            self.swipes.discard_for(node_id);
            if self.hover == Some(*node_id) {
                self.hover = None;
            }
        }
        for selection in self.selections.values_mut() {
            selection.retain(|a| !doomed.contains(a));
        }

        let removed = self.tree.remove_subtree(&id)?;
        if !self.defer() {
            let signals = self.counters.remove_nodes(&removed, &self.tree);
            self.apply_counter_signals(signals);
        }
        route_tree(&mut self.tree, &self.controls);
        self.push_to_controls_of(parent)?;

        for node in &removed {
            self.emit(HostEvent::AttributeDeleted { attribute: node.id });
        }
        debug!(attribute = %id, removed = removed.len(), "deleted attribute subtree");
        self.request_refresh();
        Ok(removed.len())
    }

    // --- Status changes ---

    pub fn set_viewed(&mut self, id: AttributeId, viewed: bool) -> Result<()> {
        let node = self.tree.node_mut(&id)?;
        if node.viewed == viewed {
            return Ok(());
        }
        node.viewed = viewed;
        self.track(CounterKind::Unviewed, viewed, !viewed);
        self.emit(HostEvent::ViewedStateChanged {
            attribute: id,
            viewed,
        });
        Ok(())
    }

    /// Replaces the text of `id` as a user edit, then revalidates it.
    pub fn set_text(&mut self, id: AttributeId, text: impl Into<String>) -> Result<ValidationOutcome> {
        let node = self.tree.node_mut(&id)?;
        node.text = text.into();
        node.manually_edited = true;
        let outcome = self.revalidate(id, true)?;
        self.rebuild_overlays(id);
        self.request_refresh();
        Ok(outcome)
    }

    /// Runs the validator over `id`, optionally letting it correct the text.
    pub fn validate_attribute(&mut self, id: AttributeId, correct: bool) -> Result<ValidationOutcome> {
        let outcome = self.revalidate(id, correct)?;
        self.request_refresh();
        Ok(outcome)
    }

    pub fn validate_all(&mut self) -> Result<()> {
        let mut scope = self.begin_update();
        for id in scope.tree.walk() {
            scope.revalidate(id, false)?;
        }
        Ok(())
    }

    /// Confirms the spatial evidence of `id`; a hint becomes a regular value.
    pub fn accept_spatial_info(&mut self, id: AttributeId) -> Result<()> {
        let node = self.tree.node_mut(&id)?;
        node.accepted = true;
        node.hint_type = HintType::None;
        self.rebuild_overlays(id);
        self.request_refresh();
        Ok(())
    }

    fn revalidate(&mut self, id: AttributeId, correct: bool) -> Result<ValidationOutcome> {
        let node = self.tree.node(&id)?;
        let outcome = match &self.validator {
            Some(validator) => validator.validate(node, correct),
            None => ValidationOutcome {
                validity: node.validity,
                message: node.validation_message.clone(),
                corrected: None,
            },
        };

        let node = self.tree.node_mut(&id)?;
        let before = node.validity;
        let changed = before != outcome.validity || node.validation_message != outcome.message;
        node.validity = outcome.validity;
        node.validation_message = outcome.message.clone();
        if let Some(corrected) = &outcome.corrected {
            node.text = corrected.clone();
        }
        let owner = node.owning_control;

        if before != outcome.validity {
            self.track(
                CounterKind::Invalid,
                before == Validity::Invalid,
                outcome.validity == Validity::Invalid,
            );
            self.emit(HostEvent::ValidationStateChanged {
                attribute: id,
                validity: outcome.validity,
            });
        }

        if !changed {
            return Ok(outcome);
        }
        if let Some(display) = owner
            .and_then(|c| self.controls.control_mut(c).ok())
            .and_then(|c| c.error_display())
        {
            match (&outcome.message, outcome.validity) {
                (Some(message), Validity::Invalid | Validity::Warning) => {
                    display.show_error(id, message)
                }
                _ => display.clear_error(id),
            }
        }

        if !self.loading {
            if let Some(node) = self.tree.get(&id) {
                let visible = self.overlays.is_displayed(&id);
                self.overlays.set_error_icon(&mut self.surface, node, visible);
            }
        }
        Ok(outcome)
    }

    /// Moves a counter for a node whose membership changed from `before` to `after`.
    fn track(&mut self, kind: CounterKind, before: bool, after: bool) {
        if before == after || self.defer() {
            return;
        }
        let signals = if after {
            self.counters.increment(kind).into_iter().collect()
        } else {
            self.counters.decrement(kind, &self.tree)
        };
        self.apply_counter_signals(signals);
    }

    /// Whether bookkeeping is postponed: loads recount at the end, update scopes
    /// reconcile when the last one drops.
    fn defer(&mut self) -> bool {
        if self.update_depth > 0 {
            self.refresh_pending = true;
        }
        self.loading || self.update_depth > 0
    }

    fn apply_counter_signals(&mut self, signals: Vec<CounterSignal>) {
        for signal in signals {
            let event = match signal {
                CounterSignal::ItemsExist { kind } => HostEvent::ItemsExist { kind },
                CounterSignal::NoneLeft { kind } => HostEvent::NoneLeft { kind },
                CounterSignal::Drift {
                    kind,
                    tracked,
                    actual,
                } if self.config.surface_counter_drift() => HostEvent::CounterDrift {
                    kind,
                    tracked,
                    actual,
                },
                CounterSignal::Drift { .. } => continue,
            };
            self.emit(event);
        }
    }

    fn emit(&mut self, event: HostEvent) {
        if self.loading {
            return;
        }
        self.events.emit(&event);
    }

    // --- Propagation and navigation ---

    /// Routes `node` and its ancestors to their controls, optionally selecting it.
    /// Returns the node reached.
    pub fn propagate(&mut self, node: AttributeId, select: bool) -> Result<Option<AttributeId>> {
        let genealogy = genealogy_of(&self.tree, Some(&node));
        if genealogy.is_empty() {
            return Err(HostError::AttributeNotFound(node));
        }
        self.propagate_genealogy(genealogy, select)
    }

    pub fn propagate_genealogy(
        &mut self,
        genealogy: Genealogy,
        select: bool,
    ) -> Result<Option<AttributeId>> {
        let runs = owner_runs(&self.tree, genealogy).inspect_err(|e| {
            error!(error = %e, "propagation contract violation");
        })?;
        let Some(last) = runs.last().copied() else {
            return Ok(None);
        };

        for run in &runs {
            debug!(control = %run.control, attribute = %run.node, select, "propagating");
            let node = self.tree.node(&run.node)?;
            self.controls
                .control_mut(run.control)?
                .propagate_to_children(node, select);
            self.push_children(run.node)?;
        }

        if select {
            self.controls.control_mut(last.control)?.focus();
            if let Some(change) = self.focus.activate(last.control) {
                self.apply_focus_change(change)?;
            }
            self.on_selection_changed(last.control, vec![last.node])?;
        }
        Ok(Some(last.node))
    }

    /// Tab / Shift+Tab: moves to the next tab stop in display order, wrapping around.
    pub fn select_next(&mut self, direction: Direction) -> Result<Option<AttributeId>> {
        let controls = &self.controls;
        let after = self
            .current_attribute()
            .map(|id| genealogy_of(&self.tree, Some(&id)));
        let found = find_next_in_display_order(&self.tree, after.as_ref(), direction, true, |n| {
            n.owning_control.is_some_and(|c| controls.is_tab_stop(c))
        });
        self.select_found(found)
    }

    pub fn select_next_unviewed(&mut self) -> Result<Option<AttributeId>> {
        self.select_next_where(|n| !n.viewed)
    }

    pub fn select_next_invalid(&mut self) -> Result<Option<AttributeId>> {
        self.select_next_where(|n| n.validity == Validity::Invalid)
    }

    fn select_next_where(
        &mut self,
        predicate: impl Fn(&AttributeNode) -> bool,
    ) -> Result<Option<AttributeId>> {
        let after = self
            .current_attribute()
            .map(|id| genealogy_of(&self.tree, Some(&id)));
        let found = find_next_in_display_order(
            &self.tree,
            after.as_ref(),
            Direction::Forward,
            true,
            |n| n.owning_control.is_some() && predicate(n),
        );
        self.select_found(found)
    }

    fn select_found(&mut self, found: Option<Genealogy>) -> Result<Option<AttributeId>> {
        match found {
            Some(genealogy) => self.propagate_genealogy(genealogy, true),
            None => Ok(None),
        }
    }

    fn push_roots(&mut self) -> Result<()> {
        self.push_to_controls_of(None)
    }

    fn push_to_controls_of(&mut self, parent: Option<AttributeId>) -> Result<()> {
        match parent {
            Some(parent) => self.push_children(parent),
            None => {
                for control in self.controls.children_of(None) {
                    let nodes: Vec<&AttributeNode> = self
                        .tree
                        .roots()
                        .iter()
                        .filter_map(|id| self.tree.get(id))
                        .filter(|n| n.owning_control == Some(control))
                        .collect();
                    self.controls.control_mut(control)?.set_attributes(&nodes);
                }
                Ok(())
            }
        }
    }

    /// Hands the children of `parent` to the child controls of its owner.
    fn push_children(&mut self, parent: AttributeId) -> Result<()> {
        let node = self.tree.node(&parent)?;
        let Some(owner) = node.owning_control else {
            return Ok(());
        };
        for control in self.controls.children_of(Some(owner)) {
            let nodes: Vec<&AttributeNode> = node
                .children
                .iter()
                .filter_map(|id| self.tree.get(id))
                .filter(|n| n.owning_control == Some(control))
                .collect();
            self.controls.control_mut(control)?.set_attributes(&nodes);
        }
        Ok(())
    }

    // --- Focus and selection ---

    pub fn on_control_clicked(&mut self, control: ControlId) {
        self.focus.on_control_clicked(control);
    }

    pub fn on_control_focus(&mut self, event: FocusEvent) -> Result<()> {
        if !self.controls.contains(event.control) {
            return Err(HostError::ControlNotFound(event.control));
        }
        if let Some(change) = self.focus.on_control_focus(event) {
            self.apply_focus_change(change)?;
        }
        Ok(())
    }

    pub fn on_host_focus_lost(&mut self) {
        let Some(previous) = self.focus.on_host_focus_lost() else {
            return;
        };
        let color = self.config.active_control_color;
        if let Ok(control) = self.controls.control_mut(previous) {
            control.mark_active(false, color);
            control.end_edit();
        }
        let selection = self.selections.get(&previous).cloned().unwrap_or_default();
        self.show_selection(&selection, &[]);
        self.emit(HostEvent::ActiveControlChanged { control: None });
        self.request_refresh();
    }

    pub fn on_host_focus_regained(&mut self) {
        self.focus.on_host_focus_regained();
    }

    /// Only the control being left gets `end_edit`. Coming from `Inactive` there is no
    /// edit to commit: the control that lost host focus was ended in `on_host_focus_lost`.
    fn apply_focus_change(&mut self, change: FocusChange) -> Result<()> {
        let color = self.config.active_control_color;
        debug!(from = ?change.from, to = %change.to, refocus = change.refocus, "active control changed");

        let previous_selection = change
            .from
            .and_then(|c| self.selections.get(&c).cloned())
            .unwrap_or_default();
        if let Some(from) = change.from {
            if let Ok(control) = self.controls.control_mut(from) {
                control.mark_active(false, color);
            }
        }
        let control = self.controls.control_mut(change.to)?;
        if change.refocus {
            control.focus();
        }
        control.mark_active(true, color);
        if let Some(from) = change.from {
            if let Ok(control) = self.controls.control_mut(from) {
                control.end_edit();
            }
        }

        let selection = self.selections.get(&change.to).cloned().unwrap_or_default();
        for id in &selection {
            self.set_viewed(*id, true)?;
        }
        self.show_selection(&previous_selection, &selection);
        self.emit(HostEvent::ActiveControlChanged {
            control: Some(change.to),
        });
        self.request_refresh();
        Ok(())
    }

    /// A control reports the attributes now selected in it.
    pub fn on_selection_changed(
        &mut self,
        control: ControlId,
        attributes: Vec<AttributeId>,
    ) -> Result<()> {
        if !self.controls.contains(control) {
            return Err(HostError::ControlNotFound(control));
        }
        let attributes: Vec<AttributeId> = attributes
            .into_iter()
            .filter(|id| self.tree.contains(id))
            .collect();
        let previous = self
            .selections
            .insert(control, attributes.clone())
            .unwrap_or_default();
        if self.focus.active() != Some(control) {
            return Ok(());
        }

        for id in &attributes {
            self.set_viewed(*id, true)?;
        }
        self.show_selection(&previous, &attributes);
        self.request_refresh();
        Ok(())
    }

    /// Shows a transient highlight and tooltip for a node under the pointer.
    pub fn set_hover(&mut self, hovered: Option<AttributeId>) {
        let hovered = hovered.filter(|id| self.tree.contains(id));
        if self.hover == hovered {
            return;
        }
        if let Some(previous) = self.hover.take() {
            if !self.active_attributes().contains(&previous) {
                self.show_inactive(previous);
            }
        }
        if let Some(id) = hovered {
            self.hover = Some(id);
            if !self.active_attributes().contains(&id) {
                self.show_active(id, true);
            }
        }
        self.request_refresh();
    }

    fn show_selection(&mut self, previous: &[AttributeId], current: &[AttributeId]) {
        for id in previous {
            if !current.contains(id) && self.hover != Some(*id) {
                self.show_inactive(*id);
            }
        }

        let count = current.len();
        let tooltips = count == 1 || self.config.tooltips_for_multi_select;
        for id in current {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            if is_displayed_in_selection(node, count) {
                self.show_active(*id, tooltips);
            } else {
                self.overlays.hide(&mut self.surface, id);
            }
        }

        if let [single] = current {
            if let Some(zone) = self.tree.get(single).and_then(|n| n.spatial_zones.first()) {
                self.surface.make_visible(zone.page, zone.bounds());
            }
        }
    }

    fn show_active(&mut self, id: AttributeId, with_tooltip: bool) {
        let Some(node) = self.tree.get(&id) else {
            return;
        };
        self.overlays.set_highlight(&mut self.surface, node, true);
        self.overlays.set_error_icon(&mut self.surface, node, true);
        if with_tooltip {
            self.overlays.set_tooltip(&mut self.surface, node);
        } else {
            self.overlays.remove_tooltip(&mut self.surface, &id);
        }
    }

    fn show_inactive(&mut self, id: AttributeId) {
        let Some(node) = self.tree.get(&id) else {
            return;
        };
        let visible = self.overlays.default_visibility(node);
        self.overlays.remove_tooltip(&mut self.surface, &id);
        self.overlays.set_highlight(&mut self.surface, node, visible);
        self.overlays.set_error_icons_visible(&mut self.surface, &id, visible);
    }

    /// Destroys and recreates the overlays of `id`, keeping what was shown shown.
    fn rebuild_overlays(&mut self, id: AttributeId) {
        let displayed = self.overlays.is_displayed(&id);
        let had_tooltip = !self.overlays.tooltip_pages(&id).is_empty();
        self.overlays.remove(&mut self.surface, &id);
        let Some(node) = self.tree.get(&id) else {
            return;
        };
        let visible = displayed || self.overlays.default_visibility(node);
        self.overlays.set_highlight(&mut self.surface, node, visible);
        self.overlays.set_error_icon(&mut self.surface, node, visible);
        if had_tooltip {
            self.overlays.set_tooltip(&mut self.surface, node);
        }
    }

    // --- Swipes ---

    /// Starts a swipe aimed at the current attribute. `None` when nothing is active.
    pub fn begin_swipe(&mut self, zones: Vec<RasterZone>) -> Option<SwipeTicket> {
        let target = self.current_attribute()?;
        Some(self.swipes.begin(zones, target))
    }

    pub fn discard_pending_swipes(&mut self) -> usize {
        self.swipes.discard_all()
    }

    /// Applies a recognition result. Discarded swipes and failed recognitions are
    /// dropped; returns the attribute that was updated.
    pub fn complete_swipe(
        &mut self,
        ticket: SwipeTicket,
        result: Result<String>,
    ) -> Result<Option<AttributeId>> {
        let Some(swipe) = self.swipes.take(ticket) else {
            warn!(?ticket, "unknown swipe ticket");
            return Ok(None);
        };
        if swipe.discarded {
            debug!(?ticket, "dropping discarded swipe");
            self.emit(HostEvent::SwipeDropped);
            return Ok(None);
        }
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "swipe recognition failed");
                self.emit(HostEvent::SwipeDropped);
                return Ok(None);
            }
        };
        let Some(node) = self.tree.get_mut(&swipe.target) else {
            return Ok(None);
        };
        node.text = text;
        node.spatial_zones = swipe.zones;
        node.manually_edited = true;
        node.hint_type = HintType::None;

        self.revalidate(swipe.target, true)?;
        self.rebuild_overlays(swipe.target);
        self.request_refresh();
        Ok(Some(swipe.target))
    }

    /// Swipes and recognizes in one go.
    pub fn swipe(
        &mut self,
        zones: Vec<RasterZone>,
        ocr: &mut dyn OcrEngine,
    ) -> Result<Option<AttributeId>> {
        let Some(ticket) = self.begin_swipe(zones.clone()) else {
            return Ok(None);
        };
        let result = ocr.recognize(&zones);
        self.complete_swipe(ticket, result)
    }

    // --- Refresh ---

    /// Defers refreshes and counter bookkeeping until the returned scope is dropped.
    pub fn begin_update(&mut self) -> UpdateScope<'_, S> {
        self.update_depth += 1;
        UpdateScope { session: self }
    }

    fn end_update(&mut self) {
        self.update_depth = self.update_depth.saturating_sub(1);
        if self.update_depth == 0 && self.refresh_pending {
            self.refresh_pending = false;
            let signals = self.counters.reconcile(&self.tree);
            self.apply_counter_signals(signals);
            self.refresh();
        }
    }

    fn request_refresh(&mut self) {
        if !self.defer() {
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        self.overlays.raise_decorations(&mut self.surface);
        self.surface.redraw();
        let snapshot =
            SelectionSnapshot::compute(&self.tree, &self.overlays, self.active_attributes());
        if snapshot != self.snapshot {
            self.snapshot = snapshot;
            self.emit(HostEvent::SelectionChanged { snapshot });
        }
    }
}

/// Batches session changes; see [`DocumentSession::begin_update`].
pub struct UpdateScope<'a, S: DocumentSurface> {
    session: &'a mut DocumentSession<S>,
}

impl<S: DocumentSurface> Deref for UpdateScope<'_, S> {
    type Target = DocumentSession<S>;

    fn deref(&self) -> &Self::Target {
        &*self.session
    }
}

impl<S: DocumentSurface> DerefMut for UpdateScope<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.session
    }
}

impl<S: DocumentSurface> Drop for UpdateScope<'_, S> {
    fn drop(&mut self) {
        self.session.end_update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::surface::{MemSurface, OverlayKind};
    use crate::store::memory::MemoryStore;
    use crate::test_utils::*;
    use crate::validation::{FieldRule, GateReason, RuleValidator};
    use std::cell::RefCell;
    use std::rc::Rc;

    const INVOICE: ControlId = ControlId(1);
    const LINE: ControlId = ControlId(2);
    const VENDOR: ControlId = ControlId(3);

    struct Fixture {
        invoice: AttributeId,
        line: AttributeId,
        qty: AttributeId,
        vendor: AttributeId,
    }

    fn session_with(config: HostConfig, log: &CallLog) -> DocumentSession<MemSurface> {
        let mut session = DocumentSession::new(config, MemSurface::default());
        let specs = [
            ControlSpec::new(1, "Invoice"),
            ControlSpec::new(2, "Line").child_of(INVOICE).owning(&["Qty"]),
            ControlSpec::new(3, "Vendor"),
        ];
        for spec in specs {
            let id = spec.id.0;
            session
                .register_control(spec, RecordingControl::new(id, log))
                .unwrap();
        }
        session
    }

    /// Invoice > Line > Qty, plus a Vendor root. Nothing viewed.
    fn invoice_tree() -> (AttributeTree, Fixture) {
        let (tree, ids) = TreeBuilder::new()
            .root(extracted("Invoice", "INV-1", 100.0))
            .child(AttributeNode::new("Line", ""))
            .child(extracted("Qty", "2", 300.0))
            .root(extracted("Vendor", "ACME", 500.0))
            .build();
        (
            tree,
            Fixture {
                invoice: ids[0],
                line: ids[1],
                qty: ids[2],
                vendor: ids[3],
            },
        )
    }

    fn loaded(log: &CallLog) -> (DocumentSession<MemSurface>, Fixture) {
        let mut session = session_with(HostConfig::default(), log);
        let (tree, ids) = invoice_tree();
        session.load_tree(tree).unwrap();
        log.borrow_mut().clear();
        (session, ids)
    }

    fn collect(session: &mut DocumentSession<MemSurface>) -> Rc<RefCell<Vec<HostEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    fn focus(session: &mut DocumentSession<MemSurface>, control: ControlId) {
        session
            .on_control_focus(FocusEvent {
                control,
                manual_navigation: true,
            })
            .unwrap();
    }

    struct FixedOcr(&'static str);

    impl OcrEngine for FixedOcr {
        fn recognize(&mut self, _zones: &[RasterZone]) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_load_routes_and_hands_roots_to_controls() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log);
        let events = collect(&mut session);
        let (tree, ids) = invoice_tree();
        session.load_tree(tree).unwrap();

        assert_eq!(
            calls_to(&log, INVOICE),
            vec![ControlCall::SetAttributes(vec![ids.invoice])]
        );
        assert_eq!(
            calls_to(&log, VENDOR),
            vec![ControlCall::SetAttributes(vec![ids.vendor])]
        );
        let qty = session.tree().get(&ids.qty).unwrap();
        assert_eq!(qty.owning_control, Some(LINE));
        assert_eq!(session.counters().unviewed(), 4);
        assert_eq!(
            *events.borrow(),
            vec![
                HostEvent::DocumentLoaded { attributes: 4 },
                HostEvent::ItemsExist {
                    kind: CounterKind::Unviewed
                },
            ]
        );
    }

    #[test]
    fn test_register_after_load_routes_existing_tree() {
        let log = new_log();
        let mut session = DocumentSession::new(HostConfig::default(), MemSurface::default());
        let (tree, ids) = invoice_tree();
        session.load_tree(tree).unwrap();
        assert_eq!(session.tree().get(&ids.vendor).unwrap().owning_control, None);

        session
            .register_control(ControlSpec::new(3, "Vendor"), RecordingControl::new(3, &log))
            .unwrap();
        assert_eq!(
            session.tree().get(&ids.vendor).unwrap().owning_control,
            Some(VENDOR)
        );
        assert_eq!(
            calls_to(&log, VENDOR),
            vec![ControlCall::SetAttributes(vec![ids.vendor])]
        );
    }

    #[test]
    fn test_propagate_collapses_same_owner_run() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);

        let reached = session.propagate(ids.qty, true).unwrap();
        assert_eq!(reached, Some(ids.qty));

        let propagations: Vec<_> = log
            .borrow()
            .iter()
            .filter(|(_, call)| matches!(call, ControlCall::Propagate { .. }))
            .cloned()
            .collect();
        assert_eq!(
            propagations,
            vec![
                (
                    INVOICE,
                    ControlCall::Propagate {
                        node: ids.invoice,
                        select: true
                    }
                ),
                (
                    LINE,
                    ControlCall::Propagate {
                        node: ids.qty,
                        select: true
                    }
                ),
            ]
        );
        assert!(calls_to(&log, LINE).contains(&ControlCall::SetAttributes(vec![ids.line])));
        assert_eq!(session.active_control(), Some(LINE));
        assert_eq!(session.active_attributes(), &[ids.qty]);
        assert!(session.tree().get(&ids.qty).unwrap().viewed);
    }

    #[test]
    fn test_three_deep_same_owner_propagates_once() {
        let log = new_log();
        let mut session = DocumentSession::new(HostConfig::default(), MemSurface::default());
        session
            .register_control(
                ControlSpec::new(7, "Table").owning(&["Row", "Cell"]),
                RecordingControl::new(7, &log),
            )
            .unwrap();
        let (tree, ids) = TreeBuilder::new()
            .root(AttributeNode::new("Table", ""))
            .child(AttributeNode::new("Row", ""))
            .child(extracted("Cell", "42", 100.0))
            .build();
        session.load_tree(tree).unwrap();
        log.borrow_mut().clear();

        assert_eq!(session.propagate(ids[2], true).unwrap(), Some(ids[2]));

        let propagations: Vec<_> = calls_to(&log, ControlId(7))
            .into_iter()
            .filter(|call| matches!(call, ControlCall::Propagate { .. }))
            .collect();
        assert_eq!(
            propagations,
            vec![ControlCall::Propagate {
                node: ids[2],
                select: true
            }]
        );
        assert!(session.tree().get(&ids[2]).unwrap().viewed);
        assert!(!session.tree().get(&ids[0]).unwrap().viewed);
        assert!(!session.tree().get(&ids[1]).unwrap().viewed);
    }

    #[test]
    fn test_propagating_unrouted_node_is_an_error() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log);
        let mut tree = AttributeTree::new();
        let stray = tree.insert_root(AttributeNode::new("Stray", "")).unwrap();
        session.load_tree(tree).unwrap();

        let err = session.propagate(stray, true).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(session.active_control(), None);
    }

    #[test]
    fn test_tab_walks_display_order_and_wraps() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);

        let mut visited = Vec::new();
        for _ in 0..5 {
            visited.push(session.select_next(Direction::Forward).unwrap().unwrap());
        }
        assert_eq!(
            visited,
            vec![ids.invoice, ids.line, ids.qty, ids.vendor, ids.invoice]
        );

        let back = session.select_next(Direction::Backward).unwrap();
        assert_eq!(back, Some(ids.vendor));
    }

    #[test]
    fn test_viewing_all_unviewed_signals_none_left_once() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log);
        let mut tree = AttributeTree::new();
        let mut unviewed = Vec::new();
        for i in 0..10 {
            let mut node = extracted("Vendor", "ACME", 50.0 * i as f64);
            node.viewed = i >= 3;
            let id = tree.insert_root(node).unwrap();
            if i < 3 {
                unviewed.push(id);
            }
        }
        session.load_tree(tree).unwrap();
        let events = collect(&mut session);
        focus(&mut session, VENDOR);

        for id in unviewed {
            session.on_selection_changed(VENDOR, vec![id]).unwrap();
        }
        let none_left = events
            .borrow()
            .iter()
            .filter(|e| {
                **e == HostEvent::NoneLeft {
                    kind: CounterKind::Unviewed,
                }
            })
            .count();
        assert_eq!(none_left, 1);
        assert_eq!(session.counters().unviewed(), 0);
    }

    #[test]
    fn test_selection_in_inactive_control_is_remembered_not_shown() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.on_selection_changed(VENDOR, vec![ids.vendor]).unwrap();
        assert!(!session.tree().get(&ids.vendor).unwrap().viewed);
        assert!(!session.overlays().is_displayed(&ids.vendor));

        focus(&mut session, VENDOR);
        assert!(session.tree().get(&ids.vendor).unwrap().viewed);
        assert!(session.overlays().is_displayed(&ids.vendor));
        assert_eq!(session.snapshot().unaccepted, 1);
    }

    #[test]
    fn test_indirect_hint_hidden_in_multi_selection_but_counted() {
        let log = new_log();
        let config = HostConfig {
            show_all_highlights: true,
            ..HostConfig::default()
        };
        let mut session = session_with(config, &log);
        let mut tree = AttributeTree::new();
        let hint = tree
            .insert_root(extracted("Vendor", "ACME", 100.0).with_hint(HintType::Indirect))
            .unwrap();
        let other = tree.insert_root(extracted("Vendor", "Globex", 300.0)).unwrap();
        session.load_tree(tree).unwrap();

        assert!(session.overlays().has_highlight(&hint));
        assert!(!session.overlays().is_displayed(&hint));
        assert!(session.overlays().is_displayed(&other));

        focus(&mut session, VENDOR);
        session.on_selection_changed(VENDOR, vec![hint, other]).unwrap();
        assert!(!session.overlays().is_displayed(&hint));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.indirect_hints, 1);
        assert_eq!(snapshot.unaccepted, 1);

        session.on_selection_changed(VENDOR, vec![hint]).unwrap();
        assert!(session.overlays().is_displayed(&hint));
        assert!(session.overlays().is_displayed(&other));
    }

    #[test]
    fn test_single_selection_scrolls_into_view() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.propagate(ids.vendor, true).unwrap();
        let (page, region) = *session.surface().scroll_requests().last().unwrap();
        assert_eq!(page, 1);
        assert!(region.top < 500.0 && region.bottom > 500.0);
    }

    #[test]
    fn test_deleting_hovered_node_leaves_no_overlays() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.set_hover(Some(ids.vendor));
        assert_eq!(session.surface().overlays_of(OverlayKind::Tooltip).len(), 1);

        assert_eq!(session.delete_attribute(ids.vendor).unwrap(), 1);
        assert_eq!(session.hovered(), None);
        assert!(session.surface().overlays_of(OverlayKind::Tooltip).is_empty());
        assert!(!session.overlays().has_highlight(&ids.vendor));
    }

    #[test]
    fn test_hover_leave_restores_default_visibility() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.set_hover(Some(ids.vendor));
        assert!(session.overlays().is_displayed(&ids.vendor));
        session.set_hover(None);
        assert!(!session.overlays().is_displayed(&ids.vendor));
        assert!(session.overlays().tooltip_pages(&ids.vendor).is_empty());
    }

    #[test]
    fn test_delete_subtree_updates_counters_and_controls() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        let events = collect(&mut session);
        session.propagate(ids.qty, true).unwrap();
        log.borrow_mut().clear();

        assert_eq!(session.delete_attribute(ids.line).unwrap(), 2);
        assert_eq!(session.counters().unviewed(), 2);
        assert!(session.active_attributes().is_empty());
        assert!(calls_to(&log, LINE).contains(&ControlCall::SetAttributes(vec![])));
        let deleted: Vec<_> = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::AttributeDeleted { attribute } => Some(*attribute),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, vec![ids.line, ids.qty]);
    }

    #[test]
    fn test_delete_prunes_only_doomed_selections() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.propagate(ids.qty, true).unwrap();
        session.on_selection_changed(VENDOR, vec![ids.vendor]).unwrap();

        session.delete_attribute(ids.invoice).unwrap();
        assert!(session.active_attributes().is_empty());

        focus(&mut session, VENDOR);
        assert_eq!(session.active_attributes(), &[ids.vendor]);
    }

    #[test]
    fn test_insert_routes_counts_and_notifies() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        let events = collect(&mut session);

        let added = session
            .insert_attribute(None, 2, extracted("Vendor", "Globex", 700.0))
            .unwrap();
        assert_eq!(
            session.tree().get(&added).unwrap().owning_control,
            Some(VENDOR)
        );
        assert_eq!(session.counters().unviewed(), 5);
        assert!(session.overlays().has_highlight(&added));
        assert_eq!(
            calls_to(&log, VENDOR),
            vec![ControlCall::SetAttributes(vec![ids.vendor, added])]
        );
        assert!(events
            .borrow()
            .contains(&HostEvent::AttributeInitialized { attribute: added }));
    }

    #[test]
    fn test_invalid_attributes_reach_error_display_and_navigation() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log)
            .with_validator(StaticValidator::new().invalid("Vendor", "unknown vendor"));
        let (tree, ids) = invoice_tree();
        session.load_tree(tree).unwrap();

        assert_eq!(session.counters().invalid(), 1);
        assert!(calls_to(&log, VENDOR)
            .contains(&ControlCall::ShowError(ids.vendor, "unknown vendor".into())));

        assert_eq!(session.select_next_invalid().unwrap(), Some(ids.vendor));
        let icons = session.surface().overlays_of(OverlayKind::ErrorIcon);
        assert_eq!(icons.len(), 1);
        assert!(icons[0].1.visible);
    }

    #[test]
    fn test_warning_shows_icon_but_is_not_counted() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log)
            .with_validator(StaticValidator::new().warning("Qty", "looks high"));
        let (tree, ids) = invoice_tree();
        session.load_tree(tree).unwrap();

        assert_eq!(session.counters().invalid(), 0);
        assert_eq!(session.overlays().error_icon_pages(&ids.qty), vec![1]);
        assert!(calls_to(&log, LINE)
            .contains(&ControlCall::ShowError(ids.qty, "looks high".into())));
    }

    #[test]
    fn test_loaded_status_is_kept_without_validator() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log);
        let (tree, ids) = TreeBuilder::new()
            .root(AttributeNode::new("Invoice", ""))
            .child(invalid_node("Line", "no amount"))
            .up()
            .child(AttributeNode::new("Line", ""))
            .build();
        session.load_tree(tree).unwrap();

        assert_eq!(session.counters().invalid(), 1);
        assert_eq!(session.tree().get(&ids[2]).unwrap().parent, Some(ids[0]));
        assert_eq!(session.select_next_invalid().unwrap(), Some(ids[1]));
    }

    #[test]
    fn test_select_next_unviewed_skips_viewed() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.set_viewed(ids.invoice, true).unwrap();
        session.set_viewed(ids.line, true).unwrap();

        assert_eq!(session.select_next_unviewed().unwrap(), Some(ids.qty));
        assert_eq!(session.select_next_unviewed().unwrap(), Some(ids.vendor));
        assert_eq!(session.select_next_unviewed().unwrap(), None);
    }

    #[test]
    fn test_edit_revalidates_and_clears_error() {
        let log = new_log();
        let required = FieldRule {
            required: true,
            ..FieldRule::default()
        };
        let mut session = session_with(HostConfig::default(), &log)
            .with_validator(RuleValidator::new().with_rule("Vendor", required));
        let mut tree = AttributeTree::new();
        let vendor = tree.insert_root(extracted("Vendor", "", 100.0)).unwrap();
        session.load_tree(tree).unwrap();
        let events = collect(&mut session);
        assert_eq!(session.counters().invalid(), 1);

        let outcome = session.set_text(vendor, "  ACME ").unwrap();
        assert_eq!(outcome.validity, Validity::Valid);
        let node = session.tree().get(&vendor).unwrap();
        assert_eq!(node.text, "ACME");
        assert!(node.manually_edited);
        assert_eq!(session.counters().invalid(), 0);
        assert!(events.borrow().contains(&HostEvent::NoneLeft {
            kind: CounterKind::Invalid
        }));
        assert!(calls_to(&log, VENDOR).contains(&ControlCall::ClearError(vendor)));
        assert!(session.overlays().error_icon_pages(&vendor).is_empty());
    }

    #[test]
    fn test_accepting_a_hint_makes_it_a_value() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log);
        let mut tree = AttributeTree::new();
        let hint = tree
            .insert_root(extracted("Vendor", "ACME", 100.0).with_hint(HintType::Direct))
            .unwrap();
        session.load_tree(tree).unwrap();
        focus(&mut session, VENDOR);
        session.on_selection_changed(VENDOR, vec![hint]).unwrap();
        assert_eq!(session.snapshot().direct_hints, 1);

        session.accept_spatial_info(hint).unwrap();
        assert_eq!(session.snapshot().accepted, 1);
        assert!(session.overlays().is_displayed(&hint));
    }

    #[test]
    fn test_update_scope_defers_until_dropped() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        let events = collect(&mut session);
        let redraws = session.surface().redraw_count();

        {
            let mut scope = session.begin_update();
            for id in [ids.invoice, ids.line, ids.qty, ids.vendor] {
                scope.set_viewed(id, true).unwrap();
            }
            assert_eq!(scope.counters().unviewed(), 4);
            assert_eq!(scope.surface().redraw_count(), redraws);
        }

        assert_eq!(session.counters().unviewed(), 0);
        assert_eq!(session.surface().redraw_count(), redraws + 1);
        let none_left = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, HostEvent::NoneLeft { .. }))
            .count();
        assert_eq!(none_left, 1);
    }

    #[test]
    fn test_focus_lost_and_regained_restores_previous_control() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log);
        let events = collect(&mut session);
        focus(&mut session, VENDOR);

        session.on_host_focus_lost();
        assert_eq!(session.active_control(), None);
        assert!(events
            .borrow()
            .contains(&HostEvent::ActiveControlChanged { control: None }));

        session.on_host_focus_regained();
        session
            .on_control_focus(FocusEvent {
                control: INVOICE,
                manual_navigation: false,
            })
            .unwrap();
        assert_eq!(session.active_control(), Some(VENDOR));
        assert_eq!(
            calls_to(&log, VENDOR),
            vec![
                ControlCall::MarkActive(true),
                ControlCall::MarkActive(false),
                ControlCall::EndEdit,
                ControlCall::Focus,
                ControlCall::MarkActive(true),
            ]
        );
    }

    #[test]
    fn test_end_edit_goes_to_the_control_being_left() {
        let log = new_log();
        let mut session = session_with(HostConfig::default(), &log);
        focus(&mut session, VENDOR);
        assert!(!log
            .borrow()
            .iter()
            .any(|(_, call)| *call == ControlCall::EndEdit));

        focus(&mut session, INVOICE);
        assert_eq!(calls_to(&log, VENDOR).last(), Some(&ControlCall::EndEdit));
        assert!(!calls_to(&log, INVOICE).contains(&ControlCall::EndEdit));
    }

    #[test]
    fn test_switching_controls_hides_old_selection() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.propagate(ids.vendor, true).unwrap();
        assert!(session.overlays().is_displayed(&ids.vendor));

        session.propagate(ids.invoice, true).unwrap();
        assert!(!session.overlays().is_displayed(&ids.vendor));
        assert!(session.overlays().is_displayed(&ids.invoice));
        assert!(calls_to(&log, VENDOR).contains(&ControlCall::EndEdit));
    }

    #[test]
    fn test_discarded_swipe_is_dropped() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        let events = collect(&mut session);
        assert_eq!(session.begin_swipe(vec![zone_at(1, 100.0, 700.0, 150.0)]), None);

        session.propagate(ids.vendor, true).unwrap();
        let ticket = session
            .begin_swipe(vec![zone_at(1, 100.0, 700.0, 150.0)])
            .unwrap();
        assert_eq!(session.discard_pending_swipes(), 1);

        let applied = session.complete_swipe(ticket, Ok("Initech".into())).unwrap();
        assert_eq!(applied, None);
        assert_eq!(session.tree().get(&ids.vendor).unwrap().text, "ACME");
        assert!(events.borrow().contains(&HostEvent::SwipeDropped));
    }

    #[test]
    fn test_swipe_replaces_value_and_zones() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.propagate(ids.vendor, true).unwrap();

        let applied = session
            .swipe(vec![zone_at(1, 100.0, 700.0, 150.0)], &mut FixedOcr("Initech"))
            .unwrap();
        assert_eq!(applied, Some(ids.vendor));
        let vendor = session.tree().get(&ids.vendor).unwrap();
        assert_eq!(vendor.text, "Initech");
        assert!(vendor.manually_edited);
        assert_eq!(vendor.spatial_zones[0].start.y, 700.0);
        assert_eq!(session.pending_swipes(), 0);
    }

    #[test]
    fn test_failed_recognition_is_dropped() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.propagate(ids.vendor, true).unwrap();
        let ticket = session.begin_swipe(vec![zone_at(1, 0.0, 0.0, 10.0)]).unwrap();
        let result = Err(HostError::Ocr("engine offline".into()));
        assert_eq!(session.complete_swipe(ticket, result).unwrap(), None);
        assert_eq!(session.tree().get(&ids.vendor).unwrap().text, "ACME");
    }

    #[test]
    fn test_save_gating_checks_invalid_first() {
        let log = new_log();
        let (session, _) = loaded(&log);
        match session.evaluate_save() {
            SaveVerdict::Prompt {
                reason,
                attributes,
                per_field,
            } => {
                assert_eq!(reason, GateReason::Unviewed);
                assert_eq!(attributes.len(), 4);
                assert!(!per_field);
            }
            other => panic!("unexpected verdict: {:?}", other),
        }

        let mut session = session_with(HostConfig::default(), &log)
            .with_validator(StaticValidator::new().invalid("Vendor", "unknown vendor"));
        let (tree, ids) = invoice_tree();
        session.load_tree(tree).unwrap();
        assert_eq!(
            session.evaluate_save(),
            SaveVerdict::Refused {
                reason: GateReason::Invalid,
                first: ids.vendor
            }
        );
    }

    #[test]
    fn test_clear_drops_everything_including_observers() {
        let log = new_log();
        let (mut session, _) = loaded(&log);
        let events = collect(&mut session);

        session.clear();
        assert!(session.tree().is_empty());
        assert_eq!(session.surface().overlays().count(), 0);
        assert_eq!(events.borrow().last(), Some(&HostEvent::DocumentCleared));

        let seen = events.borrow().len();
        let (tree, _) = invoice_tree();
        session.load_tree(tree).unwrap();
        assert_eq!(events.borrow().len(), seen);
    }

    #[test]
    fn test_failed_store_load_yields_empty_document() {
        let log = new_log();
        let (mut session, _) = loaded(&log);
        let store = MemoryStore::new();
        store.set_simulate_read_error(true);
        assert_eq!(session.load_from(&store).unwrap(), 0);
        assert!(session.tree().is_empty());
    }

    #[test]
    fn test_save_and_reload_keeps_status() {
        let log = new_log();
        let (mut session, ids) = loaded(&log);
        session.set_viewed(ids.vendor, true).unwrap();
        let store = MemoryStore::new();
        session.save_to(&store).unwrap();

        let (mut other, _) = loaded(&log);
        assert_eq!(other.load_from(&store).unwrap(), 4);
        assert!(other.tree().get(&ids.vendor).unwrap().viewed);
        assert_eq!(other.counters().unviewed(), 3);
    }
}
