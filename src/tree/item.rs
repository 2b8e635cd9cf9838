//! Tree item: one node of a metric, call, system or flat tree.
//!
//! # Locking
//!
//! Each item guards its state with independent locks, never holding two of
//! them at once (and never two items at once):
//! - `links`: parent back-reference, owned children, depth
//! - `values`: both value handles, their scalars, both status flags and one
//!   generation counter per slot. They change together in one critical
//!   section, so a reader never sees a value paired with the scalar or status
//!   of another.
//! - `display`: expand/hide/select flags and the derived label/colour caches
//! - `markers`: own, parent and dependency marker lists
//!
//! Value views are always invoked with no lock held, since they read the item back.

use super::marker::{self, MarkerRef};
use super::TreeContext;
use crate::cube::{CubeObject, Value};
use crate::globals::{Globals, PrecisionFormat};
use crate::lock;
use crate::models::{CalculationStatus, ItemId, TreeItemType, TreeType, ValueModus};
use crate::view::ValueView;
use egui::Color32;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};

/// Region modules that name a paradigm rather than a source file
const SYNTHETIC_MODULES: [&str; 6] = ["MPI", "INTERNAL", "OMP", "PTHREAD", "CUDA", "OPENCL"];

/// Source location of a call or region item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Empty for synthetic paradigm regions
    pub file: String,
    pub begin_line: i64,
    pub end_line: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Exclusive value, shown while expanded
    Own,
    /// Inclusive value, shown while collapsed
    Total,
}

struct Links {
    parent: Weak<TreeItem>,
    children: Vec<Arc<TreeItem>>,
    depth: usize,
}

struct ValueState {
    own_value_adv: Option<Arc<Value>>,
    total_value_adv: Option<Arc<Value>>,
    own_value: f64,
    total_value: f64,
    status_exclusive: CalculationStatus,
    status_inclusive: CalculationStatus,
    single_value: bool,
    generation_exclusive: u64,
    generation_inclusive: u64,
}

impl ValueState {
    fn new() -> Self {
        ValueState {
            own_value_adv: None,
            total_value_adv: None,
            own_value: 0.0,
            total_value: 0.0,
            status_exclusive: CalculationStatus::Invalid,
            status_inclusive: CalculationStatus::Invalid,
            single_value: true,
            generation_exclusive: 0,
            generation_inclusive: 0,
        }
    }

    /// Bumped by every write to `slot`; a label built before a write is stale.
    fn generation(&self, slot: Slot) -> u64 {
        match slot {
            Slot::Own => self.generation_exclusive,
            Slot::Total => self.generation_inclusive,
        }
    }

    fn bump(&mut self, slot: Slot) {
        match slot {
            Slot::Own => self.generation_exclusive = self.generation_exclusive.wrapping_add(1),
            Slot::Total => self.generation_inclusive = self.generation_inclusive.wrapping_add(1),
        }
    }

    fn status(&self, slot: Slot) -> CalculationStatus {
        match slot {
            Slot::Own => self.status_exclusive,
            Slot::Total => self.status_inclusive,
        }
    }

    fn status_mut(&mut self, slot: Slot) -> &mut CalculationStatus {
        match slot {
            Slot::Own => &mut self.status_exclusive,
            Slot::Total => &mut self.status_inclusive,
        }
    }
}

struct DisplayState {
    expanded: bool,
    hidden: bool,
    selected: bool,
    display_name: String,
    display_value: f64,
    color_expanded: Option<Color32>,
    color_collapsed: Option<Color32>,
    text_expanded: String,
    text_collapsed: String,
}

impl DisplayState {
    fn clear_caches(&mut self) {
        self.display_value = f64::NAN;
        self.color_expanded = None;
        self.color_collapsed = None;
        self.text_expanded.clear();
        self.text_collapsed.clear();
    }
}

#[derive(Default)]
struct MarkerLists {
    markers: Vec<MarkerRef>,
    parent_markers: Vec<MarkerRef>,
    dependency_markers: Vec<MarkerRef>,
}

/// A node of a tree.
///
/// Read accessors are available to everyone and never fail; absent values
/// read as 0.0 (scalars), NaN (display value) or empty strings. Structural
/// mutation is reserved to `Tree` and `TreeModel`.
pub struct TreeItem {
    id: ItemId,
    name: String,
    item_type: TreeItemType,
    cube_object: Option<CubeObject>,
    context: Arc<TreeContext>,
    links: RwLock<Links>,
    values: Mutex<ValueState>,
    display: Mutex<DisplayState>,
    markers: Mutex<MarkerLists>,
}

impl TreeItem {
    pub(crate) fn new(
        context: Arc<TreeContext>,
        id: ItemId,
        name: &str,
        item_type: TreeItemType,
        cube_object: Option<CubeObject>,
    ) -> Arc<TreeItem> {
        Arc::new(TreeItem {
            id,
            name: name.to_string(),
            item_type,
            cube_object,
            context,
            links: RwLock::new(Links {
                parent: Weak::new(),
                children: Vec::new(),
                depth: 0,
            }),
            values: Mutex::new(ValueState::new()),
            display: Mutex::new(DisplayState {
                expanded: false,
                hidden: false,
                selected: false,
                display_name: name.to_string(),
                display_value: f64::NAN,
                color_expanded: None,
                color_collapsed: None,
                text_expanded: String::new(),
                text_collapsed: String::new(),
            }),
            markers: Mutex::new(MarkerLists::default()),
        })
    }

    // ========================================================================
    // IDENTITY
    // ========================================================================

    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Original name as found in the profile
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name shown in the tree (for example a demangled region name)
    pub fn display_name(&self) -> String {
        lock::lock(&self.display).display_name.clone()
    }

    pub fn set_display_name(&self, display_name: &str) {
        lock::lock(&self.display).display_name = display_name.to_string();
    }

    pub fn item_type(&self) -> TreeItemType {
        self.item_type
    }

    pub fn tree_type(&self) -> TreeType {
        self.context.tree_type()
    }

    pub fn cube_object(&self) -> Option<&CubeObject> {
        self.cube_object.as_ref()
    }

    pub fn context(&self) -> &Arc<TreeContext> {
        &self.context
    }

    pub fn globals(&self) -> &Arc<Globals> {
        self.context.globals()
    }

    pub fn value_modus(&self) -> ValueModus {
        self.context.value_modus()
    }

    // ========================================================================
    // STRUCTURE
    // ========================================================================

    pub fn depth(&self) -> usize {
        lock::read(&self.links).depth
    }

    pub fn parent(&self) -> Option<Arc<TreeItem>> {
        lock::read(&self.links).parent.upgrade()
    }

    pub fn children(&self) -> Vec<Arc<TreeItem>> {
        lock::read(&self.links).children.clone()
    }

    pub fn child(&self, row: usize) -> Option<Arc<TreeItem>> {
        lock::read(&self.links).children.get(row).cloned()
    }

    pub fn child_count(&self) -> usize {
        lock::read(&self.links).children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.child_count() == 0
    }

    /// Position of `child` among the children of this item
    pub fn child_position(&self, child: &TreeItem) -> Option<usize> {
        lock::read(&self.links)
            .children
            .iter()
            .position(|c| std::ptr::eq(c.as_ref(), child))
    }

    /// Appends `child`, making this item its parent. Depths of the whole
    /// child subtree are rewritten to parent depth + 1 per level.
    pub(crate) fn add_child(self: &Arc<Self>, child: Arc<TreeItem>) {
        let len = self.child_count();
        self.insert_child(len, child);
    }

    pub(crate) fn insert_child(self: &Arc<Self>, position: usize, child: Arc<TreeItem>) {
        let depth = self.depth() + 1;
        child.relink(Arc::downgrade(self), depth);
        let mut links = lock::write(&self.links);
        let position = position.min(links.children.len());
        links.children.insert(position, child);
    }

    /// Removes `child` from the children; returns its former position.
    pub(crate) fn remove_child(&self, child: &TreeItem) -> Option<usize> {
        let removed = {
            let mut links = lock::write(&self.links);
            let position = links
                .children
                .iter()
                .position(|c| std::ptr::eq(c.as_ref(), child))?;
            links.children.remove(position);
            position
        };
        child.detach();
        Some(removed)
    }

    pub(crate) fn detach(&self) {
        lock::write(&self.links).parent = Weak::new();
    }

    fn relink(&self, parent: Weak<TreeItem>, depth: usize) {
        {
            let mut links = lock::write(&self.links);
            links.parent = parent;
            links.depth = depth;
        }
        let mut stack: Vec<(Arc<TreeItem>, usize)> =
            self.children().into_iter().map(|c| (c, depth + 1)).collect();
        while let Some((item, depth)) = stack.pop() {
            lock::write(&item.links).depth = depth;
            stack.extend(item.children().into_iter().map(|c| (c, depth + 1)));
        }
    }

    /// All descendants without children. Walks an explicit work list.
    pub fn get_leafs(&self) -> Vec<Arc<TreeItem>> {
        let mut leafs = Vec::new();
        let mut work = self.children();
        while let Some(item) = work.pop() {
            let children = item.children();
            if children.is_empty() {
                leafs.push(item);
            } else {
                work.extend(children);
            }
        }
        leafs
    }

    /// This item and all descendants, pre-order.
    pub fn subtree(self: &Arc<Self>) -> Vec<Arc<TreeItem>> {
        let mut items = Vec::new();
        let mut stack = vec![Arc::clone(self)];
        while let Some(item) = stack.pop() {
            let children = item.children();
            items.push(item);
            stack.extend(children.into_iter().rev());
        }
        items
    }

    // ========================================================================
    // VIEW STATE
    // ========================================================================

    /// Expanded and not hidden: the exclusive value is the current one.
    pub fn is_expanded(&self) -> bool {
        let display = lock::lock(&self.display);
        display.expanded && !display.hidden
    }

    pub fn set_expanded(&self, expanded: bool) {
        lock::lock(&self.display).expanded = expanded;
    }

    pub fn is_hidden(&self) -> bool {
        lock::lock(&self.display).hidden
    }

    /// Hidden items contribute to the exclusive value of their parent.
    pub fn set_hidden(&self, hidden: bool) {
        lock::lock(&self.display).hidden = hidden;
        if let Some(parent) = self.parent() {
            parent.invalidate_label();
        }
    }

    pub fn is_selected(&self) -> bool {
        lock::lock(&self.display).selected
    }

    pub fn set_selected(&self, selected: bool) {
        lock::lock(&self.display).selected = selected;
    }

    fn current_slot(&self) -> Slot {
        if self.is_expanded() {
            Slot::Own
        } else {
            Slot::Total
        }
    }

    // ========================================================================
    // VALUES
    // ========================================================================

    /// Installs the inclusive value (shown while collapsed).
    pub fn set_inclusive_value(&self, value: Option<Arc<Value>>) {
        self.set_slot_value(Slot::Total, value);
    }

    /// Installs the exclusive value (shown while expanded).
    pub fn set_exclusive_value(&self, value: Option<Arc<Value>>) {
        self.set_slot_value(Slot::Own, value);
    }

    /// Installs the value for the current expand state. Decide expansion first.
    pub fn set_value(&self, value: Option<Arc<Value>>) {
        let slot = self.current_slot();
        self.set_slot_value(slot, value);
    }

    fn scalar_of(&self, value: &Option<Arc<Value>>) -> (f64, bool) {
        match value {
            None => (0.0, true),
            // known zero: no view involved
            Some(v) if v.is_zero() => (0.0, v.single_value()),
            Some(v) => (
                self.globals().value_view(v.data_type()).get_double_value(v),
                v.single_value(),
            ),
        }
    }

    fn set_slot_value(&self, slot: Slot, value: Option<Arc<Value>>) {
        let (scalar, single) = self.scalar_of(&value);
        let status = if value.is_some() {
            CalculationStatus::Calculated
        } else {
            CalculationStatus::Invalid
        };

        let previous = {
            let mut state = lock::lock(&self.values);
            let handle = match slot {
                Slot::Own => &mut state.own_value_adv,
                Slot::Total => &mut state.total_value_adv,
            };
            let identical = match (handle.as_ref(), value.as_ref()) {
                (Some(old), Some(new)) => Arc::ptr_eq(old, new),
                (None, None) => true,
                _ => false,
            };
            let previous = if identical {
                None
            } else {
                std::mem::replace(handle, value)
            };
            match slot {
                Slot::Own => state.own_value = scalar,
                Slot::Total => state.total_value = scalar,
            }
            *state.status_mut(slot) = status;
            state.single_value = single;
            state.bump(slot);
            previous
        };
        // released outside the lock
        drop(previous);

        let mut display = lock::lock(&self.display);
        match slot {
            Slot::Own => {
                display.text_expanded.clear();
                display.color_expanded = None;
            }
            Slot::Total => {
                display.text_collapsed.clear();
                display.color_collapsed = None;
            }
        }
    }

    /// Re-interprets the cached value objects (the value view changed).
    pub(crate) fn refresh_scalars(&self) {
        let (own, total, own_generation, total_generation) = {
            let state = lock::lock(&self.values);
            (
                state.own_value_adv.clone(),
                state.total_value_adv.clone(),
                state.generation(Slot::Own),
                state.generation(Slot::Total),
            )
        };
        let (own_scalar, _) = self.scalar_of(&own);
        let (total_scalar, _) = self.scalar_of(&total);
        {
            let mut state = lock::lock(&self.values);
            if state.generation(Slot::Own) == own_generation {
                state.own_value = own_scalar;
            }
            if state.generation(Slot::Total) == total_generation {
                state.total_value = total_scalar;
            }
        }
        self.invalidate_label();
    }

    /// Value object of the current expand state.
    pub fn get_value_object(&self) -> Option<Arc<Value>> {
        let slot = self.current_slot();
        let state = lock::lock(&self.values);
        match slot {
            Slot::Own => state.own_value_adv.clone(),
            Slot::Total => state.total_value_adv.clone(),
        }
    }

    pub fn get_own_value_object(&self) -> Option<Arc<Value>> {
        lock::lock(&self.values).own_value_adv.clone()
    }

    pub fn get_total_value_object(&self) -> Option<Arc<Value>> {
        lock::lock(&self.values).total_value_adv.clone()
    }

    pub fn get_own_value(&self) -> f64 {
        lock::lock(&self.values).own_value
    }

    pub fn get_total_value(&self) -> f64 {
        lock::lock(&self.values).total_value
    }

    /// Scalar of the current expand state, without hidden-children adjustment.
    pub fn get_absolute_value(&self) -> f64 {
        match self.current_slot() {
            Slot::Own => self.get_own_value(),
            Slot::Total => self.get_total_value(),
        }
    }

    /// Scalar of the current expand state including hidden children, and
    /// whether it is meaningful. Exclusive values of non-additive metrics
    /// (minimum, maximum) are not.
    pub fn get_value(&self) -> (f64, bool) {
        if self.current_slot() == Slot::Total {
            return (self.get_total_value(), true);
        }
        let aggregation = self.context.aggregation();
        let mut value = self.get_own_value();
        for child in self.children() {
            if child.is_hidden() {
                value = aggregation.combine(value, child.get_total_value());
            }
        }
        (value, aggregation.is_additive())
    }

    /// Value as displayed: NaN while uncalculated, percent of the tree
    /// reference in percent modus.
    pub fn display_value(&self) -> f64 {
        if !self.is_calculated() {
            return f64::NAN;
        }
        let (value, _) = self.get_value();
        match self.value_modus() {
            ValueModus::Absolute => value,
            ValueModus::Percent => {
                let reference = self.context.reference_value();
                if reference == 0.0 {
                    0.0
                } else {
                    100.0 * value / reference
                }
            }
        }
    }

    /// Last display value stored by `update_label` (NaN if none).
    pub fn cached_display_value(&self) -> f64 {
        lock::lock(&self.display).display_value
    }

    pub fn is_single_value(&self) -> bool {
        lock::lock(&self.values).single_value
    }

    pub fn inclusive_status(&self) -> CalculationStatus {
        lock::lock(&self.values).status_inclusive
    }

    pub fn exclusive_status(&self) -> CalculationStatus {
        lock::lock(&self.values).status_exclusive
    }

    /// Status of the value of the current expand state
    pub fn status(&self) -> CalculationStatus {
        let slot = self.current_slot();
        lock::lock(&self.values).status(slot)
    }

    pub fn is_calculated(&self) -> bool {
        self.status() != CalculationStatus::Invalid
    }

    /// Snapshot of (value object, scalar, status) of one kind, taken atomically.
    pub fn inclusive_snapshot(&self) -> (Option<Arc<Value>>, f64, CalculationStatus) {
        let state = lock::lock(&self.values);
        (
            state.total_value_adv.clone(),
            state.total_value,
            state.status_inclusive,
        )
    }

    pub fn exclusive_snapshot(&self) -> (Option<Arc<Value>>, f64, CalculationStatus) {
        let state = lock::lock(&self.values);
        (
            state.own_value_adv.clone(),
            state.own_value,
            state.status_exclusive,
        )
    }

    /// Drops both values and every derived cache.
    pub fn invalidate(&self) {
        let (own, total) = {
            let mut state = lock::lock(&self.values);
            state.own_value = 0.0;
            state.total_value = 0.0;
            state.status_exclusive = CalculationStatus::Invalid;
            state.status_inclusive = CalculationStatus::Invalid;
            state.single_value = true;
            state.bump(Slot::Own);
            state.bump(Slot::Total);
            (state.own_value_adv.take(), state.total_value_adv.take())
        };
        drop((own, total));
        lock::lock(&self.display).clear_caches();
    }

    /// Drops label and colour, keeping the values.
    pub fn invalidate_label(&self) {
        {
            let mut state = lock::lock(&self.values);
            for slot in [Slot::Own, Slot::Total] {
                let status = state.status_mut(slot);
                if *status == CalculationStatus::Ready {
                    *status = CalculationStatus::Calculated;
                }
            }
        }
        lock::lock(&self.display).clear_caches();
    }

    // ========================================================================
    // LABEL AND COLOUR
    // ========================================================================

    pub fn value_view(&self) -> Arc<dyn ValueView> {
        let data_type = self
            .get_value_object()
            .map(|v| v.data_type())
            .unwrap_or(crate::models::DataType::None);
        self.globals().value_view(data_type)
    }

    /// Derives text and colour of the current value; `Calculated -> Ready`.
    pub fn update_label(&self) {
        let slot = self.current_slot();
        let (status, generation) = {
            let state = lock::lock(&self.values);
            (state.status(slot), state.generation(slot))
        };
        if status == CalculationStatus::Invalid {
            return;
        }

        let text = self.value_view().to_string(self);
        let (absolute, _) = self.get_value();
        let color = self.color_for_value(absolute);
        let display_value = self.display_value();

        {
            let mut display = lock::lock(&self.display);
            match slot {
                Slot::Own => {
                    display.text_expanded = text;
                    display.color_expanded = Some(color);
                }
                Slot::Total => {
                    display.text_collapsed = text;
                    display.color_collapsed = Some(color);
                }
            }
            display.display_value = display_value;
        }

        let mut state = lock::lock(&self.values);
        if state.generation(slot) == generation && state.status(slot) == CalculationStatus::Calculated {
            *state.status_mut(slot) = CalculationStatus::Ready;
        }
    }

    fn ensure_ready(&self) {
        if self.status() == CalculationStatus::Calculated {
            self.update_label();
        }
    }

    /// Value suffix of the current state (empty while uncalculated).
    pub fn value_text(&self) -> String {
        self.ensure_ready();
        let slot = self.current_slot();
        let display = lock::lock(&self.display);
        match slot {
            Slot::Own => display.text_expanded.clone(),
            Slot::Total => display.text_collapsed.clone(),
        }
    }

    /// Value text followed by the display name.
    pub fn label(&self) -> String {
        let text = self.value_text();
        let name = self.display_name();
        if text.is_empty() {
            name
        } else {
            format!("{} {}", text, name)
        }
    }

    /// Colour of the current value relative to the tree's value range.
    pub fn color(&self) -> Color32 {
        self.ensure_ready();
        let slot = self.current_slot();
        let cached = {
            let display = lock::lock(&self.display);
            match slot {
                Slot::Own => display.color_expanded,
                Slot::Total => display.color_collapsed,
            }
        };
        match cached {
            Some(color) => color,
            None if self.is_calculated() => self.color_for_value(self.get_value().0),
            None => self.globals().color_map().undefined_color,
        }
    }

    pub fn color_for_value(&self, value: f64) -> Color32 {
        let globals = self.globals();
        let (min, max) = self.context.min_max();
        globals.color_map().color(
            value,
            min,
            max,
            globals.round_threshold(PrecisionFormat::Trees),
        )
    }

    // ========================================================================
    // MARKERS
    // ========================================================================

    /// Attaches `marker`. Dependency markers are kept once; ordinary markers
    /// are appended. With `mark_parents` every ancestor records the marker in
    /// its parent marker list so a collapsed ancestor can show it.
    pub fn set_marker(&self, marker: &MarkerRef, is_dependency_marker: bool, mark_parents: bool) {
        {
            let mut lists = lock::lock(&self.markers);
            if is_dependency_marker {
                if marker::position(&lists.dependency_markers, marker).is_none() {
                    lists.dependency_markers.push(Arc::clone(marker));
                }
            } else {
                lists.markers.push(Arc::clone(marker));
            }
        }
        if mark_parents {
            let mut current = self.parent();
            while let Some(ancestor) = current {
                ancestor.add_parent_marker(marker);
                current = ancestor.parent();
            }
        }
    }

    fn add_parent_marker(&self, marker: &MarkerRef) {
        let mut lists = lock::lock(&self.markers);
        if marker::position(&lists.parent_markers, marker).is_none() {
            lists.parent_markers.push(Arc::clone(marker));
        }
    }

    fn remove_parent_marker(&self, marker: &MarkerRef) -> bool {
        let mut lists = lock::lock(&self.markers);
        match marker::position(&lists.parent_markers, marker) {
            Some(pos) => {
                lists.parent_markers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Detaches `marker` and unwinds the ancestors' parent marker lists until
    /// an ancestor no longer holds it.
    pub fn remove_marker(&self, marker: &MarkerRef) {
        let removed = {
            let mut lists = lock::lock(&self.markers);
            if let Some(pos) = marker::position(&lists.markers, marker) {
                lists.markers.remove(pos);
                true
            } else if let Some(pos) = marker::position(&lists.dependency_markers, marker) {
                lists.dependency_markers.remove(pos);
                true
            } else {
                false
            }
        };
        if !removed {
            return;
        }
        let mut current = self.parent();
        while let Some(ancestor) = current {
            if !ancestor.remove_parent_marker(marker) {
                break;
            }
            current = ancestor.parent();
        }
    }

    pub fn markers(&self) -> Vec<MarkerRef> {
        lock::lock(&self.markers).markers.clone()
    }

    pub fn parent_markers(&self) -> Vec<MarkerRef> {
        lock::lock(&self.markers).parent_markers.clone()
    }

    pub fn dependency_markers(&self) -> Vec<MarkerRef> {
        lock::lock(&self.markers).dependency_markers.clone()
    }

    pub fn has_markers(&self) -> bool {
        let lists = lock::lock(&self.markers);
        !lists.markers.is_empty() || !lists.dependency_markers.is_empty()
    }

    // ========================================================================
    // METADATA
    // ========================================================================

    /// File and line range of call and region items.
    pub fn source_info(&self) -> Option<SourceInfo> {
        if !self.item_type.has_region() {
            return None;
        }
        let region = self.cube_object.as_ref()?.region()?;
        let file = if SYNTHETIC_MODULES.contains(&region.module.as_str()) {
            String::new()
        } else {
            region.module.clone()
        };
        Some(SourceInfo {
            file,
            begin_line: region.begin_line,
            end_line: region.end_line,
        })
    }

    /// Whether values should be shown without fraction digits.
    pub fn is_integer_type(&self) -> bool {
        if self.value_modus() == ValueModus::Absolute {
            if let Some(integer) = self.context.homogeneous_integer() {
                return integer;
            }
        }
        self.cube_object
            .as_ref()
            .and_then(|o| o.metric())
            .map(|m| m.is_integer())
            .unwrap_or(false)
    }

    pub fn is_derived_metric(&self) -> bool {
        self.cube_object
            .as_ref()
            .and_then(|o| o.metric())
            .map(|m| m.derived)
            .unwrap_or(false)
    }
}

impl fmt::Debug for TreeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.item_type)
            .field("depth", &self.depth())
            .field("children", &self.child_count())
            .finish()
    }
}

/// Releases the subtree with an explicit stack; call trees can be deep enough
/// to overflow the stack with recursive drops.
impl Drop for TreeItem {
    fn drop(&mut self) {
        let links = self.links.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut pending = std::mem::take(&mut links.children);
        while let Some(child) = pending.pop() {
            // shared children are released by their other owners
            if let Ok(mut child) = Arc::try_unwrap(child) {
                let links = child.links.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
                pending.append(&mut links.children);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::{CnodeInfo, RegionInfo};
    use crate::tree::Tree;

    fn call_tree() -> Arc<Tree> {
        Tree::new(&Globals::new(), TreeType::Call, "Call tree")
    }

    #[test]
    fn test_unset_item_reads_neutral_values() {
        let tree = call_tree();
        let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
        assert_eq!(item.get_own_value(), 0.0);
        assert_eq!(item.get_total_value(), 0.0);
        assert!(item.display_value().is_nan());
        assert!(item.get_value_object().is_none());
        assert_eq!(item.value_text(), "");
        assert_eq!(item.label(), "main");
        assert!(!item.is_calculated());
    }

    #[test]
    fn test_value_selected_by_expand_state() {
        let tree = call_tree();
        let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
        item.set_inclusive_value(Some(Arc::new(Value::Double(10.0))));
        item.set_exclusive_value(Some(Arc::new(Value::Double(4.0))));
        assert_eq!(item.get_absolute_value(), 10.0);
        item.set_expanded(true);
        assert_eq!(item.get_absolute_value(), 4.0);
        item.set_hidden(true);
        // hidden items are never expanded
        assert_eq!(item.get_absolute_value(), 10.0);
    }

    #[test]
    fn test_set_value_follows_expand_state() {
        let tree = call_tree();
        let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
        item.set_expanded(true);
        item.set_value(Some(Arc::new(Value::Double(2.0))));
        assert_eq!(item.get_own_value(), 2.0);
        assert_eq!(item.get_total_value(), 0.0);
        assert_eq!(item.exclusive_status(), CalculationStatus::Calculated);
        assert_eq!(item.inclusive_status(), CalculationStatus::Invalid);
    }

    #[test]
    fn test_status_transitions() {
        let tree = call_tree();
        let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
        item.set_inclusive_value(Some(Arc::new(Value::Double(1.5))));
        assert_eq!(item.status(), CalculationStatus::Calculated);
        item.update_label();
        assert_eq!(item.status(), CalculationStatus::Ready);
        item.invalidate_label();
        assert_eq!(item.status(), CalculationStatus::Calculated);
        item.invalidate();
        assert_eq!(item.status(), CalculationStatus::Invalid);
        // invalidating the label of an invalid item keeps it invalid
        item.invalidate_label();
        assert_eq!(item.status(), CalculationStatus::Invalid);
    }

    /// Writes one slot of the item it formats, once.
    struct WritingView {
        inclusive: bool,
        armed: std::sync::atomic::AtomicBool,
    }

    impl ValueView for WritingView {
        fn name(&self) -> &str {
            "Writing"
        }

        fn is_available(&self, _data_type: crate::models::DataType) -> bool {
            true
        }

        fn get_double_value(&self, value: &Value) -> f64 {
            value.get_double()
        }

        fn to_string(&self, item: &TreeItem) -> String {
            if self.armed.swap(false, std::sync::atomic::Ordering::SeqCst) {
                let value = Some(Arc::new(Value::Double(9.0)));
                if self.inclusive {
                    item.set_inclusive_value(value);
                } else {
                    item.set_exclusive_value(value);
                }
            }
            "w".to_string()
        }

        fn get_icon(&self, item: Option<&TreeItem>, _gray_out: bool) -> egui::ColorImage {
            crate::view::icon::blank_icon(self.get_icon_size(item))
        }

        fn get_icon_size(&self, _item: Option<&TreeItem>) -> [usize; 2] {
            [1, 1]
        }
    }

    fn item_with_writing_view(inclusive: bool) -> (Arc<Tree>, Arc<TreeItem>) {
        let globals = Globals::new();
        globals.set_value_view(
            crate::models::DataType::Double,
            Some(Arc::new(WritingView {
                inclusive,
                armed: std::sync::atomic::AtomicBool::new(true),
            })),
        );
        let tree = Tree::new(&globals, TreeType::Call, "Call tree");
        let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
        item.set_inclusive_value(Some(Arc::new(Value::Double(1.0))));
        (tree, item)
    }

    #[test]
    fn test_exclusive_write_does_not_block_inclusive_label() {
        let (_tree, item) = item_with_writing_view(false);
        item.update_label();
        assert_eq!(item.inclusive_status(), CalculationStatus::Ready);
        assert_eq!(item.exclusive_status(), CalculationStatus::Calculated);
    }

    #[test]
    fn test_inclusive_write_during_label_keeps_it_stale() {
        let (_tree, item) = item_with_writing_view(true);
        item.update_label();
        assert_eq!(item.inclusive_status(), CalculationStatus::Calculated);
        assert_eq!(item.get_total_value(), 9.0);
    }

    #[test]
    fn test_label_contains_value_and_name() {
        let tree = call_tree();
        let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
        item.set_inclusive_value(Some(Arc::new(Value::Double(1.5))));
        assert_eq!(item.label(), "1.50 main");
        assert_eq!(item.cached_display_value(), 1.5);
    }

    #[test]
    fn test_hidden_children_fold_into_exclusive_value() {
        let tree = call_tree();
        let parent = tree.add_item(None, "main", TreeItemType::CallItem, None);
        let child = tree.add_item(Some(&parent), "foo", TreeItemType::CallItem, None);
        parent.set_exclusive_value(Some(Arc::new(Value::Double(1.0))));
        child.set_inclusive_value(Some(Arc::new(Value::Double(2.0))));
        parent.set_expanded(true);
        assert_eq!(parent.get_value(), (1.0, true));
        child.set_hidden(true);
        assert_eq!(parent.get_value(), (3.0, true));
    }

    #[test]
    fn test_source_info_blanks_paradigm_files() {
        let tree = call_tree();
        let region = Arc::new(RegionInfo::new("MPI_Send", "MPI", -1, -1));
        let cnode = CubeObject::Cnode(Arc::new(CnodeInfo { region, line: 0 }));
        let item = tree.add_item(None, "MPI_Send", TreeItemType::CallItem, Some(cnode));
        let info = item.source_info().unwrap();
        assert_eq!(info.file, "");

        let region = Arc::new(RegionInfo::new("solve", "solver.c", 10, 42));
        let item = tree.add_item(None, "solve", TreeItemType::RegionItem, Some(CubeObject::Region(region)));
        assert_eq!(
            item.source_info(),
            Some(SourceInfo { file: "solver.c".to_string(), begin_line: 10, end_line: 42 })
        );

        let plain = tree.add_item(None, "x", TreeItemType::Aggregated, None);
        assert_eq!(plain.source_info(), None);
    }

    #[test]
    fn test_dependency_markers_are_deduplicated() {
        let tree = call_tree();
        let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
        let marker = crate::tree::TreeItemMarker::new("dep", Color32::BLUE);
        item.set_marker(&marker, true, false);
        item.set_marker(&marker, true, false);
        assert_eq!(item.dependency_markers().len(), 1);
        item.set_marker(&marker, false, false);
        item.set_marker(&marker, false, false);
        assert_eq!(item.markers().len(), 2);
    }
}
