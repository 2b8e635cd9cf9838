/// Tree View
///
/// Renders one tree model as an indented list of rows. The visible rows are
/// collected with an explicit stack (trees can be hundreds of levels deep)
/// and drawn with `ScrollArea::show_rows`, so only rows on screen create
/// widgets and icon textures.
use super::widgets;
use crate::model::{
    ItemRole, ModelEvent, ModelIndex, SortKey, SortOrder, TreeModel, TreeModelInterface,
    TreeModelProxy,
};
use crate::models::ItemId;
use crate::tree::Tree;
use crossbeam_channel::Receiver;
use eframe::egui;
use std::collections::HashMap;
use std::sync::Arc;

/// Horizontal indentation per level in points
const INDENT: f32 = 14.0;

enum RowAction {
    Select(ModelIndex),
    Toggle(ModelIndex),
}

/// One tree column of the main window
pub struct TreePane {
    pub title: String,
    pub model: TreeModelProxy,
    events: Receiver<ModelEvent>,
    /// Icon textures keyed by item, tagged with the label they were drawn for
    icons: HashMap<ItemId, (String, egui::TextureHandle)>,
    pub selected: Option<ItemId>,
    pub sort: Option<(SortKey, SortOrder)>,
    pub hide_zero: bool,
}

impl TreePane {
    pub fn new(tree: Arc<Tree>) -> Self {
        let title = tree.label().to_string();
        let model = TreeModel::new(tree);
        let events = model.subscribe();
        TreePane {
            title,
            model: TreeModelProxy::new(model),
            events,
            icons: HashMap::new(),
            selected: None,
            sort: None,
            hide_zero: false,
        }
    }

    pub fn tree(&self) -> &Arc<Tree> {
        self.model.tree()
    }

    /// Drains model events; returns true if anything changed.
    pub fn poll_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            log::debug!("[UI] {}: {:?}", self.title, event);
            changed = true;
        }
        if changed {
            self.icons.clear();
        }
        changed
    }

    pub fn invalidate_icons(&mut self) {
        self.icons.clear();
    }

    pub fn apply_view_options(&mut self) {
        match self.sort {
            Some((key, order)) => self.model.set_sort(key, order),
            None => self.model.clear_sort(),
        }
        if self.hide_zero {
            self.model.filter_zero_values();
        } else {
            self.model.clear_filter();
        }
    }

    /// Marks items whose name matches `pattern` and expands the way to them.
    /// Returns the number of hits.
    pub fn search(&mut self, pattern: &str, case_sensitive: bool) -> usize {
        if pattern.is_empty() {
            self.model.source_mut().set_found_items(&[]);
            return 0;
        }
        let found: Vec<ModelIndex> = self
            .model
            .find_regex(pattern, case_sensitive)
            .iter()
            .map(|index| self.model.map_to_source(index))
            .collect();
        let source = self.model.source_mut();
        source.set_found_items(&found);
        for index in &found {
            let mut parent = source.parent(index);
            while let Some(item) = source.get_tree_item(&parent) {
                item.set_expanded(true);
                parent = source.parent(&parent);
            }
        }
        self.icons.clear();
        found.len()
    }

    /// Visible rows with their indentation level, top to bottom.
    fn visible_rows(&self) -> Vec<(ModelIndex, usize)> {
        let root = ModelIndex::invalid();
        let mut rows = Vec::new();
        let mut stack: Vec<(ModelIndex, usize)> = (0..self.model.row_count(&root))
            .rev()
            .map(|row| (self.model.index(row, 0, &root), 0))
            .collect();
        while let Some((index, level)) = stack.pop() {
            rows.push((index, level));
            let expanded = self
                .model
                .get_tree_item(&index)
                .map(|item| item.is_expanded())
                .unwrap_or(false);
            if expanded {
                for row in (0..self.model.row_count(&index)).rev() {
                    stack.push((self.model.index(row, 0, &index), level + 1));
                }
            }
        }
        rows
    }

    fn icon(&mut self, ctx: &egui::Context, index: &ModelIndex, label: &str) -> Option<egui::TextureHandle> {
        let id = index.id?;
        if let Some((cached_label, texture)) = self.icons.get(&id) {
            if cached_label == label {
                return Some(texture.clone());
            }
        }
        let crate::model::ItemData::Icon(image) = self.model.data(index, ItemRole::Icon) else {
            return None;
        };
        let texture = ctx.load_texture(format!("icon-{}-{}", self.title, id), image, egui::TextureOptions::NEAREST);
        self.icons.insert(id, (label.to_string(), texture.clone()));
        Some(texture)
    }

    /// Draws the tree; returns the newly selected item, if any.
    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<ItemId> {
        let rows = self.visible_rows();
        let row_height = ui.spacing().interact_size.y;
        let mut action = None;

        egui::ScrollArea::both()
            .id_source(self.title.clone())
            .auto_shrink([false; 2])
            .show_rows(ui, row_height, rows.len(), |ui, range| {
                for (index, level) in &rows[range] {
                    if let Some(a) = self.show_row(ui, index, *level) {
                        action = Some(a);
                    }
                }
            });

        match action {
            Some(RowAction::Toggle(index)) => {
                if let Some(item) = self.model.get_tree_item(&index) {
                    item.set_expanded(!item.is_expanded());
                }
                None
            }
            Some(RowAction::Select(index)) => self.select(&index),
            None => None,
        }
    }

    fn show_row(&mut self, ui: &mut egui::Ui, index: &ModelIndex, level: usize) -> Option<RowAction> {
        let item = self.model.get_tree_item(index)?;
        let label = self.model.data(index, ItemRole::Display).as_text().unwrap_or_default().to_string();
        let has_children = self.model.row_count(index) > 0;
        let found = self.model.data(index, ItemRole::Found).as_flag();
        let found_parent = self.model.data(index, ItemRole::FoundParent).as_flag();
        let selected_parent = self.model.data(index, ItemRole::SelectedParent).as_flag();
        let texture = self.icon(ui.ctx(), index, &label);
        let mut action = None;

        ui.horizontal(|ui| {
            ui.add_space(level as f32 * INDENT);
            if has_children {
                let arrow = if item.is_expanded() { "\u{25be}" } else { "\u{25b8}" };
                if ui.small_button(arrow).clicked() {
                    action = Some(RowAction::Toggle(*index));
                }
            } else {
                ui.add_space(ui.spacing().interact_size.y);
            }

            if let Some(texture) = texture {
                let size = texture.size_vec2();
                ui.add(egui::Image::new(egui::load::SizedTexture::new(texture.id(), size)));
            }

            let mut text = egui::RichText::new(label);
            if let Some(color) = widgets::highlight_color(found, found_parent, selected_parent) {
                text = text.background_color(color);
            }
            let response = ui.selectable_label(item.is_selected(), text);
            let response = response.on_hover_ui(|ui| {
                if let Some(tooltip) = self.model.data(index, ItemRole::ToolTip).as_text() {
                    ui.label(tooltip);
                }
            });
            if response.clicked() {
                action = Some(RowAction::Select(*index));
            }

            if let crate::model::ItemData::Markers(markers) = self.model.data(index, ItemRole::Markers) {
                if !markers.is_empty() {
                    widgets::marker_dots(ui, &markers);
                }
            }
        });
        action
    }

    fn select(&mut self, index: &ModelIndex) -> Option<ItemId> {
        let item = self.model.get_tree_item(index)?;
        if let Some(previous) = self.selected.and_then(|id| self.tree().item(id)) {
            previous.set_selected(false);
        }
        item.set_selected(true);
        self.selected = Some(item.id());
        let source_index = self.model.map_to_source(index);
        self.model.source_mut().mark_selected_parents(&[source_index]);
        log::debug!("[UI] {}: selected {}", self.title, item.name());
        Some(item.id())
    }
}
