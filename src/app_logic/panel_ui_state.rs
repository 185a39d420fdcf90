/*
 * This module defines `PanelUiState`, the presentation state of the script
 * browser: the active script folder, the last scan of it, the active filter
 * result, the mapping between tree items and paths, and the current
 * selection. It knows how to turn the scanned tree plus the active name
 * patterns into the `TreeItemDescriptor`s the platform layer renders.
 */
use crate::core::{
    FileNode, FilterResult, NameFilter, compute_patterns, count_files, scan_script_tree,
};
use crate::platform_layer::{TreeItemDescriptor, TreeItemId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct PanelUiState {
    pub script_folder: PathBuf,
    pub file_nodes_cache: Vec<FileNode>,
    pub filter: FilterResult,
    pub item_id_to_path: HashMap<TreeItemId, PathBuf>,
    pub selected_path: Option<PathBuf>,
    next_tree_item_id_counter: u64,
}

impl PanelUiState {
    pub fn new(script_folder: PathBuf) -> Self {
        PanelUiState {
            script_folder,
            file_nodes_cache: Vec::new(),
            filter: compute_patterns(""),
            item_id_to_path: HashMap::new(),
            selected_path: None,
            next_tree_item_id_counter: 1,
        }
    }

    /*
     * Re-reads the script folder from disk. A folder that cannot be scanned
     * shows as an empty tree; the error is logged.
     */
    pub fn rescan(&mut self) {
        match scan_script_tree(&self.script_folder) {
            Ok(nodes) => self.file_nodes_cache = nodes,
            Err(e) => {
                log::error!(
                    "PanelUiState: Failed to scan script folder {:?}: {e}",
                    self.script_folder
                );
                self.file_nodes_cache.clear();
            }
        }
    }

    pub fn path_for_item(&self, item_id: TreeItemId) -> Option<&Path> {
        self.item_id_to_path.get(&item_id).map(PathBuf::as_path)
    }

    /*
     * Builds the descriptors of the visible tree under the active filter and
     * records a fresh id for every item. Patterns that fail to compile (a
     * stray `[` in the query) show no files.
     */
    pub fn build_visible_tree(&mut self) -> Vec<TreeItemDescriptor> {
        let visible = match NameFilter::new(&self.filter.patterns) {
            Ok(name_filter) => name_filter.apply(&self.file_nodes_cache),
            Err(e) => {
                log::warn!("PanelUiState: Unusable filter patterns: {e}");
                NameFilter::new(&Default::default())
                    .map(|none| none.apply(&self.file_nodes_cache))
                    .unwrap_or_default()
            }
        };

        log::trace!(
            "PanelUiState: {} of {} scripts visible",
            count_files(&visible),
            count_files(&self.file_nodes_cache)
        );

        self.item_id_to_path.clear();
        self.next_tree_item_id_counter = 1;
        Self::build_descriptors_recursive(
            &visible,
            &mut self.item_id_to_path,
            &mut self.next_tree_item_id_counter,
        )
    }

    fn build_descriptors_recursive(
        nodes: &[FileNode],
        item_id_to_path: &mut HashMap<TreeItemId, PathBuf>,
        next_tree_item_id_counter: &mut u64,
    ) -> Vec<TreeItemDescriptor> {
        let mut descriptors = Vec::with_capacity(nodes.len());
        for node in nodes {
            let id = TreeItemId(*next_tree_item_id_counter);
            *next_tree_item_id_counter += 1;
            item_id_to_path.insert(id, node.path.clone());

            descriptors.push(TreeItemDescriptor {
                id,
                text: node.name.clone(),
                is_folder: node.is_dir,
                children: Self::build_descriptors_recursive(
                    &node.children,
                    item_id_to_path,
                    next_tree_item_id_counter,
                ),
            });
        }
        descriptors
    }
}
