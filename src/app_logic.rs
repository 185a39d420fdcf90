/*
 * This module provides the application logic layer, centered around
 * `ScriptTreeLogic`, the Presenter/Controller of the Script Tree panel. It
 * also holds the browser presentation state (`PanelUiState`), the search box
 * debounce and the shared UI constants. Unit tests for `ScriptTreeLogic` are
 * in `handler_tests.rs`.
 */
pub mod filter_debounce;
pub mod handler;
pub mod panel_ui_state;
pub mod ui_constants;


pub use handler::ScriptTreeLogic;
